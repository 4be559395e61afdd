//! Layered resource resolution for Sage web projects.
//!
//! A project is a stack of [`overlay::Layer`]s (the base project, then
//! extensions). [`ResourceResolver`] maps a logical request to the file that
//! wins across the stack, [`DependencyCache`] keeps parsed results until a
//! contributing file changes, and [`GlobalizationMerger`] fills phrase
//! placeholders from per-locale dictionaries.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod fs;
pub mod globalization;
pub mod logging;
pub mod overlay;
pub mod resolver;
pub mod resource;

pub use crate::cache::{CacheConfig, CacheMetrics, DependencyCache, FileStamp, Loaded};
pub use crate::config::SageConfig;
pub use crate::context::SageContext;
pub use crate::error::{CandidateList, Result, SageError, TriedCandidate};
pub use crate::fs::{FileSystem, OsFileSystem};
pub use crate::globalization::{
    BatchOptions, BatchReport, Dictionary, GlobalizationConfig, GlobalizationMerger,
    GlobalizationSummary, GlobalizeOutcome,
};
pub use crate::logging::{
    log_disable, log_set_callback, log_set_level, log_set_stderr, LogCallback, LogRecord,
};
pub use crate::overlay::{Layer, OverlayRegistry, PathTemplate};
pub use crate::resolver::{ResolvedResource, ResourceRequest, ResourceResolver};
pub use crate::resource::{ResourceLoader, XmlResource};
