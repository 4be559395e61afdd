pub mod registry;
pub mod template;

pub use registry::{Layer, OverlayRegistry, PendingRegistry};
pub use template::{PathTemplate, Variable, DEFAULT_TEMPLATES};
