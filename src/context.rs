use std::path::Path;
use std::sync::Arc;

use crate::cache::{CacheMetrics, DependencyCache};
use crate::config::SageConfig;
use crate::error::Result;
use crate::fs::{FileSystem, OsFileSystem};
use crate::globalization::GlobalizationMerger;
use crate::overlay::OverlayRegistry;
use crate::resolver::ResourceResolver;
use crate::resource::ResourceLoader;

/// Everything a host needs, wired from one configuration and shared by `Arc`.
#[derive(Debug, Clone)]
pub struct SageContext {
    pub registry: Arc<OverlayRegistry>,
    pub resolver: Arc<ResourceResolver>,
    pub loader: Arc<ResourceLoader>,
    pub merger: Arc<GlobalizationMerger>,
}

impl SageContext {
    pub fn from_config(config: &SageConfig) -> Result<Self> {
        Self::with_file_system(config, Arc::new(OsFileSystem))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_config(&SageConfig::from_file(path)?)
    }

    pub fn with_file_system(config: &SageConfig, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let registry = Arc::new(config.build_registry()?);
        let resolver = Arc::new(
            ResourceResolver::with_file_system(Arc::clone(&registry), Arc::clone(&fs))
                .with_locale_fallbacks(config.locale_fallbacks.clone()),
        );
        let cache_config = config.cache_config();
        let loader = Arc::new(ResourceLoader::new(
            Arc::clone(&resolver),
            Arc::new(DependencyCache::new(Arc::clone(&fs), cache_config.clone())),
        ));
        let merger = Arc::new(GlobalizationMerger::new(
            Arc::clone(&resolver),
            Arc::new(DependencyCache::new(fs, cache_config)),
            config.globalization.clone(),
        ));
        log::debug!(
            "context ready: layers [{}]",
            registry
                .layers_in_order()
                .iter()
                .map(|layer| layer.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(Self {
            registry,
            resolver,
            loader,
            merger,
        })
    }

    /// Resource and dictionary cache counters, in that order.
    pub fn cache_metrics(&self) -> (CacheMetrics, CacheMetrics) {
        (
            self.loader.cache().metrics(),
            self.merger.dictionary_cache().metrics(),
        )
    }
}
