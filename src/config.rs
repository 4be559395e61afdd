//! TOML configuration.
//!
//! ```toml
//! templates = ["assets/{locale}/{category}/{path}", "assets/{path}"]
//!
//! [[layers]]
//! name = "base"
//! root = "."
//! install_order = 0
//!
//! [[layers]]
//! name = "shop"
//! root = "extensions/shop"
//! install_order = 10
//!
//! [locale_fallbacks]
//! de-CH = ["de"]
//!
//! [cache]
//! mtime_tolerance_ms = 0
//! max_entries = 4096
//! ```

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::error::{Result, SageError};
use crate::globalization::GlobalizationConfig;
use crate::overlay::{Layer, OverlayRegistry, PathTemplate};

pub const ENV_MTIME_TOLERANCE_MS: &str = "SAGE_MTIME_TOLERANCE_MS";
pub const ENV_CACHE_MAX_ENTRIES: &str = "SAGE_CACHE_MAX_ENTRIES";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerConfig {
    pub name: String,
    pub root: PathBuf,
    pub install_order: i64,
    #[serde(default)]
    pub templates: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSection {
    pub mtime_tolerance_ms: u64,
    pub max_entries: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SageConfig {
    pub layers: Vec<LayerConfig>,
    /// Registry-wide templates. Absent means the built-in defaults.
    pub templates: Option<Vec<String>>,
    pub locale_fallbacks: HashMap<String, Vec<String>>,
    pub cache: CacheSection,
    pub globalization: GlobalizationConfig,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl SageConfig {
    /// Parse `text`; relative layer roots are taken relative to `base_dir`.
    pub fn from_toml_str(text: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut config: SageConfig = toml::from_str(text)
            .map_err(|err| SageError::configuration(format!("invalid configuration: {err}")))?;
        config.base_dir = Some(base_dir.into());
        Ok(config)
    }

    /// Load a config file and apply environment overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            SageError::configuration(format!("cannot read {}: {err}", path.display()))
        })?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let mut config = Self::from_toml_str(&text, base_dir).map_err(|err| match err {
            SageError::Configuration { message } => {
                SageError::configuration(format!("{}: {message}", path.display()))
            }
            other => other,
        })?;
        config.apply_env_overrides()?;
        log::debug!(
            "loaded {} ({} layers)",
            path.display(),
            config.layers.len()
        );
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup(ENV_MTIME_TOLERANCE_MS) {
            self.cache.mtime_tolerance_ms = parse_env(ENV_MTIME_TOLERANCE_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_CACHE_MAX_ENTRIES) {
            let max: usize = parse_env(ENV_CACHE_MAX_ENTRIES, &value)?;
            self.cache.max_entries = (max > 0).then_some(max);
        }
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            mtime_tolerance: Duration::from_millis(self.cache.mtime_tolerance_ms),
            // 0 means unbounded here too, as it does for the env override.
            max_entries: self.cache.max_entries.filter(|&max| max > 0),
        }
    }

    pub fn layer_root(&self, layer: &LayerConfig) -> PathBuf {
        match &self.base_dir {
            Some(base) if layer.root.is_relative() => base.join(&layer.root),
            _ => layer.root.clone(),
        }
    }

    /// Register every configured layer and freeze the registry.
    pub fn build_registry(&self) -> Result<OverlayRegistry> {
        if self.layers.is_empty() {
            return Err(SageError::configuration("no layers configured"));
        }
        let mut pending = OverlayRegistry::builder();
        if let Some(templates) = &self.templates {
            pending.templates(parse_templates(templates)?);
        }
        for layer in &self.layers {
            if layer.name.trim().is_empty() {
                return Err(SageError::configuration("layer with an empty name"));
            }
            let mut entry = Layer::new(
                layer.name.as_str(),
                self.layer_root(layer),
                layer.install_order,
            );
            if let Some(templates) = &layer.templates {
                entry = entry.with_templates(parse_templates(templates)?);
            }
            pending.register(entry);
        }
        pending.finalize()
    }
}

fn parse_templates(templates: &[String]) -> Result<Vec<PathTemplate>> {
    templates.iter().map(|t| PathTemplate::parse(t)).collect()
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err| SageError::configuration(format!("{key}='{value}': {err}")))
}
