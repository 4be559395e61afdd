//! Merging locale dictionaries into locale-neutral XML resources.

pub mod batch;
pub mod dictionary;
mod merge;

pub use batch::{BatchFailure, BatchOptions, BatchReport};
pub use dictionary::Dictionary;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{DependencyCache, Loaded};
use crate::error::{Result, SageError};
use crate::resolver::{ResourceRequest, ResourceResolver};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalizationConfig {
    /// Namespace prefix of phrase placeholders (`intl:phrase`, `intl:title`).
    pub prefix: String,
    /// Category the dictionaries are resolved in.
    pub dictionary_category: String,
    /// Relative path of the dictionary file inside that category.
    pub dictionary_file: String,
    /// File extensions batch globalization picks up.
    pub extensions: Vec<String>,
}

impl Default for GlobalizationConfig {
    fn default() -> Self {
        Self {
            prefix: "intl".to_string(),
            dictionary_category: "dictionary".to_string(),
            dictionary_file: "dictionary.xml".to_string(),
            extensions: vec!["xml".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalizationSummary {
    pub resource_name: String,
    pub locale: String,
    pub substituted_phrases: BTreeSet<String>,
    pub missing_phrases: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalizeOutcome {
    Globalized {
        document: String,
        summary: GlobalizationSummary,
    },
    /// The document holds no placeholders; it is skipped, not failed.
    NotGlobalizable,
}

impl GlobalizeOutcome {
    pub fn document(&self) -> Option<&str> {
        match self {
            GlobalizeOutcome::Globalized { document, .. } => Some(document),
            GlobalizeOutcome::NotGlobalizable => None,
        }
    }

    pub fn summary(&self) -> Option<&GlobalizationSummary> {
        match self {
            GlobalizeOutcome::Globalized { summary, .. } => Some(summary),
            GlobalizeOutcome::NotGlobalizable => None,
        }
    }

    pub fn is_globalizable(&self) -> bool {
        matches!(self, GlobalizeOutcome::Globalized { .. })
    }
}

#[derive(Debug)]
pub struct GlobalizationMerger {
    resolver: Arc<ResourceResolver>,
    dictionaries: Arc<DependencyCache<Dictionary>>,
    config: GlobalizationConfig,
}

impl GlobalizationMerger {
    pub fn new(
        resolver: Arc<ResourceResolver>,
        dictionaries: Arc<DependencyCache<Dictionary>>,
        config: GlobalizationConfig,
    ) -> Self {
        Self { resolver, dictionaries, config }
    }

    pub fn config(&self) -> &GlobalizationConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Arc<ResourceResolver> {
        &self.resolver
    }

    pub fn dictionary_cache(&self) -> &Arc<DependencyCache<Dictionary>> {
        &self.dictionaries
    }

    /// The merged dictionary for `locale`, cached until any dictionary file
    /// that contributed to it (or could override it) changes.
    pub fn dictionary(&self, locale: &str) -> Result<Arc<Dictionary>> {
        let request = ResourceRequest::new(
            self.config.dictionary_category.as_str(),
            locale,
            self.config.dictionary_file.as_str(),
        );
        let key = format!("dictionary:{}", request.key());
        self.dictionaries.get_or_load(&key, || {
            let tracked = self.resolver.resolve_all_tracked(&request)?;
            let fs = self.resolver.file_system();
            let mut merged = Dictionary::new(locale);
            for resolved in &tracked.resolved {
                let text = fs.read_to_string(&resolved.physical_path)?;
                let phrases = dictionary::parse_phrases(&resolved.physical_path, &text)?;
                log::debug!(
                    "dictionary {} ({} phrases) from layer '{}'",
                    resolved.physical_path.display(),
                    phrases.len(),
                    resolved.layer.name()
                );
                merged.merge_lower(resolved.physical_path.clone(), phrases);
            }
            if tracked.resolved.is_empty() {
                log::warn!("no dictionary found for locale '{locale}'; every phrase will be missing");
            }
            Ok(Loaded::new(merged).with_dependencies(tracked.stamps))
        })
    }

    /// Substitute `locale` phrases into `source`. `name` labels the summary
    /// and any parse error.
    pub fn globalize(&self, name: &str, source: &str, locale: &str) -> Result<GlobalizeOutcome> {
        let dictionary = self.dictionary(locale)?;
        self.globalize_with(name, source, &dictionary)
    }

    /// Same as [`globalize`](Self::globalize) against an already loaded dictionary.
    pub fn globalize_with(&self, name: &str, source: &str, dictionary: &Dictionary) -> Result<GlobalizeOutcome> {
        let merged = merge::merge_document(source, dictionary, &self.config.prefix)
            .map_err(|message| SageError::parse(PathBuf::from(name), message))?;
        if merged.placeholders == 0 {
            log::debug!("'{name}' has no phrase placeholders; skipped");
            return Ok(GlobalizeOutcome::NotGlobalizable);
        }
        log::debug!(
            "globalized '{name}' for '{}': {} substituted, {} missing",
            dictionary.locale,
            merged.substituted.len(),
            merged.missing.len()
        );
        Ok(GlobalizeOutcome::Globalized {
            document: merged.document,
            summary: GlobalizationSummary {
                resource_name: name.to_string(),
                locale: dictionary.locale.clone(),
                substituted_phrases: merged.substituted,
                missing_phrases: merged.missing,
            },
        })
    }

    /// Resolve, read and globalize one resource. Parse errors carry the physical path.
    pub fn globalize_resource(&self, request: &ResourceRequest) -> Result<GlobalizeOutcome> {
        let resolved = self.resolver.resolve(request)?;
        let source = self
            .resolver
            .file_system()
            .read_to_string(&resolved.physical_path)?;
        self.globalize(&request.relative_path, &source, &request.locale)
            .map_err(|err| match err {
                SageError::ResourceParse { message, .. } => {
                    SageError::parse(&resolved.physical_path, message)
                }
                other => other,
            })
    }
}
