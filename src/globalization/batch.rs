//! Globalize every effective resource of a category in one pass.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use super::{Dictionary, GlobalizationMerger, GlobalizationSummary, GlobalizeOutcome};
use crate::error::{Result, SageError};
use crate::resolver::ResolvedResource;

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Merged documents are written here by relative path when set.
    pub output_dir: Option<PathBuf>,
    /// Extensions to pick up. Empty means the configured set.
    pub extensions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub resource: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub category: String,
    pub locale: String,
    pub summaries: Vec<GlobalizationSummary>,
    pub not_globalizable: Vec<String>,
    pub failures: Vec<BatchFailure>,
    /// phrase id -> resources referencing it
    pub phrase_usage: BTreeMap<String, BTreeSet<String>>,
}

impl BatchReport {
    pub fn missing_phrases(&self) -> BTreeSet<&str> {
        self.summaries
            .iter()
            .flat_map(|s| s.missing_phrases.iter().map(String::as_str))
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.summaries.iter().all(|s| s.missing_phrases.is_empty())
    }
}

enum ItemOutcome {
    Globalized(GlobalizationSummary),
    Skipped(String),
    Failed(BatchFailure),
}

impl GlobalizationMerger {
    /// Globalize every resource of `category` for `locale`.
    ///
    /// Per-resource failures are logged and reported; only failures that
    /// affect the whole category (enumeration, dictionary) are returned as
    /// errors.
    pub fn globalize_category(&self, category: &str, locale: &str, options: &BatchOptions) -> Result<BatchReport> {
        let extensions = if options.extensions.is_empty() {
            &self.config().extensions
        } else {
            &options.extensions
        };
        let resources: Vec<(String, ResolvedResource)> = self
            .resolver()
            .list_category(category, locale)?
            .into_iter()
            .filter(|(name, _)| has_extension(name, extensions))
            .collect();
        let dictionary = self.dictionary(locale)?;
        log::debug!("globalizing {} resources of '{category}' for '{locale}'", resources.len());

        let outcomes: Vec<ItemOutcome> = resources
            .par_iter()
            .map(|(name, resolved)| {
                match self.globalize_one(name, resolved, &dictionary, options.output_dir.as_deref()) {
                    Ok(GlobalizeOutcome::Globalized { summary, .. }) => ItemOutcome::Globalized(summary),
                    Ok(GlobalizeOutcome::NotGlobalizable) => ItemOutcome::Skipped(name.clone()),
                    Err(err) => {
                        log::warn!("globalizing '{name}' failed: {err}");
                        ItemOutcome::Failed(BatchFailure {
                            resource: name.clone(),
                            message: err.to_string(),
                        })
                    }
                }
            })
            .collect();

        let mut report = BatchReport {
            category: category.to_string(),
            locale: locale.to_string(),
            ..BatchReport::default()
        };
        for outcome in outcomes {
            match outcome {
                ItemOutcome::Globalized(summary) => {
                    for id in summary
                        .substituted_phrases
                        .iter()
                        .chain(&summary.missing_phrases)
                    {
                        report
                            .phrase_usage
                            .entry(id.clone())
                            .or_default()
                            .insert(summary.resource_name.clone());
                    }
                    report.summaries.push(summary);
                }
                ItemOutcome::Skipped(name) => report.not_globalizable.push(name),
                ItemOutcome::Failed(failure) => report.failures.push(failure),
            }
        }
        Ok(report)
    }

    fn globalize_one(
        &self,
        name: &str,
        resolved: &ResolvedResource,
        dictionary: &Dictionary,
        output_dir: Option<&Path>,
    ) -> Result<GlobalizeOutcome> {
        let source = self
            .resolver()
            .file_system()
            .read_to_string(&resolved.physical_path)?;
        let outcome = self
            .globalize_with(name, &source, dictionary)
            .map_err(|err| match err {
                SageError::ResourceParse { message, .. } => {
                    SageError::parse(&resolved.physical_path, message)
                }
                other => other,
            })?;
        if let (Some(dir), Some(document)) = (output_dir, outcome.document()) {
            let target = dir.join(name);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|err| SageError::io(parent, err))?;
            }
            std::fs::write(&target, document).map_err(|err| SageError::io(&target, err))?;
        }
        Ok(outcome)
    }
}

fn has_extension(name: &str, extensions: &[String]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
