//! Overlay resolution: find the effective file for a logical resource.
//!
//! Layers are searched in precedence order (highest install order first).
//! Within a layer, locale-specific candidates are tried before
//! locale-agnostic ones, and only then does the search move to the next
//! layer. Layer precedence therefore beats specificity: an extension's
//! generic file still overrides a localized file in the base project.

pub mod path;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;

use crate::cache::FileStamp;
use crate::error::{Result, SageError, TriedCandidate};
use crate::fs::{FileSystem, OsFileSystem};
use crate::overlay::{Layer, OverlayRegistry};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResourceRequest {
    pub category: String,
    pub locale: String,
    pub relative_path: String,
}

impl ResourceRequest {
    pub fn new(
        category: impl Into<String>,
        locale: impl Into<String>,
        relative_path: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            locale: locale.into(),
            relative_path: relative_path.into(),
        }
    }

    /// Stable textual key, used for cache keys.
    pub fn key(&self) -> String {
        format!("{}|{}|{}", self.category, self.locale, self.relative_path)
    }
}

impl fmt::Display for ResourceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let or_any = |value: &str| if value.is_empty() { "*" } else { value }.to_string();
        write!(
            f,
            "{}/{}/{}",
            or_any(&self.category),
            or_any(&self.locale),
            self.relative_path
        )
    }
}

/// One physical path the resolver would inspect.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub path: PathBuf,
    pub layer: Arc<Layer>,
    /// The locale this candidate was expanded for, if its template is localized.
    pub locale: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedResource {
    pub physical_path: PathBuf,
    pub layer: Arc<Layer>,
    pub last_modified: SystemTime,
    pub locale: Option<String>,
}

impl ResolvedResource {
    pub fn is_locale_specific(&self) -> bool {
        self.locale.is_some()
    }

    pub fn stamp(&self) -> FileStamp {
        FileStamp::present(self.physical_path.clone(), self.last_modified)
    }
}

/// A resolution plus the state of every candidate looked at on the way.
#[derive(Debug, Clone)]
pub struct TrackedResolution<T> {
    pub resolved: T,
    pub stamps: Vec<FileStamp>,
}

pub struct ResourceResolver {
    registry: Arc<OverlayRegistry>,
    fs: Arc<dyn FileSystem>,
    locale_fallbacks: HashMap<String, Vec<String>>,
}

impl fmt::Debug for ResourceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceResolver")
            .field("registry", &self.registry)
            .field("locale_fallbacks", &self.locale_fallbacks)
            .finish()
    }
}

impl ResourceResolver {
    pub fn new(registry: Arc<OverlayRegistry>) -> Self {
        Self::with_file_system(registry, Arc::new(OsFileSystem))
    }

    pub fn with_file_system(registry: Arc<OverlayRegistry>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            registry,
            fs,
            locale_fallbacks: HashMap::new(),
        }
    }

    /// Locales tried after the requested one, e.g. `de-CH -> [de]`.
    pub fn with_locale_fallbacks(mut self, fallbacks: HashMap<String, Vec<String>>) -> Self {
        self.locale_fallbacks = fallbacks;
        self
    }

    pub fn registry(&self) -> &Arc<OverlayRegistry> {
        &self.registry
    }

    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn locale_chain(&self, locale: &str) -> Vec<String> {
        if locale.is_empty() {
            return Vec::new();
        }
        let mut chain = vec![locale.to_string()];
        if let Some(fallbacks) = self.locale_fallbacks.get(locale) {
            for fallback in fallbacks {
                if !fallback.is_empty() && !chain.contains(fallback) {
                    chain.push(fallback.clone());
                }
            }
        }
        chain
    }

    /// Every physical path `resolve` would try, in order, without touching the disk.
    pub fn candidates(&self, request: &ResourceRequest) -> Result<Vec<Candidate>> {
        path::validate_segment("invalid category", &request.category)?;
        path::validate_segment("invalid locale", &request.locale)?;
        let relative = path::normalize_relative(&request.relative_path)?;
        let chain = self.locale_chain(&request.locale);

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for layer in self.registry.layers_in_order() {
            let localized = layer.templates().iter().filter(|t| t.is_localized());
            for locale in &chain {
                for template in localized.clone() {
                    if let Some(rel) = template.expand(&request.category, locale, &relative) {
                        push_candidate(&mut out, &mut seen, layer, rel, Some(locale));
                    }
                }
            }
            for template in layer.templates().iter().filter(|t| !t.is_localized()) {
                if let Some(rel) = template.expand(&request.category, "", &relative) {
                    push_candidate(&mut out, &mut seen, layer, rel, None);
                }
            }
        }
        Ok(out)
    }

    pub fn resolve(&self, request: &ResourceRequest) -> Result<ResolvedResource> {
        let candidates = self.candidates(request)?;
        for candidate in &candidates {
            if let Some(resolved) = self.check_candidate(candidate)? {
                return Ok(resolved);
            }
        }
        Err(not_found(request, &candidates))
    }

    /// Like [`resolve`](Self::resolve), also returning stamps for every
    /// candidate inspected. Missing higher-precedence candidates are recorded
    /// as absent so a cache entry built from the result goes stale when an
    /// override appears.
    pub fn resolve_tracked(&self, request: &ResourceRequest) -> Result<TrackedResolution<ResolvedResource>> {
        let candidates = self.candidates(request)?;
        let mut stamps = Vec::new();
        for candidate in &candidates {
            match self.check_candidate(candidate)? {
                Some(resolved) => {
                    stamps.push(resolved.stamp());
                    return Ok(TrackedResolution { resolved, stamps });
                }
                None => stamps.push(FileStamp::absent(candidate.path.clone())),
            }
        }
        Err(not_found(request, &candidates))
    }

    /// The best match from every layer that has one, highest precedence first.
    pub fn resolve_all(&self, request: &ResourceRequest) -> Result<Vec<ResolvedResource>> {
        Ok(self.resolve_all_tracked(request)?.resolved)
    }

    pub fn resolve_all_tracked(&self, request: &ResourceRequest) -> Result<TrackedResolution<Vec<ResolvedResource>>> {
        let candidates = self.candidates(request)?;
        let mut resolved: Vec<ResolvedResource> = Vec::new();
        let mut stamps = Vec::new();
        for candidate in &candidates {
            let layer_done = resolved
                .last()
                .is_some_and(|last| Arc::ptr_eq(&last.layer, &candidate.layer));
            if layer_done {
                continue;
            }
            match self.check_candidate(candidate)? {
                Some(found) => {
                    stamps.push(found.stamp());
                    resolved.push(found);
                }
                None => stamps.push(FileStamp::absent(candidate.path.clone())),
            }
        }
        Ok(TrackedResolution { resolved, stamps })
    }

    /// The effective resources of a category: every relative path found in any
    /// layer's category directories, mapped to the file that wins for it.
    pub fn list_category(&self, category: &str, locale: &str) -> Result<BTreeMap<String, ResolvedResource>> {
        path::validate_segment("invalid category", category)?;
        path::validate_segment("invalid locale", locale)?;
        if category.is_empty() {
            return Err(SageError::InvalidPath {
                path: String::new(),
                reason: "a category is required for enumeration",
            });
        }
        let chain = self.locale_chain(locale);

        let mut relative_paths = HashSet::new();
        for layer in self.registry.layers_in_order() {
            for template in layer.templates() {
                if !template.uses(crate::overlay::Variable::Category) {
                    continue;
                }
                let locales: Vec<&str> = if template.is_localized() {
                    chain.iter().map(String::as_str).collect()
                } else {
                    vec![""]
                };
                for loc in locales {
                    let Some(dir) = template.directory(category, loc) else {
                        continue;
                    };
                    let dir = layer.root().join(dir);
                    for file in self.fs.list_files(&dir)? {
                        if let Some(rel) = relative_to(&dir, &file) {
                            relative_paths.insert(rel);
                        }
                    }
                }
            }
        }

        let mut out = BTreeMap::new();
        for rel in relative_paths {
            let request = ResourceRequest::new(category, locale, rel.clone());
            match self.resolve(&request) {
                Ok(resolved) => {
                    out.insert(rel, resolved);
                }
                Err(err) if err.is_not_found() => {
                    log::debug!("'{rel}' listed but no longer resolvable: {err}");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(out)
    }

    fn check_candidate(&self, candidate: &Candidate) -> Result<Option<ResolvedResource>> {
        if !self.fs.is_file(&candidate.path) {
            log::trace!(
                "[{}] miss {}",
                candidate.layer.name(),
                candidate.path.display()
            );
            return Ok(None);
        }
        let modified = self
            .fs
            .last_modified(&candidate.path)
            .map_err(|err| SageError::io(&candidate.path, err))?;
        let Some(last_modified) = modified else {
            // Removed between the two stat calls.
            return Ok(None);
        };
        log::trace!(
            "[{}] match {}",
            candidate.layer.name(),
            candidate.path.display()
        );
        Ok(Some(ResolvedResource {
            physical_path: candidate.path.clone(),
            layer: Arc::clone(&candidate.layer),
            last_modified,
            locale: candidate.locale.clone(),
        }))
    }
}

fn push_candidate(
    out: &mut Vec<Candidate>,
    seen: &mut HashSet<PathBuf>,
    layer: &Arc<Layer>,
    rel: PathBuf,
    locale: Option<&String>,
) {
    let path = layer.root().join(rel);
    if seen.insert(path.clone()) {
        out.push(Candidate {
            path,
            layer: Arc::clone(layer),
            locale: locale.cloned(),
        });
    }
}

fn not_found(request: &ResourceRequest, candidates: &[Candidate]) -> SageError {
    log::debug!(
        "no layer produced '{request}' ({} candidates)",
        candidates.len()
    );
    SageError::ResourceNotFound {
        request: request.clone(),
        tried: candidates
            .iter()
            .map(|candidate| TriedCandidate { layer: candidate.layer.name().to_string(), path: candidate.path.clone() })
            .collect::<Vec<_>>()
            .into(),
    }
}

fn relative_to(dir: &Path, file: &Path) -> Option<String> {
    let rel = file.strip_prefix(dir).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_str().map(str::to_string))
        .collect::<Option<_>>()?;
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
