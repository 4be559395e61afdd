use std::path::PathBuf;
use std::sync::Arc;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::cache::{DependencyCache, Loaded};
use crate::error::{Result, SageError};
use crate::resolver::{ResourceRequest, ResourceResolver};

/// A resolved, well-formed XML resource (view, stylesheet, configuration).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlResource {
    pub physical_path: PathBuf,
    pub layer: String,
    pub root_element: String,
    pub text: String,
}

/// Loads XML resources through the overlay and keeps them in a
/// [`DependencyCache`] until a file they came from changes.
#[derive(Debug)]
pub struct ResourceLoader {
    resolver: Arc<ResourceResolver>,
    cache: Arc<DependencyCache<XmlResource>>,
}

impl ResourceLoader {
    pub fn new(resolver: Arc<ResourceResolver>, cache: Arc<DependencyCache<XmlResource>>) -> Self {
        Self { resolver, cache }
    }

    pub fn cache(&self) -> &Arc<DependencyCache<XmlResource>> {
        &self.cache
    }

    pub fn load_xml(&self, request: &ResourceRequest) -> Result<Arc<XmlResource>> {
        let key = format!("xml:{}", request.key());
        self.cache.get_or_load(&key, || {
            let tracked = self.resolver.resolve_tracked(request)?;
            let resolved = tracked.resolved;
            let text = self
                .resolver
                .file_system()
                .read_to_string(&resolved.physical_path)?;
            let root_element = root_element(&text)
                .map_err(|message| SageError::parse(&resolved.physical_path, message))?;
            log::debug!(
                "loaded {} from layer '{}'",
                resolved.physical_path.display(),
                resolved.layer.name()
            );
            Ok(Loaded::new(XmlResource {
                physical_path: resolved.physical_path.clone(),
                layer: resolved.layer.name().to_string(),
                root_element,
                text,
            })
            .with_dependencies(tracked.stamps))
        })
    }
}

/// Check that `text` is well-formed and return the name of its root element.
pub fn root_element(text: &str) -> std::result::Result<String, String> {
    let mut reader = Reader::from_str(text);
    let mut root = None;
    let mut depth = 0usize;
    loop {
        let event = reader
            .read_event()
            .map_err(|err| format!("{err} at byte {}", reader.error_position()))?;
        match event {
            Event::Start(e) => {
                if depth == 0 {
                    if root.is_some() {
                        return Err("multiple root elements".to_string());
                    }
                    root = Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 0 {
                    if root.is_some() {
                        return Err("multiple root elements".to_string());
                    }
                    root = Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                }
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Text(t) if depth == 0 => {
                let content = t
                    .unescape()
                    .map_err(|err| format!("{err} at byte {}", reader.buffer_position()))?;
                if !content.trim().is_empty() {
                    return Err("text outside the root element".to_string());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unexpected end of document".to_string());
    }
    root.ok_or_else(|| "document has no root element".to_string())
}
