use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Result, SageError};
use crate::overlay::template::PathTemplate;

/// A named root directory that supplies or overrides resources.
#[derive(Debug, Clone)]
pub struct Layer {
    name: String,
    root: PathBuf,
    install_order: i64,
    templates: Option<Vec<PathTemplate>>,
}

impl Layer {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>, install_order: i64) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            install_order,
            templates: None,
        }
    }

    /// Replace the registry-wide templates for this layer only.
    pub fn with_templates(mut self, templates: Vec<PathTemplate>) -> Self {
        self.templates = Some(templates);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn install_order(&self) -> i64 {
        self.install_order
    }

    pub fn templates(&self) -> &[PathTemplate] {
        self.templates.as_deref().unwrap_or(&[])
    }
}

impl PartialEq for Layer {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.root == other.root
            && self.install_order == other.install_order
    }
}

impl Eq for Layer {}

/// Layers collected at startup; frozen into an [`OverlayRegistry`] by `finalize`.
#[derive(Debug, Default)]
pub struct PendingRegistry {
    layers: Vec<Layer>,
    templates: Option<Vec<PathTemplate>>,
}

impl PendingRegistry {
    pub fn register(&mut self, layer: Layer) -> &mut Self {
        self.layers.push(layer);
        self
    }

    /// Templates used by layers that don't carry their own.
    pub fn templates(&mut self, templates: Vec<PathTemplate>) -> &mut Self {
        self.templates = Some(templates);
        self
    }

    pub fn finalize(self) -> Result<OverlayRegistry> {
        let mut names = HashSet::new();
        let mut orders = HashSet::new();
        for layer in &self.layers {
            if !names.insert(layer.name.as_str()) {
                return Err(SageError::configuration(format!(
                    "duplicate layer name '{}'",
                    layer.name
                )));
            }
            if !orders.insert(layer.install_order) {
                return Err(SageError::configuration(format!(
                    "layer '{}' reuses install order {}",
                    layer.name, layer.install_order
                )));
            }
        }

        let defaults = match self.templates {
            Some(templates) if !templates.is_empty() => templates,
            Some(_) => {
                return Err(SageError::configuration(
                    "registry template list must not be empty",
                ))
            }
            None => PathTemplate::defaults()?,
        };

        let mut layers = self.layers;
        layers.sort_by(|a, b| b.install_order.cmp(&a.install_order));

        let mut frozen = Vec::with_capacity(layers.len());
        for mut layer in layers {
            match &layer.templates {
                Some(own) if own.is_empty() => {
                    return Err(SageError::configuration(format!(
                        "layer '{}' declares an empty template list",
                        layer.name
                    )));
                }
                Some(_) => {}
                None => layer.templates = Some(defaults.clone()),
            }
            if !layer.root.is_dir() {
                log::warn!("layer '{}' root {} is not a directory; it will never match", layer.name, layer.root.display());
            }
            log::debug!(
                "layer '{}' (order {}) at {}",
                layer.name,
                layer.install_order,
                layer.root.display()
            );
            frozen.push(Arc::new(layer));
        }

        Ok(OverlayRegistry { layers: frozen })
    }
}

/// The frozen, precedence-ordered layer list. Immutable once built.
#[derive(Debug, Clone)]
pub struct OverlayRegistry {
    layers: Vec<Arc<Layer>>,
}

impl OverlayRegistry {
    pub fn builder() -> PendingRegistry {
        PendingRegistry::default()
    }

    /// Most specific layer first.
    pub fn layers_in_order(&self) -> &[Arc<Layer>] {
        &self.layers
    }

    pub fn layer(&self, name: &str) -> Option<&Arc<Layer>> {
        self.layers.iter().find(|layer| layer.name == name)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
