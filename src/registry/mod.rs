//! Registration of classes, base methods and the layers attached to them.
//!
//! Registration is append-only: base methods are declared once per class and
//! layers are attached (or replaced by name) for the lifetime of the runtime.

mod class;
mod method;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[cfg(any(test, feature = "mockall"))]
use mockall::automock;
use tracing::debug;

use crate::error::{LayerError, LayerResult};
use crate::types::{ClassName, LayerName};

pub use class::Class;
pub use method::{BaseMethod, Implementation, Layer};

/// Answers whether a layer name is carried by any registered base method.
#[cfg_attr(any(test, feature = "mockall"), automock)]
pub trait LayerCatalog: Send + Sync {
    fn knows_layer(&self, layer: &LayerName) -> bool;
}

/// Process-wide table of registered classes.
#[derive(Default)]
pub struct LayerRegistry {
    classes: RwLock<HashMap<ClassName, Arc<dyn LayerCatalog>>>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(
        &self,
        name: ClassName,
        class: Arc<dyn LayerCatalog>,
    ) -> LayerResult<()> {
        let mut classes = self.classes.write().unwrap_or_else(PoisonError::into_inner);
        if classes.contains_key(&name) {
            return Err(LayerError::DuplicateClass(name));
        }
        debug!(class = %name, "Class registered");
        classes.insert(name, class);
        Ok(())
    }

    pub fn contains(&self, name: &ClassName) -> bool {
        self.classes.read().unwrap_or_else(PoisonError::into_inner).contains_key(name)
    }

    /// Registered class names, sorted.
    pub fn class_names(&self) -> Vec<ClassName> {
        let classes = self.classes.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<ClassName> = classes.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.classes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LayerCatalog for LayerRegistry {
    fn knows_layer(&self, layer: &LayerName) -> bool {
        let classes = self.classes.read().unwrap_or_else(PoisonError::into_inner);
        classes.values().any(|class| class.knows_layer(layer))
    }
}
