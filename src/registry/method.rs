use std::any::Any;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use crate::dispatch::{ChainCache, Frame};
use crate::error::LayerResult;
use crate::types::{ClassName, LayerName, MethodId};

/// A base or layer implementation: receives the call frame and the arguments.
pub type Implementation<T, A, R> =
    Arc<dyn Fn(&Frame<'_, T, A, R>, A) -> LayerResult<R> + Send + Sync>;

/// An alternate implementation attached to one base method under a name.
pub struct Layer<T, A, R> {
    name: LayerName,
    method: Arc<str>,
    implementation: Implementation<T, A, R>,
}

impl<T, A, R> Layer<T, A, R> {
    pub fn name(&self) -> &LayerName {
        &self.name
    }

    /// Name of the base method this layer is attached to.
    pub fn method(&self) -> &str {
        &self.method
    }

    pub(crate) fn implementation(&self) -> &Implementation<T, A, R> {
        &self.implementation
    }
}

impl<T, A, R> fmt::Debug for Layer<T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer").field("name", &self.name).field("method", &self.method).finish()
    }
}

/// Attached layers in attachment order, with a revision bumped on every change.
pub(crate) struct LayerTable<T, A, R> {
    pub(crate) layers: Vec<Arc<Layer<T, A, R>>>,
    pub(crate) revision: u64,
}

pub(crate) struct MethodSlot<T, A, R> {
    id: MethodId,
    class: ClassName,
    name: Arc<str>,
    base: Implementation<T, A, R>,
    table: RwLock<LayerTable<T, A, R>>,
    cache: ChainCache<T, A, R>,
}

impl<T: 'static, A: 'static, R: 'static> MethodSlot<T, A, R> {
    pub(crate) fn new(
        class: ClassName,
        name: &str,
        base: Implementation<T, A, R>,
        cache: ChainCache<T, A, R>,
    ) -> Self {
        Self {
            id: MethodId::next(),
            class,
            name: Arc::from(name),
            base,
            table: RwLock::new(LayerTable { layers: Vec::new(), revision: 0 }),
            cache,
        }
    }

    pub(crate) fn id(&self) -> MethodId {
        self.id
    }

    pub(crate) fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub(crate) fn base(&self) -> &Implementation<T, A, R> {
        &self.base
    }

    pub(crate) fn cache(&self) -> &ChainCache<T, A, R> {
        &self.cache
    }

    pub(crate) fn table(&self) -> RwLockReadGuard<'_, LayerTable<T, A, R>> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a layer. An existing layer with the same name is replaced in
    /// place; the returned flag tells whether that happened.
    pub(crate) fn attach(
        &self,
        name: LayerName,
        implementation: Implementation<T, A, R>,
    ) -> (Arc<Layer<T, A, R>>, bool) {
        let layer = Arc::new(Layer { name, method: self.name.clone(), implementation });
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);

        let replaced = match table.layers.iter().position(|existing| existing.name == layer.name) {
            Some(index) => {
                table.layers[index] = layer.clone();
                true
            }
            None => {
                table.layers.push(layer.clone());
                false
            }
        };
        table.revision += 1;

        (layer, replaced)
    }
}

/// Type-erased view of a base method, as stored in its class.
pub(crate) trait ErasedMethod: Send + Sync {
    fn id(&self) -> MethodId;
    fn has_layer(&self, layer: &LayerName) -> bool;
    fn layer_names(&self) -> Vec<LayerName>;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: 'static, A: 'static, R: 'static> ErasedMethod for MethodSlot<T, A, R> {
    fn id(&self) -> MethodId {
        self.id
    }

    fn has_layer(&self, layer: &LayerName) -> bool {
        self.table().layers.iter().any(|attached| attached.name() == layer)
    }

    fn layer_names(&self) -> Vec<LayerName> {
        self.table().layers.iter().map(|attached| attached.name().clone()).collect()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Handle to a declared base method of a class with receiver `T`,
/// arguments `A` and result `R`.
pub struct BaseMethod<T, A, R> {
    slot: Arc<MethodSlot<T, A, R>>,
}

impl<T: 'static, A: 'static, R: 'static> BaseMethod<T, A, R> {
    pub(crate) fn from_slot(slot: Arc<MethodSlot<T, A, R>>) -> Self {
        Self { slot }
    }

    pub(crate) fn slot(&self) -> &MethodSlot<T, A, R> {
        &self.slot
    }

    pub fn name(&self) -> &str {
        &self.slot.name
    }

    pub fn class(&self) -> &ClassName {
        &self.slot.class
    }

    /// Attached layers in attachment order.
    pub fn layers(&self) -> Vec<Arc<Layer<T, A, R>>> {
        self.slot.table().layers.clone()
    }

    pub fn has_layer(&self, layer: &LayerName) -> bool {
        self.slot.has_layer(layer)
    }

    /// Bumped on every attachment.
    pub fn revision(&self) -> u64 {
        self.slot.table().revision
    }
}

impl<T, A, R> Clone for BaseMethod<T, A, R> {
    fn clone(&self) -> Self {
        Self { slot: self.slot.clone() }
    }
}

impl<T, A, R> fmt::Debug for BaseMethod<T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseMethod")
            .field("class", &self.slot.class)
            .field("name", &self.slot.name)
            .finish()
    }
}
