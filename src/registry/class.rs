use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use super::LayerCatalog;
use super::method::{BaseMethod, ErasedMethod, Layer, MethodSlot};
use crate::dispatch::{ChainCache, Frame};
use crate::error::{LayerError, LayerResult};
use crate::runtime::{Layered, Shared};
use crate::types::{ClassName, LayerName};

/// A registered class: its base methods and the layers attached to them.
///
/// Created by [`LayerRuntime::define_class`](crate::runtime::LayerRuntime::define_class).
/// Layer tables are per class, so two classes may use the same layer name
/// for unrelated methods.
pub struct Class<T> {
    name: ClassName,
    methods: RwLock<HashMap<String, Arc<dyn ErasedMethod>>>,
    shared: Arc<Shared>,
    _receiver: PhantomData<fn(&T)>,
}

impl<T> Class<T> {
    pub(crate) fn new(name: ClassName, shared: Arc<Shared>) -> Self {
        Self { name, methods: RwLock::new(HashMap::new()), shared, _receiver: PhantomData }
    }

    pub fn name(&self) -> &ClassName {
        &self.name
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }

    fn duplicate_base(&self, method: &str) -> LayerError {
        LayerError::DuplicateBase { class: self.name.clone(), method: method.to_string() }
    }

    fn unknown_base(&self, method: &str) -> LayerError {
        LayerError::UnknownBase { class: self.name.clone(), method: method.to_string() }
    }

    fn mismatch(&self, method: &str) -> LayerError {
        LayerError::SignatureMismatch { class: self.name.clone(), method: method.to_string() }
    }
}

impl<T: 'static> Class<T> {
    /// Declare a base method. Fails with `DuplicateBase` if `method` is
    /// already declared on this class.
    pub fn declare_base<A, R, F>(
        &self,
        method: &str,
        implementation: F,
    ) -> LayerResult<BaseMethod<T, A, R>>
    where
        A: 'static,
        R: 'static,
        F: Fn(&Frame<'_, T, A, R>, A) -> LayerResult<R> + Send + Sync + 'static,
    {
        let mut methods = self.methods.write().unwrap_or_else(PoisonError::into_inner);
        if methods.contains_key(method) {
            return Err(self.duplicate_base(method));
        }

        let slot = Arc::new(MethodSlot::new(
            self.name.clone(),
            method,
            Arc::new(implementation),
            ChainCache::new(&self.shared.config.cache),
        ));
        methods.insert(method.to_string(), slot.clone());
        debug!(class = %self.name, method, "Base method declared");

        Ok(BaseMethod::from_slot(slot))
    }

    /// Attach a layer to a base method of this class. A layer already
    /// attached under the same name is replaced, keeping its position.
    pub fn attach_layer<A, R, F>(
        &self,
        method: &BaseMethod<T, A, R>,
        layer: impl Into<LayerName>,
        implementation: F,
    ) -> LayerResult<Arc<Layer<T, A, R>>>
    where
        A: 'static,
        R: 'static,
        F: Fn(&Frame<'_, T, A, R>, A) -> LayerResult<R> + Send + Sync + 'static,
    {
        self.ensure_owns(method)?;

        let (attached, replaced) = method.slot().attach(layer.into(), Arc::new(implementation));
        debug!(
            class = %self.name,
            method = method.name(),
            layer = %attached.name(),
            replaced,
            "Layer attached"
        );

        Ok(attached)
    }

    /// Layers attached to `method`, in attachment order.
    pub fn layers_for<A: 'static, R: 'static>(
        &self,
        method: &BaseMethod<T, A, R>,
    ) -> LayerResult<Vec<Arc<Layer<T, A, R>>>> {
        self.ensure_owns(method)?;
        Ok(method.layers())
    }

    /// Look a declared base method up by name.
    pub fn base_method<A: 'static, R: 'static>(
        &self,
        method: &str,
    ) -> LayerResult<BaseMethod<T, A, R>> {
        let erased = self
            .methods
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(method)
            .cloned()
            .ok_or_else(|| self.unknown_base(method))?;

        let any = erased.into_any();
        let slot = any.downcast::<MethodSlot<T, A, R>>().map_err(|_| self.mismatch(method))?;

        Ok(BaseMethod::from_slot(slot))
    }

    /// Declared base method names, sorted.
    pub fn method_names(&self) -> Vec<String> {
        let methods = self.methods.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = methods.keys().cloned().collect();
        names.sort();
        names
    }

    /// Every layer name attached to any base method of this class.
    pub fn layer_names(&self) -> BTreeSet<LayerName> {
        let methods = self.methods.read().unwrap_or_else(PoisonError::into_inner);
        methods.values().flat_map(|method| method.layer_names()).collect()
    }

    /// Wrap `value` as an instance of this class with an empty activation stack.
    pub fn instantiate(self: &Arc<Self>, value: T) -> Layered<T> {
        Layered::new(self.clone(), value)
    }

    pub(crate) fn ensure_owns<A: 'static, R: 'static>(
        &self,
        method: &BaseMethod<T, A, R>,
    ) -> LayerResult<()> {
        let methods = self.methods.read().unwrap_or_else(PoisonError::into_inner);
        match methods.get(method.name()) {
            Some(declared) if declared.id() == method.slot().id() => Ok(()),
            _ => Err(self.unknown_base(method.name())),
        }
    }
}

impl<T: 'static> LayerCatalog for Class<T> {
    fn knows_layer(&self, layer: &LayerName) -> bool {
        let methods = self.methods.read().unwrap_or_else(PoisonError::into_inner);
        methods.values().any(|method| method.has_layer(layer))
    }
}

impl<T> fmt::Debug for Class<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class").field("name", &self.name).finish_non_exhaustive()
    }
}
