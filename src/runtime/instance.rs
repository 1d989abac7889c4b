use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::activation::{
    ActivationRequest, ActivationScope, CriticalSection, RequestOutcome, Target,
};
use crate::dispatch;
use crate::error::LayerResult;
use crate::registry::{BaseMethod, Class};
use crate::types::{InstanceId, LayerName};

/// An instance of a registered class: the value, its identity and its own
/// activation scope.
pub struct Layered<T> {
    id: InstanceId,
    class: Arc<Class<T>>,
    scope: ActivationScope,
    value: T,
}

impl<T> Layered<T> {
    pub(crate) fn new(class: Arc<Class<T>>, value: T) -> Self {
        let id = InstanceId::new();
        Self { id, class, scope: ActivationScope::new(Target::Instance(id)), value }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn class(&self) -> &Arc<Class<T>> {
        &self.class
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    /// This instance's activation scope.
    pub fn scope(&self) -> &ActivationScope {
        &self.scope
    }
}

impl<T: 'static> Layered<T> {
    /// Activate `layer` for this instance only. The layer must be attached to
    /// some base method of the instance's class.
    pub fn activate(&self, layer: impl Into<LayerName>) -> LayerResult<RequestOutcome> {
        let request = ActivationRequest::activate(layer);
        self.class.shared().request(&self.scope, self.class.as_ref(), request)
    }

    pub fn deactivate(&self, layer: impl Into<LayerName>) -> LayerResult<RequestOutcome> {
        let request = ActivationRequest::deactivate(layer);
        self.class.shared().request(&self.scope, self.class.as_ref(), request)
    }

    /// Layers active on this instance only, in activation order.
    pub fn active_layers(&self) -> Vec<LayerName> {
        self.scope.active_layers()
    }

    /// Global and instance layers as dispatch would combine them now.
    pub fn effective_stack(&self) -> Vec<LayerName> {
        let instance = self.scope.snapshot();
        let global = match instance.frozen_global {
            Some(frozen) => frozen,
            None => self.class.shared().global.active_layers(),
        };
        dispatch::effective_stack(&global, &instance.entries)
    }

    /// Batch activation changes on this instance until the guard is dropped.
    /// The global view seen by this instance is frozen for the same duration.
    pub fn critical(&self) -> CriticalSection<'_> {
        let shared = self.class.shared();
        CriticalSection::open(&self.scope, self.class.as_ref(), shared, Some(&shared.global))
    }

    /// Call a base method through its active layers.
    pub fn call<A: 'static, R: 'static>(
        &self,
        method: &BaseMethod<T, A, R>,
        args: A,
    ) -> LayerResult<R> {
        dispatch::dispatch(self, method, args)
    }

    /// Layer names `method` would run on this instance, in execution order.
    pub fn chain_for<A: 'static, R: 'static>(
        &self,
        method: &BaseMethod<T, A, R>,
    ) -> LayerResult<Vec<LayerName>> {
        Ok(dispatch::resolve(self, method)?.layer_names())
    }
}

impl<T> Deref for Layered<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Layered<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layered")
            .field("id", &self.id)
            .field("class", self.class.name())
            .field("value", &self.value)
            .finish()
    }
}
