use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::Frame;
use crate::error::{LayerError, LayerResult};
use crate::registry::{Implementation, Layer};
use crate::runtime::Layered;
use crate::types::LayerName;

/// Global entries followed by instance entries, each in activation order.
/// A name active in both scopes keeps only its instance position.
pub fn effective_stack(global: &[LayerName], instance: &[LayerName]) -> Vec<LayerName> {
    let local: HashSet<&LayerName> = instance.iter().collect();
    global.iter().filter(|name| !local.contains(name)).chain(instance.iter()).cloned().collect()
}

struct Step<T, A, R> {
    layer: Option<LayerName>,
    implementation: Implementation<T, A, R>,
}

/// The resolved sequence for one call: matching layers,
/// most-recently-activated first, then the base implementation.
pub struct CallChain<T, A, R> {
    method: Arc<str>,
    steps: Vec<Step<T, A, R>>,
}

impl<T, A, R> CallChain<T, A, R> {
    /// Build the chain for `effective` from the attached `layers`.
    pub(crate) fn resolve(
        method: Arc<str>,
        layers: &[Arc<Layer<T, A, R>>],
        base: &Implementation<T, A, R>,
        effective: &[LayerName],
    ) -> Self {
        let mut steps: Vec<Step<T, A, R>> = effective
            .iter()
            .rev()
            .filter_map(|active| layers.iter().find(|layer| layer.name() == active))
            .map(|layer| Step {
                layer: Some(layer.name().clone()),
                implementation: layer.implementation().clone(),
            })
            .collect();
        steps.push(Step { layer: None, implementation: base.clone() });

        Self { method, steps }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Number of steps, the base implementation included.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Layer names in execution order (the base implementation is omitted).
    pub fn layer_names(&self) -> Vec<LayerName> {
        self.steps.iter().filter_map(|step| step.layer.clone()).collect()
    }

    pub(crate) fn layer_at(&self, position: usize) -> Option<&LayerName> {
        self.steps.get(position).and_then(|step| step.layer.as_ref())
    }

    /// Run the chain from `position` with `args`.
    pub(crate) fn invoke(&self, object: &Layered<T>, position: usize, args: A) -> LayerResult<R> {
        let step = self
            .steps
            .get(position)
            .ok_or_else(|| LayerError::ChainExhausted { method: self.method.to_string() })?;

        let frame = Frame::new(object, self, position);
        (step.implementation)(&frame, args)
    }
}

impl<T, A, R> fmt::Debug for CallChain<T, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallChain")
            .field("method", &self.method)
            .field("layers", &self.layer_names())
            .finish()
    }
}
