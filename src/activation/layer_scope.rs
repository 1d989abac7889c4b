use tracing::warn;

use super::RequestOutcome;
use crate::error::LayerResult;
use crate::runtime::LayerRuntime;
use crate::types::LayerName;

/// Guard keeping one layer globally active.
///
/// Dropping the guard deactivates the layer exactly once, whether the scope
/// ends normally, through `?` or by unwinding. There is no nest counting: a
/// layer that was already active before the guard is deactivated all the same.
#[must_use = "the layer is deactivated as soon as the guard is dropped"]
pub struct LayerScope<'a> {
    runtime: &'a LayerRuntime,
    layer: LayerName,
    outcome: RequestOutcome,
}

impl<'a> LayerScope<'a> {
    pub(crate) fn enter(runtime: &'a LayerRuntime, layer: LayerName) -> LayerResult<Self> {
        let outcome = runtime.activate(layer.clone())?;
        Ok(Self { runtime, layer, outcome })
    }

    pub fn layer(&self) -> &LayerName {
        &self.layer
    }

    /// Outcome of the activation made on entry.
    pub fn outcome(&self) -> RequestOutcome {
        self.outcome
    }
}

impl Drop for LayerScope<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.runtime.deactivate(self.layer.clone()) {
            warn!(layer = %self.layer, error = %err, "Failed to deactivate scoped layer");
        }
    }
}
