use tracing::{debug, trace, warn};

use super::scope::{ActivationRequest, ActivationScope, CriticalExit, Target};
use crate::error::{LayerError, LayerResult};
use crate::registry::LayerCatalog;
use crate::runtime::Shared;

/// Guard batching activation requests on one target.
///
/// While open, activate/deactivate calls against the target are queued.
/// The queue is applied in FIFO order when the outermost section on the
/// target closes, either through [`finish`](Self::finish) or on drop
/// (unwinding included). Calls on the target keep observing the state from
/// before the section opened.
#[must_use = "the section closes as soon as the guard is dropped"]
pub struct CriticalSection<'a> {
    scope: &'a ActivationScope,
    catalog: &'a dyn LayerCatalog,
    shared: &'a Shared,
    depth: usize,
    finished: bool,
}

impl<'a> CriticalSection<'a> {
    pub(crate) fn open(
        scope: &'a ActivationScope,
        catalog: &'a dyn LayerCatalog,
        shared: &'a Shared,
        freeze: Option<&ActivationScope>,
    ) -> Self {
        let depth = scope.enter_critical(freeze);
        trace!(scope = %scope.target(), depth, "Critical section opened");
        Self { scope, catalog, shared, depth, finished: false }
    }

    pub fn target(&self) -> Target {
        self.scope.target()
    }

    /// Nesting depth of this section on its target, starting at 1.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Requests queued so far, oldest first.
    pub fn pending(&self) -> Vec<ActivationRequest> {
        self.scope.pending()
    }

    /// Close the section, reporting queued requests that named unknown layers.
    pub fn finish(mut self) -> LayerResult<()> {
        self.finished = true;
        self.flush()
    }

    fn flush(&self) -> LayerResult<()> {
        let target = self.scope.target();
        let validator = self.shared.validator(self.catalog);

        match self.scope.exit_critical(&validator) {
            CriticalExit::Nested { depth } => {
                trace!(scope = %target, depth, "Nested critical section closed");
                Ok(())
            }
            CriticalExit::Flushed { requests, changed, rejected } => {
                self.shared.metrics.record_critical_flush(target.kind());
                debug!(
                    scope = %target,
                    requests,
                    changed,
                    rejected = rejected.len(),
                    "Critical section flushed"
                );
                if rejected.is_empty() { Ok(()) } else { Err(LayerError::FlushRejected(rejected)) }
            }
        }
    }
}

impl Drop for CriticalSection<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(err) = self.flush() {
            warn!(scope = %self.scope.target(), error = %err, "Critical section flush failed");
        }
    }
}
