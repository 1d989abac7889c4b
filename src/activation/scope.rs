use std::fmt;
use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use super::stack::ActivationStack;
use crate::config::UnknownLayerPolicy;
use crate::error::{LayerError, LayerResult};
use crate::registry::LayerCatalog;
use crate::types::{InstanceId, LayerName};

/// Which activation stack a request is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    Global,
    Instance(InstanceId),
}

impl Target {
    /// Metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Target::Global => "global",
            Target::Instance(_) => "instance",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Global => write!(f, "global"),
            Target::Instance(id) => write!(f, "instance:{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Activate,
    Deactivate,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Activate => "activate",
            RequestKind::Deactivate => "deactivate",
        }
    }
}

/// One activate/deactivate request, as buffered by a critical section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationRequest {
    pub kind: RequestKind,
    pub layer: LayerName,
}

impl ActivationRequest {
    pub fn activate(layer: impl Into<LayerName>) -> Self {
        Self { kind: RequestKind::Activate, layer: layer.into() }
    }

    pub fn deactivate(layer: impl Into<LayerName>) -> Self {
        Self { kind: RequestKind::Deactivate, layer: layer.into() }
    }
}

/// What an activate/deactivate call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestOutcome {
    /// The stack changed.
    Applied,
    /// Already in the requested state.
    Unchanged,
    /// Buffered by an open critical section.
    Queued,
    /// Unknown layer dropped under [`UnknownLayerPolicy::Ignore`].
    Ignored,
}

impl RequestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestOutcome::Applied => "applied",
            RequestOutcome::Unchanged => "unchanged",
            RequestOutcome::Queued => "queued",
            RequestOutcome::Ignored => "ignored",
        }
    }
}

/// Checks layer names against the layers a catalog knows.
pub(crate) struct Validator<'a> {
    catalog: &'a dyn LayerCatalog,
    policy: UnknownLayerPolicy,
}

enum Verdict {
    Known,
    Ignore,
    Reject,
}

impl<'a> Validator<'a> {
    pub(crate) fn new(catalog: &'a dyn LayerCatalog, policy: UnknownLayerPolicy) -> Self {
        Self { catalog, policy }
    }

    fn verdict(&self, layer: &LayerName) -> Verdict {
        if self.catalog.knows_layer(layer) {
            return Verdict::Known;
        }
        match self.policy {
            UnknownLayerPolicy::Reject => Verdict::Reject,
            UnknownLayerPolicy::Ignore => Verdict::Ignore,
        }
    }
}

/// Consistent read of one scope, taken at dispatch time.
#[derive(Debug, Clone)]
pub(crate) struct ScopeSnapshot {
    pub(crate) entries: Vec<LayerName>,
    pub(crate) generation: u64,
    /// Global entries captured when an instance critical section opened.
    pub(crate) frozen_global: Option<Vec<LayerName>>,
}

/// Result of leaving a critical section.
#[derive(Debug)]
pub(crate) enum CriticalExit {
    /// An enclosing section on the same scope is still open.
    Nested { depth: usize },
    Flushed { requests: usize, changed: bool, rejected: Vec<LayerName> },
}

#[derive(Debug, Default)]
struct ScopeState {
    stack: ActivationStack,
    generation: u64,
    critical_depth: usize,
    pending: Vec<ActivationRequest>,
    frozen_global: Option<Vec<LayerName>>,
}

impl ScopeState {
    fn apply(&mut self, request: &ActivationRequest) -> bool {
        let changed = match request.kind {
            RequestKind::Activate => self.stack.activate(&request.layer),
            RequestKind::Deactivate => self.stack.deactivate(&request.layer),
        };
        if changed {
            self.generation += 1;
        }
        changed
    }
}

/// Activation state of one target, guarded by its own lock.
#[derive(Debug)]
pub struct ActivationScope {
    target: Target,
    state: Mutex<ScopeState>,
}

impl ActivationScope {
    pub(crate) fn new(target: Target) -> Self {
        Self { target, state: Mutex::new(ScopeState::default()) }
    }

    fn lock(&self) -> MutexGuard<'_, ScopeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// Active layer names in activation order.
    pub fn active_layers(&self) -> Vec<LayerName> {
        self.lock().stack.as_slice().to_vec()
    }

    pub fn is_active(&self, layer: &LayerName) -> bool {
        self.lock().stack.contains(layer)
    }

    pub fn is_critical(&self) -> bool {
        self.lock().critical_depth > 0
    }

    /// Requests buffered by the open critical section, oldest first.
    pub fn pending(&self) -> Vec<ActivationRequest> {
        self.lock().pending.clone()
    }

    pub(crate) fn snapshot(&self) -> ScopeSnapshot {
        let state = self.lock();
        ScopeSnapshot {
            entries: state.stack.as_slice().to_vec(),
            generation: state.generation,
            frozen_global: state.frozen_global.clone(),
        }
    }

    pub(crate) fn request(
        &self,
        request: ActivationRequest,
        validator: &Validator<'_>,
    ) -> LayerResult<RequestOutcome> {
        let mut state = self.lock();

        if state.critical_depth > 0 {
            state.pending.push(request);
            return Ok(RequestOutcome::Queued);
        }

        match validator.verdict(&request.layer) {
            Verdict::Reject => Err(LayerError::UnknownLayer(request.layer)),
            Verdict::Ignore => Ok(RequestOutcome::Ignored),
            Verdict::Known if state.apply(&request) => Ok(RequestOutcome::Applied),
            Verdict::Known => Ok(RequestOutcome::Unchanged),
        }
    }

    /// Open (or re-enter) a critical section. When this opens the outermost
    /// section, the entries of `freeze` are captured under this scope's lock.
    /// Lock order is instance scope, then global scope.
    pub(crate) fn enter_critical(&self, freeze: Option<&ActivationScope>) -> usize {
        let mut state = self.lock();
        state.critical_depth += 1;
        if state.critical_depth == 1 {
            state.frozen_global = freeze.map(ActivationScope::active_layers);
        }
        state.critical_depth
    }

    /// Leave a critical section; the outermost exit applies the queue in FIFO
    /// order while holding the lock.
    pub(crate) fn exit_critical(&self, validator: &Validator<'_>) -> CriticalExit {
        let mut state = self.lock();
        state.critical_depth = state.critical_depth.saturating_sub(1);
        if state.critical_depth > 0 {
            return CriticalExit::Nested { depth: state.critical_depth };
        }

        let pending = mem::take(&mut state.pending);
        state.frozen_global = None;

        let mut changed = false;
        let mut rejected = Vec::new();
        for request in &pending {
            match validator.verdict(&request.layer) {
                Verdict::Known => changed |= state.apply(request),
                Verdict::Ignore => {}
                Verdict::Reject => rejected.push(request.layer.clone()),
            }
        }

        CriticalExit::Flushed { requests: pending.len(), changed, rejected }
    }
}
