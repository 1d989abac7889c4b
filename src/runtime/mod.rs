//! The process-wide layering runtime.
//!
//! A [`LayerRuntime`] owns the global activation scope, the class registry,
//! configuration and metrics. [`LayerRuntime::global`] is the lazily created
//! process singleton; [`LayerRuntime::new`] builds isolated runtimes.

mod instance;

use std::sync::{Arc, OnceLock};

use prometheus::Registry;
use tracing::{debug, warn};

use crate::activation::{
    ActivationRequest, ActivationScope, CriticalSection, LayerScope, RequestOutcome, Target,
    Validator,
};
use crate::config::Config;
use crate::error::LayerResult;
use crate::metrics::LayerMetrics;
use crate::registry::{Class, LayerCatalog, LayerRegistry};
use crate::types::{ClassName, LayerName};

pub use instance::Layered;

static GLOBAL_RUNTIME: OnceLock<LayerRuntime> = OnceLock::new();

/// State reachable from every class and instance of a runtime.
pub(crate) struct Shared {
    pub(crate) global: ActivationScope,
    pub(crate) config: Config,
    pub(crate) metrics: LayerMetrics,
}

impl Shared {
    /// Validate and apply (or queue) one request against `scope`.
    pub(crate) fn request(
        &self,
        scope: &ActivationScope,
        catalog: &dyn LayerCatalog,
        request: ActivationRequest,
    ) -> LayerResult<RequestOutcome> {
        let validator = Validator::new(catalog, self.config.activation.unknown_layer);
        let target = scope.target();
        let action = request.kind.as_str();
        let layer = request.layer.clone();

        let result = scope.request(request, &validator);
        let outcome = match &result {
            Ok(outcome) => outcome.as_str(),
            Err(_) => "rejected",
        };
        self.metrics.record_activation(target.kind(), action, outcome);
        debug!(scope = %target, %layer, action, outcome, "Activation request");

        result
    }

    pub(crate) fn validator<'a>(&self, catalog: &'a dyn LayerCatalog) -> Validator<'a> {
        Validator::new(catalog, self.config.activation.unknown_layer)
    }
}

/// Registry of classes plus the global activation scope.
#[derive(Clone)]
pub struct LayerRuntime {
    shared: Arc<Shared>,
    registry: Arc<LayerRegistry>,
}

impl LayerRuntime {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let metrics = LayerMetrics::new(Arc::new(Registry::new())).unwrap_or_else(|err| {
            warn!(error = %err, "Failed to register metrics, continuing without them");
            LayerMetrics::disabled()
        });

        let global = ActivationScope::new(Target::Global);
        Self {
            shared: Arc::new(Shared { global, config, metrics }),
            registry: Arc::new(LayerRegistry::new()),
        }
    }

    /// The process-wide runtime, created with default configuration on first use.
    pub fn global() -> &'static LayerRuntime {
        GLOBAL_RUNTIME.get_or_init(LayerRuntime::new)
    }

    /// Create the process-wide runtime with `config`. If it already exists
    /// the existing runtime is returned and `config` is discarded.
    pub fn init_global(config: Config) -> &'static LayerRuntime {
        GLOBAL_RUNTIME.get_or_init(|| LayerRuntime::with_config(config))
    }

    /// Register a class whose instances carry values of type `T`.
    pub fn define_class<T: 'static>(&self, name: impl AsRef<str>) -> LayerResult<Arc<Class<T>>> {
        let name = ClassName::new(name);
        let class = Arc::new(Class::new(name.clone(), self.shared.clone()));
        self.registry.register(name, class.clone())?;
        Ok(class)
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn metrics(&self) -> &LayerMetrics {
        &self.shared.metrics
    }

    /// The global activation scope.
    pub fn scope(&self) -> &ActivationScope {
        &self.shared.global
    }

    /// Activate `layer` for every instance of every class in this runtime.
    pub fn activate(&self, layer: impl Into<LayerName>) -> LayerResult<RequestOutcome> {
        let request = ActivationRequest::activate(layer);
        self.shared.request(&self.shared.global, self.registry.as_ref(), request)
    }

    pub fn deactivate(&self, layer: impl Into<LayerName>) -> LayerResult<RequestOutcome> {
        let request = ActivationRequest::deactivate(layer);
        self.shared.request(&self.shared.global, self.registry.as_ref(), request)
    }

    /// Globally active layers in activation order.
    pub fn active_layers(&self) -> Vec<LayerName> {
        self.shared.global.active_layers()
    }

    pub fn is_active(&self, layer: &LayerName) -> bool {
        self.shared.global.is_active(layer)
    }

    /// Batch global activation changes until the returned guard is dropped.
    pub fn critical(&self) -> CriticalSection<'_> {
        CriticalSection::open(&self.shared.global, self.registry.as_ref(), &self.shared, None)
    }

    /// Activate `layer` globally until the returned guard is dropped.
    pub fn with_layer(&self, layer: impl Into<LayerName>) -> LayerResult<LayerScope<'_>> {
        LayerScope::enter(self, layer.into())
    }

    /// Run `f` with `layer` globally active.
    pub fn scoped<R>(
        &self,
        layer: impl Into<LayerName>,
        f: impl FnOnce() -> LayerResult<R>,
    ) -> LayerResult<R> {
        let _scope = self.with_layer(layer)?;
        f()
    }
}

impl Default for LayerRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LayerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerRuntime")
            .field("classes", &self.registry.class_names())
            .field("active", &self.active_layers())
            .finish()
    }
}
