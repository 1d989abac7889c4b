use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::dispatch::CacheLookup;
use crate::error::LayerResult;

struct Collectors {
    dispatches_total: CounterVec,
    dispatch_errors: CounterVec,
    chain_length: HistogramVec,
    activation_requests: CounterVec,
    cache_lookups: CounterVec,
    critical_flushes: CounterVec,
}

/// Per-runtime metrics collector
pub struct LayerMetrics {
    registry: Arc<Registry>,
    collectors: Option<Collectors>,
}

impl LayerMetrics {
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        let dispatches_total = CounterVec::new(
            Opts::new("contextual_dispatches_total", "Total layered method calls"),
            &["class", "method"],
        )?;

        let dispatch_errors = CounterVec::new(
            Opts::new("contextual_dispatch_errors_total", "Layered method calls that failed"),
            &["class", "method"],
        )?;

        let chain_length = HistogramVec::new(
            HistogramOpts::new("contextual_chain_length", "Resolved call chain length")
                .buckets(vec![1.0, 2.0, 3.0, 4.0, 8.0, 16.0]),
            &["class", "method"],
        )?;

        let activation_requests = CounterVec::new(
            Opts::new("contextual_activation_requests_total", "Activate/deactivate requests"),
            &["scope", "action", "outcome"],
        )?;

        let cache_lookups = CounterVec::new(
            Opts::new("contextual_chain_cache_lookups_total", "Chain cache lookups"),
            &["result"],
        )?;

        let critical_flushes = CounterVec::new(
            Opts::new("contextual_critical_flushes_total", "Critical section flushes"),
            &["scope"],
        )?;

        registry.register(Box::new(dispatches_total.clone()))?;
        registry.register(Box::new(dispatch_errors.clone()))?;
        registry.register(Box::new(chain_length.clone()))?;
        registry.register(Box::new(activation_requests.clone()))?;
        registry.register(Box::new(cache_lookups.clone()))?;
        registry.register(Box::new(critical_flushes.clone()))?;

        Ok(Self {
            registry,
            collectors: Some(Collectors {
                dispatches_total,
                dispatch_errors,
                chain_length,
                activation_requests,
                cache_lookups,
                critical_flushes,
            }),
        })
    }

    /// A collector that records nothing.
    pub fn disabled() -> Self {
        Self { registry: Arc::new(Registry::new()), collectors: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.collectors.is_some()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Record a finished call
    pub fn record_dispatch(&self, class: &str, method: &str, chain_length: usize, success: bool) {
        let Some(collectors) = &self.collectors else { return };
        collectors.dispatches_total.with_label_values(&[class, method]).inc();
        collectors.chain_length.with_label_values(&[class, method]).observe(chain_length as f64);
        if !success {
            collectors.dispatch_errors.with_label_values(&[class, method]).inc();
        }
    }

    /// Record an activate/deactivate request
    pub fn record_activation(&self, scope: &str, action: &str, outcome: &str) {
        if let Some(collectors) = &self.collectors {
            collectors.activation_requests.with_label_values(&[scope, action, outcome]).inc();
        }
    }

    pub fn record_cache_lookup(&self, lookup: CacheLookup) {
        let Some(collectors) = &self.collectors else { return };
        let result = match lookup {
            CacheLookup::Hit => "hit",
            CacheLookup::Miss => "miss",
            CacheLookup::Bypass => return,
        };
        collectors.cache_lookups.with_label_values(&[result]).inc();
    }

    pub fn record_critical_flush(&self, scope: &str) {
        if let Some(collectors) = &self.collectors {
            collectors.critical_flushes.with_label_values(&[scope]).inc();
        }
    }

    pub fn dispatches(&self, class: &str, method: &str) -> f64 {
        self.collectors
            .as_ref()
            .map_or(0.0, |c| c.dispatches_total.with_label_values(&[class, method]).get())
    }

    pub fn dispatch_errors(&self, class: &str, method: &str) -> f64 {
        self.collectors
            .as_ref()
            .map_or(0.0, |c| c.dispatch_errors.with_label_values(&[class, method]).get())
    }

    pub fn activation_requests(&self, scope: &str, action: &str, outcome: &str) -> f64 {
        self.collectors.as_ref().map_or(0.0, |c| {
            c.activation_requests.with_label_values(&[scope, action, outcome]).get()
        })
    }

    pub fn cache_hits(&self) -> f64 {
        self.collectors.as_ref().map_or(0.0, |c| c.cache_lookups.with_label_values(&["hit"]).get())
    }

    pub fn cache_misses(&self) -> f64 {
        self.collectors.as_ref().map_or(0.0, |c| c.cache_lookups.with_label_values(&["miss"]).get())
    }

    pub fn critical_flushes(&self, scope: &str) -> f64 {
        self.collectors
            .as_ref()
            .map_or(0.0, |c| c.critical_flushes.with_label_values(&[scope]).get())
    }

    /// Text exposition of everything in the registry.
    pub fn render(&self) -> LayerResult<String> {
        Ok(TextEncoder::new().encode_to_string(&self.registry.gather())?)
    }
}
