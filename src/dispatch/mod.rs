//! Chain resolution and execution.
//!
//! A call resolves its chain from snapshots of the global and instance
//! scopes taken at dispatch time, then runs it front to back. No scope or
//! registry lock is held while layer code runs.

mod cache;
mod chain;
mod frame;

use std::sync::Arc;

use tracing::trace;

use crate::error::LayerResult;
use crate::registry::BaseMethod;
use crate::runtime::Layered;

pub use cache::{CacheLookup, ChainCache, ChainKey};
pub use chain::{CallChain, effective_stack};
pub use frame::Frame;

/// Resolve the chain `method` would run on `object` right now.
pub fn resolve<T, A, R>(
    object: &Layered<T>,
    method: &BaseMethod<T, A, R>,
) -> LayerResult<Arc<CallChain<T, A, R>>>
where
    T: 'static,
    A: 'static,
    R: 'static,
{
    let class = object.class();
    class.ensure_owns(method)?;

    let shared = class.shared();
    let instance = object.scope().snapshot();
    let global = instance.frozen_global.is_none().then(|| shared.global.snapshot());

    // Scope locks are never taken while a layer table is read.
    let slot = method.slot();
    let name = slot.name().clone();
    let table = slot.table();

    let (chain, lookup) = match global {
        None => {
            let frozen = instance.frozen_global.as_deref().unwrap_or_default();
            let effective = effective_stack(frozen, &instance.entries);
            let chain = CallChain::resolve(name, &table.layers, slot.base(), &effective);
            (Arc::new(chain), CacheLookup::Bypass)
        }
        Some(global) => {
            let key = ChainKey {
                instance: object.id(),
                global_generation: global.generation,
                instance_generation: instance.generation,
                revision: table.revision,
            };
            slot.cache().get_or_resolve(key, || {
                let effective = effective_stack(&global.entries, &instance.entries);
                CallChain::resolve(name, &table.layers, slot.base(), &effective)
            })
        }
    };
    drop(table);

    shared.metrics.record_cache_lookup(lookup);
    Ok(chain)
}

/// Resolve and run `method` on `object`.
pub fn dispatch<T, A, R>(
    object: &Layered<T>,
    method: &BaseMethod<T, A, R>,
    args: A,
) -> LayerResult<R>
where
    T: 'static,
    A: 'static,
    R: 'static,
{
    let chain = resolve(object, method)?;
    trace!(
        class = %method.class(),
        method = method.name(),
        instance = %object.id(),
        layers = ?chain.layer_names(),
        "Dispatching"
    );

    let result = chain.invoke(object, 0, args);
    object.class().shared().metrics.record_dispatch(
        method.class().as_str(),
        method.name(),
        chain.len(),
        result.is_ok(),
    );
    result
}
