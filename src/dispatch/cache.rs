use std::sync::Arc;

use moka::sync::Cache;

use super::CallChain;
use crate::config::CacheConfig;
use crate::types::InstanceId;

/// Identifies the inputs a resolved chain was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainKey {
    pub instance: InstanceId,
    pub global_generation: u64,
    pub instance_generation: u64,
    pub revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    Hit,
    Miss,
    /// Cache disabled or the view was frozen.
    Bypass,
}

/// Resolved chains of one base method.
pub struct ChainCache<T, A, R> {
    chains: Option<Cache<ChainKey, Arc<CallChain<T, A, R>>>>,
}

impl<T: 'static, A: 'static, R: 'static> ChainCache<T, A, R> {
    pub fn new(config: &CacheConfig) -> Self {
        let chains = config.enabled.then(|| {
            Cache::builder().max_capacity(config.max_entries).time_to_live(config.ttl()).build()
        });
        Self { chains }
    }

    pub fn is_enabled(&self) -> bool {
        self.chains.is_some()
    }

    pub fn get_or_resolve(
        &self,
        key: ChainKey,
        resolve: impl FnOnce() -> CallChain<T, A, R>,
    ) -> (Arc<CallChain<T, A, R>>, CacheLookup) {
        let chains = match &self.chains {
            Some(chains) => chains,
            None => return (Arc::new(resolve()), CacheLookup::Bypass),
        };

        if let Some(chain) = chains.get(&key) {
            return (chain, CacheLookup::Hit);
        }

        let chain = Arc::new(resolve());
        chains.insert(key, chain.clone());
        (chain, CacheLookup::Miss)
    }

    pub fn entry_count(&self) -> u64 {
        self.chains.as_ref().map_or(0, |chains| {
            chains.run_pending_tasks();
            chains.entry_count()
        })
    }
}
