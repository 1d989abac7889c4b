//! The process-wide runtime is created at most once. This binary owns its
//! own process, so the first call below is the one that creates it.

use anyhow::Result;
use contextual::{Config, LayerRuntime, RequestOutcome, UnknownLayerPolicy};
use serial_test::serial;

#[test]
#[serial]
fn test_init_global_first_caller_wins() -> Result<()> {
    let mut config = Config::default();
    config.activation.unknown_layer = UnknownLayerPolicy::Ignore;
    let runtime = LayerRuntime::init_global(config);
    assert_eq!(runtime.config().activation.unknown_layer, UnknownLayerPolicy::Ignore);
    assert_eq!(runtime.activate("nowhere")?, RequestOutcome::Ignored);

    let class = runtime.define_class::<()>("Pinned")?;
    let ping = class.declare_base("ping", |_, ()| Ok(false))?;
    class.attach_layer(&ping, "pong", |_, ()| Ok(true))?;

    assert!(std::ptr::eq(runtime, LayerRuntime::global()));

    let mut later = Config::default();
    later.cache.enabled = false;
    let again = LayerRuntime::init_global(later);
    assert!(std::ptr::eq(runtime, again));
    assert!(again.config().cache.enabled);
    assert_eq!(again.config().activation.unknown_layer, UnknownLayerPolicy::Ignore);
    assert_eq!(again.registry().len(), 1);

    let pinned = class.instantiate(());
    again.scoped("pong", || {
        assert!(pinned.call(&ping, ())?);
        Ok(())
    })?;
    assert!(!pinned.call(&ping, ())?);

    Ok(())
}
