use std::sync::{Arc, Barrier};
use std::thread;

use anyhow::Result;
use contextual::{LayerName, LayerRuntime};

#[test]
fn test_in_flight_chain_ignores_concurrent_activation() -> Result<()> {
    let runtime = LayerRuntime::new();
    let class = runtime.define_class::<Arc<Barrier>>("Gate")?;
    let pass = class.declare_base("pass", |_, ()| Ok(vec![String::from("base")]))?;
    class.attach_layer(&pass, "wait", |frame, ()| {
        // Hold the call open while another thread changes activation.
        frame.target().wait();
        frame.target().wait();
        let mut trail = vec![String::from("wait")];
        trail.extend(frame.proceed(())?);
        Ok(trail)
    })?;
    class.attach_layer(&pass, "late", |frame, ()| {
        let mut trail = vec![String::from("late")];
        trail.extend(frame.proceed(())?);
        Ok(trail)
    })?;

    let barrier = Arc::new(Barrier::new(2));
    let gate = Arc::new(class.instantiate(barrier.clone()));
    gate.activate("wait")?;

    let worker = {
        let gate = gate.clone();
        let pass = pass.clone();
        thread::spawn(move || gate.call(&pass, ()))
    };

    barrier.wait();
    gate.activate("late")?;
    runtime.activate("late")?;
    barrier.wait();

    let trail = worker.join().map_err(|_| anyhow::anyhow!("worker panicked"))??;
    assert_eq!(trail, vec!["wait", "base"]);
    assert_eq!(gate.chain_for(&pass)?, vec![LayerName::from("late"), LayerName::from("wait")]);

    Ok(())
}

#[test]
fn test_layer_may_change_activation_during_call() -> Result<()> {
    let runtime = LayerRuntime::new();
    let class = runtime.define_class::<()>("SelfEditing")?;
    let step = class.declare_base("step", |_, ()| Ok(0u32))?;
    class.attach_layer(&step, "once", |frame, ()| {
        frame.object().deactivate("once")?;
        Ok(frame.proceed(())? + 1)
    })?;

    let object = class.instantiate(());
    object.activate("once")?;

    assert_eq!(object.call(&step, ())?, 1);
    assert_eq!(object.call(&step, ())?, 0);

    Ok(())
}

#[test]
fn test_parallel_activation_on_many_instances() -> Result<()> {
    let runtime = LayerRuntime::new();
    let class = runtime.define_class::<u64>("Number")?;
    let value = class.declare_base("value", |frame, ()| Ok(*frame.target()))?;
    class.attach_layer(&value, "double", |frame, ()| Ok(frame.proceed(())? * 2))?;

    let handles: Vec<_> = (0..8u64)
        .map(|n| {
            let class = class.clone();
            let value = value.clone();
            thread::spawn(move || -> contextual::LayerResult<u64> {
                let number = class.instantiate(n);
                if n % 2 == 0 {
                    number.activate("double")?;
                }
                let mut total = 0;
                for _ in 0..100 {
                    total += number.call(&value, ())?;
                }
                Ok(total)
            })
        })
        .collect();

    for (n, handle) in handles.into_iter().enumerate() {
        let total = handle.join().map_err(|_| anyhow::anyhow!("worker panicked"))??;
        let n = n as u64;
        let expected = if n % 2 == 0 { n * 2 * 100 } else { n * 100 };
        assert_eq!(total, expected);
    }
    assert_eq!(runtime.metrics().dispatches("Number", "value"), 800.0);

    Ok(())
}
