//! Dispatch benchmarks: call cost by number of active layers, with and
//! without the chain cache.

use std::hint::black_box;

use contextual::{BaseMethod, CacheConfig, Config, LayerRuntime, Layered};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

type Fixture = (LayerRuntime, Layered<u64>, BaseMethod<u64, u64, u64>);

fn setup(cache_enabled: bool, active: usize) -> Fixture {
    let mut config = Config::default();
    config.cache = CacheConfig { enabled: cache_enabled, ..CacheConfig::default() };
    let runtime = LayerRuntime::with_config(config);

    let class = runtime.define_class::<u64>("Bench").expect("class");
    let add = class.declare_base("add", |frame, n: u64| Ok(*frame.target() + n)).expect("base");
    for i in 0..16 {
        class
            .attach_layer(&add, format!("layer{}", i), |frame, n: u64| frame.proceed(n + 1))
            .expect("layer");
    }

    let object = class.instantiate(1);
    for i in 0..active {
        object.activate(format!("layer{}", i)).expect("activate");
    }
    (runtime, object, add)
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    for active in [0usize, 1, 4, 16] {
        for cache_enabled in [true, false] {
            let label = if cache_enabled { "cached" } else { "uncached" };
            let (_runtime, object, add) = setup(cache_enabled, active);
            group.bench_with_input(BenchmarkId::new(label, active), &active, |b, _| {
                b.iter(|| object.call(&add, black_box(1)).expect("call"))
            });
        }
    }

    group.finish();
}

fn bench_activation_toggle(c: &mut Criterion) {
    let (_runtime, object, add) = setup(true, 0);

    c.bench_function("activate_call_deactivate", |b| {
        b.iter(|| {
            object.activate("layer0").expect("activate");
            let value = object.call(&add, black_box(1)).expect("call");
            object.deactivate("layer0").expect("deactivate");
            value
        })
    });
}

criterion_group!(benches, bench_dispatch, bench_activation_toggle);
criterion_main!(benches);
