//! Model-based checks of activation stacks and chain ordering.

use contextual::{ActivationStack, LayerName, LayerRuntime, effective_stack};
use proptest::prelude::*;

const LAYERS: [&str; 5] = ["a", "b", "c", "d", "e"];

#[derive(Debug, Clone)]
enum Op {
    Activate(usize),
    Deactivate(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..LAYERS.len()).prop_map(Op::Activate),
        (0..LAYERS.len()).prop_map(Op::Deactivate),
    ]
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(arb_op(), 0..40)
}

/// Reference model: ordered, duplicate-free, append on first activation.
fn model(ops: &[Op]) -> Vec<&'static str> {
    let mut active: Vec<&'static str> = Vec::new();
    for op in ops {
        match op {
            Op::Activate(i) if !active.contains(&LAYERS[*i]) => active.push(LAYERS[*i]),
            Op::Activate(_) => {}
            Op::Deactivate(i) => active.retain(|name| *name != LAYERS[*i]),
        }
    }
    active
}

fn names(raw: &[&str]) -> Vec<LayerName> {
    raw.iter().map(|name| LayerName::from(*name)).collect()
}

proptest! {
    #[test]
    fn prop_stack_matches_model(ops in arb_ops()) {
        let mut stack = ActivationStack::new();
        for op in &ops {
            match op {
                Op::Activate(i) => stack.activate(&LAYERS[*i].into()),
                Op::Deactivate(i) => stack.deactivate(&LAYERS[*i].into()),
            };
        }
        prop_assert_eq!(stack.as_slice().to_vec(), names(&model(&ops)));
    }

    #[test]
    fn prop_effective_stack_has_no_duplicates(global in arb_ops(), instance in arb_ops()) {
        let global = names(&model(&global));
        let instance = names(&model(&instance));
        let effective = effective_stack(&global, &instance);

        let mut seen = std::collections::HashSet::new();
        prop_assert!(effective.iter().all(|name| seen.insert(name.clone())));
        prop_assert!(effective.ends_with(&instance));
        prop_assert!(global.iter().all(|name| effective.contains(name)));
    }

    #[test]
    fn prop_dispatch_runs_layers_most_recent_first(ops in arb_ops()) {
        let runtime = LayerRuntime::new();
        let class = runtime.define_class::<()>("Model").unwrap();
        let trail = class.declare_base("trail", |_, ()| Ok(Vec::<String>::new())).unwrap();
        for layer in LAYERS {
            class
                .attach_layer(&trail, layer, move |frame, ()| {
                    let mut rest = frame.proceed(())?;
                    rest.insert(0, layer.to_string());
                    Ok(rest)
                })
                .unwrap();
        }

        let object = class.instantiate(());
        for op in &ops {
            match op {
                Op::Activate(i) => object.activate(LAYERS[*i]).unwrap(),
                Op::Deactivate(i) => object.deactivate(LAYERS[*i]).unwrap(),
            };
        }

        let mut expected = model(&ops);
        expected.reverse();
        prop_assert_eq!(object.call(&trail, ()).unwrap(), expected);
    }
}
