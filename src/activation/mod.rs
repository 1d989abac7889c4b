//! Active-layer membership at global and per-instance scope, plus the
//! guards that batch or scope activation changes.

mod critical;
mod layer_scope;
mod scope;
mod stack;

pub use critical::CriticalSection;
pub use layer_scope::LayerScope;
pub use scope::{ActivationRequest, ActivationScope, RequestKind, RequestOutcome, Target};
pub use stack::ActivationStack;

pub(crate) use scope::Validator;
