//! Context-oriented method layering.
//!
//! A base method declared on a [`Class`] can carry any number of named
//! [layers](Layer). Activating a layer, globally through a [`LayerRuntime`] or
//! on one [`Layered`] instance, puts it in front of the base implementation
//! for later calls. Each layer receives a [`Frame`] and may [`proceed`] to the
//! next element of the chain.
//!
//! ```
//! use contextual::{LayerRuntime, LayerResult};
//!
//! # fn main() -> LayerResult<()> {
//! let runtime = LayerRuntime::new();
//! let greeter = runtime.define_class::<String>("Greeter")?;
//! let greet = greeter.declare_base("greet", |frame, ()| Ok(format!("hello {}", frame.target())))?;
//! greeter.attach_layer(&greet, "shout", |frame, ()| Ok(frame.proceed(())?.to_uppercase()))?;
//!
//! let world = greeter.instantiate("world".to_string());
//! assert_eq!(world.call(&greet, ())?, "hello world");
//!
//! world.activate("shout")?;
//! assert_eq!(world.call(&greet, ())?, "HELLO WORLD");
//! # Ok(())
//! # }
//! ```
//!
//! [`proceed`]: Frame::proceed

pub mod activation;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod runtime;
pub mod types;

pub use activation::{
    ActivationRequest, ActivationScope, ActivationStack, CriticalSection, LayerScope, RequestKind,
    RequestOutcome, Target,
};
pub use config::{CacheConfig, Config, UnknownLayerPolicy};
pub use dispatch::{CallChain, Frame, effective_stack};
pub use error::{LayerError, LayerResult};
pub use metrics::LayerMetrics;
pub use registry::{BaseMethod, Class, Layer, LayerCatalog, LayerRegistry};
pub use runtime::{LayerRuntime, Layered};
pub use types::{ClassName, InstanceId, LayerName};
