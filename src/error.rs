use thiserror::Error;

use crate::types::{ClassName, LayerName};

pub type LayerResult<T> = Result<T, LayerError>;

#[derive(Error, Debug)]
pub enum LayerError {
    #[error("Base method already declared: {class}::{method}")]
    DuplicateBase { class: ClassName, method: String },

    #[error("Class already defined: {0}")]
    DuplicateClass(ClassName),

    #[error("Unknown base method: {class}::{method}")]
    UnknownBase { class: ClassName, method: String },

    #[error("Base method {class}::{method} was declared with a different signature")]
    SignatureMismatch { class: ClassName, method: String },

    #[error("Unknown layer: {0}")]
    UnknownLayer(LayerName),

    #[error("Nothing to proceed to: {method} already reached its base implementation")]
    ChainExhausted { method: String },

    #[error("Critical section flush rejected unknown layers: {}", join_names(.0))]
    FlushRejected(Vec<LayerName>),

    #[error("Application error: {0}")]
    Application(#[from] anyhow::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl LayerError {
    /// The error raised by layer or base code, if this is one.
    pub fn application(&self) -> Option<&anyhow::Error> {
        match self {
            LayerError::Application(err) => Some(err),
            _ => None,
        }
    }
}

fn join_names(names: &[LayerName]) -> String {
    names.iter().map(LayerName::as_str).collect::<Vec<_>>().join(", ")
}
