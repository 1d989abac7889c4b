use super::CallChain;
use crate::error::LayerResult;
use crate::runtime::Layered;
use crate::types::LayerName;

/// Call frame handed to every layer and base implementation.
///
/// A frame only exists for the duration of its dispatch, so `proceed`
/// always has a chain to continue.
pub struct Frame<'a, T, A, R> {
    object: &'a Layered<T>,
    chain: &'a CallChain<T, A, R>,
    position: usize,
}

impl<'a, T, A, R> Frame<'a, T, A, R> {
    pub(crate) fn new(
        object: &'a Layered<T>,
        chain: &'a CallChain<T, A, R>,
        position: usize,
    ) -> Self {
        Self { object, chain, position }
    }

    /// The receiver's value.
    pub fn target(&self) -> &'a T {
        self.object.get()
    }

    /// The receiver, for nested calls or activation changes.
    pub fn object(&self) -> &'a Layered<T> {
        self.object
    }

    pub fn method(&self) -> &str {
        self.chain.method()
    }

    /// Layer running in this frame; `None` for the base implementation.
    pub fn layer(&self) -> Option<&LayerName> {
        self.chain.layer_at(self.position)
    }

    /// Steps after this one, the base implementation included.
    pub fn remaining(&self) -> usize {
        self.chain.len() - self.position - 1
    }

    /// Run the rest of the chain with `args` and return its result.
    ///
    /// May be called any number of times; each call re-runs the rest of
    /// the chain. Fails with `ChainExhausted` from the base implementation.
    pub fn proceed(&self, args: A) -> LayerResult<R> {
        self.chain.invoke(self.object, self.position + 1, args)
    }
}
