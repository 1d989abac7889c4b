use crate::types::LayerName;

/// Active layer names of one scope, in activation order.
///
/// A name appears at most once. Activating a name that is already active
/// leaves its position unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationStack {
    entries: Vec<LayerName>,
}

impl ActivationStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `layer` unless already present. Returns whether the stack changed.
    pub fn activate(&mut self, layer: &LayerName) -> bool {
        if self.contains(layer) {
            return false;
        }
        self.entries.push(layer.clone());
        true
    }

    /// Remove `layer` if present. Returns whether the stack changed.
    pub fn deactivate(&mut self, layer: &LayerName) -> bool {
        match self.entries.iter().position(|active| active == layer) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, layer: &LayerName) -> bool {
        self.entries.contains(layer)
    }

    pub fn as_slice(&self) -> &[LayerName] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerName> {
        self.entries.iter()
    }
}
