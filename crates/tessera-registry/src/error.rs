//! Registry errors.

use thiserror::Error;

use tessera_core::{DetailingError, ItemId, Position};

/// Errors raised by graph queries that can fail on malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Following an alias chain revisited an alias.
    #[error("alias cycle through '{name}'")]
    AliasCycle { name: String, item: ItemId },

    /// A class lists itself among its ancestors.
    #[error("class '{name}' inherits from itself")]
    InheritanceCycle { name: String, item: ItemId },
}

impl RegistryError {
    /// Attach a position, turning the error into a detailing error.
    pub fn at(self, position: Position) -> DetailingError {
        DetailingError::other(position, self.to_string())
    }
}

impl From<RegistryError> for DetailingError {
    fn from(err: RegistryError) -> Self {
        DetailingError::internal(err.to_string())
    }
}
