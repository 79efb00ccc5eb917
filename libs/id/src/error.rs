//! Error types for ID parsing and validation.

use thiserror::Error;

/// Errors that can occur when parsing or validating IDs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The ID string is empty.
    #[error("{kind} cannot be empty")]
    Empty { kind: &'static str },

    /// The ID exceeds the maximum length.
    #[error("{kind} exceeds maximum length of {max} bytes (got {actual})")]
    TooLong {
        kind: &'static str,
        max: usize,
        actual: usize,
    },

    /// The ID contains a character outside its alphabet.
    #[error("invalid character {found:?} in {kind}")]
    InvalidCharacter { kind: &'static str, found: char },
}

impl IdError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, IdError::Empty { .. })
    }
}
