//! Signing error types.

use thiserror::Error;

/// Errors raised while building or parsing signed parameter sets.
///
/// Verification itself never returns these; a bad token is a `false`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigningError {
    /// Invalid parameter name.
    #[error("invalid parameter name '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// Invalid parameter value.
    #[error("invalid value for parameter '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    /// A MAC was requested over an empty parameter set.
    #[error("parameter set is empty")]
    EmptyParams,

    /// The same parameter appeared twice in a query string.
    #[error("duplicate parameter '{0}'")]
    DuplicateParam(String),

    /// The query string carried no token.
    #[error("tracking token missing")]
    MissingToken,

    /// The token is not 64 lowercase hex characters.
    #[error("malformed tracking token")]
    MalformedToken,

    /// The seed cannot be used as a key.
    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    /// Query string could not be encoded or decoded.
    #[error("query encoding error: {0}")]
    Encoding(String),
}
