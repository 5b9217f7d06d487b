//! Pattern expansion errors.

use thiserror::Error;

/// Errors that can occur while expanding a path pattern.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PatternError {
    /// The pattern references a key that `PathData` does not provide.
    #[error("unknown placeholder '{{{0}}}' in path pattern")]
    UnknownPlaceholder(String),

    /// A `{` without a matching `}`.
    #[error("unterminated placeholder in path pattern '{0}'")]
    Unterminated(String),

    /// The pattern is empty.
    #[error("path pattern cannot be empty")]
    Empty,
}
