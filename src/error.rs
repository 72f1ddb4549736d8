//! Error types for proxima.
//!
//! Graph operations themselves never fail: a missing id is a no-op, a
//! search on an empty index returns no results, and a wrong-length vector
//! is a programming error caught by debug assertions. The only fallible
//! surface is construction, where bad parameters must be rejected before
//! an index exists.

use thiserror::Error;

/// Errors that can occur when constructing an index.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for proxima operations.
pub type Result<T> = std::result::Result<T, IndexError>;
