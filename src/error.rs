//! Error types for context-adaptive arithmetic coding.

use thiserror::Error;

/// Error variants for encode/decode operations.
///
/// Every variant is fatal: arithmetic coding has no self-synchronizing
/// boundaries, so a failed operation leaves no usable partial result and
/// is never retried.
#[derive(Debug, Error)]
pub enum Error {
    /// Word size, alphabet size, or termination symbol outside the
    /// supported range. Raised at construction, never recovered.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A caller-provided buffer is smaller than its declared length.
    #[error("buffer too small: {0}")]
    BufferTooSmall(String),

    /// Output would exceed the caller-provided capacity mid-operation.
    /// Partial output state is undefined and must be discarded.
    #[error("output capacity exceeded")]
    CapacityExceeded,

    /// The encoder was fed a symbol outside the configured alphabet.
    #[error("symbol {0} outside the configured alphabet")]
    InvalidSymbol(i32),

    /// The encoded stream is malformed or truncated.
    #[error("corrupt stream: {0}")]
    CorruptStream(&'static str),
}

/// A specialized Result type for coding operations.
pub type Result<T> = std::result::Result<T, Error>;
