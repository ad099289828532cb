//! Error types.
//!
//! Registry operations never fail. Errors only surface when an exit strategy
//! is built outside a lifetime-managed child or without the runtime it needs,
//! or when a managed parent is handed children it cannot track.

use thiserror::Error;

/// Errors raised by the lifetime accessors and the host adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LingerError {
    /// A strategy accessor was used on props that carry no lifetime token.
    ///
    /// This is a programming error: the component is not a direct child of a
    /// lifetime-managed parent, so there is no entry to unlist.
    #[error("{accessor} requires props rendered by a lifetime-managed parent")]
    MissingToken { accessor: &'static str },

    /// An async accessor was attached with no tokio runtime to run exits on.
    #[error("{accessor} must be attached inside a tokio runtime and LocalSet")]
    NoRuntime { accessor: &'static str },

    /// A child that cannot receive a lifetime token was passed to the parent.
    #[error("unsupported {kind} child at position {position}; wrap it in a component")]
    UnsupportedChild { kind: &'static str, position: usize },
}

/// Result alias for spark-linger operations.
pub type Result<T> = std::result::Result<T, LingerError>;
