//! Error types used by the crate.

use thiserror::Error;

/// Mapbind error type.
#[derive(Debug, Error)]
pub enum MapBindError {
    /// A binding looked up the map outside of a mounted [`MapProvider`](crate::MapProvider).
    #[error("map context must be used within a mounted map provider")]
    Configuration,
    /// A source with the same id is already registered.
    #[error("source `{0}` is already registered")]
    DuplicateSource(String),
    /// A layer with the same id is already registered.
    #[error("layer `{0}` is already registered")]
    DuplicateLayer(String),
    /// The map engine instance was destroyed.
    #[error("map engine was destroyed")]
    Destroyed,
    /// The engine rejected an operation.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Error reported by a [`MapEngine`](crate::MapEngine) implementation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The engine refused the operation, e.g. because of an invalid specification.
    #[error("operation rejected: {0}")]
    Rejected(String),
    /// The referenced item does not exist.
    #[error("`{0}` not found")]
    NotFound(String),
    /// Generic error - details are inside.
    #[error("{0}")]
    Generic(String),
}
