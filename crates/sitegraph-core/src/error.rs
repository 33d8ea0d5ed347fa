//! Error types for `sitegraph-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// No viewer is bound to the request context.
  #[error("unauthenticated")]
  Unauthenticated,

  #[error("{what} not found: {id}")]
  NotFound { what: &'static str, id: String },

  #[error("unsupported entity kind: {0:?}")]
  InvalidKind(String),

  #[error("invalid entity: {0}")]
  InvalidEntity(String),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("permission denied: {0}")]
  PermissionDenied(String),

  /// A storage-level constraint rejected the write.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("request cancelled")]
  Cancelled,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn not_found(what: &'static str, id: impl ToString) -> Self {
    Self::NotFound { what, id: id.to_string() }
  }

  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
