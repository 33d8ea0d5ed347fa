//! Error type for `sitegraph-store-sqlite`.

use sitegraph_core::entity::EntityKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored enum column held a value the current code does not know.
  #[error("unknown {column} value: {value:?}")]
  UnknownValue { column: &'static str, value: String },

  #[error("store key {0:?} is already in use")]
  DuplicateStoreKey(String),

  #[error("identity {0:?} already has a user in this tenant")]
  DuplicateUser(String),

  #[error("{0} entities cannot be created generically")]
  UnsupportedKind(EntityKind),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<Error> for sitegraph_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::DuplicateStoreKey(_) | Error::DuplicateUser(_) => {
        Self::Conflict(e.to_string())
      }
      Error::UnsupportedKind(kind) => Self::InvalidKind(kind.to_string()),
      other => Self::store(other),
    }
  }
}
