//! Error type for `gigboard-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] gigboard_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// A stored column held a value the domain types cannot represent.
  #[error("corrupt row: {0}")]
  Decode(String),
}

impl Error {
  /// Whether this is a UNIQUE/FOREIGN KEY/CHECK violation.
  pub fn is_constraint_violation(&self) -> bool {
    matches!(
      self,
      Error::Database(tokio_rusqlite::Error::Rusqlite(
        rusqlite::Error::SqliteFailure(e, _)
      )) if e.code == ErrorCode::ConstraintViolation
    )
  }
}

impl From<Error> for gigboard_core::Error {
  fn from(e: Error) -> Self {
    if e.is_constraint_violation() {
      let detail = match &e {
        Error::Database(tokio_rusqlite::Error::Rusqlite(
          rusqlite::Error::SqliteFailure(_, Some(msg)),
        )) => msg.clone(),
        _ => "constraint violation".to_owned(),
      };
      return gigboard_core::Error::Conflict(detail);
    }
    match e {
      Error::Core(inner) => inner,
      other => gigboard_core::Error::Backend(Box::new(other)),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
