//! Error types for `gigboard-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid id {0:?}: expected 24 hex characters")]
  InvalidId(String),

  /// A uniqueness rule was violated (duplicate email, category name, ...).
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// Any other storage backend failure.
  #[error("store error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
