//! Error type for `catalog-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored enum column held a value this version does not know.
  #[error("unknown {column} value: {value:?}")]
  UnknownValue { column: &'static str, value: String },

  #[error("course not found: {0}")]
  CourseNotFound(uuid::Uuid),

  #[error("relationship not found: {0}")]
  RelationshipNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
