//! Error types for `catalog-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::reconcile::ReconcileStats;

#[derive(Debug, Error)]
pub enum Error {
  #[error("course not found: {0}")]
  CourseNotFound(Uuid),

  #[error("relationship not found: {0}")]
  RelationshipNotFound(Uuid),

  /// A snapshot entry is missing a required field.
  #[error("malformed snapshot entry: {0}")]
  MalformedEntry(String),

  #[error("invalid course code: {0:?}")]
  InvalidCode(String),

  #[error("course {0} cannot reference itself")]
  SelfReference(Uuid),

  /// Refusing to reconcile an empty snapshot; it would retire every course.
  #[error("snapshot contains no entries")]
  EmptySnapshot,

  #[error("reconciliation wrote no courses ({} errors)", .0.errors)]
  NothingWritten(Box<ReconcileStats>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error raised through [`crate::store::CatalogStore`].
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
