//! Error types for the operator binary's library half.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("configuration error: {0}")]
  Config(#[from] config::ConfigError),

  #[error("failed to read {path:?}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Catalog(#[from] catalog_core::Error),

  #[error("store error: {0}")]
  Store(#[from] catalog_store_sqlite::Error),

  #[error("no course with code {0:?}")]
  UnknownCourse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
