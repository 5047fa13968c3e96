//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use catalog_core::reconcile::ReconcileStats;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The request was well-formed but the reconciler refused it.
  #[error("unprocessable: {message}")]
  Unprocessable {
    message: String,
    stats:   Option<Box<ReconcileStats>>,
  },

  /// An extractor refused the request before the handler ran.
  #[error("{message}")]
  Rejected { status: StatusCode, message: String },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self {
    ApiError::Rejected { status: rejection.status(), message: rejection.body_text() }
  }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self {
    ApiError::Rejected { status: rejection.status(), message: rejection.body_text() }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    ApiError::Rejected { status: rejection.status(), message: rejection.body_text() }
  }
}

impl From<catalog_core::Error> for ApiError {
  fn from(err: catalog_core::Error) -> Self {
    use catalog_core::Error as E;

    let message = err.to_string();
    match err {
      E::CourseNotFound(_) | E::RelationshipNotFound(_) => ApiError::NotFound(message),
      E::MalformedEntry(_) | E::InvalidCode(_) | E::SelfReference(_) | E::Serialization(_) => {
        ApiError::BadRequest(message)
      }
      E::EmptySnapshot => ApiError::Unprocessable { message, stats: None },
      E::NothingWritten(stats) => ApiError::Unprocessable { message, stats: Some(stats) },
      E::Store(e) => ApiError::Store(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, Json(json!({ "error": m }))).into_response(),
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": m }))).into_response()
      }
      ApiError::Unprocessable { message, stats } => (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": message, "stats": stats })),
      )
        .into_response(),
      ApiError::Rejected { status, message } => {
        (status, Json(json!({ "error": message }))).into_response()
      }
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() })))
          .into_response()
      }
    }
  }
}
