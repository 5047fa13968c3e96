//! JSON REST API for the course catalog.
//!
//! Exposes an axum [`Router`] backed by any [`catalog_core::store::CatalogStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", catalog_api::api_router(store.clone(), options))
//! ```

pub mod courses;
pub mod error;
pub mod extract;
pub mod reconcile;
pub mod relationships;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use catalog_core::{reconcile::ReconcileOptions, store::CatalogStore};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:   Arc<S>,
  pub options: Arc<ReconcileOptions>,
  /// Held for the duration of a reconciliation cycle.
  reconcile:   Arc<Mutex<()>>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:     self.store.clone(),
      options:   self.options.clone(),
      reconcile: self.reconcile.clone(),
    }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, options: ReconcileOptions) -> Router<()>
where
  S: CatalogStore + 'static,
{
  let state = ApiState {
    store,
    options: Arc::new(options),
    reconcile: Arc::new(Mutex::new(())),
  };

  Router::new()
    // Courses
    .route("/courses", get(courses::list::<S>))
    .route("/courses/{id}", get(courses::get_one::<S>))
    .route("/courses/{id}/curated", put(courses::update_curated::<S>))
    .route(
      "/courses/{id}/relationships",
      get(courses::relationships::<S>).post(courses::add_relationship::<S>),
    )
    .route("/courses/{id}/prerequisites/check", post(courses::check_prerequisites::<S>))
    .route("/resolve", get(courses::resolve::<S>))
    // Relationships
    .route("/relationships/unresolved", get(relationships::unresolved::<S>))
    .route("/relationships/{id}", get(relationships::get_one::<S>))
    .route("/relationships/{id}/repair", post(relationships::repair::<S>))
    // Reconciliation
    .route("/reconcile", post(reconcile::run::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests;
