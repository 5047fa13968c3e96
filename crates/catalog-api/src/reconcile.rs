//! `POST /reconcile`: apply a full snapshot.
//!
//! The body is either a bare array of entries or `{"courses":[...]}`.
//! Entries that do not fit the entry shape are reported in the stats rather
//! than rejecting the request. Requests are serialised; a second cycle waits
//! for the first to finish.

use axum::{Json, extract::State};
use catalog_core::{
  reconcile::{ReconcileStats, reconcile_snapshot},
  snapshot::SnapshotDocument,
  store::CatalogStore,
};

use crate::{ApiState, error::ApiError, extract::Body};

pub async fn run<S>(
  State(state): State<ApiState<S>>,
  Body(doc): Body<SnapshotDocument>,
) -> Result<Json<ReconcileStats>, ApiError>
where
  S: CatalogStore,
{
  let snapshot = doc.into_snapshot();

  let _guard = state.reconcile.lock().await;
  tracing::info!(
    entries = snapshot.len(),
    unreadable = snapshot.rejected().len(),
    "reconciliation requested"
  );
  let stats = reconcile_snapshot(state.store.as_ref(), &snapshot, &state.options).await?;
  Ok(Json(stats))
}
