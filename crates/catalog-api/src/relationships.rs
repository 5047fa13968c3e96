//! Handlers for `/relationships` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/relationships/unresolved` | Rows with no target course |
//! | `GET`  | `/relationships/:id` | Single relationship |
//! | `POST` | `/relationships/:id/repair` | Body: `{"code":"0075"}` |

use axum::{Json, extract::State};
use catalog_core::{admin, relationship::Relationship, store::CatalogStore};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  ApiState,
  error::ApiError,
  extract::{Body, Path},
};

/// `GET /relationships/unresolved`
pub async fn unresolved<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<Relationship>>, ApiError>
where
  S: CatalogStore,
{
  let rows = admin::list_unresolved_relationships(state.store.as_ref()).await?;
  Ok(Json(rows))
}

/// `GET /relationships/:id`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Relationship>, ApiError>
where
  S: CatalogStore,
{
  let rel = state
    .store
    .get_relationship(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("relationship {id} not found")))?;
  Ok(Json(rel))
}

#[derive(Debug, Deserialize)]
pub struct RepairBody {
  pub code: String,
}

/// `POST /relationships/:id/repair` re-resolves the relationship against a
/// corrected code.
pub async fn repair<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Body(body): Body<RepairBody>,
) -> Result<Json<Relationship>, ApiError>
where
  S: CatalogStore,
{
  let rel = admin::repair_relationship_code(state.store.as_ref(), id, &body.code).await?;
  Ok(Json(rel))
}
