//! Handlers for `/courses` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/courses` | Optional `?offered_only=true` |
//! | `GET`  | `/courses/:id` | Course with tags, eligibility and variants |
//! | `PUT`  | `/courses/:id/curated` | Body: [`CuratedFields`] |
//! | `GET`  | `/courses/:id/relationships` | Optional `?type=prerequisite\|corequisite\|recommended` |
//! | `POST` | `/courses/:id/relationships` | Body: [`AddRelationshipBody`]; returns 201 |
//! | `POST` | `/courses/:id/prerequisites/check` | Body: `{"completed":["0201",...]}` |
//! | `GET`  | `/resolve` | `?code=` required |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use catalog_core::{
  admin::{self, CourseTarget},
  course::{Course, CourseView, CuratedFields},
  prereq::{PrereqCheck, check_prerequisites_met},
  relationship::{Relationship, RelationshipType},
  resolve::resolve_code,
  store::CatalogStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  ApiState,
  error::ApiError,
  extract::{Body, Path, Query},
};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// If `true`, hide retired courses. Default `false`.
  #[serde(default)]
  pub offered_only: bool,
}

/// `GET /courses[?offered_only=true]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Course>>, ApiError>
where
  S: CatalogStore,
{
  let courses = state
    .store
    .list_courses(params.offered_only)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(courses))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /courses/:id`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CourseView>, ApiError>
where
  S: CatalogStore,
{
  let view = state
    .store
    .materialize(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("course {id} not found")))?;
  Ok(Json(view))
}

// ─── Curated fields ───────────────────────────────────────────────────────────

/// `PUT /courses/:id/curated` replaces the description and notes.
pub async fn update_curated<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Body(body): Body<CuratedFields>,
) -> Result<Json<Course>, ApiError>
where
  S: CatalogStore,
{
  let store = &state.store;
  let missing = || ApiError::NotFound(format!("course {id} not found"));

  store
    .get_course(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(missing)?;
  store
    .update_curated(id, body)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  let course = store
    .get_course(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(missing)?;
  Ok(Json(course))
}

// ─── Relationships ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RelationshipParams {
  #[serde(rename = "type")]
  pub kind: Option<RelationshipType>,
}

/// `GET /courses/:id/relationships[?type=<kind>]`
pub async fn relationships<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<RelationshipParams>,
) -> Result<Json<Vec<Relationship>>, ApiError>
where
  S: CatalogStore,
{
  let rows = state
    .store
    .relationships_for(id, params.kind)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(rows))
}

/// JSON body accepted by `POST /courses/:id/relationships`.
#[derive(Debug, Deserialize)]
pub struct AddRelationshipBody {
  pub target:            CourseTarget,
  pub relationship_type: RelationshipType,
  pub description:       Option<String>,
}

/// `POST /courses/:id/relationships` returns 201 + the stored relationship.
pub async fn add_relationship<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Body(body): Body<AddRelationshipBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CatalogStore,
{
  let rel = admin::add_relationship(
    state.store.as_ref(),
    id,
    body.target,
    body.relationship_type,
    body.description,
  )
  .await?;
  Ok((StatusCode::CREATED, Json(rel)))
}

// ─── Prerequisite check ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CheckBody {
  #[serde(default)]
  pub completed: Vec<String>,
}

/// `POST /courses/:id/prerequisites/check`
pub async fn check_prerequisites<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Body(body): Body<CheckBody>,
) -> Result<Json<PrereqCheck>, ApiError>
where
  S: CatalogStore,
{
  let check = check_prerequisites_met(state.store.as_ref(), id, &body.completed).await?;
  Ok(Json(check))
}

// ─── Resolve ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ResolveParams {
  pub code: String,
}

#[derive(Debug, Serialize)]
pub struct Resolved {
  pub code:      String,
  pub course_id: Option<Uuid>,
}

/// `GET /resolve?code=<code>`; `course_id` is `null` when nothing matches.
pub async fn resolve<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ResolveParams>,
) -> Result<Json<Resolved>, ApiError>
where
  S: CatalogStore,
{
  let course_id = resolve_code(state.store.as_ref(), &params.code).await?;
  Ok(Json(Resolved { code: params.code, course_id }))
}
