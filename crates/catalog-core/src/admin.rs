//! Administrative repair operations on relationships.
//!
//! Unresolved relationships are a standing data-quality condition, not an
//! error; these operations let an operator triage and re-link them by hand.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  relationship::{LogicType, NewRelationship, Relationship, RelationshipType},
  resolve::resolve_code,
  store::CatalogStore,
};

/// Every relationship whose target course is unknown, for manual triage.
pub async fn list_unresolved_relationships<S: CatalogStore>(
  store: &S,
) -> Result<Vec<Relationship>> {
  store.unresolved_relationships().await.map_err(Error::store)
}

/// Re-resolve `new_code` and point the relationship at it.
///
/// The code is stored as typed even when it resolves to nothing, so the
/// relationship stays visible in [`list_unresolved_relationships`]. A family
/// code whose prefix match lands on the owning course is also stored
/// unresolved; only the owner's exact code is refused.
pub async fn repair_relationship_code<S: CatalogStore>(
  store: &S,
  relationship_id: Uuid,
  new_code: &str,
) -> Result<Relationship> {
  let new_code = new_code.trim();
  if new_code.is_empty() {
    return Err(Error::InvalidCode(new_code.to_owned()));
  }

  let mut rel = store
    .get_relationship(relationship_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::RelationshipNotFound(relationship_id))?;

  let resolved = resolve_for(store, rel.course_id, new_code).await?;

  store
    .set_relationship_target(relationship_id, new_code.to_owned(), resolved)
    .await
    .map_err(Error::store)?;

  tracing::info!(
    relationship = %relationship_id,
    code = new_code,
    resolved = ?resolved,
    "relationship code repaired"
  );

  rel.related_course_code = Some(new_code.to_owned());
  rel.related_course_id = resolved;
  Ok(rel)
}

/// The far end of a hand-added relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CourseTarget {
  /// A persisted course, by id.
  Id(Uuid),
  /// A free-text code, resolved like any other reference.
  Code(String),
}

/// Add a single-row relationship to `course_id`.
///
/// The row has no group id, so it is evaluated as its own OR clause.
pub async fn add_relationship<S: CatalogStore>(
  store: &S,
  course_id: Uuid,
  target: CourseTarget,
  kind: RelationshipType,
  description: Option<String>,
) -> Result<Relationship> {
  store
    .get_course(course_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::CourseNotFound(course_id))?;

  let (code, related_course_id) = match target {
    CourseTarget::Id(id) => {
      let related = store
        .get_course(id)
        .await
        .map_err(Error::store)?
        .ok_or(Error::CourseNotFound(id))?;
      (related.external_code, Some(id))
    }
    CourseTarget::Code(code) => {
      let code = code.trim().to_owned();
      if code.is_empty() {
        return Err(Error::InvalidCode(code));
      }
      let resolved = resolve_for(store, course_id, &code).await?;
      (code, resolved)
    }
  };

  if related_course_id == Some(course_id) {
    return Err(Error::SelfReference(course_id));
  }

  let description = description.map(|d| d.trim().to_owned()).filter(|d| !d.is_empty());

  store
    .insert_relationship(NewRelationship {
      course_id,
      related_course_id,
      related_course_code: Some(code),
      relationship_type: kind,
      group_id: None,
      logic_type: LogicType::Or,
      description,
    })
    .await
    .map_err(Error::store)
}

/// Resolve `code` on behalf of `owner`.
///
/// The owner's own exact code is a [`Error::SelfReference`]. A prefix match
/// that lands on the owner resolves to nothing instead.
async fn resolve_for<S: CatalogStore>(
  store: &S,
  owner: Uuid,
  code: &str,
) -> Result<Option<Uuid>> {
  let resolved = resolve_code(store, code).await?;
  if resolved != Some(owner) {
    return Ok(resolved);
  }

  let exact = store
    .get_course(owner)
    .await
    .map_err(Error::store)?
    .is_some_and(|c| c.external_code == code);
  if exact {
    return Err(Error::SelfReference(owner));
  }

  tracing::debug!(course = %owner, code, "family code matched only the owning course");
  Ok(None)
}
