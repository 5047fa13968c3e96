//! The `CatalogStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `catalog-store-sqlite`).
//! The reconciler, resolver and evaluator in this crate, and the API and admin
//! binary above it, depend on this abstraction, not on any concrete backend.
//!
//! Methods are fine-grained. The delete-then-insert sequence for a course's
//! child rows is driven by [`crate::reconcile`], not by the backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  course::{
    Course, CourseFields, CourseRef, CourseView, CuratedFields, EligibilityRecord,
    Variant, VariantWrite,
  },
  relationship::{NewRelationship, Relationship, RelationshipType},
};

/// Abstraction over a catalog store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Courses ───────────────────────────────────────────────────────────

  fn get_course(
    &self,
    course_id: Uuid,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + '_;

  /// Exact, case-sensitive lookup by external code.
  fn find_course_by_code(
    &self,
    code: String,
  ) -> impl Future<Output = Result<Option<Course>, Self::Error>> + Send + '_;

  /// Every course whose code starts with `prefix` (exact matches included),
  /// regardless of offering status.
  fn courses_with_code_prefix(
    &self,
    prefix: String,
  ) -> impl Future<Output = Result<Vec<CourseRef>, Self::Error>> + Send + '_;

  /// List courses ordered by code.
  fn list_courses(
    &self,
    offered_only: bool,
  ) -> impl Future<Output = Result<Vec<Course>, Self::Error>> + Send + '_;

  /// Insert a new, offered course with empty curated fields.
  fn insert_course(
    &self,
    fields: CourseFields,
  ) -> impl Future<Output = Result<Course, Self::Error>> + Send + '_;

  /// Overwrite the core fields of an existing course and mark it offered.
  /// Curated fields are left untouched.
  fn update_course(
    &self,
    course_id: Uuid,
    fields: CourseFields,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The editing interface's entry point; the reconciler never calls this.
  fn update_curated(
    &self,
    course_id: Uuid,
    curated: CuratedFields,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// In one batched update, mark every offered course whose code is not in
  /// `present_codes` as not offered, along with its variants. Returns the
  /// number of courses retired.
  fn deactivate_missing(
    &self,
    present_codes: Vec<String>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Child collections ─────────────────────────────────────────────────

  fn delete_tags(
    &self,
    course_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn insert_tag(
    &self,
    course_id: Uuid,
    tag: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn delete_eligibility(
    &self,
    course_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn insert_eligibility(
    &self,
    record: EligibilityRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn delete_variants(
    &self,
    course_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Insert a variant. If its code already belongs to another course, update
  /// that row in place (fields and parent course) instead of failing.
  fn upsert_variant(
    &self,
    variant: Variant,
  ) -> impl Future<Output = Result<VariantWrite, Self::Error>> + Send + '_;

  // ── Relationships ─────────────────────────────────────────────────────

  fn delete_relationships(
    &self,
    course_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn insert_relationship(
    &self,
    input: NewRelationship,
  ) -> impl Future<Output = Result<Relationship, Self::Error>> + Send + '_;

  fn get_relationship(
    &self,
    relationship_id: Uuid,
  ) -> impl Future<Output = Result<Option<Relationship>, Self::Error>> + Send + '_;

  /// Relationships owned by `course_id`, optionally restricted to one type.
  fn relationships_for(
    &self,
    course_id: Uuid,
    kind: Option<RelationshipType>,
  ) -> impl Future<Output = Result<Vec<Relationship>, Self::Error>> + Send + '_;

  /// All relationships whose target course is unknown.
  fn unresolved_relationships(
    &self,
  ) -> impl Future<Output = Result<Vec<Relationship>, Self::Error>> + Send + '_;

  /// Re-point a relationship at a new raw code and (possibly no) course.
  fn set_relationship_target(
    &self,
    relationship_id: Uuid,
    code: String,
    related_course_id: Option<Uuid>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Materialise a [`CourseView`]. Returns `None` if the course does not
  /// exist.
  fn materialize(
    &self,
    course_id: Uuid,
  ) -> impl Future<Output = Result<Option<CourseView>, Self::Error>> + Send + '_;
}
