//! Persisted course rows and their reconciler-owned child collections.
//!
//! A course is never hard-deleted: degree plans reference it by
//! [`Course::course_id`], so a course that drops out of the snapshot is only
//! retired by clearing [`Course::is_offered`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Course ──────────────────────────────────────────────────────────────────

/// A course as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
  /// Stable surrogate id. Never changes once assigned.
  pub course_id:             Uuid,
  /// Globally unique; the only key used to match a snapshot entry to a row.
  pub external_code:         String,
  pub external_uuid:         Option<String>,
  pub name:                  String,
  pub credits:               f64,
  /// Number of terms the course runs for.
  pub length:                u32,
  pub gpa_weight:            f64,
  pub subject:               String,
  pub is_elective:           bool,
  pub is_offered:            bool,
  /// Set on the cycle that first inserts the course, cleared by the next
  /// cycle that sees it again.
  pub is_new:                bool,
  /// Curated; never written by reconciliation.
  pub description:           String,
  /// Curated; never written by reconciliation.
  pub notes:                 String,
  /// Mirror of the most recent snapshot entry, kept for audit.
  pub last_snapshot_payload: serde_json::Value,
  pub created_at:            DateTime<Utc>,
  pub updated_at:            DateTime<Utc>,
  pub last_seen_at:          DateTime<Utc>,
}

/// The reconciler-owned core fields of a course.
///
/// Input to [`crate::store::CatalogStore::insert_course`] and
/// [`crate::store::CatalogStore::update_course`]. Carries no curated
/// fields.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseFields {
  pub external_code:         String,
  pub external_uuid:         Option<String>,
  pub name:                  String,
  pub credits:               f64,
  pub length:                u32,
  pub gpa_weight:            f64,
  pub subject:               String,
  pub is_elective:           bool,
  pub last_snapshot_payload: serde_json::Value,
}

/// Fields maintained by human editors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratedFields {
  pub description: String,
  pub notes:       String,
}

/// The minimal projection the code resolver works over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRef {
  pub course_id:     Uuid,
  pub external_code: String,
}

// ─── Child collections ───────────────────────────────────────────────────────

/// One tag on a course; `(course_id, tag)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
  pub course_id: Uuid,
  pub tag:       String,
}

/// Grade/term eligibility; `(course_id, grade, term_number)` is unique.
///
/// A `None` term means the course may be taken in any term of that grade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityRecord {
  pub course_id:   Uuid,
  pub grade:       u8,
  pub term_number: Option<u32>,
  pub term_name:   Option<String>,
  pub can_plan:    bool,
}

/// A delivery-mode offering of a course (e.g. virtual, summer).
///
/// `variant_code` is unique across the whole catalog, not just within its
/// parent course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
  pub variant_code:  String,
  pub course_id:     Uuid,
  pub name:          String,
  pub delivery_mode: Option<String>,
  pub is_offered:    bool,
}

/// Outcome of [`crate::store::CatalogStore::upsert_variant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantWrite {
  Inserted,
  /// The code already existed under another course and was moved in place.
  Reassigned { previous_course_id: Uuid },
}

// ─── Read model ──────────────────────────────────────────────────────────────

/// A course joined with its child collections. Derived on read, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseView {
  pub course:      Course,
  pub tags:        Vec<String>,
  pub eligibility: Vec<EligibilityRecord>,
  pub variants:    Vec<Variant>,
}
