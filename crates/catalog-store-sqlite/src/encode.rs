//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings and UUIDs as hyphenated
//! lowercase strings. Enums use their `strum` text forms. The snapshot
//! payload is stored as compact JSON.

use std::str::FromStr;

use catalog_core::{
  course::{Course, CourseRef, EligibilityRecord, Variant},
  relationship::{LogicType, Relationship, RelationshipType},
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_relationship_type(s: &str) -> Result<RelationshipType> {
  RelationshipType::from_str(s).map_err(|_| Error::UnknownValue {
    column: "relationship_type",
    value:  s.to_owned(),
  })
}

pub fn decode_logic_type(s: &str) -> Result<LogicType> {
  LogicType::from_str(s).map_err(|_| Error::UnknownValue {
    column: "logic_type",
    value:  s.to_owned(),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawCourse::from_row`].
pub const COURSE_COLUMNS: &str = "course_id, external_code, external_uuid, name, credits, \
   length, gpa_weight, subject, is_elective, is_offered, description, notes, \
   last_snapshot_payload, created_at, updated_at, last_seen_at, is_new";

/// Raw values read directly from a `courses` row.
pub struct RawCourse {
  pub course_id:             String,
  pub external_code:         String,
  pub external_uuid:         Option<String>,
  pub name:                  String,
  pub credits:               f64,
  pub length:                u32,
  pub gpa_weight:            f64,
  pub subject:               String,
  pub is_elective:           bool,
  pub is_offered:            bool,
  pub description:           String,
  pub notes:                 String,
  pub last_snapshot_payload: String,
  pub created_at:            String,
  pub updated_at:            String,
  pub last_seen_at:          String,
  pub is_new:                bool,
}

impl RawCourse {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      course_id:             row.get(0)?,
      external_code:         row.get(1)?,
      external_uuid:         row.get(2)?,
      name:                  row.get(3)?,
      credits:               row.get(4)?,
      length:                row.get(5)?,
      gpa_weight:            row.get(6)?,
      subject:               row.get(7)?,
      is_elective:           row.get(8)?,
      is_offered:            row.get(9)?,
      description:           row.get(10)?,
      notes:                 row.get(11)?,
      last_snapshot_payload: row.get(12)?,
      created_at:            row.get(13)?,
      updated_at:            row.get(14)?,
      last_seen_at:          row.get(15)?,
      is_new:                row.get(16)?,
    })
  }

  pub fn into_course(self) -> Result<Course> {
    Ok(Course {
      course_id:             decode_uuid(&self.course_id)?,
      external_code:         self.external_code,
      external_uuid:         self.external_uuid,
      name:                  self.name,
      credits:               self.credits,
      length:                self.length,
      gpa_weight:            self.gpa_weight,
      subject:               self.subject,
      is_elective:           self.is_elective,
      is_offered:            self.is_offered,
      is_new:                self.is_new,
      description:           self.description,
      notes:                 self.notes,
      last_snapshot_payload: serde_json::from_str(&self.last_snapshot_payload)?,
      created_at:            decode_dt(&self.created_at)?,
      updated_at:            decode_dt(&self.updated_at)?,
      last_seen_at:          decode_dt(&self.last_seen_at)?,
    })
  }
}

pub struct RawCourseRef {
  pub course_id:     String,
  pub external_code: String,
}

impl RawCourseRef {
  pub fn into_ref(self) -> Result<CourseRef> {
    Ok(CourseRef {
      course_id:     decode_uuid(&self.course_id)?,
      external_code: self.external_code,
    })
  }
}

pub struct RawEligibility {
  pub course_id:   String,
  pub grade:       u8,
  pub term_number: Option<u32>,
  pub term_name:   Option<String>,
  pub can_plan:    bool,
}

impl RawEligibility {
  pub fn into_record(self) -> Result<EligibilityRecord> {
    Ok(EligibilityRecord {
      course_id:   decode_uuid(&self.course_id)?,
      grade:       self.grade,
      term_number: self.term_number,
      term_name:   self.term_name,
      can_plan:    self.can_plan,
    })
  }
}

pub struct RawVariant {
  pub variant_code:  String,
  pub course_id:     String,
  pub name:          String,
  pub delivery_mode: Option<String>,
  pub is_offered:    bool,
}

impl RawVariant {
  pub fn into_variant(self) -> Result<Variant> {
    Ok(Variant {
      variant_code:  self.variant_code,
      course_id:     decode_uuid(&self.course_id)?,
      name:          self.name,
      delivery_mode: self.delivery_mode,
      is_offered:    self.is_offered,
    })
  }
}

/// Column list matching [`RawRelationship::from_row`].
pub const RELATIONSHIP_COLUMNS: &str = "relationship_id, course_id, related_course_id, \
   related_course_code, relationship_type, group_id, logic_type, description";

/// Raw strings read directly from a `course_relationships` row.
pub struct RawRelationship {
  pub relationship_id:     String,
  pub course_id:           String,
  pub related_course_id:   Option<String>,
  pub related_course_code: Option<String>,
  pub relationship_type:   String,
  pub group_id:            Option<String>,
  pub logic_type:          String,
  pub description:         Option<String>,
}

impl RawRelationship {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      relationship_id:     row.get(0)?,
      course_id:           row.get(1)?,
      related_course_id:   row.get(2)?,
      related_course_code: row.get(3)?,
      relationship_type:   row.get(4)?,
      group_id:            row.get(5)?,
      logic_type:          row.get(6)?,
      description:         row.get(7)?,
    })
  }

  pub fn into_relationship(self) -> Result<Relationship> {
    Ok(Relationship {
      relationship_id:     decode_uuid(&self.relationship_id)?,
      course_id:           decode_uuid(&self.course_id)?,
      related_course_id:   self.related_course_id.as_deref().map(decode_uuid).transpose()?,
      related_course_code: self.related_course_code,
      relationship_type:   decode_relationship_type(&self.relationship_type)?,
      group_id:            self.group_id.as_deref().map(decode_uuid).transpose()?,
      logic_type:          decode_logic_type(&self.logic_type)?,
      description:         self.description,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn enum_columns_roundtrip_through_text() {
    for kind in [
      RelationshipType::Prerequisite,
      RelationshipType::Corequisite,
      RelationshipType::Recommended,
    ] {
      assert_eq!(decode_relationship_type(&kind.to_string()).unwrap(), kind);
    }
    assert_eq!(decode_logic_type("AND").unwrap(), LogicType::And);
    assert!(matches!(
      decode_logic_type("and"),
      Err(Error::UnknownValue { column: "logic_type", .. })
    ));
  }

  #[test]
  fn bad_timestamp_is_reported() {
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }
}
