//! Requirement relationships between courses.
//!
//! All rows sharing a `group_id` form one logical clause, combined with the
//! group's [`LogicType`]. A row's target may stay unresolved indefinitely;
//! its raw code and description are kept so the clause is never lost.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RelationshipType {
  Prerequisite,
  Corequisite,
  Recommended,
}

/// How the alternatives within one group combine.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogicType {
  And,
  #[default]
  Or,
}

impl LogicType {
  pub fn from_requires_all(requires_all: bool) -> Self {
    if requires_all { Self::And } else { Self::Or }
  }

  /// Separator used when describing an unmet group.
  pub fn joiner(self) -> &'static str {
    match self {
      Self::And => " AND ",
      Self::Or => " or ",
    }
  }
}

/// A persisted relationship row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
  pub relationship_id:     Uuid,
  pub course_id:           Uuid,
  pub related_course_id:   Option<Uuid>,
  /// The raw reference as it appeared in the source.
  pub related_course_code: Option<String>,
  pub relationship_type:   RelationshipType,
  /// `None` for rows added by hand; such a row is a group on its own.
  pub group_id:            Option<Uuid>,
  pub logic_type:          LogicType,
  pub description:         Option<String>,
}

impl Relationship {
  pub fn is_resolved(&self) -> bool { self.related_course_id.is_some() }

  /// Key under which this row is grouped for evaluation.
  pub fn group_key(&self) -> Uuid {
    self.group_id.unwrap_or(self.relationship_id)
  }
}

/// Input to [`crate::store::CatalogStore::insert_relationship`]; the id is
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelationship {
  pub course_id:           Uuid,
  pub related_course_id:   Option<Uuid>,
  pub related_course_code: Option<String>,
  pub relationship_type:   RelationshipType,
  pub group_id:            Option<Uuid>,
  pub logic_type:          LogicType,
  pub description:         Option<String>,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn text_forms() {
    assert_eq!(RelationshipType::Corequisite.to_string(), "corequisite");
    assert_eq!(
      RelationshipType::from_str("recommended").unwrap(),
      RelationshipType::Recommended
    );
    assert_eq!(LogicType::And.to_string(), "AND");
    assert_eq!(LogicType::from_str("OR").unwrap(), LogicType::Or);
    assert!(LogicType::from_str("XOR").is_err());
  }

  #[test]
  fn ungrouped_row_keys_on_its_own_id() {
    let row = Relationship {
      relationship_id:     Uuid::new_v4(),
      course_id:           Uuid::new_v4(),
      related_course_id:   None,
      related_course_code: Some("0075".into()),
      relationship_type:   RelationshipType::Prerequisite,
      group_id:            None,
      logic_type:          LogicType::Or,
      description:         None,
    };
    assert_eq!(row.group_key(), row.relationship_id);
    assert!(!row.is_resolved());
  }
}
