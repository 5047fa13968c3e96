//! Prerequisite satisfaction.
//!
//! Pure and read-only: safe to call concurrently and repeatedly, e.g. once per
//! candidate course while a student builds a plan.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  relationship::{LogicType, Relationship, RelationshipType},
  store::CatalogStore,
};

/// Result of a prerequisite check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrereqCheck {
  pub met:   bool,
  /// One human-readable description per unsatisfied group.
  pub unmet: Vec<String>,
}

impl PrereqCheck {
  pub fn satisfied() -> Self { Self { met: true, unmet: Vec::new() } }
}

/// An alternative is satisfied when some completed code starts with its
/// course code. The test is one-directional: "0075B" satisfies "0075", but
/// "075" does not.
fn alternative_met(row: &Relationship, completed: &[&str]) -> bool {
  match row.related_course_code.as_deref().map(str::trim) {
    Some(code) if !code.is_empty() => completed.iter().any(|c| c.starts_with(code)),
    _ => false,
  }
}

fn describe(rows: &[&Relationship], logic: LogicType) -> String {
  rows
    .iter()
    .map(|r| {
      r.description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .or(r.related_course_code.as_deref())
        .unwrap_or("?")
    })
    .collect::<Vec<_>>()
    .join(logic.joiner())
}

/// Evaluate `relationships` against a set of completed course codes.
///
/// Only prerequisite rows are considered. Rows are grouped by group id; a row
/// without one forms its own OR group. The result is met iff every group is.
pub fn evaluate<C: AsRef<str>>(relationships: &[Relationship], completed: &[C]) -> PrereqCheck {
  let completed: Vec<&str> = completed.iter().map(|c| c.as_ref().trim()).collect();

  // Groups in first-seen order so `unmet` is stable.
  let mut groups: Vec<(Uuid, LogicType, Vec<&Relationship>)> = Vec::new();
  for row in relationships
    .iter()
    .filter(|r| r.relationship_type == RelationshipType::Prerequisite)
  {
    let key = row.group_key();
    match groups.iter_mut().find(|(k, ..)| *k == key) {
      Some((_, _, rows)) => rows.push(row),
      None => {
        let logic = if row.group_id.is_some() { row.logic_type } else { LogicType::Or };
        groups.push((key, logic, vec![row]));
      }
    }
  }

  let unmet: Vec<String> = groups
    .iter()
    .filter(|(_, logic, rows)| {
      let satisfied = match logic {
        LogicType::And => rows.iter().all(|r| alternative_met(r, &completed)),
        LogicType::Or => rows.iter().any(|r| alternative_met(r, &completed)),
      };
      !satisfied
    })
    .map(|(_, logic, rows)| describe(rows, *logic))
    .collect();

  PrereqCheck { met: unmet.is_empty(), unmet }
}

/// Check whether `completed` satisfies the prerequisites of `course_id`.
///
/// A course with no prerequisite rows is vacuously satisfied.
pub async fn check_prerequisites_met<S, C>(
  store: &S,
  course_id: Uuid,
  completed: &[C],
) -> Result<PrereqCheck>
where
  S: CatalogStore,
  C: AsRef<str> + Sync,
{
  let rows = store
    .relationships_for(course_id, Some(RelationshipType::Prerequisite))
    .await
    .map_err(Error::store)?;

  if rows.is_empty() {
    return Ok(PrereqCheck::satisfied());
  }
  Ok(evaluate(&rows, completed))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row(group: Option<Uuid>, logic: LogicType, code: Option<&str>, desc: Option<&str>) -> Relationship {
    Relationship {
      relationship_id:     Uuid::new_v4(),
      course_id:           Uuid::nil(),
      related_course_id:   None,
      related_course_code: code.map(Into::into),
      relationship_type:   RelationshipType::Prerequisite,
      group_id:            group,
      logic_type:          logic,
      description:         desc.map(Into::into),
    }
  }

  fn group(logic: LogicType, codes: &[&str]) -> Vec<Relationship> {
    let id = Uuid::new_v4();
    codes.iter().map(|c| row(Some(id), logic, Some(c), Some(c))).collect()
  }

  #[test]
  fn no_prerequisites_is_met() {
    let none: Vec<String> = vec![];
    assert_eq!(evaluate(&[], &none), PrereqCheck::satisfied());
    assert!(evaluate(&[], &["0075"]).met);
  }

  #[test]
  fn and_group_needs_every_alternative() {
    let rows = group(LogicType::And, &["A", "B"]);

    let partial = evaluate(&rows, &["A"]);
    assert!(!partial.met);
    assert_eq!(partial.unmet, vec!["A AND B".to_string()]);

    assert!(evaluate(&rows, &["A", "B"]).met);
  }

  #[test]
  fn or_group_needs_any_alternative() {
    let rows = group(LogicType::Or, &["A", "B"]);
    assert!(evaluate(&rows, &["B"]).met);

    let none = evaluate(&rows, &["C"]);
    assert_eq!(none.unmet, vec!["A or B".to_string()]);
  }

  #[test]
  fn prefix_is_one_directional() {
    let rows = group(LogicType::Or, &["0075"]);
    assert!(evaluate(&rows, &["0075B"]).met);
    assert!(!evaluate(&rows, &["075"]).met);
    assert!(!evaluate(&rows, &["10075"]).met);
  }

  #[test]
  fn completed_order_does_not_matter() {
    let mut rows = group(LogicType::And, &["0101", "0202"]);
    rows.extend(group(LogicType::Or, &["0303", "0404"]));

    let a = evaluate(&rows, &["0404B", "0202A", "0101"]);
    let b = evaluate(&rows, &["0101", "0202A", "0404B"]);
    assert_eq!(a, b);
    assert!(a.met);
  }

  #[test]
  fn every_group_must_hold() {
    let mut rows = group(LogicType::Or, &["0101"]);
    rows.extend(group(LogicType::Or, &["0202"]));

    let check = evaluate(&rows, &["0101"]);
    assert!(!check.met);
    assert_eq!(check.unmet, vec!["0202".to_string()]);
  }

  #[test]
  fn codeless_alternatives() {
    let id = Uuid::new_v4();
    let approval = row(Some(id), LogicType::And, None, Some("Instructor approval"));
    let algebra = row(Some(id), LogicType::And, Some("0201"), None);

    let and_rows = vec![approval.clone(), algebra.clone()];
    let check = evaluate(&and_rows, &["0201"]);
    assert!(!check.met);
    assert_eq!(check.unmet, vec!["Instructor approval AND 0201".to_string()]);

    let or_id = Uuid::new_v4();
    let or_rows = vec![
      Relationship { group_id: Some(or_id), logic_type: LogicType::Or, ..approval },
      Relationship { group_id: Some(or_id), logic_type: LogicType::Or, ..algebra },
    ];
    assert!(evaluate(&or_rows, &["0201A"]).met);
  }

  #[test]
  fn ungrouped_rows_are_separate_or_groups() {
    // Logic type on an ungrouped row is ignored.
    let rows = vec![
      row(None, LogicType::And, Some("0101"), None),
      row(None, LogicType::And, None, None),
    ];
    let check = evaluate(&rows, &["0101"]);
    assert_eq!(check.unmet, vec!["?".to_string()]);
  }

  #[test]
  fn non_prerequisite_rows_are_ignored() {
    let mut rows = group(LogicType::And, &["0999"]);
    for r in &mut rows {
      r.relationship_type = RelationshipType::Corequisite;
    }
    assert!(evaluate(&rows, &["0101"]).met);
  }
}
