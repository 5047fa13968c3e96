//! Snapshot entries: one external pull of the full course catalog.
//!
//! Entries are read-only input to the reconciler. A document is split into
//! entries first and each entry is deserialised on its own, so one entry
//! with a missing or mistyped field does not prevent the rest of the
//! snapshot from loading. Field validation happens per entry inside the
//! reconciler.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

// ─── Entry ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
  #[serde(default)]
  pub external_code: Option<String>,
  #[serde(default)]
  pub external_uuid: Option<String>,
  #[serde(default)]
  pub name:          Option<String>,
  #[serde(default)]
  pub credits:       f64,
  #[serde(default = "default_length")]
  pub length:        u32,
  /// Derived from the name and tags when absent; see [`derive_gpa_weight`].
  #[serde(default)]
  pub gpa_weight:    Option<f64>,
  #[serde(default)]
  pub subject:       Option<String>,
  #[serde(default)]
  pub is_elective:   bool,
  #[serde(default)]
  pub tags:          Vec<String>,
  #[serde(default)]
  pub grades:        Vec<GradeEligibility>,
  #[serde(default)]
  pub prerequisites: Vec<RequirementGroup>,
  #[serde(default)]
  pub corequisites:  Vec<RequirementGroup>,
  #[serde(default)]
  pub recommended:   Vec<RequirementGroup>,
  #[serde(default)]
  pub variants:      Vec<SnapshotVariant>,
}

fn default_length() -> u32 { 1 }

fn default_can_plan() -> bool { true }

/// The grade levels a course may be planned in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeEligibility {
  pub grade: u8,
  /// Empty means eligible in every term of the grade.
  #[serde(default)]
  pub terms: Vec<TermOffering>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermOffering {
  pub term_number: u32,
  #[serde(default)]
  pub name:        Option<String>,
  #[serde(default = "default_can_plan")]
  pub can_plan:    bool,
}

/// One requirement clause: a list of alternatives that are all required
/// (`requires_all`) or of which any one suffices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementGroup {
  #[serde(default)]
  pub requires_all: bool,
  #[serde(default)]
  pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
  #[serde(default)]
  pub course_code: Option<String>,
  #[serde(default)]
  pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotVariant {
  pub variant_code:  String,
  #[serde(default)]
  pub name:          String,
  #[serde(default)]
  pub delivery_mode: Option<String>,
}

// ─── Document ────────────────────────────────────────────────────────────────

/// A whole snapshot as delivered: either a bare array of entries or an
/// object wrapping them. Entries stay raw JSON until [`Self::into_snapshot`]
/// reads them one by one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotDocument {
  Entries(Vec<Value>),
  Wrapped {
    courses: Vec<Value>,
    /// Advisory; a mismatch with `courses.len()` is logged, not rejected.
    #[serde(default)]
    count:   Option<usize>,
  },
}

impl SnapshotDocument {
  pub fn into_snapshot(self) -> Snapshot {
    let values = match self {
      Self::Entries(values) => values,
      Self::Wrapped { courses, count } => {
        if let Some(count) = count.filter(|n| *n != courses.len()) {
          tracing::warn!(declared = count, actual = courses.len(), "snapshot count mismatch");
        }
        courses
      }
    };
    Snapshot::from_values(values)
  }
}

/// An entry whose JSON could not be read as a [`SnapshotEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedEntry {
  /// Position in the delivered document.
  pub index: usize,
  /// The course code, when the raw entry carries a readable one.
  pub code:  Option<String>,
  pub error: String,
}

/// A parsed snapshot: the entries that deserialised, each with its position
/// in the document, and the ones that did not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
  entries:  Vec<(usize, SnapshotEntry)>,
  rejected: Vec<RejectedEntry>,
}

impl Snapshot {
  fn from_values(values: Vec<Value>) -> Self {
    let mut snapshot = Self::default();
    for (index, value) in values.into_iter().enumerate() {
      let code = value
        .get("external_code")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_owned);
      match serde_json::from_value::<SnapshotEntry>(value) {
        Ok(entry) => snapshot.entries.push((index, entry)),
        Err(err) => snapshot.rejected.push(RejectedEntry { index, code, error: err.to_string() }),
      }
    }
    snapshot
  }

  /// Deserialised entries with their document positions.
  pub fn entries(&self) -> &[(usize, SnapshotEntry)] { &self.entries }

  pub fn rejected(&self) -> &[RejectedEntry] { &self.rejected }

  /// Number of entries in the document, readable or not.
  pub fn len(&self) -> usize { self.entries.len() + self.rejected.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl From<Vec<SnapshotEntry>> for Snapshot {
  fn from(entries: Vec<SnapshotEntry>) -> Self {
    Self { entries: entries.into_iter().enumerate().collect(), rejected: Vec::new() }
  }
}

/// Parse a snapshot document from JSON text.
///
/// Only the document shape can fail here; entries that do not fit
/// [`SnapshotEntry`] are collected in [`Snapshot::rejected`].
pub fn parse_snapshot(json: &str) -> Result<Snapshot> {
  let doc: SnapshotDocument = serde_json::from_str(json)?;
  Ok(doc.into_snapshot())
}

// ─── Validation ──────────────────────────────────────────────────────────────

impl SnapshotEntry {
  /// The trimmed course code, if present and non-blank.
  pub fn code(&self) -> Option<&str> {
    self
      .external_code
      .as_deref()
      .map(str::trim)
      .filter(|c| !c.is_empty())
  }

  /// Check the fields the reconciler cannot do without.
  pub fn validate(&self) -> Result<&str> {
    let code = self
      .code()
      .ok_or_else(|| Error::MalformedEntry("missing course code".into()))?;

    if self.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
      return Err(Error::MalformedEntry(format!("course {code} has no name")));
    }
    if !self.credits.is_finite() || self.credits < 0.0 {
      return Err(Error::MalformedEntry(format!(
        "course {code} has invalid credits {}",
        self.credits
      )));
    }
    if let Some(v) = self.variants.iter().find(|v| v.variant_code.trim().is_empty()) {
      return Err(Error::MalformedEntry(format!(
        "course {code} has a variant without a code ({:?})",
        v.name
      )));
    }

    Ok(code)
  }

  /// The GPA weight to persist: the supplied one, or one derived from the
  /// name and tags.
  pub fn effective_gpa_weight(&self) -> f64 {
    self.gpa_weight.unwrap_or_else(|| {
      derive_gpa_weight(self.name.as_deref().unwrap_or_default(), &self.tags)
    })
  }
}

// ─── GPA weighting ───────────────────────────────────────────────────────────

pub const GPA_ADVANCED: f64 = 5.0;
pub const GPA_DUAL_CREDIT: f64 = 4.5;
pub const GPA_REGULAR: f64 = 4.0;

/// Weight for a course the snapshot did not weight itself.
///
/// Advanced Placement (`AP`, `KAP`) courses weigh 5.0, dual-credit courses
/// 4.5, everything else 4.0. Matching is case-insensitive and by whole word,
/// so "Chapter Books" is a regular course.
pub fn derive_gpa_weight(name: &str, tags: &[String]) -> f64 {
  let name = name.to_uppercase();
  let tags: Vec<String> = tags.iter().map(|t| t.to_uppercase()).collect();

  let advanced = has_word(&name, "AP")
    || has_word(&name, "KAP")
    || name.contains("ADVANCED PLACEMENT")
    || tags
      .iter()
      .any(|t| has_word(t, "AP") || has_word(t, "KAP") || t.contains("ADVANCED PLACEMENT"));
  if advanced {
    return GPA_ADVANCED;
  }

  let dual = name.contains("DUAL CREDIT")
    || has_word(&name, "DC")
    || tags.iter().any(|t| t.contains("DUAL CREDIT") || t.trim() == "DC");
  if dual {
    return GPA_DUAL_CREDIT;
  }

  GPA_REGULAR
}

fn has_word(haystack: &str, word: &str) -> bool {
  haystack
    .split(|c: char| !c.is_alphanumeric())
    .any(|w| w == word)
}

// ─── Requirement text ────────────────────────────────────────────────────────

const NON_COURSE_PHRASES: &[&str] = &[
  "credits of",
  "credit of",
  "permission of",
  "approval of",
  "consent of",
  "instructor approval",
  "teacher approval",
  "counselor approval",
  "department approval",
  "prerequisite approval",
];

/// True for requirement text that names a condition rather than a course
/// (e.g. "instructor approval", "2 credits of science").
pub fn is_non_course_requirement(text: &str) -> bool {
  let lower = text.to_lowercase();
  NON_COURSE_PHRASES.iter().any(|p| lower.contains(p))
}
