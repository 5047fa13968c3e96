//! Catalog reconciliation: merge a full snapshot into the persistent store.
//!
//! A cycle runs three passes:
//!
//! 0. **Deactivation.** Courses absent from the snapshot are retired
//!    (`is_offered = false`, cascaded to their variants) in one batched
//!    update. Nothing is ever hard-deleted.
//! 1. **Upsert.** Each entry is matched to a row by external code, its core
//!    fields are written, and its tags, eligibility and variants are deleted
//!    and regenerated.
//! 2. **Relationships.** Requirement groups are rewritten and linked by exact
//!    code against the courses written in pass 1.
//!
//! Per-entry failures are recorded in [`ReconcileStats`] and never abort the
//! cycle. An entry that fails validation is skipped but its code still
//! counts as present in pass 0, so a bad entry never retires its course. The child sync of one course is not atomic; a failure part-way
//! leaves that course partially synced until the next successful cycle
//! regenerates it. At most one cycle may run at a time; callers serialise
//! invocations.

use std::{
  collections::{BTreeSet, HashMap, HashSet},
  fmt,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  course::{CourseFields, EligibilityRecord, Variant, VariantWrite},
  relationship::{LogicType, NewRelationship, RelationshipType},
  snapshot::{RejectedEntry, Snapshot, SnapshotEntry, is_non_course_requirement},
  store::CatalogStore,
};

// ─── Options & statistics ────────────────────────────────────────────────────

/// Knobs for one reconciliation cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileOptions {
  /// Tags never imported; compared case-insensitively.
  pub tag_skip_list:     Vec<String>,
  /// Cap on [`ReconcileStats::error_details`]. `errors` keeps counting past
  /// it.
  pub max_error_details: usize,
}

impl Default for ReconcileOptions {
  fn default() -> Self {
    Self { tag_skip_list: Vec::new(), max_error_details: 50 }
  }
}

impl ReconcileOptions {
  fn skips_tag(&self, tag: &str) -> bool {
    let tag = tag.to_lowercase();
    self.tag_skip_list.iter().any(|s| s.to_lowercase() == tag)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
  /// The offending course code, or `#<index>` for entries without one.
  pub code:  String,
  pub error: String,
}

/// Aggregate outcome of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
  pub total:                 usize,
  pub created:               usize,
  pub updated:               usize,
  pub deactivated:           u64,
  pub tags_created:          usize,
  pub eligibility_created:   usize,
  pub relationships_created: usize,
  pub variants_created:      usize,
  pub variants_updated:      usize,
  pub errors:                usize,
  pub error_details:         Vec<ErrorDetail>,
}

impl ReconcileStats {
  fn record_error(&mut self, code: &str, err: impl fmt::Display, options: &ReconcileOptions) {
    tracing::warn!(code, error = %err, "snapshot entry failed");
    self.errors += 1;
    if self.error_details.len() < options.max_error_details {
      self.error_details.push(ErrorDetail { code: code.to_owned(), error: err.to_string() });
    }
  }
}

// ─── Cycle ───────────────────────────────────────────────────────────────────

/// Run one reconciliation cycle of `snapshot` against `store`.
///
/// Fails outright only when nothing could be applied: an empty snapshot, a
/// snapshot in which no entry is usable (refused before any write, with the
/// stats inside [`Error::NothingWritten`]), a store that rejects the pass-0
/// update, or a cycle in which every upsert failed.
pub async fn reconcile<S: CatalogStore>(
  store: &S,
  snapshot: &[SnapshotEntry],
  options: &ReconcileOptions,
) -> Result<ReconcileStats> {
  run_cycle(store, snapshot.iter().enumerate().collect(), &[], options).await
}

/// [`reconcile`] over a parsed document, counting its rejected entries as
/// per-entry errors.
pub async fn reconcile_snapshot<S: CatalogStore>(
  store: &S,
  snapshot: &Snapshot,
  options: &ReconcileOptions,
) -> Result<ReconcileStats> {
  let entries = snapshot.entries().iter().map(|(i, e)| (*i, e)).collect();
  run_cycle(store, entries, snapshot.rejected(), options).await
}

async fn run_cycle<S: CatalogStore>(
  store: &S,
  entries: Vec<(usize, &SnapshotEntry)>,
  rejected: &[RejectedEntry],
  options: &ReconcileOptions,
) -> Result<ReconcileStats> {
  let total = entries.len() + rejected.len();
  if total == 0 {
    return Err(Error::EmptySnapshot);
  }

  let mut stats = ReconcileStats { total, ..Default::default() };

  // Every code named in the document counts as present, usable or not.
  let mut present: BTreeSet<String> = BTreeSet::new();

  for r in rejected {
    present.extend(r.code.clone());
    let label = r.code.clone().unwrap_or_else(|| format!("#{}", r.index));
    stats.record_error(&label, format!("unreadable snapshot entry: {}", r.error), options);
  }

  let mut valid: Vec<(&str, &SnapshotEntry)> = Vec::with_capacity(entries.len());
  for (idx, entry) in entries {
    present.extend(entry.code().map(str::to_owned));
    match entry.validate() {
      Ok(code) => valid.push((code, entry)),
      Err(err) => {
        let label = entry.code().map_or_else(|| format!("#{idx}"), str::to_owned);
        stats.record_error(&label, &err, options);
      }
    }
  }

  if valid.is_empty() {
    tracing::warn!(errors = stats.errors, "no usable snapshot entries; nothing applied");
    return Err(Error::NothingWritten(Box::new(stats)));
  }

  // ── Pass 0 ──
  tracing::info!(present = present.len(), "pass 0: retiring courses missing from snapshot");
  stats.deactivated = store
    .deactivate_missing(present.into_iter().collect())
    .await
    .map_err(Error::store)?;

  // ── Pass 1 ──
  tracing::info!(entries = valid.len(), "pass 1: upserting courses");
  // Scoped to this cycle; never reused across runs.
  let mut code_map: HashMap<String, Uuid> = HashMap::with_capacity(valid.len());
  let mut synced: Vec<(&str, &SnapshotEntry, Uuid)> = Vec::with_capacity(valid.len());
  for &(code, entry) in &valid {
    match sync_course(store, code, entry, options, &mut code_map, &mut stats).await {
      Ok(course_id) => synced.push((code, entry, course_id)),
      Err(err) => stats.record_error(code, &err, options),
    }
  }

  // ── Pass 2 ──
  tracing::info!(courses = synced.len(), "pass 2: linking relationships");
  for (code, entry, course_id) in synced {
    if let Err(err) = link_relationships(store, entry, course_id, &code_map, &mut stats).await {
      stats.record_error(code, &err, options);
    }
  }

  tracing::info!(
    total = stats.total,
    created = stats.created,
    updated = stats.updated,
    deactivated = stats.deactivated,
    errors = stats.errors,
    "reconciliation finished"
  );

  if stats.created + stats.updated == 0 {
    return Err(Error::NothingWritten(Box::new(stats)));
  }
  Ok(stats)
}

// ─── Pass 1 ──────────────────────────────────────────────────────────────────

async fn sync_course<S: CatalogStore>(
  store: &S,
  code: &str,
  entry: &SnapshotEntry,
  options: &ReconcileOptions,
  code_map: &mut HashMap<String, Uuid>,
  stats: &mut ReconcileStats,
) -> Result<Uuid> {
  let fields = CourseFields {
    external_code:         code.to_owned(),
    external_uuid:         entry.external_uuid.clone(),
    name:                  entry.name.as_deref().unwrap_or_default().trim().to_owned(),
    credits:               entry.credits,
    length:                entry.length,
    gpa_weight:            entry.effective_gpa_weight(),
    subject:               entry
      .subject
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .unwrap_or("Unknown")
      .to_owned(),
    is_elective:           entry.is_elective,
    last_snapshot_payload: serde_json::to_value(entry)?,
  };

  let existing = store
    .find_course_by_code(code.to_owned())
    .await
    .map_err(Error::store)?;

  let course_id = match existing {
    Some(course) => {
      store.update_course(course.course_id, fields).await.map_err(Error::store)?;
      stats.updated += 1;
      course.course_id
    }
    None => {
      let course = store.insert_course(fields).await.map_err(Error::store)?;
      stats.created += 1;
      course.course_id
    }
  };
  code_map.insert(code.to_owned(), course_id);

  // Tags.
  store.delete_tags(course_id).await.map_err(Error::store)?;
  let mut seen = HashSet::new();
  for tag in entry.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
    if options.skips_tag(tag) || !seen.insert(tag) {
      continue;
    }
    store.insert_tag(course_id, tag.to_owned()).await.map_err(Error::store)?;
    stats.tags_created += 1;
  }

  // Eligibility.
  store.delete_eligibility(course_id).await.map_err(Error::store)?;
  let mut seen = HashSet::new();
  for record in eligibility_records(course_id, entry) {
    if !seen.insert((record.grade, record.term_number)) {
      continue;
    }
    store.insert_eligibility(record).await.map_err(Error::store)?;
    stats.eligibility_created += 1;
  }

  // Variants.
  store.delete_variants(course_id).await.map_err(Error::store)?;
  for v in &entry.variants {
    let variant = Variant {
      variant_code:  v.variant_code.trim().to_owned(),
      course_id,
      name:          v.name.clone(),
      delivery_mode: v.delivery_mode.clone(),
      is_offered:    true,
    };
    match store.upsert_variant(variant).await.map_err(Error::store)? {
      VariantWrite::Inserted => stats.variants_created += 1,
      VariantWrite::Reassigned { previous_course_id } => {
        tracing::debug!(
          variant = %v.variant_code,
          from = %previous_course_id,
          to = %course_id,
          "variant code moved between courses"
        );
        stats.variants_updated += 1;
      }
    }
  }

  Ok(course_id)
}

/// One row per (grade, term) offering; a grade that lists no terms yields a
/// single plannable row with no term.
fn eligibility_records(course_id: Uuid, entry: &SnapshotEntry) -> Vec<EligibilityRecord> {
  entry
    .grades
    .iter()
    .flat_map(|g| {
      if g.terms.is_empty() {
        vec![EligibilityRecord {
          course_id,
          grade: g.grade,
          term_number: None,
          term_name: None,
          can_plan: true,
        }]
      } else {
        g.terms
          .iter()
          .map(|t| EligibilityRecord {
            course_id,
            grade: g.grade,
            term_number: Some(t.term_number),
            term_name: t.name.clone(),
            can_plan: t.can_plan,
          })
          .collect()
      }
    })
    .collect()
}

// ─── Pass 2 ──────────────────────────────────────────────────────────────────

async fn link_relationships<S: CatalogStore>(
  store: &S,
  entry: &SnapshotEntry,
  course_id: Uuid,
  code_map: &HashMap<String, Uuid>,
  stats: &mut ReconcileStats,
) -> Result<()> {
  store.delete_relationships(course_id).await.map_err(Error::store)?;

  let kinds = [
    (RelationshipType::Prerequisite, &entry.prerequisites),
    (RelationshipType::Corequisite, &entry.corequisites),
    (RelationshipType::Recommended, &entry.recommended),
  ];

  for (kind, groups) in kinds {
    for group in groups.iter().filter(|g| !g.alternatives.is_empty()) {
      let group_id = Uuid::new_v4();
      let logic_type = LogicType::from_requires_all(group.requires_all);

      for alt in &group.alternatives {
        let description = Some(alt.description.trim())
          .filter(|d| !d.is_empty())
          .map(str::to_owned);
        let code = alt
          .course_code
          .as_deref()
          .map(str::trim)
          .filter(|c| !c.is_empty())
          .filter(|_| !is_non_course_requirement(&alt.description))
          .map(str::to_owned);
        // Exact only: codes within one snapshot are taken as written.
        let related_course_id = code.as_ref().and_then(|c| code_map.get(c)).copied();

        if related_course_id.is_none() {
          tracing::debug!(
            course = %course_id,
            code = ?code,
            description = ?description,
            "relationship left unresolved"
          );
        }

        store
          .insert_relationship(NewRelationship {
            course_id,
            related_course_id,
            related_course_code: code,
            relationship_type: kind,
            group_id: Some(group_id),
            logic_type,
            description,
          })
          .await
          .map_err(Error::store)?;
        stats.relationships_created += 1;
      }
    }
  }

  Ok(())
}
