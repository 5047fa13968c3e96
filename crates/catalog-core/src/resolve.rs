//! Course-code resolution.
//!
//! The catalog encodes course families as a base code plus a trailing
//! section letter ("0075" → "0075A", "0075B"). Legacy references often carry
//! only the base, so resolution falls back to a prefix match. An exact match
//! always wins, so a base code that is itself a course is never shadowed by
//! a family member.

use uuid::Uuid;

use crate::{Error, Result, course::CourseRef, store::CatalogStore};

/// Resolve `reference` against `candidates`.
///
/// 1. exact, case-sensitive match on the code;
/// 2. otherwise the lexicographically smallest code starting with
///    `reference`;
/// 3. otherwise `None`.
///
/// A blank reference never resolves.
pub fn resolve_among<'a, I>(reference: &str, candidates: I) -> Option<Uuid>
where
  I: IntoIterator<Item = &'a CourseRef>,
{
  let reference = reference.trim();
  if reference.is_empty() {
    return None;
  }

  let mut best: Option<&CourseRef> = None;
  for c in candidates {
    if c.external_code == reference {
      return Some(c.course_id);
    }
    if c.external_code.starts_with(reference)
      && best.is_none_or(|b| {
        (c.external_code.as_str(), c.course_id) < (b.external_code.as_str(), b.course_id)
      })
    {
      best = Some(c);
    }
  }
  best.map(|c| c.course_id)
}

/// Resolve `reference` against the persisted catalog.
pub async fn resolve_code<S: CatalogStore>(
  store: &S,
  reference: &str,
) -> Result<Option<Uuid>> {
  let reference = reference.trim();
  if reference.is_empty() {
    return Ok(None);
  }

  let candidates = store
    .courses_with_code_prefix(reference.to_owned())
    .await
    .map_err(Error::store)?;

  let resolved = resolve_among(reference, &candidates);
  if let Some(id) = resolved
    && let Some(hit) = candidates.iter().find(|c| c.course_id == id)
    && hit.external_code != reference
  {
    let (base, section) = base_code(&hit.external_code);
    tracing::debug!(
      reference,
      resolved = %hit.external_code,
      family = base,
      section = ?section,
      "resolved course code by family prefix"
    );
  }
  Ok(resolved)
}

/// Split a trailing section letter (`A`/`B` semester halves, `F`/`S`
/// fall/spring) from a course code.
///
/// Codes consisting of a single character are returned unchanged.
pub fn base_code(code: &str) -> (&str, Option<char>) {
  match code.char_indices().last() {
    Some((idx, c)) if idx > 0 && matches!(c, 'A' | 'B' | 'F' | 'S') => {
      (&code[..idx], Some(c))
    }
    _ => (code, None),
  }
}
