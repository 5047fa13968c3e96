//! Operator tooling for the course catalog.
//!
//! Configuration loading, snapshot file parsing and the commands behind the
//! `catalog` binary. Commands return their human-readable output so the
//! binary stays a thin dispatcher.

pub mod error;

pub use error::{Error, Result};

use std::{
  collections::HashMap,
  path::{Path, PathBuf},
};

use catalog_core::{
  admin::{self, CourseTarget},
  course::Course,
  prereq::{PrereqCheck, check_prerequisites_met},
  reconcile::{ReconcileOptions, ReconcileStats, reconcile_snapshot},
  relationship::{Relationship, RelationshipType},
  resolve::base_code,
  snapshot::{Snapshot, parse_snapshot},
  store::CatalogStore,
};
use config::builder::{ConfigBuilder, DefaultState};
use serde::Deserialize;
use uuid::Uuid;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `catalog.toml` and `CATALOG_*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
  /// No default: running without a store path is a configuration error.
  pub store_path:        PathBuf,
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  #[serde(default)]
  pub tag_skip_list:     Vec<String>,
  #[serde(default = "default_max_error_details")]
  pub max_error_details: usize,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 5240 }

fn default_max_error_details() -> usize { ReconcileOptions::default().max_error_details }

impl CatalogConfig {
  /// Load from `path` (optional) layered under the environment.
  pub fn load(path: &Path) -> Result<Self> {
    Self::build(config::Config::builder().add_source(config::File::from(path).required(false)))
  }

  fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
    let settings = builder
      .add_source(
        config::Environment::with_prefix("CATALOG")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("tag_skip_list"),
      )
      .build()?;
    Ok(settings.try_deserialize()?)
  }

  /// The store path with a leading `~/` expanded.
  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn reconcile_options(&self) -> ReconcileOptions {
    ReconcileOptions {
      tag_skip_list:     self.tag_skip_list.clone(),
      max_error_details: self.max_error_details,
    }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Snapshots ────────────────────────────────────────────────────────────────

/// Read and parse the snapshot at `path`. Entries that fail to deserialise
/// are kept in [`Snapshot::rejected`] rather than failing the load.
pub async fn load_snapshot(path: &Path) -> Result<Snapshot> {
  let text = tokio::fs::read_to_string(path)
    .await
    .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
  Ok(parse_snapshot(&text)?)
}

/// Load the snapshot at `path` and run one reconciliation cycle.
pub async fn reconcile_file<S: CatalogStore>(
  store: &S,
  path: &Path,
  options: &ReconcileOptions,
) -> Result<ReconcileStats> {
  let snapshot = load_snapshot(path).await?;
  tracing::info!(
    path = %path.display(),
    entries = snapshot.len(),
    unreadable = snapshot.rejected().len(),
    "snapshot loaded"
  );
  Ok(reconcile_snapshot(store, &snapshot, options).await?)
}

// ─── Commands ─────────────────────────────────────────────────────────────────

/// Look a course up by its exact external code.
pub async fn find_course<S: CatalogStore>(store: &S, code: &str) -> Result<Course> {
  store
    .find_course_by_code(code.trim().to_owned())
    .await
    .map_err(catalog_core::Error::store)?
    .ok_or_else(|| Error::UnknownCourse(code.to_owned()))
}

/// One line per unresolved relationship, tab-separated:
/// id, owning course code, kind, typed code (or `-`), description.
pub async fn unresolved_report<S: CatalogStore>(store: &S) -> Result<String> {
  let rows = admin::list_unresolved_relationships(store).await?;

  let mut owners: HashMap<Uuid, String> = HashMap::new();
  for row in &rows {
    if owners.contains_key(&row.course_id) {
      continue;
    }
    let code = store
      .get_course(row.course_id)
      .await
      .map_err(catalog_core::Error::store)?
      .map_or_else(|| row.course_id.to_string(), |c| c.external_code);
    owners.insert(row.course_id, code);
  }

  let mut out = String::new();
  for row in &rows {
    out.push_str(&format!(
      "{}\t{}\t{}\t{}\t{}\n",
      row.relationship_id,
      owners.get(&row.course_id).map_or("?", String::as_str),
      row.relationship_type,
      row.related_course_code.as_deref().unwrap_or("-"),
      row.description.as_deref().unwrap_or(""),
    ));
  }
  out.push_str(&format!("{} unresolved\n", rows.len()));
  Ok(out)
}

pub async fn repair<S: CatalogStore>(store: &S, relationship_id: Uuid, code: &str) -> Result<String> {
  let rel = admin::repair_relationship_code(store, relationship_id, code).await?;
  let target = target_of(store, &rel).await?;
  Ok(format!("{relationship_id}: {}", describe_match(code.trim(), target.as_ref())))
}

/// Add a relationship from the course with code `course` to `target`, which
/// is read as a course id when it parses as one and as a code otherwise.
pub async fn link<S: CatalogStore>(
  store: &S,
  course: &str,
  target: &str,
  kind: RelationshipType,
  description: Option<String>,
) -> Result<String> {
  let owner = find_course(store, course).await?;
  let target = match Uuid::parse_str(target.trim()) {
    Ok(id) => CourseTarget::Id(id),
    Err(_) => CourseTarget::Code(target.trim().to_owned()),
  };
  let typed = match &target {
    CourseTarget::Id(_) => None,
    CourseTarget::Code(code) => Some(code.clone()),
  };

  let rel = admin::add_relationship(store, owner.course_id, target, kind, description).await?;
  let related = target_of(store, &rel).await?;
  let typed = typed.or_else(|| rel.related_course_code.clone()).unwrap_or_default();
  Ok(format!(
    "{} {kind} -> {} [{}]",
    owner.external_code,
    describe_match(&typed, related.as_ref()),
    rel.relationship_id
  ))
}

pub async fn check<S: CatalogStore>(store: &S, course: &str, completed: &[String]) -> Result<String> {
  let owner = find_course(store, course).await?;
  let result = check_prerequisites_met(store, owner.course_id, completed).await?;
  Ok(format_check(&owner.external_code, &result))
}

async fn target_of<S: CatalogStore>(store: &S, rel: &Relationship) -> Result<Option<Course>> {
  let Some(id) = rel.related_course_id else {
    return Ok(None);
  };
  Ok(store.get_course(id).await.map_err(catalog_core::Error::store)?)
}

// ─── Formatting ───────────────────────────────────────────────────────────────

/// Describe what a typed code resolved to, naming the family when the match
/// came from a prefix rather than the exact code.
pub fn describe_match(typed: &str, matched: Option<&Course>) -> String {
  match matched {
    None => format!("{typed} (unresolved)"),
    Some(c) if c.external_code == typed => format!("{} ({})", c.external_code, c.name),
    Some(c) => {
      let (base, _) = base_code(&c.external_code);
      format!("{} ({}) via family {base} from {typed:?}", c.external_code, c.name)
    }
  }
}

pub fn format_check(course: &str, check: &PrereqCheck) -> String {
  if check.met {
    return format!("{course}: prerequisites met\n");
  }
  let mut out = format!("{course}: {} unmet requirement group(s)\n", check.unmet.len());
  for clause in &check.unmet {
    out.push_str(&format!("  - {clause}\n"));
  }
  out
}

#[cfg(test)]
mod tests {
  use catalog_store_sqlite::SqliteStore;
  use config::{File, FileFormat};

  use super::*;

  fn config_from(toml: &str) -> Result<CatalogConfig> {
    CatalogConfig::build(
      config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
    )
  }

  #[test]
  fn config_defaults() {
    let cfg = config_from(r#"store_path = "/var/lib/catalog.db""#).unwrap();
    assert_eq!(cfg.address(), "127.0.0.1:5240");
    assert_eq!(cfg.max_error_details, 50);
    assert!(cfg.reconcile_options().tag_skip_list.is_empty());
  }

  #[test]
  fn config_overrides() {
    let cfg = config_from(
      r#"
        store_path = "catalog.db"
        port = 8080
        tag_skip_list = ["Internal", "Archived"]
        max_error_details = 5
      "#,
    )
    .unwrap();
    let options = cfg.reconcile_options();
    assert_eq!(cfg.port, 8080);
    assert_eq!(options.tag_skip_list, ["Internal", "Archived"]);
    assert_eq!(options.max_error_details, 5);
  }

  #[test]
  fn store_path_is_required() {
    assert!(matches!(config_from("port = 1"), Err(Error::Config(_))));
  }

  #[test]
  fn tilde_expansion() {
    let plain = Path::new("/data/catalog.db");
    assert_eq!(expand_tilde(plain), plain);
    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(expand_tilde(Path::new("~/catalog.db")), Path::new(&home).join("catalog.db"));
    }
  }

  #[tokio::test]
  async fn missing_snapshot_file_is_an_io_error() {
    let err = load_snapshot(Path::new("/nonexistent/snapshot.json")).await.unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
  }

  #[tokio::test]
  async fn snapshot_file_is_reconciled() {
    let path = std::env::temp_dir().join(format!("catalog-snapshot-{}.json", Uuid::new_v4()));
    tokio::fs::write(
      &path,
      r#"{"courses": [
        {"external_code": "0201", "name": "Algebra 1"},
        {"external_code": "0202", "name": "Algebra 2", "credits": "one"}
      ], "count": 2}"#,
    )
    .await
    .unwrap();

    let store = SqliteStore::open_in_memory().await.unwrap();
    let stats = reconcile_file(&store, &path, &ReconcileOptions::default()).await.unwrap();
    tokio::fs::remove_file(&path).await.unwrap();

    assert_eq!(stats.total, 2);
    assert_eq!(stats.created, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.error_details[0].code, "0202");
    assert_eq!(find_course(&store, "0201").await.unwrap().name, "Algebra 1");
  }

  async fn seeded() -> SqliteStore {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let snapshot = parse_snapshot(
      r#"[
        {"external_code": "0201", "name": "Algebra 1"},
        {"external_code": "0075A", "name": "Geometry A"},
        {"external_code": "0310", "name": "AP Calculus AB",
         "prerequisites": [{"requires_all": true, "alternatives": [
           {"course_code": "0201", "description": "Algebra 1"},
           {"course_code": "0999", "description": "Precalculus"}]}]}
      ]"#,
    )
    .unwrap();
    reconcile_snapshot(&store, &snapshot, &ReconcileOptions::default()).await.unwrap();
    store
  }

  #[tokio::test]
  async fn link_names_the_family_of_a_prefix_match() {
    let store = seeded().await;
    let out = link(&store, "0310", "0075", RelationshipType::Recommended, None).await.unwrap();
    assert!(out.starts_with("0310 recommended -> 0075A (Geometry A) via family 0075"), "{out}");

    let algebra = find_course(&store, "0201").await.unwrap().course_id.to_string();
    let out = link(&store, "0075A", &algebra, RelationshipType::Prerequisite, None)
      .await
      .unwrap();
    assert!(out.starts_with("0075A prerequisite -> 0201 (Algebra 1)"), "{out}");

    assert!(matches!(
      link(&store, "9999", "0201", RelationshipType::Prerequisite, None).await,
      Err(Error::UnknownCourse(_))
    ));
  }

  #[tokio::test]
  async fn unresolved_then_repaired() {
    let store = seeded().await;
    let report = unresolved_report(&store).await.unwrap();
    assert!(report.contains("\t0310\tprerequisite\t0999\tPrecalculus\n"), "{report}");
    assert!(report.ends_with("1 unresolved\n"));

    let rel = admin::list_unresolved_relationships(&store).await.unwrap().remove(0);
    let out = repair(&store, rel.relationship_id, "0075").await.unwrap();
    assert!(out.ends_with("0075A (Geometry A) via family 0075 from \"0075\""), "{out}");
    assert!(unresolved_report(&store).await.unwrap().starts_with("0 unresolved"));
  }

  #[tokio::test]
  async fn check_reports_unmet_groups() {
    let store = seeded().await;
    let out = check(&store, "0310", &["0201".to_string()]).await.unwrap();
    assert_eq!(out, "0310: 1 unmet requirement group(s)\n  - Algebra 1 AND Precalculus\n");

    let out = check(&store, "0201", &[]).await.unwrap();
    assert_eq!(out, "0201: prerequisites met\n");
  }

  #[test]
  fn describe_exact_and_unresolved() {
    assert_eq!(describe_match("0999", None), "0999 (unresolved)");
  }
}
