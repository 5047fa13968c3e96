//! `catalog` operator binary.
//!
//! Reads `catalog.toml` (or the path given with `--config`), opens the SQLite
//! store, and either serves the JSON admin API or runs one administrative
//! command and exits.
//!
//! ```text
//! catalog reconcile snapshot.json
//! catalog unresolved
//! catalog repair <relationship-id> 0075
//! catalog link 0310 0075A --kind recommended
//! catalog check 0310 0201 0075A
//! catalog serve
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use axum::Router;
use catalog_admin::CatalogConfig;
use catalog_core::{Error as CoreError, reconcile::ReconcileStats, relationship::RelationshipType};
use catalog_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Course catalog administration")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "catalog.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON admin API under `/api`.
  Serve,
  /// Merge a snapshot file into the catalog.
  Reconcile {
    /// JSON array of entries, or `{"courses": [...]}`.
    snapshot: PathBuf,
  },
  /// List relationships whose target course is unknown.
  Unresolved,
  /// Point a relationship at a corrected course code.
  Repair { relationship_id: Uuid, code: String },
  /// Add a relationship by hand.
  Link {
    /// Code of the owning course.
    course:      String,
    /// Target course code or id.
    target:      String,
    #[arg(long, default_value = "prerequisite")]
    kind:        RelationshipType,
    #[arg(long)]
    description: Option<String>,
  },
  /// Check completed courses against a course's prerequisites.
  Check { course: String, completed: Vec<String> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let cfg = CatalogConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store_path = cfg.store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command {
    Command::Serve => {
      let app = Router::new()
        .nest("/api", catalog_api::api_router(Arc::new(store), cfg.reconcile_options()));
      let address = cfg.address();

      tracing::info!("Listening on http://{address}");
      let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

      axum::serve(listener, app).await.context("server error")?;
    }
    Command::Reconcile { snapshot } => {
      let result =
        catalog_admin::reconcile_file(&store, &snapshot, &cfg.reconcile_options()).await;
      match result {
        Ok(stats) => print_stats(&stats)?,
        Err(catalog_admin::Error::Catalog(CoreError::NothingWritten(stats))) => {
          print_stats(&stats)?;
          anyhow::bail!("reconciliation wrote no courses");
        }
        Err(e) => return Err(e).context("reconciliation failed"),
      }
    }
    Command::Unresolved => {
      print!("{}", catalog_admin::unresolved_report(&store).await?);
    }
    Command::Repair { relationship_id, code } => {
      println!("{}", catalog_admin::repair(&store, relationship_id, &code).await?);
    }
    Command::Link { course, target, kind, description } => {
      println!("{}", catalog_admin::link(&store, &course, &target, kind, description).await?);
    }
    Command::Check { course, completed } => {
      print!("{}", catalog_admin::check(&store, &course, &completed).await?);
    }
  }

  Ok(())
}

fn print_stats(stats: &ReconcileStats) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(stats)?);
  Ok(())
}
