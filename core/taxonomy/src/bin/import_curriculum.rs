/// Curriculum Import Binary - Builds or updates the knowledge tag tree of one or more subjects
///
/// Usage:
///   import-curriculum [--db-path <path>] [--replace] <curriculum.json>...
///
/// Options:
///   --db-path: Path to SQLite database (defaults to $WRONGBOOK_DB_PATH or ~/.local/share/wrongbook/wrongbook.db)
///   --replace: Delete the subject's system tags before importing instead of updating in place

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wrongbook_taxonomy::{
    import_curriculum, read_curriculum_file, replace_curriculum, Database, TaxonomyConfig,
};

#[derive(Parser, Debug)]
#[command(name = "import-curriculum")]
#[command(about = "Import curriculum specifications into the knowledge tag tree")]
struct Args {
    /// Curriculum JSON files, one subject each
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Path to SQLite database file
    #[arg(long, short)]
    db_path: Option<PathBuf>,

    /// Rebuild each subject from scratch (system tags get new ids)
    #[arg(long)]
    replace: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Wrongbook - Curriculum Import Tool v0.1.0");

    let args = Args::parse();
    let config = TaxonomyConfig::from_env().with_db_path(args.db_path);

    // Parse every file before touching the database
    let mut specs = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let spec = read_curriculum_file(path)
            .with_context(|| format!("Failed to load curriculum {}", path.display()))?;
        info!("Loaded {} curriculum from {}", spec.subject, path.display());
        specs.push(spec);
    }

    config
        .ensure_db_dir()
        .with_context(|| format!("Failed to create directory for {}", config.db_path.display()))?;

    info!("Database: {}", config.db_path.display());
    let db = Database::open(&config.db_path, config.busy_timeout)
        .with_context(|| format!("Failed to open {}", config.db_path.display()))?;

    info!(
        "Mode: {}",
        if args.replace { "replace" } else { "update in place" }
    );
    info!("─────────────────────────────────────────────────");

    for spec in &specs {
        let stats = if args.replace {
            replace_curriculum(&db, spec)
        } else {
            import_curriculum(&db, spec)
        }
        .with_context(|| format!("Import of {} curriculum failed", spec.subject))?;

        info!("{}:", spec.subject);
        info!("  Created:    {}", stats.created);
        info!("  Renamed:    {}", stats.updated);
        info!("  Unchanged:  {}", stats.unchanged);
        if args.replace {
            info!("  Deleted:    {}", stats.deleted);
        }
    }

    info!("─────────────────────────────────────────────────");
    info!("Tags in database:");
    for (subject, system, custom) in db.tag_counts_by_subject()? {
        info!("  {:<10} {} system, {} custom", subject.as_str(), system, custom);
    }

    Ok(())
}
