/// Legacy Migration Binary - Links free-text knowledge points of old records to tag tree nodes
///
/// Usage:
///   migrate-legacy --input <records.json> [--output <links.json>] [--db-path <path>]
///
/// The input is a JSON array of `{ "id", "subjectName"?, "gradeSemester"?, "knowledgePoints"? }`.
/// The output lists, per record, the tag ids to link.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wrongbook_taxonomy::{
    migrate_legacy_records, read_legacy_records, Database, GradeResolver, TaxonomyConfig,
};

#[derive(Parser, Debug)]
#[command(name = "migrate-legacy")]
#[command(about = "Migrate legacy knowledge points into the knowledge tag tree")]
struct Args {
    /// Legacy records JSON file
    #[arg(long, short)]
    input: PathBuf,

    /// Where to write the record-to-tag links (stdout when omitted)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Path to SQLite database file
    #[arg(long, short)]
    db_path: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Wrongbook - Legacy Tag Migration Tool v0.1.0");

    let args = Args::parse();
    let config = TaxonomyConfig::from_env().with_db_path(args.db_path);

    let records = read_legacy_records(&args.input)
        .with_context(|| format!("Failed to load records from {}", args.input.display()))?;
    info!("Loaded {} records", records.len());

    info!("Database: {}", config.db_path.display());
    config
        .ensure_db_dir()
        .with_context(|| format!("Failed to create directory for {}", config.db_path.display()))?;
    let db = Database::open(&config.db_path, config.busy_timeout)
        .with_context(|| format!("Failed to open {}", config.db_path.display()))?;

    if db.count_tags()? == 0 {
        warn!("Tag tree is empty; every knowledge point will become a custom tag");
    }

    info!("Starting migration...");
    info!("─────────────────────────────────────────────────");

    let resolver = GradeResolver::new();
    let (links, stats) = migrate_legacy_records(&db, &resolver, &records)?;

    let json = serde_json::to_string_pretty(&links)?;
    match &args.output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", json),
    }

    info!("─────────────────────────────────────────────────");
    info!("Migration complete!");
    info!("");
    info!("Statistics:");
    info!("  Total records:     {}", stats.total_records);
    info!("  Records migrated:  {}", stats.records_migrated);
    info!("  Records skipped:   {}", stats.records_skipped);
    info!("  Tags created:      {}", stats.tags_created);
    info!("  Tags linked:       {}", stats.tags_linked);

    Ok(())
}
