mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, TagCommands};
use dotenv::dotenv;
use progress::CliReporter;
use shelfscan_core::config::load_configuration;
use shelfscan_core::storage::{Database, FileFilter};
use shelfscan_core::transfer::{CatalogExporter, CatalogImporter};
use shelfscan_core::{DuplicatePolicy, FileStatus, LibraryConfig, ProgressReporter, ScanEngine};
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let result = match args.command {
        Some(Commands::Scan { policy }) => run_scan(&config, policy.as_deref()),
        Some(Commands::Export) => run_export(&config),
        Some(Commands::Import) => run_import(&config),
        Some(Commands::List { tags, search }) => run_list(&config, FileFilter { tags, search }),
        Some(Commands::Tags(command)) => run_tags(&config, command),
        Some(Commands::History { limit }) => run_history(&config, limit),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
            Ok(())
        }
        Some(Commands::TruncateDb) => run_truncate(&config),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn open_database(config: &LibraryConfig) -> Result<Database> {
    let db = Database::open(&config.database_path).with_context(|| {
        format!("opening database {}", config.database_path.display())
    })?;
    Ok(db.with_settings(config.store_settings()))
}

fn status_label(status: FileStatus) -> ColoredString {
    let label = format!("{:>17}", status.label());
    match status {
        FileStatus::New => label.green(),
        FileStatus::Moved | FileStatus::Renamed | FileStatus::MovedAndRenamed => label.cyan(),
        FileStatus::Duplicate => label.yellow(),
        FileStatus::Deleted => label.red(),
        FileStatus::Untouched => label.dimmed(),
    }
}

fn run_scan(config: &LibraryConfig, policy: Option<&str>) -> Result<()> {
    let mut db = open_database(config)?;
    let mut engine = ScanEngine::new(config.clone());
    if let Some(policy) = policy {
        engine = engine.with_policy(DuplicatePolicy::from(policy));
    }
    let reporter = CliReporter::new();

    let result = engine
        .scan(&mut db, &reporter, |outcome| {
            if outcome.status == FileStatus::Untouched {
                return;
            }
            let path = match (outcome.candidate, outcome.existing) {
                (Some(candidate), Some(existing)) if outcome.status != FileStatus::New => {
                    format!("{} -> {}", existing.relpath(), candidate.relpath())
                }
                (Some(candidate), _) => candidate.relpath(),
                (None, Some(existing)) => existing.relpath(),
                (None, None) => String::new(),
            };
            reporter.println(&format!("{} {}", status_label(outcome.status), path));
        })
        .context("scan failed")?;

    let counts = &result.counts;
    info!(
        "{} files in {}: {} new, {} relocated, {} duplicate, {} deleted",
        counts.scanned,
        format!("{:.2}s", result.duration.as_secs_f64()).green(),
        format!("{}", counts.new).green(),
        format!("{}", counts.moved + counts.renamed + counts.moved_and_renamed).cyan(),
        format!("{}", counts.duplicate).yellow(),
        format!("{}", counts.deleted).red(),
    );
    Ok(())
}

fn run_export(config: &LibraryConfig) -> Result<()> {
    let db = open_database(config)?;
    let reporter = CliReporter::new();
    let summary = CatalogExporter::new(&config.storage_notes, config.export_page_size)
        .export(&db, &reporter)
        .context("export failed")?;
    reporter.on_finish();

    info!(
        "Exported {} records in {} pages, {} tags, {} tag links",
        format!("{}", summary.rows).green(),
        summary.pages,
        summary.tags,
        summary.links
    );
    Ok(())
}

fn run_import(config: &LibraryConfig) -> Result<()> {
    let db = open_database(config)?;
    if db.count_files()? > 0 {
        bail!(
            "database {} is not empty, run truncate-db first",
            config.database_path.display()
        );
    }

    let reporter = CliReporter::new();
    let summary = CatalogImporter::new(&config.storage_notes)
        .import(&db, &reporter)
        .context("import failed")?;
    reporter.on_finish();

    info!(
        "Imported {} records from {} pages, {} tags, {} tag links",
        format!("{}", summary.rows).green(),
        summary.pages,
        summary.tags,
        summary.links
    );
    Ok(())
}

fn run_list(config: &LibraryConfig, filter: FileFilter) -> Result<()> {
    let db = open_database(config)?;
    let total = db.select_count(&filter)?;

    for record in db.select_rows(&filter) {
        let record = record?;
        println!(
            "{:>6}  {}  {}",
            record.id,
            short_hash(&record.hash),
            record.relpath()
        );
    }
    println!("{} files", total);
    Ok(())
}

/// First 12 characters of a fingerprint. Imported hashes are not validated,
/// so this must not slice through a multi-byte character.
fn short_hash(hash: &str) -> String {
    hash.chars().take(12).collect()
}

fn run_tags(config: &LibraryConfig, command: TagCommands) -> Result<()> {
    let db = open_database(config)?;
    match command {
        TagCommands::List { parent } => {
            for tag in db.select_tags(parent)? {
                println!("{:>6}  {}", tag.id, tag.name);
            }
        }
        TagCommands::Add { name, parent } => {
            let tag = db
                .insert_tag(&name, parent)
                .with_context(|| format!("adding tag {}", name))?;
            println!("Created tag {} ({})", tag.name.green(), tag.id);
        }
        TagCommands::Assign { tag, file } => {
            if db.assign_tag(tag, file)? {
                println!("Tag {} assigned to file {}", tag, file);
            } else {
                println!(
                    "{}",
                    format!("Tag {} not assigned to file {}: unknown id or already assigned", tag, file)
                        .yellow()
                );
            }
        }
        TagCommands::Delete { id } => {
            if db.delete_tag(id)? {
                println!("Tag {} deleted", id);
            } else {
                println!("{}", format!("No tag with id {}", id).yellow());
            }
        }
    }
    Ok(())
}

fn run_history(config: &LibraryConfig, limit: i64) -> Result<()> {
    let db = open_database(config)?;
    let (sessions, total) = db.list_sessions(0, limit)?;
    for session in sessions {
        let c = &session.counts;
        println!(
            "#{:<4} {}  {:<9}  {} files: {} new, {} moved, {} renamed, {} moved and renamed, {} duplicate, {} deleted",
            session.id,
            session.started_at,
            session.status,
            c.scanned,
            c.new,
            c.moved,
            c.renamed,
            c.moved_and_renamed,
            c.duplicate,
            c.deleted
        );
    }
    println!("{} scans recorded", total);
    Ok(())
}

fn run_truncate(config: &LibraryConfig) -> Result<()> {
    let confirmed = prompt_confirm(
        "Are you SURE you want to COMPLETELY DELETE the Database?",
        Some(false),
    )?;
    if !confirmed {
        return Ok(());
    }
    let db = open_database(config)?;
    db.truncate_all().context("truncating database")?;
    println!("All tables truncated");
    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
