// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Screenshot Curator: keeps mini-app catalog screenshots clean
//!
//! Running with no arguments curates the catalog named in `config.json`
//! (or the defaults when that file is absent).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

use screenshot_curator::assets::AssetStore;
use screenshot_curator::classifier::{AssetClassifier, ScreenshotClassifier};
use screenshot_curator::config::AppConfig;
use screenshot_curator::curator::{self, CurationOptions, CurationReport, Curator};
use screenshot_curator::db::Database;
use screenshot_curator::journal::Journal;
use screenshot_curator::Result;

/// Screenshot Curator - drop icons, placeholders, duplicates and overflow from catalog screenshots
#[derive(Parser, Debug)]
#[command(name = "shotcurate")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "1.0.0")]
#[command(about = "Curates mini-app catalog screenshots", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify, deduplicate and cap every entry's screenshots (default)
    Curate {
        /// Report changes without writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Deduplicate and cap only, without inspecting asset files
    Dedupe {
        /// Report changes without writing them
        #[arg(long)]
        dry_run: bool,
    },

    /// Classify image files without touching the catalog
    Classify {
        /// Image files to classify
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Show catalog statistics
    Stats,

    /// Rewrite journal operations
    Journal {
        #[command(subcommand)]
        action: JournalCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum JournalCommands {
    /// List recent rewrites
    List {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },

    /// Restore screenshot lists from before recent rewrites
    Undo {
        /// Number of rewrites to undo
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Dry run (show what would be restored)
        #[arg(long)]
        dry_run: bool,
    },

    /// Clear the journal
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        /// Output file path
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    exit_code(run(cli).await)
}

/// Log a fatal error once and map the outcome to the process status
fn exit_code(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Some(Commands::Curate { dry_run }) => run_curate(config, dry_run, &cli.format).await,
        Some(Commands::Dedupe { dry_run }) => run_dedupe(config, dry_run, &cli.format),
        Some(Commands::Classify { paths }) => run_classify(config, paths, &cli.format),
        Some(Commands::Stats) => run_stats(config, &cli.format),
        Some(Commands::Journal { action }) => run_journal_command(config, action),
        Some(Commands::Config { action }) => run_config_command(config, action),
        None => run_curate(config, false, &cli.format).await,
    }
}

/// Open the catalog and bring its schema up to date
fn open_catalog(config: &AppConfig) -> Result<Database> {
    let db = Database::open(&config.database.path)?;
    db.migrate(&config.curation.default_category)?;
    info!("Catalog opened: {}", config.database.path);
    Ok(db)
}

fn journal_for(config: &AppConfig, dry_run: bool) -> Option<Journal> {
    (config.journal.enabled && !dry_run).then(|| Journal::new(PathBuf::from(&config.journal.path)))
}

/// Run the full curation pipeline
async fn run_curate(config: AppConfig, dry_run: bool, format: &str) -> Result<()> {
    let db = open_catalog(&config)?;

    let classifier = Arc::new(ScreenshotClassifier::new(config.classifier.clone()));
    let options = CurationOptions {
        dry_run,
        ..CurationOptions::from_config(&config)
    };
    let mut curator = Curator::new(classifier, AssetStore::new(&config.assets.dir), options);
    if let Some(journal) = journal_for(&config, dry_run) {
        curator = curator.with_journal(journal);
    }

    if dry_run {
        warn!("DRY RUN MODE - catalog will not be modified");
    }

    let report = curator.curate(&db).await?;
    print_report(&report, format)
}

/// Run deduplicate-and-cap only
fn run_dedupe(config: AppConfig, dry_run: bool, format: &str) -> Result<()> {
    let db = open_catalog(&config)?;
    let options = CurationOptions {
        dry_run,
        ..CurationOptions::from_config(&config)
    };
    let journal = journal_for(&config, dry_run);

    let report = curator::dedupe(&db, &options, journal.as_ref())?;
    print_report(&report, format)
}

fn print_report(report: &CurationReport, format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for entry in &report.entries {
        let note = if report.dry_run {
            " (dry run)"
        } else if !entry.written {
            " (update failed)"
        } else {
            ""
        };
        println!("{}: {} screenshots -> {}{}", entry.id, entry.before, entry.after, note);
    }

    println!("\n{}", report.summary());
    if report.missing_assets > 0 || report.failed > 0 {
        println!(
            "missing assets: {}, failed updates: {}",
            report.missing_assets, report.failed
        );
    }
    Ok(())
}

/// Classify individual image files
fn run_classify(config: AppConfig, paths: Vec<PathBuf>, format: &str) -> Result<()> {
    let classifier = ScreenshotClassifier::new(config.classifier);

    let mut results = Vec::new();
    for path in paths {
        let result = classifier.classify(&path);
        if format == "text" {
            match result.reason() {
                None => println!("{}: valid", path.display()),
                Some(reason) => println!("{}: anomalous ({})", path.display(), reason),
            }
        }
        results.push(serde_json::json!({
            "path": path.to_string_lossy(),
            "valid": !result.is_anomalous(),
            "reason": result.reason().map(|r| r.to_string()),
        }));
    }

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}

/// Show catalog statistics
fn run_stats(config: AppConfig, format: &str) -> Result<()> {
    let db = open_catalog(&config)?;
    let stats = db.get_stats()?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("Catalog Statistics:");
        println!("  Entries: {}", stats.entry_count);
        println!("  With screenshots: {}", stats.with_screenshots);
        println!("  Screenshot references: {}", stats.reference_count);
    }
    Ok(())
}

/// Run journal commands
fn run_journal_command(config: AppConfig, action: JournalCommands) -> Result<()> {
    let journal = Journal::new(PathBuf::from(&config.journal.path));

    match action {
        JournalCommands::List { count } => {
            let entries = journal.get_recent(count)?;
            println!("Recent rewrites ({} entries):", entries.len());
            for entry in entries {
                let status = if entry.undone { " [UNDONE]" } else { "" };
                println!(
                    "  {} {:?} {}: '{}' -> '{}'{}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.operation,
                    entry.entry_id,
                    entry.before,
                    entry.after,
                    status
                );
            }
        }
        JournalCommands::Undo { count, dry_run } => {
            let db = open_catalog(&config)?;
            let restored = journal.undo(&db, count, dry_run)?;
            if restored.is_empty() {
                println!("No rewrites to undo");
            }
            for entry in restored {
                let verb = if dry_run { "Would restore" } else { "Restored" };
                println!("{} {}: '{}' -> '{}'", verb, entry.entry_id, entry.after, entry.before);
            }
        }
        JournalCommands::Clear { force } => {
            if !force {
                eprintln!("Use --force to confirm clearing the journal");
                return Ok(());
            }
            journal.clear()?;
            println!("Journal cleared: {}", journal.path().display());
        }
    }

    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_no_args_runs_curation() {
        let cli = Cli::try_parse_from(["shotcurate"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, PathBuf::from("config.json"));
        assert_eq!(cli.format, "text");
    }

    #[test]
    fn test_cli_curate_dry_run() {
        let cli = Cli::try_parse_from(["shotcurate", "curate", "--dry-run"]).unwrap();
        match cli.command {
            Some(Commands::Curate { dry_run }) => assert!(dry_run),
            _ => panic!("Expected Curate command"),
        }
    }

    #[test]
    fn test_cli_classify_requires_paths() {
        assert!(Cli::try_parse_from(["shotcurate", "classify"]).is_err());

        let cli = Cli::try_parse_from(["shotcurate", "classify", "a.png", "b.webp"]).unwrap();
        match cli.command {
            Some(Commands::Classify { paths }) => {
                assert_eq!(paths, vec![PathBuf::from("a.png"), PathBuf::from("b.webp")]);
            }
            _ => panic!("Expected Classify command"),
        }
    }

    #[test]
    fn test_cli_journal_undo() {
        let cli = Cli::try_parse_from(["shotcurate", "--format", "json", "journal", "undo", "-n", "3"]).unwrap();
        assert_eq!(cli.format, "json");
        match cli.command {
            Some(Commands::Journal { action: JournalCommands::Undo { count, dry_run } }) => {
                assert_eq!(count, 3);
                assert!(!dry_run);
            }
            _ => panic!("Expected Journal Undo command"),
        }
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Cli::try_parse_from(["shotcurate", "--format", "yaml"]).is_err());
    }

    #[tokio::test]
    async fn test_missing_catalog_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.database.path = dir.path().join("absent.db").to_string_lossy().to_string();
        config.assets.dir = dir.path().to_string_lossy().to_string();

        let result = run_curate(config, false, "text").await;
        assert!(matches!(result, Err(screenshot_curator::CuratorError::StoreUnavailable(_))));
    }

    #[test]
    fn test_fatal_error_exits_nonzero() {
        let err = screenshot_curator::CuratorError::StoreUnavailable(PathBuf::from("absent.db"));
        assert_eq!(exit_code(Err(err)), ExitCode::FAILURE);
        assert_eq!(exit_code(Ok(())), ExitCode::SUCCESS);
    }
}
