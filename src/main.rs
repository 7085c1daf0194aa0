// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! packlens: asset pack inspector and editor
//!
//! Scans sprite packs, reports naming and layout problems, and edits pack
//! metadata and file names.

use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use packlens::config::{AppConfig, LayoutConfig};
use packlens::history::History;
use packlens::pack::metadata::{locate_metadata_file, update_metadata_file, PackField, PackMetadata};
use packlens::pack::rename::{rename_file, undo_last};
use packlens::pack::{naming, ObjectGroup, ObjectKind, PackReport, PackWalker, WalkEvent};
use packlens::source::{FsSource, PackSource, TypedContent};
use packlens::{PackLensError, Result};

/// packlens CLI - asset pack inspector and editor
#[derive(Parser, Debug)]
#[command(name = "packlens")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "1.0.0")]
#[command(about = "Inspect sprite packs, check their conventions and edit their metadata", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "packlens.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json", "jsonl"])]
    format: String,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Walk a pack and report its objects and problems
    Scan {
        /// Pack root folder
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Exit with an error status when the pack has error diagnostics
        #[arg(long)]
        strict: bool,
    },

    /// Serve the web dashboard for a pack
    Serve {
        /// Pack root folder
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Re-walk the pack when files change
        #[arg(short, long)]
        watch: bool,

        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Rename a pack file, recording it for undo
    Rename {
        /// File to rename
        file: PathBuf,

        /// New file name (no directory part)
        new_name: String,
    },

    /// Show or edit the pack metadata file
    Metadata {
        #[command(subcommand)]
        action: MetadataCommands,
    },

    /// History and undo operations
    History {
        #[command(subcommand)]
        action: HistoryCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Create the reserved pack files that are missing
    Init {
        /// Pack root folder
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Also write a default configuration file, overwriting an existing one
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum MetadataCommands {
    /// Show the editable fields
    Show {
        /// Pack root folder
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Set one field and rewrite the file
    Set {
        /// Field: tag, prices, longDescription, sellerId or sellerStripeAccountId
        field: PackField,

        /// New value
        value: String,

        /// Pack root folder
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCommands {
    /// List recent renames
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },

    /// Undo recent renames, newest first
    Undo {
        /// Number of renames to undo
        #[arg(short, long, default_value = "1")]
        count: usize,

        /// Dry run (show what would be undone)
        #[arg(long)]
        dry_run: bool,
    },

    /// Clear all history
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
        #[arg(short, long, default_value = "packlens.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
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
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = AppConfig::load(&cli.config)?;

    match cli.command {
        Commands::Scan { dir, strict } => run_scan(config, dir, strict, &cli.format).await,
        Commands::Serve { dir, watch, host, port } => {
            let mut config = config;
            config.web.watch |= watch;
            if let Some(host) = host {
                config.web.host = host;
            }
            if let Some(port) = port {
                config.web.port = port;
            }
            packlens::web::start_server(config, dir).await
        }
        Commands::Rename { file, new_name } => run_rename(config, file, new_name, &cli.format).await,
        Commands::Metadata { action } => run_metadata_command(config, action, &cli.format).await,
        Commands::History { action } => run_history_command(config, action, &cli.format).await,
        Commands::Config { action } => run_config_command(config, action, &cli.config),
        Commands::Init { dir, force } => run_init(config, dir, force, &cli.config).await,
    }
}

/// Walk a pack and print the report
async fn run_scan(config: AppConfig, dir: PathBuf, strict: bool, format: &str) -> Result<()> {
    let walker = PackWalker::new(Arc::new(FsSource::new()), &config);

    let report = if format == "jsonl" {
        // Stream events as they happen; Finished is printed once the report is known
        let mut rx = walker.subscribe();
        let printer = tokio::spawn(async move {
            let mut printed = HashSet::new();
            loop {
                match rx.recv().await {
                    Ok(WalkEvent::Finished { .. }) | Err(RecvError::Closed) => break,
                    Ok(event) => {
                        if let WalkEvent::GroupReady { group, .. } = &event {
                            printed.insert((group.folder.clone(), group.key.clone()));
                        }
                        print_event(&event);
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Output fell behind, {} events dropped; groups are filled in from the report", missed)
                    }
                }
            }
            printed
        });
        let report = walker.walk(&dir).await;
        let report = match report {
            Ok(report) => report,
            Err(e) => {
                printer.abort();
                return Err(e);
            }
        };
        let printed = printer.await.unwrap_or_default();

        for group in missing_groups(&report, &printed) {
            print_event(&WalkEvent::GroupReady {
                generation: report.generation,
                group: group.clone(),
                content: Arc::new(TypedContent {
                    media_type: String::new(),
                    bytes: Vec::new(),
                }),
            });
        }
        print_event(&WalkEvent::Finished {
            generation: report.generation,
            counts: report.counts,
            diagnostics: report.diagnostics.len(),
        });
        report
    } else {
        let report = walker.walk(&dir).await?;
        match format {
            "json" => println!("{}", serde_json::to_string_pretty(&report)?),
            _ => print_report(&report),
        }
        report
    };

    let errors = report.errors().count();
    if strict && errors > 0 {
        return Err(PackLensError::Config(format!(
            "{} error(s) found in {:?}",
            errors, dir
        )));
    }
    Ok(())
}

fn print_event(event: &WalkEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!("Cannot serialize event: {}", e),
    }
}

/// Groups of the report whose `GroupReady` line was never printed
fn missing_groups<'a>(report: &'a PackReport, printed: &HashSet<(PathBuf, String)>) -> Vec<&'a ObjectGroup> {
    report
        .groups
        .iter()
        .filter(|g| !printed.contains(&(g.folder.clone(), g.key.clone())))
        .collect()
}

fn print_report(report: &PackReport) {
    let root = &report.root;
    println!("Pack: {} ({})", root.name, root.path.display());
    if !root.tags.is_empty() {
        println!("Tags: {}", root.tags.join(", "));
    }
    if let Some(metadata) = report.root_metadata() {
        let info = PackMetadata::from_value(metadata.content.clone())
            .map(|m| m.info())
            .unwrap_or_default();
        if let Some(tag) = info.tag {
            println!("Unique tag: {}", tag);
        }
        if let Some(price) = info.price {
            println!("Price: {}", price);
        }
    }
    println!(
        "{} folders, {} files, {} objects",
        root.folder_count(),
        root.file_count(),
        report.groups.len()
    );

    println!("\nObjects:");
    for kind in ObjectKind::ALL {
        let count = report.counts.get(kind);
        if count > 0 {
            println!("  {}: {}", kind.label(), count);
        }
    }

    if !report.groups.is_empty() {
        println!("\nGroups:");
        for group in &report.groups {
            let folder = group.folder.strip_prefix(&root.path).unwrap_or(&group.folder);
            let shown = folder.join(&group.key);
            println!("  {} ({} file{})", shown.display(), group.files.len(), if group.files.len() == 1 { "" } else { "s" });
        }
    }

    if !report.diagnostics.is_empty() {
        println!("\nDiagnostics:");
        for d in &report.diagnostics {
            let level = if d.is_error() { "error" } else { "warning" };
            println!("  [{}] {}", level, d.message);
            if let Some(url) = &d.help_url {
                println!("      see {}", url);
            }
        }
    }

    println!(
        "\n{} error(s), {} warning(s)",
        report.errors().count(),
        report.warnings().count()
    );
}

/// Rename one file
async fn run_rename(config: AppConfig, file: PathBuf, new_name: String, format: &str) -> Result<()> {
    let history = History::new(&config.history.path);
    let file_name = file.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let group_key = naming::classify(file_name).group_key().map(String::from);

    let entry = rename_file(&FsSource::new(), &file, &new_name, group_key, Some(&history)).await?;

    match format {
        "json" | "jsonl" => println!("{}", serde_json::to_string(&entry)?),
        _ => println!("Renamed: {} -> {}", entry.original_path.display(), entry.new_path.display()),
    }
    Ok(())
}

/// Run metadata commands
async fn run_metadata_command(config: AppConfig, action: MetadataCommands, format: &str) -> Result<()> {
    let source = FsSource::new();

    match action {
        MetadataCommands::Show { dir } => {
            let file = locate_metadata_file(&source, &dir, &config.layout.metadata_file).await?;
            let metadata = PackMetadata::parse(&source.read_text(&file).await?)?;
            let info = metadata.info();
            match format {
                "json" | "jsonl" => println!("{}", serde_json::to_string_pretty(&info)?),
                _ => {
                    for field in PackField::ALL {
                        println!("{}: {}", field.label(), info.get(field).unwrap_or("-"));
                    }
                }
            }
        }
        MetadataCommands::Set { field, value, dir } => {
            let file = locate_metadata_file(&source, &dir, &config.layout.metadata_file).await?;
            let metadata = update_metadata_file(&source, &file, field, &value).await?;
            println!(
                "{} set to {}",
                field.label(),
                metadata.info().get(field).unwrap_or_default()
            );
        }
    }

    Ok(())
}

/// Run history commands
async fn run_history_command(config: AppConfig, action: HistoryCommands, format: &str) -> Result<()> {
    let history = History::new(&config.history.path);

    match action {
        HistoryCommands::List { count } => {
            let entries = history.get_recent(count)?;
            if format != "text" {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }
            println!("Recent history ({} entries):", entries.len());
            for entry in entries {
                let status = if entry.undone { "[UNDONE]" } else { "" };
                println!("  {} {} -> {} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M"),
                    entry.original_path.display(),
                    entry.new_path.display(),
                    status
                );
            }
        }
        HistoryCommands::Undo { count, dry_run } => {
            if dry_run {
                let entries = history.get_undoable()?;
                if entries.is_empty() {
                    println!("No renames to undo");
                }
                for entry in entries.into_iter().take(count) {
                    println!("Would undo: {} -> {}",
                        entry.new_path.display(),
                        entry.original_path.display()
                    );
                }
                return Ok(());
            }

            let source = FsSource::new();
            for _ in 0..count {
                match undo_last(&source, &history).await? {
                    Some(entry) => println!("Undone: {} -> {}",
                        entry.new_path.display(),
                        entry.original_path.display()
                    ),
                    None => {
                        println!("No renames to undo");
                        break;
                    }
                }
            }
        }
        HistoryCommands::Clear { force } => {
            if !force {
                eprintln!("Use --force to confirm clearing history");
                return Ok(());
            }
            history.clear()?;
            println!("History cleared");
        }
    }

    Ok(())
}

/// Run config commands
fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Tags file: {}", config.layout.tags_file);
            println!("  Metadata file: {}", config.layout.metadata_file);
            println!("  Preview folder: {}", config.layout.preview_folder);
        }
    }

    Ok(())
}

/// Create missing reserved files in a pack
async fn run_init(config: AppConfig, dir: PathBuf, force: bool, config_path: &Path) -> Result<()> {
    let source = FsSource::new();
    let layout = &config.layout;
    let mut created = Vec::new();

    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| PackLensError::io(&dir, e))?;

    if source.find_entry(&dir, &layout.tags_file).await?.is_none() {
        source.write_text(&dir.join(&layout.tags_file), "").await?;
        created.push(layout.tags_file.clone());
    }

    if source.find_entry(&dir, &layout.metadata_file).await?.is_none() {
        let template = serde_json::json!({
            "tag": "",
            "prices": [{ "value": "0", "name": "default" }],
            "longDescription": "",
            "sellerId": "",
            "sellerStripeAccountId": "",
        });
        let text = PackMetadata::from_value(template)?.to_pretty_string()?;
        source.write_text(&dir.join(&layout.metadata_file), &text).await?;
        created.push(layout.metadata_file.clone());
    }

    if source.find_directory(&dir, &layout.preview_folder).await?.is_none() {
        let preview = dir.join(&layout.preview_folder);
        tokio::fs::create_dir_all(&preview)
            .await
            .map_err(|e| PackLensError::io(&preview, e))?;
        created.push(format!("{}/", layout.preview_folder));
    }

    if force || !config_path.exists() {
        config.save(config_path)?;
        created.push(config_path.display().to_string());
    }

    info!("Pack initialized in {:?}", dir);
    if created.is_empty() {
        println!("Nothing to create, the pack already has its reserved files");
    } else {
        println!("Created:");
        for name in &created {
            println!("  - {}", name);
        }
        println!("\nNext steps:");
        for (i, step) in init_next_steps(layout, &dir, created.contains(&layout.tags_file))
            .iter()
            .enumerate()
        {
            println!("  {}. {}", i + 1, step);
        }
    }

    Ok(())
}

fn init_next_steps(layout: &LayoutConfig, dir: &Path, tags_created: bool) -> Vec<String> {
    let mut tags_step = format!("List the pack tags in {}, separated by commas", layout.tags_file);
    if tags_created {
        tags_step.push_str(&format!(
            " (scan warns that {} is empty until you do)",
            layout.tags_file
        ));
    }
    vec![
        tags_step,
        format!("Fill in {}: packlens metadata set tag <tag>", layout.metadata_file),
        format!("Check the pack: packlens scan {}", dir.display()),
    ]
}
