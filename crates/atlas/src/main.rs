//! atlas: structural analysis for Python projects
//!
//! Scans a project tree, extracts classes, functions and imports from every
//! Python file, and writes a JSON analysis document for documentation
//! tooling to consume.

mod config;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use atlas_graph::{
    default_artifact_path, load_analysis, write_analysis, ProjectAnalysis, ProjectAnalyzer,
};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{resolve_against, Config};

#[derive(Parser)]
#[command(name = "atlas")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to .atlas directory or config file (default: search upward from the project root)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a project and write the analysis document
    Analyze {
        /// Project root directory
        root: PathBuf,

        /// Output path for the analysis document (default: <ROOT>/.claude/project_analysis.json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Re-read files from disk when checking for the run-as-script guard
        #[arg(long)]
        reread_sources: bool,
    },

    /// Print the summary of a previously written analysis
    Summary {
        /// Project root directory
        root: PathBuf,

        /// Path to the analysis document (default: <ROOT>/.claude/project_analysis.json)
        #[arg(long)]
        analysis: Option<PathBuf>,
    },

    /// Initialize a new .atlas directory with config file
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Initialize logging to stderr, plus daily-rotated files when a log
/// directory is configured.
fn init_logging(verbose: bool, log_dir: Option<&Path>) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let file_layer = log_dir.and_then(|dir| {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Warning: Failed to create logs directory: {}", e);
            return None;
        }

        let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, "atlas.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // Dropping the guard stops the background writer
        static GUARD: OnceLock<WorkerGuard> = OnceLock::new();
        let _ = GUARD.set(guard);

        Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
}

/// Load config from an explicit path or discover `.atlas/config.toml`
/// upward from `start`.
///
/// Returns the config and the `.atlas` directory it came from, if any.
fn load_config(override_path: Option<&PathBuf>, start: &Path) -> Result<(Config, Option<PathBuf>)> {
    if let Some(path) = override_path {
        // Explicit override may name the .atlas directory or the file itself
        let config_file = if path.is_dir() {
            path.join(config::CONFIG_FILE)
        } else {
            path.clone()
        };
        let atlas_dir = config_file.parent().unwrap_or(path).to_path_buf();
        let config = Config::from_file(&config_file)?;
        return Ok((config, Some(atlas_dir)));
    }

    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    match Config::find_and_load_from(&start)? {
        Some((config, atlas_dir)) => Ok((config, Some(atlas_dir))),
        None => Ok((Config::default(), None)),
    }
}

/// Print the human-readable run summary to stdout.
fn print_summary(analysis: &ProjectAnalysis, artifact: &Path) {
    let skipped = analysis.total_files.saturating_sub(analysis.files.len());
    let entry_points = if analysis.entry_points.is_empty() {
        "none detected".to_string()
    } else {
        analysis.entry_points.join(", ")
    };

    println!("Project:      {}", analysis.project_root);
    println!("Files found:  {}", analysis.total_files);
    println!("Modules:      {}", analysis.modules.len());
    println!("Classes:      {}", analysis.class_count());
    println!("Functions:    {}", analysis.function_count());
    println!("Entry points: {}", entry_points);
    println!("Skipped:      {}", skipped);
    println!("Analysis:     {}", artifact.display());
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_start = match &cli.command {
        Commands::Analyze { root, .. } | Commands::Summary { root, .. } => root.clone(),
        Commands::Init { .. } => PathBuf::from("."),
    };
    let (config, config_dir) = load_config(cli.config.as_ref(), &config_start)?;

    init_logging(
        cli.verbose,
        config.resolve_log_dir(config_dir.as_deref()).as_deref(),
    );

    if let Some(dir) = &config_dir {
        info!("Loaded config from {}", dir.display());
    } else {
        tracing::debug!("No .atlas/config.toml found, using defaults");
    }
    for problem in config.validate() {
        tracing::warn!("Config: {}", problem);
    }

    match cli.command {
        Commands::Analyze {
            root,
            output,
            reread_sources,
        } => {
            let mut options = config.to_options();
            options.reread_sources |= reread_sources;

            let artifact = output
                .map(|p| resolve_against(&root, &p))
                .or_else(|| config.resolve_output(&root))
                .unwrap_or_else(|| default_artifact_path(&root));

            let mut analyzer = ProjectAnalyzer::new(options)?;
            let run = analyzer
                .analyze(&root)
                .with_context(|| format!("Failed to analyze {}", root.display()))?;

            write_analysis(&run.analysis, &artifact)
                .with_context(|| format!("Failed to write analysis to {}", artifact.display()))?;
            info!("Wrote analysis to {}", artifact.display());

            print_summary(&run.analysis, &artifact);
        }

        Commands::Summary { root, analysis } => {
            let artifact = analysis
                .map(|p| resolve_against(&root, &p))
                .or_else(|| config.resolve_output(&root))
                .unwrap_or_else(|| default_artifact_path(&root));

            let loaded = load_analysis(&artifact)
                .with_context(|| format!("Failed to load analysis from {}", artifact.display()))?;

            print_summary(&loaded, &artifact);
        }

        Commands::Init { force } => {
            use config::{ATLAS_DIR, CONFIG_FILE, DEFAULT_CONFIG};

            let atlas_dir = PathBuf::from(ATLAS_DIR);
            let config_path = atlas_dir.join(CONFIG_FILE);

            if config_path.exists() && !force {
                anyhow::bail!(".atlas/config.toml already exists. Use --force to overwrite.");
            }

            if !atlas_dir.exists() {
                std::fs::create_dir_all(&atlas_dir)?;
                info!("Created {}/", atlas_dir.display());
            }

            std::fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write {}", config_path.display()))?;
            info!("Created {}", config_path.display());

            println!("Initialized atlas config at {}", config_path.display());
        }
    }

    Ok(())
}
