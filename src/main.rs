//! stackslice: extract one user's answers from a Stack Exchange data dump

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stackslice::{
    config::{Config, LogFormat, LoggingConfig, DEFAULT_CONFIG_FILE},
    ExtractStats, Pipeline,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "stackslice")]
#[command(about = "Extract a user's answers and their as-of bodies from a Stack Exchange data dump")]
#[command(version)]
struct Cli {
    /// Configuration file path (used only if it exists)
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Id of the user whose answers are extracted
    #[arg(short, long, env = "STACKSLICE_USER_ID", global = true)]
    user_id: Option<String>,

    /// Directory holding the dumps, the cache and the output
    #[arg(short, long, env = "STACKSLICE_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (no progress output or summary)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the extraction (default)
    Run {
        /// Delete the posts-of-interest cache first and rescan the posts dump
        #[arg(long)]
        refresh: bool,
    },

    /// Show the state of the posts-of-interest cache
    Status,

    /// Write a default configuration file
    Init {
        /// Output directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config, then let flags and environment override it
    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(user_id) = cli.user_id {
        config.extract.user_id = user_id;
    }
    if let Some(data_dir) = cli.data_dir {
        config.extract.data_dir = data_dir;
    }
    config.validate()?;

    init_logging(&config.logging, cli.verbose)?;

    match cli.command.unwrap_or(Commands::Run { refresh: false }) {
        Commands::Run { refresh } => run_extract(&config, refresh, cli.quiet),
        Commands::Status => show_cache_status(&config),
        Commands::Init { path } => init_config(&path),
    }
}

fn init_logging(logging: &LoggingConfig, verbose: u8) -> Result<()> {
    let level = logging.level.raised_by(verbose).to_tracing();
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false);

    match logging.format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }
    Ok(())
}

fn run_extract(config: &Config, refresh: bool, quiet: bool) -> Result<()> {
    let pipeline = Pipeline::from_config(&config.extract)?
        .with_refresh(refresh)
        .with_quiet(quiet);

    for input in pipeline.required_inputs() {
        if !input.exists() {
            anyhow::bail!("Dump file not found: {}", input.display());
        }
    }

    let stats = pipeline
        .run()
        .with_context(|| format!("Extraction for user {} failed", pipeline.user_id()))?;

    if !quiet {
        print_summary(&stats, pipeline.output_path());
    }

    Ok(())
}

fn print_summary(stats: &ExtractStats, output: &Path) {
    println!("\nExtraction Summary");
    println!("==================");
    println!(
        "Posts of interest:   {}",
        if stats.cache_hit { "loaded from cache" } else { "scanned" }
    );
    println!("Answers found:       {}", stats.answers_found);
    println!("Questions resolved:  {}", stats.questions_resolved);
    println!("Post rows scanned:   {}", stats.post_rows_scanned);
    println!("History rows:        {}", stats.history_rows_scanned);
    println!("Body revisions:      {}", stats.bodies_recorded);
    println!("Duplicate bodies:    {}", stats.duplicate_bodies);
    println!("As-of fallbacks:     {}", stats.as_of_fallbacks);
    println!("Records written:     {}", stats.records_written);
    println!("Elapsed time:        {:.1}s", stats.elapsed_seconds);
    println!("\nOutput saved to: {}", output.display());
}

fn show_cache_status(config: &Config) -> Result<()> {
    let pipeline = Pipeline::from_config(&config.extract)?;
    let cache = pipeline.cache();

    println!("\nPosts-of-interest Cache");
    println!("=======================");
    println!("Path:      {}", cache.path().display());

    if !cache.exists() {
        println!("Status:    absent (next run scans the posts dump)");
        return Ok(());
    }

    let rows = cache
        .load()
        .with_context(|| format!("Failed to read cache {}", cache.path().display()))?;
    let questions: HashSet<_> = rows.iter().map(|r| r.question_post_id.as_str()).collect();

    println!("Status:    present");
    println!("Answers:   {}", rows.len());
    println!("Questions: {}", questions.len());
    println!("\nTo rebuild it, run:");
    println!("  stackslice run --refresh");

    Ok(())
}

fn init_config(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let path = dir.join(DEFAULT_CONFIG_FILE);
    if path.exists() {
        anyhow::bail!("Configuration already exists: {}", path.display());
    }

    Config::default().save(&path)?;
    info!("Wrote default configuration to {}", path.display());
    println!("Created {}", path.display());

    Ok(())
}
