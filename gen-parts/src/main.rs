//! gen-parts - Voice a speaker-attributed token stream into numbered audio parts

mod audio;
mod config;
mod error;
mod session;
mod text;
mod tokens;
mod tts;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::GenPartsConfig;
use indicatif::{ProgressBar, ProgressStyle};
use session::{PartManifest, Pipeline, RunReport};
use std::path::PathBuf;
use std::time::Duration;
use tokens::{CharacterMap, TokenReader};

#[derive(Parser, Debug)]
#[command(name = "gen-parts")]
#[command(about = "Voice a speaker-attributed token stream into numbered audio parts", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the tab-separated token file
    tokens: Option<PathBuf>,

    /// Path to the book JSON holding the character list
    characters: Option<PathBuf>,

    /// Configuration file (default: ~/.config/cli-programs/gen-parts.toml)
    #[arg(short, long = "config")]
    config_file: Option<PathBuf>,

    /// Output folder for parts and chapter metadata
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Synthesized chunks per part file
    #[arg(long)]
    batch_size: Option<usize>,

    /// First chunk to synthesize (1-based); earlier chunks are skipped
    #[arg(long)]
    resume_from: Option<u64>,

    /// Part number to start writing at (default: planned from the manifest)
    #[arg(long)]
    start_part: Option<u32>,

    /// Allow a start part that overwrites already written chunks
    #[arg(long, default_value_t = false)]
    force: bool,

    /// Bundle the part files into parts.zip when done
    #[arg(long, default_value_t = false)]
    archive: bool,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write the default configuration file
    Init {
        /// Replace an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Some(Commands::Config { action }) = &args.command {
        return handle_config_command(action, &args);
    }

    let tokens_path = args
        .tokens
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Token file path is required. Run 'gen-parts --help' for usage."))?;
    let characters_path = args
        .characters
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Character file path is required. Run 'gen-parts --help' for usage."))?;

    if !tokens_path.exists() {
        anyhow::bail!("Token file not found: {}", tokens_path.display());
    }
    if !characters_path.exists() {
        anyhow::bail!("Character file not found: {}", characters_path.display());
    }

    let config = effective_config(&args)?;

    if args.debug {
        eprintln!("Tokens: {}", tokens_path.display());
        eprintln!("Characters: {}", characters_path.display());
        eprintln!("Output: {}", config.output_dir.display());
        eprintln!("Batch size: {}", config.batch_size);
        eprintln!("Resume from chunk: {}", config.resume_offset);
    }

    let characters = CharacterMap::load(&characters_path)?;
    log::info!("Loaded {} character(s)", characters.len());

    let manifest = PartManifest::load(&config.parts_dir())?;
    let start_part = manifest.plan_start_part(config.resume_offset, config.start_part, args.force)?;
    if !manifest.parts.is_empty() {
        log::info!(
            "Manifest lists {} part(s); writing from part {:03}",
            manifest.parts.len(),
            start_part
        );
    }

    let engine = tts::create_engine(&config.engine).context("Failed to start speech engine")?;
    let pipeline = Pipeline::new(&config, characters, engine)?;
    let mut reader = TokenReader::open(&tokens_path)?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));

    let report = pipeline
        .run(&mut reader, manifest, start_part, |ctx| {
            pb.set_message(format!(
                "chunk {} | {} voiced | {} audio",
                ctx.chunk_counter,
                ctx.synthesized,
                format_duration(ctx.total_duration)
            ));
        })
        .await;
    pb.finish_and_clear();
    let report = report?;

    if args.archive {
        let count =
            audio::archive::archive_parts(&config.parts_dir(), &report.manifest, &config.archive_path())?;
        eprintln!("Archived {} part(s) to {}", count, config.archive_path().display());
    }

    print_summary(&report, reader.discarded());
    Ok(())
}

/// Load the configuration and apply CLI overrides.
fn effective_config(args: &Args) -> Result<GenPartsConfig> {
    let mut config =
        GenPartsConfig::load(args.config_file.as_deref()).context("Failed to load configuration")?;

    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(size) = args.batch_size {
        config.batch_size = size;
    }
    if let Some(offset) = args.resume_from {
        config.resume_offset = offset;
    }
    if args.start_part.is_some() {
        config.start_part = args.start_part;
    }

    config.validate()?;
    Ok(config)
}

fn print_summary(report: &RunReport, malformed_rows: usize) {
    let ctx = &report.context;

    eprintln!("\nChunks: {}", ctx.chunk_counter);
    if ctx.discarded > 0 {
        eprintln!("  skipped before resume offset: {}", ctx.discarded);
    }
    if ctx.skipped_empty > 0 {
        eprintln!("  empty after cleaning: {}", ctx.skipped_empty);
    }
    eprintln!("  synthesized: {}", ctx.synthesized);
    if ctx.dropped_total() > 0 {
        let kinds: Vec<String> = ctx
            .dropped
            .iter()
            .map(|(kind, n)| format!("{} {}", n, kind))
            .collect();
        eprintln!("  dropped: {} ({})", ctx.dropped_total(), kinds.join(", "));
    }
    if malformed_rows > 0 {
        eprintln!("Malformed token rows ignored: {}", malformed_rows);
    }

    eprintln!(
        "Parts written: {}, audio: {}",
        ctx.parts_written,
        format_duration(ctx.total_duration)
    );
    if let (Some(first), Some(last)) = (report.parts.first(), report.parts.last()) {
        eprintln!(
            "  {} to {} (chunks {}-{})",
            first.file, last.file, first.first_chunk, last.last_chunk
        );
    }
    eprintln!(
        "Finished! {} chapter(s) logged to {}",
        report.chapters.len(),
        report.metadata_path.display()
    );
}

/// Format seconds as H:MM:SS.
fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

fn handle_config_command(action: &ConfigAction, args: &Args) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = GenPartsConfig::load(args.config_file.as_deref())?;
            let path = args.config_file.clone().unwrap_or_else(GenPartsConfig::config_path);
            println!("Configuration file: {:?}", path);
            println!();
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Init { force } => {
            let path = GenPartsConfig::config_path();
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to replace it)",
                    path.display()
                );
            }
            let path = GenPartsConfig::default().save()?;
            println!("Default configuration written to: {}", path.display());
        }
    }
    Ok(())
}
