//! Sonify CLI: load a feed and play it from an interactive shell

use anyhow::{Context, Result};
use clap::Parser;
use sonify::commands::CommandContext;
use sonify::config::{AppConfig, Preferences};
use sonify::repl::Repl;
use sonify::sources::{FeedFormat, SourceRegistry};
use sonify::{spawn_playback, EngineKind};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sonify")]
#[command(about = "Turns time-stamped data feeds into an endlessly looping melody", long_about = None)]
struct Cli {
    /// Config file (default: ./sonify.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Preferences file (default: <config dir>/sonify/preferences.toml)
    #[arg(long)]
    prefs: Option<PathBuf>,

    /// Output engine, overriding the config file
    #[arg(short, long, value_enum)]
    engine: Option<EngineKind>,

    /// Configured source to start with
    #[arg(short, long)]
    source: Option<String>,

    /// Load a feed file instead of a configured source
    #[arg(short, long, conflicts_with = "source")]
    load: Option<PathBuf>,

    /// Format of the file given to --load
    #[arg(short, long, value_enum, default_value_t = FeedFormat::Points)]
    format: FeedFormat,

    /// Start playing as soon as data is available
    #[arg(short, long)]
    autoplay: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("SONIFY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    let prefs_path = cli.prefs.clone().or_else(Preferences::default_path);
    let prefs = prefs_path
        .as_deref()
        .map(Preferences::load_or_default)
        .unwrap_or_default();

    let engine = cli.engine.unwrap_or(config.output.engine);
    info!(%engine, "starting playback runtime");
    let started = spawn_playback(
        engine,
        config.output.gain,
        config.output.midi_port.clone(),
        config.scheduler_settings(&prefs),
    )
    .context("Failed to start playback")?;

    let (source_tx, source_rx) = crossbeam_channel::unbounded();
    let sources = SourceRegistry::new(config.sources.clone());
    let mut ctx = CommandContext::new(started.handle, prefs, prefs_path, sources, source_tx);
    ctx.audio_down = started.audio_down;

    let load = cli.load.as_deref().map(|path| (path, cli.format));
    ctx.open_initial_source(load, cli.source.as_deref());

    if cli.autoplay && ctx.audio_down.is_none() {
        ctx.playback.play()?;
    }

    let mut repl = Repl::new(ctx, source_rx)?;
    repl.run()
}
