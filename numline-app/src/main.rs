mod app;

use anyhow::Context;
use app::WindowPresenter;
use clap::Parser;
use numline_experiment::{CsvSink, ExperimentConfig, ExperimentContext, Participant, Sex, run_session};
use numline_render::SkiaRenderer;
use numline_timing::HighPrecisionTimer;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Number-line estimation experiment.
#[derive(Parser, Debug)]
#[command(name = "numline")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Experiment configuration (YAML)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Participant identifier
    #[arg(long)]
    id: String,

    /// Participant sex: M or F
    #[arg(long)]
    sex: Sex,

    #[arg(long, default_value = "20")]
    age: String,

    /// Directory receiving the result file
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Font used for every text element
    #[arg(long, default_value = "assets/DejaVuSans.ttf")]
    font: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // Everything that can be rejected is checked before a window opens.
    let config = ExperimentConfig::load(&cli.config)
        .with_context(|| format!("invalid configuration {}", cli.config.display()))?;
    let participant = Participant::new(cli.id, cli.sex, cli.age)?;
    let font = match SkiaRenderer::load_font(&cli.font) {
        Ok(font) => Some(font),
        Err(e) => {
            tracing::warn!(error = %e, "continuing without text");
            None
        }
    };

    let mut rng = rand::rng();
    let sink = CsvSink::create(&cli.output_dir, &participant.identifier(), &mut rng)?;
    let palette = config.palette();
    let monitor_width = config.monitor_width;
    let mut ctx = ExperimentContext::new(config, &participant, HighPrecisionTimer::new(), rng)?;

    println!("=== NUMBER LINE EXPERIMENT ===");
    println!("Platform: {}", std::env::consts::OS);
    println!("Participant: {}", ctx.participant);
    println!("Results: {}", sink.path().display());
    println!("Press SPACE to start or {} to abort.\n", ctx.config.abort_key);

    let mut presenter = WindowPresenter::new(palette, font, monitor_width)?;
    match run_session(&mut ctx, &mut presenter, sink) {
        Ok(summary) => {
            println!(
                "\nExperiment completed: {} trials in {} blocks.",
                summary.trials, summary.blocks
            );
            Ok(())
        }
        Err(e) if e.is_user_abort() => {
            tracing::warn!("{e}");
            println!("\n{e}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
