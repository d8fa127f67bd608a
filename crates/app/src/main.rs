use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dreamsync_core::{
    normalize_plan, DreamSyncError, LoggingSink, PlanConfig, RawScenePlan, ScenePlan,
    SceneScheduler, SimulatedTransport, Transport,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> dreamsync_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { input, duration } => run_validate(&input, duration),
        Commands::Play { input, duration } => run_play(&input, duration).await,
    }
}

fn run_validate(input: &Path, duration: Option<f64>) -> dreamsync_core::Result<()> {
    let plan = load_plan(input, duration)?;
    tracing::info!(scenes = plan.len(), duration = plan.duration_sec, "plan is valid");
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

async fn run_play(input: &Path, duration: Option<f64>) -> dreamsync_core::Result<()> {
    let plan = load_plan(input, duration)?;
    tracing::info!(
        scenes = plan.len(),
        duration = plan.duration_sec,
        "starting playback"
    );

    let transport = Arc::new(SimulatedTransport::new(plan.duration_sec));
    let scheduler = SceneScheduler::new(&plan, transport.clone(), Arc::new(LoggingSink))?;
    let total = plan.len();
    scheduler.on_scene_changed(move |idx| {
        tracing::info!(scene = idx + 1, total, "active scene changed");
    });

    scheduler.start().await?;
    transport.ended().await;
    scheduler.stop().await;

    tracing::info!("story finished");
    Ok(())
}

fn load_plan(input: &Path, duration: Option<f64>) -> dreamsync_core::Result<ScenePlan> {
    let text = std::fs::read_to_string(input)?;
    let raw: RawScenePlan = serde_json::from_str(&text)?;

    let duration_sec = duration.or(raw.duration_sec).ok_or_else(|| {
        DreamSyncError::InvalidPlan(
            "plan carries no durationSec; pass --duration explicitly".to_string(),
        )
    })?;

    normalize_plan(&raw, duration_sec, &PlanConfig::default())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-synchronized scene scheduler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Normalize a raw scene plan and print the result.
    Validate {
        /// Path to the raw scene plan JSON.
        input: PathBuf,
        /// Track duration in seconds, overriding the plan's own value.
        #[arg(short, long)]
        duration: Option<f64>,
    },
    /// Play a scene plan against a simulated audio clock, logging each scene
    /// as it becomes active.
    Play {
        /// Path to the raw scene plan JSON.
        input: PathBuf,
        /// Track duration in seconds, overriding the plan's own value.
        #[arg(short, long)]
        duration: Option<f64>,
    },
}
