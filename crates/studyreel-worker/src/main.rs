//! StudyReel worker binary: turns a study text file into a narrated video.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use studyreel_generators::Generators;
use studyreel_media::{AssemblyOptions, ProcessRunner, SceneAssembler, ToolRunner};
use studyreel_storage::{FileProjectStore, LocalStorage};
use studyreel_worker::{InMemoryStatusTracker, Orchestrator, StageDispatcher, WorkerConfig};

#[derive(Parser, Debug)]
#[command(name = "studyreel-worker")]
#[command(about = "Turn study notes into a narrated explainer video")]
#[command(version)]
struct Cli {
    /// Plain-text study notes to convert
    input: PathBuf,

    /// Project title (defaults to the input file name)
    #[arg(long)]
    title: Option<String>,

    /// Storage root for projects and assets
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// Seconds of video per generated clip
    #[arg(long)]
    clip_seconds: Option<u32>,

    /// Upper bound on total clip seconds per video
    #[arg(long)]
    max_video_seconds: Option<u32>,

    /// Crossfade between scenes, in seconds
    #[arg(long)]
    crossfade: Option<f64>,
}

impl Cli {
    /// Command-line flags win over environment settings.
    fn apply(&self, config: &mut WorkerConfig) {
        if let Some(dir) = &self.storage_dir {
            config.storage_dir = dir.clone();
        }
        if let Some(secs) = self.clip_seconds {
            config.clip_seconds = secs;
        }
        if let Some(secs) = self.max_video_seconds {
            config.max_video_seconds = secs;
        }
        if let Some(secs) = self.crossfade {
            config.crossfade_secs = Some(secs).filter(|s| *s > 0.0);
        }
    }

    fn project_title(&self) -> String {
        self.title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| {
                self.input
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "Untitled".to_string())
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing();

    if let Err(e) = run(cli).await {
        error!("Pipeline failed: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(&cli.input)
        .await
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let title = cli.project_title();

    let mut config = WorkerConfig::from_env();
    cli.apply(&mut config);
    info!(
        storage_dir = %config.storage_dir.display(),
        clip_seconds = config.clip_seconds,
        max_video_seconds = config.max_video_seconds,
        crossfade = ?config.crossfade_secs,
        "Worker config loaded"
    );

    let runner: Arc<dyn ToolRunner> = Arc::new(ProcessRunner::new().with_timeout(config.ffmpeg_timeout_secs));
    let generators = Generators::from_config(&config.generators, Arc::clone(&runner))?;
    let assembler = SceneAssembler::new(
        runner,
        AssemblyOptions {
            crossfade_secs: config.crossfade_secs,
            work_dir: config.work_dir.clone(),
            ..Default::default()
        },
    )
    .await;

    let storage = LocalStorage::new(&config.storage_dir);
    let orchestrator = Arc::new(
        Orchestrator::new(
            Arc::new(FileProjectStore::new(storage.clone())),
            storage,
            generators,
            Arc::new(assembler),
            Arc::new(InMemoryStatusTracker::new()),
        )
        .with_clip_budget(config.clip_budget())
        .with_clip_retry_delay(config.clip_retry_delay),
    );
    let dispatcher = StageDispatcher::new(Arc::clone(&orchestrator), config.max_concurrent_stages);

    let project = orchestrator.create_project(title, content).await?;
    let id = project.id.clone();

    orchestrator.generate_outline(&id).await?;
    orchestrator.generate_script(&id).await?;

    dispatcher.dispatch_assets(id.clone()).await?.wait().await?;
    dispatcher.dispatch_video(id.clone()).await?.wait().await?;

    let status = orchestrator.video_status(&id);
    info!(project_id = %id, "{}", status.message);
    if let Some(path) = status.video_path {
        println!("{}", path);
    }
    Ok(())
}
