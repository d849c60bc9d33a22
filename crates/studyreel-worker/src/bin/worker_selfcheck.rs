use std::path::Path;

use studyreel_media::{check_ffmpeg, check_ffprobe};
use studyreel_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with storage_dir={}",
        config.storage_dir.display()
    );
    ensure_dir(&config.storage_dir).await?;
    if let Some(work_dir) = &config.work_dir {
        ensure_dir(work_dir).await?;
    }

    let ffmpeg = check_ffmpeg().map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;
    let ffprobe = check_ffprobe().map_err(|e| anyhow::anyhow!("ffprobe not available: {}", e))?;
    println!("worker-selfcheck: ffmpeg={} ffprobe={}", ffmpeg.display(), ffprobe.display());

    studyreel_generators::Generators::from_config(
        &config.generators,
        std::sync::Arc::new(studyreel_media::ProcessRunner::new()),
    )
    .map_err(|e| anyhow::anyhow!("generator providers misconfigured: {}", e))?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_dir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    let probe = path.join(".selfcheck");
    tokio::fs::write(&probe, b"ok").await?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}
