use std::path::{Path, PathBuf};

use mixdeck_media::{check_ffmpeg, check_ffprobe, FfmpegMediaProcessor, MediaProcessor, ProcessPlan};
use mixdeck_storage::{content_type_for_path, ObjectStorageClient};
use mixdeck_worker::{init_tracing, PipelineConfig};
use tracing::warn;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing()?;

    let config = PipelineConfig::from_env();

    println!(
        "pipeline-selfcheck: starting with work_dir={} scratch_dir={}",
        config.queue.work_dir.display(),
        config.storage.scratch_dir.display()
    );
    ensure_dir(&config.queue.work_dir).await?;
    ensure_dir(&config.storage.scratch_dir).await?;
    ensure_tool("ffmpeg", check_ffmpeg()).await?;
    ensure_tool("ffprobe", check_ffprobe()).await?;
    check_storage(ObjectStorageClient::new(config.storage.clone())?).await?;

    if let Some(input) = std::env::args().nth(1).map(PathBuf::from) {
        analyze(&config, &input).await?;
    }

    println!("pipeline-selfcheck: ok");
    Ok(())
}

async fn ensure_dir(path: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {}: {}", path.display(), e))
}

async fn ensure_tool(
    name: &str,
    located: mixdeck_media::MediaResult<PathBuf>,
) -> anyhow::Result<()> {
    let path = located?;
    let output = tokio::process::Command::new(&path)
        .arg("-version")
        .output()
        .await
        .map_err(|e| anyhow::anyhow!("{} not runnable: {}", name, e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("{} -version failed: {:?}", name, output.status));
    }
    println!("pipeline-selfcheck: {} at {}", name, path.display());
    Ok(())
}

async fn check_storage(storage: ObjectStorageClient) -> anyhow::Result<()> {
    if !storage.is_configured() {
        warn!(
            missing = ?storage.config().missing_settings(),
            "Skipping storage check: not configured"
        );
        return Ok(());
    }
    storage.check_connectivity().await?;
    println!("pipeline-selfcheck: storage reachable");
    Ok(())
}

/// Run the processor on a local file and print the derived artifacts.
async fn analyze(config: &PipelineConfig, input: &Path) -> anyhow::Result<()> {
    let processor = FfmpegMediaProcessor::new(config.media.clone());
    let output_dir = tempfile::Builder::new()
        .prefix("selfcheck-")
        .tempdir_in(&config.queue.work_dir)?;

    let mime = content_type_for_path(input);
    let metadata = processor.read_metadata(input).await?;
    let artifacts = processor
        .process(input, mime, &ProcessPlan::full(output_dir.path()))
        .await?;

    let report = serde_json::json!({
        "input": input.display().to_string(),
        "mime_type": mime,
        "metadata": metadata,
        "artifacts": artifacts,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
