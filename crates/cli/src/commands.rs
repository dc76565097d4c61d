//! Subcommand implementations.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use lookout_capture::{device_from_spec, StreamCaptureSession};
use lookout_client::{AnnotationApi, AnnotationService, BatchUploadAggregator, MediaSubmissionClient};
use lookout_core::display::DisplaySink;
use lookout_core::reference::ResourceRef;

use crate::config::{Cli, Command, ServiceArgs};
use crate::files::{expand_images, read_blob};
use crate::sink::ConsoleDisplay;

/// Run one parsed command line to completion.
pub async fn run(cli: Cli) -> Result<()> {
    let api = AnnotationApi::new(&cli.service.api_config())
        .context("failed to build the HTTP client")?;

    tracing::info!(base_url = %api.base_url(), "Using annotation service");

    match cli.command {
        Command::Image { path, save } => image(&cli.service, api, &path, save).await,
        Command::Video { path, save } => video(&cli.service, api, &path, save).await,
        Command::Batch { paths } => batch(&cli.service, api, &paths).await,
        Command::Webcam {
            device,
            output,
            duration_secs,
        } => webcam(&cli.service, api, &device, output, duration_secs).await,
    }
}

fn submission_client(service: &ServiceArgs, api: &AnnotationApi) -> MediaSubmissionClient {
    MediaSubmissionClient::with_limits(Arc::new(api.clone()), service.limits())
}

async fn image(
    service: &ServiceArgs,
    api: AnnotationApi,
    path: &Path,
    save: Option<PathBuf>,
) -> Result<()> {
    let display = ConsoleDisplay::new(api.base_url());
    let blob = read_blob(path)?;
    let reference = submission_client(service, &api)
        .submit_image(Some(blob), &display)
        .await?;
    save_output(&api, &reference, save).await
}

async fn video(
    service: &ServiceArgs,
    api: AnnotationApi,
    path: &Path,
    save: Option<PathBuf>,
) -> Result<()> {
    let display = ConsoleDisplay::new(api.base_url());
    let blob = read_blob(path)?;
    let reference = submission_client(service, &api)
        .submit_video(Some(blob), &display)
        .await?;
    save_output(&api, &reference, save).await
}

async fn batch(service: &ServiceArgs, api: AnnotationApi, paths: &[PathBuf]) -> Result<()> {
    let display = ConsoleDisplay::new(api.base_url());
    let files = expand_images(paths)?
        .iter()
        .map(|path| read_blob(path))
        .collect::<Result<Vec<_>>>()?;

    let aggregator = BatchUploadAggregator::new(submission_client(service, &api));
    aggregator.submit_batch(files, &display).await?;
    Ok(())
}

async fn webcam(
    service: &ServiceArgs,
    api: AnnotationApi,
    device: &str,
    output: Option<PathBuf>,
    duration_secs: Option<u64>,
) -> Result<()> {
    let mut display = ConsoleDisplay::new(api.base_url());
    if let Some(path) = output {
        display = display.with_frame_file(path);
    }
    let display = Arc::new(display);

    let mut session = StreamCaptureSession::new(
        device_from_spec(device),
        Arc::new(api) as Arc<dyn AnnotationService>,
        Arc::clone(&display) as Arc<dyn DisplaySink>,
        service.capture_config(),
    );
    session.start()?;

    let reason = match duration_secs {
        Some(secs) => tokio::select! {
            _ = tokio::signal::ctrl_c() => "interrupted",
            _ = tokio::time::sleep(Duration::from_secs(secs)) => "duration elapsed",
        },
        None => {
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            "interrupted"
        }
    };

    session.stop();
    let stats = session.stats();
    tracing::info!(
        reason,
        ticks = stats.ticks,
        issued = stats.issued,
        skipped = stats.skipped,
        displayed = stats.displayed,
        failed = stats.failed,
        discarded = stats.discarded,
        "Webcam capture finished",
    );
    println!(
        "frames annotated: {} of {} captured ({} ticks skipped)",
        display.frames(),
        stats.issued,
        stats.skipped
    );
    Ok(())
}

/// Download the annotated result when `--save` was given.
async fn save_output(
    api: &AnnotationApi,
    reference: &ResourceRef,
    save: Option<PathBuf>,
) -> Result<()> {
    let Some(path) = save else {
        return Ok(());
    };

    let bytes = api
        .fetch_output(reference)
        .await
        .with_context(|| format!("failed to download {}", reference.path()))?;
    fs::write(&path, &bytes).with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), "Saved annotated output");
    Ok(())
}
