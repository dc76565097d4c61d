//! Command-line and environment configuration.
//!
//! | Flag / env var                              | Default                 |
//! |---------------------------------------------|-------------------------|
//! | `--base-url` / `ANNOTATION_BASE_URL`        | `http://127.0.0.1:7860` |
//! | `--timeout-secs` / `ANNOTATION_TIMEOUT_SECS`| `30`                    |
//! | `--max-video-mb` / `MAX_VIDEO_MB`           | `20` (`0` = no limit)   |
//! | `--interval-ms` / `CAPTURE_INTERVAL_MS`     | `300`                   |
//!
//! A `.env` file in the working directory is loaded before parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use lookout_capture::camera::SYNTHETIC_DEVICE;
use lookout_capture::CaptureConfig;
use lookout_client::{ApiConfig, SubmissionLimits};

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str =
    "lookout=info,lookout_cli=info,lookout_client=info,lookout_capture=info";

#[derive(Parser, Debug)]
#[command(author, version, about = "Annotate images, videos and camera feeds")]
pub struct Cli {
    #[command(flatten)]
    pub service: ServiceArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// Root URL of the annotation service.
    #[arg(
        long,
        global = true,
        env = "ANNOTATION_BASE_URL",
        default_value = "http://127.0.0.1:7860"
    )]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, env = "ANNOTATION_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Largest video accepted for upload, in megabytes. 0 disables the check.
    #[arg(long, global = true, env = "MAX_VIDEO_MB", default_value_t = 20)]
    pub max_video_mb: u64,

    /// Milliseconds between webcam captures.
    #[arg(long, global = true, env = "CAPTURE_INTERVAL_MS", default_value_t = 300)]
    pub interval_ms: u64,
}

impl ServiceArgs {
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn limits(&self) -> SubmissionLimits {
        match self.max_video_mb {
            0 => SubmissionLimits::unlimited(),
            mb => SubmissionLimits::from_megabytes(mb),
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            interval: Duration::from_millis(self.interval_ms.max(1)),
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Annotate a single image.
    Image {
        path: PathBuf,

        /// Download the annotated image to this file.
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Annotate a single video.
    Video {
        path: PathBuf,

        /// Download the annotated video to this file.
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Annotate several images in one request. Directories expand to the
    /// supported images they contain.
    Batch {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Stream a camera through the service until interrupted.
    Webcam {
        /// Directory of stills to replay, or `stub://pattern`.
        #[arg(long, env = "CAMERA_DEVICE", default_value = SYNTHETIC_DEVICE)]
        device: String,

        /// Keep the latest annotated frame in this file.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Stop after this many seconds instead of waiting for Ctrl-C.
        #[arg(long)]
        duration_secs: Option<u64>,
    },
}
