//! ffmpeg/ffprobe transcoder.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};

#[cfg(feature = "metrics")]
use std::time::Instant;

use {
    async_trait::async_trait,
    reel_config::{BinariesConfig, YoutubeDlConfig},
    serde::Deserialize,
    tracing::{debug, info},
};

#[cfg(feature = "metrics")]
use reel_metrics::{counter, histogram, transcode as transcode_metrics};

use crate::{
    error::{Context, Error, Result},
    process::{self, RunOpts},
    source::expand_tilde,
};

/// Probing and frame extraction on local media files.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Duration of `path` in seconds.
    async fn probe_duration(&self, path: &Path) -> Result<f64>;

    /// Extract the frame at `timestamp` from `video` into `output`.
    async fn capture_screenshot(
        &self,
        video: &Path,
        timestamp: &str,
        output: &Path,
    ) -> Result<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct FfmpegOptions {
    pub ffmpeg: Option<String>,
    pub ffprobe: Option<String>,
    pub probe_timeout: Duration,
    pub screenshot_timeout: Duration,
}

impl Default for FfmpegOptions {
    fn default() -> Self {
        Self::from_config(&YoutubeDlConfig::default(), &BinariesConfig::default())
    }
}

impl FfmpegOptions {
    pub fn from_config(config: &YoutubeDlConfig, binaries: &BinariesConfig) -> Self {
        Self {
            ffmpeg: binaries.ffmpeg.clone(),
            ffprobe: binaries.ffprobe.clone(),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
            screenshot_timeout: Duration::from_secs(config.screenshot_timeout_secs),
        }
    }
}

/// [`Transcoder`] backed by the `ffmpeg` and `ffprobe` binaries.
pub struct Ffmpeg {
    opts: FfmpegOptions,
}

#[derive(Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl Ffmpeg {
    pub fn new(opts: FfmpegOptions) -> Self {
        Self { opts }
    }
}

#[async_trait]
impl Transcoder for Ffmpeg {
    async fn probe_duration(&self, path: &Path) -> Result<f64> {
        let binary = process::require_binary("ffprobe", self.opts.ffprobe.as_deref())?;
        let args: [OsString; 7] = [
            "-v".into(),
            "error".into(),
            "-show_entries".into(),
            "format=duration".into(),
            "-of".into(),
            "json".into(),
            path.into(),
        ];
        let run_opts = RunOpts {
            timeout: self.opts.probe_timeout,
            ..RunOpts::default()
        };
        let output = process::run(&binary, &args, &run_opts).await?;
        if !output.success() {
            return Err(Error::probe(format!(
                "ffprobe failed for {}: {}",
                path.display(),
                output.failure_reason()
            )));
        }

        let parsed: ProbeOutput = serde_json::from_str(&output.stdout)
            .map_err(|e| Error::probe(format!("invalid ffprobe output: {e}")))?;
        let duration = parsed
            .format
            .duration
            .ok_or_else(|| Error::probe(format!("no duration reported for {}", path.display())))?;
        duration
            .trim()
            .parse::<f64>()
            .map_err(|e| Error::probe(format!("invalid duration '{duration}': {e}")))
    }

    async fn capture_screenshot(
        &self,
        video: &Path,
        timestamp: &str,
        output: &Path,
    ) -> Result<PathBuf> {
        let video = expand_tilde(&video.to_string_lossy());
        let output = expand_tilde(&output.to_string_lossy());

        if !video.exists() {
            return Err(Error::not_found(format!(
                "Video file not found: {}",
                video.display()
            )));
        }
        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let binary = process::require_binary("ffmpeg", self.opts.ffmpeg.as_deref())?;
        // A stale frame at the output path must not pass for a fresh one.
        match tokio::fs::remove_file(&output).await {
            Ok(()) => debug!(output = %output.display(), "removed previous screenshot"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to replace {}", output.display()));
            },
        }
        let args: [OsString; 10] = [
            "-ss".into(),
            timestamp.into(),
            "-i".into(),
            video.clone().into(),
            "-frames:v".into(),
            "1".into(),
            "-q:v".into(),
            "2".into(),
            "-y".into(),
            output.clone().into(),
        ];

        info!(video = %video.display(), timestamp, output = %output.display(), "capturing screenshot");
        #[cfg(feature = "metrics")]
        let start = Instant::now();

        let run_opts = RunOpts {
            timeout: self.opts.screenshot_timeout,
            ..RunOpts::default()
        };
        let result = process::run(&binary, &args, &run_opts).await?;
        if !result.success() {
            return Err(Error::screenshot(result.failure_reason()));
        }
        // ffmpeg exits 0 without writing a frame when seeking past the end.
        if !output.exists() {
            return Err(Error::screenshot(format!(
                "no frame written at {timestamp}"
            )));
        }

        #[cfg(feature = "metrics")]
        {
            counter!(transcode_metrics::SCREENSHOTS_TOTAL).increment(1);
            histogram!(transcode_metrics::SCREENSHOT_DURATION_SECONDS)
                .record(start.elapsed().as_secs_f64());
        }

        debug!(output = %output.display(), "screenshot written");
        Ok(output)
    }
}
