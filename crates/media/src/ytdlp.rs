//! yt-dlp download engine.

use std::{
    ffi::OsString,
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

#[cfg(feature = "metrics")]
use std::time::Instant;

use {
    async_trait::async_trait,
    reel_config::{BinariesConfig, YoutubeDlConfig},
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use reel_metrics::{counter, downloads as download_metrics, histogram, labels};

use crate::{
    error::{Context, Error, Result},
    process::{self, RunOpts},
    source::{VideoInfo, expand_tilde},
};

const BINARY: &str = "yt-dlp";

/// yt-dlp prints the whole format table with `-J`; keep it intact.
const PROBE_MAX_OUTPUT: usize = 32 * 1024 * 1024;

/// Result of a download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub path: PathBuf,
    /// True when the file already existed and the engine was not invoked.
    pub cached: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode {
    Audio,
    Video,
}

impl DownloadMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    /// Extensions yt-dlp may have produced instead of the requested one.
    pub fn fallback_extensions(self) -> &'static [&'static str] {
        match self {
            Self::Audio => &["mp3", "m4a", "opus", "wav"],
            Self::Video => &["mp4", "webm", "mkv"],
        }
    }
}

impl fmt::Display for DownloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieves metadata and media from a hosting platform.
#[async_trait]
pub trait DownloadEngine: Send + Sync {
    /// Fetch metadata without downloading media.
    async fn probe(&self, url: &str) -> Result<VideoInfo>;

    async fn download_audio(
        &self,
        url: &str,
        output_dir: &Path,
        filename: &str,
        use_cache: bool,
    ) -> Result<Download>;

    async fn download_video(
        &self,
        url: &str,
        output_dir: &Path,
        filename: &str,
        use_cache: bool,
    ) -> Result<Download>;
}

/// Settings for [`YtDlp`].
#[derive(Debug, Clone)]
pub struct YtDlpOptions {
    /// Explicit binary path; `PATH` is searched when unset.
    pub binary: Option<String>,
    pub cookies_file: Option<String>,
    pub audio_format: String,
    pub audio_quality: String,
    pub download_timeout: Duration,
    pub probe_timeout: Duration,
}

impl Default for YtDlpOptions {
    fn default() -> Self {
        Self::from_config(&YoutubeDlConfig::default(), &BinariesConfig::default())
    }
}

impl YtDlpOptions {
    pub fn from_config(config: &YoutubeDlConfig, binaries: &BinariesConfig) -> Self {
        Self {
            binary: binaries.yt_dlp.clone(),
            cookies_file: config.cookies_file.clone(),
            audio_format: config.audio_format.clone(),
            audio_quality: config.audio_quality.clone(),
            download_timeout: Duration::from_secs(config.download_timeout_secs),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
        }
    }
}

/// [`DownloadEngine`] backed by the `yt-dlp` command line tool.
pub struct YtDlp {
    opts: YtDlpOptions,
}

impl YtDlp {
    pub fn new(opts: YtDlpOptions) -> Self {
        Self { opts }
    }

    fn binary(&self) -> Result<PathBuf> {
        process::require_binary(BINARY, self.opts.binary.as_deref())
    }

    /// `--cookies <file>` when a cookies file is configured and exists.
    fn cookie_args(&self) -> Vec<OsString> {
        let Some(file) = self.opts.cookies_file.as_deref() else {
            return Vec::new();
        };
        let path = expand_tilde(file);
        if path.is_file() {
            vec!["--cookies".into(), path.into_os_string()]
        } else {
            warn!(path = %path.display(), "cookies file not found, continuing without it");
            Vec::new()
        }
    }

    fn format_args(&self, mode: DownloadMode) -> Vec<OsString> {
        match mode {
            DownloadMode::Audio => vec![
                "-f".into(),
                "bestaudio/best".into(),
                "-x".into(),
                "--audio-format".into(),
                self.opts.audio_format.clone().into(),
                "--audio-quality".into(),
                self.opts.audio_quality.clone().into(),
            ],
            DownloadMode::Video => vec![
                "-f".into(),
                "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".into(),
                "--merge-output-format".into(),
                "mp4".into(),
            ],
        }
    }

    async fn download(
        &self,
        mode: DownloadMode,
        url: &str,
        output_dir: &Path,
        filename: &str,
        use_cache: bool,
    ) -> Result<Download> {
        let output_dir = expand_tilde(&output_dir.to_string_lossy());
        tokio::fs::create_dir_all(&output_dir)
            .await
            .with_context(|| format!("failed to create {}", output_dir.display()))?;

        let output_path = output_dir.join(filename);
        if use_cache && output_path.exists() {
            info!(%mode, path = %output_path.display(), "using cached download");
            #[cfg(feature = "metrics")]
            counter!(download_metrics::CACHE_HITS_TOTAL, labels::MODE => mode.as_str())
                .increment(1);
            return Ok(Download {
                path: output_path,
                cached: true,
            });
        }

        let binary = self.binary()?;
        let stem = Path::new(filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.to_owned());
        let template = output_dir.join(format!("{stem}.%(ext)s"));

        let mut args = self.format_args(mode);
        args.push("-o".into());
        args.push(template.into_os_string());
        args.extend(
            ["--no-playlist", "--quiet", "--no-warnings"]
                .into_iter()
                .map(OsString::from),
        );
        args.extend(self.cookie_args());
        args.push(url.into());

        info!(%mode, url, output = %output_path.display(), "downloading");
        #[cfg(feature = "metrics")]
        let start = Instant::now();

        let run_opts = RunOpts {
            timeout: self.opts.download_timeout,
            ..RunOpts::default()
        };
        let output = process::run(&binary, &args, &run_opts).await;

        #[cfg(feature = "metrics")]
        {
            counter!(download_metrics::TOTAL, labels::MODE => mode.as_str()).increment(1);
            histogram!(download_metrics::DURATION_SECONDS, labels::MODE => mode.as_str())
                .record(start.elapsed().as_secs_f64());
            let failed = output.as_ref().map_or(true, |o| !o.success());
            if failed {
                counter!(download_metrics::ERRORS_TOTAL, labels::MODE => mode.as_str())
                    .increment(1);
            }
        }

        let output = output?;
        if !output.success() {
            return Err(Error::download(format!(
                "Failed to download {mode}: {}",
                output.failure_reason()
            )));
        }

        let path = locate_output(mode, &output_dir, &stem, &output_path).await?;
        info!(%mode, path = %path.display(), "download complete");
        Ok(Download {
            path,
            cached: false,
        })
    }
}

/// Find the file yt-dlp produced and move it to `output_path`.
///
/// Post-processing can leave the media under a different extension than the
/// requested filename, so the known extensions for `mode` are tried in order.
async fn locate_output(
    mode: DownloadMode,
    output_dir: &Path,
    stem: &str,
    output_path: &Path,
) -> Result<PathBuf> {
    if output_path.exists() {
        return Ok(output_path.to_path_buf());
    }

    for ext in mode.fallback_extensions() {
        let candidate = output_dir.join(format!("{stem}.{ext}"));
        if candidate.exists() {
            debug!(from = %candidate.display(), to = %output_path.display(), "renaming download");
            tokio::fs::rename(&candidate, output_path)
                .await
                .with_context(|| format!("failed to rename {}", candidate.display()))?;
            return Ok(output_path.to_path_buf());
        }
    }

    Err(Error::download(format!(
        "Could not find downloaded {mode} file"
    )))
}

#[async_trait]
impl DownloadEngine for YtDlp {
    async fn probe(&self, url: &str) -> Result<VideoInfo> {
        let binary = self.binary()?;

        let mut args: Vec<OsString> = ["-J", "--skip-download", "--no-playlist", "--no-warnings"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.extend(self.cookie_args());
        args.push(url.into());

        debug!(url, "probing metadata");
        let run_opts = RunOpts {
            timeout: self.opts.probe_timeout,
            max_output_bytes: PROBE_MAX_OUTPUT,
        };
        let output = process::run(&binary, &args, &run_opts).await?;
        if !output.success() {
            return Err(Error::download(output.failure_reason()));
        }

        let info: serde_json::Value = serde_json::from_str(&output.stdout)
            .map_err(|e| Error::download(format!("invalid metadata from {BINARY}: {e}")))?;
        Ok(VideoInfo::from_engine_json(url, &info))
    }

    async fn download_audio(
        &self,
        url: &str,
        output_dir: &Path,
        filename: &str,
        use_cache: bool,
    ) -> Result<Download> {
        self.download(DownloadMode::Audio, url, output_dir, filename, use_cache)
            .await
    }

    async fn download_video(
        &self,
        url: &str,
        output_dir: &Path,
        filename: &str,
        use_cache: bool,
    ) -> Result<Download> {
        self.download(DownloadMode::Video, url, output_dir, filename, use_cache)
            .await
    }
}
