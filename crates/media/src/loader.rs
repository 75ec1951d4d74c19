//! Source loading on top of a download engine and a transcoder.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    reel_config::ReelConfig,
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    ffmpeg::{Ffmpeg, FfmpegOptions, Transcoder},
    source::{SourceKind, VideoInfo, expand_tilde},
    ytdlp::{Download, DownloadEngine, YtDlp, YtDlpOptions},
};

pub struct VideoLoader {
    engine: Arc<dyn DownloadEngine>,
    transcoder: Arc<dyn Transcoder>,
}

impl VideoLoader {
    pub fn new(engine: Arc<dyn DownloadEngine>, transcoder: Arc<dyn Transcoder>) -> Self {
        Self { engine, transcoder }
    }

    /// Loader backed by yt-dlp and ffmpeg as configured.
    pub fn from_config(config: &ReelConfig) -> Self {
        Self::new(
            Arc::new(YtDlp::new(YtDlpOptions::from_config(
                &config.youtube_dl,
                &config.binaries,
            ))),
            Arc::new(Ffmpeg::new(FfmpegOptions::from_config(
                &config.youtube_dl,
                &config.binaries,
            ))),
        )
    }

    /// Metadata for a URL or a local file.
    pub async fn load(&self, source: &str) -> Result<VideoInfo> {
        match SourceKind::classify(source) {
            SourceKind::Url => self
                .engine
                .probe(source)
                .await
                .map_err(|e| Error::load_url(source, e)),
            SourceKind::File => self.load_file(source).await,
        }
    }

    async fn load_file(&self, source: &str) -> Result<VideoInfo> {
        let path = expand_tilde(source);
        if !path.exists() {
            return Err(Error::not_found(format!("File not found: {}", path.display())));
        }
        if !path.is_file() {
            return Err(Error::invalid_input(format!("Not a file: {}", path.display())));
        }
        let path = std::path::absolute(&path)?;

        let duration = match self.transcoder.probe_duration(&path).await {
            Ok(secs) => secs,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read duration");
                0.0
            },
        };
        debug!(path = %path.display(), duration, "loaded local file");
        Ok(VideoInfo::for_file(&path, duration))
    }

    pub async fn download_audio(
        &self,
        url: &str,
        output_dir: &Path,
        filename: &str,
        use_cache: bool,
    ) -> Result<Download> {
        self.engine
            .download_audio(url, output_dir, filename, use_cache)
            .await
    }

    pub async fn download_video(
        &self,
        url: &str,
        output_dir: &Path,
        filename: &str,
        use_cache: bool,
    ) -> Result<Download> {
        self.engine
            .download_video(url, output_dir, filename, use_cache)
            .await
    }

    pub async fn capture_screenshot(
        &self,
        video: &Path,
        timestamp: &str,
        output: &Path,
    ) -> Result<PathBuf> {
        self.transcoder
            .capture_screenshot(video, timestamp, output)
            .await
    }
}
