//! `youtube-dl` tool: fetch audio or video from a URL (or pass a local file
//! through), optionally grab a frame, and report metadata.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use {
    anyhow::{Context, Result},
    async_trait::async_trait,
    reel_agents::tool_registry::AgentTool,
    reel_common::hooks::{HookAction, HookPayload, HookRegistry},
    reel_config::ReelConfig,
    reel_media::{SourceKind, VideoLoader, expand_tilde},
    serde_json::{Value, json},
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use reel_metrics::{counter, gauge, histogram, labels, tools as tools_metrics};

use crate::request::DownloadRequest;

pub const TOOL_NAME: &str = "youtube-dl";

/// Returned when a `BeforeToolCall` hook refuses the call.
#[derive(Debug, thiserror::Error)]
#[error("blocked by hook: {0}")]
pub struct Blocked(pub String);

/// Error category of a failed `execute`, as reported in `ToolError` events.
pub fn error_kind(err: &anyhow::Error) -> &'static str {
    if let Some(e) = err.downcast_ref::<reel_media::Error>() {
        e.kind()
    } else if err.is::<Blocked>() {
        "Blocked"
    } else {
        "Io"
    }
}

pub struct YoutubeDlTool {
    loader: VideoLoader,
    output_dir: PathBuf,
    default_audio_only: bool,
    hooks: Option<Arc<HookRegistry>>,
}

impl YoutubeDlTool {
    /// `output_dir` is tilde-expanded and created if missing.
    pub fn new(loader: VideoLoader, output_dir: &str, default_audio_only: bool) -> Result<Self> {
        let output_dir = expand_tilde(output_dir);
        std::fs::create_dir_all(&output_dir)
            .with_context(|| format!("failed to create output dir {}", output_dir.display()))?;
        Ok(Self {
            loader,
            output_dir,
            default_audio_only,
            hooks: None,
        })
    }

    pub fn from_config(config: &ReelConfig) -> Result<Self> {
        Self::new(
            VideoLoader::from_config(config),
            &config.youtube_dl.output_dir,
            config.youtube_dl.audio_only,
        )
    }

    /// Same tool as [`Self::from_config`] without creating the output dir.
    /// Used when only the name and schema are needed.
    pub fn describe(config: &ReelConfig) -> Self {
        Self {
            loader: VideoLoader::from_config(config),
            output_dir: expand_tilde(&config.youtube_dl.output_dir),
            default_audio_only: config.youtube_dl.audio_only,
            hooks: None,
        }
    }

    /// Emit lifecycle events through `hooks`.
    pub fn with_hooks(mut self, hooks: Arc<HookRegistry>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn run(&self, request: &DownloadRequest) -> reel_media::Result<Value> {
        info!(source = %request.url, audio_only = request.audio_only, "loading source");
        let mut info = self.loader.load(&request.url).await?;

        let (path, cached) = match info.kind {
            SourceKind::Url => {
                let filename = request.target_filename();
                if request.audio_only {
                    let dl = self
                        .loader
                        .download_audio(&request.url, &self.output_dir, filename, request.use_cache)
                        .await?;
                    info.audio_path = Some(dl.path.clone());
                    (dl.path, dl.cached)
                } else {
                    let dl = self
                        .loader
                        .download_video(&request.url, &self.output_dir, filename, request.use_cache)
                        .await?;
                    info.video_path = Some(dl.path.clone());
                    (dl.path, dl.cached)
                }
            },
            SourceKind::File => (PathBuf::from(&info.source), false),
        };

        let screenshot_path = match (&request.screenshot_time, request.capture_screenshot) {
            (Some(ts), true) => {
                let output = self.output_dir.join(request.screenshot_filename());
                info!(timestamp = %ts, output = %output.display(), "capturing screenshot");
                Some(
                    self.loader
                        .capture_screenshot(&path, ts.as_str(), &output)
                        .await?,
                )
            },
            _ => None,
        };

        let mut result = json!({
            "path": path.display().to_string(),
            "metadata": info,
            "cached": cached,
        });
        if let Some(shot) = screenshot_path {
            result["screenshot_path"] = json!(shot.display().to_string());
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(file = %name, cached, "download complete");
        Ok(result)
    }

    /// Dispatch `BeforeToolCall`; returns the (possibly replaced) arguments.
    async fn before_call(&self, session_key: &str, params: Value) -> Result<Value> {
        let Some(hooks) = &self.hooks else {
            return Ok(params);
        };
        let payload = HookPayload::BeforeToolCall {
            session_key: session_key.to_string(),
            tool_name: TOOL_NAME.to_string(),
            arguments: params.clone(),
        };
        match hooks.dispatch(&payload).await {
            Ok(HookAction::Block(reason)) => {
                warn!(tool = TOOL_NAME, %reason, "tool call blocked by hook");
                Err(Blocked(reason).into())
            },
            Ok(HookAction::ModifyPayload(modified)) => {
                debug!(tool = TOOL_NAME, "arguments replaced by hook");
                Ok(modified)
            },
            Ok(HookAction::Continue) => Ok(params),
            Err(e) => {
                warn!(tool = TOOL_NAME, error = %e, "BeforeToolCall hook dispatch failed");
                Ok(params)
            },
        }
    }

    async fn notify(&self, payload: HookPayload) {
        if let Some(hooks) = &self.hooks
            && let Err(e) = hooks.dispatch(&payload).await
        {
            warn!(tool = TOOL_NAME, event = %payload.event(), error = %e, "hook dispatch failed");
        }
    }
}

#[async_trait]
impl AgentTool for YoutubeDlTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Download audio or video from YouTube (or any site yt-dlp supports) with metadata \
         extraction and screenshot capture. Local file paths are accepted and passed through."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["url"],
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Video URL or local file path"
                },
                "audio_only": {
                    "type": "boolean",
                    "description": "Download audio only instead of the full video (defaults to the configured mode)"
                },
                "output_filename": {
                    "type": "string",
                    "description": "File name for the download (default audio.mp3 or video.mp4)"
                },
                "use_cache": {
                    "type": "boolean",
                    "description": "Reuse an existing file with the same name (default true)"
                },
                "capture_screenshot": {
                    "type": "boolean",
                    "description": "Extract a frame from the video (default false)"
                },
                "screenshot_time": {
                    "type": "string",
                    "description": "Frame position as HH:MM:SS, MM:SS or seconds; required when capture_screenshot is true"
                }
            }
        })
    }

    async fn execute(&self, params: Value) -> Result<Value> {
        let start = Instant::now();
        let session_key = params
            .get("_session_key")
            .and_then(Value::as_str)
            .unwrap_or("main")
            .to_string();

        #[cfg(feature = "metrics")]
        gauge!(tools_metrics::EXECUTIONS_IN_FLIGHT, labels::TOOL => TOOL_NAME).increment(1.0);

        let outcome = match self.before_call(&session_key, params).await {
            Ok(params) => match DownloadRequest::from_params(&params, self.default_audio_only) {
                Ok(request) => self.run(&request).await.map_err(anyhow::Error::from),
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        #[cfg(feature = "metrics")]
        {
            gauge!(tools_metrics::EXECUTIONS_IN_FLIGHT, labels::TOOL => TOOL_NAME).decrement(1.0);
            counter!(
                tools_metrics::EXECUTIONS_TOTAL,
                labels::TOOL => TOOL_NAME,
                labels::SUCCESS => outcome.is_ok().to_string()
            )
            .increment(1);
            histogram!(tools_metrics::EXECUTION_DURATION_SECONDS, labels::TOOL => TOOL_NAME)
                .record(start.elapsed().as_secs_f64());
            if let Err(e) = &outcome {
                counter!(
                    tools_metrics::EXECUTION_ERRORS_TOTAL,
                    labels::TOOL => TOOL_NAME,
                    labels::ERROR_TYPE => error_kind(e)
                )
                .increment(1);
            }
        }

        match outcome {
            Ok(result) => {
                self.notify(HookPayload::AfterToolCall {
                    session_key,
                    tool_name: TOOL_NAME.to_string(),
                    result: result.clone(),
                    duration_ms,
                })
                .await;
                Ok(result)
            },
            Err(e) => {
                let kind = error_kind(&e);
                warn!(tool = TOOL_NAME, kind, error = %e, "download failed");
                self.notify(HookPayload::ToolError {
                    session_key,
                    tool_name: TOOL_NAME.to_string(),
                    message: e.to_string(),
                    kind: kind.to_string(),
                    duration_ms,
                })
                .await;
                Err(e)
            },
        }
    }
}
