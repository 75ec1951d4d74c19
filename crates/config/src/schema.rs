/// Config schema types (download tool, external binaries, metrics, hooks).
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReelConfig {
    pub youtube_dl: YoutubeDlConfig,
    pub binaries: BinariesConfig,
    pub metrics: MetricsConfig,
    pub hooks: Option<HooksConfig>,
}

/// Settings for the `youtube-dl` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeDlConfig {
    /// Directory downloads and screenshots are written to. `~` is expanded.
    pub output_dir: String,
    /// Download audio only unless a request overrides it.
    pub audio_only: bool,
    /// Netscape-format cookies file handed to yt-dlp when it exists.
    pub cookies_file: Option<String>,
    /// Codec yt-dlp extracts audio to.
    pub audio_format: String,
    /// Audio bitrate passed to `--audio-quality`.
    pub audio_quality: String,
    pub download_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub screenshot_timeout_secs: u64,
}

impl Default for YoutubeDlConfig {
    fn default() -> Self {
        Self {
            output_dir: "~/downloads".into(),
            audio_only: true,
            cookies_file: None,
            audio_format: "mp3".into(),
            audio_quality: "192K".into(),
            download_timeout_secs: 1800,
            probe_timeout_secs: 60,
            screenshot_timeout_secs: 60,
        }
    }
}

/// Explicit locations for the external binaries. Unset entries are looked up
/// on `PATH`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BinariesConfig {
    pub yt_dlp: Option<String>,
    pub ffmpeg: Option<String>,
    pub ffprobe: Option<String>,
}

/// Metrics and observability configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Install a metrics recorder at startup.
    pub enabled: bool,
    /// Extra labels attached to every metric.
    pub labels: HashMap<String, String>,
}

/// Shell hooks section (`[[hooks.hooks]]`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HooksConfig {
    #[serde(default)]
    pub hooks: Vec<ShellHookConfigEntry>,
}

/// A single shell hook defined in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellHookConfigEntry {
    pub name: String,
    pub command: String,
    /// Event names, e.g. `BeforeToolCall`, `AfterToolCall`, `ToolError`.
    pub events: Vec<String>,
    #[serde(default = "default_hook_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

fn default_hook_timeout() -> u64 {
    10
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = ReelConfig::default();
        assert_eq!(cfg.youtube_dl.output_dir, "~/downloads");
        assert!(cfg.youtube_dl.audio_only);
        assert!(cfg.youtube_dl.cookies_file.is_none());
        assert_eq!(cfg.youtube_dl.audio_format, "mp3");
        assert_eq!(cfg.youtube_dl.audio_quality, "192K");
        assert!(cfg.binaries.yt_dlp.is_none());
        assert!(!cfg.metrics.enabled);
        assert!(cfg.hooks.is_none());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg: ReelConfig = toml::from_str(
            r#"
[youtube_dl]
output_dir = "/tmp/test_downloads"
audio_only = false
"#,
        )
        .unwrap();
        assert_eq!(cfg.youtube_dl.output_dir, "/tmp/test_downloads");
        assert!(!cfg.youtube_dl.audio_only);
        assert_eq!(cfg.youtube_dl.download_timeout_secs, 1800);
    }

    #[test]
    fn hook_entries_default_timeout() {
        let cfg: ReelConfig = toml::from_str(
            r#"
[[hooks.hooks]]
name = "audit"
command = "./audit.sh"
events = ["BeforeToolCall", "ToolError"]
"#,
        )
        .unwrap();
        let hooks = cfg.hooks.unwrap().hooks;
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks[0].timeout, 10);
        assert_eq!(hooks[0].events, ["BeforeToolCall", "ToolError"]);
    }
}
