//! Source classification and the metadata record returned for every load.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where a source string points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Url,
    File,
}

impl SourceKind {
    /// Anything starting with `http://`, `https://` or `www.` is a URL;
    /// everything else is treated as a local path.
    #[must_use]
    pub fn classify(source: &str) -> Self {
        if ["http://", "https://", "www."]
            .iter()
            .any(|prefix| source.starts_with(prefix))
        {
            Self::Url
        } else {
            Self::File
        }
    }
}

/// Metadata for a loaded source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub source: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub title: String,
    pub id: String,
    pub duration: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub uploader: String,
    #[serde(default)]
    pub audio_path: Option<PathBuf>,
    #[serde(default)]
    pub video_path: Option<PathBuf>,
}

impl VideoInfo {
    /// Build from the JSON document printed by `yt-dlp -J`.
    pub fn from_engine_json(url: &str, info: &serde_json::Value) -> Self {
        let text = |key: &str| info.get(key).and_then(|v| v.as_str()).map(str::to_owned);
        Self {
            source: url.to_owned(),
            kind: SourceKind::Url,
            title: text("title").unwrap_or_else(|| "Unknown".to_owned()),
            // Some extractors report numeric ids.
            id: match info.get("id") {
                Some(serde_json::Value::String(id)) => id.clone(),
                Some(serde_json::Value::Number(id)) => id.to_string(),
                _ => url.to_owned(),
            },
            duration: info
                .get("duration")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0),
            description: text("description").unwrap_or_default(),
            uploader: text("uploader").unwrap_or_default(),
            audio_path: None,
            video_path: None,
        }
    }

    /// Metadata for a local file. Title and id are both the file stem.
    pub fn for_file(path: &Path, duration: f64) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            source: path.display().to_string(),
            kind: SourceKind::File,
            title: stem.clone(),
            id: stem,
            duration,
            description: String::new(),
            uploader: String::new(),
            audio_path: None,
            video_path: None,
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return home;
    }
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(path)
}
