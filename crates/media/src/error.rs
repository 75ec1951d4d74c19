use reel_common::FromMessage;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{message}")]
    InvalidInput { message: String },

    #[error("{binary} is not installed{}", install_hint(binary))]
    MissingBinary { binary: String },

    #[error("{message}")]
    Download { message: String },

    #[error("Failed to capture screenshot: {message}")]
    Screenshot { message: String },

    #[error("{message}")]
    Probe { message: String },

    #[error("{binary} timed out after {secs}s")]
    Timeout { binary: String, secs: u64 },

    #[error("{message}")]
    NotFound { message: String },

    #[error("Failed to load URL {url}: {source}")]
    LoadUrl {
        url: String,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn install_hint(binary: &str) -> &'static str {
    match binary {
        "yt-dlp" => ". Install with: pip install yt-dlp",
        "ffmpeg" | "ffprobe" => ". Install ffmpeg with your system package manager",
        _ => "",
    }
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn missing_binary(binary: impl Into<String>) -> Self {
        Self::MissingBinary {
            binary: binary.into(),
        }
    }

    #[must_use]
    pub fn download(message: impl Into<String>) -> Self {
        Self::Download {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn screenshot(message: impl Into<String>) -> Self {
        Self::Screenshot {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn probe(message: impl Into<String>) -> Self {
        Self::Probe {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn load_url(url: impl Into<String>, source: Error) -> Self {
        Self::LoadUrl {
            url: url.into(),
            source: Box::new(source),
        }
    }

    /// Stable category name reported in `ToolError` events and metrics labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "InvalidInput",
            Self::MissingBinary { .. } => "MissingBinary",
            Self::Download { .. } => "Download",
            Self::Screenshot { .. } => "Screenshot",
            Self::Probe { .. } => "Probe",
            Self::Timeout { .. } => "Timeout",
            Self::NotFound { .. } => "NotFound",
            Self::LoadUrl { source, .. } => source.kind(),
            Self::Io(_) => "Io",
        }
    }
}

// `.context()` is only applied to filesystem calls in this crate.
impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Io(std::io::Error::other(message))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

reel_common::impl_context!();

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_carries_install_hint() {
        let err = Error::missing_binary("yt-dlp");
        assert_eq!(
            err.to_string(),
            "yt-dlp is not installed. Install with: pip install yt-dlp"
        );
        assert_eq!(err.kind(), "MissingBinary");
        assert_eq!(
            Error::missing_binary("custom").to_string(),
            "custom is not installed"
        );
    }

    #[test]
    fn load_url_keeps_inner_kind() {
        let err = Error::load_url("https://x.test/v", Error::download("HTTP Error 404"));
        assert_eq!(
            err.to_string(),
            "Failed to load URL https://x.test/v: HTTP Error 404"
        );
        assert_eq!(err.kind(), "Download");
    }

    #[test]
    fn screenshot_message_prefix() {
        let err = Error::screenshot("Invalid duration");
        assert_eq!(err.to_string(), "Failed to capture screenshot: Invalid duration");
        assert_eq!(err.kind(), "Screenshot");
    }

    #[test]
    fn context_maps_to_io() {
        let res: std::result::Result<(), &str> = Err("permission denied");
        let err = res.context("failed to create /srv/out").unwrap_err();
        assert_eq!(err.kind(), "Io");
        assert_eq!(err.to_string(), "failed to create /srv/out: permission denied");
    }
}
