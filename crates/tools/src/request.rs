//! Parameter parsing for the `youtube-dl` tool.

use std::{fmt, path::Path};

use {
    reel_media::{Error, Result},
    serde_json::Value,
};

pub const DEFAULT_AUDIO_FILENAME: &str = "audio.mp3";
pub const DEFAULT_VIDEO_FILENAME: &str = "video.mp4";
pub const DEFAULT_SCREENSHOT_FILENAME: &str = "screenshot.jpg";

/// A validated `[[HH:]MM:]SS[.fff]` position, kept verbatim for ffmpeg.
#[derive(Debug, Clone, PartialEq)]
pub struct Timestamp {
    raw: String,
    seconds: f64,
}

impl Timestamp {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || {
            Error::invalid_input(format!(
                "Invalid screenshot_time '{raw}': expected [[HH:]MM:]SS[.fff]"
            ))
        };

        let trimmed = raw.trim();
        let parts: Vec<&str> = trimmed.split(':').collect();
        if parts.len() > 3 {
            return Err(invalid());
        }
        let Some((secs_part, leading)) = parts.split_last() else {
            return Err(invalid());
        };

        let secs = parse_seconds(secs_part).ok_or_else(invalid)?;
        let mut units = Vec::with_capacity(leading.len());
        for part in leading {
            units.push(parse_whole(part).ok_or_else(invalid)?);
        }

        // Minutes and seconds roll over at 60 once a larger unit is present.
        if !leading.is_empty() && secs >= 60.0 {
            return Err(invalid());
        }
        if let [_hours, minutes] = units.as_slice()
            && *minutes >= 60
        {
            return Err(invalid());
        }

        let minutes = units
            .iter()
            .try_fold(0u64, |acc, unit| acc.checked_mul(60)?.checked_add(*unit))
            .ok_or_else(invalid)?;
        let seconds = minutes as f64 * 60.0 + secs;

        Ok(Self {
            raw: trimmed.to_string(),
            seconds,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_whole(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

fn parse_seconds(part: &str) -> Option<f64> {
    let (whole, frac) = match part.split_once('.') {
        Some((whole, frac)) => (whole, Some(frac)),
        None => (part, None),
    };
    let whole = parse_whole(whole)?;
    let frac = match frac {
        Some(f) if f.is_empty() || !f.bytes().all(|b| b.is_ascii_digit()) => return None,
        Some(f) => format!("0.{f}").parse::<f64>().ok()?,
        None => 0.0,
    };
    Some(whole as f64 + frac)
}

/// One `youtube-dl` call, validated.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub url: String,
    pub audio_only: bool,
    pub output_filename: Option<String>,
    pub use_cache: bool,
    pub capture_screenshot: bool,
    pub screenshot_time: Option<Timestamp>,
}

impl DownloadRequest {
    /// Validate tool parameters. `default_audio_only` applies when the call
    /// does not set `audio_only`.
    ///
    /// Keys starting with `_` are host context and ignored here.
    pub fn from_params(params: &Value, default_audio_only: bool) -> Result<Self> {
        let url = optional_str(params, "url")?
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::invalid_input("Missing required parameter: url"))?
            .to_string();

        let audio_only = optional_bool(params, "audio_only")?.unwrap_or(default_audio_only);
        let use_cache = optional_bool(params, "use_cache")?.unwrap_or(true);
        let capture_screenshot = optional_bool(params, "capture_screenshot")?.unwrap_or(false);

        let screenshot_time = optional_str(params, "screenshot_time")?
            .map(str::trim)
            .filter(|t| !t.is_empty());
        if capture_screenshot && screenshot_time.is_none() {
            return Err(Error::invalid_input(
                "screenshot_time required when capture_screenshot is true",
            ));
        }
        let screenshot_time = match screenshot_time {
            Some(raw) if capture_screenshot => Some(Timestamp::parse(raw)?),
            _ => None,
        };

        let output_filename = optional_str(params, "output_filename")?
            .filter(|f| !f.is_empty())
            .map(validate_filename)
            .transpose()?;

        Ok(Self {
            url,
            audio_only,
            output_filename,
            use_cache,
            capture_screenshot,
            screenshot_time,
        })
    }

    /// File name the download is stored under.
    pub fn target_filename(&self) -> &str {
        match (&self.output_filename, self.audio_only) {
            (Some(name), _) => name,
            (None, true) => DEFAULT_AUDIO_FILENAME,
            (None, false) => DEFAULT_VIDEO_FILENAME,
        }
    }

    /// File name for the screenshot: the output filename with a `jpg`
    /// extension, or `screenshot.jpg`.
    pub fn screenshot_filename(&self) -> String {
        let Some(name) = self.output_filename.as_deref() else {
            return DEFAULT_SCREENSHOT_FILENAME.to_string();
        };
        let renamed = Path::new(name).with_extension("jpg");
        let renamed = renamed.to_string_lossy();
        if renamed == name {
            // The download itself is a .jpg; don't overwrite it.
            let stem = Path::new(name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            format!("{stem}-screenshot.jpg")
        } else {
            renamed.into_owned()
        }
    }
}

fn optional_str<'a>(params: &'a Value, key: &str) -> Result<Option<&'a str>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) if key == "url" => Err(Error::invalid_input("Missing required parameter: url")),
        Some(_) => Err(Error::invalid_input(format!("{key} must be a string"))),
    }
}

fn optional_bool(params: &Value, key: &str) -> Result<Option<bool>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(Error::invalid_input(format!("{key} must be a boolean"))),
    }
}

fn validate_filename(name: &str) -> Result<String> {
    let name = name.trim();
    let is_plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0']);
    if is_plain {
        Ok(name.to_string())
    } else {
        Err(Error::invalid_input(format!(
            "output_filename must be a plain file name without directories: '{name}'"
        )))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, serde_json::json};

    fn parse(params: Value) -> Result<DownloadRequest> {
        DownloadRequest::from_params(&params, true)
    }

    #[test]
    fn defaults() {
        let req = parse(json!({"url": "https://youtu.be/abc", "_session_key": "s"})).unwrap();
        assert_eq!(req.url, "https://youtu.be/abc");
        assert!(req.audio_only);
        assert!(req.use_cache);
        assert!(!req.capture_screenshot);
        assert_eq!(req.target_filename(), "audio.mp3");
        assert_eq!(req.screenshot_filename(), "screenshot.jpg");
    }

    #[test]
    fn request_overrides_configured_mode() {
        let req = parse(json!({"url": "https://youtu.be/abc", "audio_only": false})).unwrap();
        assert!(!req.audio_only);
        assert_eq!(req.target_filename(), "video.mp4");

        let req =
            DownloadRequest::from_params(&json!({"url": "https://youtu.be/abc"}), false).unwrap();
        assert!(!req.audio_only);
    }

    #[rstest]
    #[case(json!({}))]
    #[case(json!({"url": ""}))]
    #[case(json!({"url": "   "}))]
    #[case(json!({"url": null}))]
    #[case(json!({"url": 42}))]
    fn missing_url(#[case] params: Value) {
        let err = parse(params).unwrap_err();
        assert_eq!(err.to_string(), "Missing required parameter: url");
        assert_eq!(err.kind(), "InvalidInput");
    }

    #[test]
    fn screenshot_requires_time() {
        let err = parse(json!({"url": "https://youtu.be/abc", "capture_screenshot": true}))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "screenshot_time required when capture_screenshot is true"
        );
    }

    #[test]
    fn url_checked_before_screenshot() {
        let err = parse(json!({"capture_screenshot": true})).unwrap_err();
        assert_eq!(err.to_string(), "Missing required parameter: url");
    }

    #[test]
    fn time_ignored_without_capture() {
        let req = parse(json!({"url": "x.mp4", "screenshot_time": "garbage"})).unwrap();
        assert!(req.screenshot_time.is_none());
    }

    #[test]
    fn wrong_types_rejected() {
        let err = parse(json!({"url": "x.mp4", "use_cache": "yes"})).unwrap_err();
        assert_eq!(err.to_string(), "use_cache must be a boolean");
        let err = parse(json!({"url": "x.mp4", "output_filename": 3})).unwrap_err();
        assert_eq!(err.to_string(), "output_filename must be a string");
    }

    #[rstest]
    #[case("../evil.mp3")]
    #[case("a/b.mp3")]
    #[case("a\\b.mp3")]
    #[case("..")]
    #[case(".")]
    fn filename_must_be_plain(#[case] name: &str) {
        let err = parse(json!({"url": "x.mp4", "output_filename": name})).unwrap_err();
        assert!(err.to_string().starts_with("output_filename must be a plain file name"));
    }

    #[rstest]
    #[case(Some("talk.mp4"), "talk.jpg")]
    #[case(Some("talk.mp3"), "talk.jpg")]
    #[case(Some("talk"), "talk.jpg")]
    #[case(Some("frame.jpg"), "frame-screenshot.jpg")]
    #[case(None, "screenshot.jpg")]
    fn screenshot_naming(#[case] output: Option<&str>, #[case] expected: &str) {
        let mut params = json!({
            "url": "https://youtu.be/abc",
            "capture_screenshot": true,
            "screenshot_time": "00:00:05",
        });
        if let Some(output) = output {
            params["output_filename"] = json!(output);
        }
        assert_eq!(parse(params).unwrap().screenshot_filename(), expected);
    }

    #[rstest]
    #[case("5", 5.0)]
    #[case("90", 90.0)]
    #[case("1.5", 1.5)]
    #[case("01:30", 90.0)]
    #[case("1:02:03", 3723.0)]
    #[case("00:00:10.250", 10.25)]
    #[case("100:00:00", 360000.0)]
    fn timestamp_accepts(#[case] raw: &str, #[case] seconds: f64) {
        let ts = Timestamp::parse(raw).unwrap();
        assert!((ts.seconds() - seconds).abs() < 1e-9, "{raw} -> {}", ts.seconds());
        assert_eq!(ts.as_str(), raw);
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("1:2:3:4")]
    #[case("00:60")]
    #[case("01:75:00")]
    #[case("01:00:60.5")]
    #[case("-5")]
    #[case("5.")]
    #[case("1e3")]
    #[case("::5")]
    #[case("999999999999999999:00:00")]
    #[case("99999999999999999999:00")]
    fn timestamp_rejects(#[case] raw: &str) {
        let err = Timestamp::parse(raw).unwrap_err();
        assert!(err.to_string().contains("expected [[HH:]MM:]SS[.fff]"));
    }
}
