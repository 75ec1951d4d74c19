//! Documented config template written by `reel config init`.

/// The default config file, with every option present and commented.
pub fn default_config_template() -> &'static str {
    r##"# reel configuration
# ==================
# Environment variable substitution is supported: ${ENV_VAR} or ${ENV_VAR:-fallback}
# Example: output_dir = "${REEL_MEDIA:-~/downloads}"

[youtube_dl]
output_dir = "~/downloads"        # Where downloads and screenshots are written
audio_only = true                 # Audio-only unless a request sets audio_only = false
# cookies_file = "~/cookies.txt"  # Netscape cookies file passed to yt-dlp when present
audio_format = "mp3"              # Codec for extracted audio
audio_quality = "192K"            # Bitrate for extracted audio
download_timeout_secs = 1800      # Upper bound for a single yt-dlp download
probe_timeout_secs = 60           # Upper bound for metadata lookups (yt-dlp -J, ffprobe)
screenshot_timeout_secs = 60      # Upper bound for a single ffmpeg frame grab

[binaries]                        # Leave unset to search PATH
# yt_dlp = "/usr/local/bin/yt-dlp"
# ffmpeg = "/usr/bin/ffmpeg"
# ffprobe = "/usr/bin/ffprobe"

[metrics]
enabled = false                   # Install the metrics recorder (see `reel fetch --print-metrics`)

# Shell hooks receive the event payload as JSON on stdin.
# Exit 1 from a BeforeToolCall hook refuses the download.
# [[hooks.hooks]]
# name = "audit"
# command = "./hooks/audit.sh"
# events = ["BeforeToolCall", "AfterToolCall", "ToolError"]
# timeout = 10
"##
}
