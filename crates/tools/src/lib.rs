//! Agent tools. Currently the `youtube-dl` media download tool.

pub mod request;
pub mod youtube_dl;

pub use {
    request::{DownloadRequest, Timestamp},
    youtube_dl::{Blocked, TOOL_NAME, YoutubeDlTool, error_kind},
};
