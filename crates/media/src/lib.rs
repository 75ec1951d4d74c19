//! Media acquisition: yt-dlp downloads, ffmpeg frame grabs, local file probing.

pub mod error;
pub mod ffmpeg;
pub mod loader;
pub mod process;
pub mod source;
pub mod ytdlp;

pub use {
    error::{Error, Result},
    ffmpeg::{Ffmpeg, FfmpegOptions, Transcoder},
    loader::VideoLoader,
    process::{ProcessOutput, RunOpts, find_binary},
    source::{SourceKind, VideoInfo, expand_tilde},
    ytdlp::{Download, DownloadEngine, DownloadMode, YtDlp, YtDlpOptions},
};
