//! Running external binaries.

use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use {
    tokio::process::Command,
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use reel_metrics::{counter, labels, process as process_metrics};

use crate::{
    error::{Error, Result},
    source::expand_tilde,
};

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Last non-empty stderr line, which is where yt-dlp and ffmpeg put the
    /// actual failure reason.
    pub fn last_error_line(&self) -> Option<&str> {
        self.stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
    }

    /// Best-effort failure description for a non-zero exit.
    pub fn failure_reason(&self) -> String {
        self.last_error_line()
            .map(str::to_owned)
            .unwrap_or_else(|| format!("exited with status {}", self.exit_code))
    }
}

#[derive(Debug, Clone)]
pub struct RunOpts {
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl Default for RunOpts {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            max_output_bytes: 1024 * 1024,
        }
    }
}

/// Run `binary` with `args` directly (no shell).
///
/// The child is killed if the timeout elapses or the future is dropped.
pub async fn run<I, S>(binary: &Path, args: I, opts: &RunOpts) -> Result<ProcessOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let name = binary_name(binary);
    debug!(
        binary = %binary.display(),
        timeout_secs = opts.timeout.as_secs(),
        "spawning process"
    );

    let mut cmd = Command::new(binary);
    cmd.args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Error::missing_binary(name.clone()),
        _ => Error::Io(e),
    })?;

    #[cfg(feature = "metrics")]
    counter!(process_metrics::SPAWNS_TOTAL, labels::BINARY => name.clone()).increment(1);

    match tokio::time::timeout(opts.timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let stdout = truncate_output(
                String::from_utf8_lossy(&output.stdout).into_owned(),
                opts.max_output_bytes,
            );
            let stderr = truncate_output(
                String::from_utf8_lossy(&output.stderr).into_owned(),
                opts.max_output_bytes,
            );
            let exit_code = output.status.code().unwrap_or(-1);
            debug!(
                binary = %name,
                exit_code,
                stdout_len = stdout.len(),
                stderr_len = stderr.len(),
                "process done"
            );
            Ok(ProcessOutput {
                stdout,
                stderr,
                exit_code,
            })
        },
        Ok(Err(e)) => Err(Error::Io(e)),
        Err(_) => {
            warn!(binary = %name, timeout_secs = opts.timeout.as_secs(), "process timed out");
            #[cfg(feature = "metrics")]
            counter!(process_metrics::TIMEOUTS_TOTAL, labels::BINARY => name.clone())
                .increment(1);
            Err(Error::Timeout {
                binary: name,
                secs: opts.timeout.as_secs(),
            })
        },
    }
}

fn binary_name(binary: &Path) -> String {
    binary
        .file_name()
        .unwrap_or(binary.as_os_str())
        .to_string_lossy()
        .into_owned()
}

fn truncate_output(mut text: String, max: usize) -> String {
    if text.len() <= max {
        return text;
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text.push_str("\n... [output truncated]");
    text
}

/// Find a binary at its configured path, or on `PATH`.
///
/// A configured path is tilde-expanded and used only when it names a file.
pub fn find_binary(name: &str, configured: Option<&str>) -> Option<PathBuf> {
    if let Some(path_str) = configured {
        let path = expand_tilde(path_str);
        if path.is_file() {
            return Some(path);
        }
        debug!(name, path = %path.display(), "configured binary not found, searching PATH");
    }
    which::which(name).ok()
}

/// Like [`find_binary`], failing with `MissingBinary`.
pub fn require_binary(name: &str, configured: Option<&str>) -> Result<PathBuf> {
    find_binary(name, configured).ok_or_else(|| Error::missing_binary(name))
}
