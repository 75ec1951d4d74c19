//! `reel doctor`: config validation, external binaries and output directory.
//!
//! Prints one `[ok]`, `[warn]`, `[fail]` or `[info]` line per check and exits
//! non-zero when any check fails.

use std::{path::Path, time::Duration};

use {
    anyhow::Result,
    reel_config::{
        ReelConfig,
        validate::{self, Severity},
    },
    reel_media::{RunOpts, expand_tilde, find_binary},
};

// ── ANSI helpers ────────────────────────────────────────────────────────────

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Warn,
    Fail,
    Info,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warn => "warn",
            Self::Fail => "fail",
            Self::Info => "info",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Ok => GREEN,
            Self::Warn => YELLOW,
            Self::Fail => RED,
            Self::Info => CYAN,
        }
    }

    fn from_severity(severity: Severity) -> Self {
        match severity {
            Severity::Error => Self::Fail,
            Severity::Warning => Self::Warn,
            Severity::Info => Self::Info,
        }
    }
}

struct Section {
    title: String,
    items: Vec<(Status, String)>,
}

impl Section {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            items: Vec::new(),
        }
    }

    fn push(&mut self, status: Status, message: impl Into<String>) {
        self.items.push((status, message.into()));
    }
}

fn print_report(sections: &[Section]) -> (usize, usize) {
    let mut errors = 0usize;
    let mut warnings = 0usize;

    for section in sections {
        eprintln!("{BOLD}{}{RESET}", section.title);
        for (status, message) in &section.items {
            eprintln!("  [{}{}{RESET}]  {message}", status.color(), status.label());
            match status {
                Status::Fail => errors += 1,
                Status::Warn => warnings += 1,
                _ => {},
            }
        }
        eprintln!();
    }

    (errors, warnings)
}

// ── Entry point ─────────────────────────────────────────────────────────────

pub async fn handle_doctor(config: &ReelConfig) -> Result<()> {
    eprintln!("{BOLD}reel doctor{RESET}");
    eprintln!("{BOLD}==========={RESET}\n");

    let sections = vec![
        check_config(),
        check_binaries(config).await,
        check_output(config),
    ];

    let (errors, warnings) = print_report(&sections);
    eprintln!("{BOLD}Summary:{RESET} {errors} error(s), {warnings} warning(s)");

    if errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

// ── Checks ──────────────────────────────────────────────────────────────────

fn check_config() -> Section {
    let result = validate::validate(None);
    let label = result
        .config_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults".into());
    let mut section = Section::new(format!("Config ({label})"));

    if result
        .diagnostics
        .iter()
        .any(|d| d.category == "syntax" && d.severity == Severity::Error)
    {
        for d in result.diagnostics.iter().filter(|d| d.category == "syntax") {
            section.push(Status::Fail, format!("syntax: {}", d.message));
        }
        return section;
    }
    section.push(Status::Ok, "syntax valid");

    for d in &result.diagnostics {
        let message = if d.path.is_empty() {
            d.message.clone()
        } else {
            format!("{}: {}", d.path, d.message)
        };
        section.push(Status::from_severity(d.severity), message);
    }
    if result.diagnostics.is_empty() {
        section.push(Status::Ok, "no issues");
    }
    section
}

async fn check_binaries(config: &ReelConfig) -> Section {
    let mut section = Section::new("External binaries");
    let binaries = [
        ("yt-dlp", config.binaries.yt_dlp.as_deref(), "--version"),
        ("ffmpeg", config.binaries.ffmpeg.as_deref(), "-version"),
        ("ffprobe", config.binaries.ffprobe.as_deref(), "-version"),
    ];

    for (name, configured, version_flag) in binaries {
        let Some(path) = find_binary(name, configured) else {
            section.push(Status::Fail, reel_media::Error::missing_binary(name).to_string());
            continue;
        };
        let opts = RunOpts {
            timeout: Duration::from_secs(10),
            max_output_bytes: 4096,
        };
        match reel_media::process::run(&path, [version_flag], &opts).await {
            Ok(out) if out.success() => {
                let version = out.stdout.lines().next().unwrap_or("").trim().to_string();
                section.push(Status::Ok, format!("{name}: {} ({version})", path.display()));
            },
            Ok(out) => section.push(
                Status::Warn,
                format!("{name}: {} ({})", path.display(), out.failure_reason()),
            ),
            Err(e) => section.push(Status::Fail, format!("{name}: {e}")),
        }
    }
    section
}

fn check_output(config: &ReelConfig) -> Section {
    let mut section = Section::new("Output");
    let dir = expand_tilde(&config.youtube_dl.output_dir);

    if dir.is_dir() {
        section.push(Status::Ok, format!("output directory: {}", dir.display()));
        check_writable(&mut section, &dir);
    } else {
        section.push(
            Status::Info,
            format!("output directory {} will be created on first use", dir.display()),
        );
    }

    match config.youtube_dl.cookies_file.as_deref() {
        Some(file) if expand_tilde(file).is_file() => {
            section.push(Status::Ok, format!("cookies file: {file}"));
        },
        Some(file) => section.push(Status::Warn, format!("cookies file not found: {file}")),
        None => section.push(Status::Info, "no cookies file configured"),
    }

    let mode = if config.youtube_dl.audio_only {
        "audio"
    } else {
        "video"
    };
    section.push(Status::Info, format!("default mode: {mode}"));
    section
}

fn check_writable(section: &mut Section, dir: &Path) {
    let probe = dir.join(".reel-doctor-probe");
    match std::fs::write(&probe, b"probe") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
        },
        Err(e) => section.push(Status::Fail, format!("output directory is not writable: {e}")),
    }
}
