use std::path::PathBuf;

use {
    anyhow::{Context, Result, bail},
    clap::Subcommand,
    reel_config::{
        ReelConfig,
        template::default_config_template,
        validate::{self, Severity},
    },
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (file, env overrides and defaults) as TOML.
    Show,
    /// Validate the configuration file and report errors/warnings.
    Validate {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Print the path of the config file in use (or where one would be created).
    Path,
    /// Write a documented default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
        /// Destination (default: the user config directory).
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

pub fn handle_config(action: ConfigAction, config: &ReelConfig) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let rendered = toml::to_string_pretty(config).context("failed to render config")?;
            println!("{rendered}");
            Ok(())
        },
        ConfigAction::Validate { verbose } => check(verbose),
        ConfigAction::Path => {
            println!("{}", reel_config::find_or_default_config_path().display());
            Ok(())
        },
        ConfigAction::Init { force, path } => {
            let path = path.unwrap_or_else(|| {
                reel_config::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("reel.toml")
            });
            write_template(&path, force)?;
            eprintln!("Wrote {}", path.display());
            Ok(())
        },
    }
}

fn write_template(path: &std::path::Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, default_config_template())
        .with_context(|| format!("failed to write {}", path.display()))
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(verbose: bool) -> Result<()> {
    let result = validate::validate(None);

    if let Some(ref path) = result.config_path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults.\n");
    }

    let mut shown = 0;
    for d in &result.diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
            Severity::Info => (CYAN, "info"),
        };

        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{label}{RESET} {}", d.message);
        } else {
            eprintln!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message);
        }
        shown += 1;
    }

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_loadable_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/reel.toml");
        write_template(&path, false).unwrap();
        let config = reel_config::load_config(&path).unwrap();
        assert_eq!(config.youtube_dl.output_dir, "~/downloads");
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reel.toml");
        std::fs::write(&path, "[metrics]\nenabled = true\n").unwrap();

        let err = write_template(&path, false).unwrap_err();
        assert!(err.to_string().contains("already exists"));

        write_template(&path, true).unwrap();
        assert!(!reel_config::load_config(&path).unwrap().metrics.enabled);
    }

    #[test]
    fn effective_config_renders_as_toml() {
        let rendered = toml::to_string_pretty(&ReelConfig::default()).unwrap();
        assert!(rendered.contains("[youtube_dl]"));
        assert!(rendered.contains("output_dir = \"~/downloads\""));
    }
}
