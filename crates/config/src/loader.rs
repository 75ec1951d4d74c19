use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use {
    reel_common::{Context, Error, Result},
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::ReelConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["reel.toml", "reel.yaml", "reel.yml", "reel.json"];

static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Override the user-global config directory (e.g. from `--config-dir`).
pub fn set_config_dir(path: PathBuf) {
    *CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner()) = Some(path);
}

pub fn clear_config_dir() {
    *CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner()) = None;
}

/// Returns the user-global config directory (`~/.config/reel/`), honouring
/// [`set_config_dir`].
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
    {
        return Some(dir);
    }
    directories::ProjectDirs::from("", "", "reel").map(|d| d.config_dir().to_path_buf())
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<ReelConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply env overrides.
///
/// Search order:
/// 1. `./reel.{toml,yaml,yml,json}` (project-local)
/// 2. `<config dir>/reel.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `ReelConfig::default()` if no file is found or it fails to
/// parse.
pub fn discover_and_load() -> ReelConfig {
    let mut config = match find_config_file() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                ReelConfig::default()
            })
        },
        None => {
            debug!("no config file found, using defaults");
            ReelConfig::default()
        },
    };
    apply_env_overrides(&mut config);
    config
}

/// Apply `REEL_*` environment overrides on top of a loaded config.
pub fn apply_env_overrides(config: &mut ReelConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut ReelConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(dir) = lookup("REEL_OUTPUT_DIR").filter(|v| !v.is_empty()) {
        config.youtube_dl.output_dir = dir;
    }
    if let Some(raw) = lookup("REEL_AUDIO_ONLY") {
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => config.youtube_dl.audio_only = true,
            "0" | "false" | "no" => config.youtube_dl.audio_only = false,
            other => warn!(value = other, "ignoring invalid REEL_AUDIO_ONLY"),
        }
    }
    if let Some(file) = lookup("REEL_COOKIES_FILE").filter(|v| !v.is_empty()) {
        config.youtube_dl.cookies_file = Some(file);
    }
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    find_config_file().unwrap_or_else(|| {
        config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reel.toml")
    })
}

fn parse_config(raw: &str, path: &Path) -> Result<ReelConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse("toml", e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse("yaml", e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse("json", e)),
        _ => Err(Error::message(format!("unsupported config format: .{ext}"))),
    }
}
