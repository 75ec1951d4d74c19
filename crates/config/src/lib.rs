//! Configuration loading, validation and env substitution.
//!
//! Config files: `reel.toml`, `reel.yaml`, `reel.yml` or `reel.json`,
//! searched in `./` then `~/.config/reel/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod template;
pub mod validate;

pub use {
    loader::{
        apply_env_overrides, clear_config_dir, config_dir, discover_and_load, find_config_file,
        find_or_default_config_path, load_config, set_config_dir,
    },
    schema::{
        BinariesConfig, HooksConfig, MetricsConfig, ReelConfig, ShellHookConfigEntry,
        YoutubeDlConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult},
};
