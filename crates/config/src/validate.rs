//! Configuration validation.
//!
//! Checks TOML syntax, flags unknown or misspelled fields, surfaces type
//! errors and warns about settings that will not behave as the user expects.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::{env_subst::substitute_env, loader::find_config_file, schema::ReelConfig};

/// Hook event names accepted in `[[hooks.hooks]] events`.
pub const KNOWN_HOOK_EVENTS: &[&str] = &["BeforeToolCall", "AfterToolCall", "ToolError"];

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "file-ref", "hooks",
    /// "timeouts"
    pub category: &'static str,
    /// Dotted path, e.g. "youtube_dl.output_dir"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    /// Dynamic keys (e.g. `metrics.labels`, hook `env`).
    Map,
    Array(Box<KnownKeys>),
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Array, Leaf, Map, Struct};

    Struct(HashMap::from([
        (
            "youtube_dl",
            Struct(HashMap::from([
                ("output_dir", Leaf),
                ("audio_only", Leaf),
                ("cookies_file", Leaf),
                ("audio_format", Leaf),
                ("audio_quality", Leaf),
                ("download_timeout_secs", Leaf),
                ("probe_timeout_secs", Leaf),
                ("screenshot_timeout_secs", Leaf),
            ])),
        ),
        (
            "binaries",
            Struct(HashMap::from([
                ("yt_dlp", Leaf),
                ("ffmpeg", Leaf),
                ("ffprobe", Leaf),
            ])),
        ),
        (
            "metrics",
            Struct(HashMap::from([("enabled", Leaf), ("labels", Map)])),
        ),
        (
            "hooks",
            Struct(HashMap::from([(
                "hooks",
                Array(Box::new(Struct(HashMap::from([
                    ("name", Leaf),
                    ("command", Leaf),
                    ("events", Leaf),
                    ("timeout", Leaf),
                    ("env", Map),
                ])))),
            )])),
        ),
    ]))
}

// ── Suggestions ─────────────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| *d <= max_distance)
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

// ── Entry points ────────────────────────────────────────────────────────────

/// Validate the config at `path`, or the discovered config when `None`.
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let Some(path) = path.map(Path::to_path_buf).or_else(find_config_file) else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found, defaults apply".into(),
            }],
            config_path: None,
        };
    };

    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) => {
            return ValidationResult {
                diagnostics: vec![Diagnostic {
                    severity: Severity::Error,
                    category: "file-ref",
                    path: String::new(),
                    message: format!("cannot read {}: {e}", path.display()),
                }],
                config_path: Some(path),
            };
        },
    };

    let mut result = validate_toml_str(&substitute_env(&raw));
    result.config_path = Some(path);
    result
}

/// Validate a TOML document.
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let toml_value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("TOML syntax error: {e}"),
            });
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    check_unknown_fields(&toml_value, &build_schema_map(), "", &mut diagnostics);

    match toml::from_str::<ReelConfig>(toml_str) {
        Ok(config) => check_semantic_warnings(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn check_unknown_fields(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match (value, schema) {
        (toml::Value::Table(table), KnownKeys::Struct(fields)) => {
            let known: Vec<&str> = fields.keys().copied().collect();
            for (key, child) in table {
                let path = join_path(prefix, key);
                if let Some(child_schema) = fields.get(key.as_str()) {
                    check_unknown_fields(child, child_schema, &path, diagnostics);
                    continue;
                }
                let message = match suggest(key, &known, 3) {
                    Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                    None => "unknown field".to_string(),
                };
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    category: "unknown-field",
                    path,
                    message,
                });
            }
        },
        (toml::Value::Array(items), KnownKeys::Array(item_schema)) => {
            for (i, item) in items.iter().enumerate() {
                check_unknown_fields(item, item_schema, &format!("{prefix}[{i}]"), diagnostics);
            }
        },
        // Leaf, dynamic map or type mismatch. Type errors surface later.
        _ => {},
    }
}

fn check_semantic_warnings(config: &ReelConfig, diagnostics: &mut Vec<Diagnostic>) {
    let yt = &config.youtube_dl;

    if yt.output_dir.trim().is_empty() {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "file-ref",
            path: "youtube_dl.output_dir".into(),
            message: "output directory must not be empty".into(),
        });
    }

    if let Some(cookies) = yt.cookies_file.as_deref() {
        let expanded = expand_home(cookies);
        if !expanded.is_file() {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "file-ref",
                path: "youtube_dl.cookies_file".into(),
                message: format!(
                    "cookies file {} does not exist and will be ignored",
                    expanded.display()
                ),
            });
        }
    }

    for (key, secs) in [
        ("download_timeout_secs", yt.download_timeout_secs),
        ("probe_timeout_secs", yt.probe_timeout_secs),
        ("screenshot_timeout_secs", yt.screenshot_timeout_secs),
    ] {
        if secs == 0 {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "timeouts",
                path: format!("youtube_dl.{key}"),
                message: "a zero timeout makes every invocation fail immediately".into(),
            });
        }
    }

    for (name, path) in [
        ("yt_dlp", config.binaries.yt_dlp.as_deref()),
        ("ffmpeg", config.binaries.ffmpeg.as_deref()),
        ("ffprobe", config.binaries.ffprobe.as_deref()),
    ] {
        if let Some(path) = path
            && !expand_home(path).is_file()
        {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "file-ref",
                path: format!("binaries.{name}"),
                message: format!("{path} does not exist, falling back to PATH lookup"),
            });
        }
    }

    let hooks = config.hooks.as_ref().map(|h| h.hooks.as_slice()).unwrap_or(&[]);
    for (i, hook) in hooks.iter().enumerate() {
        if hook.command.trim().is_empty() {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "hooks",
                path: format!("hooks.hooks[{i}].command"),
                message: format!("hook '{}' has an empty command", hook.name),
            });
        }
        for event in &hook.events {
            if KNOWN_HOOK_EVENTS.contains(&event.as_str()) {
                continue;
            }
            let message = match suggest(event, KNOWN_HOOK_EVENTS, 4) {
                Some(s) => format!("unknown hook event \"{event}\" (did you mean \"{s}\"?)"),
                None => format!("unknown hook event \"{event}\""),
            };
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                category: "hooks",
                path: format!("hooks.hooks[{i}].events"),
                message,
            });
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("", "", 0)]
    #[case("abc", "", 3)]
    #[case("kitten", "sitting", 3)]
    #[case("audio_only", "audio_onyl", 2)]
    #[case("output_dir", "output_dir", 0)]
    fn levenshtein_distances(#[case] a: &str, #[case] b: &str, #[case] expected: usize) {
        assert_eq!(levenshtein(a, b), expected);
    }

    #[test]
    fn empty_config_is_valid() {
        let result = validate_toml_str("");
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn syntax_error_detected() {
        let result = validate_toml_str("[youtube_dl\n");
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].category, "syntax");
    }

    #[test]
    fn misspelled_field_gets_suggestion() {
        let result = validate_toml_str("[youtube_dl]\naudio_onyl = true\n");
        let diag = result
            .diagnostics
            .iter()
            .find(|d| d.category == "unknown-field")
            .unwrap();
        assert_eq!(diag.path, "youtube_dl.audio_onyl");
        assert!(diag.message.contains("did you mean \"audio_only\""));
    }

    #[test]
    fn unknown_top_level_section() {
        let result = validate_toml_str("[server]\nport = 1\n");
        assert_eq!(result.count(Severity::Error), 1);
        assert_eq!(result.diagnostics[0].path, "server");
    }

    #[test]
    fn type_error_detected() {
        let result = validate_toml_str("[youtube_dl]\naudio_only = \"yes\"\n");
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.category == "type-error")
        );
    }

    #[test]
    fn zero_timeout_warned() {
        let result = validate_toml_str("[youtube_dl]\nprobe_timeout_secs = 0\n");
        assert_eq!(result.count(Severity::Warning), 1);
        assert_eq!(result.diagnostics[0].path, "youtube_dl.probe_timeout_secs");
    }

    #[test]
    fn missing_cookies_file_warned() {
        let result =
            validate_toml_str("[youtube_dl]\ncookies_file = \"/nonexistent/cookies.txt\"\n");
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "youtube_dl.cookies_file" && d.severity == Severity::Warning)
        );
    }

    #[test]
    fn hook_entries_validated() {
        let result = validate_toml_str(
            r#"
[[hooks.hooks]]
name = "audit"
command = ""
events = ["AfterToolCal"]
comand = "typo"
"#,
        );
        let paths: Vec<&str> = result.diagnostics.iter().map(|d| d.path.as_str()).collect();
        assert!(paths.contains(&"hooks.hooks[0].comand"));
        assert!(paths.contains(&"hooks.hooks[0].command"));
        let event = result
            .diagnostics
            .iter()
            .find(|d| d.path == "hooks.hooks[0].events")
            .unwrap();
        assert!(event.message.contains("did you mean \"AfterToolCall\""));
    }

    #[test]
    fn metrics_labels_accept_any_key() {
        let result = validate_toml_str("[metrics]\nenabled = true\n[metrics.labels]\nhost = \"a\"\n");
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn validate_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reel.toml");
        std::fs::write(&path, "[binaries]\nffmpg = \"/usr/bin/ffmpeg\"\n").unwrap();
        let result = validate(Some(&path));
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
        assert!(result.has_errors());
    }
}
