//! Configuration file (`deltamerge.toml`).
//!
//! Defines the typed configuration for merge behaviour, snapshot layout,
//! publication defaults and logging. Command-line flags override these values.

use std::fmt;
use std::path::{Path, PathBuf};

use deltamerge_core::{
    ConflictStyle, MarkerLabels, MergeOptions, PublishMode, ReconcileOptions, WhitespaceRule,
};
use serde::Deserialize;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "deltamerge.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration.
///
/// Missing fields use defaults. Missing file → all defaults (no error).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeltamergeConfig {
    /// Merge and classification settings.
    #[serde(default)]
    pub merge: MergeConfig,

    /// How snapshot trees map onto units.
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Publication defaults.
    #[serde(default)]
    pub publish: PublishConfig,

    /// Logging.
    #[serde(default)]
    pub log: LogConfig,
}

// ---------------------------------------------------------------------------
// MergeConfig
// ---------------------------------------------------------------------------

/// Merge behaviour settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeConfig {
    /// `merge` (two-sided blocks) or `diff3` (adds the before side).
    #[serde(default)]
    pub conflict_style: ConflictStyle,

    /// Whitespace rule for the no-real-change check.
    #[serde(default)]
    pub whitespace: WhitespaceRule,

    /// Label after `<<<<<<<`.
    #[serde(default = "default_target_label")]
    pub target_label: String,

    /// Label after `|||||||` (diff3 style only).
    #[serde(default = "default_before_label")]
    pub before_label: String,

    /// Label after `>>>>>>>`.
    #[serde(default = "default_delta_label")]
    pub delta_label: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            conflict_style: ConflictStyle::default(),
            whitespace: WhitespaceRule::default(),
            target_label: default_target_label(),
            before_label: default_before_label(),
            delta_label: default_delta_label(),
        }
    }
}

fn default_target_label() -> String {
    "target".to_owned()
}

fn default_before_label() -> String {
    "before".to_owned()
}

fn default_delta_label() -> String {
    "delta".to_owned()
}

impl MergeConfig {
    /// Engine options for a run, with an optional style override from the CLI.
    #[must_use]
    pub fn reconcile_options(&self, style_override: Option<ConflictStyle>) -> ReconcileOptions {
        ReconcileOptions {
            merge: MergeOptions {
                style: style_override.unwrap_or(self.conflict_style),
                labels: MarkerLabels {
                    target: self.target_label.clone(),
                    before: self.before_label.clone(),
                    delta: self.delta_label.clone(),
                },
            },
            whitespace: self.whitespace,
        }
    }
}

// ---------------------------------------------------------------------------
// LayoutConfig
// ---------------------------------------------------------------------------

/// Mapping from snapshot trees to units.
///
/// ```toml
/// [layout]
/// include = ["classes/**", "triggers/**"]
/// companion_suffix = "-meta.xml"
/// staging = ".deltamerge/staging"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutConfig {
    /// Glob patterns (relative, `/`-separated) selecting which paths are units.
    #[serde(default = "default_include")]
    pub include: Vec<String>,

    /// Files ending in this suffix ride along with the file named by the
    /// prefix. Empty disables companions.
    #[serde(default = "default_companion_suffix")]
    pub companion_suffix: String,

    /// Where clean final texts are staged.
    #[serde(default = "default_staging")]
    pub staging: PathBuf,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            include: default_include(),
            companion_suffix: default_companion_suffix(),
            staging: default_staging(),
        }
    }
}

fn default_include() -> Vec<String> {
    vec!["**/*".to_owned()]
}

fn default_companion_suffix() -> String {
    "-meta.xml".to_owned()
}

fn default_staging() -> PathBuf {
    PathBuf::from(".deltamerge/staging")
}

// ---------------------------------------------------------------------------
// PublishConfig
// ---------------------------------------------------------------------------

/// Publication defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishConfig {
    /// Mode used when `--mode` is not given.
    #[serde(default)]
    pub mode: PublishMode,
}

// ---------------------------------------------------------------------------
// LogConfig
// ---------------------------------------------------------------------------

/// Log output settings. `RUST_LOG` takes precedence over `level`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Human-readable or JSON lines.
    #[serde(default)]
    pub format: LogFormat,

    /// Default filter directive (`info`, `deltamerge=debug`, ...).
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_owned()
}

/// Log line format on stderr.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Compact human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl DeltamergeConfig {
    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML or unknown fields,
    ///   returns a [`ConfigError`] with line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_all_fields() {
        let cfg = DeltamergeConfig::default();
        assert_eq!(cfg.merge.conflict_style, ConflictStyle::Merge);
        assert_eq!(cfg.merge.whitespace, WhitespaceRule::IgnoreAll);
        assert_eq!(cfg.merge.target_label, "target");
        assert_eq!(cfg.merge.before_label, "before");
        assert_eq!(cfg.merge.delta_label, "delta");
        assert_eq!(cfg.layout.include, vec!["**/*".to_owned()]);
        assert_eq!(cfg.layout.companion_suffix, "-meta.xml");
        assert_eq!(cfg.layout.staging, PathBuf::from(".deltamerge/staging"));
        assert_eq!(cfg.publish.mode, PublishMode::Preview);
        assert_eq!(cfg.log.format, LogFormat::Text);
        assert_eq!(cfg.log.level, "info");
    }

    #[test]
    fn parse_empty_string() {
        let cfg = DeltamergeConfig::parse("").unwrap();
        assert_eq!(cfg, DeltamergeConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let cfg = DeltamergeConfig::parse(
            r#"
[merge]
conflict_style = "diff3"
whitespace = "collapse-runs"
target_label = "org"
before_label = "base"
delta_label = "release"

[layout]
include = ["classes/**", "triggers/*.trigger"]
companion_suffix = ""
staging = "out/stage"

[publish]
mode = "dry-run"

[log]
format = "json"
level = "deltamerge=debug"
"#,
        )
        .unwrap();
        assert_eq!(cfg.merge.conflict_style, ConflictStyle::Diff3);
        assert_eq!(cfg.merge.whitespace, WhitespaceRule::CollapseRuns);
        assert_eq!(cfg.merge.target_label, "org");
        assert_eq!(cfg.layout.include.len(), 2);
        assert!(cfg.layout.companion_suffix.is_empty());
        assert_eq!(cfg.layout.staging, PathBuf::from("out/stage"));
        assert_eq!(cfg.publish.mode, PublishMode::DryRun);
        assert_eq!(cfg.log.format, LogFormat::Json);
        assert_eq!(cfg.log.level, "deltamerge=debug");
    }

    #[test]
    fn parse_partial_config_uses_defaults() {
        let cfg = DeltamergeConfig::parse("[merge]\nconflict_style = \"diff3\"\n").unwrap();
        assert_eq!(cfg.merge.conflict_style, ConflictStyle::Diff3);
        assert_eq!(cfg.merge.delta_label, "delta");
        assert_eq!(cfg.layout, LayoutConfig::default());
    }

    #[test]
    fn parse_rejects_unknown_top_level_field() {
        let err = DeltamergeConfig::parse("[workspace]\nbackend = \"copy\"\n").unwrap_err();
        assert!(err.message.contains("unknown field"), "{}", err.message);
    }

    #[test]
    fn parse_rejects_unknown_nested_field() {
        let err = DeltamergeConfig::parse("[merge]\nstrategy = \"ours\"\n").unwrap_err();
        assert!(err.message.contains("unknown field"), "{}", err.message);
    }

    #[test]
    fn parse_rejects_invalid_whitespace_rule() {
        let err = DeltamergeConfig::parse("[merge]\nwhitespace = \"strict\"\n").unwrap_err();
        assert!(!err.message.is_empty());
    }

    #[test]
    fn parse_includes_line_number_on_error() {
        let err = DeltamergeConfig::parse("[merge]\n\n[publish]\nmode = \"yolo\"\n").unwrap_err();
        assert!(err.message.contains("line 4"), "{}", err.message);
    }

    #[test]
    fn reconcile_options_applies_labels_and_override() {
        let cfg = DeltamergeConfig::parse("[merge]\ntarget_label = \"org\"\n").unwrap();
        let opts = cfg.merge.reconcile_options(Some(ConflictStyle::Diff3));
        assert_eq!(opts.merge.style, ConflictStyle::Diff3);
        assert_eq!(opts.merge.labels.target, "org");
        assert_eq!(opts.whitespace, WhitespaceRule::IgnoreAll);

        let opts = cfg.merge.reconcile_options(None);
        assert_eq!(opts.merge.style, ConflictStyle::Merge);
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let cfg = DeltamergeConfig::load(Path::new("/nonexistent/deltamerge.toml")).unwrap();
        assert_eq!(cfg, DeltamergeConfig::default());
    }

    #[test]
    fn load_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "[publish]\nmode = \"publish\"\n").unwrap();
        let cfg = DeltamergeConfig::load(&path).unwrap();
        assert_eq!(cfg.publish.mode, PublishMode::Publish);
    }

    #[test]
    fn load_invalid_file_shows_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not valid [[[toml").unwrap();
        let err = DeltamergeConfig::load(&path).unwrap_err();
        assert_eq!(err.path.as_deref(), Some(path.as_path()));
        assert!(err.to_string().starts_with(&path.display().to_string()));
    }

    #[test]
    fn config_error_display_without_path() {
        let err = ConfigError {
            path: None,
            message: "line 1: bad".to_owned(),
        };
        assert_eq!(err.to_string(), "config error: line 1: bad");
    }
}
