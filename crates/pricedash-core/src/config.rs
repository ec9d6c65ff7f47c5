// Configuration loading and parsing (pricedash.toml).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::analyzer::DEFAULT_OVERPRICED_RATIO;
use crate::store::DEFAULT_UNDO_CAPACITY;

/// File name looked up in `config/` and in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "pricedash.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

/// Every section is optional; omitted values fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pricing: PricingConfig,
    pub undo: UndoConfig,
    pub export: ExportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Multiple of the cheapest competitor total above which a listing is
    /// flagged overpriced and a reduction is suggested.
    pub overpriced_ratio: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            overpriced_ratio: DEFAULT_OVERPRICED_RATIO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UndoConfig {
    /// Deleted competitor offers remembered for undo.
    pub capacity: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        UndoConfig {
            capacity: DEFAULT_UNDO_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Default destination for `export` without an explicit path.
    pub path: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            path: "all_listings.csv".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: String,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            directory: "logs".into(),
            filter: "pricedash=info,pricedash_core=info,warn".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Parse and validate a config file at `path`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    let config = parse_config(&text, path)?;
    validate(&config)?;
    Ok(config)
}

/// Pick the config file to load.
///
/// An explicit path always wins. Otherwise `config/pricedash.toml` under
/// `base_dir`, then the platform config directory. `None` means defaults.
pub fn resolve_config_path(explicit: Option<&Path>, base_dir: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = base_dir.join("config").join(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    platform_config_path().filter(|p| p.is_file())
}

/// Convenience wrapper: resolves relative to the current working directory
/// and falls back to defaults when no file is found. Returns the path that
/// was loaded, if any.
pub fn load_config(explicit: Option<&Path>) -> Result<(Config, Option<PathBuf>), ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    match resolve_config_path(explicit, &cwd) {
        Some(path) => {
            let config = load_config_from(&path)?;
            Ok((config, Some(path)))
        }
        None => Ok((Config::default(), None)),
    }
}

/// `<platform config dir>/pricedash.toml`, e.g. `~/.config/pricedash/` on
/// Linux.
pub fn platform_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "pricedash")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let ratio = config.pricing.overpriced_ratio;
    if !ratio.is_finite() || ratio < 1.0 {
        return Err(ConfigError::ValidationError {
            field: "pricing.overpriced_ratio".into(),
            message: format!("must be a finite number >= 1.0, got {ratio}"),
        });
    }

    if config.undo.capacity == 0 {
        return Err(ConfigError::ValidationError {
            field: "undo.capacity".into(),
            message: "must be > 0".into(),
        });
    }

    if config.export.path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "export.path".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_tmp(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE_NAME);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
        assert_eq!(config.pricing.overpriced_ratio, 1.1);
        assert_eq!(config.undo.capacity, 50);
        assert_eq!(config.export.path, "all_listings.csv");
    }

    #[test]
    fn load_full_file() {
        let path = write_tmp(
            "pricedash_config_full",
            r#"
[pricing]
overpriced_ratio = 1.25

[undo]
capacity = 5

[export]
path = "out.csv"

[logging]
directory = "/tmp/pd-logs"
filter = "debug"
"#,
        );
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.pricing.overpriced_ratio, 1.25);
        assert_eq!(config.undo.capacity, 5);
        assert_eq!(config.export.path, "out.csv");
        assert_eq!(config.logging.directory, "/tmp/pd-logs");
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let path = write_tmp(
            "pricedash_config_partial",
            "[pricing]\noverpriced_ratio = 1.5\n",
        );
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.pricing.overpriced_ratio, 1.5);
        assert_eq!(config.undo, UndoConfig::default());
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn ratio_below_one_rejected() {
        let path = write_tmp(
            "pricedash_config_bad_ratio",
            "[pricing]\noverpriced_ratio = 0.9\n",
        );
        match load_config_from(&path) {
            Err(ConfigError::ValidationError { field, .. }) => {
                assert_eq!(field, "pricing.overpriced_ratio")
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn zero_undo_capacity_rejected() {
        let path = write_tmp("pricedash_config_zero_undo", "[undo]\ncapacity = 0\n");
        assert!(matches!(
            load_config_from(&path),
            Err(ConfigError::ValidationError { ref field, .. }) if field == "undo.capacity"
        ));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let path = write_tmp("pricedash_config_malformed", "[pricing\noverpriced_ratio = ");
        assert!(matches!(
            load_config_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn missing_explicit_file_is_not_found() {
        let missing = std::env::temp_dir().join("pricedash_no_such_dir/pricedash.toml");
        assert!(matches!(
            load_config_from(&missing),
            Err(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn resolve_prefers_explicit_then_local() {
        let base = std::env::temp_dir().join("pricedash_config_resolve");
        let config_dir = base.join("config");
        fs::create_dir_all(&config_dir).unwrap();
        let local = config_dir.join(CONFIG_FILE_NAME);
        fs::write(&local, "").unwrap();

        let explicit = PathBuf::from("/elsewhere/custom.toml");
        assert_eq!(
            resolve_config_path(Some(explicit.as_path()), &base),
            Some(explicit.clone())
        );
        assert_eq!(resolve_config_path(None, &base), Some(local));
    }
}
