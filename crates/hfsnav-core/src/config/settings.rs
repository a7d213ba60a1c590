//! Application configuration loaded from a TOML file.
//!
//! The default configuration matches the values shown in `config/default.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::TransferMode;
use crate::error::{CoreError, CoreResult};
use crate::transfer::orchestrator::{DEFAULT_COPY_PREFIX, DEFAULT_DRAG_PREFIX};

/// Top-level application configuration.
///
/// All fields have sensible defaults so hfsnav works without a config file.
/// Call [`Config::load`] to read from a TOML path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub staging: StagingConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Loads configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::HostNotFound`] if the file does not exist.
    /// - [`CoreError::Io`] if the file cannot be read.
    /// - [`CoreError::ConfigParse`] if the TOML is malformed.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CoreError::HostNotFound(path.to_path_buf()),
            _ => CoreError::Io(e),
        })?;
        toml::from_str(&content).map_err(|e| CoreError::ConfigParse(e.to_string()))
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> CoreResult<Self> {
        match Self::load(path) {
            Err(CoreError::HostNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    /// `$HOME/.config/hfsnav/config.toml`.
    pub fn default_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(".config")
            .join("hfsnav")
            .join("config.toml")
    }
}

/// Transfer and confirmation preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub transfer_mode: TransferMode,
    #[serde(default = "default_true")]
    pub confirm_delete: bool,
    #[serde(default = "default_true")]
    pub confirm_replace: bool,
    #[serde(default = "default_true")]
    pub open_writable: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            transfer_mode: TransferMode::default(),
            confirm_delete: true,
            confirm_replace: true,
            open_writable: true,
        }
    }
}

/// Prefixes for the temporary host directories used by copies and drags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingConfig {
    #[serde(default = "default_copy_prefix")]
    pub copy_prefix: String,
    #[serde(default = "default_drag_prefix")]
    pub drag_prefix: String,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            copy_prefix: default_copy_prefix(),
            drag_prefix: default_drag_prefix(),
        }
    }
}

/// Log output settings for frontends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_copy_prefix() -> String {
    DEFAULT_COPY_PREFIX.to_string()
}

fn default_drag_prefix() -> String {
    DEFAULT_DRAG_PREFIX.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("/tmp/hfsnav.log")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_config_general() {
        let config = Config::default();

        assert_eq!(config.general.transfer_mode, TransferMode::Auto);
        assert!(config.general.confirm_delete);
        assert!(config.general.confirm_replace);
        assert!(config.general.open_writable);
    }

    #[test]
    fn default_config_staging_and_log() {
        let config = Config::default();

        assert_eq!(config.staging.copy_prefix, "hfsnav-copy");
        assert_eq!(config.staging.drag_prefix, "hfsnav-drag");
        assert_eq!(config.log.level, "info");
        assert_eq!(config.log.file, PathBuf::from("/tmp/hfsnav.log"));
    }

    #[test]
    fn shipped_default_file_matches_defaults() {
        let parsed: Config = toml::from_str(include_str!("../../../../config/default.toml")).unwrap();

        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn load_full_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            r#"
[general]
transfer_mode = "macbinary"
confirm_delete = false
confirm_replace = false
open_writable = false

[staging]
copy_prefix = "cp"
drag_prefix = "dr"

[log]
level = "debug"
file = "/var/log/hfsnav.log"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.general.transfer_mode, TransferMode::MacBinary);
        assert!(!config.general.confirm_delete);
        assert!(!config.general.confirm_replace);
        assert!(!config.general.open_writable);
        assert_eq!(config.staging.copy_prefix, "cp");
        assert_eq!(config.staging.drag_prefix, "dr");
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.file, PathBuf::from("/var/log/hfsnav.log"));
    }

    #[test]
    fn load_partial_toml_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            r#"
[general]
transfer_mode = "text"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.general.transfer_mode, TransferMode::Text);
        assert!(config.general.confirm_delete);
        assert_eq!(config.staging, StagingConfig::default());
        assert_eq!(config.log, LogConfig::default());
    }

    #[test]
    fn load_empty_toml_uses_all_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "").unwrap();

        assert_eq!(Config::load(&path).unwrap(), Config::default());
    }

    #[test]
    fn load_nonexistent_returns_host_not_found() {
        let result = Config::load(Path::new("/nonexistent/hfsnav/config.toml"));

        assert!(matches!(result, Err(CoreError::HostNotFound(_))));
    }

    #[test]
    fn load_or_default_tolerates_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/hfsnav/config.toml")).unwrap();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_invalid_toml_returns_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[general\ntransfer_mode = ").unwrap();

        assert!(matches!(Config::load(&path), Err(CoreError::ConfigParse(_))));
    }

    #[test]
    fn unknown_transfer_mode_is_a_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[general]\ntransfer_mode = \"zip\"\n").unwrap();

        assert!(matches!(Config::load(&path), Err(CoreError::ConfigParse(_))));
    }

    #[test]
    fn default_path_ends_with_config_toml() {
        let path = Config::default_path();

        assert!(path.ends_with(".config/hfsnav/config.toml"));
    }
}
