//! The `boks-ctl` configuration file.
//!
//! One TOML file holds the tool's own settings under `[general]` and the
//! [`SessionConfig`] used for replays and battery classification under
//! `[session]`:
//!
//! ```toml
//! [general]
//! log_level = "debug"
//!
//! [session]
//! chemistry = "lsh14"
//! auto_request_logs = false
//! ```
//!
//! Leave `chemistry` out to infer it from the firmware revision.  Every key
//! is optional and an absent file means defaults.
//!
//! Without `--config` the file is `config.toml` in the user config directory
//! (`%APPDATA%\Boks`, `~/Library/Application Support/Boks`, or
//! `$XDG_CONFIG_HOME/boks`).

use std::path::{Path, PathBuf};

use boks_session::SessionConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File name inside the config directory.
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `--config` was given and the user config directory is unknown.
    #[error("no user config directory on this system; pass --config")]
    NoConfigDir,

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot serialise config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Schema ────────────────────────────────────────────────────────────────────

/// Everything stored in the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// Tracing filter used when `RUST_LOG` is unset (`"info"`, `"boks_session=debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── File access ───────────────────────────────────────────────────────────────

/// `config.toml` in the user config directory.
///
/// # Errors
///
/// [`ConfigError::NoConfigDir`] when the environment names no such directory.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    user_config_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .ok_or(ConfigError::NoConfigDir)
}

/// Reads the config at `path`; a missing file yields the defaults.
///
/// # Errors
///
/// [`ConfigError::Read`] for I/O failures other than "not found", and
/// [`ConfigError::Parse`] for invalid TOML or values.
pub fn load(path: &Path) -> Result<AppConfig, ConfigError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(AppConfig::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `config` to `path`, creating missing parent directories.
///
/// # Errors
///
/// [`ConfigError::Write`] for I/O failures, [`ConfigError::Serialize`] if the
/// config cannot be rendered.
pub fn save(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    let text = toml::to_string_pretty(config)?;
    let write_error = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(write_error)?;
    }
    std::fs::write(path, text).map_err(write_error)
}

fn user_config_dir() -> Option<PathBuf> {
    let home = || std::env::var_os("HOME").map(PathBuf::from);
    if cfg!(target_os = "windows") {
        std::env::var_os("APPDATA").map(|dir| PathBuf::from(dir).join("Boks"))
    } else if cfg!(target_os = "macos") {
        home().map(|h| h.join("Library").join("Application Support").join("Boks"))
    } else {
        std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| home().map(|h| h.join(".config")))
            .map(|base| base.join("boks"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use boks_core::BatteryChemistry;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("boks-ctl-test-{}", uuid::Uuid::new_v4()))
            .join(CONFIG_FILE_NAME)
    }

    #[test]
    fn test_default_log_level_is_info() {
        assert_eq!(AppConfig::default().general.log_level, "info");
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("parse");

        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.session.chemistry, None);
    }

    #[test]
    fn test_partial_session_table_keeps_other_defaults() {
        // Arrange
        let text = "[session]\nchemistry = \"lsh14\"\n";

        // Act
        let cfg: AppConfig = toml::from_str(text).expect("parse");

        // Assert
        assert_eq!(cfg.session.chemistry, Some(BatteryChemistry::Lsh14));
        assert!(cfg.session.auto_request_logs);
        assert_eq!(cfg.session.event_capacity, 256);
        assert_eq!(cfg.general.log_level, "info");
    }

    #[test]
    fn test_default_path_is_config_toml_in_app_dir() {
        // Only meaningful where the environment names a config directory
        if let Ok(path) = default_config_path() {
            assert_eq!(path.file_name().and_then(|n| n.to_str()), Some(CONFIG_FILE_NAME));
            let dir = path.parent().and_then(Path::file_name).and_then(|n| n.to_str());
            assert!(matches!(dir, Some("boks") | Some("Boks")), "got {path:?}");
        }
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let path = scratch_path();

        let cfg = load(&path).expect("load");

        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        // Arrange
        let path = scratch_path();
        let mut cfg = AppConfig::default();
        cfg.general.log_level = "boks_session=debug".to_string();
        cfg.session.chemistry = Some(BatteryChemistry::Lsh14);
        cfg.session.wipe_step_delay_ms = 10;

        // Act
        save(&path, &cfg).expect("save");
        let loaded = load(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_load_reports_parse_error_with_path() {
        // Arrange
        let path = scratch_path();
        let dir = path.parent().expect("parent").to_path_buf();
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(&path, "[session]\nchemistry = \"lead-acid\"\n").expect("write");

        // Act
        let result = load(&path);

        // Assert
        match result {
            Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected a parse error, got {other:?}"),
        }
        let _ = std::fs::remove_dir_all(dir);
    }
}
