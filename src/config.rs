//! Configuration management
//!
//! Config file is `dm-bridge.toml`, looked up in the working directory and
//! then next to the executable. Every field is optional.

use crate::codec::ProtocolVariant;
use crate::constants::{
    DEFAULT_CACHE_FILE, DEFAULT_CHUNK_SIZE, DEFAULT_CONFIG_FILE, DEFAULT_FRAME_PART_SIZE,
    DEFAULT_PANEL_SIZE, DEFAULT_RESPONSE_TIMEOUT_MS, DEFAULT_WRITE_PAUSE_MS,
};
use crate::error::{Error, Result};
use crate::session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

// =============================================================================
// Application Configuration
// =============================================================================

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Framing variant: "basic" or "extended"
    pub protocol: ProtocolVariant,

    /// Maximum bytes per transport write
    pub chunk_size: usize,

    /// Pause between chunk writes (0 = none)
    pub write_pause_ms: u64,

    /// Deadline for correlated requests
    pub response_timeout_ms: u64,

    /// Maximum bytes per animation frame part
    pub frame_part_size: usize,

    /// Panel side length in pixels
    pub panel_size: usize,

    /// Write characteristic UUID (unset = first writable)
    pub write_characteristic: Option<String>,

    /// Notify characteristic UUID (unset = first notifying)
    pub notify_characteristic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Characteristic cache file
    pub path: PathBuf,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            protocol: ProtocolVariant::Basic,
            chunk_size: DEFAULT_CHUNK_SIZE,
            write_pause_ms: DEFAULT_WRITE_PAUSE_MS,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            frame_part_size: DEFAULT_FRAME_PART_SIZE,
            panel_size: DEFAULT_PANEL_SIZE,
            write_characteristic: None,
            notify_characteristic: None,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CACHE_FILE),
        }
    }
}

impl Config {
    /// Reject values the session cannot run with
    pub fn validate(&self) -> Result<()> {
        let s = &self.session;
        if s.chunk_size == 0 {
            return Err(Error::ConfigValidation {
                field: "session.chunk_size",
                reason: "must be greater than 0".into(),
            });
        }
        if s.frame_part_size == 0 || s.frame_part_size > u16::MAX as usize {
            return Err(Error::ConfigValidation {
                field: "session.frame_part_size",
                reason: format!("must be within 1..={}", u16::MAX),
            });
        }
        if s.panel_size == 0 {
            return Err(Error::ConfigValidation {
                field: "session.panel_size",
                reason: "must be greater than 0".into(),
            });
        }
        if s.response_timeout_ms == 0 {
            return Err(Error::ConfigValidation {
                field: "session.response_timeout_ms",
                reason: "must be greater than 0".into(),
            });
        }
        for (field, uuid) in [
            ("session.write_characteristic", &s.write_characteristic),
            ("session.notify_characteristic", &s.notify_characteristic),
        ] {
            if uuid.as_deref().is_some_and(|u| u.trim().is_empty()) {
                return Err(Error::ConfigValidation {
                    field,
                    reason: "must not be empty when set".into(),
                });
            }
        }
        Ok(())
    }

    /// Session parameters described by this config
    pub fn to_session_config(&self) -> SessionConfig {
        let s = &self.session;
        SessionConfig {
            protocol: s.protocol,
            chunk_size: s.chunk_size,
            write_pause: Duration::from_millis(s.write_pause_ms),
            response_timeout: Duration::from_millis(s.response_timeout_ms),
            frame_part_size: s.frame_part_size,
            panel_size: s.panel_size,
            write_characteristic: s.write_characteristic.clone(),
            notify_characteristic: s.notify_characteristic.clone(),
        }
    }
}

/// Get the config file path
///
/// Prefers the working directory, then the executable's directory.
/// Returns the working-directory path when neither exists.
pub fn config_path() -> PathBuf {
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return local;
    }

    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(DEFAULT_CONFIG_FILE)));
    match beside_exe {
        Some(path) if path.exists() => path,
        _ => local,
    }
}

/// Load and validate config, returning every failure
pub fn load_strict(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: Config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

/// Load config, falling back to defaults with a warning
///
/// A missing file is not an error.
pub fn load(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }
    match load_strict(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}, using defaults", e);
            Config::default()
        }
    }
}

/// Save config to file
pub fn save(config: &Config, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config).map_err(|e| Error::ConfigValidation {
        field: "config",
        reason: e.to_string(),
    })?;
    fs::write(path, content).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dm-bridge-{}-{}.toml", name, std::process::id()))
    }

    // =========================================================================
    // Default values tests
    // =========================================================================

    #[test]
    fn test_default_session_settings() {
        let settings = SessionSettings::default();

        assert_eq!(settings.protocol, ProtocolVariant::Basic);
        assert_eq!(settings.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(settings.write_pause_ms, DEFAULT_WRITE_PAUSE_MS);
        assert_eq!(settings.response_timeout_ms, DEFAULT_RESPONSE_TIMEOUT_MS);
        assert_eq!(settings.frame_part_size, DEFAULT_FRAME_PART_SIZE);
        assert_eq!(settings.panel_size, 16);
        assert_eq!(settings.write_characteristic, None);
    }

    #[test]
    fn test_defaults_match_session_defaults() {
        assert_eq!(Config::default().to_session_config(), SessionConfig::default());
        assert!(Config::default().validate().is_ok());
    }

    // =========================================================================
    // Parsing tests
    // =========================================================================

    #[test]
    fn test_config_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_partial_session_section() {
        let partial_toml = r#"
[session]
protocol = "extended"
chunk_size = 20
write_characteristic = "0000fff2-0000-1000-8000-00805f9b34fb"
"#;

        let config: Config = toml::from_str(partial_toml).unwrap();

        assert_eq!(config.session.protocol, ProtocolVariant::Extended);
        assert_eq!(config.session.chunk_size, 20);
        assert_eq!(
            config.session.write_characteristic.as_deref(),
            Some("0000fff2-0000-1000-8000-00805f9b34fb")
        );
        // Rest should be defaults
        assert_eq!(config.session.response_timeout_ms, DEFAULT_RESPONSE_TIMEOUT_MS);
        assert_eq!(config.cache, CacheSettings::default());
    }

    #[test]
    fn test_to_session_config_converts_durations() {
        let config: Config = toml::from_str(
            "[session]\nwrite_pause_ms = 0\nresponse_timeout_ms = 1000\n",
        )
        .unwrap();
        let session = config.to_session_config();

        assert_eq!(session.write_pause, Duration::ZERO);
        assert_eq!(session.response_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_unknown_protocol_rejected() {
        let result: std::result::Result<Config, _> =
            toml::from_str("[session]\nprotocol = \"morse\"\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn test_validate_rejects_zero_chunk_size() {
        let mut config = Config::default();
        config.session.chunk_size = 0;

        match config.validate() {
            Err(Error::ConfigValidation { field, .. }) => {
                assert_eq!(field, "session.chunk_size")
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_oversized_part() {
        let mut config = Config::default();
        config.session.frame_part_size = 70_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_characteristic() {
        let mut config = Config::default();
        config.session.notify_characteristic = Some("  ".into());
        assert!(matches!(
            config.validate(),
            Err(Error::ConfigValidation {
                field: "session.notify_characteristic",
                ..
            })
        ));
    }

    // =========================================================================
    // File tests
    // =========================================================================

    #[test]
    fn test_save_load_roundtrip() {
        let path = temp_path("roundtrip");
        let mut config = Config::default();
        config.session.protocol = ProtocolVariant::Extended;
        config.session.panel_size = 32;
        config.cache.path = PathBuf::from("/tmp/devices.json");

        save(&config, &path).unwrap();
        let restored = load_strict(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(restored, config);
    }

    #[test]
    fn test_load_falls_back_on_invalid_file() {
        let path = temp_path("invalid");
        fs::write(&path, "[session]\nchunk_size = 0\n").unwrap();

        assert!(matches!(
            load_strict(&path),
            Err(Error::ConfigValidation { .. })
        ));
        assert_eq!(load(&path), Config::default());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing_file() {
        let path = temp_path("missing");
        assert_eq!(load(&path), Config::default());
        assert!(matches!(load_strict(&path), Err(Error::Io { .. })));
    }
}
