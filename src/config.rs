//! Configuration file support for maskpick.
//!
//! This module provides serialization and deserialization of the backend
//! endpoints, upload limits and user preferences. Native builds keep the file
//! in the user's config directory; the browser build keeps it in localStorage.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_DOWNLOAD_NAME, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_TIMEOUT_SECS, DEFAULT_TOLERANCE,
    DEFAULT_VIEWPORT_MARGIN,
};
use crate::prompt::Endpoint;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application configuration that can be exported and imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Application name (for identification)
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Segmentation service location
    #[serde(default)]
    pub backend: BackendConfig,

    /// Upload limits
    #[serde(default)]
    pub limits: Limits,

    /// User preferences
    #[serde(default)]
    pub preferences: UserPreferences,
}

fn default_app_name() -> String {
    "maskpick".to_string()
}

/// Where and how to reach the segmentation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Scheme and host, without a trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Route for point prompts
    #[serde(default = "default_point_path")]
    pub point_path: String,

    /// Route for box prompts
    #[serde(default = "default_box_path")]
    pub box_path: String,

    /// Route for color-sample prompts
    #[serde(default = "default_color_path")]
    pub color_path: String,

    /// Whole-request timeout in seconds. Not enforced in the browser.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://maskback.up.railway.app".to_string()
}

fn default_point_path() -> String {
    "/segment_point".to_string()
}

fn default_box_path() -> String {
    "/segment_box".to_string()
}

fn default_color_path() -> String {
    "/segment_color".to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            point_path: default_point_path(),
            box_path: default_box_path(),
            color_path: default_color_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendConfig {
    /// Full URL of the route serving `endpoint`.
    pub fn url_for(&self, endpoint: Endpoint) -> String {
        let path = match endpoint {
            Endpoint::Point => &self.point_path,
            Endpoint::Box => &self.box_path,
            Endpoint::Color => &self.color_path,
        };
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Upload limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Largest image file accepted, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Initial tolerance for color sampling
    #[serde(default = "default_tolerance")]
    pub default_tolerance: f64,

    /// Horizontal space kept free beside the image
    #[serde(default = "default_viewport_margin")]
    pub viewport_margin: u32,

    /// Base name of the downloaded mask
    #[serde(default = "default_download_name")]
    pub download_name: String,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_viewport_margin() -> u32 {
    DEFAULT_VIEWPORT_MARGIN
}

fn default_download_name() -> String {
    DEFAULT_DOWNLOAD_NAME.to_string()
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            default_tolerance: default_tolerance(),
            viewport_margin: default_viewport_margin(),
            download_name: default_download_name(),
            log_level: LogLevel::default(),
        }
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            app_name: default_app_name(),
            backend: BackendConfig::default(),
            limits: Limits::default(),
            preferences: UserPreferences::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Get the default filename for the config file.
    pub fn default_filename() -> &'static str {
        "maskpick-config.json"
    }

    /// Get the default config file path for auto-load/save.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("maskpick").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("maskpick")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from an explicit path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_path(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load_from_path(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to `path`, creating parent directories.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_path(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Save configuration to the default path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_default_path(&self) -> Result<std::path::PathBuf, ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    /// LocalStorage key for WASM config persistence.
    #[cfg(target_arch = "wasm32")]
    const LOCALSTORAGE_KEY: &'static str = "maskpick-config";

    /// Try to load configuration from localStorage (WASM only).
    /// Returns None if not found or can't be parsed.
    #[cfg(target_arch = "wasm32")]
    pub fn load_from_local_storage() -> Option<Self> {
        let window = web_sys::window()?;
        let storage = window.local_storage().ok()??;

        match storage.get_item(Self::LOCALSTORAGE_KEY) {
            Ok(Some(json)) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded configuration from localStorage");
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse config from localStorage: {}", e);
                    None
                }
            },
            Ok(None) => {
                log::debug!("No config found in localStorage");
                None
            }
            Err(e) => {
                log::warn!("Failed to read from localStorage: {:?}", e);
                None
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_round_trips_through_json() {
        let config = AppConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(AppConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = AppConfig::from_json(r#"{ "version": 1 }"#).unwrap();
        assert_eq!(config.app_name, "maskpick");
        assert_eq!(config.backend, BackendConfig::default());
        assert_eq!(config.limits.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.preferences.download_name, "mask");
        assert_eq!(config.preferences.log_level, LogLevel::Info);
    }

    #[test]
    fn test_partial_backend_section() {
        let config = AppConfig::from_json(
            r#"{ "version": 1, "backend": { "base_url": "http://localhost:8000/" } }"#,
        )
        .unwrap();
        assert_eq!(
            config.backend.url_for(Endpoint::Box),
            "http://localhost:8000/segment_box"
        );
        assert_eq!(config.backend.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_newer_version_rejected() {
        let err = AppConfig::from_json(r#"{ "version": 99 }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::VersionTooNew {
                file_version: 99,
                supported_version: CONFIG_VERSION
            }
        ));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(
            AppConfig::from_json("{ not json"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_default_urls() {
        let backend = BackendConfig::default();
        assert_eq!(
            backend.url_for(Endpoint::Point),
            "https://maskback.up.railway.app/segment_point"
        );
        assert_eq!(
            backend.url_for(Endpoint::Color),
            "https://maskback.up.railway.app/segment_color"
        );
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(LogLevel::Debug.to_level_filter(), log::LevelFilter::Debug);
        assert_eq!(LogLevel::Error.to_level_filter(), log::LevelFilter::Error);
    }
}
