use crate::error::{Result, TrackerError};
use chrono::format::{Item, StrftimeItems};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `storage.path`.
pub const DB_PATH_ENV: &str = "FOCUS_TRACKER_DB";

/// Upper bound for `analytics.trend_days`.
pub const MAX_TREND_DAYS: u32 = 366;

/// Top-level application configuration, loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub analytics: AnalyticsConfig,
}

impl AppConfig {
    /// Load configuration from the default path
    /// (~/.config/focus-tracker/config.toml), falling back to defaults if the
    /// file doesn't exist. Environment overrides are applied afterwards.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.analytics.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Write a default config file at `path` unless one exists. Returns
    /// whether a file was created.
    pub fn init_at(path: &Path) -> anyhow::Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        Ok(true)
    }

    pub fn apply_env(&mut self) {
        if let Ok(path) = std::env::var(DB_PATH_ENV) {
            if !path.is_empty() {
                tracing::debug!("Database path overridden by {}", DB_PATH_ENV);
                self.storage.path = Some(PathBuf::from(path));
            }
        }
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("focus-tracker")
            .join("config.toml")
    }

    /// Data directory for the database file.
    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("focus-tracker")
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Enable CORS.
    pub cors: bool,
    /// Directory holding `index.html`, `service-worker.js` and static assets.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            cors: true,
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Session storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite database file. Resolved at runtime to data_dir/focus_tracker.db.
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| AppConfig::data_dir().join("focus_tracker.db"))
    }
}

/// Day bucketing and staleness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Fixed local offset from UTC used to decide calendar days.
    pub utc_offset_minutes: i32,
    /// Unended sessions older than this are not offered for resume.
    pub active_session_max_age_hours: u32,
    /// Number of days in the trend, today included.
    pub trend_days: u32,
    /// chrono format string for trend date labels.
    pub trend_date_format: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 5 * 60 + 30,
            active_session_max_age_hours: 24,
            trend_days: 7,
            trend_date_format: "%d-%m-%Y".into(),
        }
    }
}

impl AnalyticsConfig {
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                TrackerError::Config(format!(
                    "utc_offset_minutes out of range: {}",
                    self.utc_offset_minutes
                ))
            })
    }

    pub fn validate(&self) -> Result<()> {
        self.utc_offset()?;
        if !(1..=MAX_TREND_DAYS).contains(&self.trend_days) {
            return Err(TrackerError::Config(format!(
                "trend_days must be between 1 and {MAX_TREND_DAYS}, got {}",
                self.trend_days
            )));
        }
        if self.trend_date_format.is_empty() {
            return Err(TrackerError::Config("trend_date_format is empty".into()));
        }
        if StrftimeItems::new(&self.trend_date_format).any(|item| matches!(item, Item::Error)) {
            return Err(TrackerError::Config(format!(
                "trend_date_format is not a valid date format: {}",
                self.trend_date_format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("utc_offset_minutes = 330"));
        assert!(toml_str.contains("127.0.0.1"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.analytics.trend_days, 7);
        assert_eq!(parsed.storage.backend, StorageBackend::Sqlite);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: AppConfig = toml::from_str(
            "[analytics]\nutc_offset_minutes = -300\n\n[storage]\nbackend = \"memory\"\n",
        )
        .unwrap();
        assert_eq!(parsed.analytics.utc_offset_minutes, -300);
        assert_eq!(parsed.analytics.active_session_max_age_hours, 24);
        assert_eq!(parsed.storage.backend, StorageBackend::Memory);
        assert_eq!(parsed.server.port, 8000);
    }

    #[test]
    fn test_default_offset_is_ist() {
        let offset = AnalyticsConfig::default().utc_offset().unwrap();
        assert_eq!(offset.local_minus_utc(), 19_800);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AnalyticsConfig {
            utc_offset_minutes: 24 * 60,
            ..AnalyticsConfig::default()
        };
        assert!(matches!(config.validate(), Err(TrackerError::Config(_))));

        config.utc_offset_minutes = 0;
        config.trend_days = 0;
        assert!(config.validate().is_err());

        config.trend_days = 7;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_bounds_trend_days() {
        let mut config = AnalyticsConfig {
            trend_days: MAX_TREND_DAYS,
            ..AnalyticsConfig::default()
        };
        assert!(config.validate().is_ok());

        config.trend_days = MAX_TREND_DAYS + 1;
        assert!(matches!(config.validate(), Err(TrackerError::Config(_))));

        config.trend_days = 200_000_000;
        assert!(matches!(config.validate(), Err(TrackerError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_date_specifier() {
        let mut config = AnalyticsConfig {
            trend_date_format: "%Q".into(),
            ..AnalyticsConfig::default()
        };
        assert!(matches!(config.validate(), Err(TrackerError::Config(_))));

        config.trend_date_format = "%d-%m-%".into();
        assert!(config.validate().is_err());

        config.trend_date_format = "%a %d %b".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_rejects_bad_date_format() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[analytics]\ntrend_date_format = \"%Q\"\n").unwrap();

        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 9100\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.server.port, 9100);
        assert!(config.server.cors);
    }

    #[test]
    fn test_load_from_rejects_invalid_analytics() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[analytics]\ntrend_days = 0\n").unwrap();

        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_init_writes_defaults_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert!(AppConfig::init_at(&path).unwrap());
        let written = AppConfig::load_from(&path).unwrap();
        assert!(written.storage.path.is_none());
        assert_eq!(written.server.port, 8000);

        std::fs::write(&path, "[server]\nport = 9100\n").unwrap();
        assert!(!AppConfig::init_at(&path).unwrap());
        assert_eq!(AppConfig::load_from(&path).unwrap().server.port, 9100);
    }

    #[test]
    fn test_resolved_path_prefers_explicit() {
        let storage = StorageConfig {
            backend: StorageBackend::Sqlite,
            path: Some(PathBuf::from("/tmp/focus.db")),
        };
        assert_eq!(storage.resolved_path(), PathBuf::from("/tmp/focus.db"));
    }
}
