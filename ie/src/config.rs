//! Itinerary editor configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::events::DEFAULT_CHANNEL_CAPACITY;
use crate::history::{DEFAULT_MAX_SNAPSHOTS, MIN_SNAPSHOTS};

/// Project-local config file name
pub const LOCAL_CONFIG_FILE: &str = ".itinerary.yml";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Undo/redo history
    pub history: HistoryConfig,

    /// Background reload of the active plan
    pub reload: ReloadConfig,

    /// Event bus
    pub events: EventsConfig,

    /// Plan normalizer
    pub normalizer: NormalizerConfig,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .itinerary.yml
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/itinerary/itinerary.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("itinerary").join("itinerary.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just `log-level`, before logging is set up
    ///
    /// Errors are swallowed; the full load reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = [
            config_path.cloned(),
            Some(PathBuf::from(LOCAL_CONFIG_FILE)),
            dirs::config_dir().map(|d| d.join("itinerary").join("itinerary.yml")),
        ];
        let path = candidates.into_iter().flatten().find(|p| p.exists())?;
        let content = fs::read_to_string(path).ok()?;
        serde_yaml::from_str::<Config>(&content).ok()?.log_level
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Reject values the editor cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.history.max_snapshots < MIN_SNAPSHOTS {
            return Err(eyre::eyre!(
                "history.max-snapshots must be at least {}, got {}",
                MIN_SNAPSHOTS,
                self.history.max_snapshots
            ));
        }
        if self.reload.enabled && self.reload.interval_ms == 0 {
            return Err(eyre::eyre!("reload.interval-ms must be positive when reload is enabled"));
        }
        if self.events.channel_capacity == 0 {
            return Err(eyre::eyre!("events.channel-capacity must be positive"));
        }
        Ok(())
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Plan store directory
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("itinerary")
                .join("plans"),
        }
    }
}

/// History configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Snapshots kept per session, oldest dropped first
    #[serde(rename = "max-snapshots")]
    pub max_snapshots: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
        }
    }
}

/// Reload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    pub enabled: bool,

    /// Poll interval in milliseconds
    #[serde(rename = "interval-ms")]
    pub interval_ms: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: 5_000,
        }
    }
}

/// Event bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    #[serde(rename = "channel-capacity")]
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Normalizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Trip length used when a document is normalized without a plan
    #[serde(rename = "default-duration-days")]
    pub default_duration_days: u32,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            default_duration_days: 3,
        }
    }
}
