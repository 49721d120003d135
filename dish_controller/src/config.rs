use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Bumped whenever the file layout changes; an outdated file is replaced by
/// the defaults with a warning rather than half-parsed.
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found at {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to read configuration file: {source}")]
    ReadError { source: std::io::Error },

    #[error("Failed to parse configuration: {source}")]
    ParseError { source: toml::de::Error },

    #[error("Failed to serialize configuration: {source}")]
    SerializeError { source: toml::ser::Error },

    #[error("Failed to write configuration file: {source}")]
    WriteError { source: std::io::Error },

    #[error("Configuration validation failed: {message}")]
    ValidationError { message: String },
}

/// Pins, geometry, limits and default gains of one axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisConfig {
    pub step_pin: u64,
    pub dir_pin: u64,
    pub enable_pin: u64,

    /// Steps per motor revolution at full microstepping.
    pub resolution: u32,
    /// Motor revolutions per output-shaft revolution.
    pub gear_ratio: f64,

    /// Steps per second.
    pub max_velocity: f64,
    /// Steps per second squared.
    pub max_acceleration: f64,

    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DishConfig {
    pub version: u32,

    /// Listen port for the external web layer.
    pub web_port: u16,

    pub control_period_us: u64,
    pub telemetry_interval_ms: u64,
    /// Settling time granted to the orientation sensor before the
    /// controller is built on top of it.
    pub sensor_warmup_ms: u64,

    pub azimuth: AxisConfig,
    pub elevation: AxisConfig,
}

impl Default for DishConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            web_port: 8080,
            control_period_us: 500,
            telemetry_interval_ms: 1000,
            sensor_warmup_ms: 700,
            azimuth: AxisConfig {
                step_pin: 27,
                dir_pin: 4,
                enable_pin: 22,
                resolution: 3200,
                gear_ratio: 19.2,
                max_velocity: 2000.0,
                max_acceleration: 1000.0,
                kp: 1.0,
                ki: 0.0,
                kd: 0.0,
            },
            elevation: AxisConfig {
                step_pin: 19,
                dir_pin: 13,
                enable_pin: 12,
                resolution: 3200,
                gear_ratio: 30.0,
                max_velocity: 2000.0,
                max_acceleration: 1000.0,
                kp: 1.0,
                ki: 0.0,
                kd: 0.0,
            },
        }
    }
}

impl DishConfig {
    pub fn control_period(&self) -> Duration {
        Duration::from_micros(self.control_period_us)
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry_interval_ms)
    }

    pub fn sensor_warmup(&self) -> Duration {
        Duration::from_millis(self.sensor_warmup_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, axis) in [("azimuth", &self.azimuth), ("elevation", &self.elevation)] {
            if axis.resolution == 0 || !(axis.gear_ratio > 0.0) {
                return Err(ConfigError::ValidationError {
                    message: format!(
                        "{name}: resolution {} / gear_ratio {} must be positive",
                        axis.resolution, axis.gear_ratio
                    ),
                });
            }
            if !(axis.max_velocity > 0.0) || !(axis.max_acceleration > 0.0) {
                return Err(ConfigError::ValidationError {
                    message: format!("{name}: velocity and acceleration limits must be positive"),
                });
            }
        }
        if self.control_period_us == 0 {
            return Err(ConfigError::ValidationError {
                message: "control period must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct ConfigOptions {
    pub config_path: PathBuf,
    pub create_if_missing: bool,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            config_path: Self::default_config_path(),
            create_if_missing: true,
        }
    }
}

impl ConfigOptions {
    pub fn default_config_path() -> PathBuf {
        std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("dish_config.toml"))
    }

    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }
}

#[derive(Debug)]
pub struct ConfigManager {
    options: ConfigOptions,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            options: ConfigOptions::default(),
        }
    }

    pub fn with_options(options: ConfigOptions) -> Self {
        Self { options }
    }

    pub fn load(&self) -> anyhow::Result<DishConfig> {
        let config_path = self.options.config_path.clone();

        if !config_path.exists() {
            if self.options.create_if_missing {
                let default_config = DishConfig::default();
                self.save(&default_config)
                    .context("Failed to save default config")?;
                return Ok(default_config);
            } else {
                return Err(ConfigError::FileNotFound { path: config_path }.into());
            }
        }

        let content =
            fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError { source: e })?;

        let config: DishConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError { source: e })?;

        if config.version != CONFIG_VERSION {
            warn!(
                found = config.version,
                required = CONFIG_VERSION,
                "config file is outdated, falling back to defaults"
            );
            return Ok(DishConfig::default());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &DishConfig) -> anyhow::Result<()> {
        let config_path = &self.options.config_path;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError { source: e })?;
        }

        let content =
            toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError { source: e })?;

        fs::write(config_path, content).map_err(|e| ConfigError::WriteError { source: e })?;

        Ok(())
    }
}

pub fn init_config() -> anyhow::Result<(ConfigManager, DishConfig)> {
    let manager = ConfigManager::new();
    let config = manager.load()?;
    Ok((manager, config))
}

pub fn init_config_with_options(
    options: ConfigOptions,
) -> anyhow::Result<(ConfigManager, DishConfig)> {
    let manager = ConfigManager::with_options(options);
    let config = manager.load()?;
    Ok((manager, config))
}

pub fn create_default_config<P: AsRef<Path>>(path: Option<P>) -> anyhow::Result<()> {
    let config_path = path
        .map(|p| p.as_ref().to_path_buf())
        .unwrap_or_else(ConfigOptions::default_config_path);

    let options = ConfigOptions {
        config_path,
        create_if_missing: true,
    };

    let manager = ConfigManager::with_options(options);
    manager.save(&DishConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_creates_the_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dish_config.toml");

        let manager = ConfigManager::with_options(ConfigOptions::with_path(&path));
        let config = manager.load().unwrap();

        assert!(path.exists());
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.azimuth.resolution, 3200);
    }

    #[test]
    fn round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dish_config.toml");

        let mut config = DishConfig::default();
        config.azimuth.kp = 2.5;
        config.elevation.gear_ratio = 24.0;

        let manager = ConfigManager::with_options(ConfigOptions::with_path(&path));
        manager.save(&config).unwrap();
        let loaded = manager.load().unwrap();

        assert_eq!(loaded.azimuth.kp, 2.5);
        assert_eq!(loaded.elevation.gear_ratio, 24.0);
    }

    #[test]
    fn outdated_version_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dish_config.toml");

        let mut config = DishConfig::default();
        config.version = 0;
        config.azimuth.kp = 99.0;

        let manager = ConfigManager::with_options(ConfigOptions::with_path(&path));
        manager.save(&config).unwrap();
        let loaded = manager.load().unwrap();

        assert_eq!(loaded.version, CONFIG_VERSION);
        assert_eq!(loaded.azimuth.kp, DishConfig::default().azimuth.kp);
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dish_config.toml");

        let mut config = DishConfig::default();
        config.elevation.gear_ratio = 0.0;

        let manager = ConfigManager::with_options(ConfigOptions::with_path(&path));
        manager.save(&config).unwrap();
        assert!(manager.load().is_err());
    }
}
