//! Configuration management for flightdash.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::dataset::{DataSource, TableKind};
use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "flightdash";

/// Published cancellation summary.
pub const DEFAULT_CANCELLATIONS_URL: &str =
    "https://media.githubusercontent.com/media/swrobuts/Flights/main/cancellations_summary.csv";

/// Published route summary.
pub const DEFAULT_ROUTES_URL: &str =
    "https://media.githubusercontent.com/media/swrobuts/Flights/main/flight_routes_summary.csv";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `FLIGHTDASH_`, sections split on `__`)
/// 2. TOML config file at `~/.config/flightdash/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the tables come from.
    pub dataset: DatasetConfig,
    /// Chart layout settings.
    pub display: DisplayConfig,
}

/// Dataset sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Cancellation table: a path or an `http(s)` URL.
    pub cancellations: String,
    /// Route table: a path or an `http(s)` URL.
    pub routes: String,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
}

/// Chart layout settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Origin cities shown in the small-multiple grid.
    pub top_origin_cities: usize,
    /// Columns of the small-multiple grid.
    pub grid_columns: usize,
    /// Airports marked on the route map.
    pub top_airports: usize,
    /// Headroom added beyond the longest bar, as a fraction of it.
    pub bar_padding_ratio: f64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            cancellations: DEFAULT_CANCELLATIONS_URL.to_string(),
            routes: DEFAULT_ROUTES_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            top_origin_cities: 10,
            grid_columns: 5,
            top_airports: 30,
            bar_padding_ratio: 0.2,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FLIGHTDASH_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Replace the dataset sources given on the command line.
    #[must_use]
    pub fn with_sources(mut self, cancellations: Option<String>, routes: Option<String>) -> Self {
        if let Some(source) = cancellations {
            self.dataset.cancellations = source;
        }
        if let Some(source) = routes {
            self.dataset.routes = source;
        }
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.dataset.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.display.grid_columns == 0 {
            return Err(Error::ConfigValidation {
                message: "grid_columns must be greater than 0".to_string(),
            });
        }

        if !self.display.bar_padding_ratio.is_finite() || self.display.bar_padding_ratio < 0.0 {
            return Err(Error::ConfigValidation {
                message: format!(
                    "bar_padding_ratio ({}) must be a non-negative number",
                    self.display.bar_padding_ratio
                ),
            });
        }

        self.tables().map(|_| ())
    }

    /// The tables to load, with their layouts.
    ///
    /// # Errors
    ///
    /// Returns an error if a source is empty.
    pub fn tables(&self) -> Result<Vec<(TableKind, DataSource)>> {
        Ok(vec![
            (TableKind::Cancellations, self.dataset.cancellations.parse()?),
            (TableKind::Routes, self.dataset.routes.parse()?),
        ])
    }

    /// Get the HTTP timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.dataset.timeout_secs)
    }
}
