use crate::model::Function;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

pub const API_URL: &str = "https://www.alsoenergy.com/WebAPI/WebAPI.svc";

/// Field pulled once a day from every site's summary device.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DailyField {
    pub field_name: String,
    pub function: Function,
}

fn default_daily_fields() -> Vec<DailyField> {
    vec![DailyField {
        field_name: "ProdKWH".to_string(),
        function: Function::Integral,
    }]
}

/// Multipliers applied to a site's solar production, per kWh (per kW for current figures).
///
/// Defaults are US grid averages: kilograms of CO2, SO2 and NOx avoided, passenger cars off
/// the road for a year, and homes powered for a year.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Factors {
    pub co2: f64,
    pub so2: f64,
    pub nox: f64,
    pub cars: f64,
    pub homes: f64,
}

impl Default for Factors {
    fn default() -> Self {
        Factors {
            co2: 0.709,
            so2: 0.000_45,
            nox: 0.000_35,
            cars: 0.000_154,
            homes: 0.000_093,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_url: String,
    pub username: String,
    pub password: String,
    /// Per-request timeout, in seconds.
    pub timeout: u64,
    /// Minimum number of seconds between two current-data polls.
    pub interval: u64,
    /// Number of seconds a fetched catalog is reused.
    pub catalog_interval: u64,
    #[serde(default = "default_daily_fields")]
    pub daily_fields: Vec<DailyField>,
    #[serde(default)]
    pub factors: Factors,
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

fn with_defaults(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    builder
        .set_default("api_url", API_URL)?
        .set_default("timeout", 30i64)?
        .set_default("interval", 900i64)?
        .set_default("catalog_interval", 86400i64)
}

/// Defaults, then `alsoenergy.toml` if present, then `AE_*` environment variables.
/// Credentials have no default.
pub fn read_settings() -> Result<Settings, ConfigError> {
    with_defaults(Config::builder())?
        .add_source(File::with_name("alsoenergy").required(false))
        .add_source(Environment::with_prefix("AE"))
        .build()?
        .try_deserialize()
}
