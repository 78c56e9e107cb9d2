use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use validator::{Validate, ValidationErrors};

use crate::error::ConfigError;

pub mod areas;

pub use areas::{join_areas, split_areas, AreaInput};

pub const DEFAULT_EVENTS_URL: &str = "https://polisen.se/api/events";
pub const DEFAULT_LIST_PAGE_URL: &str = "https://polisen.se/aktuellt/polisens-nyheter/1/";
pub const DEFAULT_BASE_URL: &str = "https://polisen.se";

pub const DEFAULT_HOURS: i64 = 24;
pub const DEFAULT_MAX_ITEMS: i64 = 5;
pub const DEFAULT_UPDATE_INTERVAL_MINUTES: i64 = 5;

const FALLBACK_SENSOR_NAME: &str = "Polisen Events";

// Главная структура конфигурации
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub sensors: Vec<SensorSettings>,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            environment: "development".to_string(),
            rust_log: "polisen_events=debug,tower_http=info".to_string(),
        }
    }
}

// Настройки внешнего API полиции
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct UpstreamConfig {
    pub events_url: String,
    pub list_page_url: String,
    /// Prefix for relative event links.
    pub base_url: String,
    #[validate(range(min = 1, max = 60, message = "must be between 1 and 60"))]
    pub request_timeout_secs: u64,
    #[validate(range(min = 1, max = 168, message = "must be between 1 and 168"))]
    pub suggestions_ttl_hours: i64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            events_url: DEFAULT_EVENTS_URL.to_string(),
            list_page_url: DEFAULT_LIST_PAGE_URL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 15,
            suggestions_ttl_hours: 12,
        }
    }
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// How an area string is compared against an event's location label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Contains,
    Exact,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Contains => "contains",
            MatchMode::Exact => "exact",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "contains" => Ok(MatchMode::Contains),
            "exact" => Ok(MatchMode::Exact),
            other => Err(format!("expected `contains` or `exact`, got `{}`", other)),
        }
    }
}

/// One sensor as written in the config file, before validation.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SensorSettings {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub area: AreaInput,
    #[serde(default)]
    pub match_mode: Option<String>,
    #[serde(default = "default_hours")]
    #[validate(range(min = 1, max = 168, message = "must be between 1 and 168"))]
    pub hours: i64,
    #[serde(default = "default_max_items")]
    #[validate(range(min = 1, max = 50, message = "must be between 1 and 50"))]
    pub max_items: i64,
    #[serde(default = "default_update_interval")]
    #[validate(range(min = 1, max = 60, message = "must be between 1 and 60"))]
    pub update_interval_minutes: i64,
}

fn default_hours() -> i64 {
    DEFAULT_HOURS
}

fn default_max_items() -> i64 {
    DEFAULT_MAX_ITEMS
}

fn default_update_interval() -> i64 {
    DEFAULT_UPDATE_INTERVAL_MINUTES
}

/// Validated sensor configuration consumed by the summarize engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorConfig {
    pub name: String,
    pub areas: Vec<String>,
    pub match_mode: MatchMode,
    pub hours: u32,
    pub max_items: usize,
    pub update_interval: Duration,
}

impl SensorConfig {
    pub fn new(areas: Vec<String>, match_mode: MatchMode, hours: u32, max_items: usize) -> Self {
        let label = join_areas(&areas);
        Self {
            name: if label.is_empty() { FALLBACK_SENSOR_NAME.to_string() } else { label },
            areas,
            match_mode,
            hours,
            max_items,
            update_interval: Duration::from_secs(DEFAULT_UPDATE_INTERVAL_MINUTES as u64 * 60),
        }
    }

    /// Joined label, e.g. `Malmö / Lund`.
    pub fn area_label(&self) -> String {
        join_areas(&self.areas)
    }
}

/// First failing field in name order, so errors are reported deterministically.
fn first_violation(errors: &ValidationErrors) -> Option<(String, String)> {
    let mut fields: Vec<(String, String)> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let message = errs
                .first()
                .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "invalid value".to_string());
            (field.to_string(), message)
        })
        .collect();
    fields.sort();
    fields.into_iter().next()
}

impl SensorSettings {
    pub fn into_config(self) -> Result<SensorConfig, ConfigError> {
        let areas = self.area.to_areas();
        let label = join_areas(&areas);
        let sensor = self
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                if label.is_empty() {
                    FALLBACK_SENSOR_NAME.to_string()
                } else {
                    label.clone()
                }
            });

        if let Err(errors) = self.validate() {
            if let Some((field, message)) = first_violation(&errors) {
                return Err(ConfigError::Invalid {
                    sensor,
                    field,
                    message,
                });
            }
        }

        let match_mode = match self.match_mode.as_deref() {
            None => MatchMode::default(),
            Some(raw) if raw.trim().is_empty() => MatchMode::default(),
            Some(raw) => raw.parse().map_err(|message| ConfigError::Invalid {
                sensor: sensor.clone(),
                field: "match_mode".to_string(),
                message,
            })?,
        };

        Ok(SensorConfig {
            name: sensor,
            areas,
            match_mode,
            hours: self.hours as u32,
            max_items: self.max_items as usize,
            update_interval: Duration::from_secs(self.update_interval_minutes as u64 * 60),
        })
    }
}

impl Config {
    /// Loads `.env`, an optional TOML file and `POLISEN__*` overrides.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let path = env::var("POLISEN_CONFIG").unwrap_or_else(|_| "polisen.toml".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix("POLISEN")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Checks the `[upstream]` section.
    pub fn validate_upstream(&self) -> Result<(), ConfigError> {
        if let Err(errors) = self.upstream.validate() {
            if let Some((field, message)) = first_violation(&errors) {
                return Err(ConfigError::InvalidUpstream { field, message });
            }
        }
        Ok(())
    }

    /// Validates every sensor and rejects duplicate names.
    pub fn sensor_configs(&self) -> Result<Vec<SensorConfig>, ConfigError> {
        let mut seen = HashSet::new();
        let mut configs = Vec::with_capacity(self.sensors.len());

        for settings in &self.sensors {
            let config = settings.clone().into_config()?;
            if !seen.insert(config.name.clone()) {
                return Err(ConfigError::DuplicateSensor(config.name));
            }
            configs.push(config);
        }

        Ok(configs)
    }
}
