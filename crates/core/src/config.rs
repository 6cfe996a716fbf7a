use serde::Deserialize;

use crate::types::{MissingVariablePolicy, RampConfig};

/// Root application configuration. Loaded from environment variables
/// with the prefix `RESTAURANT_BOT__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ramp: RampConfig,
    #[serde(default)]
    pub spintext: SpintextConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpintextConfig {
    #[serde(default)]
    pub missing_variable: MissingVariablePolicy,
    /// Value used for `{{nome}}` in live previews when none is given.
    #[serde(default = "default_preview_name")]
    pub preview_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Spacing between two sends inside one batch.
    #[serde(default)]
    pub message_interval_seconds: u64,
    /// Hour of the day (0-23) at which a dispatch day opens.
    #[serde(default = "default_day_start_hour")]
    pub day_start_hour: u32,
}

// Default functions
fn default_preview_name() -> String {
    "João".to_string()
}
fn default_day_start_hour() -> u32 {
    9
}

impl Default for SpintextConfig {
    fn default() -> Self {
        Self {
            missing_variable: MissingVariablePolicy::default(),
            preview_name: default_preview_name(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            message_interval_seconds: 0,
            day_start_hour: default_day_start_hour(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("RESTAURANT_BOT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
