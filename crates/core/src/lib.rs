pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{CampaignError, CampaignResult, ConfigError, SyntaxError, SyntaxErrorKind};
pub use types::{Campaign, CampaignStatus, FunnelMessage, MissingVariablePolicy, Priority, RampConfig};
