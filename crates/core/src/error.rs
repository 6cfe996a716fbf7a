use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type CampaignResult<T> = Result<T, CampaignError>;

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Template syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// What went wrong while scanning a spintext template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntaxErrorKind {
    /// `{` with no matching `}`.
    UnterminatedGroup,
    /// `{{` with no matching `}}`.
    UnterminatedVariable,
    /// A variable name containing `{`, `}` or `|`.
    InvalidVariableName,
    /// `{{}}`.
    EmptyVariableName,
    /// A `}` that closes nothing.
    UnbalancedBrace,
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::UnterminatedGroup => "unterminated variation group",
            Self::UnterminatedVariable => "unterminated variable placeholder",
            Self::InvalidVariableName => "variable name may not contain '{', '}' or '|'",
            Self::EmptyVariableName => "empty variable name",
            Self::UnbalancedBrace => "unbalanced closing brace",
        };
        f.write_str(msg)
    }
}

/// A malformed template. `offset` is the byte offset of the offending brace.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind} at byte {offset}")]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub offset: usize,
}

impl SyntaxError {
    pub fn new(kind: SyntaxErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

/// Rejected ramp, funnel or status-schedule configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("initial daily quota must be at least 1")]
    ZeroInitialQuota,

    #[error("max daily quota {max} is below initial daily quota {initial}")]
    MaxBelowInitial { initial: u64, max: u64 },

    #[error("rest is enabled ({rest_duration_minutes} min) but rest_after_count is 0")]
    ZeroRestAfterCount { rest_duration_minutes: u64 },

    #[error("funnel must have between 1 and {max} messages, got {got}")]
    FunnelLength { got: usize, max: usize },

    #[error("funnel message {index} must wait at least one day after the previous one")]
    FunnelDelay { index: usize },

    #[error("weekly repeat requires at least one weekday")]
    NoWeekdays,

    #[error("{0}")]
    Invalid(String),
}
