use thiserror::Error;

/// Validation and contract errors exposed by `courtside-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("subject cannot be empty for this fact kind")]
    EmptySubject,
    #[error("results window size must be greater than zero")]
    ZeroWindow,
    #[error("leader limit must be greater than zero")]
    ZeroLimit,

    #[error("invalid conference '{value}', expected east or west")]
    InvalidConference { value: String },
    #[error("invalid stat category '{value}', expected one of points, assists, rebounds, steals, blocks, threes")]
    InvalidStat { value: String },
    #[error("invalid provider '{value}', expected one of espn, nba_stats, balldontlie")]
    InvalidProvider { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("invalid calendar date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },
    #[error("utc offset of {hours} hours is outside -12..=14")]
    InvalidUtcOffset { hours: i8 },
}

/// Top-level error type for configuration and engine assembly.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}
