use thiserror::Error;

#[derive(Debug, Error)]
pub enum MedrelayError {
    #[error("Message not found")]
    MessageNotFound(i64),

    #[error("invalid rule definition '{rule_id}': {reason}")]
    InvalidRuleDefinition { rule_id: String, reason: String },

    #[error("invalid direction: {0}")]
    InvalidDirection(String),

    #[error("Start date must come before end date")]
    InvalidDateRange,

    #[error("data file not found: {0}")]
    DataFileNotFound(String),

    #[error(transparent)]
    Db(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, MedrelayError>;
