use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Currency pair {from} to {to} not available in system. Please enter the exchange rate manually.")]
    MissingExchangeRate { from: String, to: String },

    #[error("License end date {end} must be after license start date {start}")]
    InvalidLicensePeriod { start: NaiveDate, end: NaiveDate },

    #[error("Renewal Tracking record not found: {0}")]
    RecordNotFound(String),

    #[error("Company not found: {0}")]
    CompanyNotFound(String),

    #[error("Cannot {action} {name}: record is {status}")]
    InvalidDocStatus {
        name: String,
        action: &'static str,
        status: String,
    },

    #[error("Unknown renewal stage: {0}")]
    InvalidStage(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
