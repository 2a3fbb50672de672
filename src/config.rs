use serde::Deserialize;

use crate::error::{Result, TrackerError};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub sweep: SweepConfig,
    pub documents: DocumentConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Checkpoint and selection settings for the stage sweeps
#[derive(Debug, Deserialize, Clone)]
pub struct SweepConfig {
    pub full_commit_interval: usize,
    pub critical_commit_interval: usize,
    pub critical_window_days: i64,
}

/// Defaults injected into generated quotation documents
#[derive(Debug, Deserialize, Clone)]
pub struct DocumentConfig {
    pub rfq_schedule_days: i64,
    pub quotation_validity_days: i64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            full_commit_interval: 50,
            critical_commit_interval: 20,
            critical_window_days: 120,
        }
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            rfq_schedule_days: 7,
            quotation_validity_days: 30,
        }
    }
}

impl Config {
    /// Load defaults, then the optional file at `path`, then `RENEWAL__*` env vars
    pub fn load_from(path: &str) -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let config = Self::builder()?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("RENEWAL").separator("__"))
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn builder() -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let sweep = SweepConfig::default();
        let documents = DocumentConfig::default();

        Ok(config::Config::builder()
            .set_default("database.path", "renewal_tracking.db")?
            .set_default("sweep.full_commit_interval", sweep.full_commit_interval as i64)?
            .set_default("sweep.critical_commit_interval", sweep.critical_commit_interval as i64)?
            .set_default("sweep.critical_window_days", sweep.critical_window_days)?
            .set_default("documents.rfq_schedule_days", documents.rfq_schedule_days)?
            .set_default("documents.quotation_validity_days", documents.quotation_validity_days)?)
    }

    fn validate(&self) -> Result<()> {
        if self.sweep.full_commit_interval == 0 || self.sweep.critical_commit_interval == 0 {
            return Err(TrackerError::Config(
                "sweep commit intervals must be greater than zero".to_string(),
            ));
        }
        if self.sweep.critical_window_days < 0 {
            return Err(TrackerError::Config(
                "sweep.critical_window_days must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
