//! Entry points called by the external scheduler and on demand.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info};

use crate::{
    config::SweepConfig,
    error::{Result, TrackerError},
    renewal::{
        stage::{RenewalStage, StageClassifier},
        sweep::{BatchReclassifier, RecordStore, SweepMode, SweepSummary},
    },
    storage::models::DocStatus,
};

/// Daily full sweep over every submitted record with license dates
pub fn update_all_renewal_stages<S: RecordStore>(
    store: &S,
    config: &SweepConfig,
    today: NaiveDate,
) -> Result<SweepSummary> {
    BatchReclassifier::new(store, config.clone()).run(SweepMode::Full, today)
}

/// Sweep limited to records modified today, ending soon or already flagged
pub fn update_critical_renewal_stages<S: RecordStore>(
    store: &S,
    config: &SweepConfig,
    today: NaiveDate,
) -> Result<SweepSummary> {
    BatchReclassifier::new(store, config.clone()).run(SweepMode::Critical, today)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageUpdateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renewal_stage: Option<RenewalStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageUpdateResponse {
    fn failed(error: String) -> Self {
        Self {
            success: false,
            renewal_stage: None,
            days_remaining: None,
            message: None,
            error: Some(error),
        }
    }
}

/// Recompute and store the stage of a single record. Failures are reported
/// in the response rather than returned.
pub fn update_renewal_stage<S: RecordStore>(
    store: &S,
    name: &str,
    today: NaiveDate,
) -> StageUpdateResponse {
    match reclassify_one(store, name, today) {
        Ok(response) => response,
        Err(e) => {
            error!("Failed to update renewal stage for {}: {}", name, e);
            StageUpdateResponse::failed(e.to_string())
        }
    }
}

fn reclassify_one<S: RecordStore>(
    store: &S,
    name: &str,
    today: NaiveDate,
) -> Result<StageUpdateResponse> {
    let record = store.load_record(name)?;
    if record.docstatus != DocStatus::Submitted {
        return Err(TrackerError::InvalidDocStatus {
            name: name.to_string(),
            action: "update stage",
            status: record.docstatus.to_string(),
        });
    }

    let assessment = StageClassifier::classify(today, record.license_start, record.license_end);
    let stage = assessment.map(|a| a.stage);
    let days_remaining = assessment.map(|a| a.days_remaining);

    store.write_stage(name, stage, days_remaining)?;
    store.commit()?;

    let message = match assessment {
        Some(a) => format!("Renewal stage updated to {} ({} days remaining)", a.stage, a.days_remaining),
        None => "License dates not set; renewal stage cleared".to_string(),
    };
    info!("{}: {}", name, message);

    Ok(StageUpdateResponse {
        success: true,
        renewal_stage: stage,
        days_remaining,
        message: Some(message),
        error: None,
    })
}
