use chrono::{Datelike, NaiveDate};
use tracing::{error, info};

use crate::{
    error::{Result, TrackerError},
    renewal::{
        exchange::{resolve_exchange_rate, RateSource},
        stage::StageClassifier,
        totals::TotalsCalculator,
    },
    storage::{
        models::{DocStatus, RenewalRecord},
        Database,
    },
};

/// Named steps a record passes through on save and submit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    Validate,
    BeforeSave,
    OnSubmit,
}

const SAVE_PIPELINE: [LifecycleStage; 2] = [LifecycleStage::Validate, LifecycleStage::BeforeSave];
const SUBMIT_PIPELINE: [LifecycleStage; 3] = [
    LifecycleStage::Validate,
    LifecycleStage::BeforeSave,
    LifecycleStage::OnSubmit,
];

/// Reject a window whose end is not after its start
pub fn check_license_period(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<()> {
    match (start, end) {
        (Some(start), Some(end)) if end <= start => {
            Err(TrackerError::InvalidLicensePeriod { start, end })
        }
        _ => Ok(()),
    }
}

pub struct RenewalLifecycle<'a> {
    db: &'a Database,
}

impl<'a> RenewalLifecycle<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Validate, recompute totals and persist a draft. Assigns a name when
    /// the record has none.
    pub fn save(&self, record: &mut RenewalRecord, today: NaiveDate) -> Result<()> {
        let status = self.stored_status(record)?;
        if status != DocStatus::Draft {
            return Err(TrackerError::InvalidDocStatus {
                name: record.name.clone(),
                action: "save",
                status: status.to_string(),
            });
        }

        if record.name.is_empty() {
            record.name = self.db.next_name(today.year())?;
        }

        // stage fields are only ever written by the classifier
        record.renewal_stage = None;
        record.days_remaining = None;

        self.run_pipeline(&SAVE_PIPELINE, record, today)?;
        self.db.save_record(record)?;

        info!(
            "Saved {} (net total {} {}, base {})",
            record.name, record.net_total, record.currency, record.net_total_base
        );
        Ok(())
    }

    /// Finalise a draft: recompute everything and persist its first stage
    pub fn submit(&self, name: &str, today: NaiveDate) -> Result<RenewalRecord> {
        let mut record = self.db.get_record(name)?;

        if record.docstatus != DocStatus::Draft {
            return Err(TrackerError::InvalidDocStatus {
                name: name.to_string(),
                action: "submit",
                status: record.docstatus.to_string(),
            });
        }

        self.run_pipeline(&SUBMIT_PIPELINE, &mut record, today)?;
        record.docstatus = DocStatus::Submitted;
        self.db.save_record(&mut record)?;

        info!(
            "Submitted {} at stage {:?} ({:?} days remaining)",
            record.name, record.renewal_stage, record.days_remaining
        );
        Ok(record)
    }

    /// Withdraw a submitted record from further sweeps
    pub fn cancel(&self, name: &str) -> Result<RenewalRecord> {
        let mut record = self.db.get_record(name)?;

        if record.docstatus != DocStatus::Submitted {
            return Err(TrackerError::InvalidDocStatus {
                name: name.to_string(),
                action: "cancel",
                status: record.docstatus.to_string(),
            });
        }

        record.docstatus = DocStatus::Cancelled;
        self.db.save_record(&mut record)?;
        info!("Cancelled {}", name);
        Ok(record)
    }

    /// Status of the persisted row when one exists, else the in-memory status
    fn stored_status(&self, record: &RenewalRecord) -> Result<DocStatus> {
        if record.name.is_empty() {
            return Ok(record.docstatus);
        }
        match self.db.get_record(&record.name) {
            Ok(stored) if stored.docstatus != DocStatus::Draft => Ok(stored.docstatus),
            Ok(_) | Err(TrackerError::RecordNotFound(_)) => Ok(record.docstatus),
            Err(e) => Err(e),
        }
    }

    fn run_pipeline(
        &self,
        stages: &[LifecycleStage],
        record: &mut RenewalRecord,
        today: NaiveDate,
    ) -> Result<()> {
        for stage in stages {
            if let Err(e) = self.run_stage(*stage, record, today) {
                error!(
                    record = %record.name,
                    company = %record.company,
                    currency = %record.currency,
                    stage = ?stage,
                    "Renewal Tracking lifecycle failed: {}",
                    e
                );
                return Err(e);
            }
        }
        Ok(())
    }

    fn run_stage(
        &self,
        stage: LifecycleStage,
        record: &mut RenewalRecord,
        today: NaiveDate,
    ) -> Result<()> {
        match stage {
            LifecycleStage::Validate => {
                self.set_exchange_rate(record)?;
                check_license_period(record.license_start, record.license_end)
            }
            LifecycleStage::BeforeSave => {
                let base_currency = self.base_currency(record)?;
                let totals = TotalsCalculator::recompute(
                    &record.currency,
                    base_currency.as_deref(),
                    record.exchange_rate,
                    &mut record.items,
                );
                record.net_total = totals.net_total;
                record.net_total_base = totals.net_total_base;
                Ok(())
            }
            LifecycleStage::OnSubmit => {
                let assessment =
                    StageClassifier::classify(today, record.license_start, record.license_end);
                record.renewal_stage = assessment.map(|a| a.stage);
                record.days_remaining = assessment.map(|a| a.days_remaining);
                Ok(())
            }
        }
    }

    fn base_currency(&self, record: &RenewalRecord) -> Result<Option<String>> {
        if record.company.is_empty() {
            return Ok(None);
        }
        match self.db.company_currency(&record.company)? {
            Some(currency) => Ok(Some(currency)),
            None => Err(TrackerError::CompanyNotFound(record.company.clone())),
        }
    }

    fn set_exchange_rate(&self, record: &mut RenewalRecord) -> Result<()> {
        if record.currency.is_empty() {
            return Ok(());
        }
        let Some(base_currency) = self.base_currency(record)? else {
            return Ok(());
        };

        let rate = resolve_exchange_rate(
            self.db,
            &record.currency,
            &base_currency,
            record.exchange_rate,
        )?;
        record.exchange_rate = Some(rate);
        Ok(())
    }
}
