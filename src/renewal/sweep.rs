use chrono::{Duration, NaiveDate};
use indicatif::ProgressBar;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::{
    config::SweepConfig,
    error::Result,
    renewal::stage::{RenewalStage, StageClassifier},
    storage::models::RenewalRecord,
};

/// Record access needed by the stage sweeps
#[cfg_attr(test, mockall::automock)]
pub trait RecordStore {
    /// Submitted records with both license dates set
    fn submitted_with_dates(&self) -> Result<Vec<String>>;
    fn submitted_modified_on(&self, day: NaiveDate) -> Result<Vec<String>>;
    fn submitted_ending_by(&self, cutoff: NaiveDate) -> Result<Vec<String>>;
    fn submitted_in_stages(&self, stages: &[RenewalStage]) -> Result<Vec<String>>;
    fn load_record(&self, name: &str) -> Result<RenewalRecord>;
    /// Write only stage and days remaining
    fn write_stage(
        &self,
        name: &str,
        stage: Option<RenewalStage>,
        days_remaining: Option<i64>,
    ) -> Result<()>;
    fn begin(&self) -> Result<()>;
    fn commit(&self) -> Result<()>;
    fn rollback(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SweepMode {
    Full,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageChange {
    pub name: String,
    pub from: Option<RenewalStage>,
    pub to: Option<RenewalStage>,
    pub days_remaining: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    pub name: String,
    pub error: String,
}

/// Outcome of one sweep
#[derive(Debug, Default, Serialize)]
pub struct SweepSummary {
    pub total: usize,
    pub success: usize,
    pub errors: usize,
    pub stage_changes: Vec<StageChange>,
    pub failures: Vec<SweepFailure>,
}

impl SweepSummary {
    pub fn print_summary(&self) {
        println!("\n=== Renewal Stage Sweep Summary ===");
        println!("Total Selected:  {}", self.total);
        println!("Updated:         {} ✓", self.success);
        println!("Errors:          {} ✗", self.errors);
        println!("Stage Changes:   {}", self.stage_changes.len());
        println!("===================================");
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.success as f64 / self.total as f64) * 100.0
        }
    }
}

/// Re-evaluates renewal stages across submitted records
pub struct BatchReclassifier<'a, S: RecordStore> {
    store: &'a S,
    config: SweepConfig,
    progress: Option<ProgressBar>,
}

impl<'a, S: RecordStore> BatchReclassifier<'a, S> {
    pub fn new(store: &'a S, config: SweepConfig) -> Self {
        Self {
            store,
            config,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    fn commit_interval(&self, mode: SweepMode) -> usize {
        let interval = match mode {
            SweepMode::Full => self.config.full_commit_interval,
            SweepMode::Critical => self.config.critical_commit_interval,
        };
        interval.max(1)
    }

    /// Names the sweep will visit, in first-seen order without duplicates
    pub fn select(&self, mode: SweepMode, today: NaiveDate) -> Result<Vec<String>> {
        match mode {
            SweepMode::Full => self.store.submitted_with_dates(),
            SweepMode::Critical => {
                let cutoff = today + Duration::days(self.config.critical_window_days);
                let groups = [
                    self.store.submitted_modified_on(today)?,
                    self.store.submitted_ending_by(cutoff)?,
                    self.store.submitted_in_stages(&RenewalStage::CRITICAL)?,
                ];

                let mut seen = HashSet::new();
                Ok(groups
                    .into_iter()
                    .flatten()
                    .filter(|name| seen.insert(name.clone()))
                    .collect())
            }
        }
    }

    /// Run one sweep. Selection and checkpoint failures abort; per-record
    /// failures are counted and skipped.
    pub fn run(&self, mode: SweepMode, today: NaiveDate) -> Result<SweepSummary> {
        let names = self.select(mode, today)?;
        let interval = self.commit_interval(mode);

        info!(
            "Starting {:?} stage sweep over {} records (checkpoint every {})",
            mode,
            names.len(),
            interval
        );

        let mut summary = SweepSummary {
            total: names.len(),
            ..Default::default()
        };

        if let Some(progress) = &self.progress {
            progress.set_length(names.len() as u64);
        }

        self.store.begin()?;

        for (processed, name) in names.iter().enumerate() {
            match self.reclassify(name, today) {
                Ok(change) => {
                    summary.success += 1;
                    if let Some(change) = change {
                        summary.stage_changes.push(change);
                    }
                }
                Err(e) => {
                    summary.errors += 1;
                    warn!("Failed to update renewal stage for {}: {}", name, e);
                    summary.failures.push(SweepFailure {
                        name: name.clone(),
                        error: e.to_string(),
                    });
                }
            }

            if let Some(progress) = &self.progress {
                progress.inc(1);
            }

            if (processed + 1) % interval == 0 {
                self.checkpoint()?;
                debug!("Checkpoint after {} records", processed + 1);
                self.store.begin()?;
            }
        }

        self.checkpoint()?;

        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }

        info!(
            "{:?} sweep complete: {} updated, {} errors, {} stage changes",
            mode,
            summary.success,
            summary.errors,
            summary.stage_changes.len()
        );

        Ok(summary)
    }

    /// Commit pending writes, leaving no transaction open if that fails
    fn checkpoint(&self) -> Result<()> {
        if let Err(e) = self.store.commit() {
            if let Err(rollback_err) = self.store.rollback() {
                warn!("Rollback after failed checkpoint also failed: {}", rollback_err);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Classify one record and write back its stage fields
    fn reclassify(&self, name: &str, today: NaiveDate) -> Result<Option<StageChange>> {
        let record = self.store.load_record(name)?;
        let assessment =
            StageClassifier::classify(today, record.license_start, record.license_end);

        let stage = assessment.map(|a| a.stage);
        let days_remaining = assessment.map(|a| a.days_remaining);
        self.store.write_stage(name, stage, days_remaining)?;

        if record.renewal_stage == stage {
            return Ok(None);
        }

        debug!("{}: {:?} -> {:?}", name, record.renewal_stage, stage);
        Ok(Some(StageChange {
            name: name.to_string(),
            from: record.renewal_stage,
            to: stage,
            days_remaining,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackerError;
    use crate::storage::models::DocStatus;
    use mockall::predicate::eq;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn names(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn submitted(name: &str, stage: Option<RenewalStage>) -> RenewalRecord {
        RenewalRecord {
            name: name.to_string(),
            license_start: Some(date("2025-01-01")),
            license_end: Some(date("2025-12-31")),
            renewal_stage: stage,
            docstatus: DocStatus::Submitted,
            ..Default::default()
        }
    }

    fn config(full: usize, critical: usize) -> SweepConfig {
        SweepConfig {
            full_commit_interval: full,
            critical_commit_interval: critical,
            critical_window_days: 120,
        }
    }

    #[test]
    fn test_one_failure_among_five_does_not_stop_sweep() {
        let mut store = MockRecordStore::new();
        store
            .expect_submitted_with_dates()
            .returning(|| Ok(names(&["RT-1", "RT-2", "RT-3", "RT-4", "RT-5"])));
        store.expect_load_record().times(5).returning(|name| {
            if name == "RT-3" {
                Err(TrackerError::RecordNotFound(name.to_string()))
            } else {
                Ok(submitted(name, Some(RenewalStage::Running)))
            }
        });
        store.expect_write_stage().times(4).returning(|_, _, _| Ok(()));
        store.expect_begin().times(1).returning(|| Ok(()));
        store.expect_commit().times(1).returning(|| Ok(()));

        let summary = BatchReclassifier::new(&store, config(50, 20))
            .run(SweepMode::Full, date("2025-10-15"))
            .unwrap();

        assert_eq!(summary.total, 5);
        assert_eq!(summary.success, 4);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.failures[0].name, "RT-3");
        assert_eq!(summary.success_rate(), 80.0);
    }

    #[test]
    fn test_write_failure_is_counted_as_error() {
        let mut store = MockRecordStore::new();
        store
            .expect_submitted_with_dates()
            .returning(|| Ok(names(&["RT-1", "RT-2"])));
        store
            .expect_load_record()
            .returning(|name| Ok(submitted(name, None)));
        store.expect_write_stage().returning(|name, _, _| {
            if name == "RT-1" {
                Err(TrackerError::RecordNotFound(name.to_string()))
            } else {
                Ok(())
            }
        });
        store.expect_begin().returning(|| Ok(()));
        store.expect_commit().returning(|| Ok(()));

        let summary = BatchReclassifier::new(&store, config(50, 20))
            .run(SweepMode::Full, date("2025-10-15"))
            .unwrap();

        assert_eq!((summary.success, summary.errors), (1, 1));
        assert_eq!(summary.stage_changes.len(), 1);
        assert_eq!(summary.stage_changes[0].name, "RT-2");
    }

    #[test]
    fn test_checkpoints_follow_commit_interval() {
        let mut store = MockRecordStore::new();
        store
            .expect_submitted_with_dates()
            .returning(|| Ok(names(&["RT-1", "RT-2", "RT-3", "RT-4", "RT-5"])));
        store
            .expect_load_record()
            .returning(|name| Ok(submitted(name, None)));
        store.expect_write_stage().returning(|_, _, _| Ok(()));
        // checkpoints after 2 and 4, plus the final commit
        store.expect_begin().times(3).returning(|| Ok(()));
        store.expect_commit().times(3).returning(|| Ok(()));

        BatchReclassifier::new(&store, config(2, 20))
            .run(SweepMode::Full, date("2025-10-15"))
            .unwrap();
    }

    #[test]
    fn test_stage_changes_report_only_moved_records() {
        let mut store = MockRecordStore::new();
        store
            .expect_submitted_with_dates()
            .returning(|| Ok(names(&["RT-1", "RT-2"])));
        store.expect_load_record().returning(|name| {
            let stage = if name == "RT-1" {
                RenewalStage::NinetyDays
            } else {
                RenewalStage::Running
            };
            Ok(submitted(name, Some(stage)))
        });
        store
            .expect_write_stage()
            .with(eq("RT-1"), eq(Some(RenewalStage::NinetyDays)), eq(Some(77)))
            .returning(|_, _, _| Ok(()));
        store
            .expect_write_stage()
            .with(eq("RT-2"), eq(Some(RenewalStage::NinetyDays)), eq(Some(77)))
            .returning(|_, _, _| Ok(()));
        store.expect_begin().returning(|| Ok(()));
        store.expect_commit().returning(|| Ok(()));

        let summary = BatchReclassifier::new(&store, config(50, 20))
            .run(SweepMode::Full, date("2025-10-15"))
            .unwrap();

        assert_eq!(
            summary.stage_changes,
            vec![StageChange {
                name: "RT-2".to_string(),
                from: Some(RenewalStage::Running),
                to: Some(RenewalStage::NinetyDays),
                days_remaining: Some(77),
            }]
        );
    }

    #[test]
    fn test_critical_selection_deduplicates() {
        let today = date("2025-10-15");
        let mut store = MockRecordStore::new();
        store
            .expect_submitted_modified_on()
            .with(eq(today))
            .returning(|_| Ok(names(&["RT-4", "RT-1"])));
        store
            .expect_submitted_ending_by()
            .with(eq(date("2026-02-12")))
            .returning(|_| Ok(names(&["RT-1", "RT-2"])));
        store
            .expect_submitted_in_stages()
            .returning(|_| Ok(names(&["RT-2", "RT-3", "RT-4"])));
        store.expect_submitted_with_dates().never();

        let selected = BatchReclassifier::new(&store, config(50, 20))
            .select(SweepMode::Critical, today)
            .unwrap();

        assert_eq!(selected, names(&["RT-4", "RT-1", "RT-2", "RT-3"]));
    }

    #[test]
    fn test_selection_failure_aborts_sweep() {
        let mut store = MockRecordStore::new();
        store
            .expect_submitted_with_dates()
            .returning(|| Err(TrackerError::Config("store offline".to_string())));
        store.expect_begin().never();

        let result = BatchReclassifier::new(&store, config(50, 20))
            .run(SweepMode::Full, date("2025-10-15"));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_selection() {
        let mut store = MockRecordStore::new();
        store.expect_submitted_with_dates().returning(|| Ok(Vec::new()));
        store.expect_begin().returning(|| Ok(()));
        store.expect_commit().returning(|| Ok(()));

        let summary = BatchReclassifier::new(&store, config(50, 20))
            .run(SweepMode::Full, date("2025-10-15"))
            .unwrap();

        assert_eq!(summary.total, 0);
        assert_eq!(summary.success_rate(), 0.0);
    }

    #[test]
    fn test_critical_sweep_checkpoints_on_its_own_interval() {
        let mut store = MockRecordStore::new();
        store
            .expect_submitted_modified_on()
            .returning(|_| Ok(names(&["RT-1", "RT-2"])));
        store
            .expect_submitted_ending_by()
            .returning(|_| Ok(names(&["RT-3", "RT-4"])));
        store
            .expect_submitted_in_stages()
            .returning(|_| Ok(names(&["RT-5"])));
        store
            .expect_load_record()
            .times(5)
            .returning(|name| Ok(submitted(name, None)));
        store.expect_write_stage().times(5).returning(|_, _, _| Ok(()));
        // full interval of 50 would give a single commit
        store.expect_begin().times(3).returning(|| Ok(()));
        store.expect_commit().times(3).returning(|| Ok(()));

        let summary = BatchReclassifier::new(&store, config(50, 2))
            .run(SweepMode::Critical, date("2025-10-15"))
            .unwrap();
        assert_eq!(summary.success, 5);
    }

    #[test]
    fn test_failed_checkpoint_rolls_back() {
        let mut store = MockRecordStore::new();
        store
            .expect_submitted_with_dates()
            .returning(|| Ok(names(&["RT-1", "RT-2", "RT-3"])));
        store
            .expect_load_record()
            .times(2)
            .returning(|name| Ok(submitted(name, None)));
        store.expect_write_stage().times(2).returning(|_, _, _| Ok(()));
        store.expect_begin().times(1).returning(|| Ok(()));
        store
            .expect_commit()
            .times(1)
            .returning(|| Err(TrackerError::Config("disk full".to_string())));
        store.expect_rollback().times(1).returning(|| Ok(()));

        let result = BatchReclassifier::new(&store, config(2, 20))
            .run(SweepMode::Full, date("2025-10-15"));
        assert!(result.is_err());
    }
}
