use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TrackerError;

/// Lifecycle position of a license relative to today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenewalStage {
    Open,
    Running,
    #[serde(rename = "90 Days to Expiry")]
    NinetyDays,
    #[serde(rename = "60 Days to Expiry")]
    SixtyDays,
    #[serde(rename = "30 Days to Expiry")]
    ThirtyDays,
    Expired,
}

impl RenewalStage {
    pub const ALL: [RenewalStage; 6] = [
        RenewalStage::Open,
        RenewalStage::Running,
        RenewalStage::NinetyDays,
        RenewalStage::SixtyDays,
        RenewalStage::ThirtyDays,
        RenewalStage::Expired,
    ];

    /// Stages that always qualify a record for the critical sweep
    pub const CRITICAL: [RenewalStage; 4] = [
        RenewalStage::ThirtyDays,
        RenewalStage::SixtyDays,
        RenewalStage::NinetyDays,
        RenewalStage::Expired,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RenewalStage::Open => "Open",
            RenewalStage::Running => "Running",
            RenewalStage::NinetyDays => "90 Days to Expiry",
            RenewalStage::SixtyDays => "60 Days to Expiry",
            RenewalStage::ThirtyDays => "30 Days to Expiry",
            RenewalStage::Expired => "Expired",
        }
    }

    pub fn is_critical(&self) -> bool {
        Self::CRITICAL.contains(self)
    }
}

impl fmt::Display for RenewalStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RenewalStage {
    type Err = TrackerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|stage| stage.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TrackerError::InvalidStage(s.to_string()))
    }
}

/// Result of classifying a record's license window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageAssessment {
    pub stage: RenewalStage,
    pub days_remaining: i64,
}

pub struct StageClassifier;

impl StageClassifier {
    /// Milestones checked after the open/expired bounds, nearest first
    const MILESTONES: [(i64, RenewalStage); 3] = [
        (30, RenewalStage::ThirtyDays),
        (60, RenewalStage::SixtyDays),
        (90, RenewalStage::NinetyDays),
    ];

    /// Classify a license window as seen on `today`.
    ///
    /// Returns `None` when either date is missing; records without a
    /// complete license window carry no stage.
    pub fn classify(
        today: NaiveDate,
        license_start: Option<NaiveDate>,
        license_end: Option<NaiveDate>,
    ) -> Option<StageAssessment> {
        let (start, end) = (license_start?, license_end?);
        let days_remaining = (end - today).num_days();

        let stage = if today < start {
            RenewalStage::Open
        } else if today >= end {
            RenewalStage::Expired
        } else {
            Self::MILESTONES
                .iter()
                .find(|(days, _)| today >= Self::milestone(end, *days))
                .map(|(_, stage)| *stage)
                .unwrap_or(RenewalStage::Running)
        };

        Some(StageAssessment {
            stage,
            days_remaining,
        })
    }

    /// Date `days` before the license end
    pub fn milestone(license_end: NaiveDate, days: i64) -> NaiveDate {
        license_end - Duration::days(days)
    }
}

/// Display band for a days-remaining value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Overdue,
    Critical,
    Warning,
    Notice,
    Healthy,
}

impl Urgency {
    pub fn from_days(days_remaining: i64) -> Self {
        match days_remaining {
            d if d < 0 => Urgency::Overdue,
            d if d <= 30 => Urgency::Critical,
            d if d <= 60 => Urgency::Warning,
            d if d <= 90 => Urgency::Notice,
            _ => Urgency::Healthy,
        }
    }

    pub fn describe(days_remaining: i64) -> String {
        match Self::from_days(days_remaining) {
            Urgency::Overdue => format!("{} days overdue", days_remaining.abs()),
            _ => format!("{} days", days_remaining),
        }
    }
}
