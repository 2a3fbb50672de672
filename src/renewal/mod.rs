pub mod stage;
pub mod totals;
pub mod exchange;
pub mod lifecycle;
pub mod sweep;
pub mod jobs;

pub use stage::{RenewalStage, StageAssessment, StageClassifier, Urgency};
pub use totals::{Totals, TotalsCalculator};
pub use exchange::{resolve_exchange_rate, RateSource};
pub use lifecycle::{LifecycleStage, RenewalLifecycle};
pub use sweep::{BatchReclassifier, RecordStore, SweepMode, SweepSummary, StageChange, SweepFailure};
pub use jobs::{update_all_renewal_stages, update_critical_renewal_stages, update_renewal_stage, StageUpdateResponse};
