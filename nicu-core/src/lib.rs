//! Shift task generation and compliance engine for a neonatal unit.
//!
//! Everything here is a pure computation over explicit inputs: care plans
//! and prescriptions become timestamped nursing tasks, feeds become a rolling
//! compliance snapshot, and episode logs plus weight feed the discharge gates.

pub mod alerts;
pub mod compliance;
pub mod config;
pub mod discharge;
pub mod episodes;
pub mod error;
pub mod generator;
pub mod model;
pub mod planner;
pub mod records;
pub mod screening;
pub mod shift;
pub mod task;

pub use alerts::{active_alerts_for, line_alerts, tube_alerts, Alert, AlertCategory, AlertSeverity};
pub use compliance::{
    calculate_24hr_compliance, calculate_feed_volume, check_ng_removal_readiness, FeedingCompliance,
    NgRemovalReadiness,
};
pub use config::UnitConfig;
pub use discharge::{
    assess_readiness, generate_summary, DischargeCriteria, DischargeReadinessSummary, ReadinessStatus,
};
pub use episodes::{
    calculate_episode_free_days, create_shift_log, Episode, EpisodeLog, EpisodeType, Intervention,
};
pub use error::{NicuError, NicuResult};
pub use generator::generate_tasks;
pub use model::{CarePlan, FeedingRecord, Patient, Prescription};
pub use planner::ShiftPlanner;
pub use records::ClinicalRecords;
pub use screening::{screening_reminders, ScreeningReminder};
pub use shift::{
    cluster_tasks, filter_tasks_for_role, overdue_tasks, upcoming_tasks, Role, ShiftTaskBundle,
    ShiftTaskService, ShiftType, ShiftWindow,
};
pub use task::{NursingTask, TaskId, TaskLedger, TaskOutcome, TaskStatus, TaskType, TaskView};
