//! Nursing task shells, recorded outcomes and read-time status derivation.
//!
//! A [`NursingTask`] is produced by the generator and never mutated
//! afterwards. What actually happened to it lives in a [`TaskLedger`]; the
//! status a nurse sees is computed on every read by [`TaskStatus::derive`].

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ShiftConfig;
use crate::error::{NicuError, NicuResult};
use crate::model::{FeedRoute, FeedType, VitalParameter};
use crate::shift::ShiftType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Feeding,
    Medication,
    VitalSigns,
    Procedure,
    Assessment,
    PositionChange,
    SkinCare,
    LineCare,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskType::Feeding => "feeding",
            TaskType::Medication => "medication",
            TaskType::VitalSigns => "vital_signs",
            TaskType::Procedure => "procedure",
            TaskType::Assessment => "assessment",
            TaskType::PositionChange => "position_change",
            TaskType::SkinCare => "skin_care",
            TaskType::LineCare => "line_care",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Routine,
    Important,
    Urgent,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskFlag {
    FirstTime,
    NeedsTwoNurses,
    ParentPresent,
    Sterile,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    CarePlan,
    MedicationPrescription,
    Manual,
}

/// Traceability back to the plan or order that produced a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedFrom {
    pub source_type: SourceType,
    pub source_id: String,
    pub version: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InFeedMedication {
    pub prescription_id: String,
    pub medication_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedingTaskDetails {
    #[serde(rename = "volumeML")]
    pub volume_ml: f64,
    pub feed_type: FeedType,
    pub route: FeedRoute,
    /// Candidates the nurse confirms at the bedside.
    pub medications_to_include: Vec<InFeedMedication>,
    pub aspirate_required: bool,
    pub fortification: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationTaskDetails {
    pub prescription_id: String,
    pub medication_name: String,
    pub dose_amount: f64,
    pub dose_unit: String,
    pub route: String,
    pub can_be_given_in_feed: bool,
    pub must_be_given_separately: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VitalSignsTaskDetails {
    pub parameters: Vec<VitalParameter>,
    pub is_routine_check: bool,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcedureKind {
    LineFlush,
    DressingChange,
    TubePositionCheck,
}

impl ProcedureKind {
    pub fn label(self) -> &'static str {
        match self {
            ProcedureKind::LineFlush => "line flush",
            ProcedureKind::DressingChange => "dressing change",
            ProcedureKind::TubePositionCheck => "tube position check",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcedureTaskDetails {
    pub procedure: ProcedureKind,
    pub target_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssessmentTaskDetails {
    pub focus: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionChangeTaskDetails {
    pub target_position: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkinCareTaskDetails {
    pub assessment_tool: Option<String>,
}

/// Type-specific payload; the variant is the task's type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "task_type", content = "details", rename_all = "snake_case")]
pub enum TaskDetails {
    Feeding(FeedingTaskDetails),
    Medication(MedicationTaskDetails),
    VitalSigns(VitalSignsTaskDetails),
    Procedure(ProcedureTaskDetails),
    Assessment(AssessmentTaskDetails),
    PositionChange(PositionChangeTaskDetails),
    SkinCare(SkinCareTaskDetails),
    LineCare(ProcedureTaskDetails),
}

impl TaskDetails {
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskDetails::Feeding(_) => TaskType::Feeding,
            TaskDetails::Medication(_) => TaskType::Medication,
            TaskDetails::VitalSigns(_) => TaskType::VitalSigns,
            TaskDetails::Procedure(_) => TaskType::Procedure,
            TaskDetails::Assessment(_) => TaskType::Assessment,
            TaskDetails::PositionChange(_) => TaskType::PositionChange,
            TaskDetails::SkinCare(_) => TaskType::SkinCare,
            TaskDetails::LineCare(_) => TaskType::LineCare,
        }
    }

    /// Short bedside description used in reminders.
    pub fn describe(&self) -> String {
        match self {
            TaskDetails::Feeding(feed) => format!("Feed due ({}ml)", feed.volume_ml),
            TaskDetails::Medication(med) => format!("Medication: {}", med.medication_name),
            TaskDetails::VitalSigns(_) => "Vital signs check".to_string(),
            TaskDetails::Procedure(proc) => format!("Procedure: {}", proc.procedure.label()),
            TaskDetails::Assessment(assessment) => format!("Assessment due: {}", assessment.focus),
            TaskDetails::PositionChange(change) => match &change.target_position {
                Some(position) => format!("Position change to {position}"),
                None => "Position change".to_string(),
            },
            TaskDetails::SkinCare(_) => "Skin assessment".to_string(),
            TaskDetails::LineCare(care) => format!("Line care: {}", care.procedure.label()),
        }
    }
}

/// Stable identity derived from what a task is and when it is due.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn derive(
        task_type: TaskType,
        source_id: &str,
        target: Option<&str>,
        scheduled_at: DateTime<Utc>,
    ) -> Self {
        let stamp = scheduled_at.format("%Y%m%dT%H%MZ");
        match target {
            Some(target) => Self(format!("{task_type}-{source_id}-{target}-{stamp}")),
            None => Self(format!("{task_type}-{source_id}-{stamp}")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Acceptable execution window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShiftRef {
    pub shift_type: ShiftType,
    pub shift_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recurrence {
    pub frequency: String,
    pub series_id: String,
    pub instance_number: u32,
}

/// One scheduled unit of bedside work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NursingTask {
    pub id: TaskId,
    pub baby_id: String,
    pub generated_from: GeneratedFrom,
    pub scheduled_at: DateTime<Utc>,
    /// `"08:00"` for display.
    pub scheduled_time_of_day: String,
    #[serde(default)]
    pub window: Option<TaskWindow>,
    #[serde(default)]
    pub shift: Option<ShiftRef>,
    pub recurrence: Option<Recurrence>,
    pub priority: Priority,
    #[serde(default)]
    pub flags: Vec<TaskFlag>,
    #[serde(flatten)]
    pub details: TaskDetails,
}

impl NursingTask {
    pub fn task_type(&self) -> TaskType {
        self.details.task_type()
    }

    pub fn has_flag(&self, flag: TaskFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Explicit window, or the unit default around the scheduled time.
    pub fn effective_window(&self, config: &ShiftConfig) -> TaskWindow {
        self.window.unwrap_or(TaskWindow {
            start: self.scheduled_at - Duration::minutes(config.due_lead_minutes),
            end: self.scheduled_at + Duration::minutes(config.overdue_grace_minutes),
        })
    }

    /// Window end, falling back to the scheduled time.
    pub fn deadline(&self) -> DateTime<Utc> {
        self.window.map_or(self.scheduled_at, |window| window.end)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VarianceKind {
    TimeDelayed,
    NotCompleted,
    Partial,
    Refused,
    Contraindicated,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Variance {
    pub kind: VarianceKind,
    pub reason: String,
    #[serde(default)]
    pub alternative_action: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CompletionRecordType {
    FeedingRecord,
    MedicationAdministration,
    VitalSign,
    ProcedureRecord,
}

impl CompletionRecordType {
    pub fn for_task(task_type: TaskType) -> Self {
        match task_type {
            TaskType::Feeding => CompletionRecordType::FeedingRecord,
            TaskType::Medication => CompletionRecordType::MedicationAdministration,
            TaskType::VitalSigns => CompletionRecordType::VitalSign,
            TaskType::Procedure
            | TaskType::Assessment
            | TaskType::PositionChange
            | TaskType::SkinCare
            | TaskType::LineCare => CompletionRecordType::ProcedureRecord,
        }
    }
}

/// What happened to a task. Every outcome is terminal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    Completed {
        at: DateTime<Utc>,
        by: String,
        record_type: CompletionRecordType,
        record_id: String,
        #[serde(default)]
        variance: Option<Variance>,
    },
    Missed {
        recorded_at: DateTime<Utc>,
        by: String,
        variance: Variance,
    },
    Cancelled {
        recorded_at: DateTime<Utc>,
        by: String,
        reason: String,
    },
    Deferred {
        recorded_at: DateTime<Utc>,
        by: String,
        variance: Variance,
    },
}

impl TaskOutcome {
    pub fn status(&self) -> TaskStatus {
        match self {
            TaskOutcome::Completed { .. } => TaskStatus::Completed,
            TaskOutcome::Missed { .. } => TaskStatus::Missed,
            TaskOutcome::Cancelled { .. } => TaskStatus::Cancelled,
            TaskOutcome::Deferred { .. } => TaskStatus::Deferred,
        }
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            TaskOutcome::Completed { at, .. } => Some(*at),
            _ => None,
        }
    }

    pub fn variance(&self) -> Option<&Variance> {
        match self {
            TaskOutcome::Completed { variance, .. } => variance.as_ref(),
            TaskOutcome::Missed { variance, .. } | TaskOutcome::Deferred { variance, .. } => {
                Some(variance)
            }
            TaskOutcome::Cancelled { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Due,
    Overdue,
    Completed,
    Missed,
    Cancelled,
    Deferred,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Missed | TaskStatus::Cancelled | TaskStatus::Deferred
        )
    }

    /// Classify a task at `now`.
    ///
    /// A recorded outcome always wins. Otherwise the task is pending before
    /// its window opens, due inside it and overdue once it has closed.
    pub fn derive(
        task: &NursingTask,
        outcome: Option<&TaskOutcome>,
        now: DateTime<Utc>,
        config: &ShiftConfig,
    ) -> TaskStatus {
        if let Some(outcome) = outcome {
            return outcome.status();
        }

        let window = task.effective_window(config);
        if now < window.start {
            TaskStatus::Pending
        } else if now <= window.end {
            TaskStatus::Due
        } else {
            TaskStatus::Overdue
        }
    }
}

/// Append-only record of task outcomes keyed by task identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskLedger {
    outcomes: HashMap<TaskId, TaskOutcome>,
}

impl TaskLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a task. A task can only be closed once.
    pub fn record(&mut self, task_id: TaskId, outcome: TaskOutcome) -> NicuResult<()> {
        if self.outcomes.contains_key(&task_id) {
            return Err(NicuError::TaskAlreadyClosed {
                task_id: task_id.to_string(),
            });
        }
        self.outcomes.insert(task_id, outcome);
        Ok(())
    }

    pub fn outcome(&self, task_id: &TaskId) -> Option<&TaskOutcome> {
        self.outcomes.get(task_id)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// A task paired with its status at the time of reading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskView {
    pub task: NursingTask,
    pub status: TaskStatus,
    pub outcome: Option<TaskOutcome>,
}

impl TaskView {
    pub fn classify(
        task: &NursingTask,
        ledger: &TaskLedger,
        now: DateTime<Utc>,
        config: &ShiftConfig,
    ) -> Self {
        let outcome = ledger.outcome(&task.id).cloned();
        Self {
            status: TaskStatus::derive(task, outcome.as_ref(), now, config),
            task: task.clone(),
            outcome,
        }
    }

    /// Minutes between scheduled and completed time, if completed.
    pub fn variance_minutes(&self) -> Option<i64> {
        let completed = self.outcome.as_ref()?.completed_at()?;
        Some((completed - self.task.scheduled_at).num_minutes())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskSummary {
    pub total: usize,
    pub pending: usize,
    pub due: usize,
    pub overdue: usize,
    pub completed: usize,
    pub missed: usize,
    pub cancelled: usize,
    pub deferred: usize,
    /// Whole percent of tasks completed.
    pub completion_rate: u32,
}

impl TaskSummary {
    pub fn from_views(views: &[TaskView]) -> Self {
        let mut summary = TaskSummary {
            total: views.len(),
            ..TaskSummary::default()
        };

        for view in views {
            let slot = match view.status {
                TaskStatus::Pending => &mut summary.pending,
                TaskStatus::Due => &mut summary.due,
                TaskStatus::Overdue => &mut summary.overdue,
                TaskStatus::Completed => &mut summary.completed,
                TaskStatus::Missed => &mut summary.missed,
                TaskStatus::Cancelled => &mut summary.cancelled,
                TaskStatus::Deferred => &mut summary.deferred,
            };
            *slot += 1;
        }

        if summary.total > 0 {
            summary.completion_rate =
                (summary.completed as f64 / summary.total as f64 * 100.0).round() as u32;
        }
        summary
    }
}
