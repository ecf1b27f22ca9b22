//! Shift-level task bundles and the derived views nurses work from.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ShiftConfig, ShiftDefinition};
use crate::error::{NicuError, NicuResult};
use crate::generator::generate_tasks;
use crate::model::{active_care_plan, CarePlan, Patient, Prescription};
use crate::task::{
    NursingTask, Priority, ShiftRef, TaskFlag, TaskLedger, TaskStatus, TaskType, TaskView,
    TaskWindow,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ShiftType {
    Day,
    Night,
    LongDay,
}

impl ShiftType {
    pub fn as_str(self) -> &'static str {
        match self {
            ShiftType::Day => "day",
            ShiftType::Night => "night",
            ShiftType::LongDay => "long_day",
        }
    }
}

impl fmt::Display for ShiftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ShiftType {
    type Err = NicuError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "day" => Ok(ShiftType::Day),
            "night" => Ok(ShiftType::Night),
            "long_day" | "long-day" => Ok(ShiftType::LongDay),
            other => Err(NicuError::Parse(format!("unknown shift type {other:?}"))),
        }
    }
}

/// Concrete `[start, end)` instants of one shift.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShiftWindow {
    pub shift_type: ShiftType,
    /// Calendar date the shift starts on.
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ShiftWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }

    pub fn duration_hours(&self) -> f64 {
        (self.end - self.start).num_seconds() as f64 / 3600.0
    }

    pub fn shift_id(&self) -> String {
        format!("shift-{}-{}", self.shift_type, self.date.format("%Y-%m-%d"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Nurse,
    Hca,
    Doctor,
    Anp,
    UnitManager,
}

impl std::str::FromStr for Role {
    type Err = NicuError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "nurse" => Ok(Role::Nurse),
            "hca" => Ok(Role::Hca),
            "doctor" => Ok(Role::Doctor),
            "anp" => Ok(Role::Anp),
            "unit_manager" | "unit-manager" => Ok(Role::UnitManager),
            other => Err(NicuError::Parse(format!("unknown role {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReminderType {
    Upcoming,
    DueNow,
    Overdue,
    WindowClosing,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ReminderPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl From<Priority> for ReminderPriority {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Routine => ReminderPriority::Low,
            Priority::Important => ReminderPriority::Medium,
            Priority::Urgent => ReminderPriority::High,
            Priority::Critical => ReminderPriority::Critical,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskReminder {
    pub id: String,
    pub task_id: String,
    pub baby_id: String,
    pub reminder_type: ReminderType,
    pub scheduled_for: DateTime<Utc>,
    pub message: String,
    pub priority: ReminderPriority,
    pub dismissed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ShiftStats {
    pub total_tasks: usize,
    pub by_type: BTreeMap<TaskType, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
    pub by_patient: BTreeMap<String, usize>,
}

/// Every task for one shift across the patients asked for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShiftTaskBundle {
    pub shift_id: String,
    pub shift: ShiftWindow,
    pub generated_at: DateTime<Utc>,
    pub generated_by: String,
    pub tasks_by_patient: BTreeMap<String, Vec<NursingTask>>,
    /// Chronological, ties broken by task id.
    pub all_tasks: Vec<NursingTask>,
    pub reminders: Vec<TaskReminder>,
    pub stats: ShiftStats,
}

/// Builds shift bundles from care plans and prescriptions.
#[derive(Debug, Clone, Default)]
pub struct ShiftTaskService {
    config: ShiftConfig,
}

impl ShiftTaskService {
    pub fn new(config: ShiftConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ShiftConfig {
        &self.config
    }

    fn definition(&self, shift_type: ShiftType) -> ShiftDefinition {
        match shift_type {
            ShiftType::Day => self.config.day,
            ShiftType::Night => self.config.night,
            ShiftType::LongDay => self.config.long_day,
        }
    }

    pub fn shift_window(&self, date: NaiveDate, shift_type: ShiftType) -> NicuResult<ShiftWindow> {
        let definition = self.definition(shift_type);
        if definition.duration_hours == 0 {
            return Err(NicuError::InvalidShiftWindow(format!(
                "{shift_type} shift has zero duration"
            )));
        }
        let start = date
            .and_hms_opt(definition.start_hour, 0, 0)
            .ok_or_else(|| {
                NicuError::InvalidShiftWindow(format!(
                    "{shift_type} shift starts at hour {}",
                    definition.start_hour
                ))
            })?
            .and_utc();

        Ok(ShiftWindow {
            shift_type,
            date,
            start,
            end: start + Duration::hours(i64::from(definition.duration_hours)),
        })
    }

    /// The day or night shift that contains `at`.
    pub fn shift_containing(&self, at: DateTime<Utc>) -> NicuResult<ShiftWindow> {
        let date = at.date_naive();
        let day = self.shift_window(date, ShiftType::Day)?;
        if day.contains(at) {
            return Ok(day);
        }
        let night = self.shift_window(date, ShiftType::Night)?;
        if night.contains(at) {
            return Ok(night);
        }
        let previous_night = date.pred_opt().ok_or_else(out_of_range)?;
        let night = self.shift_window(previous_night, ShiftType::Night)?;
        if night.contains(at) {
            return Ok(night);
        }
        Err(NicuError::InvalidShiftWindow(format!(
            "no day or night shift covers {}",
            at.hour()
        )))
    }

    /// Generate the bundle for one shift.
    ///
    /// Each patient's plan is expanded over the generation horizon from
    /// shift start, then narrowed to tasks that fall inside the shift.
    pub fn generate_shift_tasks(
        &self,
        patients: &[Patient],
        care_plans: &[CarePlan],
        prescriptions: &[Prescription],
        shift_type: ShiftType,
        date: NaiveDate,
        generated_by: &str,
    ) -> NicuResult<ShiftTaskBundle> {
        let shift = self.shift_window(date, shift_type)?;
        let shift_id = shift.shift_id();

        let mut tasks_by_patient = BTreeMap::new();
        let mut all_tasks = Vec::new();
        let mut reminders = Vec::new();
        let mut stats = ShiftStats::default();

        for patient in patients {
            let patient_tasks = self.patient_shift_tasks(&patient.id, care_plans, prescriptions, &shift)?;

            reminders.extend(self.reminders_for(&patient_tasks));
            stats.by_patient.insert(patient.id.clone(), patient_tasks.len());
            for task in &patient_tasks {
                *stats.by_type.entry(task.task_type()).or_default() += 1;
                *stats.by_priority.entry(task.priority).or_default() += 1;
            }
            all_tasks.extend(patient_tasks.iter().cloned());
            tasks_by_patient.insert(patient.id.clone(), patient_tasks);
        }

        sort_chronologically(&mut all_tasks);
        stats.total_tasks = all_tasks.len();

        debug!(%shift_id, total = stats.total_tasks, "generated shift bundle");

        Ok(ShiftTaskBundle {
            shift_id,
            shift,
            generated_at: Utc::now(),
            generated_by: generated_by.to_string(),
            tasks_by_patient,
            all_tasks,
            reminders,
            stats,
        })
    }

    /// One patient's tasks for `shift`, windowed and sorted.
    pub fn patient_shift_tasks(
        &self,
        patient_id: &str,
        care_plans: &[CarePlan],
        prescriptions: &[Prescription],
        shift: &ShiftWindow,
    ) -> NicuResult<Vec<NursingTask>> {
        let Some(plan) = active_care_plan(care_plans, patient_id)? else {
            debug!(patient_id, "no active care plan");
            return Ok(Vec::new());
        };

        let approved: Vec<Prescription> = prescriptions
            .iter()
            .filter(|rx| rx.baby_id == patient_id && rx.is_approved())
            .cloned()
            .collect();

        let raw = generate_tasks(plan, &approved, shift.start, self.config.generation_horizon_hours)?;
        let mut tasks: Vec<NursingTask> = raw
            .into_iter()
            .filter(|task| shift.contains(task.scheduled_at))
            .map(|task| self.enhance_task(task, shift))
            .collect();

        sort_chronologically(&mut tasks);
        Ok(tasks)
    }

    fn enhance_task(&self, mut task: NursingTask, shift: &ShiftWindow) -> NursingTask {
        let minutes = Duration::minutes(self.config.task_window_minutes.for_type(task.task_type()));
        task.window = Some(TaskWindow {
            start: (task.scheduled_at - minutes).max(shift.start),
            end: (task.scheduled_at + minutes).min(shift.end),
        });
        task.shift = Some(ShiftRef {
            shift_type: shift.shift_type,
            shift_id: shift.shift_id(),
        });
        task
    }

    /// One "upcoming" reminder per task, ahead by the priority's lead time.
    pub fn reminders_for(&self, tasks: &[NursingTask]) -> Vec<TaskReminder> {
        tasks
            .iter()
            .map(|task| {
                let lead = Duration::minutes(self.config.reminder_lead_minutes.for_priority(task.priority));
                TaskReminder {
                    id: format!("reminder-{}", task.id),
                    task_id: task.id.to_string(),
                    baby_id: task.baby_id.clone(),
                    reminder_type: ReminderType::Upcoming,
                    scheduled_for: task.scheduled_at - lead,
                    message: reminder_message(task, ReminderType::Upcoming),
                    priority: task.priority.into(),
                    dismissed: false,
                }
            })
            .collect()
    }

    /// Classify every task against the ledger at `now`.
    pub fn status_views(
        &self,
        tasks: &[NursingTask],
        ledger: &TaskLedger,
        now: DateTime<Utc>,
    ) -> Vec<TaskView> {
        tasks
            .iter()
            .map(|task| TaskView::classify(task, ledger, now, &self.config))
            .collect()
    }

    /// Consecutive day/night bundles covering at least `hours_ahead` from `from`.
    pub fn pre_generate_upcoming_shifts(
        &self,
        patients: &[Patient],
        care_plans: &[CarePlan],
        prescriptions: &[Prescription],
        generated_by: &str,
        from: DateTime<Utc>,
        hours_ahead: f64,
    ) -> NicuResult<Vec<ShiftTaskBundle>> {
        crate::error::ensure_positive_hours(hours_ahead, "look-ahead")?;

        let mut shift = self.shift_containing(from)?;
        let mut covered = 0.0;
        let mut bundles = Vec::new();

        while covered < hours_ahead {
            bundles.push(self.generate_shift_tasks(
                patients,
                care_plans,
                prescriptions,
                shift.shift_type,
                shift.date,
                generated_by,
            )?);
            covered += shift.duration_hours();
            shift = self.next_shift(&shift)?;
        }

        Ok(bundles)
    }

    /// The day or night shift that follows `shift`.
    pub fn next_shift(&self, shift: &ShiftWindow) -> NicuResult<ShiftWindow> {
        match shift.shift_type {
            ShiftType::Day => self.shift_window(shift.date, ShiftType::Night),
            ShiftType::Night | ShiftType::LongDay => {
                let next = shift.date.succ_opt().ok_or_else(out_of_range)?;
                self.shift_window(next, ShiftType::Day)
            }
        }
    }

    /// The day or night shift that precedes `shift`.
    pub fn previous_shift(&self, shift: &ShiftWindow) -> NicuResult<ShiftWindow> {
        match shift.shift_type {
            ShiftType::Night => self.shift_window(shift.date, ShiftType::Day),
            ShiftType::Day | ShiftType::LongDay => {
                let previous = shift.date.pred_opt().ok_or_else(out_of_range)?;
                self.shift_window(previous, ShiftType::Night)
            }
        }
    }
}

fn out_of_range() -> NicuError {
    NicuError::InvalidShiftWindow("date out of range".to_string())
}

fn sort_chronologically(tasks: &mut [NursingTask]) {
    tasks.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at).then_with(|| a.id.cmp(&b.id)));
}

pub fn reminder_message(task: &NursingTask, reminder_type: ReminderType) -> String {
    let prefix = match reminder_type {
        ReminderType::Upcoming => format!("Due at {}:", task.scheduled_time_of_day),
        ReminderType::DueNow => "Due now:".to_string(),
        ReminderType::Overdue => "OVERDUE:".to_string(),
        ReminderType::WindowClosing => "Window closing:".to_string(),
    };
    format!("{prefix} {}", task.details.describe())
}

/// The subset of `tasks` a role works from.
pub fn filter_tasks_for_role(tasks: &[TaskView], role: Role) -> Vec<TaskView> {
    tasks
        .iter()
        .filter(|view| visible_to(view, role))
        .cloned()
        .collect()
}

fn visible_to(view: &TaskView, role: Role) -> bool {
    let task = &view.task;
    match role {
        Role::Nurse => true,
        Role::Hca => {
            matches!(
                task.task_type(),
                TaskType::VitalSigns | TaskType::PositionChange | TaskType::SkinCare
            ) && task.priority != Priority::Critical
        }
        Role::Doctor | Role::Anp => {
            task.task_type() == TaskType::Medication
                || task.priority == Priority::Critical
                || task.has_flag(TaskFlag::NeedsTwoNurses)
        }
        Role::UnitManager => {
            view.status == TaskStatus::Overdue
                || matches!(task.priority, Priority::Critical | Priority::Urgent)
        }
    }
}

/// Pending tasks scheduled within `[now, now + within_minutes]`. Tasks whose
/// window is already open are due, not upcoming.
pub fn upcoming_tasks(tasks: &[TaskView], now: DateTime<Utc>, within_minutes: i64) -> Vec<TaskView> {
    let cutoff = now + Duration::minutes(within_minutes);
    tasks
        .iter()
        .filter(|view| view.status == TaskStatus::Pending)
        .filter(|view| view.task.scheduled_at >= now && view.task.scheduled_at <= cutoff)
        .cloned()
        .collect()
}

/// Tasks with no outcome whose window (or scheduled time) has passed.
pub fn overdue_tasks(tasks: &[TaskView], now: DateTime<Utc>) -> Vec<TaskView> {
    tasks
        .iter()
        .filter(|view| view.outcome.is_none() && view.task.deadline() < now)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HandoverTasks {
    pub outstanding: Vec<TaskView>,
    pub upcoming: Vec<TaskView>,
}

/// Open work to pass on at handover: anything already scheduled plus the
/// next `upcoming_hours` of tasks.
pub fn handover_tasks(tasks: &[TaskView], now: DateTime<Utc>, upcoming_hours: i64) -> HandoverTasks {
    let horizon = now + Duration::hours(upcoming_hours);
    let mut handover = HandoverTasks::default();
    for view in tasks.iter().filter(|view| !view.status.is_terminal()) {
        if view.task.scheduled_at <= now {
            handover.outstanding.push(view.clone());
        } else if view.task.scheduled_at <= horizon {
            handover.upcoming.push(view.clone());
        }
    }
    handover
}

/// A run of one patient's tasks close enough to handle in a single visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskCluster {
    pub key: String,
    pub baby_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// `"08:00"` or `"08:00-08:30"`.
    pub time_window: String,
    pub tasks: Vec<NursingTask>,
    pub cluster_priority: Priority,
    pub can_be_combined: bool,
}

/// Group each patient's tasks into maximal runs where consecutive tasks are
/// at most `window_minutes` apart.
///
/// Pass the complete per-patient list; clustering an already filtered view
/// yields clusters that silently miss members.
pub fn cluster_tasks(tasks: &[NursingTask], window_minutes: i64) -> Vec<TaskCluster> {
    if window_minutes < 0 {
        warn!(window_minutes, "negative cluster window, every task stands alone");
    }
    let gap = Duration::minutes(window_minutes.max(0));

    let mut by_patient: BTreeMap<&str, Vec<&NursingTask>> = BTreeMap::new();
    for task in tasks {
        by_patient.entry(task.baby_id.as_str()).or_default().push(task);
    }

    let mut clusters = Vec::new();
    for (baby_id, mut patient_tasks) in by_patient {
        patient_tasks.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at).then_with(|| a.id.cmp(&b.id)));

        let mut current: Vec<NursingTask> = Vec::new();
        for task in patient_tasks {
            if let Some(last) = current.last() {
                if task.scheduled_at - last.scheduled_at > gap {
                    clusters.push(build_cluster(baby_id, std::mem::take(&mut current)));
                }
            }
            current.push(task.clone());
        }
        if !current.is_empty() {
            clusters.push(build_cluster(baby_id, current));
        }
    }
    clusters
}

fn build_cluster(baby_id: &str, tasks: Vec<NursingTask>) -> TaskCluster {
    let start = tasks.first().map(|task| task.scheduled_at).unwrap_or_default();
    let end = tasks.last().map(|task| task.scheduled_at).unwrap_or(start);
    let start_label = start.format("%H:%M").to_string();
    let end_label = end.format("%H:%M").to_string();

    TaskCluster {
        key: format!("{baby_id}-{}", start.to_rfc3339()),
        baby_id: baby_id.to_string(),
        start,
        end,
        time_window: if start_label == end_label {
            start_label
        } else {
            format!("{start_label}-{end_label}")
        },
        cluster_priority: tasks
            .iter()
            .map(|task| task.priority)
            .max()
            .unwrap_or(Priority::Routine),
        can_be_combined: tasks.iter().all(|task| {
            matches!(
                task.task_type(),
                TaskType::Feeding | TaskType::Medication | TaskType::VitalSigns
            )
        }),
        tasks,
    }
}
