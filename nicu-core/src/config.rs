//! Unit-configurable thresholds consumed by every calculator.
//!
//! Each section derives `Default` with the unit defaults and is marked
//! `#[serde(default)]`, so a JSON override only needs the keys it changes.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::model::{LineType, TubeType};
use crate::task::{Priority, TaskType};

/// Full configuration for one neonatal unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UnitConfig {
    pub unit_id: String,
    pub unit_name: String,
    pub feeding: FeedingDefaults,
    pub ng_removal: NgRemovalCriteria,
    pub discharge: DischargeGates,
    pub episodes: EpisodeThresholds,
    pub shifts: ShiftConfig,
    pub line_thresholds: Vec<LineAlertThreshold>,
    pub tube_thresholds: Vec<TubeAlertThreshold>,
    pub screening: ScreeningSettings,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            unit_id: "default".to_string(),
            unit_name: "Default NICU".to_string(),
            feeding: FeedingDefaults::default(),
            ng_removal: NgRemovalCriteria::default(),
            discharge: DischargeGates::default(),
            episodes: EpisodeThresholds::default(),
            shifts: ShiftConfig::default(),
            line_thresholds: default_line_thresholds(),
            tube_thresholds: default_tube_thresholds(),
            screening: ScreeningSettings::default(),
        }
    }
}

impl UnitConfig {
    pub fn line_threshold(&self, line_type: LineType) -> Option<&LineAlertThreshold> {
        self.line_thresholds
            .iter()
            .find(|threshold| threshold.line_type == line_type)
    }

    pub fn tube_threshold(&self, tube_type: TubeType) -> Option<&TubeAlertThreshold> {
        self.tube_thresholds
            .iter()
            .find(|threshold| threshold.tube_type == tube_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedingDefaults {
    /// Daily volume used by the weight-based feed calculator.
    pub standard_volume_ml_per_kg_per_day: f64,
    pub weigh_days: Vec<Weekday>,
    /// Frequency assumed when no feeding plan is available.
    pub default_frequency_hours: f64,
}

impl Default for FeedingDefaults {
    fn default() -> Self {
        Self {
            standard_volume_ml_per_kg_per_day: 150.0,
            weigh_days: vec![Weekday::Wed, Weekday::Sat],
            default_frequency_hours: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NgRemovalCriteria {
    /// Minimum oral share of each feed, in percent.
    pub oral_percentage_threshold: f64,
    pub consecutive_hours: f64,
    pub allow_ng_top_ups: bool,
    pub minimum_consecutive_feeds: usize,
}

impl Default for NgRemovalCriteria {
    fn default() -> Self {
        Self {
            oral_percentage_threshold: 95.0,
            consecutive_hours: 24.0,
            allow_ng_top_ups: false,
            minimum_consecutive_feeds: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DischargeGates {
    pub weight_gate_enabled: bool,
    pub minimum_weight_grams: f64,
    pub respiratory_gate_enabled: bool,
    pub required_episode_free_days: f64,
    pub feeding_gate_enabled: bool,
    pub oral_percentage_target: f64,
}

impl Default for DischargeGates {
    fn default() -> Self {
        Self {
            weight_gate_enabled: true,
            minimum_weight_grams: 1800.0,
            respiratory_gate_enabled: true,
            required_episode_free_days: 5.0,
            feeding_gate_enabled: true,
            oral_percentage_target: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EpisodeThresholds {
    pub episodes_per_shift: usize,
    /// Percent of episodes needing intervention.
    pub intervention_rate: f64,
    /// Percent increase in hourly rate versus the previous shift.
    pub increase_trend: f64,
    pub discharge_episode_free_days: f64,
}

impl Default for EpisodeThresholds {
    fn default() -> Self {
        Self {
            episodes_per_shift: 10,
            intervention_rate: 30.0,
            increase_trend: 50.0,
            discharge_episode_free_days: 5.0,
        }
    }
}

/// Wall-clock start and length of one shift pattern.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShiftDefinition {
    pub start_hour: u32,
    pub duration_hours: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShiftConfig {
    pub day: ShiftDefinition,
    pub night: ShiftDefinition,
    pub long_day: ShiftDefinition,
    pub reminder_lead_minutes: ReminderLeadTimes,
    pub task_window_minutes: TaskWindowMinutes,
    /// Used for tasks that carry no explicit window.
    pub due_lead_minutes: i64,
    pub overdue_grace_minutes: i64,
    pub generation_horizon_hours: f64,
}

impl Default for ShiftConfig {
    fn default() -> Self {
        Self {
            day: ShiftDefinition {
                start_hour: 8,
                duration_hours: 12,
            },
            night: ShiftDefinition {
                start_hour: 20,
                duration_hours: 12,
            },
            long_day: ShiftDefinition {
                start_hour: 7,
                duration_hours: 14,
            },
            reminder_lead_minutes: ReminderLeadTimes::default(),
            task_window_minutes: TaskWindowMinutes::default(),
            due_lead_minutes: 30,
            overdue_grace_minutes: 15,
            generation_horizon_hours: 24.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReminderLeadTimes {
    pub routine: i64,
    pub important: i64,
    pub urgent: i64,
    pub critical: i64,
}

impl Default for ReminderLeadTimes {
    fn default() -> Self {
        Self {
            routine: 15,
            important: 30,
            urgent: 45,
            critical: 60,
        }
    }
}

impl ReminderLeadTimes {
    pub fn for_priority(&self, priority: Priority) -> i64 {
        match priority {
            Priority::Routine => self.routine,
            Priority::Important => self.important,
            Priority::Urgent => self.urgent,
            Priority::Critical => self.critical,
        }
    }
}

/// Minutes either side of the scheduled time a task may be performed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TaskWindowMinutes {
    pub feeding: i64,
    pub medication: i64,
    pub vital_signs: i64,
    pub procedure: i64,
    pub other: i64,
}

impl Default for TaskWindowMinutes {
    fn default() -> Self {
        Self {
            feeding: 30,
            medication: 30,
            vital_signs: 30,
            procedure: 60,
            other: 30,
        }
    }
}

impl TaskWindowMinutes {
    pub fn for_type(&self, task_type: TaskType) -> i64 {
        match task_type {
            TaskType::Feeding => self.feeding,
            TaskType::Medication => self.medication,
            TaskType::VitalSigns => self.vital_signs,
            TaskType::Procedure => self.procedure,
            TaskType::Assessment
            | TaskType::PositionChange
            | TaskType::SkinCare
            | TaskType::LineCare => self.other,
        }
    }
}

/// A dwell-time limit expressed in the unit clinicians use for it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum DwellLimit {
    Hours(f64),
    Days(f64),
}

impl DwellLimit {
    pub fn as_hours(&self) -> f64 {
        match *self {
            DwellLimit::Hours(hours) => hours,
            DwellLimit::Days(days) => days * 24.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineAlertThreshold {
    pub line_type: LineType,
    pub warning: DwellLimit,
    pub critical: DwellLimit,
    pub maintenance_check: DwellLimit,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TubeAlertThreshold {
    pub tube_type: TubeType,
    pub change_after: DwellLimit,
    pub position_check: DwellLimit,
    pub ph_warning: f64,
    pub ph_critical: f64,
}

fn default_line_thresholds() -> Vec<LineAlertThreshold> {
    use DwellLimit::{Days, Hours};

    let row = |line_type, warning, critical, maintenance_check| LineAlertThreshold {
        line_type,
        warning,
        critical,
        maintenance_check,
    };

    vec![
        row(LineType::PeripheralIv, Hours(48.0), Hours(72.0), Hours(4.0)),
        row(LineType::Picc, Days(10.0), Days(14.0), Hours(24.0)),
        row(LineType::Uac, Days(5.0), Days(7.0), Hours(6.0)),
        row(LineType::Uvc, Days(5.0), Days(7.0), Hours(6.0)),
        row(LineType::LongLine, Days(21.0), Days(28.0), Hours(24.0)),
        row(LineType::FemoralLine, Days(3.0), Days(5.0), Hours(12.0)),
    ]
}

fn default_tube_thresholds() -> Vec<TubeAlertThreshold> {
    [TubeType::Ng, TubeType::Og]
        .into_iter()
        .map(|tube_type| TubeAlertThreshold {
            tube_type,
            change_after: DwellLimit::Days(3.0),
            position_check: DwellLimit::Hours(4.0),
            ph_warning: 5.5,
            ph_critical: 6.0,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScreeningSettings {
    pub nbbs_day_of_life: i64,
    pub nbbs_reminder_days_before: i64,
    pub nbbs_escalate_after_days: i64,
    pub nbbs_repeat_day_of_life: i64,
    pub nbbs_repeat_reminder_days_before: i64,
    /// Babies born before this many weeks get the preterm schedules.
    pub preterm_gestation_weeks: u32,
    pub rop_birth_weight_grams: f64,
    pub rop_start_weeks: u32,
    pub rop_end_weeks: u32,
    pub swab_day: Weekday,
    pub swab_types: Vec<String>,
    pub cranial_uss_days: Vec<i64>,
    pub hearing_min_day_of_life: i64,
}

impl Default for ScreeningSettings {
    fn default() -> Self {
        Self {
            nbbs_day_of_life: 5,
            nbbs_reminder_days_before: 1,
            nbbs_escalate_after_days: 2,
            nbbs_repeat_day_of_life: 28,
            nbbs_repeat_reminder_days_before: 3,
            preterm_gestation_weeks: 32,
            rop_birth_weight_grams: 1500.0,
            rop_start_weeks: 30,
            rop_end_weeks: 36,
            swab_day: Weekday::Mon,
            swab_types: vec!["MRSA".to_string(), "CRO".to_string()],
            cranial_uss_days: vec![1, 7, 28],
            hearing_min_day_of_life: 5,
        }
    }
}
