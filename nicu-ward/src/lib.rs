//! Ward document (JSON) to per-patient shift summary.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use nicu_core::alerts::{active_alerts_for, Alert};
use nicu_core::compliance::{
    calculate_24hr_compliance, is_weigh_day, next_weigh_day, FeedingCompliance,
};
use nicu_core::discharge::{
    assess_readiness, generate_summary, DischargeCriteria, DischargeReadinessSummary,
};
use nicu_core::episodes::{calculate_episode_free_days, create_shift_log, Episode, EpisodeLog};
use nicu_core::model::{
    active_care_plan, CarePlan, FeedingRecord, GestationalAge, LineRecord, Patient, Prescription,
    TubeRecord,
};
use nicu_core::screening::{patient_reminders, ScreeningReminder};
use nicu_core::shift::{
    cluster_tasks, filter_tasks_for_role, Role, ShiftTaskBundle, ShiftTaskService, ShiftType,
    ShiftWindow, TaskCluster,
};
use nicu_core::task::{TaskId, TaskLedger, TaskOutcome, TaskSummary, TaskView};
use nicu_core::{ClinicalRecords, NicuError, NicuResult, UnitConfig};

/// Minimum days of completed shifts summarised for the episode-free count.
const EPISODE_HISTORY_DAYS: usize = 7;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightRecord {
    pub baby_id: String,
    pub weighed_at: DateTime<Utc>,
    pub grams: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordedOutcome {
    pub task_id: TaskId,
    #[serde(flatten)]
    pub outcome: TaskOutcome,
}

/// Everything the unit knows about its current patients.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WardSnapshot {
    pub patients: Vec<Patient>,
    pub care_plans: Vec<CarePlan>,
    pub prescriptions: Vec<Prescription>,
    pub feeds: Vec<FeedingRecord>,
    pub episodes: Vec<Episode>,
    pub weights: Vec<WeightRecord>,
    /// Current support by patient id; absent means self-ventilating in air.
    pub respiratory_support: BTreeMap<String, String>,
    pub lines: Vec<LineRecord>,
    pub tubes: Vec<TubeRecord>,
    pub task_outcomes: Vec<RecordedOutcome>,
}

impl WardSnapshot {
    pub fn from_json_str(json: &str) -> NicuResult<Self> {
        serde_json::from_str(json).map_err(|err| NicuError::Parse(err.to_string()))
    }

    pub fn from_json_value(value: &Value) -> NicuResult<Self> {
        Self::deserialize(value).map_err(|err| NicuError::Parse(err.to_string()))
    }

    /// Replay recorded outcomes into a ledger. A task closed twice is rejected.
    pub fn ledger(&self) -> NicuResult<TaskLedger> {
        let mut ledger = TaskLedger::new();
        for recorded in &self.task_outcomes {
            ledger.record(recorded.task_id.clone(), recorded.outcome.clone())?;
        }
        Ok(ledger)
    }

    fn for_patient<T: Clone>(items: &[T], patient_id: &str, owner: impl Fn(&T) -> &str) -> Vec<T> {
        items
            .iter()
            .filter(|item| owner(item) == patient_id)
            .cloned()
            .collect()
    }
}

impl ClinicalRecords for WardSnapshot {
    fn patients(&self) -> &[Patient] {
        &self.patients
    }

    fn care_plans(&self, patient_id: &str) -> Vec<CarePlan> {
        Self::for_patient(&self.care_plans, patient_id, |plan| &plan.baby_id)
    }

    fn prescriptions(&self, patient_id: &str) -> Vec<Prescription> {
        Self::for_patient(&self.prescriptions, patient_id, |rx| &rx.baby_id)
    }

    fn feeds(&self, patient_id: &str) -> Vec<FeedingRecord> {
        Self::for_patient(&self.feeds, patient_id, |feed| &feed.baby_id)
    }

    fn episodes(&self, patient_id: &str) -> Vec<Episode> {
        Self::for_patient(&self.episodes, patient_id, |episode| &episode.baby_id)
    }

    fn current_weight(&self, patient_id: &str) -> Option<f64> {
        self.weights
            .iter()
            .filter(|weight| weight.baby_id == patient_id)
            .max_by_key(|weight| weight.weighed_at)
            .map(|weight| weight.grams)
    }

    fn respiratory_support(&self, patient_id: &str) -> Option<String> {
        self.respiratory_support.get(patient_id).cloned()
    }

    fn lines(&self, patient_id: &str) -> Vec<LineRecord> {
        Self::for_patient(&self.lines, patient_id, |line| &line.baby_id)
    }

    fn tubes(&self, patient_id: &str) -> Vec<TubeRecord> {
        Self::for_patient(&self.tubes, patient_id, |tube| &tube.baby_id)
    }
}

/// Which shift to summarise, for whom, and as of when.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WardRequest {
    pub shift_type: ShiftType,
    pub date: NaiveDate,
    pub actor: String,
    pub now: DateTime<Utc>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default = "default_cluster_window")]
    pub cluster_window_minutes: i64,
}

fn default_cluster_window() -> i64 {
    30
}

impl WardRequest {
    pub fn new(shift_type: ShiftType, date: NaiveDate, actor: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            shift_type,
            date,
            actor: actor.into(),
            now,
            role: None,
            cluster_window_minutes: default_cluster_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientSummary {
    pub patient: Patient,
    pub day_of_life: i64,
    pub corrected_age: GestationalAge,
    /// Status views, filtered to the request's role when one is given.
    pub tasks: Vec<TaskView>,
    pub task_summary: TaskSummary,
    /// Built from the patient's complete task list.
    pub care_rounds: Vec<TaskCluster>,
    pub feeding: FeedingCompliance,
    pub current_shift_log: EpisodeLog,
    /// Completed shifts before the requested one, newest first.
    pub recent_shift_logs: Vec<EpisodeLog>,
    /// Counted from the requested shift when it already has episodes,
    /// otherwise from the last completed shift.
    pub episode_free_days: f64,
    pub current_weight: Option<f64>,
    pub discharge: Option<DischargeCriteria>,
    pub discharge_summary: Option<DischargeReadinessSummary>,
    pub alerts: Vec<Alert>,
    pub screening: Vec<ScreeningReminder>,
    pub weigh_day: bool,
    pub next_weigh_day: Option<NaiveDate>,
}

/// A patient left out of the summary and why.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedPatient {
    pub patient_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WardSummary {
    pub unit_name: String,
    pub bundle: ShiftTaskBundle,
    pub patients: Vec<PatientSummary>,
    /// Patients whose records could not be summarised, e.g. two active plans.
    #[serde(default)]
    pub skipped: Vec<SkippedPatient>,
}

/// Summarise a ward document from a JSON string.
pub fn summarize_ward_str(
    ward_json: &str,
    config: &UnitConfig,
    request: &WardRequest,
) -> NicuResult<WardSummary> {
    let snapshot = WardSnapshot::from_json_str(ward_json)?;
    summarize_ward(&snapshot, &snapshot.ledger()?, config, request)
}

/// Summarise a ward document from a `serde_json::Value`.
pub fn summarize_ward_value(
    ward: &Value,
    config: &UnitConfig,
    request: &WardRequest,
) -> NicuResult<WardSummary> {
    if !ward.is_object() {
        return Err(NicuError::MissingData);
    }
    let snapshot = WardSnapshot::from_json_value(ward)?;
    summarize_ward(&snapshot, &snapshot.ledger()?, config, request)
}

/// Summarise any clinical data provider for one shift, classifying tasks
/// against `ledger`.
pub fn summarize_ward<R: ClinicalRecords>(
    records: &R,
    ledger: &TaskLedger,
    config: &UnitConfig,
    request: &WardRequest,
) -> NicuResult<WardSummary> {
    let service = ShiftTaskService::new(config.shifts.clone());

    let mut patients = Vec::new();
    let mut skipped = Vec::new();
    for patient in records.patients() {
        match active_care_plan(&records.care_plans(&patient.id), &patient.id) {
            Ok(_) => patients.push(patient.clone()),
            Err(err @ NicuError::ConflictingCarePlans { .. }) => {
                warn!(patient_id = %patient.id, %err, "skipping patient");
                skipped.push(SkippedPatient {
                    patient_id: patient.id.clone(),
                    reason: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    let care_plans: Vec<CarePlan> = patients
        .iter()
        .flat_map(|patient| records.care_plans(&patient.id))
        .collect();
    let prescriptions: Vec<Prescription> = patients
        .iter()
        .flat_map(|patient| records.prescriptions(&patient.id))
        .collect();

    let bundle = service.generate_shift_tasks(
        &patients,
        &care_plans,
        &prescriptions,
        request.shift_type,
        request.date,
        &request.actor,
    )?;
    let summaries = patients
        .iter()
        .map(|patient| summarize_patient(records, patient, &bundle, ledger, &service, config, request))
        .collect::<NicuResult<Vec<_>>>()?;

    debug!(
        shift_id = %bundle.shift_id,
        patients = summaries.len(),
        tasks = bundle.stats.total_tasks,
        "ward summary ready"
    );

    Ok(WardSummary {
        unit_name: config.unit_name.clone(),
        bundle,
        patients: summaries,
        skipped,
    })
}

fn summarize_patient<R: ClinicalRecords>(
    records: &R,
    patient: &Patient,
    bundle: &ShiftTaskBundle,
    ledger: &TaskLedger,
    service: &ShiftTaskService,
    config: &UnitConfig,
    request: &WardRequest,
) -> NicuResult<PatientSummary> {
    let now = request.now;
    let today = now.date_naive();
    let patient_id = patient.id.as_str();

    let tasks = bundle
        .tasks_by_patient
        .get(patient_id)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let views = service.status_views(tasks, ledger, now);
    let task_summary = TaskSummary::from_views(&views);
    let views = match request.role {
        Some(role) => filter_tasks_for_role(&views, role),
        None => views,
    };

    let plans = records.care_plans(patient_id);
    let plan = active_care_plan(&plans, patient_id)?;
    let feeding = calculate_24hr_compliance(patient_id, &records.feeds(patient_id), plan, now, config)?;

    let episodes = records.episodes(patient_id);
    let current_shift_log = shift_log(patient_id, &episodes, &bundle.shift, config)?;
    let recent_shift_logs = recent_shift_logs(patient, &episodes, &bundle.shift, service, config)?;

    // Episodes already charted this shift end the run immediately.
    let mut episode_history = Vec::with_capacity(recent_shift_logs.len() + 1);
    if current_shift_log.summary.total_episodes > 0 {
        episode_history.push(current_shift_log.clone());
    }
    episode_history.extend(recent_shift_logs.iter().cloned());
    let episode_free_days = calculate_episode_free_days(&episode_history);

    let current_weight = records.current_weight(patient_id);
    let support = records.respiratory_support(patient_id);
    let discharge = match current_weight {
        Some(weight) => Some(assess_readiness(
            patient,
            weight,
            &feeding,
            &episode_history,
            support.as_deref(),
            &config.discharge,
            now,
        )),
        None => {
            warn!(patient_id, "no recorded weight, skipping discharge assessment");
            None
        }
    };
    let discharge_summary = discharge.as_ref().map(generate_summary);

    Ok(PatientSummary {
        patient: patient.clone(),
        day_of_life: patient.age_in_days(today),
        corrected_age: patient.corrected_age(today),
        tasks: views,
        task_summary,
        care_rounds: cluster_tasks(tasks, request.cluster_window_minutes),
        feeding,
        current_shift_log,
        recent_shift_logs,
        episode_free_days,
        current_weight,
        discharge,
        discharge_summary,
        alerts: active_alerts_for(
            patient_id,
            &records.lines(patient_id),
            &records.tubes(patient_id),
            now,
            config,
        ),
        screening: patient_reminders(patient, today, &config.screening),
        weigh_day: is_weigh_day(today, &config.feeding),
        next_weigh_day: next_weigh_day(today, &config.feeding),
    })
}

fn shift_log(
    patient_id: &str,
    episodes: &[Episode],
    shift: &ShiftWindow,
    config: &UnitConfig,
) -> NicuResult<EpisodeLog> {
    let in_shift: Vec<Episode> = episodes
        .iter()
        .filter(|episode| shift.contains(episode.timestamp))
        .cloned()
        .collect();
    create_shift_log(
        patient_id,
        shift.shift_type,
        &in_shift,
        shift.start,
        shift.end,
        &config.episodes,
    )
}

/// Day and night logs walking back from the shift before `current`,
/// stopping at the date of birth.
fn recent_shift_logs(
    patient: &Patient,
    episodes: &[Episode],
    current: &ShiftWindow,
    service: &ShiftTaskService,
    config: &UnitConfig,
) -> NicuResult<Vec<EpisodeLog>> {
    let limit = history_shift_count(config);
    let mut logs = Vec::new();
    let mut shift = service.previous_shift(current)?;
    while logs.len() < limit && shift.date >= patient.date_of_birth {
        logs.push(shift_log(&patient.id, episodes, &shift, config)?);
        shift = service.previous_shift(&shift)?;
    }
    Ok(logs)
}

/// Enough day and night shifts to reach the longest configured episode-free
/// requirement, plus one day.
fn history_shift_count(config: &UnitConfig) -> usize {
    let required = config
        .discharge
        .required_episode_free_days
        .max(config.episodes.discharge_episode_free_days);
    let days = if required.is_finite() && required > 0.0 {
        required.ceil() as usize + 1
    } else {
        0
    };
    days.max(EPISODE_HISTORY_DAYS) * 2
}
