//! Apnoea, bradycardia and desaturation tracking.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EpisodeThresholds;
use crate::error::{NicuError, NicuResult};
use crate::shift::ShiftType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeType {
    Apnoea,
    Bradycardia,
    Desaturation,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeSeverity {
    Mild,
    #[default]
    Moderate,
    Severe,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Intervention {
    NoneSelfResolved,
    GentleStimulation,
    VigorousStimulation,
    Suction,
    Repositioning,
    IncreasedOxygen,
    BagMaskVentilation,
    CpapAdjustment,
    Other,
}

impl Intervention {
    pub fn is_stimulation(self) -> bool {
        matches!(
            self,
            Intervention::GentleStimulation | Intervention::VigorousStimulation
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Episode {
    pub id: String,
    pub baby_id: String,
    pub timestamp: DateTime<Utc>,
    pub episode_type: EpisodeType,
    #[serde(default)]
    pub severity: EpisodeSeverity,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    /// Lowest heart rate or saturation reached.
    #[serde(default)]
    pub lowest_value: Option<f64>,
    pub self_resolved: bool,
    #[serde(default)]
    pub interventions: Vec<Intervention>,
    #[serde(default)]
    pub activity_at_time: Option<String>,
    #[serde(default)]
    pub respiratory_support: Option<String>,
    #[serde(default)]
    pub recorded_by: Option<String>,
}

/// Bedside details captured when logging an episode.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EpisodeDetails {
    pub severity: Option<EpisodeSeverity>,
    pub duration_seconds: Option<u32>,
    pub lowest_value: Option<f64>,
    pub interventions: Vec<Intervention>,
    /// Defaults to self-resolved when not stated.
    pub self_resolved: Option<bool>,
    pub activity_at_time: Option<String>,
    pub respiratory_support: Option<String>,
    pub recorded_by: String,
}

pub fn log_episode(
    baby_id: &str,
    episode_type: EpisodeType,
    timestamp: DateTime<Utc>,
    details: EpisodeDetails,
) -> Episode {
    let self_resolved = details.self_resolved.unwrap_or(true);
    Episode {
        id: format!("episode-{baby_id}-{}", timestamp.timestamp_millis()),
        baby_id: baby_id.to_string(),
        timestamp,
        episode_type,
        severity: details.severity.unwrap_or_default(),
        duration_seconds: details.duration_seconds,
        lowest_value: details.lowest_value,
        self_resolved,
        interventions: if self_resolved {
            vec![Intervention::NoneSelfResolved]
        } else {
            details.interventions
        },
        activity_at_time: details.activity_at_time,
        respiratory_support: details.respiratory_support,
        recorded_by: Some(details.recorded_by),
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct EpisodeSummary {
    pub total_episodes: usize,
    pub apnoea_count: usize,
    pub bradycardia_count: usize,
    pub desaturation_count: usize,
    pub self_resolved_count: usize,
    pub stimulation_count: usize,
    pub oxygen_increase_count: usize,
    pub bagging_count: usize,
    /// One decimal place.
    pub episodes_per_hour: f64,
    /// Percent needing intervention, one decimal place.
    pub intervention_rate: f64,
}

/// All episodes for one patient in one shift.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeLog {
    pub id: String,
    pub baby_id: String,
    pub shift: ShiftType,
    pub shift_start: DateTime<Utc>,
    pub shift_end: DateTime<Utc>,
    pub apnoeas: Vec<Episode>,
    pub bradycardias: Vec<Episode>,
    pub desaturations: Vec<Episode>,
    pub summary: EpisodeSummary,
    pub clinically_significant: bool,
    pub escalated_to_medical_team: bool,
    pub flagged_for_handover: bool,
}

pub fn create_shift_log(
    baby_id: &str,
    shift: ShiftType,
    episodes: &[Episode],
    shift_start: DateTime<Utc>,
    shift_end: DateTime<Utc>,
    thresholds: &EpisodeThresholds,
) -> NicuResult<EpisodeLog> {
    if shift_end <= shift_start {
        return Err(NicuError::InvalidShiftWindow(format!(
            "shift ends at {shift_end} before it starts at {shift_start}"
        )));
    }

    let of_type = |kind: EpisodeType| -> Vec<Episode> {
        episodes
            .iter()
            .filter(|episode| episode.episode_type == kind)
            .cloned()
            .collect()
    };
    let apnoeas = of_type(EpisodeType::Apnoea);
    let bradycardias = of_type(EpisodeType::Bradycardia);
    let desaturations = of_type(EpisodeType::Desaturation);

    let total = episodes.len();
    let self_resolved_count = episodes.iter().filter(|episode| episode.self_resolved).count();
    let count_with = |predicate: fn(&Intervention) -> bool| {
        episodes
            .iter()
            .filter(|episode| episode.interventions.iter().any(predicate))
            .count()
    };

    let duration_hours = (shift_end - shift_start).num_seconds() as f64 / 3600.0;
    let episodes_per_hour = total as f64 / duration_hours;
    let intervention_rate = if total > 0 {
        (total - self_resolved_count) as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    let clinically_significant =
        total > thresholds.episodes_per_shift || intervention_rate > thresholds.intervention_rate;

    Ok(EpisodeLog {
        id: format!("episode-log-{baby_id}-{}", shift_start.timestamp_millis()),
        baby_id: baby_id.to_string(),
        shift,
        shift_start,
        shift_end,
        summary: EpisodeSummary {
            total_episodes: total,
            apnoea_count: apnoeas.len(),
            bradycardia_count: bradycardias.len(),
            desaturation_count: desaturations.len(),
            self_resolved_count,
            stimulation_count: count_with(|i| i.is_stimulation()),
            oxygen_increase_count: count_with(|i| *i == Intervention::IncreasedOxygen),
            bagging_count: count_with(|i| *i == Intervention::BagMaskVentilation),
            episodes_per_hour: round_one_decimal(episodes_per_hour),
            intervention_rate: round_one_decimal(intervention_rate),
        },
        apnoeas,
        bradycardias,
        desaturations,
        clinically_significant,
        escalated_to_medical_team: false,
        flagged_for_handover: clinically_significant,
    })
}

/// Live counters for the bedside widget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpisodeCounterState {
    pub baby_id: String,
    pub current_shift: ShiftType,
    pub apnoea_count: usize,
    pub bradycardia_count: usize,
    pub desaturation_count: usize,
    pub last_apnoea: Option<DateTime<Utc>>,
    pub last_bradycardia: Option<DateTime<Utc>>,
    pub last_desaturation: Option<DateTime<Utc>>,
    /// Newest first, at most five.
    pub recent_episodes: Vec<Episode>,
    pub self_resolved_percentage: u32,
    pub requires_review: bool,
}

pub fn counter_state(
    baby_id: &str,
    shift: ShiftType,
    episodes: &[Episode],
    thresholds: &EpisodeThresholds,
) -> EpisodeCounterState {
    let mut newest_first: Vec<Episode> = episodes.to_vec();
    newest_first.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let count = |kind| episodes.iter().filter(|e| e.episode_type == kind).count();
    let last = |kind| {
        newest_first
            .iter()
            .find(|e| e.episode_type == kind)
            .map(|e| e.timestamp)
    };

    let self_resolved = episodes.iter().filter(|e| e.self_resolved).count();
    let self_resolved_percentage = if episodes.is_empty() {
        100
    } else {
        (self_resolved as f64 / episodes.len() as f64 * 100.0).round() as u32
    };

    EpisodeCounterState {
        baby_id: baby_id.to_string(),
        current_shift: shift,
        apnoea_count: count(EpisodeType::Apnoea),
        bradycardia_count: count(EpisodeType::Bradycardia),
        desaturation_count: count(EpisodeType::Desaturation),
        last_apnoea: last(EpisodeType::Apnoea),
        last_bradycardia: last(EpisodeType::Bradycardia),
        last_desaturation: last(EpisodeType::Desaturation),
        recent_episodes: newest_first.into_iter().take(5).collect(),
        self_resolved_percentage,
        requires_review: episodes.len() > thresholds.episodes_per_shift,
    }
}

/// Whether the hourly rate rose by more than the configured trend.
pub fn is_rate_increasing(
    current: &EpisodeLog,
    previous: Option<&EpisodeLog>,
    thresholds: &EpisodeThresholds,
) -> bool {
    let Some(previous) = previous else {
        return false;
    };
    let current_rate = current.summary.episodes_per_hour;
    let previous_rate = previous.summary.episodes_per_hour;
    if previous_rate == 0.0 {
        return current_rate > 0.0;
    }
    (current_rate - previous_rate) / previous_rate * 100.0 > thresholds.increase_trend
}

/// Half a day per consecutive episode-free shift, newest first.
///
/// The walk stops at the first shift with episodes or at a gap of more
/// than one calendar day between shift start dates. Two shifts per day is
/// assumed; see [`episode_free_duration`] for a timestamp-based measure.
pub fn calculate_episode_free_days(logs: &[EpisodeLog]) -> f64 {
    let mut newest_first: Vec<&EpisodeLog> = logs.iter().collect();
    newest_first.sort_by(|a, b| b.shift_start.cmp(&a.shift_start));

    let mut days = 0.0;
    let mut previous_date: Option<NaiveDate> = None;
    for log in newest_first {
        let date = log.shift_start.date_naive();
        if let Some(previous) = previous_date {
            if (previous - date).num_days() > 1 {
                break;
            }
        }
        previous_date = Some(date);

        if log.summary.total_episodes > 0 {
            break;
        }
        days += 0.5;
    }
    days
}

/// Length of the most recent contiguous run of episode-free shifts,
/// measured from the logs' own start and end times.
pub fn episode_free_duration(logs: &[EpisodeLog]) -> Duration {
    let mut newest_first: Vec<&EpisodeLog> = logs.iter().collect();
    newest_first.sort_by(|a, b| b.shift_start.cmp(&a.shift_start));

    let mut covered = Duration::zero();
    let mut newer_start: Option<DateTime<Utc>> = None;
    for log in newest_first {
        if log.summary.total_episodes > 0 {
            break;
        }
        if let Some(newer_start) = newer_start {
            if log.shift_end < newer_start {
                break;
            }
        }
        let span_end = newer_start.map_or(log.shift_end, |start| log.shift_end.min(start));
        covered = covered + (span_end - log.shift_start);
        newer_start = Some(log.shift_start);
    }
    covered
}

pub fn meets_discharge_criteria(logs: &[EpisodeLog], thresholds: &EpisodeThresholds) -> bool {
    calculate_episode_free_days(logs) >= thresholds.discharge_episode_free_days
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
