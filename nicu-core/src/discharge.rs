//! Three-gate discharge readiness.
//!
//! The assessment is recomputed from scratch on every call, so a gate that
//! was met yesterday drops out as soon as its inputs regress.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::compliance::FeedingCompliance;
use crate::config::DischargeGates;
use crate::episodes::{calculate_episode_free_days, EpisodeLog};
use crate::model::Patient;

const TOTAL_GATES: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessStatus {
    NotReady,
    Approaching,
    Ready,
}

impl ReadinessStatus {
    pub fn from_gates_met(gates_met: usize) -> Self {
        match gates_met {
            n if n >= TOTAL_GATES => ReadinessStatus::Ready,
            2 => ReadinessStatus::Approaching,
            _ => ReadinessStatus::NotReady,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DischargeGate {
    Weight,
    Respiratory,
    Feeding,
}

impl fmt::Display for DischargeGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DischargeGate::Weight => "weight",
            DischargeGate::Respiratory => "respiratory",
            DischargeGate::Feeding => "feeding",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightCriterion {
    pub required: bool,
    pub met: bool,
    pub current_weight: f64,
    pub target_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RespiratoryCriterion {
    pub required: bool,
    pub met: bool,
    pub no_respiratory_support: bool,
    pub current_support: Option<String>,
    pub episode_free_for_days: f64,
    pub required_episode_free_days: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedingCriterion {
    pub required: bool,
    pub met: bool,
    pub full_oral_feeds: bool,
    pub oral_percentage: f64,
    pub target_oral_percentage: f64,
    pub ng_removal_ready: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DischargeCriteria {
    pub id: String,
    pub baby_id: String,
    pub assessed_at: DateTime<Utc>,
    pub assessed_by: String,
    pub overall_status: ReadinessStatus,
    /// Whole percent of gates met.
    pub readiness_score: u32,
    pub weight_criterion: WeightCriterion,
    pub respiratory_criterion: RespiratoryCriterion,
    pub feeding_criterion: FeedingCriterion,
    /// Unmet gates, in weight, respiratory, feeding order.
    pub current_blockers: Vec<DischargeGate>,
}

impl DischargeCriteria {
    pub fn gates_met(&self) -> usize {
        [
            self.weight_criterion.met,
            self.respiratory_criterion.met,
            self.feeding_criterion.met,
        ]
        .into_iter()
        .filter(|met| *met)
        .count()
    }
}

/// Evaluate the weight, respiratory and feeding gates.
///
/// A gate switched off in `gates` is reported as not required and met.
/// `respiratory_support` is `None` when the baby is self-ventilating in air;
/// an empty string is treated the same way.
pub fn assess_readiness(
    patient: &Patient,
    current_weight: f64,
    feed_compliance: &FeedingCompliance,
    episode_logs: &[EpisodeLog],
    respiratory_support: Option<&str>,
    gates: &DischargeGates,
    now: DateTime<Utc>,
) -> DischargeCriteria {
    let support = respiratory_support
        .map(str::trim)
        .filter(|support| !support.is_empty());

    let weight_met = current_weight >= gates.minimum_weight_grams;

    let episode_free_days = calculate_episode_free_days(episode_logs);
    let respiratory_met =
        support.is_none() && episode_free_days >= gates.required_episode_free_days;

    let oral_percentage = feed_compliance.oral_percentage;
    let ng_ready = feed_compliance.ng_removal_readiness.ready;
    let feeding_met = oral_percentage >= gates.oral_percentage_target && ng_ready;

    let weight_criterion = WeightCriterion {
        required: gates.weight_gate_enabled,
        met: weight_met || !gates.weight_gate_enabled,
        current_weight,
        target_weight: gates.minimum_weight_grams,
    };
    let respiratory_criterion = RespiratoryCriterion {
        required: gates.respiratory_gate_enabled,
        met: respiratory_met || !gates.respiratory_gate_enabled,
        no_respiratory_support: support.is_none(),
        current_support: support.map(str::to_string),
        episode_free_for_days: episode_free_days,
        required_episode_free_days: gates.required_episode_free_days,
    };
    let feeding_criterion = FeedingCriterion {
        required: gates.feeding_gate_enabled,
        met: feeding_met || !gates.feeding_gate_enabled,
        full_oral_feeds: oral_percentage >= 100.0,
        oral_percentage,
        target_oral_percentage: gates.oral_percentage_target,
        ng_removal_ready: ng_ready,
    };

    let current_blockers = [
        (DischargeGate::Weight, weight_criterion.met),
        (DischargeGate::Respiratory, respiratory_criterion.met),
        (DischargeGate::Feeding, feeding_criterion.met),
    ]
    .into_iter()
    .filter(|(_, met)| !met)
    .map(|(gate, _)| gate)
    .collect::<Vec<_>>();

    let gates_met = TOTAL_GATES - current_blockers.len();

    DischargeCriteria {
        id: format!("discharge-criteria-{}-{}", patient.id, now.timestamp_millis()),
        baby_id: patient.id.clone(),
        assessed_at: now,
        assessed_by: "system".to_string(),
        overall_status: ReadinessStatus::from_gates_met(gates_met),
        readiness_score: (gates_met as f64 / TOTAL_GATES as f64 * 100.0).round() as u32,
        weight_criterion,
        respiratory_criterion,
        feeding_criterion,
        current_blockers,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusColor {
    Red,
    Amber,
    Green,
}

impl From<ReadinessStatus> for StatusColor {
    fn from(status: ReadinessStatus) -> Self {
        match status {
            ReadinessStatus::Ready => StatusColor::Green,
            ReadinessStatus::Approaching => StatusColor::Amber,
            ReadinessStatus::NotReady => StatusColor::Red,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateDetail {
    pub met: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Milestone {
    pub criterion: DischargeGate,
    pub description: String,
}

/// Dashboard view of a [`DischargeCriteria`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DischargeReadinessSummary {
    pub baby_id: String,
    pub last_updated: DateTime<Utc>,
    pub gates_met: usize,
    pub total_gates: usize,
    pub progress_percentage: u32,
    pub status: ReadinessStatus,
    pub status_color: StatusColor,
    /// The first blocker, or `None` once every gate is met.
    pub next_milestone: Option<Milestone>,
    pub weight: GateDetail,
    pub respiratory: GateDetail,
    pub feeding: GateDetail,
}

pub fn generate_summary(criteria: &DischargeCriteria) -> DischargeReadinessSummary {
    let weight = &criteria.weight_criterion;
    let respiratory = &criteria.respiratory_criterion;
    let feeding = &criteria.feeding_criterion;

    let next_milestone = criteria.current_blockers.first().map(|gate| Milestone {
        criterion: *gate,
        description: match gate {
            DischargeGate::Weight => format!("Reach {:.1}kg", weight.target_weight / 1000.0),
            DischargeGate::Respiratory => match &respiratory.current_support {
                Some(support) => format!("Wean from {support}"),
                None => format!(
                    "{} episode-free days",
                    respiratory.required_episode_free_days
                ),
            },
            DischargeGate::Feeding => {
                if feeding.ng_removal_ready {
                    format!("Reach {}% oral feeds", feeding.target_oral_percentage)
                } else {
                    "Meet NG removal criteria".to_string()
                }
            }
        },
    });

    DischargeReadinessSummary {
        baby_id: criteria.baby_id.clone(),
        last_updated: criteria.assessed_at,
        gates_met: criteria.gates_met(),
        total_gates: TOTAL_GATES,
        progress_percentage: criteria.readiness_score,
        status: criteria.overall_status,
        status_color: criteria.overall_status.into(),
        next_milestone,
        weight: GateDetail {
            met: weight.met,
            detail: format!("{}g / {}g", weight.current_weight, weight.target_weight),
        },
        respiratory: GateDetail {
            met: respiratory.met,
            detail: format!(
                "{} / {} days",
                respiratory.episode_free_for_days, respiratory.required_episode_free_days
            ),
        },
        feeding: GateDetail {
            met: feeding.met,
            detail: format!("{}% oral", feeding.oral_percentage),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_gate_count() {
        assert_eq!(ReadinessStatus::from_gates_met(3), ReadinessStatus::Ready);
        assert_eq!(ReadinessStatus::from_gates_met(2), ReadinessStatus::Approaching);
        assert_eq!(ReadinessStatus::from_gates_met(1), ReadinessStatus::NotReady);
        assert_eq!(ReadinessStatus::from_gates_met(0), ReadinessStatus::NotReady);
        assert_eq!(StatusColor::from(ReadinessStatus::Approaching), StatusColor::Amber);
    }

    #[test]
    fn gate_names_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&DischargeGate::Respiratory).unwrap(),
            "\"respiratory\""
        );
        assert_eq!(DischargeGate::Feeding.to_string(), "feeding");
    }
}
