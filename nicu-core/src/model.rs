//! Clinical inputs: patients, care plans, prescriptions, feeds, lines and tubes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{NicuError, NicuResult};

/// A baby on the unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gestational_age_at_birth: GestationalAge,
    pub birth_weight_grams: f64,
}

impl Patient {
    /// Day of life counted from zero on the date of birth.
    pub fn age_in_days(&self, today: NaiveDate) -> i64 {
        (today - self.date_of_birth).num_days()
    }

    /// Corrected gestational age on `today`.
    pub fn corrected_age(&self, today: NaiveDate) -> GestationalAge {
        let total_days = i64::from(self.gestational_age_at_birth.weeks) * 7
            + i64::from(self.gestational_age_at_birth.days)
            + self.age_in_days(today).max(0);
        GestationalAge {
            weeks: u32::try_from(total_days / 7).unwrap_or(u32::MAX),
            days: u32::try_from(total_days % 7).unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct GestationalAge {
    pub weeks: u32,
    pub days: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CarePlanStatus {
    Active,
    Suspended,
    Completed,
    Superseded,
}

/// Versioned ward-round instructions for one patient.
///
/// Plans are never edited in place: [`CarePlan::revise`] issues the next
/// version and marks the previous one superseded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CarePlan {
    pub id: String,
    pub baby_id: String,
    pub version: u32,
    #[serde(default)]
    pub supersedes: Option<String>,
    pub status: CarePlanStatus,
    pub effective_from: DateTime<Utc>,
    #[serde(default)]
    pub effective_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub feeding_plan: Option<FeedingPlan>,
    #[serde(default)]
    pub medication_plan: Option<MedicationPlan>,
    #[serde(default)]
    pub observation_plan: Option<ObservationPlan>,
    #[serde(default)]
    pub respiratory_plan: Option<RespiratoryPlan>,
    #[serde(default)]
    pub procedural_plan: Option<ProceduralPlan>,
    #[serde(default)]
    pub developmental_plan: Option<DevelopmentalPlan>,
}

impl CarePlan {
    pub fn is_active(&self) -> bool {
        self.status == CarePlanStatus::Active
    }

    /// Whether the plan's effective window covers `at`.
    pub fn is_effective_at(&self, at: DateTime<Utc>) -> bool {
        at >= self.effective_from && self.effective_until.map_or(true, |until| at < until)
    }

    /// Issue the next version of this plan.
    ///
    /// `edit` receives a copy of the current plan to modify. Returns the
    /// superseded copy of `self` and the new active version.
    pub fn revise(
        &self,
        new_id: impl Into<String>,
        effective_from: DateTime<Utc>,
        edit: impl FnOnce(&mut CarePlan),
    ) -> (CarePlan, CarePlan) {
        let mut next = self.clone();
        edit(&mut next);
        next.id = new_id.into();
        next.baby_id = self.baby_id.clone();
        next.version = self.version + 1;
        next.supersedes = Some(self.id.clone());
        next.status = CarePlanStatus::Active;
        next.effective_from = effective_from;
        next.effective_until = None;

        let mut previous = self.clone();
        previous.status = CarePlanStatus::Superseded;
        previous.effective_until = Some(effective_from);

        (previous, next)
    }
}

/// The single active care plan for `baby_id`, if any.
pub fn active_care_plan<'a>(plans: &'a [CarePlan], baby_id: &str) -> NicuResult<Option<&'a CarePlan>> {
    let mut active = plans
        .iter()
        .filter(|plan| plan.baby_id == baby_id && plan.is_active());

    let first = active.next();
    let extra = active.count();
    if extra > 0 {
        return Err(NicuError::ConflictingCarePlans {
            patient_id: baby_id.to_string(),
            count: extra + 1,
        });
    }
    Ok(first)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FeedType {
    #[serde(rename = "EBM")]
    Ebm,
    #[serde(rename = "formula")]
    Formula,
    #[serde(rename = "fortified_EBM")]
    FortifiedEbm,
    #[serde(rename = "fortified_formula")]
    FortifiedFormula,
    #[serde(rename = "TPN")]
    Tpn,
    #[serde(rename = "mixed")]
    Mixed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FeedRoute {
    #[serde(rename = "oral_bottle")]
    OralBottle,
    #[serde(rename = "oral_breast")]
    OralBreast,
    #[serde(rename = "NG_tube")]
    NgTube,
    #[serde(rename = "OG_tube")]
    OgTube,
    #[serde(rename = "IV")]
    Iv,
    #[serde(rename = "mixed")]
    Mixed,
}

impl FeedRoute {
    pub fn is_oral(self) -> bool {
        matches!(self, FeedRoute::OralBottle | FeedRoute::OralBreast)
    }

    pub fn is_gastric_tube(self) -> bool {
        matches!(self, FeedRoute::NgTube | FeedRoute::OgTube)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedingPlan {
    /// Hours between feeds.
    pub frequency: f64,
    pub volume_per_feed: f64,
    pub feed_type: FeedType,
    pub route: FeedRoute,
    #[serde(default)]
    pub fortification: Option<String>,
    #[serde(default)]
    pub aspirate_before_feed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MedicationPlan {
    /// Prescriptions this plan schedules. Empty means every approved order.
    #[serde(default)]
    pub prescription_ids: Vec<String>,
}

impl MedicationPlan {
    pub fn includes(&self, prescription_id: &str) -> bool {
        self.prescription_ids.is_empty()
            || self.prescription_ids.iter().any(|id| id == prescription_id)
    }
}

/// Charting cadence shared by observation and respiratory plans.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Cadence {
    #[serde(rename = "continuous")]
    Continuous,
    #[serde(rename = "hourly")]
    Hourly,
    #[serde(rename = "2-hourly")]
    TwoHourly,
    #[serde(rename = "4-hourly")]
    FourHourly,
    #[serde(rename = "6-hourly")]
    SixHourly,
}

impl Cadence {
    /// Hours between charted entries. Continuous monitoring is charted hourly.
    pub fn hours(self) -> f64 {
        match self {
            Cadence::Continuous | Cadence::Hourly => 1.0,
            Cadence::TwoHourly => 2.0,
            Cadence::FourHourly => 4.0,
            Cadence::SixHourly => 6.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Cadence::Continuous => "continuous",
            Cadence::Hourly => "hourly",
            Cadence::TwoHourly => "2-hourly",
            Cadence::FourHourly => "4-hourly",
            Cadence::SixHourly => "6-hourly",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum VitalParameter {
    Weight,
    Temperature,
    HeartRate,
    RespiratoryRate,
    OxygenSaturation,
    BloodPressure,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObservationPlan {
    pub frequency: Cadence,
    pub parameters: Vec<VitalParameter>,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RespiratoryMode {
    #[serde(rename = "IPPV")]
    Ippv,
    #[serde(rename = "SIMV")]
    Simv,
    #[serde(rename = "CPAP")]
    Cpap,
    #[serde(rename = "HFOV")]
    Hfov,
    #[serde(rename = "nasal_cannula")]
    NasalCannula,
    #[serde(rename = "room_air")]
    RoomAir,
}

impl RespiratoryMode {
    pub fn is_invasive(self) -> bool {
        matches!(
            self,
            RespiratoryMode::Ippv | RespiratoryMode::Simv | RespiratoryMode::Hfov
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RespiratoryPlan {
    pub mode: RespiratoryMode,
    #[serde(default)]
    pub fio2_target: Option<f64>,
    #[serde(default)]
    pub assessment_frequency: Option<Cadence>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineCarePlan {
    pub line_ids: Vec<String>,
    pub flush_frequency_hours: f64,
    pub dressing_change_frequency_days: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TubeCarePlan {
    pub tube_ids: Vec<String>,
    pub position_check_frequency_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionChangePlan {
    pub frequency_hours: f64,
    pub positions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkinAssessmentPlan {
    pub frequency_hours: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProceduralPlan {
    #[serde(default)]
    pub line_care: Option<LineCarePlan>,
    #[serde(default)]
    pub tube_care: Option<TubeCarePlan>,
    #[serde(default)]
    pub position_changes: Option<PositionChangePlan>,
    #[serde(default)]
    pub skin_assessments: Option<SkinAssessmentPlan>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DevelopmentalPlan {
    pub kangaroo_care: bool,
    pub minimum_handling: bool,
    pub clustered_care: bool,
    pub light_reduction: bool,
    pub noise_reduction: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Draft,
    PendingApproval,
    Approved,
    Discontinued,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dose {
    pub amount: f64,
    pub unit: String,
}

/// One ordered medication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prescription {
    pub id: String,
    pub baby_id: String,
    pub medication_name: String,
    pub dose: Dose,
    pub route: String,
    pub frequency: String,
    #[serde(with = "clock_times")]
    pub timings: Vec<chrono::NaiveTime>,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub can_be_given_in_feed: bool,
    #[serde(default)]
    pub must_be_given_separately: bool,
    #[serde(default)]
    pub is_prn: bool,
    #[serde(default)]
    pub controlled_drug: bool,
    pub status: ApprovalStatus,
}

impl Prescription {
    pub fn is_approved(&self) -> bool {
        self.status == ApprovalStatus::Approved
    }

    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        at >= self.start_date && self.end_date.map_or(true, |end| at <= end)
    }

    /// Whether the order may be offered for mixing into a feed.
    pub fn is_in_feed_candidate(&self) -> bool {
        self.can_be_given_in_feed && !self.must_be_given_separately
    }
}

/// `"08:00"` style clock times.
pub mod clock_times {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn parse(value: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(value, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
            .ok()
    }

    pub fn serialize<S: Serializer>(times: &[NaiveTime], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(times.iter().map(|time| time.format("%H:%M").to_string()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<NaiveTime>, D::Error> {
        let raw = Vec::<String>::deserialize(deserializer)?;
        raw.iter()
            .map(|value| {
                parse(value).ok_or_else(|| D::Error::custom(format!("invalid clock time {value:?}")))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FeedVolume {
    pub prescribed: f64,
    pub actual: f64,
}

/// A documented feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedingRecord {
    pub id: String,
    pub baby_id: String,
    pub feed_time: DateTime<Utc>,
    pub feed_type: FeedType,
    pub volume: FeedVolume,
    pub route: FeedRoute,
    /// Oral share of a `mixed` feed; ignored for other routes.
    #[serde(default)]
    pub oral_volume: Option<f64>,
    #[serde(default)]
    pub recorded_by: Option<String>,
}

impl FeedingRecord {
    pub fn oral_volume(&self) -> f64 {
        match self.route {
            route if route.is_oral() => self.volume.actual,
            FeedRoute::Mixed => self.oral_volume.unwrap_or(0.0).clamp(0.0, self.volume.actual),
            _ => 0.0,
        }
    }

    /// Whether any of the feed went down a gastric tube.
    pub fn used_tube(&self) -> bool {
        match self.route {
            route if route.is_gastric_tube() => true,
            FeedRoute::Mixed => self.oral_volume() < self.volume.actual,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LineType {
    #[serde(rename = "peripheral_IV")]
    PeripheralIv,
    #[serde(rename = "PICC")]
    Picc,
    #[serde(rename = "UAC")]
    Uac,
    #[serde(rename = "UVC")]
    Uvc,
    LongLine,
    FemoralLine,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TubeType {
    #[serde(rename = "NG")]
    Ng,
    #[serde(rename = "OG")]
    Og,
}

/// A peripheral or central line in situ.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineRecord {
    pub id: String,
    pub baby_id: String,
    pub line_type: LineType,
    pub insertion_site: String,
    pub inserted_at: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TubeCheck {
    pub checked_at: DateTime<Utc>,
    #[serde(default)]
    pub ph: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TubeRecord {
    pub id: String,
    pub baby_id: String,
    pub tube_type: TubeType,
    pub inserted_at: DateTime<Utc>,
    pub is_active: bool,
    #[serde(default)]
    pub checks: Vec<TubeCheck>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn plan(id: &str, status: CarePlanStatus) -> CarePlan {
        CarePlan {
            id: id.to_string(),
            baby_id: "daisy".to_string(),
            version: 1,
            supersedes: None,
            status,
            effective_from: Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap(),
            effective_until: None,
            feeding_plan: None,
            medication_plan: None,
            observation_plan: None,
            respiratory_plan: None,
            procedural_plan: None,
            developmental_plan: None,
        }
    }

    #[test]
    fn revise_supersedes_previous_version() {
        let v1 = plan("cp-1", CarePlanStatus::Active);
        let at = Utc.with_ymd_and_hms(2026, 10, 2, 10, 0, 0).unwrap();
        let (old, next) = v1.revise("cp-2", at, |draft| {
            draft.developmental_plan = Some(DevelopmentalPlan {
                clustered_care: true,
                ..DevelopmentalPlan::default()
            });
        });

        assert_eq!(old.status, CarePlanStatus::Superseded);
        assert_eq!(old.effective_until, Some(at));
        assert_eq!(next.version, 2);
        assert_eq!(next.supersedes.as_deref(), Some("cp-1"));
        assert!(next.is_active());
        assert!(next.developmental_plan.unwrap().clustered_care);
    }

    #[test]
    fn two_active_plans_conflict() {
        let plans = vec![
            plan("cp-1", CarePlanStatus::Active),
            plan("cp-2", CarePlanStatus::Active),
        ];
        assert!(matches!(
            active_care_plan(&plans, "daisy"),
            Err(NicuError::ConflictingCarePlans { count: 2, .. })
        ));

        let plans = vec![
            plan("cp-1", CarePlanStatus::Superseded),
            plan("cp-2", CarePlanStatus::Active),
        ];
        assert_eq!(active_care_plan(&plans, "daisy").unwrap().unwrap().id, "cp-2");
        assert!(active_care_plan(&plans, "elsa").unwrap().is_none());
    }

    #[test]
    fn clock_times_accept_minutes_only() {
        let parsed: Vec<chrono::NaiveTime> =
            clock_times::deserialize(&mut serde_json::Deserializer::from_str(r#"["08:00","20:30:00"]"#))
                .unwrap();
        assert_eq!(parsed[0], chrono::NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(parsed[1], chrono::NaiveTime::from_hms_opt(20, 30, 0).unwrap());
    }
}
