#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use nicu_core::model::{
    ApprovalStatus, CarePlan, CarePlanStatus, Cadence, Dose, FeedRoute, FeedType, FeedVolume,
    FeedingPlan, FeedingRecord, GestationalAge, MedicationPlan, ObservationPlan, Patient,
    Prescription, VitalParameter,
};

pub fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, day, hour, minute, 0).unwrap()
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
}

pub fn patient(id: &str) -> Patient {
    Patient {
        id: id.to_string(),
        name: id.to_string(),
        date_of_birth: date(1),
        gestational_age_at_birth: GestationalAge { weeks: 30, days: 2 },
        birth_weight_grams: 1350.0,
    }
}

pub fn feeding_plan(frequency: f64) -> FeedingPlan {
    FeedingPlan {
        frequency,
        volume_per_feed: 34.0,
        feed_type: FeedType::Ebm,
        route: FeedRoute::NgTube,
        fortification: None,
        aspirate_before_feed: true,
    }
}

/// Active plan with 3-hourly feeds, 4-hourly obs and every approved order.
pub fn care_plan(id: &str, baby_id: &str) -> CarePlan {
    CarePlan {
        id: id.to_string(),
        baby_id: baby_id.to_string(),
        version: 1,
        supersedes: None,
        status: CarePlanStatus::Active,
        effective_from: at(1, 0, 0),
        effective_until: None,
        feeding_plan: Some(feeding_plan(3.0)),
        medication_plan: Some(MedicationPlan::default()),
        observation_plan: Some(ObservationPlan {
            frequency: Cadence::FourHourly,
            parameters: vec![
                VitalParameter::Temperature,
                VitalParameter::HeartRate,
                VitalParameter::OxygenSaturation,
            ],
            special_instructions: None,
        }),
        respiratory_plan: None,
        procedural_plan: None,
        developmental_plan: None,
    }
}

pub fn prescription(id: &str, baby_id: &str, name: &str, timings: &[&str]) -> Prescription {
    Prescription {
        id: id.to_string(),
        baby_id: baby_id.to_string(),
        medication_name: name.to_string(),
        dose: Dose {
            amount: 1.0,
            unit: "ml".to_string(),
        },
        route: "oral".to_string(),
        frequency: "daily".to_string(),
        timings: timings
            .iter()
            .map(|t| NaiveTime::parse_from_str(t, "%H:%M").unwrap())
            .collect(),
        start_date: at(1, 0, 0),
        end_date: None,
        can_be_given_in_feed: false,
        must_be_given_separately: false,
        is_prn: false,
        controlled_drug: false,
        status: ApprovalStatus::Approved,
    }
}

pub fn feed(id: &str, baby_id: &str, time: DateTime<Utc>, route: FeedRoute, actual: f64) -> FeedingRecord {
    FeedingRecord {
        id: id.to_string(),
        baby_id: baby_id.to_string(),
        feed_time: time,
        feed_type: FeedType::Ebm,
        volume: FeedVolume {
            prescribed: 40.0,
            actual,
        },
        route,
        oral_volume: None,
        recorded_by: Some("sarah-nurse".to_string()),
    }
}
