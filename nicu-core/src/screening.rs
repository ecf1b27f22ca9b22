//! Day-of-life and corrected-age screening reminders.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::ScreeningSettings;
use crate::model::Patient;

/// Days after the repeat NBBS due date that the reminder stays visible.
const NBBS_REPEAT_GRACE_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningType {
    Nbbs,
    NbbsDay28,
    Rop,
    CranialUss,
    Hearing,
    InfectionSwabs,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningStatus {
    Upcoming,
    Due,
    Overdue,
}

impl ScreeningStatus {
    fn for_day(age_in_days: i64, due_day: i64) -> Self {
        match age_in_days.cmp(&due_day) {
            std::cmp::Ordering::Less => ScreeningStatus::Upcoming,
            std::cmp::Ordering::Equal => ScreeningStatus::Due,
            std::cmp::Ordering::Greater => ScreeningStatus::Overdue,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreeningReminder {
    pub id: String,
    pub baby_id: String,
    pub screening_type: ScreeningType,
    pub due_date: NaiveDate,
    pub description: String,
    pub status: ScreeningStatus,
    pub escalated: bool,
}

/// Reminders for every patient on `today`.
pub fn screening_reminders(
    patients: &[Patient],
    today: NaiveDate,
    settings: &ScreeningSettings,
) -> Vec<ScreeningReminder> {
    patients
        .iter()
        .flat_map(|patient| patient_reminders(patient, today, settings))
        .collect()
}

pub fn patient_reminders(
    patient: &Patient,
    today: NaiveDate,
    settings: &ScreeningSettings,
) -> Vec<ScreeningReminder> {
    let age = patient.age_in_days(today);
    let preterm = patient.gestational_age_at_birth.weeks < settings.preterm_gestation_weeks;
    let day_of_life = |day: i64| patient.date_of_birth + Duration::days(day);
    let mut reminders = Vec::new();

    let nbbs_day = settings.nbbs_day_of_life;
    if age >= nbbs_day - settings.nbbs_reminder_days_before
        && age <= nbbs_day + settings.nbbs_escalate_after_days
    {
        reminders.push(ScreeningReminder {
            id: format!("screening-nbbs-{}", patient.id),
            baby_id: patient.id.clone(),
            screening_type: ScreeningType::Nbbs,
            due_date: day_of_life(nbbs_day),
            description: format!("Newborn blood spot screening - day {nbbs_day}"),
            status: ScreeningStatus::for_day(age, nbbs_day),
            escalated: age >= nbbs_day + settings.nbbs_escalate_after_days,
        });
    }

    let repeat_day = settings.nbbs_repeat_day_of_life;
    if preterm
        && age >= repeat_day - settings.nbbs_repeat_reminder_days_before
        && age <= repeat_day + NBBS_REPEAT_GRACE_DAYS
    {
        reminders.push(ScreeningReminder {
            id: format!("screening-nbbs28-{}", patient.id),
            baby_id: patient.id.clone(),
            screening_type: ScreeningType::NbbsDay28,
            due_date: day_of_life(repeat_day),
            description: format!("Preterm repeat NBBS - day {repeat_day}"),
            status: ScreeningStatus::for_day(age, repeat_day),
            escalated: false,
        });
    }

    let rop_eligible = preterm || patient.birth_weight_grams < settings.rop_birth_weight_grams;
    let corrected = patient.corrected_age(today);
    if rop_eligible
        && corrected.weeks >= settings.rop_start_weeks
        && corrected.weeks <= settings.rop_end_weeks
    {
        reminders.push(ScreeningReminder {
            id: format!("screening-rop-{}-{}", patient.id, corrected.weeks),
            baby_id: patient.id.clone(),
            screening_type: ScreeningType::Rop,
            due_date: today,
            description: format!("ROP screening due - CGA {}+{}", corrected.weeks, corrected.days),
            status: ScreeningStatus::Due,
            escalated: false,
        });
    }

    if today.weekday() == settings.swab_day && !settings.swab_types.is_empty() {
        reminders.push(ScreeningReminder {
            id: format!("screening-swabs-{}-{today}", patient.id),
            baby_id: patient.id.clone(),
            screening_type: ScreeningType::InfectionSwabs,
            due_date: today,
            description: format!("Weekly {} swabs", settings.swab_types.join("/")),
            status: ScreeningStatus::Due,
            escalated: false,
        });
    }

    if preterm {
        for &scan_day in &settings.cranial_uss_days {
            if age >= scan_day - 1 && age <= scan_day + 2 {
                reminders.push(ScreeningReminder {
                    id: format!("screening-cuss-{}-dol{scan_day}", patient.id),
                    baby_id: patient.id.clone(),
                    screening_type: ScreeningType::CranialUss,
                    due_date: day_of_life(scan_day),
                    description: format!("Cranial ultrasound - day {scan_day}"),
                    status: match ScreeningStatus::for_day(age, scan_day) {
                        ScreeningStatus::Overdue => ScreeningStatus::Overdue,
                        _ => ScreeningStatus::Due,
                    },
                    escalated: false,
                });
            }
        }
    }

    if age >= settings.hearing_min_day_of_life {
        reminders.push(ScreeningReminder {
            id: format!("screening-hearing-{}", patient.id),
            baby_id: patient.id.clone(),
            screening_type: ScreeningType::Hearing,
            due_date: today,
            description: "Hearing screening - required before discharge".to_string(),
            status: ScreeningStatus::Upcoming,
            escalated: false,
        });
    }

    reminders
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GestationalAge;

    fn patient(weeks: u32, birth_weight_grams: f64, born: NaiveDate) -> Patient {
        Patient {
            id: "daisy".to_string(),
            name: "Daisy".to_string(),
            date_of_birth: born,
            gestational_age_at_birth: GestationalAge { weeks, days: 0 },
            birth_weight_grams,
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
    }

    fn kinds(reminders: &[ScreeningReminder]) -> Vec<ScreeningType> {
        reminders.iter().map(|r| r.screening_type).collect()
    }

    #[test]
    fn nbbs_moves_from_upcoming_to_escalated() {
        let settings = ScreeningSettings::default();
        let baby = patient(38, 3200.0, date(1));

        let on = |day| {
            patient_reminders(&baby, date(day), &settings)
                .into_iter()
                .find(|r| r.screening_type == ScreeningType::Nbbs)
        };

        assert!(on(4).is_none());
        assert_eq!(on(5).unwrap().status, ScreeningStatus::Upcoming);
        assert_eq!(on(6).unwrap().status, ScreeningStatus::Due);
        let late = on(8).unwrap();
        assert_eq!(late.status, ScreeningStatus::Overdue);
        assert!(late.escalated);
        assert!(on(9).is_none());
    }

    #[test]
    fn term_baby_gets_no_preterm_schedules() {
        let settings = ScreeningSettings::default();
        // Thursday, day of life 1.
        let reminders = patient_reminders(&patient(39, 3400.0, date(14)), date(15), &settings);
        assert!(reminders.is_empty());
    }

    #[test]
    fn preterm_gets_cranial_uss_and_swabs_on_monday() {
        let settings = ScreeningSettings::default();
        // 2026-10-12 is a Monday.
        let reminders = patient_reminders(&patient(27, 900.0, date(5)), date(12), &settings);
        let found = kinds(&reminders);
        assert!(found.contains(&ScreeningType::InfectionSwabs));
        assert!(found.contains(&ScreeningType::CranialUss));
        assert!(found.contains(&ScreeningType::Hearing));
        assert!(!found.contains(&ScreeningType::Rop));
    }

    #[test]
    fn rop_window_uses_corrected_age() {
        let settings = ScreeningSettings::default();
        // Born at 28 weeks, 15 days later is CGA 30+1.
        let reminders = patient_reminders(&patient(28, 1100.0, date(1)), date(16), &settings);
        let rop = reminders
            .iter()
            .find(|r| r.screening_type == ScreeningType::Rop)
            .unwrap();
        assert_eq!(rop.description, "ROP screening due - CGA 30+1");
    }
}
