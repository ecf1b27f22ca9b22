//! Expands one care plan and its approved prescriptions into nursing tasks.
//!
//! Output is deterministic for a given (plan, prescriptions, start, horizon):
//! task ids are derived from type, source and scheduled instant, and every
//! type is emitted in ascending time order. The combined list is not sorted.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::{ensure_positive_hours, NicuError, NicuResult};
use crate::model::{CarePlan, Prescription};
use crate::task::{
    AssessmentTaskDetails, FeedingTaskDetails, GeneratedFrom, InFeedMedication,
    MedicationTaskDetails, NursingTask, PositionChangeTaskDetails, Priority, ProcedureKind,
    ProcedureTaskDetails, Recurrence, SkinCareTaskDetails, SourceType, TaskDetails, TaskFlag,
    TaskId, VitalSignsTaskDetails,
};

/// Generate every task a care plan implies over `horizon_hours` from `start`.
///
/// Inactive plans yield no tasks. Sub-plans are expanded independently.
pub fn generate_tasks(
    plan: &CarePlan,
    prescriptions: &[Prescription],
    start: DateTime<Utc>,
    horizon_hours: f64,
) -> NicuResult<Vec<NursingTask>> {
    ensure_positive_hours(horizon_hours, "horizon")?;

    if !plan.is_active() {
        debug!(plan_id = %plan.id, status = ?plan.status, "care plan is not active, no tasks");
        return Ok(Vec::new());
    }

    let mut tasks = Vec::new();
    tasks.extend(generate_feeding_tasks(plan, prescriptions, start, horizon_hours)?);
    tasks.extend(generate_medication_tasks(plan, prescriptions, start, horizon_hours)?);
    tasks.extend(generate_vital_signs_tasks(plan, start, horizon_hours)?);
    tasks.extend(generate_procedure_tasks(plan, start, horizon_hours)?);
    tasks.extend(generate_assessment_tasks(plan, start, horizon_hours)?);

    debug!(
        plan_id = %plan.id,
        baby_id = %plan.baby_id,
        count = tasks.len(),
        "generated tasks"
    );
    Ok(tasks)
}

pub fn generate_feeding_tasks(
    plan: &CarePlan,
    prescriptions: &[Prescription],
    start: DateTime<Utc>,
    horizon_hours: f64,
) -> NicuResult<Vec<NursingTask>> {
    let Some(feeding) = &plan.feeding_plan else {
        return Ok(Vec::new());
    };
    ensure_positive_hours(feeding.frequency, "feeding frequency")?;

    let priority = if feeding.route == crate::model::FeedRoute::Iv {
        Priority::Important
    } else {
        Priority::Routine
    };

    let tasks = cadence_ticks(start, horizon_hours, feeding.frequency)?
        .into_iter()
        .filter(|(_, at)| plan.is_effective_at(*at))
        .map(|(instance, at)| {
            let medications_to_include = prescriptions
                .iter()
                .filter(|rx| {
                    rx.baby_id == plan.baby_id
                        && rx.is_approved()
                        && rx.is_in_feed_candidate()
                        && rx.is_valid_at(at)
                })
                .map(|rx| InFeedMedication {
                    prescription_id: rx.id.clone(),
                    medication_name: rx.medication_name.clone(),
                })
                .collect();

            let details = TaskDetails::Feeding(FeedingTaskDetails {
                volume_ml: feeding.volume_per_feed,
                feed_type: feeding.feed_type,
                route: feeding.route,
                medications_to_include,
                aspirate_required: feeding.aspirate_before_feed,
                fortification: feeding.fortification.clone(),
            });

            plan_task(
                plan,
                details,
                at,
                None,
                priority,
                Vec::new(),
                series(plan, "feeding", feeding.frequency, instance),
            )
        })
        .collect();

    Ok(tasks)
}

/// One task per listed time-of-day that falls in the horizon.
///
/// PRN orders are never scheduled. A scheduled order with no times is a
/// configuration error.
pub fn generate_medication_tasks(
    plan: &CarePlan,
    prescriptions: &[Prescription],
    start: DateTime<Utc>,
    horizon_hours: f64,
) -> NicuResult<Vec<NursingTask>> {
    let Some(medication_plan) = &plan.medication_plan else {
        return Ok(Vec::new());
    };
    ensure_positive_hours(horizon_hours, "horizon")?;
    let end = start + hours(horizon_hours);

    let mut tasks = Vec::new();
    for rx in prescriptions.iter().filter(|rx| {
        rx.baby_id == plan.baby_id && rx.is_approved() && medication_plan.includes(&rx.id)
    }) {
        if rx.is_prn {
            continue;
        }
        if rx.timings.is_empty() {
            return Err(NicuError::EmptyTimings {
                prescription_id: rx.id.clone(),
            });
        }

        let mut instants = Vec::new();
        let mut day = start.date_naive();
        while day <= end.date_naive() {
            for time in &rx.timings {
                let at = day.and_time(*time).and_utc();
                if at >= start && at < end && rx.is_valid_at(at) {
                    instants.push(at);
                }
            }
            day = match day.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
        instants.sort();
        instants.dedup();

        let mut flags = Vec::new();
        if rx.controlled_drug || rx.route.eq_ignore_ascii_case("IV") {
            flags.push(TaskFlag::NeedsTwoNurses);
        }
        let priority = if rx.controlled_drug {
            Priority::Urgent
        } else {
            Priority::Important
        };

        for (index, at) in instants.into_iter().enumerate() {
            let details = TaskDetails::Medication(MedicationTaskDetails {
                prescription_id: rx.id.clone(),
                medication_name: rx.medication_name.clone(),
                dose_amount: rx.dose.amount,
                dose_unit: rx.dose.unit.clone(),
                route: rx.route.clone(),
                can_be_given_in_feed: rx.can_be_given_in_feed,
                must_be_given_separately: rx.must_be_given_separately,
            });

            tasks.push(NursingTask {
                id: TaskId::derive(details.task_type(), &rx.id, None, at),
                baby_id: plan.baby_id.clone(),
                generated_from: GeneratedFrom {
                    source_type: SourceType::MedicationPrescription,
                    source_id: rx.id.clone(),
                    version: None,
                },
                scheduled_at: at,
                scheduled_time_of_day: clock_label(at),
                window: None,
                shift: None,
                recurrence: Some(Recurrence {
                    frequency: rx.frequency.clone(),
                    series_id: format!("{}-medication", rx.id),
                    instance_number: index as u32 + 1,
                }),
                priority,
                flags: flags.clone(),
                details,
            });
        }
    }

    Ok(tasks)
}

pub fn generate_vital_signs_tasks(
    plan: &CarePlan,
    start: DateTime<Utc>,
    horizon_hours: f64,
) -> NicuResult<Vec<NursingTask>> {
    let Some(observation) = &plan.observation_plan else {
        return Ok(Vec::new());
    };
    let every = observation.frequency.hours();

    Ok(cadence_ticks(start, horizon_hours, every)?
        .into_iter()
        .filter(|(_, at)| plan.is_effective_at(*at))
        .map(|(instance, at)| {
            let details = TaskDetails::VitalSigns(VitalSignsTaskDetails {
                parameters: observation.parameters.clone(),
                is_routine_check: true,
                special_instructions: observation.special_instructions.clone(),
            });
            plan_task(
                plan,
                details,
                at,
                None,
                Priority::Routine,
                Vec::new(),
                Some(Recurrence {
                    frequency: observation.frequency.label().to_string(),
                    series_id: format!("{}-vital_signs", plan.id),
                    instance_number: instance,
                }),
            )
        })
        .collect())
}

/// Line care, tube checks, position changes and skin assessments.
pub fn generate_procedure_tasks(
    plan: &CarePlan,
    start: DateTime<Utc>,
    horizon_hours: f64,
) -> NicuResult<Vec<NursingTask>> {
    let Some(procedural) = &plan.procedural_plan else {
        return Ok(Vec::new());
    };

    let mut tasks = Vec::new();

    if let Some(line_care) = &procedural.line_care {
        for line_id in &line_care.line_ids {
            for (instance, at) in cadence_ticks(start, horizon_hours, line_care.flush_frequency_hours)? {
                let details = TaskDetails::LineCare(ProcedureTaskDetails {
                    procedure: ProcedureKind::LineFlush,
                    target_id: Some(line_id.clone()),
                });
                tasks.push(plan_task(
                    plan,
                    details,
                    at,
                    Some(&format!("flush-{line_id}")),
                    Priority::Important,
                    Vec::new(),
                    series(plan, &format!("flush-{line_id}"), line_care.flush_frequency_hours, instance),
                ));
            }

            let dressing_hours = line_care.dressing_change_frequency_days * 24.0;
            for (instance, at) in cadence_ticks(start, horizon_hours, dressing_hours)? {
                let details = TaskDetails::LineCare(ProcedureTaskDetails {
                    procedure: ProcedureKind::DressingChange,
                    target_id: Some(line_id.clone()),
                });
                tasks.push(plan_task(
                    plan,
                    details,
                    at,
                    Some(&format!("dressing-{line_id}")),
                    Priority::Important,
                    vec![TaskFlag::Sterile],
                    series(plan, &format!("dressing-{line_id}"), dressing_hours, instance),
                ));
            }
        }
    }

    if let Some(tube_care) = &procedural.tube_care {
        for tube_id in &tube_care.tube_ids {
            let every = tube_care.position_check_frequency_hours;
            for (instance, at) in cadence_ticks(start, horizon_hours, every)? {
                let details = TaskDetails::Procedure(ProcedureTaskDetails {
                    procedure: ProcedureKind::TubePositionCheck,
                    target_id: Some(tube_id.clone()),
                });
                tasks.push(plan_task(
                    plan,
                    details,
                    at,
                    Some(tube_id),
                    Priority::Important,
                    Vec::new(),
                    series(plan, &format!("tube-{tube_id}"), every, instance),
                ));
            }
        }
    }

    if let Some(positions) = &procedural.position_changes {
        for (instance, at) in cadence_ticks(start, horizon_hours, positions.frequency_hours)? {
            let target_position = if positions.positions.is_empty() {
                None
            } else {
                let slot = (instance as usize - 1) % positions.positions.len();
                Some(positions.positions[slot].clone())
            };
            tasks.push(plan_task(
                plan,
                TaskDetails::PositionChange(PositionChangeTaskDetails { target_position }),
                at,
                None,
                Priority::Routine,
                Vec::new(),
                series(plan, "position_change", positions.frequency_hours, instance),
            ));
        }
    }

    if let Some(skin) = &procedural.skin_assessments {
        for (instance, at) in cadence_ticks(start, horizon_hours, skin.frequency_hours)? {
            tasks.push(plan_task(
                plan,
                TaskDetails::SkinCare(SkinCareTaskDetails {
                    assessment_tool: None,
                }),
                at,
                None,
                Priority::Routine,
                Vec::new(),
                series(plan, "skin_care", skin.frequency_hours, instance),
            ));
        }
    }

    tasks.retain(|task| plan.is_effective_at(task.scheduled_at));
    Ok(tasks)
}

/// Respiratory assessments at the plan's charting cadence.
pub fn generate_assessment_tasks(
    plan: &CarePlan,
    start: DateTime<Utc>,
    horizon_hours: f64,
) -> NicuResult<Vec<NursingTask>> {
    let Some(respiratory) = &plan.respiratory_plan else {
        return Ok(Vec::new());
    };
    let Some(cadence) = respiratory.assessment_frequency else {
        return Ok(Vec::new());
    };

    let priority = if respiratory.mode.is_invasive() {
        Priority::Critical
    } else {
        Priority::Important
    };

    Ok(cadence_ticks(start, horizon_hours, cadence.hours())?
        .into_iter()
        .filter(|(_, at)| plan.is_effective_at(*at))
        .map(|(instance, at)| {
            plan_task(
                plan,
                TaskDetails::Assessment(AssessmentTaskDetails {
                    focus: "respiratory".to_string(),
                }),
                at,
                None,
                priority,
                Vec::new(),
                Some(Recurrence {
                    frequency: cadence.label().to_string(),
                    series_id: format!("{}-assessment", plan.id),
                    instance_number: instance,
                }),
            )
        })
        .collect())
}

/// `floor(horizon / every)` instants starting at `start`, numbered from 1.
fn cadence_ticks(
    start: DateTime<Utc>,
    horizon_hours: f64,
    every_hours: f64,
) -> NicuResult<Vec<(u32, DateTime<Utc>)>> {
    ensure_positive_hours(horizon_hours, "horizon")?;
    ensure_positive_hours(every_hours, "frequency")?;

    // Tolerance keeps 24 / 3.0 from landing on 7.999...
    let count = (horizon_hours / every_hours + 1e-9).floor() as u32;
    Ok((0..count)
        .map(|k| (k + 1, start + hours(every_hours * f64::from(k))))
        .collect())
}

fn hours(value: f64) -> Duration {
    Duration::milliseconds((value * 3_600_000.0).round() as i64)
}

fn clock_label(at: DateTime<Utc>) -> String {
    at.format("%H:%M").to_string()
}

fn series(plan: &CarePlan, kind: &str, every_hours: f64, instance: u32) -> Option<Recurrence> {
    let frequency = if every_hours == 1.0 {
        "hourly".to_string()
    } else if every_hours.fract() == 0.0 && every_hours <= 24.0 {
        format!("{}-hourly", every_hours as u32)
    } else {
        format!("every {every_hours}h")
    };
    Some(Recurrence {
        frequency,
        series_id: format!("{}-{kind}", plan.id),
        instance_number: instance,
    })
}

fn plan_task(
    plan: &CarePlan,
    details: TaskDetails,
    at: DateTime<Utc>,
    target: Option<&str>,
    priority: Priority,
    flags: Vec<TaskFlag>,
    recurrence: Option<Recurrence>,
) -> NursingTask {
    NursingTask {
        id: TaskId::derive(details.task_type(), &plan.id, target, at),
        baby_id: plan.baby_id.clone(),
        generated_from: GeneratedFrom {
            source_type: SourceType::CarePlan,
            source_id: plan.id.clone(),
            version: Some(plan.version),
        },
        scheduled_at: at,
        scheduled_time_of_day: clock_label(at),
        window: None,
        shift: None,
        recurrence,
        priority,
        flags,
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ticks_floor_the_horizon() {
        let start = Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap();
        assert_eq!(cadence_ticks(start, 24.0, 3.0).unwrap().len(), 8);
        assert_eq!(cadence_ticks(start, 24.0, 24.0).unwrap().len(), 1);
        assert_eq!(cadence_ticks(start, 23.0, 24.0).unwrap().len(), 0);
        assert_eq!(cadence_ticks(start, 24.0, 7.0).unwrap().len(), 3);

        let last = cadence_ticks(start, 24.0, 3.0).unwrap().pop().unwrap();
        assert_eq!(last, (8, Utc.with_ymd_and_hms(2026, 10, 17, 5, 0, 0).unwrap()));
    }

    #[test]
    fn non_positive_cadence_is_rejected() {
        let start = Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap();
        assert!(matches!(
            cadence_ticks(start, 24.0, 0.0),
            Err(NicuError::InvalidSchedule(_))
        ));
        assert!(matches!(
            cadence_ticks(start, -1.0, 3.0),
            Err(NicuError::InvalidSchedule(_))
        ));
        assert!(cadence_ticks(start, 24.0, f64::NAN).is_err());
    }
}
