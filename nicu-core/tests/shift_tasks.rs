mod common;

use std::collections::BTreeMap;

use common::{at, care_plan, date, feeding_plan, patient, prescription};
use nicu_core::episodes::Episode;
use nicu_core::generator::{generate_feeding_tasks, generate_tasks};
use nicu_core::model::{CarePlan, CarePlanStatus, FeedingRecord, Patient, Prescription};
use nicu_core::shift::{cluster_tasks, filter_tasks_for_role, handover_tasks, overdue_tasks, upcoming_tasks};
use nicu_core::task::{CompletionRecordType, TaskDetails, TaskLedger, TaskOutcome, TaskStatus, TaskType};
use nicu_core::{ClinicalRecords, NicuError, Role, ShiftPlanner, ShiftTaskService, ShiftType};

fn ward() -> (Vec<Patient>, Vec<CarePlan>, Vec<Prescription>) {
    let mut vitamin_d = prescription("rx-vitd", "daisy", "Vitamin D", &["09:00"]);
    vitamin_d.can_be_given_in_feed = true;
    let caffeine = prescription("rx-caffeine", "daisy", "Caffeine citrate", &["10:00"]);

    (
        vec![patient("daisy"), patient("elsa")],
        vec![care_plan("cp-daisy", "daisy"), care_plan("cp-elsa", "elsa")],
        vec![vitamin_d, caffeine],
    )
}

#[test]
fn feeding_task_count_is_floor_of_horizon() {
    let start = at(16, 8, 0);
    let cases = [(24.0, 3.0, 8), (24.0, 24.0, 1), (23.0, 24.0, 0), (24.0, 5.0, 4), (12.0, 2.5, 4)];

    for (horizon, frequency, expected) in cases {
        let mut plan = care_plan("cp-daisy", "daisy");
        plan.feeding_plan = Some(feeding_plan(frequency));

        let tasks = generate_feeding_tasks(&plan, &[], start, horizon).expect("feeding tasks");
        assert_eq!(tasks.len(), expected, "horizon {horizon}h every {frequency}h");
        assert!(tasks.windows(2).all(|pair| pair[0].scheduled_at < pair[1].scheduled_at));
    }
}

#[test]
fn non_positive_frequency_or_horizon_is_rejected() {
    let mut plan = care_plan("cp-daisy", "daisy");
    plan.feeding_plan = Some(feeding_plan(0.0));
    assert!(matches!(
        generate_tasks(&plan, &[], at(16, 8, 0), 24.0),
        Err(NicuError::InvalidSchedule(_))
    ));

    let plan = care_plan("cp-daisy", "daisy");
    assert!(matches!(
        generate_tasks(&plan, &[], at(16, 8, 0), 0.0),
        Err(NicuError::InvalidSchedule(_))
    ));
}

#[test]
fn separately_given_medicines_never_ride_in_feeds() {
    let plan = care_plan("cp-daisy", "daisy");
    let mut vitamin_d = prescription("rx-vitd", "daisy", "Vitamin D", &["09:00"]);
    vitamin_d.can_be_given_in_feed = true;
    let mut gaviscon = prescription("rx-gaviscon", "daisy", "Gaviscon", &["12:00"]);
    gaviscon.can_be_given_in_feed = true;
    gaviscon.must_be_given_separately = true;

    let tasks = generate_tasks(&plan, &[vitamin_d, gaviscon], at(16, 8, 0), 24.0).expect("tasks");

    let feeds: Vec<_> = tasks
        .iter()
        .filter_map(|task| match &task.details {
            TaskDetails::Feeding(details) => Some(details),
            _ => None,
        })
        .collect();
    assert_eq!(feeds.len(), 8);
    for details in feeds {
        let ids: Vec<&str> = details
            .medications_to_include
            .iter()
            .map(|med| med.prescription_id.as_str())
            .collect();
        assert_eq!(ids, vec!["rx-vitd"]);
    }

    let gaviscon_doses = tasks
        .iter()
        .filter(|task| task.generated_from.source_id == "rx-gaviscon")
        .count();
    assert_eq!(gaviscon_doses, 1);
}

#[test]
fn empty_timings_fail_but_prn_orders_are_skipped() {
    let plan = care_plan("cp-daisy", "daisy");

    let mut as_needed = prescription("rx-paracetamol", "daisy", "Paracetamol", &[]);
    as_needed.is_prn = true;
    let tasks = generate_tasks(&plan, &[as_needed], at(16, 8, 0), 24.0).expect("prn skipped");
    assert!(tasks.iter().all(|task| task.task_type() != TaskType::Medication));

    let broken = prescription("rx-broken", "daisy", "Iron", &[]);
    assert!(matches!(
        generate_tasks(&plan, &[broken], at(16, 8, 0), 24.0),
        Err(NicuError::EmptyTimings { .. })
    ));
}

#[test]
fn inactive_plan_yields_no_tasks() {
    let service = ShiftTaskService::default();
    let mut plan = care_plan("cp-daisy", "daisy");
    plan.status = CarePlanStatus::Suspended;

    assert!(generate_tasks(&plan, &[], at(16, 8, 0), 24.0).expect("tasks").is_empty());

    let shift = service.shift_window(date(16), ShiftType::Day).expect("shift");
    let tasks = service
        .patient_shift_tasks("daisy", &[plan], &[], &shift)
        .expect("shift tasks");
    assert!(tasks.is_empty());
}

#[test]
fn shift_bundle_keeps_only_its_own_slice() {
    let (patients, plans, prescriptions) = ward();
    let service = ShiftTaskService::default();

    let day = service
        .generate_shift_tasks(&patients, &plans, &prescriptions, ShiftType::Day, date(16), "sarah-nurse")
        .expect("day bundle");
    assert_eq!(day.shift_id, "shift-day-2026-10-16");
    assert!(day.all_tasks.iter().all(|task| day.shift.contains(task.scheduled_at)));
    // 4 feeds, 3 obs and 2 medicines for daisy; elsa has no orders.
    assert_eq!(day.tasks_by_patient["daisy"].len(), 9);
    assert_eq!(day.tasks_by_patient["elsa"].len(), 7);
    assert_eq!(day.stats.total_tasks, 16);
    assert_eq!(day.stats.by_type[&TaskType::Medication], 2);

    let first = &day.all_tasks[0];
    let window = first.window.expect("window");
    assert_eq!(window.start, at(16, 8, 0));
    assert_eq!(window.end, at(16, 8, 30));
    assert_eq!(first.shift.as_ref().map(|s| s.shift_id.as_str()), Some("shift-day-2026-10-16"));

    let night = service
        .generate_shift_tasks(&patients, &plans, &prescriptions, ShiftType::Night, date(16), "sarah-nurse")
        .expect("night bundle");
    let night_feeds: Vec<_> = night.tasks_by_patient["daisy"]
        .iter()
        .filter(|task| task.task_type() == TaskType::Feeding)
        .map(|task| task.scheduled_time_of_day.as_str())
        .collect();
    assert_eq!(night_feeds, vec!["20:00", "23:00", "02:00", "05:00"]);
}

#[test]
fn reminders_lead_by_priority() {
    let (patients, plans, prescriptions) = ward();
    let service = ShiftTaskService::default();
    let bundle = service
        .generate_shift_tasks(&patients[..1], &plans, &prescriptions, ShiftType::Day, date(16), "sarah-nurse")
        .expect("bundle");

    assert_eq!(bundle.reminders.len(), bundle.all_tasks.len());
    let feed = &bundle.reminders[0];
    assert_eq!(feed.message, "Due at 08:00: Feed due (34ml)");
    assert_eq!(feed.scheduled_for, at(16, 7, 45));

    let caffeine = bundle
        .reminders
        .iter()
        .find(|reminder| reminder.message.contains("Caffeine"))
        .expect("caffeine reminder");
    assert_eq!(caffeine.scheduled_for, at(16, 9, 30));
}

#[test]
fn regenerating_a_shift_is_deterministic() {
    let (patients, plans, prescriptions) = ward();
    let service = ShiftTaskService::default();

    let first = service
        .generate_shift_tasks(&patients, &plans, &prescriptions, ShiftType::Day, date(16), "sarah-nurse")
        .expect("first");
    let second = service
        .generate_shift_tasks(&patients, &plans, &prescriptions, ShiftType::Day, date(16), "sarah-nurse")
        .expect("second");

    assert_eq!(first.all_tasks, second.all_tasks);
    assert_eq!(first.tasks_by_patient, second.tasks_by_patient);
    assert_eq!(
        first.all_tasks[0].id.as_str(),
        "feeding-cp-daisy-20261016T0800Z"
    );
}

#[test]
fn status_views_feed_the_derived_lists() {
    let (patients, plans, prescriptions) = ward();
    let service = ShiftTaskService::default();
    let bundle = service
        .generate_shift_tasks(&patients[..1], &plans, &prescriptions, ShiftType::Day, date(16), "sarah-nurse")
        .expect("bundle");

    let first_feed = &bundle.all_tasks[0];
    let mut ledger = TaskLedger::new();
    ledger
        .record(
            first_feed.id.clone(),
            TaskOutcome::Completed {
                at: at(16, 8, 10),
                by: "sarah-nurse".to_string(),
                record_type: CompletionRecordType::for_task(first_feed.task_type()),
                record_id: "feed-001".to_string(),
                variance: None,
            },
        )
        .expect("record");

    let now = at(16, 10, 40);
    let views = service.status_views(&bundle.all_tasks, &ledger, now);
    assert_eq!(views[0].status, TaskStatus::Completed);

    let overdue = overdue_tasks(&views, now);
    let overdue_times: Vec<_> = overdue.iter().map(|v| v.task.scheduled_time_of_day.as_str()).collect();
    assert_eq!(overdue_times, vec!["08:00", "09:00", "10:00"]);
    assert!(overdue.iter().all(|view| view.status == TaskStatus::Overdue));

    // The 11:00 feed is already due, so only the 12:00 observations are upcoming.
    let upcoming = upcoming_tasks(&views, now, 90);
    let upcoming_times: Vec<_> = upcoming.iter().map(|v| v.task.scheduled_time_of_day.as_str()).collect();
    assert_eq!(upcoming_times, vec!["12:00"]);
    assert!(upcoming.iter().all(|view| view.status == TaskStatus::Pending));
    assert!(views
        .iter()
        .any(|view| view.task.scheduled_time_of_day == "11:00" && view.status == TaskStatus::Due));

    let handover = handover_tasks(&views, now, 4);
    assert_eq!(handover.outstanding.len(), 3);
    assert_eq!(handover.upcoming.len(), 3);

    let manager = filter_tasks_for_role(&views, Role::UnitManager);
    assert_eq!(manager.len(), 3);
}

#[test]
fn role_filters_are_idempotent_subsets() {
    let (patients, plans, prescriptions) = ward();
    let service = ShiftTaskService::default();
    let bundle = service
        .generate_shift_tasks(&patients, &plans, &prescriptions, ShiftType::Day, date(16), "sarah-nurse")
        .expect("bundle");
    let views = service.status_views(&bundle.all_tasks, &TaskLedger::new(), at(16, 13, 0));

    for role in [Role::Nurse, Role::Hca, Role::Doctor, Role::Anp, Role::UnitManager] {
        let once = filter_tasks_for_role(&views, role);
        assert!(once.iter().all(|view| views.contains(view)), "{role:?} is a subset");
        assert_eq!(filter_tasks_for_role(&once, role), once, "{role:?} is idempotent");
    }

    assert_eq!(filter_tasks_for_role(&views, Role::Nurse).len(), views.len());
    let doctor = filter_tasks_for_role(&views, Role::Doctor);
    assert!(doctor.iter().all(|view| view.task.task_type() == TaskType::Medication));
    let hca = filter_tasks_for_role(&views, Role::Hca);
    assert!(hca.iter().all(|view| view.task.task_type() == TaskType::VitalSigns));
}

#[test]
fn clusters_partition_each_patient() {
    let (patients, plans, prescriptions) = ward();
    let service = ShiftTaskService::default();
    let bundle = service
        .generate_shift_tasks(&patients, &plans, &prescriptions, ShiftType::Day, date(16), "sarah-nurse")
        .expect("bundle");

    for window in [0, 30, 60, 240] {
        let clusters = cluster_tasks(&bundle.all_tasks, window);

        let mut clustered: BTreeMap<String, usize> = BTreeMap::new();
        for cluster in &clusters {
            *clustered.entry(cluster.baby_id.clone()).or_default() += cluster.tasks.len();
            assert!(cluster.tasks.iter().all(|task| task.baby_id == cluster.baby_id));
            for pair in cluster.tasks.windows(2) {
                let gap = pair[1].scheduled_at - pair[0].scheduled_at;
                assert!(gap >= chrono::Duration::zero());
                assert!(gap <= chrono::Duration::minutes(window));
            }
        }
        assert_eq!(clustered, bundle.stats.by_patient);
    }

    let daisy = &bundle.tasks_by_patient["daisy"];
    assert_eq!(cluster_tasks(daisy, 30).len(), 8);

    let hourly = cluster_tasks(daisy, 60);
    let windows: Vec<_> = hourly.iter().map(|c| c.time_window.as_str()).collect();
    assert_eq!(windows, vec!["08:00-12:00", "14:00", "16:00-17:00"]);
    assert!(hourly[0].can_be_combined);
}

#[test]
fn pre_generation_covers_the_look_ahead() {
    let (patients, plans, prescriptions) = ward();
    let service = ShiftTaskService::default();
    let bundles = service
        .pre_generate_upcoming_shifts(&patients, &plans, &prescriptions, "system", at(16, 9, 0), 24.0)
        .expect("bundles");

    let ids: Vec<_> = bundles.iter().map(|b| b.shift_id.as_str()).collect();
    assert_eq!(ids, vec!["shift-day-2026-10-16", "shift-night-2026-10-16"]);
}

struct Records {
    patients: Vec<Patient>,
    plans: Vec<CarePlan>,
    prescriptions: Vec<Prescription>,
}

impl ClinicalRecords for Records {
    fn patients(&self) -> &[Patient] {
        &self.patients
    }

    fn care_plans(&self, patient_id: &str) -> Vec<CarePlan> {
        self.plans.iter().filter(|p| p.baby_id == patient_id).cloned().collect()
    }

    fn prescriptions(&self, patient_id: &str) -> Vec<Prescription> {
        self.prescriptions
            .iter()
            .filter(|rx| rx.baby_id == patient_id)
            .cloned()
            .collect()
    }

    fn feeds(&self, _patient_id: &str) -> Vec<FeedingRecord> {
        Vec::new()
    }

    fn episodes(&self, _patient_id: &str) -> Vec<Episode> {
        Vec::new()
    }

    fn current_weight(&self, _patient_id: &str) -> Option<f64> {
        None
    }

    fn respiratory_support(&self, _patient_id: &str) -> Option<String> {
        None
    }
}

#[test]
fn planner_caches_until_invalidated() {
    let (patients, plans, prescriptions) = ward();
    let mut records = Records {
        patients,
        plans,
        prescriptions,
    };
    let mut planner = ShiftPlanner::default();

    let first = planner
        .tasks_for(&records, "daisy", ShiftType::Day, date(16))
        .expect("tasks")
        .to_vec();
    assert_eq!(first.len(), 9);
    assert!(planner.is_cached("daisy", "shift-day-2026-10-16"));

    // A revised plan is invisible until the patient is invalidated.
    let (old, mut next) = records.plans[0].revise("cp-daisy-v2", at(1, 0, 0), |plan| {
        plan.feeding_plan = Some(feeding_plan(4.0));
    });
    next.medication_plan = None;
    records.plans[0] = old;
    records.plans.push(next);

    let cached = planner
        .tasks_for(&records, "daisy", ShiftType::Day, date(16))
        .expect("cached");
    assert_eq!(cached, first.as_slice());

    planner.invalidate_patient("daisy");
    assert!(!planner.is_cached("daisy", "shift-day-2026-10-16"));
    let fresh = planner
        .tasks_for(&records, "daisy", ShiftType::Day, date(16))
        .expect("fresh");
    // Feeds at 08, 12 and 16 plus obs at 08, 12 and 16.
    assert_eq!(fresh.len(), 6);
    assert!(fresh.iter().all(|task| task.generated_from.version == Some(2)));

    planner.invalidate_all();
    assert!(!planner.is_cached("daisy", "shift-day-2026-10-16"));
}
