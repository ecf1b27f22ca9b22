mod common;

use chrono::Duration;
use common::{at, care_plan, feed};
use nicu_core::compliance::{calculate_24hr_compliance, check_ng_removal_readiness, feed_oral_percentage};
use nicu_core::config::{NgRemovalCriteria, UnitConfig};
use nicu_core::model::{FeedRoute, FeedingRecord};

fn end_time() -> chrono::DateTime<chrono::Utc> {
    at(16, 8, 0)
}

/// Eight 3-hourly oral feeds ending exactly at `end_time`.
fn oral_day() -> Vec<FeedingRecord> {
    (0..8)
        .map(|k| {
            let time = end_time() - Duration::hours(21 - 3 * k);
            feed(&format!("feed-{k}"), "daisy", time, FeedRoute::OralBottle, 40.0)
        })
        .collect()
}

#[test]
fn eight_oral_feeds_are_ready_for_ng_removal() {
    let readiness = check_ng_removal_readiness("daisy", &oral_day(), end_time(), &NgRemovalCriteria::default());

    assert!(readiness.oral_threshold_met);
    assert!(readiness.consecutive_hours_met);
    assert!(readiness.zero_top_ups_met);
    assert!(readiness.ready);
    assert_eq!(readiness.feeds_until_ready, 0);
    assert_eq!(readiness.current_consecutive_streak, 8);
}

#[test]
fn one_tube_feed_anywhere_in_the_window_resets_readiness() {
    let mut feeds = oral_day();
    feeds[3].route = FeedRoute::NgTube;

    let readiness = check_ng_removal_readiness("daisy", &feeds, end_time(), &NgRemovalCriteria::default());

    assert!(!readiness.ready);
    assert!(!readiness.oral_threshold_met);
    assert!(!readiness.zero_top_ups_met);
    assert_eq!(readiness.current_consecutive_streak, 4);
    assert_eq!(readiness.feeds_until_ready, 4);
}

#[test]
fn too_few_feeds_report_how_many_are_missing() {
    let feeds: Vec<_> = oral_day().into_iter().skip(3).collect();
    let readiness = check_ng_removal_readiness("daisy", &feeds, end_time(), &NgRemovalCriteria::default());

    assert!(!readiness.ready);
    assert_eq!(readiness.feeds_until_ready, 3);
}

#[test]
fn top_ups_allowed_only_checks_oral_share() {
    let mut feeds = oral_day();
    feeds[0].route = FeedRoute::Mixed;
    feeds[0].oral_volume = Some(39.0);

    let strict = check_ng_removal_readiness("daisy", &feeds, end_time(), &NgRemovalCriteria::default());
    assert!(strict.oral_threshold_met);
    assert!(!strict.zero_top_ups_met);
    assert!(!strict.ready);

    let lenient = NgRemovalCriteria {
        allow_ng_top_ups: true,
        ..NgRemovalCriteria::default()
    };
    assert!(check_ng_removal_readiness("daisy", &feeds, end_time(), &lenient).ready);
}

#[test]
fn daily_compliance_summarises_the_window() {
    let plan = care_plan("cp-daisy", "daisy");
    let mut feeds = oral_day();
    feeds.push(feed(
        "too-old",
        "daisy",
        end_time() - Duration::hours(25),
        FeedRoute::NgTube,
        40.0,
    ));
    feeds.push(feed("someone-else", "elsa", end_time(), FeedRoute::NgTube, 40.0));

    let compliance =
        calculate_24hr_compliance("daisy", &feeds, Some(&plan), end_time(), &UnitConfig::default())
            .expect("compliance");

    assert_eq!(compliance.window_start, at(15, 8, 0));
    assert_eq!(compliance.total_feeds_scheduled, 8);
    assert_eq!(compliance.total_feeds_completed, 8);
    assert_eq!(compliance.completion_rate, 100.0);
    assert_eq!(compliance.oral_feeds, 8);
    assert_eq!(compliance.ng_feeds, 0);
    assert_eq!(compliance.oral_percentage, 100.0);
    assert_eq!(compliance.volume_compliance.total_prescribed, 272.0);
    assert_eq!(compliance.volume_compliance.total_actual, 320.0);
    assert!(compliance.ng_removal_readiness.ready);
}

#[test]
fn oral_percentage_is_volume_weighted() {
    let mut feeds = oral_day();
    for feed in feeds.iter_mut().take(2) {
        feed.route = FeedRoute::NgTube;
    }

    let compliance = calculate_24hr_compliance("daisy", &feeds, None, end_time(), &UnitConfig::default())
        .expect("compliance");
    assert_eq!(compliance.oral_percentage, 75.0);
    assert_eq!(compliance.ng_feeds, 2);
    // No plan: the unit default of 3-hourly feeds, nothing prescribed.
    assert_eq!(compliance.total_feeds_scheduled, 8);
    assert_eq!(compliance.volume_compliance.compliance_rate, 0.0);
}

#[test]
fn empty_history_is_not_an_error() {
    let compliance = calculate_24hr_compliance("daisy", &[], None, end_time(), &UnitConfig::default())
        .expect("compliance");

    assert_eq!(compliance.total_feeds_completed, 0);
    assert_eq!(compliance.completion_rate, 0.0);
    assert_eq!(compliance.oral_percentage, 0.0);
    assert!(!compliance.ng_removal_readiness.ready);
    assert_eq!(compliance.ng_removal_readiness.feeds_until_ready, 8);
}

#[test]
fn zero_volume_feed_does_not_divide_by_zero() {
    let empty = feed("refused", "daisy", end_time(), FeedRoute::OralBottle, 0.0);
    assert_eq!(feed_oral_percentage(&empty), 0.0);

    let compliance = calculate_24hr_compliance("daisy", &[empty], None, end_time(), &UnitConfig::default())
        .expect("compliance");
    assert_eq!(compliance.oral_percentage, 0.0);
}
