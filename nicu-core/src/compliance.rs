//! Rolling feed compliance and NG-tube removal readiness.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{FeedingDefaults, NgRemovalCriteria, UnitConfig};
use crate::error::{ensure_positive_hours, NicuResult};
use crate::model::{CarePlan, FeedingRecord};

const WINDOW_HOURS: f64 = 24.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VolumeCompliance {
    pub total_prescribed: f64,
    pub total_actual: f64,
    pub compliance_rate: f64,
}

/// The three NG removal gates over the trailing window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NgRemovalReadiness {
    pub oral_threshold_met: bool,
    pub consecutive_hours_met: bool,
    pub zero_top_ups_met: bool,
    pub ready: bool,
    pub feeds_until_ready: usize,
    /// Passing feeds counted back from the most recent one.
    pub current_consecutive_streak: usize,
}

impl NgRemovalReadiness {
    fn not_ready(feeds_until_ready: usize) -> Self {
        Self {
            oral_threshold_met: false,
            consecutive_hours_met: false,
            zero_top_ups_met: false,
            ready: false,
            feeds_until_ready,
            current_consecutive_streak: 0,
        }
    }
}

/// Snapshot of one patient's feeding over the trailing 24 hours.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedingCompliance {
    pub id: String,
    pub baby_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub window_hours: f64,
    pub total_feeds_scheduled: usize,
    pub total_feeds_completed: usize,
    pub completion_rate: f64,
    pub oral_feeds: usize,
    pub ng_feeds: usize,
    /// Percent of volume taken orally, one decimal place.
    pub oral_percentage: f64,
    pub volume_compliance: VolumeCompliance,
    pub ng_removal_readiness: NgRemovalReadiness,
}

/// Compliance over `[end_time - 24h, end_time]`.
///
/// Missing plan or feed history is not an error: the snapshot simply
/// reports zero percentages and `ready = false`.
pub fn calculate_24hr_compliance(
    baby_id: &str,
    feeds: &[FeedingRecord],
    care_plan: Option<&CarePlan>,
    end_time: DateTime<Utc>,
    config: &UnitConfig,
) -> NicuResult<FeedingCompliance> {
    let feeding_plan = care_plan.and_then(|plan| plan.feeding_plan.as_ref());
    let frequency = feeding_plan.map_or(config.feeding.default_frequency_hours, |plan| plan.frequency);
    ensure_positive_hours(frequency, "feeding frequency")?;

    let window_start = end_time - Duration::hours(WINDOW_HOURS as i64);
    let in_window: Vec<&FeedingRecord> = feeds
        .iter()
        .filter(|feed| {
            feed.baby_id == baby_id && feed.feed_time >= window_start && feed.feed_time <= end_time
        })
        .collect();

    let total_feeds_scheduled = (WINDOW_HOURS / frequency + 1e-9).floor() as usize;
    let oral_feeds = in_window.iter().filter(|feed| feed.route.is_oral()).count();
    let ng_feeds = in_window
        .iter()
        .filter(|feed| feed.route.is_gastric_tube())
        .count();

    let total_actual: f64 = in_window.iter().map(|feed| feed.volume.actual).sum();
    let oral_volume: f64 = in_window.iter().map(|feed| feed.oral_volume()).sum();
    let total_prescribed =
        total_feeds_scheduled as f64 * feeding_plan.map_or(0.0, |plan| plan.volume_per_feed);

    Ok(FeedingCompliance {
        id: format!("compliance-{baby_id}-{}", end_time.timestamp_millis()),
        baby_id: baby_id.to_string(),
        window_start,
        window_end: end_time,
        window_hours: WINDOW_HOURS,
        total_feeds_scheduled,
        total_feeds_completed: in_window.len(),
        completion_rate: percentage(in_window.len() as f64, total_feeds_scheduled as f64),
        oral_feeds,
        ng_feeds,
        oral_percentage: round_one_decimal(percentage(oral_volume, total_actual)),
        volume_compliance: VolumeCompliance {
            total_prescribed,
            total_actual,
            compliance_rate: percentage(total_actual, total_prescribed),
        },
        ng_removal_readiness: check_ng_removal_readiness(baby_id, feeds, end_time, &config.ng_removal),
    })
}

/// All-or-nothing check over the trailing `consecutive_hours` window.
///
/// One failing feed anywhere in the window makes the whole window not ready.
pub fn check_ng_removal_readiness(
    baby_id: &str,
    feeds: &[FeedingRecord],
    end_time: DateTime<Utc>,
    criteria: &NgRemovalCriteria,
) -> NgRemovalReadiness {
    let window_start = end_time - Duration::seconds((criteria.consecutive_hours * 3600.0) as i64);
    let mut recent: Vec<&FeedingRecord> = feeds
        .iter()
        .filter(|feed| {
            feed.baby_id == baby_id && feed.feed_time >= window_start && feed.feed_time <= end_time
        })
        .collect();
    recent.sort_by_key(|feed| feed.feed_time);

    let minimum = criteria.minimum_consecutive_feeds;
    if recent.len() < minimum {
        return NgRemovalReadiness::not_ready(minimum - recent.len());
    }

    let passes = |feed: &FeedingRecord| feed_oral_percentage(feed) >= criteria.oral_percentage_threshold;
    let passing = recent.iter().filter(|feed| passes(**feed)).count();
    let streak = recent.iter().rev().take_while(|feed| passes(**feed)).count();

    let oral_threshold_met = passing == recent.len();
    let consecutive_hours_met = recent.len() >= minimum;
    let zero_top_ups_met = criteria.allow_ng_top_ups || recent.iter().all(|feed| !feed.used_tube());

    NgRemovalReadiness {
        oral_threshold_met,
        consecutive_hours_met,
        zero_top_ups_met,
        ready: oral_threshold_met && consecutive_hours_met && zero_top_ups_met,
        feeds_until_ready: if oral_threshold_met {
            0
        } else {
            minimum.saturating_sub(streak).max(1)
        },
        current_consecutive_streak: streak,
    }
}

/// Oral share of a single feed in percent; zero for an empty feed.
pub fn feed_oral_percentage(feed: &FeedingRecord) -> f64 {
    percentage(feed.oral_volume(), feed.volume.actual)
}

/// Volume per feed in whole ml for a weight-based daily allowance.
pub fn calculate_feed_volume(
    weight_grams: f64,
    frequency_hours: f64,
    ml_per_kg_per_day: f64,
) -> NicuResult<u32> {
    ensure_positive_hours(frequency_hours, "feeding frequency")?;
    let feeds_per_day = 24.0 / frequency_hours;
    let volume = (weight_grams / 1000.0) * ml_per_kg_per_day / feeds_per_day;
    Ok(volume.max(0.0).round() as u32)
}

pub fn is_weigh_day(date: NaiveDate, feeding: &FeedingDefaults) -> bool {
    feeding.weigh_days.contains(&date.weekday())
}

/// The first weigh day strictly after `from`, if any are configured.
pub fn next_weigh_day(from: NaiveDate, feeding: &FeedingDefaults) -> Option<NaiveDate> {
    (1..=7)
        .filter_map(|offset| from.checked_add_signed(Duration::days(offset)))
        .find(|date| is_weigh_day(*date, feeding))
}

fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_volume_rounds_to_whole_ml() {
        assert_eq!(calculate_feed_volume(1800.0, 3.0, 150.0).unwrap(), 34);
        assert_eq!(calculate_feed_volume(1000.0, 2.0, 180.0).unwrap(), 15);
        assert!(calculate_feed_volume(1800.0, 0.0, 150.0).is_err());
    }

    #[test]
    fn weigh_days_come_from_config() {
        let feeding = FeedingDefaults::default();
        // 2026-10-14 is a Wednesday.
        let wednesday = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        assert!(is_weigh_day(wednesday, &feeding));
        assert_eq!(
            next_weigh_day(wednesday, &feeding),
            NaiveDate::from_ymd_opt(2026, 10, 17)
        );

        let none = FeedingDefaults {
            weigh_days: Vec::new(),
            ..FeedingDefaults::default()
        };
        assert_eq!(next_weigh_day(wednesday, &none), None);
    }
}
