//! Dwell-time and pH alerts for lines and feeding tubes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::UnitConfig;
use crate::model::{LineRecord, LineType, TubeCheck, TubeRecord};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Ok,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    LineDwell,
    TubeChange,
    TubePosition,
    TubePh,
}

impl AlertCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertCategory::LineDwell => "line_dwell",
            AlertCategory::TubeChange => "tube_change",
            AlertCategory::TubePosition => "tube_position",
            AlertCategory::TubePh => "tube_ph",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: String,
    pub baby_id: String,
    pub source_id: String,
    pub category: AlertCategory,
    pub severity: AlertSeverity,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineStatus {
    pub line_id: String,
    pub dwell_hours: f64,
    pub severity: AlertSeverity,
    pub alert: Option<Alert>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TubeStatus {
    pub tube_id: String,
    pub dwell_hours: f64,
    pub latest_ph: Option<f64>,
    pub ph_severity: AlertSeverity,
    pub change_due: bool,
    pub alerts: Vec<Alert>,
}

fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_minutes() as f64 / 60.0
}

fn alert(
    baby_id: &str,
    source_id: &str,
    category: AlertCategory,
    severity: AlertSeverity,
    message: String,
    now: DateTime<Utc>,
) -> Alert {
    Alert {
        id: format!("alert-{source_id}-{}-{}", category.as_str(), now.timestamp_millis()),
        baby_id: baby_id.to_string(),
        source_id: source_id.to_string(),
        category,
        severity,
        message,
        raised_at: now,
    }
}

/// Dwell time of a line against its warning and critical limits.
///
/// Lines with no configured threshold are reported without an alert.
pub fn line_alerts(line: &LineRecord, now: DateTime<Utc>, config: &UnitConfig) -> LineStatus {
    let dwell_hours = hours_between(line.inserted_at, now);
    let Some(threshold) = config.line_threshold(line.line_type) else {
        warn!(line_id = %line.id, line_type = ?line.line_type, "no dwell threshold configured");
        return LineStatus {
            line_id: line.id.clone(),
            dwell_hours,
            severity: AlertSeverity::Ok,
            alert: None,
        };
    };

    let severity = if dwell_hours >= threshold.critical.as_hours() {
        AlertSeverity::Critical
    } else if dwell_hours >= threshold.warning.as_hours() {
        AlertSeverity::Warning
    } else {
        AlertSeverity::Ok
    };

    let raised = (severity != AlertSeverity::Ok).then(|| {
        let limit = match severity {
            AlertSeverity::Critical => threshold.critical.as_hours(),
            _ => threshold.warning.as_hours(),
        };
        alert(
            &line.baby_id,
            &line.id,
            AlertCategory::LineDwell,
            severity,
            format!(
                "{} at {} in situ {:.0}h (limit {:.0}h)",
                line_label(line),
                line.insertion_site,
                dwell_hours,
                limit
            ),
            now,
        )
    });

    LineStatus {
        line_id: line.id.clone(),
        dwell_hours,
        severity,
        alert: raised,
    }
}

fn line_label(line: &LineRecord) -> &'static str {
    match line.line_type {
        LineType::PeripheralIv => "peripheral_IV",
        LineType::Picc => "PICC",
        LineType::Uac => "UAC",
        LineType::Uvc => "UVC",
        LineType::LongLine => "long line",
        LineType::FemoralLine => "femoral line",
    }
}

fn latest_check(tube: &TubeRecord) -> Option<&TubeCheck> {
    tube.checks.iter().max_by_key(|check| check.checked_at)
}

/// Latest aspirate pH, change-due and position-check state for a tube.
pub fn tube_alerts(tube: &TubeRecord, now: DateTime<Utc>, config: &UnitConfig) -> TubeStatus {
    let dwell_hours = hours_between(tube.inserted_at, now);
    let latest = latest_check(tube);
    let latest_ph = tube
        .checks
        .iter()
        .filter(|check| check.ph.is_some())
        .max_by_key(|check| check.checked_at)
        .and_then(|check| check.ph);

    let Some(threshold) = config.tube_threshold(tube.tube_type) else {
        warn!(tube_id = %tube.id, "no tube threshold configured");
        return TubeStatus {
            tube_id: tube.id.clone(),
            dwell_hours,
            latest_ph,
            ph_severity: AlertSeverity::Ok,
            change_due: false,
            alerts: Vec::new(),
        };
    };

    let mut alerts = Vec::new();

    let ph_severity = match latest_ph {
        Some(ph) if ph >= threshold.ph_critical => AlertSeverity::Critical,
        Some(ph) if ph >= threshold.ph_warning => AlertSeverity::Warning,
        _ => AlertSeverity::Ok,
    };
    if let (Some(ph), true) = (latest_ph, ph_severity != AlertSeverity::Ok) {
        alerts.push(alert(
            &tube.baby_id,
            &tube.id,
            AlertCategory::TubePh,
            ph_severity,
            format!("Aspirate pH {ph:.1}; confirm tube position before use"),
            now,
        ));
    }

    let change_due = dwell_hours >= threshold.change_after.as_hours();
    if change_due {
        alerts.push(alert(
            &tube.baby_id,
            &tube.id,
            AlertCategory::TubeChange,
            AlertSeverity::Warning,
            format!("Tube change due ({:.0}h in situ)", dwell_hours),
            now,
        ));
    }

    let since_check = hours_between(
        latest.map_or(tube.inserted_at, |check| check.checked_at),
        now,
    );
    if since_check > threshold.position_check.as_hours() {
        alerts.push(alert(
            &tube.baby_id,
            &tube.id,
            AlertCategory::TubePosition,
            AlertSeverity::Warning,
            format!("Position check overdue ({:.0}h since last check)", since_check),
            now,
        ));
    }

    TubeStatus {
        tube_id: tube.id.clone(),
        dwell_hours,
        latest_ph,
        ph_severity,
        change_due,
        alerts,
    }
}

/// Every live alert for one patient, critical first then by source id.
pub fn active_alerts_for(
    patient_id: &str,
    lines: &[LineRecord],
    tubes: &[TubeRecord],
    now: DateTime<Utc>,
    config: &UnitConfig,
) -> Vec<Alert> {
    let mut alerts: Vec<Alert> = lines
        .iter()
        .filter(|line| line.is_active && line.baby_id == patient_id)
        .filter_map(|line| line_alerts(line, now, config).alert)
        .chain(
            tubes
                .iter()
                .filter(|tube| tube.is_active && tube.baby_id == patient_id)
                .flat_map(|tube| tube_alerts(tube, now, config).alerts),
        )
        .collect();

    alerts.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.source_id.cmp(&b.source_id))
    });
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TubeType;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    fn line(id: &str, line_type: LineType, hours_in: i64) -> LineRecord {
        LineRecord {
            id: id.to_string(),
            baby_id: "daisy".to_string(),
            line_type,
            insertion_site: "left hand".to_string(),
            inserted_at: now() - Duration::hours(hours_in),
            is_active: true,
        }
    }

    fn tube(hours_in: i64, checks: Vec<TubeCheck>) -> TubeRecord {
        TubeRecord {
            id: "ng-1".to_string(),
            baby_id: "daisy".to_string(),
            tube_type: TubeType::Ng,
            inserted_at: now() - Duration::hours(hours_in),
            is_active: true,
            checks,
        }
    }

    #[test]
    fn peripheral_line_escalates_with_dwell() {
        let cfg = UnitConfig::default();
        assert_eq!(line_alerts(&line("piv", LineType::PeripheralIv, 24), now(), &cfg).severity, AlertSeverity::Ok);
        assert_eq!(line_alerts(&line("piv", LineType::PeripheralIv, 50), now(), &cfg).severity, AlertSeverity::Warning);

        let critical = line_alerts(&line("piv", LineType::PeripheralIv, 72), now(), &cfg);
        assert_eq!(critical.severity, AlertSeverity::Critical);
        assert!(critical.alert.unwrap().message.contains("peripheral_IV"));
    }

    #[test]
    fn high_ph_is_critical() {
        let cfg = UnitConfig::default();
        let status = tube(
            12,
            vec![
                TubeCheck { checked_at: now() - Duration::hours(3), ph: Some(4.5) },
                TubeCheck { checked_at: now() - Duration::hours(1), ph: Some(6.5) },
            ],
        );
        let status = tube_alerts(&status, now(), &cfg);
        assert_eq!(status.latest_ph, Some(6.5));
        assert_eq!(status.ph_severity, AlertSeverity::Critical);
        assert!(!status.change_due);
        assert_eq!(status.alerts.len(), 1);
    }

    #[test]
    fn old_unchecked_tube_is_due_for_change_and_check() {
        let cfg = UnitConfig::default();
        let status = tube_alerts(&tube(80, Vec::new()), now(), &cfg);
        assert!(status.change_due);
        let categories: Vec<_> = status.alerts.iter().map(|a| a.category).collect();
        assert_eq!(categories, vec![AlertCategory::TubeChange, AlertCategory::TubePosition]);
    }

    #[test]
    fn active_alerts_put_critical_first_and_skip_removed_lines() {
        let cfg = UnitConfig::default();
        let mut removed = line("old", LineType::PeripheralIv, 100);
        removed.is_active = false;
        let lines = vec![
            line("piv", LineType::PeripheralIv, 50),
            line("uvc", LineType::Uvc, 24 * 8),
            removed,
        ];
        let alerts = active_alerts_for("daisy", &lines, &[], now(), &cfg);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].source_id, "uvc");
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
    }
}
