use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use nicu_core::{Role, ShiftType, UnitConfig};
use nicu_ward::{summarize_ward_str, WardRequest};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "nicu-cli",
    about = "Summarise one shift of nursing work from a ward JSON document."
)]
struct Args {
    /// Path to the ward JSON document.
    #[arg(short, long)]
    input: PathBuf,

    /// Unit configuration JSON; missing keys fall back to defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// day, night or long_day.
    #[arg(short, long, default_value = "day")]
    shift: ShiftType,

    /// Shift start date (YYYY-MM-DD). Defaults to the date of `--now`.
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Narrow the task list to what one role works from.
    #[arg(short, long)]
    role: Option<Role>,

    /// Evaluation instant in RFC 3339. Defaults to the current time.
    #[arg(long)]
    now: Option<DateTime<Utc>>,

    /// Print the whole summary as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let data = std::fs::read_to_string(&args.input)
        .with_context(|| format!("could not read {:?}", args.input))?;

    let config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path).with_context(|| format!("could not read {path:?}"))?;
            serde_json::from_str::<UnitConfig>(&raw).with_context(|| format!("invalid config {path:?}"))?
        }
        None => UnitConfig::default(),
    };

    let now = args.now.unwrap_or_else(Utc::now);
    let mut request = WardRequest::new(
        args.shift,
        args.date.unwrap_or_else(|| now.date_naive()),
        "nicu-cli",
        now,
    );
    request.role = args.role;

    info!(shift = %request.shift_type, date = %request.date, "summarising ward");
    let summary = summarize_ward_str(&data, &config, &request)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{} | {} | {} tasks",
        summary.unit_name, summary.bundle.shift_id, summary.bundle.stats.total_tasks
    );
    for patient in &summary.patients {
        let readiness = patient
            .discharge
            .as_ref()
            .map_or("no weight".to_string(), |criteria| {
                format!("{:?} ({}%)", criteria.overall_status, criteria.readiness_score)
            });
        println!(
            "  {} day {}: {} open, {} overdue, {} alerts, discharge {}",
            patient.patient.name,
            patient.day_of_life,
            patient.task_summary.pending + patient.task_summary.due,
            patient.task_summary.overdue,
            patient.alerts.len(),
            readiness
        );
    }

    Ok(())
}
