//! Error type shared by every calculator in the crate.

/// Errors raised while generating or classifying ward work.
#[derive(Debug, thiserror::Error)]
pub enum NicuError {
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
    #[error("prescription {prescription_id} has no administration times")]
    EmptyTimings { prescription_id: String },
    #[error("invalid shift window: {0}")]
    InvalidShiftWindow(String),
    #[error("patient {patient_id} has {count} active care plans")]
    ConflictingCarePlans { patient_id: String, count: usize },
    #[error("task {task_id} already has a recorded outcome")]
    TaskAlreadyClosed { task_id: String },
    #[error("input is missing the minimum required data")]
    MissingData,
    #[error("could not read input: {0}")]
    Parse(String),
}

pub type NicuResult<T> = std::result::Result<T, NicuError>;

/// Rejects non-positive (and NaN) hour values.
pub(crate) fn ensure_positive_hours(value: f64, what: &str) -> NicuResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(NicuError::InvalidSchedule(format!(
            "{what} must be a positive number of hours, got {value}"
        )))
    }
}
