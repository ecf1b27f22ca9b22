//! Caller-owned cache of generated shift tasks.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::error::NicuResult;
use crate::records::ClinicalRecords;
use crate::shift::{ShiftTaskService, ShiftType};
use crate::task::NursingTask;

/// Memoises each patient's task list per shift.
///
/// Entries live until the caller invalidates them, normally after a care
/// plan or prescription for that patient changes.
#[derive(Debug, Default)]
pub struct ShiftPlanner {
    service: ShiftTaskService,
    cache: HashMap<(String, String), Vec<NursingTask>>,
}

impl ShiftPlanner {
    pub fn new(service: ShiftTaskService) -> Self {
        Self {
            service,
            cache: HashMap::new(),
        }
    }

    pub fn service(&self) -> &ShiftTaskService {
        &self.service
    }

    /// The patient's tasks for a shift, generating them on first use.
    pub fn tasks_for(
        &mut self,
        records: &dyn ClinicalRecords,
        patient_id: &str,
        shift_type: ShiftType,
        date: NaiveDate,
    ) -> NicuResult<&[NursingTask]> {
        let shift = self.service.shift_window(date, shift_type)?;
        let key = (patient_id.to_string(), shift.shift_id());

        if !self.cache.contains_key(&key) {
            let tasks = self.service.patient_shift_tasks(
                patient_id,
                &records.care_plans(patient_id),
                &records.prescriptions(patient_id),
                &shift,
            )?;
            debug!(patient_id, shift_id = %key.1, count = tasks.len(), "cached shift tasks");
            self.cache.insert(key.clone(), tasks);
        }

        Ok(self.cache.get(&key).map(Vec::as_slice).unwrap_or_default())
    }

    pub fn is_cached(&self, patient_id: &str, shift_id: &str) -> bool {
        self.cache
            .contains_key(&(patient_id.to_string(), shift_id.to_string()))
    }

    /// Drop every cached shift for one patient.
    pub fn invalidate_patient(&mut self, patient_id: &str) {
        self.cache.retain(|(cached_patient, _), _| cached_patient != patient_id);
    }

    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }
}
