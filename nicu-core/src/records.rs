//! Read access to a patient's clinical data.
//!
//! The calculators never assume a storage layout; a data provider only has
//! to answer these queries for a patient id.

use crate::episodes::Episode;
use crate::model::{CarePlan, FeedingRecord, LineRecord, Patient, Prescription, TubeRecord};

pub trait ClinicalRecords {
    fn patients(&self) -> &[Patient];

    /// Every plan version on file for the patient, active or not.
    fn care_plans(&self, patient_id: &str) -> Vec<CarePlan>;

    fn prescriptions(&self, patient_id: &str) -> Vec<Prescription>;

    fn feeds(&self, patient_id: &str) -> Vec<FeedingRecord>;

    fn episodes(&self, patient_id: &str) -> Vec<Episode>;

    /// Most recent weight in grams.
    fn current_weight(&self, patient_id: &str) -> Option<f64>;

    /// Current respiratory support, `None` when self-ventilating in air.
    fn respiratory_support(&self, patient_id: &str) -> Option<String>;

    fn lines(&self, _patient_id: &str) -> Vec<LineRecord> {
        Vec::new()
    }

    fn tubes(&self, _patient_id: &str) -> Vec<TubeRecord> {
        Vec::new()
    }

    fn patient(&self, patient_id: &str) -> Option<&Patient> {
        self.patients().iter().find(|patient| patient.id == patient_id)
    }
}
