//! In-memory client for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::NaiveDate;

use super::{ClientError, ClientResult, EntityClient};
use crate::history::older_than_cutoff;
use crate::models::{Medicine, Patient, Prescription};

#[derive(Default)]
struct MockState {
    patients: Vec<Patient>,
    medicines: Vec<Medicine>,
    prescriptions: Vec<Prescription>,
    next_id: i64,
}

impl MockState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Records every call and can be told to fail reads or writes.
pub(crate) struct MockClient {
    state: Mutex<MockState>,
    calls: Mutex<Vec<&'static str>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    /// Return every prescription of the patient from history queries,
    /// ignoring the requested filter
    unfiltered_history: AtomicBool,
    today: NaiveDate,
}

impl MockClient {
    pub fn new() -> Self {
        Self::on(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
    }

    pub fn on(today: NaiveDate) -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            calls: Mutex::new(Vec::new()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            unfiltered_history: AtomicBool::new(false),
            today,
        }
    }

    pub fn add_patient(&self, mut patient: Patient) -> Patient {
        let mut state = self.state.lock().unwrap();
        patient.id = Some(state.next_id());
        state.patients.push(patient.clone());
        patient
    }

    pub fn add_medicine(&self, mut medicine: Medicine) -> Medicine {
        let mut state = self.state.lock().unwrap();
        medicine.id = Some(state.next_id());
        state.medicines.push(medicine.clone());
        medicine
    }

    pub fn add_prescription(&self, mut prescription: Prescription) -> Prescription {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        prescription.id = Some(id);
        prescription.prescription_id = Some(format!("RX{:06}", id));
        state.prescriptions.push(prescription.clone());
        prescription
    }

    pub fn prescriptions(&self) -> Vec<Prescription> {
        self.state.lock().unwrap().prescriptions.clone()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_unfiltered_history(&self, unfiltered: bool) {
        self.unfiltered_history.store(unfiltered, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| **c == name).count()
    }

    fn read(&self, name: &'static str) -> ClientResult<()> {
        self.calls.lock().unwrap().push(name);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ClientError::Connection("mock".into()));
        }
        Ok(())
    }

    fn write(&self, name: &'static str) -> ClientResult<()> {
        self.calls.lock().unwrap().push(name);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ClientError::Server {
                status: 500,
                body: "mock failure".into(),
            });
        }
        Ok(())
    }

    fn history<F>(&self, patient_id: i64, keep: F) -> Vec<Prescription>
    where
        F: Fn(&Prescription) -> bool,
    {
        let unfiltered = self.unfiltered_history.load(Ordering::SeqCst);
        self.state
            .lock()
            .unwrap()
            .prescriptions
            .iter()
            .filter(|p| p.patient_id == patient_id && (unfiltered || keep(p)))
            .cloned()
            .collect()
    }
}

fn not_found(kind: &str, id: i64) -> ClientError {
    ClientError::NotFound(format!("{} {}", kind, id))
}

impl EntityClient for MockClient {
    fn list_patients(&self) -> ClientResult<Vec<Patient>> {
        self.read("list_patients")?;
        Ok(self.state.lock().unwrap().patients.clone())
    }

    fn get_patient(&self, id: i64) -> ClientResult<Option<Patient>> {
        self.read("get_patient")?;
        let state = self.state.lock().unwrap();
        Ok(state.patients.iter().find(|p| p.id == Some(id)).cloned())
    }

    fn create_patient(&self, patient: &Patient) -> ClientResult<Patient> {
        self.write("create_patient")?;
        Ok(self.add_patient(patient.clone()))
    }

    fn update_patient(&self, id: i64, patient: &Patient) -> ClientResult<Patient> {
        self.write("update_patient")?;
        let mut state = self.state.lock().unwrap();
        let slot = state
            .patients
            .iter_mut()
            .find(|p| p.id == Some(id))
            .ok_or_else(|| not_found("patient", id))?;
        *slot = Patient {
            id: Some(id),
            ..patient.clone()
        };
        Ok(slot.clone())
    }

    fn delete_patient(&self, id: i64) -> ClientResult<()> {
        self.write("delete_patient")?;
        let mut state = self.state.lock().unwrap();
        let before = state.patients.len();
        state.patients.retain(|p| p.id != Some(id));
        if state.patients.len() == before {
            return Err(not_found("patient", id));
        }
        Ok(())
    }

    fn list_medicines(&self) -> ClientResult<Vec<Medicine>> {
        self.read("list_medicines")?;
        Ok(self.state.lock().unwrap().medicines.clone())
    }

    fn get_medicine(&self, id: i64) -> ClientResult<Option<Medicine>> {
        self.read("get_medicine")?;
        let state = self.state.lock().unwrap();
        Ok(state.medicines.iter().find(|m| m.id == Some(id)).cloned())
    }

    fn create_medicine(&self, medicine: &Medicine) -> ClientResult<Medicine> {
        self.write("create_medicine")?;
        Ok(self.add_medicine(medicine.clone()))
    }

    fn update_medicine(&self, id: i64, medicine: &Medicine) -> ClientResult<Medicine> {
        self.write("update_medicine")?;
        let mut state = self.state.lock().unwrap();
        let slot = state
            .medicines
            .iter_mut()
            .find(|m| m.id == Some(id))
            .ok_or_else(|| not_found("medicine", id))?;
        *slot = Medicine {
            id: Some(id),
            ..medicine.clone()
        };
        Ok(slot.clone())
    }

    fn delete_medicine(&self, id: i64) -> ClientResult<()> {
        self.write("delete_medicine")?;
        let mut state = self.state.lock().unwrap();
        let before = state.medicines.len();
        state.medicines.retain(|m| m.id != Some(id));
        if state.medicines.len() == before {
            return Err(not_found("medicine", id));
        }
        Ok(())
    }

    fn list_prescriptions(&self) -> ClientResult<Vec<Prescription>> {
        self.read("list_prescriptions")?;
        Ok(self.prescriptions())
    }

    fn get_prescription(&self, id: i64) -> ClientResult<Option<Prescription>> {
        self.read("get_prescription")?;
        let state = self.state.lock().unwrap();
        Ok(state.prescriptions.iter().find(|p| p.id == Some(id)).cloned())
    }

    fn create_prescription(&self, prescription: &Prescription) -> ClientResult<Prescription> {
        self.write("create_prescription")?;
        Ok(self.add_prescription(prescription.clone()))
    }

    fn update_prescription(
        &self,
        id: i64,
        prescription: &Prescription,
    ) -> ClientResult<Prescription> {
        self.write("update_prescription")?;
        let mut state = self.state.lock().unwrap();
        let slot = state
            .prescriptions
            .iter_mut()
            .find(|p| p.id == Some(id))
            .ok_or_else(|| not_found("prescription", id))?;
        let prescription_id = slot.prescription_id.clone();
        *slot = Prescription {
            id: Some(id),
            prescription_id,
            ..prescription.clone()
        };
        Ok(slot.clone())
    }

    fn delete_prescription(&self, id: i64) -> ClientResult<()> {
        self.write("delete_prescription")?;
        let mut state = self.state.lock().unwrap();
        let before = state.prescriptions.len();
        state.prescriptions.retain(|p| p.id != Some(id));
        if state.prescriptions.len() == before {
            return Err(not_found("prescription", id));
        }
        Ok(())
    }

    fn list_prescriptions_for_patient(&self, patient_id: i64) -> ClientResult<Vec<Prescription>> {
        self.read("list_prescriptions_for_patient")?;
        Ok(self.history(patient_id, |_| true))
    }

    fn search_prescriptions_by_date_range(
        &self,
        patient_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ClientResult<Vec<Prescription>> {
        self.read("search_prescriptions_by_date_range")?;
        Ok(self.history(patient_id, |p| {
            p.visit_date.is_some_and(|d| start <= d && d <= end)
        }))
    }

    fn list_prescriptions_older_than(
        &self,
        patient_id: i64,
        years: u32,
    ) -> ClientResult<Vec<Prescription>> {
        self.read("list_prescriptions_older_than")?;
        let cutoff = older_than_cutoff(self.today, years);
        Ok(self.history(patient_id, |p| p.visit_date.is_some_and(|d| d < cutoff)))
    }
}
