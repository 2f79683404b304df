//! Prescription composition.
//!
//! Line items are staged locally and only reach the backend on [`submit`],
//! as one create or update carrying the whole ordered item list.
//!
//! [`submit`]: PrescriptionComposer::submit

use chrono::NaiveDate;
use thiserror::Error;

use crate::client::{ClientError, ClientResult, EntityClient};
use crate::models::{Medicine, Patient, Prescription, PrescriptionItem};

pub const MISSING_ITEM_FIELDS: &str =
    "Please select a medicine and fill dosage, frequency, and duration";
pub const MISSING_PATIENT: &str = "Please select a patient";

/// Composer errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComposeError {
    #[error("{0}")]
    Validation(String),

    #[error("Failed to load data: {0}")]
    Fetch(String),

    #[error("Prescription not found: {0}")]
    NotFound(i64),

    #[error("Failed to save prescription: {0}")]
    Save(String),
}

pub type ComposeResult<T> = Result<T, ComposeError>;

/// Whether the composer creates a new prescription or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeMode {
    Create,
    Edit(i64),
}

/// The line item currently being entered, as raw form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingItem {
    pub medicine_id: String,
    pub medicine_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
}

impl PendingItem {
    /// All four required inputs are filled in.
    pub fn is_complete(&self) -> bool {
        [
            &self.medicine_id,
            &self.dosage,
            &self.frequency,
            &self.duration,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }

    fn to_item(&self) -> ComposeResult<PrescriptionItem> {
        if !self.is_complete() {
            return Err(ComposeError::Validation(MISSING_ITEM_FIELDS.into()));
        }
        let medicine_id = parse_leading_int(&self.medicine_id).ok_or_else(|| {
            ComposeError::Validation(format!("Invalid medicine id: {}", self.medicine_id))
        })?;
        let duration = parse_leading_int(&self.duration).ok_or_else(|| {
            ComposeError::Validation(format!(
                "Duration must start with a whole number of days: {}",
                self.duration
            ))
        })?;

        Ok(PrescriptionItem {
            medicine_id,
            medicine_name: self.medicine_name.clone(),
            dosage: self.dosage.trim().to_string(),
            frequency: self.frequency.trim().to_string(),
            duration,
        })
    }
}

/// Parse the leading integer of a form value: `"5 days"` is 5, `"days"` is `None`.
pub fn parse_leading_int(input: &str) -> Option<i64> {
    let s = input.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    rest[..digits_len].parse::<i64>().ok().map(|n| sign * n)
}

/// Staging area for one prescription.
#[derive(Debug, Clone)]
pub struct PrescriptionComposer {
    mode: ComposeMode,
    patients: Vec<Patient>,
    medicines: Vec<Medicine>,
    patient_id: Option<i64>,
    visit_date: Option<NaiveDate>,
    notes: String,
    items: Vec<PrescriptionItem>,
    prescription_id: Option<String>,
    pending: PendingItem,
    last_error: Option<ComposeError>,
}

impl PrescriptionComposer {
    /// A blank prescription dated `today`, composed against loaded catalogs.
    pub fn new(patients: Vec<Patient>, medicines: Vec<Medicine>, today: NaiveDate) -> Self {
        Self {
            mode: ComposeMode::Create,
            patients,
            medicines,
            patient_id: None,
            visit_date: Some(today),
            notes: String::new(),
            items: Vec::new(),
            prescription_id: None,
            pending: PendingItem::default(),
            last_error: None,
        }
    }

    /// Seed the composer from an existing prescription for editing.
    pub fn editing(
        existing: Prescription,
        patients: Vec<Patient>,
        medicines: Vec<Medicine>,
    ) -> ComposeResult<Self> {
        let id = existing.id.ok_or_else(|| {
            ComposeError::Validation("Cannot edit a prescription that was never saved".into())
        })?;
        Ok(Self {
            mode: ComposeMode::Edit(id),
            patients,
            medicines,
            patient_id: Some(existing.patient_id),
            visit_date: existing.visit_date,
            notes: existing.notes.unwrap_or_default(),
            items: existing.prescription_items,
            prescription_id: existing.prescription_id,
            pending: PendingItem::default(),
            last_error: None,
        })
    }

    /// Load catalogs (concurrently) and, when editing, the prescription itself.
    ///
    /// The prescription is only fetched once both catalogs have arrived.
    pub fn prepare(
        client: &dyn EntityClient,
        edit_id: Option<i64>,
        today: NaiveDate,
    ) -> ComposeResult<Self> {
        let (patients, medicines) = load_catalogs(client).map_err(|e| {
            tracing::warn!(error = %e, "failed to load catalogs for prescription form");
            ComposeError::Fetch(e.to_string())
        })?;

        match edit_id {
            None => Ok(Self::new(patients, medicines, today)),
            Some(id) => {
                let existing = client
                    .get_prescription(id)
                    .map_err(|e| ComposeError::Fetch(e.to_string()))?
                    .ok_or(ComposeError::NotFound(id))?;
                Self::editing(existing, patients, medicines)
            }
        }
    }

    pub fn mode(&self) -> ComposeMode {
        self.mode
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn medicines(&self) -> &[Medicine] {
        &self.medicines
    }

    /// Medicines offered for new items: active ones, plus inactive ones the
    /// draft already references.
    pub fn selectable_medicines(&self) -> Vec<&Medicine> {
        self.medicines
            .iter()
            .filter(|m| {
                m.is_active
                    || m.id.is_some_and(|id| {
                        self.items.iter().any(|item| item.medicine_id == id)
                    })
            })
            .collect()
    }

    pub fn patient_id(&self) -> Option<i64> {
        self.patient_id
    }

    pub fn set_patient(&mut self, patient_id: Option<i64>) {
        self.patient_id = patient_id;
    }

    pub fn visit_date(&self) -> Option<NaiveDate> {
        self.visit_date
    }

    pub fn set_visit_date(&mut self, date: Option<NaiveDate>) {
        self.visit_date = date;
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    pub fn items(&self) -> &[PrescriptionItem] {
        &self.items
    }

    pub fn pending(&self) -> &PendingItem {
        &self.pending
    }

    pub fn last_error(&self) -> Option<&ComposeError> {
        self.last_error.as_ref()
    }

    /// Pick a medicine for the pending item and capture its name.
    ///
    /// An id missing from the catalog leaves the name empty; the catalog is a
    /// snapshot and may be stale.
    pub fn select_medicine(&mut self, medicine_id: &str) {
        self.pending.medicine_id = medicine_id.trim().to_string();
        self.pending.medicine_name = self
            .medicines
            .iter()
            .find(|m| m.has_id(medicine_id))
            .map(|m| m.name.clone())
            .unwrap_or_default();
    }

    pub fn set_dosage(&mut self, dosage: impl Into<String>) {
        self.pending.dosage = dosage.into();
    }

    pub fn set_frequency(&mut self, frequency: impl Into<String>) {
        self.pending.frequency = frequency.into();
    }

    pub fn set_duration(&mut self, duration: impl Into<String>) {
        self.pending.duration = duration.into();
    }

    /// Append the pending item and clear the inputs.
    ///
    /// On a validation error neither the item list nor the inputs change.
    pub fn add_item(&mut self) -> ComposeResult<&PrescriptionItem> {
        match self.pending.to_item() {
            Ok(item) => {
                self.items.push(item);
                self.pending = PendingItem::default();
                self.last_error = None;
                let index = self.items.len() - 1;
                Ok(&self.items[index])
            }
            Err(e) => {
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Remove the item at `index`; out of range is a no-op.
    pub fn remove_item(&mut self, index: usize) -> Option<PrescriptionItem> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    /// The payload that `submit` would send.
    pub fn to_prescription(&self) -> ComposeResult<Prescription> {
        let patient_id = self
            .patient_id
            .ok_or_else(|| ComposeError::Validation(MISSING_PATIENT.into()))?;
        if !self.patients.iter().any(|p| p.id == Some(patient_id)) {
            return Err(ComposeError::Validation(format!(
                "Unknown patient: {}",
                patient_id
            )));
        }

        let notes = self.notes.trim();
        Ok(Prescription {
            id: match self.mode {
                ComposeMode::Edit(id) => Some(id),
                ComposeMode::Create => None,
            },
            prescription_id: self.prescription_id.clone(),
            patient_id,
            visit_date: self.visit_date,
            notes: (!notes.is_empty()).then(|| notes.to_string()),
            prescription_items: self.items.clone(),
        })
    }

    /// Create or update the prescription in one call.
    ///
    /// The draft is kept on failure so the user can retry.
    pub fn submit(&mut self, client: &dyn EntityClient) -> ComposeResult<Prescription> {
        let payload = match self.to_prescription() {
            Ok(payload) => payload,
            Err(e) => {
                self.last_error = Some(e.clone());
                return Err(e);
            }
        };

        let result = match self.mode {
            ComposeMode::Create => client.create_prescription(&payload),
            ComposeMode::Edit(id) => client.update_prescription(id, &payload),
        };

        match result {
            Ok(saved) => {
                tracing::info!(
                    id = ?saved.id,
                    items = saved.prescription_items.len(),
                    "prescription saved"
                );
                self.last_error = None;
                Ok(saved)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to save prescription");
                let error = ComposeError::Save(e.to_string());
                self.last_error = Some(error.clone());
                Err(error)
            }
        }
    }
}

fn load_catalogs(client: &dyn EntityClient) -> ClientResult<(Vec<Patient>, Vec<Medicine>)> {
    std::thread::scope(|scope| {
        let patients = scope.spawn(|| client.list_patients());
        let medicines = scope.spawn(|| client.list_medicines());
        let patients = join_load(patients.join())?;
        let medicines = join_load(medicines.join())?;
        Ok((patients, medicines))
    })
}

fn join_load<T>(joined: std::thread::Result<ClientResult<T>>) -> ClientResult<T> {
    joined.unwrap_or_else(|_| Err(ClientError::Http("catalog loader panicked".into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockClient;
    use proptest::prelude::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn setup() -> (MockClient, Patient, Medicine, Medicine) {
        let client = MockClient::new();
        let patient = client.add_patient(Patient::new("Ada", "Lovelace"));
        let amox = client.add_medicine(Medicine::new("Amoxicillin"));
        let mut retired = Medicine::new("Retiredol");
        retired.is_active = false;
        let retired = client.add_medicine(retired);
        (client, patient, amox, retired)
    }

    fn fill(composer: &mut PrescriptionComposer, medicine_id: &str, dosage: &str) {
        composer.select_medicine(medicine_id);
        composer.set_dosage(dosage);
        composer.set_frequency("Twice daily");
        composer.set_duration("5 days");
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("5"), Some(5));
        assert_eq!(parse_leading_int(" 14 days"), Some(14));
        assert_eq!(parse_leading_int("-3"), Some(-3));
        assert_eq!(parse_leading_int("+7d"), Some(7));
        assert_eq!(parse_leading_int("days"), None);
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int(""), None);
    }

    #[test]
    fn test_prepare_loads_both_catalogs() {
        let (client, _, _, _) = setup();
        let composer = PrescriptionComposer::prepare(&client, None, today()).unwrap();

        assert_eq!(composer.patients().len(), 1);
        assert_eq!(composer.medicines().len(), 2);
        assert_eq!(composer.visit_date(), Some(today()));
        assert_eq!(composer.mode(), ComposeMode::Create);
        assert_eq!(client.call_count("get_prescription"), 0);
    }

    #[test]
    fn test_prepare_edit_seeds_from_existing() {
        let (client, patient, amox, _) = setup();
        let mut existing = Prescription::new(patient.id.unwrap(), Some(today()));
        existing.notes = Some("Take with food".into());
        existing.prescription_items.push(PrescriptionItem {
            medicine_id: amox.id.unwrap(),
            medicine_name: "Amoxicillin".into(),
            dosage: "500mg".into(),
            frequency: "TID".into(),
            duration: 7,
        });
        let existing = client.add_prescription(existing);

        let composer =
            PrescriptionComposer::prepare(&client, existing.id, today()).unwrap();

        assert_eq!(composer.mode(), ComposeMode::Edit(existing.id.unwrap()));
        assert_eq!(composer.notes(), "Take with food");
        assert_eq!(composer.items().len(), 1);
        assert_eq!(composer.patient_id(), patient.id);
        // Detail is fetched after both catalogs.
        assert_eq!(client.calls().last(), Some(&"get_prescription"));
    }

    #[test]
    fn test_prepare_missing_prescription_is_not_found() {
        let (client, _, _, _) = setup();
        let err = PrescriptionComposer::prepare(&client, Some(999), today()).unwrap_err();
        assert_eq!(err, ComposeError::NotFound(999));
    }

    #[test]
    fn test_prepare_fetch_failure() {
        let (client, _, _, _) = setup();
        client.set_fail_reads(true);
        let err = PrescriptionComposer::prepare(&client, None, today()).unwrap_err();
        assert!(matches!(err, ComposeError::Fetch(_)));
    }

    #[test]
    fn test_select_medicine_captures_name() {
        let (client, _, amox, _) = setup();
        let mut composer = PrescriptionComposer::prepare(&client, None, today()).unwrap();

        composer.select_medicine(&amox.id.unwrap().to_string());
        assert_eq!(composer.pending().medicine_name, "Amoxicillin");

        composer.select_medicine("4242");
        assert_eq!(composer.pending().medicine_id, "4242");
        assert_eq!(composer.pending().medicine_name, "");
    }

    #[test]
    fn test_add_item_appends_and_clears_pending() {
        let (client, _, amox, _) = setup();
        let mut composer = PrescriptionComposer::prepare(&client, None, today()).unwrap();
        fill(&mut composer, &amox.id.unwrap().to_string(), "500mg");

        let item = composer.add_item().unwrap().clone();

        assert_eq!(item.medicine_id, amox.id.unwrap());
        assert_eq!(item.medicine_name, "Amoxicillin");
        assert_eq!(item.duration, 5);
        assert_eq!(composer.items().len(), 1);
        assert_eq!(composer.pending(), &PendingItem::default());
        assert!(composer.last_error().is_none());
    }

    #[test]
    fn test_add_item_rejects_incomplete_input() {
        let (client, _, amox, _) = setup();
        let mut composer = PrescriptionComposer::prepare(&client, None, today()).unwrap();
        composer.select_medicine(&amox.id.unwrap().to_string());
        composer.set_dosage("500mg");
        composer.set_frequency("  ");
        composer.set_duration("5");

        let err = composer.add_item().unwrap_err();

        assert_eq!(err, ComposeError::Validation(MISSING_ITEM_FIELDS.into()));
        assert!(composer.items().is_empty());
        assert_eq!(composer.pending().dosage, "500mg");
        assert_eq!(composer.last_error(), Some(&err));
    }

    #[test]
    fn test_add_item_rejects_non_numeric_duration() {
        let (client, _, amox, _) = setup();
        let mut composer = PrescriptionComposer::prepare(&client, None, today()).unwrap();
        fill(&mut composer, &amox.id.unwrap().to_string(), "500mg");
        composer.set_duration("a week");

        assert!(matches!(composer.add_item(), Err(ComposeError::Validation(_))));
        assert!(composer.items().is_empty());
    }

    #[test]
    fn test_remove_item_shifts_and_ignores_bad_index() {
        let (client, _, amox, _) = setup();
        let mut composer = PrescriptionComposer::prepare(&client, None, today()).unwrap();
        let id = amox.id.unwrap().to_string();
        for dosage in ["100mg", "200mg", "300mg"] {
            fill(&mut composer, &id, dosage);
            composer.add_item().unwrap();
        }

        assert!(composer.remove_item(7).is_none());
        assert_eq!(composer.items().len(), 3);

        let removed = composer.remove_item(1).unwrap();
        assert_eq!(removed.dosage, "200mg");
        let dosages: Vec<_> = composer.items().iter().map(|i| i.dosage.as_str()).collect();
        assert_eq!(dosages, vec!["100mg", "300mg"]);
    }

    #[test]
    fn test_selectable_medicines_hide_inactive_unless_referenced() {
        let (client, _, _, retired) = setup();
        let mut composer = PrescriptionComposer::prepare(&client, None, today()).unwrap();
        let names: Vec<_> = composer.selectable_medicines().iter().map(|m| m.name.clone()).collect();
        assert_eq!(names, vec!["Amoxicillin"]);

        fill(&mut composer, &retired.id.unwrap().to_string(), "1 tab");
        composer.add_item().unwrap();
        assert_eq!(composer.selectable_medicines().len(), 2);
    }

    #[test]
    fn test_submit_requires_patient() {
        let (client, _, _, _) = setup();
        let mut composer = PrescriptionComposer::prepare(&client, None, today()).unwrap();

        let err = composer.submit(&client).unwrap_err();
        assert_eq!(err, ComposeError::Validation(MISSING_PATIENT.into()));
        assert_eq!(client.call_count("create_prescription"), 0);

        composer.set_patient(Some(777));
        assert!(matches!(composer.submit(&client), Err(ComposeError::Validation(_))));
        assert_eq!(client.call_count("create_prescription"), 0);
    }

    #[test]
    fn test_submit_with_empty_patient_catalog() {
        let client = MockClient::new();
        let mut composer = PrescriptionComposer::prepare(&client, None, today()).unwrap();
        composer.set_patient(Some(777));

        let err = composer.submit(&client).unwrap_err();
        assert_eq!(err, ComposeError::Validation("Unknown patient: 777".into()));
        assert_eq!(client.call_count("create_prescription"), 0);
    }

    #[test]
    fn test_submit_create_sends_full_item_list() {
        let (client, patient, amox, _) = setup();
        let mut composer = PrescriptionComposer::prepare(&client, None, today()).unwrap();
        composer.set_patient(patient.id);
        composer.set_notes("Review in a week");
        let id = amox.id.unwrap().to_string();
        fill(&mut composer, &id, "250mg");
        composer.add_item().unwrap();
        fill(&mut composer, &id, "500mg");
        composer.add_item().unwrap();

        let saved = composer.submit(&client).unwrap();

        assert!(saved.id.is_some());
        assert_eq!(saved.notes.as_deref(), Some("Review in a week"));
        assert_eq!(saved.visit_date, Some(today()));
        let dosages: Vec<_> = saved.prescription_items.iter().map(|i| i.dosage.as_str()).collect();
        assert_eq!(dosages, vec!["250mg", "500mg"]);
    }

    #[test]
    fn test_submit_empty_item_list_is_allowed() {
        let (client, patient, _, _) = setup();
        let mut composer = PrescriptionComposer::prepare(&client, None, today()).unwrap();
        composer.set_patient(patient.id);

        let saved = composer.submit(&client).unwrap();
        assert!(saved.prescription_items.is_empty());
        assert_eq!(saved.notes, None);
    }

    #[test]
    fn test_submit_edit_updates_in_place() {
        let (client, patient, _, _) = setup();
        let existing = client.add_prescription(Prescription::new(patient.id.unwrap(), Some(today())));
        let mut composer =
            PrescriptionComposer::prepare(&client, existing.id, today()).unwrap();
        composer.set_notes("Updated");

        let saved = composer.submit(&client).unwrap();

        assert_eq!(saved.id, existing.id);
        assert_eq!(saved.prescription_id, existing.prescription_id);
        assert_eq!(client.call_count("update_prescription"), 1);
        assert_eq!(client.call_count("create_prescription"), 0);
        assert_eq!(client.prescriptions().len(), 1);
    }

    #[test]
    fn test_failed_submit_preserves_draft() {
        let (client, patient, amox, _) = setup();
        let mut composer = PrescriptionComposer::prepare(&client, None, today()).unwrap();
        composer.set_patient(patient.id);
        fill(&mut composer, &amox.id.unwrap().to_string(), "500mg");
        composer.add_item().unwrap();
        client.set_fail_writes(true);

        let err = composer.submit(&client).unwrap_err();

        assert!(matches!(err, ComposeError::Save(_)));
        assert_eq!(composer.items().len(), 1);
        assert_eq!(composer.patient_id(), patient.id);

        client.set_fail_writes(false);
        let saved = composer.submit(&client).unwrap();
        assert_eq!(saved.prescription_items.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_add_then_remove_restores_items(
            dosages in proptest::collection::vec("[a-z0-9]{1,6}", 0..5),
            dosage in "[a-z0-9]{1,6}",
            duration in 1i64..365,
        ) {
            let medicine = Medicine { id: Some(1), ..Medicine::new("Amoxicillin") };
            let mut composer = PrescriptionComposer::new(vec![], vec![medicine], today());
            for d in &dosages {
                fill(&mut composer, "1", d);
                composer.add_item().unwrap();
            }
            let before = composer.items().to_vec();

            fill(&mut composer, "1", &dosage);
            composer.set_duration(duration.to_string());
            composer.add_item().unwrap();
            let removed = composer.remove_item(before.len());

            prop_assert!(removed.is_some());
            prop_assert_eq!(composer.items(), before.as_slice());
        }

        #[test]
        fn prop_incomplete_item_never_changes_items(
            blank in 0usize..4,
            existing in 0usize..3,
        ) {
            let medicine = Medicine { id: Some(1), ..Medicine::new("Amoxicillin") };
            let mut composer = PrescriptionComposer::new(vec![], vec![medicine], today());
            for _ in 0..existing {
                fill(&mut composer, "1", "10mg");
                composer.add_item().unwrap();
            }
            fill(&mut composer, "1", "10mg");
            match blank {
                0 => composer.select_medicine(""),
                1 => composer.set_dosage(""),
                2 => composer.set_frequency(""),
                _ => composer.set_duration(""),
            }

            let result = composer.add_item();
            prop_assert!(
                matches!(result, Err(ComposeError::Validation(_))),
                "expected a validation error"
            );
            prop_assert_eq!(composer.items().len(), existing);
        }
    }
}
