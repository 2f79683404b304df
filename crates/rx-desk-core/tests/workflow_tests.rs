//! End-to-end workflow tests against the SQLite local store.

use std::sync::Arc;

use chrono::NaiveDate;
use rx_desk_core::clock::{FixedClock, SharedClock};
use rx_desk_core::composer::PrescriptionComposer;
use rx_desk_core::db::{Database, LocalStore};
use rx_desk_core::deriver::PatientDeriver;
use rx_desk_core::document::PrescriptionDocument;
use rx_desk_core::forms::save_patient;
use rx_desk_core::history::{HistoryFilter, HistoryMode};
use rx_desk_core::lists::EntityList;
use rx_desk_core::models::{Medicine, Patient, Prescription};
use rx_desk_core::EntityClient;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2024, 6, 15)
}

fn clock() -> SharedClock {
    Arc::new(FixedClock::on(today()).with_millis(1_718_409_987_654))
}

fn store() -> LocalStore {
    LocalStore::with_database(Database::open_in_memory().unwrap(), clock())
}

fn is_generated_patient_id(id: &str) -> bool {
    id.len() == 7 && id.starts_with('P') && id[1..].chars().all(|c| c.is_ascii_digit())
}

#[test]
fn test_registered_patient_gets_stable_id_and_age() {
    let store = store();
    let deriver = PatientDeriver::new(clock(), "P");
    let mut patient = Patient::new("Ada", "Lovelace");
    patient.date_of_birth = Some(date(1990, 1, 1));

    let saved = save_patient(&store, &deriver, patient).unwrap();
    let patient_id = saved.patient_id.clone().unwrap();

    assert!(is_generated_patient_id(&patient_id), "got {}", patient_id);
    assert_eq!(saved.age, Some(34));

    // Re-reads and later edits keep the id.
    let reread = store.get_patient(saved.id.unwrap()).unwrap().unwrap();
    assert_eq!(reread.patient_id.as_deref(), Some(patient_id.as_str()));

    let mut edited = reread.clone();
    edited.email = Some("ada@example.com".into());
    let later = PatientDeriver::new(
        Arc::new(FixedClock::on(date(2025, 1, 2)).with_millis(1)),
        "P",
    );
    let updated = save_patient(&store, &later, edited).unwrap();
    assert_eq!(updated.patient_id.as_deref(), Some(patient_id.as_str()));
    assert_eq!(updated.age, Some(35));
}

#[test]
fn test_remove_first_of_two_items_then_submit() {
    let store = store();
    let patient = store.create_patient(&Patient::new("Grace", "Hopper")).unwrap();
    let amox = store.create_medicine(&Medicine::new("Amoxicillin")).unwrap();
    let ibu = store.create_medicine(&Medicine::new("Ibuprofen")).unwrap();

    let mut composer = PrescriptionComposer::prepare(&store, None, today()).unwrap();
    composer.set_patient(patient.id);
    for (medicine, dosage) in [(&amox, "500mg"), (&ibu, "400mg")] {
        composer.select_medicine(&medicine.id.unwrap().to_string());
        composer.set_dosage(dosage);
        composer.set_frequency("Twice daily");
        composer.set_duration("5 days");
        composer.add_item().unwrap();
    }
    composer.remove_item(0);

    let saved = composer.submit(&store).unwrap();
    let stored = store.get_prescription(saved.id.unwrap()).unwrap().unwrap();

    assert_eq!(stored.prescription_items.len(), 1);
    let item = &stored.prescription_items[0];
    assert_eq!(item.medicine_id, ibu.id.unwrap());
    assert_eq!(item.medicine_name, "Ibuprofen");
    assert_eq!(item.dosage, "400mg");
    assert_eq!(item.duration, 5);
    assert_eq!(stored.visit_date, Some(today()));
}

#[test]
fn test_edit_prescription_replaces_items() {
    let store = store();
    let patient = store.create_patient(&Patient::new("Grace", "Hopper")).unwrap();
    let amox = store.create_medicine(&Medicine::new("Amoxicillin")).unwrap();

    let mut composer = PrescriptionComposer::prepare(&store, None, today()).unwrap();
    composer.set_patient(patient.id);
    composer.select_medicine(&amox.id.unwrap().to_string());
    composer.set_dosage("250mg");
    composer.set_frequency("TID");
    composer.set_duration("7");
    composer.add_item().unwrap();
    let created = composer.submit(&store).unwrap();

    let mut editor = PrescriptionComposer::prepare(&store, created.id, today()).unwrap();
    assert_eq!(editor.items().len(), 1);
    editor.remove_item(0);
    editor.set_notes("Course stopped early");
    let updated = editor.submit(&store).unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.prescription_id, created.prescription_id);
    assert!(updated.prescription_items.is_empty());
    assert_eq!(store.list_prescriptions().unwrap().len(), 1);
}

#[test]
fn test_history_filters_against_store() {
    let store = store();
    let patient = store.create_patient(&Patient::new("Ada", "Lovelace")).unwrap();
    let patient_id = patient.id.unwrap();
    for visit in [date(2019, 5, 1), date(2022, 6, 15), date(2024, 1, 20), date(2024, 6, 1)] {
        store
            .create_prescription(&Prescription::new(patient_id, Some(visit)))
            .unwrap();
    }

    let mut history = HistoryFilter::open(&store, patient_id, 2).unwrap();
    assert_eq!(history.prescriptions().len(), 4);

    history.set_start_date(Some(date(2024, 1, 20)));
    history.set_end_date(Some(date(2024, 6, 1)));
    history.apply_date_range(&store).unwrap();
    assert_eq!(history.prescriptions().len(), 2);

    history.load_older_than(&store, today()).unwrap();
    let older: Vec<_> = history.prescriptions().iter().filter_map(|p| p.visit_date).collect();
    assert_eq!(older, vec![date(2019, 5, 1)]);
    assert_eq!(history.mode(), HistoryMode::OlderThan { years: 2 });

    history.clear(&store).unwrap();
    assert_eq!(history.prescriptions().len(), 4);
}

#[test]
fn test_document_and_list_deletion() {
    let store = store();
    let mut patient = Patient::new("Ada", "Lovelace");
    patient.patient_id = Some("P555555".into());
    let patient = store.create_patient(&patient).unwrap();
    let mut rx = Prescription::new(patient.id.unwrap(), Some(today()));
    rx.notes = Some("After meals".into());
    let rx = store.create_prescription(&rx).unwrap();

    let doc = PrescriptionDocument::load(&store, rx.id.unwrap()).unwrap();
    assert_eq!(doc.notes_text(), "After meals");
    assert_eq!(doc.patient.as_ref().unwrap().patient_id.as_deref(), Some("P555555"));
    assert_eq!(
        doc.file_name(),
        format!("Prescription-{}.pdf", rx.prescription_id.clone().unwrap())
    );

    let mut prescriptions = EntityList::<Prescription>::new();
    prescriptions.load(&store).unwrap();
    assert!(prescriptions.delete(&store, rx.id.unwrap(), |_| true).unwrap());
    assert!(prescriptions.items().is_empty());

    let mut patients = EntityList::<Patient>::new();
    patients.load(&store).unwrap();
    assert!(patients.delete(&store, patient.id.unwrap(), |_| true).unwrap());
    assert!(store.list_patients().unwrap().is_empty());
}

#[test]
fn test_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rx-desk.db");
    let created = {
        let store = LocalStore::open(&path).unwrap();
        store.create_medicine(&Medicine::new("Amoxicillin")).unwrap()
    };

    let store = LocalStore::open(&path).unwrap();
    let medicines = store.list_medicines().unwrap();
    assert_eq!(medicines, vec![created]);
}
