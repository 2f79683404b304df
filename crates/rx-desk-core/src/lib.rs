//! Rx Desk Core Library
//!
//! Hospital prescription front end: patient registry, medicine catalog,
//! prescription composition and patient history, over a REST backend or a
//! local SQLite store.
//!
//! # Architecture
//!
//! ```text
//!   UI event
//!      │
//!      ▼
//! ┌──────────────┬───────────────┬──────────────┬──────────────┐
//! │ PatientForm  │  Composer     │ HistoryFilter│ EntityList   │
//! │ (+ Deriver)  │ (line items)  │ (range/older)│ (delete)     │
//! └──────┬───────┴───────┬───────┴──────┬───────┴──────┬───────┘
//!        └───────────────┴──────┬───────┴──────────────┘
//!                               ▼
//!                        dyn EntityClient
//!                     ┌─────────┴─────────┐
//!                     ▼                   ▼
//!              HttpEntityClient       LocalStore
//!               (REST / JSON)          (SQLite)
//! ```
//!
//! # Core Principle
//!
//! **Nothing reaches the backend until it is complete.** Line items are staged
//! in the composer and the whole prescription is sent in one call; filters
//! validate their inputs before issuing a request.
//!
//! # Modules
//!
//! - [`client`]: `EntityClient` trait and the REST implementation
//! - [`db`]: SQLite `LocalStore`
//! - [`models`]: Wire types (Patient, Medicine, Prescription)
//! - [`deriver`]: Patient age and id derivation
//! - [`composer`]: Prescription composition
//! - [`history`]: Patient history filters
//! - [`lists`], [`forms`]: List views and entity forms
//! - [`document`]: Printable prescription view model

pub mod client;
pub mod clock;
pub mod composer;
pub mod config;
pub mod db;
pub mod deriver;
pub mod document;
pub mod forms;
pub mod history;
pub mod lists;
pub mod logging;
pub mod models;

// Re-export commonly used types
pub use client::{ClientError, EntityClient, HttpEntityClient};
pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use composer::{ComposeError, ComposeMode, PrescriptionComposer};
pub use config::ClientConfig;
pub use db::{Database, LocalStore};
pub use deriver::{PatientDeriver, SaveMode};
pub use document::{DocumentLine, PatientSummary, PrescriptionDocument};
pub use history::{HistoryError, HistoryFilter, HistoryMode};
pub use lists::{EntityList, ListError, ListedEntity};
pub use models::{Medicine, Patient, Prescription, PrescriptionItem};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum RxDeskError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    FetchFailed(String),

    #[error("{0}")]
    SaveFailed(String),

    #[error("{0}")]
    DeleteFailed(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<client::ClientError> for RxDeskError {
    fn from(e: client::ClientError) -> Self {
        match e {
            client::ClientError::NotFound(what) => RxDeskError::NotFound(what),
            other => RxDeskError::Backend(other.to_string()),
        }
    }
}

impl From<db::DbError> for RxDeskError {
    fn from(e: db::DbError) -> Self {
        RxDeskError::Backend(e.to_string())
    }
}

impl From<config::ConfigError> for RxDeskError {
    fn from(e: config::ConfigError) -> Self {
        RxDeskError::Config(e.to_string())
    }
}

impl From<ComposeError> for RxDeskError {
    fn from(e: ComposeError) -> Self {
        match e {
            ComposeError::Validation(msg) => RxDeskError::InvalidInput(msg),
            ComposeError::Fetch(_) => RxDeskError::FetchFailed("Failed to load data".into()),
            ComposeError::NotFound(id) => RxDeskError::NotFound(format!("prescription {}", id)),
            ComposeError::Save(_) => {
                RxDeskError::SaveFailed("Failed to save prescription".into())
            }
        }
    }
}

impl From<HistoryError> for RxDeskError {
    fn from(e: HistoryError) -> Self {
        match e {
            HistoryError::Validation(msg) => RxDeskError::InvalidInput(msg),
            HistoryError::Fetch { message, .. } => RxDeskError::FetchFailed(message),
            HistoryError::PatientNotFound(id) => RxDeskError::NotFound(format!("patient {}", id)),
        }
    }
}

impl From<document::DocumentError> for RxDeskError {
    fn from(e: document::DocumentError) -> Self {
        match e {
            document::DocumentError::NotFound(id) => {
                RxDeskError::NotFound(format!("prescription {}", id))
            }
            other => RxDeskError::FetchFailed(other.to_string()),
        }
    }
}

impl From<ListError> for RxDeskError {
    fn from(e: ListError) -> Self {
        match e {
            ListError::Fetch(_) => RxDeskError::FetchFailed(e.to_string()),
            ListError::Delete(_) => RxDeskError::DeleteFailed(e.to_string()),
        }
    }
}

impl From<forms::FormError> for RxDeskError {
    fn from(e: forms::FormError) -> Self {
        match e {
            forms::FormError::Validation(msg) => RxDeskError::InvalidInput(msg),
            forms::FormError::NotFound(..) => RxDeskError::NotFound(e.to_string()),
            forms::FormError::Fetch(_) => RxDeskError::FetchFailed(e.to_string()),
            forms::FormError::Save(..) => RxDeskError::SaveFailed(e.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for RxDeskError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        RxDeskError::Backend(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Connect to a REST backend at `base_url`.
#[uniffi::export]
pub fn connect(base_url: String) -> Result<Arc<RxDesk>, RxDeskError> {
    let config = ClientConfig::for_base_url(&base_url)?;
    RxDesk::over_http(config)
}

/// Connect using `RX_DESK_*` environment settings (and `.env`).
#[uniffi::export]
pub fn connect_from_env() -> Result<Arc<RxDesk>, RxDeskError> {
    RxDesk::over_http(ClientConfig::from_env()?)
}

/// Open or create a local store at the given path.
#[uniffi::export]
pub fn open_local_store(path: String) -> Result<Arc<RxDesk>, RxDeskError> {
    let store = LocalStore::open(&path)?;
    Ok(Arc::new(RxDesk::new(
        Arc::new(store),
        ClientConfig::default(),
        clock::system_clock(),
    )))
}

/// Create an in-memory local store (for testing).
#[uniffi::export]
pub fn open_local_store_in_memory() -> Result<Arc<RxDesk>, RxDeskError> {
    let store = LocalStore::open_in_memory()?;
    Ok(Arc::new(RxDesk::new(
        Arc::new(store),
        ClientConfig::default(),
        clock::system_clock(),
    )))
}

/// Install the log subscriber; `false` if one was already installed.
#[uniffi::export]
pub fn init_logging(filter: Option<String>) -> bool {
    logging::init_logging(filter.as_deref())
}

// =========================================================================
// Main API Object
// =========================================================================

/// Workflow entry point shared with the UI shell.
#[derive(uniffi::Object)]
pub struct RxDesk {
    client: Arc<dyn EntityClient>,
    config: ClientConfig,
    clock: SharedClock,
    deriver: PatientDeriver,
}

impl RxDesk {
    pub fn new(client: Arc<dyn EntityClient>, config: ClientConfig, clock: SharedClock) -> Self {
        let deriver = PatientDeriver::new(clock.clone(), config.patient_id_prefix.clone());
        Self {
            client,
            config,
            clock,
            deriver,
        }
    }

    fn over_http(config: ClientConfig) -> Result<Arc<Self>, RxDeskError> {
        let client = HttpEntityClient::new(&config)?;
        tracing::info!(base_url = client.base_url(), "connected to backend");
        Ok(Arc::new(Self::new(
            Arc::new(client),
            config,
            clock::system_clock(),
        )))
    }

    pub fn client(&self) -> &dyn EntityClient {
        self.client.as_ref()
    }

    fn list<T: ListedEntity>(&self) -> Result<Vec<T>, RxDeskError> {
        let mut list = EntityList::<T>::new();
        list.load(self.client.as_ref())?;
        Ok(list.items().to_vec())
    }

    /// Deletion confirmed by the shell before the call.
    fn delete<T: ListedEntity>(&self, id: i64) -> Result<(), RxDeskError> {
        T::remove(self.client.as_ref(), id).map_err(|e| {
            tracing::warn!(error = %e, kind = T::NOUN, id, "delete failed");
            RxDeskError::from(ListError::Delete(T::NOUN))
        })
    }
}

#[uniffi::export]
impl RxDesk {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, RxDeskError> {
        Ok(self.list::<Patient>()?.into_iter().map(Into::into).collect())
    }

    /// Patients matching name, patient id or contact number.
    pub fn search_patients(&self, query: String) -> Result<Vec<FfiPatient>, RxDeskError> {
        let mut list = EntityList::<Patient>::new();
        list.load(self.client.as_ref())?;
        Ok(list.search(&query).into_iter().cloned().map(Into::into).collect())
    }

    pub fn get_patient(&self, id: i64) -> Result<FfiPatient, RxDeskError> {
        Ok(forms::load_patient(self.client.as_ref(), id)?.into())
    }

    /// Create or update; age and patient id are derived first.
    pub fn save_patient(&self, patient: FfiPatient) -> Result<FfiPatient, RxDeskError> {
        let patient = Patient::try_from(patient)?;
        Ok(forms::save_patient(self.client.as_ref(), &self.deriver, patient)?.into())
    }

    pub fn delete_patient(&self, id: i64) -> Result<(), RxDeskError> {
        self.delete::<Patient>(id)
    }

    // =========================================================================
    // Medicine Operations
    // =========================================================================

    pub fn list_medicines(&self) -> Result<Vec<FfiMedicine>, RxDeskError> {
        Ok(self.list::<Medicine>()?.into_iter().map(Into::into).collect())
    }

    pub fn get_medicine(&self, id: i64) -> Result<FfiMedicine, RxDeskError> {
        Ok(forms::load_medicine(self.client.as_ref(), id)?.into())
    }

    pub fn save_medicine(&self, medicine: FfiMedicine) -> Result<FfiMedicine, RxDeskError> {
        Ok(forms::save_medicine(self.client.as_ref(), medicine.into())?.into())
    }

    pub fn delete_medicine(&self, id: i64) -> Result<(), RxDeskError> {
        self.delete::<Medicine>(id)
    }

    // =========================================================================
    // Prescription Operations
    // =========================================================================

    pub fn list_prescriptions(&self) -> Result<Vec<FfiPrescription>, RxDeskError> {
        Ok(self
            .list::<Prescription>()?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub fn get_prescription(&self, id: i64) -> Result<FfiPrescription, RxDeskError> {
        self.client
            .get_prescription(id)?
            .map(Into::into)
            .ok_or_else(|| RxDeskError::NotFound(format!("prescription {}", id)))
    }

    pub fn delete_prescription(&self, id: i64) -> Result<(), RxDeskError> {
        self.delete::<Prescription>(id)
    }

    /// Start a new prescription, or edit `edit_id`.
    pub fn begin_prescription(
        &self,
        edit_id: Option<i64>,
    ) -> Result<Arc<PrescriptionDraft>, RxDeskError> {
        let composer =
            PrescriptionComposer::prepare(self.client.as_ref(), edit_id, self.clock.today())?;
        Ok(Arc::new(PrescriptionDraft {
            client: self.client.clone(),
            composer: Mutex::new(composer),
        }))
    }

    /// Printable view model of a saved prescription.
    pub fn load_document(&self, id: i64) -> Result<FfiPrescriptionDocument, RxDeskError> {
        Ok(PrescriptionDocument::load(self.client.as_ref(), id)?.into())
    }

    // =========================================================================
    // History Operations
    // =========================================================================

    /// Open a patient's unfiltered prescription history.
    pub fn open_history(&self, patient_id: i64) -> Result<Arc<PatientHistory>, RxDeskError> {
        let filter =
            HistoryFilter::open(self.client.as_ref(), patient_id, self.config.history_years)?;
        Ok(Arc::new(PatientHistory {
            client: self.client.clone(),
            clock: self.clock.clone(),
            loading: filter.loading_flag(),
            filter: Mutex::new(filter),
        }))
    }
}

// =========================================================================
// Prescription Draft Object
// =========================================================================

/// An in-progress prescription owned by one form.
#[derive(uniffi::Object)]
pub struct PrescriptionDraft {
    client: Arc<dyn EntityClient>,
    composer: Mutex<PrescriptionComposer>,
}

#[uniffi::export]
impl PrescriptionDraft {
    pub fn is_edit(&self) -> Result<bool, RxDeskError> {
        Ok(matches!(self.composer.lock()?.mode(), ComposeMode::Edit(_)))
    }

    pub fn patients(&self) -> Result<Vec<FfiPatient>, RxDeskError> {
        let composer = self.composer.lock()?;
        Ok(composer.patients().iter().cloned().map(Into::into).collect())
    }

    /// Medicines offered for new items.
    pub fn selectable_medicines(&self) -> Result<Vec<FfiMedicine>, RxDeskError> {
        let composer = self.composer.lock()?;
        Ok(composer
            .selectable_medicines()
            .into_iter()
            .cloned()
            .map(Into::into)
            .collect())
    }

    pub fn set_patient(&self, patient_id: Option<i64>) -> Result<(), RxDeskError> {
        self.composer.lock()?.set_patient(patient_id);
        Ok(())
    }

    pub fn set_visit_date(&self, date: Option<String>) -> Result<(), RxDeskError> {
        let date = parse_optional_date(date)?;
        self.composer.lock()?.set_visit_date(date);
        Ok(())
    }

    pub fn set_notes(&self, notes: String) -> Result<(), RxDeskError> {
        self.composer.lock()?.set_notes(notes);
        Ok(())
    }

    pub fn select_medicine(&self, medicine_id: String) -> Result<(), RxDeskError> {
        self.composer.lock()?.select_medicine(&medicine_id);
        Ok(())
    }

    pub fn set_dosage(&self, dosage: String) -> Result<(), RxDeskError> {
        self.composer.lock()?.set_dosage(dosage);
        Ok(())
    }

    pub fn set_frequency(&self, frequency: String) -> Result<(), RxDeskError> {
        self.composer.lock()?.set_frequency(frequency);
        Ok(())
    }

    pub fn set_duration(&self, duration: String) -> Result<(), RxDeskError> {
        self.composer.lock()?.set_duration(duration);
        Ok(())
    }

    pub fn add_item(&self) -> Result<FfiPrescriptionItem, RxDeskError> {
        let mut composer = self.composer.lock()?;
        Ok(composer.add_item()?.clone().into())
    }

    pub fn remove_item(&self, index: u32) -> Result<Option<FfiPrescriptionItem>, RxDeskError> {
        let mut composer = self.composer.lock()?;
        Ok(composer.remove_item(index as usize).map(Into::into))
    }

    pub fn items(&self) -> Result<Vec<FfiPrescriptionItem>, RxDeskError> {
        let composer = self.composer.lock()?;
        Ok(composer.items().iter().cloned().map(Into::into).collect())
    }

    /// Send the whole prescription; the draft survives a failed save.
    pub fn submit(&self) -> Result<FfiPrescription, RxDeskError> {
        let mut composer = self.composer.lock()?;
        Ok(composer.submit(self.client.as_ref())?.into())
    }
}

// =========================================================================
// Patient History Object
// =========================================================================

#[derive(uniffi::Object)]
pub struct PatientHistory {
    client: Arc<dyn EntityClient>,
    clock: SharedClock,
    /// Shared with the filter; readable while a query holds the lock
    loading: Arc<AtomicBool>,
    filter: Mutex<HistoryFilter>,
}

#[uniffi::export]
impl PatientHistory {
    pub fn patient(&self) -> Result<Option<FfiPatient>, RxDeskError> {
        Ok(self.filter.lock()?.patient().cloned().map(Into::into))
    }

    pub fn prescriptions(&self) -> Result<Vec<FfiPrescription>, RxDeskError> {
        let filter = self.filter.lock()?;
        Ok(current(&filter))
    }

    /// True while a history query is running.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn threshold_years(&self) -> Result<u32, RxDeskError> {
        Ok(self.filter.lock()?.threshold_years())
    }

    /// Filter by an inclusive visit-date range (`YYYY-MM-DD`).
    pub fn filter_by_date_range(
        &self,
        start: Option<String>,
        end: Option<String>,
    ) -> Result<Vec<FfiPrescription>, RxDeskError> {
        let start = parse_optional_date(start)?;
        let end = parse_optional_date(end)?;
        let mut filter = self.filter.lock()?;
        filter.set_start_date(start);
        filter.set_end_date(end);
        filter.apply_date_range(self.client.as_ref())?;
        Ok(current(&filter))
    }

    pub fn filter_older_than(&self) -> Result<Vec<FfiPrescription>, RxDeskError> {
        let mut filter = self.filter.lock()?;
        filter.load_older_than(self.client.as_ref(), self.clock.today())?;
        Ok(current(&filter))
    }

    pub fn clear_filters(&self) -> Result<Vec<FfiPrescription>, RxDeskError> {
        let mut filter = self.filter.lock()?;
        filter.clear(self.client.as_ref())?;
        Ok(current(&filter))
    }
}

fn current(filter: &HistoryFilter) -> Vec<FfiPrescription> {
    filter
        .prescriptions()
        .iter()
        .cloned()
        .map(Into::into)
        .collect()
}

// =========================================================================
// FFI Types
// =========================================================================

fn parse_date(value: &str) -> Result<NaiveDate, RxDeskError> {
    models::dates::parse_wire_date(value)
        .ok_or_else(|| RxDeskError::InvalidInput(format!("Invalid date: {}", value)))
}

/// Blank strings count as "no date".
fn parse_optional_date(value: Option<String>) -> Result<Option<NaiveDate>, RxDeskError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_date(v).map(Some),
    }
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(models::dates::to_form_date)
}

/// FFI-safe patient. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: Option<i64>,
    pub patient_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub age: Option<u32>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl From<Patient> for FfiPatient {
    fn from(p: Patient) -> Self {
        Self {
            id: p.id,
            patient_id: p.patient_id,
            first_name: p.first_name,
            last_name: p.last_name,
            gender: p.gender,
            date_of_birth: format_date(p.date_of_birth),
            age: p.age,
            contact_number: p.contact_number,
            email: p.email,
            address: p.address,
        }
    }
}

impl TryFrom<FfiPatient> for Patient {
    type Error = RxDeskError;

    fn try_from(p: FfiPatient) -> Result<Self, Self::Error> {
        Ok(Patient {
            id: p.id,
            patient_id: p.patient_id,
            first_name: p.first_name,
            last_name: p.last_name,
            gender: p.gender,
            date_of_birth: parse_optional_date(p.date_of_birth)?,
            age: p.age,
            contact_number: p.contact_number,
            email: p.email,
            address: p.address,
        })
    }
}

/// FFI-safe medicine.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedicine {
    pub id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub manufacturer: Option<String>,
    pub category: Option<String>,
    pub is_active: bool,
}

impl From<Medicine> for FfiMedicine {
    fn from(m: Medicine) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            manufacturer: m.manufacturer,
            category: m.category,
            is_active: m.is_active,
        }
    }
}

impl From<FfiMedicine> for Medicine {
    fn from(m: FfiMedicine) -> Self {
        Medicine {
            id: m.id,
            name: m.name,
            description: m.description,
            manufacturer: m.manufacturer,
            category: m.category,
            is_active: m.is_active,
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPrescriptionItem {
    pub medicine_id: i64,
    pub medicine_name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: i64,
}

impl From<PrescriptionItem> for FfiPrescriptionItem {
    fn from(item: PrescriptionItem) -> Self {
        Self {
            medicine_id: item.medicine_id,
            medicine_name: item.medicine_name,
            dosage: item.dosage,
            frequency: item.frequency,
            duration: item.duration,
        }
    }
}

/// FFI-safe prescription (read side; writes go through [`PrescriptionDraft`]).
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPrescription {
    pub id: Option<i64>,
    pub prescription_id: Option<String>,
    pub patient_id: i64,
    pub visit_date: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<FfiPrescriptionItem>,
}

impl From<Prescription> for FfiPrescription {
    fn from(rx: Prescription) -> Self {
        Self {
            id: rx.id,
            prescription_id: rx.prescription_id,
            patient_id: rx.patient_id,
            visit_date: format_date(rx.visit_date),
            notes: rx.notes,
            items: rx.prescription_items.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDocumentLine {
    pub medicine: String,
    pub dosage: String,
    pub frequency: String,
    pub duration_days: i64,
}

/// Printable prescription with fallbacks already applied.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPrescriptionDocument {
    pub title: String,
    pub file_name: String,
    pub date: String,
    pub notes: String,
    /// `None` renders as "Patient information not available"
    pub patient_name: Option<String>,
    pub patient_id: Option<String>,
    pub patient_age: Option<u32>,
    pub patient_gender: Option<String>,
    pub items: Vec<FfiDocumentLine>,
}

impl From<PrescriptionDocument> for FfiPrescriptionDocument {
    fn from(doc: PrescriptionDocument) -> Self {
        let title = doc.title();
        let file_name = doc.file_name();
        let date = doc.date_text();
        let notes = doc.notes_text().to_string();
        let patient = doc.patient;
        Self {
            title,
            file_name,
            date,
            notes,
            patient_name: patient.as_ref().map(|p| p.name.clone()),
            patient_id: patient.as_ref().and_then(|p| p.patient_id.clone()),
            patient_age: patient.as_ref().and_then(|p| p.age),
            patient_gender: patient.and_then(|p| p.gender),
            items: doc
                .items
                .into_iter()
                .map(|line| FfiDocumentLine {
                    medicine: line.medicine,
                    dosage: line.dosage,
                    frequency: line.frequency,
                    duration_days: line.duration_days,
                })
                .collect(),
        }
    }
}
