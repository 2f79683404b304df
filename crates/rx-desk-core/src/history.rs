//! Patient prescription history with date-range and "older than" filters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Months, NaiveDate};
use thiserror::Error;

use crate::client::{ClientResult, EntityClient};
use crate::models::{Patient, Prescription};

/// Default threshold for the "older than N years" filter.
pub const DEFAULT_HISTORY_YEARS: u32 = 2;

pub const MISSING_DATES: &str = "Please select both start and end dates";
pub const INVERTED_RANGE: &str = "Start date must not be after end date";

/// History filter errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Fetch { message: String, cause: String },

    #[error("Patient not found: {0}")]
    PatientNotFound(i64),
}

pub type HistoryResult<T> = Result<T, HistoryError>;

/// `today` minus `years` calendar years; Feb 29 clamps to Feb 28.
pub fn older_than_cutoff(today: NaiveDate, years: u32) -> NaiveDate {
    today
        .checked_sub_months(Months::new(years.saturating_mul(12)))
        .unwrap_or(NaiveDate::MIN)
}

/// Which query produced the displayed list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    All,
    DateRange { start: NaiveDate, end: NaiveDate },
    OlderThan { years: u32 },
}

/// Raised for the duration of one history query.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn start(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One patient's prescription history view.
///
/// The loading flag is shared through [`HistoryFilter::loading_flag`] so a
/// caller that does not hold the filter can still see a query in flight.
#[derive(Debug)]
pub struct HistoryFilter {
    patient_id: i64,
    patient: Option<Patient>,
    prescriptions: Vec<Prescription>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    mode: HistoryMode,
    threshold_years: u32,
    loading: Arc<AtomicBool>,
    error: Option<HistoryError>,
}

impl HistoryFilter {
    pub fn new(patient_id: i64, threshold_years: u32) -> Self {
        Self {
            patient_id,
            patient: None,
            prescriptions: Vec::new(),
            start_date: None,
            end_date: None,
            mode: HistoryMode::All,
            threshold_years,
            loading: Arc::new(AtomicBool::new(false)),
            error: None,
        }
    }

    /// Load the patient, then their unfiltered history.
    pub fn open(
        client: &dyn EntityClient,
        patient_id: i64,
        threshold_years: u32,
    ) -> HistoryResult<Self> {
        let mut filter = Self::new(patient_id, threshold_years);
        let patient = client
            .get_patient(patient_id)
            .map_err(|e| fetch_error("Failed to load patient history", e))?
            .ok_or(HistoryError::PatientNotFound(patient_id))?;
        filter.patient = Some(patient);
        filter.load_all(client)?;
        Ok(filter)
    }

    pub fn patient_id(&self) -> i64 {
        self.patient_id
    }

    pub fn patient(&self) -> Option<&Patient> {
        self.patient.as_ref()
    }

    pub fn prescriptions(&self) -> &[Prescription] {
        &self.prescriptions
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn set_start_date(&mut self, date: Option<NaiveDate>) {
        self.start_date = date;
    }

    pub fn set_end_date(&mut self, date: Option<NaiveDate>) {
        self.end_date = date;
    }

    pub fn mode(&self) -> HistoryMode {
        self.mode
    }

    pub fn threshold_years(&self) -> u32 {
        self.threshold_years
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Handle on the loading flag, readable without borrowing the filter.
    pub fn loading_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.loading)
    }

    pub fn error(&self) -> Option<&HistoryError> {
        self.error.as_ref()
    }

    /// Fetch every prescription of the patient.
    pub fn load_all(&mut self, client: &dyn EntityClient) -> HistoryResult<()> {
        let patient_id = self.patient_id;
        self.run(
            HistoryMode::All,
            "Failed to load patient history".to_string(),
            || client.list_prescriptions_for_patient(patient_id),
            |_| true,
        )
    }

    /// Fetch prescriptions with visit date in the inclusive range.
    ///
    /// Missing or inverted dates fail validation without touching the list.
    pub fn apply_date_range(&mut self, client: &dyn EntityClient) -> HistoryResult<()> {
        let (start, end) = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start <= end => (start, end),
            (Some(_), Some(_)) => return Err(self.reject(INVERTED_RANGE)),
            _ => return Err(self.reject(MISSING_DATES)),
        };

        let patient_id = self.patient_id;
        self.run(
            HistoryMode::DateRange { start, end },
            "Failed to filter by date range".to_string(),
            || client.search_prescriptions_by_date_range(patient_id, start, end),
            |p| p.visit_date.is_some_and(|d| start <= d && d <= end),
        )
    }

    /// Fetch prescriptions dated strictly before `today` minus the threshold.
    pub fn load_older_than(
        &mut self,
        client: &dyn EntityClient,
        today: NaiveDate,
    ) -> HistoryResult<()> {
        let years = self.threshold_years;
        let cutoff = older_than_cutoff(today, years);
        let patient_id = self.patient_id;
        self.run(
            HistoryMode::OlderThan { years },
            format!("Failed to load prescriptions older than {} years", years),
            || client.list_prescriptions_older_than(patient_id, years),
            |p| p.visit_date.is_some_and(|d| d < cutoff),
        )
    }

    /// Reset the range inputs and show the unfiltered list again.
    pub fn clear(&mut self, client: &dyn EntityClient) -> HistoryResult<()> {
        self.start_date = None;
        self.end_date = None;
        let patient_id = self.patient_id;
        self.run(
            HistoryMode::All,
            "Failed to clear filters".to_string(),
            || client.list_prescriptions_for_patient(patient_id),
            |_| true,
        )
    }

    fn reject(&mut self, message: &str) -> HistoryError {
        let error = HistoryError::Validation(message.to_string());
        self.error = Some(error.clone());
        error
    }

    /// Issue one query; the list and mode change only when a response arrives.
    fn run<F, P>(
        &mut self,
        mode: HistoryMode,
        failure: String,
        fetch: F,
        keep: P,
    ) -> HistoryResult<()>
    where
        F: FnOnce() -> ClientResult<Vec<Prescription>>,
        P: Fn(&Prescription) -> bool,
    {
        let result = {
            let _in_flight = InFlight::start(&self.loading);
            fetch()
        };

        match result {
            Ok(mut received) => {
                let total = received.len();
                received.retain(|p| keep(p));
                tracing::debug!(
                    patient_id = self.patient_id,
                    ?mode,
                    received = total,
                    kept = received.len(),
                    "history loaded"
                );
                self.prescriptions = received;
                self.mode = mode;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                let error = fetch_error(&failure, e);
                self.error = Some(error.clone());
                Err(error)
            }
        }
    }
}

fn fetch_error(message: &str, cause: crate::client::ClientError) -> HistoryError {
    tracing::warn!(error = %cause, "{}", message);
    HistoryError::Fetch {
        message: message.to_string(),
        cause: cause.to_string(),
    }
}
