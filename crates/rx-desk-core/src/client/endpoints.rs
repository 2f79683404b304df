//! REST paths, relative to the configured base URL.

use chrono::NaiveDate;

use crate::models::dates::to_form_date;

pub const PATIENTS: &str = "/patients";
pub const MEDICINES: &str = "/medicines";
pub const PRESCRIPTIONS: &str = "/prescriptions";

pub fn patient(id: i64) -> String {
    format!("{}/{}", PATIENTS, id)
}

pub fn medicine(id: i64) -> String {
    format!("{}/{}", MEDICINES, id)
}

pub fn prescription(id: i64) -> String {
    format!("{}/{}", PRESCRIPTIONS, id)
}

pub fn prescriptions_for_patient(patient_id: i64) -> String {
    format!("{}/patient/{}", PRESCRIPTIONS, patient_id)
}

pub fn prescriptions_in_range(patient_id: i64, start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "{}/search?startDate={}&endDate={}",
        prescriptions_for_patient(patient_id),
        to_form_date(start),
        to_form_date(end)
    )
}

pub fn prescriptions_older_than(patient_id: i64, years: u32) -> String {
    format!("{}/older-than/{}", prescriptions_for_patient(patient_id), years)
}
