//! REST backend client.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::{Client, Response};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{endpoints, ClientError, ClientResult, EntityClient};
use crate::config::ClientConfig;
use crate::models::{Medicine, Patient, Prescription};

/// Blocking HTTP client for the prescription backend.
pub struct HttpEntityClient {
    base_url: String,
    client: Client,
    timeout_secs: u64,
}

impl HttpEntityClient {
    /// Build a client from configuration.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::Http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send(&self, method: Method, path: &str, body: Option<&impl Serialize>) -> ClientResult<Response> {
        let url = self.url(path);
        tracing::debug!(%method, %url, "backend request");

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().map_err(|e| self.map_send_error(e))
    }

    fn map_send_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_connect() {
            ClientError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            ClientError::Timeout(self.timeout_secs)
        } else {
            ClientError::Http(e.to_string())
        }
    }

    /// GET that maps 404 to `None`.
    fn get_optional<T: DeserializeOwned>(&self, path: &str) -> ClientResult<Option<T>> {
        let response = self.send(Method::GET, path, None::<&()>)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        parse_json(check_status(response, path)?).map(Some)
    }

    /// GET a list; an empty body counts as an empty list.
    fn get_list<T: DeserializeOwned>(&self, path: &str) -> ClientResult<Vec<T>> {
        let response = check_status(self.send(Method::GET, path, None::<&()>)?, path)?;
        let text = response
            .text()
            .map_err(|e| ClientError::ResponseParsing(e.to_string()))?;
        if text.trim().is_empty() || text.trim() == "null" {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|e| ClientError::ResponseParsing(e.to_string()))
    }

    fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let response = self.send(method, path, Some(body))?;
        parse_json(check_status(response, path)?)
    }

    fn delete(&self, path: &str) -> ClientResult<()> {
        let response = self.send(Method::DELETE, path, None::<&()>)?;
        check_status(response, path)?;
        Ok(())
    }
}

fn check_status(response: Response, path: &str) -> ClientResult<Response> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound(path.to_string()));
    }
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        tracing::warn!(status = status.as_u16(), path, "backend returned error status");
        return Err(ClientError::Server {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

fn parse_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    response
        .json()
        .map_err(|e| ClientError::ResponseParsing(e.to_string()))
}

impl EntityClient for HttpEntityClient {
    fn list_patients(&self) -> ClientResult<Vec<Patient>> {
        self.get_list(endpoints::PATIENTS)
    }

    fn get_patient(&self, id: i64) -> ClientResult<Option<Patient>> {
        self.get_optional(&endpoints::patient(id))
    }

    fn create_patient(&self, patient: &Patient) -> ClientResult<Patient> {
        self.send_json(Method::POST, endpoints::PATIENTS, patient)
    }

    fn update_patient(&self, id: i64, patient: &Patient) -> ClientResult<Patient> {
        self.send_json(Method::PUT, &endpoints::patient(id), patient)
    }

    fn delete_patient(&self, id: i64) -> ClientResult<()> {
        self.delete(&endpoints::patient(id))
    }

    fn list_medicines(&self) -> ClientResult<Vec<Medicine>> {
        self.get_list(endpoints::MEDICINES)
    }

    fn get_medicine(&self, id: i64) -> ClientResult<Option<Medicine>> {
        self.get_optional(&endpoints::medicine(id))
    }

    fn create_medicine(&self, medicine: &Medicine) -> ClientResult<Medicine> {
        self.send_json(Method::POST, endpoints::MEDICINES, medicine)
    }

    fn update_medicine(&self, id: i64, medicine: &Medicine) -> ClientResult<Medicine> {
        self.send_json(Method::PUT, &endpoints::medicine(id), medicine)
    }

    fn delete_medicine(&self, id: i64) -> ClientResult<()> {
        self.delete(&endpoints::medicine(id))
    }

    fn list_prescriptions(&self) -> ClientResult<Vec<Prescription>> {
        self.get_list(endpoints::PRESCRIPTIONS)
    }

    fn get_prescription(&self, id: i64) -> ClientResult<Option<Prescription>> {
        self.get_optional(&endpoints::prescription(id))
    }

    fn create_prescription(&self, prescription: &Prescription) -> ClientResult<Prescription> {
        self.send_json(Method::POST, endpoints::PRESCRIPTIONS, prescription)
    }

    fn update_prescription(
        &self,
        id: i64,
        prescription: &Prescription,
    ) -> ClientResult<Prescription> {
        self.send_json(Method::PUT, &endpoints::prescription(id), prescription)
    }

    fn delete_prescription(&self, id: i64) -> ClientResult<()> {
        self.delete(&endpoints::prescription(id))
    }

    fn list_prescriptions_for_patient(&self, patient_id: i64) -> ClientResult<Vec<Prescription>> {
        self.get_list(&endpoints::prescriptions_for_patient(patient_id))
    }

    fn search_prescriptions_by_date_range(
        &self,
        patient_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ClientResult<Vec<Prescription>> {
        self.get_list(&endpoints::prescriptions_in_range(patient_id, start, end))
    }

    fn list_prescriptions_older_than(
        &self,
        patient_id: i64,
        years: u32,
    ) -> ClientResult<Vec<Prescription>> {
        self.get_list(&endpoints::prescriptions_older_than(patient_id, years))
    }
}
