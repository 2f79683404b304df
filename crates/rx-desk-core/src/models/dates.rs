//! Wire date handling.
//!
//! The backend exchanges ISO-8601 date-time strings. Only the date portion is
//! meaningful here, so everything is truncated to a [`NaiveDate`] on the way in
//! and sent back as midnight of that day.

use chrono::NaiveDate;

/// Date format used for form inputs and query parameters.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse the date portion of an ISO-8601 date or date-time string.
pub fn parse_wire_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    let date_part = trimmed.split('T').next().unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

/// Format a date the way the backend expects it in request bodies.
pub fn to_wire_date(date: NaiveDate) -> String {
    format!("{}T00:00:00", date.format(DATE_FORMAT))
}

/// Format a date for form inputs and query strings (`YYYY-MM-DD`).
pub fn to_form_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Serde adapter for optional wire dates.
pub mod optional {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&super::to_wire_date(*d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => super::parse_wire_date(s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", s))),
        }
    }
}
