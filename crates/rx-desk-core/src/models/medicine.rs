//! Medicine catalog models.

use serde::{Deserialize, Serialize};

/// A single medicine in the hospital catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    /// System-assigned id - absent until created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Inactive medicines stay valid in existing prescriptions but are not
    /// offered for new ones
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Medicine {
    /// Create a new, active catalog entry.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            manufacturer: None,
            category: None,
            is_active: true,
        }
    }

    /// Compare against a form-supplied id string.
    pub fn has_id(&self, id: &str) -> bool {
        self.id.is_some_and(|own| own.to_string() == id.trim())
    }
}
