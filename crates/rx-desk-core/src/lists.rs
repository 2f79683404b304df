//! Entity list views with confirmed deletion.

use thiserror::Error;

use crate::client::{ClientResult, EntityClient};
use crate::models::{Medicine, Patient, Prescription};

/// List view errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ListError {
    #[error("Failed to fetch {0}. Please try again later.")]
    Fetch(&'static str),

    #[error("Failed to delete {0}. Please try again.")]
    Delete(&'static str),
}

pub type ListResult<T> = Result<T, ListError>;

/// An entity kind that can be shown in an [`EntityList`].
pub trait ListedEntity: Clone {
    /// Singular noun used in messages
    const NOUN: &'static str;
    /// Plural noun used in messages
    const PLURAL: &'static str;

    fn entity_id(&self) -> Option<i64>;
    fn fetch_all(client: &dyn EntityClient) -> ClientResult<Vec<Self>>;
    fn remove(client: &dyn EntityClient, id: i64) -> ClientResult<()>;
}

impl ListedEntity for Patient {
    const NOUN: &'static str = "patient";
    const PLURAL: &'static str = "patients";

    fn entity_id(&self) -> Option<i64> {
        self.id
    }

    fn fetch_all(client: &dyn EntityClient) -> ClientResult<Vec<Self>> {
        client.list_patients()
    }

    fn remove(client: &dyn EntityClient, id: i64) -> ClientResult<()> {
        client.delete_patient(id)
    }
}

impl ListedEntity for Medicine {
    const NOUN: &'static str = "medicine";
    const PLURAL: &'static str = "medicines";

    fn entity_id(&self) -> Option<i64> {
        self.id
    }

    fn fetch_all(client: &dyn EntityClient) -> ClientResult<Vec<Self>> {
        client.list_medicines()
    }

    fn remove(client: &dyn EntityClient, id: i64) -> ClientResult<()> {
        client.delete_medicine(id)
    }
}

impl ListedEntity for Prescription {
    const NOUN: &'static str = "prescription";
    const PLURAL: &'static str = "prescriptions";

    fn entity_id(&self) -> Option<i64> {
        self.id
    }

    fn fetch_all(client: &dyn EntityClient) -> ClientResult<Vec<Self>> {
        client.list_prescriptions()
    }

    fn remove(client: &dyn EntityClient, id: i64) -> ClientResult<()> {
        client.delete_prescription(id)
    }
}

/// In-memory list of one entity kind.
#[derive(Debug, Clone)]
pub struct EntityList<T> {
    items: Vec<T>,
    error: Option<ListError>,
}

impl<T> Default for EntityList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            error: None,
        }
    }
}

impl<T: ListedEntity> EntityList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn error(&self) -> Option<&ListError> {
        self.error.as_ref()
    }

    /// Replace the list with a fresh fetch; on failure the old list stays.
    pub fn load(&mut self, client: &dyn EntityClient) -> ListResult<()> {
        match T::fetch_all(client) {
            Ok(items) => {
                self.items = items;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = T::PLURAL, "list fetch failed");
                let error = ListError::Fetch(T::PLURAL);
                self.error = Some(error.clone());
                Err(error)
            }
        }
    }

    /// Delete after `confirm` agrees; returns `Ok(false)` when declined.
    pub fn delete<C>(&mut self, client: &dyn EntityClient, id: i64, confirm: C) -> ListResult<bool>
    where
        C: FnOnce(&T) -> bool,
    {
        let Some(index) = self.items.iter().position(|e| e.entity_id() == Some(id)) else {
            return Ok(false);
        };
        if !confirm(&self.items[index]) {
            return Ok(false);
        }

        match T::remove(client, id) {
            Ok(()) => {
                tracing::info!(kind = T::NOUN, id, "deleted");
                self.items.remove(index);
                self.error = None;
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = T::NOUN, id, "delete failed");
                let error = ListError::Delete(T::NOUN);
                self.error = Some(error.clone());
                Err(error)
            }
        }
    }
}

impl EntityList<Patient> {
    /// Patients matching `query`, in list order.
    pub fn search(&self, query: &str) -> Vec<&Patient> {
        self.items.iter().filter(|p| p.matches_query(query)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockClient;

    fn seeded() -> MockClient {
        let client = MockClient::new();
        let mut ada = Patient::new("Ada", "Lovelace");
        ada.patient_id = Some("P000001".into());
        ada.contact_number = Some("555-0101".into());
        client.add_patient(ada);
        client.add_patient(Patient::new("Grace", "Hopper"));
        client
    }

    #[test]
    fn test_load_and_search() {
        let client = seeded();
        let mut list = EntityList::<Patient>::new();
        list.load(&client).unwrap();

        assert_eq!(list.items().len(), 2);
        assert_eq!(list.search("").len(), 2);
        assert_eq!(list.search("LOVE")[0].first_name, "Ada");
        assert_eq!(list.search("p0000").len(), 1);
        assert_eq!(list.search("0101").len(), 1);
        assert!(list.search("turing").is_empty());
    }

    #[test]
    fn test_load_failure_keeps_items() {
        let client = seeded();
        let mut list = EntityList::<Patient>::new();
        list.load(&client).unwrap();
        client.set_fail_reads(true);

        let err = list.load(&client).unwrap_err();

        assert_eq!(err.to_string(), "Failed to fetch patients. Please try again later.");
        assert_eq!(list.items().len(), 2);
    }

    #[test]
    fn test_declined_delete_issues_no_call() {
        let client = seeded();
        let mut list = EntityList::<Patient>::new();
        list.load(&client).unwrap();
        let id = list.items()[0].id.unwrap();

        assert!(!list.delete(&client, id, |_| false).unwrap());
        assert_eq!(client.call_count("delete_patient"), 0);
        assert_eq!(list.items().len(), 2);
    }

    #[test]
    fn test_confirmed_delete_removes_entity() {
        let client = MockClient::new();
        client.add_medicine(Medicine::new("Amoxicillin"));
        let gone = client.add_medicine(Medicine::new("Retiredol"));
        let mut list = EntityList::<Medicine>::new();
        list.load(&client).unwrap();

        let mut asked = None;
        let deleted = list
            .delete(&client, gone.id.unwrap(), |m| {
                asked = Some(m.name.clone());
                true
            })
            .unwrap();

        assert!(deleted);
        assert_eq!(asked.as_deref(), Some("Retiredol"));
        assert_eq!(list.items().len(), 1);
        assert_eq!(list.items()[0].name, "Amoxicillin");
    }

    #[test]
    fn test_failed_delete_keeps_entity() {
        let client = MockClient::new();
        let rx = client.add_prescription(Prescription::new(1, None));
        let mut list = EntityList::<Prescription>::new();
        list.load(&client).unwrap();
        client.set_fail_writes(true);

        let err = list.delete(&client, rx.id.unwrap(), |_| true).unwrap_err();

        assert_eq!(err.to_string(), "Failed to delete prescription. Please try again.");
        assert_eq!(list.items().len(), 1);
        assert_eq!(list.error(), Some(&err));
    }
}
