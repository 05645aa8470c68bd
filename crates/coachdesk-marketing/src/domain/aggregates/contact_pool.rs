//! Contact pool
//!
//! Two disjoint collections fetched from the backend: existing customers and
//! prospective leads.

use std::collections::HashSet;

use crate::domain::value_objects::{Contact, ContactKind, EntityId};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContactPool {
    clients: Vec<Contact>,
    leads: Vec<Contact>,
}

impl ContactPool {
    /// Build the pool from both backend lists. The `kind` of each record is
    /// forced to match the list it came from, and an id present in both
    /// lists is kept as a client only.
    pub fn from_records(clients: Vec<Contact>, leads: Vec<Contact>) -> Self {
        let mut seen = HashSet::new();

        let clients: Vec<Contact> = clients
            .into_iter()
            .filter(|c| seen.insert(c.id.clone()))
            .map(|c| Contact { kind: ContactKind::Client, ..c })
            .collect();

        let mut dropped = 0usize;
        let leads: Vec<Contact> = leads
            .into_iter()
            .filter(|c| {
                let fresh = seen.insert(c.id.clone());
                if !fresh {
                    dropped += 1;
                }
                fresh
            })
            .map(|c| Contact { kind: ContactKind::Lead, ..c })
            .collect();

        if dropped > 0 {
            tracing::warn!(dropped, "lead records duplicated an existing contact id");
        }

        Self { clients, leads }
    }

    pub fn clients(&self) -> &[Contact] { &self.clients }
    pub fn leads(&self) -> &[Contact] { &self.leads }

    pub fn all(&self) -> impl Iterator<Item = &Contact> {
        self.clients.iter().chain(self.leads.iter())
    }

    pub fn len(&self) -> usize {
        self.clients.len() + self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &EntityId) -> Option<&Contact> {
        self.all().find(|c| &c.id == id)
    }

    pub fn find_by_email(&self, email: &str) -> Option<&Contact> {
        let email = email.trim().to_lowercase();
        self.all().find(|c| c.email.as_str() == email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_is_disjoint() {
        let pool = ContactPool::from_records(
            vec![Contact::client("1", "a@x.com"), Contact::client("1", "a@x.com")],
            vec![Contact::client("1", "a@x.com"), Contact::client("2", "b@x.com")],
        );
        assert_eq!(pool.clients().len(), 1);
        assert_eq!(pool.leads().len(), 1);
        assert_eq!(pool.leads()[0].kind, ContactKind::Lead);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_lookup() {
        let pool = ContactPool::from_records(vec![Contact::client("1", "a@x.com")], vec![]);
        assert!(pool.get(&EntityId::from("1")).is_some());
        assert!(pool.find_by_email(" A@X.com").is_some());
        assert!(pool.get(&EntityId::from("2")).is_none());
    }
}
