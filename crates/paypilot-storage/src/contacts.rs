//! Contact directory used to reach customers on the messaging channel.
//!
//! Resolution order when looking a customer up:
//! 1. phone number (digits compared, country prefix tolerated)
//! 2. exact name, case-insensitive
//! 3. name substring
//! 4. profile-name substring
//!
//! The first match wins. Substring matches are not guaranteed unique.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::Connection;
use tracing::debug;

use paypilot_core::{normalize_phone, ChatKey, Contact, PayPilotError};

use crate::db::{blocking, storage_err, Database};

#[derive(Debug, Clone)]
pub struct ContactDirectory {
    db: Arc<Database>,
}

impl ContactDirectory {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert or replace a contact keyed by chat.
    pub async fn upsert(&self, contact: &Contact) -> Result<(), PayPilotError> {
        let contact = Contact {
            phone: contact.phone.as_deref().and_then(normalize_phone),
            ..contact.clone()
        };
        blocking(&self.db, move |conn| {
            conn.execute(
                "INSERT INTO contacts (chat_key, name, profile_name, phone, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(chat_key) DO UPDATE SET
                     name = excluded.name,
                     profile_name = COALESCE(excluded.profile_name, contacts.profile_name),
                     phone = COALESCE(excluded.phone, contacts.phone),
                     updated_at = excluded.updated_at",
                rusqlite::params![
                    contact.chat_key.as_str(),
                    contact.name,
                    contact.profile_name,
                    contact.phone,
                    Utc::now().timestamp_millis(),
                ],
            )
            .map_err(|e| PayPilotError::Storage(format!("Failed to save contact: {}", e)))?;
            debug!(chat = %contact.chat_key, name = %contact.name, "Contact saved");
            Ok(())
        })
        .await
    }

    /// Record the display name a chat presented on an inbound message.
    ///
    /// Creates the contact when unknown, using the profile name as its name.
    pub async fn remember_profile(
        &self,
        chat_key: &ChatKey,
        profile_name: &str,
    ) -> Result<(), PayPilotError> {
        let profile_name = profile_name.trim().to_string();
        if profile_name.is_empty() {
            return Ok(());
        }
        let chat_key = chat_key.clone();
        blocking(&self.db, move |conn| {
            conn.execute(
                "INSERT INTO contacts (chat_key, name, profile_name, updated_at)
                 VALUES (?1, ?2, ?2, ?3)
                 ON CONFLICT(chat_key) DO UPDATE SET
                     profile_name = excluded.profile_name,
                     updated_at = excluded.updated_at",
                rusqlite::params![chat_key.as_str(), profile_name, Utc::now().timestamp_millis()],
            )
            .map_err(storage_err)?;
            Ok(())
        })
        .await
    }

    pub async fn list(&self) -> Result<Vec<Contact>, PayPilotError> {
        blocking(&self.db, load_contacts).await
    }

    /// Find the chat of a customer by phone or name.
    pub async fn resolve(
        &self,
        name: &str,
        phone: Option<&str>,
    ) -> Result<Option<ChatKey>, PayPilotError> {
        let contacts = self.list().await?;
        Ok(resolve_in(&contacts, name, phone))
    }
}

fn load_contacts(conn: &Connection) -> Result<Vec<Contact>, PayPilotError> {
    let mut stmt = conn
        .prepare(
            "SELECT chat_key, name, profile_name, phone FROM contacts
             ORDER BY updated_at DESC, chat_key ASC",
        )
        .map_err(storage_err)?;
    let rows = stmt
        .query_map([], |row| {
            let chat_key: String = row.get(0)?;
            Ok(Contact {
                chat_key: ChatKey::new(chat_key),
                name: row.get(1)?,
                profile_name: row.get(2)?,
                phone: row.get(3)?,
            })
        })
        .map_err(storage_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(storage_err)
}

/// Apply the resolution order over an in-memory contact list.
pub fn resolve_in(contacts: &[Contact], name: &str, phone: Option<&str>) -> Option<ChatKey> {
    if let Some(wanted) = phone.and_then(normalize_phone) {
        if let Some(contact) = contacts.iter().find(|c| {
            c.phone
                .as_deref()
                .is_some_and(|p| same_number(p, &wanted))
        }) {
            return Some(contact.chat_key.clone());
        }
    }

    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let by_exact = || contacts.iter().find(|c| c.name.to_lowercase() == needle);
    let by_name = || {
        contacts
            .iter()
            .find(|c| c.name.to_lowercase().contains(&needle))
    };
    let by_profile = || {
        contacts.iter().find(|c| {
            c.profile_name
                .as_deref()
                .is_some_and(|p| p.to_lowercase().contains(&needle))
        })
    };

    by_exact()
        .or_else(by_name)
        .or_else(by_profile)
        .map(|c| c.chat_key.clone())
}

/// Digits equal, or one number is the other with a country prefix.
fn same_number(a: &str, b: &str) -> bool {
    let a: String = a.chars().filter(|c| c.is_ascii_digit()).collect();
    let b: String = b.chars().filter(|c| c.is_ascii_digit()).collect();
    if a == b {
        return true;
    }
    let (short, long) = if a.len() < b.len() { (&a, &b) } else { (&b, &a) };
    short.len() >= 10 && long.ends_with(short.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(key: &str, name: &str, profile: Option<&str>, phone: Option<&str>) -> Contact {
        Contact {
            chat_key: ChatKey::from(key),
            name: name.to_string(),
            profile_name: profile.map(str::to_string),
            phone: phone.map(str::to_string),
        }
    }

    fn sample() -> Vec<Contact> {
        vec![
            contact("c1", "ABC Traders Pvt Ltd", None, Some("+919876543210")),
            contact("c2", "ABC", None, None),
            contact("c3", "Meera Designs", Some("Meera K"), None),
            contact("c4", "Ravi", Some("Ravi Kumar (Accounts)"), Some("9123456780")),
        ]
    }

    #[test]
    fn test_phone_wins_over_name() {
        let found = resolve_in(&sample(), "Meera", Some("98765 43210"));
        assert_eq!(found, Some(ChatKey::from("c1")));
    }

    #[test]
    fn test_exact_name_before_substring() {
        let found = resolve_in(&sample(), "abc", None);
        assert_eq!(found, Some(ChatKey::from("c2")));
    }

    #[test]
    fn test_name_substring() {
        let found = resolve_in(&sample(), "traders", None);
        assert_eq!(found, Some(ChatKey::from("c1")));
    }

    #[test]
    fn test_profile_substring() {
        let found = resolve_in(&sample(), "accounts", None);
        assert_eq!(found, Some(ChatKey::from("c4")));
    }

    #[test]
    fn test_unknown_phone_falls_back_to_name() {
        let found = resolve_in(&sample(), "Meera Designs", Some("5550001111"));
        assert_eq!(found, Some(ChatKey::from("c3")));
    }

    #[test]
    fn test_no_match() {
        assert!(resolve_in(&sample(), "Zed", None).is_none());
        assert!(resolve_in(&sample(), "   ", None).is_none());
    }

    #[test]
    fn test_same_number() {
        assert!(same_number("+919876543210", "9876543210"));
        assert!(same_number("9876543210", "98765-43210"));
        assert!(!same_number("1234567890", "9876543210"));
    }

    #[tokio::test]
    async fn test_upsert_and_resolve() {
        let dir = ContactDirectory::new(Arc::new(Database::in_memory().unwrap()));
        dir.upsert(&contact("919876543210@c.us", "ABC Traders", None, Some("+91 98765 43210")))
            .await
            .unwrap();

        let found = dir.resolve("abc traders", None).await.unwrap();
        assert_eq!(found, Some(ChatKey::from("919876543210@c.us")));

        let found = dir.resolve("unknown", Some("9876543210")).await.unwrap();
        assert_eq!(found, Some(ChatKey::from("919876543210@c.us")));

        let listed = dir.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].phone.as_deref(), Some("+919876543210"));
    }

    #[tokio::test]
    async fn test_upsert_updates_existing() {
        let dir = ContactDirectory::new(Arc::new(Database::in_memory().unwrap()));
        dir.upsert(&contact("k1", "Old Name", Some("Profile"), Some("9876543210")))
            .await
            .unwrap();
        dir.upsert(&contact("k1", "New Name", None, None)).await.unwrap();

        let listed = dir.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "New Name");
        assert_eq!(listed[0].profile_name.as_deref(), Some("Profile"));
        assert_eq!(listed[0].phone.as_deref(), Some("9876543210"));
    }

    #[tokio::test]
    async fn test_remember_profile_creates_and_updates() {
        let dir = ContactDirectory::new(Arc::new(Database::in_memory().unwrap()));
        let key = ChatKey::from("k9");
        dir.remember_profile(&key, "Sunil Hardware").await.unwrap();
        assert_eq!(
            dir.resolve("hardware", None).await.unwrap(),
            Some(key.clone())
        );

        dir.remember_profile(&key, "Sunil H").await.unwrap();
        let listed = dir.list().await.unwrap();
        assert_eq!(listed[0].name, "Sunil Hardware");
        assert_eq!(listed[0].profile_name.as_deref(), Some("Sunil H"));
    }
}
