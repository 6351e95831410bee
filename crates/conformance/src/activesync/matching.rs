//! Natural-key predicates for the fetch loop
//!
//! A freshly created item has no server id the test knows about, so it is
//! found by the value the test chose: a contact's FileAs or an email's
//! Subject.

use super::{ItemOperationsItem, SearchResult, SyncItem};

/// Record that can be identified by FileAs or Subject
pub trait NaturalKey {
    fn natural_key(&self) -> Option<&str>;
}

impl NaturalKey for SyncItem {
    fn natural_key(&self) -> Option<&str> {
        self.contact
            .as_ref()
            .and_then(|c| c.file_as.as_deref())
            .or_else(|| self.email.as_ref().and_then(|e| e.subject.as_deref()))
    }
}

impl NaturalKey for SearchResult {
    fn natural_key(&self) -> Option<&str> {
        self.contact
            .as_ref()
            .and_then(|c| c.file_as.as_deref())
            .or_else(|| self.email.as_ref().and_then(|e| e.subject.as_deref()))
    }
}

impl NaturalKey for ItemOperationsItem {
    fn natural_key(&self) -> Option<&str> {
        self.contact.as_ref().and_then(|c| c.file_as.as_deref())
    }
}

/// Predicate matching records whose natural key equals `key`
pub fn by_natural_key<T: NaturalKey>(key: &str) -> impl FnMut(&T) -> bool + '_ {
    move |record| record.natural_key() == Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activesync::{Contact, Email, ServerId};

    fn contact_item(id: &str, file_as: &str) -> SyncItem {
        SyncItem {
            server_id: ServerId::new(id),
            contact: Some(Contact::with_file_as(file_as)),
            email: None,
        }
    }

    #[test]
    fn test_matches_contact_file_as() {
        let mut pred = by_natural_key::<SyncItem>("Aaron");
        assert!(pred(&contact_item("9:1", "Aaron")));
        assert!(!pred(&contact_item("9:2", "aaron")));
    }

    #[test]
    fn test_matches_email_subject() {
        let item = SyncItem {
            server_id: ServerId::new("2:1"),
            contact: None,
            email: Some(Email {
                subject: Some("Subject_1".into()),
                ..Email::default()
            }),
        };
        assert!(by_natural_key::<SyncItem>("Subject_1")(&item));
    }

    #[test]
    fn test_contact_without_file_as_never_matches() {
        let item = SyncItem {
            server_id: ServerId::new("9:3"),
            contact: Some(Contact::default()),
            email: None,
        };
        assert!(!by_natural_key::<SyncItem>("")(&item));
    }
}
