//! Per-run test context
//!
//! Everything a test case creates on the server is recorded here so the
//! suite's teardown can remove it. Each suite owns its context; nothing is
//! shared between runs.

/// Items created in one collection, identified by natural key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedItems {
    pub collection_id: String,
    /// Subjects or FileAs values
    pub keys: Vec<String>,
}

/// Credentials and discovered folders for one ActiveSync user
#[derive(Debug, Clone)]
pub struct UserInformation {
    pub name: String,
    pub password: String,
    pub domain: String,
    pub inbox_collection_id: Option<String>,
    pub sent_items_collection_id: Option<String>,
    pub contacts_collection_id: Option<String>,
    pub ric_collection_id: Option<String>,
    created_items: Vec<CreatedItems>,
}

impl UserInformation {
    pub fn new(
        name: impl Into<String>,
        password: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            domain: domain.into(),
            inbox_collection_id: None,
            sent_items_collection_id: None,
            contacts_collection_id: None,
            ric_collection_id: None,
            created_items: Vec::new(),
        }
    }

    /// "name@domain"
    pub fn mail_address(&self) -> String {
        format!("{}@{}", self.name, self.domain)
    }

    /// Remember an item for teardown
    pub fn record_created(&mut self, collection_id: &str, key: impl Into<String>) {
        let key = key.into();
        match self
            .created_items
            .iter_mut()
            .find(|c| c.collection_id == collection_id)
        {
            Some(existing) => existing.keys.push(key),
            None => self.created_items.push(CreatedItems {
                collection_id: collection_id.to_string(),
                keys: vec![key],
            }),
        }
    }

    pub fn created_items(&self) -> &[CreatedItems] {
        &self.created_items
    }

    pub fn has_created_items(&self) -> bool {
        self.created_items.iter().any(|c| !c.keys.is_empty())
    }

    /// Drain the recorded items
    pub fn take_created_items(&mut self) -> Vec<CreatedItems> {
        std::mem::take(&mut self.created_items)
    }
}

/// URLs of server resources (sites, files) created during a run
#[derive(Debug, Clone, Default)]
pub struct CreatedUrls {
    urls: Vec<String>,
}

impl CreatedUrls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, url: impl Into<String>) {
        let url = url.into();
        if !self.urls.contains(&url) {
            self.urls.push(url);
        }
    }

    /// Forget a URL that the test case already removed itself
    pub fn forget(&mut self, url: &str) {
        self.urls.retain(|u| !u.eq_ignore_ascii_case(url));
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_created_groups_by_collection() {
        let mut user = UserInformation::new("user1", "pw", "contoso.com");
        user.record_created("contacts", "FileAs_1");
        user.record_created("inbox", "Subject_1");
        user.record_created("contacts", "FileAs_2");

        assert_eq!(user.created_items().len(), 2);
        assert_eq!(user.created_items()[0].keys, vec!["FileAs_1", "FileAs_2"]);
        assert!(user.has_created_items());

        let drained = user.take_created_items();
        assert_eq!(drained.len(), 2);
        assert!(!user.has_created_items());
    }

    #[test]
    fn test_created_urls() {
        let mut urls = CreatedUrls::new();
        urls.record("http://sut/sites/a");
        urls.record("http://sut/sites/a");
        urls.record("http://sut/sites/b");
        assert_eq!(urls.len(), 2);

        urls.forget("HTTP://SUT/sites/A");
        assert_eq!(urls.take(), vec!["http://sut/sites/b"]);
        assert!(urls.is_empty());
    }
}
