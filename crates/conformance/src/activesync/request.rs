//! Command requests

use uuid::Uuid;

use super::{BodyType, Contact, ContactField, ServerId};

/// PolicyType for WBXML provisioning documents
pub const PROVISIONING_POLICY_TYPE: &str = "MS-EAS-Provisioning-WBXML";

/// Sync window used for every GetChanges request
const WINDOW_SIZE: u32 = 100;

/// AirSyncBase BodyPreference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPreference {
    pub body_type: BodyType,
    pub truncation_size: Option<usize>,
    pub all_or_none: Option<bool>,
}

impl BodyPreference {
    pub fn new(body_type: BodyType) -> Self {
        Self {
            body_type,
            truncation_size: None,
            all_or_none: None,
        }
    }

    pub fn plain_text() -> Self {
        Self::new(BodyType::PlainText)
    }

    pub fn truncation_size(mut self, size: usize) -> Self {
        self.truncation_size = Some(size);
        self
    }
}

/// One entry of a Sync Commands element
#[derive(Debug, Clone, PartialEq)]
pub enum SyncCommand {
    Add { client_id: String, contact: Contact },
    Change { server_id: ServerId, contact: Contact },
    Delete { server_id: ServerId },
}

/// Sync request for a single collection
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRequest {
    pub collection_id: String,
    pub sync_key: String,
    pub get_changes: bool,
    pub window_size: Option<u32>,
    pub body_preference: Option<BodyPreference>,
    /// MIMESupport, set to 2 when a MIME body is requested
    pub mime_support: Option<u8>,
    /// Elements the client supports; only valid on the initial request
    pub supported: Option<Vec<ContactField>>,
    pub deletes_as_moves: Option<bool>,
    pub commands: Vec<SyncCommand>,
}

impl SyncRequest {
    fn base(collection_id: &str, sync_key: &str) -> Self {
        Self {
            collection_id: collection_id.to_string(),
            sync_key: sync_key.to_string(),
            get_changes: false,
            window_size: None,
            body_preference: None,
            mime_support: None,
            supported: None,
            deletes_as_moves: None,
            commands: Vec::new(),
        }
    }

    /// SyncKey "0" request that establishes a sync relationship
    pub fn initial(collection_id: &str) -> Self {
        Self::base(collection_id, "0")
    }

    /// Initial request advertising the supported elements
    pub fn initial_with_supported(collection_id: &str, supported: Vec<ContactField>) -> Self {
        Self {
            supported: Some(supported),
            ..Self::initial(collection_id)
        }
    }

    /// Request server changes since `sync_key`
    pub fn get_changes(
        collection_id: &str,
        sync_key: &str,
        body_preference: Option<BodyPreference>,
    ) -> Self {
        let mime_support = body_preference
            .as_ref()
            .filter(|pref| pref.body_type == BodyType::Mime)
            .map(|_| 2);
        Self {
            get_changes: true,
            window_size: Some(WINDOW_SIZE),
            body_preference,
            mime_support,
            ..Self::base(collection_id, sync_key)
        }
    }

    /// Upload a new contact under a fresh client id
    pub fn add(collection_id: &str, sync_key: &str, contact: Contact) -> Self {
        Self {
            commands: vec![SyncCommand::Add {
                client_id: Uuid::new_v4().simple().to_string(),
                contact,
            }],
            ..Self::base(collection_id, sync_key)
        }
    }

    pub fn change(collection_id: &str, sync_key: &str, server_id: ServerId, contact: Contact) -> Self {
        Self {
            commands: vec![SyncCommand::Change { server_id, contact }],
            ..Self::base(collection_id, sync_key)
        }
    }

    /// Hard-delete the given items
    pub fn delete(collection_id: &str, sync_key: &str, server_ids: Vec<ServerId>) -> Self {
        Self {
            deletes_as_moves: Some(false),
            commands: server_ids
                .into_iter()
                .map(|server_id| SyncCommand::Delete { server_id })
                .collect(),
            ..Self::base(collection_id, sync_key)
        }
    }
}

/// ItemOperations Fetch from the mailbox store
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOperationsRequest {
    pub collection_id: String,
    pub server_id: ServerId,
    pub schema: Option<Vec<ContactField>>,
    pub body_preference: Option<BodyPreference>,
}

impl ItemOperationsRequest {
    pub fn fetch(collection_id: &str, server_id: ServerId) -> Self {
        Self {
            collection_id: collection_id.to_string(),
            server_id,
            schema: None,
            body_preference: None,
        }
    }

    pub fn schema(mut self, schema: Vec<ContactField>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn body_preference(mut self, preference: BodyPreference) -> Self {
        self.body_preference = Some(preference);
        self
    }
}

/// Search of the mailbox store for free text within one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub store_name: String,
    pub collection_id: String,
    pub free_text: String,
    /// e.g. "0-9"
    pub range: String,
    pub deep_traversal: bool,
    pub rebuild_results: bool,
}

impl SearchRequest {
    pub fn mailbox(collection_id: &str, free_text: &str) -> Self {
        Self {
            store_name: "Mailbox".to_string(),
            collection_id: collection_id.to_string(),
            free_text: free_text.to_string(),
            range: "0-9".to_string(),
            deep_traversal: true,
            rebuild_results: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSyncRequest {
    pub sync_key: String,
}

impl FolderSyncRequest {
    pub fn initial() -> Self {
        Self {
            sync_key: "0".to_string(),
        }
    }
}

/// SendMail with inline MIME content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMailRequest {
    pub client_id: String,
    pub save_in_sent_items: bool,
    pub mime: String,
}

impl SendMailRequest {
    pub fn new(mime: String) -> Self {
        Self {
            client_id: Uuid::new_v4().simple().to_string(),
            save_in_sent_items: false,
            mime,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInformation {
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionPolicy {
    pub policy_type: String,
    pub policy_key: Option<String>,
    /// Acknowledgement status the client reports, "1" for success
    pub status: Option<String>,
}

/// Provision request; a request without a Policy is malformed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub device_information: Option<DeviceInformation>,
    pub policy: Option<ProvisionPolicy>,
}

impl ProvisionRequest {
    /// Initial request downloading the policy
    pub fn download(policy_type: &str) -> Self {
        Self {
            device_information: None,
            policy: Some(ProvisionPolicy {
                policy_type: policy_type.to_string(),
                policy_key: None,
                status: None,
            }),
        }
    }

    /// Acknowledgement of the policy identified by `policy_key`
    pub fn acknowledge(policy_type: &str, policy_key: &str, status: &str) -> Self {
        Self {
            device_information: None,
            policy: Some(ProvisionPolicy {
                policy_type: policy_type.to_string(),
                policy_key: Some(policy_key.to_string()),
                status: Some(status.to_string()),
            }),
        }
    }

    pub fn device_information(mut self, model: &str) -> Self {
        self.device_information = Some(DeviceInformation {
            model: model.to_string(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_changes_sets_mime_support_only_for_mime() {
        let plain = SyncRequest::get_changes("9", "1", Some(BodyPreference::plain_text()));
        assert_eq!(plain.mime_support, None);
        assert_eq!(plain.window_size, Some(100));
        assert!(plain.get_changes);

        let mime = SyncRequest::get_changes("9", "1", Some(BodyPreference::new(BodyType::Mime)));
        assert_eq!(mime.mime_support, Some(2));
    }

    #[test]
    fn test_add_uses_unique_client_ids() {
        let first = SyncRequest::add("9", "1", Contact::with_file_as("a"));
        let second = SyncRequest::add("9", "1", Contact::with_file_as("a"));
        let id = |r: &SyncRequest| match &r.commands[0] {
            SyncCommand::Add { client_id, .. } => client_id.clone(),
            other => panic!("unexpected command {other:?}"),
        };
        assert_eq!(id(&first).len(), 32);
        assert_ne!(id(&first), id(&second));
    }

    #[test]
    fn test_delete_is_not_a_move() {
        let request = SyncRequest::delete("9", "4", vec![ServerId::new("9:1"), ServerId::new("9:2")]);
        assert_eq!(request.deletes_as_moves, Some(false));
        assert_eq!(request.commands.len(), 2);
    }
}
