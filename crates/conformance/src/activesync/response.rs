//! Command responses

use super::{Contact, Email, ServerId, Status};
use crate::poll::PollResponse;

/// Add or Change element of a Sync response
#[derive(Debug, Clone, PartialEq)]
pub struct SyncItem {
    pub server_id: ServerId,
    pub contact: Option<Contact>,
    pub email: Option<Email>,
}

/// Server reply to a client Add
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddResponse {
    pub client_id: String,
    pub server_id: Option<ServerId>,
    pub status: Status,
}

/// Server reply to a client Change, only sent on failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeResponse {
    pub server_id: ServerId,
    pub status: Status,
}

/// Parsed Sync response for one collection
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncStore {
    pub status: Option<Status>,
    pub collection_id: String,
    pub sync_key: Option<String>,
    pub add_elements: Vec<SyncItem>,
    pub change_elements: Vec<SyncItem>,
    pub delete_elements: Vec<ServerId>,
    pub add_responses: Vec<AddResponse>,
    pub change_responses: Vec<ChangeResponse>,
}

impl SyncStore {
    pub fn is_success(&self) -> bool {
        self.status == Some(Status::SUCCESS)
    }

    pub fn is_hierarchy_changed(&self) -> bool {
        self.status == Some(Status::HIERARCHY_CHANGED)
    }
}

/// Candidates are the Add elements followed by the Change elements
impl PollResponse for SyncStore {
    type Record = SyncItem;

    fn is_success(&self) -> bool {
        SyncStore::is_success(self)
    }

    fn into_candidates(self) -> Vec<SyncItem> {
        let mut items = self.add_elements;
        items.extend(self.change_elements);
        items
    }
}

/// One fetched item of an ItemOperations response
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOperationsItem {
    pub status: Status,
    pub collection_id: String,
    pub server_id: ServerId,
    pub contact: Option<Contact>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemOperationsStore {
    pub status: Option<Status>,
    pub items: Vec<ItemOperationsItem>,
}

impl PollResponse for ItemOperationsStore {
    type Record = ItemOperationsItem;

    fn is_success(&self) -> bool {
        self.status == Some(Status::SUCCESS)
    }

    fn into_candidates(self) -> Vec<ItemOperationsItem> {
        self.items
            .into_iter()
            .filter(|item| item.status.is_success())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub collection_id: String,
    pub long_id: Option<String>,
    pub contact: Option<Contact>,
    pub email: Option<Email>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchStore {
    pub status: Option<Status>,
    pub range: Option<String>,
    pub total: usize,
    pub results: Vec<SearchResult>,
}

impl PollResponse for SearchStore {
    type Record = SearchResult;

    fn is_success(&self) -> bool {
        self.status == Some(Status::SUCCESS)
    }

    fn into_candidates(self) -> Vec<SearchResult> {
        self.results
    }
}

/// Default folder types reported by FolderSync
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FolderType {
    UserCreatedGeneric,
    Inbox,
    Drafts,
    DeletedItems,
    SentItems,
    Outbox,
    Calendar,
    Contacts,
    RecipientInformationCache,
    Other(u8),
}

impl FolderType {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::UserCreatedGeneric,
            2 => Self::Inbox,
            3 => Self::Drafts,
            4 => Self::DeletedItems,
            5 => Self::SentItems,
            6 => Self::Outbox,
            8 => Self::Calendar,
            9 => Self::Contacts,
            19 => Self::RecipientInformationCache,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::UserCreatedGeneric => 1,
            Self::Inbox => 2,
            Self::Drafts => 3,
            Self::DeletedItems => 4,
            Self::SentItems => 5,
            Self::Outbox => 6,
            Self::Calendar => 8,
            Self::Contacts => 9,
            Self::RecipientInformationCache => 19,
            Self::Other(code) => code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub server_id: String,
    pub parent_id: String,
    pub display_name: String,
    pub folder_type: FolderType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSyncResponse {
    /// HTTP status of the exchange; 449 asks a 12.1 client to provision
    pub http_status: u16,
    pub status: Status,
    pub sync_key: Option<String>,
    pub folders: Vec<Folder>,
}

impl FolderSyncResponse {
    /// ServerId of the default folder of `folder_type`
    pub fn default_folder_id(&self, folder_type: FolderType) -> Option<&str> {
        self.folders
            .iter()
            .find(|f| f.folder_type == folder_type)
            .map(|f| f.server_id.as_str())
    }
}

/// SendMail response; a successful send has an empty body
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SendMailResponse {
    pub status: Option<Status>,
}

impl SendMailResponse {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
    }
}

/// Policy element of a Provision response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub policy_type: Option<String>,
    pub policy_key: Option<String>,
    pub status: Status,
    /// EASProvisionDoc, only in responses to the initial request
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionResponse {
    pub status: Status,
    pub policy: Option<Policy>,
}
