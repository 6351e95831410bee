//! ActiveSync command models and the adapter seam
//!
//! Requests and responses are plain typed structs; encoding them to WBXML
//! and talking HTTP is the adapter implementation's business.

mod adapter;
mod contact;
mod email;
mod matching;
mod mime;
mod request;
mod response;
mod status;

pub use adapter::{ActiveSyncAdapter, ProvisioningSutControl};
pub use contact::{Body, BodyType, Contact, ContactField, MAX_PICTURE_BYTES};
pub use email::Email;
pub use matching::{NaturalKey, by_natural_key};
pub use mime::{MimeMessage, create_mime};
pub use request::{
    BodyPreference, DeviceInformation, FolderSyncRequest, ItemOperationsRequest, ProvisionPolicy,
    ProvisionRequest, SearchRequest, SendMailRequest, SyncCommand, SyncRequest,
    PROVISIONING_POLICY_TYPE,
};
pub use response::{
    AddResponse, ChangeResponse, Folder, FolderSyncResponse, FolderType, ItemOperationsItem,
    ItemOperationsStore, Policy, ProvisionResponse, SearchResult, SearchStore, SendMailResponse,
    SyncItem, SyncStore,
};
pub use status::{ServerId, Status};
