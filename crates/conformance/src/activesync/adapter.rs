//! The ActiveSync adapter seam
//!
//! Implementations own the transport (WBXML over HTTP against a real
//! server, or the in-memory simulator). All methods take `&self` so a
//! single adapter can be shared by the suites of one run.

use anyhow::Result;

use super::{
    FolderSyncRequest, FolderSyncResponse, ItemOperationsRequest, ItemOperationsStore,
    ProvisionRequest, ProvisionResponse, SearchRequest, SearchStore, SendMailRequest,
    SendMailResponse, SyncRequest, SyncStore,
};
use crate::context::UserInformation;

/// Client for the ActiveSync commands the suites drive
pub trait ActiveSyncAdapter: Send + Sync {
    /// Use `user`'s credentials for subsequent commands
    fn switch_user(&self, user: &UserInformation) -> Result<()>;

    fn folder_sync(&self, request: &FolderSyncRequest) -> Result<FolderSyncResponse>;

    fn sync(&self, request: &SyncRequest) -> Result<SyncStore>;

    fn item_operations(&self, request: &ItemOperationsRequest) -> Result<ItemOperationsStore>;

    fn search(&self, request: &SearchRequest) -> Result<SearchStore>;

    fn send_mail(&self, request: &SendMailRequest) -> Result<SendMailResponse>;

    fn provision(&self, request: &ProvisionRequest) -> Result<ProvisionResponse>;

    /// Send `policy_key` in the X-MS-PolicyKey header from now on
    fn apply_policy_key(&self, policy_key: &str);

    fn apply_device_type(&self, device_type: &str);
}

/// Administrative operations on the Exchange server under test
pub trait ProvisioningSutControl: Send + Sync {
    /// Remove a device partnership; returns whether the device was removed
    fn remove_device(
        &self,
        server_name: &str,
        user_email: &str,
        password: &str,
        device_type: &str,
    ) -> Result<bool>;
}
