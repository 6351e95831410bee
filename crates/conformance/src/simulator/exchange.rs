//! In-memory ActiveSync server
//!
//! Mailboxes are created on first use. Every query command (Sync with
//! GetChanges, ItemOperations, Search) advances a global clock; a new or
//! changed item only becomes visible once `visibility_lag` further queries
//! have been made, which models a server that converges eventually.

use anyhow::{Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::activesync::{
    ActiveSyncAdapter, AddResponse, Body, BodyPreference, ChangeResponse, Contact, ContactField,
    Email, Folder, FolderSyncRequest, FolderSyncResponse, FolderType, ItemOperationsItem,
    ItemOperationsRequest, ItemOperationsStore, MAX_PICTURE_BYTES, MimeMessage,
    PROVISIONING_POLICY_TYPE, Policy, ProvisionRequest, ProvisionResponse, ProvisioningSutControl,
    SearchRequest, SearchResult, SearchStore, SendMailRequest, SendMailResponse, ServerId, Status,
    SyncCommand, SyncItem, SyncRequest, SyncStore,
};
use crate::context::UserInformation;

const INBOX_ID: &str = "1";
const SENT_ITEMS_ID: &str = "4";
const CONTACTS_ID: &str = "6";
const RIC_ID: &str = "8";

const PROVISION_DOC: &str = "<EASProvisionDoc>\
<DevicePasswordEnabled>0</DevicePasswordEnabled>\
<AllowSimpleDevicePassword>1</AllowSimpleDevicePassword>\
<MaxAttachmentSize>0</MaxAttachmentSize>\
<AllowStorageCard>1</AllowStorageCard>\
</EASProvisionDoc>";

struct StoredItem {
    server_id: ServerId,
    collection_id: String,
    contact: Option<Contact>,
    email: Option<Email>,
    version: u32,
    /// Clock value the current version becomes visible after
    visible_after: u64,
}

impl StoredItem {
    fn is_visible(&self, tick: u64) -> bool {
        self.visible_after < tick
    }

    fn matches_text(&self, needle: &str) -> bool {
        let hit = |value: &Option<String>| {
            value
                .as_deref()
                .is_some_and(|v| v.to_lowercase().contains(needle))
        };
        let contact_hit = self.contact.as_ref().is_some_and(|c| {
            hit(&c.file_as) || hit(&c.first_name) || hit(&c.last_name) || hit(&c.email1_address)
        });
        let email_hit = self.email.as_ref().is_some_and(|e| hit(&e.subject));
        contact_hit || email_hit
    }
}

#[derive(Default)]
struct CollectionState {
    sync_key: u32,
    /// Version of each item last sent to the client
    seen: HashMap<ServerId, u32>,
    supported: Option<Vec<ContactField>>,
}

#[derive(Default)]
struct Mailbox {
    items: Vec<StoredItem>,
    collections: HashMap<String, CollectionState>,
    next_item: u64,
}

impl Mailbox {
    fn insert(
        &mut self,
        collection_id: &str,
        contact: Option<Contact>,
        email: Option<Email>,
        visible_after: u64,
    ) -> ServerId {
        self.next_item += 1;
        let server_id = ServerId::new(format!("{collection_id}:{}", self.next_item));
        self.items.push(StoredItem {
            server_id: server_id.clone(),
            collection_id: collection_id.to_string(),
            contact,
            email,
            version: 1,
            visible_after,
        });
        server_id
    }
}

#[derive(Default)]
struct ExchangeState {
    tick: u64,
    mailboxes: HashMap<String, Mailbox>,
    hierarchy_changes: u32,
    /// Temporary policy keys by (mailbox, device type)
    pending_keys: HashMap<(String, String), String>,
    /// Final policy keys by (mailbox, device type)
    issued_keys: HashMap<(String, String), String>,
}

#[derive(Clone)]
struct SignedIn {
    name: String,
    address: String,
}

#[derive(Default)]
struct Session {
    user: Option<SignedIn>,
    policy_key: String,
    device_type: String,
}

/// ActiveSync server kept entirely in memory
pub struct InMemoryExchange {
    protocol_version: String,
    visibility_lag: u64,
    max_picture_bytes: usize,
    require_provisioning: bool,
    non_provisionable_users: Vec<String>,
    state: RwLock<ExchangeState>,
    session: RwLock<Session>,
}

impl InMemoryExchange {
    pub fn new() -> Self {
        Self {
            protocol_version: "14.1".to_string(),
            visibility_lag: 0,
            max_picture_bytes: MAX_PICTURE_BYTES,
            require_provisioning: false,
            non_provisionable_users: Vec::new(),
            state: RwLock::new(ExchangeState::default()),
            session: RwLock::new(Session {
                device_type: "ConformanceDevice".to_string(),
                ..Session::default()
            }),
        }
    }

    /// 12.1 has no recipient information cache and answers 449 to
    /// unprovisioned requests
    pub fn with_protocol_version(mut self, version: &str) -> Self {
        self.protocol_version = version.to_string();
        self
    }

    /// Number of queries a new or changed item stays invisible for
    pub fn with_visibility_lag(mut self, lag: u64) -> Self {
        self.visibility_lag = lag;
        self
    }

    pub fn with_max_picture_bytes(mut self, bytes: usize) -> Self {
        self.max_picture_bytes = bytes;
        self
    }

    /// Refuse FolderSync until the device holds a final policy key
    pub fn require_provisioning(mut self) -> Self {
        self.require_provisioning = true;
        self
    }

    /// Let `user_name` sync without provisioning
    pub fn allow_non_provisionable_device(mut self, user_name: &str) -> Self {
        self.non_provisionable_users.push(user_name.to_lowercase());
        self
    }

    /// Answer the next `count` Sync requests with status 12
    pub fn inject_hierarchy_changed(&self, count: u32) {
        self.state().hierarchy_changes += count;
    }

    /// Number of items stored for `address` in all folders
    pub fn item_count(&self, address: &str) -> usize {
        self.state_read()
            .mailboxes
            .get(&address.to_lowercase())
            .map_or(0, |mailbox| mailbox.items.len())
    }

    pub fn policy_key(&self) -> String {
        self.session_read().policy_key.clone()
    }

    pub fn device_type(&self) -> String {
        self.session_read().device_type.clone()
    }

    /// True when a final policy key is on record for the device
    pub fn is_device_provisioned(&self, address: &str, device_type: &str) -> bool {
        self.state_read()
            .issued_keys
            .contains_key(&(address.to_lowercase(), device_type.to_string()))
    }

    fn state(&self) -> RwLockWriteGuard<'_, ExchangeState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_read(&self) -> RwLockReadGuard<'_, ExchangeState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn session(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn session_read(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn signed_in(&self) -> Result<SignedIn> {
        self.session_read()
            .user
            .clone()
            .ok_or_else(|| anyhow!("no user credentials have been set"))
    }

    fn has_ric(&self) -> bool {
        self.protocol_version != "12.1"
    }

    fn folders(&self) -> Vec<Folder> {
        let mut folders: Vec<Folder> = [
            (INBOX_ID, "Inbox", FolderType::Inbox),
            ("2", "Drafts", FolderType::Drafts),
            ("3", "Deleted Items", FolderType::DeletedItems),
            (SENT_ITEMS_ID, "Sent Items", FolderType::SentItems),
            ("5", "Outbox", FolderType::Outbox),
            (CONTACTS_ID, "Contacts", FolderType::Contacts),
            ("7", "Calendar", FolderType::Calendar),
        ]
        .into_iter()
        .map(|(id, name, folder_type)| Folder {
            server_id: id.to_string(),
            parent_id: "0".to_string(),
            display_name: name.to_string(),
            folder_type,
        })
        .collect();

        if self.has_ric() {
            folders.push(Folder {
                server_id: RIC_ID.to_string(),
                parent_id: "0".to_string(),
                display_name: "Suggested Contacts".to_string(),
                folder_type: FolderType::RecipientInformationCache,
            });
        }
        folders
    }

    fn is_collection(&self, collection_id: &str) -> bool {
        self.folders().iter().any(|f| f.server_id == collection_id)
    }

    /// HTTP and command status for a request the policy does not allow
    fn policy_rejection(&self, user: &SignedIn) -> Option<(u16, Status)> {
        if !self.require_provisioning {
            return None;
        }
        let (policy_key, device_type) = {
            let session = self.session_read();
            (session.policy_key.clone(), session.device_type.clone())
        };

        let status = if policy_key.is_empty() || policy_key == "0" {
            if self.non_provisionable_users.contains(&user.name.to_lowercase()) {
                return None;
            }
            Status::DEVICE_NOT_PROVISIONED
        } else {
            let slot = (user.address.clone(), device_type);
            if self.state_read().issued_keys.get(&slot) == Some(&policy_key) {
                return None;
            }
            Status::INVALID_POLICY_KEY
        };

        if self.protocol_version == "12.1" {
            Some((449, status))
        } else {
            Some((200, status))
        }
    }
}

impl Default for InMemoryExchange {
    fn default() -> Self {
        Self::new()
    }
}

fn render_body(body: &Option<Body>, preference: Option<&BodyPreference>) -> Option<Body> {
    match (body, preference.and_then(|p| p.truncation_size)) {
        (Some(body), Some(size)) => Some(body.truncated_to(size)),
        (body, _) => body.clone(),
    }
}

fn render_contact(contact: &Contact, preference: Option<&BodyPreference>) -> Contact {
    let mut contact = contact.clone();
    contact.body = render_body(&contact.body, preference);
    contact
}

fn render(item: &StoredItem, preference: Option<&BodyPreference>) -> SyncItem {
    SyncItem {
        server_id: item.server_id.clone(),
        contact: item.contact.as_ref().map(|c| render_contact(c, preference)),
        email: item.email.as_ref().map(|e| Email {
            body: render_body(&e.body, preference),
            ..e.clone()
        }),
    }
}

fn picture_bytes(contact: &Contact) -> usize {
    contact.picture.as_deref().map_or(0, |picture| {
        STANDARD
            .decode(picture)
            .map_or(picture.len(), |bytes| bytes.len())
    })
}

/// "Name <addr>" or "addr" to a lowercase bare address
fn bare_address(recipient: &str) -> String {
    let address = match (recipient.find('<'), recipient.rfind('>')) {
        (Some(start), Some(end)) if start < end => &recipient[start + 1..end],
        _ => recipient,
    };
    address.trim().trim_matches('"').to_lowercase()
}

/// Ten-digit policy key
fn new_policy_key() -> String {
    (Uuid::new_v4().as_u128() % 9_000_000_000 + 1_000_000_000).to_string()
}

fn parse_range(range: &str) -> (usize, usize) {
    range
        .split_once('-')
        .and_then(|(start, end)| Some((start.parse().ok()?, end.parse().ok()?)))
        .filter(|(start, end)| start <= end)
        .unwrap_or((0, 9))
}

impl ActiveSyncAdapter for InMemoryExchange {
    fn switch_user(&self, user: &UserInformation) -> Result<()> {
        let address = user.mail_address().to_lowercase();
        info!("Switching ActiveSync user to {address}");
        self.state().mailboxes.entry(address.clone()).or_default();
        self.session().user = Some(SignedIn {
            name: user.name.clone(),
            address,
        });
        Ok(())
    }

    fn folder_sync(&self, request: &FolderSyncRequest) -> Result<FolderSyncResponse> {
        let user = self.signed_in()?;
        if let Some((http_status, status)) = self.policy_rejection(&user) {
            debug!("FolderSync for {} rejected with {status}", user.address);
            return Ok(FolderSyncResponse {
                http_status,
                status,
                sync_key: None,
                folders: Vec::new(),
            });
        }

        let folders = if request.sync_key == "0" {
            self.folders()
        } else {
            Vec::new()
        };
        Ok(FolderSyncResponse {
            http_status: 200,
            status: Status::SUCCESS,
            sync_key: Some("1".to_string()),
            folders,
        })
    }

    fn sync(&self, request: &SyncRequest) -> Result<SyncStore> {
        let user = self.signed_in()?;
        let failed = |status: Status| SyncStore {
            status: Some(status),
            collection_id: request.collection_id.clone(),
            ..SyncStore::default()
        };

        let mut guard = self.state();
        let state = &mut *guard;
        if state.hierarchy_changes > 0 {
            state.hierarchy_changes -= 1;
            debug!("Sync on {} answered with hierarchy changed", request.collection_id);
            return Ok(failed(Status::HIERARCHY_CHANGED));
        }
        if !self.is_collection(&request.collection_id) {
            return Ok(failed(Status::OBJECT_NOT_FOUND));
        }
        if request.get_changes {
            state.tick += 1;
        }
        let tick = state.tick;
        let visible_after = tick + self.visibility_lag;

        let mailbox = state.mailboxes.entry(user.address.clone()).or_default();
        if request.sync_key == "0" {
            mailbox.collections.insert(
                request.collection_id.clone(),
                CollectionState {
                    sync_key: 1,
                    seen: HashMap::new(),
                    supported: request.supported.clone(),
                },
            );
            return Ok(SyncStore {
                status: Some(Status::SUCCESS),
                collection_id: request.collection_id.clone(),
                sync_key: Some("1".to_string()),
                ..SyncStore::default()
            });
        }

        let Mailbox {
            items,
            collections,
            next_item,
        } = mailbox;
        let Some(collection) = collections
            .get_mut(&request.collection_id)
            .filter(|c| c.sync_key.to_string() == request.sync_key)
        else {
            return Ok(failed(Status::INVALID_SYNC_KEY));
        };

        let mut store = SyncStore {
            status: Some(Status::SUCCESS),
            collection_id: request.collection_id.clone(),
            ..SyncStore::default()
        };

        for command in &request.commands {
            match command {
                SyncCommand::Add { client_id, contact } => {
                    if picture_bytes(contact) > self.max_picture_bytes {
                        store.add_responses.push(AddResponse {
                            client_id: client_id.clone(),
                            server_id: None,
                            status: Status::CONVERSION_ERROR,
                        });
                        continue;
                    }
                    *next_item += 1;
                    let server_id =
                        ServerId::new(format!("{}:{}", request.collection_id, next_item));
                    items.push(StoredItem {
                        server_id: server_id.clone(),
                        collection_id: request.collection_id.clone(),
                        contact: Some(contact.clone()),
                        email: None,
                        version: 1,
                        visible_after,
                    });
                    store.add_responses.push(AddResponse {
                        client_id: client_id.clone(),
                        server_id: Some(server_id),
                        status: Status::SUCCESS,
                    });
                }
                SyncCommand::Change { server_id, contact } => {
                    let target = items.iter_mut().find(|item| {
                        item.server_id == *server_id && item.collection_id == request.collection_id
                    });
                    match target {
                        Some(item) => {
                            item.contact
                                .get_or_insert_with(Contact::default)
                                .apply_change(contact.clone(), collection.supported.as_deref());
                            item.version += 1;
                            item.visible_after = visible_after;
                        }
                        None => store.change_responses.push(ChangeResponse {
                            server_id: server_id.clone(),
                            status: Status::OBJECT_NOT_FOUND,
                        }),
                    }
                }
                SyncCommand::Delete { server_id } => {
                    items.retain(|item| item.server_id != *server_id);
                    collection.seen.remove(server_id);
                }
            }
        }

        if request.get_changes {
            let window = request.window_size.map_or(usize::MAX, |w| w as usize);
            let preference = request.body_preference.as_ref();
            for item in items
                .iter()
                .filter(|i| i.collection_id == request.collection_id && i.is_visible(tick))
            {
                if store.add_elements.len() + store.change_elements.len() >= window {
                    break;
                }
                match collection.seen.get(&item.server_id) {
                    None => store.add_elements.push(render(item, preference)),
                    Some(version) if *version < item.version => {
                        store.change_elements.push(render(item, preference))
                    }
                    Some(_) => continue,
                }
                collection.seen.insert(item.server_id.clone(), item.version);
            }
        }

        if request.get_changes || !request.commands.is_empty() {
            collection.sync_key += 1;
        }
        store.sync_key = Some(collection.sync_key.to_string());
        Ok(store)
    }

    fn item_operations(&self, request: &ItemOperationsRequest) -> Result<ItemOperationsStore> {
        let user = self.signed_in()?;
        let mut guard = self.state();
        let state = &mut *guard;
        state.tick += 1;
        let tick = state.tick;
        let mailbox = state.mailboxes.entry(user.address).or_default();

        let found = mailbox.items.iter().find(|item| {
            item.server_id == request.server_id
                && item.collection_id == request.collection_id
                && item.is_visible(tick)
        });
        let item = match found {
            Some(item) => ItemOperationsItem {
                status: Status::SUCCESS,
                collection_id: item.collection_id.clone(),
                server_id: item.server_id.clone(),
                contact: item.contact.as_ref().map(|contact| {
                    let projected = match &request.schema {
                        Some(schema) => contact.project(schema),
                        None => contact.clone(),
                    };
                    render_contact(&projected, request.body_preference.as_ref())
                }),
            },
            None => ItemOperationsItem {
                status: Status::OBJECT_NOT_FOUND,
                collection_id: request.collection_id.clone(),
                server_id: request.server_id.clone(),
                contact: None,
            },
        };

        Ok(ItemOperationsStore {
            status: Some(Status::SUCCESS),
            items: vec![item],
        })
    }

    fn search(&self, request: &SearchRequest) -> Result<SearchStore> {
        let user = self.signed_in()?;
        let mut guard = self.state();
        let state = &mut *guard;
        state.tick += 1;
        let tick = state.tick;
        let mailbox = state.mailboxes.entry(user.address).or_default();

        let needle = request.free_text.to_lowercase();
        let matches: Vec<SearchResult> = mailbox
            .items
            .iter()
            .filter(|item| {
                item.collection_id == request.collection_id
                    && item.is_visible(tick)
                    && item.matches_text(&needle)
            })
            .map(|item| SearchResult {
                collection_id: item.collection_id.clone(),
                long_id: Some(item.server_id.to_string()),
                contact: item.contact.clone(),
                email: item.email.clone(),
            })
            .collect();

        let total = matches.len();
        let (start, end) = parse_range(&request.range);
        let results: Vec<SearchResult> =
            matches.into_iter().skip(start).take(end - start + 1).collect();
        let range = (!results.is_empty()).then(|| format!("{start}-{}", start + results.len() - 1));

        Ok(SearchStore {
            status: Some(Status::SUCCESS),
            range,
            total,
            results,
        })
    }

    fn send_mail(&self, request: &SendMailRequest) -> Result<SendMailResponse> {
        let sender = self.signed_in()?;
        let message = MimeMessage::parse(&request.mime);
        if message.to.is_empty() {
            return Ok(SendMailResponse {
                status: Some(Status::PROTOCOL_ERROR),
            });
        }

        let has_ric = self.has_ric();
        let mut guard = self.state();
        let state = &mut *guard;
        let visible_after = state.tick + self.visibility_lag;
        let email = Email {
            subject: message.subject.clone(),
            from: Some(sender.address.clone()),
            to: Some(message.to.join(", ")),
            date_received: Some(Utc::now()),
            message_class: Some("IPM.Note".to_string()),
            body: Some(Body::plain_text(message.body.clone())),
        };

        for recipient in &message.to {
            let address = bare_address(recipient);
            debug!("Delivering {:?} to {address}", message.subject);
            state.mailboxes.entry(address.clone()).or_default().insert(
                INBOX_ID,
                None,
                Some(email.clone()),
                visible_after,
            );

            if !has_ric {
                continue;
            }
            let outbox = state.mailboxes.entry(sender.address.clone()).or_default();
            let cached = outbox.items.iter_mut().find(|item| {
                item.collection_id == RIC_ID
                    && item
                        .contact
                        .as_ref()
                        .is_some_and(|c| c.email1_address.as_deref() == Some(address.as_str()))
            });
            match cached {
                Some(item) => {
                    if let Some(contact) = item.contact.as_mut() {
                        contact.weighted_rank = Some(contact.weighted_rank.unwrap_or(0) + 1);
                    }
                    item.version += 1;
                    item.visible_after = visible_after;
                }
                None => {
                    let contact = Contact {
                        file_as: Some(address.clone()),
                        email1_address: Some(address.clone()),
                        weighted_rank: Some(1),
                        ..Contact::default()
                    };
                    outbox.insert(RIC_ID, Some(contact), None, visible_after);
                }
            }
        }

        Ok(SendMailResponse::default())
    }

    fn provision(&self, request: &ProvisionRequest) -> Result<ProvisionResponse> {
        let user = self.signed_in()?;
        let Some(policy) = &request.policy else {
            return Ok(ProvisionResponse {
                status: Status::PROTOCOL_ERROR,
                policy: None,
            });
        };

        let rejected = |status: Status| ProvisionResponse {
            status: Status::SUCCESS,
            policy: Some(Policy {
                policy_type: Some(policy.policy_type.clone()),
                policy_key: None,
                status,
                data: None,
            }),
        };
        if policy.policy_type != PROVISIONING_POLICY_TYPE {
            return Ok(rejected(Status::UNKNOWN_POLICY_TYPE));
        }

        let slot = (user.address.clone(), self.device_type());
        let mut state = self.state();
        let (policy_key, data) = match &policy.policy_key {
            None => {
                let temporary = new_policy_key();
                state.pending_keys.insert(slot, temporary.clone());
                (temporary, Some(PROVISION_DOC.to_string()))
            }
            Some(key) if state.pending_keys.get(&slot) == Some(key) => {
                state.pending_keys.remove(&slot);
                let permanent = new_policy_key();
                info!("Device {} of {} provisioned", slot.1, slot.0);
                state.issued_keys.insert(slot, permanent.clone());
                (permanent, None)
            }
            Some(_) => return Ok(rejected(Status::WRONG_POLICY_KEY)),
        };

        Ok(ProvisionResponse {
            status: Status::SUCCESS,
            policy: Some(Policy {
                policy_type: Some(policy.policy_type.clone()),
                policy_key: Some(policy_key),
                status: Status::SUCCESS,
                data,
            }),
        })
    }

    fn apply_policy_key(&self, policy_key: &str) {
        self.session().policy_key = policy_key.to_string();
    }

    fn apply_device_type(&self, device_type: &str) {
        self.session().device_type = device_type.to_string();
    }
}

impl ProvisioningSutControl for InMemoryExchange {
    fn remove_device(
        &self,
        _server_name: &str,
        user_email: &str,
        _password: &str,
        device_type: &str,
    ) -> Result<bool> {
        let slot = (user_email.to_lowercase(), device_type.to_string());
        let mut state = self.state();
        let pending = state.pending_keys.remove(&slot).is_some();
        let issued = state.issued_keys.remove(&slot).is_some();
        Ok(pending || issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activesync::{BodyType, SyncRequest};

    fn signed_in(exchange: &InMemoryExchange) {
        exchange
            .switch_user(&UserInformation::new("user1", "pw", "contoso.com"))
            .unwrap();
    }

    fn initial_key(exchange: &InMemoryExchange, collection: &str) -> String {
        exchange
            .sync(&SyncRequest::initial(collection))
            .unwrap()
            .sync_key
            .unwrap()
    }

    #[test]
    fn test_added_contact_visible_after_lag() {
        let exchange = InMemoryExchange::new().with_visibility_lag(2);
        signed_in(&exchange);
        let key = initial_key(&exchange, CONTACTS_ID);
        let added = exchange
            .sync(&SyncRequest::add(CONTACTS_ID, &key, Contact::with_file_as("Lagging")))
            .unwrap();
        assert_eq!(added.add_responses[0].status, Status::SUCCESS);

        let mut key = added.sync_key.unwrap();
        let mut found_on = None;
        for attempt in 1..=4 {
            let store = exchange
                .sync(&SyncRequest::get_changes(CONTACTS_ID, &key, None))
                .unwrap();
            key = store.sync_key.clone().unwrap();
            if !store.add_elements.is_empty() {
                found_on = Some(attempt);
                break;
            }
        }
        assert_eq!(found_on, Some(3));
    }

    #[test]
    fn test_stale_sync_key_is_rejected() {
        let exchange = InMemoryExchange::new();
        signed_in(&exchange);
        initial_key(&exchange, CONTACTS_ID);
        let store = exchange
            .sync(&SyncRequest::get_changes(CONTACTS_ID, "7", None))
            .unwrap();
        assert_eq!(store.status, Some(Status::INVALID_SYNC_KEY));
    }

    #[test]
    fn test_injected_hierarchy_change() {
        let exchange = InMemoryExchange::new();
        signed_in(&exchange);
        exchange.inject_hierarchy_changed(1);
        let first = exchange.sync(&SyncRequest::initial(CONTACTS_ID)).unwrap();
        assert!(first.is_hierarchy_changed());
        let second = exchange.sync(&SyncRequest::initial(CONTACTS_ID)).unwrap();
        assert!(second.is_success());
    }

    #[test]
    fn test_oversized_picture_gets_status_6() {
        let exchange = InMemoryExchange::new().with_max_picture_bytes(4);
        signed_in(&exchange);
        let key = initial_key(&exchange, CONTACTS_ID);
        let contact = Contact {
            picture: Some(STANDARD.encode([0u8; 5])),
            ..Contact::with_file_as("Pictured")
        };
        let store = exchange
            .sync(&SyncRequest::add(CONTACTS_ID, &key, contact))
            .unwrap();
        assert_eq!(store.add_responses[0].status, Status::CONVERSION_ERROR);
        assert_eq!(store.add_responses[0].server_id, None);
    }

    #[test]
    fn test_body_truncated_on_request() {
        let exchange = InMemoryExchange::new();
        signed_in(&exchange);
        let key = initial_key(&exchange, CONTACTS_ID);
        let contact = Contact {
            body: Some(Body::plain_text("0123456789abc")),
            ..Contact::with_file_as("Noted")
        };
        let key = exchange
            .sync(&SyncRequest::add(CONTACTS_ID, &key, contact))
            .unwrap()
            .sync_key
            .unwrap();
        let preference = BodyPreference::new(BodyType::PlainText).truncation_size(8);
        let store = exchange
            .sync(&SyncRequest::get_changes(CONTACTS_ID, &key, Some(preference)))
            .unwrap();
        let body = store.add_elements[0].contact.as_ref().unwrap().body.clone().unwrap();
        assert_eq!(body.data.as_deref(), Some("01234567"));
        assert!(body.truncated);
    }

    #[test]
    fn test_send_mail_fills_inbox_and_recipient_cache() {
        let exchange = InMemoryExchange::new();
        signed_in(&exchange);
        let mime = crate::activesync::create_mime(
            "user1@contoso.com",
            "user2@contoso.com",
            "Hello",
            "Body",
        );
        let response = exchange.send_mail(&SendMailRequest::new(mime)).unwrap();
        assert!(response.is_empty());
        assert_eq!(exchange.item_count("user2@contoso.com"), 1);

        let key = initial_key(&exchange, RIC_ID);
        let store = exchange
            .sync(&SyncRequest::get_changes(RIC_ID, &key, None))
            .unwrap();
        let cached = store.add_elements[0].contact.as_ref().unwrap();
        assert_eq!(cached.email1_address.as_deref(), Some("user2@contoso.com"));
        assert!(cached.weighted_rank.is_some());
        assert!(cached.alias.is_none());
    }

    #[test]
    fn test_version_12_1_has_no_recipient_cache() {
        let exchange = InMemoryExchange::new().with_protocol_version("12.1");
        signed_in(&exchange);
        let folders = exchange.folder_sync(&FolderSyncRequest::initial()).unwrap();
        assert_eq!(
            folders.default_folder_id(FolderType::RecipientInformationCache),
            None
        );
    }

    #[test]
    fn test_provisioning_handshake() {
        let exchange = InMemoryExchange::new().require_provisioning();
        signed_in(&exchange);
        let denied = exchange.folder_sync(&FolderSyncRequest::initial()).unwrap();
        assert_eq!(denied.status, Status::DEVICE_NOT_PROVISIONED);

        let initial = exchange
            .provision(&ProvisionRequest::download(PROVISIONING_POLICY_TYPE))
            .unwrap();
        let temporary = initial.policy.unwrap().policy_key.unwrap();
        let acknowledged = exchange
            .provision(&ProvisionRequest::acknowledge(
                PROVISIONING_POLICY_TYPE,
                &temporary,
                "1",
            ))
            .unwrap()
            .policy
            .unwrap();
        assert!(acknowledged.data.is_none());

        exchange.apply_policy_key(&acknowledged.policy_key.unwrap());
        let allowed = exchange.folder_sync(&FolderSyncRequest::initial()).unwrap();
        assert_eq!(allowed.status, Status::SUCCESS);

        let device = exchange.device_type();
        assert!(exchange
            .remove_device("sut", "USER1@contoso.com", "pw", &device)
            .unwrap());
        assert!(!exchange.is_device_provisioned("user1@contoso.com", &device));
    }
}
