//! MS-ASCNTC: Contact class data over ActiveSync
//!
//! Every case adds contacts to user 1's Contacts folder and reads them back.
//! Server state is eventually consistent, so each read goes through
//! [`await_record`], matching contacts by FileAs and mail by Subject.

use anyhow::{anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};

use super::{Case, Suite};
use crate::activesync::{
    ActiveSyncAdapter, Body, BodyPreference, Contact, ContactField, FolderSyncRequest, FolderType,
    ItemOperationsItem, ItemOperationsRequest, ItemOperationsStore, MAX_PICTURE_BYTES,
    SearchRequest, SearchResult, SendMailRequest, ServerId, SyncItem, SyncRequest, SyncStore,
    by_natural_key, create_mime,
};
use crate::capture::Site;
use crate::context::UserInformation;
use crate::error::Result;
use crate::poll::{PollResponse, RetryBudget, Sleeper, ThreadSleeper, await_record};
use crate::properties::TestProperties;

pub const PROTOCOL: &str = "MS-ASCNTC";

/// Elements checked after an add, with the requirement each one proves
const ELEMENT_REQUIREMENTS: &[(ContactField, u32)] = &[
    (ContactField::AccountName, 97),
    (ContactField::Anniversary, 107),
    (ContactField::AssistantName, 112),
    (ContactField::AssistantPhoneNumber, 117),
    (ContactField::Birthday, 122),
    (ContactField::Body, 1120),
    (ContactField::BusinessAddressCity, 130),
    (ContactField::BusinessAddressCountry, 135),
    (ContactField::BusinessAddressPostalCode, 140),
    (ContactField::BusinessAddressState, 143),
    (ContactField::BusinessAddressStreet, 148),
    (ContactField::BusinessFaxNumber, 153),
    (ContactField::BusinessPhoneNumber, 158),
    (ContactField::Business2PhoneNumber, 163),
    (ContactField::CarPhoneNumber, 168),
    (ContactField::CompanyMainPhone, 195),
    (ContactField::CompanyName, 200),
    (ContactField::CustomerId, 205),
    (ContactField::Department, 209),
    (ContactField::FileAs, 231),
    (ContactField::FirstName, 238),
    (ContactField::GovernmentId, 243),
    (ContactField::HomeAddressCity, 248),
    (ContactField::HomeAddressCountry, 253),
    (ContactField::HomeAddressPostalCode, 258),
    (ContactField::HomeAddressState, 263),
    (ContactField::HomeAddressStreet, 268),
    (ContactField::HomeFaxNumber, 273),
    (ContactField::HomePhoneNumber, 278),
    (ContactField::Home2PhoneNumber, 283),
    (ContactField::ImAddress, 288),
    (ContactField::ImAddress2, 293),
    (ContactField::ImAddress3, 298),
    (ContactField::JobTitle, 303),
    (ContactField::LastName, 308),
    (ContactField::ManagerName, 313),
    (ContactField::MiddleName, 318),
    (ContactField::Mms, 323),
    (ContactField::MobilePhoneNumber, 328),
    (ContactField::NickName, 333),
    (ContactField::OfficeLocation, 338),
    (ContactField::OtherAddressCity, 343),
    (ContactField::OtherAddressCountry, 348),
    (ContactField::OtherAddressPostalCode, 353),
    (ContactField::OtherAddressState, 358),
    (ContactField::OtherAddressStreet, 363),
    (ContactField::PagerNumber, 368),
    (ContactField::RadioPhoneNumber, 385),
    (ContactField::Spouse, 390),
    (ContactField::Suffix, 395),
    (ContactField::Title, 400),
    (ContactField::WebPage, 405),
    (ContactField::YomiCompanyName, 417),
    (ContactField::YomiFirstName, 422),
    (ContactField::YomiLastName, 427),
];

/// Elements that keep their value when a Change leaves them out
const GHOSTED_REQUIREMENTS: &[(ContactField, u32)] = &[
    (ContactField::AccountName, 100),
    (ContactField::Anniversary, 110),
    (ContactField::AssistantPhoneNumber, 120),
    (ContactField::Birthday, 125),
    (ContactField::BusinessAddressCity, 133),
    (ContactField::BusinessAddressCountry, 138),
    (ContactField::BusinessAddressPostalCode, 700),
    (ContactField::BusinessAddressState, 146),
    (ContactField::BusinessAddressStreet, 151),
    (ContactField::BusinessFaxNumber, 156),
    (ContactField::BusinessPhoneNumber, 161),
    (ContactField::Business2PhoneNumber, 166),
    (ContactField::CarPhoneNumber, 171),
    (ContactField::Categories, 177),
    (ContactField::Children, 188),
    (ContactField::CompanyMainPhone, 198),
    (ContactField::CompanyName, 203),
    (ContactField::CustomerId, 208),
    (ContactField::Department, 212),
    (ContactField::Email1Address, 217),
    (ContactField::Email2Address, 224),
    (ContactField::Email3Address, 229),
    (ContactField::FileAs, 234),
    (ContactField::FirstName, 241),
    (ContactField::GovernmentId, 246),
    (ContactField::HomeAddressCity, 251),
    (ContactField::HomeAddressCountry, 256),
    (ContactField::HomeAddressPostalCode, 261),
    (ContactField::HomeAddressState, 266),
    (ContactField::HomeAddressStreet, 271),
    (ContactField::HomeFaxNumber, 276),
    (ContactField::HomePhoneNumber, 281),
    (ContactField::Home2PhoneNumber, 286),
    (ContactField::ImAddress, 291),
    (ContactField::ImAddress2, 296),
    (ContactField::ImAddress3, 301),
    (ContactField::JobTitle, 306),
    (ContactField::LastName, 311),
    (ContactField::ManagerName, 316),
    (ContactField::MiddleName, 321),
    (ContactField::Mms, 326),
    (ContactField::MobilePhoneNumber, 331),
    (ContactField::NickName, 336),
    (ContactField::OfficeLocation, 341),
    (ContactField::OtherAddressCity, 346),
    (ContactField::OtherAddressCountry, 351),
    (ContactField::OtherAddressPostalCode, 356),
    (ContactField::OtherAddressState, 361),
    (ContactField::OtherAddressStreet, 366),
    (ContactField::PagerNumber, 371),
    (ContactField::RadioPhoneNumber, 388),
    (ContactField::Spouse, 393),
    (ContactField::Suffix, 398),
    (ContactField::Title, 403),
    (ContactField::WebPage, 408),
    (ContactField::YomiCompanyName, 420),
    (ContactField::YomiFirstName, 425),
    (ContactField::YomiLastName, 430),
    (ContactField::Body, 499),
];

const SMALL_PICTURE_BYTES: usize = 2 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Account {
    User1,
    User2,
}

pub struct ContactsSuite<'a> {
    adapter: &'a dyn ActiveSyncAdapter,
    sleeper: &'a dyn Sleeper,
    properties: TestProperties,
    site: Site,
    budget: RetryBudget,
    protocol_version: String,
    user1: UserInformation,
    user2: UserInformation,
}

impl<'a> ContactsSuite<'a> {
    /// Sign in as user 1 and discover its folders
    pub fn setup(adapter: &'a dyn ActiveSyncAdapter, properties: TestProperties) -> Result<Self> {
        let mut suite = Self {
            adapter,
            sleeper: &ThreadSleeper,
            site: Site::new(PROTOCOL),
            budget: properties.retry_budget()?,
            protocol_version: properties.protocol_version()?,
            user1: properties.user(1)?,
            user2: properties.user(2)?,
            properties,
        };
        suite.switch_user(Account::User1, true)?;
        Ok(suite)
    }

    pub fn with_sleeper(mut self, sleeper: &'a dyn Sleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Remove leftovers and hand back the captured requirements
    pub fn teardown(mut self) -> Result<Site> {
        self.cleanup()?;
        Ok(self.site)
    }

    /// Sync Add with every Contact class element, verified element by element
    pub fn sync_add_contact(&mut self) -> Result<()> {
        let contact = self.sample_contact(Some(picture_of(SMALL_PICTURE_BYTES)));
        let collection_id = self.contacts_collection()?;
        let file_as = self.file_as_of(&contact)?;
        self.add_contact(&collection_id, contact.clone())?;

        let (item, _) =
            self.sync_add_result(&file_as, &collection_id, Some(BodyPreference::plain_text()), None)?;
        let added = self.site.require(item.contact, "Sync add result carries no contact")?;
        self.site.assert_true(
            added.weighted_rank.is_none(),
            "WeightedRank is only returned from the recipient information cache",
        )?;

        self.verify_contact_class_elements(&contact, &added)
    }

    /// Supported lists AssistantName, so every other element is ghosted
    pub fn ghosted_elements_except_assistant_name(&mut self) -> Result<()> {
        let contact = self.sample_contact(None);
        let collection_id = self.contacts_collection()?;
        let file_as = self.file_as_of(&contact)?;
        self.add_contact(&collection_id, contact)?;

        let supported = [ContactField::AssistantName];
        let (added, sync_key) =
            self.sync_add_result(&file_as, &collection_id, None, Some(supported.to_vec()))?;
        let change = Contact {
            assistant_name: Some("EditedAssistantName".to_string()),
            ..Contact::default()
        };
        let sync_key = self.update_contact(&collection_id, &sync_key, added.server_id.clone(), change)?;
        let changed =
            self.sync_change_result(&file_as, &collection_id, &sync_key, None, Some(&supported[..]))?;

        let before = self.site.require(added.contact, "Sync add result carries no contact")?;
        let after = self.site.require(changed.contact, "Sync change result carries no contact")?;
        self.site.assert_eq(
            Some("EditedAssistantName"),
            after.assistant_name.as_deref(),
            "AssistantName should be changed",
        )?;

        for &(field, id) in GHOSTED_REQUIREMENTS {
            let description = format!("[In {}] This element can be ghosted.", field.element_name());
            self.site.capture_if_eq(
                before.element_text(field),
                after.element_text(field),
                id,
                &description,
            )?;
        }
        Ok(())
    }

    /// Supported lists JobTitle only; AssistantName and the body are ghosted
    pub fn ghosted_assistant_name(&mut self) -> Result<()> {
        let contact = self.sample_contact(None);
        let collection_id = self.contacts_collection()?;
        let file_as = self.file_as_of(&contact)?;
        self.add_contact(&collection_id, contact)?;

        let preference = BodyPreference::plain_text();
        let supported = [ContactField::JobTitle];
        let (added, sync_key) = self.sync_add_result(
            &file_as,
            &collection_id,
            Some(preference.clone()),
            Some(supported.to_vec()),
        )?;
        let change = Contact {
            job_title: Some("EditedJobTitle".to_string()),
            ..Contact::default()
        };
        let sync_key = self.update_contact(&collection_id, &sync_key, added.server_id.clone(), change)?;
        let changed = self.sync_change_result(
            &file_as,
            &collection_id,
            &sync_key,
            Some(preference),
            Some(&supported[..]),
        )?;

        let before = self.site.require(added.contact, "Sync add result carries no contact")?;
        let after = self.site.require(changed.contact, "Sync change result carries no contact")?;
        self.site.assert_eq(
            Some("EditedJobTitle"),
            after.job_title.as_deref(),
            "JobTitle should be changed",
        )?;

        self.site.capture_if_eq(
            before.assistant_name,
            after.assistant_name,
            115,
            "[In AssistantName] This element[AssistantName] can be ghosted.",
        )?;
        self.site.capture_if_eq(
            before.body.and_then(|b| b.data),
            after.body.and_then(|b| b.data),
            461,
            "[In Truncating the Contact Notes Field] If an airsyncbase:Body element is not \
             included in the request, the server MUST NOT delete the stored Notes for the contact.",
        )
    }

    /// Mail to user 2 puts user 2 into user 1's recipient information cache
    pub fn refresh_recipient_information_cache(&mut self) -> Result<()> {
        self.site.assume(
            self.protocol_version != "12.1",
            "the recipient information cache is not supported with protocol version 12.1",
        )?;

        let subject = self.site.resource_name("Subject");
        let body = self.site.resource_name("Body");
        self.send_email(&subject, &body)?;

        self.switch_user(Account::User2, true)?;
        let inbox = self.site.require(
            self.user2.inbox_collection_id.clone(),
            "FolderSync reported no Inbox for user 2",
        )?;
        self.record_created_items(Account::User2, &inbox, &subject);
        self.sync_add_result(&subject, &inbox, None, None)?;

        self.switch_user(Account::User1, false)?;
        let ric = self.site.require(
            self.user1.ric_collection_id.clone(),
            "FolderSync reported no recipient information cache for user 1",
        )?;
        let recipient = self.user2.mail_address().to_lowercase();
        let entry = self.await_sync_item(&ric, &recipient, None, None, |item: &SyncItem| {
            item.contact
                .as_ref()
                .and_then(|c| c.email1_address.as_deref())
                .is_some_and(|address| address.to_lowercase().contains(&recipient))
        })?;
        let cached = self.site.require(entry.0.contact, "cache entry carries no contact")?;

        self.site.capture_if_some(
            &cached.weighted_rank,
            415,
            "[In WeightedRank] The WeightedRank element is only returned in a recipient information cache response.",
        )?;
        self.site.capture(
            410,
            "[In WeightedRank] The WeightedRank element specifies the rank of this contact entry in the recipient information cache.",
        );
        self.site.capture_if_some(
            &cached.file_as,
            236,
            "[In FileAs] The FileAs element is one of the Contact class elements that is returned in a recipient information cache response.",
        )?;
        self.site.capture_if_some(
            &cached.email1_address,
            219,
            "[In Email1Address] The Email1Address element is one of the Contact class elements that is returned in a recipient information cache response.",
        )?;
        if self.properties.is_requirement_enabled(1010)? {
            self.site.capture_if_none(
                &cached.alias,
                1010,
                "[In Appendix B: Product Behavior] Implementation does not return Alias element in a recipient information cache response.",
            )?;
        }
        Ok(())
    }

    pub fn picture_exceeds_48kb(&mut self) -> Result<()> {
        let contact = self.sample_contact(Some(picture_of(MAX_PICTURE_BYTES + 1024)));
        let collection_id = self.contacts_collection()?;
        let store = self.add_contact(&collection_id, contact)?;

        let status = store.add_responses.first().map(|r| r.status.0);
        self.site.capture_if_eq(
            Some(6),
            status,
            384,
            "[In Picture] If the value of the Picture element exceeds 48 KB of content with base64 encoding, the server MUST return a status error of 6.",
        )
    }

    pub fn add_contact_300_categories(&mut self) -> Result<()> {
        let file_as = self.site.resource_name("Contact");
        let contact = Contact {
            categories: Some((1..=300).map(|i| format!("Category{i}")).collect()),
            ..Contact::with_file_as(file_as.clone())
        };
        let collection_id = self.contacts_collection()?;
        self.add_contact(&collection_id, contact)?;

        let (item, _) = self.sync_add_result(&file_as, &collection_id, None, None)?;
        let count = item.contact.and_then(|c| c.categories).map(|c| c.len());
        self.site.capture_if_eq(
            Some(300),
            count,
            183,
            "[In Category] It[Categories] can have up to 300 elements[Category] per Categories element.",
        )
    }

    pub fn add_contact_300_children(&mut self) -> Result<()> {
        let file_as = self.site.resource_name("Contact");
        let contact = Contact {
            children: Some((1..=300).map(|i| format!("Child{i}")).collect()),
            ..Contact::with_file_as(file_as.clone())
        };
        let collection_id = self.contacts_collection()?;
        self.add_contact(&collection_id, contact)?;

        let (item, _) = self.sync_add_result(&file_as, &collection_id, None, None)?;
        let count = item.contact.and_then(|c| c.children).map(|c| c.len());
        self.site.capture_if_eq(
            Some(300),
            count,
            194,
            "[In Child] It[Children] can have up to 300 elements[Child] per Children element.",
        )
    }

    pub fn truncated_body(&mut self) -> Result<()> {
        let contact = self.sample_contact(None);
        let collection_id = self.contacts_collection()?;
        let file_as = self.file_as_of(&contact)?;
        let body = body_text(&contact);
        self.add_contact(&collection_id, contact)?;

        let truncation = 8;
        let preference = BodyPreference::plain_text().truncation_size(truncation);
        let (item, _) = self.sync_add_result(&file_as, &collection_id, Some(preference), None)?;

        self.site.capture_if_eq(
            Some(body.chars().take(truncation).collect::<String>()),
            item.contact.and_then(|c| c.body).and_then(|b| b.data),
            512,
            "[In Truncating the Contact Notes Field] Once a client requests truncation, the server truncates the contents of the airsyncbase:Body element in the subsequent Sync command response.",
        )
    }

    pub fn non_truncated_body(&mut self) -> Result<()> {
        let contact = self.sample_contact(None);
        let collection_id = self.contacts_collection()?;
        let file_as = self.file_as_of(&contact)?;
        let body = body_text(&contact);
        self.add_contact(&collection_id, contact)?;

        let (item, _) = self.sync_add_result(
            &file_as,
            &collection_id,
            Some(BodyPreference::plain_text()),
            None,
        )?;

        self.site.capture_if_eq(
            Some(body),
            item.contact.and_then(|c| c.body).and_then(|b| b.data),
            460,
            "[In Truncating the Contact Notes Field] A client can request that the server no longer truncate the contents of the airsyncbase:Body element by leaving out the airsyncbase:TruncationSize element.",
        )
    }

    /// ItemOperations Fetch returns only the elements named in the Schema
    pub fn item_operations_fetch(&mut self) -> Result<()> {
        let contact = self.sample_contact(None);
        let collection_id = self.contacts_collection()?;
        let file_as = self.file_as_of(&contact)?;
        self.add_contact(&collection_id, contact.clone())?;

        let (added, _) = self.sync_add_result(&file_as, &collection_id, None, None)?;
        let schema = vec![ContactField::FileAs, ContactField::FirstName, ContactField::Body];
        let fetched = self.item_operations_result(
            &collection_id,
            added.server_id,
            Some(schema.clone()),
            Some(BodyPreference::plain_text()),
        )?;
        let fetched = self.site.require(fetched.contact, "ItemOperations returned no contact")?;

        self.site.assert_eq(contact.file_as, fetched.file_as.clone(), "FileAs")?;
        self.site.assert_eq(contact.first_name, fetched.first_name.clone(), "FirstName")?;
        self.site.assert_true(
            fetched.present_fields().iter().all(|f| schema.contains(f)),
            "ItemOperations should return only the elements named in the Schema",
        )
    }

    pub fn search_by_file_as(&mut self) -> Result<()> {
        let contact = self.sample_contact(None);
        let collection_id = self.contacts_collection()?;
        let file_as = self.file_as_of(&contact)?;
        self.add_contact(&collection_id, contact.clone())?;

        let found = self.search_result(&file_as, &collection_id)?;
        self.site.assert_eq(collection_id.as_str(), found.collection_id.as_str(), "CollectionId")?;
        let found = self.site.require(found.contact, "Search result carries no contact")?;
        self.site.assert_eq(contact.first_name, found.first_name, "FirstName")?;
        self.site.assert_eq(contact.last_name, found.last_name, "LastName")
    }

    fn user(&self, account: Account) -> &UserInformation {
        match account {
            Account::User1 => &self.user1,
            Account::User2 => &self.user2,
        }
    }

    fn user_mut(&mut self, account: Account) -> &mut UserInformation {
        match account {
            Account::User1 => &mut self.user1,
            Account::User2 => &mut self.user2,
        }
    }

    fn switch_user(&mut self, account: Account, folder_sync: bool) -> Result<()> {
        self.adapter.switch_user(self.user(account))?;
        if folder_sync {
            self.folder_sync(account)?;
        }
        Ok(())
    }

    /// Discover the default folders of the signed-in user
    fn folder_sync(&mut self, account: Account) -> Result<()> {
        let response = self.adapter.folder_sync(&FolderSyncRequest::initial())?;
        self.site.assert_true(
            response.status.is_success(),
            "FolderSync should succeed with status 1",
        )?;

        let discovered = |folder_type| response.default_folder_id(folder_type).map(str::to_string);
        let user = self.user_mut(account);
        user.inbox_collection_id = user.inbox_collection_id.take().or_else(|| discovered(FolderType::Inbox));
        user.sent_items_collection_id = user
            .sent_items_collection_id
            .take()
            .or_else(|| discovered(FolderType::SentItems));
        user.contacts_collection_id = user
            .contacts_collection_id
            .take()
            .or_else(|| discovered(FolderType::Contacts));
        user.ric_collection_id = user
            .ric_collection_id
            .take()
            .or_else(|| discovered(FolderType::RecipientInformationCache));
        Ok(())
    }

    fn contacts_collection(&self) -> Result<String> {
        self.site.require(
            self.user1.contacts_collection_id.clone(),
            "FolderSync reported no Contacts folder for user 1",
        )
    }

    fn file_as_of(&self, contact: &Contact) -> Result<String> {
        self.site.require(contact.file_as.clone(), "contact has no FileAs")
    }

    fn record_created_items(&mut self, account: Account, collection_id: &str, key: &str) {
        self.user_mut(account).record_created(collection_id, key);
    }

    /// Sync Add of one contact on a fresh sync relationship
    fn add_contact(&mut self, collection_id: &str, contact: Contact) -> Result<SyncStore> {
        let file_as = contact.file_as.clone();
        let sync_key = initial_sync_key(self.adapter, collection_id, None, self.budget.max_attempts())?;
        let store = self.adapter.sync(&SyncRequest::add(collection_id, &sync_key, contact))?;

        self.site.assert_true(store.is_success(), "Sync Add should succeed with status 1")?;
        self.site.assert_eq(1, store.add_responses.len(), "one contact was added")?;

        if let Some(file_as) = file_as
            && store.add_responses.iter().all(|r| r.status.is_success())
        {
            self.record_created_items(Account::User1, collection_id, &file_as);
        }
        Ok(store)
    }

    /// Wait for a newly added item and return it with the latest SyncKey.
    ///
    /// `supported` goes on the initial Sync, so later Changes on this
    /// relationship ghost every element it leaves out.
    fn sync_add_result(
        &self,
        key: &str,
        collection_id: &str,
        body_preference: Option<BodyPreference>,
        supported: Option<Vec<ContactField>>,
    ) -> Result<(SyncItem, String)> {
        self.await_sync_item(
            collection_id,
            key,
            body_preference,
            supported,
            by_natural_key::<SyncItem>(key),
        )
    }

    fn await_sync_item(
        &self,
        collection_id: &str,
        key: &str,
        body_preference: Option<BodyPreference>,
        supported: Option<Vec<ContactField>>,
        predicate: impl FnMut(&SyncItem) -> bool,
    ) -> Result<(SyncItem, String)> {
        let adapter = self.adapter;
        let attempts = self.budget.max_attempts();
        let supported = supported.as_deref();
        let mut sync_key = initial_sync_key(adapter, collection_id, supported, attempts)?;

        let item = await_record(
            || {
                let store = adapter.sync(&SyncRequest::get_changes(
                    collection_id,
                    &sync_key,
                    body_preference.clone(),
                ))?;
                if store.is_hierarchy_changed() {
                    debug!("Folder hierarchy changed while waiting for {key}");
                    sync_key = initial_sync_key(adapter, collection_id, supported, attempts)?;
                } else if let Some(next) = &store.sync_key {
                    sync_key = next.clone();
                }
                Ok(Some(store))
            },
            predicate,
            &self.budget,
            self.sleeper,
        )
        .map_err(|e| e.for_key(key))?;

        Ok((item, sync_key))
    }

    /// Sync Change of `server_id`; returns the next SyncKey
    fn update_contact(
        &mut self,
        collection_id: &str,
        sync_key: &str,
        server_id: ServerId,
        change: Contact,
    ) -> Result<String> {
        let store = self
            .adapter
            .sync(&SyncRequest::change(collection_id, sync_key, server_id, change))?;
        self.site.assert_true(store.is_success(), "Sync Change should succeed with status 1")?;
        self.site.assert_true(
            store.change_responses.is_empty(),
            "Sync Change should not report a per-item failure",
        )?;
        self.site.require(store.sync_key, "Sync Change returned no SyncKey")
    }

    /// Wait for the changed contact on the relationship `sync_key` belongs to.
    ///
    /// After status 12 the relationship is rebuilt with the same `supported`
    /// list; the contact then arrives as an Add carrying its current state.
    fn sync_change_result(
        &self,
        file_as: &str,
        collection_id: &str,
        sync_key: &str,
        body_preference: Option<BodyPreference>,
        supported: Option<&[ContactField]>,
    ) -> Result<SyncItem> {
        let adapter = self.adapter;
        let attempts = self.budget.max_attempts();
        let mut sync_key = sync_key.to_string();

        await_record(
            || {
                let store = adapter.sync(&SyncRequest::get_changes(
                    collection_id,
                    &sync_key,
                    body_preference.clone(),
                ))?;
                if store.is_hierarchy_changed() {
                    debug!("Folder hierarchy changed while waiting for the change to {file_as}");
                    sync_key = initial_sync_key(adapter, collection_id, supported, attempts)?;
                } else if let Some(next) = &store.sync_key {
                    sync_key = next.clone();
                }
                Ok(Some(store))
            },
            by_natural_key::<SyncItem>(file_as),
            &self.budget,
            self.sleeper,
        )
        .map_err(|e| e.for_key(file_as))
    }

    fn item_operations_result(
        &self,
        collection_id: &str,
        server_id: ServerId,
        schema: Option<Vec<ContactField>>,
        body_preference: Option<BodyPreference>,
    ) -> Result<ItemOperationsItem> {
        let mut request = ItemOperationsRequest::fetch(collection_id, server_id.clone());
        if let Some(schema) = schema {
            request = request.schema(schema);
        }
        if let Some(preference) = body_preference {
            request = request.body_preference(preference);
        }

        let adapter = self.adapter;
        await_record(
            || -> anyhow::Result<Option<ItemOperationsStore>> {
                let store = adapter.item_operations(&request)?;
                if store.is_success() && store.items.len() != 1 {
                    bail!(
                        "ItemOperations for {} returned {} items instead of one",
                        request.server_id,
                        store.items.len()
                    );
                }
                Ok(Some(store))
            },
            |item: &ItemOperationsItem| item.server_id == server_id && item.contact.is_some(),
            &self.budget,
            self.sleeper,
        )
        .map_err(|e| e.for_key(server_id.as_str()))
    }

    fn search_result(&self, file_as: &str, collection_id: &str) -> Result<SearchResult> {
        let adapter = self.adapter;
        let request = SearchRequest::mailbox(collection_id, file_as);
        await_record(
            || adapter.search(&request).map(Some),
            by_natural_key::<SearchResult>(file_as),
            &self.budget,
            self.sleeper,
        )
        .map_err(|e| e.for_key(file_as))
    }

    /// SendMail from user 1 to user 2
    fn send_email(&mut self, subject: &str, body: &str) -> Result<()> {
        let mime = create_mime(
            &self.user1.mail_address(),
            &self.user2.mail_address(),
            subject,
            body,
        );
        let response = self.adapter.send_mail(&SendMailRequest::new(mime))?;
        self.site.assert_true(
            response.is_empty(),
            "SendMail should return an empty body on success",
        )
    }

    fn verify_contact_class_elements(&mut self, sent: &Contact, received: &Contact) -> Result<()> {
        for &(field, id) in ELEMENT_REQUIREMENTS {
            let description = format!(
                "[In {0}] The {0} element holds the value the client sent.",
                field.element_name()
            );
            self.site.capture_if_eq(
                sent.element_text(field),
                received.element_text(field),
                id,
                &description,
            )?;
        }

        self.site.capture_if_some(
            &received.categories,
            1030,
            "[In Categories] The Categories element specifies a collection of user labels assigned to the contact.",
        )?;
        self.site.capture_if_some(
            &received.children,
            10040,
            "[In Children] The Children element specifies a collection of the contact's children.",
        )?;
        self.site.capture_if_eq(
            sent.children.as_ref().and_then(|c| c.first()),
            received.children.as_ref().and_then(|c| c.first()),
            190,
            "[In Child] The Child element is an optional child element of the Children element that specifies a child of the contact.",
        )?;

        for (field, id) in [
            (ContactField::Email1Address, 214),
            (ContactField::Email2Address, 221),
            (ContactField::Email3Address, 226),
        ] {
            // Servers may wrap the address as "Display Name" <address>
            let contains = match (sent.element_text(field), received.element_text(field)) {
                (Some(expected), Some(actual)) => actual.contains(&expected),
                _ => false,
            };
            let description = format!(
                "[In {0}] The {0} element specifies an e-mail address for the contact.",
                field.element_name()
            );
            self.site.capture_if_true(contains, id, &description)?;
        }

        if sent.picture.is_some() {
            self.site.capture_if_eq(
                sent.picture.as_deref(),
                received.picture.as_deref(),
                373,
                "[In Picture] The Picture element specifies the file that contains the picture of the contact.",
            )?;
            self.site.capture(
                1021,
                "[In Picture] The value of the Picture element MUST be limited to an image size of 36 KB.",
            );
            let decoded = received
                .picture
                .as_deref()
                .map(|p| STANDARD.decode(p))
                .transpose()
                .map_err(|e| anyhow!("Picture is not valid base64: {e}"))?;
            self.site.capture_if_true(
                decoded.is_some_and(|bytes| bytes.len() <= MAX_PICTURE_BYTES),
                381,
                "[In Picture] The value of the Picture element MUST be limited to 48 KB of binary content that is encoded with base64 encoding",
            )?;
        }
        Ok(())
    }

    /// Contact with every element a client can set
    fn sample_contact(&mut self, picture: Option<String>) -> Contact {
        let text = |s: &str| Some(s.to_string());
        Contact {
            file_as: Some(self.site.resource_name("Contact")),
            account_name: text("Contact1"),
            anniversary: date(2012, 10, 1),
            assistant_name: text("Assistant"),
            assistant_phone_number: text("54689733"),
            birthday: date(1980, 4, 12),
            body: Some(Body::plain_text(self.site.resource_name("Body"))),
            business_phone_number: text("987654321"),
            business2_phone_number: text("123456789"),
            business_address_city: text("Beijing"),
            business_address_country: text("China"),
            business_address_postal_code: text("100080"),
            business_address_state: text("Haidian"),
            business_address_street: text("Danling"),
            business_fax_number: text("0123456"),
            car_phone_number: text("123456789"),
            categories: Some(vec![format!("{}Category", PROTOCOL)]),
            children: Some(vec![self.site.resource_name("Child")]),
            company_main_phone: text("23456987"),
            company_name: text("Microsoft"),
            customer_id: text("Customer1"),
            department: text("Testing"),
            email1_address: text("Email1@contoso.com"),
            email2_address: text("Email2@contoso.com"),
            email3_address: text("Email3@contoso.com"),
            first_name: text("Aaron"),
            government_id: text("99910819810809502X"),
            home2_phone_number: text("1234568742"),
            home_address_city: text("Princeton"),
            home_address_country: text("United States"),
            home_address_postal_code: text("08989"),
            home_address_state: text("New Jersey"),
            home_address_street: text("Nassauy"),
            home_fax_number: text("012345678"),
            home_phone_number: text("014578932"),
            im_address: text("InstantIMAddress"),
            im_address2: text("AlternativeIMAddress"),
            im_address3: text("TertiaryIMAddress"),
            job_title: text("Tester"),
            last_name: text("Clinton"),
            manager_name: text("Jodge"),
            middle_name: text("Jafferson"),
            mms: text("mms://enmms.chinabroadcast.cn"),
            mobile_phone_number: text("12345678932"),
            nick_name: text("Ara"),
            office_location: text("Beijing"),
            other_address_city: text("Toronto"),
            other_address_country: text("Canada"),
            other_address_postal_code: text("K1N5H3"),
            other_address_state: text("Ontario"),
            other_address_street: text("Avenue"),
            pager_number: text("1"),
            picture,
            radio_phone_number: text("1234562589"),
            spouse: text("Emily"),
            suffix: text("CL."),
            title: text("Test"),
            web_page: text("http://Test.html"),
            yomi_company_name: text("Sony"),
            yomi_first_name: text("Hanasaki"),
            yomi_last_name: text("Tsuki"),
            ..Contact::default()
        }
    }

    /// Delete what the last case recorded, signing in as each owner
    fn delete_created_items(&mut self, account: Account) -> Result<()> {
        let created = self.user_mut(account).take_created_items();
        if created.iter().all(|c| c.keys.is_empty()) {
            return Ok(());
        }

        self.switch_user(account, true)?;
        for items in created {
            for key in &items.keys {
                let (item, sync_key) = self.sync_add_result(key, &items.collection_id, None, None)?;
                let store = self.adapter.sync(&SyncRequest::delete(
                    &items.collection_id,
                    &sync_key,
                    vec![item.server_id],
                ))?;
                self.site.assert_true(store.is_success(), "Sync Delete should succeed")?;
                debug!("Deleted {key} from collection {}", items.collection_id);
            }
        }
        Ok(())
    }
}

impl Suite for ContactsSuite<'_> {
    fn site_mut(&mut self) -> &mut Site {
        &mut self.site
    }

    fn cleanup(&mut self) -> Result<()> {
        if self.user1.has_created_items() || self.user2.has_created_items() {
            info!("{PROTOCOL}: removing items created by {:?}", self.site.test_case());
        }
        let user1 = self.delete_created_items(Account::User1);
        let user2 = self.delete_created_items(Account::User2);
        self.switch_user(Account::User1, false)?;
        user1.and(user2)
    }

    fn cases() -> Vec<Case<Self>> {
        vec![
            Case::new("S01_TC01_Sync_AddContact", Self::sync_add_contact),
            Case::new(
                "S01_TC02_Sync_GhostedElements_ExceptAssistantName",
                Self::ghosted_elements_except_assistant_name,
            ),
            Case::new("S01_TC03_Sync_GhostedElement_AssistantName", Self::ghosted_assistant_name),
            Case::new(
                "S01_TC04_Sync_RefreshRecipientInformationCache",
                Self::refresh_recipient_information_cache,
            ),
            Case::new("S01_TC05_Sync_Status6_PictureExceeds48KB", Self::picture_exceeds_48kb),
            Case::new("S01_TC06_Sync_AddContact_300CategoryElements", Self::add_contact_300_categories),
            Case::new("S01_TC07_Sync_AddContact_300ChildElements", Self::add_contact_300_children),
            Case::new("S01_TC08_Sync_TruncatedBody", Self::truncated_body),
            Case::new("S01_TC09_Sync_NonTruncatedBody", Self::non_truncated_body),
            Case::new("S02_TC01_ItemOperations_Fetch", Self::item_operations_fetch),
            Case::new("S03_TC01_Search_ByFileAs", Self::search_by_file_as),
        ]
    }
}

/// SyncKey for a new sync relationship, resynchronizing the folder
/// hierarchy while the server answers status 12
fn initial_sync_key(
    adapter: &dyn ActiveSyncAdapter,
    collection_id: &str,
    supported: Option<&[ContactField]>,
    max_attempts: u32,
) -> anyhow::Result<String> {
    let request = match supported {
        Some(fields) => SyncRequest::initial_with_supported(collection_id, fields.to_vec()),
        None => SyncRequest::initial(collection_id),
    };

    for _ in 0..max_attempts {
        let store = adapter.sync(&request)?;
        if store.is_hierarchy_changed() {
            debug!("Initial Sync of {collection_id} needs a FolderSync");
            let folders = adapter.folder_sync(&FolderSyncRequest::initial())?;
            if !folders.status.is_success() {
                bail!("FolderSync failed with status {}", folders.status);
            }
            continue;
        }
        if !store.is_success() {
            bail!("initial Sync of {collection_id} failed with status {:?}", store.status);
        }
        return store
            .sync_key
            .ok_or_else(|| anyhow!("initial Sync of {collection_id} returned no SyncKey"));
    }
    bail!("folder hierarchy of {collection_id} still changing after {max_attempts} FolderSync(s)")
}

fn date(year: i32, month: u32, day: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

/// Base64 of a JPEG-looking blob of `size` bytes
fn picture_of(size: usize) -> String {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.resize(size, 0x5A);
    STANDARD.encode(bytes)
}

fn body_text(contact: &Contact) -> String {
    contact
        .body
        .as_ref()
        .and_then(|b| b.data.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activesync::{
        FolderSyncResponse, ProvisionRequest, ProvisionResponse, SearchStore, SendMailResponse,
        Status,
    };
    use crate::error::ConformanceError;
    use crate::simulator::InMemoryExchange;
    use std::sync::Mutex;

    /// Answers status 12 a fixed number of times, then succeeds
    struct Flaky {
        hierarchy_changes: Mutex<u32>,
        folder_syncs: Mutex<u32>,
    }

    impl ActiveSyncAdapter for Flaky {
        fn switch_user(&self, _user: &UserInformation) -> anyhow::Result<()> {
            Ok(())
        }

        fn folder_sync(&self, _request: &FolderSyncRequest) -> anyhow::Result<FolderSyncResponse> {
            *self.folder_syncs.lock().unwrap() += 1;
            Ok(FolderSyncResponse {
                http_status: 200,
                status: Status::SUCCESS,
                sync_key: Some("1".into()),
                folders: Vec::new(),
            })
        }

        fn sync(&self, request: &SyncRequest) -> anyhow::Result<SyncStore> {
            let mut remaining = self.hierarchy_changes.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(SyncStore {
                    status: Some(Status::HIERARCHY_CHANGED),
                    ..SyncStore::default()
                });
            }
            Ok(SyncStore {
                status: Some(Status::SUCCESS),
                collection_id: request.collection_id.clone(),
                sync_key: Some("1".into()),
                ..SyncStore::default()
            })
        }

        fn item_operations(&self, _: &ItemOperationsRequest) -> anyhow::Result<ItemOperationsStore> {
            unimplemented!()
        }

        fn search(&self, _: &SearchRequest) -> anyhow::Result<SearchStore> {
            unimplemented!()
        }

        fn send_mail(&self, _: &SendMailRequest) -> anyhow::Result<SendMailResponse> {
            unimplemented!()
        }

        fn provision(&self, _: &ProvisionRequest) -> anyhow::Result<ProvisionResponse> {
            unimplemented!()
        }

        fn apply_policy_key(&self, _: &str) {}

        fn apply_device_type(&self, _: &str) {}
    }

    fn flaky(changes: u32) -> Flaky {
        Flaky {
            hierarchy_changes: Mutex::new(changes),
            folder_syncs: Mutex::new(0),
        }
    }

    #[test]
    fn test_initial_sync_key_resyncs_on_hierarchy_change() {
        let adapter = flaky(2);
        let key = initial_sync_key(&adapter, "6", None, 5).unwrap();
        assert_eq!(key, "1");
        assert_eq!(*adapter.folder_syncs.lock().unwrap(), 2);
    }

    #[test]
    fn test_initial_sync_key_gives_up() {
        let adapter = flaky(10);
        let err = initial_sync_key(&adapter, "6", None, 3).unwrap_err();
        assert!(err.to_string().contains("still changing"));
    }

    /// In-memory server that can answer ItemOperations with a non-success
    /// status and keep a stale hierarchy until the next FolderSync
    struct Unsettled {
        inner: InMemoryExchange,
        failing_fetches: Mutex<u32>,
        hierarchy_stale: Mutex<bool>,
        folder_syncs: Mutex<u32>,
    }

    impl Unsettled {
        fn new() -> Self {
            Self {
                inner: InMemoryExchange::new(),
                failing_fetches: Mutex::new(0),
                hierarchy_stale: Mutex::new(false),
                folder_syncs: Mutex::new(0),
            }
        }
    }

    impl ActiveSyncAdapter for Unsettled {
        fn switch_user(&self, user: &UserInformation) -> anyhow::Result<()> {
            self.inner.switch_user(user)
        }

        fn folder_sync(&self, request: &FolderSyncRequest) -> anyhow::Result<FolderSyncResponse> {
            *self.folder_syncs.lock().unwrap() += 1;
            *self.hierarchy_stale.lock().unwrap() = false;
            self.inner.folder_sync(request)
        }

        fn sync(&self, request: &SyncRequest) -> anyhow::Result<SyncStore> {
            if *self.hierarchy_stale.lock().unwrap() {
                return Ok(SyncStore {
                    status: Some(Status::HIERARCHY_CHANGED),
                    ..SyncStore::default()
                });
            }
            self.inner.sync(request)
        }

        fn item_operations(&self, request: &ItemOperationsRequest) -> anyhow::Result<ItemOperationsStore> {
            let mut failing = self.failing_fetches.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Ok(ItemOperationsStore {
                    status: Some(Status(110)),
                    items: Vec::new(),
                });
            }
            self.inner.item_operations(request)
        }

        fn search(&self, request: &SearchRequest) -> anyhow::Result<SearchStore> {
            self.inner.search(request)
        }

        fn send_mail(&self, request: &SendMailRequest) -> anyhow::Result<SendMailResponse> {
            self.inner.send_mail(request)
        }

        fn provision(&self, request: &ProvisionRequest) -> anyhow::Result<ProvisionResponse> {
            self.inner.provision(request)
        }

        fn apply_policy_key(&self, policy_key: &str) {
            self.inner.apply_policy_key(policy_key)
        }

        fn apply_device_type(&self, device_type: &str) {
            self.inner.apply_device_type(device_type)
        }
    }

    fn properties() -> TestProperties {
        TestProperties::from_pairs([
            ("ActiveSyncProtocolVersion", "14.1"),
            ("WaitTime", "0"),
            ("RetryCount", "5"),
            ("Domain", "contoso.com"),
            ("User1Name", "alice"),
            ("User1Password", "Password01!"),
            ("User2Name", "bob"),
            ("User2Password", "Password01!"),
        ])
    }

    /// Add one contact and wait for it; returns its FileAs, the added item
    /// and the SyncKey of the relationship it arrived on
    fn added_contact(
        suite: &mut ContactsSuite<'_>,
        collection_id: &str,
        supported: Option<Vec<ContactField>>,
    ) -> (String, SyncItem, String) {
        let contact = suite.sample_contact(None);
        let file_as = contact.file_as.clone().unwrap();
        suite.add_contact(collection_id, contact).unwrap();
        let (item, sync_key) = suite.sync_add_result(&file_as, collection_id, None, supported).unwrap();
        (file_as, item, sync_key)
    }

    #[test]
    fn test_item_operations_non_success_is_retried() {
        let adapter = Unsettled::new();
        let mut suite = ContactsSuite::setup(&adapter, properties()).unwrap();
        let collection_id = suite.contacts_collection().unwrap();
        let (_, added, _) = added_contact(&mut suite, &collection_id, None);

        *adapter.failing_fetches.lock().unwrap() = 1;
        let fetched = suite
            .item_operations_result(&collection_id, added.server_id.clone(), None, None)
            .unwrap();

        assert_eq!(fetched.server_id, added.server_id);
        assert!(fetched.contact.is_some());
        assert_eq!(*adapter.failing_fetches.lock().unwrap(), 0);
    }

    #[test]
    fn test_item_operations_non_success_until_budget_is_spent() {
        let adapter = Unsettled::new();
        let mut suite = ContactsSuite::setup(&adapter, properties()).unwrap();
        let collection_id = suite.contacts_collection().unwrap();
        let (_, added, _) = added_contact(&mut suite, &collection_id, None);

        *adapter.failing_fetches.lock().unwrap() = 10;
        let err = suite
            .item_operations_result(&collection_id, added.server_id.clone(), None, None)
            .unwrap_err();
        assert!(
            matches!(err, ConformanceError::RecordNotFound { attempts: 5, .. }),
            "{err}"
        );
    }

    #[test]
    fn test_sync_change_resyncs_after_hierarchy_change() {
        let adapter = Unsettled::new();
        let mut suite = ContactsSuite::setup(&adapter, properties()).unwrap();
        let collection_id = suite.contacts_collection().unwrap();
        let supported = [ContactField::AssistantName];
        let (file_as, added, sync_key) =
            added_contact(&mut suite, &collection_id, Some(supported.to_vec()));

        let change = Contact {
            assistant_name: Some("EditedAssistantName".to_string()),
            ..Contact::default()
        };
        let sync_key = suite
            .update_contact(&collection_id, &sync_key, added.server_id.clone(), change)
            .unwrap();

        *adapter.hierarchy_stale.lock().unwrap() = true;
        let folder_syncs = *adapter.folder_syncs.lock().unwrap();
        let changed = suite
            .sync_change_result(&file_as, &collection_id, &sync_key, None, Some(&supported[..]))
            .unwrap();

        assert_eq!(*adapter.folder_syncs.lock().unwrap(), folder_syncs + 1);
        let changed = changed.contact.unwrap();
        assert_eq!(changed.assistant_name.as_deref(), Some("EditedAssistantName"));
        assert_eq!(changed.file_as.as_deref(), Some(file_as.as_str()));
    }

    #[test]
    fn test_picture_sizes() {
        let small = STANDARD.decode(picture_of(SMALL_PICTURE_BYTES)).unwrap();
        assert_eq!(small.len(), SMALL_PICTURE_BYTES);
        assert_eq!(&small[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_requirement_tables_have_unique_ids() {
        for table in [ELEMENT_REQUIREMENTS, GHOSTED_REQUIREMENTS] {
            let mut ids: Vec<u32> = table.iter().map(|(_, id)| *id).collect();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), table.len());
        }
        assert!(!GHOSTED_REQUIREMENTS.iter().any(|(f, _)| *f == ContactField::AssistantName));
    }
}
