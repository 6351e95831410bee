//! In-memory SharePoint server
//!
//! A single store answers the Administration service, the Copy service and
//! the out-of-band control calls. Source and destination servers share the
//! store; [`CopysAdapter::switch_target`] is recorded but does not partition
//! it. URLs are compared case-insensitively.

use anyhow::{Result, anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use url::Url;

use crate::sharepoint::urls::{is_malformed_iri, parent, validate_file_url};
use crate::sharepoint::{
    AdminsAdapter, AdminsSutControl, CopyErrorCode, CopyIntoItemsResponse, CopyResult,
    CopysAdapter, CopysSutControl, CreateSiteRequest, FieldInformation, FieldType,
    GetItemResponse, ServiceLocation, SoapFault, limits,
};

/// Title given to a site created without one
pub const DEFAULT_TITLE: &str = "Team Site";

/// Fault detail for an LCID that is invalid or not installed
pub const LCID_ERROR_CODE: &str = "0x8102005e";

/// Fault detail for an OwnerLogin that is not a known account
pub const OWNER_LOGIN_ERROR_CODE: &str = "0x80131600";

const UPLOADED_TEXT: &str = "Text file uploaded for the copy service.";

struct SiteCollection {
    url: String,
    title: String,
    description: String,
    lcid: u32,
    /// Template configuration number, "-1" when no template was applied
    configuration: String,
    owner_login: String,
    owner_name: String,
    owner_email: String,
    portal_url: String,
    portal_name: String,
}

impl SiteCollection {
    fn property(&self, name: &str) -> Option<String> {
        let value = match name.to_ascii_lowercase().as_str() {
            "url" => &self.url,
            "title" => &self.title,
            "description" => &self.description,
            "lcid" => return Some(self.lcid.to_string()),
            "configuration" => &self.configuration,
            "ownerlogin" => &self.owner_login,
            "ownername" => &self.owner_name,
            "owneremail" => &self.owner_email,
            "portalurl" => &self.portal_url,
            "portalname" => &self.portal_name,
            _ => return None,
        };
        Some(value.clone())
    }
}

struct StoredFile {
    content: Vec<u8>,
    fields: Vec<FieldInformation>,
    checked_out_by: Option<String>,
}

#[derive(Default)]
struct SharePointState {
    sites: HashMap<String, SiteCollection>,
    files: HashMap<String, StoredFile>,
    /// Document library folders files can be created in
    folders: HashSet<String>,
    target: Option<ServiceLocation>,
}

/// SharePoint server kept entirely in memory
pub struct InMemorySharePoint {
    server_name: String,
    ports: Vec<u16>,
    languages: Vec<u32>,
    templates: Vec<String>,
    owner_logins: Vec<String>,
    meeting_workspaces: Vec<String>,
    state: RwLock<SharePointState>,
}

fn key(url: &str) -> String {
    url.trim_end_matches('/').to_lowercase()
}

fn truncated(value: Option<&str>, max_chars: usize) -> String {
    value.unwrap_or_default().chars().take(max_chars).collect()
}

fn default_fields(file_name: &str) -> Vec<FieldInformation> {
    vec![
        FieldInformation::new(FieldType::Text, "Title", Some(file_name)),
        FieldInformation::new(FieldType::File, "FileLeafRef", Some(file_name)),
        FieldInformation::new(
            FieldType::DateTime,
            "Created",
            Some(&Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        ),
        FieldInformation::new(FieldType::Computed, "ContentTypeId", Some("0x0101")),
    ]
}

impl InMemorySharePoint {
    /// Server answering for `server_name` on the default http/https ports,
    /// with LCID 1033 and the "STS#0" template installed
    pub fn new(server_name: &str) -> Self {
        Self {
            server_name: server_name.to_lowercase(),
            ports: vec![80, 443],
            languages: vec![1033],
            templates: vec!["STS#0".to_string()],
            owner_logins: Vec::new(),
            meeting_workspaces: Vec::new(),
            state: RwLock::new(SharePointState::default()),
        }
    }

    /// Also accept site URLs on `port`
    pub fn with_port(mut self, port: u16) -> Self {
        self.ports.push(port);
        self
    }

    pub fn with_language(mut self, lcid: u32) -> Self {
        if !self.languages.contains(&lcid) {
            self.languages.push(lcid);
        }
        self
    }

    pub fn with_template(mut self, template: &str) -> Self {
        self.templates.push(template.to_string());
        self
    }

    /// Register a domain account that may own site collections
    pub fn with_owner_login(mut self, login: &str) -> Self {
        self.owner_logins.push(login.to_lowercase());
        self
    }

    /// Register a document library folder
    pub fn with_folder(self, folder_url: &str) -> Self {
        self.state().folders.insert(key(folder_url));
        self
    }

    /// Register a folder inside a Meeting Workspace site
    pub fn with_meeting_workspace_folder(mut self, folder_url: &str) -> Self {
        self.meeting_workspaces.push(key(folder_url));
        self.with_folder(folder_url)
    }

    /// Store a text file and register its folder
    pub fn with_file(self, file_url: &str, contents: &str) -> Result<Self> {
        let file_name = validate_file_url(file_url)?;
        {
            let mut state = self.state();
            state.folders.insert(key(parent(file_url)));
            state.files.insert(
                key(file_url),
                StoredFile {
                    content: contents.as_bytes().to_vec(),
                    fields: default_fields(&file_name),
                    checked_out_by: None,
                },
            );
        }
        Ok(self)
    }

    pub fn site_exists(&self, url: &str) -> bool {
        self.state_read().sites.contains_key(&key(url))
    }

    pub fn site_count(&self) -> usize {
        self.state_read().sites.len()
    }

    pub fn file_exists(&self, url: &str) -> bool {
        self.state_read().files.contains_key(&key(url))
    }

    /// Contents of the file at `url` as UTF-8 text
    pub fn file_text(&self, url: &str) -> Option<String> {
        self.state_read()
            .files
            .get(&key(url))
            .and_then(|f| String::from_utf8(f.content.clone()).ok())
    }

    /// Server the copy service was last pointed at
    pub fn target(&self) -> Option<ServiceLocation> {
        self.state_read().target
    }

    fn state(&self) -> RwLockWriteGuard<'_, SharePointState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_read(&self) -> RwLockReadGuard<'_, SharePointState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parse a site collection URL of the form
    /// `http://ServerName[:PortNumber]/sites/SiteCollectionName`
    fn parse_site_url(&self, url: Option<&str>) -> std::result::Result<Url, SoapFault> {
        let url = url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| SoapFault::new("Url is missing or empty"))?;
        let parsed =
            Url::parse(url).map_err(|e| SoapFault::new(format!("Url '{url}' is not valid: {e}")))?;

        let site_name = parsed
            .path()
            .strip_prefix("/sites/")
            .map(|name| name.trim_end_matches('/'))
            .unwrap_or_default();
        if site_name.is_empty() || site_name.contains('/') {
            return Err(SoapFault::new(format!(
                "Url '{url}' is not of the form http://ServerName/sites/SiteCollectionName"
            )));
        }
        if parsed.host_str() != Some(self.server_name.as_str()) {
            return Err(SoapFault::new(format!("Server name of '{url}' is not valid")));
        }
        match parsed.port_or_known_default() {
            Some(port) if self.ports.contains(&port) => {}
            _ => return Err(SoapFault::new(format!("Port number of '{url}' is not valid"))),
        }
        if parsed.path().chars().count() > limits::URL_PATH {
            return Err(SoapFault::new(format!(
                "Url '{url}' exceeds {} characters",
                limits::URL_PATH
            )));
        }
        Ok(parsed)
    }

    fn resolve_lcid(&self, lcid: Option<u32>) -> std::result::Result<u32, SoapFault> {
        match lcid {
            None => Ok(self.languages.first().copied().unwrap_or(1033)),
            Some(lcid) if lcid >= 100 && self.languages.contains(&lcid) => Ok(lcid),
            Some(lcid) => Err(SoapFault::new(format!("LCID {lcid} is invalid or not installed"))
                .with_error_code(LCID_ERROR_CODE)),
        }
    }

    fn resolve_configuration(&self, template: Option<&str>) -> std::result::Result<String, SoapFault> {
        match template.filter(|t| !t.is_empty()) {
            None => Ok("-1".to_string()),
            Some(template) if self.templates.iter().any(|t| t.eq_ignore_ascii_case(template)) => {
                Ok(template
                    .split_once('#')
                    .map_or("0", |(_, configuration)| configuration)
                    .to_string())
            }
            Some(template) => Err(SoapFault::new(format!("Template '{template}' is not available"))),
        }
    }

    fn check_owner_login(&self, login: Option<&str>) -> std::result::Result<String, SoapFault> {
        let login = login
            .filter(|l| !l.is_empty())
            .ok_or_else(|| SoapFault::new("OwnerLogin is missing or empty"))?;
        if !self.owner_logins.contains(&login.to_lowercase()) {
            return Err(SoapFault::new(format!("OwnerLogin '{login}' is not a domain account"))
                .with_error_code(OWNER_LOGIN_ERROR_CODE));
        }
        Ok(login.to_string())
    }

    fn create(&self, request: &CreateSiteRequest) -> std::result::Result<String, SoapFault> {
        self.parse_site_url(request.url.as_deref())?;
        let url = request.url.clone().unwrap_or_default();
        if self.site_exists(&url) {
            return Err(SoapFault::new(format!("Site collection '{url}' already exists")));
        }
        let lcid = self.resolve_lcid(request.lcid)?;
        let configuration = self.resolve_configuration(request.web_template.as_deref())?;
        let owner_login = self.check_owner_login(request.owner_login.as_deref())?;

        let site = SiteCollection {
            url: url.clone(),
            title: match &request.title {
                Some(title) => truncated(Some(title), limits::TITLE),
                None => DEFAULT_TITLE.to_string(),
            },
            description: truncated(request.description.as_deref(), limits::DESCRIPTION),
            lcid,
            configuration,
            owner_login,
            owner_name: truncated(request.owner_name.as_deref(), limits::OWNER_NAME),
            owner_email: truncated(request.owner_email.as_deref(), limits::OWNER_EMAIL),
            portal_url: truncated(request.portal_url.as_deref(), limits::PORTAL_URL),
            portal_name: truncated(request.portal_name.as_deref(), limits::PORTAL_NAME),
        };
        info!("Created site collection {url}");
        self.state().sites.insert(key(&url), site);
        Ok(url)
    }

    /// Reason `destination` cannot receive a copy, if any
    fn destination_error(
        &self,
        state: &SharePointState,
        destination: &str,
    ) -> Option<(CopyErrorCode, String)> {
        if is_malformed_iri(destination) {
            return Some((
                CopyErrorCode::InvalidUrl,
                format!("Destination '{destination}' is not a valid IRI"),
            ));
        }
        let destination_key = key(destination);
        if self
            .meeting_workspaces
            .iter()
            .any(|folder| destination_key.starts_with(folder.as_str()))
        {
            return Some((
                CopyErrorCode::DestinationMWS,
                format!("Destination '{destination}' is inside a Meeting Workspace site"),
            ));
        }
        if let Some(user) = state
            .files
            .get(&destination_key)
            .and_then(|f| f.checked_out_by.as_ref())
        {
            return Some((
                CopyErrorCode::DestinationCheckedOut,
                format!("Destination '{destination}' is checked out by {user}"),
            ));
        }
        if !state.folders.contains(&key(parent(destination))) {
            return Some((
                CopyErrorCode::DestinationInvalid,
                format!("Folder of destination '{destination}' does not exist"),
            ));
        }
        None
    }

    /// Write `content` to every destination, one result per destination
    fn copy_to(
        &self,
        destinations: &[String],
        content: &[u8],
        fields: &[FieldInformation],
    ) -> CopyIntoItemsResponse {
        let mut state = self.state();
        let results = destinations
            .iter()
            .map(|destination| {
                if let Some((code, message)) = self.destination_error(&state, destination) {
                    debug!("Copy to {destination} failed with {code:?}");
                    return CopyResult::failure(destination, code, &message);
                }
                state.files.insert(
                    key(destination),
                    StoredFile {
                        content: content.to_vec(),
                        fields: fields.to_vec(),
                        checked_out_by: None,
                    },
                );
                CopyResult::success(destination)
            })
            .collect();
        CopyIntoItemsResponse { results }
    }
}

impl AdminsAdapter for InMemorySharePoint {
    fn get_languages(&self) -> Result<Vec<u32>> {
        Ok(self.languages.clone())
    }

    fn create_site(&self, request: &CreateSiteRequest) -> Result<String> {
        self.create(request).map_err(|fault| {
            debug!("CreateSite faulted: {}", fault.message);
            fault.into()
        })
    }

    fn delete_site(&self, url: Option<&str>) -> Result<()> {
        let url = url.ok_or_else(|| SoapFault::new("Url is missing"))?;
        Url::parse(url).map_err(|e| SoapFault::new(format!("Url '{url}' is not valid: {e}")))?;
        match self.state().sites.remove(&key(url)) {
            Some(_) => {
                info!("Deleted site collection {url}");
                Ok(())
            }
            None => Err(SoapFault::new(format!("Site collection '{url}' does not exist")).into()),
        }
    }
}

impl AdminsSutControl for InMemorySharePoint {
    fn get_site_property(&self, url: &str, property: &str) -> Result<String> {
        let state = self.state_read();
        let site = state
            .sites
            .get(&key(url))
            .ok_or_else(|| anyhow!("site collection {url} does not exist"))?;
        site.property(property)
            .ok_or_else(|| anyhow!("unknown site property '{property}'"))
    }
}

impl CopysAdapter for InMemorySharePoint {
    fn switch_target(&self, location: ServiceLocation) -> Result<()> {
        debug!("Copy service target is now {location:?}");
        self.state().target = Some(location);
        Ok(())
    }

    fn get_item(&self, url: &str) -> Result<GetItemResponse> {
        Url::parse(url).map_err(|e| SoapFault::new(format!("Url '{url}' is not valid: {e}")))?;
        let state = self.state_read();
        Ok(match state.files.get(&key(url)) {
            Some(file) => GetItemResponse {
                fields: Some(file.fields.clone()),
                stream: Some(STANDARD.encode(&file.content)),
            },
            None => GetItemResponse::default(),
        })
    }

    fn copy_into_items(
        &self,
        source_url: &str,
        destination_urls: &[String],
        fields: &[FieldInformation],
        stream: &str,
    ) -> Result<CopyIntoItemsResponse> {
        let content = STANDARD
            .decode(stream)
            .map_err(|e| SoapFault::new(format!("Stream is not valid base64: {e}")))?;
        debug!(
            "Copying {source_url} into {} destination(s)",
            destination_urls.len()
        );
        Ok(self.copy_to(destination_urls, &content, fields))
    }

    fn copy_into_items_local(
        &self,
        source_url: &str,
        destination_urls: &[String],
    ) -> Result<CopyIntoItemsResponse> {
        let source = {
            let state = self.state_read();
            state
                .files
                .get(&key(source_url))
                .map(|file| (file.content.clone(), file.fields.clone()))
        };

        match source {
            Some((content, fields)) => Ok(self.copy_to(destination_urls, &content, &fields)),
            None => {
                let state = self.state_read();
                let results = destination_urls
                    .iter()
                    .map(|destination| {
                        if state.files.contains_key(&key(destination)) {
                            CopyResult::failure(
                                destination,
                                CopyErrorCode::SourceInvalid,
                                &format!("Source '{source_url}' does not exist"),
                            )
                        } else {
                            CopyResult::failure(
                                destination,
                                CopyErrorCode::Unknown,
                                &format!("Source '{source_url}' and destination do not exist"),
                            )
                        }
                    })
                    .collect();
                Ok(CopyIntoItemsResponse { results })
            }
        }
    }
}

impl CopysSutControl for InMemorySharePoint {
    fn upload_text_file(&self, url: &str) -> Result<bool> {
        let file_name = validate_file_url(url)?;
        let mut state = self.state();
        if !state.folders.contains(&key(parent(url))) {
            return Ok(false);
        }
        state.files.insert(
            key(url),
            StoredFile {
                content: UPLOADED_TEXT.as_bytes().to_vec(),
                fields: default_fields(&file_name),
                checked_out_by: None,
            },
        );
        Ok(true)
    }

    /// Missing files are skipped; a checked-out file cannot be deleted
    fn delete_files(&self, urls: &[String]) -> Result<bool> {
        let mut state = self.state();
        let mut all_deleted = true;
        for url in urls {
            let url_key = key(url);
            match state.files.get(&url_key) {
                Some(file) if file.checked_out_by.is_some() => {
                    debug!("Cannot delete checked out file {url}");
                    all_deleted = false;
                }
                Some(_) => {
                    state.files.remove(&url_key);
                }
                None => {}
            }
        }
        Ok(all_deleted)
    }

    fn check_out_file(&self, url: &str, user: &str, _password: &str, domain: &str) -> Result<bool> {
        let mut state = self.state();
        let Some(file) = state.files.get_mut(&key(url)) else {
            return Ok(false);
        };
        if file.checked_out_by.is_some() {
            return Ok(false);
        }
        file.checked_out_by = Some(format!("{domain}\\{user}").to_lowercase());
        Ok(true)
    }

    fn undo_check_out_file(&self, url: &str, user: &str, _password: &str, domain: &str) -> Result<bool> {
        let account = format!("{domain}\\{user}").to_lowercase();
        let mut state = self.state();
        match state.files.get_mut(&key(url)) {
            Some(file) if file.checked_out_by.as_ref() == Some(&account) => {
                file.checked_out_by = None;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => bail!("file {url} does not exist"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sharepoint::{encode_stream, soap_fault};

    const LIBRARY: &str = "http://sut01/sites/copy/deslib";
    const SOURCE: &str = "http://sut01/sites/copy/sourcelib/source.txt";

    fn sharepoint() -> InMemorySharePoint {
        InMemorySharePoint::new("sut01")
            .with_port(8080)
            .with_owner_login("contoso\\admin")
            .with_folder(LIBRARY)
            .with_meeting_workspace_folder("http://sut01/sites/mws/deslib")
            .with_file(SOURCE, "source contents")
            .unwrap()
    }

    fn request(url: &str) -> CreateSiteRequest {
        CreateSiteRequest {
            url: Some(url.to_string()),
            title: Some("Title".to_string()),
            lcid: Some(1033),
            web_template: Some("STS#0".to_string()),
            owner_login: Some("CONTOSO\\admin".to_string()),
            ..CreateSiteRequest::default()
        }
    }

    fn fault_of(result: Result<String>) -> SoapFault {
        let err = result.unwrap_err();
        soap_fault(&err).cloned().unwrap()
    }

    #[test]
    fn test_create_and_delete_site() {
        let sp = sharepoint();
        let url = sp.create_site(&request("http://sut01:8080/sites/one")).unwrap();
        assert_eq!(url, "http://sut01:8080/sites/one");
        assert_eq!(sp.get_site_property(&url, "Configuration").unwrap(), "0");

        sp.delete_site(Some(&url)).unwrap();
        assert!(!sp.site_exists(&url));
        let err = sp.delete_site(Some(&url)).unwrap_err();
        assert!(soap_fault(&err).is_some());
    }

    #[test]
    fn test_create_site_url_faults() {
        let sp = sharepoint();
        let long_path = format!("http://sut01/sites/{}", "a".repeat(limits::URL_PATH));
        for url in [
            long_path.as_str(),
            "http://other/sites/x",
            "http://sut01:1/sites/x",
            "http://sites/x",
            "",
        ] {
            fault_of(sp.create_site(&request(url)));
        }
        fault_of(sp.create_site(&CreateSiteRequest {
            url: None,
            ..request("")
        }));
        assert_eq!(sp.site_count(), 0);
    }

    #[test]
    fn test_create_site_parameter_faults() {
        let sp = sharepoint();
        let lcid = fault_of(sp.create_site(&CreateSiteRequest {
            lcid: Some(2052),
            ..request("http://sut01/sites/lcid")
        }));
        assert_eq!(lcid.error_code.as_deref(), Some(LCID_ERROR_CODE));

        let owner = fault_of(sp.create_site(&CreateSiteRequest {
            owner_login: Some("contoso\\nobody".into()),
            ..request("http://sut01/sites/owner")
        }));
        assert_eq!(owner.error_code.as_deref(), Some(OWNER_LOGIN_ERROR_CODE));

        fault_of(sp.create_site(&CreateSiteRequest {
            web_template: Some("XYZ#9".into()),
            ..request("http://sut01/sites/template")
        }));
    }

    #[test]
    fn test_defaults_and_truncation() {
        let sp = sharepoint();
        let url = sp
            .create_site(&CreateSiteRequest {
                title: None,
                web_template: None,
                owner_name: Some("n".repeat(300)),
                ..request("http://sut01/sites/defaults")
            })
            .unwrap();

        assert_eq!(sp.get_site_property(&url, "Title").unwrap(), DEFAULT_TITLE);
        assert_eq!(sp.get_site_property(&url, "Configuration").unwrap(), "-1");
        assert_eq!(sp.get_site_property(&url, "PortalUrl").unwrap(), "");
        assert_eq!(sp.get_site_property(&url, "OwnerName").unwrap().len(), limits::OWNER_NAME);
        assert!(sp.get_site_property(&url, "Colour").is_err());
    }

    #[test]
    fn test_get_item() {
        let sp = sharepoint();
        let item = sp.get_item(SOURCE).unwrap();
        assert_eq!(item.stream_text().unwrap().as_deref(), Some("source contents"));
        assert!(item.field("FileLeafRef").is_some());

        let missing = sp.get_item("http://sut01/sites/copy/sourcelib/none.txt").unwrap();
        assert_eq!(missing, GetItemResponse::default());

        let err = sp.get_item("MSCOPYS_S01_TC02_URL1").unwrap_err();
        assert!(soap_fault(&err).is_some());
    }

    #[test]
    fn test_copy_into_items_error_codes() {
        let sp = sharepoint();
        let checked_out = format!("{LIBRARY}/checked.txt");
        assert!(sp.upload_text_file(&checked_out).unwrap());
        assert!(sp.check_out_file(&checked_out, "user", "pw", "contoso").unwrap());

        let destinations = vec![
            format!("{LIBRARY}/ok.txt"),
            "http://sut01/sites/mws/deslib/x.txt".to_string(),
            checked_out.clone(),
            format!("{LIBRARY}/Invalid%File&Name.txt"),
            format!("{LIBRARY}missing/x.txt"),
        ];
        let response = sp
            .copy_into_items(SOURCE, &destinations, &[], &encode_stream("copied"))
            .unwrap();
        let codes: Vec<_> = response.results.iter().map(|r| r.error_code).collect();
        assert_eq!(
            codes,
            vec![
                CopyErrorCode::Success,
                CopyErrorCode::DestinationMWS,
                CopyErrorCode::DestinationCheckedOut,
                CopyErrorCode::InvalidUrl,
                CopyErrorCode::DestinationInvalid,
            ]
        );
        assert!(response.results[0].error_message.is_none());
        assert!(response.results[1..].iter().all(|r| r.error_message.is_some()));
        assert_eq!(sp.file_text(&destinations[0]).as_deref(), Some("copied"));

        assert!(!sp.delete_files(&destinations).unwrap());
        assert!(sp.undo_check_out_file(&checked_out, "user", "pw", "contoso").unwrap());
        assert!(sp.delete_files(&destinations).unwrap());
        assert!(!sp.file_exists(&destinations[0]));
    }

    #[test]
    fn test_copy_local_missing_source() {
        let sp = sharepoint();
        let missing = "http://sut01/sites/copy/sourcelib/gone.txt";
        let response = sp
            .copy_into_items_local(missing, &[format!("{LIBRARY}/new.txt"), SOURCE.to_string()])
            .unwrap();
        assert_eq!(response.results[0].error_code, CopyErrorCode::Unknown);
        assert_eq!(response.results[1].error_code, CopyErrorCode::SourceInvalid);
    }

    #[test]
    fn test_copy_local_keeps_order() {
        let sp = sharepoint();
        let destinations = vec![format!("{LIBRARY}/b.txt"), format!("{LIBRARY}/a.txt")];
        let response = sp.copy_into_items_local(SOURCE, &destinations).unwrap();
        assert!(response.all_succeeded());
        assert_eq!(response.results[0].destination_url, destinations[0]);
        assert_eq!(response.results[1].destination_url, destinations[1]);
        assert_eq!(sp.file_text(&destinations[1]).as_deref(), Some("source contents"));
    }
}
