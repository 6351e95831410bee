//! MS-ADMINS: site collection administration

use log::{info, warn};
use url::Url;
use uuid::Uuid;

use super::{Case, Suite};
use crate::capture::Site;
use crate::context::CreatedUrls;
use crate::error::Result;
use crate::properties::TestProperties;
use crate::sharepoint::urls::url_path;
use crate::sharepoint::{AdminsAdapter, AdminsSutControl, CreateSiteRequest, SoapFault, limits, soap_fault};

pub const PROTOCOL: &str = "MS-ADMINS";

const LCID_ERROR_CODE: &str = "0x8102005e";
const OWNER_LOGIN_ERROR_CODE: &str = "0x80131600";

/// Random lowercase hex text of `len` characters
pub fn random_string(len: usize) -> String {
    let mut text = String::with_capacity(len + 32);
    while text.len() < len {
        text.push_str(&Uuid::new_v4().simple().to_string());
    }
    text.truncate(len);
    text
}

/// E-mail address of exactly `len` characters
fn random_email(len: usize) -> String {
    const DOMAIN: &str = "@contoso.com";
    format!("{}{DOMAIN}", random_string(len.saturating_sub(DOMAIN.len()).max(1)))
}

/// Portal URL of exactly `len` characters
fn random_portal_url(len: usize) -> String {
    const SCHEME: &str = "http://";
    format!("{SCHEME}{}", random_string(len.saturating_sub(SCHEME.len()).max(1)))
}

fn is_absolute_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| u.has_host())
}

/// Either the created site's URL or the SOAP fault the server answered with
enum CreateOutcome {
    Created,
    Fault(SoapFault),
}

impl CreateOutcome {
    fn fault(&self) -> Option<&SoapFault> {
        match self {
            Self::Created => None,
            Self::Fault(fault) => Some(fault),
        }
    }

    fn error_code(&self) -> Option<&str> {
        self.fault().and_then(|f| f.error_code.as_deref())
    }
}

pub struct AdminsSuite<'a> {
    adapter: &'a dyn AdminsAdapter,
    sut: &'a dyn AdminsSutControl,
    site: Site,
    transport: String,
    server: String,
    url_without_port: String,
    admin_port: u16,
    invalid_port: String,
    template: String,
    owner_login: String,
    not_installed_lcid: u32,
    created: CreatedUrls,
}

impl<'a> AdminsSuite<'a> {
    pub fn setup(
        adapter: &'a dyn AdminsAdapter,
        sut: &'a dyn AdminsSutControl,
        properties: TestProperties,
    ) -> Result<Self> {
        Ok(Self {
            adapter,
            sut,
            site: Site::new(PROTOCOL),
            transport: properties.get("TransportType")?.to_lowercase(),
            server: properties.get("SutComputerName")?,
            url_without_port: properties.get("UrlWithOutPort")?,
            admin_port: properties.get_parsed("AdminPortNumber")?,
            invalid_port: properties.get("InvalidPortNumber")?,
            template: properties.get("CustomizedTemplate")?,
            owner_login: properties.get("OwnerLogin")?,
            not_installed_lcid: properties.get_parsed("NotInstalledLCID")?,
            created: CreatedUrls::new(),
        })
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn teardown(mut self) -> Result<Site> {
        self.cleanup()?;
        Ok(self.site)
    }

    pub fn create_and_delete_with_port_number(&mut self) -> Result<()> {
        let url = self.url_with_port(self.default_port());
        let request = self.full_request(url)?;
        let result = self.create(&request)?;

        let absolute = is_absolute_url(&result);
        self.site.capture_if_true(
            absolute,
            13,
            "[In CreateSiteSoapIn][The request message is governed by the following rules:]The absolute URL of the site collection to be created MUST be included in the request message.",
        )?;
        self.site.capture_if_true(
            absolute,
            3043,
            "[In CreateSite]If the Url contains the port number, the Url format is http://ServerName:PortNumber/sites/SiteCollectionName.",
        )?;
        self.site.capture_if_false(
            result.is_empty(),
            1077001,
            "[In CreateSiteResponse]It[CreateSiteResult] MUST be returned if the CreateSite operation succeeds.",
        )?;
        self.site.capture(
            2042001,
            "[In CreateSite]PortNumber in the [Url's] first format [http://ServerName:PortNumber/sites/SiteCollectionName] MUST be the port number used by the web application on the protocol server.",
        );

        self.delete(&result)?;
        self.site.capture(
            83,
            "[In DeleteSite]The [DeleteSiteSoapIn] request message MUST contain the absolute URL of the site collection to be deleted.",
        );
        self.site.capture(
            120,
            "[In DeleteSiteSoapIn][The request message is governed by the following rules:]The absolute URL of the site collection to be deleted MUST be included in the request message.",
        );
        Ok(())
    }

    pub fn create_and_delete_with_admin_port_number(&mut self) -> Result<()> {
        let url = self.url_with_port(self.admin_port);
        let request = self.full_request(url)?;
        let result = self.create(&request)?;

        let absolute = is_absolute_url(&result);
        self.site.capture_if_true(
            absolute,
            13,
            "[In CreateSiteSoapIn][The request message is governed by the following rules:]The absolute URL of the site collection to be created MUST be included in the request message.",
        )?;
        self.site.capture_if_true(
            absolute,
            22,
            "[In CreateSiteSoapIn]The valid OwnerLogin MUST be included in the request message.",
        )?;
        self.site.capture_if_true(
            absolute,
            3043,
            "[In CreateSite]If the Url contains the port number, the Url format is http://ServerName:PortNumber/sites/SiteCollectionName.",
        )?;
        self.site.capture(
            2042002,
            "[In CreateSite]PortNumber in the [Url's] first format [http://ServerName:PortNumber/sites/SiteCollectionName] MUST be the port number used by the Administration Web Service on the protocol server.",
        );
        self.delete(&result)
    }

    pub fn create_and_delete_without_port_number(&mut self) -> Result<()> {
        let url = self.url_without_port();
        let request = self.full_request(url)?;
        let result = self.create(&request)?;
        self.site.assert_true(is_absolute_url(&result), "CreateSite should return an absolute URL")?;

        self.site.capture(
            13,
            "[In CreateSiteSoapIn][The request message is governed by the following rules:]The absolute URL of the site collection to be created MUST be included in the request message.",
        );
        self.site.capture(
            3044,
            "[In CreateSite]If the Url does not contain the port number, the Url format is http://ServerName/sites/SiteCollectionName.",
        );
        self.delete(&result)
    }

    pub fn title_absent(&mut self) -> Result<()> {
        let url = self.url_without_port();
        let mut request = self.full_request(url)?;
        request.title = None;
        let result = self.create(&request)?;

        let title = self.sut.get_site_property(&result, "Title")?;
        self.site.capture_if_eq(
            "Team Site",
            title.as_str(),
            3017,
            "[In CreateSite]If [the Title] nothing is specified, the [created]site will have a default title of \"Team Site\".",
        )?;
        self.delete(&result)
    }

    pub fn description_absent(&mut self) -> Result<()> {
        let url = self.url_without_port();
        let mut request = self.full_request(url)?;
        request.description = None;
        let result = self.create(&request)?;

        let description = self.sut.get_site_property(&result, "Description")?;
        self.site.capture_if_eq(
            "",
            description.as_str(),
            2046,
            "[In CreateSite]If [the Description] nothing is specified, the [created] site will not have a description.",
        )?;
        self.delete(&result)
    }

    pub fn portal_url_absent(&mut self) -> Result<()> {
        let url = self.url_without_port();
        let mut request = self.full_request(url)?;
        request.portal_url = None;
        let result = self.create(&request)?;

        let portal_url = self.sut.get_site_property(&result, "PortalUrl")?;
        self.site.capture_if_eq(
            "",
            portal_url.as_str(),
            2057,
            "[In CreateSite]If [the PortalUrl] nothing is specified, no portal URL will be set in the database.",
        )?;
        self.delete(&result)
    }

    pub fn owner_name_exceeds_max_length(&mut self) -> Result<()> {
        let value = random_string(limits::OWNER_NAME + 1);
        self.check_truncated(
            |request, value| request.owner_name = Some(value),
            value,
            "OwnerName",
            limits::OWNER_NAME,
            3024,
            "[In CreateSite]If the length of the OwnerName exceeds 255 characters, the CreateSite operation will succeed without exception, the exceeds characters are truncated.",
        )
    }

    pub fn owner_email_exceeds_max_length(&mut self) -> Result<()> {
        let value = random_email(limits::OWNER_EMAIL + 1);
        self.check_truncated(
            |request, value| request.owner_email = Some(value),
            value,
            "OwnerEmail",
            limits::OWNER_EMAIL,
            3026,
            "[In CreateSite]If the length of the OwnerEmail exceeds 255 characters, the CreateSite operation will succeed without exception, the exceeded characters are truncated.",
        )
    }

    pub fn portal_url_exceeds_max_length(&mut self) -> Result<()> {
        let value = random_portal_url(limits::PORTAL_URL + 1);
        self.check_truncated(
            |request, value| request.portal_url = Some(value),
            value,
            "PortalUrl",
            limits::PORTAL_URL,
            3028,
            "[In CreateSite]If the length of the PortalUrl exceeds 260 characters, the CreateSite operation will succeed without exception, the exceeds characters are truncated.",
        )
    }

    pub fn portal_name_exceeds_max_length(&mut self) -> Result<()> {
        let value = random_string(limits::PORTAL_NAME + 1);
        self.check_truncated(
            |request, value| request.portal_name = Some(value),
            value,
            "PortalName",
            limits::PORTAL_NAME,
            3030,
            "[In CreateSite]If the length of the PortalName exceeds 255 characters, the CreateSite operation will succeed without exception, the exceeds characters are truncated.",
        )
    }

    pub fn title_exceeds_max_length(&mut self) -> Result<()> {
        let value = random_string(limits::TITLE + 1);
        self.check_truncated(
            |request, value| request.title = Some(value),
            value,
            "Title",
            limits::TITLE,
            3034,
            "[In CreateSite]If the length of the Title exceeds 255 characters, the CreateSite operation will succeed without exception, the exceeded characters are truncated.",
        )
    }

    /// Url path of exactly 128 characters
    pub fn url_equals_max_length(&mut self) -> Result<()> {
        let url = self.url_with_path_length(limits::URL_PATH)?;
        let request = self.full_request(url.clone())?;
        let result = self.create(&request)?;
        self.site.assert_true(is_absolute_url(&result), "CreateSite should return an absolute URL")?;

        let stored = self.sut.get_site_property(&result, "Url")?;
        self.site.capture_if_eq(
            url.to_lowercase(),
            stored.to_lowercase(),
            28,
            "[In CreateSite]Its[Url's] maximum length, not including http://ServerName or http://ServerName:PortNumber, is 128 characters.",
        )?;
        self.delete(&result)
    }

    pub fn lcid_absent(&mut self) -> Result<()> {
        let languages = self.languages()?;
        let url = self.url_without_port();
        let mut request = self.full_request(url)?;
        request.lcid = None;
        let result = self.create(&request)?;

        let lcid = self.sut.get_site_property(&result, "Lcid")?;
        let installed = lcid.parse::<u32>().is_ok_and(|lcid| languages.contains(&lcid));
        self.site.capture_if_true(
            installed,
            3041,
            "[In CreateSite]Implementation does assign a default LCID based on the default server install language when it is missing.",
        )?;
        self.delete(&result)
    }

    pub fn with_required_parameters(&mut self) -> Result<()> {
        let request = CreateSiteRequest {
            url: Some(self.url_with_port(self.default_port())),
            owner_login: Some(self.owner_login.clone()),
            ..CreateSiteRequest::default()
        };
        let result = self.create(&request)?;
        self.site.assert_true(is_absolute_url(&result), "CreateSite should return an absolute URL")?;
        self.delete(&result)
    }

    pub fn without_template(&mut self) -> Result<()> {
        let url = self.url_with_port(self.default_port());
        let mut request = self.full_request(url)?;
        request.web_template = None;
        let result = self.create(&request)?;

        let configuration = self.sut.get_site_property(&result, "Configuration")?;
        self.site.capture_if_eq(
            "-1",
            configuration.as_str(),
            2048,
            "[In CreateSite]If no template[WebTemplate] is specified, then no template will be applied to the site at creation time.",
        )?;
        self.delete(&result)
    }

    pub fn url_exceeds_max_length(&mut self) -> Result<()> {
        let url = self.url_with_path_length(limits::URL_PATH + 1)?;
        let request = self.full_request(url)?;
        let outcome = self.try_create(&request)?;
        self.site.capture_if_some(
            &outcome.fault(),
            1028,
            "[In CreateSiteSoapIn]If Url's length not including \"http://ServerName\" exceeds 128 characters, the server MUST return a SOAP fault.",
        )
    }

    pub fn url_server_name_invalid(&mut self) -> Result<()> {
        let url = format!(
            "{}://{}/sites/{}",
            self.transport,
            random_string(5),
            self.site.resource_name("Site")
        );
        let request = self.full_request(url)?;
        let outcome = self.try_create(&request)?;
        self.site.capture_if_some(
            &outcome.fault(),
            1024,
            "[In CreateSiteSoapIn]If ServerName in the URL is invalid, the server MUST return a SOAP fault.",
        )
    }

    pub fn url_port_number_invalid(&mut self) -> Result<()> {
        let url = format!(
            "{}://{}:{}/sites/{}",
            self.transport,
            self.server,
            self.invalid_port,
            self.site.resource_name("Site")
        );
        let request = self.full_request(url)?;
        let outcome = self.try_create(&request)?;
        self.site.capture_if_some(
            &outcome.fault(),
            1025,
            "[In CreateSiteSoapIn]If the PortNumber in the URL given an invalid value, the server MUST return a SOAP fault.",
        )
    }

    pub fn url_invalid_format(&mut self) -> Result<()> {
        let url = format!("{}://sites/{}", self.transport, self.site.resource_name("Site"));
        let request = self.full_request(url)?;
        let outcome = self.try_create(&request)?;
        self.site.capture_if_some(
            &outcome.fault(),
            1026,
            "[In CreateSiteSoapIn]If the URL does not comply with either of the two formats: http://ServerName:PortNumber/sites/SiteCollectionName or http://ServerName/sites/SiteCollectionName, the server MUST return a SOAP fault.",
        )
    }

    pub fn url_existed(&mut self) -> Result<()> {
        let url = self.url_without_port();
        let request = self.full_request(url)?;
        let result = self.create(&request)?;
        self.site.assert_true(is_absolute_url(&result), "CreateSite should return an absolute URL")?;

        let outcome = self.try_create(&request)?;
        self.site.capture_if_some(
            &outcome.fault(),
            17,
            "[In CreateSiteSoapIn][The request message is governed by the following rules:]If the URL already exists, the server MUST return a SOAP fault.",
        )?;
        self.delete(&result)
    }

    pub fn url_absent(&mut self) -> Result<()> {
        let mut request = self.full_request(String::new())?;
        request.url = None;
        let outcome = self.try_create(&request)?;

        self.site.capture_if_some(
            &outcome.fault(),
            14,
            "[In CreateSiteSoapIn][The request message is governed by the following rules:]If the URL is missing, the server MUST return a SOAP fault.",
        )?;
        self.site.capture_if_some(
            &outcome.fault(),
            2041,
            "[In CreateSite]If it[Url] is missing or absent, the server MUST return a SOAP fault.",
        )
    }

    pub fn url_empty(&mut self) -> Result<()> {
        let request = self.full_request(String::new())?;
        let outcome = self.try_create(&request)?;
        self.site.capture_if_some(
            &outcome.fault(),
            1027,
            "[In CreateSiteSoapIn]If the URL is empty, the server MUST return a SOAP fault.",
        )
    }

    pub fn lcid_not_installed(&mut self) -> Result<()> {
        let url = self.url_with_port(self.default_port());
        let mut request = self.full_request(url)?;
        request.lcid = Some(self.not_installed_lcid);
        let outcome = self.try_create(&request)?;
        self.site.capture_if_eq(
            Some(LCID_ERROR_CODE),
            outcome.error_code(),
            18002,
            "[In CreateSiteSoapIn] If the LCID is invalid [or not installed], then the server MUST return a SOAP fault with error code 0x8102005e.",
        )
    }

    pub fn lcid_invalid(&mut self) -> Result<()> {
        let url = self.url_with_port(self.default_port());
        let mut request = self.full_request(url)?;
        // LCIDs below 100 are never valid
        request.lcid = Some((Uuid::new_v4().as_u128() % 100) as u32);
        let outcome = self.try_create(&request)?;
        self.site.capture_if_eq(
            Some(LCID_ERROR_CODE),
            outcome.error_code(),
            18,
            "[In CreateSiteSoapIn] If the LCID is invalid [or not installed], then the server MUST return a SOAP fault with error code 0x8102005e.",
        )
    }

    pub fn web_template_invalid(&mut self) -> Result<()> {
        let url = self.url_with_port(self.default_port());
        let mut request = self.full_request(url)?;
        request.web_template = Some(random_string(5));
        let outcome = self.try_create(&request)?;
        self.site.capture_if_some(
            &outcome.fault(),
            19,
            "[In CreateSiteSoapIn]If WebTemplate is not empty, and if it is not available in the list of templates and it is not a custom template, then the server MUST return a SOAP fault.",
        )
    }

    pub fn owner_login_not_existed(&mut self) -> Result<()> {
        let url = self.url_with_port(self.default_port());
        let mut request = self.full_request(url)?;
        request.owner_login = Some(random_string(10));
        let outcome = self.try_create(&request)?;
        self.site.capture_if_eq(
            Some(OWNER_LOGIN_ERROR_CODE),
            outcome.error_code(),
            1022,
            "[In CreateSiteSoapIn]If OwnerLogin is not an existing domain user account, the server MUST return a SOAP fault with error code 0x80131600.",
        )
    }

    pub fn owner_login_absent(&mut self) -> Result<()> {
        let url = self.url_with_port(self.default_port());
        let mut request = self.full_request(url)?;
        request.owner_login = None;
        let outcome = self.try_create(&request)?;
        self.site.capture_if_some(
            &outcome.fault(),
            2050,
            "[In CreateSite]If it[OwnerLogin] is missing, the server MUST return a SOAP fault.",
        )?;

        let url = self.url_with_port(self.default_port());
        let mut request = self.full_request(url)?;
        request.owner_login = Some(String::new());
        let outcome = self.try_create(&request)?;
        self.site.capture_if_some(
            &outcome.fault(),
            2050001,
            "[In CreateSite]If it[OwnerLogin] is empty, the server MUST return a SOAP fault.",
        )
    }

    pub fn delete_url_missing(&mut self) -> Result<()> {
        let url = self.url_without_port();
        let request = self.full_request(url)?;
        let result = self.create(&request)?;

        let fault = self.try_delete(None)?;
        self.site.capture_if_some(
            &fault,
            121,
            "[In DeleteSiteSoapIn][The request message is governed by the following rules:] If the URL is missing, the server MUST return a SOAP fault.",
        )?;
        self.delete(&result)
    }

    pub fn delete_url_invalid(&mut self) -> Result<()> {
        let title = self.site.resource_name("Site");
        let request = self.full_request(format!("{}{title}", self.url_without_port))?;
        let result = self.create(&request)?;

        let invalid = format!("{}{}/sites/{title}", self.transport, random_string(5));
        let fault = self.try_delete(Some(&invalid))?;
        self.site.capture_if_some(
            &fault,
            122,
            "[In DeleteSiteSoapIn][The request message is governed by the following rules:] If the URL is not valid, the server MUST return a SOAP fault.",
        )?;
        self.delete(&result)
    }

    pub fn delete_url_not_exist(&mut self) -> Result<()> {
        let url = self.url_without_port();
        let request = self.full_request(url)?;
        let result = self.create(&request)?;
        self.delete(&result)?;

        let fault = self.try_delete(Some(&result))?;
        self.site.capture_if_some(
            &fault,
            123,
            "[In DeleteSiteSoapIn][The request message is governed by the following rules:] If the URL does not exist, the server MUST return a SOAP fault.",
        )
    }

    pub fn get_languages(&mut self) -> Result<()> {
        let languages = self.languages()?;
        info!("Server has {} language(s) installed", languages.len());
        self.site.assert_true(
            languages.iter().all(|&lcid| lcid >= 100),
            "GetLanguages should only return valid LCIDs",
        )
    }

    fn default_port(&self) -> u16 {
        if self.transport == "https" { 443 } else { 80 }
    }

    /// `{transport}://{server}:{port}/sites/` followed by a unique name
    fn url_with_port(&mut self, port: u16) -> String {
        format!(
            "{}://{}:{port}/sites/{}",
            self.transport,
            self.server,
            self.site.resource_name("Site")
        )
    }

    fn url_without_port(&mut self) -> String {
        format!("{}{}", self.url_without_port, self.site.resource_name("Site"))
    }

    /// Site URL without port whose path is `length` characters long
    fn url_with_path_length(&mut self, length: usize) -> Result<String> {
        let prefix_path = self.site.require(
            url_path(&self.url_without_port),
            "UrlWithOutPort is not an absolute URL",
        )?;
        let mut name = self.site.resource_name("Site");
        let wanted = length.saturating_sub(prefix_path.chars().count());
        if name.len() < wanted {
            name.push_str(&random_string(wanted - name.len()));
        }
        name.truncate(wanted);
        Ok(format!("{}{name}", self.url_without_port))
    }

    fn languages(&self) -> Result<Vec<u32>> {
        let languages = self.adapter.get_languages()?;
        self.site.assert_true(!languages.is_empty(), "GetLanguages should return at least one LCID")?;
        Ok(languages)
    }

    /// Request with every optional parameter set
    fn full_request(&mut self, url: String) -> Result<CreateSiteRequest> {
        let lcid = self.languages()?[0];
        Ok(CreateSiteRequest {
            url: Some(url),
            title: Some(self.site.resource_name("Title")),
            description: Some(random_string(20)),
            lcid: Some(lcid),
            web_template: Some(self.template.clone()),
            owner_login: Some(self.owner_login.clone()),
            owner_name: Some(self.site.resource_name("Owner")),
            owner_email: Some(random_email(20)),
            portal_url: Some(random_portal_url(20)),
            portal_name: Some(self.site.resource_name("Portal")),
        })
    }

    fn create(&mut self, request: &CreateSiteRequest) -> Result<String> {
        let url = self.adapter.create_site(request)?;
        self.created.record(url.clone());
        Ok(url)
    }

    /// Create a site, keeping a SOAP fault as the outcome
    fn try_create(&mut self, request: &CreateSiteRequest) -> Result<CreateOutcome> {
        match self.adapter.create_site(request) {
            Ok(url) => {
                warn!("CreateSite unexpectedly created {url}");
                self.created.record(url.clone());
                Ok(CreateOutcome::Created)
            }
            Err(e) => match soap_fault(&e) {
                Some(fault) => Ok(CreateOutcome::Fault(fault.clone())),
                None => Err(e.into()),
            },
        }
    }

    fn delete(&mut self, url: &str) -> Result<()> {
        self.adapter.delete_site(Some(url))?;
        self.created.forget(url);
        Ok(())
    }

    fn try_delete(&self, url: Option<&str>) -> Result<Option<SoapFault>> {
        match self.adapter.delete_site(url) {
            Ok(()) => Ok(None),
            Err(e) => match soap_fault(&e) {
                Some(fault) => Ok(Some(fault.clone())),
                None => Err(e.into()),
            },
        }
    }

    /// Create a site with one over-long parameter and check the stored
    /// value is its first `limit` characters
    fn check_truncated(
        &mut self,
        set: impl FnOnce(&mut CreateSiteRequest, String),
        value: String,
        property: &str,
        limit: usize,
        id: u32,
        description: &str,
    ) -> Result<()> {
        let url = self.url_with_port(self.default_port());
        let mut request = self.full_request(url)?;
        let expected: String = value.chars().take(limit).collect();
        set(&mut request, value);
        let result = self.create(&request)?;
        self.site.assert_true(is_absolute_url(&result), "CreateSite should return an absolute URL")?;

        let stored = self.sut.get_site_property(&result, property)?;
        self.site.capture_if_eq(expected, stored, id, description)?;
        self.delete(&result)
    }
}

impl Suite for AdminsSuite<'_> {
    fn site_mut(&mut self) -> &mut Site {
        &mut self.site
    }

    /// Delete every site a case left behind
    fn cleanup(&mut self) -> Result<()> {
        let mut first_error = None;
        for url in self.created.take() {
            info!("Deleting leftover site collection {url}");
            if let Err(e) = self.adapter.delete_site(Some(&url)) {
                warn!("Failed to delete {url}: {e}");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn cases() -> Vec<Case<Self>> {
        vec![
            Case::new(
                "S01_TC01_CreateSiteDeleteSiteSuccessfully_FormatWithPortNumber",
                Self::create_and_delete_with_port_number,
            ),
            Case::new(
                "S01_TC02_CreateSiteDeleteSiteSuccessfully_FormatWithAdminPortNumber",
                Self::create_and_delete_with_admin_port_number,
            ),
            Case::new(
                "S01_TC03_CreateSiteDeleteSiteSuccessfully_FormatWithoutPortNumber",
                Self::create_and_delete_without_port_number,
            ),
            Case::new("S01_TC04_CreateSiteSuccessfully_TitleAbsent", Self::title_absent),
            Case::new("S01_TC05_CreateSiteSuccessfully_DescriptionAbsent", Self::description_absent),
            Case::new("S01_TC06_CreateSiteSuccessfully_PortalUrlAbsent", Self::portal_url_absent),
            Case::new(
                "S01_TC09_CreateSiteSuccessfully_OwnerNameExceedMaxLength",
                Self::owner_name_exceeds_max_length,
            ),
            Case::new(
                "S01_TC10_CreateSiteSuccessfully_OwnerEmailExceedMaxLength",
                Self::owner_email_exceeds_max_length,
            ),
            Case::new(
                "S01_TC11_CreateSiteSuccessfully_PortalUrlExceedMaxLength",
                Self::portal_url_exceeds_max_length,
            ),
            Case::new(
                "S01_TC12_CreateSiteSuccessfully_PortalNameExceedMaxLength",
                Self::portal_name_exceeds_max_length,
            ),
            Case::new(
                "S01_TC13_CreateSiteSuccessfully_TitleExceedMaxLength",
                Self::title_exceeds_max_length,
            ),
            Case::new("S01_TC22_CreateSiteSuccessfully_UrlEqualsToMaxLength", Self::url_equals_max_length),
            Case::new("S01_TC27_CreateSiteSuccessfully_LcidAbsent", Self::lcid_absent),
            Case::new(
                "S01_TC28_CreateSiteSuccessfully_WithRequiredParameters",
                Self::with_required_parameters,
            ),
            Case::new("S01_TC29_CreateSiteSuccessfully_WithoutTemplate", Self::without_template),
            Case::new("S01_TC30_GetLanguagesSuccessfully", Self::get_languages),
            Case::new("S02_TC01_CreateSiteFailed_UrlExceedMaxLength", Self::url_exceeds_max_length),
            Case::new("S02_TC02_CreateSiteFailed_UrlServerNameInvalid", Self::url_server_name_invalid),
            Case::new("S02_TC03_CreateSiteFailed_UrlPortNumberInvalid", Self::url_port_number_invalid),
            Case::new("S02_TC04_CreateSiteFailed_UrlInvalidFormat", Self::url_invalid_format),
            Case::new("S02_TC05_CreateSiteFailed_UrlExisted", Self::url_existed),
            Case::new("S02_TC06_CreateSiteFailed_UrlAbsent", Self::url_absent),
            Case::new("S02_TC07_CreateSiteFailed_UrlEmpty", Self::url_empty),
            Case::new("S02_TC08_CreateSiteFailed_LcidNotInstalled", Self::lcid_not_installed),
            Case::new("S02_TC09_CreateSiteFailed_LcidInvalid", Self::lcid_invalid),
            Case::new("S02_TC10_CreateSiteFailed_WebTemplateInvalid", Self::web_template_invalid),
            Case::new(
                "S02_TC11_CreateSiteFailed_OwnerLoginAccountNotExisted",
                Self::owner_login_not_existed,
            ),
            Case::new("S02_TC12_CreateSiteFailed_OwnerLoginAbsent", Self::owner_login_absent),
            Case::new("S02_TC14_DeleteSiteFailed_UrlMissing", Self::delete_url_missing),
            Case::new("S02_TC15_DeleteSiteFailed_UrlNameInvalid", Self::delete_url_invalid),
            Case::new("S02_TC16_DeleteSiteFailed_UrlNotExist", Self::delete_url_not_exist),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_string_lengths() {
        assert_eq!(random_string(5).len(), 5);
        assert_eq!(random_string(256).len(), 256);
        assert_ne!(random_string(10), random_string(10));
    }

    #[test]
    fn test_generated_values_have_exact_length() {
        let email = random_email(256);
        assert_eq!(email.len(), 256);
        assert!(email.ends_with("@contoso.com"));

        let portal = random_portal_url(261);
        assert_eq!(portal.len(), 261);
        assert!(portal.starts_with("http://"));
    }

    #[test]
    fn test_absolute_url() {
        assert!(is_absolute_url("http://sut01/sites/a"));
        assert!(!is_absolute_url("sites/a"));
        assert!(!is_absolute_url(""));
    }
}
