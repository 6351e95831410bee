//! Site collection administration

use anyhow::Result;

/// Length limits for CreateSite parameters
pub mod limits {
    /// Url, not counting "http://ServerName"
    pub const URL_PATH: usize = 128;
    pub const TITLE: usize = 255;
    pub const DESCRIPTION: usize = 2047;
    pub const OWNER_NAME: usize = 255;
    pub const OWNER_EMAIL: usize = 255;
    pub const PORTAL_URL: usize = 260;
    pub const PORTAL_NAME: usize = 255;
}

/// CreateSite parameters; `None` leaves the element out of the request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateSiteRequest {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub lcid: Option<u32>,
    pub web_template: Option<String>,
    pub owner_login: Option<String>,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
    pub portal_url: Option<String>,
    pub portal_name: Option<String>,
}

/// Client for the Administration web service
pub trait AdminsAdapter: Send + Sync {
    /// LCIDs of the languages installed on the server
    fn get_languages(&self) -> Result<Vec<u32>>;

    /// Create a site collection, returning its absolute URL
    fn create_site(&self, request: &CreateSiteRequest) -> Result<String>;

    /// `None` sends a request without the Url element
    fn delete_site(&self, url: Option<&str>) -> Result<()>;
}

/// Out-of-band queries against the SharePoint server under test
pub trait AdminsSutControl: Send + Sync {
    /// Read a property of the site collection at `url`, e.g. "Configuration"
    fn get_site_property(&self, url: &str, property: &str) -> Result<String>;
}
