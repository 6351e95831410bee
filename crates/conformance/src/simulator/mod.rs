//! In-memory servers implementing every adapter trait
//!
//! Used by the integration tests to run the suites without a live Exchange
//! or SharePoint deployment.

mod exchange;
mod sharepoint;

pub use exchange::InMemoryExchange;
pub use sharepoint::{DEFAULT_TITLE, InMemorySharePoint, LCID_ERROR_CODE, OWNER_LOGIN_ERROR_CODE};
