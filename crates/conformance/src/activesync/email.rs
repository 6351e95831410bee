//! Email class application data

use chrono::{DateTime, Utc};

use super::Body;

/// Email class item as returned by Sync, Search and ItemOperations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Email {
    pub subject: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub date_received: Option<DateTime<Utc>>,
    pub message_class: Option<String>,
    pub body: Option<Body>,
}
