//! Copy web service

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server the copy service calls are sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceLocation {
    SourceSut,
    DestinationSut,
}

/// Per-destination outcome of a copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CopyErrorCode {
    Success,
    DestinationInvalid,
    DestinationMWS,
    SourceInvalid,
    DestinationCheckedOut,
    InvalidUrl,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Note,
    Number,
    DateTime,
    Boolean,
    Guid,
    Counter,
    Lookup,
    User,
    Url,
    File,
    Computed,
    Invalid,
}

/// Metadata field of a list item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInformation {
    pub field_type: FieldType,
    pub display_name: String,
    pub internal_name: String,
    pub id: Uuid,
    pub value: Option<String>,
}

impl FieldInformation {
    pub fn new(field_type: FieldType, internal_name: &str, value: Option<&str>) -> Self {
        Self {
            field_type,
            display_name: internal_name.to_string(),
            internal_name: internal_name.to_string(),
            id: Uuid::new_v4(),
            value: value.map(str::to_string),
        }
    }
}

/// GetItem result; both parts are absent when the file does not exist
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetItemResponse {
    pub fields: Option<Vec<FieldInformation>>,
    /// Base64 file contents
    pub stream: Option<String>,
}

impl GetItemResponse {
    /// Decoded file contents
    pub fn stream_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.stream
            .as_deref()
            .map(|s| STANDARD.decode(s).context("stream is not valid base64"))
            .transpose()
    }

    /// Decoded contents as UTF-8 text
    pub fn stream_text(&self) -> Result<Option<String>> {
        self.stream_bytes()?
            .map(|bytes| String::from_utf8(bytes).context("stream is not UTF-8"))
            .transpose()
    }

    pub fn field(&self, internal_name: &str) -> Option<&FieldInformation> {
        self.fields
            .as_ref()?
            .iter()
            .find(|f| f.internal_name == internal_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyResult {
    pub error_code: CopyErrorCode,
    pub error_message: Option<String>,
    pub destination_url: String,
}

impl CopyResult {
    pub fn success(destination_url: &str) -> Self {
        Self {
            error_code: CopyErrorCode::Success,
            error_message: None,
            destination_url: destination_url.to_string(),
        }
    }

    pub fn failure(destination_url: &str, error_code: CopyErrorCode, message: &str) -> Self {
        Self {
            error_code,
            error_message: Some(message.to_string()),
            destination_url: destination_url.to_string(),
        }
    }
}

/// One result per destination, in request order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CopyIntoItemsResponse {
    pub results: Vec<CopyResult>,
}

impl CopyIntoItemsResponse {
    pub fn all_succeeded(&self) -> bool {
        !self.results.is_empty()
            && self
                .results
                .iter()
                .all(|r| r.error_code == CopyErrorCode::Success)
    }
}

/// Client for the Copy web service
pub trait CopysAdapter: Send + Sync {
    /// Direct later calls at the source or destination server
    fn switch_target(&self, location: ServiceLocation) -> Result<()>;

    fn get_item(&self, url: &str) -> Result<GetItemResponse>;

    /// Upload `stream` (base64) with `fields` to every destination
    fn copy_into_items(
        &self,
        source_url: &str,
        destination_urls: &[String],
        fields: &[FieldInformation],
        stream: &str,
    ) -> Result<CopyIntoItemsResponse>;

    /// Copy a file within one server
    fn copy_into_items_local(
        &self,
        source_url: &str,
        destination_urls: &[String],
    ) -> Result<CopyIntoItemsResponse>;
}

/// Out-of-band file management on the destination server
pub trait CopysSutControl: Send + Sync {
    fn upload_text_file(&self, url: &str) -> Result<bool>;

    /// Delete every file in `urls`; false when any delete failed
    fn delete_files(&self, urls: &[String]) -> Result<bool>;

    fn check_out_file(&self, url: &str, user: &str, password: &str, domain: &str) -> Result<bool>;

    fn undo_check_out_file(&self, url: &str, user: &str, password: &str, domain: &str) -> Result<bool>;
}

/// Base64 of `text`'s UTF-8 bytes
pub fn encode_stream(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_text_decodes() {
        let response = GetItemResponse {
            fields: Some(vec![FieldInformation::new(FieldType::Text, "Title", Some("doc"))]),
            stream: Some(encode_stream("hello copy")),
        };
        assert_eq!(response.stream_text().unwrap().as_deref(), Some("hello copy"));
        assert_eq!(response.field("Title").unwrap().value.as_deref(), Some("doc"));
        assert!(response.field("Author").is_none());
    }

    #[test]
    fn test_missing_item_has_no_stream() {
        let response = GetItemResponse::default();
        assert_eq!(response.stream_bytes().unwrap(), None);
        assert!(response.field("Title").is_none());
    }

    #[test]
    fn test_bad_stream_is_error() {
        let response = GetItemResponse {
            fields: None,
            stream: Some("***".into()),
        };
        assert!(response.stream_bytes().is_err());
    }

    #[test]
    fn test_all_succeeded_needs_results() {
        assert!(!CopyIntoItemsResponse::default().all_succeeded());
        let response = CopyIntoItemsResponse {
            results: vec![
                CopyResult::success("http://sut/a.txt"),
                CopyResult::failure("http://sut/b.txt", CopyErrorCode::Unknown, "boom"),
            ],
        };
        assert!(!response.all_succeeded());
    }
}
