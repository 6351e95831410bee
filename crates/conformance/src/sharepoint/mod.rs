//! SharePoint web service models and adapter seams
//!
//! Covers site collection administration (CreateSite/DeleteSite) and the
//! copy service (GetItem/CopyIntoItems/CopyIntoItemsLocal).

mod admins;
mod copys;
pub mod urls;

pub use admins::{AdminsAdapter, AdminsSutControl, CreateSiteRequest, limits};
pub use copys::{
    CopyErrorCode, CopyIntoItemsResponse, CopyResult, CopysAdapter, CopysSutControl,
    FieldInformation, FieldType, GetItemResponse, ServiceLocation, encode_stream,
};

use thiserror::Error;

/// SOAP fault returned by a SharePoint web service
///
/// Adapters return it inside `anyhow::Error`; use [`soap_fault`] to get it
/// back out.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("SOAP fault: {message}")]
pub struct SoapFault {
    pub message: String,
    /// Detail error code such as "0x8102005e"
    pub error_code: Option<String>,
}

impl SoapFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_code: None,
        }
    }

    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }
}

/// The SOAP fault carried by `err`, if any
pub fn soap_fault(err: &anyhow::Error) -> Option<&SoapFault> {
    err.downcast_ref::<SoapFault>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soap_fault_downcast() {
        let err: anyhow::Error = SoapFault::new("Invalid URL").with_error_code("0x80070057").into();
        let fault = soap_fault(&err).unwrap();
        assert_eq!(fault.error_code.as_deref(), Some("0x80070057"));

        let other = anyhow::anyhow!("connection reset");
        assert!(soap_fault(&other).is_none());
    }
}
