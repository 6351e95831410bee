//! Requirement capture
//!
//! A [`Site`] belongs to one protocol document and records which numbered
//! requirements a run verified. The `capture_if_*` helpers check a
//! condition and either record the requirement or fail with
//! [`ConformanceError::RequirementFailed`] naming `<protocol>_R<id>`.

use chrono::Local;
use log::{debug, info};
use serde::Serialize;
use std::fmt::Debug;
use std::path::Path;

use crate::error::{ConformanceError, Result};

/// A requirement that held during the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapturedRequirement {
    pub id: u32,
    pub test_case: Option<String>,
    pub description: String,
}

/// Requirement recorder for one protocol document
#[derive(Debug, Serialize)]
pub struct Site {
    protocol: String,
    #[serde(skip)]
    test_case: Option<String>,
    captured: Vec<CapturedRequirement>,
    #[serde(skip)]
    resource_counter: u32,
}

impl Site {
    /// `protocol` is the document short name, e.g. "MS-ASCNTC"
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            test_case: None,
            captured: Vec::new(),
            resource_counter: 0,
        }
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Mark the start of a test case, e.g. "S01_TC01_Sync_AddContact"
    pub fn begin_case(&mut self, name: impl Into<String>) {
        let name = name.into();
        info!("{}: starting {}", self.protocol, name);
        self.test_case = Some(name);
    }

    pub fn test_case(&self) -> Option<&str> {
        self.test_case.as_deref()
    }

    /// Record `id` unconditionally
    pub fn capture(&mut self, id: u32, description: &str) {
        debug!("Verify {}_R{}", self.protocol, id);
        self.captured.push(CapturedRequirement {
            id,
            test_case: self.test_case.clone(),
            description: description.to_string(),
        });
    }

    pub fn capture_if_eq<T: PartialEq + Debug>(
        &mut self,
        expected: T,
        actual: T,
        id: u32,
        description: &str,
    ) -> Result<()> {
        if expected == actual {
            self.capture(id, description);
            Ok(())
        } else {
            Err(self.requirement_failed(
                id,
                description,
                format!("expected {expected:?}, actual {actual:?}"),
            ))
        }
    }

    pub fn capture_if_true(&mut self, condition: bool, id: u32, description: &str) -> Result<()> {
        if condition {
            self.capture(id, description);
            Ok(())
        } else {
            Err(self.requirement_failed(id, description, "condition was false".to_string()))
        }
    }

    pub fn capture_if_false(&mut self, condition: bool, id: u32, description: &str) -> Result<()> {
        if condition {
            Err(self.requirement_failed(id, description, "condition was true".to_string()))
        } else {
            self.capture(id, description);
            Ok(())
        }
    }

    pub fn capture_if_some<T>(&mut self, value: &Option<T>, id: u32, description: &str) -> Result<()> {
        if value.is_some() {
            self.capture(id, description);
            Ok(())
        } else {
            Err(self.requirement_failed(id, description, "element was absent".to_string()))
        }
    }

    pub fn capture_if_none<T: Debug>(&mut self, value: &Option<T>, id: u32, description: &str) -> Result<()> {
        match value {
            None => {
                self.capture(id, description);
                Ok(())
            }
            Some(v) => Err(self.requirement_failed(
                id,
                description,
                format!("element was present: {v:?}"),
            )),
        }
    }

    /// Equality check that is not tied to a requirement
    pub fn assert_eq<T: PartialEq + Debug>(&self, expected: T, actual: T, message: &str) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(ConformanceError::AssertionFailed(format!(
                "{message}: expected {expected:?}, actual {actual:?}"
            )))
        }
    }

    pub fn assert_true(&self, condition: bool, message: &str) -> Result<()> {
        if condition {
            Ok(())
        } else {
            Err(self.fail(message))
        }
    }

    /// Unwrap an expected value or fail the case
    pub fn require<T>(&self, value: Option<T>, message: &str) -> Result<T> {
        value.ok_or_else(|| self.fail(message))
    }

    pub fn fail(&self, message: &str) -> ConformanceError {
        ConformanceError::AssertionFailed(match &self.test_case {
            Some(case) => format!("{case}: {message}"),
            None => message.to_string(),
        })
    }

    /// Skip the rest of the case when `condition` does not hold
    pub fn assume(&self, condition: bool, message: &str) -> Result<()> {
        if condition {
            Ok(())
        } else {
            info!("{}: inconclusive, {}", self.protocol, message);
            Err(ConformanceError::Inconclusive(message.to_string()))
        }
    }

    pub fn captured(&self) -> &[CapturedRequirement] {
        &self.captured
    }

    pub fn is_captured(&self, id: u32) -> bool {
        self.captured.iter().any(|r| r.id == id)
    }

    /// Write the protocol name and captured requirements as JSON
    pub fn write_report(&self, path: &Path) -> anyhow::Result<()> {
        info!(
            "{}: writing {} captured requirement(s) to {}",
            self.protocol,
            self.captured.len(),
            path.display()
        );
        config::save_json_file(path, self)
    }

    /// Unique resource name such as `MSASCNTC_S01_TC01_FileAs3_101500123`.
    ///
    /// The prefix comes from the protocol and the scenario/case part of the
    /// current test case name; the suffix is a per-site counter plus the
    /// local time down to milliseconds.
    pub fn resource_name(&mut self, name: &str) -> String {
        self.resource_counter += 1;
        let mut prefix = self.protocol.replace('-', "");
        if let Some(case) = &self.test_case {
            for part in case.split('_').take(2) {
                prefix.push('_');
                prefix.push_str(part);
            }
        }
        format!(
            "{prefix}_{name}{}_{}",
            self.resource_counter,
            Local::now().format("%H%M%S%3f")
        )
    }

    fn requirement_failed(&self, id: u32, description: &str, detail: String) -> ConformanceError {
        ConformanceError::RequirementFailed {
            requirement: format!("{}_R{}", self.protocol, id),
            description: description.to_string(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_if_eq_records_on_success() {
        let mut site = Site::new("MS-ASCNTC");
        site.begin_case("S01_TC01_Sync_AddContact");
        site.capture_if_eq("Aaron", "Aaron", 238, "FirstName round-trips")
            .unwrap();

        assert!(site.is_captured(238));
        assert_eq!(
            site.captured()[0].test_case.as_deref(),
            Some("S01_TC01_Sync_AddContact")
        );
    }

    #[test]
    fn test_capture_if_eq_failure_names_requirement() {
        let mut site = Site::new("MS-ASCNTC");
        let err = site
            .capture_if_eq("Aaron", "Erin", 238, "FirstName round-trips")
            .unwrap_err();

        match err {
            ConformanceError::RequirementFailed { requirement, detail, .. } => {
                assert_eq!(requirement, "MS-ASCNTC_R238");
                assert!(detail.contains("Erin"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!site.is_captured(238));
    }

    #[test]
    fn test_option_captures() {
        let mut site = Site::new("MS-ASCNTC");
        site.capture_if_some(&Some(1), 415, "WeightedRank present").unwrap();
        site.capture_if_none::<u32>(&None, 1010, "Alias absent").unwrap();
        assert!(site.capture_if_none(&Some("alias"), 1, "x").is_err());
        assert!(site.capture_if_some::<u32>(&None, 2, "y").is_err());
        assert_eq!(site.captured().len(), 2);
    }

    #[test]
    fn test_assume_is_inconclusive() {
        let site = Site::new("MS-ASCNTC");
        assert!(site.assume(true, "ok").is_ok());
        assert!(site.assume(false, "12.1 does not support RIC").unwrap_err().is_inconclusive());
    }

    #[test]
    fn test_write_report() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("MS-COPYS.json");
        let mut site = Site::new("MS-COPYS");
        site.begin_case("S01_TC01_GetItem_Success");
        site.capture(165, "GetItem retrieves the file");
        site.write_report(&path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["protocol"], "MS-COPYS");
        assert_eq!(written["captured"][0]["id"], 165);
        assert_eq!(written["captured"][0]["test_case"], "S01_TC01_GetItem_Success");
    }

    #[test]
    fn test_resource_names_are_unique_and_prefixed() {
        let mut site = Site::new("MS-ADMINS");
        site.begin_case("S01_TC01_CreateSiteSuccessfully");
        let first = site.resource_name("Title");
        let second = site.resource_name("Title");

        assert!(first.starts_with("MSADMINS_S01_TC01_Title1_"));
        assert!(second.starts_with("MSADMINS_S01_TC01_Title2_"));
        assert_ne!(first, second);
    }
}
