//! Error types shared by every suite

use thiserror::Error;

/// Outcome of a failed test step.
///
/// Adapters report transport problems as `anyhow::Error`; those pass through
/// [`ConformanceError::Adapter`] untouched so callers can still downcast them.
#[derive(Debug, Error)]
pub enum ConformanceError {
    /// A numbered requirement did not hold
    #[error("{requirement} failed: {description} ({detail})")]
    RequirementFailed {
        requirement: String,
        description: String,
        detail: String,
    },

    /// A plain assertion that is not tied to a requirement number
    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    /// The fetch loop ran out of attempts without seeing the record
    #[error("record '{key}' was not found after {attempts} attempt(s)")]
    RecordNotFound { key: String, attempts: u32 },

    /// The case does not apply to this server configuration
    #[error("inconclusive: {0}")]
    Inconclusive(String),

    /// Missing or malformed property
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Adapter(#[from] anyhow::Error),
}

impl ConformanceError {
    /// Whether the case was skipped rather than failed
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, Self::Inconclusive(_))
    }
}

pub type Result<T> = std::result::Result<T, ConformanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_not_found_message_carries_attempts() {
        let err = ConformanceError::RecordNotFound {
            key: "MS-ASCNTC_S01_TC01_FileAs".to_string(),
            attempts: 5,
        };
        let message = err.to_string();
        assert!(message.contains("MS-ASCNTC_S01_TC01_FileAs"));
        assert!(message.contains("5 attempt"));
    }

    #[test]
    fn test_adapter_errors_stay_downcastable() {
        #[derive(Debug, Error)]
        #[error("boom")]
        struct Boom;

        let err: ConformanceError = anyhow::Error::new(Boom).into();
        match err {
            ConformanceError::Adapter(inner) => assert!(inner.downcast_ref::<Boom>().is_some()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_inconclusive() {
        assert!(ConformanceError::Inconclusive("12.1".into()).is_inconclusive());
        assert!(!ConformanceError::AssertionFailed("x".into()).is_inconclusive());
    }
}
