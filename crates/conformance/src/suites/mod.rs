//! Test suites, one per protocol document
//!
//! A suite is set up once against its adapters, then runs named cases one
//! after another. After every case the suite removes what the case created
//! on the server, so cases do not see each other's leftovers.

pub mod admins;
pub mod contacts;
pub mod copys;
pub mod provisioning;

pub use admins::AdminsSuite;
pub use contacts::ContactsSuite;
pub use copys::CopysSuite;
pub use provisioning::ProvisioningSuite;

use log::{info, warn};

use crate::capture::Site;
use crate::error::Result;

/// A named test case of suite `S`
pub struct Case<S> {
    pub name: &'static str,
    pub run: fn(&mut S) -> Result<()>,
}

impl<S> Case<S> {
    pub const fn new(name: &'static str, run: fn(&mut S) -> Result<()>) -> Self {
        Self { name, run }
    }
}

impl<S> Clone for Case<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for Case<S> {}

pub trait Suite: Sized {
    fn site_mut(&mut self) -> &mut Site;

    /// Remove everything the last case created
    fn cleanup(&mut self) -> Result<()>;

    fn cases() -> Vec<Case<Self>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseOutcome {
    Passed,
    Inconclusive(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    pub name: &'static str,
    pub outcome: CaseOutcome,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        self.outcome == CaseOutcome::Passed
    }
}

/// Run one case followed by the suite's cleanup.
///
/// A cleanup failure fails a case that otherwise passed.
pub fn run_case<S: Suite>(suite: &mut S, case: Case<S>) -> CaseReport {
    suite.site_mut().begin_case(case.name);

    let mut outcome = match (case.run)(suite) {
        Ok(()) => CaseOutcome::Passed,
        Err(e) if e.is_inconclusive() => CaseOutcome::Inconclusive(e.to_string()),
        Err(e) => CaseOutcome::Failed(e.to_string()),
    };

    if let Err(e) = suite.cleanup() {
        warn!("Cleanup after {} failed: {}", case.name, e);
        if outcome == CaseOutcome::Passed {
            outcome = CaseOutcome::Failed(format!("cleanup failed: {e}"));
        }
    }

    info!("{}: {:?}", case.name, outcome);
    CaseReport {
        name: case.name,
        outcome,
    }
}

/// Run every case of the suite in declaration order
pub fn run_all<S: Suite>(suite: &mut S) -> Vec<CaseReport> {
    S::cases()
        .into_iter()
        .map(|case| run_case(suite, case))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConformanceError;

    struct Counting {
        site: Site,
        cleanups: u32,
        fail_cleanup: bool,
    }

    impl Counting {
        fn new() -> Self {
            Self {
                site: Site::new("MS-TEST"),
                cleanups: 0,
                fail_cleanup: false,
            }
        }

        fn passes(&mut self) -> Result<()> {
            self.site.capture(1, "always holds");
            Ok(())
        }

        fn skips(&mut self) -> Result<()> {
            self.site.assume(false, "not supported")
        }

        fn fails(&mut self) -> Result<()> {
            Err(ConformanceError::AssertionFailed("broken".into()))
        }
    }

    impl Suite for Counting {
        fn site_mut(&mut self) -> &mut Site {
            &mut self.site
        }

        fn cleanup(&mut self) -> Result<()> {
            self.cleanups += 1;
            if self.fail_cleanup {
                return Err(ConformanceError::AssertionFailed("leftover item".into()));
            }
            Ok(())
        }

        fn cases() -> Vec<Case<Self>> {
            vec![
                Case::new("S01_TC01_Passes", Self::passes),
                Case::new("S01_TC02_Skips", Self::skips),
                Case::new("S01_TC03_Fails", Self::fails),
            ]
        }
    }

    #[test]
    fn test_run_all_reports_every_case() {
        let mut suite = Counting::new();
        let reports = run_all(&mut suite);

        assert_eq!(reports.len(), 3);
        assert!(reports[0].passed());
        assert!(matches!(reports[1].outcome, CaseOutcome::Inconclusive(_)));
        assert!(matches!(reports[2].outcome, CaseOutcome::Failed(ref m) if m.contains("broken")));
        assert_eq!(suite.cleanups, 3);
        assert_eq!(suite.site.captured()[0].test_case.as_deref(), Some("S01_TC01_Passes"));
    }

    #[test]
    fn test_cleanup_failure_fails_passed_case() {
        let mut suite = Counting::new();
        suite.fail_cleanup = true;
        let report = run_case(&mut suite, Case::new("S01_TC01_Passes", Counting::passes));

        assert!(matches!(report.outcome, CaseOutcome::Failed(ref m) if m.contains("cleanup")));
    }
}
