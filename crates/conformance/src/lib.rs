//! Conformance crate - protocol test suites for Exchange ActiveSync and SharePoint
//!
//! This crate provides:
//! - Typed ActiveSync and SharePoint request/response models
//! - Adapter traits standing between the suites and a live server
//! - A fetch loop that waits out eventually consistent server state
//! - Requirement capture and per-protocol test suites
//! - In-memory servers for running the suites without a deployment
//!
//! Suites are driven through [`suites::run_all`]; each case either captures
//! its requirements, is skipped as inconclusive, or fails naming the first
//! requirement that did not hold.

pub mod activesync;
pub mod capture;
pub mod context;
pub mod error;
pub mod poll;
pub mod properties;
pub mod sharepoint;
pub mod simulator;
pub mod suites;

pub use capture::{CapturedRequirement, Site};
pub use context::{CreatedUrls, UserInformation};
pub use error::{ConformanceError, Result};
pub use poll::{PollError, PollResponse, RetryBudget, Sleeper, ThreadSleeper, await_record};
pub use properties::TestProperties;
pub use simulator::{InMemoryExchange, InMemorySharePoint};
pub use suites::{
    AdminsSuite, CaseOutcome, CaseReport, ContactsSuite, CopysSuite, ProvisioningSuite, Suite,
    run_all, run_case,
};
