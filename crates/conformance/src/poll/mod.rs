//! Polling for eventually consistent server state
//!
//! A mutating command (Sync add, SendMail, ...) is not guaranteed to be
//! visible to the next query. [`await_record`] re-runs a query until a
//! record matching a natural key shows up or the [`RetryBudget`] is spent.

mod budget;
mod fetch;

pub use budget::{RetryBudget, RetryBudgetError};
pub use fetch::{PollError, PollResponse, Sleeper, ThreadSleeper, await_record};
