//! The fetch loop itself

use log::{debug, trace};
use std::time::Duration;
use thiserror::Error;

use super::RetryBudget;
use crate::error::ConformanceError;

/// Blocks the calling thread between attempts
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `std::thread::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// A query response that carries a status and a batch of candidate records
pub trait PollResponse {
    type Record;

    /// Whether the server reported success for this attempt
    fn is_success(&self) -> bool;

    /// Candidates in server response order
    fn into_candidates(self) -> Vec<Self::Record>;
}

#[derive(Debug, Error)]
pub enum PollError {
    #[error("no matching record after {attempts} attempt(s)")]
    NotFound { attempts: u32 },

    /// The query itself failed (transport fault, failed cursor resync)
    #[error(transparent)]
    Query(#[from] anyhow::Error),
}

impl PollError {
    /// Turn the outcome into a test failure naming the natural key
    pub fn for_key(self, key: &str) -> ConformanceError {
        match self {
            Self::NotFound { attempts } => ConformanceError::RecordNotFound {
                key: key.to_string(),
                attempts,
            },
            Self::Query(e) => ConformanceError::Adapter(e),
        }
    }
}

/// Re-run `query` until a candidate satisfies `predicate`.
///
/// Sleeps `budget.wait()` before every attempt, the first one included.
/// A missing response (`Ok(None)`) or a non-success status counts as a
/// miss. Errors returned by `query` are not retried. Within one response
/// the first matching candidate wins.
///
/// Returns [`PollError::NotFound`] with the number of attempts made once
/// `budget.max_attempts()` queries have missed.
pub fn await_record<R, Q, P>(
    mut query: Q,
    mut predicate: P,
    budget: &RetryBudget,
    sleeper: &dyn Sleeper,
) -> Result<R::Record, PollError>
where
    R: PollResponse,
    Q: FnMut() -> anyhow::Result<Option<R>>,
    P: FnMut(&R::Record) -> bool,
{
    let mut attempts = 0;
    loop {
        sleeper.sleep(budget.wait());

        match query()? {
            Some(response) if response.is_success() => {
                if let Some(record) = response.into_candidates().into_iter().find(|c| predicate(c)) {
                    debug!("Matched record on attempt {}", attempts + 1);
                    return Ok(record);
                }
                trace!("Attempt {}: no matching record", attempts + 1);
            }
            Some(_) => trace!("Attempt {}: non-success status", attempts + 1),
            None => trace!("Attempt {}: empty response", attempts + 1),
        }

        attempts += 1;
        if attempts >= budget.max_attempts() {
            break;
        }
    }

    debug!("Giving up after {} attempt(s)", attempts);
    Err(PollError::NotFound { attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        key: &'static str,
        tag: u32,
    }

    struct Response {
        success: bool,
        items: Vec<Item>,
    }

    impl Response {
        fn ok(items: Vec<Item>) -> Self {
            Self { success: true, items }
        }

        fn failed() -> Self {
            Self { success: false, items: vec![item("target", 99)] }
        }
    }

    impl PollResponse for Response {
        type Record = Item;

        fn is_success(&self) -> bool {
            self.success
        }

        fn into_candidates(self) -> Vec<Item> {
            self.items
        }
    }

    fn item(key: &'static str, tag: u32) -> Item {
        Item { key, tag }
    }

    #[derive(Debug, PartialEq)]
    enum Event {
        Sleep(Duration),
        Query,
    }

    /// Shared event log for the sleeper and the query
    #[derive(Default)]
    struct Log(RefCell<Vec<Event>>);

    impl Log {
        fn queries(&self) -> usize {
            self.0.borrow().iter().filter(|e| **e == Event::Query).count()
        }
    }

    impl Sleeper for Log {
        fn sleep(&self, duration: Duration) {
            self.0.borrow_mut().push(Event::Sleep(duration));
        }
    }

    /// Replays scripted responses; repeats a miss once the script runs out
    fn scripted<'a>(
        log: &'a Log,
        script: Vec<Option<Response>>,
    ) -> impl FnMut() -> anyhow::Result<Option<Response>> + 'a {
        let mut script: VecDeque<_> = script.into();
        move || {
            log.0.borrow_mut().push(Event::Query);
            Ok(script
                .pop_front()
                .unwrap_or_else(|| Some(Response::ok(vec![item("other", 0)]))))
        }
    }

    fn is_target(record: &Item) -> bool {
        record.key == "target"
    }

    fn budget(wait_ms: u64, attempts: u32) -> RetryBudget {
        RetryBudget::from_millis(wait_ms, attempts).unwrap()
    }

    #[test]
    fn test_never_matching_runs_exactly_n_queries() {
        for n in 1..=6 {
            let log = Log::default();
            let result = await_record(scripted(&log, vec![]), is_target, &budget(0, n), &log);
            assert!(matches!(result, Err(PollError::NotFound { attempts }) if attempts == n));
            assert_eq!(log.queries(), n as usize);
        }
    }

    #[test]
    fn test_sleeps_before_every_attempt() {
        let log = Log::default();
        let wait = Duration::from_millis(40);
        let _ = await_record(scripted(&log, vec![]), is_target, &budget(40, 3), &log);

        let events = log.0.borrow();
        assert_eq!(
            *events,
            vec![
                Event::Sleep(wait),
                Event::Query,
                Event::Sleep(wait),
                Event::Query,
                Event::Sleep(wait),
                Event::Query,
            ]
        );
    }

    #[test]
    fn test_stops_at_first_matching_attempt() {
        for k in 1..=5u32 {
            let log = Log::default();
            let mut script: Vec<Option<Response>> = (1..k)
                .map(|_| Some(Response::ok(vec![item("other", 0)])))
                .collect();
            script.push(Some(Response::ok(vec![item("target", k)])));

            let record = await_record(scripted(&log, script), is_target, &budget(0, 5), &log).unwrap();
            assert_eq!(record.tag, k);
            assert_eq!(log.queries(), k as usize);
        }
    }

    #[test]
    fn test_non_success_status_counts_as_miss() {
        let log = Log::default();
        let script = (0..4).map(|_| Some(Response::failed())).collect();

        let result = await_record(scripted(&log, script), is_target, &budget(0, 4), &log);
        assert!(matches!(result, Err(PollError::NotFound { attempts: 4 })));
        assert_eq!(log.queries(), 4);
    }

    #[test]
    fn test_fail_then_miss_then_match() {
        let log = Log::default();
        let script = vec![
            Some(Response::failed()),
            Some(Response::ok(vec![item("other", 2)])),
            Some(Response::ok(vec![item("target", 3)])),
        ];

        let record = await_record(scripted(&log, script), is_target, &budget(0, 3), &log).unwrap();
        assert_eq!(record, item("target", 3));
        assert_eq!(log.queries(), 3);
    }

    #[test]
    fn test_two_misses_with_budget_of_two() {
        let log = Log::default();
        let script = vec![
            Some(Response::ok(vec![])),
            Some(Response::ok(vec![item("other", 1)])),
        ];

        let result = await_record(scripted(&log, script), is_target, &budget(0, 2), &log);
        assert!(matches!(result, Err(PollError::NotFound { attempts: 2 })));
        assert_eq!(log.queries(), 2);
    }

    #[test]
    fn test_first_match_in_response_order_wins() {
        let log = Log::default();
        let script = vec![Some(Response::ok(vec![
            item("other", 1),
            item("target", 2),
            item("target", 3),
        ]))];

        let record = await_record(scripted(&log, script), is_target, &budget(0, 1), &log).unwrap();
        assert_eq!(record.tag, 2);
    }

    #[test]
    fn test_missing_response_counts_as_miss() {
        let log = Log::default();
        let script = vec![None, Some(Response::ok(vec![item("target", 7)]))];

        let record = await_record(scripted(&log, script), is_target, &budget(0, 2), &log).unwrap();
        assert_eq!(record.tag, 7);
        assert_eq!(log.queries(), 2);
    }

    #[test]
    fn test_query_error_propagates_without_retry() {
        let log = Log::default();
        let query = || -> anyhow::Result<Option<Response>> {
            log.0.borrow_mut().push(Event::Query);
            anyhow::bail!("FolderSync failed while resynchronizing")
        };

        let result = await_record(query, is_target, &budget(0, 5), &log);
        match result {
            Err(PollError::Query(e)) => assert!(e.to_string().contains("FolderSync")),
            _ => panic!("expected query error"),
        }
        assert_eq!(log.queries(), 1);
    }

    #[test]
    fn test_for_key_names_key_and_attempts() {
        let err = PollError::NotFound { attempts: 3 }.for_key("Subject_1");
        assert!(matches!(
            err,
            ConformanceError::RecordNotFound { ref key, attempts: 3 } if key == "Subject_1"
        ));
    }
}
