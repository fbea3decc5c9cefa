//! Field-completion watcher.
//!
//! # Purpose
//! After a record is inserted, some other actor fills in the rest of its
//! fields. The watcher re-fetches the record on a backoff schedule until every
//! watched field holds a value, then runs the completion handler once.
//!
//! # State machine
//! `Idle -> Waiting -> Polling -> Completed | Exhausted | Aborted`
//!
//! - The first fetch happens after `initial_delay`.
//! - A fetch that finds a watched field empty, or fails with a retryable error,
//!   sleeps `backoff_delay(attempt)` and tries again.
//! - A non-retryable fetch error aborts the run.
//! - After `max_attempts` fetches without completion the run is exhausted.
//!
//! # Notes
//! Runs own everything they touch: the record handle and the watch list are
//! moved in at spawn time, so later configuration edits never reach an
//! in-flight run. There is no cancellation and no deduplication of runs for the
//! same record.
use crate::model::RecordHandle;
use crate::remote::RecordSource;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tablewatch_lark::{FieldMap, FieldValue};
use tracing::Instrument;

mod spawner;

pub use spawner::BackgroundTasks;

pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(10);
pub const DEFAULT_BASE_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_CAP_EXPONENT: u32 = 6;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

/// Timing of one watch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchPolicy {
    pub initial_delay: Duration,
    pub base_interval: Duration,
    pub max_interval: Duration,
    pub cap_exponent: u32,
    /// Upper bound on fetches per run.
    pub max_attempts: u32,
}

impl Default for WatchPolicy {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            base_interval: DEFAULT_BASE_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            cap_exponent: DEFAULT_CAP_EXPONENT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl WatchPolicy {
    /// `min(base * 2^min(attempt, cap_exponent), max_interval)`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(self.cap_exponent).min(31);
        self.base_interval
            .checked_mul(factor)
            .unwrap_or(self.max_interval)
            .min(self.max_interval)
    }
}

/// A watched field is incomplete when it is absent, null, or an empty string.
pub fn is_incomplete(value: Option<&FieldValue>) -> bool {
    value.is_none_or(FieldValue::is_blank)
}

/// Watched fields that are still incomplete in `values`, in watch-list order.
pub fn missing_fields<'a>(fields: &'a [String], values: &FieldMap) -> Vec<&'a str> {
    fields
        .iter()
        .filter(|field| is_incomplete(values.get(field.as_str())))
        .map(String::as_str)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Every watched field was filled; the completion handler ran.
    Completed { fetches: u32 },
    /// The fetch budget ran out first.
    Exhausted { fetches: u32 },
    /// A fetch failed in a way retrying cannot fix.
    Aborted { fetches: u32 },
}

impl WatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            WatchOutcome::Completed { .. } => "completed",
            WatchOutcome::Exhausted { .. } => "exhausted",
            WatchOutcome::Aborted { .. } => "aborted",
        }
    }

    pub fn fetches(&self) -> u32 {
        match self {
            WatchOutcome::Completed { fetches }
            | WatchOutcome::Exhausted { fetches }
            | WatchOutcome::Aborted { fetches } => *fetches,
        }
    }
}

/// Mutable state of one run.
struct WatchRun {
    handle: RecordHandle,
    fields: Vec<String>,
    attempt: u32,
    fetches: u32,
}

enum Step {
    Done(FieldMap),
    Retry,
    Abort,
}

impl WatchRun {
    async fn poll(&mut self, records: &dyn RecordSource) -> Step {
        self.fetches += 1;
        metrics::counter!("tablewatch_watch_fetches_total").increment(1);
        match records.fetch_record(&self.handle).await {
            Ok(values) => {
                let missing = missing_fields(&self.fields, &values);
                if missing.is_empty() {
                    return Step::Done(values);
                }
                tracing::debug!(fetch = self.fetches, ?missing, "watched fields still empty");
                Step::Retry
            }
            Err(err) if err.is_retryable() => {
                tracing::warn!(fetch = self.fetches, error = %err, "record fetch failed; will retry");
                Step::Retry
            }
            Err(err) => {
                tracing::error!(fetch = self.fetches, error = %err, "record fetch failed permanently");
                Step::Abort
            }
        }
    }
}

#[derive(Clone)]
pub struct Watcher {
    records: Arc<dyn RecordSource>,
    policy: WatchPolicy,
    tasks: BackgroundTasks,
}

impl Watcher {
    pub fn new(records: Arc<dyn RecordSource>, policy: WatchPolicy, tasks: BackgroundTasks) -> Self {
        Self {
            records,
            policy,
            tasks,
        }
    }

    pub fn policy(&self) -> &WatchPolicy {
        &self.policy
    }

    /// Run the watch to completion in the current task.
    ///
    /// `on_complete` receives the full field map of the fetch that found every
    /// watched field filled, and is awaited before this returns.
    pub async fn run<F, Fut>(
        &self,
        handle: RecordHandle,
        fields: Vec<String>,
        on_complete: F,
    ) -> WatchOutcome
    where
        F: FnOnce(FieldMap) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut run = WatchRun {
            handle,
            fields,
            attempt: 0,
            fetches: 0,
        };
        tokio::time::sleep(self.policy.initial_delay).await;
        let outcome = loop {
            match run.poll(self.records.as_ref()).await {
                Step::Done(values) => {
                    tracing::info!(fetches = run.fetches, "watched fields complete");
                    on_complete(values).await;
                    break WatchOutcome::Completed {
                        fetches: run.fetches,
                    };
                }
                Step::Abort => {
                    break WatchOutcome::Aborted {
                        fetches: run.fetches,
                    };
                }
                Step::Retry if run.fetches >= self.policy.max_attempts => {
                    tracing::warn!(
                        fetches = run.fetches,
                        "giving up; watched fields never completed"
                    );
                    break WatchOutcome::Exhausted {
                        fetches: run.fetches,
                    };
                }
                Step::Retry => {
                    tokio::time::sleep(self.policy.backoff_delay(run.attempt)).await;
                    run.attempt += 1;
                }
            }
        };
        metrics::counter!("tablewatch_watch_runs_total", "outcome" => outcome.label())
            .increment(1);
        outcome
    }

    /// Start a detached run and return immediately.
    pub fn watch<F, Fut>(&self, handle: RecordHandle, fields: Vec<String>, on_complete: F)
    where
        F: FnOnce(FieldMap) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let span = tracing::info_span!(
            "watch",
            table = %handle.table,
            record_id = %handle.record_id,
        );
        let watcher = self.clone();
        self.tasks.spawn(
            "record-watch",
            async move {
                let outcome = watcher.run(handle, fields, on_complete).await;
                tracing::info!(outcome = outcome.label(), fetches = outcome.fetches(), "watch finished");
            }
            .instrument(span),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emptiness_rule() {
        assert!(is_incomplete(None));
        assert!(is_incomplete(Some(&FieldValue::Null)));
        assert!(is_incomplete(Some(&FieldValue::Text(String::new()))));

        assert!(!is_incomplete(Some(&FieldValue::Number(0.0))));
        assert!(!is_incomplete(Some(&FieldValue::Bool(false))));
        assert!(!is_incomplete(Some(&FieldValue::List(Vec::new()))));
        assert!(!is_incomplete(Some(&FieldValue::Map(Default::default()))));
        assert!(!is_incomplete(Some(&FieldValue::Text(" ".into()))));
    }

    #[test]
    fn missing_fields_keeps_watch_order() {
        let mut values = FieldMap::new();
        values.insert("B".into(), FieldValue::Text("x".into()));
        values.insert("C".into(), FieldValue::Text(String::new()));
        let fields = vec!["C".to_string(), "B".to_string(), "A".to_string()];
        assert_eq!(missing_fields(&fields, &values), vec!["C", "A"]);
    }

    #[test]
    fn backoff_doubles_then_clamps() {
        let policy = WatchPolicy::default();
        let delays: Vec<u64> = (0..10).map(|a| policy.backoff_delay(a).as_secs()).collect();
        assert_eq!(delays, vec![10, 20, 40, 80, 160, 300, 300, 300, 300, 300]);

        let wide = WatchPolicy {
            max_interval: Duration::from_secs(3600),
            ..WatchPolicy::default()
        };
        for attempt in 0..6 {
            assert!(wide.backoff_delay(attempt) < wide.backoff_delay(attempt + 1));
            assert_eq!(
                wide.backoff_delay(attempt),
                Duration::from_secs(10 * (1 << attempt))
            );
        }
        assert_eq!(wide.backoff_delay(6), Duration::from_secs(640));
        assert_eq!(wide.backoff_delay(7), wide.backoff_delay(6));
        assert_eq!(wide.backoff_delay(u32::MAX), wide.backoff_delay(6));
    }
}
