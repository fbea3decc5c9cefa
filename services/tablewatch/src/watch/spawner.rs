//! Supervised detached tasks.
//!
//! Every background task is wrapped in a second task that awaits its
//! `JoinHandle`, so a panic or cancellation is logged with the task label
//! instead of vanishing with the dropped handle.
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::Instrument;

#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    active: Arc<AtomicUsize>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of spawned tasks that have not finished yet.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    pub fn spawn<F>(&self, label: &'static str, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let active = self.active.clone();
        let now = active.fetch_add(1, Ordering::Relaxed) + 1;
        metrics::gauge!("tablewatch_background_tasks_active").set(now as f64);
        let inner = tokio::spawn(fut.in_current_span());
        tokio::spawn(async move {
            match inner.await {
                Ok(()) => {}
                Err(err) if err.is_panic() => {
                    tracing::error!(task = label, "background task panicked");
                }
                Err(_) => {
                    tracing::warn!(task = label, "background task cancelled");
                }
            }
            let left = active.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
            metrics::gauge!("tablewatch_background_tasks_active").set(left as f64);
        });
    }
}
