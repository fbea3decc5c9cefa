//! Tenant access token cache.
//!
//! # Concurrency model
//! Double-checked locking over a `tokio::sync::RwLock`:
//! 1) readers take the shared lock and return a token that is still fresh;
//! 2) otherwise the caller takes the exclusive lock, re-checks (another caller
//!    may have refreshed while it waited), and only then runs the refresh.
//!
//! Concurrent callers that miss at the same time therefore trigger exactly one
//! refresh between them.
use crate::error::LarkResult;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Tokens are refreshed this long before the server-side expiry.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

/// A token freshly issued by the auth endpoint.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub value: String,
    pub expires_in: Duration,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        self.refresh_at > now
    }
}

#[derive(Debug, Clone, Default)]
pub struct TokenCache {
    slot: Arc<RwLock<Option<CachedToken>>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached token, running `refresh` only when it is missing or stale.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> LarkResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = LarkResult<IssuedToken>>,
    {
        {
            let guard = self.slot.read().await;
            if let Some(token) = guard.as_ref()
                && token.is_fresh(Instant::now())
            {
                return Ok(token.value.clone());
            }
        }

        let mut guard = self.slot.write().await;
        if let Some(token) = guard.as_ref()
            && token.is_fresh(Instant::now())
        {
            return Ok(token.value.clone());
        }

        let issued = refresh().await?;
        tracing::debug!(
            expires_in_secs = issued.expires_in.as_secs(),
            "tenant access token refreshed"
        );
        *guard = Some(CachedToken {
            value: issued.value.clone(),
            refresh_at: Instant::now() + issued.expires_in.saturating_sub(REFRESH_MARGIN),
        });
        Ok(issued.value)
    }

    /// Drop the cached token so the next caller refreshes.
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LarkError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn issue(counter: &AtomicUsize, lifetime: Duration) -> IssuedToken {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        IssuedToken {
            value: format!("t-{n}"),
            expires_in: lifetime,
        }
    }

    #[tokio::test]
    async fn concurrent_misses_refresh_once() {
        let cache = TokenCache::new();
        let refreshes = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let refreshes = refreshes.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_refresh(|| async {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(issue(&refreshes, Duration::from_secs(7200)))
                    })
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.expect("join").expect("token"), "t-1");
        }
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_again_inside_the_margin() {
        let cache = TokenCache::new();
        let refreshes = AtomicUsize::new(0);
        let lifetime = Duration::from_secs(10 * 60);

        let first = cache
            .get_or_refresh(|| async { Ok(issue(&refreshes, lifetime)) })
            .await
            .expect("first");
        tokio::time::advance(Duration::from_secs(4 * 60)).await;
        let cached = cache
            .get_or_refresh(|| async { Ok(issue(&refreshes, lifetime)) })
            .await
            .expect("cached");
        assert_eq!(first, cached);

        tokio::time::advance(Duration::from_secs(2 * 60)).await;
        let renewed = cache
            .get_or_refresh(|| async { Ok(issue(&refreshes, lifetime)) })
            .await
            .expect("renewed");
        assert_eq!(renewed, "t-2");
        assert_eq!(refreshes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_refresh_leaves_cache_empty() {
        let cache = TokenCache::new();
        let err = cache
            .get_or_refresh(|| async {
                Err(LarkError::Api {
                    code: 99991601,
                    msg: "bad secret".into(),
                })
            })
            .await
            .expect_err("refresh fails");
        assert!(err.is_auth_failure());

        let refreshes = AtomicUsize::new(0);
        let token = cache
            .get_or_refresh(|| async { Ok(issue(&refreshes, Duration::from_secs(7200))) })
            .await
            .expect("token");
        assert_eq!(token, "t-1");

        cache.invalidate().await;
        let token = cache
            .get_or_refresh(|| async { Ok(issue(&refreshes, Duration::from_secs(7200))) })
            .await
            .expect("token");
        assert_eq!(token, "t-2");
    }
}
