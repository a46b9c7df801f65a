use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::auth::user_fingerprint;
use crate::config::AppConfig;
use crate::error::AppError;

/// Fixed-window limiter keyed by endpoint and user.
#[derive(Clone)]
pub struct EndpointRateLimiter {
    state: Arc<Mutex<HashMap<String, RateWindow>>>,
    window: Duration,
    quote_write_limit: u32,
    avatar_upload_limit: u32,
    metrics: Arc<RateLimitMetrics>,
}

#[derive(Clone, Copy)]
pub enum ProtectedEndpoint {
    QuoteWrite,
    AvatarUpload,
}

#[derive(Default)]
struct RateLimitMetrics {
    quote_write_allowed: AtomicU64,
    quote_write_limited: AtomicU64,
    avatar_upload_allowed: AtomicU64,
    avatar_upload_limited: AtomicU64,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct RateLimitMetricsSnapshot {
    pub quote_write_allowed: u64,
    pub quote_write_limited: u64,
    pub avatar_upload_allowed: u64,
    pub avatar_upload_limited: u64,
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    started_at: Instant,
    count: u32,
}

impl EndpointRateLimiter {
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.rate_limit_window,
            config.quote_write_rate_limit_per_window,
            config.avatar_upload_rate_limit_per_window,
        )
    }

    pub fn new(window: Duration, quote_write_limit: u32, avatar_upload_limit: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
            window,
            quote_write_limit,
            avatar_upload_limit,
            metrics: Arc::new(RateLimitMetrics::default()),
        }
    }

    pub async fn check(&self, endpoint: ProtectedEndpoint, user_id: &str) -> Result<(), AppError> {
        let limit = match endpoint {
            ProtectedEndpoint::QuoteWrite => self.quote_write_limit,
            ProtectedEndpoint::AvatarUpload => self.avatar_upload_limit,
        };

        let key = format!("{}:{user_id}", endpoint.label());
        let now = Instant::now();
        let mut guard = self.state.lock().await;
        // Expired windows would restart at zero anyway.
        guard.retain(|_, window| now.duration_since(window.started_at) < self.window);
        let entry = guard.entry(key).or_insert(RateWindow {
            started_at: now,
            count: 0,
        });

        if entry.count >= limit {
            let retry_after_secs = self
                .window
                .saturating_sub(now.duration_since(entry.started_at))
                .as_secs();
            self.mark(endpoint, false);
            tracing::warn!(
                endpoint = endpoint.label(),
                user = user_fingerprint(user_id),
                retry_after_secs,
                "Rate limit exceeded"
            );
            return Err(AppError::too_many_requests(
                "Rate limit exceeded, please try again shortly",
                retry_after_secs,
            ));
        }

        entry.count += 1;
        self.mark(endpoint, true);
        Ok(())
    }

    pub fn metrics_snapshot(&self) -> RateLimitMetricsSnapshot {
        RateLimitMetricsSnapshot {
            quote_write_allowed: self.metrics.quote_write_allowed.load(Ordering::Relaxed),
            quote_write_limited: self.metrics.quote_write_limited.load(Ordering::Relaxed),
            avatar_upload_allowed: self.metrics.avatar_upload_allowed.load(Ordering::Relaxed),
            avatar_upload_limited: self.metrics.avatar_upload_limited.load(Ordering::Relaxed),
        }
    }

    #[cfg(test)]
    async fn tracked_windows(&self) -> usize {
        self.state.lock().await.len()
    }

    fn mark(&self, endpoint: ProtectedEndpoint, allowed: bool) {
        let counter = match (endpoint, allowed) {
            (ProtectedEndpoint::QuoteWrite, true) => &self.metrics.quote_write_allowed,
            (ProtectedEndpoint::QuoteWrite, false) => &self.metrics.quote_write_limited,
            (ProtectedEndpoint::AvatarUpload, true) => &self.metrics.avatar_upload_allowed,
            (ProtectedEndpoint::AvatarUpload, false) => &self.metrics.avatar_upload_limited,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl ProtectedEndpoint {
    pub const fn label(self) -> &'static str {
        match self {
            Self::QuoteWrite => "quote_write",
            Self::AvatarUpload => "avatar_upload",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rate_limiter_blocks_after_limit() {
        let limiter = EndpointRateLimiter::new(Duration::from_secs(60), 2, 1);

        limiter
            .check(ProtectedEndpoint::QuoteWrite, "user-a")
            .await
            .unwrap();
        limiter
            .check(ProtectedEndpoint::QuoteWrite, "user-a")
            .await
            .unwrap();

        let err = limiter
            .check(ProtectedEndpoint::QuoteWrite, "user-a")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TooManyRequests(_, _)));

        // Other users and endpoints have their own windows.
        limiter
            .check(ProtectedEndpoint::QuoteWrite, "user-b")
            .await
            .unwrap();
        limiter
            .check(ProtectedEndpoint::AvatarUpload, "user-a")
            .await
            .unwrap();

        let metrics = limiter.metrics_snapshot();
        assert_eq!(metrics.quote_write_allowed, 3);
        assert_eq!(metrics.quote_write_limited, 1);
        assert_eq!(metrics.avatar_upload_allowed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_windows_are_evicted() {
        let limiter = EndpointRateLimiter::new(Duration::from_secs(60), 1, 1);
        for user in ["user-a", "user-b", "user-c"] {
            limiter
                .check(ProtectedEndpoint::QuoteWrite, user)
                .await
                .unwrap();
        }
        assert_eq!(limiter.tracked_windows().await, 3);
        assert!(limiter
            .check(ProtectedEndpoint::QuoteWrite, "user-a")
            .await
            .is_err());

        tokio::time::advance(Duration::from_secs(61)).await;
        limiter
            .check(ProtectedEndpoint::QuoteWrite, "user-a")
            .await
            .unwrap();
        assert_eq!(limiter.tracked_windows().await, 1);
    }
}
