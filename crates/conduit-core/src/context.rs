// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Deadline and cancellation context threaded through every blocking call.
//!
//! A [`FetchContext`] carries an optional deadline and a shared
//! [`CancelToken`]. Drivers wrap each network future with
//! [`FetchContext::run`], which converts deadline expiry into
//! [`DriverError::Timeout`] and cancellation into [`DriverError::Canceled`].
//!
//! ```text
//!   parent ctx ──with_timeout()──► child ctx (earlier deadline wins)
//!        │                              │
//!        └──────── shared CancelToken ──┘
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

use crate::error::DriverError;

// =============================================================================
// CancelToken
// =============================================================================

/// Shared, clonable cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    canceled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    /// Creates a token that is not canceled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token and wakes every waiter. Idempotent.
    pub fn cancel(&self) {
        if self
            .inner
            .canceled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            debug!("Cancellation requested");
            self.inner.notify.notify_waiters();
        }
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called.
    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::SeqCst)
    }

    /// Resolves when the token is canceled.
    pub async fn canceled(&self) {
        loop {
            // Registered before the flag check so a concurrent cancel is not missed.
            let notified = self.inner.notify.notified();
            if self.is_canceled() {
                return;
            }
            notified.await;
        }
    }
}

// =============================================================================
// FetchContext
// =============================================================================

/// Deadline plus cancellation for one request.
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    deadline: Option<Instant>,
    cancel: CancelToken,
}

impl FetchContext {
    /// Creates a context without deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context that expires after `timeout`.
    ///
    /// A timeout too large to represent as an instant means no deadline.
    pub fn with_deadline_in(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            cancel: CancelToken::new(),
        }
    }

    /// Creates a context bound to an existing cancel token.
    pub fn with_cancel(cancel: CancelToken) -> Self {
        Self {
            deadline: None,
            cancel,
        }
    }

    /// Derives a child context whose deadline is at most `timeout` from now.
    ///
    /// The child shares the parent's cancel token; an earlier parent
    /// deadline is kept.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = match (self.deadline, Instant::now().checked_add(timeout)) {
            (Some(existing), Some(candidate)) => Some(existing.min(candidate)),
            (existing, None) => existing,
            (None, candidate) => candidate,
        };
        Self {
            deadline,
            cancel: self.cancel.clone(),
        }
    }

    /// Returns the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline; `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Returns `true` when the deadline has passed.
    pub fn is_expired(&self) -> bool {
        matches!(self.deadline, Some(d) if d <= Instant::now())
    }

    /// The cancel token shared with the parent.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Cancels this context and every context sharing its token.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Fails fast if the context is already done.
    ///
    /// Cancellation takes precedence over an expired deadline.
    pub fn check(&self, operation: &str) -> Result<(), DriverError> {
        if self.cancel.is_canceled() {
            return Err(DriverError::canceled(operation));
        }
        if self.is_expired() {
            return Err(DriverError::timeout(operation));
        }
        Ok(())
    }

    /// Runs `fut` until it completes, the deadline passes, or the context is
    /// canceled.
    ///
    /// The future is never polled when the context is already done.
    pub async fn run<T, F>(&self, operation: &str, fut: F) -> Result<T, DriverError>
    where
        F: Future<Output = Result<T, DriverError>>,
    {
        self.check(operation)?;

        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.canceled() => Err(DriverError::canceled(operation)),
            _ = deadline => Err(DriverError::timeout(operation)),
            result = fut => result,
        }
    }

    /// Context used for best-effort cleanup after a parent was canceled.
    ///
    /// The returned context has a fresh cancel token and a short deadline, so
    /// `disconnect` can still run after the parent request gave up.
    pub fn detached_cleanup(&self, grace: Duration) -> Self {
        Self::with_deadline_in(grace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_expired_context_skips_future() {
        let ctx = FetchContext::with_deadline_in(Duration::ZERO);
        let polled = Arc::new(AtomicBool::new(false));
        let flag = polled.clone();

        let result: Result<(), _> = ctx
            .run("connect", async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(DriverError::Timeout { .. })));
        assert!(!polled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_deadline_interrupts_slow_future() {
        let ctx = FetchContext::with_deadline_in(Duration::from_millis(20));
        let result: Result<(), _> = ctx
            .run("fetch", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        match result {
            Err(DriverError::Timeout { operation }) => assert_eq!(operation, "fetch"),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancel_propagates_to_child() {
        let parent = FetchContext::new();
        let child = parent.with_timeout(Duration::from_secs(30));

        let canceller = parent.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result: Result<(), _> = child
            .run("fetch", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(DriverError::Canceled { .. })));
    }

    #[test]
    fn test_child_keeps_earlier_deadline() {
        let parent = FetchContext::with_deadline_in(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[test]
    fn test_unrepresentable_timeout_means_no_deadline() {
        let ctx = FetchContext::with_deadline_in(Duration::MAX);
        assert_eq!(ctx.deadline(), None);
        assert!(ctx.check("connect").is_ok());

        let child = FetchContext::new().with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(child.deadline(), None);

        let parent = FetchContext::with_deadline_in(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::MAX);
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[tokio::test]
    async fn test_unbounded_child_still_runs() {
        let ctx = FetchContext::new().with_timeout(Duration::from_secs(u64::MAX));
        let value = ctx.run("fetch", async { Ok::<_, DriverError>(3) }).await;
        assert_eq!(value.unwrap(), 3);
    }

    #[test]
    fn test_check_prefers_cancellation() {
        let ctx = FetchContext::with_deadline_in(Duration::ZERO);
        ctx.cancel();
        assert!(matches!(ctx.check("x"), Err(DriverError::Canceled { .. })));
    }

    #[tokio::test]
    async fn test_completed_future_passes_through() {
        let ctx = FetchContext::with_deadline_in(Duration::from_secs(5));
        let value = ctx.run("fetch", async { Ok::<_, DriverError>(7) }).await;
        assert_eq!(value.unwrap(), 7);
    }
}
