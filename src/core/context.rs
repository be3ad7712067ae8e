//! Cancellable execution context
//!
//! One `CallContext` is created per top-level call and handed down to every
//! nested sub-agent and adapter invocation beneath it. Cancelling it aborts all
//! in-flight and future work in the tree.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context stopped a pending operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    #[error("context cancelled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation handle plus an optional deadline
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// Create a fresh root context
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a context that is cancelled whenever this one is
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derive a context that also expires after `timeout`.
    /// An earlier inherited deadline still applies. A timeout too large to
    /// represent as an instant adds no deadline of its own.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = match (self.deadline, Instant::now().checked_add(timeout)) {
            (Some(inherited), Some(own)) => Some(inherited.min(own)),
            (inherited, None) => inherited,
            (None, own) => own,
        };
        Self {
            token: self.token.child_token(),
            deadline,
        }
    }

    /// Cancel this context and every context derived from it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Reason this context is finished, if it is
    pub fn interrupted(&self) -> Option<Interrupted> {
        if self.token.is_cancelled() {
            Some(Interrupted::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(Interrupted::DeadlineExceeded)
        } else {
            None
        }
    }

    pub fn is_done(&self) -> bool {
        self.interrupted().is_some()
    }

    /// Drive `fut` to completion unless the context is cancelled or expires first
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        if let Some(reason) = self.interrupted() {
            return Err(reason);
        }

        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Interrupted::Cancelled),
            _ = expired => Err(Interrupted::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}
