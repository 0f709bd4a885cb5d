//! Per-query context: identity, cancellation and deadline.
//!
//! A [`QueryContext`] travels from the caller through the adapter and the
//! wrapper down to the backend client. The adapter races backend work
//! against it with [`QueryContext::run`], so a cancelled query returns
//! promptly and never reaches the cache.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{DiscoveryError, Result};

#[derive(Debug, Clone)]
pub struct QueryContext {
    id: Uuid,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for QueryContext {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Use an externally owned token, e.g. one cancelled on shutdown.
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancel: token,
            ..Self::new()
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Keeps the earlier of the existing and the new deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// A context for a sub-query: cancelled with its parent, same deadline, new id.
    pub fn child(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail fast if the query is already cancelled or past its deadline.
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(DiscoveryError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(DiscoveryError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the query is cancelled or times out first.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(DiscoveryError::Cancelled),
            () = deadline => Err(DiscoveryError::DeadlineExceeded),
            result = fut => result,
        }
    }
}
