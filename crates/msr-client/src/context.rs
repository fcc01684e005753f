//! Per-call deadline and cancellation.
//!
//! Every operation takes a [`CallContext`]. The transport races each HTTP
//! exchange against the context's deadline and cancellation signal, and
//! refuses to start an exchange once either has fired.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::TransportCause;

/// Deadline and cancellation signal for one logical operation.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Fires the cancellation signal of the contexts created with it.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Cancels every context sharing this handle.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CallContext {
    /// A context that never expires and cannot be cancelled.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Creates a cancellable context and the handle that cancels it.
    ///
    /// # Examples
    ///
    /// ```
    /// use msr_client::CallContext;
    ///
    /// let (ctx, handle) = CallContext::cancellable();
    /// assert!(!ctx.is_done());
    /// handle.cancel();
    /// assert!(ctx.is_done());
    /// ```
    #[must_use]
    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            deadline: None,
            cancel: Some(rx),
        };
        (ctx, CancelHandle { tx })
    }

    /// Returns a copy of this context that also expires at `deadline`.
    ///
    /// The earlier of the existing and the new deadline wins.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |d| d.min(deadline)));
        self
    }

    /// Returns a copy of this context that expires after `timeout`.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true once the context is cancelled or past its deadline.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.interruption().is_some()
    }

    /// Returns why the context is done, if it is.
    pub(crate) fn interruption(&self) -> Option<TransportCause> {
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Some(TransportCause::Cancelled);
        }
        if self.deadline.is_some_and(|d| d <= Instant::now()) {
            return Some(TransportCause::DeadlineExceeded);
        }
        None
    }

    /// Runs `exchange` unless the context fires first.
    pub(crate) async fn guard<F, T>(&self, exchange: F) -> Result<T, TransportCause>
    where
        F: Future<Output = Result<T, reqwest::Error>>,
    {
        if let Some(cause) = self.interruption() {
            return Err(cause);
        }

        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            result = exchange => result.map_err(TransportCause::Http),
            () = cancelled(self.cancel.clone()) => Err(TransportCause::Cancelled),
            () = expired => Err(TransportCause::DeadlineExceeded),
        }
    }
}

/// Resolves when the signal fires; never resolves if the handle is dropped
/// without cancelling.
async fn cancelled(rx: Option<watch::Receiver<bool>>) {
    if let Some(mut rx) = rx {
        if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await;
}
