//! Cooperative cancellation for dispatches.
//!
//! A [`CancellationSignal`] is created by the caller (usually the transport
//! layer, when a client disconnects) and travels with the request inside the
//! [`DispatchContext`](crate::DispatchContext). Every stage of the pipeline and
//! every collaborator that performs asynchronous work observes the same signal.
//!
//! # Example
//!
//! ```rust
//! use hermes_core::CancellationSignal;
//!
//! let signal = CancellationSignal::new();
//! let observer = signal.clone();
//!
//! signal.cancel();
//! assert!(observer.is_cancelled());
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::{HermesError, HermesResult};

/// A signal that can be used to request and await cancellation.
///
/// Clones share state: cancelling any clone cancels all of them.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    cancelled: Arc<AtomicBool>,
    sender: broadcast::Sender<()>,
}

impl CancellationSignal {
    /// Creates a new, untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            sender,
        }
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            // No receivers is fine: late observers see the flag.
            let _ = self.sender.send(());
        }
    }

    /// Returns `true` if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fails with [`HermesError::Cancelled`] if cancellation has been requested.
    ///
    /// ```rust
    /// use hermes_core::{CancellationSignal, HermesError};
    ///
    /// let signal = CancellationSignal::new();
    /// assert!(signal.ensure_active().is_ok());
    ///
    /// signal.cancel();
    /// assert!(matches!(signal.ensure_active(), Err(HermesError::Cancelled)));
    /// ```
    pub fn ensure_active(&self) -> HermesResult<()> {
        if self.is_cancelled() {
            Err(HermesError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Returns a future that completes once cancellation is requested.
    ///
    /// Completes immediately if the signal is already cancelled. The future
    /// does not borrow the signal, so it can be raced inside `tokio::select!`.
    pub fn cancelled(&self) -> impl Future<Output = ()> + Send + 'static {
        // Subscribe before reading the flag so a concurrent `cancel` is seen
        // either through the flag or through the channel.
        let mut receiver = self.sender.subscribe();
        let cancelled = Arc::clone(&self.cancelled);
        async move {
            if cancelled.load(Ordering::SeqCst) {
                return;
            }
            let _ = receiver.recv().await;
        }
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_signal_new() {
        let signal = CancellationSignal::new();
        assert!(!signal.is_cancelled());
        assert!(signal.ensure_active().is_ok());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let signal = CancellationSignal::new();
        signal.cancel();
        signal.cancel();
        assert!(signal.is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let signal = CancellationSignal::new();
        let clone = signal.clone();

        clone.cancel();

        assert!(signal.is_cancelled());
        assert!(matches!(signal.ensure_active(), Err(HermesError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancelled_completes_when_triggered() {
        let signal = CancellationSignal::new();
        let trigger = signal.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        tokio::time::timeout(Duration::from_secs(1), signal.cancelled())
            .await
            .expect("cancelled() should complete");
    }

    #[tokio::test]
    async fn test_cancelled_completes_immediately_if_triggered() {
        let signal = CancellationSignal::new();
        signal.cancel();

        tokio::time::timeout(Duration::from_millis(10), signal.cancelled())
            .await
            .expect("cancelled() should complete immediately");
    }

    #[tokio::test]
    async fn test_pending_waiter_is_woken_by_cancel() {
        let signal = CancellationSignal::new();
        let waiter = tokio::spawn(signal.cancelled());

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        signal.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be woken")
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_future_outlives_signal_borrow() {
        let signal = CancellationSignal::new();
        let waiting = signal.cancelled();
        let trigger = signal.clone();
        drop(signal);

        trigger.cancel();
        tokio::time::timeout(Duration::from_millis(50), waiting)
            .await
            .expect("cancelled() should complete after cancel");
    }

    #[tokio::test]
    async fn test_cancelled_stays_pending_without_trigger() {
        let signal = CancellationSignal::new();
        let result = tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(result.is_err());
    }
}
