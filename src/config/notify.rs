//! Single-slot change notifications.
//!
//! # Responsibilities
//! - Let any thread announce an event ("bootstrap key changed", "restart")
//! - Let listeners wait for it without polling, from threads or async tasks
//! - Buffer at most one pending signal per channel
//!
//! # Overflow policy
//! ```text
//! Coalesce:         send while pending → absorbed, still one pending (never blocks)
//! Block{timeout}:   send while pending → wait for a receiver to drain the slot,
//!                   give up with NotifyError::Timeout after `timeout`
//! ```
//!
//! # Design Decisions
//! - Slot is a `bool` under a `Mutex`; a `Condvar` wakes blocked threads and a
//!   `tokio::sync::Notify` wakes async receivers
//! - Receivers consume the signal; each signal wakes exactly one consumer

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;

use crate::observability::metrics;

/// What a send does when a signal is already pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Latest-wins: the new signal merges into the pending one.
    Coalesce,
    /// Backpressure: wait up to `timeout` for a receiver to drain the slot.
    Block { timeout: Duration },
}

/// Result of a successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The slot was empty and now holds the signal.
    Delivered,
    /// A signal was already pending; the two were merged.
    Coalesced,
}

impl SendOutcome {
    fn as_str(self) -> &'static str {
        match self {
            SendOutcome::Delivered => "delivered",
            SendOutcome::Coalesced => "coalesced",
        }
    }
}

/// Errors from sending on a blocking channel.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    /// A signal is pending and the caller asked not to wait.
    #[error("notification slot is full")]
    Full,

    /// No receiver drained the pending signal in time.
    #[error("pending notification not consumed within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Default)]
struct Slot {
    pending: Mutex<bool>,
    changed: Condvar,
    wake: Notify,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn raise(&self, mut pending: MutexGuard<'_, bool>) {
        *pending = true;
        drop(pending);
        self.changed.notify_all();
        self.wake.notify_waiters();
    }

    fn take(&self, mut pending: MutexGuard<'_, bool>) -> bool {
        if !*pending {
            return false;
        }
        *pending = false;
        drop(pending);
        // Wake senders blocked on a full slot.
        self.changed.notify_all();
        true
    }
}

/// Sending side of a single-slot notification channel.
#[derive(Debug)]
pub struct NotificationChannel {
    name: &'static str,
    policy: OverflowPolicy,
    slot: Arc<Slot>,
}

impl NotificationChannel {
    /// Create a channel with an empty slot.
    pub fn new(name: &'static str, policy: OverflowPolicy) -> Self {
        Self {
            name,
            policy,
            slot: Arc::new(Slot::default()),
        }
    }

    /// Channel name used in logs and metrics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Send one signal according to the channel's overflow policy.
    ///
    /// With `Block`, this parks the calling thread; do not call it from an
    /// async task while the slot may be full.
    pub fn notify(&self) -> Result<SendOutcome, NotifyError> {
        let outcome = match self.policy {
            OverflowPolicy::Coalesce => Ok(self.notify_coalescing()),
            OverflowPolicy::Block { timeout } => {
                self.notify_timeout(timeout).map(|()| SendOutcome::Delivered)
            }
        };
        match &outcome {
            Ok(o) => metrics::record_notification(self.name, o.as_str()),
            Err(NotifyError::Full) => metrics::record_notification(self.name, "full"),
            Err(NotifyError::Timeout(_)) => metrics::record_notification(self.name, "timeout"),
        }
        outcome
    }

    /// Send without ever waiting; fails with `Full` if a signal is pending.
    pub fn try_notify(&self) -> Result<(), NotifyError> {
        let pending = self.slot.lock();
        if *pending {
            return Err(NotifyError::Full);
        }
        self.slot.raise(pending);
        Ok(())
    }

    /// Send, waiting at most `timeout` for a pending signal to be drained.
    pub fn notify_timeout(&self, timeout: Duration) -> Result<(), NotifyError> {
        let pending = self.slot.lock();
        let (pending, _) = self
            .slot
            .changed
            .wait_timeout_while(pending, timeout, |p| *p)
            .unwrap_or_else(PoisonError::into_inner);
        if *pending {
            tracing::warn!(
                channel = self.name,
                timeout_ms = timeout.as_millis() as u64,
                "Notification not consumed in time"
            );
            return Err(NotifyError::Timeout(timeout));
        }
        self.slot.raise(pending);
        Ok(())
    }

    fn notify_coalescing(&self) -> SendOutcome {
        let pending = self.slot.lock();
        let outcome = if *pending {
            tracing::debug!(channel = self.name, "Notification coalesced with pending signal");
            SendOutcome::Coalesced
        } else {
            SendOutcome::Delivered
        };
        self.slot.raise(pending);
        outcome
    }

    /// True if a signal is waiting to be consumed.
    pub fn is_pending(&self) -> bool {
        *self.slot.lock()
    }

    /// Receive-only handle for listeners.
    pub fn watch(&self) -> Watch {
        Watch {
            name: self.name,
            slot: Arc::clone(&self.slot),
        }
    }
}

/// Receiving side of a [`NotificationChannel`].
///
/// Cheap to clone; all clones compete for the same single signal.
#[derive(Debug, Clone)]
pub struct Watch {
    name: &'static str,
    slot: Arc<Slot>,
}

impl Watch {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Consume the pending signal if there is one.
    pub fn try_recv(&self) -> bool {
        self.slot.take(self.slot.lock())
    }

    /// Park the current thread until a signal arrives, then consume it.
    pub fn recv_blocking(&self) {
        let pending = self.slot.lock();
        let pending = self
            .slot
            .changed
            .wait_while(pending, |p| !*p)
            .unwrap_or_else(PoisonError::into_inner);
        self.slot.take(pending);
    }

    /// Like [`Watch::recv_blocking`] but gives up after `timeout`.
    ///
    /// Returns true if a signal was consumed.
    pub fn recv_timeout(&self, timeout: Duration) -> bool {
        let pending = self.slot.lock();
        let (pending, _) = self
            .slot
            .changed
            .wait_timeout_while(pending, timeout, |p| !*p)
            .unwrap_or_else(PoisonError::into_inner);
        self.slot.take(pending)
    }

    /// Wait asynchronously for a signal, then consume it.
    pub async fn recv(&self) {
        loop {
            let notified = self.slot.wake.notified();
            tokio::pin!(notified);
            // Register before checking so a signal raised in between still wakes us.
            notified.as_mut().enable();
            if self.try_recv() {
                return;
            }
            notified.await;
        }
    }

    /// True if both handles observe the same channel.
    pub fn same_channel(&self, other: &Watch) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_coalesce_keeps_one_pending_signal() {
        let channel = NotificationChannel::new("restart", OverflowPolicy::Coalesce);
        let watch = channel.watch();

        assert_eq!(channel.notify(), Ok(SendOutcome::Delivered));
        assert_eq!(channel.notify(), Ok(SendOutcome::Coalesced));

        assert!(watch.try_recv());
        assert!(!watch.try_recv());
    }

    #[test]
    fn test_try_notify_reports_full() {
        let channel = NotificationChannel::new(
            "key",
            OverflowPolicy::Block { timeout: Duration::from_secs(1) },
        );
        assert_eq!(channel.try_notify(), Ok(()));
        assert_eq!(channel.try_notify(), Err(NotifyError::Full));
        assert!(channel.watch().try_recv());
        assert_eq!(channel.try_notify(), Ok(()));
    }

    #[test]
    fn test_blocking_send_times_out_without_receiver() {
        let timeout = Duration::from_millis(50);
        let channel = NotificationChannel::new("key", OverflowPolicy::Block { timeout });
        channel.notify().unwrap();

        let start = Instant::now();
        assert_eq!(channel.notify(), Err(NotifyError::Timeout(timeout)));
        assert!(start.elapsed() >= timeout);
        assert!(channel.is_pending());
    }

    #[test]
    fn test_blocking_send_resumes_after_drain() {
        let channel = Arc::new(NotificationChannel::new(
            "key",
            OverflowPolicy::Block { timeout: Duration::from_secs(5) },
        ));
        let watch = channel.watch();
        channel.notify().unwrap();

        let sender = {
            let channel = channel.clone();
            thread::spawn(move || channel.notify())
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!sender.is_finished());

        assert!(watch.try_recv());
        assert_eq!(sender.join().unwrap(), Ok(SendOutcome::Delivered));
        assert!(watch.try_recv());
    }

    #[test]
    fn test_recv_blocking_wakes_on_signal() {
        let channel = NotificationChannel::new("restart", OverflowPolicy::Coalesce);
        let watch = channel.watch();
        let waiter = thread::spawn(move || watch.recv_blocking());

        thread::sleep(Duration::from_millis(20));
        channel.notify().unwrap();
        waiter.join().unwrap();
        assert!(!channel.is_pending());
    }

    #[test]
    fn test_recv_timeout_without_signal() {
        let channel = NotificationChannel::new("restart", OverflowPolicy::Coalesce);
        assert!(!channel.watch().recv_timeout(Duration::from_millis(10)));
    }

    #[tokio::test]
    async fn test_async_recv() {
        let channel = Arc::new(NotificationChannel::new("restart", OverflowPolicy::Coalesce));
        let watch = channel.watch();
        let waiter = tokio::spawn(async move { watch.recv().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        channel.notify().unwrap();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("receiver not woken")
            .unwrap();
        assert!(!channel.is_pending());
    }

    #[test]
    fn test_watch_identity() {
        let a = NotificationChannel::new("a", OverflowPolicy::Coalesce);
        let b = NotificationChannel::new("b", OverflowPolicy::Coalesce);
        assert!(a.watch().same_channel(&a.watch()));
        assert!(!a.watch().same_channel(&b.watch()));
    }
}
