//! Interrupt-to-worker notification channel
//!
//! A bounded queue of wake-up tokens. Interrupt handlers push with
//! [`Notifier::notify`], which never blocks and silently drops the token
//! when the queue is full. That is safe because the worker derives what to
//! read from the DMA position, not from the tokens: a dropped token only
//! delays a drain until the next idle-line or transfer interrupt.
//!
//! The same queue carries the shutdown token, and the notifier tracks the
//! lifecycle of the one worker that consumes it.

use core::sync::atomic::Ordering;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use portable_atomic::{AtomicBool, AtomicU32, AtomicU8};

/// Token carried by the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Notification {
    /// Something may have arrived; re-check the DMA position
    DataReady,
    /// The port is being torn down
    Shutdown,
}

/// Lifecycle of the receive worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WorkerState {
    /// No worker exists
    Idle,
    /// Worker is alive and serving notifications
    Running,
    /// Shutdown requested; worker exits at its next wake
    Stopping,
}

impl WorkerState {
    const fn to_raw(self) -> u8 {
        match self {
            WorkerState::Idle => 0,
            WorkerState::Running => 1,
            WorkerState::Stopping => 2,
        }
    }

    const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => WorkerState::Running,
            2 => WorkerState::Stopping,
            _ => WorkerState::Idle,
        }
    }
}

/// Result of asking for a running worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Claim {
    /// No worker existed; the caller must start one
    Spawn,
    /// A worker was still winding down and has been kept alive
    Reclaimed,
    /// A worker is already running
    Existing,
}

/// Bounded, lossy notification queue plus worker lifecycle
///
/// `Q` is the queue depth; the reference configuration uses
/// [`crate::config::NOTIFY_QUEUE_DEPTH`].
pub struct Notifier<const Q: usize> {
    channel: Channel<CriticalSectionRawMutex, Notification, Q>,
    open: AtomicBool,
    worker: AtomicU8,
    delivered: AtomicU32,
    dropped: AtomicU32,
}

impl<const Q: usize> Default for Notifier<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const Q: usize> Notifier<Q> {
    /// Create a closed notifier with no worker
    pub const fn new() -> Self {
        assert!(Q > 0, "notification queue depth must be non-zero");
        Self {
            channel: Channel::new(),
            open: AtomicBool::new(false),
            worker: AtomicU8::new(WorkerState::Idle.to_raw()),
            delivered: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Push a data-ready token. Interrupt safe, never blocks.
    ///
    /// Returns false when the token was not queued, either because the
    /// channel is closed or because the queue is full.
    pub fn notify(&self) -> bool {
        if !self.open.load(Ordering::Acquire) {
            return false;
        }
        match self.channel.try_send(Notification::DataReady) {
            Ok(()) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Wait for the next token
    pub async fn receive(&self) -> Notification {
        self.channel.receive().await
    }

    /// Whether interrupt notifications are currently accepted
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Start accepting notifications, discarding anything stale
    pub(crate) fn open(&self) {
        self.channel.clear();
        self.open.store(true, Ordering::Release);
    }

    /// Stop accepting notifications and wake the worker with a shutdown token
    pub(crate) fn close(&self) {
        self.open.store(false, Ordering::Release);
        self.channel.clear();
        // A full queue also wakes the worker, which then sees `Stopping`
        let _ = self.channel.try_send(Notification::Shutdown);
    }

    /// Current worker lifecycle state
    pub fn worker_state(&self) -> WorkerState {
        WorkerState::from_raw(self.worker.load(Ordering::Acquire))
    }

    /// Make sure exactly one worker will be running
    pub(crate) fn claim_worker(&self) -> Claim {
        if self.transition(WorkerState::Idle, WorkerState::Running) {
            Claim::Spawn
        } else if self.transition(WorkerState::Stopping, WorkerState::Running) {
            Claim::Reclaimed
        } else {
            Claim::Existing
        }
    }

    /// Undo a [`Claim::Spawn`] whose spawn failed
    pub(crate) fn abandon_worker(&self) {
        self.transition(WorkerState::Running, WorkerState::Idle);
    }

    /// Ask the running worker to exit. Returns false if none was running.
    pub(crate) fn request_stop(&self) -> bool {
        self.transition(WorkerState::Running, WorkerState::Stopping)
    }

    /// Called by the worker on every wake; true means it must exit now
    pub(crate) fn retire_if_stopping(&self) -> bool {
        self.transition(WorkerState::Stopping, WorkerState::Idle)
    }

    /// Tokens queued since creation
    pub fn delivered(&self) -> u32 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Tokens dropped on a full queue since creation
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Tokens currently waiting
    pub fn pending(&self) -> usize {
        self.channel.len()
    }

    fn transition(&self, from: WorkerState, to: WorkerState) -> bool {
        self.worker
            .compare_exchange(from.to_raw(), to.to_raw(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[test]
    fn test_closed_notifier_ignores_interrupts() {
        let notifier: Notifier<4> = Notifier::new();
        assert!(!notifier.notify());
        assert_eq!(notifier.pending(), 0);
        assert_eq!(notifier.dropped(), 0);
    }

    #[test]
    fn test_full_queue_drops_silently() {
        let notifier: Notifier<3> = Notifier::new();
        notifier.open();

        for _ in 0..3 {
            assert!(notifier.notify());
        }
        assert!(!notifier.notify());
        assert!(!notifier.notify());

        assert_eq!(notifier.pending(), 3);
        assert_eq!(notifier.delivered(), 3);
        assert_eq!(notifier.dropped(), 2);
    }

    #[test]
    fn test_receive_returns_queued_token() {
        let notifier: Notifier<2> = Notifier::new();
        notifier.open();
        notifier.notify();
        assert_eq!(block_on(notifier.receive()), Notification::DataReady);
    }

    #[test]
    fn test_close_replaces_backlog_with_shutdown() {
        let notifier: Notifier<2> = Notifier::new();
        notifier.open();
        notifier.notify();
        notifier.notify();

        notifier.close();
        assert!(!notifier.is_open());
        assert_eq!(notifier.pending(), 1);
        assert_eq!(block_on(notifier.receive()), Notification::Shutdown);
    }

    #[test]
    fn test_open_discards_stale_tokens() {
        let notifier: Notifier<2> = Notifier::new();
        notifier.close();
        assert_eq!(notifier.pending(), 1);

        notifier.open();
        assert!(notifier.is_open());
        assert_eq!(notifier.pending(), 0);
    }

    #[test]
    fn test_worker_lifecycle() {
        let notifier: Notifier<2> = Notifier::new();
        assert_eq!(notifier.worker_state(), WorkerState::Idle);

        assert_eq!(notifier.claim_worker(), Claim::Spawn);
        assert_eq!(notifier.claim_worker(), Claim::Existing);
        assert_eq!(notifier.worker_state(), WorkerState::Running);

        assert!(!notifier.retire_if_stopping());
        assert!(notifier.request_stop());
        assert!(!notifier.request_stop());
        assert_eq!(notifier.worker_state(), WorkerState::Stopping);

        assert!(notifier.retire_if_stopping());
        assert_eq!(notifier.worker_state(), WorkerState::Idle);
    }

    #[test]
    fn test_stopping_worker_is_reclaimed_not_duplicated() {
        let notifier: Notifier<2> = Notifier::new();
        notifier.claim_worker();
        notifier.request_stop();

        assert_eq!(notifier.claim_worker(), Claim::Reclaimed);
        // The old worker wakes on the shutdown token but keeps running
        assert!(!notifier.retire_if_stopping());
        assert_eq!(notifier.worker_state(), WorkerState::Running);
    }

    #[test]
    fn test_abandon_after_failed_spawn() {
        let notifier: Notifier<2> = Notifier::new();
        assert_eq!(notifier.claim_worker(), Claim::Spawn);
        notifier.abandon_worker();
        assert_eq!(notifier.worker_state(), WorkerState::Idle);
    }
}
