//! Keyed, cancellable timed resources owned by the session controller.
//!
//! There is at most one pending timer per [`TimerKey`]. Scheduling a key that
//! is already pending replaces it, so the earlier instance never fires.
//! Expired keys are drained by the controller loop through [`TimerSet::next_expired`].

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use futures::StreamExt;
use tokio_util::time::{DelayQueue, delay_queue};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKey {
    OverlayHide,
    StallClock,
    RetryFire,
    SleepTimer,
    EntryDebounce,
}

impl TimerKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerKey::OverlayHide => "overlay-hide",
            TimerKey::StallClock => "stall-clock",
            TimerKey::RetryFire => "retry-fire",
            TimerKey::SleepTimer => "sleep-timer",
            TimerKey::EntryDebounce => "entry-debounce",
        }
    }
}

impl fmt::Display for TimerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Default)]
pub struct TimerSet {
    queue: DelayQueue<TimerKey>,
    pending: HashMap<TimerKey, delay_queue::Key>,
}

impl fmt::Debug for TimerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.pending.keys().map(TimerKey::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("TimerSet").field("pending", &keys).finish()
    }
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `key`, cancelling any pending instance first.
    pub fn schedule(&mut self, key: TimerKey, delay: Duration) {
        if let Some(queue_key) = self.pending.remove(&key) {
            self.queue.remove(&queue_key);
        }
        let queue_key = self.queue.insert(key, delay);
        self.pending.insert(key, queue_key);
    }

    /// Cancels `key`. Returns whether an instance was pending.
    pub fn cancel(&mut self, key: TimerKey) -> bool {
        match self.pending.remove(&key) {
            Some(queue_key) => {
                self.queue.remove(&queue_key);
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        self.queue.clear();
        self.pending.clear();
    }

    pub fn is_pending(&self, key: TimerKey) -> bool {
        self.pending.contains_key(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Waits for the next timer to fire.
    ///
    /// Never resolves while nothing is pending, which makes it safe to use
    /// as a `tokio::select!` branch.
    pub async fn next_expired(&mut self) -> TimerKey {
        loop {
            if self.pending.is_empty() {
                std::future::pending::<()>().await;
            }
            match self.queue.next().await {
                Some(expired) => {
                    let key = expired.into_inner();
                    self.pending.remove(&key);
                    return key;
                }
                None => self.pending.clear(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let mut timers = TimerSet::new();
        let start = Instant::now();
        timers.schedule(TimerKey::OverlayHide, Duration::from_secs(5));

        assert_eq!(timers.next_expired().await, TimerKey::OverlayHide);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert!(timers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending_instance() {
        let mut timers = TimerSet::new();
        let start = Instant::now();
        timers.schedule(TimerKey::SleepTimer, Duration::from_secs(15));
        timers.schedule(TimerKey::SleepTimer, Duration::from_secs(30));
        timers.schedule(TimerKey::RetryFire, Duration::from_secs(1));

        assert_eq!(timers.next_expired().await, TimerKey::RetryFire);
        assert_eq!(timers.next_expired().await, TimerKey::SleepTimer);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        assert!(timers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let mut timers = TimerSet::new();
        timers.schedule(TimerKey::StallClock, Duration::from_secs(1));
        timers.schedule(TimerKey::EntryDebounce, Duration::from_secs(2));
        assert!(timers.cancel(TimerKey::StallClock));
        assert!(!timers.cancel(TimerKey::StallClock));
        assert!(timers.is_pending(TimerKey::EntryDebounce));

        assert_eq!(timers.next_expired().await, TimerKey::EntryDebounce);

        timers.schedule(TimerKey::OverlayHide, Duration::from_secs(1));
        timers.cancel_all();
        let fired = tokio::time::timeout(Duration::from_secs(10), timers.next_expired()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_set_stays_pending() {
        let mut timers = TimerSet::new();
        let mut next = tokio_test::task::spawn(timers.next_expired());
        tokio_test::assert_pending!(next.poll());

        tokio::time::advance(Duration::from_secs(3600)).await;
        tokio_test::assert_pending!(next.poll());
    }
}
