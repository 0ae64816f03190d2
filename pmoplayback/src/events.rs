use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

use crate::model::{PlayableItem, SessionId};
use crate::snapshot::SessionStatus;

/// Why a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    UserDismissed,
    SleepTimer,
    /// An on-demand item played to its end.
    EndOfStream,
    /// Every handle was dropped without an explicit dismiss.
    Closed,
}

/// Discrete notifications for the rendering layer.
///
/// Snapshots carry the full state; these mark the moments a UI usually
/// reacts to (toasts, navigation, closing the player).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    StatusChanged {
        session: SessionId,
        status: SessionStatus,
    },
    /// Buffering exceeded the configured threshold.
    SlowStream { session: SessionId },
    /// Retry and Try-alternate-engine are now offered.
    ManualRecoveryOffered { session: SessionId },
    /// A channel switch started a new session.
    ItemChanged {
        previous: SessionId,
        session: SessionId,
        item: PlayableItem,
    },
    /// Terminal: the player should be torn down.
    Ended {
        session: SessionId,
        reason: EndReason,
    },
}

#[derive(Clone, Default)]
pub struct SessionEventBus {
    subscribers: Arc<Mutex<Vec<Sender<SessionEvent>>>>,
}

impl std::fmt::Debug for SessionEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEventBus")
            .field("subscribers", &self.subscribers.lock().len())
            .finish()
    }
}

impl SessionEventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        let (tx, rx) = unbounded::<SessionEvent>();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Sends to every live subscriber and forgets the disconnected ones.
    pub fn broadcast(&self, event: SessionEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}
