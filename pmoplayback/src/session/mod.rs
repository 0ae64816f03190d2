//! Playback session: the serialized controller task and its handles.
//!
//! [`PlaybackSession::spawn`] starts the controller for one item and returns
//! the session. Any number of [`SessionHandle`] clones can submit intents,
//! watch snapshots and subscribe to events. Everything the controller reacts
//! to (intents, backend events, collaborator answers) travels through one
//! input channel, so transitions never interleave.

mod controller;
mod number_entry;
mod switcher;

use std::sync::Arc;

use anyhow::{Result, anyhow};
use crossbeam_channel::Receiver;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::backend::Backends;
use crate::config::PlaybackConfig;
use crate::directory::ChannelDirectory;
use crate::errors::PlaybackError;
use crate::events::{SessionEvent, SessionEventBus};
use crate::model::{Channel, PlayableItem};
use crate::progress::ProgressStore;
use crate::router::StreamRouter;
use crate::sleep_timer::SleepDuration;
use crate::snapshot::SessionSnapshot;

pub(crate) use controller::Input;
use controller::SessionController;

/// Direction of a relative seek.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekDirection {
    Backward,
    Forward,
}

/// What the user (or the hosting view) asks of the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    /// The player view appeared; starts the session when idle.
    Appear,
    Dismiss,
    Retry,
    TryAlternateEngine,
    ToggleOverlay,
    /// `None` turns the sleep timer off.
    SelectSleepTimer(Option<SleepDuration>),
    DigitPressed(char),
    ConfirmEntry,
    CancelEntry,
    ShowSwitcher,
    HideSwitcher,
    SelectChannel(Channel),
    /// Absolute seek from the scrubber.
    Seek(u64),
    SeekRelative(SeekDirection),
    TogglePlayPause,
}

/// Collaborators injected into every session.
#[derive(Clone)]
pub struct Collaborators {
    pub router: Arc<dyn StreamRouter>,
    pub directory: Arc<dyn ChannelDirectory>,
    pub progress: Arc<dyn ProgressStore>,
    pub backends: Backends,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("backends", &self.backends)
            .finish_non_exhaustive()
    }
}

/// Tells the controller when the last handle is gone.
#[derive(Debug)]
struct HandleGuard {
    tx: mpsc::UnboundedSender<Input>,
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(Input::HandlesDropped);
    }
}

/// Intent surface and observation point of a running session.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Input>,
    snapshots: watch::Receiver<SessionSnapshot>,
    events: SessionEventBus,
    _guard: Arc<HandleGuard>,
}

impl SessionHandle {
    pub fn submit(&self, intent: Intent) -> Result<(), PlaybackError> {
        self.tx
            .send(Input::Intent(intent))
            .map_err(|_| PlaybackError::SessionClosed)
    }

    pub fn appear(&self) -> Result<(), PlaybackError> {
        self.submit(Intent::Appear)
    }

    pub fn dismiss(&self) -> Result<(), PlaybackError> {
        self.submit(Intent::Dismiss)
    }

    pub fn retry(&self) -> Result<(), PlaybackError> {
        self.submit(Intent::Retry)
    }

    pub fn try_alternate_engine(&self) -> Result<(), PlaybackError> {
        self.submit(Intent::TryAlternateEngine)
    }

    pub fn toggle_overlay(&self) -> Result<(), PlaybackError> {
        self.submit(Intent::ToggleOverlay)
    }

    pub fn select_sleep_timer(&self, duration: Option<SleepDuration>) -> Result<(), PlaybackError> {
        self.submit(Intent::SelectSleepTimer(duration))
    }

    pub fn digit_pressed(&self, digit: char) -> Result<(), PlaybackError> {
        self.submit(Intent::DigitPressed(digit))
    }

    pub fn confirm_entry(&self) -> Result<(), PlaybackError> {
        self.submit(Intent::ConfirmEntry)
    }

    pub fn cancel_entry(&self) -> Result<(), PlaybackError> {
        self.submit(Intent::CancelEntry)
    }

    pub fn show_switcher(&self) -> Result<(), PlaybackError> {
        self.submit(Intent::ShowSwitcher)
    }

    pub fn hide_switcher(&self) -> Result<(), PlaybackError> {
        self.submit(Intent::HideSwitcher)
    }

    pub fn select_channel(&self, channel: Channel) -> Result<(), PlaybackError> {
        self.submit(Intent::SelectChannel(channel))
    }

    pub fn seek(&self, position_ms: u64) -> Result<(), PlaybackError> {
        self.submit(Intent::Seek(position_ms))
    }

    pub fn seek_relative(&self, direction: SeekDirection) -> Result<(), PlaybackError> {
        self.submit(Intent::SeekRelative(direction))
    }

    pub fn toggle_play_pause(&self) -> Result<(), PlaybackError> {
        self.submit(Intent::TogglePlayPause)
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified on every snapshot change.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn subscribe_events(&self) -> Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// A spawned session controller.
#[derive(Debug)]
pub struct PlaybackSession {
    handle: SessionHandle,
    join_handle: JoinHandle<()>,
}

impl PlaybackSession {
    /// Spawns the controller for `item` on the current tokio runtime.
    ///
    /// The session stays `Idle` until the first [`Intent::Appear`].
    pub fn spawn(
        item: PlayableItem,
        config: PlaybackConfig,
        collaborators: Collaborators,
    ) -> Result<Self, PlaybackError> {
        config.validate()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let events = SessionEventBus::new();
        let controller = SessionController::new(item, config, collaborators, tx.clone(), events.clone());
        let snapshots = controller.subscribe();

        let join_handle = tokio::spawn(controller.run(rx));

        let handle = SessionHandle {
            tx: tx.clone(),
            snapshots,
            events,
            _guard: Arc::new(HandleGuard { tx }),
        };

        Ok(Self {
            handle,
            join_handle,
        })
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Waits until the controller task has ended.
    ///
    /// The handle owned by the session is released first. If no clone
    /// obtained from [`PlaybackSession::handle`] is still alive, that release
    /// is the last one and the session ends right away with
    /// [`EndReason::Closed`](crate::EndReason::Closed). Keep a handle around
    /// to wait for a dismissal or the sleep timer instead.
    pub async fn wait(self) -> Result<()> {
        let Self {
            handle,
            join_handle,
        } = self;
        drop(handle);

        if let Err(err) = join_handle.await {
            if err.is_cancelled() {
                warn!("Playback session task cancelled: {err}");
                return Ok(());
            }
            return Err(anyhow!("Playback session join error: {}", err));
        }
        Ok(())
    }
}
