//! Adapter for decoders living in the host application.
//!
//! [`BridgeAdapter`] is handed to the session; the matching [`AdapterPort`]
//! stays with the decoder (typically a UI or media thread). Commands flow out
//! through a `crossbeam-channel`, events flow back through the port and are
//! routed to the sink of the most recent `play`.

use std::sync::Arc;

use async_trait::async_trait;
use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;
use tracing::debug;

use super::{BackendAdapter, BackendEvent, BackendStatus, EventSink, PlayRequest};
use crate::errors::{BackendError, StreamErrorKind};
use crate::model::Engine;

/// Command as seen by the decoder side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdapterCommand {
    Play(PlayRequest),
    Stop,
    Seek(u64),
    SetPaused(bool),
}

#[derive(Debug, Default)]
struct BridgeState {
    sink: Option<EventSink>,
    /// The current item reached a ready (playing) state at least once.
    item_ready: bool,
}

#[derive(Debug)]
pub struct BridgeAdapter {
    engine: Engine,
    commands: Sender<AdapterCommand>,
    state: Arc<Mutex<BridgeState>>,
}

/// Decoder-side end of a [`BridgeAdapter`].
#[derive(Debug)]
pub struct AdapterPort {
    engine: Engine,
    commands: Receiver<AdapterCommand>,
    state: Arc<Mutex<BridgeState>>,
}

impl BridgeAdapter {
    pub fn new(engine: Engine) -> (BridgeAdapter, AdapterPort) {
        let (tx, rx) = unbounded();
        let state = Arc::new(Mutex::new(BridgeState::default()));
        (
            BridgeAdapter {
                engine,
                commands: tx,
                state: Arc::clone(&state),
            },
            AdapterPort {
                engine,
                commands: rx,
                state,
            },
        )
    }

    fn send(&self, cmd: AdapterCommand) -> Result<(), BackendError> {
        self.commands.send(cmd).map_err(|_| BackendError::PortClosed)
    }
}

#[async_trait]
impl BackendAdapter for BridgeAdapter {
    async fn play(&self, request: PlayRequest, sink: EventSink) -> Result<(), BackendError> {
        {
            let mut state = self.state.lock();
            state.sink = Some(sink);
            state.item_ready = false;
        }
        debug!(engine = %self.engine, url = %request.url, "Bridge play");
        self.send(AdapterCommand::Play(request))
    }

    async fn stop(&self) -> Result<(), BackendError> {
        {
            let mut state = self.state.lock();
            state.sink = None;
            state.item_ready = false;
        }
        self.send(AdapterCommand::Stop)
    }

    async fn seek(&self, position_ms: u64) -> Result<(), BackendError> {
        self.send(AdapterCommand::Seek(position_ms))
    }

    async fn set_paused(&self, paused: bool) -> Result<(), BackendError> {
        self.send(AdapterCommand::SetPaused(paused))
    }
}

impl AdapterPort {
    pub fn engine(&self) -> Engine {
        self.engine
    }

    /// Commands sent by the session, in order.
    pub fn commands(&self) -> &Receiver<AdapterCommand> {
        &self.commands
    }

    /// Reports an event for the current item.
    ///
    /// Returns `false` when the event was not delivered: nothing is playing,
    /// the session is gone, or a pause was reported before the item was ready.
    pub fn report(&self, event: BackendEvent) -> bool {
        let mut state = self.state.lock();
        let Some(sink) = state.sink.clone() else {
            return false;
        };

        match &event {
            BackendEvent::Status(BackendStatus::Playing) => state.item_ready = true,
            BackendEvent::Status(BackendStatus::Paused) if !state.item_ready => {
                debug!(engine = %self.engine, "Dropping pause from an item that is not ready");
                return false;
            }
            BackendEvent::Error(_) | BackendEvent::EndOfStream => state.item_ready = false,
            _ => {}
        }
        drop(state);

        sink.emit(event)
    }

    pub fn status(&self, status: BackendStatus) -> bool {
        self.report(BackendEvent::Status(status))
    }

    pub fn error(&self, kind: StreamErrorKind) -> bool {
        self.report(BackendEvent::Error(kind))
    }

    pub fn time_update(&self, position_ms: u64, duration_ms: Option<u64>) -> bool {
        self.report(BackendEvent::TimeUpdate {
            position_ms,
            duration_ms,
        })
    }

    pub fn end_of_stream(&self) -> bool {
        self.report(BackendEvent::EndOfStream)
    }
}
