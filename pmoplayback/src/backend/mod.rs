//! Backend adapters: the two interchangeable decode engines.
//!
//! Both engines present the same contract. The controller sends commands
//! through a per-engine [`driver`] task and receives events through the
//! [`EventSink`] handed over with every `play` command. Each sink is tagged
//! with the epoch of the `play` it belongs to, so events coming from a
//! pipeline the controller already abandoned are recognised and dropped.

mod bridge;
pub(crate) mod driver;
mod external;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::{BackendError, StreamErrorKind};
use crate::model::Engine;
use crate::session::Input;

pub use bridge::{AdapterCommand, AdapterPort, BridgeAdapter};
pub use external::{ExternalPlayerAdapter, ExternalPlayerConfig};

/// Status transitions reported by an adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendStatus {
    /// Opening the stream or re-buffering.
    Loading,
    Playing,
    Paused,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendEvent {
    Status(BackendStatus),
    Error(StreamErrorKind),
    TimeUpdate {
        position_ms: u64,
        duration_ms: Option<u64>,
    },
    /// The media played through to its end.
    EndOfStream,
}

/// Everything an adapter needs to start a pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayRequest {
    pub url: String,
    pub engine: Engine,
    /// Resume target for on-demand content.
    pub start_position_ms: Option<u64>,
    pub live: bool,
}

/// Event channel from one `play` command back to the controller.
#[derive(Clone)]
pub struct EventSink {
    engine: Engine,
    epoch: u64,
    tx: mpsc::UnboundedSender<Input>,
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("engine", &self.engine)
            .field("epoch", &self.epoch)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl EventSink {
    pub(crate) fn new(engine: Engine, epoch: u64, tx: mpsc::UnboundedSender<Input>) -> Self {
        Self { engine, epoch, tx }
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Delivers an event. Returns `false` once the session is gone.
    pub fn emit(&self, event: BackendEvent) -> bool {
        self.tx
            .send(Input::Backend {
                engine: self.engine,
                epoch: self.epoch,
                event,
            })
            .is_ok()
    }

    pub fn status(&self, status: BackendStatus) -> bool {
        self.emit(BackendEvent::Status(status))
    }

    pub fn error(&self, kind: StreamErrorKind) -> bool {
        self.emit(BackendEvent::Error(kind))
    }

    pub fn time_update(&self, position_ms: u64, duration_ms: Option<u64>) -> bool {
        self.emit(BackendEvent::TimeUpdate {
            position_ms,
            duration_ms,
        })
    }

    pub fn end_of_stream(&self) -> bool {
        self.emit(BackendEvent::EndOfStream)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Command surface shared by both engines.
///
/// Implementations must handle their own commands in order: a `stop`
/// followed by a `play` must tear the old pipeline down before (or while)
/// starting the new one. The driver task already calls them sequentially.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Starts playing `request.url`, superseding any previous pipeline.
    /// Events for this pipeline go to `sink`.
    async fn play(&self, request: PlayRequest, sink: EventSink) -> Result<(), BackendError>;

    async fn stop(&self) -> Result<(), BackendError>;

    async fn seek(&self, position_ms: u64) -> Result<(), BackendError>;

    async fn set_paused(&self, paused: bool) -> Result<(), BackendError>;
}

/// The adapter instance for each engine.
#[derive(Clone)]
pub struct Backends {
    primary: Arc<dyn BackendAdapter>,
    alternate: Arc<dyn BackendAdapter>,
}

impl fmt::Debug for Backends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backends").finish_non_exhaustive()
    }
}

impl Backends {
    pub fn new(primary: Arc<dyn BackendAdapter>, alternate: Arc<dyn BackendAdapter>) -> Self {
        Self { primary, alternate }
    }

    pub fn get(&self, engine: Engine) -> Arc<dyn BackendAdapter> {
        match engine {
            Engine::Primary => Arc::clone(&self.primary),
            Engine::Alternate => Arc::clone(&self.alternate),
        }
    }
}
