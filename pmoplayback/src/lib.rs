//! # pmoplayback - Playback session controller
//!
//! `pmoplayback` drives a single playback session for a live channel or an
//! on-demand item: it validates and routes the stream URL, feeds it to one of
//! two interchangeable decode engines, recovers from decode errors with a
//! bounded retry ladder and a one-shot engine failover, and runs the timed
//! behaviours around playback (overlay auto-hide, stall escalation, sleep
//! timer, numeric channel entry).
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pmoplayback::{
//!     Backends, BridgeAdapter, Collaborators, ContentKind, Engine, ExtensionRouter,
//!     MemoryDirectory, MemoryProgressStore, PlayableItem, PlaybackConfig, PlaybackSession,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let (primary, _primary_port) = BridgeAdapter::new(Engine::Primary);
//!     let (alternate, _alternate_port) = BridgeAdapter::new(Engine::Alternate);
//!
//!     let collaborators = Collaborators {
//!         router: Arc::new(ExtensionRouter::new()),
//!         directory: Arc::new(MemoryDirectory::new()),
//!         progress: Arc::new(MemoryProgressStore::new()),
//!         backends: Backends::new(Arc::new(primary), Arc::new(alternate)),
//!     };
//!
//!     let item = PlayableItem::new("news-24", "News 24", "http://iptv.local/live/24.m3u8", ContentKind::Live);
//!     let session = PlaybackSession::spawn(item, PlaybackConfig::default(), collaborators)?;
//!
//!     let handle = session.handle();
//!     handle.appear()?;
//!     // ... decoder threads drive the ports, the UI watches `handle.watch()` ...
//!     handle.dismiss()?;
//!
//!     session.wait().await
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`session`]: the controller task, its intents and handles
//! - [`backend`]: the engine contract, a channel bridge and an external-process adapter
//! - [`router`]: URL validation and engine selection
//! - [`retry`]: the retry ladder and failover bookkeeping
//! - [`timers`]: keyed, cancellable timed resources
//! - [`snapshot`] / [`events`]: what observers see
//! - [`directory`] / [`progress`]: channel lookups and resume positions
//! - [`config`]: YAML configuration with environment overrides
//!
//! Every input the controller reacts to goes through one queue and is handled
//! to completion before the next, so retry counters and status never see
//! interleaved updates. Events from a pipeline the controller has abandoned
//! carry an old epoch and are dropped.

pub mod backend;
pub mod config;
pub mod constants;
pub mod directory;
pub mod errors;
pub mod events;
pub mod model;
pub mod progress;
pub mod retry;
pub mod router;
pub mod session;
pub mod sleep_timer;
pub mod snapshot;
pub mod timers;

pub use backend::{
    AdapterCommand, AdapterPort, BackendAdapter, BackendEvent, BackendStatus, Backends,
    BridgeAdapter, EventSink, ExternalPlayerAdapter, ExternalPlayerConfig, PlayRequest,
};
pub use config::PlaybackConfig;
pub use directory::{ChannelDirectory, MemoryDirectory};
pub use errors::{BackendError, PlaybackError, StreamErrorKind};
pub use events::{EndReason, SessionEvent};
pub use model::{Channel, ContentKind, Engine, PlayableItem, SessionId, StreamRoute};
pub use progress::{MemoryProgressStore, ProgressStore};
pub use router::{ExtensionRouter, StreamRouter};
pub use session::{Collaborators, Intent, PlaybackSession, SeekDirection, SessionHandle};
pub use sleep_timer::SleepDuration;
pub use snapshot::{LookupResult, SessionSnapshot, SessionStatus, StallStage};
