//! Per-engine command driver.
//!
//! The controller never awaits an adapter: it queues commands here and moves
//! on. The driver executes them one by one, which keeps `stop` ahead of any
//! later `play` on the same adapter.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{BackendAdapter, EventSink, PlayRequest};
use crate::errors::StreamErrorKind;
use crate::model::Engine;

#[derive(Debug)]
pub(crate) enum DriverCommand {
    Play { request: PlayRequest, sink: EventSink },
    Stop,
    Seek(u64),
    SetPaused(bool),
}

pub(crate) struct BackendDriver {
    engine: Engine,
    tx: mpsc::UnboundedSender<DriverCommand>,
    join_handle: JoinHandle<()>,
}

impl BackendDriver {
    pub(crate) fn spawn(engine: Engine, adapter: Arc<dyn BackendAdapter>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<DriverCommand>();

        let join_handle = tokio::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                debug!(%engine, ?cmd, "Backend command");
                match cmd {
                    DriverCommand::Play { request, sink } => {
                        let report = sink.clone();
                        if let Err(err) = adapter.play(request, sink).await {
                            warn!(%engine, "Backend play failed: {err}");
                            report.error(StreamErrorKind::Unknown(err.to_string()));
                        }
                    }
                    DriverCommand::Stop => {
                        if let Err(err) = adapter.stop().await {
                            warn!(%engine, "Backend stop failed: {err}");
                        }
                    }
                    DriverCommand::Seek(position_ms) => {
                        if let Err(err) = adapter.seek(position_ms).await {
                            warn!(%engine, position_ms, "Backend seek failed: {err}");
                        }
                    }
                    DriverCommand::SetPaused(paused) => {
                        if let Err(err) = adapter.set_paused(paused).await {
                            warn!(%engine, paused, "Backend pause toggle failed: {err}");
                        }
                    }
                }
            }
            debug!(%engine, "Backend driver stopped");
        });

        Self {
            engine,
            tx,
            join_handle,
        }
    }

    pub(crate) fn send(&self, cmd: DriverCommand) {
        if self.tx.send(cmd).is_err() {
            warn!(engine = %self.engine, "Backend driver is gone, command dropped");
        }
    }

    /// Closes the queue; commands already queued still run.
    pub(crate) fn shutdown(self) -> JoinHandle<()> {
        drop(self.tx);
        self.join_handle
    }
}
