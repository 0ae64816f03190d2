//! Adapter driving an external player process (ffplay, mpv, ...).
//!
//! The process gives no structured feedback, so status is inferred from its
//! lifecycle: a successful launch means `Loading`, surviving the startup grace
//! period means `Playing`. A clean exit on on-demand content is the end of
//! the stream; any other exit the session did not ask for is an error.
//! Seeking and pausing are not available.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{BackendAdapter, BackendStatus, EventSink, PlayRequest};
use crate::errors::{BackendError, StreamErrorKind};
use crate::model::Engine;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalPlayerConfig {
    pub program: String,
    /// Arguments placed before the URL.
    #[serde(default)]
    pub args: Vec<String>,
    /// Arguments requesting a start position; `{secs}` is replaced by the
    /// resume position in seconds.
    #[serde(default)]
    pub start_args: Vec<String>,
    #[serde(default = "ExternalPlayerConfig::default_startup_grace")]
    pub startup_grace_ms: u64,
}

impl ExternalPlayerConfig {
    const fn default_startup_grace() -> u64 {
        2000
    }

    pub fn ffplay() -> Self {
        Self {
            program: "ffplay".to_string(),
            args: vec![
                "-autoexit".to_string(),
                "-sync".to_string(),
                "audio".to_string(),
                "-framedrop".to_string(),
            ],
            start_args: vec!["-ss".to_string(), "{secs}".to_string()],
            startup_grace_ms: Self::default_startup_grace(),
        }
    }

    pub fn mpv() -> Self {
        Self {
            program: "mpv".to_string(),
            args: vec!["--force-window=yes".to_string()],
            start_args: vec!["--start={secs}".to_string()],
            startup_grace_ms: Self::default_startup_grace(),
        }
    }

    fn command_args(&self, request: &PlayRequest) -> Vec<String> {
        let mut args = self.args.clone();
        if let Some(position_ms) = request.start_position_ms.filter(|_| !request.live) {
            let secs = (position_ms / 1000).to_string();
            args.extend(self.start_args.iter().map(|a| a.replace("{secs}", &secs)));
        }
        args.push(request.url.clone());
        args
    }
}

struct RunningPlayer {
    cancel: CancellationToken,
    watcher: JoinHandle<()>,
}

pub struct ExternalPlayerAdapter {
    engine: Engine,
    config: ExternalPlayerConfig,
    running: Mutex<Option<RunningPlayer>>,
}

impl std::fmt::Debug for ExternalPlayerAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalPlayerAdapter")
            .field("engine", &self.engine)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ExternalPlayerAdapter {
    pub fn new(engine: Engine, config: ExternalPlayerConfig) -> Self {
        Self {
            engine,
            config,
            running: Mutex::new(None),
        }
    }

    /// Kills the current process, if any, and waits until it is reaped.
    async fn stop_current(&self) {
        let running = self.running.lock().await.take();
        if let Some(running) = running {
            running.cancel.cancel();
            if let Err(err) = running.watcher.await {
                warn!(engine = %self.engine, "Player watcher ended abnormally: {err}");
            }
        }
    }
}

#[async_trait]
impl BackendAdapter for ExternalPlayerAdapter {
    async fn play(&self, request: PlayRequest, sink: EventSink) -> Result<(), BackendError> {
        self.stop_current().await;

        let args = self.config.command_args(&request);
        info!(engine = %self.engine, program = %self.config.program, url = %request.url, "Launching external player");

        let mut child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| BackendError::Launch(self.config.program.clone(), err))?;

        sink.status(BackendStatus::Loading);

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let grace = Duration::from_millis(self.config.startup_grace_ms);
        let engine = self.engine;
        let live = request.live;

        let watcher = tokio::spawn(async move {
            let startup = tokio::time::sleep(grace);
            tokio::pin!(startup);
            let mut announced = false;

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        if let Err(err) = child.kill().await {
                            debug!(%engine, "Player already gone: {err}");
                        }
                        return;
                    }
                    _ = &mut startup, if !announced => {
                        announced = true;
                        sink.status(BackendStatus::Playing);
                    }
                    status = child.wait() => {
                        let kind = match status {
                            Ok(status) if status.success() && !live => {
                                debug!(%engine, "Player reached the end of the stream");
                                sink.end_of_stream();
                                return;
                            }
                            Ok(status) if status.success() => StreamErrorKind::NetworkLost,
                            Ok(status) => {
                                debug!(%engine, ?status, "Player exited with failure");
                                StreamErrorKind::DecodingFailed
                            }
                            Err(err) => StreamErrorKind::Unknown(err.to_string()),
                        };
                        sink.error(kind);
                        return;
                    }
                }
            }
        });

        *self.running.lock().await = Some(RunningPlayer { cancel, watcher });
        Ok(())
    }

    async fn stop(&self) -> Result<(), BackendError> {
        self.stop_current().await;
        Ok(())
    }

    async fn seek(&self, _position_ms: u64) -> Result<(), BackendError> {
        Err(BackendError::unsupported("seek", self.engine.as_str()))
    }

    async fn set_paused(&self, _paused: bool) -> Result<(), BackendError> {
        Err(BackendError::unsupported("pause", self.engine.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::backend::BackendEvent;
    use crate::session::Input;

    fn request(url: &str, start: Option<u64>, live: bool) -> PlayRequest {
        PlayRequest {
            url: url.to_string(),
            engine: Engine::Alternate,
            start_position_ms: start,
            live,
        }
    }

    #[test]
    fn test_command_args_with_resume() {
        let args = ExternalPlayerConfig::mpv().command_args(&request("http://x/v.mkv", Some(90_500), false));
        assert_eq!(args, vec!["--force-window=yes", "--start=90", "http://x/v.mkv"]);

        let args = ExternalPlayerConfig::ffplay().command_args(&request("http://x/v.mkv", Some(5_000), false));
        assert_eq!(&args[args.len() - 3..], ["-ss", "5", "http://x/v.mkv"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_clean_exit_ends_on_demand_but_not_live() {
        let config = ExternalPlayerConfig {
            program: "true".to_string(),
            args: Vec::new(),
            start_args: Vec::new(),
            startup_grace_ms: 60_000,
        };

        for (live, last) in [
            (false, BackendEvent::EndOfStream),
            (true, BackendEvent::Error(StreamErrorKind::NetworkLost)),
        ] {
            let adapter = ExternalPlayerAdapter::new(Engine::Alternate, config.clone());
            let (tx, mut rx) = mpsc::unbounded_channel();
            adapter
                .play(
                    request("http://x/v.mkv", None, live),
                    EventSink::new(Engine::Alternate, 1, tx),
                )
                .await
                .unwrap();

            let mut events = Vec::new();
            while events.len() < 2 {
                let input = tokio::time::timeout(Duration::from_secs(10), rx.recv())
                    .await
                    .unwrap()
                    .unwrap();
                if let Input::Backend { event, .. } = input {
                    events.push(event);
                }
            }
            assert_eq!(events, vec![BackendEvent::Status(BackendStatus::Loading), last]);
        }
    }

    #[test]
    fn test_command_args_ignore_resume_for_live() {
        let args = ExternalPlayerConfig::mpv().command_args(&request("rtsp://x/live", Some(90_000), true));
        assert_eq!(args, vec!["--force-window=yes", "rtsp://x/live"]);
    }
}
