//! Fakes for every session collaborator, plus a harness driving a session
//! under tokio's paused clock.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use pmoplayback::{
    BackendAdapter, BackendError, BackendStatus, Backends, Channel, ChannelDirectory,
    Collaborators, ContentKind, Engine, EventSink, ExtensionRouter, MemoryDirectory,
    MemoryProgressStore, PlayRequest, PlayableItem, PlaybackConfig, PlaybackError,
    PlaybackSession, ProgressStore, SessionEvent, SessionHandle, SessionSnapshot, StreamErrorKind,
    StreamRoute, StreamRouter,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Upper bound for any single wait in a test; virtual time, so it is free.
const WAIT_LIMIT: Duration = Duration::from_secs(3600);

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Play {
        url: String,
        start_position_ms: Option<u64>,
    },
    Stop,
    Seek(u64),
    SetPaused(bool),
}

/// One backend command, as the adapter received it.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub engine: Engine,
    pub command: Command,
    pub at: Instant,
}

impl Recorded {
    pub fn is_play(&self) -> bool {
        matches!(self.command, Command::Play { .. })
    }
}

/// Adapter recording its commands and letting the test emit events for the
/// most recent `play`.
pub struct FakeBackend {
    engine: Engine,
    log: mpsc::UnboundedSender<Recorded>,
    sink: Mutex<Option<EventSink>>,
}

impl FakeBackend {
    fn record(&self, command: Command) {
        let _ = self.log.send(Recorded {
            engine: self.engine,
            command,
            at: Instant::now(),
        });
    }

    /// Sink of the latest `play`, kept even after `stop`.
    pub fn sink(&self) -> EventSink {
        self.sink
            .lock()
            .clone()
            .expect("no play command received yet")
    }

    pub fn status(&self, status: BackendStatus) {
        self.sink().status(status);
    }

    pub fn error(&self, kind: StreamErrorKind) {
        self.sink().error(kind);
    }

    pub fn time_update(&self, position_ms: u64, duration_ms: Option<u64>) {
        self.sink().time_update(position_ms, duration_ms);
    }

    pub fn end_of_stream(&self) {
        self.sink().end_of_stream();
    }
}

#[async_trait]
impl BackendAdapter for FakeBackend {
    async fn play(&self, request: PlayRequest, sink: EventSink) -> Result<(), BackendError> {
        *self.sink.lock() = Some(sink);
        self.record(Command::Play {
            url: request.url,
            start_position_ms: request.start_position_ms,
        });
        Ok(())
    }

    async fn stop(&self) -> Result<(), BackendError> {
        self.record(Command::Stop);
        Ok(())
    }

    async fn seek(&self, position_ms: u64) -> Result<(), BackendError> {
        self.record(Command::Seek(position_ms));
        Ok(())
    }

    async fn set_paused(&self, paused: bool) -> Result<(), BackendError> {
        self.record(Command::SetPaused(paused));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Router, directory, progress
// ---------------------------------------------------------------------------

/// Extension router counting its calls, optionally slow or failing.
#[derive(Default)]
pub struct CountingRouter {
    inner: ExtensionRouter,
    calls: AtomicUsize,
    delay: Mutex<Option<Duration>>,
    fail: AtomicBool,
}

impl CountingRouter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn set_failing(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl StreamRouter for CountingRouter {
    async fn resolve(&self, url: &str) -> Result<StreamRoute, PlaybackError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(PlaybackError::Routing("resolver offline".to_string()));
        }
        self.inner.resolve(url).await
    }
}

/// In-memory directory recording every numeric lookup.
#[derive(Default)]
pub struct CountingDirectory {
    pub inner: MemoryDirectory,
    lookups: Mutex<Vec<(Option<String>, u32)>>,
    title_batches: Mutex<Vec<Vec<String>>>,
}

impl CountingDirectory {
    pub fn lookups(&self) -> Vec<(Option<String>, u32)> {
        self.lookups.lock().clone()
    }

    pub fn title_batches(&self) -> Vec<Vec<String>> {
        self.title_batches.lock().clone()
    }
}

#[async_trait]
impl ChannelDirectory for CountingDirectory {
    async fn by_number(
        &self,
        playlist_id: Option<&str>,
        number: u32,
    ) -> Result<Option<Channel>, PlaybackError> {
        self.lookups
            .lock()
            .push((playlist_id.map(str::to_string), number));
        self.inner.by_number(playlist_id, number).await
    }

    async fn favorites(&self) -> Result<Vec<Channel>, PlaybackError> {
        self.inner.favorites().await
    }

    async fn now_playing_titles(
        &self,
        epg_ids: &[String],
    ) -> Result<HashMap<String, String>, PlaybackError> {
        self.title_batches.lock().push(epg_ids.to_vec());
        self.inner.now_playing_titles(epg_ids).await
    }
}

/// Progress store that can be switched to failing writes.
#[derive(Default)]
pub struct FlakyProgress {
    pub inner: MemoryProgressStore,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl FlakyProgress {
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProgressStore for FlakyProgress {
    async fn load(&self, content_id: &str) -> Result<Option<u64>, PlaybackError> {
        self.inner.load(content_id).await
    }

    async fn save(
        &self,
        content_id: &str,
        position_ms: u64,
        duration_ms: Option<u64>,
    ) -> Result<(), PlaybackError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PlaybackError::Progress("disk full".to_string()));
        }
        self.inner.save(content_id, position_ms, duration_ms).await
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn live_item(url: &str) -> PlayableItem {
    PlayableItem::new("live-1", "News 24", url, ContentKind::Live).with_playlist("playlist-1")
}

pub fn movie_item(url: &str) -> PlayableItem {
    PlayableItem::new("movie-1", "The Movie", url, ContentKind::OnDemand)
}

pub fn channel(number: u32, epg_id: Option<&str>) -> Channel {
    Channel {
        id: format!("ch-{number}"),
        playlist_id: Some("playlist-1".to_string()),
        number,
        name: format!("Channel {number}"),
        stream_url: format!("http://iptv.local/live/{number}.m3u8"),
        epg_id: epg_id.map(str::to_string),
        logo_url: None,
        group: None,
    }
}

/// A spawned session wired to fakes.
pub struct Harness {
    pub session: PlaybackSession,
    pub handle: SessionHandle,
    pub primary: Arc<FakeBackend>,
    pub alternate: Arc<FakeBackend>,
    pub router: Arc<CountingRouter>,
    pub directory: Arc<CountingDirectory>,
    pub progress: Arc<FlakyProgress>,
    pub events: crossbeam_channel::Receiver<SessionEvent>,
    commands: mpsc::UnboundedReceiver<Recorded>,
}

pub struct HarnessBuilder {
    item: PlayableItem,
    config: PlaybackConfig,
    router: Arc<CountingRouter>,
    directory: Arc<CountingDirectory>,
    progress: Arc<FlakyProgress>,
}

impl HarnessBuilder {
    pub fn config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    pub fn router(self, configure: impl FnOnce(&CountingRouter)) -> Self {
        configure(&self.router);
        self
    }

    pub fn directory(self, configure: impl FnOnce(&MemoryDirectory)) -> Self {
        configure(&self.directory.inner);
        self
    }

    pub fn progress(self, configure: impl FnOnce(&FlakyProgress)) -> Self {
        configure(&self.progress);
        self
    }

    pub fn spawn(self) -> Harness {
        self.try_spawn().expect("session spawns")
    }

    pub fn try_spawn(self) -> Result<Harness, PlaybackError> {
        let (log, commands) = mpsc::unbounded_channel();
        let primary = Arc::new(FakeBackend {
            engine: Engine::Primary,
            log: log.clone(),
            sink: Mutex::new(None),
        });
        let alternate = Arc::new(FakeBackend {
            engine: Engine::Alternate,
            log,
            sink: Mutex::new(None),
        });

        let collaborators = Collaborators {
            router: self.router.clone(),
            directory: self.directory.clone(),
            progress: self.progress.clone(),
            backends: Backends::new(primary.clone(), alternate.clone()),
        };

        let session = PlaybackSession::spawn(self.item, self.config, collaborators)?;
        let handle = session.handle();
        let events = handle.subscribe_events();

        Ok(Harness {
            session,
            handle,
            primary,
            alternate,
            router: self.router,
            directory: self.directory,
            progress: self.progress,
            events,
            commands,
        })
    }
}

impl Harness {
    pub fn builder(item: PlayableItem) -> HarnessBuilder {
        HarnessBuilder {
            item,
            config: PlaybackConfig::default(),
            router: Arc::new(CountingRouter::default()),
            directory: Arc::new(CountingDirectory::default()),
            progress: Arc::new(FlakyProgress::default()),
        }
    }

    pub fn live(url: &str) -> Harness {
        Self::builder(live_item(url)).spawn()
    }

    pub fn backend(&self, engine: Engine) -> &FakeBackend {
        match engine {
            Engine::Primary => &self.primary,
            Engine::Alternate => &self.alternate,
        }
    }

    /// Next command received by either adapter.
    pub async fn next_command(&mut self) -> Recorded {
        within(self.commands.recv())
            .await
            .expect("command channel closed")
    }

    /// Skips commands until the next `play`.
    pub async fn next_play(&mut self) -> Recorded {
        loop {
            let recorded = self.next_command().await;
            if recorded.is_play() {
                return recorded;
            }
        }
    }

    /// Commands received so far, without waiting.
    pub fn drain_commands(&mut self) -> Vec<Recorded> {
        let mut drained = Vec::new();
        while let Ok(recorded) = self.commands.try_recv() {
            drained.push(recorded);
        }
        drained
    }

    pub fn drain_events(&self) -> Vec<SessionEvent> {
        self.events.try_iter().collect()
    }

    /// Waits until a published snapshot satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> SessionSnapshot {
        let mut rx = self.handle.watch();
        let snapshot = within(rx.wait_for(predicate))
            .await
            .expect("session is gone");
        snapshot.clone()
    }

    /// Appears, lets the route resolve, and returns the first `play`.
    pub async fn start(&mut self) -> Recorded {
        self.handle.appear().unwrap();
        self.next_play().await
    }

    /// Starts and reports `playing` from the routed engine.
    pub async fn start_playing(&mut self) -> Recorded {
        let play = self.start().await;
        self.backend(play.engine).status(BackendStatus::Playing);
        self.wait_for(|s| s.status == pmoplayback::SessionStatus::Playing)
            .await;
        play
    }

    /// Dismisses and waits for the controller task to end.
    pub async fn dismiss(self) -> Vec<Recorded> {
        let Harness {
            session,
            handle,
            mut commands,
            ..
        } = self;
        // Already ended sessions reject the intent; waiting is enough.
        let _ = handle.dismiss();
        drop(handle);
        within(session.wait()).await.unwrap();

        let mut drained = Vec::new();
        while let Ok(recorded) = commands.try_recv() {
            drained.push(recorded);
        }
        drained
    }
}

/// Fails the test instead of hanging when `future` never completes.
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(WAIT_LIMIT, future)
        .await
        .expect("timed out waiting")
}

/// Lets every runnable task settle without moving the clock.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

pub fn assert_delay(actual: Duration, expected: Duration) {
    let diff = actual.abs_diff(expected);
    assert!(
        diff <= Duration::from_millis(5),
        "expected a delay of {expected:?}, got {actual:?}"
    );
}
