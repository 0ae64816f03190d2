//! The session state machine.
//!
//! One task owns every piece of session state. It drains a single input
//! channel and the timer queue in a `select!` loop, so each transition runs to
//! completion before the next input is looked at. Collaborator calls are
//! spawned and report back through the same channel; backend commands are
//! queued on the per-engine drivers. The loop itself never waits on I/O.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::number_entry::NumberEntry;
use super::switcher::Switcher;
use super::{Collaborators, Intent, SeekDirection};
use crate::backend::driver::{BackendDriver, DriverCommand};
use crate::backend::{BackendEvent, BackendStatus, EventSink, PlayRequest};
use crate::config::PlaybackConfig;
use crate::constants::{SLEEP_TIMER_REFRESH_SECONDS, STALL_TICK_SECONDS};
use crate::errors::{PlaybackError, StreamErrorKind};
use crate::events::{EndReason, SessionEvent, SessionEventBus};
use crate::model::{Channel, Engine, PlayableItem, SessionId, StreamRoute};
use crate::retry::{RetryDecision, RetryPolicy, RetryState};
use crate::router::is_supported_url;
use crate::sleep_timer::{SleepDuration, SleepTimer};
use crate::snapshot::{SessionSnapshot, SessionStatus, StallStage};
use crate::timers::{TimerKey, TimerSet};

/// Everything the controller reacts to.
#[derive(Debug)]
pub(crate) enum Input {
    Intent(Intent),
    Routed {
        session: SessionId,
        result: Result<StreamRoute, PlaybackError>,
        resume_ms: Option<u64>,
    },
    Backend {
        engine: Engine,
        epoch: u64,
        event: BackendEvent,
    },
    NumberLookup {
        seq: u64,
        result: Result<Option<Channel>, PlaybackError>,
    },
    Favorites {
        seq: u64,
        result: Result<Vec<Channel>, PlaybackError>,
    },
    Titles {
        seq: u64,
        result: Result<HashMap<String, String>, PlaybackError>,
    },
    HandlesDropped,
}

struct Drivers {
    primary: BackendDriver,
    alternate: BackendDriver,
}

impl Drivers {
    fn get(&self, engine: Engine) -> &BackendDriver {
        match engine {
            Engine::Primary => &self.primary,
            Engine::Alternate => &self.alternate,
        }
    }
}

#[derive(Debug, Default)]
struct StallClock {
    elapsed_secs: u64,
    stage: StallStage,
}

pub(crate) struct SessionController {
    id: SessionId,
    item: PlayableItem,
    config: PlaybackConfig,
    policy: RetryPolicy,
    collaborators: Collaborators,
    drivers: Drivers,
    tx: mpsc::UnboundedSender<Input>,
    /// Cancels in-flight collaborator calls of the current session.
    cancel: CancellationToken,

    status: SessionStatus,
    route: Option<StreamRoute>,
    engine: Option<Engine>,
    retry: RetryState,
    /// Last epoch handed out; the pair below is the one whose events count.
    epoch: u64,
    active: Option<(Engine, u64)>,
    resume_ms: Option<u64>,
    position_ms: Option<u64>,
    duration_ms: Option<u64>,
    last_progress_save: Option<Instant>,

    timers: TimerSet,
    stall: StallClock,
    overlay_visible: bool,
    sleep_timer: SleepTimer,
    entry: NumberEntry,
    switcher: Switcher,

    snapshots: watch::Sender<SessionSnapshot>,
    events: SessionEventBus,
    ended: bool,
}

impl SessionController {
    pub(crate) fn new(
        item: PlayableItem,
        config: PlaybackConfig,
        collaborators: Collaborators,
        tx: mpsc::UnboundedSender<Input>,
        events: SessionEventBus,
    ) -> Self {
        let id = SessionId::new();
        let drivers = Drivers {
            primary: BackendDriver::spawn(
                Engine::Primary,
                collaborators.backends.get(Engine::Primary),
            ),
            alternate: BackendDriver::spawn(
                Engine::Alternate,
                collaborators.backends.get(Engine::Alternate),
            ),
        };
        let (snapshots, _) = watch::channel(SessionSnapshot::new(id, item.clone()));

        Self {
            id,
            policy: RetryPolicy::from_config(&config.retry),
            entry: NumberEntry::new(config.number_entry.max_digits),
            item,
            config,
            collaborators,
            drivers,
            tx,
            cancel: CancellationToken::new(),
            status: SessionStatus::Idle,
            route: None,
            engine: None,
            retry: RetryState::new(),
            epoch: 0,
            active: None,
            resume_ms: None,
            position_ms: None,
            duration_ms: None,
            last_progress_save: None,
            timers: TimerSet::new(),
            stall: StallClock::default(),
            overlay_visible: false,
            sleep_timer: SleepTimer::new(),
            switcher: Switcher::default(),
            snapshots,
            events,
            ended: false,
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    pub(crate) async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Input>) {
        info!(session = %self.id, item = %self.item.name, "Playback session started");

        while !self.ended {
            tokio::select! {
                input = rx.recv() => match input {
                    Some(input) => self.handle_input(input),
                    None => self.end(EndReason::Closed),
                },
                key = self.timers.next_expired() => self.handle_timer(key),
            }
            self.publish();
        }

        let Drivers { primary, alternate } = self.drivers;
        for join_handle in [primary.shutdown(), alternate.shutdown()] {
            if let Err(err) = join_handle.await {
                warn!("Backend driver ended abnormally: {err}");
            }
        }
        info!(session = %self.id, "Playback session ended");
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    fn handle_input(&mut self, input: Input) {
        match input {
            Input::Intent(intent) => self.handle_intent(intent),
            Input::Routed {
                session,
                result,
                resume_ms,
            } => self.on_routed(session, result, resume_ms),
            Input::Backend {
                engine,
                epoch,
                event,
            } => self.on_backend_event(engine, epoch, event),
            Input::NumberLookup { seq, result } => self.on_number_lookup(seq, result),
            Input::Favorites { seq, result } => self.on_favorites(seq, result),
            Input::Titles { seq, result } => self.on_titles(seq, result),
            Input::HandlesDropped => self.end(EndReason::Closed),
        }
    }

    fn handle_intent(&mut self, intent: Intent) {
        debug!(session = %self.id, ?intent, "Intent");
        match intent {
            Intent::Appear => self.on_appear(),
            Intent::Dismiss => self.end(EndReason::UserDismissed),
            Intent::Retry => self.on_manual_retry(),
            Intent::TryAlternateEngine => self.on_try_alternate_engine(),
            Intent::ToggleOverlay => self.on_toggle_overlay(),
            Intent::SelectSleepTimer(duration) => self.on_select_sleep_timer(duration),
            Intent::DigitPressed(digit) => self.on_digit(digit),
            Intent::ConfirmEntry => self.on_confirm_entry(),
            Intent::CancelEntry => self.clear_entry(),
            Intent::ShowSwitcher => self.on_show_switcher(),
            Intent::HideSwitcher => self.switcher.hide(),
            Intent::SelectChannel(channel) => self.switch_channel(channel),
            Intent::Seek(position_ms) => self.seek_to(position_ms),
            Intent::SeekRelative(direction) => self.on_seek_relative(direction),
            Intent::TogglePlayPause => self.on_toggle_play_pause(),
        }
    }

    fn handle_timer(&mut self, key: TimerKey) {
        debug!(session = %self.id, timer = %key, "Timer fired");
        match key {
            TimerKey::OverlayHide => {
                if self.status == SessionStatus::Playing {
                    self.overlay_visible = false;
                }
            }
            TimerKey::StallClock => self.on_stall_tick(),
            TimerKey::RetryFire => self.on_retry_fire(),
            TimerKey::SleepTimer => self.on_sleep_timer_tick(),
            TimerKey::EntryDebounce => self.start_number_lookup(),
        }
    }

    // ------------------------------------------------------------------
    // Session start and routing
    // ------------------------------------------------------------------

    fn on_appear(&mut self) {
        if self.status == SessionStatus::Idle {
            self.start_session();
        }
        self.clear_entry();
        self.show_overlay();
    }

    fn start_session(&mut self) {
        if !is_supported_url(&self.item.stream_url) {
            warn!(session = %self.id, url = %self.item.stream_url, "Unsupported stream URL");
            self.set_status(SessionStatus::Error {
                kind: StreamErrorKind::StreamUnavailable,
            });
            return;
        }

        self.set_status(SessionStatus::Routing);

        let session = self.id;
        let url = self.item.stream_url.clone();
        let resume_id = (!self.item.is_live()).then(|| self.item.content_id.clone());
        let router = self.collaborators.router.clone();
        let progress = self.collaborators.progress.clone();
        let tx = self.tx.clone();
        let token = self.cancel.clone();

        tokio::spawn(async move {
            let load_resume = async move {
                let content_id = resume_id?;
                match progress.load(&content_id).await {
                    Ok(position) => position,
                    Err(err) => {
                        warn!(%session, "Cannot load resume position: {err}");
                        None
                    }
                }
            };

            tokio::select! {
                _ = token.cancelled() => {
                    debug!(%session, "Routing cancelled");
                }
                (result, resume_ms) = async { tokio::join!(router.resolve(&url), load_resume) } => {
                    let _ = tx.send(Input::Routed { session, result, resume_ms });
                }
            }
        });
    }

    fn on_routed(
        &mut self,
        session: SessionId,
        result: Result<StreamRoute, PlaybackError>,
        resume_ms: Option<u64>,
    ) {
        if session != self.id || self.status != SessionStatus::Routing {
            debug!(session = %self.id, "Dropping stale route");
            return;
        }

        match result {
            Ok(route) => {
                info!(
                    session = %self.id,
                    engine = %route.engine,
                    url = %route.url,
                    reason = %route.reason,
                    "Stream routed"
                );
                let engine = route.engine;
                self.route = Some(route);
                self.engine = Some(engine);
                self.resume_ms = resume_ms;
                self.play(engine);
            }
            Err(err) => {
                warn!(session = %self.id, "Routing failed: {err}");
                self.set_status(SessionStatus::Error {
                    kind: StreamErrorKind::StreamUnavailable,
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // Backend commands and events
    // ------------------------------------------------------------------

    /// Enters `Loading` and issues `play` for the route URL on `engine`.
    fn play(&mut self, engine: Engine) {
        let Some(url) = self.route.as_ref().map(|route| route.url.clone()) else {
            return;
        };

        self.stop_backend();
        self.epoch += 1;
        self.active = Some((engine, self.epoch));
        self.engine = Some(engine);

        let start_position_ms = if self.item.is_live() {
            None
        } else {
            self.position_ms.or(self.resume_ms)
        };
        let request = PlayRequest {
            url,
            engine,
            start_position_ms,
            live: self.item.is_live(),
        };
        let sink = EventSink::new(engine, self.epoch, self.tx.clone());

        debug!(session = %self.id, %engine, epoch = self.epoch, "Play");
        self.enter_loading();
        self.drivers
            .get(engine)
            .send(DriverCommand::Play { request, sink });
    }

    /// Stops the active pipeline, if any. Its late events become stale.
    fn stop_backend(&mut self) {
        if let Some((engine, epoch)) = self.active.take() {
            debug!(session = %self.id, %engine, epoch, "Stop");
            self.drivers.get(engine).send(DriverCommand::Stop);
        }
    }

    fn on_backend_event(&mut self, engine: Engine, epoch: u64, event: BackendEvent) {
        if self.active != Some((engine, epoch)) {
            debug!(session = %self.id, %engine, epoch, ?event, "Dropping stale backend event");
            return;
        }

        match event {
            BackendEvent::Status(BackendStatus::Playing) => {
                self.retry.on_playing();
                if self.status != SessionStatus::Playing {
                    self.set_status(SessionStatus::Playing);
                    if self.overlay_visible && !self.timers.is_pending(TimerKey::OverlayHide) {
                        self.timers
                            .schedule(TimerKey::OverlayHide, self.config.overlay_hide_delay());
                    }
                }
            }
            BackendEvent::Status(BackendStatus::Paused) => {
                if self.status.is_established() {
                    self.set_status(SessionStatus::Paused);
                }
            }
            BackendEvent::Status(BackendStatus::Loading) => {
                if self.status.is_established() {
                    self.enter_loading();
                }
            }
            BackendEvent::Error(kind) => {
                if self.status.is_loading() || self.status.is_established() {
                    self.on_decode_error(kind);
                }
            }
            BackendEvent::TimeUpdate {
                position_ms,
                duration_ms,
            } => self.on_time_update(position_ms, duration_ms),
            BackendEvent::EndOfStream => self.on_end_of_stream(),
        }
    }

    /// A live stream has no end: running out is a lost connection.
    fn on_end_of_stream(&mut self) {
        if !(self.status.is_loading() || self.status.is_established()) {
            return;
        }
        if self.item.is_live() {
            self.on_decode_error(StreamErrorKind::NetworkLost);
        } else {
            info!(session = %self.id, "Reached the end of the stream");
            self.end(EndReason::EndOfStream);
        }
    }

    // ------------------------------------------------------------------
    // Retry and failover
    // ------------------------------------------------------------------

    fn on_decode_error(&mut self, kind: StreamErrorKind) {
        let Some(engine) = self.engine else {
            return;
        };

        if self.config.retry.fail_fast_on_unavailable && kind == StreamErrorKind::StreamUnavailable
        {
            warn!(session = %self.id, %engine, "Stream unavailable, not retrying");
            self.stop_backend();
            self.set_status(SessionStatus::Error { kind });
            return;
        }

        match self.retry.on_error(engine, &self.policy) {
            RetryDecision::Retry {
                attempt,
                engine,
                delay,
            } => {
                info!(session = %self.id, %engine, attempt, ?delay, error = %kind, "Retrying stream");
                self.schedule_retry(attempt, engine, delay);
            }
            RetryDecision::Failover {
                attempt,
                engine,
                delay,
            } => {
                info!(session = %self.id, %engine, ?delay, error = %kind, "Retries exhausted, failing over");
                self.schedule_retry(attempt, engine, delay);
            }
            RetryDecision::Exhausted => {
                warn!(session = %self.id, %engine, error = %kind, "Playback failed on both engines");
                self.stop_backend();
                self.set_status(SessionStatus::Failed);
            }
        }
    }

    fn schedule_retry(&mut self, attempt: u32, engine: Engine, delay: Duration) {
        self.engine = Some(engine);
        self.set_status(SessionStatus::Retrying { attempt, engine });
        self.stop_backend();
        self.timers.schedule(TimerKey::RetryFire, delay);
    }

    fn on_retry_fire(&mut self) {
        if let SessionStatus::Retrying { engine, .. } = self.status {
            self.play(engine);
        }
    }

    fn on_manual_retry(&mut self) {
        if matches!(
            self.status,
            SessionStatus::Idle | SessionStatus::Routing | SessionStatus::Ended
        ) {
            return;
        }

        info!(session = %self.id, "Manual retry");
        self.timers.cancel(TimerKey::RetryFire);
        self.retry.reset();

        match self.route.as_ref().map(|route| route.engine) {
            Some(engine) => self.play(engine),
            None => self.start_session(),
        }
    }

    fn on_try_alternate_engine(&mut self) {
        let Some(engine) = self.engine else {
            return;
        };
        if self.status == SessionStatus::Ended {
            return;
        }

        let engine = engine.alternate();
        info!(session = %self.id, %engine, "Switching engine on request");
        self.timers.cancel(TimerKey::RetryFire);
        self.retry.force_fallback();
        self.play(engine);
    }

    // ------------------------------------------------------------------
    // Status and stall escalation
    // ------------------------------------------------------------------

    fn set_status(&mut self, status: SessionStatus) {
        if self.status == status {
            return;
        }
        debug!(session = %self.id, from = %self.status, to = %status, "Status");

        if self.status.is_loading() && !status.is_loading() {
            self.stop_stall_clock();
        }
        self.status = status.clone();
        self.events.broadcast(SessionEvent::StatusChanged {
            session: self.id,
            status,
        });
    }

    /// Every entry into `Loading` restarts the stall clock from zero.
    fn enter_loading(&mut self) {
        self.set_status(SessionStatus::Loading);
        self.stall = StallClock::default();
        self.timers
            .schedule(TimerKey::StallClock, Duration::from_secs(STALL_TICK_SECONDS));
    }

    fn stop_stall_clock(&mut self) {
        self.timers.cancel(TimerKey::StallClock);
        self.stall = StallClock::default();
    }

    fn on_stall_tick(&mut self) {
        if !self.status.is_loading() {
            return;
        }

        self.stall.elapsed_secs += STALL_TICK_SECONDS;
        let elapsed = Duration::from_secs(self.stall.elapsed_secs);

        if elapsed >= self.config.buffer_timeout() && self.stall.stage < StallStage::SlowStream {
            info!(session = %self.id, elapsed_secs = self.stall.elapsed_secs, "Stream is slow");
            self.stall.stage = StallStage::SlowStream;
            self.events
                .broadcast(SessionEvent::SlowStream { session: self.id });
        }
        if elapsed >= self.config.manual_actions_after()
            && self.stall.stage < StallStage::ManualActions
        {
            info!(session = %self.id, elapsed_secs = self.stall.elapsed_secs, "Offering manual recovery");
            self.stall.stage = StallStage::ManualActions;
            self.events
                .broadcast(SessionEvent::ManualRecoveryOffered { session: self.id });
        }

        self.timers
            .schedule(TimerKey::StallClock, Duration::from_secs(STALL_TICK_SECONDS));
    }

    // ------------------------------------------------------------------
    // Overlay and sleep timer
    // ------------------------------------------------------------------

    fn show_overlay(&mut self) {
        self.overlay_visible = true;
        self.timers
            .schedule(TimerKey::OverlayHide, self.config.overlay_hide_delay());
    }

    fn on_toggle_overlay(&mut self) {
        if self.overlay_visible {
            self.overlay_visible = false;
            self.timers.cancel(TimerKey::OverlayHide);
        } else {
            self.show_overlay();
        }
    }

    fn on_select_sleep_timer(&mut self, duration: Option<SleepDuration>) {
        match duration {
            Some(duration) => {
                info!(session = %self.id, %duration, "Sleep timer set");
                self.sleep_timer.start(duration);
                self.schedule_sleep_tick();
            }
            None => {
                info!(session = %self.id, "Sleep timer off");
                self.sleep_timer.cancel();
                self.timers.cancel(TimerKey::SleepTimer);
            }
        }
    }

    /// Wakes up at the deadline, or earlier to refresh the countdown.
    fn schedule_sleep_tick(&mut self) {
        if let Some(remaining) = self.sleep_timer.remaining() {
            let refresh = Duration::from_secs(SLEEP_TIMER_REFRESH_SECONDS);
            self.timers
                .schedule(TimerKey::SleepTimer, remaining.min(refresh));
        }
    }

    fn on_sleep_timer_tick(&mut self) {
        if !self.sleep_timer.is_active() {
            return;
        }
        if self.sleep_timer.is_expired() {
            info!(session = %self.id, "Sleep timer expired");
            self.end(EndReason::SleepTimer);
        } else {
            self.schedule_sleep_tick();
        }
    }

    // ------------------------------------------------------------------
    // Numeric entry and quick switcher
    // ------------------------------------------------------------------

    fn on_digit(&mut self, digit: char) {
        if self.entry.push_digit(digit) {
            self.timers
                .schedule(TimerKey::EntryDebounce, self.config.number_entry.debounce());
        } else {
            debug!(session = %self.id, %digit, "Digit ignored");
        }
    }

    fn clear_entry(&mut self) {
        self.entry.clear();
        self.timers.cancel(TimerKey::EntryDebounce);
    }

    fn start_number_lookup(&mut self) {
        let Some((seq, number)) = self.entry.pending_lookup() else {
            return;
        };

        let directory = self.collaborators.directory.clone();
        let playlist_id = self.item.playlist_id.clone();
        let tx = self.tx.clone();
        let token = self.cancel.clone();
        debug!(session = %self.id, number, "Looking up channel number");

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = directory.by_number(playlist_id.as_deref(), number) => {
                    let _ = tx.send(Input::NumberLookup { seq, result });
                }
            }
        });
    }

    fn on_number_lookup(&mut self, seq: u64, result: Result<Option<Channel>, PlaybackError>) {
        let channel = match result {
            Ok(channel) => channel,
            Err(err) => {
                warn!(session = %self.id, "Channel lookup failed: {err}");
                None
            }
        };
        if !self.entry.apply_result(seq, channel) {
            debug!(session = %self.id, seq, "Dropping stale channel lookup");
        }
    }

    fn on_confirm_entry(&mut self) {
        if let Some(channel) = self.entry.found().cloned() {
            self.switch_channel(channel);
        }
    }

    fn on_show_switcher(&mut self) {
        if !self.item.is_live() {
            debug!(session = %self.id, "Switcher is only available for live content");
            return;
        }
        let Some(seq) = self.switcher.show() else {
            return;
        };

        let directory = self.collaborators.directory.clone();
        let tx = self.tx.clone();
        let token = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = directory.favorites() => {
                    let _ = tx.send(Input::Favorites { seq, result });
                }
            }
        });
    }

    fn on_favorites(&mut self, seq: u64, result: Result<Vec<Channel>, PlaybackError>) {
        let channels = match result {
            Ok(channels) => channels,
            Err(err) => {
                warn!(session = %self.id, "Cannot load favourites: {err}");
                Vec::new()
            }
        };
        let Some(epg_ids) = self.switcher.apply_favorites(seq, channels) else {
            return;
        };
        if epg_ids.is_empty() {
            return;
        }

        let directory = self.collaborators.directory.clone();
        let tx = self.tx.clone();
        let token = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = directory.now_playing_titles(&epg_ids) => {
                    let _ = tx.send(Input::Titles { seq, result });
                }
            }
        });
    }

    fn on_titles(&mut self, seq: u64, result: Result<HashMap<String, String>, PlaybackError>) {
        match result {
            Ok(titles) => {
                self.switcher.apply_titles(seq, titles);
            }
            Err(err) => warn!(session = %self.id, "Cannot load now-playing titles: {err}"),
        }
    }

    /// Ends the current item and starts a new session for `channel`.
    ///
    /// The sleep timer is kept: it belongs to the player surface.
    fn switch_channel(&mut self, channel: Channel) {
        let previous = self.id;
        info!(session = %previous, channel = %channel.name, number = channel.number, "Switching channel");

        self.flush_progress();
        self.stop_backend();
        for key in [
            TimerKey::OverlayHide,
            TimerKey::StallClock,
            TimerKey::RetryFire,
            TimerKey::EntryDebounce,
        ] {
            self.timers.cancel(key);
        }
        self.cancel.cancel();
        self.cancel = CancellationToken::new();

        self.id = SessionId::new();
        self.item = channel.to_playable_item();
        self.status = SessionStatus::Idle;
        self.route = None;
        self.engine = None;
        self.retry = RetryState::new();
        self.resume_ms = None;
        self.position_ms = None;
        self.duration_ms = None;
        self.last_progress_save = None;
        self.stall = StallClock::default();
        self.entry.clear();
        self.switcher.hide();

        self.events.broadcast(SessionEvent::ItemChanged {
            previous,
            session: self.id,
            item: self.item.clone(),
        });

        self.start_session();
        self.show_overlay();
    }

    // ------------------------------------------------------------------
    // Transport and progress
    // ------------------------------------------------------------------

    fn on_toggle_play_pause(&mut self) {
        let Some((engine, _)) = self.active else {
            return;
        };
        let paused = match self.status {
            SessionStatus::Playing => true,
            SessionStatus::Paused => false,
            _ => return,
        };
        self.drivers
            .get(engine)
            .send(DriverCommand::SetPaused(paused));
    }

    fn seek_to(&mut self, position_ms: u64) {
        if self.item.is_live() {
            return;
        }
        let Some((engine, _)) = self.active else {
            return;
        };
        let position_ms = match self.duration_ms {
            Some(duration) => position_ms.min(duration),
            None => position_ms,
        };
        self.position_ms = Some(position_ms);
        self.drivers.get(engine).send(DriverCommand::Seek(position_ms));
    }

    fn on_seek_relative(&mut self, direction: SeekDirection) {
        let step = self.config.seek_step_secs.saturating_mul(1000);
        let current = self.position_ms.unwrap_or(0);
        let target = match direction {
            SeekDirection::Forward => current.saturating_add(step),
            SeekDirection::Backward => current.saturating_sub(step),
        };
        self.seek_to(target);
    }

    fn on_time_update(&mut self, position_ms: u64, duration_ms: Option<u64>) {
        self.position_ms = Some(position_ms);
        if duration_ms.is_some() {
            self.duration_ms = duration_ms;
        }

        if self.item.is_live() {
            return;
        }
        let due = self
            .last_progress_save
            .map(|at| at.elapsed() >= self.config.progress_save_interval())
            .unwrap_or(true);
        if due {
            self.last_progress_save = Some(Instant::now());
            self.save_progress(position_ms, self.duration_ms);
        }
    }

    fn flush_progress(&mut self) {
        if self.item.is_live() {
            return;
        }
        if let Some(position_ms) = self.position_ms {
            self.save_progress(position_ms, self.duration_ms);
        }
    }

    /// Fire-and-forget write; failures never reach the session state.
    fn save_progress(&self, position_ms: u64, duration_ms: Option<u64>) {
        let progress = self.collaborators.progress.clone();
        let content_id = self.item.content_id.clone();
        let session = self.id;
        tokio::spawn(async move {
            if let Err(err) = progress.save(&content_id, position_ms, duration_ms).await {
                warn!(%session, %content_id, "Cannot save progress: {err}");
            }
        });
    }

    // ------------------------------------------------------------------
    // Teardown and publication
    // ------------------------------------------------------------------

    /// Stops playback, cancels every timed resource and in-flight call, and
    /// marks the session as ended.
    fn end(&mut self, reason: EndReason) {
        if self.ended {
            return;
        }
        info!(session = %self.id, ?reason, "Ending playback session");

        self.flush_progress();
        self.stop_backend();
        self.timers.cancel_all();
        self.sleep_timer.cancel();
        self.cancel.cancel();
        self.overlay_visible = false;
        self.set_status(SessionStatus::Ended);
        self.ended = true;

        self.events.broadcast(SessionEvent::Ended {
            session: self.id,
            reason,
        });
    }

    fn build_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session: self.id,
            item: self.item.clone(),
            status: self.status.clone(),
            engine: self.engine,
            retry: self.retry,
            buffering_secs: self.stall.elapsed_secs,
            stall: self.stall.stage,
            overlay_visible: self.overlay_visible,
            sleep_remaining_minutes: self.sleep_timer.remaining_minutes(),
            number_entry: self.entry.state().clone(),
            switcher: self.switcher.state().clone(),
            position_ms: self.position_ms,
            duration_ms: self.duration_ms,
        }
    }

    fn publish(&self) {
        let snapshot = self.build_snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}
