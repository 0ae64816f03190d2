//! Observable state published to the rendering layer.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::errors::StreamErrorKind;
use crate::model::{Channel, Engine, PlayableItem, SessionId};
use crate::retry::RetryState;

/// State-machine state of a session. Exactly one is current at any time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SessionStatus {
    Idle,
    Routing,
    Loading,
    Playing,
    Paused,
    Retrying { attempt: u32, engine: Engine },
    /// User-recoverable error.
    Error { kind: StreamErrorKind },
    /// Retries and failover exhausted.
    Failed,
    /// Dismissed or stopped by the sleep timer; nothing follows.
    Ended,
}

impl SessionStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionStatus::Loading)
    }

    /// Media is established and transport commands make sense.
    pub fn is_established(&self) -> bool {
        matches!(self, SessionStatus::Playing | SessionStatus::Paused)
    }

    /// States where manual retry is offered.
    pub fn is_recoverable_failure(&self) -> bool {
        matches!(self, SessionStatus::Error { .. } | SessionStatus::Failed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Idle => f.write_str("idle"),
            SessionStatus::Routing => f.write_str("routing"),
            SessionStatus::Loading => f.write_str("loading"),
            SessionStatus::Playing => f.write_str("playing"),
            SessionStatus::Paused => f.write_str("paused"),
            SessionStatus::Retrying { attempt, engine } => {
                write!(f, "retrying (attempt {attempt}, {engine})")
            }
            SessionStatus::Error { kind } => write!(f, "error ({kind})"),
            SessionStatus::Failed => f.write_str("failed"),
            SessionStatus::Ended => f.write_str("ended"),
        }
    }
}

/// How far stall escalation has progressed while `Loading`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StallStage {
    #[default]
    None,
    /// Buffering beyond the configured threshold: show "stream is slow".
    SlowStream,
    /// Threshold + grace exceeded: Retry and Try-alternate-engine are offered.
    ManualActions,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "channel")]
pub enum LookupResult {
    #[default]
    NotSearching,
    Searching,
    Found(Channel),
    NotFound,
}

/// Numeric channel entry: typed digits and the lookup outcome.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NumberEntryState {
    pub digits: String,
    pub result: LookupResult,
}

impl NumberEntryState {
    pub fn is_active(&self) -> bool {
        !self.digits.is_empty()
    }
}

/// Quick channel switcher panel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SwitcherState {
    pub visible: bool,
    pub channels: Vec<Channel>,
    /// Now-playing titles keyed by EPG identifier.
    pub now_playing: HashMap<String, String>,
}

impl SwitcherState {
    pub fn now_playing_for(&self, channel: &Channel) -> Option<&str> {
        channel
            .epg_id
            .as_ref()
            .and_then(|epg| self.now_playing.get(epg))
            .map(String::as_str)
    }
}

/// Read-only view of a session, republished after every processed input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub session: SessionId,
    pub item: PlayableItem,
    pub status: SessionStatus,
    pub engine: Option<Engine>,
    pub retry: RetryState,
    pub buffering_secs: u64,
    pub stall: StallStage,
    pub overlay_visible: bool,
    pub sleep_remaining_minutes: Option<u32>,
    pub number_entry: NumberEntryState,
    pub switcher: SwitcherState,
    pub position_ms: Option<u64>,
    pub duration_ms: Option<u64>,
}

impl SessionSnapshot {
    pub fn new(session: SessionId, item: PlayableItem) -> Self {
        Self {
            session,
            item,
            status: SessionStatus::Idle,
            engine: None,
            retry: RetryState::default(),
            buffering_secs: 0,
            stall: StallStage::None,
            overlay_visible: false,
            sleep_remaining_minutes: None,
            number_entry: NumberEntryState::default(),
            switcher: SwitcherState::default(),
            position_ms: None,
            duration_ms: None,
        }
    }

    /// Message for the error screen, if the session is in a failure state.
    pub fn error_message(&self) -> Option<String> {
        match &self.status {
            SessionStatus::Error { kind } => Some(kind.user_message()),
            SessionStatus::Failed => Some(
                "Playback failed on both players. Retry or close this stream.".to_string(),
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContentKind;

    #[test]
    fn test_status_display() {
        let status = SessionStatus::Retrying {
            attempt: 2,
            engine: Engine::Alternate,
        };
        assert_eq!(status.to_string(), "retrying (attempt 2, alternate)");
        assert!(SessionStatus::Failed.is_recoverable_failure());
        assert!(!SessionStatus::Loading.is_established());
    }

    #[test]
    fn test_error_message() {
        let item = PlayableItem::new("1", "One", "http://x/1.m3u8", ContentKind::Live);
        let mut snapshot = SessionSnapshot::new(SessionId::new(), item);
        assert_eq!(snapshot.error_message(), None);

        snapshot.status = SessionStatus::Error {
            kind: StreamErrorKind::StreamUnavailable,
        };
        assert!(snapshot.error_message().unwrap().contains("not available"));
    }

    #[test]
    fn test_snapshot_serializes() {
        let item = PlayableItem::new("1", "One", "http://x/1.m3u8", ContentKind::OnDemand);
        let snapshot = SessionSnapshot::new(SessionId::new(), item);
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["status"]["state"], "idle");
        assert_eq!(value["item"]["kind"], "on_demand");
    }
}
