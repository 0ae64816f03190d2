//! Value types shared by the session controller and its collaborators.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one playback session.
///
/// A channel switch re-initialises the controller with a fresh id: it is a new
/// session, not a continuation of the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether the item is a live channel or on-demand content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    #[default]
    Live,
    OnDemand,
}

/// What is being played. Built once when a session starts, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayableItem {
    pub content_id: String,
    pub playlist_id: Option<String>,
    pub name: String,
    pub stream_url: String,
    pub group: Option<String>,
    pub poster_url: Option<String>,
    pub kind: ContentKind,
}

impl PlayableItem {
    pub fn new(
        content_id: impl Into<String>,
        name: impl Into<String>,
        stream_url: impl Into<String>,
        kind: ContentKind,
    ) -> Self {
        Self {
            content_id: content_id.into(),
            playlist_id: None,
            name: name.into(),
            stream_url: stream_url.into(),
            group: None,
            poster_url: None,
            kind,
        }
    }

    pub fn with_playlist(mut self, playlist_id: impl Into<String>) -> Self {
        self.playlist_id = Some(playlist_id.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_poster(mut self, poster_url: impl Into<String>) -> Self {
        self.poster_url = Some(poster_url.into());
        self
    }

    pub fn is_live(&self) -> bool {
        matches!(self.kind, ContentKind::Live)
    }
}

/// One of the two interchangeable decode backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    Primary,
    Alternate,
}

impl Engine {
    /// The other engine, used for failover.
    pub fn alternate(self) -> Engine {
        match self {
            Engine::Primary => Engine::Alternate,
            Engine::Alternate => Engine::Primary,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Primary => "primary",
            Engine::Alternate => "alternate",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of routing a candidate URL.
///
/// Kept for the whole session so retries and failover replay it without
/// asking the router again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRoute {
    pub engine: Engine,
    pub url: String,
    pub reason: String,
}

/// A channel as known by the channel directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub playlist_id: Option<String>,
    pub number: u32,
    pub name: String,
    pub stream_url: String,
    pub epg_id: Option<String>,
    pub logo_url: Option<String>,
    pub group: Option<String>,
}

impl Channel {
    /// Builds the item a new session plays when this channel is selected.
    pub fn to_playable_item(&self) -> PlayableItem {
        PlayableItem {
            content_id: self.id.clone(),
            playlist_id: self.playlist_id.clone(),
            name: self.name.clone(),
            stream_url: self.stream_url.clone(),
            group: self.group.clone(),
            poster_url: self.logo_url.clone(),
            kind: ContentKind::Live,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_alternate_is_involutive() {
        assert_eq!(Engine::Primary.alternate(), Engine::Alternate);
        assert_eq!(Engine::Alternate.alternate(), Engine::Primary);
        assert_eq!(Engine::Primary.alternate().alternate(), Engine::Primary);
    }

    #[test]
    fn test_channel_to_playable_item() {
        let channel = Channel {
            id: "ch-72".to_string(),
            playlist_id: Some("pl-1".to_string()),
            number: 72,
            name: "News 72".to_string(),
            stream_url: "http://example.test/72.m3u8".to_string(),
            epg_id: Some("news72.fr".to_string()),
            logo_url: None,
            group: Some("News".to_string()),
        };

        let item = channel.to_playable_item();
        assert_eq!(item.content_id, "ch-72");
        assert_eq!(item.playlist_id.as_deref(), Some("pl-1"));
        assert!(item.is_live());
    }
}
