//! Channel lookups used by numeric entry and the quick switcher.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::errors::PlaybackError;
use crate::model::Channel;

#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    /// Channel carrying `number` in `playlist_id` (any playlist when `None`).
    async fn by_number(
        &self,
        playlist_id: Option<&str>,
        number: u32,
    ) -> Result<Option<Channel>, PlaybackError>;

    async fn favorites(&self) -> Result<Vec<Channel>, PlaybackError>;

    /// Current programme title for each EPG id that has one.
    async fn now_playing_titles(
        &self,
        epg_ids: &[String],
    ) -> Result<HashMap<String, String>, PlaybackError>;
}

#[derive(Debug, Default)]
struct DirectoryData {
    channels: Vec<Channel>,
    favorites: Vec<String>,
    titles: HashMap<String, String>,
}

/// In-memory directory, filled by the host after a playlist import.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    data: RwLock<DirectoryData>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channels(channels: Vec<Channel>) -> Self {
        let directory = Self::new();
        directory.data.write().channels = channels;
        directory
    }

    pub fn add_channel(&self, channel: Channel) {
        self.data.write().channels.push(channel);
    }

    /// Marks a channel id as favourite; favourites keep insertion order.
    pub fn add_favorite(&self, channel_id: impl Into<String>) {
        let channel_id = channel_id.into();
        let mut data = self.data.write();
        if !data.favorites.contains(&channel_id) {
            data.favorites.push(channel_id);
        }
    }

    pub fn set_now_playing(&self, epg_id: impl Into<String>, title: impl Into<String>) {
        self.data.write().titles.insert(epg_id.into(), title.into());
    }
}

#[async_trait]
impl ChannelDirectory for MemoryDirectory {
    async fn by_number(
        &self,
        playlist_id: Option<&str>,
        number: u32,
    ) -> Result<Option<Channel>, PlaybackError> {
        let data = self.data.read();
        Ok(data
            .channels
            .iter()
            .find(|c| {
                c.number == number
                    && (playlist_id.is_none() || c.playlist_id.as_deref() == playlist_id)
            })
            .cloned())
    }

    async fn favorites(&self) -> Result<Vec<Channel>, PlaybackError> {
        let data = self.data.read();
        Ok(data
            .favorites
            .iter()
            .filter_map(|id| data.channels.iter().find(|c| &c.id == id).cloned())
            .collect())
    }

    async fn now_playing_titles(
        &self,
        epg_ids: &[String],
    ) -> Result<HashMap<String, String>, PlaybackError> {
        let data = self.data.read();
        Ok(epg_ids
            .iter()
            .filter_map(|id| data.titles.get(id).map(|t| (id.clone(), t.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(id: &str, playlist: &str, number: u32, epg: Option<&str>) -> Channel {
        Channel {
            id: id.to_string(),
            playlist_id: Some(playlist.to_string()),
            number,
            name: format!("Channel {number}"),
            stream_url: format!("http://host/{id}.m3u8"),
            epg_id: epg.map(str::to_string),
            logo_url: None,
            group: None,
        }
    }

    #[tokio::test]
    async fn test_by_number_is_scoped_to_playlist() {
        let directory = MemoryDirectory::with_channels(vec![
            channel("a", "pl-1", 7, None),
            channel("b", "pl-2", 7, None),
        ]);

        let found = directory.by_number(Some("pl-2"), 7).await.unwrap();
        assert_eq!(found.unwrap().id, "b");
        assert!(directory.by_number(Some("pl-3"), 7).await.unwrap().is_none());
        assert_eq!(directory.by_number(None, 7).await.unwrap().unwrap().id, "a");
    }

    #[tokio::test]
    async fn test_favorites_and_titles() {
        let directory = MemoryDirectory::with_channels(vec![
            channel("a", "pl", 1, Some("a.epg")),
            channel("b", "pl", 2, None),
        ]);
        directory.add_favorite("b");
        directory.add_favorite("a");
        directory.add_favorite("a");
        directory.add_favorite("missing");
        directory.set_now_playing("a.epg", "Evening News");

        let favorites = directory.favorites().await.unwrap();
        assert_eq!(
            favorites.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            vec!["b", "a"]
        );

        let titles = directory
            .now_playing_titles(&["a.epg".to_string(), "other".to_string()])
            .await
            .unwrap();
        assert_eq!(titles.len(), 1);
        assert_eq!(titles["a.epg"], "Evening News");
    }
}
