//! Resume positions for on-demand content.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::PlaybackError;

/// Persistence for playback progress.
///
/// The controller treats writes as best-effort: failures are logged and never
/// change the playback state.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn load(&self, content_id: &str) -> Result<Option<u64>, PlaybackError>;

    async fn save(
        &self,
        content_id: &str,
        position_ms: u64,
        duration_ms: Option<u64>,
    ) -> Result<(), PlaybackError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SavedProgress {
    pub position_ms: u64,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    entries: Mutex<HashMap<String, SavedProgress>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, content_id: &str) -> Option<SavedProgress> {
        self.entries.lock().get(content_id).copied()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn load(&self, content_id: &str) -> Result<Option<u64>, PlaybackError> {
        Ok(self.get(content_id).map(|p| p.position_ms))
    }

    async fn save(
        &self,
        content_id: &str,
        position_ms: u64,
        duration_ms: Option<u64>,
    ) -> Result<(), PlaybackError> {
        self.entries.lock().insert(
            content_id.to_string(),
            SavedProgress {
                position_ms,
                duration_ms,
            },
        );
        Ok(())
    }
}
