//! Quick channel switcher panel state.

use std::collections::HashMap;

use crate::model::Channel;
use crate::snapshot::SwitcherState;

#[derive(Debug, Default)]
pub(crate) struct Switcher {
    state: SwitcherState,
    seq: u64,
}

impl Switcher {
    pub(crate) fn state(&self) -> &SwitcherState {
        &self.state
    }

    /// Opens the panel. Returns the sequence number the favourites request
    /// must carry, or `None` when the panel was already open.
    pub(crate) fn show(&mut self) -> Option<u64> {
        if self.state.visible {
            return None;
        }
        self.state.visible = true;
        self.seq += 1;
        Some(self.seq)
    }

    /// Closes the panel and drops the list and the title cache.
    pub(crate) fn hide(&mut self) {
        self.state = SwitcherState::default();
        self.seq += 1;
    }

    /// Stores the favourites. Returns the EPG ids whose titles should be
    /// fetched, or `None` when the answer is stale.
    pub(crate) fn apply_favorites(&mut self, seq: u64, channels: Vec<Channel>) -> Option<Vec<String>> {
        if seq != self.seq || !self.state.visible {
            return None;
        }
        let mut epg_ids: Vec<String> = channels
            .iter()
            .filter_map(|c| c.epg_id.clone())
            .filter(|id| !self.state.now_playing.contains_key(id))
            .collect();
        epg_ids.sort_unstable();
        epg_ids.dedup();
        self.state.channels = channels;
        Some(epg_ids)
    }

    pub(crate) fn apply_titles(&mut self, seq: u64, titles: HashMap<String, String>) -> bool {
        if seq != self.seq || !self.state.visible {
            return false;
        }
        self.state.now_playing.extend(titles);
        true
    }
}
