//! Digit buffer and lookup bookkeeping for numeric channel entry.
//!
//! Every change to the buffer bumps a sequence number; a lookup result is
//! only applied when it carries the current one, so a slow answer for "7"
//! can never overwrite the answer for "72".

use crate::model::Channel;
use crate::snapshot::{LookupResult, NumberEntryState};

#[derive(Debug)]
pub(crate) struct NumberEntry {
    state: NumberEntryState,
    max_digits: usize,
    seq: u64,
}

impl NumberEntry {
    pub(crate) fn new(max_digits: usize) -> Self {
        Self {
            state: NumberEntryState::default(),
            max_digits,
            seq: 0,
        }
    }

    pub(crate) fn state(&self) -> &NumberEntryState {
        &self.state
    }

    /// Appends a digit. Returns false when the input was rejected (not a
    /// digit, or the buffer is full).
    pub(crate) fn push_digit(&mut self, digit: char) -> bool {
        if !digit.is_ascii_digit() || self.state.digits.len() >= self.max_digits {
            return false;
        }
        self.state.digits.push(digit);
        self.state.result = LookupResult::Searching;
        self.seq += 1;
        true
    }

    /// The lookup to run once the debounce window closes: `(seq, number)`.
    pub(crate) fn pending_lookup(&self) -> Option<(u64, u32)> {
        if !matches!(self.state.result, LookupResult::Searching) {
            return None;
        }
        let number = self.state.digits.parse::<u32>().ok()?;
        Some((self.seq, number))
    }

    /// Applies a lookup answer. Returns false for a stale answer.
    pub(crate) fn apply_result(&mut self, seq: u64, channel: Option<Channel>) -> bool {
        if seq != self.seq || self.state.digits.is_empty() {
            return false;
        }
        self.state.result = match channel {
            Some(channel) => LookupResult::Found(channel),
            None => LookupResult::NotFound,
        };
        true
    }

    pub(crate) fn found(&self) -> Option<&Channel> {
        match &self.state.result {
            LookupResult::Found(channel) => Some(channel),
            _ => None,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.state = NumberEntryState::default();
        self.seq += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(number: u32) -> Channel {
        Channel {
            id: format!("ch-{number}"),
            playlist_id: None,
            number,
            name: format!("Channel {number}"),
            stream_url: format!("http://host/{number}.m3u8"),
            epg_id: None,
            logo_url: None,
            group: None,
        }
    }

    #[test]
    fn test_digits_accumulate_and_search() {
        let mut entry = NumberEntry::new(4);
        assert!(entry.pending_lookup().is_none());

        assert!(entry.push_digit('7'));
        assert!(entry.push_digit('2'));
        assert_eq!(entry.state().digits, "72");
        assert_eq!(entry.state().result, LookupResult::Searching);

        let (seq, number) = entry.pending_lookup().unwrap();
        assert_eq!(number, 72);
        assert!(entry.apply_result(seq, Some(channel(72))));
        assert_eq!(entry.found().map(|c| c.number), Some(72));
        assert!(entry.pending_lookup().is_none());
    }

    #[test]
    fn test_rejects_non_digits_and_overflow() {
        let mut entry = NumberEntry::new(2);
        assert!(!entry.push_digit('x'));
        assert!(entry.push_digit('1'));
        assert!(entry.push_digit('0'));
        assert!(!entry.push_digit('5'));
        assert_eq!(entry.state().digits, "10");
    }

    #[test]
    fn test_stale_result_is_ignored() {
        let mut entry = NumberEntry::new(4);
        entry.push_digit('7');
        let (stale_seq, _) = entry.pending_lookup().unwrap();
        entry.push_digit('2');

        assert!(!entry.apply_result(stale_seq, Some(channel(7))));
        assert_eq!(entry.state().result, LookupResult::Searching);

        let (seq, _) = entry.pending_lookup().unwrap();
        assert!(entry.apply_result(seq, None));
        assert_eq!(entry.state().result, LookupResult::NotFound);
        assert!(entry.found().is_none());
    }

    #[test]
    fn test_clear_invalidates_in_flight_lookup() {
        let mut entry = NumberEntry::new(4);
        entry.push_digit('3');
        let (seq, _) = entry.pending_lookup().unwrap();
        entry.clear();

        assert!(!entry.apply_result(seq, Some(channel(3))));
        assert_eq!(*entry.state(), NumberEntryState::default());
    }
}
