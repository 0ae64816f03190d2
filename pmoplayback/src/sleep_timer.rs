//! Sleep timer for the auto-stop feature.
//!
//! Only keeps the deadline bookkeeping; the controller owns the matching
//! `TimerKey::SleepTimer` entry that actually fires.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::constants::SLEEP_TIMER_CHOICES_MINUTES;

/// Durations offered by the sleep timer menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SleepDuration {
    Minutes15,
    Minutes30,
    Minutes60,
    Minutes90,
}

impl SleepDuration {
    pub const ALL: [SleepDuration; 4] = [
        SleepDuration::Minutes15,
        SleepDuration::Minutes30,
        SleepDuration::Minutes60,
        SleepDuration::Minutes90,
    ];

    pub fn minutes(&self) -> u32 {
        match self {
            SleepDuration::Minutes15 => SLEEP_TIMER_CHOICES_MINUTES[0],
            SleepDuration::Minutes30 => SLEEP_TIMER_CHOICES_MINUTES[1],
            SleepDuration::Minutes60 => SLEEP_TIMER_CHOICES_MINUTES[2],
            SleepDuration::Minutes90 => SLEEP_TIMER_CHOICES_MINUTES[3],
        }
    }

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.minutes() == minutes)
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.minutes()) * 60)
    }
}

impl fmt::Display for SleepDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min", self.minutes())
    }
}

/// Sleep timer state.
#[derive(Debug, Clone, Default)]
pub struct SleepTimer {
    /// When the timer expires (None if no timer active).
    end_time: Option<Instant>,
    /// Duration selected by the user.
    selected: Option<SleepDuration>,
}

impl SleepTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts or restarts the timer. The last selection wins.
    pub fn start(&mut self, duration: SleepDuration) -> Instant {
        let end = Instant::now() + duration.as_duration();
        self.selected = Some(duration);
        self.end_time = Some(end);
        end
    }

    pub fn cancel(&mut self) {
        self.end_time = None;
        self.selected = None;
    }

    pub fn is_active(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn selected(&self) -> Option<SleepDuration> {
        self.selected
    }

    pub fn is_expired(&self) -> bool {
        self.end_time
            .map(|end| Instant::now() >= end)
            .unwrap_or(false)
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.end_time
            .map(|end| end.saturating_duration_since(Instant::now()))
    }

    /// Remaining whole minutes, rounded up so the display never shows 0
    /// while the timer still runs.
    pub fn remaining_minutes(&self) -> Option<u32> {
        self.remaining().map(|remaining| {
            let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            secs.div_ceil(60) as u32
        })
    }
}
