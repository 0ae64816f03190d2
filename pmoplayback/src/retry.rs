//! Bounded automatic retry and one-shot engine failover.
//!
//! The policy is a pure function of the attempt number. [`RetryState`] holds
//! the per-session counters and turns a decode error into a [`RetryDecision`]
//! the controller then carries out.

use std::time::Duration;

use serde::Serialize;

use crate::config::RetryConfig;
use crate::model::Engine;

/// Maps an attempt number to the wait before that attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delays: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delays: Vec<Duration>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delays,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts_per_engine,
            config
                .delays_secs
                .iter()
                .map(|secs| Duration::from_secs(*secs))
                .collect(),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before `attempt` (1-based). Attempts past the table reuse its
    /// last entry.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let index = (attempt.max(1) - 1) as usize;
        self.delays
            .get(index)
            .or_else(|| self.delays.last())
            .copied()
            .unwrap_or(Duration::from_secs(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// What the controller must do after a decode error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry on the same engine after `delay`.
    Retry {
        attempt: u32,
        engine: Engine,
        delay: Duration,
    },
    /// Switch to the other engine and retry after `delay`.
    Failover {
        attempt: u32,
        engine: Engine,
        delay: Duration,
    },
    /// Both engines are exhausted.
    Exhausted,
}

/// Retry counters scoped to one session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RetryState {
    /// Attempts on the current engine since it became active.
    pub retry_count: u32,
    /// Sticky once true: a session fails over at most once.
    pub has_tried_fallback: bool,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A frame was rendered: failure history for the engine is cleared.
    pub fn on_playing(&mut self) {
        self.retry_count = 0;
    }

    /// Consumes one decode error on `engine` and updates the counters.
    pub fn on_error(&mut self, engine: Engine, policy: &RetryPolicy) -> RetryDecision {
        let attempt = self.retry_count + 1;
        if attempt <= policy.max_attempts() {
            self.retry_count = attempt;
            return RetryDecision::Retry {
                attempt,
                engine,
                delay: policy.delay_for(attempt),
            };
        }

        if !self.has_tried_fallback {
            self.has_tried_fallback = true;
            self.retry_count = 1;
            return RetryDecision::Failover {
                attempt: 1,
                engine: engine.alternate(),
                delay: policy.delay_for(1),
            };
        }

        RetryDecision::Exhausted
    }

    /// Manual retry: full reset, failover becomes available again.
    pub fn reset(&mut self) {
        self.retry_count = 0;
        self.has_tried_fallback = false;
    }

    /// Manual switch to the other engine: counts as the session's failover.
    pub fn force_fallback(&mut self) {
        self.retry_count = 0;
        self.has_tried_fallback = true;
    }
}
