//! Default timings and bounds for a playback session.
//!
//! Every value here is the default of a `PlaybackConfig` field; the config
//! module is where they can be overridden.

// ============================================================================
// Retry / failover
// ============================================================================

/// Automatic retries allowed on one engine before failing over (or failing).
pub const MAX_RETRIES_PER_ENGINE: u32 = 3;

/// Wait before retry attempt 1, 2 and 3+ (seconds).
///
/// Attempts beyond the list reuse the last entry: 1s → 3s → 7s → 7s …
pub const RETRY_DELAYS_SECONDS: [u64; 3] = [1, 3, 7];

// ============================================================================
// Stall escalation
// ============================================================================

/// Default buffering threshold before the "stream is slow" notice (seconds).
pub const DEFAULT_BUFFER_TIMEOUT_SECONDS: u64 = 10;

/// Values the buffering threshold preference may take.
pub const BUFFER_TIMEOUT_CHOICES: [u64; 5] = [5, 10, 15, 20, 30];

/// Extra buffering time after the threshold before Retry and
/// Try-alternate-engine are offered (seconds).
pub const MANUAL_ACTIONS_GRACE_SECONDS: u64 = 20;

/// Period of the stall clock tick (seconds).
pub const STALL_TICK_SECONDS: u64 = 1;

// ============================================================================
// Overlay / sleep timer
// ============================================================================

/// Transport overlay auto-hide delay (seconds).
pub const OVERLAY_HIDE_SECONDS: u64 = 5;

/// Durations offered by the sleep timer menu (minutes).
pub const SLEEP_TIMER_CHOICES_MINUTES: [u32; 4] = [15, 30, 60, 90];

/// Maximum spacing between two sleep timer countdown refreshes (seconds).
pub const SLEEP_TIMER_REFRESH_SECONDS: u64 = 60;

// ============================================================================
// Numeric channel entry
// ============================================================================

/// Longest channel number accepted from the remote.
pub const NUMBER_ENTRY_MAX_DIGITS: usize = 4;

/// Quiet period after the last digit before the lookup runs (milliseconds).
pub const NUMBER_ENTRY_DEBOUNCE_MS: u64 = 1000;

// ============================================================================
// Transport / progress
// ============================================================================

/// Relative seek step (seconds).
pub const SEEK_STEP_SECONDS: u64 = 10;

/// Minimum spacing between two forwarded progress writes (milliseconds).
pub const PROGRESS_SAVE_INTERVAL_MS: u64 = 500;

// ============================================================================
// Configuration bounds
// ============================================================================

/// Upper bound for any configured timer delay (seconds).
pub const MAX_TIMER_DELAY_SECONDS: u64 = 24 * 60 * 60;

/// Upper bound for the manual actions grace and the relative seek step (seconds).
pub const MAX_STEP_SECONDS: u64 = 10 * 60;
