//! Centralized default constants for the huddle hub.
//!
//! **This module is the single source of truth** for shared default values.
//! All crates reference these constants instead of defining their own
//! magic numbers. When adding new constants, place them in the appropriate
//! section and document the rationale for the chosen value.

// =============================================================================
// PRESENCE
// =============================================================================

/// TTL for `presence:<userId>` keys. Absence of the key means offline;
/// a client that stops refreshing goes dark after this window.
pub const PRESENCE_TTL_SECS: u64 = 300;

// =============================================================================
// CACHING
// =============================================================================

/// TTL for cached project snapshots. Staleness within the TTL is
/// tolerated; staleness after an un-invalidated write is a bug.
pub const PROJECT_SNAPSHOT_TTL_SECS: u64 = 900;

/// TTL for `activity:<projectId>` lists, refreshed on every write.
pub const ACTIVITY_LOG_TTL_SECS: u64 = 86_400;

/// Maximum entries retained in a project's recent-activity list.
pub const ACTIVITY_LOG_MAX_ENTRIES: usize = 50;

// =============================================================================
// DEADLINE SCHEDULER
// =============================================================================

/// Interval between deadline sweeps.
pub const SWEEP_INTERVAL_SECS: u64 = 3_600;

/// Forward window for approaching-deadline alerts.
pub const APPROACHING_WINDOW_HOURS: i64 = 24;

/// Forward window for the early-reminder tier.
pub const EARLY_REMINDER_WINDOW_HOURS: i64 = 48;

/// TTL for per-day notification dedup markers. One calendar day, so a
/// task overdue for multiple days re-notifies once per day.
pub const DEDUP_MARKER_TTL_SECS: u64 = 86_400;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 4000;

/// WebSocket ping keepalive interval in seconds.
pub const WS_PING_INTERVAL_SECS: u64 = 30;
