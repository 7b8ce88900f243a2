//! Structured logging schema and field name constants for the huddle hub.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized field names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), sweep completions |
//! | DEBUG | Decision points, room membership changes, cache hits/misses |
//! | TRACE | Per-event fan-out, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "api", "hub", "state", "db", "scheduler"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "registry", "rooms", "presence", "pool", "sweep"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "register", "join", "broadcast", "overdue_pass"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Authenticated user id on whose behalf the hub acts.
pub const USER_ID: &str = "user_id";

/// Connection UUID (v7, time-ordered).
pub const CONNECTION_ID: &str = "connection_id";

/// Room key (`user:<id>` or `project:<id>`).
pub const ROOM: &str = "room";

/// Project id embedded in an inbound event.
pub const PROJECT_ID: &str = "project_id";

/// Task id embedded in an inbound event.
pub const TASK_ID: &str = "task_id";

/// Inbound/outbound wire event name.
pub const EVENT: &str = "event";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of recipients reached by a fan-out.
pub const RECIPIENT_COUNT: &str = "recipient_count";

/// Number of entities examined by a scheduler pass.
pub const ENTITY_COUNT: &str = "entity_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
