//! # huddle-jobs
//!
//! Background jobs for huddle. Currently one job: the deadline scheduler,
//! which sweeps tasks and projects on an interval, persists notifications
//! for approaching and overdue deadlines, and pushes real-time alerts
//! through the hub. Per-day dedup markers in the ephemeral store keep each
//! deadline from nagging more than once per calendar day.

pub mod scheduler;

pub use scheduler::{DeadlineScheduler, SchedulerConfig, SchedulerHandle, SweepStats};
