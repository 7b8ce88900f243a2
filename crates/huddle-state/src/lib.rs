//! # huddle-state
//!
//! Ephemeral state store implementations for the huddle hub.
//!
//! This crate provides:
//! - [`RedisStore`]: Redis-backed store with graceful degradation — on
//!   connection failure every operation returns a miss/false and the
//!   caller recomputes from source data instead of crashing.
//! - [`MemoryStore`]: in-process store with the same contract, used for
//!   tests and Redis-less deployments.
//! - Typed helpers over the raw contract: [`ProjectSnapshotCache`] and
//!   [`ActivityLog`], plus the [`keys`] module holding every key shape
//!   this system writes.

pub mod helpers;
pub mod keys;
pub mod memory;
pub mod redis_store;

pub use helpers::{ActivityLog, ProjectSnapshotCache};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

// Re-export the trait so consumers need only this crate.
pub use huddle_core::EphemeralStore;
