//! # huddle-core
//!
//! Core types, traits, and abstractions for the huddle collaboration hub.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the other huddle crates depend on: the error taxonomy, the real-time
//! wire protocol, shared models, and the seams (access gate, ephemeral store,
//! identity, persistence) that concrete backends implement.

pub mod defaults;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{ClientEvent, DeadlineTier, ServerEvent};
pub use models::{
    ActivityEntry, DueProject, DueTask, NewNotification, Notification, NotificationKind,
    PresenceStatus, ProjectRole, RoomKey, TaskContext, UserId,
};
pub use traits::{
    AccessGate, DeadlineRepository, EphemeralStore, IdentityProvider, NotificationRepository,
};
