//! Group management: durable rosters, owner/admin authorization, and the
//! hub synchronization that keeps connected clients up to date.

/// Group service (authorization + roster mutations)
pub mod service;

/// HTTP handlers
pub mod handlers;

pub use service::GroupService;
