//! User endpoints: CRUD lookups plus the presence query that
//! cross-references the hub's registry with persisted user records.

/// HTTP handlers
pub mod handlers;
