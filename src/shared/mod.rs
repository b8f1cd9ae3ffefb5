//! Shared Module
//!
//! This module contains the wire-protocol types exchanged between the server
//! and connected clients. Every frame on a chat WebSocket is one JSON-encoded
//! [`WireMessage`]; the server also uses the same shape for the presence and
//! group-update messages it originates.

/// Wire message data structures
pub mod message;

/// Re-export commonly used types for convenience
pub use message::{GroupUpdate, MessageKind, WireMessage};
