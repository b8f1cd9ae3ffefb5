//! XFChat - Real-time Chat Backend
//!
//! XFChat is a real-time chat backend built with Rust. Clients connect over
//! WebSocket, join named groups, and exchange direct or group-addressed
//! messages while a presence feed announces who is online.
//!
//! # Module Structure
//!
//! The library is organized into two main modules:
//!
//! - **`shared`** - Wire-protocol types shared with clients
//!   - Message structures, group-update payloads
//!
//! - **`backend`** - Server-side code
//!   - The connection hub (registry, group index, router, presence)
//!   - Axum HTTP server with the WebSocket upgrade endpoint
//!   - User and group CRUD services
//!   - Database persistence (PostgreSQL)
//!
//! # Architecture
//!
//! The hard core is the connection hub: a process-wide registry of live
//! WebSocket connections, the group membership index layered over it, and
//! the routing/backpressure policy that delivers a message to zero, one, or
//! many recipients without letting a stalled peer block anyone else. The
//! HTTP/CRUD surface around it is peripheral and talks to the hub only
//! through its public operations.

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
pub mod backend;
