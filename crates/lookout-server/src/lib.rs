//! # lookout-server
//!
//! Axum HTTP + `WebSocket` server and group-scoped event broadcasting.
//!
//! - Connection registry and group membership, fanned out by [`hub::BroadcastHub`]
//! - Typed producer helpers in [`notify`]
//! - `WebSocket` gateway: token auth, greeting, heartbeat, join/leave commands
//! - HTTP: health, Prometheus metrics, presence and vessel position queries
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod auth;
pub mod health;
pub mod hub;
pub mod metrics;
pub mod notify;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use auth::{AuthError, Authenticated, ClaimsResolver, JwtClaimsResolver, SharedResolver};
pub use hub::{BroadcastHub, ConnectionInfo, PresenceFilter};
pub use notify::ChangeKind;
pub use server::{AppState, LookoutServer};
pub use shutdown::ShutdownCoordinator;
