//! WebSocket client sessions: delivery handles, command dispatch, and the
//! per-connection read/write loop.

pub mod connection;
pub mod handler;
pub mod session;
