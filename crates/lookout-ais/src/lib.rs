//! # lookout-ais
//!
//! Live vessel positions from a third-party AIS WebSocket feed.
//!
//! - [`PositionStore`]: concurrent latest-known state per vessel
//! - [`StreamIngester`]: long-lived feed subscription with exponential
//!   backoff, driven as an explicit state machine and cancelled through a
//!   `CancellationToken`
//! - [`frames`]: subscribe frame encoding and position report decoding
//! - [`transport`]: the connection seam, with a `tokio-tungstenite`
//!   implementation

#![deny(unsafe_code)]

pub mod errors;
pub mod frames;
pub mod ingester;
pub mod record;
pub mod store;
pub mod transport;

pub use errors::{IngestError, Result};
pub use ingester::{IngesterState, StreamIngester};
pub use record::ShipRecord;
pub use store::PositionStore;
pub use transport::{FeedFrame, FeedSession, FeedTransport, WebSocketTransport};
