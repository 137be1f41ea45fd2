//! # lookout-core
//!
//! Foundation types shared by every Lookout crate:
//!
//! - **Branded IDs**: [`ConnectionId`], [`VesselId`] as newtypes for type safety
//! - **Claims**: the authenticated attributes of a connection
//! - **Groups**: the typed broadcast topic enum and its wire format
//! - **Retry**: backoff policy used by the feed ingester
//! - **Logging**: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod claims;
pub mod errors;
pub mod groups;
pub mod ids;
pub mod logging;
pub mod metrics;
pub mod retry;

pub use claims::{Claims, DISPATCHER_ROLE};
pub use errors::GroupParseError;
pub use groups::Group;
pub use ids::{ConnectionId, VesselId};
pub use retry::BackoffPolicy;
