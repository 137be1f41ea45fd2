//! Core error types.

use thiserror::Error;

/// A wire string that is not a valid group name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupParseError {
    /// The group name was empty.
    #[error("group name is empty")]
    Empty,
    /// The name does not start with a known group prefix.
    #[error("unknown group: {0}")]
    UnknownPrefix(String),
    /// The prefix is known but the key after it is not valid.
    #[error("invalid key '{key}' in group {group}")]
    InvalidKey {
        /// Full group name as received.
        group: String,
        /// The offending key.
        key: String,
    },
}
