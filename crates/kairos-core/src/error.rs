//! Error types for kairos-core.

use crate::NodeId;
use thiserror::Error;

/// Error type for kairos-core operations.
///
/// Every variant is raised on the script thread. The audio path never
/// returns errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unsupported {cache} key: {key}")]
    UnsupportedKey { cache: &'static str, key: String },

    #[error("Connecting {from} to {owner} would create a cycle")]
    WouldCreateCycle { from: NodeId, owner: NodeId },

    #[error("{handler} handler should take {expected} argument(s), got {found}")]
    HandlerArity {
        handler: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{what} index {index} out of range (0..{len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("{cache} cache is full ({capacity} live entries)")]
    CacheFull {
        cache: &'static str,
        capacity: usize,
    },

    #[error("{queue} queue is full ({capacity} pending)")]
    QueueFull {
        queue: &'static str,
        capacity: usize,
    },

    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Not implemented: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
