//! Node capabilities driven by the audio thread.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::transport::TransportPosition;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique node identity, used for cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Per-block arguments handed to every node.
#[derive(Debug, Clone, Copy)]
pub struct ProcessContext {
    pub rolling: bool,
    pub transport: TransportPosition,
    /// Frames in this block.
    pub frames: usize,
    /// Absolute frame counter at block start. Advances even when stopped.
    pub time: u64,
}

impl ProcessContext {
    pub fn new(transport: TransportPosition, frames: usize, time: u64) -> Self {
        Self {
            rolling: transport.rolling,
            transport,
            frames,
            time,
        }
    }
}

/// Per-block processing, called on the audio thread.
///
/// Implementations must not block, allocate or lock. A call that overlaps
/// another call on the same node may skip its pass.
pub trait Processor: Send + Sync {
    fn process(&self, ctx: &ProcessContext);

    /// Called after a transport relocation. Time-anchored state should be
    /// cleared or rebuilt.
    fn reposition(&self) {}
}
