//! Mono audio routing between nodes.
//!
//! A [`Source`] exposes numbered [`AudioConnection`]s. A sink owns
//! [`AudioConnector`]s that each point at one source output. Connectors
//! refuse any edge that would close a cycle, so pulling inputs recursively
//! always terminates.

mod buffers;
mod connection;
mod connector;
mod feed;
mod mixer;

use std::collections::HashSet;
use std::sync::Arc;

pub use buffers::GraphBuffers;
pub use connection::{AudioConnection, Source};
pub use connector::{AudioConnector, AudioLink};
pub use feed::{AudioFeed, AudioFeedHandle};
pub use mixer::AudioMixer;

use crate::NodeId;

/// Depth-first search from `start` for a node with id `target`.
///
/// Shared by audio and MIDI routing; `id` and `inputs` describe the graph.
pub fn reaches<N: ?Sized>(
    start: Vec<Arc<N>>,
    target: NodeId,
    id: impl Fn(&N) -> NodeId,
    inputs: impl Fn(&N) -> Vec<Arc<N>>,
) -> bool {
    let mut stack = start;
    let mut seen = HashSet::new();
    while let Some(node) = stack.pop() {
        let node_id = id(node.as_ref());
        if node_id == target {
            return true;
        }
        if seen.insert(node_id) {
            stack.extend(inputs(node.as_ref()));
        }
    }
    false
}
