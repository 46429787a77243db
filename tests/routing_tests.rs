//! Audio routing: acyclic connection rule and signal flow through mixers.
//!
//! Run with:
//! ```bash
//! cargo test -p kairos --test routing_tests
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use approx::assert_relative_eq;
use kairos::core::Error;
use kairos::{AudioFeed, AudioMixer, ProcessContext, Processor, Source, TransportPosition};
use proptest::prelude::*;

const BLOCK: usize = 64;

fn ctx(time: u64) -> ProcessContext {
    ProcessContext::new(TransportPosition::default(), BLOCK, time)
}

#[test]
fn test_self_connection_rejected() {
    let mixer = AudioMixer::new(1, BLOCK);
    let err = mixer.connect(0, mixer.clone(), 0).unwrap_err();
    assert!(matches!(err, Error::WouldCreateCycle { .. }));
    assert!(!mixer.input(0).unwrap().is_connected());
}

#[test]
fn test_three_node_cycle_rejected() {
    let a = AudioMixer::new(1, BLOCK);
    let b = AudioMixer::new(1, BLOCK);
    let c = AudioMixer::new(1, BLOCK);
    b.connect(0, a.clone(), 0).unwrap();
    c.connect(0, b.clone(), 0).unwrap();

    // a <- c would close a -> b -> c -> a
    assert!(matches!(a.connect(0, c.clone(), 0), Err(Error::WouldCreateCycle { .. })));
    assert!(!a.input(0).unwrap().is_connected());
}

#[test]
fn test_diamond_accepted() {
    let top = AudioMixer::new(1, BLOCK);
    let left = AudioMixer::new(1, BLOCK);
    let right = AudioMixer::new(1, BLOCK);
    let bottom = AudioMixer::new(2, BLOCK);
    left.connect(0, top.clone(), 0).unwrap();
    right.connect(0, top.clone(), 0).unwrap();
    bottom.connect(0, left.clone(), 0).unwrap();
    bottom.connect(1, right.clone(), 0).unwrap();
    assert!(bottom.connects_to(top.node_id()));
    assert!(!top.connects_to(bottom.node_id()));
}

#[test]
fn test_rejected_connection_keeps_previous_link() {
    let a = AudioMixer::new(1, BLOCK);
    let b = AudioMixer::new(1, BLOCK);
    let other = AudioMixer::new(1, BLOCK);
    b.connect(0, a.clone(), 0).unwrap();
    a.connect(0, other.clone(), 0).unwrap();

    assert!(a.connect(0, b.clone(), 0).is_err());
    let source = a.input(0).unwrap().source().unwrap();
    assert_eq!(source.node_id(), other.node_id());
}

#[test]
fn test_feed_through_mixer_chain() {
    let (feed, mut handle) = AudioFeed::new(BLOCK, BLOCK * 4);
    let first = AudioMixer::new(1, BLOCK);
    let second = AudioMixer::new(2, BLOCK);
    first.connect(0, feed.clone(), 0).unwrap();
    first.set_gain(0, 0.5).unwrap();
    second.connect(0, first.clone(), 0).unwrap();
    second.connect(1, feed.clone(), 0).unwrap();

    handle.push_slice(&[1.0; BLOCK]);
    second.process(&ctx(0));

    // feed pulled twice in one block but consumed once
    let out = second.audio_connection(0).unwrap();
    assert_relative_eq!(out.read(0), 1.5);
    assert_relative_eq!(out.read(BLOCK - 1), 1.5);
    assert_eq!(handle.pending(), 0);

    second.process(&ctx(BLOCK as u64));
    assert_relative_eq!(out.read(0), 0.0);
}

/// Whether `from` is upstream of `to` in the model graph.
fn upstream(inputs: &[HashSet<usize>], from: usize, to: usize) -> bool {
    let mut stack: Vec<usize> = inputs[to].iter().copied().collect();
    let mut seen = HashSet::new();
    while let Some(node) = stack.pop() {
        if node == from {
            return true;
        }
        if seen.insert(node) {
            stack.extend(inputs[node].iter().copied());
        }
    }
    false
}

proptest! {
    /// Every attempted edge is accepted exactly when it keeps the graph acyclic.
    #[test]
    fn prop_connections_stay_acyclic(edges in prop::collection::vec((0usize..6, 0usize..6), 1..40)) {
        let nodes: Vec<Arc<AudioMixer>> = (0..6).map(|_| AudioMixer::new(6, BLOCK)).collect();
        let mut inputs = vec![HashSet::new(); nodes.len()];

        for (source, sink) in edges {
            let closes_cycle = source == sink || upstream(&inputs, sink, source);
            let result = nodes[sink].connect(source, nodes[source].clone(), 0);
            prop_assert_eq!(result.is_err(), closes_cycle);
            if result.is_ok() {
                inputs[sink].insert(source);
            }
        }
    }
}
