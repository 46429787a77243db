//! MIDI routing: per-block event buffers and acyclic connectors.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::{ArcSwapOption, Guard};
use kairos_core::{graph, Error, NodeId, ProcessContext, Processor, Result};

use crate::MidiEvent;

/// Fixed-capacity buffer of the events a source produced this block.
#[derive(Debug)]
pub struct MidiConnection {
    source: NodeId,
    events: Box<[AtomicU64]>,
    len: AtomicUsize,
}

impl MidiConnection {
    pub fn new(source: NodeId, capacity: usize) -> Self {
        Self {
            source,
            events: (0..capacity).map(|_| AtomicU64::new(0)).collect(),
            len: AtomicUsize::new(0),
        }
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.len.store(0, Ordering::Release);
    }

    /// Append an event. Returns `false` when the buffer is full.
    pub fn push(&self, event: MidiEvent) -> bool {
        let len = self.len.load(Ordering::Acquire);
        match self.events.get(len) {
            Some(slot) => {
                slot.store(event.pack(), Ordering::Relaxed);
                self.len.store(len + 1, Ordering::Release);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, index: usize) -> Option<MidiEvent> {
        if index >= self.len() {
            return None;
        }
        self.events
            .get(index)
            .map(|slot| MidiEvent::unpack(slot.load(Ordering::Relaxed)))
    }

    pub fn iter(&self) -> impl Iterator<Item = MidiEvent> + '_ {
        self.events[..self.len().min(self.events.len())]
            .iter()
            .map(|slot| MidiEvent::unpack(slot.load(Ordering::Relaxed)))
    }
}

/// A node with MIDI outputs.
pub trait MidiSource: Processor {
    fn node_id(&self) -> NodeId;

    fn midi_output_count(&self) -> usize;

    fn midi_connection(&self, index: usize) -> Option<&MidiConnection>;

    fn midi_inputs(&self) -> Vec<Arc<dyn MidiSource>> {
        Vec::new()
    }

    /// Whether `target` is upstream of this node.
    fn connects_to(&self, target: NodeId) -> bool {
        graph::reaches(
            self.midi_inputs(),
            target,
            |node| node.node_id(),
            |node| node.midi_inputs(),
        )
    }
}

/// A connected MIDI source output.
pub struct MidiLink {
    source: Arc<dyn MidiSource>,
    output: usize,
}

impl MidiLink {
    pub fn source(&self) -> &Arc<dyn MidiSource> {
        &self.source
    }

    /// Process the source for this block and return the connected output.
    pub fn pull(&self, ctx: &ProcessContext) -> Option<&MidiConnection> {
        self.source.process(ctx);
        self.source.midi_connection(self.output)
    }
}

/// Inbound MIDI slot holding at most one connection.
#[derive(Default)]
pub struct MidiConnector {
    link: ArcSwapOption<MidiLink>,
}

impl MidiConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect `source`'s output `output` to this connector, owned by `owner`.
    ///
    /// Same rule as audio routing: self-loops and cycles are rejected and
    /// the previous connection is kept.
    pub fn set_connection(&self, source: Arc<dyn MidiSource>, output: usize, owner: NodeId) -> Result<()> {
        let count = source.midi_output_count();
        if output >= count {
            return Err(Error::IndexOutOfRange {
                what: "MIDI output",
                index: output,
                len: count,
            });
        }
        let from = source.node_id();
        if from == owner || source.connects_to(owner) {
            return Err(Error::WouldCreateCycle { from, owner });
        }
        self.link.store(Some(Arc::new(MidiLink { source, output })));
        Ok(())
    }

    pub fn disconnect(&self) {
        self.link.store(None);
    }

    pub fn is_connected(&self) -> bool {
        self.link.load().is_some()
    }

    pub fn link(&self) -> Guard<Option<Arc<MidiLink>>> {
        self.link.load()
    }

    pub fn source(&self) -> Option<Arc<dyn MidiSource>> {
        self.link.load_full().map(|link| link.source.clone())
    }
}
