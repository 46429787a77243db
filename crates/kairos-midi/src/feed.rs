//! MIDI input port fed from outside the graph.

use std::sync::Arc;

use kairos_core::{NodeId, ProcessCell, ProcessContext, ProcessGate, Processor};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::{MidiConnection, MidiEvent, MidiSource};

/// Default number of events a feed delivers per block.
pub const DEFAULT_EVENTS_PER_BLOCK: usize = 256;

/// Delivers queued events on its single MIDI output.
///
/// Events queued between two blocks all arrive in the next block; their
/// frame offsets are clamped to the block length.
pub struct MidiFeed {
    id: NodeId,
    gate: ProcessGate,
    output: MidiConnection,
    queue: ProcessCell<HeapCons<MidiEvent>>,
}

/// Producer side of a [`MidiFeed`].
pub struct MidiFeedHandle {
    producer: HeapProd<MidiEvent>,
}

impl MidiFeed {
    pub fn new(events_per_block: usize) -> (Arc<Self>, MidiFeedHandle) {
        let capacity = events_per_block.max(1);
        let (producer, consumer) = HeapRb::<MidiEvent>::new(capacity * 4).split();
        let id = NodeId::next();
        let feed = Arc::new(Self {
            id,
            gate: ProcessGate::new(),
            output: MidiConnection::new(id, capacity),
            queue: ProcessCell::new(consumer),
        });
        (feed, MidiFeedHandle { producer })
    }

    pub fn output(&self) -> &MidiConnection {
        &self.output
    }
}

impl MidiFeedHandle {
    /// Queue an event. Returns `false` if the queue is full.
    pub fn send(&mut self, event: MidiEvent) -> bool {
        self.producer.try_push(event).is_ok()
    }

    pub fn pending(&self) -> usize {
        self.producer.occupied_len()
    }
}

impl Processor for MidiFeed {
    fn process(&self, ctx: &ProcessContext) {
        if !self.gate.begin(ctx.time) {
            return;
        }
        let Some(mut queue) = self.queue.try_lock() else {
            return;
        };
        self.output.clear();
        let last = ctx.frames.saturating_sub(1) as u32;
        while self.output.len() < self.output.capacity() {
            match queue.try_pop() {
                Some(event) => {
                    let offset = event.frame_offset.min(last);
                    self.output.push(event.with_offset(offset));
                }
                None => break,
            }
        }
    }
}

impl MidiSource for MidiFeed {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn midi_output_count(&self) -> usize {
        1
    }

    fn midi_connection(&self, index: usize) -> Option<&MidiConnection> {
        (index == 0).then_some(&self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_core::TransportPosition;

    #[test]
    fn test_feed_delivers_queued_events_once() {
        let (feed, mut handle) = MidiFeed::new(8);
        handle.send(MidiEvent::note_on(10, 0, 60, 100));
        handle.send(MidiEvent::note_on(500, 0, 64, 100));

        let ctx = ProcessContext::new(TransportPosition::default(), 128, 0);
        feed.process(&ctx);
        let events: Vec<_> = feed.output().iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].frame_offset, 10);
        assert_eq!(events[1].frame_offset, 127);

        let ctx = ProcessContext::new(TransportPosition::default(), 128, 128);
        feed.process(&ctx);
        assert!(feed.output().is_empty());
    }
}
