use std::sync::Arc;

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use super::{AudioConnection, Source};
use crate::{NodeId, ProcessCell, ProcessContext, ProcessGate, Processor};

/// Audio input port: samples pushed from outside the graph, one output.
///
/// Blocks with fewer queued samples than frames are padded with silence.
pub struct AudioFeed {
    id: NodeId,
    gate: ProcessGate,
    output: AudioConnection,
    queue: ProcessCell<HeapCons<f32>>,
}

/// Producer side of an [`AudioFeed`], usable from one non-audio thread.
pub struct AudioFeedHandle {
    producer: HeapProd<f32>,
}

impl AudioFeed {
    /// Create a feed with `block_size` output frames and room for
    /// `queue_frames` pending samples.
    pub fn new(block_size: usize, queue_frames: usize) -> (Arc<Self>, AudioFeedHandle) {
        let (producer, consumer) = HeapRb::<f32>::new(queue_frames.max(1)).split();
        let id = NodeId::next();
        let feed = Arc::new(Self {
            id,
            gate: ProcessGate::new(),
            output: AudioConnection::new(id, block_size),
            queue: ProcessCell::new(consumer),
        });
        (feed, AudioFeedHandle { producer })
    }

    pub fn output(&self) -> &AudioConnection {
        &self.output
    }
}

impl AudioFeedHandle {
    /// Queue samples. Returns how many fit.
    pub fn push_slice(&mut self, samples: &[f32]) -> usize {
        self.producer.push_slice(samples)
    }

    pub fn pending(&self) -> usize {
        self.producer.occupied_len()
    }
}

impl Processor for AudioFeed {
    fn process(&self, ctx: &ProcessContext) {
        if !self.gate.begin(ctx.time) {
            return;
        }
        let Some(mut queue) = self.queue.try_lock() else {
            return;
        };
        let frames = ctx.frames.min(self.output.len());
        for i in 0..frames {
            self.output.write(i, queue.try_pop().unwrap_or(0.0));
        }
        for i in frames..self.output.len() {
            self.output.write(i, 0.0);
        }
    }
}

impl Source for AudioFeed {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn audio_output_count(&self) -> usize {
        1
    }

    fn audio_connection(&self, index: usize) -> Option<&AudioConnection> {
        (index == 0).then_some(&self.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportPosition;

    fn ctx(frames: usize, time: u64) -> ProcessContext {
        ProcessContext::new(TransportPosition::default(), frames, time)
    }

    #[test]
    fn test_feed_pads_with_silence() {
        let (feed, mut handle) = AudioFeed::new(4, 16);
        assert_eq!(handle.push_slice(&[0.1, 0.2]), 2);
        feed.process(&ctx(4, 0));
        let out: Vec<f32> = (0..4).map(|i| feed.output().read(i)).collect();
        assert_eq!(out, vec![0.1, 0.2, 0.0, 0.0]);
    }

    #[test]
    fn test_feed_processes_once_per_block() {
        let (feed, mut handle) = AudioFeed::new(2, 16);
        handle.push_slice(&[1.0, 1.0, 0.5, 0.5]);
        feed.process(&ctx(2, 0));
        feed.process(&ctx(2, 0));
        assert_eq!(handle.pending(), 2);
        feed.process(&ctx(2, 2));
        assert_eq!(feed.output().read(0), 0.5);
    }
}
