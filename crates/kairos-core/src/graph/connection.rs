use std::sync::atomic::Ordering;
use std::sync::Arc;

use atomic_float::AtomicF32;

use crate::{NodeId, Processor};

/// One mono signal: the producing node plus a block-sized sample buffer.
///
/// The buffer is either allocated here or handed in by the caller (e.g. a
/// device or plugin buffer shared with other code). Samples are atomics so
/// that connections can live inside nodes shared across threads; only the
/// audio thread reads or writes them.
#[derive(Debug)]
pub struct AudioConnection {
    source: NodeId,
    buffer: Arc<[AtomicF32]>,
}

impl AudioConnection {
    /// Connection owning a zeroed buffer of `frames` samples.
    pub fn new(source: NodeId, frames: usize) -> Self {
        let buffer: Vec<AtomicF32> = (0..frames).map(|_| AtomicF32::new(0.0)).collect();
        Self {
            source,
            buffer: buffer.into(),
        }
    }

    /// Connection over an externally provided buffer.
    pub fn with_buffer(source: NodeId, buffer: Arc<[AtomicF32]>) -> Self {
        Self { source, buffer }
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Raw buffer access.
    pub fn buffer(&self) -> &[AtomicF32] {
        &self.buffer
    }

    pub fn zero(&self) {
        for sample in self.buffer.iter() {
            sample.store(0.0, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn read(&self, index: usize) -> f32 {
        self.buffer
            .get(index)
            .map_or(0.0, |s| s.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn write(&self, index: usize, value: f32) {
        if let Some(sample) = self.buffer.get(index) {
            sample.store(value, Ordering::Relaxed);
        }
    }

    /// Copy up to `out.len()` samples out. Returns the number copied.
    pub fn copy_to(&self, out: &mut [f32]) -> usize {
        let n = out.len().min(self.buffer.len());
        for (dst, src) in out[..n].iter_mut().zip(self.buffer.iter()) {
            *dst = src.load(Ordering::Relaxed);
        }
        n
    }
}

/// A node with audio outputs.
pub trait Source: Processor {
    fn node_id(&self) -> NodeId;

    fn audio_output_count(&self) -> usize;

    fn audio_connection(&self, index: usize) -> Option<&AudioConnection>;

    /// Sources currently feeding this node.
    fn audio_inputs(&self) -> Vec<Arc<dyn Source>> {
        Vec::new()
    }

    /// Whether `target` is upstream of this node.
    fn connects_to(&self, target: NodeId) -> bool {
        super::reaches(
            self.audio_inputs(),
            target,
            |node| node.node_id(),
            |node| node.audio_inputs(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_buffer_zeroed() {
        let connection = AudioConnection::new(NodeId::next(), 8);
        assert_eq!(connection.len(), 8);
        connection.write(3, 0.5);
        assert_eq!(connection.read(3), 0.5);
        connection.zero();
        assert_eq!(connection.read(3), 0.0);
    }

    #[test]
    fn test_external_buffer_is_shared() {
        let buffer: Arc<[AtomicF32]> = (0..4).map(|_| AtomicF32::new(0.0)).collect::<Vec<_>>().into();
        let connection = AudioConnection::with_buffer(NodeId::next(), buffer.clone());
        connection.write(1, 0.25);
        assert_eq!(buffer[1].load(Ordering::Relaxed), 0.25);
    }

    #[test]
    fn test_out_of_range_reads_silence() {
        let connection = AudioConnection::new(NodeId::next(), 2);
        connection.write(5, 1.0);
        assert_eq!(connection.read(5), 0.0);
        let mut out = [1.0f32; 4];
        assert_eq!(connection.copy_to(&mut out), 2);
        assert_eq!(&out[..2], &[0.0, 0.0]);
    }
}
