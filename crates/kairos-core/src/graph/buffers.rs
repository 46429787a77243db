use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};

/// Block length and the shared silent buffer.
///
/// Destinations with no connection read [`silence`](Self::silence) instead
/// of allocating. Resizing replaces the buffer and must only happen while
/// the graph is quiescent.
#[derive(Debug)]
pub struct GraphBuffers {
    block_size: AtomicUsize,
    silence: ArcSwap<Vec<f32>>,
}

impl GraphBuffers {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size: AtomicUsize::new(block_size),
            silence: ArcSwap::from_pointee(vec![0.0; block_size]),
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size.load(Ordering::Acquire)
    }

    pub fn silence(&self) -> Guard<Arc<Vec<f32>>> {
        self.silence.load()
    }

    /// Replace the silent buffer for a new block length (script thread).
    pub fn set_block_size(&self, block_size: usize) {
        self.silence.store(Arc::new(vec![0.0; block_size]));
        self.block_size.store(block_size, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_tracks_block_size() {
        let buffers = GraphBuffers::new(64);
        assert_eq!(buffers.silence().len(), 64);
        buffers.set_block_size(128);
        assert_eq!(buffers.block_size(), 128);
        let silence = buffers.silence();
        assert_eq!(silence.len(), 128);
        assert!(silence.iter().all(|&s| s == 0.0));
    }
}
