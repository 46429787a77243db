use std::sync::Arc;

use arc_swap::{ArcSwapOption, Guard};

use super::{AudioConnection, GraphBuffers, Source};
use crate::{Error, NodeId, ProcessContext, Result};

/// A connected source output.
pub struct AudioLink {
    source: Arc<dyn Source>,
    output: usize,
}

impl AudioLink {
    pub fn source(&self) -> &Arc<dyn Source> {
        &self.source
    }

    pub fn output(&self) -> usize {
        self.output
    }

    /// Process the source for this block and return the connected output.
    pub fn pull(&self, ctx: &ProcessContext) -> Option<&AudioConnection> {
        self.source.process(ctx);
        self.source.audio_connection(self.output)
    }
}

impl std::fmt::Debug for AudioLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioLink")
            .field("source", &self.source.node_id())
            .field("output", &self.output)
            .finish()
    }
}

/// Inbound audio slot holding at most one connection.
///
/// Written on the script thread, read on the audio thread. Readers always
/// see either the previous or the new link.
#[derive(Debug, Default)]
pub struct AudioConnector {
    link: ArcSwapOption<AudioLink>,
}

impl AudioConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect output `output` of `source` to this connector, owned by the
    /// node `owner`.
    ///
    /// Rejects the connection, leaving any previous one in place, if
    /// `source` is `owner` or already has `owner` upstream.
    pub fn set_connection(&self, source: Arc<dyn Source>, output: usize, owner: NodeId) -> Result<()> {
        let count = source.audio_output_count();
        if output >= count {
            return Err(Error::IndexOutOfRange {
                what: "audio output",
                index: output,
                len: count,
            });
        }
        let from = source.node_id();
        if from == owner || source.connects_to(owner) {
            return Err(Error::WouldCreateCycle { from, owner });
        }
        self.link.store(Some(Arc::new(AudioLink { source, output })));
        Ok(())
    }

    pub fn disconnect(&self) {
        self.link.store(None);
    }

    pub fn is_connected(&self) -> bool {
        self.link.load().is_some()
    }

    pub fn link(&self) -> Guard<Option<Arc<AudioLink>>> {
        self.link.load()
    }

    /// The connected source, if any (script thread).
    pub fn source(&self) -> Option<Arc<dyn Source>> {
        self.link.load_full().map(|link| link.source.clone())
    }

    /// Pull the connected source and copy this block into `out`, or copy
    /// silence when unconnected. Returns the number of frames written.
    pub fn read_into(&self, ctx: &ProcessContext, buffers: &GraphBuffers, out: &mut [f32]) -> usize {
        let frames = ctx.frames.min(out.len());
        let link = self.link.load();
        match link.as_ref().and_then(|link| link.pull(ctx)) {
            Some(connection) => {
                let copied = connection.copy_to(&mut out[..frames]);
                out[copied..frames].fill(0.0);
            }
            None => {
                let silence = buffers.silence();
                let n = frames.min(silence.len());
                out[..n].copy_from_slice(&silence[..n]);
                out[n..frames].fill(0.0);
            }
        }
        frames
    }
}
