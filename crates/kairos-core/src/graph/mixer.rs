use std::sync::Arc;

use super::{AudioConnection, AudioConnector, Source};
use crate::{AtomicFloat, Error, NodeId, ProcessContext, ProcessGate, Processor, Result};

/// Sums `N` gain-weighted inputs into one output.
pub struct AudioMixer {
    id: NodeId,
    gate: ProcessGate,
    inputs: Vec<AudioConnector>,
    gains: Vec<AtomicFloat>,
    output: AudioConnection,
}

impl AudioMixer {
    pub fn new(inputs: usize, block_size: usize) -> Arc<Self> {
        let id = NodeId::next();
        Arc::new(Self {
            id,
            gate: ProcessGate::new(),
            inputs: (0..inputs).map(|_| AudioConnector::new()).collect(),
            gains: (0..inputs).map(|_| AtomicFloat::new(1.0)).collect(),
            output: AudioConnection::new(id, block_size),
        })
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn input(&self, index: usize) -> Result<&AudioConnector> {
        self.inputs.get(index).ok_or(Error::IndexOutOfRange {
            what: "mixer input",
            index,
            len: self.inputs.len(),
        })
    }

    /// Connect `source`'s output `output` to input `input`.
    pub fn connect(&self, input: usize, source: Arc<dyn Source>, output: usize) -> Result<()> {
        self.input(input)?.set_connection(source, output, self.id)
    }

    pub fn set_gain(&self, input: usize, gain: f32) -> Result<()> {
        self.input(input)?;
        self.gains[input].set(gain);
        Ok(())
    }
}

impl Processor for AudioMixer {
    fn process(&self, ctx: &ProcessContext) {
        if !self.gate.begin(ctx.time) {
            return;
        }
        self.output.zero();
        let frames = ctx.frames.min(self.output.len());
        for (connector, gain) in self.inputs.iter().zip(&self.gains) {
            let link = connector.link();
            let Some(input) = link.as_ref().and_then(|link| link.pull(ctx)) else {
                continue;
            };
            let gain = gain.get();
            for i in 0..frames.min(input.len()) {
                self.output.write(i, self.output.read(i) + gain * input.read(i));
            }
        }
    }

    fn reposition(&self) {
        self.gate.reset();
    }
}

impl Source for AudioMixer {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn audio_output_count(&self) -> usize {
        1
    }

    fn audio_connection(&self, index: usize) -> Option<&AudioConnection> {
        (index == 0).then_some(&self.output)
    }

    fn audio_inputs(&self) -> Vec<Arc<dyn Source>> {
        self.inputs.iter().filter_map(AudioConnector::source).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AudioFeed;
    use crate::transport::TransportPosition;

    fn ctx(frames: usize, time: u64) -> ProcessContext {
        ProcessContext::new(TransportPosition::default(), frames, time)
    }

    #[test]
    fn test_mixer_sums_weighted_inputs() {
        let (a, mut feed_a) = AudioFeed::new(4, 16);
        let (b, mut feed_b) = AudioFeed::new(4, 16);
        feed_a.push_slice(&[1.0; 4]);
        feed_b.push_slice(&[0.5; 4]);

        let mixer = AudioMixer::new(2, 4);
        mixer.connect(0, a, 0).unwrap();
        mixer.connect(1, b, 0).unwrap();
        mixer.set_gain(1, 2.0).unwrap();
        mixer.process(&ctx(4, 0));

        for i in 0..4 {
            assert_eq!(mixer.audio_connection(0).unwrap().read(i), 2.0);
        }
    }

    #[test]
    fn test_unconnected_mixer_is_silent() {
        let mixer = AudioMixer::new(3, 8);
        mixer.process(&ctx(8, 0));
        assert!((0..8).all(|i| mixer.output.read(i) == 0.0));
    }

    #[test]
    fn test_self_connection_rejected() {
        let mixer = AudioMixer::new(1, 4);
        let err = mixer.connect(0, mixer.clone(), 0).unwrap_err();
        assert!(matches!(err, Error::WouldCreateCycle { .. }));
        assert!(!mixer.input(0).unwrap().is_connected());
    }

    #[test]
    fn test_two_node_cycle_rejected_and_previous_link_kept() {
        let (feed, _handle) = AudioFeed::new(4, 4);
        let a = AudioMixer::new(1, 4);
        let b = AudioMixer::new(2, 4);
        b.connect(0, a.clone(), 0).unwrap();
        a.connect(0, feed.clone(), 0).unwrap();

        let err = a.connect(0, b.clone(), 0).unwrap_err();
        assert!(matches!(err, Error::WouldCreateCycle { .. }));
        let kept = a.input(0).unwrap().source().unwrap();
        assert_eq!(kept.node_id(), feed.node_id());
    }

    #[test]
    fn test_output_index_checked() {
        let (feed, _handle) = AudioFeed::new(4, 4);
        let mixer = AudioMixer::new(1, 4);
        assert!(matches!(
            mixer.connect(0, feed, 1),
            Err(Error::IndexOutOfRange { .. })
        ));
        assert!(mixer.set_gain(4, 0.5).is_err());
    }
}
