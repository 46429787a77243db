//! Beat tracker driven by a mono audio input.

use std::sync::Arc;

use kairos_analysis::TempoEstimator;
use kairos_core::{
    AtomicFloat, AudioConnector, GraphBuffers, Handler, NodeId, ProcessCell, ProcessContext,
    Processor, Result, Source,
};

use crate::config::Meter;
use crate::tracker::{BeatSyncContext, TrackerBinding};
use crate::watchdog::SilenceWatchdog;

struct AudioState {
    estimator: Box<dyn TempoEstimator>,
    block: Vec<f32>,
    hop: Vec<f64>,
    index: usize,
    watchdog: SilenceWatchdog,
}

/// Feeds its input to a tempo estimator one hop at a time and retimes the
/// transport on every detected beat.
pub struct AudioBeatTracker {
    id: NodeId,
    input: AudioConnector,
    buffers: Arc<GraphBuffers>,
    binding: TrackerBinding,
    silence_threshold: AtomicFloat,
    state: ProcessCell<AudioState>,
}

impl AudioBeatTracker {
    pub fn new(context: &BeatSyncContext, meter: Meter) -> Result<Self> {
        let binding = TrackerBinding::new(context, &meter)?;
        let state = AudioState {
            estimator: context.build_estimator(meter.bpm),
            block: vec![0.0; context.buffers.block_size()],
            hop: vec![0.0; context.config.hop_size],
            index: 0,
            watchdog: SilenceWatchdog::new(),
        };
        Ok(Self {
            id: NodeId::next(),
            input: AudioConnector::new(),
            buffers: context.buffers.clone(),
            binding,
            silence_threshold: AtomicFloat::new(context.config.silence_threshold),
            state: ProcessCell::new(state),
        })
    }

    pub fn node_id(&self) -> NodeId {
        self.id
    }

    pub fn input(&self) -> &AudioConnector {
        &self.input
    }

    pub fn connect(&self, source: Arc<dyn Source>, output: usize) -> Result<()> {
        self.input.set_connection(source, output, self.id)
    }

    /// Re-acquire with a new tempo and meter. Hop position is kept.
    pub fn reset(&self, meter: Meter) -> Result<()> {
        self.binding.reset(&meter)
    }

    pub fn on_beat(&self, handler: Handler) -> Result<()> {
        self.binding.on_beat.set(handler)
    }

    pub fn on_silence(&self, handler: Handler) -> Result<()> {
        self.binding.on_silence.set(handler)
    }

    /// Stop and rewind the transport after `seconds` without input above
    /// the silence threshold. Zero disables.
    pub fn stop_on_silence(&self, seconds: u32) {
        self.binding.set_stop_seconds(seconds);
    }

    pub fn set_silence_threshold(&self, threshold: f32) {
        self.silence_threshold.set(threshold.abs());
    }
}

impl Processor for AudioBeatTracker {
    fn process(&self, ctx: &ProcessContext) {
        let Some(mut state) = self.state.try_lock() else {
            return;
        };
        let AudioState {
            estimator,
            block,
            hop,
            index,
            watchdog,
        } = &mut *state;

        if let Some(bpm) = self.binding.take_tempo() {
            estimator.set_tempo(bpm);
        }

        let frames = self.input.read_into(ctx, &self.buffers, block);
        let threshold = self.silence_threshold.get();
        for &sample in &block[..frames] {
            if sample.abs() > threshold {
                watchdog.touch(ctx.time);
            }
            hop[*index] = sample as f64;
            *index += 1;
            if *index == hop.len() {
                estimator.process_audio_hop(hop);
                if estimator.beat_due() {
                    self.binding.beat(estimator.tempo());
                }
                *index = 0;
            }
        }

        self.binding.watch(watchdog, ctx);
    }

    fn reposition(&self) {
        let Some(mut state) = self.state.try_lock() else {
            return;
        };
        state.index = 0;
        state.hop.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_core::{notification_channel, AudioFeed, NodeEvent, SharedTransport, TransportControl, TransportPosition};

    /// Reports a beat every `every` hops at a fixed tempo.
    struct Metronome {
        every: usize,
        hops: usize,
        bpm: f64,
        due: bool,
    }

    impl TempoEstimator for Metronome {
        fn set_tempo(&mut self, bpm: f64) {
            self.bpm = bpm;
        }

        fn process_audio_hop(&mut self, _hop: &[f64]) {
            self.hops += 1;
            self.due = self.hops % self.every == 0;
        }

        fn process_onset(&mut self, _onset: f64) {}

        fn beat_due(&self) -> bool {
            self.due
        }

        fn tempo(&self) -> f64 {
            self.bpm
        }
    }

    fn context(transport: Arc<SharedTransport>) -> (BeatSyncContext, kairos_core::EventLoop) {
        let (dispatcher, events) = notification_channel(64);
        let context = BeatSyncContext::new(transport, dispatcher, Arc::new(GraphBuffers::new(256)), 48_000)
            .with_estimator(Arc::new(|_: u32, _: usize, bpm: f64| -> Box<dyn TempoEstimator> {
                Box::new(Metronome {
                    every: 2,
                    hops: 0,
                    bpm,
                    due: false,
                })
            }));
        (context, events)
    }

    fn ctx(transport: &SharedTransport, time: u64) -> ProcessContext {
        ProcessContext::new(transport.position(), 256, time)
    }

    #[test]
    fn test_beat_forces_transport_and_notifies() {
        let transport = Arc::new(SharedTransport::new(48_000));
        let (context, events) = context(transport.clone());
        let tracker = AudioBeatTracker::new(&context, Meter::new(100.0, 4.0, 4.0)).unwrap();
        let beats = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = beats.clone();
        tracker
            .on_beat(Handler::new(1, move |event| sink.lock().unwrap().push(event.clone())))
            .unwrap();

        // Two hops of 512 = four blocks of 256.
        for block in 0..4 {
            tracker.process(&ctx(&transport, block * 256));
        }
        assert_eq!(transport.forced_beats(), 1);
        assert_eq!(transport.bpm(), 100.0);
        assert!(beats.lock().unwrap().is_empty());
        events.run_pending();
        assert_eq!(*beats.lock().unwrap(), vec![NodeEvent::Beat { bpm: 100.0 }]);
    }

    #[test]
    fn test_reset_keeps_hop_position() {
        let transport = Arc::new(SharedTransport::new(48_000));
        let (context, _events) = context(transport.clone());
        let tracker = AudioBeatTracker::new(&context, Meter::default()).unwrap();
        tracker.process(&ctx(&transport, 0));
        tracker.reset(Meter::new(90.0, 3.0, 4.0)).unwrap();
        assert_eq!(transport.position().beats_per_bar, 3.0);
        tracker.process(&ctx(&transport, 256));
        assert_eq!(tracker.state.try_lock().unwrap().index, 0);
        tracker.process(&ctx(&transport, 512));
        assert_eq!(tracker.state.try_lock().unwrap().index, 256);
    }

    #[test]
    fn test_reposition_clears_hop_position() {
        let transport = Arc::new(SharedTransport::new(48_000));
        let (context, _events) = context(transport.clone());
        let tracker = AudioBeatTracker::new(&context, Meter::default()).unwrap();
        tracker.process(&ctx(&transport, 0));
        tracker.reposition();
        assert_eq!(tracker.state.try_lock().unwrap().index, 0);
    }

    #[test]
    fn test_connected_audio_keeps_watchdog_quiet() {
        let transport = Arc::new(SharedTransport::new(48_000));
        let (context, _events) = context(transport.clone());
        let tracker = AudioBeatTracker::new(&context, Meter::default()).unwrap();
        let (feed, mut handle) = AudioFeed::new(256, 4096);
        tracker.connect(feed, 0).unwrap();
        tracker.stop_on_silence(1);

        transport.start();
        let mut time = 0;
        // 2 s of blocks with a loud sample in each.
        while time < 96_000 {
            let mut block = [0.0f32; 256];
            block[0] = 0.5;
            handle.push_slice(&block);
            let position = TransportPosition {
                rolling: true,
                ..transport.position()
            };
            tracker.process(&ProcessContext::new(position, 256, time));
            time += 256;
        }
        assert!(transport.is_rolling());
    }

    #[test]
    fn test_invalid_hop_size_rejected() {
        let transport = Arc::new(SharedTransport::new(48_000));
        let (context, _events) = context(transport);
        let context = context.with_config(crate::config::BeatSyncConfig {
            hop_size: 0,
            ..Default::default()
        });
        assert!(matches!(
            AudioBeatTracker::new(&context, Meter::default()),
            Err(kairos_core::Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_meter_rejected() {
        let transport = Arc::new(SharedTransport::new(48_000));
        let (context, _events) = context(transport);
        assert!(AudioBeatTracker::new(&context, Meter::new(-1.0, 4.0, 4.0)).is_err());
    }
}
