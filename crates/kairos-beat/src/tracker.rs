//! State shared by the audio and MIDI trackers.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use kairos_analysis::{BeatEstimator, TempoEstimator};
use kairos_core::{
    AtomicDouble, AtomicFlag, Dispatcher, GraphBuffers, HandlerSlot, NodeEvent, ProcessContext,
    Result, TransportControl,
};

use crate::config::{BeatSyncConfig, Meter};
use crate::watchdog::SilenceWatchdog;

/// Builds a tempo estimator from `(frame_rate, hop_size, bpm)`.
pub type EstimatorFactory = Arc<dyn Fn(u32, usize, f64) -> Box<dyn TempoEstimator> + Send + Sync>;

pub fn default_estimator() -> EstimatorFactory {
    Arc::new(|frame_rate: u32, hop_size: usize, bpm: f64| -> Box<dyn TempoEstimator> {
        Box::new(BeatEstimator::new(frame_rate, hop_size, bpm))
    })
}

/// Collaborators every tracker is built with.
#[derive(Clone)]
pub struct BeatSyncContext {
    pub transport: Arc<dyn TransportControl>,
    pub dispatcher: Dispatcher,
    pub buffers: Arc<GraphBuffers>,
    pub frame_rate: u32,
    pub config: BeatSyncConfig,
    pub estimator: EstimatorFactory,
}

impl BeatSyncContext {
    pub fn new(
        transport: Arc<dyn TransportControl>,
        dispatcher: Dispatcher,
        buffers: Arc<GraphBuffers>,
        frame_rate: u32,
    ) -> Self {
        Self {
            transport,
            dispatcher,
            buffers,
            frame_rate,
            config: BeatSyncConfig::default(),
            estimator: default_estimator(),
        }
    }

    pub fn with_config(mut self, config: BeatSyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_estimator(mut self, estimator: EstimatorFactory) -> Self {
        self.estimator = estimator;
        self
    }

    pub(crate) fn build_estimator(&self, bpm: f64) -> Box<dyn TempoEstimator> {
        (self.estimator)(self.frame_rate, self.config.hop_size, bpm)
    }
}

/// Transport binding, beat/silence notifications and pending re-acquire.
pub(crate) struct TrackerBinding {
    transport: Arc<dyn TransportControl>,
    dispatcher: Dispatcher,
    pub(crate) on_beat: HandlerSlot,
    pub(crate) on_silence: HandlerSlot,
    stop_seconds: AtomicU32,
    pending_tempo: AtomicDouble,
    tempo_pending: AtomicFlag,
}

impl TrackerBinding {
    pub(crate) fn new(context: &BeatSyncContext, meter: &Meter) -> Result<Self> {
        context.config.validate()?;
        meter.validate()?;
        context
            .transport
            .configure(meter.bpm, meter.beats_per_bar, meter.beat_unit);
        Ok(Self {
            transport: context.transport.clone(),
            dispatcher: context.dispatcher.clone(),
            on_beat: HandlerSlot::new("onBeat", 1),
            on_silence: HandlerSlot::new("onSilence", 1),
            stop_seconds: AtomicU32::new(0),
            pending_tempo: AtomicDouble::new(meter.bpm),
            tempo_pending: AtomicFlag::new(false),
        })
    }

    pub(crate) fn transport(&self) -> &Arc<dyn TransportControl> {
        &self.transport
    }

    pub(crate) fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Re-acquire with a new meter (script thread). The estimator restarts
    /// at the next block.
    pub(crate) fn reset(&self, meter: &Meter) -> Result<()> {
        meter.validate()?;
        self.transport
            .configure(meter.bpm, meter.beats_per_bar, meter.beat_unit);
        self.pending_tempo.set(meter.bpm);
        self.tempo_pending.set(true);
        Ok(())
    }

    pub(crate) fn take_tempo(&self) -> Option<f64> {
        self.tempo_pending
            .swap(false)
            .then(|| self.pending_tempo.get())
    }

    pub(crate) fn set_stop_seconds(&self, seconds: u32) {
        self.stop_seconds.store(seconds, Ordering::Release);
    }

    pub(crate) fn stop_seconds(&self) -> u32 {
        self.stop_seconds.load(Ordering::Acquire)
    }

    /// Beat detected (audio thread).
    pub(crate) fn beat(&self, bpm: f64) {
        self.transport.force_beat(bpm);
        self.on_beat.notify(&self.dispatcher, NodeEvent::Beat { bpm });
    }

    /// End-of-block silence check (audio thread).
    pub(crate) fn watch(&self, watchdog: &mut SilenceWatchdog, ctx: &ProcessContext) {
        let timeout = self.stop_seconds();
        if watchdog.check(ctx.rolling, ctx.time, timeout, ctx.transport.frame_rate) {
            self.transport.stop();
            self.transport.relocate(0);
            self.on_silence
                .notify(&self.dispatcher, NodeEvent::SilenceStop);
        }
    }
}
