//! Script-side [`Engine`] and audio-side [`AudioProcessor`].

use std::sync::Arc;
use std::time::Instant;

use kairos_beat::{
    AudioBeatTracker, BeatSyncConfig, BeatSyncContext, BeatTrackerCache, EstimatorFactory, Meter,
    MidiBeatTracker, TrackerKey,
};
use kairos_core::{
    notification_channel, AudioFeed, AudioFeedHandle, CacheProcessor, Dispatcher, EngineConfig, EventLoop,
    GraphBuffers, ObjectCache, ProcessContext, ProcessorCache, SharedTransport, TransportControl,
};
use kairos_midi::{MidiFeed, MidiFeedHandle, DEFAULT_EVENTS_PER_BLOCK};

use crate::Result;

/// Blocks of audio an input port can queue ahead of the audio thread.
const FEED_QUEUE_BLOCKS: usize = 16;

/// Script-thread half of the runtime.
///
/// Every node a script asks for comes from a keyed cache. After each script
/// run call [`script_complete`](Self::script_complete): nodes the run did
/// not ask for are handed to the audio thread for removal.
///
/// # Example
///
/// ```ignore
/// use kairos::prelude::*;
///
/// let (mut engine, mut audio) = Engine::builder().build()?;
///
/// let (input, handle) = engine.midi_input("keys")?;
/// let tracker = engine.midi_tracker(TrackerKey(0), Meter::default())?;
/// tracker.connect(input, 0)?;
/// tracker.count_in(36)?;
/// tracker.on_beat(Handler::new(1, |event| println!("{event:?}")))?;
/// engine.script_complete();
///
/// // audio thread
/// audio.process_block(256);
///
/// // script thread
/// engine.run_pending();
/// ```
pub struct Engine {
    config: EngineConfig,
    transport: Arc<SharedTransport>,
    buffers: Arc<GraphBuffers>,
    dispatcher: Dispatcher,
    events: EventLoop,
    trackers: BeatTrackerCache,
    audio_inputs: ProcessorCache<String, AudioFeed>,
    midi_inputs: ProcessorCache<String, MidiFeed>,
    #[cfg(feature = "osc")]
    osc_inputs: kairos_osc::OscInputCache,
    #[cfg(feature = "osc")]
    osc_outputs: kairos_osc::OscOutputCache,
}

/// Audio-thread half of the runtime. Drive it from the audio callback.
pub struct AudioProcessor {
    transport: Arc<SharedTransport>,
    runners: Vec<Box<dyn CacheProcessor>>,
    block_size: usize,
    time: u64,
}

impl Engine {
    pub fn builder() -> crate::EngineBuilder {
        crate::EngineBuilder::default()
    }

    pub(crate) fn from_parts(
        config: EngineConfig,
        beat_sync: BeatSyncConfig,
        estimator: Option<EstimatorFactory>,
    ) -> (Self, AudioProcessor) {
        let transport = Arc::new(SharedTransport::new(config.sample_rate));
        let buffers = Arc::new(GraphBuffers::new(config.block_size));
        let (dispatcher, events) = notification_channel(config.notification_capacity);

        let mut context = BeatSyncContext::new(
            transport.clone(),
            dispatcher.clone(),
            buffers.clone(),
            config.sample_rate,
        )
        .with_config(beat_sync);
        if let Some(estimator) = estimator {
            context = context.with_estimator(estimator);
        }

        let capacity = config.cache_capacity;
        let (audio_inputs, audio_input_runner) = ProcessorCache::new("audio input", capacity);
        let (midi_inputs, midi_input_runner) = ProcessorCache::new("midi input", capacity);
        let (trackers, tracker_runners) = BeatTrackerCache::new(context, capacity);

        // Inputs first so a block's samples are queued before trackers pull.
        let mut runners: Vec<Box<dyn CacheProcessor>> = vec![
            Box::new(audio_input_runner),
            Box::new(midi_input_runner),
            Box::new(tracker_runners.audio),
            Box::new(tracker_runners.midi),
        ];

        #[cfg(feature = "osc")]
        let (osc_inputs, osc_outputs) = {
            let (osc_inputs, input_runner) = kairos_osc::OscInputCache::new(dispatcher.clone(), capacity);
            let (osc_outputs, output_runner) =
                kairos_osc::OscOutputCache::new(capacity, kairos_osc::DEFAULT_SCHEDULE_CAPACITY);
            runners.push(Box::new(input_runner));
            runners.push(Box::new(output_runner));
            (osc_inputs, osc_outputs)
        };

        let audio = AudioProcessor {
            transport: transport.clone(),
            runners,
            block_size: config.block_size,
            time: 0,
        };
        let engine = Self {
            config,
            transport,
            buffers,
            dispatcher,
            events,
            trackers,
            audio_inputs,
            midi_inputs,
            #[cfg(feature = "osc")]
            osc_inputs,
            #[cfg(feature = "osc")]
            osc_outputs,
        };
        (engine, audio)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    pub fn transport(&self) -> &Arc<SharedTransport> {
        &self.transport
    }

    pub fn buffers(&self) -> &Arc<GraphBuffers> {
        &self.buffers
    }

    /// Sending half of the notification queue, for nodes built outside the
    /// engine's caches.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Get or create the audio input port `name`.
    ///
    /// The producer handle is returned only when the port is created; later
    /// calls return `None` in its place.
    pub fn audio_input(&mut self, name: &str) -> Result<(Arc<AudioFeed>, Option<AudioFeedHandle>)> {
        let key = name.to_string();
        if let Some(feed) = self.audio_inputs.find_object(&key) {
            return Ok((feed, None));
        }
        let block_size = self.config.block_size;
        let (feed, handle) = AudioFeed::new(block_size, block_size * FEED_QUEUE_BLOCKS);
        self.audio_inputs.register_object(key, feed.clone())?;
        Ok((feed, Some(handle)))
    }

    /// Get or create the MIDI input port `name`. See [`audio_input`](Self::audio_input).
    pub fn midi_input(&mut self, name: &str) -> Result<(Arc<MidiFeed>, Option<MidiFeedHandle>)> {
        let key = name.to_string();
        if let Some(feed) = self.midi_inputs.find_object(&key) {
            return Ok((feed, None));
        }
        let (feed, handle) = MidiFeed::new(DEFAULT_EVENTS_PER_BLOCK);
        self.midi_inputs.register_object(key, feed.clone())?;
        Ok((feed, Some(handle)))
    }

    pub fn audio_tracker(&mut self, key: TrackerKey, meter: Meter) -> Result<Arc<AudioBeatTracker>> {
        Ok(self.trackers.audio_tracker(key, meter)?)
    }

    pub fn midi_tracker(&mut self, key: TrackerKey, meter: Meter) -> Result<Arc<MidiBeatTracker>> {
        Ok(self.trackers.midi_tracker(key, meter)?)
    }

    /// Get or bind the OSC input on `port`. `protocol` defaults to UDP.
    #[cfg(feature = "osc")]
    pub fn osc_input(&mut self, port: u16, protocol: Option<&str>) -> Result<Arc<kairos_osc::OscInput>> {
        Ok(self.osc_inputs.osc_input(port, protocol)?)
    }

    /// Get the OSC output sending to `host:port`.
    #[cfg(feature = "osc")]
    pub fn osc_output(&mut self, host: &str, port: u16) -> Result<Arc<kairos_osc::OscOutput>> {
        Ok(self.osc_outputs.osc_output(host, port)?)
    }

    /// Reconcile every cache after a script run. Returns whether any node
    /// is still live.
    pub fn script_complete(&mut self) -> bool {
        let mut live = self.audio_inputs.script_complete();
        live |= self.midi_inputs.script_complete();
        live |= self.trackers.script_complete();
        #[cfg(feature = "osc")]
        {
            live |= self.osc_inputs.script_complete();
            live |= self.osc_outputs.script_complete();
        }
        live
    }

    /// Run queued notifications. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        self.events.run_pending()
    }

    /// Run notifications as they arrive until `deadline`.
    pub fn run_until(&self, deadline: Instant) -> usize {
        self.events.run_until(deadline)
    }

    pub fn pending_notifications(&self) -> usize {
        self.events.pending()
    }

    pub fn dropped_notifications(&self) -> u64 {
        self.dispatcher.dropped()
    }
}

impl AudioProcessor {
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Absolute frame counter. Advances whether or not the transport rolls.
    pub fn time(&self) -> u64 {
        self.time
    }

    /// Process `frames` frames, split into blocks of at most
    /// [`block_size`](Self::block_size).
    pub fn process_block(&mut self, frames: usize) {
        let mut remaining = frames;
        while remaining > 0 {
            let frames = remaining.min(self.block_size);
            self.run_block(frames);
            remaining -= frames;
        }
    }

    fn run_block(&mut self, frames: usize) {
        if self.transport.take_relocation().is_some() {
            for runner in &mut self.runners {
                runner.reposition();
            }
        }
        let ctx = ProcessContext::new(self.transport.position(), frames, self.time);
        for runner in &mut self.runners {
            runner.process(&ctx);
        }
        self.transport.advance(frames);
        self.time += frames as u64;
    }
}
