//! Beat tracker driven by MIDI note-ons, with count-in detection.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use kairos_analysis::TempoEstimator;
use kairos_core::{
    AtomicFloat, Error, Handler, HandlerSlot, NodeEvent, NodeId, ProcessCell, ProcessContext,
    Processor, Result,
};
use kairos_midi::{MidiConnection, MidiConnector, MidiSource};

use crate::config::{CountInConfig, Meter};
use crate::count_in::{CountIn, CountInStep};
use crate::tracker::{BeatSyncContext, TrackerBinding};
use crate::watchdog::SilenceWatchdog;

/// Marks "no count-in note selected".
const NO_NOTE: u8 = u8::MAX;

struct MidiState {
    estimator: Box<dyn TempoEstimator>,
    frame_index: usize,
    onset: f64,
    count_in: CountIn,
    watchdog: SilenceWatchdog,
}

/// Accumulates weighted note-on velocity per hop as onset strength.
///
/// While the transport is stopped and a count-in note is selected, four
/// evenly spaced presses of that note set the tempo and start playback one
/// beat after the last press.
pub struct MidiBeatTracker {
    id: NodeId,
    input: MidiConnector,
    binding: TrackerBinding,
    on_count: HandlerSlot,
    count_in_note: AtomicU8,
    count_in_config: CountInConfig,
    count_state: AtomicU32,
    note_weights: Box<[AtomicFloat]>,
    hop_size: usize,
    state: ProcessCell<MidiState>,
}

impl MidiBeatTracker {
    pub fn new(context: &BeatSyncContext, meter: Meter) -> Result<Self> {
        let binding = TrackerBinding::new(context, &meter)?;
        let state = MidiState {
            estimator: context.build_estimator(meter.bpm),
            frame_index: 0,
            onset: 0.0,
            count_in: CountIn::new(),
            watchdog: SilenceWatchdog::new(),
        };
        Ok(Self {
            id: NodeId::next(),
            input: MidiConnector::new(),
            binding,
            on_count: HandlerSlot::new("onCount", 1),
            count_in_note: AtomicU8::new(NO_NOTE),
            count_in_config: context.config.count_in.clone(),
            count_state: AtomicU32::new(0),
            note_weights: (0..128).map(|_| AtomicFloat::new(1.0)).collect(),
            hop_size: context.config.hop_size,
            state: ProcessCell::new(state),
        })
    }

    pub fn node_id(&self) -> NodeId {
        self.id
    }

    pub fn input(&self) -> &MidiConnector {
        &self.input
    }

    pub fn connect(&self, source: Arc<dyn MidiSource>, output: usize) -> Result<()> {
        self.input.set_connection(source, output, self.id)
    }

    /// Re-acquire with a new tempo and meter.
    ///
    /// Restarts the estimator, reconfigures the transport, restores every
    /// note weight to 1.0 and releases the count handler. The hop position
    /// is kept.
    pub fn reset(&self, meter: Meter) -> Result<()> {
        self.binding.reset(&meter)?;
        for weight in self.note_weights.iter() {
            weight.set(1.0);
        }
        self.on_count.clear();
        Ok(())
    }

    pub fn on_beat(&self, handler: Handler) -> Result<()> {
        self.binding.on_beat.set(handler)
    }

    /// Handler for count-in progress: `Count { count }` per accepted pulse
    /// and `CountInAbandoned` when the count-in times out.
    pub fn on_count(&self, handler: Handler) -> Result<()> {
        self.on_count.set(handler)
    }

    pub fn on_silence(&self, handler: Handler) -> Result<()> {
        self.binding.on_silence.set(handler)
    }

    /// Arm count-in detection on `note`.
    pub fn count_in(&self, note: u8) -> Result<()> {
        check_note(note)?;
        self.count_in_note.store(note, Ordering::Release);
        Ok(())
    }

    pub fn cancel_count_in(&self) {
        self.count_in_note.store(NO_NOTE, Ordering::Release);
    }

    /// The armed count-in note, cleared once the count-in starts playback.
    pub fn count_in_note(&self) -> Option<u8> {
        match self.count_in_note.load(Ordering::Acquire) {
            NO_NOTE => None,
            note => Some(note),
        }
    }

    /// Count-in pulses accepted so far, as of the last processed block.
    pub fn count_in_count(&self) -> u32 {
        self.count_state.load(Ordering::Acquire)
    }

    /// Scale the onset contribution of `note`.
    pub fn set_note_weight(&self, note: u8, weight: f32) -> Result<()> {
        check_note(note)?;
        self.note_weights[note as usize].set(weight);
        Ok(())
    }

    pub fn note_weight(&self, note: u8) -> Result<f32> {
        check_note(note)?;
        Ok(self.note_weights[note as usize].get())
    }

    pub fn stop_on_silence(&self, seconds: u32) {
        self.binding.set_stop_seconds(seconds);
    }

    fn notify_count(&self, event: NodeEvent) {
        self.on_count.notify(self.binding.dispatcher(), event);
    }

    fn detect_count_in(&self, state: &mut MidiState, ctx: &ProcessContext, input: Option<&MidiConnection>) {
        let frame_rate = ctx.transport.frame_rate;
        match state
            .count_in
            .poll(ctx.time, ctx.frames, frame_rate, &self.count_in_config)
        {
            Some(CountInStep::Start) => {
                self.binding.transport().start();
                self.cancel_count_in();
                return;
            }
            Some(CountInStep::Abandoned) => {
                self.notify_count(NodeEvent::CountInAbandoned);
                return;
            }
            _ => {}
        }

        let Some(note) = self.count_in_note() else {
            return;
        };
        let Some(input) = input else {
            return;
        };
        let frames_per_beat = ctx.transport.frames_per_beat();
        for event in input.iter() {
            if state.count_in.count() >= 4 {
                break;
            }
            if !event.is_note_on()
                || event.note() != note
                || !self.count_in_config.accepts_velocity(event.velocity())
            {
                continue;
            }
            let frame = ctx.time + event.frame_offset as u64;
            match state
                .count_in
                .pulse(frame, frames_per_beat, frame_rate, &self.count_in_config)
            {
                Some(CountInStep::Counted(count)) => self.notify_count(NodeEvent::Count { count }),
                Some(CountInStep::Locked { bpm, .. }) => {
                    self.notify_count(NodeEvent::Count { count: 4 });
                    state.estimator.set_tempo(bpm);
                    self.binding.transport().set_bpm(bpm);
                }
                _ => {}
            }
        }
    }
}

fn check_note(note: u8) -> Result<()> {
    if note > 127 {
        return Err(Error::IndexOutOfRange {
            what: "note",
            index: note as usize,
            len: 128,
        });
    }
    Ok(())
}

impl Processor for MidiBeatTracker {
    fn process(&self, ctx: &ProcessContext) {
        let Some(mut guard) = self.state.try_lock() else {
            return;
        };
        let state = &mut *guard;

        if let Some(bpm) = self.binding.take_tempo() {
            state.estimator.set_tempo(bpm);
        }

        let link = self.input.link();
        let input = link.as_ref().and_then(|link| link.pull(ctx));

        if !ctx.rolling {
            self.detect_count_in(state, ctx, input);
            self.count_state
                .store(state.count_in.count(), Ordering::Release);
        }

        let mut events = input
            .into_iter()
            .flat_map(|connection| connection.iter())
            .peekable();
        for i in 0..ctx.frames {
            while let Some(event) = events.next_if(|e| e.frame_offset as usize <= i) {
                if event.is_note_on() {
                    let weight = self
                        .note_weights
                        .get(event.note() as usize)
                        .map_or(1.0, AtomicFloat::get) as f64;
                    state.onset += event.velocity() as f64 * weight;
                    state.watchdog.touch(ctx.time);
                }
            }
            if state.frame_index == self.hop_size {
                state.estimator.process_onset(state.onset);
                if state.estimator.beat_due() {
                    self.binding.beat(state.estimator.tempo());
                }
                state.frame_index = 0;
                state.onset = 0.0;
            }
            state.frame_index += 1;
        }

        self.binding.watch(&mut state.watchdog, ctx);
    }

    fn reposition(&self) {
        let Some(mut state) = self.state.try_lock() else {
            return;
        };
        state.frame_index = 0;
        state.onset = 0.0;
    }
}
