//! One tracker per key, reconfigured in place when re-acquired.

use std::fmt;
use std::sync::Arc;

use kairos_core::{CacheRunner, ObjectCache, ProcessorCache, Result};

use crate::audio::AudioBeatTracker;
use crate::config::Meter;
use crate::midi::MidiBeatTracker;
use crate::tracker::BeatSyncContext;

/// Identifies a tracker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TrackerKey(pub u32);

impl fmt::Display for TrackerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tracker {}", self.0)
    }
}

/// Audio and MIDI beat trackers.
pub struct BeatTrackerCache {
    context: BeatSyncContext,
    audio: ProcessorCache<TrackerKey, AudioBeatTracker>,
    midi: ProcessorCache<TrackerKey, MidiBeatTracker>,
}

/// Audio-thread runners of a [`BeatTrackerCache`].
pub struct BeatTrackerRunners {
    pub audio: CacheRunner<AudioBeatTracker>,
    pub midi: CacheRunner<MidiBeatTracker>,
}

impl BeatTrackerCache {
    pub fn new(context: BeatSyncContext, capacity: usize) -> (Self, BeatTrackerRunners) {
        let (audio, audio_runner) = ProcessorCache::new("audio beat tracker", capacity);
        let (midi, midi_runner) = ProcessorCache::new("midi beat tracker", capacity);
        (
            Self {
                context,
                audio,
                midi,
            },
            BeatTrackerRunners {
                audio: audio_runner,
                midi: midi_runner,
            },
        )
    }

    /// Get or create the audio tracker for `key`.
    ///
    /// An existing tracker is reset to `meter` instead of being replaced.
    pub fn audio_tracker(&mut self, key: TrackerKey, meter: Meter) -> Result<Arc<AudioBeatTracker>> {
        if let Some(tracker) = self.audio.find_object(&key) {
            tracing::debug!(%key, bpm = meter.bpm, "resetting audio beat tracker");
            tracker.reset(meter)?;
            return Ok(tracker);
        }
        let tracker = Arc::new(AudioBeatTracker::new(&self.context, meter)?);
        self.audio.register_object(key, tracker.clone())?;
        Ok(tracker)
    }

    /// Get or create the MIDI tracker for `key`.
    ///
    /// An existing tracker is reset to `meter` instead of being replaced.
    pub fn midi_tracker(&mut self, key: TrackerKey, meter: Meter) -> Result<Arc<MidiBeatTracker>> {
        if let Some(tracker) = self.midi.find_object(&key) {
            tracing::debug!(%key, bpm = meter.bpm, "resetting midi beat tracker");
            tracker.reset(meter)?;
            return Ok(tracker);
        }
        let tracker = Arc::new(MidiBeatTracker::new(&self.context, meter)?);
        self.midi.register_object(key, tracker.clone())?;
        Ok(tracker)
    }

    pub fn len(&self) -> usize {
        self.audio.len() + self.midi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectCache for BeatTrackerCache {
    fn script_complete(&mut self) -> bool {
        let audio = self.audio.script_complete();
        let midi = self.midi.script_complete();
        audio || midi
    }
}
