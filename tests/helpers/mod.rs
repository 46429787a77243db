//! Test helpers and fixtures for kairos integration tests
//!
//! Engines are driven by hand: the test plays the audio thread by calling
//! `process_block` and the script thread by calling `run_pending`.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use kairos::analysis::TempoEstimator;
use kairos::beat::EstimatorFactory;
use kairos::prelude::*;

/// Default test sample rate
pub const TEST_SAMPLE_RATE: u32 = 48_000;

/// Block size used by every test engine
pub const TEST_BLOCK_SIZE: usize = 256;

/// Route `tracing` output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Engine with a tempo estimator that never reports beats, so the transport
/// tempo only changes through count-in and explicit calls.
pub fn test_engine() -> (Engine, AudioProcessor) {
    init_tracing();
    Engine::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .block_size(TEST_BLOCK_SIZE)
        .cache_capacity(16)
        .estimator(quiet_estimator())
        .build()
        .expect("Failed to create test engine")
}

/// Holds its tempo and never reports a beat.
pub struct QuietEstimator {
    bpm: f64,
}

impl TempoEstimator for QuietEstimator {
    fn set_tempo(&mut self, bpm: f64) {
        self.bpm = bpm;
    }

    fn process_audio_hop(&mut self, _hop: &[f64]) {}

    fn process_onset(&mut self, _onset: f64) {}

    fn beat_due(&self) -> bool {
        false
    }

    fn tempo(&self) -> f64 {
        self.bpm
    }
}

pub fn quiet_estimator() -> EstimatorFactory {
    Arc::new(|_: u32, _: usize, bpm: f64| -> Box<dyn TempoEstimator> { Box::new(QuietEstimator { bpm }) })
}

/// A one-argument handler that records every event it receives.
pub fn recorder() -> (Handler, Arc<Mutex<Vec<NodeEvent>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let handler = Handler::new(1, move |event| sink.lock().unwrap().push(event.clone()));
    (handler, seen)
}

/// Run whole blocks until `until` (exclusive), sending a note-on for every
/// frame in `pulses` within the block that contains it.
pub fn play_pulses(
    audio: &mut AudioProcessor,
    keys: &mut kairos::MidiFeedHandle,
    note: u8,
    pulses: &[u64],
    until: u64,
) {
    while audio.time() < until {
        let start = audio.time();
        let end = start + TEST_BLOCK_SIZE as u64;
        for &frame in pulses.iter().filter(|&&f| f >= start && f < end) {
            keys.send(MidiEvent::note_on((frame - start) as u32, 0, note, 100));
        }
        audio.process_block(TEST_BLOCK_SIZE);
    }
}

/// Run whole blocks of silence until `until`.
pub fn run_until(audio: &mut AudioProcessor, until: u64) {
    while audio.time() < until {
        audio.process_block(TEST_BLOCK_SIZE);
    }
}

/// Generate a constant block (DC) at `level`.
pub fn generate_dc(level: f32, num_samples: usize) -> Vec<f32> {
    vec![level; num_samples]
}

/// Seconds to frames at the test sample rate.
pub fn secs(seconds: f64) -> u64 {
    (seconds * TEST_SAMPLE_RATE as f64) as u64
}
