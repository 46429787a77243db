//! Atomic transport shared by the script thread, the audio thread and nodes.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use super::{TransportControl, TransportPosition};
use crate::{AtomicDouble, AtomicFlag, AtomicFloat};

/// Transport state held in atomics.
///
/// The audio thread owns the frame counter: it applies pending relocations
/// with [`take_relocation`](Self::take_relocation) and moves the position
/// with [`advance`](Self::advance). Everything else may be written from any
/// thread.
#[derive(Debug)]
pub struct SharedTransport {
    rolling: AtomicFlag,
    frame: AtomicU64,
    frame_rate: AtomicU32,
    bpm: AtomicDouble,
    beats_per_bar: AtomicFloat,
    beat_type: AtomicFloat,
    relocate_target: AtomicU64,
    relocate_pending: AtomicFlag,
    forced_beats: AtomicU64,
}

impl SharedTransport {
    pub fn new(frame_rate: u32) -> Self {
        Self {
            rolling: AtomicFlag::new(false),
            frame: AtomicU64::new(0),
            frame_rate: AtomicU32::new(frame_rate),
            bpm: AtomicDouble::new(120.0),
            beats_per_bar: AtomicFloat::new(4.0),
            beat_type: AtomicFloat::new(4.0),
            relocate_target: AtomicU64::new(0),
            relocate_pending: AtomicFlag::new(false),
            forced_beats: AtomicU64::new(0),
        }
    }

    pub fn is_rolling(&self) -> bool {
        self.rolling.get()
    }

    pub fn bpm(&self) -> f64 {
        self.bpm.get()
    }

    pub fn frame(&self) -> u64 {
        self.frame.load(Ordering::Acquire)
    }

    /// Number of beats forced by trackers since creation.
    pub fn forced_beats(&self) -> u64 {
        self.forced_beats.load(Ordering::Acquire)
    }

    pub fn relocation_pending(&self) -> bool {
        self.relocate_pending.get()
    }

    /// Apply a pending relocation (audio thread, block start).
    ///
    /// Returns the new frame when a relocation was applied.
    pub fn take_relocation(&self) -> Option<u64> {
        if !self.relocate_pending.swap(false) {
            return None;
        }
        let target = self.relocate_target.load(Ordering::Acquire);
        self.frame.store(target, Ordering::Release);
        Some(target)
    }

    /// Move the position forward by one block if rolling (audio thread, block end).
    pub fn advance(&self, frames: usize) {
        if self.rolling.get() {
            self.frame.fetch_add(frames as u64, Ordering::AcqRel);
        }
    }
}

impl TransportControl for SharedTransport {
    fn position(&self) -> TransportPosition {
        TransportPosition {
            rolling: self.rolling.get(),
            frame: self.frame.load(Ordering::Acquire),
            frame_rate: self.frame_rate.load(Ordering::Acquire),
            bpm: self.bpm.get(),
            beats_per_bar: self.beats_per_bar.get(),
            beat_type: self.beat_type.get(),
        }
    }

    fn start(&self) {
        self.rolling.set(true);
    }

    fn stop(&self) {
        self.rolling.set(false);
    }

    fn relocate(&self, frame: u64) {
        self.relocate_target.store(frame, Ordering::Release);
        self.relocate_pending.set(true);
    }

    fn set_bpm(&self, bpm: f64) {
        if bpm.is_finite() && bpm > 0.0 {
            self.bpm.set(bpm);
        }
    }

    fn force_beat(&self, bpm: f64) {
        self.set_bpm(bpm);
        self.forced_beats.fetch_add(1, Ordering::AcqRel);
    }

    fn configure(&self, bpm: f64, beats_per_bar: f32, beat_type: f32) {
        self.set_bpm(bpm);
        if beats_per_bar > 0.0 {
            self.beats_per_bar.set(beats_per_bar);
        }
        if beat_type > 0.0 {
            self.beat_type.set(beat_type);
        }
    }
}
