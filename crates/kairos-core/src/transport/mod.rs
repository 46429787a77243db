//! Shared transport: play state, position, tempo and meter.
//!
//! Beat trackers read a [`TransportPosition`] snapshot every block and push
//! tempo and play-state changes back through [`TransportControl`].

mod shared;

pub use shared::SharedTransport;

/// Snapshot of the transport taken once at the start of a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportPosition {
    pub rolling: bool,
    /// Transport frame at the start of the block.
    pub frame: u64,
    pub frame_rate: u32,
    pub bpm: f64,
    pub beats_per_bar: f32,
    pub beat_type: f32,
}

impl TransportPosition {
    #[inline]
    pub fn frames_per_beat(&self) -> f64 {
        60.0 * self.frame_rate as f64 / self.bpm
    }
}

impl Default for TransportPosition {
    fn default() -> Self {
        Self {
            rolling: false,
            frame: 0,
            frame_rate: 48_000,
            bpm: 120.0,
            beats_per_bar: 4.0,
            beat_type: 4.0,
        }
    }
}

/// Operations a node may perform on the shared transport.
///
/// Every method is wait-free so it can be called from the audio thread.
pub trait TransportControl: Send + Sync {
    fn position(&self) -> TransportPosition;

    fn start(&self);

    fn stop(&self);

    /// Move to `frame`. Takes effect at the start of the next block.
    fn relocate(&self, frame: u64);

    /// Change tempo. Non-positive or non-finite values are ignored.
    fn set_bpm(&self, bpm: f64);

    /// Retime the transport to a detected beat at `bpm`.
    fn force_beat(&self, bpm: f64);

    /// Set tempo and meter together.
    fn configure(&self, bpm: f64, beats_per_bar: f32, beat_type: f32);
}
