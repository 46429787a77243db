//! Onset detection and tempo estimation for beat tracking.
//!
//! - [`TempoEstimator`]: hop-by-hop beat tracker interface
//! - [`BeatEstimator`]: spectral flux + autocorrelation implementation
//! - [`SpectralFlux`]: onset strength of an audio hop

pub mod onset;
pub mod tempo;

pub use onset::SpectralFlux;
pub use tempo::{BeatEstimator, TempoEstimator, DEFAULT_HOP_SIZE, MAX_BPM, MIN_BPM};
