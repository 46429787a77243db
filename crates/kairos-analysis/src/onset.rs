//! Spectral flux onset detection, one hop at a time.
//!
//! All buffers are allocated up front so [`SpectralFlux::process`] can run
//! on the audio thread.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Positive spectral difference between consecutive frames.
pub struct SpectralFlux {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    previous: Vec<f32>,
}

impl SpectralFlux {
    /// Analyse frames of up to `frame_size` samples (rounded up to a power
    /// of two, shorter frames are zero padded).
    pub fn new(frame_size: usize) -> Self {
        let size = frame_size.max(2).next_power_of_two();
        let fft = FftPlanner::new().plan_fft_forward(size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self {
            fft,
            window: hann_window(size),
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch,
            previous: vec![0.0; size / 2],
        }
    }

    pub fn frame_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn reset(&mut self) {
        self.previous.fill(0.0);
    }

    /// Onset strength of `frame` relative to the previous frame.
    pub fn process(&mut self, frame: &[f64]) -> f64 {
        for (i, (slot, w)) in self.buffer.iter_mut().zip(&self.window).enumerate() {
            let sample = frame.get(i).copied().unwrap_or(0.0) as f32;
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        let mut flux = 0.0f64;
        for (bin, previous) in self.buffer.iter().zip(self.previous.iter_mut()) {
            let magnitude = bin.norm();
            let rise = magnitude - *previous;
            if rise > 0.0 {
                flux += rise as f64;
            }
            *previous = magnitude;
        }
        flux
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let angle = 2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32;
            0.5 * (1.0 - angle.cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_has_no_flux() {
        let mut flux = SpectralFlux::new(512);
        let silence = vec![0.0; 512];
        assert_eq!(flux.process(&silence), 0.0);
        assert_eq!(flux.process(&silence), 0.0);
    }

    #[test]
    fn test_onset_after_silence() {
        let mut flux = SpectralFlux::new(512);
        flux.process(&vec![0.0; 512]);
        let burst: Vec<f64> = (0..512).map(|i| ((i * 7919) % 13) as f64 / 6.5 - 1.0).collect();
        let onset = flux.process(&burst);
        assert!(onset > 1.0);
        // Same spectrum again: no rise.
        assert!(flux.process(&burst) < onset * 1e-3);
    }

    #[test]
    fn test_frame_size_rounded() {
        assert_eq!(SpectralFlux::new(500).frame_size(), 512);
    }
}
