//! Tempo estimation from an onset strength signal.

use crate::onset::SpectralFlux;

/// Samples per analysis hop.
pub const DEFAULT_HOP_SIZE: usize = 512;

/// Tempo range searched by [`BeatEstimator`].
pub const MIN_BPM: f64 = 60.0;
pub const MAX_BPM: f64 = 180.0;

/// Onset history length in hops (about 5.5 s at 48 kHz).
const HISTORY_HOPS: usize = 512;

/// Width of the tempo prior in octaves.
const PRIOR_OCTAVES: f64 = 0.5;

/// A beat tracker fed one hop at a time.
///
/// Called from the audio thread: implementations must not allocate after
/// construction.
pub trait TempoEstimator: Send {
    /// Restart tracking around `bpm`.
    fn set_tempo(&mut self, bpm: f64);

    /// Feed one hop of raw audio.
    fn process_audio_hop(&mut self, hop: &[f64]);

    /// Feed one hop's worth of precomputed onset strength.
    fn process_onset(&mut self, onset: f64);

    /// Whether the last processed hop fell on a beat.
    fn beat_due(&self) -> bool;

    /// Current tempo estimate in bpm.
    fn tempo(&self) -> f64;
}

/// Autocorrelation beat estimator.
///
/// Keeps a ring of onset strengths. Every predicted beat the beat period is
/// re-estimated as the autocorrelation peak, weighted towards the current
/// tempo and refined by parabolic interpolation between lags.
pub struct BeatEstimator {
    frames_per_hop: f64,
    frame_rate: f64,
    flux: SpectralFlux,
    history: Vec<f64>,
    write: usize,
    filled: usize,
    acf: Vec<f64>,
    min_lag: usize,
    max_lag: usize,
    tempo: f64,
    period: f64,
    countdown: f64,
    beat_due: bool,
}

impl BeatEstimator {
    pub fn new(frame_rate: u32, hop_size: usize, bpm: f64) -> Self {
        let frame_rate = frame_rate.max(1) as f64;
        let frames_per_hop = hop_size.max(1) as f64;
        let hops = |bpm: f64| 60.0 * frame_rate / (bpm * frames_per_hop);
        let min_lag = (hops(MAX_BPM).floor() as usize).max(1);
        let max_lag = (hops(MIN_BPM).ceil() as usize).max(min_lag + 1);
        let history_len = HISTORY_HOPS.max(4 * max_lag);

        let mut estimator = Self {
            frames_per_hop,
            frame_rate,
            flux: SpectralFlux::new(hop_size),
            history: vec![0.0; history_len],
            write: 0,
            filled: 0,
            acf: vec![0.0; max_lag + 2],
            min_lag,
            max_lag,
            tempo: 120.0,
            period: hops(120.0),
            countdown: hops(120.0),
            beat_due: false,
        };
        estimator.set_tempo(bpm);
        estimator
    }

    fn hops_per_beat(&self, bpm: f64) -> f64 {
        60.0 * self.frame_rate / (bpm * self.frames_per_hop)
    }

    fn onset(&self, i: usize) -> f64 {
        let len = self.history.len();
        let start = (self.write + len - self.filled) % len;
        self.history[(start + i) % len]
    }

    /// Re-estimate the beat period from the onset history.
    fn update_period(&mut self) {
        let n = self.filled;
        if n < 2 * self.max_lag {
            return;
        }
        let mean = (0..n).map(|i| self.onset(i)).sum::<f64>() / n as f64;

        for lag in self.min_lag - 1..=self.max_lag + 1 {
            let mut sum = 0.0;
            for i in lag..n {
                sum += (self.onset(i) - mean) * (self.onset(i - lag) - mean);
            }
            let prior = ((lag as f64 / self.period).log2() / PRIOR_OCTAVES).powi(2);
            self.acf[lag] = sum / (n - lag) as f64 * (-0.5 * prior).exp();
        }

        let best = (self.min_lag..=self.max_lag)
            .max_by(|&a, &b| self.acf[a].total_cmp(&self.acf[b]))
            .unwrap_or(self.min_lag);
        if self.acf[best] <= 0.0 {
            return;
        }

        let (left, centre, right) = (self.acf[best - 1], self.acf[best], self.acf[best + 1]);
        let curvature = left - 2.0 * centre + right;
        let shift = if curvature < 0.0 {
            (0.5 * (left - right) / curvature).clamp(-0.5, 0.5)
        } else {
            0.0
        };
        self.period = best as f64 + shift;
        self.tempo = 60.0 * self.frame_rate / (self.period * self.frames_per_hop);
    }
}

impl TempoEstimator for BeatEstimator {
    fn set_tempo(&mut self, bpm: f64) {
        let bpm = if bpm.is_finite() { bpm.clamp(MIN_BPM, MAX_BPM) } else { 120.0 };
        self.tempo = bpm;
        self.period = self.hops_per_beat(bpm);
        self.countdown = self.period;
        self.history.fill(0.0);
        self.write = 0;
        self.filled = 0;
        self.beat_due = false;
        self.flux.reset();
    }

    fn process_audio_hop(&mut self, hop: &[f64]) {
        let onset = self.flux.process(hop);
        self.process_onset(onset);
    }

    fn process_onset(&mut self, onset: f64) {
        self.history[self.write] = onset;
        self.write = (self.write + 1) % self.history.len();
        self.filled = (self.filled + 1).min(self.history.len());

        self.countdown -= 1.0;
        self.beat_due = self.countdown <= 0.0;
        if self.beat_due {
            self.update_period();
            self.countdown += self.period;
            if self.countdown <= 0.0 {
                self.countdown = self.period;
            }
        }
    }

    fn beat_due(&self) -> bool {
        self.beat_due
    }

    fn tempo(&self) -> f64 {
        self.tempo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Onset strengths for a click every `frames_per_beat` frames.
    fn click_track(frames_per_beat: f64, hops: usize) -> Vec<f64> {
        let mut onsets = vec![0.0; hops];
        let mut beat = 0.0;
        while ((beat / DEFAULT_HOP_SIZE as f64) as usize) < hops {
            onsets[(beat / DEFAULT_HOP_SIZE as f64) as usize] = 100.0;
            beat += frames_per_beat;
        }
        onsets
    }

    #[test]
    fn test_initial_tempo() {
        let estimator = BeatEstimator::new(48_000, DEFAULT_HOP_SIZE, 110.0);
        assert_eq!(estimator.tempo(), 110.0);
        assert!(!estimator.beat_due());
    }

    #[test]
    fn test_tempo_clamped_to_range() {
        let mut estimator = BeatEstimator::new(48_000, DEFAULT_HOP_SIZE, 120.0);
        estimator.set_tempo(400.0);
        assert_eq!(estimator.tempo(), MAX_BPM);
        estimator.set_tempo(f64::NAN);
        assert_eq!(estimator.tempo(), 120.0);
    }

    #[test]
    fn test_beats_predicted_without_input() {
        let mut estimator = BeatEstimator::new(48_000, DEFAULT_HOP_SIZE, 120.0);
        let beats = (0..938)
            .filter(|_| {
                estimator.process_onset(0.0);
                estimator.beat_due()
            })
            .count();
        // 10 s at 120 bpm.
        assert_eq!(beats, 20);
    }

    #[test]
    fn test_converges_to_click_tempo() {
        let mut estimator = BeatEstimator::new(48_000, DEFAULT_HOP_SIZE, 100.0);
        for onset in click_track(24_000.0, 2_000) {
            estimator.process_onset(onset);
        }
        assert_abs_diff_eq!(estimator.tempo(), 120.0, epsilon = 2.0);
    }

    #[test]
    fn test_audio_clicks_drive_estimate() {
        let mut estimator = BeatEstimator::new(48_000, DEFAULT_HOP_SIZE, 110.0);
        let frames_per_beat = 48_000.0 * 60.0 / 128.0;
        let total = 48_000 * 12;
        let mut hop = vec![0.0; DEFAULT_HOP_SIZE];
        let mut next_click = 0.0;
        for start in (0..total).step_by(DEFAULT_HOP_SIZE) {
            hop.fill(0.0);
            for (i, sample) in hop.iter_mut().enumerate() {
                let frame = (start + i) as f64;
                if frame >= next_click && frame < next_click + 64.0 {
                    *sample = 0.8;
                }
                if frame >= next_click + 64.0 {
                    next_click += frames_per_beat;
                }
            }
            estimator.process_audio_hop(&hop);
        }
        assert_abs_diff_eq!(estimator.tempo(), 128.0, epsilon = 3.0);
    }
}
