//! Beat tracking configuration.

use serde::{Deserialize, Serialize};

use kairos_core::{Error, Result};

/// Count-in pulse acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountInConfig {
    /// Shortest accepted pulse interval, in percent of the ideal beat period.
    pub window_low_percent: u32,
    /// Longest accepted pulse interval, in percent of the ideal beat period.
    pub window_high_percent: u32,
    /// Seconds without an accepted pulse before the count-in is abandoned.
    pub abandon_after_secs: f64,
    pub velocity_min: u8,
    pub velocity_max: u8,
}

impl Default for CountInConfig {
    fn default() -> Self {
        Self {
            window_low_percent: 60,
            window_high_percent: 140,
            abandon_after_secs: 1.0,
            velocity_min: 72,
            velocity_max: 127,
        }
    }
}

impl CountInConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_low_percent == 0 || self.window_low_percent > self.window_high_percent {
            return Err(Error::InvalidConfig(format!(
                "count-in window {}%-{}% is empty",
                self.window_low_percent, self.window_high_percent
            )));
        }
        if !self.abandon_after_secs.is_finite() || self.abandon_after_secs <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "abandon_after_secs {} must be > 0",
                self.abandon_after_secs
            )));
        }
        if self.velocity_min > self.velocity_max || self.velocity_max > 127 {
            return Err(Error::InvalidConfig(format!(
                "velocity range {}-{} invalid",
                self.velocity_min, self.velocity_max
            )));
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn accepts_velocity(&self, velocity: u8) -> bool {
        (self.velocity_min..=self.velocity_max).contains(&velocity)
    }

    #[inline]
    pub(crate) fn accepts_interval(&self, percent: u64) -> bool {
        (self.window_low_percent as u64..=self.window_high_percent as u64).contains(&percent)
    }
}

/// Settings shared by every beat tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatSyncConfig {
    /// Frames per analysis hop.
    pub hop_size: usize,
    /// Audio peak above which input counts as activity for the watchdog.
    pub silence_threshold: f32,
    pub count_in: CountInConfig,
}

impl Default for BeatSyncConfig {
    fn default() -> Self {
        Self {
            hop_size: kairos_analysis::DEFAULT_HOP_SIZE,
            silence_threshold: 0.01,
            count_in: CountInConfig::default(),
        }
    }
}

impl BeatSyncConfig {
    pub fn validate(&self) -> Result<()> {
        if !(16..=16_384).contains(&self.hop_size) {
            return Err(Error::InvalidConfig(format!(
                "hop_size {} out of range (16-16384)",
                self.hop_size
            )));
        }
        if !self.silence_threshold.is_finite() || self.silence_threshold < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "silence_threshold {} must be >= 0",
                self.silence_threshold
            )));
        }
        self.count_in.validate()
    }
}

/// Tempo and meter a tracker is (re)acquired with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Meter {
    pub bpm: f64,
    pub beats_per_bar: f32,
    pub beat_unit: f32,
}

impl Meter {
    pub fn new(bpm: f64, beats_per_bar: f32, beat_unit: f32) -> Self {
        Self {
            bpm,
            beats_per_bar,
            beat_unit,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return Err(Error::InvalidConfig(format!("bpm {} must be > 0", self.bpm)));
        }
        if !(self.beats_per_bar > 0.0) || !(self.beat_unit > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "meter {}/{} invalid",
                self.beats_per_bar, self.beat_unit
            )));
        }
        Ok(())
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::new(120.0, 4.0, 4.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        assert!(BeatSyncConfig::default().validate().is_ok());
        assert_eq!(BeatSyncConfig::default().hop_size, 512);
        assert!(Meter::default().validate().is_ok());
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let config = CountInConfig::default();
        assert!(config.accepts_interval(60));
        assert!(config.accepts_interval(140));
        assert!(!config.accepts_interval(59));
        assert!(!config.accepts_interval(141));
        assert!(config.accepts_velocity(72));
        assert!(!config.accepts_velocity(71));
    }

    #[test]
    fn test_invalid_configs() {
        let config = CountInConfig {
            window_low_percent: 150,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(Meter::new(0.0, 4.0, 4.0).validate().is_err());
        assert!(Meter::new(120.0, 0.0, 4.0).validate().is_err());
    }
}
