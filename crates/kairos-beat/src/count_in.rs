//! Count-in detection: four tempo-consistent pulses lock the tempo and
//! schedule a transport start one beat after the last pulse.

use crate::config::CountInConfig;

/// Outcome of a count-in step that the tracker has to act on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CountInStep {
    /// A pulse was accepted; `count` is 1..=3.
    Counted(u32),
    /// The fourth pulse was accepted. Tempo is locked to `bpm` and the
    /// transport should start at `start_frame`.
    Locked { bpm: f64, start_frame: u64 },
    /// The scheduled start frame falls inside the current block.
    Start,
    /// Too long since the last accepted pulse.
    Abandoned,
}

/// Count-in state: number of accepted pulses (0..=4) and their frames.
#[derive(Debug, Clone, Default)]
pub struct CountIn {
    count: usize,
    pulses: [u64; 4],
    start_frame: u64,
}

impl CountIn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pulses accepted so far.
    pub fn count(&self) -> u32 {
        self.count as u32
    }

    /// Scheduled transport start, once four pulses are in.
    pub fn start_frame(&self) -> Option<u64> {
        (self.count == 4).then_some(self.start_frame)
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Block-start check for a due start or an expired count-in.
    pub fn poll(&mut self, time: u64, frames: usize, frame_rate: u32, config: &CountInConfig) -> Option<CountInStep> {
        if self.count == 4 && time + frames as u64 >= self.start_frame {
            self.count = 0;
            return Some(CountInStep::Start);
        }
        if self.count > 0 {
            let limit = (config.abandon_after_secs * frame_rate as f64) as u64;
            if time.saturating_sub(self.pulses[self.count - 1]) > limit {
                self.count = 0;
                return Some(CountInStep::Abandoned);
            }
        }
        None
    }

    /// Offer a qualifying pulse at absolute frame `frame`.
    ///
    /// `frames_per_beat` is the beat period implied by the current tempo.
    /// Pulses outside the acceptance window are ignored.
    pub fn pulse(&mut self, frame: u64, frames_per_beat: f64, frame_rate: u32, config: &CountInConfig) -> Option<CountInStep> {
        match self.count {
            0 => {
                self.pulses[0] = frame;
                self.count = 1;
                Some(CountInStep::Counted(1))
            }
            1..=3 => {
                let real = frame.saturating_sub(self.pulses[self.count - 1]);
                let ideal = (frames_per_beat as u64).max(1);
                if !config.accepts_interval(100 * real / ideal) {
                    return None;
                }
                self.pulses[self.count] = frame;
                self.count += 1;
                if self.count < 4 {
                    return Some(CountInStep::Counted(self.count as u32));
                }
                let period = (self.pulses[3] - self.pulses[0]) / 3;
                self.start_frame = frame + period;
                Some(CountInStep::Locked {
                    bpm: frame_rate as f64 * 60.0 / period.max(1) as f64,
                    start_frame: self.start_frame,
                })
            }
            _ => None,
        }
    }
}
