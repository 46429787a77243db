//! Stops the transport when a tracked input stays silent.

/// Tracks the frame time of the last qualifying input.
///
/// Inert while the transport is stopped: the last-event time follows the
/// clock so that starting playback never trips it immediately.
#[derive(Debug, Clone, Default)]
pub struct SilenceWatchdog {
    last_event: u64,
}

impl SilenceWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record qualifying input in the block starting at `time`.
    #[inline]
    pub fn touch(&mut self, time: u64) {
        self.last_event = time;
    }

    pub fn last_event(&self) -> u64 {
        self.last_event
    }

    /// End-of-block check. Returns `true` when the transport should stop.
    ///
    /// A `timeout_secs` of zero disables the watchdog.
    pub fn check(&mut self, rolling: bool, time: u64, timeout_secs: u32, frame_rate: u32) -> bool {
        if !rolling {
            self.last_event = time;
            return false;
        }
        if timeout_secs == 0 {
            return false;
        }
        let elapsed = time.saturating_sub(self.last_event);
        if elapsed > timeout_secs as u64 * frame_rate as u64 {
            self.last_event = time;
            return true;
        }
        false
    }
}
