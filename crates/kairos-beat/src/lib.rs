//! Beat tracking and tempo sync for kairos.
//!
//! - [`AudioBeatTracker`]: tempo from a mono audio input
//! - [`MidiBeatTracker`]: tempo from weighted note-ons, plus count-in
//! - [`BeatTrackerCache`]: one tracker per [`TrackerKey`], reset on re-acquire
//! - [`CountIn`], [`SilenceWatchdog`]: the state machines both trackers run
//!
//! Trackers run on the audio thread. Each detected beat retimes the shared
//! transport and queues an `onBeat` notification for the script thread.

mod audio;
mod cache;
pub mod config;
mod count_in;
mod midi;
mod tracker;
mod watchdog;

pub use audio::AudioBeatTracker;
pub use cache::{BeatTrackerCache, BeatTrackerRunners, TrackerKey};
pub use config::{BeatSyncConfig, CountInConfig, Meter};
pub use count_in::{CountIn, CountInStep};
pub use midi::MidiBeatTracker;
pub use tracker::{default_estimator, BeatSyncContext, EstimatorFactory};
pub use watchdog::SilenceWatchdog;
