//! # Kairos - Live-coding Audio Runtime
//!
//! Real-time node caches, beat sync and OSC input/output for scripts that are
//! re-run while audio keeps playing.
//!
//! ## Architecture
//!
//! Kairos is an umbrella crate that coordinates:
//! - **kairos-core** - node caches, audio routing, musical time, transport, notifications
//! - **kairos-midi** - packed MIDI events, MIDI routing and input ports
//! - **kairos-analysis** - onset detection and tempo estimation
//! - **kairos-beat** - audio and MIDI beat trackers, count-in, silence watchdog
//! - **kairos-osc** - OSC input and transport-scheduled output over UDP
//!
//! The runtime is split in two. [`Engine`] lives on the script thread: it
//! hands out cached nodes and runs handler notifications. [`AudioProcessor`]
//! lives on the audio thread: it applies cache changes and processes every
//! live node once per block.
//!
//! ## Quick Start
//!
//! ```ignore
//! use kairos::prelude::*;
//!
//! let (mut engine, mut audio) = Engine::builder().sample_rate(48_000).build()?;
//!
//! let (input, _handle) = engine.audio_input("mic")?;
//! let tracker = engine.audio_tracker(TrackerKey(0), Meter::new(120.0, 4.0, 4.0))?;
//! tracker.connect(input, 0)?;
//! tracker.stop_on_silence(5);
//! engine.script_complete();
//!
//! audio.process_block(256);
//! engine.run_pending();
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - everything below
//! - `osc` - OSC input and output nodes

pub use kairos_analysis as analysis;
pub use kairos_beat as beat;
pub use kairos_core as core;
pub use kairos_midi as midi;
#[cfg(feature = "osc")]
pub use kairos_osc as osc;

// Core types
pub use kairos_core::{
    // Routing
    AudioConnection,
    AudioConnector,
    AudioFeed,
    AudioFeedHandle,
    AudioMixer,
    // Node caches
    CacheProcessor,
    CacheRunner,
    // Notifications
    Dispatcher,
    Duration,
    EngineConfig,
    EventLoop,
    Handler,
    HandlerSlot,
    NodeEvent,
    NodeId,
    ObjectCache,
    OscValue,
    // Musical time
    Position,
    ProcessContext,
    Processor,
    ProcessorCache,
    // Transport
    SharedTransport,
    Source,
    TransportControl,
    TransportPosition,
};

pub use kairos_beat::{
    AudioBeatTracker, BeatSyncConfig, CountInConfig, Meter, MidiBeatTracker, TrackerKey,
};
pub use kairos_midi::{MidiEvent, MidiFeed, MidiFeedHandle, MidiSource};

#[cfg(feature = "osc")]
pub use kairos_osc::{Message, OscInput, OscInputKey, OscOutput, OscOutputKey};

mod builder;
mod engine;
mod error;

pub use builder::EngineBuilder;
pub use engine::{AudioProcessor, Engine};
pub use error::{Error, Result};

/// Convenience prelude for common imports
pub mod prelude {
    // Runtime
    pub use crate::{AudioProcessor, Engine, EngineBuilder};

    // Nodes and handlers
    pub use crate::{Handler, NodeEvent, OscValue, Source, TransportControl};

    // Beat sync
    pub use crate::{Meter, TrackerKey};

    // Musical time
    pub use crate::{Duration, Position};

    // MIDI
    pub use crate::MidiEvent;
}
