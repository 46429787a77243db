//! MIDI for kairos: packed events, per-block connections and input ports.
//!
//! - [`MidiEvent`]: three-byte channel message with a frame offset
//! - [`MidiConnection`], [`MidiConnector`], [`MidiSource`]: acyclic MIDI routing
//! - [`MidiFeed`]: input port filled from a non-audio thread

mod connection;
pub mod event;
mod feed;

pub use connection::{MidiConnection, MidiConnector, MidiLink, MidiSource};
pub use event::MidiEvent;
pub use feed::{MidiFeed, MidiFeedHandle, DEFAULT_EVENTS_PER_BLOCK};
