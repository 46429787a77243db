//! OSC input and output for kairos.
//!
//! An [`OscInput`] listens on a UDP port from a background thread and
//! hands every incoming message to the script's `onReceive` handler as a
//! [`NodeEvent::Message`](kairos_core::NodeEvent::Message). An [`OscOutput`]
//! sends [`Message`]s to one destination, either at once or anchored to a
//! musical [`Position`](kairos_core::Position) that the audio thread
//! releases in the matching block.
//!
//! Both are cached: a script that asks for the same port or destination on
//! every run keeps the same socket.

mod cache;
mod input;
mod message;
mod output;

pub use cache::{OscInputCache, OscInputKey, OscOutputCache, OscOutputKey, OscProtocol};
pub use input::OscInput;
pub use message::Message;
pub use output::{OscOutput, DEFAULT_SCHEDULE_CAPACITY};
