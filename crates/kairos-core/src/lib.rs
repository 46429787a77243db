//! Real-time core of the kairos live-coding engine.
//!
//! A script thread creates, reconfigures and discards nodes while the audio
//! thread walks them every block without blocking, allocating or locking.
//!
//! # Primary API
//!
//! - [`ProcessorCache`] / [`CacheRunner`]: keyed node lifecycle shared by both threads
//! - [`AudioConnector`], [`AudioConnection`], [`Source`]: acyclic mono routing
//! - [`Position`], [`Duration`]: exact bar/position/division musical time
//! - [`SharedTransport`], [`TransportControl`]: play state and tempo
//! - [`HandlerSlot`], [`Dispatcher`], [`EventLoop`]: audio-to-script notifications
//!
//! # Example
//!
//! ```ignore
//! use kairos_core::*;
//!
//! let (mut cache, mut runner) = ProcessorCache::<u32, MyNode>::new("nodes", 64);
//! let mut cache = cache.with_factory(|key| Some(Arc::new(MyNode::new(*key))));
//!
//! let node = cache.get_object(1)?;           // script thread
//! runner.process(&ctx);                       // audio thread
//! cache.script_complete();                    // end of script run
//! ```

pub mod cache;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod graph;
mod lockfree;
mod node;
pub mod time;
pub mod transport;

pub use cache::{CacheProcessor, CacheRunner, Factory, ObjectCache, ProcessorCache};
pub use config::EngineConfig;
pub use dispatch::{
    notification_channel, Dispatcher, EventLoop, Handler, HandlerSlot, NodeEvent, Notification,
    OscValue,
};
pub use error::{Error, Result};
pub use graph::{
    AudioConnection, AudioConnector, AudioFeed, AudioFeedHandle, AudioLink, AudioMixer,
    GraphBuffers, Source,
};
pub use lockfree::{AtomicDouble, AtomicFlag, AtomicFloat, ProcessCell, ProcessGate, ProcessGuard};
pub use node::{NodeId, ProcessContext, Processor};
pub use time::{Duration, Position, MAX_DENOMINATOR};
pub use transport::{SharedTransport, TransportControl, TransportPosition};
