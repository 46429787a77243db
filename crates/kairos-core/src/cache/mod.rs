//! Keyed construct-or-reuse caches for real-time nodes.
//!
//! A cache is split in two halves joined by lock-free rings:
//!
//! - [`ProcessorCache`] lives on the script thread. It maps keys to nodes,
//!   tracks which entries the current script run touched, and on
//!   [`ObjectCache::script_complete`] schedules untouched ones for deletion.
//! - [`CacheRunner`] lives on the audio thread. Once per block it drains the
//!   deletion ring, unlinks each node from its active list, hands it back to
//!   the script thread for deallocation, then processes every active node.
//!
//! ```text
//! script thread                       audio thread
//! ProcessorCache --additions-------->  CacheRunner.active
//!                --deletions-------->  unlink
//!                <--recycled---------  (dropped on the script thread)
//! ```

mod runner;
mod script;

use std::sync::Arc;

pub use runner::CacheRunner;
pub use script::ProcessorCache;

use crate::ProcessContext;

/// Creation hook: build a node for a key, or `None` if the key is unsupported.
pub type Factory<K, T> = Box<dyn FnMut(&K) -> Option<Arc<T>> + Send>;

/// Script-thread side of a cache.
pub trait ObjectCache {
    /// Reconcile entries after a script run.
    ///
    /// Entries touched during the run survive; the rest leave the map and
    /// are queued for removal by the audio thread. Returns whether any
    /// entries remain.
    fn script_complete(&mut self) -> bool;
}

/// Audio-thread side of a cache.
pub trait CacheProcessor: Send {
    fn process(&mut self, ctx: &ProcessContext);

    fn reposition(&mut self);
}
