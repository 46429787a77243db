use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use super::{CacheRunner, Factory, ObjectCache};
use crate::{Error, Processor, Result};

struct Entry<T> {
    object: Arc<T>,
    touched: bool,
}

/// Script-thread half of a node cache. See the [module docs](super).
pub struct ProcessorCache<K, T> {
    name: &'static str,
    capacity: usize,
    entries: HashMap<K, Entry<T>>,
    factory: Option<Factory<K, T>>,
    additions: HeapProd<Arc<T>>,
    deletions: HeapProd<Arc<T>>,
    recycled: HeapCons<Arc<T>>,
}

impl<K, T> ProcessorCache<K, T>
where
    K: Eq + Hash + Clone + Debug,
    T: Processor + 'static,
{
    /// Create a cache holding at most `capacity` live entries, together with
    /// the runner to move onto the audio thread.
    pub fn new(name: &'static str, capacity: usize) -> (Self, CacheRunner<T>) {
        let capacity = capacity.max(1);
        // Nodes in flight are either live or awaiting deletion.
        let (additions, additions_rx) = HeapRb::new(2 * capacity).split();
        let (deletions, deletions_rx) = HeapRb::new(capacity).split();
        // One spare slot covers a node between the runner's pop and push.
        let (recycle_tx, recycled) = HeapRb::new(capacity + 1).split();
        let cache = Self {
            name,
            capacity,
            entries: HashMap::with_capacity(capacity),
            factory: None,
            additions,
            deletions,
            recycled,
        };
        let runner = CacheRunner::new(name, 2 * capacity, additions_rx, deletions_rx, recycle_tx);
        (cache, runner)
    }

    /// Install the creation hook used by [`get_object`](Self::get_object).
    pub fn with_factory(mut self, factory: impl FnMut(&K) -> Option<Arc<T>> + Send + 'static) -> Self {
        self.factory = Some(Box::new(factory));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Return the node for `key`, creating it through the factory if absent.
    ///
    /// Marks the entry as used by the current script run.
    pub fn get_object(&mut self, key: K) -> Result<Arc<T>> {
        if let Some(object) = self.find_object(&key) {
            return Ok(object);
        }
        let object = self
            .factory
            .as_mut()
            .and_then(|factory| factory(&key))
            .ok_or_else(|| Error::UnsupportedKey {
                cache: self.name,
                key: format!("{key:?}"),
            })?;
        self.register_object(key, object.clone())?;
        Ok(object)
    }

    /// Look up `key` without creating, marking a hit as used.
    pub fn find_object(&mut self, key: &K) -> Option<Arc<T>> {
        self.collect_garbage();
        self.entries.get_mut(key).map(|entry| {
            entry.touched = true;
            entry.object.clone()
        })
    }

    /// Insert a node built by the caller and publish it to the audio thread.
    ///
    /// A node already registered under `key` is replaced and scheduled for
    /// deletion.
    pub fn register_object(&mut self, key: K, object: Arc<T>) -> Result<()> {
        self.collect_garbage();
        let replaced = self
            .entries
            .get(&key)
            .map(|entry| !Arc::ptr_eq(&entry.object, &object));
        match replaced {
            Some(false) => {
                if let Some(entry) = self.entries.get_mut(&key) {
                    entry.touched = true;
                }
                return Ok(());
            }
            None if self.entries.len() >= self.capacity => {
                return Err(Error::CacheFull {
                    cache: self.name,
                    capacity: self.capacity,
                });
            }
            _ => {}
        }
        if self.additions.try_push(object.clone()).is_err() {
            return Err(Error::CacheFull {
                cache: self.name,
                capacity: self.capacity,
            });
        }
        tracing::debug!(cache = self.name, ?key, "registered node");
        let previous = self.entries.insert(
            key,
            Entry {
                object,
                touched: true,
            },
        );
        if let Some(previous) = previous {
            self.schedule_deletion(previous.object);
        }
        Ok(())
    }

    /// Drop nodes the audio thread has finished with. Returns how many.
    pub fn collect_garbage(&mut self) -> usize {
        let mut dropped = 0;
        while let Some(object) = self.recycled.try_pop() {
            drop(object);
            dropped += 1;
        }
        dropped
    }

    /// Nodes queued for deletion that the audio thread has not drained yet.
    pub fn pending_deletions(&self) -> usize {
        self.deletions.occupied_len()
    }

    /// Queue `object` for removal by the audio thread.
    ///
    /// Never drops the deletion: while the rings are full this waits for
    /// the audio thread to drain them.
    fn schedule_deletion(&mut self, object: Arc<T>) {
        let mut object = object;
        let mut warned = false;
        loop {
            self.collect_garbage();
            let in_flight = self.deletions.occupied_len() + self.recycled.occupied_len();
            if in_flight < self.capacity {
                match self.deletions.try_push(object) {
                    Ok(()) => return,
                    Err(rejected) => object = rejected,
                }
            }
            if !warned {
                tracing::warn!(cache = self.name, "deletion queue full, waiting for audio thread");
                warned = true;
            }
            std::thread::yield_now();
        }
    }
}

impl<K, T> ObjectCache for ProcessorCache<K, T>
where
    K: Eq + Hash + Clone + Debug,
    T: Processor + 'static,
{
    fn script_complete(&mut self) -> bool {
        self.collect_garbage();
        let mut unused = Vec::new();
        let name = self.name;
        self.entries.retain(|key, entry| {
            if entry.touched {
                entry.touched = false;
                true
            } else {
                tracing::debug!(cache = name, ?key, "reclaiming unused node");
                unused.push(entry.object.clone());
                false
            }
        });
        for object in unused {
            self.schedule_deletion(object);
        }
        !self.entries.is_empty()
    }
}
