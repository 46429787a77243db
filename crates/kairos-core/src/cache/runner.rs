use std::sync::Arc;

use ringbuf::traits::{Consumer, Producer};
use ringbuf::{HeapCons, HeapProd};

use super::CacheProcessor;
use crate::{ProcessContext, Processor};

/// Audio-thread half of a node cache. See the [module docs](super).
///
/// Never allocates: the active list is reserved up front for every node
/// that can be in flight.
pub struct CacheRunner<T> {
    name: &'static str,
    active: Vec<Arc<T>>,
    additions: HeapCons<Arc<T>>,
    deletions: HeapCons<Arc<T>>,
    recycle: HeapProd<Arc<T>>,
}

impl<T: Processor> CacheRunner<T> {
    pub(super) fn new(
        name: &'static str,
        max_active: usize,
        additions: HeapCons<Arc<T>>,
        deletions: HeapCons<Arc<T>>,
        recycle: HeapProd<Arc<T>>,
    ) -> Self {
        Self {
            name,
            active: Vec::with_capacity(max_active),
            additions,
            deletions,
            recycle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Nodes currently visited each block.
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, object: &Arc<T>) -> bool {
        self.active.iter().any(|o| Arc::ptr_eq(o, object))
    }

    fn adopt_additions(&mut self) {
        while self.active.len() < self.active.capacity() {
            match self.additions.try_pop() {
                Some(object) => self.active.push(object),
                None => break,
            }
        }
    }

    fn unlink(&mut self, object: &Arc<T>) -> bool {
        match self.active.iter().position(|o| Arc::ptr_eq(o, object)) {
            Some(index) => {
                self.active.remove(index);
                true
            }
            None => false,
        }
    }

    fn drain_deletions(&mut self) {
        while let Some(object) = self.deletions.try_pop() {
            // A node created and discarded between two blocks is still
            // waiting in the additions ring.
            if !self.unlink(&object) {
                self.adopt_additions();
                self.unlink(&object);
            }
            // The script side keeps deletions + recycled below the recycle
            // ring's capacity, so this cannot fail.
            let recycled = self.recycle.try_push(object);
            debug_assert!(recycled.is_ok(), "{} recycle ring overflow", self.name);
        }
    }
}

impl<T: Processor> CacheProcessor for CacheRunner<T> {
    fn process(&mut self, ctx: &ProcessContext) {
        self.drain_deletions();
        self.adopt_additions();
        for object in &self.active {
            object.process(ctx);
        }
    }

    fn reposition(&mut self) {
        self.drain_deletions();
        self.adopt_additions();
        for object in &self.active {
            object.reposition();
        }
    }
}
