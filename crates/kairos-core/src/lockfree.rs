//! Lock-free primitives shared between the script and audio threads.

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use atomic_float::{AtomicF32, AtomicF64};

/// Cache-line aligned atomic f32.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFloat {
    value: AtomicF32,
}

impl AtomicFloat {
    pub fn new(value: f32) -> Self {
        Self {
            value: AtomicF32::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.value.store(value, Ordering::Release);
    }
}

impl Default for AtomicFloat {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Cache-line aligned atomic f64.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicDouble {
    value: AtomicF64,
}

impl AtomicDouble {
    pub fn new(value: f64) -> Self {
        Self {
            value: AtomicF64::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> f64 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: f64) {
        self.value.store(value, Ordering::Release);
    }
}

impl Default for AtomicDouble {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Cache-line aligned atomic bool.
#[derive(Debug, Default)]
#[repr(align(64))]
pub struct AtomicFlag {
    value: AtomicBool,
}

impl AtomicFlag {
    pub fn new(value: bool) -> Self {
        Self {
            value: AtomicBool::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Release);
    }

    #[inline]
    pub fn swap(&self, value: bool) -> bool {
        self.value.swap(value, Ordering::AcqRel)
    }
}

/// Runs a pulled node at most once per block.
///
/// Holds the `time` of the last block the node processed. Nodes reachable
/// through several connectors call [`ProcessGate::begin`] first and skip the
/// block when it returns `false`.
#[derive(Debug)]
pub struct ProcessGate {
    last: AtomicU64,
}

impl ProcessGate {
    pub fn new() -> Self {
        Self {
            last: AtomicU64::new(u64::MAX),
        }
    }

    #[inline]
    pub fn begin(&self, time: u64) -> bool {
        self.last.swap(time, Ordering::AcqRel) != time
    }

    /// Forget the last processed block, e.g. after a relocation.
    pub fn reset(&self) {
        self.last.store(u64::MAX, Ordering::Release);
    }
}

impl Default for ProcessGate {
    fn default() -> Self {
        Self::new()
    }
}

/// State owned by the audio thread but stored inside a shared node.
///
/// Nodes are shared as `Arc<T>` between the script and audio threads. The
/// per-block state (estimators, hop buffers, ring consumers) is only touched
/// from `process`/`reposition`. [`ProcessCell::try_lock`] never blocks: a
/// second caller that arrives while the state is borrowed gets `None` and
/// skips its pass.
pub struct ProcessCell<T> {
    busy: AtomicBool,
    value: UnsafeCell<T>,
}

// SAFETY: the inner value is only reached through a `ProcessGuard`, and the
// `busy` flag admits at most one guard at a time. `T: Send` lets the value be
// created on the script thread and used on the audio thread.
unsafe impl<T: Send> Sync for ProcessCell<T> {}

impl<T> ProcessCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            busy: AtomicBool::new(false),
            value: UnsafeCell::new(value),
        }
    }

    /// Exclusive access to the state, or `None` if another call holds it.
    #[inline]
    pub fn try_lock(&self) -> Option<ProcessGuard<'_, T>> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| ProcessGuard { cell: self })
    }
}

/// Borrow of a [`ProcessCell`], released on drop.
pub struct ProcessGuard<'a, T> {
    cell: &'a ProcessCell<T>,
}

impl<T> Deref for ProcessGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: this guard holds the cell's busy flag.
        unsafe { &*self.cell.value.get() }
    }
}

impl<T> DerefMut for ProcessGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: this guard holds the cell's busy flag.
        unsafe { &mut *self.cell.value.get() }
    }
}

impl<T> Drop for ProcessGuard<'_, T> {
    fn drop(&mut self) {
        self.cell.busy.store(false, Ordering::Release);
    }
}
