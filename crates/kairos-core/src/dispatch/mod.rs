//! Asynchronous notifications from the audio thread to script handlers.
//!
//! Handlers are registered into [`HandlerSlot`]s on the script thread. The
//! audio thread never calls them: it sends `(handler, event)` pairs through
//! a bounded [`Dispatcher`], and the script thread runs them from its
//! [`EventLoop`].

mod event;
mod handler;

pub use event::{NodeEvent, OscValue};
pub use handler::{Handler, HandlerSlot};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};

/// A handler invocation queued for the script thread.
pub struct Notification {
    pub handler: Arc<Handler>,
    pub event: NodeEvent,
}

/// Create a notification channel holding up to `capacity` pending events.
pub fn notification_channel(capacity: usize) -> (Dispatcher, EventLoop) {
    let (tx, rx) = bounded(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        Dispatcher {
            tx,
            dropped: dropped.clone(),
        },
        EventLoop {
            rx,
            dropped,
            reported: AtomicU64::new(0),
        },
    )
}

/// Sending half, cloned into every node that notifies.
#[derive(Clone)]
pub struct Dispatcher {
    tx: Sender<Notification>,
    dropped: Arc<AtomicU64>,
}

impl Dispatcher {
    /// Queue `event` for `handler` without blocking.
    ///
    /// When the queue is full the notification is dropped and counted.
    pub fn dispatch(&self, handler: Arc<Handler>, event: NodeEvent) -> bool {
        match self.tx.try_send(Notification { handler, event }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Receiving half, owned by the script thread.
pub struct EventLoop {
    rx: Receiver<Notification>,
    dropped: Arc<AtomicU64>,
    reported: AtomicU64,
}

impl EventLoop {
    fn run(&self, notification: Notification) {
        match &notification.event {
            NodeEvent::CountInAbandoned => tracing::info!("count-in abandoned"),
            NodeEvent::SilenceStop => tracing::info!("transport stopped after silence"),
            _ => {}
        }
        notification.handler.call(&notification.event);
    }

    fn report_dropped(&self) {
        let dropped = self.dropped.load(Ordering::Relaxed);
        let reported = self.reported.swap(dropped, Ordering::Relaxed);
        if dropped > reported {
            tracing::warn!(count = dropped - reported, "notifications dropped, queue full");
        }
    }

    /// Run every queued notification. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        self.report_dropped();
        let mut ran = 0;
        loop {
            match self.rx.try_recv() {
                Ok(notification) => {
                    self.run(notification);
                    ran += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return ran,
            }
        }
    }

    /// Wait up to `timeout` for one notification and run it.
    pub fn run_one(&self, timeout: Duration) -> bool {
        self.report_dropped();
        match self.rx.recv_timeout(timeout) {
            Ok(notification) => {
                self.run(notification);
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Run notifications as they arrive until `deadline`. Returns how many ran.
    pub fn run_until(&self, deadline: Instant) -> usize {
        let mut ran = 0;
        while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            if self.run_one(remaining) {
                ran += 1;
            }
        }
        ran
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}
