//! OSC output node with transport-anchored scheduling.

use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use kairos_core::{AtomicFlag, Error, NodeId, Position, ProcessCell, ProcessContext, Processor, Result};

use crate::Message;

/// Messages an output can hold between scheduling and delivery.
pub const DEFAULT_SCHEDULE_CAPACITY: usize = 1024;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

struct Scheduled {
    at: Position,
    message: Message,
    flushed: bool,
}

/// Work handed from the audio thread to the sender thread.
enum Outgoing {
    Send(Message),
    /// Flushed by a relocation; released off the audio thread.
    Discard(Message),
}

struct OutputState {
    pending: Vec<Scheduled>,
}

/// Sends OSC messages over UDP to one `host:port`.
///
/// [`send`](Self::send) goes out at once from the calling thread.
/// [`schedule`](Self::schedule) anchors a message to a musical position: the
/// audio thread releases it in the block whose transport span contains the
/// position's frame offset, and a sender thread encodes and transmits it.
/// A relocation flushes every message already handed to the audio thread.
pub struct OscOutput {
    id: NodeId,
    target: SocketAddr,
    socket: Arc<UdpSocket>,
    capacity: usize,
    scheduled: Sender<Scheduled>,
    incoming: Receiver<Scheduled>,
    outgoing: Sender<Outgoing>,
    state: ProcessCell<OutputState>,
    running: Arc<AtomicFlag>,
    thread: Option<JoinHandle<()>>,
}

impl OscOutput {
    /// Resolve `host:port` and start the sender thread.
    pub fn connect(host: &str, port: u16, capacity: usize) -> Result<Self> {
        let target = (host, port).to_socket_addrs()?.next().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                ErrorKind::AddrNotAvailable,
                format!("no address for {host}:{port}"),
            ))
        })?;
        let local = if target.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
        let socket = Arc::new(UdpSocket::bind(local)?);

        let capacity = capacity.max(1);
        let (scheduled, incoming) = bounded(capacity);
        let (outgoing, to_send) = bounded(capacity);
        let running = Arc::new(AtomicFlag::new(true));
        let thread = {
            let socket = socket.clone();
            let running = running.clone();
            thread::Builder::new()
                .name(format!("osc-output-{target}"))
                .spawn(move || transmit(socket, target, to_send, running))?
        };
        tracing::info!(addr = %target, "OSC output ready");

        Ok(Self {
            id: NodeId::next(),
            target,
            socket,
            capacity,
            scheduled,
            incoming,
            outgoing,
            state: ProcessCell::new(OutputState {
                pending: Vec::with_capacity(capacity),
            }),
            running,
            thread: Some(thread),
        })
    }

    pub fn node_id(&self) -> NodeId {
        self.id
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Send `message` now.
    pub fn send(&self, message: &Message) -> Result<()> {
        let bytes = message.encode()?;
        self.socket.send_to(&bytes, self.target)?;
        Ok(())
    }

    /// Queue `message` for delivery when the transport reaches `at`.
    ///
    /// A position the transport has already passed goes out in the next
    /// rolling block. Nothing is delivered while the transport is stopped.
    pub fn schedule(&self, message: Message, at: Position) -> Result<()> {
        match self.scheduled.try_send(Scheduled {
            at,
            message,
            flushed: false,
        }) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => Err(Error::QueueFull {
                queue: "OSC schedule",
                capacity: self.capacity,
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }
}

impl Processor for OscOutput {
    fn process(&self, ctx: &ProcessContext) {
        let Some(mut state) = self.state.try_lock() else {
            return;
        };
        let pending = &mut state.pending;
        while pending.len() < pending.capacity() {
            match self.incoming.try_recv() {
                Ok(entry) => pending.push(entry),
                Err(_) => break,
            }
        }

        let block_end = ctx.transport.frame + ctx.frames as u64;
        let mut i = 0;
        while i < pending.len() {
            let entry = &pending[i];
            let due = ctx.rolling && entry.at.frame_offset(&ctx.transport) < block_end;
            if !entry.flushed && !due {
                i += 1;
                continue;
            }
            let entry = pending.remove(i);
            let work = if entry.flushed {
                Outgoing::Discard(entry.message)
            } else {
                Outgoing::Send(entry.message)
            };
            if let Err(e) = self.outgoing.try_send(work) {
                // Sender thread is behind: retry next block.
                let (message, flushed) = match e.into_inner() {
                    Outgoing::Send(message) => (message, false),
                    Outgoing::Discard(message) => (message, true),
                };
                pending.insert(
                    i,
                    Scheduled {
                        at: entry.at,
                        message,
                        flushed,
                    },
                );
                break;
            }
        }
    }

    fn reposition(&self) {
        let Some(mut state) = self.state.try_lock() else {
            return;
        };
        for entry in state.pending.iter_mut() {
            entry.flushed = true;
        }
    }
}

impl Drop for OscOutput {
    fn drop(&mut self) {
        self.running.set(false);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!(addr = %self.target, "OSC output thread panicked");
            }
        }
        tracing::debug!(addr = %self.target, "OSC output closed");
    }
}

fn transmit(socket: Arc<UdpSocket>, target: SocketAddr, to_send: Receiver<Outgoing>, running: Arc<AtomicFlag>) {
    while running.get() {
        match to_send.recv_timeout(POLL_INTERVAL) {
            Ok(Outgoing::Send(message)) => {
                let sent = message
                    .encode()
                    .and_then(|bytes| Ok(socket.send_to(&bytes, target)?));
                if let Err(e) = sent {
                    tracing::warn!(addr = %target, path = message.path(), "OSC send failed: {e}");
                }
            }
            Ok(Outgoing::Discard(message)) => {
                tracing::debug!(path = message.path(), "scheduled OSC message flushed");
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    running.set(false);
}
