use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use kairos_core::{AtomicFlag, Dispatcher, Handler, HandlerSlot, NodeId, ProcessContext, Processor, Result};
use rosc::OscPacket;

use crate::Message;

const READ_TIMEOUT: Duration = Duration::from_millis(50);

/// A UDP OSC server node.
///
/// The socket is served from its own thread; the audio thread never touches
/// it. Dropping the input stops and joins the thread.
#[derive(Debug)]
pub struct OscInput {
    id: NodeId,
    local_addr: SocketAddr,
    on_receive: Arc<HandlerSlot>,
    running: Arc<AtomicFlag>,
    thread: Option<JoinHandle<()>>,
}

impl OscInput {
    /// Bind `0.0.0.0:port` and start serving. Port 0 picks a free port.
    pub fn bind(port: u16, dispatcher: Dispatcher) -> Result<Self> {
        let socket = UdpSocket::bind(format!("0.0.0.0:{port}"))?;
        socket.set_read_timeout(Some(READ_TIMEOUT))?;
        let local_addr = socket.local_addr()?;

        let on_receive = Arc::new(HandlerSlot::new("onReceive", 1));
        let running = Arc::new(AtomicFlag::new(true));
        let thread = {
            let on_receive = on_receive.clone();
            let running = running.clone();
            thread::Builder::new()
                .name(format!("osc-input-{}", local_addr.port()))
                .spawn(move || serve(socket, running, on_receive, dispatcher))?
        };
        tracing::info!(port = local_addr.port(), "OSC input listening");

        Ok(Self {
            id: NodeId::next(),
            local_addr,
            on_receive,
            running,
            thread: Some(thread),
        })
    }

    pub fn node_id(&self) -> NodeId {
        self.id
    }

    /// The port actually bound.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// `osc.udp://host:port/`, the address clients should send to.
    pub fn url(&self) -> String {
        let ip = self.local_addr.ip();
        let host = if ip.is_unspecified() {
            "localhost".to_string()
        } else {
            ip.to_string()
        };
        format!("osc.udp://{host}:{}/", self.port())
    }

    /// Register the handler called with every incoming message.
    pub fn on_receive(&self, handler: Handler) -> Result<()> {
        self.on_receive.set(handler)
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }
}

impl Processor for OscInput {
    fn process(&self, _ctx: &ProcessContext) {}
}

impl Drop for OscInput {
    fn drop(&mut self) {
        self.running.set(false);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!(port = self.port(), "OSC input thread panicked");
            }
        }
        tracing::debug!(port = self.port(), "OSC input closed");
    }
}

fn serve(socket: UdpSocket, running: Arc<AtomicFlag>, on_receive: Arc<HandlerSlot>, dispatcher: Dispatcher) {
    let mut buf = [0u8; rosc::decoder::MTU];
    while running.get() {
        match socket.recv_from(&mut buf) {
            Ok((size, from)) => match rosc::decoder::decode_udp(&buf[..size]) {
                Ok((_, packet)) => deliver(packet, &on_receive, &dispatcher),
                Err(e) => tracing::debug!(%from, "dropping malformed OSC packet: {e:?}"),
            },
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) => {
                tracing::error!("OSC input error: {e}");
                break;
            }
        }
    }
    running.set(false);
}

fn deliver(packet: OscPacket, on_receive: &HandlerSlot, dispatcher: &Dispatcher) {
    match packet {
        OscPacket::Message(message) => {
            on_receive.notify(dispatcher, Message::from(message).into());
        }
        OscPacket::Bundle(bundle) => {
            for packet in bundle.content {
                deliver(packet, on_receive, dispatcher);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_core::{notification_channel, NodeEvent, OscValue};
    use rosc::{OscBundle, OscMessage, OscTime, OscType};
    use std::sync::Mutex;
    use std::time::Instant;

    fn send(port: u16, packet: &OscPacket) {
        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        let bytes = rosc::encoder::encode(packet).unwrap();
        client.send_to(&bytes, ("127.0.0.1", port)).unwrap();
    }

    fn message(addr: &str, args: Vec<OscType>) -> OscPacket {
        OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        })
    }

    #[test]
    fn test_receive_converts_arguments() {
        let (dispatcher, events) = notification_channel(16);
        let input = OscInput::bind(0, dispatcher).unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        input
            .on_receive(Handler::new(1, move |event| sink.lock().unwrap().push(event.clone())))
            .unwrap();

        send(
            input.port(),
            &message(
                "/synth/freq",
                vec![
                    OscType::Int(3),
                    OscType::Float(0.5),
                    OscType::String("saw".into()),
                    OscType::Bool(true),
                    OscType::Nil,
                    OscType::Blob(vec![1, 2]),
                ],
            ),
        );

        assert!(events.run_one(Duration::from_secs(2)));
        let received = received.lock().unwrap();
        assert_eq!(
            received[0],
            NodeEvent::Message {
                path: "/synth/freq".into(),
                args: vec![
                    OscValue::Int(3),
                    OscValue::Float(0.5),
                    OscValue::String("saw".into()),
                    OscValue::Bool(true),
                    OscValue::Nil,
                ],
            }
        );
    }

    #[test]
    fn test_bundle_flattened() {
        let (dispatcher, events) = notification_channel(16);
        let input = OscInput::bind(0, dispatcher).unwrap();
        let paths = Arc::new(Mutex::new(Vec::new()));
        let sink = paths.clone();
        input
            .on_receive(Handler::new(1, move |event| {
                if let NodeEvent::Message { path, .. } = event {
                    sink.lock().unwrap().push(path.clone());
                }
            }))
            .unwrap();

        let bundle = OscPacket::Bundle(OscBundle {
            timetag: OscTime::from((0, 1)),
            content: vec![
                message("/a", vec![]),
                OscPacket::Bundle(OscBundle {
                    timetag: OscTime::from((0, 1)),
                    content: vec![message("/b", vec![])],
                }),
            ],
        });
        send(input.port(), &bundle);

        let deadline = Instant::now() + Duration::from_secs(2);
        while paths.lock().unwrap().len() < 2 && Instant::now() < deadline {
            events.run_one(Duration::from_millis(50));
        }
        assert_eq!(*paths.lock().unwrap(), vec!["/a".to_string(), "/b".to_string()]);
    }

    #[test]
    fn test_url_and_port() {
        let (dispatcher, _events) = notification_channel(4);
        let input = OscInput::bind(0, dispatcher).unwrap();
        assert_ne!(input.port(), 0);
        assert_eq!(input.url(), format!("osc.udp://localhost:{}/", input.port()));
    }

    #[test]
    fn test_wrong_handler_arity_rejected() {
        let (dispatcher, _events) = notification_channel(4);
        let input = OscInput::bind(0, dispatcher).unwrap();
        assert!(input.on_receive(Handler::new(2, |_| {})).is_err());
    }

    #[test]
    fn test_drop_releases_port() {
        let (dispatcher, _events) = notification_channel(4);
        let input = OscInput::bind(0, dispatcher.clone()).unwrap();
        let port = input.port();
        assert!(input.is_running());
        drop(input);
        let again = OscInput::bind(port, dispatcher).unwrap();
        assert_eq!(again.port(), port);
    }
}
