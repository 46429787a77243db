//! Script-side OSC message: a path and a list of typed arguments.

use kairos_core::{Error, NodeEvent, OscValue, Result};
use rosc::{OscMessage, OscPacket, OscType};

/// An OSC message built by a script or received by an [`OscInput`](crate::OscInput).
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    path: String,
    args: Vec<OscValue>,
}

impl Message {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument. Integers, floats, strings, booleans and `()`
    /// (nil) are accepted.
    pub fn add(&mut self, value: impl Into<OscValue>) -> &mut Self {
        self.args.push(value.into());
        self
    }

    pub fn with(mut self, value: impl Into<OscValue>) -> Self {
        self.add(value);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn args(&self) -> &[OscValue] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Result<&OscValue> {
        self.args.get(index).ok_or(Error::IndexOutOfRange {
            what: "OSC argument",
            index,
            len: self.args.len(),
        })
    }

    /// Wire form. Integers that fit 32 bits go out as `i`, wider ones as
    /// `h`; floats go out as 32-bit `f`.
    pub(crate) fn to_packet(&self) -> OscPacket {
        let args = self
            .args
            .iter()
            .map(|arg| match arg {
                OscValue::Int(i) => match i32::try_from(*i) {
                    Ok(i) => OscType::Int(i),
                    Err(_) => OscType::Long(*i),
                },
                OscValue::Float(f) => OscType::Float(*f as f32),
                OscValue::String(s) => OscType::String(s.clone()),
                OscValue::Bool(b) => OscType::Bool(*b),
                OscValue::Nil => OscType::Nil,
            })
            .collect();
        OscPacket::Message(OscMessage {
            addr: self.path.clone(),
            args,
        })
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        rosc::encoder::encode(&self.to_packet()).map_err(|e| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("cannot encode OSC message {}: {e}", self.path),
            ))
        })
    }
}

/// Argument types without a script representation are skipped.
impl From<OscMessage> for Message {
    fn from(message: OscMessage) -> Self {
        let args = message
            .args
            .into_iter()
            .filter_map(|arg| match arg {
                OscType::Int(i) => Some(OscValue::Int(i64::from(i))),
                OscType::Long(i) => Some(OscValue::Int(i)),
                OscType::Float(f) => Some(OscValue::Float(f64::from(f))),
                OscType::Double(f) => Some(OscValue::Float(f)),
                OscType::String(s) => Some(OscValue::String(s)),
                OscType::Bool(b) => Some(OscValue::Bool(b)),
                OscType::Nil => Some(OscValue::Nil),
                _ => None,
            })
            .collect();
        Self {
            path: message.addr,
            args,
        }
    }
}

impl From<Message> for NodeEvent {
    fn from(message: Message) -> Self {
        NodeEvent::Message {
            path: message.path,
            args: message.args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_read_back() {
        let message = Message::new("/mixer/gain").with(2).with(0.5).with("left").with(false).with(());
        assert_eq!(message.path(), "/mixer/gain");
        assert_eq!(message.args().len(), 5);
        assert_eq!(message.arg(0).unwrap(), &OscValue::Int(2));
        assert_eq!(message.arg(2).unwrap(), &OscValue::String("left".into()));
        assert_eq!(message.arg(4).unwrap(), &OscValue::Nil);
        assert!(matches!(
            message.arg(5),
            Err(Error::IndexOutOfRange { index: 5, len: 5, .. })
        ));
    }

    #[test]
    fn test_wire_types() {
        let message = Message::new("/n").with(7).with(1i64 << 40).with(0.25);
        let OscPacket::Message(wire) = message.to_packet() else {
            panic!("expected a message packet");
        };
        assert_eq!(
            wire.args,
            vec![OscType::Int(7), OscType::Long(1 << 40), OscType::Float(0.25)]
        );
    }

    #[test]
    fn test_encoded_message_decodes_to_same_values() {
        let message = Message::new("/seq/step").with(3).with("kick").with(true);
        let bytes = message.encode().unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&bytes).unwrap();
        let OscPacket::Message(wire) = packet else {
            panic!("expected a message packet");
        };
        assert_eq!(Message::from(wire), message);
    }
}
