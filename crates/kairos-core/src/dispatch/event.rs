/// Payload delivered to a script handler.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// A tracker detected a beat at this tempo.
    Beat { bpm: f64 },
    /// A count-in pulse was accepted; `count` is 1..=4.
    Count { count: u32 },
    /// The count-in timed out and went back to waiting for a first pulse.
    CountInAbandoned,
    /// The silence watchdog stopped the transport and relocated it to zero.
    SilenceStop,
    /// An incoming OSC message.
    Message { path: String, args: Vec<OscValue> },
}

/// OSC argument as seen by script handlers.
#[derive(Debug, Clone, PartialEq)]
pub enum OscValue {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Nil,
}

impl From<i32> for OscValue {
    fn from(value: i32) -> Self {
        OscValue::Int(value.into())
    }
}

impl From<i64> for OscValue {
    fn from(value: i64) -> Self {
        OscValue::Int(value)
    }
}

impl From<f32> for OscValue {
    fn from(value: f32) -> Self {
        OscValue::Float(value.into())
    }
}

impl From<f64> for OscValue {
    fn from(value: f64) -> Self {
        OscValue::Float(value)
    }
}

impl From<&str> for OscValue {
    fn from(value: &str) -> Self {
        OscValue::String(value.to_string())
    }
}

impl From<String> for OscValue {
    fn from(value: String) -> Self {
        OscValue::String(value)
    }
}

impl From<bool> for OscValue {
    fn from(value: bool) -> Self {
        OscValue::Bool(value)
    }
}

impl From<()> for OscValue {
    fn from(_: ()) -> Self {
        OscValue::Nil
    }
}
