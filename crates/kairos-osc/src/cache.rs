use std::fmt;
use std::sync::Arc;

use kairos_core::{CacheRunner, Dispatcher, Error, ObjectCache, ProcessorCache, Result};

use crate::input::OscInput;
use crate::output::OscOutput;

/// Transport an [`OscInput`] listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OscProtocol {
    #[default]
    Udp,
}

impl OscProtocol {
    /// Parse a script-supplied protocol name. `None` means UDP.
    pub fn parse(name: Option<&str>) -> Result<Self> {
        match name {
            None => Ok(Self::Udp),
            Some(name) if name.eq_ignore_ascii_case("udp") => Ok(Self::Udp),
            Some(_) => Err(Error::Unsupported("OSC protocol not yet implemented".into())),
        }
    }
}

/// Identifies an OSC input: the requested port and protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OscInputKey {
    pub port: u16,
    pub protocol: OscProtocol,
}

impl OscInputKey {
    pub fn new(port: u16, protocol: Option<&str>) -> Result<Self> {
        Ok(Self {
            port,
            protocol: OscProtocol::parse(protocol)?,
        })
    }
}

impl fmt::Display for OscInputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} port {}", self.protocol, self.port)
    }
}

/// OSC inputs, one per key.
pub struct OscInputCache {
    dispatcher: Dispatcher,
    inputs: ProcessorCache<OscInputKey, OscInput>,
}

impl OscInputCache {
    pub fn new(dispatcher: Dispatcher, capacity: usize) -> (Self, CacheRunner<OscInput>) {
        let (inputs, runner) = ProcessorCache::new("osc input", capacity);
        (Self { dispatcher, inputs }, runner)
    }

    /// Get the input for `port`, binding it on first use.
    pub fn osc_input(&mut self, port: u16, protocol: Option<&str>) -> Result<Arc<OscInput>> {
        let key = OscInputKey::new(port, protocol)?;
        if let Some(input) = self.inputs.find_object(&key) {
            return Ok(input);
        }
        let input = Arc::new(OscInput::bind(key.port, self.dispatcher.clone())?);
        self.inputs.register_object(key, input.clone())?;
        Ok(input)
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

impl ObjectCache for OscInputCache {
    fn script_complete(&mut self) -> bool {
        self.inputs.script_complete()
    }
}

/// Identifies an OSC output: the destination as given by the script.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OscOutputKey {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for OscOutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// OSC outputs, one per destination.
pub struct OscOutputCache {
    outputs: ProcessorCache<OscOutputKey, OscOutput>,
    schedule_capacity: usize,
}

impl OscOutputCache {
    pub fn new(capacity: usize, schedule_capacity: usize) -> (Self, CacheRunner<OscOutput>) {
        let (outputs, runner) = ProcessorCache::new("osc output", capacity);
        (
            Self {
                outputs,
                schedule_capacity,
            },
            runner,
        )
    }

    /// Get the output sending to `host:port`, resolving it on first use.
    pub fn osc_output(&mut self, host: &str, port: u16) -> Result<Arc<OscOutput>> {
        let key = OscOutputKey {
            host: host.to_string(),
            port,
        };
        if let Some(output) = self.outputs.find_object(&key) {
            return Ok(output);
        }
        let output = Arc::new(OscOutput::connect(host, port, self.schedule_capacity)?);
        self.outputs.register_object(key, output.clone())?;
        Ok(output)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

impl ObjectCache for OscOutputCache {
    fn script_complete(&mut self) -> bool {
        self.outputs.script_complete()
    }
}
