//! RT-safe MIDI event with a frame offset inside the current block.

pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const POLY_PRESSURE: u8 = 0xA0;
pub const CONTROL_CHANGE: u8 = 0xB0;
pub const PROGRAM_CHANGE: u8 = 0xC0;
pub const CHANNEL_PRESSURE: u8 = 0xD0;
pub const PITCH_BEND: u8 = 0xE0;

/// A short (three byte) channel message.
///
/// Packs into a single `u64` so connections can store events in atomics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiEvent {
    /// Offset within the current block (0 = first frame).
    pub frame_offset: u32,
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl MidiEvent {
    #[inline]
    pub fn new(frame_offset: u32, status: u8, data1: u8, data2: u8) -> Self {
        Self {
            frame_offset,
            status,
            data1: data1 & 0x7F,
            data2: data2 & 0x7F,
        }
    }

    #[inline]
    pub fn note_on(frame_offset: u32, channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(frame_offset, NOTE_ON | (channel & 0x0F), note, velocity)
    }

    #[inline]
    pub fn note_off(frame_offset: u32, channel: u8, note: u8) -> Self {
        Self::new(frame_offset, NOTE_OFF | (channel & 0x0F), note, 0)
    }

    #[inline]
    pub fn control_change(frame_offset: u32, channel: u8, control: u8, value: u8) -> Self {
        Self::new(frame_offset, CONTROL_CHANGE | (channel & 0x0F), control, value)
    }

    /// Message type with the channel masked off.
    #[inline]
    pub fn kind(&self) -> u8 {
        self.status & 0xF0
    }

    #[inline]
    pub fn channel(&self) -> u8 {
        self.status & 0x0F
    }

    #[inline]
    pub fn note(&self) -> u8 {
        self.data1
    }

    #[inline]
    pub fn velocity(&self) -> u8 {
        self.data2
    }

    /// Note-on with non-zero velocity. A zero-velocity note-on is a note-off.
    #[inline]
    pub fn is_note_on(&self) -> bool {
        self.kind() == NOTE_ON && self.data2 > 0
    }

    #[inline]
    pub fn is_note_off(&self) -> bool {
        self.kind() == NOTE_OFF || (self.kind() == NOTE_ON && self.data2 == 0)
    }

    #[inline]
    pub fn with_offset(self, frame_offset: u32) -> Self {
        Self {
            frame_offset,
            ..self
        }
    }

    #[inline]
    pub fn pack(&self) -> u64 {
        (self.frame_offset as u64) << 32
            | (self.status as u64) << 16
            | (self.data1 as u64) << 8
            | self.data2 as u64
    }

    #[inline]
    pub fn unpack(word: u64) -> Self {
        Self {
            frame_offset: (word >> 32) as u32,
            status: (word >> 16) as u8,
            data1: (word >> 8) as u8 & 0x7F,
            data2: word as u8 & 0x7F,
        }
    }
}
