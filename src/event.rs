use std::fmt;

/// Acknowledgment sent back to the server after every handled frame.
pub const ACK: &str = "k";

/// Number of bytes a frame must carry to be decoded.
pub const FRAME_LEN: usize = 2;

/// An event decoded from a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Beat,
    Onset,
    /// Current tempo estimate, in beats per minute.
    Tempo(i16),
}

impl EventKind {
    /// Classify a decoded frame value. 0 is a beat, 1 an onset, anything else a tempo reading.
    pub fn from_value(value: i16) -> Self {
        match value {
            0 => EventKind::Beat,
            1 => EventKind::Onset,
            bpm => EventKind::Tempo(bpm),
        }
    }

    /// Decode a frame. Only the first two bytes are read, as a big-endian signed integer.
    pub fn decode(payload: &[u8]) -> Result<Self, FrameError> {
        match payload {
            [hi, lo, ..] => Ok(Self::from_value(i16::from_be_bytes([*hi, *lo]))),
            _ => Err(FrameError::TooShort(payload.len())),
        }
    }

    /// Tempo reading for a floating point estimate, rounded and saturated to the wire range.
    ///
    /// Estimates that round to 0 or 1 cannot be told apart from a beat or an onset on the wire.
    pub fn from_bpm(bpm: f64) -> Self {
        // `as` saturates on overflow and maps NaN to 0
        EventKind::Tempo(bpm.round() as i16)
    }

    /// The wire value of this event.
    pub fn value(self) -> i16 {
        match self {
            EventKind::Beat => 0,
            EventKind::Onset => 1,
            EventKind::Tempo(bpm) => bpm,
        }
    }

    /// Encode the event the way the server frames it.
    pub fn encode(self) -> [u8; FRAME_LEN] {
        self.value().to_be_bytes()
    }
}

/// A frame that could not be decoded into an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Binary payload shorter than two bytes, carries the received length.
    TooShort(usize),
    /// Text payload where a binary one was expected.
    NotBinary,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort(len) => write!(f, "frame of {len} byte(s), expected at least {FRAME_LEN}"),
            Self::NotBinary => write!(f, "text frame, expected binary"),
        }
    }
}

impl std::error::Error for FrameError {}
