//! Buffer metadata types.

use std::time::Duration;

/// Flags indicating buffer properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferFlags {
    /// Buffer follows a discontinuity in the stream.
    pub discont: bool,
    /// Buffer is a gap marker and carries no meaningful payload.
    pub gap: bool,
    /// Buffer is the last one its source will produce.
    pub last: bool,
}

/// Metadata attached to every buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Sequence number assigned by the producing element.
    pub sequence: u64,
    /// Presentation timestamp.
    pub pts: Option<Duration>,
    /// Duration of the data.
    pub duration: Option<Duration>,
    /// Buffer flags.
    pub flags: BufferFlags,
}

impl Metadata {
    /// Create metadata with just a sequence number.
    pub fn with_sequence(sequence: u64) -> Self {
        Self {
            sequence,
            ..Default::default()
        }
    }

    /// Set the presentation timestamp.
    pub fn pts(mut self, pts: Duration) -> Self {
        self.pts = Some(pts);
        self
    }

    /// Set the duration.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}
