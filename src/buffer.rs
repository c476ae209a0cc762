//! Opaque data units passed between pads.

use crate::metadata::Metadata;
use bytes::Bytes;

/// A unit of data flowing through the graph.
///
/// The payload is reference counted, so cloning a buffer is cheap and never
/// copies the bytes.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    data: Bytes,
    metadata: Metadata,
}

impl Buffer {
    /// Create a buffer from a payload and metadata.
    pub fn new(data: impl Into<Bytes>, metadata: Metadata) -> Self {
        Self {
            data: data.into(),
            metadata,
        }
    }

    /// Create a zero-filled buffer of `len` bytes.
    pub fn zeroed(len: usize, metadata: Metadata) -> Self {
        Self::new(vec![0u8; len], metadata)
    }

    /// Create an empty buffer with the given sequence number.
    pub fn empty(sequence: u64) -> Self {
        Self::new(Bytes::new(), Metadata::with_sequence(sequence))
    }

    /// The payload.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// The payload as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Buffer metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Mutable buffer metadata.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Sequence number shortcut.
    pub fn sequence(&self) -> u64 {
        self.metadata.sequence
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.data.len())
            .field("sequence", &self.metadata.sequence)
            .field("pts", &self.metadata.pts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_buffer_clone_shares_payload() {
        let buffer = Buffer::new(
            vec![1u8, 2, 3],
            Metadata::with_sequence(7).pts(Duration::from_millis(40)),
        );
        let clone = buffer.clone();

        assert_eq!(clone.as_slice().as_ptr(), buffer.as_slice().as_ptr());
        assert_eq!(clone.sequence(), 7);
        assert_eq!(clone.metadata().pts, Some(Duration::from_millis(40)));
    }

    #[test]
    fn test_zeroed_buffer() {
        let buffer = Buffer::zeroed(16, Metadata::default());
        assert_eq!(buffer.len(), 16);
        assert!(buffer.as_slice().iter().all(|b| *b == 0));
        assert!(Buffer::empty(0).is_empty());
    }
}
