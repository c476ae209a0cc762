//! Identity element with callbacks for debugging.
//!
//! A pass-through element that allows inspection of buffers via callbacks.

use crate::buffer::Buffer;
use crate::caps::Caps;
use crate::element::{Output, Transform};
use crate::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Callback type for buffer inspection.
pub type BufferCallback = dyn Fn(&Buffer) + Send + Sync;

/// An identity element that passes buffers through unchanged while
/// optionally calling callbacks for inspection.
///
/// This is useful for debugging, logging, or metrics collection
/// without modifying the data flow.
///
/// # Example
///
/// ```rust,ignore
/// use ghostline::elements::Identity;
///
/// let identity = Identity::new()
///     .on_buffer(|buf| {
///         println!("Buffer: seq={}, len={}", buf.sequence(), buf.len());
///     });
/// ```
pub struct Identity {
    callback: Option<Arc<BufferCallback>>,
    /// Fail with an error once this many buffers went through.
    error_after: Option<u64>,
    caps: Caps,
    stats: Arc<IdentityStats>,
}

impl Identity {
    /// Create a new identity element.
    pub fn new() -> Self {
        Self {
            callback: None,
            error_after: None,
            caps: Caps::Any,
            stats: Arc::new(IdentityStats::default()),
        }
    }

    /// Set a callback to be called for each buffer.
    pub fn on_buffer<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Buffer) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Fail processing once `count` buffers have passed.
    pub fn error_after(mut self, count: u64) -> Self {
        self.error_after = Some(count);
        self
    }

    /// Restrict both pads to `caps`.
    pub fn with_caps(mut self, caps: Caps) -> Self {
        self.caps = caps;
        self
    }

    /// Shared counters; stay valid after the element is built.
    pub fn stats(&self) -> Arc<IdentityStats> {
        self.stats.clone()
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for Identity {
    fn transform(&mut self, buffer: Buffer) -> Result<Output> {
        if self
            .error_after
            .is_some_and(|limit| self.stats.buffer_count() >= limit)
        {
            return Err(Error::Element(format!(
                "identity: error after {} buffers",
                self.stats.buffer_count()
            )));
        }

        self.stats.count.fetch_add(1, Ordering::Relaxed);
        self.stats
            .bytes
            .fetch_add(buffer.len() as u64, Ordering::Relaxed);

        if let Some(ref cb) = self.callback {
            cb(&buffer);
        }

        Ok(Output::Single(buffer))
    }

    fn name(&self) -> &str {
        "identity"
    }

    fn input_caps(&self) -> Caps {
        self.caps.clone()
    }

    fn output_caps(&self) -> Caps {
        self.caps.clone()
    }
}

/// Statistics for Identity element.
#[derive(Debug, Default)]
pub struct IdentityStats {
    count: AtomicU64,
    bytes: AtomicU64,
}

impl IdentityStats {
    /// Number of buffers processed.
    pub fn buffer_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Total bytes processed.
    pub fn byte_count(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}
