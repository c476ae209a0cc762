//! Fake elements - FakeSrc and FakeSink.

use crate::buffer::Buffer;
use crate::caps::Caps;
use crate::element::{
    ElementContext, Sink, Source, StateChange, StateChangeError, StateChangeResult,
    StateChangeReturn, StateChangeSuccess,
};
use crate::error::Result;
use crate::metadata::Metadata;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A source that produces zero-filled buffers.
///
/// This is useful for:
/// - Testing state changes and data flow without real media
/// - Benchmarking pad throughput
/// - Simulating live sources (`live(true)` reports `NoPreroll`)
///
/// # Example
///
/// ```rust
/// use ghostline::elements::FakeSrc;
/// use ghostline::element::Source;
///
/// let mut source = FakeSrc::new().with_num_buffers(2);
/// assert!(source.produce().unwrap().is_some());
/// assert!(source.produce().unwrap().is_some());
/// assert!(source.produce().unwrap().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct FakeSrc {
    /// Stop after this many buffers; `None` streams forever.
    num_buffers: Option<u64>,
    /// Size of each buffer in bytes.
    buffer_size: usize,
    /// Pause between buffers.
    interval: Option<Duration>,
    live: bool,
    caps: Caps,
    /// Current sequence number.
    current: u64,
}

impl FakeSrc {
    /// Create an endless source of 64-byte buffers.
    pub fn new() -> Self {
        Self {
            num_buffers: None,
            buffer_size: 64,
            interval: None,
            live: false,
            caps: Caps::Any,
            current: 0,
        }
    }

    /// Stop with end-of-stream after `count` buffers.
    pub fn with_num_buffers(mut self, count: u64) -> Self {
        self.num_buffers = Some(count);
        self
    }

    /// Set the size of each buffer.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Sleep this long before producing each buffer.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Behave like a live source: no preroll in `Paused`.
    pub fn live(mut self, live: bool) -> Self {
        self.live = live;
        self
    }

    /// Set the caps of the source pad.
    pub fn with_caps(mut self, caps: Caps) -> Self {
        self.caps = caps;
        self
    }

    /// Number of buffers produced since the last preroll.
    pub fn produced(&self) -> u64 {
        self.current
    }
}

impl Default for FakeSrc {
    fn default() -> Self {
        Self::new()
    }
}

impl Source for FakeSrc {
    fn produce(&mut self) -> Result<Option<Buffer>> {
        if self.num_buffers.is_some_and(|max| self.current >= max) {
            return Ok(None);
        }
        if let Some(interval) = self.interval {
            std::thread::sleep(interval);
        }

        let buffer = Buffer::zeroed(self.buffer_size, Metadata::with_sequence(self.current));
        self.current += 1;
        Ok(Some(buffer))
    }

    fn name(&self) -> &str {
        "fakesrc"
    }

    fn output_caps(&self) -> Caps {
        self.caps.clone()
    }

    fn change_state(&mut self, _ctx: &ElementContext, transition: StateChange) -> StateChangeResult {
        match transition {
            StateChange::ReadyToPaused => {
                self.current = 0;
                Ok(self.preroll_result())
            }
            StateChange::PlayingToPaused => Ok(self.preroll_result()),
            _ => Ok(StateChangeSuccess::Success),
        }
    }
}

impl FakeSrc {
    fn preroll_result(&self) -> StateChangeSuccess {
        if self.live {
            StateChangeSuccess::NoPreroll
        } else {
            StateChangeSuccess::Success
        }
    }
}

/// Counters shared between a [`FakeSink`] and whoever observes it.
#[derive(Debug, Default)]
pub struct SinkStats {
    buffers: AtomicU64,
    bytes: AtomicU64,
    last_sequence: AtomicU64,
}

impl SinkStats {
    /// Number of buffers consumed.
    pub fn buffer_count(&self) -> u64 {
        self.buffers.load(Ordering::Acquire)
    }

    /// Total bytes consumed.
    pub fn byte_count(&self) -> u64 {
        self.bytes.load(Ordering::Acquire)
    }

    /// Sequence number of the last buffer consumed.
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::Acquire)
    }
}

/// A sink that counts and discards buffers.
///
/// With a preroll delay the sink completes `Ready -> Paused` asynchronously,
/// the way a real sink waits for its first buffer; `fail_on` makes a chosen
/// step fail.
///
/// # Example
///
/// ```rust
/// use ghostline::elements::FakeSink;
/// use ghostline::element::Sink;
/// use ghostline::Buffer;
///
/// let mut sink = FakeSink::new();
/// let stats = sink.stats();
/// sink.consume(Buffer::empty(0)).unwrap();
/// assert_eq!(stats.buffer_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct FakeSink {
    caps: Caps,
    preroll_delay: Option<Duration>,
    fail_on: Option<StateChange>,
    stats: Arc<SinkStats>,
}

impl FakeSink {
    /// Create a sink accepting anything.
    pub fn new() -> Self {
        Self {
            caps: Caps::Any,
            preroll_delay: None,
            fail_on: None,
            stats: Arc::new(SinkStats::default()),
        }
    }

    /// Set the caps of the sink pad.
    pub fn with_caps(mut self, caps: Caps) -> Self {
        self.caps = caps;
        self
    }

    /// Complete `Ready -> Paused` asynchronously after `delay`.
    pub fn with_preroll_delay(mut self, delay: Duration) -> Self {
        self.preroll_delay = Some(delay);
        self
    }

    /// Fail the given step.
    pub fn fail_on(mut self, transition: StateChange) -> Self {
        self.fail_on = Some(transition);
        self
    }

    /// Shared counters; stays valid after the sink is moved into an element.
    pub fn stats(&self) -> Arc<SinkStats> {
        self.stats.clone()
    }
}

impl Default for FakeSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for FakeSink {
    fn consume(&mut self, buffer: Buffer) -> Result<()> {
        self.stats.buffers.fetch_add(1, Ordering::AcqRel);
        self.stats
            .bytes
            .fetch_add(buffer.len() as u64, Ordering::AcqRel);
        self.stats
            .last_sequence
            .store(buffer.sequence(), Ordering::Release);
        Ok(())
    }

    fn name(&self) -> &str {
        "fakesink"
    }

    fn input_caps(&self) -> Caps {
        self.caps.clone()
    }

    fn change_state(&mut self, ctx: &ElementContext, transition: StateChange) -> StateChangeResult {
        if self.fail_on == Some(transition) {
            tracing::error!(element = %ctx.name(), ?transition, "failing state change on request");
            return Err(StateChangeError);
        }

        let (StateChange::ReadyToPaused, Some(delay)) = (transition, self.preroll_delay) else {
            return Ok(StateChangeSuccess::Success);
        };

        let committer = ctx.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("{}-preroll", ctx.name()))
            .spawn(move || {
                std::thread::sleep(delay);
                committer.commit_state(StateChangeReturn::Success);
            });
        match spawned {
            Ok(_) => Ok(StateChangeSuccess::Async),
            Err(err) => {
                tracing::error!(element = %ctx.name(), %err, "cannot spawn preroll thread");
                Err(StateChangeError)
            }
        }
    }
}
