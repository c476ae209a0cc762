//! Core element traits.
//!
//! Element behavior is written against one of three small traits:
//! [`Source`], [`Sink`] or [`Transform`]. [`Element`](crate::Element) wraps the
//! implementation, gives it pads from its templates and drives it through
//! state changes.

use crate::buffer::Buffer;
use crate::caps::Caps;
use crate::element::context::ElementContext;
use crate::element::pad::PadTemplate;
use crate::element::state::{StateChange, StateChangeResult, StateChangeSuccess};
use crate::error::Result;

// ============================================================================
// Output Type
// ============================================================================

/// Output of a transform.
///
/// - `None`: the buffer was filtered out
/// - `Single`: one output buffer
/// - `Multiple`: several buffers, pushed downstream in order
#[derive(Debug, Default)]
pub enum Output {
    /// No output (buffer was filtered/consumed).
    #[default]
    None,
    /// Single output buffer.
    Single(Buffer),
    /// Multiple output buffers.
    Multiple(Vec<Buffer>),
}

impl Output {
    /// Number of output buffers.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Single(_) => 1,
            Self::Multiple(v) => v.len(),
        }
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert to a Vec of buffers.
    pub fn into_vec(self) -> Vec<Buffer> {
        match self {
            Self::None => vec![],
            Self::Single(b) => vec![b],
            Self::Multiple(v) => v,
        }
    }
}

impl From<Buffer> for Output {
    fn from(buffer: Buffer) -> Self {
        Self::Single(buffer)
    }
}

impl From<Option<Buffer>> for Output {
    fn from(buffer: Option<Buffer>) -> Self {
        buffer.map_or(Self::None, Self::Single)
    }
}

impl From<Vec<Buffer>> for Output {
    fn from(buffers: Vec<Buffer>) -> Self {
        match buffers.len() {
            0 => Self::None,
            _ => Self::Multiple(buffers),
        }
    }
}

// ============================================================================
// Source Trait
// ============================================================================

/// A source element that produces buffers.
///
/// While the element is `Playing`, a streaming thread calls `produce()` in a
/// loop and pushes every buffer out of the `src` pad.
///
/// - Return `Ok(Some(buffer))` to emit a buffer
/// - Return `Ok(None)` to signal end-of-stream
/// - Return `Err(...)` to stop streaming with an error
///
/// # Example
///
/// ```rust,ignore
/// struct CounterSource {
///     count: u64,
///     max: u64,
/// }
///
/// impl Source for CounterSource {
///     fn produce(&mut self) -> Result<Option<Buffer>> {
///         if self.count >= self.max {
///             return Ok(None);
///         }
///         let buffer = Buffer::new(
///             self.count.to_le_bytes().to_vec(),
///             Metadata::with_sequence(self.count),
///         );
///         self.count += 1;
///         Ok(Some(buffer))
///     }
/// }
/// ```
pub trait Source: Send {
    /// Produce the next buffer.
    fn produce(&mut self) -> Result<Option<Buffer>>;

    /// Get the name of this source (for debugging/logging).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Get the output caps (what formats this source produces).
    fn output_caps(&self) -> Caps {
        Caps::Any
    }

    /// Hook run on every state step. Return `Async` and commit through the
    /// context to complete the step later.
    fn change_state(&mut self, ctx: &ElementContext, transition: StateChange) -> StateChangeResult {
        let _ = (ctx, transition);
        Ok(StateChangeSuccess::Success)
    }
}

/// A sink element that consumes buffers.
///
/// `consume()` runs on the thread that pushed the buffer.
pub trait Sink: Send {
    /// Consume a buffer.
    fn consume(&mut self, buffer: Buffer) -> Result<()>;

    /// Get the name of this sink (for debugging/logging).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Get the input caps (what formats this sink accepts).
    fn input_caps(&self) -> Caps {
        Caps::Any
    }

    /// Hook run on every state step.
    fn change_state(&mut self, ctx: &ElementContext, transition: StateChange) -> StateChangeResult {
        let _ = (ctx, transition);
        Ok(StateChangeSuccess::Success)
    }
}

/// A transform element: one buffer in, zero or more buffers out.
pub trait Transform: Send {
    /// Transform a buffer.
    fn transform(&mut self, buffer: Buffer) -> Result<Output>;

    /// Get the name of this transform (for debugging/logging).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Get the input caps.
    fn input_caps(&self) -> Caps {
        Caps::Any
    }

    /// Get the output caps.
    fn output_caps(&self) -> Caps {
        Caps::Any
    }

    /// Hook run on every state step.
    fn change_state(&mut self, ctx: &ElementContext, transition: StateChange) -> StateChangeResult {
        let _ = (ctx, transition);
        Ok(StateChangeSuccess::Success)
    }
}

// ============================================================================
// Dynamic Element (Type-Erased)
// ============================================================================

/// Dynamic (type-erased) element trait.
///
/// Used internally to drive all implementations uniformly. Most users should
/// implement [`Source`], [`Sink`] or [`Transform`] instead.
pub trait ElementDyn: Send {
    /// Name of the implementation (for logging).
    fn name(&self) -> &str;

    /// Get the element's type (source, sink, or transform).
    fn element_type(&self) -> ElementType;

    /// Produce a buffer (sources only).
    fn produce(&mut self) -> Result<Option<Buffer>> {
        Ok(None)
    }

    /// Handle a buffer arriving on the sink pad.
    fn process(&mut self, input: Buffer) -> Result<Output>;

    /// Run the state hook.
    fn change_state(&mut self, ctx: &ElementContext, transition: StateChange) -> StateChangeResult;

    /// Get the input caps.
    fn input_caps(&self) -> Caps {
        Caps::Any
    }

    /// Get the output caps.
    fn output_caps(&self) -> Caps {
        Caps::Any
    }

    /// Templates for the always-present pads.
    fn pad_templates(&self) -> Vec<PadTemplate> {
        let mut templates = Vec::with_capacity(2);
        if self.element_type() != ElementType::Source {
            templates.push(PadTemplate::sink("sink", self.input_caps()));
        }
        if self.element_type() != ElementType::Sink {
            templates.push(PadTemplate::src("src", self.output_caps()));
        }
        templates
    }
}

/// The type of an element in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// A source element (produces buffers).
    Source,
    /// A sink element (consumes buffers).
    Sink,
    /// A transform element (transforms buffers).
    Transform,
}

// ============================================================================
// Adapters
// ============================================================================

/// Wrapper to adapt a [`Source`] to [`ElementDyn`].
pub struct SourceAdapter<S: Source> {
    inner: S,
}

impl<S: Source> SourceAdapter<S> {
    /// Create a new source adapter.
    pub fn new(source: S) -> Self {
        Self { inner: source }
    }
}

impl<S: Source + 'static> ElementDyn for SourceAdapter<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn element_type(&self) -> ElementType {
        ElementType::Source
    }

    fn produce(&mut self) -> Result<Option<Buffer>> {
        self.inner.produce()
    }

    fn process(&mut self, _input: Buffer) -> Result<Output> {
        Ok(Output::None)
    }

    fn change_state(&mut self, ctx: &ElementContext, transition: StateChange) -> StateChangeResult {
        self.inner.change_state(ctx, transition)
    }

    fn output_caps(&self) -> Caps {
        self.inner.output_caps()
    }
}

/// Wrapper to adapt a [`Sink`] to [`ElementDyn`].
pub struct SinkAdapter<S: Sink> {
    inner: S,
}

impl<S: Sink> SinkAdapter<S> {
    /// Create a new sink adapter.
    pub fn new(sink: S) -> Self {
        Self { inner: sink }
    }
}

impl<S: Sink + 'static> ElementDyn for SinkAdapter<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn element_type(&self) -> ElementType {
        ElementType::Sink
    }

    fn process(&mut self, input: Buffer) -> Result<Output> {
        self.inner.consume(input)?;
        Ok(Output::None)
    }

    fn change_state(&mut self, ctx: &ElementContext, transition: StateChange) -> StateChangeResult {
        self.inner.change_state(ctx, transition)
    }

    fn input_caps(&self) -> Caps {
        self.inner.input_caps()
    }
}

/// Wrapper to adapt a [`Transform`] to [`ElementDyn`].
pub struct TransformAdapter<T: Transform> {
    inner: T,
}

impl<T: Transform> TransformAdapter<T> {
    /// Create a new transform adapter.
    pub fn new(transform: T) -> Self {
        Self { inner: transform }
    }
}

impl<T: Transform + 'static> ElementDyn for TransformAdapter<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn element_type(&self) -> ElementType {
        ElementType::Transform
    }

    fn process(&mut self, input: Buffer) -> Result<Output> {
        self.inner.transform(input)
    }

    fn change_state(&mut self, ctx: &ElementContext, transition: StateChange) -> StateChangeResult {
        self.inner.change_state(ctx, transition)
    }

    fn input_caps(&self) -> Caps {
        self.inner.input_caps()
    }

    fn output_caps(&self) -> Caps {
        self.inner.output_caps()
    }
}
