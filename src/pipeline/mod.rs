//! Bins, pipelines and their supporting machinery.
//!
//! - [`Bin`]: an element containing other elements
//! - [`Pipeline`]: a top-level bin with its own state-change worker and
//!   event bus
//! - [`PipelineEvent`]: events posted by elements of a pipeline
//! - [`ElementFactory`]: creates elements by factory name
//!
//! # Example
//!
//! ```rust,ignore
//! use ghostline::prelude::*;
//!
//! let pipeline = Pipeline::new("pipeline")?;
//! let src = Element::new_source("src", FakeSrc::new().with_num_buffers(10));
//! let sink = Element::new_sink("sink", FakeSink::new());
//! pipeline.add_many(&[&src, &sink])?;
//! src.link(&sink)?;
//!
//! let mut bus = pipeline.bus();
//! pipeline.set_state(State::Playing)?;
//! bus.wait_eos().await?;
//! pipeline.set_state(State::Null)?;
//! ```

pub(crate) mod bin;
pub(crate) mod events;
pub(crate) mod executor;
pub mod factory;
mod graph;

pub use bin::Bin;
pub use events::{EventReceiver, EventSender, PipelineEvent};
pub use executor::PipelineConfig;
pub use factory::{ElementConstructor, ElementFactory};

use crate::element::Element;
use crate::element::handle::{ElementInner, ElementKind};
use crate::error::Result;
use crate::object::ObjectExt;
use bin::BinData;
use executor::StateExecutor;
use std::ops::Deref;
use std::sync::Arc;

/// Pipeline-only parts of an element.
pub(crate) struct PipelineData {
    pub(crate) executor: StateExecutor,
    pub(crate) events: EventSender,
    pub(crate) config: PipelineConfig,
}

/// A top-level bin.
///
/// A pipeline performs its state changes on a dedicated worker thread: a
/// synchronous [`set_state`](Element::set_state) hands the request over and
/// waits for the worker, [`set_state_async`](Element::set_state_async)
/// returns immediately. Events posted by any element inside the pipeline go
/// to its bus.
#[derive(Clone, PartialEq, Eq)]
pub struct Pipeline {
    bin: Bin,
}

impl Pipeline {
    /// Create a pipeline with the default configuration.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Self::with_config(name, PipelineConfig::default())
    }

    /// Create a pipeline.
    ///
    /// Fails if the worker thread cannot be spawned.
    pub fn with_config(name: impl Into<String>, config: PipelineConfig) -> Result<Self> {
        let data = PipelineData {
            executor: StateExecutor::new(),
            events: EventSender::new(config.event_capacity),
            config,
        };
        let inner = Arc::new(ElementInner::new(
            name,
            ElementKind::Bin(BinData::default()),
            Some(data),
        ));
        let element = Element::from_new_inner(inner);
        if let Some(data) = &element.inner.pipeline {
            data.executor.start(&element.inner, &data.config)?;
        }
        tracing::debug!(pipeline = %element.name(), "created pipeline");

        Ok(Self {
            bin: Bin::from_element(element),
        })
    }

    /// Wrap a handle known to be a pipeline.
    pub(crate) fn from_element(element: Element) -> Self {
        Self {
            bin: Bin::from_element(element),
        }
    }

    fn data(&self) -> &PipelineData {
        match &self.bin.inner.pipeline {
            Some(data) => data,
            None => unreachable!("pipeline handle around a plain element"),
        }
    }

    /// Subscribe to the pipeline's events from now on.
    pub fn bus(&self) -> EventReceiver {
        self.data().events.subscribe()
    }

    /// The configuration the pipeline was created with.
    pub fn config(&self) -> &PipelineConfig {
        &self.data().config
    }

    /// Convert into a plain element handle.
    pub fn upcast(self) -> Element {
        self.bin.upcast()
    }
}

impl Deref for Pipeline {
    type Target = Bin;

    fn deref(&self) -> &Bin {
        &self.bin
    }
}

impl AsRef<Element> for Pipeline {
    fn as_ref(&self) -> &Element {
        self.bin.as_element()
    }
}

impl From<Pipeline> for Element {
    fn from(pipeline: Pipeline) -> Element {
        pipeline.upcast()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name())
            .field("children", &self.child_count())
            .field("state", &self.current_state())
            .finish()
    }
}
