//! # Ghostline
//!
//! The graph core of a media pipeline: elements connected through pads,
//! grouped into bins, driven through a four-state lifecycle.
//!
//! ## Features
//!
//! - **Pads and ghost pads**: point-to-point links with caps checks; ghost
//!   pads expose a child's pad on a bin's boundary
//! - **Bins and pipelines**: containers that own their children and propagate
//!   state changes in data-flow order
//! - **Asynchronous state changes**: steps may complete later; requests can be
//!   retargeted while in flight; `get_state` waits with a timeout
//! - **Buffer probes**: callbacks on the data path that can drop buffers or
//!   remove themselves
//! - **Explicit ownership counts**: observable, deterministic teardown
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ghostline::prelude::*;
//!
//! let pipeline = Pipeline::new("pipeline")?;
//! let src = Element::new_source("src", FakeSrc::new().with_num_buffers(100));
//! let sink = Element::new_sink("sink", FakeSink::new());
//! pipeline.add_many(&[&src, &sink])?;
//! src.link(&sink)?;
//!
//! pipeline.set_state(State::Playing)?;
//! let (result, state, _) = pipeline.get_state(None);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod caps;
pub mod element;
pub mod elements;
pub mod error;
pub mod metadata;
pub mod object;
pub mod pipeline;
pub mod probe;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::buffer::Buffer;
    pub use crate::caps::Caps;
    pub use crate::element::{
        Element, ElementContext, GhostPad, Output, Pad, PadDirection, Sink, Source, State,
        StateChange, StateChangeError, StateChangeReturn, StateChangeSuccess, Transform,
        WeakElement,
    };
    pub use crate::elements::{FakeSink, FakeSrc, Identity};
    pub use crate::error::{Error, Result};
    pub use crate::metadata::Metadata;
    pub use crate::object::ObjectExt;
    pub use crate::pipeline::{Bin, ElementFactory, Pipeline, PipelineConfig, PipelineEvent};
    pub use crate::probe::{ProbeId, ProbeReturn};
}

pub use buffer::Buffer;
pub use element::{Element, GhostPad, Pad, State};
pub use error::{Error, Result};
pub use pipeline::{Bin, Pipeline};
