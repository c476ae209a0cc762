//! Elements, pads and the state machine.
//!
//! Element behavior is written against three traits:
//!
//! - [`Source`]: Produces buffers on a streaming thread while `Playing`
//! - [`Sink`]: Consumes buffers
//! - [`Transform`]: Turns one buffer into zero or more
//!
//! [`Element`] wraps an implementation, creates its pads from templates and
//! drives it through [`State`] changes. Elements are linked through their
//! [`Pad`]s; [`GhostPad`]s expose pads of a bin's children on the bin.
//!
//! # Example
//!
//! ```rust,ignore
//! use ghostline::element::{Element, Output, Transform};
//! use ghostline::Buffer;
//!
//! struct MyFilter;
//!
//! impl Transform for MyFilter {
//!     fn transform(&mut self, buffer: Buffer) -> Result<Output> {
//!         Ok(Output::from(buffer))
//!     }
//! }
//!
//! let filter = Element::new_transform("filter", MyFilter);
//! ```

mod context;
mod ghost;
pub(crate) mod handle;
pub(crate) mod pad;
pub(crate) mod state;
mod task;
mod traits;

pub use context::ElementContext;
pub use ghost::GhostPad;
pub use handle::{Element, WeakElement};
pub use pad::{Pad, PadDirection, PadPresence, PadTemplate};
pub use state::{
    State, StateChange, StateChangeError, StateChangeResult, StateChangeReturn,
    StateChangeSuccess,
};
pub use traits::{
    ElementDyn, ElementType, Output, Sink, SinkAdapter, Source, SourceAdapter, Transform,
    TransformAdapter,
};
