//! Built-in elements.
//!
//! These are small elements for exercising graphs without real media:
//!
//! ## Sources
//! - [`FakeSrc`]: Produces zero-filled buffers, optionally live or rate-limited
//!
//! ## Sinks
//! - [`FakeSink`]: Counts and discards buffers; can preroll asynchronously or
//!   fail a chosen state change
//!
//! ## Transforms
//! - [`Identity`]: Passes buffers unchanged, with an inspection callback

mod fake;
mod identity;

pub use fake::{FakeSink, FakeSrc, SinkStats};
pub use identity::{BufferCallback, Identity, IdentityStats};
