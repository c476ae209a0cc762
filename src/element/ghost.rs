//! Ghost pads: proxies that expose an internal pad on a bin's boundary.

use crate::element::pad::{Pad, PadDirection};
use crate::error::Result;
use crate::object::ObjectExt;
use std::ops::Deref;

/// A pad that forwards to another pad.
///
/// A ghost pad never carries a link of its own. Linking, unlinking, peer
/// queries and probes all operate on the target, following chains of ghost
/// pads down to a concrete pad. The target is not owned: if it goes away the
/// ghost pad is left without a target and operations through it fail with
/// [`Error::NoTarget`](crate::Error::NoTarget).
///
/// ```rust,ignore
/// let sink = Element::new_sink("sink", FakeSink::new());
/// let bin = Bin::new("sinkbin");
/// bin.add(&sink)?;
/// let ghost = GhostPad::with_target("sink", &sink.static_pad("sink").unwrap())?;
/// bin.add_pad(&ghost)?;
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct GhostPad(Pad);

impl GhostPad {
    /// Create a ghost pad targeting `target`, with the target's direction.
    pub fn with_target(name: impl Into<String>, target: &Pad) -> Result<Self> {
        let ghost = Self(Pad::new_ghost(name, target.direction()));
        ghost.0.set_ghost_target(Some(target))?;
        Ok(ghost)
    }

    /// Create a ghost pad without a target.
    pub fn new_no_target(name: impl Into<String>, direction: PadDirection) -> Self {
        Self(Pad::new_ghost(name, direction))
    }

    /// The current target.
    pub fn target(&self) -> Option<Pad> {
        self.0.ghost_target().ok()
    }

    /// Retarget the ghost pad.
    ///
    /// Links made through the ghost pad live on the old target and are not
    /// moved.
    pub fn set_target(&self, target: &Pad) -> Result<()> {
        self.0.set_ghost_target(Some(target))
    }

    /// Remove the target.
    pub fn clear_target(&self) {
        // Clearing cannot fail on a ghost pad.
        let _ = self.0.set_ghost_target(None);
        tracing::debug!(ghost = %self.0.name(), "ghost pad target cleared");
    }

    /// Downcast a pad handle, handing it back if it is not a ghost pad.
    pub fn from_pad(pad: Pad) -> std::result::Result<Self, Pad> {
        if pad.is_ghost() { Ok(Self(pad)) } else { Err(pad) }
    }

    /// The underlying pad handle.
    pub fn upcast(self) -> Pad {
        self.0
    }
}

impl Deref for GhostPad {
    type Target = Pad;

    fn deref(&self) -> &Pad {
        &self.0
    }
}

impl AsRef<Pad> for GhostPad {
    fn as_ref(&self) -> &Pad {
        &self.0
    }
}

impl From<GhostPad> for Pad {
    fn from(ghost: GhostPad) -> Pad {
        ghost.0
    }
}

impl std::fmt::Debug for GhostPad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GhostPad")
            .field("name", &self.0.name())
            .field("direction", &self.0.direction())
            .field("target", &self.target().map(|t| t.name().to_string()))
            .finish()
    }
}
