//! Error types for ghostline.

use thiserror::Error;

/// Result type alias using ghostline's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for graph and state operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Two pads could not be linked.
    #[error("link failed: {0}")]
    Link(#[from] LinkError),

    /// `unlink` was called on pads that are not linked to each other.
    #[error("pads '{src}' and '{sink}' are not linked")]
    NotLinked {
        /// Name of the source pad.
        src: String,
        /// Name of the sink pad.
        sink: String,
    },

    /// A ghost pad has no target pad.
    #[error("ghost pad '{pad}' has no target")]
    NoTarget {
        /// Name of the ghost pad.
        pad: String,
    },

    /// A ghost-only operation was invoked on a regular pad.
    #[error("pad '{pad}' is not a ghost pad")]
    NotGhostPad {
        /// Name of the pad.
        pad: String,
    },

    /// The element has no pad with this name.
    #[error("element '{element}' has no pad named '{pad}'")]
    PadNotFound {
        /// Name of the element.
        element: String,
        /// The requested pad name.
        pad: String,
    },

    /// An element or pad is already parented elsewhere.
    #[error("'{object}' already has parent '{parent}'")]
    AlreadyHasParent {
        /// Name of the object being parented.
        object: String,
        /// Name of its current parent.
        parent: String,
    },

    /// The element is not a child of the bin.
    #[error("'{child}' is not a child of '{bin}'")]
    NotChild {
        /// Name of the element.
        child: String,
        /// Name of the bin.
        bin: String,
    },

    /// A sibling with the same name already exists.
    #[error("'{parent}' already contains an object named '{name}'")]
    DuplicateName {
        /// The clashing name.
        name: String,
        /// Name of the parent.
        parent: String,
    },

    /// The element is in the middle of a state change.
    #[error("element '{element}' is changing state")]
    StateChangeInProgress {
        /// Name of the element.
        element: String,
    },

    /// A state transition step failed.
    #[error(transparent)]
    StateChange(#[from] StateChangeError),

    /// A bounded state wait expired before the transition resolved.
    #[error("timed out waiting for '{element}' to reach {state:?}")]
    Timeout {
        /// Name of the element.
        element: String,
        /// The state that was waited for.
        state: crate::element::State,
    },

    /// Data flow failed.
    #[error("flow error: {0}")]
    Flow(#[from] FlowError),

    /// An element implementation reported an error.
    #[error("element error: {0}")]
    Element(String),

    /// No factory is registered under this name.
    #[error("no element factory named '{0}'")]
    UnknownFactory(String),

    /// I/O error (spawning threads).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a pad link is refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// One of the pads already has a peer.
    #[error("pad is already linked")]
    AlreadyLinked,
    /// Links must go from a source pad to a sink pad.
    #[error("pads have the wrong direction")]
    WrongDirection,
    /// The pads' capabilities do not intersect.
    #[error("pad capabilities are incompatible")]
    IncompatibleCaps,
    /// Element-level link found no suitable pad pair.
    #[error("no compatible unlinked pads")]
    NoCompatiblePads,
    /// A pad cannot be linked to itself.
    #[error("cannot link a pad to itself")]
    SamePad,
}

/// Errors returned while pushing data through pads.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowError {
    /// The pad has no peer.
    #[error("not linked")]
    NotLinked,
    /// The receiving pad is not active.
    #[error("flushing")]
    Flushing,
    /// The receiver does not accept more data.
    #[error("end of stream")]
    Eos,
    /// The receiving element failed.
    #[error("element error")]
    Error,
}

/// A state change step failed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[error("element failed to change its state")]
pub struct StateChangeError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_error_converts() {
        let err: Error = LinkError::WrongDirection.into();
        assert!(matches!(err, Error::Link(LinkError::WrongDirection)));
        assert_eq!(err.to_string(), "link failed: pads have the wrong direction");
    }

    #[test]
    fn test_state_change_error_is_transparent() {
        let err: Error = StateChangeError.into();
        assert_eq!(err.to_string(), "element failed to change its state");
    }
}
