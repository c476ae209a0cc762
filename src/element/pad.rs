//! Pad abstraction for element inputs and outputs.
//!
//! Pads are the connection points of elements. A source pad is linked to at
//! most one sink pad and pushes buffers into it; the link is recorded on both
//! sides. Ghost pads (see [`GhostPad`](super::GhostPad)) are pads without a
//! link of their own: every link, query and probe operation on them is
//! forwarded to the pad they target, which lets a bin expose an internal pad on
//! its boundary.

use crate::buffer::Buffer;
use crate::caps::Caps;
use crate::element::handle::Element;
use crate::error::{Error, FlowError, LinkError, Result};
use crate::object::{ObjectCore, ObjectExt, graph_lock, lock};
use crate::probe::{ProbeId, ProbeList, ProbeReturn, ProbeVerdict};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Ghost pads nested deeper than this are treated as dangling.
const MAX_GHOST_DEPTH: usize = 32;

/// Direction of a pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadDirection {
    /// A source pad (sends buffers downstream).
    Src,
    /// A sink pad (receives buffers from upstream).
    Sink,
}

/// Template for creating pads.
///
/// Pad templates define the characteristics of pads that an element can have.
#[derive(Debug, Clone)]
pub struct PadTemplate {
    /// Name pattern for this pad (e.g., "src", "sink", "src_%u").
    pub name: String,
    /// Direction of this pad.
    pub direction: PadDirection,
    /// Whether this pad is always present or created on demand.
    pub presence: PadPresence,
    /// Capabilities of pads created from this template.
    pub caps: Caps,
}

/// Whether a pad is always present or created dynamically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadPresence {
    /// Pad is always present on the element.
    Always,
    /// Pad is created on demand (e.g., for demuxers).
    Sometimes,
    /// Pad is created when requested.
    Request,
}

impl PadTemplate {
    /// Create a new pad template.
    pub fn new(
        name: impl Into<String>,
        direction: PadDirection,
        presence: PadPresence,
        caps: Caps,
    ) -> Self {
        Self {
            name: name.into(),
            direction,
            presence,
            caps,
        }
    }

    /// Create a template for an always-present sink pad.
    pub fn sink(name: impl Into<String>, caps: Caps) -> Self {
        Self::new(name, PadDirection::Sink, PadPresence::Always, caps)
    }

    /// Create a template for an always-present source pad.
    pub fn src(name: impl Into<String>, caps: Caps) -> Self {
        Self::new(name, PadDirection::Src, PadPresence::Always, caps)
    }
}

pub(crate) struct PadInner {
    pub(crate) core: ObjectCore,
    direction: PadDirection,
    caps: Caps,
    template: Option<Arc<PadTemplate>>,
    peer: Mutex<Weak<PadInner>>,
    /// `Some` for ghost pads; holds the (non-owning) target.
    ghost: Option<Mutex<Weak<PadInner>>>,
    active: AtomicBool,
    pub(crate) probes: ProbeList,
}

impl PadInner {
    pub(crate) fn peer(&self) -> Option<Arc<PadInner>> {
        lock(&self.peer).upgrade()
    }

    /// The concrete pad behind a chain of ghost pads.
    pub(crate) fn resolved(self: &Arc<Self>) -> Option<Arc<PadInner>> {
        let mut current = self.clone();
        for _ in 0..MAX_GHOST_DEPTH {
            if current.ghost.is_none() {
                return Some(current);
            }
            current = current.ghost_target()?;
        }
        None
    }

    pub(crate) fn is_ghost(&self) -> bool {
        self.ghost.is_some()
    }

    pub(crate) fn direction(&self) -> PadDirection {
        self.direction
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    fn ghost_target(&self) -> Option<Arc<PadInner>> {
        self.ghost.as_ref().and_then(|target| lock(target).upgrade())
    }

    /// Push a buffer out of this (source) pad.
    pub(crate) fn push(self: &Arc<Self>, buffer: Buffer) -> std::result::Result<(), FlowError> {
        if self.direction != PadDirection::Src {
            tracing::warn!(pad = %self.core.name(), "push on a sink pad");
            return Err(FlowError::Error);
        }

        if !self.probes.is_empty() {
            let handle = Pad::from_inner(self.clone());
            if self.probes.invoke(&handle, &buffer) == ProbeVerdict::Drop {
                tracing::trace!(pad = %self.core.name(), "buffer dropped by probe");
                return Ok(());
            }
        }

        // The peer is looked up after the probes ran: they may have linked us.
        let peer = self.peer().ok_or(FlowError::NotLinked)?;
        peer.chain(buffer)
    }

    /// Receive a buffer on this (sink) pad.
    fn chain(self: &Arc<Self>, buffer: Buffer) -> std::result::Result<(), FlowError> {
        if !self.active.load(Ordering::Acquire) {
            tracing::trace!(pad = %self.core.name(), "dropping buffer on inactive pad");
            return Err(FlowError::Flushing);
        }

        if !self.probes.is_empty() {
            let handle = Pad::from_inner(self.clone());
            if self.probes.invoke(&handle, &buffer) == ProbeVerdict::Drop {
                return Ok(());
            }
        }

        let element = self.core.parent().ok_or(FlowError::Flushing)?;
        element.chain(self, buffer)
    }

    /// Break the link with the current peer, if any.
    pub(crate) fn unlink_peer(&self) {
        let _graph = graph_lock();
        let peer = std::mem::take(&mut *lock(&self.peer)).upgrade();
        if let Some(peer) = peer {
            *lock(&peer.peer) = Weak::new();
        }
    }

    fn dispose(&self) {
        tracing::trace!(pad = %self.core.name(), "disposing pad");
        self.unlink_peer();
        self.probes.clear();
        if let Some(target) = &self.ghost {
            *lock(target) = Weak::new();
        }
    }
}

/// A pad handle.
///
/// Cloning the handle adds an owner to the pad; dropping it removes one. The
/// element holding the pad is an owner too.
pub struct Pad {
    pub(crate) inner: Arc<PadInner>,
}

impl Pad {
    fn build(
        name: impl Into<String>,
        direction: PadDirection,
        caps: Caps,
        template: Option<Arc<PadTemplate>>,
        ghost: bool,
    ) -> Self {
        Self {
            inner: Arc::new(PadInner {
                core: ObjectCore::new(name),
                direction,
                caps,
                template,
                peer: Mutex::new(Weak::new()),
                ghost: ghost.then(|| Mutex::new(Weak::new())),
                active: AtomicBool::new(false),
                probes: ProbeList::new(),
            }),
        }
    }

    /// Create a new pad accepting any caps.
    pub fn new(name: impl Into<String>, direction: PadDirection) -> Self {
        Self::build(name, direction, Caps::Any, None, false)
    }

    /// Create a new pad with specific caps.
    pub fn with_caps(name: impl Into<String>, direction: PadDirection, caps: Caps) -> Self {
        Self::build(name, direction, caps, None, false)
    }

    /// Create a pad from a template.
    pub fn from_template(template: Arc<PadTemplate>, name: impl Into<String>) -> Self {
        let direction = template.direction;
        let caps = template.caps.clone();
        Self::build(name, direction, caps, Some(template), false)
    }

    pub(crate) fn new_ghost(name: impl Into<String>, direction: PadDirection) -> Self {
        Self::build(name, direction, Caps::Any, None, true)
    }

    /// New owning handle for an existing pad.
    pub(crate) fn from_inner(inner: Arc<PadInner>) -> Self {
        inner.core.acquire();
        Self { inner }
    }

    /// Get the pad's direction.
    pub fn direction(&self) -> PadDirection {
        self.inner.direction
    }

    /// Check if this is a sink pad.
    pub fn is_sink(&self) -> bool {
        self.inner.direction == PadDirection::Sink
    }

    /// Check if this is a source pad.
    pub fn is_src(&self) -> bool {
        self.inner.direction == PadDirection::Src
    }

    /// Get the template this pad was created from.
    pub fn template(&self) -> Option<&Arc<PadTemplate>> {
        self.inner.template.as_ref()
    }

    /// Whether this is a ghost pad.
    pub fn is_ghost(&self) -> bool {
        self.inner.is_ghost()
    }

    /// Whether the pad accepts data (its element is PAUSED or PLAYING).
    pub fn is_active(&self) -> bool {
        match self.resolve() {
            Ok(pad) => pad.inner.active.load(Ordering::Acquire),
            Err(_) => false,
        }
    }

    /// The pad's caps. Ghost pads report their target's caps.
    pub fn caps(&self) -> Caps {
        match self.resolve() {
            Ok(pad) => pad.inner.caps.clone(),
            Err(_) => self.inner.caps.clone(),
        }
    }

    /// The current target of a ghost pad.
    ///
    /// Fails with [`Error::NoTarget`] if the ghost pad has none and with
    /// [`Error::NotGhostPad`] for regular pads.
    pub fn ghost_target(&self) -> Result<Pad> {
        match &self.inner.ghost {
            None => Err(Error::NotGhostPad {
                pad: self.name().to_string(),
            }),
            Some(_) => self
                .inner
                .ghost_target()
                .map(Pad::from_inner)
                .ok_or_else(|| Error::NoTarget {
                    pad: self.name().to_string(),
                }),
        }
    }

    pub(crate) fn set_ghost_target(&self, target: Option<&Pad>) -> Result<()> {
        let Some(slot) = &self.inner.ghost else {
            return Err(Error::NotGhostPad {
                pad: self.name().to_string(),
            });
        };

        let Some(target) = target else {
            *lock(slot) = Weak::new();
            return Ok(());
        };

        if target.direction() != self.direction() {
            return Err(LinkError::WrongDirection.into());
        }

        // Refuse targets that lead back to this pad.
        let mut cursor = Some(target.inner.clone());
        let mut depth = 0;
        while let Some(pad) = cursor {
            if Arc::ptr_eq(&pad, &self.inner) {
                return Err(LinkError::SamePad.into());
            }
            depth += 1;
            if depth > MAX_GHOST_DEPTH {
                break;
            }
            cursor = pad.ghost_target();
        }

        *lock(slot) = Arc::downgrade(&target.inner);
        tracing::debug!(ghost = %self.name(), target = %target.name(), "ghost pad target set");
        Ok(())
    }

    /// Follow ghost pads down to the concrete pad carrying the link.
    ///
    /// Regular pads resolve to themselves.
    pub fn resolve(&self) -> Result<Pad> {
        let mut current = self.inner.clone();
        for _ in 0..MAX_GHOST_DEPTH {
            if current.ghost.is_none() {
                return Ok(Pad::from_inner(current));
            }
            match current.ghost_target() {
                Some(target) => current = target,
                None => {
                    return Err(Error::NoTarget {
                        pad: current.core.name().to_string(),
                    });
                }
            }
        }
        Err(Error::NoTarget {
            pad: self.name().to_string(),
        })
    }

    /// The pad this pad is linked to.
    ///
    /// For ghost pads this is the peer of the resolved target.
    pub fn peer(&self) -> Option<Pad> {
        let pad = self.resolve().ok()?;
        pad.inner.peer().map(Pad::from_inner)
    }

    /// Whether the pad (or its ghost target) is linked.
    pub fn is_linked(&self) -> bool {
        match self.resolve() {
            Ok(pad) => pad.inner.peer().is_some(),
            Err(_) => false,
        }
    }

    /// Link this source pad to `sink`.
    ///
    /// Ghost pads on either side are resolved to their targets first. Nothing
    /// changes if the link is refused.
    pub fn link(&self, sink: &Pad) -> Result<()> {
        let src_pad = self.resolve()?;
        let sink_pad = sink.resolve()?;

        if Arc::ptr_eq(&src_pad.inner, &sink_pad.inner) {
            return Err(LinkError::SamePad.into());
        }
        if src_pad.direction() != PadDirection::Src || sink_pad.direction() != PadDirection::Sink {
            return Err(LinkError::WrongDirection.into());
        }

        let _graph = graph_lock();
        if src_pad.inner.peer().is_some() || sink_pad.inner.peer().is_some() {
            return Err(LinkError::AlreadyLinked.into());
        }
        if !src_pad.inner.caps.can_intersect(&sink_pad.inner.caps) {
            return Err(LinkError::IncompatibleCaps.into());
        }

        *lock(&src_pad.inner.peer) = Arc::downgrade(&sink_pad.inner);
        *lock(&sink_pad.inner.peer) = Arc::downgrade(&src_pad.inner);

        tracing::debug!(
            src = %pad_path(&src_pad),
            sink = %pad_path(&sink_pad),
            "linked pads"
        );
        Ok(())
    }

    /// Unlink this source pad from `sink`.
    ///
    /// Fails with [`Error::NotLinked`] (and changes nothing) if the two pads
    /// are not linked to each other.
    pub fn unlink(&self, sink: &Pad) -> Result<()> {
        let not_linked = || Error::NotLinked {
            src: self.name().to_string(),
            sink: sink.name().to_string(),
        };
        let src_pad = self.resolve().map_err(|_| not_linked())?;
        let sink_pad = sink.resolve().map_err(|_| not_linked())?;

        let _graph = graph_lock();
        let forward = src_pad
            .inner
            .peer()
            .is_some_and(|peer| Arc::ptr_eq(&peer, &sink_pad.inner));
        let backward = sink_pad
            .inner
            .peer()
            .is_some_and(|peer| Arc::ptr_eq(&peer, &src_pad.inner));
        if !forward || !backward {
            return Err(not_linked());
        }

        *lock(&src_pad.inner.peer) = Weak::new();
        *lock(&sink_pad.inner.peer) = Weak::new();

        tracing::debug!(
            src = %pad_path(&src_pad),
            sink = %pad_path(&sink_pad),
            "unlinked pads"
        );
        Ok(())
    }

    /// Push a buffer to the peer.
    ///
    /// Probes run first, on the calling thread; the buffer then goes to the
    /// peer's element before this call returns.
    pub fn push(&self, buffer: Buffer) -> std::result::Result<(), FlowError> {
        let pad = self.resolve().map_err(|_| FlowError::NotLinked)?;
        pad.inner.push(buffer)
    }

    /// Register a buffer probe.
    ///
    /// On a ghost pad the probe is attached to the resolved target pad, which
    /// is where the data actually flows.
    pub fn add_buffer_probe<F>(&self, callback: F) -> Result<ProbeId>
    where
        F: Fn(&Pad, &Buffer) -> ProbeReturn + Send + Sync + 'static,
    {
        let pad = self.resolve()?;
        let id = pad.inner.probes.add(Box::new(callback));
        tracing::debug!(pad = %pad_path(&pad), probe = id.get(), "added buffer probe");
        Ok(id)
    }

    /// Remove a buffer probe. Safe to call from inside the probe itself.
    pub fn remove_buffer_probe(&self, id: ProbeId) {
        match self.resolve() {
            Ok(pad) if pad.inner.probes.remove(id) => {
                tracing::debug!(pad = %pad_path(&pad), probe = id.get(), "removed buffer probe");
            }
            _ => {
                tracing::warn!(pad = %self.name(), probe = id.get(), "no such buffer probe");
            }
        }
    }

    /// Number of probes attached to the resolved pad.
    pub fn probe_count(&self) -> usize {
        self.resolve()
            .map(|pad| pad.inner.probes.len())
            .unwrap_or_default()
    }

    /// Whether two handles refer to the same pad.
    pub fn ptr_eq(&self, other: &Pad) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// `element:pad` label used in logs.
fn pad_path(pad: &Pad) -> String {
    match pad.inner.core.parent() {
        Some(parent) => format!("{}:{}", parent.name(), pad.name()),
        None => format!("<none>:{}", pad.name()),
    }
}

impl Clone for Pad {
    fn clone(&self) -> Self {
        Self::from_inner(self.inner.clone())
    }
}

impl Drop for Pad {
    fn drop(&mut self) {
        if self.inner.core.release() {
            self.inner.dispose();
        }
    }
}

impl PartialEq for Pad {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Pad {}

impl ObjectExt for Pad {
    fn name(&self) -> &str {
        self.inner.core.name()
    }

    fn ref_count(&self) -> usize {
        self.inner.core.ref_count()
    }

    fn parent(&self) -> Option<Element> {
        self.inner.core.parent().and_then(Element::try_from_inner)
    }

    fn has_parent(&self) -> bool {
        self.inner.core.has_parent()
    }
}

impl std::fmt::Debug for Pad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pad")
            .field("name", &self.name())
            .field("direction", &self.direction())
            .field("ghost", &self.is_ghost())
            .field("linked", &self.inner.peer().is_some())
            .finish()
    }
}

/// Collection of pads for an element, in insertion order.
#[derive(Debug, Default)]
pub(crate) struct PadList {
    pads: Vec<Pad>,
}

impl PadList {
    /// Add a pad to the list.
    pub(crate) fn add(&mut self, pad: Pad) {
        self.pads.push(pad);
    }

    /// Remove a pad, returning the list's handle to it.
    pub(crate) fn remove(&mut self, pad: &Pad) -> Option<Pad> {
        let index = self.pads.iter().position(|p| p.ptr_eq(pad))?;
        Some(self.pads.remove(index))
    }

    /// Get a pad by name.
    pub(crate) fn get(&self, name: &str) -> Option<&Pad> {
        self.pads.iter().find(|p| p.name() == name)
    }

    /// Get all pads.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Pad> {
        self.pads.iter()
    }

    /// Take every pad out, in insertion order.
    pub(crate) fn drain(&mut self) -> Vec<Pad> {
        std::mem::take(&mut self.pads)
    }

    pub(crate) fn set_active(&self, active: bool) {
        for pad in &self.pads {
            // Ghost pads carry no data of their own.
            if !pad.inner.is_ghost() {
                pad.inner.set_active(active);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_sets_both_peers() {
        let src = Pad::new("src", PadDirection::Src);
        let sink = Pad::new("sink", PadDirection::Sink);

        src.link(&sink).unwrap();
        assert_eq!(src.peer(), Some(sink.clone()));
        assert_eq!(sink.peer(), Some(src.clone()));
        assert!(src.is_linked() && sink.is_linked());
    }

    #[test]
    fn test_second_link_fails() {
        let src = Pad::new("src", PadDirection::Src);
        let sink = Pad::new("sink", PadDirection::Sink);
        let other_sink = Pad::new("sink2", PadDirection::Sink);
        let other_src = Pad::new("src2", PadDirection::Src);

        src.link(&sink).unwrap();
        assert!(matches!(
            src.link(&other_sink),
            Err(Error::Link(LinkError::AlreadyLinked))
        ));
        assert!(matches!(
            other_src.link(&sink),
            Err(Error::Link(LinkError::AlreadyLinked))
        ));
        assert!(!other_sink.is_linked());
        assert!(!other_src.is_linked());
    }

    #[test]
    fn test_wrong_direction() {
        let a = Pad::new("a", PadDirection::Sink);
        let b = Pad::new("b", PadDirection::Src);
        assert!(matches!(
            a.link(&b),
            Err(Error::Link(LinkError::WrongDirection))
        ));
        assert!(!a.is_linked() && !b.is_linked());
    }

    #[test]
    fn test_incompatible_caps() {
        let src = Pad::with_caps("src", PadDirection::Src, Caps::simple("audio/x-raw"));
        let sink = Pad::with_caps("sink", PadDirection::Sink, Caps::simple("video/x-raw"));
        assert!(matches!(
            src.link(&sink),
            Err(Error::Link(LinkError::IncompatibleCaps))
        ));
        assert!(!src.is_linked());
    }

    #[test]
    fn test_unlink_twice_reports_not_linked() {
        let src = Pad::new("src", PadDirection::Src);
        let sink = Pad::new("sink", PadDirection::Sink);
        src.link(&sink).unwrap();

        src.unlink(&sink).unwrap();
        assert!(matches!(src.unlink(&sink), Err(Error::NotLinked { .. })));
        assert!(matches!(src.unlink(&sink), Err(Error::NotLinked { .. })));
        assert!(!src.is_linked());
    }

    #[test]
    fn test_unlink_wrong_pair_keeps_link() {
        let src = Pad::new("src", PadDirection::Src);
        let sink = Pad::new("sink", PadDirection::Sink);
        let stranger = Pad::new("other", PadDirection::Sink);
        src.link(&sink).unwrap();

        assert!(matches!(src.unlink(&stranger), Err(Error::NotLinked { .. })));
        assert_eq!(src.peer(), Some(sink));
    }

    #[test]
    fn test_dropping_pad_unlinks_peer() {
        let src = Pad::new("src", PadDirection::Src);
        let sink = Pad::new("sink", PadDirection::Sink);
        src.link(&sink).unwrap();

        drop(sink);
        assert!(!src.is_linked());
    }

    #[test]
    fn test_push_without_peer() {
        let src = Pad::new("src", PadDirection::Src);
        assert_eq!(src.push(Buffer::empty(0)), Err(FlowError::NotLinked));
    }

    #[test]
    fn test_push_into_inactive_pad() {
        let src = Pad::new("src", PadDirection::Src);
        let sink = Pad::new("sink", PadDirection::Sink);
        src.link(&sink).unwrap();
        assert_eq!(src.push(Buffer::empty(0)), Err(FlowError::Flushing));
    }

    #[test]
    fn test_pad_from_template() {
        let template = Arc::new(PadTemplate::src("src", Caps::simple("video/x-raw")));
        let pad = Pad::from_template(template, "src");

        assert_eq!(pad.name(), "src");
        assert!(pad.is_src());
        assert!(pad.template().is_some());
        assert_eq!(pad.caps(), Caps::simple("video/x-raw"));
    }

    #[test]
    fn test_handle_counts() {
        let pad = Pad::new("src", PadDirection::Src);
        assert_eq!(pad.ref_count(), 1);
        let other = pad.clone();
        assert_eq!(pad.ref_count(), 2);
        drop(other);
        assert_eq!(pad.ref_count(), 1);
    }
}
