//! Element handles.
//!
//! [`Element`] is the user-facing handle to a node of the graph: a leaf
//! wrapping a [`Source`], [`Sink`] or [`Transform`] implementation, or a bin.
//! Cloning a handle adds an owner, dropping it removes one; the last owner
//! going away disposes the element.

use crate::buffer::Buffer;
use crate::element::context::ElementContext;
use crate::element::pad::{Pad, PadDirection, PadInner, PadList};
use crate::element::state::{
    State, StateCell, StateChange, StateChangeError, StateChangeResult, StateChangeSuccess,
};
use crate::element::task::Task;
use crate::element::traits::{
    ElementDyn, ElementType, Sink, SinkAdapter, Source, SourceAdapter, Transform,
    TransformAdapter,
};
use crate::error::{Error, FlowError, LinkError, Result};
use crate::object::{ObjectCore, ObjectExt, graph_lock, lock};
use crate::pipeline::bin::{Bin, BinData};
use crate::pipeline::events::PipelineEvent;
use crate::pipeline::{Pipeline, PipelineData};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::time::Duration;

/// What an element is made of.
pub(crate) enum ElementKind {
    Leaf(LeafData),
    Bin(BinData),
}

/// A leaf element: an implementation plus its streaming task.
pub(crate) struct LeafData {
    imp: Mutex<Box<dyn ElementDyn>>,
    element_type: ElementType,
    task: Mutex<Option<Task>>,
}

pub(crate) struct ElementInner {
    pub(crate) core: ObjectCore,
    pub(crate) pads: Mutex<PadList>,
    pub(crate) state: Mutex<StateCell>,
    pub(crate) state_changed: Condvar,
    pub(crate) kind: ElementKind,
    /// Set for pipelines only.
    pub(crate) pipeline: Option<PipelineData>,
}

impl ElementInner {
    pub(crate) fn new(name: impl Into<String>, kind: ElementKind, pipeline: Option<PipelineData>) -> Self {
        Self {
            core: ObjectCore::new(name),
            pads: Mutex::new(PadList::default()),
            state: Mutex::new(StateCell::new()),
            state_changed: Condvar::new(),
            kind,
            pipeline,
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.core.name()
    }

    pub(crate) fn context(self: &Arc<Self>) -> ElementContext {
        ElementContext::new(self)
    }

    pub(crate) fn current_state(&self) -> State {
        lock(&self.state).current
    }

    pub(crate) fn is_bin(&self) -> bool {
        matches!(self.kind, ElementKind::Bin(_))
    }

    /// Snapshot of the element's pads, without owning them.
    pub(crate) fn pad_inners(&self) -> Vec<Arc<PadInner>> {
        lock(&self.pads).iter().map(|pad| pad.inner.clone()).collect()
    }

    /// The first concrete pad in `direction`, without owning it.
    fn first_pad(&self, direction: PadDirection) -> Option<Arc<PadInner>> {
        let pad = lock(&self.pads)
            .iter()
            .find(|pad| pad.direction() == direction)
            .map(|pad| pad.inner.clone())?;
        pad.resolved()
    }

    /// Post an event to the nearest enclosing pipeline, if any.
    pub(crate) fn post(&self, event: PipelineEvent) {
        if let Some(pipeline) = &self.pipeline {
            pipeline.events.send(event);
            return;
        }
        let mut ancestor = self.core.parent();
        while let Some(current) = ancestor {
            if let Some(pipeline) = &current.pipeline {
                pipeline.events.send(event);
                return;
            }
            ancestor = current.core.parent();
        }
    }

    /// Pull the next buffer from a source implementation.
    pub(crate) fn produce(&self) -> Result<Option<Buffer>> {
        match &self.kind {
            ElementKind::Leaf(leaf) => lock(&leaf.imp).produce(),
            ElementKind::Bin(_) => Ok(None),
        }
    }

    /// Deliver a buffer that arrived on one of our sink pads.
    pub(crate) fn chain(
        self: &Arc<Self>,
        pad: &PadInner,
        buffer: Buffer,
    ) -> std::result::Result<(), FlowError> {
        let ElementKind::Leaf(leaf) = &self.kind else {
            return Err(FlowError::NotLinked);
        };
        tracing::trace!(element = %self.name(), pad = %pad.core.name(), sequence = buffer.sequence(), "chain");

        let processed = lock(&leaf.imp).process(buffer);
        let output = match processed {
            Ok(output) => output,
            Err(err) => {
                tracing::error!(element = %self.name(), %err, "processing failed");
                self.post(PipelineEvent::Error {
                    element: self.name().to_string(),
                    message: err.to_string(),
                });
                return Err(FlowError::Error);
            }
        };
        if output.is_empty() {
            return Ok(());
        }

        let src = self.first_pad(PadDirection::Src).ok_or(FlowError::NotLinked)?;
        for buffer in output.into_vec() {
            src.push(buffer)?;
        }
        Ok(())
    }

    /// State hook for leaf elements: pad activation and streaming around the
    /// implementation's own hook.
    pub(crate) fn change_leaf_state(
        self: &Arc<Self>,
        leaf: &LeafData,
        transition: StateChange,
    ) -> StateChangeResult {
        match transition {
            StateChange::PlayingToPaused => self.stop_task(leaf),
            StateChange::PausedToReady => lock(&self.pads).set_active(false),
            _ => {}
        }

        let ctx = self.context();
        let ret = lock(&leaf.imp).change_state(&ctx, transition)?;

        match transition {
            StateChange::ReadyToPaused => lock(&self.pads).set_active(true),
            StateChange::PausedToPlaying if leaf.element_type == ElementType::Source => {
                self.start_task(leaf)?;
            }
            _ => {}
        }
        Ok(ret)
    }

    fn start_task(self: &Arc<Self>, leaf: &LeafData) -> StateChangeResult {
        let Some(pad) = self.first_pad(PadDirection::Src) else {
            tracing::warn!(element = %self.name(), "source has no src pad, not streaming");
            return Ok(StateChangeSuccess::Success);
        };
        match Task::spawn(self, pad) {
            Ok(task) => {
                tracing::debug!(element = %self.name(), "streaming task started");
                *lock(&leaf.task) = Some(task);
                Ok(StateChangeSuccess::Success)
            }
            Err(err) => {
                tracing::error!(element = %self.name(), %err, "cannot spawn streaming task");
                Err(StateChangeError)
            }
        }
    }

    fn stop_task(&self, leaf: &LeafData) {
        let task = lock(&leaf.task).take();
        if let Some(task) = task {
            task.stop();
            tracing::debug!(element = %self.name(), "streaming task stopped");
        }
    }

    /// Tear down after the last owner went away.
    ///
    /// The state is left as is; resources held by a running element are
    /// released regardless.
    pub(crate) fn dispose(&self) {
        let state = self.current_state();
        if state != State::Null {
            tracing::warn!(element = %self.name(), %state, "disposing element that is not in NULL");
        }
        tracing::debug!(element = %self.name(), "disposing element");

        if let Some(pipeline) = &self.pipeline {
            pipeline.executor.shutdown();
        }

        match &self.kind {
            ElementKind::Leaf(leaf) => self.stop_task(leaf),
            ElementKind::Bin(bin) => {
                let children = bin.take_children();
                for child in children.into_iter().rev() {
                    child.inner.core.clear_parent();
                    drop(child);
                }
            }
        }

        let pads = lock(&self.pads).drain();
        for pad in pads {
            pad.inner.set_active(false);
            pad.inner.unlink_peer();
            pad.inner.core.clear_parent();
        }
    }
}

/// Handle to an element or bin.
pub struct Element {
    pub(crate) inner: Arc<ElementInner>,
}

impl Element {
    /// Wrap a source implementation.
    pub fn new_source<S: Source + 'static>(name: impl Into<String>, source: S) -> Self {
        Self::from_dyn(name, Box::new(SourceAdapter::new(source)))
    }

    /// Wrap a sink implementation.
    pub fn new_sink<S: Sink + 'static>(name: impl Into<String>, sink: S) -> Self {
        Self::from_dyn(name, Box::new(SinkAdapter::new(sink)))
    }

    /// Wrap a transform implementation.
    pub fn new_transform<T: Transform + 'static>(name: impl Into<String>, transform: T) -> Self {
        Self::from_dyn(name, Box::new(TransformAdapter::new(transform)))
    }

    /// Wrap a type-erased implementation. Pads are created from its
    /// templates.
    pub fn from_dyn(name: impl Into<String>, imp: Box<dyn ElementDyn>) -> Self {
        let templates = imp.pad_templates();
        let element_type = imp.element_type();
        let inner = Arc::new(ElementInner::new(
            name,
            ElementKind::Leaf(LeafData {
                imp: Mutex::new(imp),
                element_type,
                task: Mutex::new(None),
            }),
            None,
        ));

        {
            let mut pads = lock(&inner.pads);
            for template in templates {
                let name = template.name.clone();
                let pad = Pad::from_template(Arc::new(template), name);
                pad.inner.core.adopt(&inner);
                pads.add(pad);
            }
        }
        tracing::trace!(element = %inner.name(), ?element_type, "created element");
        Self { inner }
    }

    /// Handle for an element created internally; takes over the initial
    /// ownership count.
    pub(crate) fn from_new_inner(inner: Arc<ElementInner>) -> Self {
        Self { inner }
    }

    /// New owning handle for an element known to be alive.
    pub(crate) fn from_inner(inner: Arc<ElementInner>) -> Self {
        inner.core.acquire();
        Self { inner }
    }

    /// New owning handle, unless the element is already being disposed.
    pub(crate) fn try_from_inner(inner: Arc<ElementInner>) -> Option<Self> {
        inner.core.try_acquire().then_some(Self { inner })
    }

    /// A handle that does not own the element.
    pub fn downgrade(&self) -> WeakElement {
        WeakElement {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether two handles refer to the same element.
    pub fn ptr_eq(&self, other: &Element) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Source, sink or transform; `None` for bins.
    pub fn element_type(&self) -> Option<ElementType> {
        match &self.inner.kind {
            ElementKind::Leaf(leaf) => Some(leaf.element_type),
            ElementKind::Bin(_) => None,
        }
    }

    /// Whether the element is a bin (or pipeline).
    pub fn is_bin(&self) -> bool {
        self.inner.is_bin()
    }

    /// Downcast to a bin.
    pub fn as_bin(&self) -> Option<Bin> {
        self.is_bin().then(|| Bin::from_element(self.clone()))
    }

    /// Downcast to a pipeline.
    pub fn as_pipeline(&self) -> Option<Pipeline> {
        self.inner
            .pipeline
            .is_some()
            .then(|| Pipeline::from_element(self.clone()))
    }

    // ------------------------------------------------------------------
    // Pads
    // ------------------------------------------------------------------

    /// Add a pad to this element.
    ///
    /// Fails if the pad already has a parent or the name is taken. Pads added
    /// to an element that is `Paused` or above are activated right away.
    pub fn add_pad(&self, pad: &Pad) -> Result<()> {
        {
            let _graph = graph_lock();
            let mut pads = lock(&self.inner.pads);
            if pads.get(pad.name()).is_some() {
                return Err(Error::DuplicateName {
                    name: pad.name().to_string(),
                    parent: self.name().to_string(),
                });
            }
            pad.inner.core.set_parent(&self.inner)?;
            pads.add(pad.clone());
        }

        if !pad.inner.is_ghost() && self.current_state() >= State::Paused {
            pad.inner.set_active(true);
        }
        tracing::debug!(element = %self.name(), pad = %pad.name(), "added pad");
        Ok(())
    }

    /// Remove a pad, unlinking it first.
    pub fn remove_pad(&self, pad: &Pad) -> Result<()> {
        let removed = {
            let _graph = graph_lock();
            let removed = lock(&self.inner.pads)
                .remove(pad)
                .ok_or_else(|| Error::NotChild {
                    child: pad.name().to_string(),
                    bin: self.name().to_string(),
                })?;
            removed.inner.core.clear_parent();
            removed
        };

        removed.inner.unlink_peer();
        removed.inner.set_active(false);
        tracing::debug!(element = %self.name(), pad = %removed.name(), "removed pad");
        Ok(())
    }

    /// Look up a pad by name.
    pub fn static_pad(&self, name: &str) -> Option<Pad> {
        lock(&self.inner.pads).get(name).cloned()
    }

    /// All pads, in the order they were added.
    pub fn pads(&self) -> Vec<Pad> {
        lock(&self.inner.pads).iter().cloned().collect()
    }

    /// Source pads.
    pub fn src_pads(&self) -> Vec<Pad> {
        self.pads_with_direction(PadDirection::Src)
    }

    /// Sink pads.
    pub fn sink_pads(&self) -> Vec<Pad> {
        self.pads_with_direction(PadDirection::Sink)
    }

    fn pads_with_direction(&self, direction: PadDirection) -> Vec<Pad> {
        lock(&self.inner.pads)
            .iter()
            .filter(|pad| pad.direction() == direction)
            .cloned()
            .collect()
    }

    /// Link the first free source pad of this element to the first free,
    /// caps-compatible sink pad of `dest`.
    pub fn link(&self, dest: &Element) -> Result<()> {
        let sinks = dest.sink_pads();
        for src in self.src_pads().iter().filter(|pad| !pad.is_linked()) {
            for sink in sinks.iter().filter(|pad| !pad.is_linked()) {
                if !src.caps().can_intersect(&sink.caps()) {
                    continue;
                }
                match src.link(sink) {
                    Ok(()) => return Ok(()),
                    Err(Error::Link(_) | Error::NoTarget { .. }) => continue,
                    Err(err) => return Err(err),
                }
            }
        }
        tracing::debug!(src = %self.name(), sink = %dest.name(), "no compatible pads to link");
        Err(LinkError::NoCompatiblePads.into())
    }

    /// Link the named pads of two elements.
    pub fn link_pads(&self, src_pad: &str, dest: &Element, sink_pad: &str) -> Result<()> {
        let src = self.static_pad(src_pad).ok_or_else(|| Error::PadNotFound {
            element: self.name().to_string(),
            pad: src_pad.to_string(),
        })?;
        let sink = dest.static_pad(sink_pad).ok_or_else(|| Error::PadNotFound {
            element: dest.name().to_string(),
            pad: sink_pad.to_string(),
        })?;
        src.link(&sink)
    }

    /// Break every link from this element's source pads to `dest`.
    pub fn unlink(&self, dest: &Element) -> Result<()> {
        let sinks = dest.sink_pads();
        let mut unlinked = false;
        for src in self.src_pads() {
            let Some(peer) = src.peer() else {
                continue;
            };
            for sink in &sinks {
                if sink.resolve().is_ok_and(|pad| pad.ptr_eq(&peer)) {
                    src.unlink(sink)?;
                    unlinked = true;
                }
            }
        }
        if unlinked {
            Ok(())
        } else {
            Err(Error::NotLinked {
                src: self.name().to_string(),
                sink: dest.name().to_string(),
            })
        }
    }

    // ------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------

    /// Change the state, stepping through the intermediate states.
    ///
    /// Returns `Async` if a step is still completing; use
    /// [`get_state`](Self::get_state) to wait for it. On a pipeline the
    /// chain runs on the pipeline's worker and this call blocks until the
    /// worker is done with it.
    pub fn set_state(&self, state: State) -> StateChangeResult {
        if state == State::VoidPending {
            tracing::warn!(element = %self.name(), "VOID_PENDING is not a target state");
            return Err(StateChangeError);
        }
        self.inner.set_state(state)
    }

    /// Request a state change without waiting.
    ///
    /// Progress is reported through [`PipelineEvent`]s and
    /// [`get_state`](Self::get_state). A later request supersedes an
    /// earlier one that has not finished.
    pub fn set_state_async(&self, state: State) {
        if state == State::VoidPending {
            tracing::warn!(element = %self.name(), "VOID_PENDING is not a target state");
            return;
        }
        self.inner.set_state_async(state);
    }

    /// Wait up to `timeout` (`None` = forever) for in-flight changes to
    /// resolve.
    ///
    /// Returns the outcome, the current state and the pending state. If the
    /// timeout expires first the outcome is `Async` and the pending state is
    /// the one still being worked towards.
    pub fn get_state(&self, timeout: Option<Duration>) -> (StateChangeResult, State, State) {
        self.inner.get_state(timeout)
    }

    /// The current state, without waiting.
    pub fn current_state(&self) -> State {
        self.inner.current_state()
    }

    /// The state being worked towards, or `VoidPending`.
    pub fn pending_state(&self) -> State {
        lock(&self.inner.state).pending
    }

    /// Wait until the element settles in `state`.
    pub fn wait_for_state(&self, state: State, timeout: Duration) -> Result<()> {
        match self.get_state(Some(timeout)) {
            (Err(err), _, _) => Err(err.into()),
            (Ok(StateChangeSuccess::Async), _, _) => Err(Error::Timeout {
                element: self.name().to_string(),
                state,
            }),
            (Ok(_), current, _) if current == state => Ok(()),
            (Ok(_), current, _) => {
                tracing::debug!(element = %self.name(), %current, wanted = %state, "settled elsewhere");
                Err(StateChangeError.into())
            }
        }
    }

    /// Exclude the element from its parent's state changes.
    pub fn set_locked_state(&self, locked: bool) {
        lock(&self.inner.state).locked = locked;
        tracing::debug!(element = %self.name(), locked, "locked state");
    }

    /// Whether the element is excluded from its parent's state changes.
    pub fn is_locked_state(&self) -> bool {
        lock(&self.inner.state).locked
    }

    /// Bring the element to the state its parent is in or heading for.
    pub fn sync_state_with_parent(&self) -> StateChangeResult {
        let Some(parent) = self.inner.core.parent() else {
            return Ok(StateChangeSuccess::Success);
        };
        let target = {
            let cell = lock(&parent.state);
            if cell.pending != State::VoidPending {
                cell.pending
            } else {
                cell.current
            }
        };
        tracing::debug!(element = %self.name(), %target, "syncing state with parent");
        self.set_state(target)
    }
}

impl Clone for Element {
    fn clone(&self) -> Self {
        Self::from_inner(self.inner.clone())
    }
}

impl Drop for Element {
    fn drop(&mut self) {
        if self.inner.core.release() {
            self.inner.dispose();
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Element {}

impl ObjectExt for Element {
    fn name(&self) -> &str {
        self.inner.name()
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

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Element")
            .field("name", &self.name())
            .field("type", &self.element_type())
            .field("state", &self.current_state())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

/// A non-owning element handle.
///
/// Does not count towards the element's owners. Use it to refer to elements
/// from probe callbacks without keeping them alive.
#[derive(Clone, Default)]
pub struct WeakElement {
    inner: Weak<ElementInner>,
}

impl WeakElement {
    /// An owning handle, unless the element has been disposed.
    pub fn upgrade(&self) -> Option<Element> {
        self.inner.upgrade().and_then(Element::try_from_inner)
    }
}

impl std::fmt::Debug for WeakElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakElement")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::Caps;
    use crate::elements::{FakeSink, FakeSrc, Identity};
    use crate::element::state::StateChangeReturn;

    #[test]
    fn test_pads_from_templates() {
        let identity = Element::new_transform("identity", Identity::new());
        let names: Vec<_> = identity.pads().iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, ["sink", "src"]);
        assert!(identity.static_pad("src").unwrap().parent().unwrap().ptr_eq(&identity));

        let other = Element::new_transform("other", Identity::new());
        let err = other.add_pad(&identity.static_pad("sink").unwrap()).unwrap_err();
        assert!(matches!(err, Error::AlreadyHasParent { .. }));
    }

    #[test]
    fn test_new_element_count() {
        let src = Element::new_source("src", FakeSrc::new());
        assert_eq!(src.ref_count(), 1);
        let other = src.clone();
        assert_eq!(src.ref_count(), 2);
        drop(other);
        assert_eq!(src.ref_count(), 1);
    }

    #[test]
    fn test_weak_handle_does_not_own() {
        let src = Element::new_source("src", FakeSrc::new());
        let weak = src.downgrade();
        assert_eq!(src.ref_count(), 1);
        assert!(weak.upgrade().is_some());
        drop(src);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_element_link() {
        let src = Element::new_source("src", FakeSrc::new());
        let sink = Element::new_sink("sink", FakeSink::new());
        src.link(&sink).unwrap();
        assert!(src.static_pad("src").unwrap().is_linked());

        let err = src.link(&sink).unwrap_err();
        assert!(matches!(err, Error::Link(LinkError::NoCompatiblePads)));

        src.unlink(&sink).unwrap();
        assert!(!sink.static_pad("sink").unwrap().is_linked());
        assert!(matches!(src.unlink(&sink), Err(Error::NotLinked { .. })));
    }

    #[test]
    fn test_link_skips_incompatible_caps() {
        let src = Element::new_source("src", FakeSrc::new().with_caps(Caps::simple("video/x-raw")));
        let sink = Element::new_sink("sink", FakeSink::new().with_caps(Caps::simple("audio/x-raw")));
        assert!(matches!(
            src.link(&sink),
            Err(Error::Link(LinkError::NoCompatiblePads))
        ));
    }

    #[test]
    fn test_link_pads_unknown_name() {
        let src = Element::new_source("src", FakeSrc::new());
        let sink = Element::new_sink("sink", FakeSink::new());
        let err = src.link_pads("nope", &sink, "sink").unwrap_err();
        assert!(matches!(err, Error::PadNotFound { .. }));
    }

    #[test]
    fn test_add_pad_rules() {
        let element = Element::new_sink("sink", FakeSink::new());
        let pad = Pad::new("sink", PadDirection::Sink);
        assert!(matches!(element.add_pad(&pad), Err(Error::DuplicateName { .. })));

        let extra = Pad::new("extra", PadDirection::Sink);
        element.add_pad(&extra).unwrap();
        assert_eq!(extra.ref_count(), 2);

        let other = Element::new_sink("other", FakeSink::new());
        assert!(matches!(other.add_pad(&extra), Err(Error::AlreadyHasParent { .. })));

        element.remove_pad(&extra).unwrap();
        assert_eq!(extra.ref_count(), 1);
        assert!(!extra.has_parent());
        assert!(matches!(element.remove_pad(&extra), Err(Error::NotChild { .. })));
    }

    #[test]
    fn test_state_chain_on_leaf() {
        let sink = Element::new_sink("sink", FakeSink::new());
        assert_eq!(sink.set_state(State::Paused), Ok(StateChangeSuccess::Success));
        assert_eq!(sink.current_state(), State::Paused);
        assert!(sink.static_pad("sink").unwrap().is_active());

        assert_eq!(sink.set_state(State::Null), Ok(StateChangeSuccess::Success));
        assert!(!sink.static_pad("sink").unwrap().is_active());
        assert_eq!(sink.pending_state(), State::VoidPending);
    }

    #[test]
    fn test_failed_step_stops_chain() {
        let sink = Element::new_sink(
            "sink",
            FakeSink::new().fail_on(StateChange::ReadyToPaused),
        );
        assert_eq!(sink.set_state(State::Playing), Err(StateChangeError));
        assert_eq!(sink.current_state(), State::Ready);

        let (ret, current, pending) = sink.get_state(Some(Duration::ZERO));
        assert_eq!(ret, Err(StateChangeError));
        assert_eq!(current, State::Ready);
        assert_eq!(pending, State::VoidPending);

        // Going back down is unaffected.
        assert!(sink.set_state(State::Null).is_ok());
    }

    #[test]
    fn test_async_step_and_commit() {
        let sink = Element::new_sink(
            "sink",
            FakeSink::new().with_preroll_delay(Duration::from_millis(20)),
        );
        assert_eq!(sink.set_state(State::Playing), Ok(StateChangeSuccess::Async));

        let (ret, current, pending) = sink.get_state(None);
        assert_eq!(ret, Ok(StateChangeSuccess::Success));
        assert_eq!(current, State::Playing);
        assert_eq!(pending, State::VoidPending);
        sink.set_state(State::Null).unwrap();
    }

    #[test]
    fn test_commit_without_step_is_ignored() {
        let sink = Element::new_sink("sink", FakeSink::new());
        sink.inner.commit_state(StateChangeReturn::Success);
        assert_eq!(sink.current_state(), State::Null);
    }

    #[test]
    fn test_locked_state_flag() {
        let sink = Element::new_sink("sink", FakeSink::new());
        assert!(!sink.is_locked_state());
        sink.set_locked_state(true);
        assert!(sink.is_locked_state());
    }

    #[test]
    fn test_dispose_unlinks_peer() {
        let src = Element::new_source("src", FakeSrc::new());
        let sink = Element::new_sink("sink", FakeSink::new());
        src.link(&sink).unwrap();
        let src_pad = src.static_pad("src").unwrap();

        drop(sink);
        assert!(!src_pad.is_linked());
    }

    #[test]
    fn test_void_pending_rejected() {
        let sink = Element::new_sink("sink", FakeSink::new());
        assert!(sink.set_state(State::VoidPending).is_err());
    }
}
