//! Bins: elements that contain other elements.

use crate::element::handle::{Element, ElementInner, ElementKind};
use crate::element::state::{StateChange, StateChangeResult, StateChangeSuccess};
use crate::error::{Error, Result};
use crate::object::{ObjectExt, graph_lock, lock};
use crate::pipeline::events::PipelineEvent;
use crate::pipeline::graph;
use std::ops::Deref;
use std::sync::{Arc, Mutex};

/// Children of a bin, in insertion order. The bin owns one count on each.
#[derive(Default)]
pub(crate) struct BinData {
    children: Mutex<Vec<Element>>,
}

impl BinData {
    /// Children without ownership, for state propagation.
    pub(crate) fn snapshot(&self) -> Vec<Arc<ElementInner>> {
        lock(&self.children)
            .iter()
            .map(|child| child.inner.clone())
            .collect()
    }

    pub(crate) fn take_children(&self) -> Vec<Element> {
        std::mem::take(&mut *lock(&self.children))
    }
}

impl ElementInner {
    /// A bin's step: move every child to the step's target, in data-flow
    /// order.
    pub(crate) fn change_bin_state(
        self: &Arc<Self>,
        bin: &BinData,
        transition: StateChange,
    ) -> StateChangeResult {
        let children = graph::sorted_children(self, bin.snapshot(), transition.is_upward());
        let next = transition.next();

        let mut ret = StateChangeSuccess::Success;
        for child in children {
            if lock(&child.state).locked {
                tracing::trace!(bin = %self.name(), child = %child.name(), "skipping locked child");
                continue;
            }
            match child.set_state(next) {
                Ok(StateChangeSuccess::Success) => {}
                Ok(StateChangeSuccess::Async) => ret = StateChangeSuccess::Async,
                Ok(StateChangeSuccess::NoPreroll) => {
                    if ret == StateChangeSuccess::Success {
                        ret = StateChangeSuccess::NoPreroll;
                    }
                }
                Err(err) => {
                    tracing::warn!(bin = %self.name(), child = %child.name(), ?transition, "child failed to change state");
                    return Err(err);
                }
            }
        }
        Ok(ret)
    }
}

/// An element that contains other elements.
///
/// A bin owns its children: adding an element adds an owner, removing it (or
/// disposing the bin) drops one. State changes on the bin are propagated to
/// its children, and the bin's step only completes once every child has
/// completed its own.
///
/// Pads inside a bin are exposed on its boundary with
/// [`GhostPad`](crate::GhostPad)s.
#[derive(Clone, PartialEq, Eq)]
pub struct Bin {
    element: Element,
}

impl Bin {
    /// Create an empty bin.
    pub fn new(name: impl Into<String>) -> Self {
        let inner = ElementInner::new(name, ElementKind::Bin(BinData::default()), None);
        Self::from_element(Element::from_new_inner(Arc::new(inner)))
    }

    /// Wrap a handle known to be a bin.
    pub(crate) fn from_element(element: Element) -> Self {
        Self { element }
    }

    pub(crate) fn data(&self) -> &BinData {
        match &self.element.inner.kind {
            ElementKind::Bin(data) => data,
            ElementKind::Leaf(_) => unreachable!("bin handle around a leaf element"),
        }
    }

    /// The bin as a plain element handle.
    pub fn as_element(&self) -> &Element {
        &self.element
    }

    /// Convert into a plain element handle.
    pub fn upcast(self) -> Element {
        self.element
    }

    /// Add an element.
    ///
    /// Fails if the element already has a parent, if a child with the same
    /// name exists, if the element is changing state, or if the element is
    /// this bin or one of its ancestors.
    pub fn add(&self, element: &Element) -> Result<()> {
        self.add_many(&[element])
    }

    /// Add several elements; either all are added or none.
    pub fn add_many(&self, elements: &[&Element]) -> Result<()> {
        {
            let _graph = graph_lock();
            let mut children = lock(&self.data().children);

            for (index, element) in elements.iter().enumerate() {
                self.check_addable(element)?;
                let clash = children
                    .iter()
                    .chain(elements[..index].iter().copied())
                    .any(|other| other.name() == element.name());
                if clash {
                    return Err(Error::DuplicateName {
                        name: element.name().to_string(),
                        parent: self.name().to_string(),
                    });
                }
            }

            for element in elements {
                element.inner.core.set_parent(&self.element.inner)?;
                children.push((*element).clone());
            }
        }

        for element in elements {
            tracing::debug!(bin = %self.name(), element = %element.name(), "added element");
            self.inner.post(PipelineEvent::ElementAdded {
                bin: self.name().to_string(),
                element: element.name().to_string(),
            });
        }
        Ok(())
    }

    fn check_addable(&self, element: &Element) -> Result<()> {
        if let Some(parent) = element.inner.core.parent() {
            return Err(Error::AlreadyHasParent {
                object: element.name().to_string(),
                parent: parent.name().to_string(),
            });
        }

        let mut ancestor = Some(self.element.inner.clone());
        while let Some(current) = ancestor {
            if Arc::ptr_eq(&current, &element.inner) {
                return Err(Error::Element(format!(
                    "adding '{}' to '{}' would create a cycle",
                    element.name(),
                    self.name()
                )));
            }
            ancestor = current.core.parent();
        }

        if lock(&element.inner.state).busy {
            return Err(Error::StateChangeInProgress {
                element: element.name().to_string(),
            });
        }
        Ok(())
    }

    /// Remove a child, unlinking its pads.
    ///
    /// The element keeps its state; the bin's owner count on it is dropped.
    pub fn remove(&self, element: &Element) -> Result<()> {
        let removed = {
            let _graph = graph_lock();
            let mut children = lock(&self.data().children);
            let index = children
                .iter()
                .position(|child| child.ptr_eq(element))
                .ok_or_else(|| Error::NotChild {
                    child: element.name().to_string(),
                    bin: self.name().to_string(),
                })?;
            if lock(&element.inner.state).busy {
                return Err(Error::StateChangeInProgress {
                    element: element.name().to_string(),
                });
            }
            let removed = children.remove(index);
            removed.inner.core.clear_parent();
            removed
        };

        for pad in removed.inner.pad_inners() {
            if let Some(pad) = pad.resolved() {
                pad.unlink_peer();
            }
        }

        tracing::debug!(bin = %self.name(), element = %removed.name(), "removed element");
        self.inner.post(PipelineEvent::ElementRemoved {
            bin: self.name().to_string(),
            element: removed.name().to_string(),
        });
        Ok(())
    }

    /// Direct children, in the order they were added.
    pub fn children(&self) -> Vec<Element> {
        lock(&self.data().children).clone()
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        lock(&self.data().children).len()
    }

    /// Find a descendant by name, searching depth-first.
    pub fn by_name(&self, name: &str) -> Option<Element> {
        for child in self.children() {
            if child.name() == name {
                return Some(child);
            }
            if let Some(found) = child.as_bin().and_then(|bin| bin.by_name(name)) {
                return Some(found);
            }
        }
        None
    }
}

impl Deref for Bin {
    type Target = Element;

    fn deref(&self) -> &Element {
        &self.element
    }
}

impl AsRef<Element> for Bin {
    fn as_ref(&self) -> &Element {
        &self.element
    }
}

impl From<Bin> for Element {
    fn from(bin: Bin) -> Element {
        bin.element
    }
}

impl std::fmt::Debug for Bin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bin")
            .field("name", &self.name())
            .field("children", &self.child_count())
            .field("state", &self.current_state())
            .finish()
    }
}
