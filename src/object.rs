//! Shared-ownership bookkeeping for graph nodes.
//!
//! Every element and pad carries an explicit ownership count, separate from
//! the `Arc` that keeps its memory alive. The count is the number of owners:
//! user handles plus parent edges (a bin holding a child, an element holding a
//! pad). Internal machinery such as streaming threads or the pipeline worker
//! holds the memory through `Arc` clones without owning the node, so the count
//! stays exactly what the user and the graph can observe:
//!
//! ```text
//! let src = Element::new_source("src", FakeSrc::new());   // count 1
//! bin.add(&src)?;                                           // count 2
//! drop(bin);                                                // count 1
//! ```
//!
//! When the count reaches zero the node is disposed: children and pads are
//! released in a deterministic order, links are cleared and streaming stops.

use crate::element::Element;
use crate::element::handle::ElementInner;
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Serializes graph mutations (links, parent edges, pad sets).
///
/// Held only for the duration of a single mutation, never across a state
/// change or a push.
static GRAPH_LOCK: Mutex<()> = Mutex::new(());

/// Take the graph mutation lock.
pub(crate) fn graph_lock() -> MutexGuard<'static, ()> {
    lock(&GRAPH_LOCK)
}

/// Lock a mutex, recovering the guard if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Common state of every graph node.
pub(crate) struct ObjectCore {
    name: String,
    refcount: AtomicUsize,
    disposed: AtomicBool,
    parent: Mutex<Weak<ElementInner>>,
}

impl ObjectCore {
    /// A fresh core, owned by exactly one handle.
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            refcount: AtomicUsize::new(1),
            disposed: AtomicBool::new(false),
            parent: Mutex::new(Weak::new()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn ref_count(&self) -> usize {
        self.refcount.load(Ordering::Acquire)
    }

    /// Add an owner.
    pub(crate) fn acquire(&self) {
        self.refcount.fetch_add(1, Ordering::AcqRel);
    }

    /// Add an owner only if the node still has one (weak upgrade).
    pub(crate) fn try_acquire(&self) -> bool {
        let mut current = self.refcount.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return false;
            }
            match self.refcount.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Drop an owner. Returns `true` exactly once, when the last owner is gone
    /// and the node must be disposed.
    pub(crate) fn release(&self) -> bool {
        if self.refcount.fetch_sub(1, Ordering::AcqRel) == 1 {
            !self.disposed.swap(true, Ordering::AcqRel)
        } else {
            false
        }
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub(crate) fn parent(&self) -> Option<Arc<ElementInner>> {
        lock(&self.parent).upgrade()
    }

    pub(crate) fn has_parent(&self) -> bool {
        lock(&self.parent).strong_count() > 0
    }

    /// Record `parent` as this node's parent. Fails if another live parent is set.
    pub(crate) fn set_parent(&self, parent: &Arc<ElementInner>) -> Result<()> {
        let mut slot = lock(&self.parent);
        if let Some(existing) = slot.upgrade() {
            return Err(Error::AlreadyHasParent {
                object: self.name.clone(),
                parent: existing.name().to_string(),
            });
        }
        *slot = Arc::downgrade(parent);
        Ok(())
    }

    /// Set the parent of a node created by that parent.
    pub(crate) fn adopt(&self, parent: &Arc<ElementInner>) {
        *lock(&self.parent) = Arc::downgrade(parent);
    }

    pub(crate) fn clear_parent(&self) {
        *lock(&self.parent) = Weak::new();
    }
}

/// Identity and ownership queries shared by elements and pads.
pub trait ObjectExt {
    /// The object's name.
    fn name(&self) -> &str;

    /// Current shared-ownership count (handles plus parent edges).
    fn ref_count(&self) -> usize;

    /// The parent element, if any.
    fn parent(&self) -> Option<Element>;

    /// Whether the object currently has a parent.
    fn has_parent(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_release_cycle() {
        let core = ObjectCore::new("node");
        assert_eq!(core.ref_count(), 1);

        core.acquire();
        assert_eq!(core.ref_count(), 2);
        assert!(!core.release());
        assert!(core.release());
        assert!(core.is_disposed());
    }

    #[test]
    fn test_try_acquire_fails_after_last_release() {
        let core = ObjectCore::new("node");
        assert!(core.try_acquire());
        assert!(!core.release());
        assert!(core.release());
        assert!(!core.try_acquire());
        assert_eq!(core.ref_count(), 0);
    }

    #[test]
    fn test_dispose_reported_once() {
        let core = ObjectCore::new("node");
        assert!(core.release());
        // Resurrected by an internal handle and released again.
        core.acquire();
        assert!(!core.release());
    }
}
