//! Buffer probes.
//!
//! A probe is a callback attached to a pad that runs synchronously, on the
//! thread moving data through the pad, right before a buffer is handed to the
//! peer. Probes may inspect the buffer, drop it, or mutate the graph (add
//! elements, relink, change states) before returning.
//!
//! Invocation works on a snapshot of the registered probes, so a probe can
//! remove itself (or any other probe) from inside its callback without
//! disturbing the invocation in progress. A probe that panics is caught at the
//! invocation boundary, logged and removed; the buffer keeps flowing.

use crate::buffer::Buffer;
use crate::element::Pad;
use crate::object::lock;
use smallvec::SmallVec;
use std::num::NonZeroU64;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Identifier of a probe, unique per pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProbeId(NonZeroU64);

impl ProbeId {
    /// Raw numeric value.
    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

/// What a probe wants done with the buffer it saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeReturn {
    /// Forward the buffer.
    #[default]
    Ok,
    /// Drop the buffer; the push succeeds without reaching the peer.
    Drop,
    /// Forward the buffer and remove this probe.
    Remove,
}

/// Outcome of running all probes of a pad for one buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProbeVerdict {
    Pass,
    Drop,
}

/// Probe callback signature.
pub type ProbeCallback = dyn Fn(&Pad, &Buffer) -> ProbeReturn + Send + Sync;

struct ProbeEntry {
    id: ProbeId,
    callback: Box<ProbeCallback>,
    removed: AtomicBool,
}

/// Ordered probe registry of a single pad.
pub(crate) struct ProbeList {
    next_id: AtomicU64,
    entries: Mutex<SmallVec<[Arc<ProbeEntry>; 2]>>,
}

impl ProbeList {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(SmallVec::new()),
        }
    }

    pub(crate) fn add(&self, callback: Box<ProbeCallback>) -> ProbeId {
        let raw = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = ProbeId(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN));
        lock(&self.entries).push(Arc::new(ProbeEntry {
            id,
            callback,
            removed: AtomicBool::new(false),
        }));
        id
    }

    /// Remove a probe. Returns `false` if the id is unknown.
    pub(crate) fn remove(&self, id: ProbeId) -> bool {
        let mut entries = lock(&self.entries);
        match entries.iter().position(|entry| entry.id == id) {
            Some(index) => {
                let entry = entries.remove(index);
                entry.removed.store(true, Ordering::Release);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&self) {
        let drained: SmallVec<[Arc<ProbeEntry>; 2]> = lock(&self.entries).drain(..).collect();
        for entry in &drained {
            entry.removed.store(true, Ordering::Release);
        }
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every probe, in registration order, for `buffer` passing `pad`.
    pub(crate) fn invoke(&self, pad: &Pad, buffer: &Buffer) -> ProbeVerdict {
        let snapshot: SmallVec<[Arc<ProbeEntry>; 2]> = lock(&self.entries).clone();

        for entry in snapshot {
            // Removed by an earlier probe during this invocation.
            if entry.removed.load(Ordering::Acquire) {
                continue;
            }

            tracing::trace!(pad = %pad_name(pad), probe = entry.id.get(), "invoking buffer probe");
            match catch_unwind(AssertUnwindSafe(|| (entry.callback)(pad, buffer))) {
                Ok(ProbeReturn::Ok) => {}
                Ok(ProbeReturn::Drop) => return ProbeVerdict::Drop,
                Ok(ProbeReturn::Remove) => {
                    self.remove(entry.id);
                }
                Err(_) => {
                    tracing::error!(
                        pad = %pad_name(pad),
                        probe = entry.id.get(),
                        "buffer probe panicked, removing it"
                    );
                    self.remove(entry.id);
                }
            }
        }

        ProbeVerdict::Pass
    }
}

fn pad_name(pad: &Pad) -> &str {
    crate::object::ObjectExt::name(pad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::PadDirection;
    use std::sync::atomic::AtomicUsize;

    fn counting_probe(counter: &Arc<AtomicUsize>, ret: ProbeReturn) -> Box<ProbeCallback> {
        let counter = counter.clone();
        Box::new(move |_pad, _buffer| {
            counter.fetch_add(1, Ordering::SeqCst);
            ret
        })
    }

    #[test]
    fn test_ids_are_unique() {
        let probes = ProbeList::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let a = probes.add(counting_probe(&counter, ProbeReturn::Ok));
        let b = probes.add(counting_probe(&counter, ProbeReturn::Ok));
        assert_ne!(a, b);
        assert_eq!(probes.len(), 2);
        assert!(probes.remove(a));
        assert!(!probes.remove(a));
        assert_eq!(probes.len(), 1);
    }

    #[test]
    fn test_drop_stops_remaining_probes() {
        let pad = Pad::new("src", PadDirection::Src);
        let probes = ProbeList::new();
        let counter = Arc::new(AtomicUsize::new(0));
        probes.add(counting_probe(&counter, ProbeReturn::Drop));
        probes.add(counting_probe(&counter, ProbeReturn::Ok));

        assert_eq!(probes.invoke(&pad, &Buffer::empty(0)), ProbeVerdict::Drop);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_return_detaches_probe() {
        let pad = Pad::new("src", PadDirection::Src);
        let probes = ProbeList::new();
        let counter = Arc::new(AtomicUsize::new(0));
        probes.add(counting_probe(&counter, ProbeReturn::Remove));

        assert_eq!(probes.invoke(&pad, &Buffer::empty(0)), ProbeVerdict::Pass);
        assert_eq!(probes.invoke(&pad, &Buffer::empty(1)), ProbeVerdict::Pass);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(probes.is_empty());
    }

    #[test]
    fn test_panicking_probe_is_disabled() {
        let pad = Pad::new("src", PadDirection::Src);
        let probes = ProbeList::new();
        let counter = Arc::new(AtomicUsize::new(0));
        probes.add(Box::new(|_pad, _buffer| panic!("faulty probe")));
        probes.add(counting_probe(&counter, ProbeReturn::Ok));

        assert_eq!(probes.invoke(&pad, &Buffer::empty(0)), ProbeVerdict::Pass);
        assert_eq!(probes.invoke(&pad, &Buffer::empty(1)), ProbeVerdict::Pass);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(probes.len(), 1);
    }

    #[test]
    fn test_probe_removed_by_earlier_probe_is_skipped() {
        let pad = Pad::new("src", PadDirection::Src);
        let probes = Arc::new(ProbeList::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let victim = Arc::new(Mutex::new(None::<ProbeId>));

        let list = Arc::downgrade(&probes);
        let target = victim.clone();
        probes.add(Box::new(move |_pad, _buffer| {
            if let (Some(id), Some(list)) = (*lock(&target), list.upgrade()) {
                list.remove(id);
            }
            ProbeReturn::Ok
        }));
        let id = probes.add(counting_probe(&counter, ProbeReturn::Ok));
        *lock(&victim) = Some(id);

        probes.invoke(&pad, &Buffer::empty(0));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(probes.len(), 1);
    }
}
