//! Dedicated state-change context of a pipeline.
//!
//! Every pipeline owns one worker thread that performs its state chains.
//! Requests are queued over a kanal channel, so the application thread (or a
//! streaming thread) never runs a pipeline-wide state change itself, and
//! continuations of asynchronous steps always resume on the same thread.

use crate::element::handle::ElementInner;
use crate::object::lock;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::thread::{self, JoinHandle, ThreadId};

/// Configuration for a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Capacity of the event bus.
    pub event_capacity: usize,
    /// Prefix of the worker thread's name (`"<prefix>:<pipeline name>"`).
    pub thread_name_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            event_capacity: 256,
            thread_name_prefix: "pipeline".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Set the event bus capacity.
    pub fn with_event_capacity(mut self, event_capacity: usize) -> Self {
        self.event_capacity = event_capacity;
        self
    }

    /// Set the worker thread name prefix.
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

/// Work items for the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    /// Move towards the most recently requested target.
    SetState,
    /// Resume a chain after an asynchronous step committed.
    Continue,
    /// Exit the worker.
    Shutdown,
}

/// The worker thread and its command queue.
pub(crate) struct StateExecutor {
    sender: kanal::Sender<Command>,
    receiver: Mutex<Option<kanal::Receiver<Command>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    thread_id: OnceLock<ThreadId>,
}

impl StateExecutor {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = kanal::unbounded();
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
            thread: Mutex::new(None),
            thread_id: OnceLock::new(),
        }
    }

    /// Spawn the worker for `pipeline`. The worker only holds a weak
    /// reference, so it never keeps the pipeline alive.
    pub(crate) fn start(&self, pipeline: &Arc<ElementInner>, config: &PipelineConfig) -> std::io::Result<()> {
        let Some(receiver) = lock(&self.receiver).take() else {
            return Ok(());
        };
        let weak = Arc::downgrade(pipeline);
        let handle = thread::Builder::new()
            .name(format!("{}:{}", config.thread_name_prefix, pipeline.name()))
            .spawn(move || run(weak, receiver))?;
        let _ = self.thread_id.set(handle.thread().id());
        *lock(&self.thread) = Some(handle);
        Ok(())
    }

    /// Whether the calling thread is the worker.
    pub(crate) fn is_current(&self) -> bool {
        self.thread_id
            .get()
            .is_some_and(|id| *id == thread::current().id())
    }

    /// Queue a command. Fails once the worker is gone.
    pub(crate) fn send(&self, command: Command) -> bool {
        self.sender.send(command).is_ok()
    }

    /// Stop the worker and wait for it, unless called from the worker.
    pub(crate) fn shutdown(&self) {
        let _ = self.sender.send(Command::Shutdown);
        let handle = lock(&self.thread).take();
        if let Some(handle) = handle {
            if self.is_current() {
                return;
            }
            if handle.join().is_err() {
                tracing::error!("pipeline worker panicked");
            }
        }
    }
}

impl std::fmt::Debug for StateExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateExecutor")
            .field("running", &lock(&self.thread).is_some())
            .field("queued", &self.sender.len())
            .finish()
    }
}

fn run(weak: Weak<ElementInner>, commands: kanal::Receiver<Command>) {
    while let Ok(command) = commands.recv() {
        let Some(pipeline) = weak.upgrade() else {
            break;
        };
        let _span = tracing::debug_span!("pipeline", name = %pipeline.name()).entered();
        tracing::trace!(?command, "worker command");
        match command {
            Command::SetState => {
                let _ = pipeline.change_to(None);
            }
            Command::Continue => {
                let _ = pipeline.run_chain();
            }
            Command::Shutdown => break,
        }
    }
    tracing::trace!("pipeline worker exiting");
}
