//! Streaming threads for source elements.

use crate::element::handle::ElementInner;
use crate::element::pad::PadInner;
use crate::error::FlowError;
use crate::pipeline::events::PipelineEvent;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// A running streaming thread.
///
/// The thread pulls buffers from the source and pushes them out of its
/// source pad until it is stopped, the source runs dry or the flow fails.
/// It keeps the pad's memory alive but is not one of its owners.
#[derive(Debug)]
pub(crate) struct Task {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Task {
    pub(crate) fn spawn(element: &Arc<ElementInner>, pad: Arc<PadInner>) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = thread::Builder::new()
            .name(format!("{}:{}", element.name(), pad.core.name()))
            .spawn({
                let element = element.clone();
                let stop = stop.clone();
                move || stream(element, pad, stop)
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it, unless called from the thread itself.
    pub(crate) fn stop(mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                tracing::error!("streaming thread panicked");
            }
        }
    }
}

fn stream(element: Arc<ElementInner>, pad: Arc<PadInner>, stop: Arc<AtomicBool>) {
    let _span = tracing::debug_span!("streaming", element = %element.name()).entered();
    tracing::debug!("streaming started");

    while !stop.load(Ordering::Acquire) {
        let buffer = match element.produce() {
            Ok(Some(buffer)) => buffer,
            Ok(None) => {
                tracing::debug!("end of stream");
                element.post(PipelineEvent::Eos {
                    element: element.name().to_string(),
                });
                break;
            }
            Err(err) => {
                tracing::error!(%err, "source failed");
                element.post(PipelineEvent::Error {
                    element: element.name().to_string(),
                    message: err.to_string(),
                });
                break;
            }
        };

        match pad.push(buffer) {
            Ok(()) => {}
            Err(FlowError::Flushing) if stop.load(Ordering::Acquire) => break,
            Err(FlowError::Eos) => {
                element.post(PipelineEvent::Eos {
                    element: element.name().to_string(),
                });
                break;
            }
            Err(err) => {
                tracing::warn!(%err, "streaming stopped");
                element.post(PipelineEvent::Error {
                    element: element.name().to_string(),
                    message: format!("internal data flow error: {err}"),
                });
                break;
            }
        }
    }

    tracing::debug!("streaming stopped");
}
