//! Pipeline event bus.
//!
//! Elements post events to the nearest enclosing pipeline, which fans them
//! out to every subscriber. Events are posted from whatever thread produced
//! them: the pipeline worker, a streaming thread or an element's helper
//! thread.

use crate::element::State;
use std::fmt;
use tokio::sync::broadcast;

/// Events emitted by elements of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// An element completed a state step.
    StateChanged {
        /// The element that changed state.
        element: String,
        /// Previous state.
        old: State,
        /// New state.
        new: State,
        /// Final state the element is still heading for, or `VoidPending`.
        pending: State,
    },

    /// An element committed a step that previously returned `Async`.
    AsyncDone {
        /// The element that committed.
        element: String,
    },

    /// A source ran out of data.
    Eos {
        /// The source element.
        element: String,
    },

    /// An error occurred.
    Error {
        /// The element where the error occurred.
        element: String,
        /// The error message.
        message: String,
    },

    /// Warning (non-fatal issue).
    Warning {
        /// The element that emitted the warning.
        element: String,
        /// The warning message.
        message: String,
    },

    /// An element was added to a bin.
    ElementAdded {
        /// The bin.
        bin: String,
        /// The added element.
        element: String,
    },

    /// An element was removed from a bin.
    ElementRemoved {
        /// The bin.
        bin: String,
        /// The removed element.
        element: String,
    },
}

impl PipelineEvent {
    /// Name of the element the event concerns.
    pub fn element(&self) -> &str {
        match self {
            PipelineEvent::StateChanged { element, .. }
            | PipelineEvent::AsyncDone { element }
            | PipelineEvent::Eos { element }
            | PipelineEvent::Error { element, .. }
            | PipelineEvent::Warning { element, .. }
            | PipelineEvent::ElementAdded { element, .. }
            | PipelineEvent::ElementRemoved { element, .. } => element,
        }
    }
}

impl fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineEvent::StateChanged {
                element,
                old,
                new,
                pending,
            } => {
                write!(f, "{element}: state changed {old} -> {new} (pending {pending})")
            }
            PipelineEvent::AsyncDone { element } => write!(f, "{element}: async done"),
            PipelineEvent::Eos { element } => write!(f, "{element}: EOS"),
            PipelineEvent::Error { element, message } => write!(f, "Error in {element}: {message}"),
            PipelineEvent::Warning { element, message } => {
                write!(f, "Warning in {element}: {message}")
            }
            PipelineEvent::ElementAdded { bin, element } => write!(f, "{bin}: added {element}"),
            PipelineEvent::ElementRemoved { bin, element } => {
                write!(f, "{bin}: removed {element}")
            }
        }
    }
}

/// Sender side of a pipeline's bus.
#[derive(Clone)]
pub struct EventSender {
    sender: broadcast::Sender<PipelineEvent>,
}

impl EventSender {
    /// Create a new event sender with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Send an event.
    ///
    /// Returns the number of receivers that received the event; 0 when
    /// nobody listens, which is fine.
    pub fn send(&self, event: PipelineEvent) -> usize {
        tracing::trace!(%event, "posting event");
        self.sender.send(event).unwrap_or(0)
    }

    /// Create a receiver for events posted from now on.
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for EventSender {
    fn default() -> Self {
        Self::new(256)
    }
}

impl fmt::Debug for EventSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSender")
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}

/// Receiver for pipeline events.
///
/// A receiver that falls behind by more than the bus capacity skips the
/// oldest events.
pub struct EventReceiver {
    receiver: broadcast::Receiver<PipelineEvent>,
}

impl EventReceiver {
    /// Receive the next event.
    ///
    /// Returns `None` once the pipeline is gone.
    pub async fn recv(&mut self) -> Option<PipelineEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receive the next event, blocking the calling thread.
    ///
    /// Must not be called from inside an async runtime.
    pub fn recv_blocking(&mut self) -> Option<PipelineEvent> {
        loop {
            match self.receiver.blocking_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive an event without blocking.
    ///
    /// Returns `None` if no event is available or the pipeline is gone.
    pub fn try_recv(&mut self) -> Option<PipelineEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Take every event that is already queued.
    pub fn drain(&mut self) -> Vec<PipelineEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Wait for EOS or an error.
    ///
    /// Returns `Ok(element)` with the source that finished, `Err(message)` on
    /// error.
    pub async fn wait_eos(&mut self) -> Result<String, String> {
        while let Some(event) = self.recv().await {
            match event {
                PipelineEvent::Eos { element } => return Ok(element),
                PipelineEvent::Error { element, message } => {
                    return Err(format!("Error in {element}: {message}"));
                }
                _ => continue,
            }
        }
        Err("event bus closed".to_string())
    }
}

impl fmt::Debug for EventReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventReceiver")
            .field("queued", &self.receiver.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_send_recv() {
        let sender = EventSender::new(16);
        let mut receiver = sender.subscribe();

        sender.send(PipelineEvent::Eos {
            element: "src".into(),
        });

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.element(), "src");
    }

    #[tokio::test]
    async fn test_multiple_receivers() {
        let sender = EventSender::new(16);
        let mut receiver1 = sender.subscribe();
        let mut receiver2 = sender.subscribe();

        sender.send(PipelineEvent::StateChanged {
            element: "pipeline".into(),
            old: State::Null,
            new: State::Ready,
            pending: State::Playing,
        });

        let e1 = receiver1.recv().await.unwrap();
        let e2 = receiver2.recv().await.unwrap();
        assert_eq!(e1, e2);
    }

    #[tokio::test]
    async fn test_wait_eos() {
        let sender = EventSender::new(16);
        let mut receiver = sender.subscribe();

        let sender_clone = sender.clone();
        tokio::spawn(async move {
            sender_clone.send(PipelineEvent::AsyncDone {
                element: "sink".into(),
            });
            sender_clone.send(PipelineEvent::Eos {
                element: "src".into(),
            });
        });

        assert_eq!(receiver.wait_eos().await.unwrap(), "src");
    }

    #[tokio::test]
    async fn test_wait_eos_reports_error() {
        let sender = EventSender::new(16);
        let mut receiver = sender.subscribe();

        sender.send(PipelineEvent::Error {
            element: "sink".into(),
            message: "boom".into(),
        });

        let err = receiver.wait_eos().await.unwrap_err();
        assert!(err.contains("sink"));
    }

    #[test]
    fn test_drain_without_receivers_sent() {
        let sender = EventSender::new(4);
        assert_eq!(
            sender.send(PipelineEvent::Eos {
                element: "src".into()
            }),
            0
        );

        let mut receiver = sender.subscribe();
        assert!(receiver.drain().is_empty());
    }

    #[test]
    fn test_display() {
        let event = PipelineEvent::ElementAdded {
            bin: "bin0".into(),
            element: "fakesrc0".into(),
        };
        assert_eq!(event.to_string(), "bin0: added fakesrc0");
    }
}
