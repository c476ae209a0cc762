//! Element runtime context.
//!
//! The context is handed to element implementations on every state change. It
//! lets them reach back to the element they implement without owning it: to
//! commit a step that returned `Async`, or to post events to the pipeline.

use crate::element::handle::{Element, ElementInner};
use crate::element::state::StateChangeReturn;
use crate::pipeline::events::PipelineEvent;
use std::sync::{Arc, Weak};

/// Runtime context for an element.
///
/// Cheap to clone and `Send`, so it can be moved to a helper thread that
/// completes an asynchronous state change later.
#[derive(Clone)]
pub struct ElementContext {
    /// Name of this element instance.
    name: String,
    element: Weak<ElementInner>,
}

impl ElementContext {
    pub(crate) fn new(element: &Arc<ElementInner>) -> Self {
        Self {
            name: element.name().to_string(),
            element: Arc::downgrade(element),
        }
    }

    /// Get the element's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A handle to the element, unless it has been disposed.
    pub fn element(&self) -> Option<Element> {
        self.element.upgrade().and_then(Element::try_from_inner)
    }

    /// Complete the step that returned `Async`.
    ///
    /// Committing `Success` or `NoPreroll` resumes the state chain towards the
    /// newest requested state; `Failure` aborts it.
    pub fn commit_state(&self, ret: StateChangeReturn) {
        match self.element.upgrade() {
            Some(element) if !element.core.is_disposed() => element.commit_state(ret),
            _ => tracing::debug!(element = %self.name, "commit after dispose ignored"),
        }
    }

    /// Post an error event to the enclosing pipeline.
    pub fn post_error(&self, message: impl Into<String>) {
        self.post(PipelineEvent::Error {
            element: self.name.clone(),
            message: message.into(),
        });
    }

    /// Post a warning event to the enclosing pipeline.
    pub fn post_warning(&self, message: impl Into<String>) {
        self.post(PipelineEvent::Warning {
            element: self.name.clone(),
            message: message.into(),
        });
    }

    fn post(&self, event: PipelineEvent) {
        if let Some(element) = self.element.upgrade() {
            element.post(event);
        }
    }
}

impl std::fmt::Debug for ElementContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementContext")
            .field("name", &self.name)
            .field("alive", &(self.element.strong_count() > 0))
            .finish()
    }
}
