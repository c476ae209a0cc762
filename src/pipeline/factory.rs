//! Element factory for creating elements by name.

use crate::element::Element;
use crate::elements::{FakeSink, FakeSrc, Identity};
use crate::error::{Error, Result};
use crate::object::lock;
use crate::pipeline::{Bin, Pipeline};
use std::collections::HashMap;
use std::sync::Mutex;

/// Type alias for element constructor functions.
///
/// The constructor receives the instance name.
pub type ElementConstructor = fn(&str) -> Result<Element>;

/// Registry of element constructors.
///
/// Elements made without an explicit name are called after the factory
/// with a per-factory counter: `fakesrc0`, `fakesrc1`, ...
pub struct ElementFactory {
    constructors: HashMap<String, ElementConstructor>,
    counters: Mutex<HashMap<String, u64>>,
}

impl ElementFactory {
    /// Create a new factory with built-in elements registered.
    pub fn new() -> Self {
        let mut factory = Self {
            constructors: HashMap::new(),
            counters: Mutex::new(HashMap::new()),
        };

        factory.register("fakesrc", create_fakesrc);
        factory.register("fakesink", create_fakesink);
        factory.register("identity", create_identity);
        factory.register("bin", create_bin);
        factory.register("pipeline", create_pipeline);

        factory
    }

    /// Register a custom element constructor.
    ///
    /// Replaces any constructor registered under the same name.
    pub fn register(&mut self, name: &str, constructor: ElementConstructor) {
        self.constructors.insert(name.to_string(), constructor);
    }

    /// Create an element, naming it automatically when `name` is `None`.
    pub fn make(&self, factory: &str, name: Option<&str>) -> Result<Element> {
        let constructor = self
            .constructors
            .get(factory)
            .ok_or_else(|| Error::UnknownFactory(factory.to_string()))?;

        let name = match name {
            Some(name) => name.to_string(),
            None => self.next_name(factory),
        };
        tracing::debug!(factory, %name, "making element");
        constructor(&name)
    }

    fn next_name(&self, factory: &str) -> String {
        let mut counters = lock(&self.counters);
        let counter = counters.entry(factory.to_string()).or_default();
        let name = format!("{factory}{counter}");
        *counter += 1;
        name
    }

    /// Check if an element type is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Names of all registered element types, sorted.
    pub fn list_elements(&self) -> Vec<String> {
        let mut names: Vec<_> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ElementFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ElementFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementFactory")
            .field("elements", &self.list_elements())
            .finish()
    }
}

fn create_fakesrc(name: &str) -> Result<Element> {
    Ok(Element::new_source(name, FakeSrc::new()))
}

fn create_fakesink(name: &str) -> Result<Element> {
    Ok(Element::new_sink(name, FakeSink::new()))
}

fn create_identity(name: &str) -> Result<Element> {
    Ok(Element::new_transform(name, Identity::new()))
}

fn create_bin(name: &str) -> Result<Element> {
    Ok(Bin::new(name).upcast())
}

fn create_pipeline(name: &str) -> Result<Element> {
    Ok(Pipeline::new(name)?.upcast())
}
