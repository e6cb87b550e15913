//! Backend registry.
//!
//! A fixed mapping from [`GenerationMethod`] to the backend serving it,
//! assembled once by the builder and read-only afterwards. Registering a
//! second backend under the same method replaces the first.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::traits::Backend;
use crate::types::GenerationMethod;

#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<GenerationMethod, Arc<dyn Backend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its own [`Backend::method`].
    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        let method = backend.method();
        debug!(%method, name = backend.name(), "registered backend");
        if self.backends.insert(method, backend).is_some() {
            debug!(%method, "replaced previously registered backend");
        }
    }

    pub fn get(&self, method: GenerationMethod) -> Option<Arc<dyn Backend>> {
        self.backends.get(&method).cloned()
    }

    pub fn contains(&self, method: GenerationMethod) -> bool {
        self.backends.contains_key(&method)
    }

    /// Registered methods, in [`GenerationMethod::ALL`] order.
    pub fn methods(&self) -> Vec<GenerationMethod> {
        GenerationMethod::ALL
            .into_iter()
            .filter(|m| self.backends.contains_key(m))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("methods", &self.methods())
            .finish()
    }
}
