//! In-memory map backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use strata_core::{Backend, BackendError, BackendResult};

/// Keyed lookup against an in-memory string map.
///
/// Useful for programmatic defaults placed at the end of the backend
/// list, and as a test double. The name is configurable so several maps
/// can coexist and be pinned to individually.
///
/// ```rust,ignore
/// let defaults = MapBackend::new()
///     .set("port", "8080")
///     .set("timeout", "30s");
/// ```
#[derive(Debug, Clone)]
pub struct MapBackend {
    name: String,
    values: HashMap<String, String>,
}

impl MapBackend {
    /// Creates an empty map backend named `map`.
    pub fn new() -> Self {
        Self::named("map")
    }

    /// Creates an empty map backend with a custom name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: HashMap::new(),
        }
    }

    /// Adds a value for `key`, replacing any previous one.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl Default for MapBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MapBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, _cancel: &CancellationToken, key: &str) -> BackendResult<Vec<u8>> {
        self.values
            .get(key)
            .map(|value| value.clone().into_bytes())
            .ok_or(BackendError::NotFound)
    }
}
