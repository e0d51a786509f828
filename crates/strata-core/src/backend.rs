//! Backend capability contract: the three tiers a value source may offer.
//!
//! Every backend answers keyed lookups (Tier 1). Backends whose natural
//! source is a whole parsed document implement [`Unmarshaler`] on top;
//! backends that must see the introspected schema before they can produce
//! anything, such as command-line flags, implement [`SchemaLoader`]. The
//! engine discovers the richer capabilities through the `as_*` accessors
//! and always uses the richest one a backend offers.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::BackendResult;
use crate::schema::FieldSet;

/// A pluggable source of configuration values.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Stable name used for field pinning and diagnostics.
    fn name(&self) -> &str;

    /// Fetches the raw value stored under `key`.
    ///
    /// Returns [`BackendError::NotFound`](crate::BackendError::NotFound)
    /// when the backend holds no value for the key; the engine then falls
    /// through to the next backend in order. Must be safe to call
    /// concurrently.
    async fn get(&self, cancel: &CancellationToken, key: &str) -> BackendResult<Vec<u8>>;

    /// The whole-record capability, when implemented.
    fn as_unmarshaler(&self) -> Option<&dyn Unmarshaler> {
        None
    }

    /// The schema-aware capability, when implemented.
    fn as_schema_loader(&self) -> Option<&dyn SchemaLoader> {
        None
    }
}

/// Whole-record population.
///
/// The backend receives the introspected field set once per load and
/// writes every key it can answer through
/// [`FieldDescriptor::write`](crate::FieldDescriptor::write). Fields the
/// backend has no value for are left alone for later backends; returning
/// [`BackendError::NotFound`](crate::BackendError::NotFound) means the
/// backend had nothing at all.
#[async_trait]
pub trait Unmarshaler: Send + Sync {
    /// Populates every field this backend has a value for.
    async fn unmarshal(
        &self,
        cancel: &CancellationToken,
        fields: &mut FieldSet<'_>,
    ) -> BackendResult<()>;
}

/// Schema-aware population.
///
/// The backend receives the full descriptor list, including required and
/// pin metadata, and owns its subset: it must skip descriptors pinned to
/// another backend, which [`FieldDescriptor::is_eligible`](crate::FieldDescriptor::is_eligible)
/// already accounts for.
#[async_trait]
pub trait SchemaLoader: Send + Sync {
    /// Defines and resolves whatever the backend needs from the schema.
    async fn load_fields(
        &self,
        cancel: &CancellationToken,
        fields: &mut FieldSet<'_>,
    ) -> BackendResult<()>;
}

/// A boxed, shareable backend.
pub type BoxedBackend = Arc<dyn Backend>;

// =============================================================================
// Function Adapter
// =============================================================================

/// Creates a Tier-1 backend from an async lookup function.
///
/// Useful for tests and one-off sources:
///
/// ```rust,ignore
/// let backend = strata_core::backend::func("fixed", |key| async move {
///     match key.as_str() {
///         "port" => Ok(b"8080".to_vec()),
///         _ => Err(BackendError::NotFound),
///     }
/// });
/// ```
pub fn func<F, Fut>(name: impl Into<String>, lookup: F) -> Func<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = BackendResult<Vec<u8>>> + Send,
{
    Func {
        name: name.into(),
        lookup,
    }
}

/// A backend backed by a lookup function. See [`func`].
pub struct Func<F> {
    name: String,
    lookup: F,
}

#[async_trait]
impl<F, Fut> Backend for Func<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = BackendResult<Vec<u8>>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, _cancel: &CancellationToken, key: &str) -> BackendResult<Vec<u8>> {
        (self.lookup)(key.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;

    #[tokio::test]
    async fn test_func_backend() {
        let backend = func("fixed", |key| async move {
            match key.as_str() {
                "port" => Ok(b"8080".to_vec()),
                _ => Err(BackendError::NotFound),
            }
        });

        assert_eq!(backend.name(), "fixed");

        let cancel = CancellationToken::new();
        assert_eq!(backend.get(&cancel, "port").await.unwrap(), b"8080");
        assert!(matches!(
            backend.get(&cancel, "missing").await,
            Err(BackendError::NotFound)
        ));
    }
}
