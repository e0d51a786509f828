//! Environment variable backend.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use strata_core::{Backend, BackendError, BackendResult};

/// Keyed lookup against the process environment.
///
/// The key is looked up verbatim first, then retried case-folded the way
/// environment variables are conventionally spelled: uppercased, with `-`
/// replaced by `_`. A field annotated `config:"listen-addr"` therefore
/// also matches `LISTEN_ADDR`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvBackend;

impl EnvBackend {
    /// Creates an environment backend.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Backend for EnvBackend {
    fn name(&self) -> &str {
        "env"
    }

    async fn get(&self, _cancel: &CancellationToken, key: &str) -> BackendResult<Vec<u8>> {
        if let Ok(value) = std::env::var(key) {
            return Ok(value.into_bytes());
        }

        let folded = key.to_uppercase().replace('-', "_");
        match std::env::var(&folded) {
            Ok(value) => Ok(value.into_bytes()),
            Err(_) => Err(BackendError::NotFound),
        }
    }
}
