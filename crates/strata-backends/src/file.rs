//! Configuration file backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value as Json;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use strata_core::{Backend, BackendError, BackendResult, FieldSet, Unmarshaler};

/// Whole-record population from a parsed configuration file.
///
/// The file is read and parsed once, on first use, and the parsed
/// document is cached for the lifetime of the backend. The backend name
/// is the file extension, so a field can be pinned to a format with e.g.
/// `backend=json`.
///
/// JSON is always available; YAML and TOML are enabled by the
/// `yaml-config` / `toml-config` features. All formats are normalized
/// into one document shape, and scalars are rendered back to the loader's
/// textual grammar (arrays become comma-separated lists).
pub struct FileBackend {
    path: PathBuf,
    name: String,
    document: OnceCell<serde_json::Map<String, Json>>,
}

impl FileBackend {
    /// Creates a file backend for `path`.
    ///
    /// The file is not touched until the first load that consults this
    /// backend; a missing or malformed file surfaces as a backend error
    /// at that point, not as "key not found".
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("file")
            .to_string();
        Self {
            path,
            name,
            document: OnceCell::new(),
        }
    }

    async fn document(&self) -> BackendResult<&serde_json::Map<String, Json>> {
        self.document
            .get_or_try_init(|| async {
                debug!(path = %self.path.display(), "loading configuration file");
                parse_file(&self.path).await
            })
            .await
    }

    fn render_required(&self, key: &str, value: &Json) -> BackendResult<String> {
        render(value).ok_or_else(|| {
            BackendError::other(format!(
                "key '{key}' in {} is not a scalar or list of scalars",
                self.path.display()
            ))
        })
    }
}

#[async_trait]
impl Unmarshaler for FileBackend {
    async fn unmarshal(
        &self,
        cancel: &CancellationToken,
        fields: &mut FieldSet<'_>,
    ) -> BackendResult<()> {
        if cancel.is_cancelled() {
            return Err(BackendError::Canceled);
        }

        let document = self.document().await?;
        for field in fields.iter_mut() {
            if !field.is_eligible() {
                continue;
            }
            let Some(value) = document.get(field.key()) else {
                // Left for later backends.
                continue;
            };
            let text = self.render_required(field.key(), value)?;
            field.write(&text)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for FileBackend {
    fn name(&self) -> &str {
        &self.name
    }

    /// Keyed lookup against the parsed document. The whole-record
    /// capability below is what the engine normally uses; this is for
    /// callers poking at a file directly.
    async fn get(&self, _cancel: &CancellationToken, key: &str) -> BackendResult<Vec<u8>> {
        let document = self.document().await?;
        let value = document.get(key).ok_or(BackendError::NotFound)?;
        Ok(self.render_required(key, value)?.into_bytes())
    }

    fn as_unmarshaler(&self) -> Option<&dyn Unmarshaler> {
        Some(self)
    }
}

async fn parse_file(path: &Path) -> BackendResult<serde_json::Map<String, Json>> {
    let bytes = tokio::fs::read(path).await.map_err(BackendError::other)?;
    let ext = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

    let value: Json = match ext {
        "json" => serde_json::from_slice(&bytes).map_err(BackendError::other)?,
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => serde_yaml::from_slice(&bytes).map_err(BackendError::other)?,
        #[cfg(feature = "toml-config")]
        "toml" => {
            let text = std::str::from_utf8(&bytes).map_err(BackendError::other)?;
            toml::from_str(text).map_err(BackendError::other)?
        }
        other => {
            return Err(BackendError::other(format!(
                "unsupported or disabled configuration file format: .{other}"
            )));
        }
    };

    match value {
        Json::Object(map) => Ok(map),
        _ => Err(BackendError::other(format!(
            "configuration file {} is not a key-value document",
            path.display()
        ))),
    }
}

/// Renders a document value as the loader's textual grammar.
fn render(value: &Json) -> Option<String> {
    match value {
        Json::Array(items) => {
            let parts: Option<Vec<_>> = items.iter().map(render_scalar).collect();
            parts.map(|parts| parts.join(","))
        }
        other => render_scalar(other),
    }
}

fn render_scalar(value: &Json) -> Option<String> {
    match value {
        Json::String(text) => Some(text.clone()),
        Json::Bool(flag) => Some(flag.to_string()),
        Json::Number(number) => Some(number.to_string()),
        Json::Null | Json::Array(_) | Json::Object(_) => None,
    }
}
