//! The resolution engine: orchestrates backends over an introspected record.

use std::sync::Arc;

use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::backend::{Backend, BoxedBackend};
use crate::error::{BackendError, CoerceError, LoadError, LoadResult};
use crate::record::Record;
use crate::schema::{DEFAULT_TAG, FieldSet, introspect};

/// Resolves typed configuration values from an ordered list of backends.
///
/// Backend order is precedence order: the first backend to supply a value
/// for a field wins, and later backends are never consulted for it. A
/// field pinned with `backend=<name>` is only ever offered to that
/// backend, regardless of its position.
///
/// There is no implicit default source: a loader starts with an empty
/// backend list and only consults what the caller configured.
///
/// A `Loader` holds no per-load state and may be shared across concurrent
/// [`load`](Loader::load) calls; the destination record is the only
/// mutable state, and it is owned by each caller.
///
/// # Example
///
/// ```rust,ignore
/// let loader = Loader::new()
///     .backend(FlagsBackend::new())
///     .backend(EnvBackend)
///     .backend(FileBackend::new("app.json"));
///
/// let mut settings = Settings::default();
/// loader.load(&CancellationToken::new(), &mut settings).await?;
/// ```
pub struct Loader {
    backends: Vec<BoxedBackend>,
    tag: String,
}

impl Loader {
    /// Creates a loader with no backends configured.
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
            tag: DEFAULT_TAG.to_string(),
        }
    }

    /// Appends a backend; earlier backends take precedence.
    pub fn backend(mut self, backend: impl Backend + 'static) -> Self {
        self.backends.push(Arc::new(backend));
        self
    }

    /// Appends an already-shared backend.
    pub fn backend_arc(mut self, backend: BoxedBackend) -> Self {
        self.backends.push(backend);
        self
    }

    /// Overrides the annotation tag read from records (default `config`).
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Names of the configured backends, in precedence order.
    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Resolves every configurable field of `record`.
    ///
    /// Backends are consulted in configured order; for each field the
    /// first backend that produces a value wins. Required fields that end
    /// up neither written by a backend nor holding a caller-set non-zero
    /// default fail the call.
    ///
    /// On failure the record is left partially populated: fields written
    /// before the failing step keep their new values, there is no
    /// rollback.
    pub async fn load(&self, cancel: &CancellationToken, record: &mut dyn Record) -> LoadResult<()> {
        if cancel.is_cancelled() {
            return Err(LoadError::Canceled);
        }

        let mut fields = introspect(record, &self.tag);
        debug!(
            fields = fields.len(),
            backends = self.backends.len(),
            "resolving record"
        );

        // Pins are validated before any backend I/O happens, so a typo in
        // a pin never leaves the record half-written.
        for field in fields.iter() {
            if let Some(pin) = field.pinned_to() {
                if !self.backends.iter().any(|b| b.name() == pin) {
                    return Err(LoadError::UnknownBackend {
                        field: field.name().to_string(),
                        backend: pin.to_string(),
                    });
                }
            }
        }

        for backend in &self.backends {
            if cancel.is_cancelled() {
                return Err(LoadError::Canceled);
            }
            fields.begin_round(backend.name());
            run_round(cancel, backend, &mut fields).await?;
        }

        for field in fields.iter() {
            if field.required() && !field.is_satisfied() && field.holds_zero() {
                return Err(LoadError::MissingRequired {
                    field: field.name().to_string(),
                    key: field.key().to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs one backend round through the richest capability the backend
/// offers.
async fn run_round(
    cancel: &CancellationToken,
    backend: &BoxedBackend,
    fields: &mut FieldSet<'_>,
) -> LoadResult<()> {
    if let Some(schema_loader) = backend.as_schema_loader() {
        trace!(backend = backend.name(), "schema-aware round");
        return match schema_loader.load_fields(cancel, fields).await {
            Ok(()) | Err(BackendError::NotFound) => Ok(()),
            Err(err) => Err(round_error(backend.name(), err)),
        };
    }

    if let Some(unmarshaler) = backend.as_unmarshaler() {
        trace!(backend = backend.name(), "whole-record round");
        return match unmarshaler.unmarshal(cancel, fields).await {
            Ok(()) | Err(BackendError::NotFound) => Ok(()),
            Err(err) => Err(round_error(backend.name(), err)),
        };
    }

    trace!(backend = backend.name(), "key-value round");
    // Lookups within one round target independent fields and may run
    // concurrently; precedence orders rounds, not fields.
    try_join_all(
        fields
            .iter_mut()
            .filter(|field| field.is_eligible())
            .map(|field| async move {
                match backend.get(cancel, field.key()).await {
                    Ok(raw) => {
                        let text = std::str::from_utf8(&raw).map_err(|_| {
                            LoadError::Coerce(CoerceError::NotUtf8 {
                                key: field.key().to_string(),
                            })
                        })?;
                        field.write(text)?;
                        trace!(
                            backend = backend.name(),
                            key = field.key(),
                            "field satisfied"
                        );
                        Ok(())
                    }
                    // Not an error: the next backend may still answer.
                    Err(BackendError::NotFound) => Ok(()),
                    Err(err) => Err(round_error(backend.name(), err)),
                }
            }),
    )
    .await?;

    Ok(())
}

/// Maps a backend failure onto the load-level taxonomy, passing
/// cancellation and coercion failures through unwrapped.
fn round_error(backend: &str, err: BackendError) -> LoadError {
    match err {
        BackendError::Canceled => LoadError::Canceled,
        BackendError::Coerce(err) => LoadError::Coerce(err),
        err => LoadError::Backend {
            backend: backend.to_string(),
            source: err,
        },
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SchemaLoader, Unmarshaler};
    use crate::error::BackendResult;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    /// Tier-1 test backend: an in-memory map with an invocation counter.
    struct Store {
        name: &'static str,
        values: HashMap<&'static str, &'static str>,
        hits: AtomicUsize,
    }

    impl Store {
        fn new(name: &'static str, values: &[(&'static str, &'static str)]) -> Arc<Self> {
            Arc::new(Self {
                name,
                values: values.iter().copied().collect(),
                hits: AtomicUsize::new(0),
            })
        }

        fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Backend for Store {
        fn name(&self) -> &str {
            self.name
        }

        async fn get(&self, _cancel: &CancellationToken, key: &str) -> BackendResult<Vec<u8>> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            self.values
                .get(key)
                .map(|v| v.as_bytes().to_vec())
                .ok_or(BackendError::NotFound)
        }
    }

    #[derive(Default)]
    struct Settings {
        host: String,
        port: u16,
        debug: bool,
        timeout: Duration,
        tags: Vec<String>,
        nickname: Option<String>,
    }

    crate::record! {
        Settings {
            host: "host,required",
            port: "port",
            debug: "debug",
            timeout: "timeout",
            tags: "tags",
            nickname: "nickname",
        }
    }

    fn full_store(name: &'static str) -> Arc<Store> {
        Store::new(
            name,
            &[
                ("host", "localhost"),
                ("port", "8080"),
                ("debug", "true"),
                ("timeout", "10s"),
                ("tags", "a,b"),
                ("nickname", "nick"),
            ],
        )
    }

    #[tokio::test]
    async fn test_load_all_kinds() {
        let loader = Loader::new().backend_arc(full_store("store"));

        let mut settings = Settings::default();
        loader
            .load(&CancellationToken::new(), &mut settings)
            .await
            .unwrap();

        assert_eq!(settings.host, "localhost");
        assert_eq!(settings.port, 8080);
        assert!(settings.debug);
        assert_eq!(settings.timeout, Duration::from_secs(10));
        assert_eq!(settings.tags, vec!["a", "b"]);
        assert_eq!(settings.nickname.as_deref(), Some("nick"));
    }

    #[tokio::test]
    async fn test_first_backend_wins() {
        let first = Store::new("first", &[("host", "from-first")]);
        let second = full_store("second");

        let loader = Loader::new()
            .backend_arc(first.clone())
            .backend_arc(second.clone());

        let mut settings = Settings::default();
        loader
            .load(&CancellationToken::new(), &mut settings)
            .await
            .unwrap();

        // "host" came from the earlier backend, everything else fell
        // through to the later one.
        assert_eq!(settings.host, "from-first");
        assert_eq!(settings.port, 8080);
    }

    #[tokio::test]
    async fn test_caller_defaults_survive() {
        let loader = Loader::new().backend_arc(Store::new("store", &[("host", "h")]));

        let mut settings = Settings {
            port: 9999,
            ..Settings::default()
        };
        loader
            .load(&CancellationToken::new(), &mut settings)
            .await
            .unwrap();

        assert_eq!(settings.port, 9999);
    }

    #[tokio::test]
    async fn test_list_replaced_not_appended() {
        let loader = Loader::new().backend_arc(Store::new(
            "store",
            &[("host", "h"), ("tags", "c,d,e")],
        ));

        let mut settings = Settings {
            tags: vec!["a".to_string(), "b".to_string()],
            ..Settings::default()
        };
        loader
            .load(&CancellationToken::new(), &mut settings)
            .await
            .unwrap();

        assert_eq!(settings.tags, vec!["c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_required_missing_fails() {
        let loader = Loader::new().backend_arc(Store::new("store", &[("port", "1")]));

        let mut settings = Settings::default();
        let err = loader
            .load(&CancellationToken::new(), &mut settings)
            .await
            .unwrap_err();

        match err {
            LoadError::MissingRequired { field, key } => {
                assert_eq!(field, "host");
                assert_eq!(key, "host");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_required_zero_write_counts_as_satisfied() {
        #[derive(Default)]
        struct Flags {
            enabled: bool,
        }

        crate::record! {
            Flags {
                enabled: "enabled,required",
            }
        }

        // An explicit "false" is a real answer, not an absence.
        let loader = Loader::new().backend_arc(Store::new("store", &[("enabled", "false")]));
        let mut flags = Flags::default();
        loader
            .load(&CancellationToken::new(), &mut flags)
            .await
            .unwrap();
        assert!(!flags.enabled);

        let loader = Loader::new().backend_arc(Store::new("store", &[]));
        let mut flags = Flags::default();
        assert!(matches!(
            loader.load(&CancellationToken::new(), &mut flags).await,
            Err(LoadError::MissingRequired { .. })
        ));
    }

    #[tokio::test]
    async fn test_pinned_field_ignores_other_backends() {
        #[derive(Default)]
        struct Pinned {
            secret: String,
        }

        crate::record! {
            Pinned {
                secret: "secret,backend=second",
            }
        }

        let first = Store::new("first", &[("secret", "wrong")]);
        let second = Store::new("second", &[("secret", "right")]);

        let loader = Loader::new()
            .backend_arc(first.clone())
            .backend_arc(second.clone());

        let mut pinned = Pinned::default();
        loader
            .load(&CancellationToken::new(), &mut pinned)
            .await
            .unwrap();

        assert_eq!(pinned.secret, "right");
        // The earlier backend was never asked for the pinned key.
        assert_eq!(first.hits(), 0);
    }

    #[tokio::test]
    async fn test_unknown_pin_fails_before_any_io() {
        #[derive(Default)]
        struct Pinned {
            secret: String,
        }

        crate::record! {
            Pinned {
                secret: "secret,backend=vault",
            }
        }

        let store = Store::new("store", &[("secret", "value")]);
        let loader = Loader::new().backend_arc(store.clone());

        let mut pinned = Pinned::default();
        let err = loader
            .load(&CancellationToken::new(), &mut pinned)
            .await
            .unwrap_err();

        match err {
            LoadError::UnknownBackend { field, backend } => {
                assert_eq!(field, "secret");
                assert_eq!(backend, "vault");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(store.hits(), 0);
    }

    #[tokio::test]
    async fn test_nested_records_flattened() {
        #[derive(Default)]
        struct Db {
            dsn: String,
        }

        crate::record! {
            Db {
                dsn: "int",
            }
        }

        #[derive(Default)]
        struct Root {
            name: String,
            db: Db,
            replica: Option<Db>,
        }

        crate::record! {
            Root {
                name: "name",
                nested db,
                optional replica,
            }
        }

        let loader = Loader::new().backend_arc(Store::new(
            "store",
            &[("name", "svc"), ("int", "value")],
        ));

        let mut root = Root::default();
        loader
            .load(&CancellationToken::new(), &mut root)
            .await
            .unwrap();

        assert_eq!(root.db.dsn, "value");
        assert!(root.replica.is_none());
    }

    #[tokio::test]
    async fn test_null_optional_nested_contributes_nothing() {
        #[derive(Default)]
        struct Inner {
            token: String,
        }

        crate::record! {
            Inner {
                token: "token,required",
            }
        }

        #[derive(Default)]
        struct Root {
            inner: Option<Inner>,
        }

        crate::record! {
            Root {
                optional inner,
            }
        }

        // The required leaf lives behind a None pointer: zero fields, no
        // error. Pre-allocating the nested record brings it back.
        let loader = Loader::new().backend_arc(Store::new("store", &[]));
        let mut root = Root::default();
        loader
            .load(&CancellationToken::new(), &mut root)
            .await
            .unwrap();

        let mut root = Root {
            inner: Some(Inner::default()),
        };
        assert!(matches!(
            loader.load(&CancellationToken::new(), &mut root).await,
            Err(LoadError::MissingRequired { .. })
        ));
    }

    #[tokio::test]
    async fn test_excluded_field_never_populated() {
        #[derive(Default)]
        struct Partial {
            kept: String,
            dropped: String,
        }

        crate::record! {
            Partial {
                kept: "kept",
                dropped: "-",
            }
        }

        let loader = Loader::new().backend_arc(Store::new(
            "store",
            &[("kept", "yes"), ("dropped", "no"), ("-", "no")],
        ));

        let mut partial = Partial::default();
        loader
            .load(&CancellationToken::new(), &mut partial)
            .await
            .unwrap();

        assert_eq!(partial.kept, "yes");
        assert_eq!(partial.dropped, "");
    }

    #[tokio::test]
    async fn test_canceled_before_load_invokes_no_backend() {
        let store = full_store("store");
        let loader = Loader::new().backend_arc(store.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut settings = Settings::default();
        assert!(matches!(
            loader.load(&cancel, &mut settings).await,
            Err(LoadError::Canceled)
        ));
        assert_eq!(store.hits(), 0);
    }

    #[tokio::test]
    async fn test_backend_error_aborts_load() {
        struct Broken;

        #[async_trait]
        impl Backend for Broken {
            fn name(&self) -> &str {
                "broken"
            }

            async fn get(
                &self,
                _cancel: &CancellationToken,
                _key: &str,
            ) -> BackendResult<Vec<u8>> {
                Err(BackendError::other("connection refused"))
            }
        }

        let fallback = full_store("fallback");
        let loader = Loader::new()
            .backend(Broken)
            .backend_arc(fallback.clone());

        let mut settings = Settings::default();
        let err = loader
            .load(&CancellationToken::new(), &mut settings)
            .await
            .unwrap_err();

        match err {
            LoadError::Backend { backend, .. } => assert_eq!(backend, "broken"),
            other => panic!("unexpected error: {other}"),
        }
        // Fail-fast: the later backend was never reached.
        assert_eq!(fallback.hits(), 0);
    }

    #[tokio::test]
    async fn test_conversion_error_aborts_load() {
        let loader = Loader::new().backend_arc(Store::new(
            "store",
            &[("host", "h"), ("port", "not-a-port")],
        ));

        let mut settings = Settings::default();
        assert!(matches!(
            loader.load(&CancellationToken::new(), &mut settings).await,
            Err(LoadError::Coerce(_))
        ));
    }

    #[tokio::test]
    async fn test_tag_override() {
        struct Custom {
            value: String,
        }

        crate::record! {
            tag = "myapp";
            Custom {
                value: "value",
            }
        }

        let loader = Loader::new()
            .tag("myapp")
            .backend_arc(Store::new("store", &[("value", "tagged")]));

        let mut custom = Custom {
            value: String::new(),
        };
        loader
            .load(&CancellationToken::new(), &mut custom)
            .await
            .unwrap();
        assert_eq!(custom.value, "tagged");
    }

    #[tokio::test]
    async fn test_unmarshaler_respects_earlier_rounds() {
        /// Tier-2 test backend that writes a fixed set of keys.
        struct Blob {
            values: HashMap<&'static str, &'static str>,
        }

        #[async_trait]
        impl Backend for Blob {
            fn name(&self) -> &str {
                "blob"
            }

            async fn get(
                &self,
                _cancel: &CancellationToken,
                _key: &str,
            ) -> BackendResult<Vec<u8>> {
                Err(BackendError::NotFound)
            }

            fn as_unmarshaler(&self) -> Option<&dyn Unmarshaler> {
                Some(self)
            }
        }

        #[async_trait]
        impl Unmarshaler for Blob {
            async fn unmarshal(
                &self,
                _cancel: &CancellationToken,
                fields: &mut FieldSet<'_>,
            ) -> BackendResult<()> {
                for field in fields.iter_mut() {
                    if let Some(value) = self.values.get(field.key()) {
                        // Writes to fields satisfied by earlier backends
                        // are refused by the descriptor itself.
                        field.write(value)?;
                    }
                }
                Ok(())
            }
        }

        let first = Store::new("first", &[("host", "tier1-host")]);
        let blob = Blob {
            values: [("host", "blob-host"), ("port", "7070")].into_iter().collect(),
        };

        let loader = Loader::new().backend_arc(first.clone()).backend(blob);

        let mut settings = Settings::default();
        loader
            .load(&CancellationToken::new(), &mut settings)
            .await
            .unwrap();

        assert_eq!(settings.host, "tier1-host");
        assert_eq!(settings.port, 7070);
    }

    #[tokio::test]
    async fn test_schema_loader_sees_metadata() {
        /// Tier-3 test backend that records what it was offered.
        struct Introspecting {
            offered: std::sync::Mutex<Vec<(String, bool)>>,
        }

        #[async_trait]
        impl Backend for Introspecting {
            fn name(&self) -> &str {
                "introspecting"
            }

            async fn get(
                &self,
                _cancel: &CancellationToken,
                _key: &str,
            ) -> BackendResult<Vec<u8>> {
                Err(BackendError::NotFound)
            }

            fn as_schema_loader(&self) -> Option<&dyn SchemaLoader> {
                Some(self)
            }
        }

        #[async_trait]
        impl SchemaLoader for Introspecting {
            async fn load_fields(
                &self,
                _cancel: &CancellationToken,
                fields: &mut FieldSet<'_>,
            ) -> BackendResult<()> {
                let mut offered = self.offered.lock().unwrap();
                for field in fields.iter() {
                    if field.is_eligible() {
                        offered.push((field.key().to_string(), field.required()));
                    }
                }
                Ok(())
            }
        }

        let introspecting = Arc::new(Introspecting {
            offered: std::sync::Mutex::new(Vec::new()),
        });
        let fallback = full_store("fallback");

        let loader = Loader::new()
            .backend_arc(introspecting.clone())
            .backend_arc(fallback);

        let mut settings = Settings::default();
        loader
            .load(&CancellationToken::new(), &mut settings)
            .await
            .unwrap();

        let offered = introspecting.offered.lock().unwrap();
        assert!(offered.contains(&("host".to_string(), true)));
        assert!(offered.contains(&("port".to_string(), false)));
    }
}
