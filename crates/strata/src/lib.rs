//! # Strata
//!
//! Layered, typed configuration resolution with pluggable backends.
//!
//! ## Overview
//!
//! Strata resolves the fields of a statically-described record from an
//! ordered list of value sources — flags, environment, files, in-memory
//! maps, or anything implementing the backend contract — with
//! deterministic first-match-wins precedence, type coercion, and
//! required-field enforcement. There is no hidden global state: a loader
//! only consults the backends the caller configured, in the order they
//! were configured.
//!
//! ```text
//! ┌──────────────┐     ┌────────────┐     ┌────────────────────────────┐
//! │    Record    │────▶│   Loader   │────▶│ Backend "flags"   (Tier 3) │
//! │ (introspect) │     │ (resolve)  │────▶│ Backend "env"     (Tier 1) │
//! └──────────────┘     └────────────┘────▶│ Backend "json"    (Tier 2) │
//!                                         └────────────────────────────┘
//! ```
//!
//! - **Record**: a struct that registers its fields through the
//!   schema-description API (usually via the `record!` macro)
//! - **Loader**: iterates backends in precedence order; the first backend
//!   to supply a value for a field wins
//! - **Backends**: three ascending capability tiers — keyed lookup,
//!   whole-record population, and schema-aware loading
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use strata::prelude::*;
//! use std::time::Duration;
//!
//! #[derive(Default)]
//! struct Settings {
//!     host: String,
//!     port: u16,
//!     timeout: Duration,
//! }
//!
//! strata::record! {
//!     Settings {
//!         host: "host,required",
//!         port: "port",
//!         timeout: "timeout",
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), LoadError> {
//!     let loader = Loader::new()
//!         .backend(FlagsBackend::new())
//!         .backend(EnvBackend::new())
//!         .backend(FileBackend::new("app.json"));
//!
//!     let mut settings = Settings::default();
//!     loader.load(&CancellationToken::new(), &mut settings).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `yaml-config`: enable YAML configuration files
//! - `toml-config`: enable TOML configuration files

pub use strata_backends as backends;
pub use strata_core as core;

pub use strata_core::record;

/// Prelude for common imports.
pub mod prelude {
    pub use strata_backends::{EnvBackend, FileBackend, FlagsBackend, MapBackend};
    pub use strata_core::{
        Backend, BackendError, BackendResult, BoxedBackend, CoerceError, FieldDescriptor,
        FieldEntry, FieldSet, Kind, LoadError, LoadResult, Loader, Node, Record, SchemaLoader,
        Unmarshaler, Value, introspect,
    };
    pub use tokio_util::sync::CancellationToken;
}
