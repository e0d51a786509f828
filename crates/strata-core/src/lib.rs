//! # Strata Core
//!
//! The resolution engine of the strata configuration loader.
//!
//! This crate provides the pieces the concrete backends plug into:
//!
//! - **Value Coercion**: turning raw textual values into strongly-typed
//!   fields ([`Value`], [`Kind`])
//! - **Schema Introspection**: flattening a record into its configurable
//!   leaf fields ([`Record`], [`introspect`], [`FieldSet`])
//! - **Backend Contract**: the three capability tiers a value source may
//!   offer ([`Backend`], [`Unmarshaler`], [`SchemaLoader`])
//! - **Resolution**: the [`Loader`] orchestrating backends over a record
//!   with first-match-wins precedence
//!
//! ## Resolution Flow
//!
//! ```text
//! ┌──────────┐  introspect  ┌──────────┐  per backend, in order  ┌─────────┐
//! │  Record  │─────────────▶│ FieldSet │────────────────────────▶│ Backend │
//! │ (caller) │              │ (engine) │◀────── write(raw) ──────│ (tiers) │
//! └──────────┘              └──────────┘                         └─────────┘
//! ```
//!
//! Every write goes through
//! [`FieldDescriptor::write`], which refuses fields already satisfied by
//! an earlier backend or pinned elsewhere — precedence is enforced
//! mechanically, for every backend capability uniformly.

pub mod backend;
pub mod error;
pub mod loader;
pub(crate) mod macros;
pub mod record;
pub mod schema;
pub mod value;

pub use backend::{Backend, BoxedBackend, Func, SchemaLoader, Unmarshaler, func};
pub use error::{BackendError, BackendResult, BoxError, CoerceError, LoadError, LoadResult};
pub use loader::Loader;
pub use record::{FieldEntry, Node, Record};
pub use schema::{DEFAULT_TAG, FieldDescriptor, FieldSet, introspect};
pub use value::{Kind, LIST_SEPARATOR, Value};
