//! Unified error types for the strata resolution engine.
//!
//! The taxonomy follows the lifecycle of a load: coercion failures while
//! converting raw values, backend failures while fetching them, and the
//! load-level errors a caller ultimately sees.

use thiserror::Error;

use crate::value::Kind;

/// A boxed error suitable for carrying arbitrary backend failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// Coercion Errors
// =============================================================================

/// Errors produced while coercing a raw value into a typed field.
#[derive(Debug, Error)]
pub enum CoerceError {
    /// The raw text does not parse as the field's kind.
    #[error("invalid {kind} value {value:?}: {reason}")]
    Invalid {
        /// Kind of the destination field.
        kind: Kind,
        /// The raw text that failed to parse.
        value: String,
        /// Reason reported by the underlying parser.
        reason: String,
    },

    /// The raw bytes supplied by a backend are not valid UTF-8.
    #[error("value for key '{key}' is not valid UTF-8")]
    NotUtf8 {
        /// The key whose value was malformed.
        key: String,
    },
}

impl CoerceError {
    /// Creates an invalid-value error for the given kind.
    pub fn invalid(kind: Kind, value: impl Into<String>, reason: impl ToString) -> Self {
        Self::Invalid {
            kind,
            value: value.into(),
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// Backend Errors
// =============================================================================

/// Errors returned by backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend holds no value for the requested key.
    ///
    /// This is a soft signal: the engine leaves the field for the next
    /// backend in order and never surfaces it to the caller.
    #[error("configuration key not found")]
    NotFound,

    /// The operation observed a canceled context.
    #[error("backend operation canceled")]
    Canceled,

    /// A raw value did not fit its destination field.
    ///
    /// Produced by whole-record and schema-aware backends, which coerce
    /// values themselves through the descriptor write path.
    #[error(transparent)]
    Coerce(#[from] CoerceError),

    /// Opaque backend failure (I/O, parsing, network).
    #[error(transparent)]
    Other(#[from] BoxError),
}

impl BackendError {
    /// Wraps an arbitrary error as an opaque backend failure.
    pub fn other(err: impl Into<BoxError>) -> Self {
        Self::Other(err.into())
    }
}

// =============================================================================
// Load Errors
// =============================================================================

/// Errors surfaced by [`Loader::load`](crate::Loader::load).
#[derive(Debug, Error)]
pub enum LoadError {
    /// A field pin names a backend that is not configured.
    ///
    /// Detected before any backend I/O is attempted.
    #[error("field '{field}' is pinned to unknown backend '{backend}'")]
    UnknownBackend {
        /// The declaring field's identifier.
        field: String,
        /// The backend name the pin refers to.
        backend: String,
    },

    /// No backend supplied a value for a required field.
    ///
    /// Reported only after every backend has been tried.
    #[error("required key '{key}' for field '{field}' not found")]
    MissingRequired {
        /// The declaring field's identifier.
        field: String,
        /// The lookup key presented to backends.
        key: String,
    },

    /// A raw value did not fit its destination field.
    #[error(transparent)]
    Coerce(#[from] CoerceError),

    /// A backend failed with a non-recoverable error.
    #[error("backend '{backend}': {source}")]
    Backend {
        /// Name of the failing backend.
        backend: String,
        /// The underlying failure, propagated verbatim.
        #[source]
        source: BackendError,
    },

    /// The load was canceled before completion.
    #[error("configuration load canceled")]
    Canceled,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Result type for load operations.
pub type LoadResult<T> = Result<T, LoadError>;
