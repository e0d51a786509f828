//! Schema introspection: flattening a record into field descriptors.
//!
//! Introspection runs once per load call and produces a [`FieldSet`], the
//! ordered list of configurable leaf fields with their keys, options, and
//! write targets. Nested records contribute no descriptor of their own,
//! only their leaves do.

use tracing::warn;

use crate::error::CoerceError;
use crate::record::{Node, Record};
use crate::value::{Kind, Value};

/// Default annotation tag read from record entries.
pub const DEFAULT_TAG: &str = "config";

/// Annotation value that excludes a field, nested or leaf.
const EXCLUDE: &str = "-";

// =============================================================================
// Field Descriptors
// =============================================================================

/// The flattened description of one configurable leaf field.
///
/// Descriptors are created fresh by [`introspect`] at the start of each
/// load call and discarded when it completes; they borrow their write
/// target from the destination record.
pub struct FieldDescriptor<'a> {
    name: &'static str,
    key: String,
    required: bool,
    backend: Option<String>,
    target: &'a mut dyn Value,
    satisfied: bool,
    eligible: bool,
}

impl<'a> FieldDescriptor<'a> {
    /// The declaring field's identifier, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The lookup key presented to backends.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether resolution must find a value for this field.
    pub fn required(&self) -> bool {
        self.required
    }

    /// The backend this field is pinned to, if any.
    pub fn pinned_to(&self) -> Option<&str> {
        self.backend.as_deref()
    }

    /// Semantic kind of the destination field.
    pub fn kind(&self) -> Kind {
        self.target.kind()
    }

    /// Whether a backend has already supplied this field's value.
    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    /// Whether this field may be written in the current backend round.
    ///
    /// A field is eligible while it is unsatisfied and either unpinned or
    /// pinned to the backend the round belongs to.
    pub fn is_eligible(&self) -> bool {
        self.eligible
    }

    /// Whether the destination still holds its type's zero value.
    pub fn holds_zero(&self) -> bool {
        self.target.is_zero()
    }

    /// Coerces `raw` into the target and marks the field satisfied.
    ///
    /// Returns `Ok(false)` without touching the target when the field is
    /// not eligible in the current round: it was already satisfied by an
    /// earlier backend, or it is pinned elsewhere. Earlier backends always
    /// win; this is the single mutation path, so the precedence rule holds
    /// for every backend capability uniformly.
    pub fn write(&mut self, raw: &str) -> Result<bool, CoerceError> {
        if !self.eligible {
            return Ok(false);
        }
        self.target.coerce(raw)?;
        self.satisfied = true;
        self.eligible = false;
        Ok(true)
    }
}

impl std::fmt::Debug for FieldDescriptor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("required", &self.required)
            .field("backend", &self.backend)
            .field("kind", &self.target.kind())
            .field("satisfied", &self.satisfied)
            .finish()
    }
}

// =============================================================================
// Field Sets
// =============================================================================

/// The ordered field descriptors of one record.
///
/// Whole-record and schema-aware backends receive the set and drive their
/// own iteration over it.
pub struct FieldSet<'a> {
    fields: Vec<FieldDescriptor<'a>>,
}

impl<'a> FieldSet<'a> {
    /// Number of configurable fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no configurable fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates the descriptors in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldDescriptor<'a>> {
        self.fields.iter()
    }

    /// Iterates the descriptors mutably, in declaration order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, FieldDescriptor<'a>> {
        self.fields.iter_mut()
    }

    /// Recomputes per-field eligibility for a round against `backend`.
    pub(crate) fn begin_round(&mut self, backend: &str) {
        for field in &mut self.fields {
            field.eligible = !field.satisfied
                && field.backend.as_deref().is_none_or(|pin| pin == backend);
        }
    }
}

impl<'a, 's> IntoIterator for &'s mut FieldSet<'a> {
    type Item = &'s mut FieldDescriptor<'a>;
    type IntoIter = std::slice::IterMut<'s, FieldDescriptor<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

// =============================================================================
// Introspection
// =============================================================================

/// Flattens `record` into its configurable leaf fields.
///
/// Fields are visited in declaration order; nested records are recursed
/// into and their leaves spliced in place. Introspection never fails:
/// leaves without a usable annotation under `tag` are skipped silently,
/// and the `-` sentinel excludes a field even when it is a nested record.
pub fn introspect<'a>(record: &'a mut dyn Record, tag: &str) -> FieldSet<'a> {
    let mut fields = Vec::new();
    collect(record, tag, &mut fields);
    FieldSet { fields }
}

fn collect<'a>(record: &'a mut dyn Record, tag: &str, out: &mut Vec<FieldDescriptor<'a>>) {
    for entry in Record::entries(record) {
        let annotation = entry.tag(tag);
        if annotation == Some(EXCLUDE) {
            continue;
        }
        match entry.node {
            Node::Nested(nested) => collect(nested, tag, out),
            Node::Leaf(target) => {
                let Some(annotation) = annotation else { continue };
                let Some(parsed) = Annotation::parse(annotation) else {
                    continue;
                };
                out.push(FieldDescriptor {
                    name: entry.name,
                    key: parsed.key,
                    required: parsed.required,
                    backend: parsed.backend,
                    target,
                    satisfied: false,
                    eligible: false,
                });
            }
        }
    }
}

struct Annotation {
    key: String,
    required: bool,
    backend: Option<String>,
}

impl Annotation {
    /// Parses `key[,required][,backend=<name>]`.
    ///
    /// Returns `None` when the key segment is empty. Unrecognized options
    /// are dropped, matching the historical permissive grammar, but logged
    /// so the typo is visible.
    fn parse(raw: &str) -> Option<Self> {
        let mut segments = raw.split(',');
        let key = segments.next().unwrap_or("");
        if key.is_empty() {
            return None;
        }

        let mut required = false;
        let mut backend = None;
        for option in segments {
            if option == "required" {
                required = true;
            } else if let Some(name) = option.strip_prefix("backend=") {
                backend = Some(name.to_string());
            } else {
                warn!(annotation = raw, option, "ignoring unrecognized annotation option");
            }
        }

        Some(Self {
            key: key.to_string(),
            required,
            backend,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
