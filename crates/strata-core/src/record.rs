//! The schema-description contract records implement to become loadable.
//!
//! Rust has no runtime reflection, so a record registers its fields
//! explicitly: [`Record::entries`] lists them in declaration order, each
//! with its annotations and a mutable handle to its storage. The
//! [`record!`](crate::record!) macro generates impls for the common shapes.

use crate::value::Value;

/// A record whose fields can be enumerated for configuration loading.
///
/// Implementations hand out one [`FieldEntry`] per declared field, in
/// declaration order. Nested records are listed as entries of their own;
/// the introspector splices their leaves into the parent's field list. An
/// optional nested record that is currently `None` is simply not listed
/// and contributes zero fields.
pub trait Record: Send {
    /// Lists the record's fields in declaration order.
    fn entries(&mut self) -> Vec<FieldEntry<'_>>;
}

/// One declared field of a record.
pub struct FieldEntry<'a> {
    pub(crate) name: &'static str,
    pub(crate) tags: &'static [(&'static str, &'static str)],
    pub(crate) node: Node<'a>,
}

/// The shape of a declared field.
pub enum Node<'a> {
    /// A configurable leaf value.
    Leaf(&'a mut dyn Value),
    /// A nested record whose leaves are spliced into the parent's list.
    Nested(&'a mut dyn Record),
}

impl<'a> FieldEntry<'a> {
    /// Declares a leaf field.
    ///
    /// `tags` pairs an annotation name with its raw value, e.g.
    /// `("config", "timeout,required")`. A leaf with no annotation under
    /// the loader's active tag is not configurable and is skipped.
    pub fn leaf(
        name: &'static str,
        tags: &'static [(&'static str, &'static str)],
        value: &'a mut dyn Value,
    ) -> Self {
        Self {
            name,
            tags,
            node: Node::Leaf(value),
        }
    }

    /// Declares a nested record.
    pub fn nested(
        name: &'static str,
        tags: &'static [(&'static str, &'static str)],
        record: &'a mut dyn Record,
    ) -> Self {
        Self {
            name,
            tags,
            node: Node::Nested(record),
        }
    }

    /// The declaring field's identifier.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the raw annotation declared under `tag`, if any.
    pub fn tag(&self, tag: &str) -> Option<&'static str> {
        self.tags
            .iter()
            .find(|(name, _)| *name == tag)
            .map(|(_, value)| *value)
    }
}
