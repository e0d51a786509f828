//! Declarative helper for implementing [`Record`](crate::Record).

/// Implements [`Record`](crate::Record) for a struct.
///
/// Each line declares one field, in declaration order:
///
/// - `field: "key,opts"` — a configurable leaf, annotated with the raw
///   annotation string (`key[,required][,backend=<name>]`, or `"-"` to
///   exclude the field);
/// - `nested field` — a sub-record whose leaves are spliced in place
///   (`nested field: "-"` excludes the sub-record entirely);
/// - `optional field` — an `Option` of a sub-record, spliced only while
///   it is `Some`.
///
/// ```rust,ignore
/// struct Settings {
///     host: String,
///     port: u16,
///     db: DbSettings,
///     replica: Option<DbSettings>,
/// }
///
/// strata_core::record! {
///     Settings {
///         host: "host,required",
///         port: "port",
///         nested db,
///         optional replica,
///     }
/// }
/// ```
///
/// Annotations land under the default `config` tag; use
/// `record!(tag = "mytag"; Ty { .. })` to register them under another
/// name. Fields that need several tags, or shapes the macro does not
/// cover, can implement `Record` by hand.
#[macro_export]
macro_rules! record {
    (tag = $tag:literal ; $ty:ty { $($body:tt)* }) => {
        impl $crate::Record for $ty {
            fn entries(&mut self) -> ::std::vec::Vec<$crate::FieldEntry<'_>> {
                let mut entries = ::std::vec::Vec::new();
                $crate::record!(@fields self, entries, $tag, $($body)*);
                entries
            }
        }
    };
    ($ty:ty { $($body:tt)* }) => {
        $crate::record!(tag = "config"; $ty { $($body)* });
    };

    // Internal: one matcher per field shape, tail-recursing on the rest.
    (@fields $self:ident, $out:ident, $tag:literal) => {};
    (@fields $self:ident, $out:ident, $tag:literal,) => {};
    (@fields $self:ident, $out:ident, $tag:literal, nested $name:ident: $annotation:literal $($rest:tt)*) => {
        $out.push($crate::FieldEntry::nested(
            stringify!($name),
            &[($tag, $annotation)],
            &mut $self.$name,
        ));
        $crate::record!(@fields $self, $out, $tag $($rest)*);
    };
    (@fields $self:ident, $out:ident, $tag:literal, nested $name:ident $($rest:tt)*) => {
        $out.push($crate::FieldEntry::nested(
            stringify!($name),
            &[],
            &mut $self.$name,
        ));
        $crate::record!(@fields $self, $out, $tag $($rest)*);
    };
    (@fields $self:ident, $out:ident, $tag:literal, optional $name:ident $($rest:tt)*) => {
        if let ::core::option::Option::Some(inner) = &mut $self.$name {
            $out.push($crate::FieldEntry::nested(stringify!($name), &[], inner));
        }
        $crate::record!(@fields $self, $out, $tag $($rest)*);
    };
    (@fields $self:ident, $out:ident, $tag:literal, $name:ident: $annotation:literal $($rest:tt)*) => {
        $out.push($crate::FieldEntry::leaf(
            stringify!($name),
            &[($tag, $annotation)],
            &mut $self.$name,
        ));
        $crate::record!(@fields $self, $out, $tag $($rest)*);
    };
}
