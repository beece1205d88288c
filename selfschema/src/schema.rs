//! Data types for representing a self-describing schema, and the `schema!`
//! macro for constructing them with syntactic sugar.
//!
//! A `Schema` is the single source of truth for how a value is laid out on
//! the wire (see [`crate::coder`]). It carries no type information beyond
//! its own shape: two schemas are equal iff they are the same constructor
//! with structurally equal fields (`Fix`/`Self` included, literally, no
//! alpha-equivalence).

use serde::{Deserialize, Serialize};

/// Description of how raw binary data encodes a self-describing value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Schema {
    Bool,
    Char,
    W8,
    W16,
    W32,
    W64,
    I8,
    I16,
    I32,
    I64,
    /// Unbounded non-negative integer, varint-encoded.
    Integer,
    Float,
    Double,
    Bytes,
    Text,
    UtcTime,
    /// Refers to the schema-of-schemas at the given version.
    SchemaRef(u8),
    /// Homogenous variable-length array.
    Vector(Box<Schema>),
    /// Heterogenous fixed-length positional tuple.
    Product(Vec<Schema>),
    /// Named fields; order is part of the schema.
    Record(Vec<RecordField>),
    /// Sum of named alternatives; order defines the wire tag index.
    Variant(Vec<VariantCtor>),
    /// Binds a fixpoint. `Self(n)` inside `body` refers back to an
    /// enclosing `Fix`.
    Fix(Box<Schema>),
    /// Refers to the n-th enclosing `Fix` (0 = innermost).
    SelfRef(u8),
    /// Attaches uninterpreted metadata to a schema node. Transparent to
    /// encoding; equality compares the tag structurally.
    Tag(Tag, Box<Schema>),
}

impl Schema {
    /// A short, non-recursive name for this schema's constructor, for
    /// error messages.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Schema::Bool => "bool",
            Schema::Char => "char",
            Schema::W8 => "w8",
            Schema::W16 => "w16",
            Schema::W32 => "w32",
            Schema::W64 => "w64",
            Schema::I8 => "i8",
            Schema::I16 => "i16",
            Schema::I32 => "i32",
            Schema::I64 => "i64",
            Schema::Integer => "integer",
            Schema::Float => "float",
            Schema::Double => "double",
            Schema::Bytes => "bytes",
            Schema::Text => "text",
            Schema::UtcTime => "utctime",
            Schema::SchemaRef(_) => "schema_ref(..)",
            Schema::Vector(_) => "vector(..)",
            Schema::Product(_) => "product {..}",
            Schema::Record(_) => "record {..}",
            Schema::Variant(_) => "variant {..}",
            Schema::Fix(_) => "fix(..)",
            Schema::SelfRef(_) => "self(_)",
            Schema::Tag(_, _) => "tag(_, ..)",
        }
    }
}

/// Item in `Schema::Record`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordField {
    pub name: String,
    pub schema: Schema,
}

impl<S: Into<String>> From<(S, Schema)> for RecordField {
    fn from((name, schema): (S, Schema)) -> Self {
        RecordField { name: name.into(), schema }
    }
}

/// Item in `Schema::Variant`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariantCtor {
    pub name: String,
    pub schema: Schema,
}

impl<S: Into<String>> From<(S, Schema)> for VariantCtor {
    fn from((name, schema): (S, Schema)) -> Self {
        VariantCtor { name: name.into(), schema }
    }
}

/// Opaque user metadata attached to a schema node via `Schema::Tag`. The
/// core never dispatches on a `Tag`'s contents; applications may read them
/// back off a decoded schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// Non-negative; mirrors `Schema::Integer`'s unsigned varint wire form.
    Int(u64),
    Text(String),
    List(Vec<Tag>),
}

#[macro_export]
macro_rules! schema {
    (bool) => { $crate::schema::Schema::Bool };
    (char) => { $crate::schema::Schema::Char };
    (w8) => { $crate::schema::Schema::W8 };
    (w16) => { $crate::schema::Schema::W16 };
    (w32) => { $crate::schema::Schema::W32 };
    (w64) => { $crate::schema::Schema::W64 };
    (i8) => { $crate::schema::Schema::I8 };
    (i16) => { $crate::schema::Schema::I16 };
    (i32) => { $crate::schema::Schema::I32 };
    (i64) => { $crate::schema::Schema::I64 };
    (integer) => { $crate::schema::Schema::Integer };
    (float) => { $crate::schema::Schema::Float };
    (double) => { $crate::schema::Schema::Double };
    (bytes) => { $crate::schema::Schema::Bytes };
    (text) => { $crate::schema::Schema::Text };
    (utctime) => { $crate::schema::Schema::UtcTime };
    (schema_ref($v:expr)) => { $crate::schema::Schema::SchemaRef($v) };
    (vector($($inner:tt)*)) => {
        $crate::schema::Schema::Vector(::std::boxed::Box::new($crate::schema!($($inner)*)))
    };
    (product { $(($($item:tt)*)),* $(,)? }) => {
        $crate::schema::Schema::Product(::std::vec![$( $crate::schema!($($item)*), )*])
    };
    (record { $($name:ident: $($field:tt)*),* $(,)? }) => {
        $crate::schema::Schema::Record(::std::vec![$(
            $crate::schema::RecordField {
                name: ::std::string::String::from(::core::stringify!($name)),
                schema: $crate::schema!($($field)*),
            },
        )*])
    };
    (variant { $($name:ident($($variant:tt)*)),* $(,)? }) => {
        $crate::schema::Schema::Variant(::std::vec![$(
            $crate::schema::VariantCtor {
                name: ::std::string::String::from(::core::stringify!($name)),
                schema: $crate::schema!($($variant)*),
            },
        )*])
    };
    (fix($($body:tt)*)) => {
        $crate::schema::Schema::Fix(::std::boxed::Box::new($crate::schema!($($body)*)))
    };
    (self_ref($n:expr)) => { $crate::schema::Schema::SelfRef($n) };
    (tag($t:expr, $($inner:tt)*)) => {
        $crate::schema::Schema::Tag($t, ::std::boxed::Box::new($crate::schema!($($inner)*)))
    };
    (%$schema:expr) => { $schema };
}

pub use schema;
