//! `Term`: a generic, schema-indexed decoded value. Every schema-conformant
//! payload can be decoded into a `Term` without knowledge of any host
//! type; a `Term` is then either pretty-printed, projected to JSON, or
//! consumed by a planned `Extractor<T>`.

use crate::schema::Schema;
use serde_json::Value as Json;

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Bool(bool),
    Char(char),
    W8(u8),
    W16(u16),
    W32(u32),
    W64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    /// Unbounded non-negative integer, held widened to `u128`.
    Integer(u128),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    Text(String),
    UtcTime(time::OffsetDateTime),
    Vector(Vec<Term>),
    Product(Vec<Term>),
    /// Field order mirrors the schema's declared order, not any wire
    /// ordering (there isn't one).
    Record(Vec<(String, Term)>),
    Variant { tag: u32, name: String, payload: Box<Term> },
}

impl Term {
    pub fn variant(tag: u32, name: impl Into<String>, payload: Term) -> Term {
        Term::Variant { tag, name: name.into(), payload: Box::new(payload) }
    }

    /// Project this term to a `serde_json::Value`, for inspection/logging.
    /// Lossy for types JSON has no native representation for (bytes become
    /// base64-free arrays of numbers, u64/i64 that don't fit an f64 stay
    /// exact via JSON's arbitrary-precision number support).
    pub fn to_json(&self) -> Json {
        match self {
            Term::Bool(b) => Json::Bool(*b),
            Term::Char(c) => Json::String(c.to_string()),
            Term::W8(n) => Json::from(*n),
            Term::W16(n) => Json::from(*n),
            Term::W32(n) => Json::from(*n),
            Term::W64(n) => Json::from(*n),
            Term::I8(n) => Json::from(*n),
            Term::I16(n) => Json::from(*n),
            Term::I32(n) => Json::from(*n),
            Term::I64(n) => Json::from(*n),
            Term::Integer(n) => Json::String(n.to_string()),
            Term::Float(n) => serde_json::Number::from_f64(*n as f64)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Term::Double(n) => {
                serde_json::Number::from_f64(*n).map(Json::Number).unwrap_or(Json::Null)
            }
            Term::Bytes(b) => Json::Array(b.iter().map(|byte| Json::from(*byte)).collect()),
            Term::Text(t) => Json::String(t.clone()),
            Term::UtcTime(t) => Json::String(
                t.format(&time::format_description::well_known::Rfc3339)
                    .unwrap_or_else(|_| t.unix_timestamp().to_string()),
            ),
            Term::Vector(items) => Json::Array(items.iter().map(Term::to_json).collect()),
            Term::Product(items) => Json::Array(items.iter().map(Term::to_json).collect()),
            Term::Record(fields) => Json::Object(
                fields.iter().map(|(name, term)| (name.clone(), term.to_json())).collect(),
            ),
            Term::Variant { name, payload, .. } => {
                let mut obj = serde_json::Map::new();
                obj.insert(name.clone(), payload.to_json());
                Json::Object(obj)
            }
        }
    }

    /// A stable pretty-printer that does not need the originating schema
    /// (record/variant names are already carried on the term).
    pub fn pretty_fmt(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out
    }

    fn write_pretty(&self, out: &mut String, indent: usize) {
        use std::fmt::Write;
        let pad = "  ".repeat(indent);
        match self {
            Term::Record(fields) => {
                let _ = writeln!(out, "{{");
                for (name, term) in fields {
                    let _ = write!(out, "{}  {}: ", pad, name);
                    term.write_pretty(out, indent + 1);
                    let _ = writeln!(out, ",");
                }
                let _ = write!(out, "{}}}", pad);
            }
            Term::Variant { name, payload, .. } => {
                let _ = write!(out, "{}(", name);
                payload.write_pretty(out, indent);
                let _ = write!(out, ")");
            }
            Term::Vector(items) | Term::Product(items) => {
                let _ = write!(out, "[");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        let _ = write!(out, ", ");
                    }
                    item.write_pretty(out, indent);
                }
                let _ = write!(out, "]");
            }
            other => {
                let _ = write!(out, "{:?}", other);
            }
        }
    }

    /// Kind name, for plan-error messages — parallels `Schema::kind_str`.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Term::Bool(_) => "bool",
            Term::Char(_) => "char",
            Term::W8(_) => "w8",
            Term::W16(_) => "w16",
            Term::W32(_) => "w32",
            Term::W64(_) => "w64",
            Term::I8(_) => "i8",
            Term::I16(_) => "i16",
            Term::I32(_) => "i32",
            Term::I64(_) => "i64",
            Term::Integer(_) => "integer",
            Term::Float(_) => "float",
            Term::Double(_) => "double",
            Term::Bytes(_) => "bytes",
            Term::Text(_) => "text",
            Term::UtcTime(_) => "utctime",
            Term::Vector(_) => "vector",
            Term::Product(_) => "product",
            Term::Record(_) => "record",
            Term::Variant { .. } => "variant",
        }
    }
}

/// Just enough of `Schema` to sanity-check a `Term` was decoded from it;
/// used only in debug assertions within tests.
#[cfg(test)]
pub(crate) fn shape_matches(term: &Term, schema: &Schema) -> bool {
    matches!(
        (term, schema),
        (Term::Bool(_), Schema::Bool)
            | (Term::Char(_), Schema::Char)
            | (Term::W8(_), Schema::W8)
            | (Term::Vector(_), Schema::Vector(_))
            | (Term::Product(_), Schema::Product(_))
            | (Term::Record(_), Schema::Record(_))
            | (Term::Variant { .. }, Schema::Variant(_))
    ) || matches!(schema, Schema::Tag(_, _) | Schema::Fix(_) | Schema::SchemaRef(_))
}
