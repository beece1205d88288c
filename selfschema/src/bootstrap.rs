//! The bootstrap schema: a hard-coded schema-of-schemas, keyed by a
//! version byte. `SchemaRef(v)` encountered anywhere is textually
//! substituted by `bootstrap(v)`.

use crate::{
    error::DecodeError,
    schema,
    schema::{Schema, Tag},
};
use std::sync::OnceLock;

/// The schema-language version this crate writes on the wire.
pub const CURRENT_VERSION: u8 = 3;

/// Look up the schema-of-schemas for a given version. Only version 3 is
/// currently recognized.
pub fn bootstrap(version: u8) -> Result<&'static Schema, DecodeError> {
    match version {
        3 => Ok(bootstrap_v3()),
        other => Err(DecodeError::UnknownSchemaVersion(other)),
    }
}

fn bootstrap_v3() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(build_bootstrap_v3)
}

/// Bit-for-bit per spec: a `Fix` around a 24-constructor `Variant`, one
/// constructor per `Schema` constructor, each wrapping a `Product` of its
/// fields. `Tag`'s own metadata datum gets a second, nested `Fix`.
fn build_bootstrap_v3() -> Schema {
    let tag_schema = schema!(fix(variant {
        TagInt(product { (%schema!(integer)) }),
        TagStr(product { (%schema!(text)) }),
        TagList(product { (%schema!(vector(self_ref(0)))) }),
    }));

    schema!(fix(variant {
        SFix(product { (%schema!(self_ref(0))) }),
        SSelf(product { (%schema!(w8)) }),
        SVector(product { (%schema!(self_ref(0))) }),
        SProduct(product { (%schema!(vector(self_ref(0)))) }),
        SRecord(product { (%schema!(vector(product { (%schema!(text)), (%schema!(self_ref(0))) }))) }),
        SVariant(product { (%schema!(vector(product { (%schema!(text)), (%schema!(self_ref(0))) }))) }),
        SSchemaRef(product { (%schema!(w8)) }),
        SBool(product {}),
        SChar(product {}),
        SW8(product {}),
        SW16(product {}),
        SW32(product {}),
        SW64(product {}),
        SI8(product {}),
        SI16(product {}),
        SI32(product {}),
        SI64(product {}),
        SInteger(product {}),
        SFloat(product {}),
        SDouble(product {}),
        SBytes(product {}),
        SText(product {}),
        SUtcTime(product {}),
        STag(product { (%tag_schema), (%schema!(self_ref(0))) }),
    }))
}

/// Encode `schema` itself as a `Term`-shaped value conforming to
/// `bootstrap(3)`. Used by the bootstrap's own encoder/decoder (the
/// framing layer) and exercised directly by the schema round-trip tests.
pub fn schema_to_term(schema: &Schema) -> crate::term::Term {
    use crate::term::Term;

    fn tag_to_term(tag: &Tag) -> Term {
        match tag {
            Tag::Int(n) => Term::variant(0, "TagInt", Term::Product(vec![Term::Integer(*n as u128)])),
            Tag::Text(t) => Term::variant(1, "TagStr", Term::Product(vec![Term::Text(t.clone())])),
            Tag::List(items) => Term::variant(
                2,
                "TagList",
                Term::Product(vec![Term::Vector(items.iter().map(tag_to_term).collect())]),
            ),
        }
    }

    fn go(schema: &Schema) -> Term {
        match schema {
            Schema::Fix(body) => {
                Term::variant(0, "SFix", Term::Product(vec![go(body)]))
            }
            Schema::SelfRef(n) => Term::variant(1, "SSelf", Term::Product(vec![Term::W8(*n)])),
            Schema::Vector(inner) => Term::variant(2, "SVector", Term::Product(vec![go(inner)])),
            Schema::Product(items) => Term::variant(
                3,
                "SProduct",
                Term::Product(vec![Term::Vector(items.iter().map(go).collect())]),
            ),
            Schema::Record(fields) => Term::variant(
                4,
                "SRecord",
                Term::Product(vec![Term::Vector(
                    fields
                        .iter()
                        .map(|f| Term::Product(vec![Term::Text(f.name.clone()), go(&f.schema)]))
                        .collect(),
                )]),
            ),
            Schema::Variant(ctors) => Term::variant(
                5,
                "SVariant",
                Term::Product(vec![Term::Vector(
                    ctors
                        .iter()
                        .map(|c| Term::Product(vec![Term::Text(c.name.clone()), go(&c.schema)]))
                        .collect(),
                )]),
            ),
            Schema::SchemaRef(v) => Term::variant(6, "SSchemaRef", Term::Product(vec![Term::W8(*v)])),
            Schema::Bool => Term::variant(7, "SBool", Term::Product(vec![])),
            Schema::Char => Term::variant(8, "SChar", Term::Product(vec![])),
            Schema::W8 => Term::variant(9, "SW8", Term::Product(vec![])),
            Schema::W16 => Term::variant(10, "SW16", Term::Product(vec![])),
            Schema::W32 => Term::variant(11, "SW32", Term::Product(vec![])),
            Schema::W64 => Term::variant(12, "SW64", Term::Product(vec![])),
            Schema::I8 => Term::variant(13, "SI8", Term::Product(vec![])),
            Schema::I16 => Term::variant(14, "SI16", Term::Product(vec![])),
            Schema::I32 => Term::variant(15, "SI32", Term::Product(vec![])),
            Schema::I64 => Term::variant(16, "SI64", Term::Product(vec![])),
            Schema::Integer => Term::variant(17, "SInteger", Term::Product(vec![])),
            Schema::Float => Term::variant(18, "SFloat", Term::Product(vec![])),
            Schema::Double => Term::variant(19, "SDouble", Term::Product(vec![])),
            Schema::Bytes => Term::variant(20, "SBytes", Term::Product(vec![])),
            Schema::Text => Term::variant(21, "SText", Term::Product(vec![])),
            Schema::UtcTime => Term::variant(22, "SUtcTime", Term::Product(vec![])),
            Schema::Tag(t, inner) => Term::variant(
                23,
                "STag",
                Term::Product(vec![tag_to_term(t), go(inner)]),
            ),
        }
    }

    go(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_version_is_rejected() {
        assert!(matches!(bootstrap(99), Err(DecodeError::UnknownSchemaVersion(99))));
    }

    #[test]
    fn bootstrap_v3_is_a_fix_of_24_constructors() {
        match bootstrap(3).unwrap() {
            Schema::Fix(body) => match body.as_ref() {
                Schema::Variant(ctors) => assert_eq!(ctors.len(), 24),
                _ => panic!("expected variant"),
            },
            _ => panic!("expected fix"),
        }
    }
}
