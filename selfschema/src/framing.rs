//! Wire framing: version byte + bootstrap-encoded schema + schema-encoded
//! value. `serialise`/`deserialise` are the crate's two public entry
//! points; everything else in the crate exists to make these two
//! functions correct.

use crate::{
    bootstrap::{self, bootstrap, CURRENT_VERSION},
    decoder::Decoder,
    encoder::Encoder,
    error::Error,
    extractor::Extractor,
    known::{Decode, Encode, KnownSchema},
    schema::Schema,
    term::Term,
};
use std::io::{Read, Write};

/// Write `value`'s own schema (`T::schema()`), followed by `value` encoded
/// against that schema. The schema itself is written by re-encoding its
/// `Term` projection (via [`bootstrap::schema_to_term`]) against
/// `bootstrap(CURRENT_VERSION)`.
pub fn serialise<T: Encode>(value: &T, mut w: impl Write) -> Result<(), Error> {
    w.write_all(&[CURRENT_VERSION])
        .map_err(|_| crate::error::DecodeError::ApiMisuse("write failed"))?;

    let schema = T::schema();
    let boot = bootstrap(CURRENT_VERSION)?;
    let schema_term = bootstrap::schema_to_term(&schema);
    let w = Encoder::new(boot, w)?.encode(&schema_term)?;

    let value_term = value.to_term();
    Encoder::new(&schema, w)?.encode(&value_term)?;
    Ok(())
}

/// Read a framed payload and reconcile the writer's schema against `T`.
/// When the writer's schema is identical to `T::schema()`, this skips
/// planning entirely and decodes straight into `T` (the "native fast
/// path"); otherwise an `Extractor<T>` is planned against the writer's
/// schema and applied once to the decoded `Term`.
pub fn deserialise<T: Decode>(mut r: impl Read, extractor: &Extractor<T>) -> Result<T, Error> {
    let mut version = [0u8; 1];
    r.read_exact(&mut version).map_err(|_| crate::error::DecodeError::UnexpectedEof)?;
    let boot = bootstrap(version[0])?;

    let schema_term = Decoder::new(boot, &mut r)?.decode()?;
    let writer_schema = term_to_schema(&schema_term)?;

    tracing::debug!(version = version[0], "decoded writer schema off the wire");

    if writer_schema == T::schema() {
        tracing::debug!("writer schema matches native schema, skipping planner");
        let value_term = Decoder::new(&writer_schema, &mut r)?.decode()?;
        return Ok(T::from_term(&value_term)?);
    }

    let term_fn = extractor.plan(&writer_schema)?;
    let value_term = Decoder::new(&writer_schema, &mut r)?.decode()?;
    Ok(term_fn.apply(&value_term))
}

/// Inverse of [`bootstrap::schema_to_term`]: reconstructs a `Schema` from a
/// `Term` decoded against `bootstrap(CURRENT_VERSION)`. Schema terms never
/// contain anything but the 24 bootstrap constructors, so this never needs
/// a `PlanError` — any malformed shape here means the bytes didn't
/// actually conform to the bootstrap schema, a decode-time concern.
fn term_to_schema(term: &Term) -> Result<Schema, Error> {
    use crate::{error::DecodeError, schema::Tag};

    fn bad() -> DecodeError {
        DecodeError::ApiMisuse("decoded schema term does not match the bootstrap shape")
    }

    fn one<'a>(items: &'a [Term]) -> Result<&'a Term, DecodeError> {
        items.first().ok_or_else(bad)
    }

    fn go(term: &Term) -> Result<Schema, DecodeError> {
        let (name, payload) = match term {
            Term::Variant { name, payload, .. } => (name.as_str(), payload.as_ref()),
            _ => return Err(bad()),
        };
        let items: &[Term] = match payload {
            Term::Product(items) => items,
            _ => return Err(bad()),
        };
        Ok(match name {
            "SFix" => Schema::Fix(Box::new(go(one(items)?)?)),
            "SSelf" => Schema::SelfRef(w8(one(items)?)?),
            "SVector" => Schema::Vector(Box::new(go(one(items)?)?)),
            "SProduct" => Schema::Product(seq(one(items)?)?.iter().map(go).collect::<Result<_, _>>()?),
            "SRecord" => Schema::Record(
                seq(one(items)?)?
                    .iter()
                    .map(|pair| named_field(pair).map(Into::into))
                    .collect::<Result<_, _>>()?,
            ),
            "SVariant" => Schema::Variant(
                seq(one(items)?)?
                    .iter()
                    .map(|pair| named_field(pair).map(Into::into))
                    .collect::<Result<_, _>>()?,
            ),
            "SSchemaRef" => Schema::SchemaRef(w8(one(items)?)?),
            "SBool" => Schema::Bool,
            "SChar" => Schema::Char,
            "SW8" => Schema::W8,
            "SW16" => Schema::W16,
            "SW32" => Schema::W32,
            "SW64" => Schema::W64,
            "SI8" => Schema::I8,
            "SI16" => Schema::I16,
            "SI32" => Schema::I32,
            "SI64" => Schema::I64,
            "SInteger" => Schema::Integer,
            "SFloat" => Schema::Float,
            "SDouble" => Schema::Double,
            "SBytes" => Schema::Bytes,
            "SText" => Schema::Text,
            "SUtcTime" => Schema::UtcTime,
            "STag" => {
                if items.len() != 2 {
                    return Err(bad());
                }
                Schema::Tag(tag(&items[0])?, Box::new(go(&items[1])?))
            }
            _ => return Err(bad()),
        })
    }

    fn tag(term: &Term) -> Result<Tag, DecodeError> {
        let (name, payload) = match term {
            Term::Variant { name, payload, .. } => (name.as_str(), payload.as_ref()),
            _ => return Err(bad()),
        };
        let items: &[Term] = match payload {
            Term::Product(items) => items,
            _ => return Err(bad()),
        };
        Ok(match name {
            "TagInt" => Tag::Int(integer(one(items)?)?),
            "TagStr" => Tag::Text(text(one(items)?)?),
            "TagList" => Tag::List(seq(one(items)?)?.iter().map(tag).collect::<Result<_, _>>()?),
            _ => return Err(bad()),
        })
    }

    fn w8(term: &Term) -> Result<u8, DecodeError> {
        match term {
            Term::W8(n) => Ok(*n),
            _ => Err(bad()),
        }
    }
    fn integer(term: &Term) -> Result<u64, DecodeError> {
        match term {
            Term::Integer(n) => u64::try_from(*n).map_err(|_| DecodeError::VarintOverflow),
            _ => Err(bad()),
        }
    }
    fn text(term: &Term) -> Result<String, DecodeError> {
        match term {
            Term::Text(s) => Ok(s.clone()),
            _ => Err(bad()),
        }
    }
    fn seq(term: &Term) -> Result<&[Term], DecodeError> {
        match term {
            Term::Vector(items) => Ok(items),
            _ => Err(bad()),
        }
    }
    fn named_field(term: &Term) -> Result<(String, Schema), DecodeError> {
        match term {
            Term::Product(items) if items.len() == 2 => Ok((text(&items[0])?, go(&items[1])?)),
            _ => Err(bad()),
        }
    }

    Ok(go(term)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor;

    #[test]
    fn round_trips_through_the_wire() {
        let value = 42u32;
        let mut buf = Vec::new();
        serialise(&value, &mut buf).unwrap();

        let ext: Extractor<u32> = extractor::widen_u64().map(|n| n as u32);
        let back: u32 = deserialise(buf.as_slice(), &ext).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn native_fast_path_is_taken_when_schemas_match() {
        let value = "hello".to_string();
        let mut buf = Vec::new();
        serialise(&value, &mut buf).unwrap();

        let ext: Extractor<String> = extractor::text();
        let back: String = deserialise(buf.as_slice(), &ext).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn rejects_an_unrecognised_version_byte() {
        let buf = [99u8];
        let ext: Extractor<u32> = extractor::widen_u64().map(|n| n as u32);
        assert!(deserialise(buf.as_slice(), &ext).is_err());
    }
}
