//! Generic encoder: [`Term`] + schema -> bytes. The mirror image of
//! [`crate::decoder`]; used by the framing layer to write a `Term` produced
//! by plan-free re-encoding, and internally by [`crate::known`]'s blanket
//! `Encode`/`Decode` impls when no faster native path exists.

use crate::{
    coder::CoderState,
    error::{DecodeError, DecodeResult},
    primitive,
    schema::Schema,
    term::Term,
    varint,
};
use std::io::Write;

pub struct Encoder<'a, W> {
    coder: CoderState<'a>,
    writer: W,
}

impl<'a, W: Write> Encoder<'a, W> {
    pub fn new(schema: &'a Schema, writer: W) -> DecodeResult<Self> {
        Ok(Encoder { coder: CoderState::new(schema)?, writer })
    }

    /// Encode a single top-level term, asserting it exactly matches the
    /// schema the encoder was built with (shape mismatches surface here as
    /// `DecodeError::SchemaMismatch`, same vocabulary as decode failures).
    pub fn encode(mut self, term: &Term) -> DecodeResult<W> {
        self.encode_term(term)?;
        self.coder.is_finished_or_err()?;
        Ok(self.writer)
    }

    fn io(&self, result: std::io::Result<()>) -> DecodeResult<()> {
        result.map_err(|_| DecodeError::ApiMisuse("write failed"))
    }

    fn encode_term(&mut self, term: &Term) -> DecodeResult<()> {
        match (self.coder.peek()?, term) {
            (Schema::Bool, Term::Bool(b)) => {
                self.coder.code_bool()?;
                let r = primitive::encode_bool(*b, &mut self.writer);
                self.io(r)
            }
            (Schema::Char, Term::Char(c)) => {
                self.coder.code_char()?;
                let r = primitive::encode_char(*c, &mut self.writer);
                self.io(r)
            }
            (Schema::W8, Term::W8(n)) => {
                self.coder.code_w8()?;
                let r = primitive::encode_w8(*n, &mut self.writer);
                self.io(r)
            }
            (Schema::W16, Term::W16(n)) => {
                self.coder.code_w16()?;
                let r = primitive::encode_w16(*n, &mut self.writer);
                self.io(r)
            }
            (Schema::W32, Term::W32(n)) => {
                self.coder.code_w32()?;
                let r = primitive::encode_w32(*n, &mut self.writer);
                self.io(r)
            }
            (Schema::W64, Term::W64(n)) => {
                self.coder.code_w64()?;
                let r = primitive::encode_w64(*n, &mut self.writer);
                self.io(r)
            }
            (Schema::I8, Term::I8(n)) => {
                self.coder.code_i8()?;
                let r = primitive::encode_i8(*n, &mut self.writer);
                self.io(r)
            }
            (Schema::I16, Term::I16(n)) => {
                self.coder.code_i16()?;
                let r = primitive::encode_i16(*n, &mut self.writer);
                self.io(r)
            }
            (Schema::I32, Term::I32(n)) => {
                self.coder.code_i32()?;
                let r = primitive::encode_i32(*n, &mut self.writer);
                self.io(r)
            }
            (Schema::I64, Term::I64(n)) => {
                self.coder.code_i64()?;
                let r = primitive::encode_i64(*n, &mut self.writer);
                self.io(r)
            }
            (Schema::Integer, Term::Integer(n)) => {
                self.coder.code_integer()?;
                let r = primitive::encode_integer(*n, &mut self.writer);
                self.io(r)
            }
            (Schema::Float, Term::Float(n)) => {
                self.coder.code_float()?;
                let r = primitive::encode_f32(*n, &mut self.writer);
                self.io(r)
            }
            (Schema::Double, Term::Double(n)) => {
                self.coder.code_double()?;
                let r = primitive::encode_f64(*n, &mut self.writer);
                self.io(r)
            }
            (Schema::Bytes, Term::Bytes(b)) => {
                self.coder.code_bytes()?;
                let r = primitive::encode_bytes(b, &mut self.writer);
                self.io(r)
            }
            (Schema::Text, Term::Text(s)) => {
                self.coder.code_text()?;
                let r = primitive::encode_text(s, &mut self.writer);
                self.io(r)
            }
            (Schema::UtcTime, Term::UtcTime(t)) => {
                self.coder.code_utctime()?;
                let r = primitive::encode_utctime(*t, &mut self.writer);
                self.io(r)
            }
            (Schema::Vector(_), Term::Vector(items)) => self.encode_vector(items),
            (Schema::Product(_), Term::Product(items)) => self.encode_product(items),
            (Schema::Record(_), Term::Record(fields)) => self.encode_record(fields),
            (Schema::Variant(_), Term::Variant { tag, payload, .. }) => {
                self.encode_variant(*tag, payload)
            }
            (need, got) => Err(DecodeError::SchemaMismatch { need: need.kind_str(), got: got.kind_str() }),
        }
    }

    fn encode_vector(&mut self, items: &[Term]) -> DecodeResult<()> {
        let r = varint::encode_varint_usize(items.len(), &mut self.writer);
        self.io(r)?;
        self.coder.begin_vector(items.len())?;
        for item in items {
            self.coder.begin_vector_elem()?;
            self.encode_term(item)?;
        }
        self.coder.finish_vector()
    }

    fn encode_product(&mut self, items: &[Term]) -> DecodeResult<()> {
        let arity = self.coder.begin_product()?;
        if arity != items.len() {
            return Err(DecodeError::ApiMisuse("product arity does not match schema"));
        }
        for item in items {
            self.coder.begin_product_elem()?;
            self.encode_term(item)?;
        }
        self.coder.finish_product()
    }

    fn encode_record(&mut self, fields: &[(String, Term)]) -> DecodeResult<()> {
        let arity = self.coder.begin_record()?;
        if arity != fields.len() {
            return Err(DecodeError::ApiMisuse("record arity does not match schema"));
        }
        for (name, term) in fields {
            let declared = self.coder.begin_record_field()?;
            if declared != name.as_str() {
                return Err(DecodeError::ApiMisuse("record field encoded out of declared order"));
            }
            self.encode_term(term)?;
        }
        self.coder.finish_record()
    }

    fn encode_variant(&mut self, tag: u32, payload: &Term) -> DecodeResult<()> {
        self.coder.begin_variant()?;
        let r = varint::encode_varint_u32(tag, &mut self.writer);
        self.io(r)?;
        self.coder.begin_variant_ctor(tag)?;
        self.encode_term(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decoder::Decoder, schema};

    #[test]
    fn round_trips_a_record_through_term() {
        let s = schema!(record { a: w8, b: text });
        let term = Term::Record(vec![
            ("a".to_string(), Term::W8(9)),
            ("b".to_string(), Term::Text("hi".to_string())),
        ]);
        let bytes = Encoder::new(&s, Vec::new()).unwrap().encode(&term).unwrap();
        let back = Decoder::new(&s, bytes.as_slice()).unwrap().decode().unwrap();
        assert_eq!(back, term);
    }

    #[test]
    fn round_trips_a_vector_of_negative_i32() {
        let s = schema!(vector(i32));
        let term = Term::Vector(vec![Term::I32(-1), Term::I32(i32::MIN), Term::I32(i32::MAX)]);
        let bytes = Encoder::new(&s, Vec::new()).unwrap().encode(&term).unwrap();
        let back = Decoder::new(&s, bytes.as_slice()).unwrap().decode().unwrap();
        assert_eq!(back, term);
    }

    #[test]
    fn variant_payload_must_match_selected_ctor() {
        let s = schema!(variant { A(w8), B(text) });
        let term = Term::variant(0, "A", Term::Text("wrong".to_string()));
        assert!(Encoder::new(&s, Vec::new()).unwrap().encode(&term).is_err());
    }
}
