//! Generic decoder: schema + byte stream -> [`Term`], with no knowledge of
//! any Rust host type. This is how an unrecognised payload gets inspected
//! (pretty-printed, projected to JSON) and how the planner's `Extractor`
//! gets something to apply to.

use crate::{
    coder::CoderState,
    error::DecodeResult,
    primitive,
    schema,
    schema::Schema,
    term::Term,
    varint,
};
use std::io::Read;

pub struct Decoder<'a, R> {
    coder: CoderState<'a>,
    reader: R,
}

impl<'a, R: Read> Decoder<'a, R> {
    pub fn new(schema: &'a Schema, reader: R) -> DecodeResult<Self> {
        Ok(Decoder { coder: CoderState::new(schema)?, reader })
    }

    /// Decode a single top-level value and assert the coder finished
    /// exactly at the schema's end.
    pub fn decode(mut self) -> DecodeResult<Term> {
        let term = self.decode_term()?;
        self.coder.is_finished_or_err()?;
        Ok(term)
    }

    fn decode_term(&mut self) -> DecodeResult<Term> {
        // `peek` reports the schema `CoderState` is tracking after
        // transparently unwrapping `Tag`/`SchemaRef`/`Fix`/`Self`, so this
        // match only ever sees a concrete constructor.
        match self.coder.peek()? {
            Schema::Bool => {
                self.coder.code_bool()?;
                Ok(Term::Bool(primitive::decode_bool(&mut self.reader)?))
            }
            Schema::Char => {
                self.coder.code_char()?;
                Ok(Term::Char(primitive::decode_char(&mut self.reader)?))
            }
            Schema::W8 => {
                self.coder.code_w8()?;
                Ok(Term::W8(primitive::decode_w8(&mut self.reader)?))
            }
            Schema::W16 => {
                self.coder.code_w16()?;
                Ok(Term::W16(primitive::decode_w16(&mut self.reader)?))
            }
            Schema::W32 => {
                self.coder.code_w32()?;
                Ok(Term::W32(primitive::decode_w32(&mut self.reader)?))
            }
            Schema::W64 => {
                self.coder.code_w64()?;
                Ok(Term::W64(primitive::decode_w64(&mut self.reader)?))
            }
            Schema::I8 => {
                self.coder.code_i8()?;
                Ok(Term::I8(primitive::decode_i8(&mut self.reader)?))
            }
            Schema::I16 => {
                self.coder.code_i16()?;
                Ok(Term::I16(primitive::decode_i16(&mut self.reader)?))
            }
            Schema::I32 => {
                self.coder.code_i32()?;
                Ok(Term::I32(primitive::decode_i32(&mut self.reader)?))
            }
            Schema::I64 => {
                self.coder.code_i64()?;
                Ok(Term::I64(primitive::decode_i64(&mut self.reader)?))
            }
            Schema::Integer => {
                self.coder.code_integer()?;
                Ok(Term::Integer(primitive::decode_integer(&mut self.reader)?))
            }
            Schema::Float => {
                self.coder.code_float()?;
                Ok(Term::Float(primitive::decode_f32(&mut self.reader)?))
            }
            Schema::Double => {
                self.coder.code_double()?;
                Ok(Term::Double(primitive::decode_f64(&mut self.reader)?))
            }
            Schema::Bytes => {
                self.coder.code_bytes()?;
                Ok(Term::Bytes(primitive::decode_bytes(&mut self.reader)?))
            }
            Schema::Text => {
                self.coder.code_text()?;
                Ok(Term::Text(primitive::decode_text(&mut self.reader)?))
            }
            Schema::UtcTime => {
                self.coder.code_utctime()?;
                Ok(Term::UtcTime(primitive::decode_utctime(&mut self.reader)?))
            }
            Schema::Vector(_) => self.decode_vector(),
            Schema::Product(_) => self.decode_product(),
            Schema::Record(_) => self.decode_record(),
            Schema::Variant(_) => self.decode_variant(),
            // `Tag`, `SchemaRef`, `Fix`, `SelfRef` are unwound by `peek`
            // itself and never observed here.
            Schema::Tag(_, _) | Schema::SchemaRef(_) | Schema::Fix(_) | Schema::SelfRef(_) => {
                unreachable!("CoderState::peek unwraps transparent nodes")
            }
        }
    }

    fn decode_vector(&mut self) -> DecodeResult<Term> {
        let len = varint::decode_varint_usize(&mut self.reader)?;
        self.coder.begin_vector(len)?;
        let mut items = Vec::with_capacity(len.min(1 << 16));
        for _ in 0..len {
            self.coder.begin_vector_elem()?;
            items.push(self.decode_term()?);
        }
        self.coder.finish_vector()?;
        Ok(Term::Vector(items))
    }

    fn decode_product(&mut self) -> DecodeResult<Term> {
        let arity = self.coder.begin_product()?;
        let mut items = Vec::with_capacity(arity);
        for _ in 0..arity {
            self.coder.begin_product_elem()?;
            items.push(self.decode_term()?);
        }
        self.coder.finish_product()?;
        Ok(Term::Product(items))
    }

    fn decode_record(&mut self) -> DecodeResult<Term> {
        let arity = self.coder.begin_record()?;
        let mut fields = Vec::with_capacity(arity);
        for _ in 0..arity {
            let name = self.coder.begin_record_field()?.to_string();
            let term = self.decode_term()?;
            fields.push((name, term));
        }
        self.coder.finish_record()?;
        Ok(Term::Record(fields))
    }

    fn decode_variant(&mut self) -> DecodeResult<Term> {
        self.coder.begin_variant()?;
        let tag = varint::decode_varint_u32(&mut self.reader)?;
        let name = self.coder.begin_variant_ctor(tag)?.to_string();
        let payload = self.decode_term()?;
        Ok(Term::variant(tag, name, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    #[test]
    fn decodes_a_lone_bool() {
        let s = schema!(bool);
        let term = Decoder::new(&s, [1u8].as_slice()).unwrap().decode().unwrap();
        assert_eq!(term, Term::Bool(true));
    }

    #[test]
    fn decodes_a_vector_of_three_w16() {
        let s = schema!(vector(w16));
        let mut bytes = vec![3u8]; // varint length prefix
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&300u16.to_le_bytes());
        let term = Decoder::new(&s, bytes.as_slice()).unwrap().decode().unwrap();
        assert_eq!(term, Term::Vector(vec![Term::W16(1), Term::W16(2), Term::W16(300)]));
    }

    #[test]
    fn record_fields_decode_in_declared_order() {
        let s = schema!(record { a: w8, b: text });
        let mut bytes = vec![7u8]; // a
        bytes.push(3); // text length
        bytes.extend_from_slice(b"hey");
        let term = Decoder::new(&s, bytes.as_slice()).unwrap().decode().unwrap();
        assert_eq!(
            term,
            Term::Record(vec![
                ("a".to_string(), Term::W8(7)),
                ("b".to_string(), Term::Text("hey".to_string())),
            ])
        );
    }

    #[test]
    fn signed_fixed_width_round_trips_negative_values() {
        let s = schema!(i32);
        let bytes = (-300i32 as u32).to_le_bytes();
        let term = Decoder::new(&s, bytes.as_slice()).unwrap().decode().unwrap();
        assert_eq!(term, Term::I32(-300));
    }
}
