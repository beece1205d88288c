//! `KnownSchema`: a type's statically-known canonical schema, the anchor
//! the framing layer compares an incoming writer's schema against to decide
//! whether planning can be skipped. `Encode`/`Decode` pair a `KnownSchema`
//! with a way to move between the type and a schema-conformant [`Term`],
//! playing the role the teacher's `SelfEncode`/`SelfDecode` play for a
//! streaming codec.

use crate::{
    error::{DecodeError, DecodeResult},
    schema::Schema,
    term::Term,
};
use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    hash::Hash,
};

pub trait KnownSchema {
    fn schema() -> Schema;
}

pub trait Encode: KnownSchema {
    fn to_term(&self) -> Term;
}

pub trait Decode: KnownSchema + Sized {
    fn from_term(term: &Term) -> DecodeResult<Self>;
}

fn unexpected(_term: &Term) -> DecodeError {
    DecodeError::ApiMisuse("term shape does not match the expected native type")
}

macro_rules! scalar_known_schema {
    ($($t:ty: $schema:ident => $variant:ident,)*) => {$(
        impl KnownSchema for $t {
            fn schema() -> Schema { Schema::$schema }
        }
        impl Encode for $t {
            fn to_term(&self) -> Term { Term::$variant(*self) }
        }
        impl Decode for $t {
            fn from_term(term: &Term) -> DecodeResult<Self> {
                match term {
                    Term::$variant(v) => Ok(*v),
                    other => Err(unexpected(other)),
                }
            }
        }
    )*};
}

scalar_known_schema!(
    bool: Bool => Bool,
    char: Char => Char,
    u8: W8 => W8,
    u16: W16 => W16,
    u32: W32 => W32,
    u64: W64 => W64,
    i8: I8 => I8,
    i16: I16 => I16,
    i32: I32 => I32,
    i64: I64 => I64,
    f32: Float => Float,
    f64: Double => Double,
);

impl KnownSchema for () {
    fn schema() -> Schema {
        Schema::Product(vec![])
    }
}
impl Encode for () {
    fn to_term(&self) -> Term {
        Term::Product(vec![])
    }
}
impl Decode for () {
    fn from_term(term: &Term) -> DecodeResult<Self> {
        match term {
            Term::Product(items) if items.is_empty() => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

impl KnownSchema for String {
    fn schema() -> Schema {
        Schema::Text
    }
}
impl Encode for String {
    fn to_term(&self) -> Term {
        Term::Text(self.clone())
    }
}
impl Decode for String {
    fn from_term(term: &Term) -> DecodeResult<Self> {
        match term {
            Term::Text(s) => Ok(s.clone()),
            other => Err(unexpected(other)),
        }
    }
}

impl KnownSchema for Vec<u8> {
    fn schema() -> Schema {
        Schema::Bytes
    }
}
impl Encode for Vec<u8> {
    fn to_term(&self) -> Term {
        Term::Bytes(self.clone())
    }
}
impl Decode for Vec<u8> {
    fn from_term(term: &Term) -> DecodeResult<Self> {
        match term {
            Term::Bytes(b) => Ok(b.clone()),
            other => Err(unexpected(other)),
        }
    }
}

impl KnownSchema for time::OffsetDateTime {
    fn schema() -> Schema {
        Schema::UtcTime
    }
}
impl Encode for time::OffsetDateTime {
    fn to_term(&self) -> Term {
        Term::UtcTime(*self)
    }
}
impl Decode for time::OffsetDateTime {
    fn from_term(term: &Term) -> DecodeResult<Self> {
        match term {
            Term::UtcTime(t) => Ok(*t),
            other => Err(unexpected(other)),
        }
    }
}

impl<T: KnownSchema> KnownSchema for Option<T> {
    fn schema() -> Schema {
        crate::schema!(variant { None(product {}), Some(%T::schema()) })
    }
}
impl<T: Encode> Encode for Option<T> {
    fn to_term(&self) -> Term {
        match self {
            None => Term::variant(0, "None", Term::Product(vec![])),
            Some(v) => Term::variant(1, "Some", v.to_term()),
        }
    }
}
impl<T: Decode> Decode for Option<T> {
    fn from_term(term: &Term) -> DecodeResult<Self> {
        match term {
            Term::Variant { name, .. } if name == "None" => Ok(None),
            Term::Variant { name, payload, .. } if name == "Some" => Ok(Some(T::from_term(payload)?)),
            other => Err(unexpected(other)),
        }
    }
}

impl<T: KnownSchema> KnownSchema for Vec<T> {
    fn schema() -> Schema {
        Schema::Vector(Box::new(T::schema()))
    }
}
impl<T: Encode> Encode for Vec<T> {
    fn to_term(&self) -> Term {
        Term::Vector(self.iter().map(Encode::to_term).collect())
    }
}
impl<T: Decode> Decode for Vec<T> {
    fn from_term(term: &Term) -> DecodeResult<Self> {
        match term {
            Term::Vector(items) => items.iter().map(T::from_term).collect(),
            other => Err(unexpected(other)),
        }
    }
}

impl<T: KnownSchema + Eq + Hash> KnownSchema for HashSet<T> {
    fn schema() -> Schema {
        Schema::Vector(Box::new(T::schema()))
    }
}
impl<T: Encode + Eq + Hash> Encode for HashSet<T> {
    fn to_term(&self) -> Term {
        Term::Vector(self.iter().map(Encode::to_term).collect())
    }
}
impl<T: Decode + Eq + Hash> Decode for HashSet<T> {
    fn from_term(term: &Term) -> DecodeResult<Self> {
        match term {
            Term::Vector(items) => items.iter().map(T::from_term).collect(),
            other => Err(unexpected(other)),
        }
    }
}

impl<T: KnownSchema + Ord> KnownSchema for BTreeSet<T> {
    fn schema() -> Schema {
        Schema::Vector(Box::new(T::schema()))
    }
}
impl<T: Encode + Ord> Encode for BTreeSet<T> {
    fn to_term(&self) -> Term {
        Term::Vector(self.iter().map(Encode::to_term).collect())
    }
}
impl<T: Decode + Ord> Decode for BTreeSet<T> {
    fn from_term(term: &Term) -> DecodeResult<Self> {
        match term {
            Term::Vector(items) => items.iter().map(T::from_term).collect(),
            other => Err(unexpected(other)),
        }
    }
}

fn pair_schema(k: Schema, v: Schema) -> Schema {
    Schema::Product(vec![k, v])
}

impl<K: KnownSchema, V: KnownSchema> KnownSchema for HashMap<K, V> {
    fn schema() -> Schema {
        Schema::Vector(Box::new(pair_schema(K::schema(), V::schema())))
    }
}
impl<K: Encode, V: Encode> Encode for HashMap<K, V> {
    fn to_term(&self) -> Term {
        Term::Vector(
            self.iter().map(|(k, v)| Term::Product(vec![k.to_term(), v.to_term()])).collect(),
        )
    }
}
impl<K: Decode + Eq + Hash, V: Decode> Decode for HashMap<K, V> {
    fn from_term(term: &Term) -> DecodeResult<Self> {
        match term {
            Term::Vector(items) => items
                .iter()
                .map(|item| match item {
                    Term::Product(kv) if kv.len() == 2 => {
                        Ok((K::from_term(&kv[0])?, V::from_term(&kv[1])?))
                    }
                    other => Err(unexpected(other)),
                })
                .collect(),
            other => Err(unexpected(other)),
        }
    }
}

impl<K: KnownSchema + Ord, V: KnownSchema> KnownSchema for BTreeMap<K, V> {
    fn schema() -> Schema {
        Schema::Vector(Box::new(pair_schema(K::schema(), V::schema())))
    }
}
impl<K: Encode + Ord, V: Encode> Encode for BTreeMap<K, V> {
    fn to_term(&self) -> Term {
        Term::Vector(
            self.iter().map(|(k, v)| Term::Product(vec![k.to_term(), v.to_term()])).collect(),
        )
    }
}
impl<K: Decode + Ord, V: Decode> Decode for BTreeMap<K, V> {
    fn from_term(term: &Term) -> DecodeResult<Self> {
        match term {
            Term::Vector(items) => items
                .iter()
                .map(|item| match item {
                    Term::Product(kv) if kv.len() == 2 => {
                        Ok((K::from_term(&kv[0])?, V::from_term(&kv[1])?))
                    }
                    other => Err(unexpected(other)),
                })
                .collect(),
            other => Err(unexpected(other)),
        }
    }
}

impl<T: KnownSchema> KnownSchema for Box<T> {
    fn schema() -> Schema {
        T::schema()
    }
}
impl<T: Encode> Encode for Box<T> {
    fn to_term(&self) -> Term {
        T::to_term(self)
    }
}
impl<T: Decode> Decode for Box<T> {
    fn from_term(term: &Term) -> DecodeResult<Self> {
        Ok(Box::new(T::from_term(term)?))
    }
}

impl<'a, T: KnownSchema + ToOwned + ?Sized> KnownSchema for Cow<'a, T> {
    fn schema() -> Schema {
        T::schema()
    }
}

macro_rules! tuple_known_schema {
    ($($t:ident : $idx:tt),+) => {
        impl<$($t: KnownSchema),+> KnownSchema for ($($t,)+) {
            fn schema() -> Schema {
                Schema::Product(vec![$($t::schema()),+])
            }
        }
        impl<$($t: Encode),+> Encode for ($($t,)+) {
            fn to_term(&self) -> Term {
                Term::Product(vec![$(self.$idx.to_term()),+])
            }
        }
        impl<$($t: Decode),+> Decode for ($($t,)+) {
            fn from_term(term: &Term) -> DecodeResult<Self> {
                match term {
                    Term::Product(items) if items.len() == tuple_known_schema!(@count $($t)+) => {
                        Ok(($($t::from_term(&items[$idx])?,)+))
                    }
                    other => Err(unexpected(other)),
                }
            }
        }
    };
    (@count $($t:ident)+) => { <[()]>::len(&[$(tuple_known_schema!(@unit $t)),+]) };
    (@unit $t:ident) => { () };
}

tuple_known_schema!(A: 0, B: 1);
tuple_known_schema!(A: 0, B: 1, C: 2);
tuple_known_schema!(A: 0, B: 1, C: 2, D: 3);
tuple_known_schema!(A: 0, B: 1, C: 2, D: 3, E: 4);
tuple_known_schema!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
tuple_known_schema!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
tuple_known_schema!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_schema_is_a_two_ctor_variant() {
        assert_eq!(
            <Option<u8> as KnownSchema>::schema(),
            Schema::Variant(vec![
                ("None", Schema::Product(vec![])).into(),
                ("Some", Schema::W8).into(),
            ])
        );
    }

    #[test]
    fn vec_of_strings_round_trips_through_term() {
        let v = vec!["a".to_string(), "bee".to_string()];
        let term = v.to_term();
        let back: Vec<String> = Decode::from_term(&term).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn pair_tuple_round_trips() {
        let pair = (7u8, "x".to_string());
        let term = pair.to_term();
        let back: (u8, String) = Decode::from_term(&term).unwrap();
        assert_eq!(pair, back);
    }
}
