//! The planner. An `Extractor<T>` is planned once against a writer's
//! [`Schema`] (`plan`), producing a [`TermFn<T>`] that then applies to any
//! number of [`Term`]s decoded under that same schema. All schema
//! reconciliation happens in `plan`; `TermFn::apply` cannot fail — every
//! failure mode (a missing field with no default, an unknown variant
//! constructor, a shape mismatch) is caught once, up front.
//!
//! Record/variant planning is what the derive macro generates calls into:
//! it gets the writer's field/constructor list once, then plans one
//! sub-extractor per target field/case, and zips the results into the
//! host type's constructor.

use crate::{
    error::{PlanError, PlanErrorKind, PlanResult},
    schema,
    schema::{RecordField, Schema, VariantCtor},
    term::Term,
};
use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    hash::Hash,
    rc::Rc,
};

/// A planned, infallible projection from a decoded term to a host value.
pub struct TermFn<T>(Rc<dyn Fn(&Term) -> T>);

impl<T> Clone for TermFn<T> {
    fn clone(&self) -> Self {
        TermFn(self.0.clone())
    }
}

impl<T: 'static> TermFn<T> {
    pub fn new(f: impl Fn(&Term) -> T + 'static) -> Self {
        TermFn(Rc::new(f))
    }

    pub fn apply(&self, term: &Term) -> T {
        (self.0)(term)
    }

    pub fn constant(value: T) -> Self
    where
        T: Clone,
    {
        TermFn::new(move |_| value.clone())
    }
}

/// A not-yet-planned extraction strategy for `T`.
pub struct Extractor<T>(Rc<dyn Fn(&Schema) -> PlanResult<TermFn<T>>>);

impl<T> Clone for Extractor<T> {
    fn clone(&self) -> Self {
        Extractor(self.0.clone())
    }
}

impl<T: 'static> Extractor<T> {
    pub fn new(f: impl Fn(&Schema) -> PlanResult<TermFn<T>> + 'static) -> Self {
        Extractor(Rc::new(f))
    }

    pub fn plan(&self, schema: &Schema) -> PlanResult<TermFn<T>> {
        (self.0)(schema)
    }

    pub fn map<U: 'static>(self, f: impl Fn(T) -> U + 'static) -> Extractor<U> {
        let f = Rc::new(f);
        Extractor::new(move |schema| {
            let inner = self.plan(schema)?;
            let f = f.clone();
            Ok(TermFn::new(move |term| f(inner.apply(term))))
        })
    }

    /// Try `self`; if it fails to plan against the writer's schema, fall
    /// back to `other`. Matches spec's `or` combinator, used to accept more
    /// than one writer shape for the same target type.
    pub fn or(self, other: Extractor<T>) -> Extractor<T> {
        Extractor::new(move |schema| self.plan(schema).or_else(|_| other.plan(schema)))
    }

    /// Ties a recursive extractor's knot: `f` receives a handle to the
    /// extractor being defined (usable for `Self`-typed fields) and must
    /// return the complete definition. Every use of `T` is the same
    /// concrete Rust type throughout the recursion, so no type erasure is
    /// needed here — only the fact that `build` hasn't run yet when `f`
    /// closes over the handle.
    pub fn fix(f: impl FnOnce(Extractor<T>) -> Extractor<T>) -> Extractor<T> {
        use std::cell::RefCell;
        let slot: Rc<RefCell<Option<Rc<dyn Fn(&Schema) -> PlanResult<TermFn<T>>>>>> =
            Rc::new(RefCell::new(None));
        let slot_for_ref = slot.clone();
        let self_ref = Extractor::new(move |schema| {
            let inner = slot_for_ref
                .borrow()
                .clone()
                .expect("Extractor::fix: recursive reference planned before being tied");
            inner(schema)
        });
        let built = f(self_ref);
        *slot.borrow_mut() = Some(built.0.clone());
        built
    }
}

fn mismatch<T>(expected: &'static str, got: &Schema) -> PlanResult<T> {
    Err(PlanError::new(PlanErrorKind::SchemaMismatch { expected, got: got.clone() }))
}

/// Builds an `Extractor<T>` that succeeds only against an exact schema
/// shape, pulling the value out of the matching `Term` variant.
fn exact<T: 'static>(
    want: fn(&Schema) -> bool,
    expected: &'static str,
    extract: fn(&Term) -> T,
) -> Extractor<T> {
    Extractor::new(move |schema| {
        if want(schema) {
            Ok(TermFn::new(move |term| extract(term)))
        } else {
            mismatch(expected, schema)
        }
    })
}

pub fn bool_() -> Extractor<bool> {
    exact(|s| matches!(s, Schema::Bool), "bool", |t| match t {
        Term::Bool(b) => *b,
        _ => unreachable!("planned against Schema::Bool"),
    })
}

pub fn char_() -> Extractor<char> {
    exact(|s| matches!(s, Schema::Char), "char", |t| match t {
        Term::Char(c) => *c,
        _ => unreachable!("planned against Schema::Char"),
    })
}

pub fn text() -> Extractor<String> {
    exact(|s| matches!(s, Schema::Text), "text", |t| match t {
        Term::Text(s) => s.clone(),
        _ => unreachable!("planned against Schema::Text"),
    })
}

pub fn bytes() -> Extractor<Vec<u8>> {
    exact(|s| matches!(s, Schema::Bytes), "bytes", |t| match t {
        Term::Bytes(b) => b.clone(),
        _ => unreachable!("planned against Schema::Bytes"),
    })
}

pub fn utctime() -> Extractor<time::OffsetDateTime> {
    exact(|s| matches!(s, Schema::UtcTime), "utctime", |t| match t {
        Term::UtcTime(v) => *v,
        _ => unreachable!("planned against Schema::UtcTime"),
    })
}

/// Widens any of the fixed-width unsigned leaves plus `Integer` into a
/// `u64`. Stands in for spec's "numeric widening" extractor family: the
/// actual narrowing to a specific target width is left to `.map`.
pub fn widen_u64() -> Extractor<u64> {
    Extractor::new(|schema| match schema {
        Schema::W8 => Ok(TermFn::new(|t| match t {
            Term::W8(n) => *n as u64,
            _ => unreachable!(),
        })),
        Schema::W16 => Ok(TermFn::new(|t| match t {
            Term::W16(n) => *n as u64,
            _ => unreachable!(),
        })),
        Schema::W32 => Ok(TermFn::new(|t| match t {
            Term::W32(n) => *n as u64,
            _ => unreachable!(),
        })),
        Schema::W64 => Ok(TermFn::new(|t| match t {
            Term::W64(n) => *n,
            _ => unreachable!(),
        })),
        Schema::Integer => Ok(TermFn::new(|t| match t {
            Term::Integer(n) => *n as u64,
            _ => unreachable!(),
        })),
        other => mismatch("an unsigned integer leaf", other),
    })
}

/// Widens any fixed-width signed leaf plus `Integer` into an `i64`.
pub fn widen_i64() -> Extractor<i64> {
    Extractor::new(|schema| match schema {
        Schema::I8 => Ok(TermFn::new(|t| match t {
            Term::I8(n) => *n as i64,
            _ => unreachable!(),
        })),
        Schema::I16 => Ok(TermFn::new(|t| match t {
            Term::I16(n) => *n as i64,
            _ => unreachable!(),
        })),
        Schema::I32 => Ok(TermFn::new(|t| match t {
            Term::I32(n) => *n as i64,
            _ => unreachable!(),
        })),
        Schema::I64 => Ok(TermFn::new(|t| match t {
            Term::I64(n) => *n,
            _ => unreachable!(),
        })),
        Schema::Integer => Ok(TermFn::new(|t| match t {
            Term::Integer(n) => *n as i64,
            _ => unreachable!(),
        })),
        other => mismatch("a signed integer leaf", other),
    })
}

/// Widens `Float`/`Double` into an `f64`.
pub fn widen_f64() -> Extractor<f64> {
    Extractor::new(|schema| match schema {
        Schema::Float => Ok(TermFn::new(|t| match t {
            Term::Float(n) => *n as f64,
            _ => unreachable!(),
        })),
        Schema::Double => Ok(TermFn::new(|t| match t {
            Term::Double(n) => *n,
            _ => unreachable!(),
        })),
        other => mismatch("a floating-point leaf", other),
    })
}

/// Homogenous sequence, reused (per spec) as the basis for set/map
/// extractors below.
pub fn vector<T: 'static>(item: Extractor<T>) -> Extractor<Vec<T>> {
    Extractor::new(move |schema| match schema {
        Schema::Vector(inner) => {
            let inner_fn = item.plan(inner).map_err(|e| e.with_context("vector element"))?;
            Ok(TermFn::new(move |term| match term {
                Term::Vector(items) => items.iter().map(|t| inner_fn.apply(t)).collect(),
                _ => unreachable!("planned against Schema::Vector"),
            }))
        }
        other => mismatch("vector(..)", other),
    })
}

pub fn hash_set<T: 'static + Eq + Hash>(item: Extractor<T>) -> Extractor<HashSet<T>> {
    vector(item).map(|items: Vec<T>| items.into_iter().collect())
}

pub fn btree_set<T: 'static + Ord>(item: Extractor<T>) -> Extractor<BTreeSet<T>> {
    vector(item).map(|items: Vec<T>| items.into_iter().collect())
}

fn pair<A: 'static, B: 'static>(a: Extractor<A>, b: Extractor<B>) -> Extractor<(A, B)> {
    Extractor::new(move |schema| match schema {
        Schema::Product(items) if items.len() == 2 => {
            let a_fn = a.plan(&items[0]).map_err(|e| e.with_context("pair.0"))?;
            let b_fn = b.plan(&items[1]).map_err(|e| e.with_context("pair.1"))?;
            Ok(TermFn::new(move |term| match term {
                Term::Product(items) if items.len() == 2 => {
                    (a_fn.apply(&items[0]), b_fn.apply(&items[1]))
                }
                _ => unreachable!("planned against a 2-element Schema::Product"),
            }))
        }
        other => mismatch("product {(_), (_)}", other),
    })
}

pub fn hash_map<K: 'static + Eq + Hash, V: 'static>(
    key: Extractor<K>,
    val: Extractor<V>,
) -> Extractor<HashMap<K, V>> {
    vector(pair(key, val)).map(|items: Vec<(K, V)>| items.into_iter().collect())
}

pub fn btree_map<K: 'static + Ord, V: 'static>(
    key: Extractor<K>,
    val: Extractor<V>,
) -> Extractor<BTreeMap<K, V>> {
    vector(pair(key, val)).map(|items: Vec<(K, V)>| items.into_iter().collect())
}

/// Builds a target `Variant`-backed type from one `Extractor` per target
/// constructor. Plans eagerly against every constructor in the *writer's*
/// schema (not just the target's): every writer constructor needs a
/// matching target case or planning fails outright, so `TermFn::apply`
/// cannot hit an unhandled tag. Target constructors absent from the
/// writer's schema are allowed and simply never selected — this is the
/// "variant subset tolerance" spec.md describes.
pub fn variant<T: 'static>(cases: Vec<(&'static str, Extractor<T>)>) -> Extractor<T> {
    Extractor::new(move |schema| {
        let ctors: &[VariantCtor] = match schema {
            Schema::Variant(ctors) => ctors,
            other => return mismatch("variant {..}", other),
        };
        let mut planned = Vec::with_capacity(ctors.len());
        for ctor in ctors {
            let (_, case_extractor) = cases
                .iter()
                .find(|(name, _)| *name == ctor.name)
                .ok_or_else(|| PlanError::new(PlanErrorKind::UnknownConstructor(ctor.name.clone())))?;
            let term_fn = case_extractor
                .plan(&ctor.schema)
                .map_err(|e| e.with_context(format!("constructor `{}`", ctor.name)))?;
            planned.push(term_fn);
        }
        Ok(TermFn::new(move |term| match term {
            Term::Variant { tag, payload, .. } => planned[*tag as usize].apply(payload),
            _ => unreachable!("planned against Schema::Variant"),
        }))
    })
}

/// Accepts any two-constructor `Variant`, dispatching by tag rather than by
/// the writer's constructor names: tag 0 is none, tag 1 is some. A writer
/// that spells its constructors `"Nothing"`/`"Just"` plans identically to
/// one spelling them `"None"`/`"Some"`.
pub fn option<T: 'static>(inner: Extractor<T>) -> Extractor<Option<T>> {
    Extractor::new(move |schema| {
        let ctors: &[VariantCtor] = match schema {
            Schema::Variant(ctors) if ctors.len() == 2 => ctors,
            other => return mismatch("variant {..} of exactly two constructors", other),
        };
        let some_fn = inner
            .plan(&ctors[1].schema)
            .map_err(|e| e.with_context("variant index 1 (some)"))?;
        Ok(TermFn::new(move |term| match term {
            Term::Variant { tag, payload, .. } => {
                if *tag == 0 {
                    None
                } else {
                    Some(some_fn.apply(payload))
                }
            }
            _ => unreachable!("planned against Schema::Variant"),
        }))
    })
}

/// Accepts any two-constructor `Variant`, dispatching by tag: index 0 is
/// `Ok`, index 1 is `Err`, regardless of what the writer named them.
pub fn result_<A: 'static, B: 'static>(ok: Extractor<A>, err: Extractor<B>) -> Extractor<Result<A, B>> {
    Extractor::new(move |schema| {
        let ctors: &[VariantCtor] = match schema {
            Schema::Variant(ctors) if ctors.len() == 2 => ctors,
            other => return mismatch("variant {..} of exactly two constructors", other),
        };
        let ok_fn = ok.plan(&ctors[0].schema).map_err(|e| e.with_context("variant index 0 (ok)"))?;
        let err_fn = err.plan(&ctors[1].schema).map_err(|e| e.with_context("variant index 1 (err)"))?;
        Ok(TermFn::new(move |term| match term {
            Term::Variant { tag, payload, .. } => {
                if *tag == 0 {
                    Ok(ok_fn.apply(payload))
                } else {
                    Err(err_fn.apply(payload))
                }
            }
            _ => unreachable!("planned against Schema::Variant"),
        }))
    })
}

/// The empty `Product {}`, used for unit-like variant payloads.
pub fn unit() -> Extractor<()> {
    Extractor::new(|schema| match schema {
        Schema::Product(items) if items.is_empty() => Ok(TermFn::new(|_| ())),
        other => mismatch("product {}", other),
    })
}

/// Returns the writer's declared field list, erroring if the writer's
/// schema at this point isn't a `Record` at all.
pub fn record_fields(schema: &Schema) -> PlanResult<&[RecordField]> {
    match schema {
        Schema::Record(fields) => Ok(fields),
        other => Err(PlanError::new(PlanErrorKind::SchemaMismatch { expected: "record {..}", got: other.clone() })),
    }
}

/// A type that knows how to plan its own `Extractor`, so that composite
/// extractors (`vector`, `option`, record/variant fields) can be built
/// generically over field types instead of requiring every call site to
/// hand-assemble one. `#[derive(Schema)]` emits an impl of this trait
/// alongside `KnownSchema`/`Encode`/`Decode`.
pub trait Planned: crate::known::KnownSchema + Sized {
    fn extractor() -> Extractor<Self>;
}

macro_rules! planned_via_widen {
    ($($t:ty: $widen:ident as $cast:ty,)*) => {$(
        impl Planned for $t {
            fn extractor() -> Extractor<Self> {
                $widen().map(|n| n as $cast)
            }
        }
    )*};
}

planned_via_widen!(
    u8: widen_u64 as u8,
    u16: widen_u64 as u16,
    u32: widen_u64 as u32,
    u64: widen_u64 as u64,
    i8: widen_i64 as i8,
    i16: widen_i64 as i16,
    i32: widen_i64 as i32,
    i64: widen_i64 as i64,
    f32: widen_f64 as f32,
    f64: widen_f64 as f64,
);

impl Planned for bool {
    fn extractor() -> Extractor<Self> {
        bool_()
    }
}
impl Planned for char {
    fn extractor() -> Extractor<Self> {
        char_()
    }
}
impl Planned for String {
    fn extractor() -> Extractor<Self> {
        text()
    }
}
impl Planned for Vec<u8> {
    fn extractor() -> Extractor<Self> {
        bytes()
    }
}
impl Planned for time::OffsetDateTime {
    fn extractor() -> Extractor<Self> {
        utctime()
    }
}
impl<T: Planned + 'static> Planned for Option<T> {
    fn extractor() -> Extractor<Self> {
        option(T::extractor())
    }
}
impl<T: Planned + 'static> Planned for Vec<T> {
    fn extractor() -> Extractor<Self> {
        vector(T::extractor())
    }
}
impl<T: Planned + 'static + Eq + Hash> Planned for HashSet<T> {
    fn extractor() -> Extractor<Self> {
        hash_set(T::extractor())
    }
}
impl<T: Planned + 'static + Ord> Planned for BTreeSet<T> {
    fn extractor() -> Extractor<Self> {
        btree_set(T::extractor())
    }
}
impl<K: Planned + 'static + Eq + Hash, V: Planned + 'static> Planned for HashMap<K, V> {
    fn extractor() -> Extractor<Self> {
        hash_map(K::extractor(), V::extractor())
    }
}
impl<K: Planned + 'static + Ord, V: Planned + 'static> Planned for BTreeMap<K, V> {
    fn extractor() -> Extractor<Self> {
        btree_map(K::extractor(), V::extractor())
    }
}
impl<T: Planned + 'static> Planned for Box<T> {
    fn extractor() -> Extractor<Self> {
        T::extractor().map(Box::new)
    }
}

impl Planned for () {
    fn extractor() -> Extractor<Self> {
        unit()
    }
}
impl<A: Planned + 'static, B: Planned + 'static> Planned for (A, B) {
    fn extractor() -> Extractor<Self> {
        pair(A::extractor(), B::extractor())
    }
}

macro_rules! tuple_planned {
    ($($t:ident : $idx:tt),+) => {
        impl<$($t: Planned + 'static),+> Planned for ($($t,)+) {
            fn extractor() -> Extractor<Self> {
                Extractor::new(|schema| {
                    let items = product_fields(schema)?;
                    $(let $t = product_field(items, $idx, $t::extractor())?;)+
                    Ok(TermFn::new(move |term| ($($t.apply(term),)+)))
                })
            }
        }
    };
}

tuple_planned!(A: 0, B: 1, C: 2);
tuple_planned!(A: 0, B: 1, C: 2, D: 3);
tuple_planned!(A: 0, B: 1, C: 2, D: 3, E: 4);
tuple_planned!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
tuple_planned!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);

/// Plans one target field against the writer's field list. The returned
/// `TermFn` operates on the *whole* `Term::Record`, looking its own field
/// up by name — this lets the derive macro assemble a struct from N
/// independently-planned `record_field` calls without threading any
/// shared index state between them.
pub fn record_field<T: 'static + Clone>(
    writer_fields: &[RecordField],
    name: &'static str,
    extractor: Extractor<T>,
    default: Option<T>,
) -> PlanResult<TermFn<T>> {
    match writer_fields.iter().find(|f| f.name == name) {
        Some(f) => {
            let inner =
                extractor.plan(&f.schema).map_err(|e| e.with_context(format!("field `{}`", name)))?;
            Ok(TermFn::new(move |term| match term {
                Term::Record(entries) => entries
                    .iter()
                    .find(|(n, _)| n.as_str() == name)
                    .map(|(_, t)| inner.apply(t))
                    .expect("field present at plan time must be present at apply time"),
                _ => unreachable!("planned against Schema::Record"),
            }))
        }
        None => match default {
            Some(d) => Ok(TermFn::constant(d)),
            None => Err(PlanError::new(PlanErrorKind::MissingField(name.to_string()))),
        },
    }
}

/// Returns the writer's positional item list, erroring if the writer's
/// schema at this point isn't a `Product` at all. Tuple structs plan
/// against this the way named structs plan against [`record_fields`]; since
/// positions carry no name, there is no tolerance for a writer with fewer
/// items than the target — that shows up as a plan-time `SchemaMismatch`.
pub fn product_fields(schema: &Schema) -> PlanResult<&[Schema]> {
    match schema {
        Schema::Product(items) => Ok(items),
        other => Err(PlanError::new(PlanErrorKind::SchemaMismatch { expected: "product {..}", got: other.clone() })),
    }
}

/// Plans one positional target field against the writer's item list, by
/// analogy with [`record_field`].
pub fn product_field<T: 'static>(
    writer_items: &[Schema],
    index: usize,
    extractor: Extractor<T>,
) -> PlanResult<TermFn<T>> {
    let item_schema = writer_items.get(index).ok_or_else(|| {
        PlanError::new(PlanErrorKind::SchemaMismatch {
            expected: "product field present at this position",
            got: Schema::Product(writer_items.to_vec()),
        })
    })?;
    let inner = extractor
        .plan(item_schema)
        .map_err(|e| e.with_context(format!("product field {}", index)))?;
    Ok(TermFn::new(move |term| match term {
        Term::Product(items) => inner.apply(&items[index]),
        _ => unreachable!("planned against Schema::Product"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    #[test]
    fn exact_primitive_rejects_wrong_schema() {
        assert!(bool_().plan(&schema!(w8)).is_err());
    }

    #[test]
    fn numeric_widening_accepts_any_unsigned_leaf() {
        let plan = widen_u64().plan(&schema!(w16)).unwrap();
        assert_eq!(plan.apply(&Term::W16(9)), 9u64);
    }

    #[test]
    fn option_plans_against_none_some_variant() {
        let s = schema!(variant { None(product {}), Some(w8) });
        let ext = option(widen_u64().map(|n| n as u8));
        let term_fn = ext.plan(&s).unwrap();
        assert_eq!(term_fn.apply(&Term::variant(0, "None", Term::Product(vec![]))), None);
        assert_eq!(term_fn.apply(&Term::variant(1, "Some", Term::W8(5))), Some(5));
    }

    #[test]
    fn variant_with_unknown_writer_constructor_fails_to_plan() {
        let s = schema!(variant { A(product {}), B(product {}) });
        let ext: Extractor<()> = variant(vec![("A", unit())]);
        assert!(ext.plan(&s).is_err());
    }

    #[test]
    fn missing_record_field_without_default_fails_to_plan() {
        let s = schema!(record { a: w8 });
        let fields = record_fields(&s).unwrap();
        let result: PlanResult<TermFn<String>> = record_field(fields, "b", text(), None);
        assert!(result.is_err());
    }

    #[test]
    fn missing_record_field_with_default_succeeds() {
        let s = schema!(record { a: w8 });
        let fields = record_fields(&s).unwrap();
        let term_fn = record_field(fields, "b", text(), Some("fallback".to_string())).unwrap();
        let term = Term::Record(vec![("a".to_string(), Term::W8(1))]);
        assert_eq!(term_fn.apply(&term), "fallback");
    }

    #[test]
    fn extra_writer_fields_are_ignored() {
        let s = schema!(record { a: w8, extra: text });
        let fields = record_fields(&s).unwrap();
        let term_fn = record_field(fields, "a", widen_u64().map(|n| n as u8), None).unwrap();
        let term = Term::Record(vec![
            ("a".to_string(), Term::W8(3)),
            ("extra".to_string(), Term::Text("ignored".to_string())),
        ]);
        assert_eq!(term_fn.apply(&term), 3);
    }
}
