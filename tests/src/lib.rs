use selfschema::{
    extractor::{self, Extractor, Planned},
    Decode, Encode, KnownSchema, Schema,
};
use std::{collections::HashMap, fmt::Debug};

#[cfg(test)]
fn round_trip<T>(val: T)
where
    T: Debug + PartialEq + Encode + Decode + Planned,
{
    let mut buf = Vec::new();
    selfschema::serialise(&val, &mut buf).unwrap();
    println!("{} bytes for {:?}", buf.len(), val);

    let extractor = T::extractor();
    let back: T = selfschema::deserialise(buf.as_slice(), &extractor).unwrap();
    assert_eq!(val, back);
}

#[derive(Debug, Clone, PartialEq, selfschema::Schema)]
pub struct Test1 {
    foo: u32,
    bar: String,
    baz: Vec<i16>,
    a: Test1StructUnit,
    b: Test1Struct0Tuple,
    c: Test1StructNewtype,
    d: Test1Struct2Tuple,
    h: char,
    maybe: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, selfschema::Schema)]
struct Test1StructUnit;

#[derive(Debug, Clone, PartialEq, selfschema::Schema)]
struct Test1Struct0Tuple();

#[derive(Debug, Clone, PartialEq, selfschema::Schema)]
struct Test1StructNewtype(f32);

#[derive(Debug, Clone, PartialEq, selfschema::Schema)]
struct Test1Struct2Tuple(f32, f64);

#[test]
fn test_1() {
    round_trip(Test1 {
        foo: 500,
        bar: "hello world".into(),
        baz: vec![7, -3, 0, 1200],
        a: Test1StructUnit,
        b: Test1Struct0Tuple(),
        c: Test1StructNewtype(3.5),
        d: Test1Struct2Tuple(4.2, 2.6),
        h: 'f',
        maybe: Some(-9),
    });
}

#[derive(Debug, Clone, PartialEq, selfschema::Schema)]
pub struct Test2Outer {
    first: Test2Inner,
    second: Test2Inner,
}

#[derive(Debug, Clone, PartialEq, selfschema::Schema)]
pub enum Test2Inner {
    Foo(u32),
    Bar { a: HashMap<String, String>, b: (i32, f32) },
    Empty,
}

#[test]
fn test_2() {
    round_trip(Test2Outer {
        first: Test2Inner::Foo(4),
        second: {
            let mut map = HashMap::new();
            map.insert("foo_key".into(), "foo_val".into());
            Test2Inner::Bar { a: map, b: (42, 3.14) }
        },
    });
    round_trip(Test2Outer { first: Test2Inner::Empty, second: Test2Inner::Foo(0) });
}

#[derive(Debug, Clone, PartialEq, selfschema::Schema)]
pub enum BinaryTree {
    Branch {
        value: u32,
        #[schema(recurse)]
        left: Box<BinaryTree>,
        #[schema(recurse)]
        right: Box<BinaryTree>,
    },
    Leaf(u32),
}

#[test]
fn binary_tree_round_trips() {
    round_trip(BinaryTree::Branch {
        value: 5,
        left: Box::new(BinaryTree::Leaf(2)),
        right: Box::new(BinaryTree::Branch {
            value: 10,
            left: Box::new(BinaryTree::Leaf(7)),
            right: Box::new(BinaryTree::Leaf(20)),
        }),
    });
}

#[derive(Debug, Clone, PartialEq, selfschema::Schema)]
pub struct LinkedList {
    value: i32,
    #[schema(recurse)]
    next: Option<Box<LinkedList>>,
}

#[test]
fn linked_list_round_trips() {
    round_trip(LinkedList {
        value: 1,
        next: Some(Box::new(LinkedList { value: 2, next: Some(Box::new(LinkedList { value: 3, next: None })) })),
    });
}

/// Schema evolution: a reader's extractor is planned against an *older* (or
/// newer) writer's schema, never its own. Adding a field with a default or
/// dropping one must not fail to plan; a target missing one of the
/// writer's variant cases must.
mod evolution {
    use super::*;

    #[derive(Debug, Clone, PartialEq, selfschema::Schema)]
    struct PersonV1 {
        name: String,
        age: u32,
    }

    #[derive(Debug, Clone, PartialEq, selfschema::Schema)]
    struct PersonV2 {
        name: String,
        age: u32,
        nickname: Option<String>,
    }

    #[test]
    fn reading_an_older_writer_fills_in_a_default_for_the_new_field() {
        assert_ne!(PersonV1::schema(), PersonV2::schema());

        let v1 = PersonV1 { name: "Ada".into(), age: 36 };
        let mut buf = Vec::new();
        selfschema::serialise(&v1, &mut buf).unwrap();

        let extractor = PersonV2::extractor();
        let v2: PersonV2 = selfschema::deserialise(buf.as_slice(), &extractor).unwrap();
        assert_eq!(v2, PersonV2 { name: "Ada".into(), age: 36, nickname: None });
    }

    #[derive(Debug, Clone, PartialEq, selfschema::Schema)]
    struct PersonV0 {
        name: String,
        age: u32,
        legacy_field: bool,
    }

    #[test]
    fn reading_a_newer_writer_drops_the_unknown_field() {
        let v0 = PersonV0 { name: "Grace".into(), age: 40, legacy_field: true };
        let mut buf = Vec::new();
        selfschema::serialise(&v0, &mut buf).unwrap();

        let extractor = PersonV1::extractor();
        let v1: PersonV1 = selfschema::deserialise(buf.as_slice(), &extractor).unwrap();
        assert_eq!(v1, PersonV1 { name: "Grace".into(), age: 40 });
    }

    #[derive(Debug, Clone, PartialEq, selfschema::Schema)]
    enum ShapeV1 {
        Circle { radius: f64 },
        Square { side: f64 },
    }

    #[derive(Debug, Clone, PartialEq, selfschema::Schema)]
    enum ShapeV2 {
        Circle { radius: f64 },
        Square { side: f64 },
        Triangle { base: f64, height: f64 },
    }

    #[test]
    fn a_target_with_extra_unused_cases_plans_fine_against_an_older_writer() {
        let v1 = ShapeV1::Square { side: 2.0 };
        let mut buf = Vec::new();
        selfschema::serialise(&v1, &mut buf).unwrap();

        let extractor = ShapeV2::extractor();
        let v2: ShapeV2 = selfschema::deserialise(buf.as_slice(), &extractor).unwrap();
        assert_eq!(v2, ShapeV2::Square { side: 2.0 });
    }

    #[test]
    fn a_target_missing_a_writer_case_fails_to_plan() {
        let v2 = ShapeV2::Triangle { base: 3.0, height: 4.0 };
        let mut buf = Vec::new();
        selfschema::serialise(&v2, &mut buf).unwrap();

        let extractor = ShapeV1::extractor();
        let result: Result<ShapeV1, _> = selfschema::deserialise(buf.as_slice(), &extractor);
        assert!(result.is_err());
    }
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn u64_round_trips_through_the_wire(n: u64) {
            let mut buf = Vec::new();
            selfschema::serialise(&n, &mut buf).unwrap();
            let back: u64 = selfschema::deserialise(buf.as_slice(), &extractor::widen_u64()).unwrap();
            prop_assert_eq!(n, back);
        }

        #[test]
        fn i64_round_trips_through_the_wire(n: i64) {
            let mut buf = Vec::new();
            selfschema::serialise(&n, &mut buf).unwrap();
            let back: i64 = selfschema::deserialise(buf.as_slice(), &extractor::widen_i64()).unwrap();
            prop_assert_eq!(n, back);
        }

        #[test]
        fn arbitrary_strings_round_trip_through_the_wire(s: String) {
            let mut buf = Vec::new();
            selfschema::serialise(&s, &mut buf).unwrap();
            let back: String = selfschema::deserialise(buf.as_slice(), &extractor::text()).unwrap();
            prop_assert_eq!(s, back);
        }
    }
}

/// Hand-assembled extractors, the shape the derive macro itself generates
/// calls into — exercised directly so failures here aren't masked by
/// anything the macro does.
mod extractor_combinators {
    use super::*;

    #[test]
    fn widen_u64_accepts_any_unsigned_fixed_width_writer() {
        let ext: Extractor<u64> = extractor::widen_u64();
        let plan = ext.plan(&Schema::W16).unwrap();
        let term = selfschema::Term::W16(999);
        assert_eq!(plan.apply(&term), 999);
    }

    #[test]
    fn option_tolerates_a_some_and_a_none_term_under_the_same_plan() {
        let ext: Extractor<Option<u32>> = extractor::option(extractor::widen_u64().map(|n| n as u32));
        let schema = <Option<u32> as KnownSchema>::schema();
        let plan = ext.plan(&schema).unwrap();
        let some_term = selfschema::Term::variant(1, "Some", selfschema::Term::W32(7));
        assert_eq!(plan.apply(&some_term), Some(7));
        let none_term = selfschema::Term::variant(0, "None", selfschema::Term::Product(vec![]));
        assert_eq!(plan.apply(&none_term), None);
    }

    #[test]
    fn option_dispatches_by_position_not_by_the_writer_constructor_names() {
        let ext: Extractor<Option<i32>> = extractor::option(extractor::widen_i64().map(|n| n as i32));
        let writer_schema = Schema::Variant(vec![
            ("Nothing", Schema::Product(vec![])).into(),
            ("Just", Schema::I32).into(),
        ]);
        let plan = ext.plan(&writer_schema).unwrap();
        let some_term = selfschema::Term::variant(1, "Just", selfschema::Term::I32(42));
        assert_eq!(plan.apply(&some_term), Some(42));
        let none_term = selfschema::Term::variant(0, "Nothing", selfschema::Term::Product(vec![]));
        assert_eq!(plan.apply(&none_term), None);
    }

    #[test]
    fn result_dispatches_by_position_not_by_the_writer_constructor_names() {
        let ext: Extractor<Result<i32, String>> = extractor::result_(
            extractor::widen_i64().map(|n| n as i32),
            extractor::text(),
        );
        let writer_schema = Schema::Variant(vec![
            ("Success", Schema::I32).into(),
            ("Failure", Schema::Text).into(),
        ]);
        let plan = ext.plan(&writer_schema).unwrap();
        let ok_term = selfschema::Term::variant(0, "Success", selfschema::Term::I32(7));
        assert_eq!(plan.apply(&ok_term), Ok(7));
        let err_term = selfschema::Term::variant(1, "Failure", selfschema::Term::Text("bad".into()));
        assert_eq!(plan.apply(&err_term), Err("bad".to_string()));
    }
}
