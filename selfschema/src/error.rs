//! Error types for this crate, split along the two phases described by the
//! wire/planner design: data-level errors encountered while reading bytes,
//! and structural errors encountered while planning an `Extractor`.

use crate::schema::Schema;

/// A decode-time error: something wrong with the bytes themselves, or a
/// malformed schema discovered while walking them.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("invalid utf-8 in text")]
    InvalidUtf8,

    #[error("invalid tag {tag} for variant with {num_variants} constructors")]
    InvalidTag { tag: u32, num_variants: usize },

    #[error("{value} is not a valid unicode scalar value")]
    InvalidChar { value: u32 },

    #[error("unknown schema version {0}")]
    UnknownSchemaVersion(u8),

    #[error("varint does not fit target width")]
    VarintOverflow,

    #[error("malformed schema: self({0}) has no enclosing fix")]
    DanglingSelfRef(u8),

    #[error("schema non-conformance: need {need}, got {got}")]
    SchemaMismatch { need: &'static str, got: &'static str },

    #[error("api usage error: {0}")]
    ApiMisuse(&'static str),

    #[error("payload is empty")]
    EmptyInput,
}

/// A plan-time error: the writer's schema cannot be reconciled with the
/// requested type. Carries a human-readable path ("field `email` of
/// `User`") accumulated as the planner descends.
#[derive(Debug, thiserror::Error)]
#[error("{}: {kind}", join_path(path))]
pub struct PlanError {
    pub path: Vec<String>,
    pub kind: PlanErrorKind,
}

fn join_path(path: &[String]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(" of ")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlanErrorKind {
    #[error("schema mismatch: expected {expected}, got {got:?}")]
    SchemaMismatch { expected: &'static str, got: Schema },

    #[error("missing field `{0}` and no default supplied")]
    MissingField(String),

    #[error("constructor `{0}` present in writer's schema has no match in the target type")]
    UnknownConstructor(String),

    #[error("downcast failure while tying a recursive extractor's knot")]
    RecursionDowncastFailure,
}

impl PlanError {
    pub fn new(kind: PlanErrorKind) -> Self {
        PlanError { path: Vec::new(), kind }
    }

    /// Prepend a path segment, innermost-first (used as the error bubbles
    /// up through nested `plan` calls).
    pub fn with_context(mut self, segment: impl Into<String>) -> Self {
        self.path.insert(0, segment.into());
        self
    }
}

/// Top-level error unifying both phases, returned by the public
/// `serialise`/`deserialise` entry points.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

pub type DecodeResult<T> = Result<T, DecodeError>;
pub type PlanResult<T> = Result<T, PlanError>;
