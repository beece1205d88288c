use crate::{bootstrap::bootstrap, error::DecodeError, schema::Schema};

/// Tracks, at each point in a value's traversal, which schema node is
/// expected next. Shared by the native `Encoder`, the native fast-path
/// decoder, and the generic `Term` decoder: none of them touch bytes here,
/// they only ask `CoderState` "does this API call conform to the schema?"
/// and get back the next schema to recurse into.
#[derive(Debug)]
pub struct CoderState<'a> {
    stack: Vec<StackFrame<'a>>,
    /// Bodies of currently-open `Fix` nodes, innermost last. `Self(n)`
    /// resolves by indexing from the end.
    fix_points: Vec<&'a Schema>,
}

#[derive(Debug)]
struct StackFrame<'a> {
    schema: &'a Schema,
    /// How many `fix_points` entries this frame is responsible for
    /// popping (0, 1, or more if `Fix`/`Self` nodes were transparently
    /// unwound to reach `schema`).
    fix_pushed: u32,
    api_state: ApiState,
}

#[derive(Debug)]
enum ApiState {
    /// This element needs to be coded and hasn't started.
    Need,
    /// An inner element is being coded; finishing it finishes this frame
    /// too (used for `Option::Some`-style and variant payloads).
    AutoFinish,
    Vector { len: usize, next: usize },
    Product { next: usize },
    Record { next: usize },
    /// A variant's tag has been read/written; its payload is the next
    /// thing pushed, via `AutoFinish` on this same frame.
    Variant,
}

fn mismatch(need: &Schema, got: &'static str) -> DecodeError {
    DecodeError::SchemaMismatch { need: need.kind_str(), got }
}

impl<'a> CoderState<'a> {
    pub fn new(schema: &'a Schema) -> Result<Self, DecodeError> {
        let mut state = CoderState { stack: Vec::new(), fix_points: Vec::new() };
        state.push_need(schema)?;
        Ok(state)
    }

    pub fn is_finished(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn is_finished_or_err(&self) -> Result<(), DecodeError> {
        if self.is_finished() {
            Ok(())
        } else {
            Err(DecodeError::ApiMisuse("coding did not finish"))
        }
    }

    fn top(&mut self) -> Result<&mut StackFrame<'a>, DecodeError> {
        self.stack
            .last_mut()
            .ok_or(DecodeError::ApiMisuse("usage of a finished coder"))
    }

    /// The schema node a caller must code next, without consuming anything.
    /// Callers (the generic decoder, the native encoder) use this to decide
    /// which `code_*`/`begin_*` method to call; the call itself remains the
    /// sole point of schema-conformance enforcement.
    pub fn peek(&self) -> Result<&'a Schema, DecodeError> {
        self.stack
            .last()
            .map(|frame| frame.schema)
            .ok_or(DecodeError::ApiMisuse("usage of a finished coder"))
    }

    /// Push a `Need` frame for `schema`, transparently unwrapping
    /// `Tag`, `SchemaRef`, `Fix`, and `Self` along the way. `SchemaRef` is
    /// substituted *before* any enclosing `Fix` it's nested under is
    /// bound (outside-in), per this crate's resolution of the open
    /// question in the schema-evolution literature this design follows.
    fn push_need(&mut self, mut schema: &'a Schema) -> Result<(), DecodeError> {
        let mut fix_pushed: u32 = 0;
        loop {
            match schema {
                Schema::Tag(_, inner) => schema = inner,
                Schema::SchemaRef(v) => schema = bootstrap(*v)?,
                Schema::Fix(body) => {
                    self.fix_points.push(body);
                    fix_pushed += 1;
                    schema = body;
                }
                &Schema::SelfRef(i) => {
                    let n = self.fix_points.len();
                    let idx = n
                        .checked_sub(1 + i as usize)
                        .ok_or(DecodeError::DanglingSelfRef(i))?;
                    let body = self.fix_points[idx];
                    self.fix_points.push(body);
                    fix_pushed += 1;
                    schema = body;
                }
                _ => break,
            }
        }
        self.stack.push(StackFrame { schema, fix_pushed, api_state: ApiState::Need });
        Ok(())
    }

    fn pop(&mut self) {
        let frame = self.stack.pop().expect("pop on already-finished coder");
        for _ in 0..frame.fix_pushed {
            self.fix_points.pop();
        }
        while let Some(&StackFrame { api_state: ApiState::AutoFinish, .. }) = self.stack.last() {
            let frame = self.stack.pop().unwrap();
            for _ in 0..frame.fix_pushed {
                self.fix_points.pop();
            }
        }
    }

    fn need_leaf(&mut self, want: fn(&Schema) -> bool, name: &'static str) -> Result<(), DecodeError> {
        let frame = self.top()?;
        match frame.api_state {
            ApiState::Need if want(frame.schema) => {}
            ApiState::Need => return Err(mismatch(frame.schema, name)),
            _ => return Err(DecodeError::ApiMisuse(name)),
        }
        self.pop();
        Ok(())
    }

    pub fn code_bool(&mut self) -> Result<(), DecodeError> {
        self.need_leaf(|s| matches!(s, Schema::Bool), "bool")
    }
    pub fn code_char(&mut self) -> Result<(), DecodeError> {
        self.need_leaf(|s| matches!(s, Schema::Char), "char")
    }
    pub fn code_w8(&mut self) -> Result<(), DecodeError> {
        self.need_leaf(|s| matches!(s, Schema::W8), "w8")
    }
    pub fn code_w16(&mut self) -> Result<(), DecodeError> {
        self.need_leaf(|s| matches!(s, Schema::W16), "w16")
    }
    pub fn code_w32(&mut self) -> Result<(), DecodeError> {
        self.need_leaf(|s| matches!(s, Schema::W32), "w32")
    }
    pub fn code_w64(&mut self) -> Result<(), DecodeError> {
        self.need_leaf(|s| matches!(s, Schema::W64), "w64")
    }
    pub fn code_i8(&mut self) -> Result<(), DecodeError> {
        self.need_leaf(|s| matches!(s, Schema::I8), "i8")
    }
    pub fn code_i16(&mut self) -> Result<(), DecodeError> {
        self.need_leaf(|s| matches!(s, Schema::I16), "i16")
    }
    pub fn code_i32(&mut self) -> Result<(), DecodeError> {
        self.need_leaf(|s| matches!(s, Schema::I32), "i32")
    }
    pub fn code_i64(&mut self) -> Result<(), DecodeError> {
        self.need_leaf(|s| matches!(s, Schema::I64), "i64")
    }
    pub fn code_integer(&mut self) -> Result<(), DecodeError> {
        self.need_leaf(|s| matches!(s, Schema::Integer), "integer")
    }
    pub fn code_float(&mut self) -> Result<(), DecodeError> {
        self.need_leaf(|s| matches!(s, Schema::Float), "float")
    }
    pub fn code_double(&mut self) -> Result<(), DecodeError> {
        self.need_leaf(|s| matches!(s, Schema::Double), "double")
    }
    pub fn code_bytes(&mut self) -> Result<(), DecodeError> {
        self.need_leaf(|s| matches!(s, Schema::Bytes), "bytes")
    }
    pub fn code_text(&mut self) -> Result<(), DecodeError> {
        self.need_leaf(|s| matches!(s, Schema::Text), "text")
    }
    pub fn code_utctime(&mut self) -> Result<(), DecodeError> {
        self.need_leaf(|s| matches!(s, Schema::UtcTime), "utctime")
    }

    /// Begin coding a vector of `len` elements. This should be followed by
    /// `len` calls to `begin_vector_elem`, then `finish_vector`.
    pub fn begin_vector(&mut self, len: usize) -> Result<(), DecodeError> {
        let frame = self.top()?;
        match (&frame.api_state, frame.schema) {
            (ApiState::Need, Schema::Vector(_)) => {}
            (ApiState::Need, other) => return Err(mismatch(other, "vector")),
            _ => return Err(DecodeError::ApiMisuse("need vector")),
        }
        frame.api_state = ApiState::Vector { len, next: 0 };
        Ok(())
    }

    pub fn begin_vector_elem(&mut self) -> Result<(), DecodeError> {
        let frame = self.top()?;
        let inner = match frame.schema {
            Schema::Vector(inner) => inner.as_ref(),
            other => return Err(mismatch(other, "vector elem")),
        };
        match &mut frame.api_state {
            ApiState::Vector { len, next } => {
                if *next >= *len {
                    return Err(DecodeError::ApiMisuse("too many vector elements"));
                }
                *next += 1;
            }
            _ => return Err(DecodeError::ApiMisuse("need vector elem")),
        }
        self.push_need(inner)
    }

    pub fn finish_vector(&mut self) -> Result<(), DecodeError> {
        let frame = self.top()?;
        match frame.api_state {
            ApiState::Vector { len, next } if len == next => {}
            ApiState::Vector { .. } => {
                return Err(DecodeError::ApiMisuse("vector finished with too few elements"))
            }
            _ => return Err(DecodeError::ApiMisuse("need vector finish")),
        }
        self.pop();
        Ok(())
    }

    /// Begin coding a fixed-arity positional tuple.
    pub fn begin_product(&mut self) -> Result<usize, DecodeError> {
        let frame = self.top()?;
        let arity = match (&frame.api_state, frame.schema) {
            (ApiState::Need, Schema::Product(items)) => items.len(),
            (ApiState::Need, other) => return Err(mismatch(other, "product")),
            _ => return Err(DecodeError::ApiMisuse("need product")),
        };
        frame.api_state = ApiState::Product { next: 0 };
        Ok(arity)
    }

    pub fn begin_product_elem(&mut self) -> Result<(), DecodeError> {
        let frame = self.top()?;
        let (items, next) = match (frame.schema, &mut frame.api_state) {
            (Schema::Product(items), ApiState::Product { next }) => (items, next),
            _ => return Err(DecodeError::ApiMisuse("need product elem")),
        };
        let inner = items
            .get(*next)
            .ok_or(DecodeError::ApiMisuse("product elem index past its arity"))?;
        *next += 1;
        self.push_need(inner)
    }

    pub fn finish_product(&mut self) -> Result<(), DecodeError> {
        let frame = self.top()?;
        match (frame.schema, &frame.api_state) {
            (Schema::Product(items), ApiState::Product { next }) if *next == items.len() => {}
            (Schema::Product(_), ApiState::Product { .. }) => {
                return Err(DecodeError::ApiMisuse("product finished with too few elements"))
            }
            _ => return Err(DecodeError::ApiMisuse("need product finish")),
        }
        self.pop();
        Ok(())
    }

    /// Begin coding a record. Fields are coded strictly in declared order.
    pub fn begin_record(&mut self) -> Result<usize, DecodeError> {
        let frame = self.top()?;
        let arity = match (&frame.api_state, frame.schema) {
            (ApiState::Need, Schema::Record(fields)) => fields.len(),
            (ApiState::Need, other) => return Err(mismatch(other, "record")),
            _ => return Err(DecodeError::ApiMisuse("need record")),
        };
        frame.api_state = ApiState::Record { next: 0 };
        Ok(arity)
    }

    /// Returns the declared name of the next field, and pushes its schema.
    pub fn begin_record_field(&mut self) -> Result<&'a str, DecodeError> {
        let frame = self.top()?;
        let (fields, next) = match (frame.schema, &mut frame.api_state) {
            (Schema::Record(fields), ApiState::Record { next }) => (fields, next),
            _ => return Err(DecodeError::ApiMisuse("need record field")),
        };
        let field = fields
            .get(*next)
            .ok_or(DecodeError::ApiMisuse("record field index past its arity"))?;
        *next += 1;
        let name = field.name.as_str();
        self.push_need(&field.schema)?;
        Ok(name)
    }

    pub fn finish_record(&mut self) -> Result<(), DecodeError> {
        let frame = self.top()?;
        match (frame.schema, &frame.api_state) {
            (Schema::Record(fields), ApiState::Record { next }) if *next == fields.len() => {}
            (Schema::Record(_), ApiState::Record { .. }) => {
                return Err(DecodeError::ApiMisuse("record finished with too few fields"))
            }
            _ => return Err(DecodeError::ApiMisuse("need record finish")),
        }
        self.pop();
        Ok(())
    }

    /// Begin coding a variant; returns the number of declared
    /// constructors, for bounds-checking a tag read off the wire.
    pub fn begin_variant(&mut self) -> Result<usize, DecodeError> {
        let frame = self.top()?;
        let num_variants = match (&frame.api_state, frame.schema) {
            (ApiState::Need, Schema::Variant(ctors)) => ctors.len(),
            (ApiState::Need, other) => return Err(mismatch(other, "variant")),
            _ => return Err(DecodeError::ApiMisuse("need variant")),
        };
        frame.api_state = ApiState::Variant;
        Ok(num_variants)
    }

    /// Select constructor `tag` within the variant begun by
    /// `begin_variant`. Returns its declared name and pushes its payload
    /// schema; the payload being finished auto-finishes this frame.
    pub fn begin_variant_ctor(&mut self, tag: u32) -> Result<&'a str, DecodeError> {
        let frame = self.top()?;
        let ctors = match (frame.schema, &frame.api_state) {
            (Schema::Variant(ctors), ApiState::Variant) => ctors,
            _ => return Err(DecodeError::ApiMisuse("need variant ctor")),
        };
        let ctor = ctors.get(tag as usize).ok_or(DecodeError::InvalidTag {
            tag,
            num_variants: ctors.len(),
        })?;
        frame.api_state = ApiState::AutoFinish;
        let name = ctor.name.as_str();
        self.push_need(&ctor.schema)?;
        Ok(name)
    }
}
