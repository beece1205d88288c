//! The schema-driven stack machine shared by every encoder and decoder in
//! this crate. Nothing here touches bytes: `CoderState` only tracks, at
//! each point in a value's traversal, which schema node is expected next
//! and validates API usage against it. `Encoder` and `Decoder` (and the
//! `Term` decoder) each drive one `CoderState` while doing their own I/O.

mod state;

pub use state::CoderState;
