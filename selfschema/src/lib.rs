//! Self-describing binary serialization: every encoded payload carries its
//! own [`schema::Schema`] on the wire, so a reader with no prior knowledge
//! of the writer's types can still decode, inspect, and reconcile it
//! against a different (but compatible) target type.

pub mod bootstrap;
pub mod coder;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod extractor;
pub mod framing;
pub mod known;
pub mod primitive;
pub mod schema;
pub mod term;
pub mod varint;

pub use error::{DecodeError, Error, PlanError};
pub use framing::{deserialise, serialise};
pub use known::{Decode, Encode, KnownSchema};
pub use schema::{Schema, Tag};
pub use term::Term;

pub use selfschema_derive::Schema;
