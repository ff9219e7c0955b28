//! # Siftline Schema
//!
//! Schema-driven datum decoding for the Siftline record pipeline.
//!
//! Provides the schema model, the binary and JSON datum codecs, the
//! schema-resolving decoder that turns a byte input into a lazy sequence of
//! decoded containers, and the `readDatum` pipeline command that drives the
//! decoder over a record's attached byte stream.

pub mod binary;
pub mod decoder;
pub mod json;
pub mod read;
pub mod resolve;
pub mod schema;

pub use decoder::{Framing, ResolvingDecoder};
pub use read::{ReadDatum, ReadDatumBuilder, MEMORY_MIME_TYPE};
pub use schema::{Field, RecordSchema, Schema};
