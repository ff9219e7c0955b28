//! The schema-resolving decoder.
//!
//! Wraps a byte input behind a declared writer schema and an optional,
//! possibly different reader schema, and yields one fully decoded container
//! per call until the input reaches a clean boundary. The framing strategy
//! (binary or self-describing text) is fixed at construction time.
//!
//! End-of-stream handling is structural, never sentinel-based: in binary
//! mode a single leading byte is probed before each datum — zero bytes at a
//! container start is normal termination, while running dry anywhere after
//! that byte is a hard decode failure. In JSON mode the stream deserializer
//! distinguishes exhaustion from a value cut off mid-parse the same way.

use crate::schema::Schema;
use crate::{binary, json, resolve};
use serde_json::de::IoRead;
use serde_json::StreamDeserializer;
use siftline_core::error::{DecodeError, Result};
use siftline_core::record::{ByteStream, Value};
use std::io::Read;

/// Wire framing of the byte input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Schema-dependent binary encoding.
    #[default]
    Binary,
    /// One JSON value per datum, whitespace separated.
    Json,
}

enum Mode {
    Binary {
        input: ByteStream,
    },
    Json {
        datums: StreamDeserializer<'static, IoRead<ByteStream>, serde_json::Value>,
    },
}

/// Decodes a lazy sequence of containers from a byte input, resolving the
/// writer schema against the reader schema.
pub struct ResolvingDecoder {
    writer: Schema,
    reader: Schema,
    mode: Mode,
}

impl std::fmt::Debug for ResolvingDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvingDecoder")
            .field("writer", &self.writer)
            .field("reader", &self.reader)
            .finish_non_exhaustive()
    }
}

impl ResolvingDecoder {
    /// Create a decoder for one decode session.
    ///
    /// `reader` defaults to the writer schema when absent. Fails with a
    /// configuration error if the schemas do not resolve.
    pub fn new(
        writer: Schema,
        reader: Option<Schema>,
        framing: Framing,
        input: ByteStream,
    ) -> Result<Self> {
        let reader = reader.unwrap_or_else(|| writer.clone());
        resolve::check_resolvable(&writer, &reader)?;
        let mode = match framing {
            Framing::Binary => Mode::Binary { input },
            Framing::Json => Mode::Json {
                datums: serde_json::Deserializer::from_reader(input).into_iter(),
            },
        };
        Ok(Self {
            writer,
            reader,
            mode,
        })
    }

    /// The schema the bytes were encoded under.
    pub fn writer_schema(&self) -> &Schema {
        &self.writer
    }

    /// The schema decoded containers are shaped as.
    pub fn reader_schema(&self) -> &Schema {
        &self.reader
    }

    /// Decode the next container.
    ///
    /// Returns `Ok(None)` at a clean boundary — the only successful way the
    /// sequence ends. Truncation or malformed structure mid-container is a
    /// decode error.
    pub fn next(&mut self) -> Result<Option<Value>> {
        match &mut self.mode {
            Mode::Binary { input } => {
                let mut first = [0u8; 1];
                let n = input.read(&mut first)?;
                if n == 0 {
                    return Ok(None);
                }
                let mut chained = first.as_slice().chain(&mut *input);
                binary::read_datum(&mut chained, &self.writer, &self.reader).map(Some)
            }
            Mode::Json { datums } => match datums.next() {
                None => Ok(None),
                Some(Ok(datum)) => {
                    json::datum_from_json(&datum, &self.writer, &self.reader).map(Some)
                }
                Some(Err(e)) if e.is_eof() => Err(DecodeError::UnexpectedEnd.into()),
                Some(Err(e)) => {
                    Err(DecodeError::corrupt(format!("malformed JSON datum: {e}")).into())
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siftline_core::error::Error;

    fn long_pair_schema() -> Schema {
        Schema::parse_str(
            r#"{"type":"record","name":"Pair","fields":[
                {"name":"a","type":"long"},
                {"name":"b","type":"long"}]}"#,
        )
        .unwrap()
    }

    fn pair(a: i64, b: i64) -> Value {
        Value::Map(vec![("a".into(), Value::Long(a)), ("b".into(), Value::Long(b))])
    }

    #[test]
    fn test_binary_sequence_until_clean_boundary() {
        let schema = long_pair_schema();
        let mut buf = Vec::new();
        for i in 0..3 {
            binary::write_datum(&mut buf, &schema, &pair(i, i * 10)).unwrap();
        }

        let mut decoder = ResolvingDecoder::new(
            schema,
            None,
            Framing::Binary,
            ByteStream::from_bytes(buf),
        )
        .unwrap();
        for i in 0..3 {
            assert_eq!(decoder.next().unwrap(), Some(pair(i, i * 10)));
        }
        assert!(decoder.next().unwrap().is_none());
        assert!(decoder.next().unwrap().is_none());
    }

    #[test]
    fn test_binary_truncation_mid_container() {
        let schema = long_pair_schema();
        let mut buf = Vec::new();
        binary::write_datum(&mut buf, &schema, &pair(1, 2)).unwrap();
        binary::write_datum(&mut buf, &schema, &pair(3, 4)).unwrap();
        buf.truncate(buf.len() - 1);

        let mut decoder = ResolvingDecoder::new(
            schema,
            None,
            Framing::Binary,
            ByteStream::from_bytes(buf),
        )
        .unwrap();
        assert_eq!(decoder.next().unwrap(), Some(pair(1, 2)));
        let err = decoder.next().unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::UnexpectedEnd)));
    }

    #[test]
    fn test_json_sequence_and_clean_boundary() {
        let schema = long_pair_schema();
        let text = "{\"a\":1,\"b\":2}\n{\"a\":3,\"b\":4}\n";
        let mut decoder = ResolvingDecoder::new(
            schema,
            None,
            Framing::Json,
            ByteStream::from_bytes(text.as_bytes().to_vec()),
        )
        .unwrap();
        assert_eq!(decoder.next().unwrap(), Some(pair(1, 2)));
        assert_eq!(decoder.next().unwrap(), Some(pair(3, 4)));
        assert!(decoder.next().unwrap().is_none());
    }

    #[test]
    fn test_json_truncation_mid_value() {
        let schema = long_pair_schema();
        let text = "{\"a\":1,\"b\":2}\n{\"a\":3,";
        let mut decoder = ResolvingDecoder::new(
            schema,
            None,
            Framing::Json,
            ByteStream::from_bytes(text.as_bytes().to_vec()),
        )
        .unwrap();
        assert_eq!(decoder.next().unwrap(), Some(pair(1, 2)));
        assert!(decoder.next().is_err());
    }

    #[test]
    fn test_unresolvable_schemas_fail_at_construction() {
        let writer = Schema::Long;
        let reader = Schema::Boolean;
        let err = ResolvingDecoder::new(
            writer,
            Some(reader),
            Framing::Binary,
            ByteStream::from_bytes(Vec::new()),
        )
        .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_reader_defaults_to_writer() {
        let schema = long_pair_schema();
        let decoder = ResolvingDecoder::new(
            schema.clone(),
            None,
            Framing::Binary,
            ByteStream::from_bytes(Vec::new()),
        )
        .unwrap();
        assert_eq!(decoder.reader_schema(), &schema);
    }
}
