//! Binary datum codec.
//!
//! Wire format: booleans are one byte, ints and longs are zig-zag base-128
//! varints, floats and doubles are little-endian IEEE754, strings and bytes
//! are a varint length followed by the payload, arrays and maps are encoded
//! in blocks (item count, items, zero terminator; a negative count is
//! followed by the block's byte size and readers may use it to skip without
//! decoding), records are their fields in declared order with no framing of
//! their own.
//!
//! `read_datum` resolves the writer shape against the reader shape field by
//! field: writer-only fields are decoded and discarded, reader-only fields
//! take their declared defaults, permitted promotions are applied in place.
//!
//! Truncation inside a datum is a hard decode failure; detecting the clean
//! boundary before a datum starts is the caller's job (see the resolving
//! decoder).

use crate::resolve;
use crate::schema::Schema;
use byteorder::{ByteOrder, LittleEndian};
use siftline_core::error::{DecodeError, Error, Result};
use siftline_core::record::Value;
use std::io::{self, Read, Write};

/// Largest length accepted for a single string/bytes payload.
const MAX_PAYLOAD_LEN: i64 = 1 << 30;

fn fill(input: &mut impl Read, buf: &mut [u8]) -> Result<()> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::Decode(DecodeError::UnexpectedEnd),
        _ => Error::Io(e),
    })
}

/// Read a zig-zag base-128 varint.
pub fn read_long(input: &mut impl Read) -> Result<i64> {
    let mut accum: u64 = 0;
    let mut shift = 0u32;
    loop {
        let mut byte = [0u8; 1];
        fill(input, &mut byte)?;
        if shift >= 64 {
            return Err(DecodeError::corrupt("varint longer than 10 bytes").into());
        }
        accum |= u64::from(byte[0] & 0x7f) << shift;
        if byte[0] & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok(((accum >> 1) as i64) ^ -((accum & 1) as i64))
}

/// Write a zig-zag base-128 varint.
pub fn write_long(out: &mut impl Write, value: i64) -> Result<()> {
    let mut encoded = ((value << 1) ^ (value >> 63)) as u64;
    loop {
        if encoded & !0x7f == 0 {
            out.write_all(&[encoded as u8])?;
            return Ok(());
        }
        out.write_all(&[(encoded as u8 & 0x7f) | 0x80])?;
        encoded >>= 7;
    }
}

fn read_len(input: &mut impl Read) -> Result<usize> {
    let len = read_long(input)?;
    if !(0..=MAX_PAYLOAD_LEN).contains(&len) {
        return Err(DecodeError::corrupt(format!("implausible payload length {len}")).into());
    }
    Ok(len as usize)
}

fn read_raw(input: &mut impl Read, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    fill(input, &mut buf)?;
    Ok(buf)
}

fn read_string(input: &mut impl Read) -> Result<String> {
    let len = read_len(input)?;
    String::from_utf8(read_raw(input, len)?)
        .map_err(|_| DecodeError::corrupt("string payload is not valid UTF-8").into())
}

fn read_primitive(input: &mut impl Read, schema: &Schema) -> Result<Value> {
    match schema {
        Schema::Null => Ok(Value::Null),
        Schema::Boolean => {
            let mut byte = [0u8; 1];
            fill(input, &mut byte)?;
            match byte[0] {
                0 => Ok(Value::Boolean(false)),
                1 => Ok(Value::Boolean(true)),
                other => Err(DecodeError::corrupt(format!("invalid boolean byte {other}")).into()),
            }
        }
        Schema::Int => {
            let v = read_long(input)?;
            i32::try_from(v)
                .map(Value::Int)
                .map_err(|_| DecodeError::corrupt(format!("int value {v} out of range")).into())
        }
        Schema::Long => Ok(Value::Long(read_long(input)?)),
        Schema::Float => {
            let mut buf = [0u8; 4];
            fill(input, &mut buf)?;
            Ok(Value::Float(LittleEndian::read_f32(&buf)))
        }
        Schema::Double => {
            let mut buf = [0u8; 8];
            fill(input, &mut buf)?;
            Ok(Value::Double(LittleEndian::read_f64(&buf)))
        }
        Schema::String => Ok(Value::String(read_string(input)?)),
        Schema::Bytes => {
            let len = read_len(input)?;
            Ok(Value::Bytes(read_raw(input, len)?))
        }
        _ => unreachable!("read_primitive called with composite schema"),
    }
}

fn read_block_count(input: &mut impl Read) -> Result<Option<usize>> {
    let count = read_long(input)?;
    if count == 0 {
        return Ok(None);
    }
    let count = if count < 0 {
        // Negative count form carries the block's byte size next.
        let _block_bytes = read_len(input)?;
        count
            .checked_neg()
            .ok_or_else(|| Error::from(DecodeError::corrupt("invalid block count")))?
    } else {
        count
    };
    if count > MAX_PAYLOAD_LEN {
        return Err(DecodeError::corrupt(format!("implausible block count {count}")).into());
    }
    Ok(Some(count as usize))
}

/// Read one datum encoded with `writer`, resolved to the shape of `reader`.
pub fn read_datum(input: &mut impl Read, writer: &Schema, reader: &Schema) -> Result<Value> {
    match (writer, reader) {
        (Schema::Array(wi), Schema::Array(ri)) => {
            let mut items = Vec::new();
            while let Some(count) = read_block_count(input)? {
                for _ in 0..count {
                    items.push(read_datum(input, wi, ri)?);
                }
            }
            Ok(Value::Array(items))
        }
        (Schema::Map(wv), Schema::Map(rv)) => {
            let mut entries = Vec::new();
            while let Some(count) = read_block_count(input)? {
                for _ in 0..count {
                    let key = read_string(input)?;
                    entries.push((key, read_datum(input, wv, rv)?));
                }
            }
            Ok(Value::Map(entries))
        }
        (Schema::Record(w), Schema::Record(r)) => {
            let mut slots: Vec<Option<Value>> = vec![None; r.fields.len()];
            for writer_field in &w.fields {
                match r
                    .fields
                    .iter()
                    .position(|f| f.name == writer_field.name)
                {
                    Some(index) => {
                        slots[index] =
                            Some(read_datum(input, &writer_field.schema, &r.fields[index].schema)?);
                    }
                    None => skip_datum(input, &writer_field.schema)?,
                }
            }
            let mut fields = Vec::with_capacity(r.fields.len());
            for (slot, field) in slots.into_iter().zip(&r.fields) {
                let value = match slot {
                    Some(value) => value,
                    // Resolvability was checked at construction time.
                    None => resolve::default_value(field)?,
                };
                fields.push((field.name.clone(), value));
            }
            Ok(Value::Map(fields))
        }
        (w, r) if w.is_primitive() && r.is_primitive() => {
            let raw = read_primitive(input, w)?;
            resolve::promote(raw, w, r).map_err(Error::from)
        }
        (w, r) => Err(Error::Decode(DecodeError::SchemaMismatch {
            writer: w.type_name().to_string(),
            reader: r.type_name().to_string(),
        })),
    }
}

fn skip_raw(input: &mut impl Read, len: u64) -> Result<()> {
    let copied = io::copy(&mut input.take(len), &mut io::sink())?;
    if copied != len {
        return Err(DecodeError::UnexpectedEnd.into());
    }
    Ok(())
}

/// Skip one datum encoded with `writer` without materializing it.
pub fn skip_datum(input: &mut impl Read, writer: &Schema) -> Result<()> {
    match writer {
        Schema::Null => Ok(()),
        Schema::Boolean => skip_raw(input, 1),
        Schema::Int | Schema::Long => read_long(input).map(|_| ()),
        Schema::Float => skip_raw(input, 4),
        Schema::Double => skip_raw(input, 8),
        Schema::String | Schema::Bytes => {
            let len = read_len(input)?;
            skip_raw(input, len as u64)
        }
        Schema::Array(items) => skip_blocks(input, |input| skip_datum(input, items)),
        Schema::Map(values) => skip_blocks(input, |input| {
            let len = read_len(input)?;
            skip_raw(input, len as u64)?;
            skip_datum(input, values)
        }),
        Schema::Record(record) => {
            for field in &record.fields {
                skip_datum(input, &field.schema)?;
            }
            Ok(())
        }
    }
}

fn skip_blocks<R: Read>(
    input: &mut R,
    mut skip_item: impl FnMut(&mut R) -> Result<()>,
) -> Result<()> {
    loop {
        let count = read_long(input)?;
        if count == 0 {
            return Ok(());
        }
        if count < 0 {
            // The byte size lets us skip the whole block unparsed.
            let block_bytes = read_len(input)?;
            skip_raw(input, block_bytes as u64)?;
            continue;
        }
        for _ in 0..count {
            skip_item(input)?;
        }
    }
}

fn mismatch(schema: &Schema, value: &Value) -> Error {
    Error::Decode(DecodeError::ValueMismatch {
        schema: schema.type_name().to_string(),
        value: format!("{value:?}"),
    })
}

/// Write one datum under `schema`. Counterpart of [`read_datum`], used to
/// produce wire data for round trips and fixtures.
pub fn write_datum(out: &mut impl Write, schema: &Schema, value: &Value) -> Result<()> {
    match (schema, value) {
        (Schema::Null, Value::Null) => Ok(()),
        (Schema::Boolean, Value::Boolean(b)) => Ok(out.write_all(&[u8::from(*b)])?),
        (Schema::Int, Value::Int(v)) => write_long(out, i64::from(*v)),
        (Schema::Long, Value::Long(v)) => write_long(out, *v),
        (Schema::Long, Value::Int(v)) => write_long(out, i64::from(*v)),
        (Schema::Float, Value::Float(v)) => {
            let mut buf = [0u8; 4];
            LittleEndian::write_f32(&mut buf, *v);
            Ok(out.write_all(&buf)?)
        }
        (Schema::Double, Value::Double(v)) => {
            let mut buf = [0u8; 8];
            LittleEndian::write_f64(&mut buf, *v);
            Ok(out.write_all(&buf)?)
        }
        (Schema::String, Value::String(s)) => {
            write_long(out, s.len() as i64)?;
            Ok(out.write_all(s.as_bytes())?)
        }
        (Schema::Bytes, Value::Bytes(b)) => {
            write_long(out, b.len() as i64)?;
            Ok(out.write_all(b)?)
        }
        (Schema::Array(items), Value::Array(values)) => {
            if !values.is_empty() {
                write_long(out, values.len() as i64)?;
                for item in values {
                    write_datum(out, items, item)?;
                }
            }
            write_long(out, 0)
        }
        (Schema::Map(value_schema), Value::Map(entries)) => {
            if !entries.is_empty() {
                write_long(out, entries.len() as i64)?;
                for (key, entry) in entries {
                    write_long(out, key.len() as i64)?;
                    out.write_all(key.as_bytes())?;
                    write_datum(out, value_schema, entry)?;
                }
            }
            write_long(out, 0)
        }
        (Schema::Record(record), value @ Value::Map(_)) => {
            for field in &record.fields {
                let field_value = value
                    .field(&field.name)
                    .ok_or_else(|| mismatch(schema, value))?;
                write_datum(out, &field.schema, field_value)?;
            }
            Ok(())
        }
        (schema, value) => Err(mismatch(schema, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip_long(v: i64) -> i64 {
        let mut buf = Vec::new();
        write_long(&mut buf, v).unwrap();
        read_long(&mut Cursor::new(buf)).unwrap()
    }

    #[test]
    fn test_varint_roundtrip_edges() {
        for v in [0, -1, 1, 63, -64, 64, i32::MAX as i64, i64::MIN, i64::MAX] {
            assert_eq!(roundtrip_long(v), v);
        }
    }

    #[test]
    fn test_zigzag_small_values_are_small() {
        let mut buf = Vec::new();
        write_long(&mut buf, -1).unwrap();
        assert_eq!(buf, vec![0x01]);
        buf.clear();
        write_long(&mut buf, 1).unwrap();
        assert_eq!(buf, vec![0x02]);
    }

    #[test]
    fn test_overlong_varint_rejected() {
        let bytes = vec![0x80u8; 11];
        let err = read_long(&mut Cursor::new(bytes)).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_primitive_roundtrip() {
        let schema = Schema::Double;
        let mut buf = Vec::new();
        write_datum(&mut buf, &schema, &Value::Double(3.25)).unwrap();
        let value = read_datum(&mut Cursor::new(buf), &schema, &schema).unwrap();
        assert_eq!(value, Value::Double(3.25));
    }

    #[test]
    fn test_truncated_payload_is_unexpected_end() {
        let schema = Schema::String;
        let mut buf = Vec::new();
        write_datum(&mut buf, &schema, &Value::String("hello".into())).unwrap();
        buf.truncate(buf.len() - 2);
        let err = read_datum(&mut Cursor::new(buf), &schema, &schema).unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::UnexpectedEnd)));
    }

    #[test]
    fn test_invalid_utf8_is_corrupt() {
        let mut buf = Vec::new();
        write_long(&mut buf, 2).unwrap();
        buf.extend_from_slice(&[0xff, 0xfe]);
        let err = read_datum(&mut Cursor::new(buf), &Schema::String, &Schema::String).unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::Corrupt { .. })));
    }

    #[test]
    fn test_array_block_roundtrip() {
        let schema = Schema::Array(Box::new(Schema::Long));
        let value = Value::Array(vec![Value::Long(1), Value::Long(-2), Value::Long(300)]);
        let mut buf = Vec::new();
        write_datum(&mut buf, &schema, &value).unwrap();
        assert_eq!(read_datum(&mut Cursor::new(buf), &schema, &schema).unwrap(), value);
    }

    #[test]
    fn test_negative_block_count_read_and_skip() {
        // One block of two longs in the negative-count + byte-size form.
        let mut body = Vec::new();
        write_long(&mut body, 5).unwrap();
        write_long(&mut body, 6).unwrap();
        let mut buf = Vec::new();
        write_long(&mut buf, -2).unwrap();
        write_long(&mut buf, body.len() as i64).unwrap();
        buf.extend_from_slice(&body);
        write_long(&mut buf, 0).unwrap();

        let schema = Schema::Array(Box::new(Schema::Long));
        let value = read_datum(&mut Cursor::new(buf.clone()), &schema, &schema).unwrap();
        assert_eq!(value, Value::Array(vec![Value::Long(5), Value::Long(6)]));

        let mut cursor = Cursor::new(buf);
        skip_datum(&mut cursor, &schema).unwrap();
        assert_eq!(cursor.position(), cursor.get_ref().len() as u64);
    }

    #[test]
    fn test_writer_only_field_skipped() {
        let writer = Schema::parse_str(
            r#"{"type":"record","name":"R","fields":[
                {"name":"dropped","type":"string"},
                {"name":"kept","type":"long"}]}"#,
        )
        .unwrap();
        let reader = Schema::parse_str(
            r#"{"type":"record","name":"R","fields":[{"name":"kept","type":"long"}]}"#,
        )
        .unwrap();

        let datum = Value::Map(vec![
            ("dropped".into(), Value::String("noise".into())),
            ("kept".into(), Value::Long(11)),
        ]);
        let mut buf = Vec::new();
        write_datum(&mut buf, &writer, &datum).unwrap();

        let value = read_datum(&mut Cursor::new(buf), &writer, &reader).unwrap();
        assert_eq!(value, Value::Map(vec![("kept".into(), Value::Long(11))]));
    }

    #[test]
    fn test_promotion_applied_during_read() {
        let writer = Schema::parse_str(
            r#"{"type":"record","name":"R","fields":[{"name":"n","type":"int"}]}"#,
        )
        .unwrap();
        let reader = Schema::parse_str(
            r#"{"type":"record","name":"R","fields":[{"name":"n","type":"double"}]}"#,
        )
        .unwrap();
        let mut buf = Vec::new();
        write_datum(
            &mut buf,
            &writer,
            &Value::Map(vec![("n".into(), Value::Int(21))]),
        )
        .unwrap();
        let value = read_datum(&mut Cursor::new(buf), &writer, &reader).unwrap();
        assert_eq!(value.field("n"), Some(&Value::Double(21.0)));
    }

    #[test]
    fn test_value_schema_mismatch_on_write() {
        let mut buf = Vec::new();
        let err = write_datum(&mut buf, &Schema::Long, &Value::String("no".into())).unwrap_err();
        assert!(matches!(
            err,
            Error::Decode(DecodeError::ValueMismatch { .. })
        ));
    }
}
