//! The record model: an ordered, mutable, multi-valued attribute container.
//!
//! Records are the unit of flow through a command chain. A record maps a
//! case-sensitive attribute name to an ordered sequence of values and is
//! mutated in place as it travels downstream; no command may assume
//! exclusive ownership survives past its own `process` call.

use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Cursor, Read};
use std::sync::Arc;

/// A single attribute value.
///
/// Values are either primitives, raw byte streams, or nested containers
/// produced by a decoding command. Cloning is cheap for streams (the handle
/// is shared) and deep for everything else.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean.
    Boolean(bool),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// 32-bit IEEE float.
    Float(f32),
    /// 64-bit IEEE float.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Ordered name/value pairs (decoded records and maps).
    Map(Vec<(String, Value)>),
    /// A shared handle onto a byte input.
    Stream(ByteStream),
}

impl Value {
    /// Get the string content, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the boolean content, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the integral content widened to `i64`, if this is `Int` or `Long`.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the floating content widened to `f64`, if this is `Float` or `Double`.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the byte content, if this is a bytes value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get the nested pairs, if this is a map/record container.
    pub fn as_map(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Get the stream handle, if this is a stream value.
    pub fn as_stream(&self) -> Option<&ByteStream> {
        match self {
            Value::Stream(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a field by name in a map/record container.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.as_map()
            .and_then(|m| m.iter().find(|(n, _)| n == name).map(|(_, v)| v))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

enum StreamState {
    Open(Box<dyn Read + Send>),
    Closed,
}

/// A cloneable handle onto an exclusively owned byte input.
///
/// Clones share identity: `Record::copy` duplicates the handle, not the
/// underlying reader. `close` releases the reader the first time it is
/// called and is a no-op afterwards, so the input is dropped exactly once
/// no matter how many copies of the record are still alive.
#[derive(Clone)]
pub struct ByteStream {
    inner: Arc<Mutex<StreamState>>,
}

impl ByteStream {
    /// Wrap a reader as a stream handle.
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StreamState::Open(Box::new(reader)))),
        }
    }

    /// Wrap an in-memory buffer as a stream handle.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::new(Cursor::new(bytes))
    }

    /// Release the underlying reader.
    ///
    /// Returns `true` if this call actually closed the stream, `false` if it
    /// was already closed.
    pub fn close(&self) -> bool {
        let mut state = self.inner.lock();
        match *state {
            StreamState::Open(_) => {
                *state = StreamState::Closed;
                true
            }
            StreamState::Closed => false,
        }
    }

    /// Check whether the stream has been closed.
    pub fn is_closed(&self) -> bool {
        matches!(*self.inner.lock(), StreamState::Closed)
    }

    /// Check whether two handles refer to the same underlying stream.
    pub fn same_stream(&self, other: &ByteStream) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Read for ByteStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match *self.inner.lock() {
            StreamState::Open(ref mut reader) => reader.read(buf),
            StreamState::Closed => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "byte stream is closed",
            )),
        }
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl PartialEq for ByteStream {
    fn eq(&self, other: &Self) -> bool {
        self.same_stream(other)
    }
}

/// An ordered, mutable, multi-valued attribute container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: Vec<(String, Vec<Value>)>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under an attribute, creating the attribute if absent.
    pub fn put(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    /// Get the ordered values of an attribute; empty if absent.
    pub fn get(&self, name: &str) -> &[Value] {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// Get the first value of an attribute, if any.
    pub fn get_first(&self, name: &str) -> Option<&Value> {
        self.get(name).first()
    }

    /// Remove an attribute and all of its values.
    pub fn remove_all(&mut self, name: &str) {
        self.entries.retain(|(n, _)| n != name);
    }

    /// Replace an attribute's values with a single value.
    pub fn replace(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        self.remove_all(&name);
        self.entries.push((name, vec![value]));
    }

    /// Duplicate the record, preserving attribute order and value identities.
    ///
    /// Stream values are shared handles after the copy; everything else is
    /// duplicated. Used when a command must emit a derived record without
    /// mutating the inbound one.
    pub fn copy(&self) -> Record {
        self.clone()
    }

    /// Attribute names in insertion order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Check whether the record has no attributes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
