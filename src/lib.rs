//! # spio
//!
//! A compact, self-describing container format for mixing text and raw binary data
//! in one byte stream.
//!
//! ## The format
//!
//! A document is a sequence of entries. Each entry opens with a one-character marker,
//! a name, and the matching closing marker:
//!
//! - **Text** `(name)f1,f2,f3\n`: comma separated fields up to the end of the line
//! - **Binary** `{name}len,<len raw bytes>\n`: a length-prefixed payload that may hold
//!   any byte, newlines included
//! - **Object** `[name]len\n`: a container whose children follow on the next lines,
//!   indented by one more space; `len` is the byte span of all its descendants
//!
//! Names may repeat among siblings, and order is preserved.
//!
//! ```text
//! (a)1,2,3
//! [data]16
//!  (a)10
//!  (b)10.1
//! ```
//!
//! ## Writing and reading
//!
//! ```rust
//! use spio::{Reader, Writer};
//!
//! let mut writer = Writer::new();
//! writer.add_txt_fields("a", [1, 2, 3])?;
//! writer.with_object("data", |data| {
//!     data.add_txt("a", "10")?;
//!     data.add_bin_value("b", &100i32)
//! })?;
//!
//! let reader = Reader::new(writer.into_bytes()?)?;
//! let root = reader.root().unwrap();
//! assert_eq!(root.child_named("a")?.text_field(2)?, "3");
//! assert_eq!(root.child_named("data")?.child_named("b")?.binary_as::<i32>(0)?, 100);
//! # Ok::<(), spio::Error>(())
//! ```
//!
//! Object lengths are patched when the object is closed, so the writer never needs
//! to know a subtree's size up front. [`Writer::object`] returns a guard that closes
//! the object when dropped.
//!
//! ## Serde
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use spio::{from_slice, to_bytes};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Data {
//!     a: i32,
//!     b: f64,
//!     c: Vec<u8>,
//! }
//!
//! let data = Data { a: 10, b: 10.1, c: vec![1, 2, 3] };
//! let bytes = to_bytes(&data).unwrap();
//! assert_eq!(bytes, b"(a)10\n(b)10.1\n(c)1,2,3\n");
//!
//! let back: Data = from_slice(&bytes).unwrap();
//! assert_eq!(back, data);
//! ```
//!
//! ## Logging
//!
//! Parsing and finishing a document emit [`tracing`] events at `debug`; every scanned
//! entry and patched length is traced at `trace`.

pub mod de;
pub mod error;
pub mod grammar;
pub mod macros;
pub mod node;
pub mod options;
pub mod reader;
pub mod ser;
pub mod value;
pub mod writer;

pub use de::NodeDeserializer;
pub use error::{Error, ErrorKind, Result};
pub use grammar::NodeKind;
pub use node::{Children, Node};
pub use options::{NumberEncoding, SpioOptions};
pub use reader::Reader;
pub use ser::ValueSerializer;
pub use value::Value;
pub use writer::{ObjectGuard, Writer};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io;

/// Convert any `T: Serialize` to a [`Value`].
///
/// # Examples
///
/// ```rust
/// use spio::{to_value, Value};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// let value = to_value(&Point { x: 1, y: 2 }).unwrap();
/// assert_eq!(value.get("y"), Some(&Value::text("2")));
/// ```
///
/// # Errors
///
/// Returns an error if the value is `None` or a map key is not a single field.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_value<T>(value: &T) -> Result<Value>
where
    T: ?Sized + Serialize,
{
    ser::to_value_with_options(value, &SpioOptions::default())
}

/// Serialize a struct or map as a list of top-level entries.
///
/// # Examples
///
/// ```rust
/// use spio::to_bytes;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Point { x: i32, y: i32 }
///
/// assert_eq!(to_bytes(&Point { x: 1, y: 2 }).unwrap(), b"(x)1\n(y)2\n");
/// ```
///
/// # Errors
///
/// Returns an error if `T` does not serialize to an object, since a document has
/// no place for an unnamed top-level value.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_bytes<T>(value: &T) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    to_bytes_with_options(value, SpioOptions::default())
}

/// Serialize with custom float precision or number encoding.
///
/// # Errors
///
/// Returns an error if `T` does not serialize to an object.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_bytes_with_options<T>(value: &T, options: SpioOptions) -> Result<Vec<u8>>
where
    T: ?Sized + Serialize,
{
    let value = ser::to_value_with_options(value, &options)?;
    let members = match value {
        Value::Object(members) => members,
        other => {
            return Err(Error::unsupported_type(&format!(
                "{} value at the top level",
                other.kind()
            )))
        }
    };
    let mut writer = Writer::with_options(options);
    for (name, member) in &members {
        writer.add_value(name, member)?;
    }
    writer.into_bytes()
}

/// Serialize into any [`io::Write`].
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W, T>(mut writer: W, value: &T) -> Result<()>
where
    W: io::Write,
    T: ?Sized + Serialize,
{
    let bytes = to_bytes(value)?;
    writer.write_all(&bytes)?;
    Ok(())
}

/// Deserialize an instance of type `T` from the document in `v`.
///
/// The top-level entries are treated as the members of `T`.
///
/// # Examples
///
/// ```rust
/// use spio::from_slice;
/// use serde::Deserialize;
///
/// #[derive(Deserialize, PartialEq, Debug)]
/// struct Point { x: i32, y: i32 }
///
/// let point: Point = from_slice(b"(x)1\n(y)2\n").unwrap();
/// assert_eq!(point, Point { x: 1, y: 2 });
/// ```
///
/// # Errors
///
/// Returns an error if the document is malformed or does not match `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice<T>(v: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    let reader = Reader::new(v)?;
    from_node(reader.document())
}

/// Deserialize an instance of type `T` from an I/O stream.
///
/// # Errors
///
/// Returns an error if reading fails, the document is malformed, or it does not
/// match `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R, T>(mut reader: R) -> Result<T>
where
    R: io::Read,
    T: DeserializeOwned,
{
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    from_slice(&bytes)
}

/// Deserialize a `T` from one node of a parsed document, borrowing from its reader.
///
/// # Examples
///
/// ```rust
/// use spio::{from_node, Reader};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Tag<'a> { label: &'a str }
///
/// let reader = Reader::new(b"[tag]10\n (label)x\n".to_vec()).unwrap();
/// let node = reader.root().unwrap().child_named("tag").unwrap();
/// let tag: Tag = from_node(node).unwrap();
/// assert_eq!(tag.label, "x");
/// ```
///
/// # Errors
///
/// Returns an error if the node's shape does not match `T`.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_node<'a, T>(node: Node<'a>) -> Result<T>
where
    T: Deserialize<'a>,
{
    T::deserialize(NodeDeserializer::new(node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Sample {
        a: i32,
        b: f64,
        c: Vec<i32>,
        data: Inner,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Inner {
        a: i32,
        blob: Vec<u8>,
    }

    fn sample() -> Sample {
        Sample {
            a: 10,
            b: 10.1,
            c: vec![1, 2, 3],
            data: Inner {
                a: 100,
                blob: vec![1, 2, 3],
            },
        }
    }

    #[test]
    fn test_round_trip() {
        let bytes = to_bytes(&sample()).unwrap();
        let back: Sample = from_slice(&bytes).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_round_trip_binary_numbers() {
        let options = SpioOptions::new().with_numbers(NumberEncoding::Binary);
        let bytes = to_bytes_with_options(&sample(), options).unwrap();
        assert!(bytes.starts_with(b"{a}4,"));
        let back: Sample = from_slice(&bytes).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_top_level_scalar_rejected() {
        let err = to_bytes(&10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_writer_and_reader_streams() {
        let mut buffer = Vec::new();
        to_writer(&mut buffer, &sample()).unwrap();
        let back: Sample = from_reader(buffer.as_slice()).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_from_slice_reports_malformed_input() {
        let err = from_slice::<Sample>(b"(a)10").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedEntry);
    }
}
