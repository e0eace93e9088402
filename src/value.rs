//! Owned document trees.
//!
//! [`Value`] mirrors the three node kinds without borrowing a [`Reader`](crate::Reader).
//! It is what the Serde layer builds before writing, what [`Node::to_value`](crate::Node::to_value)
//! produces after reading, and a convenient way to compare two documents structurally.
//!
//! ## Examples
//!
//! ```rust
//! use spio::{spio, Reader, Value, Writer};
//!
//! let data = spio!({
//!     "a": "10",
//!     "c": [1, 2, 3]
//! });
//!
//! let mut writer = Writer::new();
//! writer.add_value("data", &data)?;
//! let reader = Reader::new(writer.into_bytes()?)?;
//!
//! let back = reader.root().unwrap().child_named("data")?.to_value();
//! assert_eq!(back, data);
//! assert_eq!(back.get("c").and_then(Value::as_fields).map(<[String]>::len), Some(3));
//! # Ok::<(), spio::Error>(())
//! ```

use crate::grammar::NodeKind;
use crate::{Error, Result};

/// An owned node: text fields, raw bytes, or named children.
///
/// Object members keep their order and may repeat names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(Vec<String>),
    Binary(Vec<u8>),
    Object(Vec<(String, Value)>),
}

impl Value {
    /// A text value with a single field.
    pub fn text(field: impl Into<String>) -> Self {
        Value::Text(vec![field.into()])
    }

    /// A text value with one field per item, rendered with `Display`.
    pub fn fields<I>(fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: std::fmt::Display,
    {
        Value::Text(fields.into_iter().map(|f| f.to_string()).collect())
    }

    /// An empty object.
    #[must_use]
    pub fn object() -> Self {
        Value::Object(Vec::new())
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Value::Text(_) => NodeKind::Text,
            Value::Binary(_) => NodeKind::Binary,
            Value::Object(_) => NodeKind::Object,
        }
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Value::Text(_))
    }

    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(self, Value::Binary(_))
    }

    #[must_use]
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    #[must_use]
    pub fn as_fields(&self) -> Option<&[String]> {
        match self {
            Value::Text(fields) => Some(fields),
            _ => None,
        }
    }

    /// The field of a single-field text value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(fields) if fields.len() == 1 => Some(&fields[0]),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Object(members) => Some(members),
            _ => None,
        }
    }

    /// First member called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.get_nth(name, 0)
    }

    /// The `occurrence`-th member called `name`.
    #[must_use]
    pub fn get_nth(&self, name: &str, occurrence: usize) -> Option<&Value> {
        self.as_object()?
            .iter()
            .filter(|(key, _)| key == name)
            .nth(occurrence)
            .map(|(_, value)| value)
    }

    /// Appends a member to an object value.
    ///
    /// ```rust
    /// use spio::Value;
    ///
    /// let mut data = Value::object();
    /// data.push("a", Value::text("10"))?;
    /// data.push("a", Value::text("11"))?;
    /// assert_eq!(data.get_nth("a", 1).and_then(Value::as_str), Some("11"));
    /// assert!(Value::text("x").push("a", Value::object()).is_err());
    /// # Ok::<(), spio::Error>(())
    /// ```
    pub fn push(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        match self {
            Value::Object(members) => {
                members.push((name.into(), value));
                Ok(())
            }
            other => Err(Error::type_mismatch(NodeKind::Object, other.kind())),
        }
    }

    /// Fields for text, bytes for binary, members for objects.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Value::Text(fields) => fields.len(),
            Value::Binary(bytes) => bytes.len(),
            Value::Object(members) => members.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::object()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Binary(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::Binary(bytes.to_vec())
    }
}

impl From<Vec<(String, Value)>> for Value {
    fn from(members: Vec<(String, Value)>) -> Self {
        Value::Object(members)
    }
}

macro_rules! impl_from_display {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::text(v.to_string())
                }
            }
        )*
    };
}

impl_from_display!(bool, char, i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_scalars() {
        assert_eq!(Value::from(10), Value::text("10"));
        assert_eq!(Value::from(10.1), Value::text("10.1"));
        assert_eq!(Value::from(true).as_str(), Some("true"));
        assert_eq!(Value::from(&b"xy"[..]), Value::Binary(b"xy".to_vec()));
    }

    #[test]
    fn test_lookup_with_duplicates() {
        let value = Value::Object(vec![
            ("data".into(), Value::text("1")),
            ("other".into(), Value::text("2")),
            ("data".into(), Value::text("3")),
        ]);
        assert_eq!(value.get("data").and_then(Value::as_str), Some("1"));
        assert_eq!(value.get_nth("data", 1).and_then(Value::as_str), Some("3"));
        assert!(value.get_nth("data", 2).is_none());
        assert_eq!(value.len(), 3);
    }

    #[test]
    fn test_accessors_reject_other_kinds() {
        let value = Value::fields([1, 2]);
        assert_eq!(value.kind(), NodeKind::Text);
        assert!(value.as_str().is_none());
        assert!(value.as_bytes().is_none());
        assert!(value.get("x").is_none());
    }
}
