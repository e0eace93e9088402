//! Serde deserialization from parsed documents.
//!
//! [`NodeDeserializer`] walks a [`Node`] tree produced by a [`Reader`](crate::Reader).
//! Strings and byte slices borrow from the reader's buffer.
//!
//! ## Usage
//!
//! ```rust
//! use spio::{from_node, from_slice, Reader};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize, Debug, PartialEq)]
//! struct Data { a: i32, b: f64 }
//!
//! let data: Data = from_slice(b"(a)10\n(b)10.1\n").unwrap();
//! assert_eq!(data, Data { a: 10, b: 10.1 });
//!
//! // Borrowing straight from a reader
//! let reader = Reader::new(b"[data]16\n (a)10\n (b)10.1\n".to_vec()).unwrap();
//! let node = reader.root().unwrap().child_named("data").unwrap();
//! let data: Data = from_node(node).unwrap();
//! assert_eq!(data.a, 10);
//! ```
//!
//! Numbers are read from the first text field with `FromStr`, or from a binary
//! entry whose length is exactly the width of the requested type.

use crate::grammar::NodeKind;
use crate::node::{Children, Node};
use crate::{Error, Result};
use serde::de::value::{BorrowedStrDeserializer, SeqDeserializer};
use serde::de::{self, IntoDeserializer};
use serde::forward_to_deserialize_any;

/// Deserializer over one node and its descendants.
pub struct NodeDeserializer<'de> {
    node: Node<'de>,
}

impl<'de> NodeDeserializer<'de> {
    pub fn new(node: Node<'de>) -> Self {
        NodeDeserializer { node }
    }

    fn field(&self) -> Result<FieldDeserializer<'de>> {
        Ok(FieldDeserializer(self.node.raw_text()?))
    }

    fn bytes(&self) -> Result<&'de [u8]> {
        match self.node.kind() {
            NodeKind::Binary => self.node.binary(),
            NodeKind::Text => Ok(self.node.raw_text()?.as_bytes()),
            NodeKind::Object => Err(Error::type_mismatch(NodeKind::Binary, NodeKind::Object)),
        }
    }

    fn str(&self) -> Result<&'de str> {
        match self.node.kind() {
            NodeKind::Binary => std::str::from_utf8(self.node.binary()?).map_err(|e| {
                Error::custom(format!("{:?} is not valid UTF-8: {}", self.node.name(), e))
            }),
            _ => self.node.raw_text(),
        }
    }

    // Every child unnamed means the object was written from a sequence.
    fn is_sequence(&self) -> bool {
        self.node.child_count() > 0 && self.node.children().all(|child| child.name().is_empty())
    }
}

macro_rules! deserialize_number {
    ($method:ident, $visit:ident, $ty:ty) => {
        fn $method<V>(self, visitor: V) -> Result<V::Value>
        where
            V: de::Visitor<'de>,
        {
            if self.node.kind() == NodeKind::Binary {
                let width = std::mem::size_of::<$ty>();
                let len = self.node.element_count();
                if len != width {
                    return Err(Error::custom(format!(
                        "{:?} holds {} bytes, expected {} for {}",
                        self.node.name(),
                        len,
                        width,
                        stringify!($ty)
                    )));
                }
                visitor.$visit(self.node.binary_as::<$ty>(0)?)
            } else {
                self.field()?.$method(visitor)
            }
        }
    };
}

impl<'de> de::Deserializer<'de> for NodeDeserializer<'de> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.node.kind() {
            NodeKind::Text => {
                if self.node.element_count() > 1 {
                    self.deserialize_seq(visitor)
                } else {
                    visitor.visit_borrowed_str(self.node.raw_text()?)
                }
            }
            NodeKind::Binary => visitor.visit_borrowed_bytes(self.node.binary()?),
            NodeKind::Object if self.is_sequence() => {
                visitor.visit_seq(ChildSeq::new(self.node.children()))
            }
            NodeKind::Object => visitor.visit_map(ChildMap::new(self.node.children())),
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.field()?.deserialize_bool(visitor)
    }

    deserialize_number!(deserialize_i8, visit_i8, i8);
    deserialize_number!(deserialize_i16, visit_i16, i16);
    deserialize_number!(deserialize_i32, visit_i32, i32);
    deserialize_number!(deserialize_i64, visit_i64, i64);
    deserialize_number!(deserialize_i128, visit_i128, i128);
    deserialize_number!(deserialize_u8, visit_u8, u8);
    deserialize_number!(deserialize_u16, visit_u16, u16);
    deserialize_number!(deserialize_u32, visit_u32, u32);
    deserialize_number!(deserialize_u64, visit_u64, u64);
    deserialize_number!(deserialize_u128, visit_u128, u128);
    deserialize_number!(deserialize_f32, visit_f32, f32);
    deserialize_number!(deserialize_f64, visit_f64, f64);

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        FieldDeserializer(self.str()?).deserialize_char(visitor)
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_borrowed_str(self.str()?)
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_borrowed_bytes(self.bytes()?)
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        // Absent members never reach here; presence means Some.
        visitor.visit_some(self)
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.node.kind() {
            NodeKind::Text => {
                let fields: Vec<&'de str> = self.node.text_fields()?.collect();
                visitor.visit_seq(FieldSeq {
                    iter: fields.into_iter(),
                })
            }
            NodeKind::Binary => {
                let bytes = self.node.binary()?.iter().copied();
                visitor.visit_seq(SeqDeserializer::<_, Error>::new(bytes))
            }
            NodeKind::Object => visitor.visit_seq(ChildSeq::new(self.node.children())),
        }
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.node.kind() {
            NodeKind::Object => visitor.visit_map(ChildMap::new(self.node.children())),
            found => Err(Error::type_mismatch(NodeKind::Object, found)),
        }
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.node.kind() {
            NodeKind::Object if self.node.child_count() == 1 => {
                let child = self.node.child_at(0)?;
                visitor.visit_enum(NodeEnum { node: child })
            }
            NodeKind::Object => Err(Error::custom(format!(
                "expected one variant in {:?}, found {} children",
                self.node.name(),
                self.node.child_count()
            ))),
            _ => visitor.visit_enum(self.str()?.into_deserializer()),
        }
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_unit()
    }
}

/// Deserializer over a single text field.
struct FieldDeserializer<'de>(&'de str);

macro_rules! parse_field {
    ($method:ident, $visit:ident, $ty:ty) => {
        fn $method<V>(self, visitor: V) -> Result<V::Value>
        where
            V: de::Visitor<'de>,
        {
            let value = self.0.parse::<$ty>().map_err(|_| {
                Error::custom(format!("invalid {} field: {:?}", stringify!($ty), self.0))
            })?;
            visitor.$visit(value)
        }
    };
}

impl<'de> de::Deserializer<'de> for FieldDeserializer<'de> {
    type Error = Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_borrowed_str(self.0)
    }

    parse_field!(deserialize_bool, visit_bool, bool);
    parse_field!(deserialize_i8, visit_i8, i8);
    parse_field!(deserialize_i16, visit_i16, i16);
    parse_field!(deserialize_i32, visit_i32, i32);
    parse_field!(deserialize_i64, visit_i64, i64);
    parse_field!(deserialize_i128, visit_i128, i128);
    parse_field!(deserialize_u8, visit_u8, u8);
    parse_field!(deserialize_u16, visit_u16, u16);
    parse_field!(deserialize_u32, visit_u32, u32);
    parse_field!(deserialize_u64, visit_u64, u64);
    parse_field!(deserialize_u128, visit_u128, u128);
    parse_field!(deserialize_f32, visit_f32, f32);
    parse_field!(deserialize_f64, visit_f64, f64);
    parse_field!(deserialize_char, visit_char, char);

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_enum(self.0.into_deserializer())
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        str string bytes byte_buf unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

struct FieldSeq<'de> {
    iter: std::vec::IntoIter<&'de str>,
}

impl<'de> de::SeqAccess<'de> for FieldSeq<'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(field) => seed.deserialize(FieldDeserializer(field)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct ChildSeq<'de> {
    iter: Children<'de>,
}

impl<'de> ChildSeq<'de> {
    fn new(iter: Children<'de>) -> Self {
        ChildSeq { iter }
    }
}

impl<'de> de::SeqAccess<'de> for ChildSeq<'de> {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(child) => seed.deserialize(NodeDeserializer::new(child)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct ChildMap<'de> {
    iter: Children<'de>,
    value: Option<Node<'de>>,
}

impl<'de> ChildMap<'de> {
    fn new(iter: Children<'de>) -> Self {
        ChildMap { iter, value: None }
    }
}

impl<'de> de::MapAccess<'de> for ChildMap<'de> {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(child) => {
                self.value = Some(child);
                seed.deserialize(FieldDeserializer(child.name())).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        match self.value.take() {
            Some(child) => seed.deserialize(NodeDeserializer::new(child)),
            None => Err(Error::custom("next_value_seed called before next_key_seed")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct NodeEnum<'de> {
    node: Node<'de>,
}

impl<'de> de::EnumAccess<'de> for NodeEnum<'de> {
    type Error = Error;
    type Variant = NodeDeserializer<'de>;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(BorrowedStrDeserializer::<Error>::new(self.node.name()))?;
        Ok((variant, NodeDeserializer::new(self.node)))
    }
}

impl<'de> de::VariantAccess<'de> for NodeDeserializer<'de> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        seed.deserialize(self)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_seq(self, visitor)
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_map(self, visitor)
    }
}
