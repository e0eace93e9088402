//! Serde serialization into spio documents.
//!
//! Values are first lowered to an owned [`Value`] tree, then written with
//! [`Writer::add_value`](crate::Writer::add_value).
//!
//! ## Mapping
//!
//! - **Scalars** (bool, numbers, char, str): a text entry with one field; the
//!   empty string is a text entry with no fields
//! - **Strings containing `,` or a newline**: a binary entry holding the UTF-8 bytes
//! - **Bytes**: a binary entry
//! - **Structs and maps**: an object; `None` fields are left out
//! - **Sequences of non-empty scalars**: one text entry with a field per element,
//!   otherwise an object whose children are unnamed. Nested sequences, tuples and
//!   other compound items always take the object form, even with one element.
//! - **Enums**: unit variants are a text entry naming the variant, other variants an
//!   object with a single child named after the variant
//!
//! With [`NumberEncoding::Binary`] numbers are written as native-endian binary
//! entries instead of text.
//!
//! ```rust
//! use spio::to_bytes;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Data { a: i32, c: Vec<u8>, note: &'static str }
//!
//! let data = Data { a: 10, c: vec![1, 2, 3], note: "x,y" };
//! assert_eq!(to_bytes(&data).unwrap(), b"(a)10\n(c)1,2,3\n{note}3,x,y\n");
//! ```

use crate::grammar;
use crate::options::NumberEncoding;
use crate::{Error, Result, SpioOptions, Value};
use serde::{ser, Serialize};
use std::cell::Cell;

/// Lowers `Serialize` values into [`Value`] trees.
///
/// `None` serializes to `Ok(None)` so containers can leave the member out.
#[derive(Clone, Copy)]
pub struct ValueSerializer<'o> {
    options: &'o SpioOptions,
    // Set when the value turns out to be a sequence, map, struct or tagged variant.
    compound: Option<&'o Cell<bool>>,
}

impl<'o> ValueSerializer<'o> {
    pub fn new(options: &'o SpioOptions) -> Self {
        ValueSerializer {
            options,
            compound: None,
        }
    }

    fn mark_compound(&self) {
        if let Some(flag) = self.compound {
            flag.set(true);
        }
    }

    fn number<N: ToString>(self, text: N, ne_bytes: &[u8]) -> Result<Option<Value>> {
        Ok(Some(match self.options.numbers {
            NumberEncoding::Text => Value::text(text.to_string()),
            NumberEncoding::Binary => Value::Binary(ne_bytes.to_vec()),
        }))
    }

    fn float<F: std::fmt::Display>(self, v: F, ne_bytes: &[u8]) -> Result<Option<Value>> {
        Ok(Some(match self.options.numbers {
            NumberEncoding::Text => Value::text(self.options.format_float(v)),
            NumberEncoding::Binary => Value::Binary(ne_bytes.to_vec()),
        }))
    }
}

pub(crate) fn to_value_with_options<T>(value: &T, options: &SpioOptions) -> Result<Value>
where
    T: ?Sized + Serialize,
{
    value
        .serialize(ValueSerializer::new(options))?
        .ok_or_else(|| Error::unsupported_type("None at the top level"))
}

fn lower<T>(value: &T, options: &SpioOptions, context: &str) -> Result<Value>
where
    T: ?Sized + Serialize,
{
    value
        .serialize(ValueSerializer::new(options))?
        .ok_or_else(|| Error::unsupported_type(&format!("None {}", context)))
}

// Scalars that fit in one field collapse into a single text entry.
fn pack_sequence(items: Vec<Value>, packable: bool) -> Value {
    if packable {
        Value::Text(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Text(mut fields) => fields.pop(),
                    _ => None,
                })
                .collect(),
        )
    } else {
        Value::Object(items.into_iter().map(|item| (String::new(), item)).collect())
    }
}

fn tagged(variant: Option<&'static str>, value: Value) -> Value {
    match variant {
        Some(variant) => Value::Object(vec![(variant.to_string(), value)]),
        None => value,
    }
}

impl<'o> ser::Serializer for ValueSerializer<'o> {
    type Ok = Option<Value>;
    type Error = Error;

    type SerializeSeq = SerializeSequence<'o>;
    type SerializeTuple = SerializeSequence<'o>;
    type SerializeTupleStruct = SerializeSequence<'o>;
    type SerializeTupleVariant = SerializeSequence<'o>;
    type SerializeMap = SerializeObject<'o>;
    type SerializeStruct = SerializeObject<'o>;
    type SerializeStructVariant = SerializeObject<'o>;

    fn serialize_bool(self, v: bool) -> Result<Self::Ok> {
        Ok(Some(Value::text(if v { "true" } else { "false" })))
    }

    fn serialize_i8(self, v: i8) -> Result<Self::Ok> {
        self.number(v, &v.to_ne_bytes())
    }

    fn serialize_i16(self, v: i16) -> Result<Self::Ok> {
        self.number(v, &v.to_ne_bytes())
    }

    fn serialize_i32(self, v: i32) -> Result<Self::Ok> {
        self.number(v, &v.to_ne_bytes())
    }

    fn serialize_i64(self, v: i64) -> Result<Self::Ok> {
        self.number(v, &v.to_ne_bytes())
    }

    fn serialize_i128(self, v: i128) -> Result<Self::Ok> {
        self.number(v, &v.to_ne_bytes())
    }

    fn serialize_u8(self, v: u8) -> Result<Self::Ok> {
        self.number(v, &v.to_ne_bytes())
    }

    fn serialize_u16(self, v: u16) -> Result<Self::Ok> {
        self.number(v, &v.to_ne_bytes())
    }

    fn serialize_u32(self, v: u32) -> Result<Self::Ok> {
        self.number(v, &v.to_ne_bytes())
    }

    fn serialize_u64(self, v: u64) -> Result<Self::Ok> {
        self.number(v, &v.to_ne_bytes())
    }

    fn serialize_u128(self, v: u128) -> Result<Self::Ok> {
        self.number(v, &v.to_ne_bytes())
    }

    fn serialize_f32(self, v: f32) -> Result<Self::Ok> {
        self.float(v, &v.to_ne_bytes())
    }

    fn serialize_f64(self, v: f64) -> Result<Self::Ok> {
        self.float(v, &v.to_ne_bytes())
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok> {
        self.serialize_str(v.encode_utf8(&mut [0u8; 4]))
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok> {
        if v.is_empty() {
            Ok(Some(Value::Text(Vec::new())))
        } else if grammar::is_valid_field(v) {
            Ok(Some(Value::text(v)))
        } else {
            Ok(Some(Value::Binary(v.as_bytes().to_vec())))
        }
    }

    fn serialize_bytes(self, v: &[u8]) -> Result<Self::Ok> {
        Ok(Some(Value::Binary(v.to_vec())))
    }

    fn serialize_none(self) -> Result<Self::Ok> {
        Ok(None)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Self::Ok>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok> {
        Ok(Some(Value::Text(Vec::new())))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok> {
        Ok(Some(Value::text(variant)))
    }

    fn serialize_newtype_struct<T>(self, _name: &'static str, value: &T) -> Result<Self::Ok>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Self::Ok>
    where
        T: ?Sized + Serialize,
    {
        self.mark_compound();
        let inner = lower(value, self.options, "as a variant payload")?;
        Ok(Some(tagged(Some(variant), inner)))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeSequence<'o>> {
        self.mark_compound();
        Ok(SerializeSequence::new(self.options, len.unwrap_or(0), None))
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeSequence<'o>> {
        self.mark_compound();
        Ok(SerializeSequence::new(self.options, len, None))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<SerializeSequence<'o>> {
        self.mark_compound();
        Ok(SerializeSequence::new(self.options, len, None))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeSequence<'o>> {
        self.mark_compound();
        Ok(SerializeSequence::new(self.options, len, Some(variant)))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<SerializeObject<'o>> {
        self.mark_compound();
        Ok(SerializeObject::new(self.options, None))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<SerializeObject<'o>> {
        self.mark_compound();
        Ok(SerializeObject::new(self.options, None))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<SerializeObject<'o>> {
        self.mark_compound();
        Ok(SerializeObject::new(self.options, Some(variant)))
    }
}

pub struct SerializeSequence<'o> {
    options: &'o SpioOptions,
    items: Vec<Value>,
    packable: bool,
    variant: Option<&'static str>,
}

impl<'o> SerializeSequence<'o> {
    fn new(options: &'o SpioOptions, len: usize, variant: Option<&'static str>) -> Self {
        SerializeSequence {
            options,
            items: Vec::with_capacity(len),
            packable: true,
            variant,
        }
    }

    fn push<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let compound = Cell::new(false);
        let serializer = ValueSerializer {
            options: self.options,
            compound: Some(&compound),
        };
        let item = value
            .serialize(serializer)?
            .ok_or_else(|| Error::unsupported_type("None inside a sequence"))?;
        self.packable &=
            !compound.get() && matches!(item.as_str(), Some(field) if !field.is_empty());
        self.items.push(item);
        Ok(())
    }

    fn finish(self) -> Result<Option<Value>> {
        let packed = pack_sequence(self.items, self.packable);
        Ok(Some(tagged(self.variant, packed)))
    }
}

impl ser::SerializeSeq for SerializeSequence<'_> {
    type Ok = Option<Value>;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Option<Value>> {
        self.finish()
    }
}

impl ser::SerializeTuple for SerializeSequence<'_> {
    type Ok = Option<Value>;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Option<Value>> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for SerializeSequence<'_> {
    type Ok = Option<Value>;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Option<Value>> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for SerializeSequence<'_> {
    type Ok = Option<Value>;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.push(value)
    }

    fn end(self) -> Result<Option<Value>> {
        self.finish()
    }
}

pub struct SerializeObject<'o> {
    options: &'o SpioOptions,
    members: Vec<(String, Value)>,
    current_key: Option<String>,
    variant: Option<&'static str>,
}

impl<'o> SerializeObject<'o> {
    fn new(options: &'o SpioOptions, variant: Option<&'static str>) -> Self {
        SerializeObject {
            options,
            members: Vec::new(),
            current_key: None,
            variant,
        }
    }

    fn insert<T>(&mut self, key: String, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        if let Some(value) = value.serialize(ValueSerializer::new(self.options))? {
            self.members.push((key, value));
        }
        Ok(())
    }

    fn finish(self) -> Result<Option<Value>> {
        Ok(Some(tagged(self.variant, Value::Object(self.members))))
    }
}

impl ser::SerializeMap for SerializeObject<'_> {
    type Ok = Option<Value>;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        // Keys always render as text, whatever the number encoding.
        let key = lower(key, &SpioOptions::default(), "as a map key")?;
        match key {
            Value::Text(mut fields) if fields.len() <= 1 => {
                self.current_key = Some(fields.pop().unwrap_or_default());
                Ok(())
            }
            _ => Err(Error::custom("map keys must serialize to a single text field")),
        }
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .current_key
            .take()
            .ok_or_else(|| Error::custom("serialize_value called without serialize_key"))?;
        self.insert(key, value)
    }

    fn end(self) -> Result<Option<Value>> {
        self.finish()
    }
}

impl ser::SerializeStruct for SerializeObject<'_> {
    type Ok = Option<Value>;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.insert(key.to_string(), value)
    }

    fn end(self) -> Result<Option<Value>> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for SerializeObject<'_> {
    type Ok = Option<Value>;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        self.insert(key.to_string(), value)
    }

    fn end(self) -> Result<Option<Value>> {
        self.finish()
    }
}
