//! Read-only views into a parsed document.
//!
//! A [`Node`] is a cheap, copyable handle borrowing its [`Reader`]. Lookups return
//! `Result` so a failed query can be reported without invalidating the tree.
//!
//! ```rust
//! use spio::{Reader, Writer};
//!
//! let mut writer = Writer::new();
//! writer.add_txt_fields("c", [1, 2, 3])?;
//! writer.add_bin_slice("d", &[100i32, 200])?;
//! let reader = Reader::new(writer.into_bytes()?)?;
//! let root = reader.root().unwrap();
//!
//! let c = root.child_named("c")?;
//! assert_eq!(c.element_count(), 3);
//! assert_eq!(c.parse_field::<i32>(2)?, 3);
//!
//! let d = root.child_named("d")?;
//! assert_eq!(d.element_count(), 8);
//! assert_eq!(d.binary_as::<i32>(1)?, 200);
//! # Ok::<(), spio::Error>(())
//! ```

use crate::grammar::{NodeKind, FIELD_SEPARATOR};
use crate::reader::{Entry, Reader};
use crate::{Error, Result, Value};
use bytemuck::Pod;
use std::fmt;
use std::str::FromStr;

/// A node in a parsed document.
#[derive(Clone, Copy)]
pub struct Node<'a> {
    reader: &'a Reader,
    id: usize,
}

impl<'a> Node<'a> {
    pub(crate) fn new(reader: &'a Reader, id: usize) -> Self {
        Node { reader, id }
    }

    fn entry(&self) -> &'a Entry {
        self.reader.entry(self.id)
    }

    /// The node's name; empty for the document root.
    #[must_use]
    pub fn name(&self) -> &'a str {
        self.reader.str_at(self.entry().name.clone())
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.entry().kind
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.id == crate::reader::ROOT
    }

    /// Indent level of the entry; 0 for top-level entries and for the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.entry().depth
    }

    /// Byte offset of the entry within the document.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.entry().offset
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.entry().children.len()
    }

    /// Child at `index` in document order.
    pub fn child_at(&self, index: usize) -> Result<Node<'a>> {
        let children = &self.entry().children;
        children
            .get(index)
            .map(|&id| Node::new(self.reader, id))
            .ok_or_else(|| Error::out_of_range(index, children.len()))
    }

    /// All children in document order. Empty for text and binary nodes.
    #[must_use]
    pub fn children(&self) -> Children<'a> {
        Children {
            reader: self.reader,
            ids: self.entry().children.iter(),
        }
    }

    /// Every child called `name`, in document order.
    pub fn children_named<'n>(&self, name: &'n str) -> impl Iterator<Item = Node<'a>> + 'n
    where
        'a: 'n,
    {
        self.children().filter(move |child| child.name() == name)
    }

    /// The first child called `name`.
    pub fn child_named(&self, name: &str) -> Result<Node<'a>> {
        self.child_named_nth(name, 0)
    }

    /// The `occurrence`-th child called `name`, counting from zero.
    ///
    /// ```rust
    /// use spio::Reader;
    ///
    /// let reader = Reader::new(b"(x)1\n(x)2\n".to_vec())?;
    /// let root = reader.root().unwrap();
    /// assert_eq!(root.child_named_nth("x", 1)?.text_field(0)?, "2");
    /// assert!(root.child_named_nth("x", 2).is_err());
    /// # Ok::<(), spio::Error>(())
    /// ```
    pub fn child_named_nth(&self, name: &str, occurrence: usize) -> Result<Node<'a>> {
        self.children_named(name)
            .nth(occurrence)
            .ok_or_else(|| Error::not_found(name, occurrence))
    }

    /// Like [`child_named`](Node::child_named) but returns `None` instead of an error.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Node<'a>> {
        self.children_named(name).next()
    }

    /// Fields for text, bytes for binary, direct children for objects.
    #[must_use]
    pub fn element_count(&self) -> usize {
        let entry = self.entry();
        match entry.kind {
            NodeKind::Text => split_fields(self.reader.str_at(entry.payload.clone())).count(),
            NodeKind::Binary => entry.payload.len(),
            NodeKind::Object => entry.children.len(),
        }
    }

    fn require(&self, kind: NodeKind) -> Result<&'a Entry> {
        let entry = self.entry();
        if entry.kind != kind {
            return Err(Error::type_mismatch(kind, entry.kind));
        }
        Ok(entry)
    }

    /// The whole text payload, separators included.
    pub fn raw_text(&self) -> Result<&'a str> {
        let entry = self.require(NodeKind::Text)?;
        Ok(self.reader.str_at(entry.payload.clone()))
    }

    /// Iterates the comma separated fields of a text node.
    pub fn text_fields(&self) -> Result<impl Iterator<Item = &'a str>> {
        Ok(split_fields(self.raw_text()?))
    }

    /// The field at `index` of a text node.
    pub fn text_field(&self, index: usize) -> Result<&'a str> {
        let text = self.raw_text()?;
        split_fields(text)
            .nth(index)
            .ok_or_else(|| Error::out_of_range(index, split_fields(text).count()))
    }

    /// Parses the field at `index` with [`FromStr`].
    pub fn parse_field<T>(&self, index: usize) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let field = self.text_field(index)?;
        field.parse().map_err(|e| {
            Error::custom(format!(
                "field {} of {:?} ({:?}) does not parse: {}",
                index,
                self.name(),
                field,
                e
            ))
        })
    }

    /// The raw payload of a binary node.
    pub fn binary(&self) -> Result<&'a [u8]> {
        let entry = self.require(NodeKind::Binary)?;
        Ok(self.reader.bytes(entry.payload.clone()))
    }

    fn elements<T: Pod>(&self) -> Result<&'a [u8]> {
        let bytes = self.binary()?;
        let width = std::mem::size_of::<T>();
        if width == 0 {
            return Err(Error::unsupported_type("zero-sized binary element"));
        }
        if bytes.len() % width != 0 {
            return Err(Error::MisalignedBinary {
                len: bytes.len(),
                width,
            });
        }
        Ok(bytes)
    }

    /// Reads element `index` of a binary node as a native-endian `T`.
    ///
    /// The format carries no element type, so `T` must match what was written.
    /// The payload length must be a whole number of `T`s.
    pub fn binary_as<T: Pod>(&self, index: usize) -> Result<T> {
        let bytes = self.elements::<T>()?;
        let width = std::mem::size_of::<T>();
        let count = bytes.len() / width;
        if index >= count {
            return Err(Error::out_of_range(index, count));
        }
        let start = index * width;
        Ok(bytemuck::pod_read_unaligned(&bytes[start..start + width]))
    }

    /// Reads every element of a binary node as a native-endian `T`.
    pub fn binary_vec<T: Pod>(&self) -> Result<Vec<T>> {
        let bytes = self.elements::<T>()?;
        Ok(bytes
            .chunks_exact(std::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }

    /// Copies this node and its descendants into an owned [`Value`].
    #[must_use]
    pub fn to_value(&self) -> Value {
        let entry = self.entry();
        match entry.kind {
            NodeKind::Text => Value::Text(
                split_fields(self.reader.str_at(entry.payload.clone()))
                    .map(str::to_string)
                    .collect(),
            ),
            NodeKind::Binary => Value::Binary(self.reader.bytes(entry.payload.clone()).to_vec()),
            NodeKind::Object => Value::Object(
                self.children()
                    .map(|child| (child.name().to_string(), child.to_value()))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.reader, other.reader) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("offset", &self.offset())
            .finish()
    }
}

/// Iterator over the children of a [`Node`].
#[derive(Clone)]
pub struct Children<'a> {
    reader: &'a Reader,
    ids: std::slice::Iter<'a, usize>,
}

impl<'a> Iterator for Children<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Node<'a>> {
        self.ids.next().map(|&id| Node::new(self.reader, id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl DoubleEndedIterator for Children<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.ids.next_back().map(|&id| Node::new(self.reader, id))
    }
}

impl ExactSizeIterator for Children<'_> {}

// An empty payload has no fields; otherwise every separator starts a new one.
fn split_fields(text: &str) -> impl Iterator<Item = &str> {
    (!text.is_empty())
        .then(|| text.split(FIELD_SEPARATOR as char))
        .into_iter()
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn parse(input: &[u8]) -> Reader {
        Reader::new(input.to_vec()).unwrap()
    }

    #[test]
    fn test_text_field_splitting() {
        let reader = parse(b"(a)1,2,3\n");
        let a = reader.root().unwrap().child_named("a").unwrap();
        assert_eq!(a.element_count(), 3);
        assert_eq!(a.text_field(1).unwrap(), "2");
        assert_eq!(a.raw_text().unwrap(), "1,2,3");
    }

    #[test]
    fn test_empty_and_blank_fields() {
        let reader = parse(b"(e)\n(b)a,,c\n(t)a,\n");
        let root = reader.root().unwrap();
        assert_eq!(root.child_at(0).unwrap().element_count(), 0);
        let b = root.child_at(1).unwrap();
        assert_eq!(b.text_fields().unwrap().collect::<Vec<_>>(), vec!["a", "", "c"]);
        assert_eq!(root.child_at(2).unwrap().element_count(), 2);
    }

    #[test]
    fn test_text_field_errors() {
        let reader = parse(b"(a)1,2\n{d}1,x\n");
        let root = reader.root().unwrap();
        let err = root.child_at(0).unwrap().text_field(2).unwrap_err();
        assert_eq!(err, Error::out_of_range(2, 2));
        let err = root.child_at(1).unwrap().text_field(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_binary_as() {
        let mut input = b"{d}4,".to_vec();
        input.extend_from_slice(&100i32.to_ne_bytes());
        input.push(b'\n');
        let reader = parse(&input);
        let d = reader.root().unwrap().child_named("d").unwrap();
        assert_eq!(d.element_count(), 4);
        assert_eq!(d.binary_as::<i32>(0).unwrap(), 100);
        assert_eq!(
            d.binary_as::<i32>(1).unwrap_err(),
            Error::out_of_range(1, 1)
        );
        assert_eq!(
            d.binary_as::<u64>(0).unwrap_err(),
            Error::MisalignedBinary { len: 4, width: 8 }
        );
        assert_eq!(d.binary_as::<u8>(3).unwrap(), 100i32.to_ne_bytes()[3]);
    }

    #[test]
    fn test_binary_on_text_is_type_mismatch() {
        let reader = parse(b"(a)1\n");
        let a = reader.root().unwrap().child_at(0).unwrap();
        assert_eq!(
            a.binary_as::<i32>(0).unwrap_err(),
            Error::type_mismatch(NodeKind::Binary, NodeKind::Text)
        );
    }

    #[test]
    fn test_binary_vec_unaligned_payload() {
        let mut input = b"(pad)x\n{v}8,".to_vec();
        input.extend_from_slice(bytemuck::cast_slice(&[1.5f32, -2.0]));
        input.push(b'\n');
        let reader = parse(&input);
        let v = reader.root().unwrap().child_named("v").unwrap();
        assert_eq!(v.binary_vec::<f32>().unwrap(), vec![1.5, -2.0]);
    }

    #[test]
    fn test_duplicate_names() {
        let reader = parse(b"[data]0\n[data]0\n(x)1\n");
        let root = reader.root().unwrap();
        let first = root.child_named_nth("data", 0).unwrap();
        let second = root.child_named_nth("data", 1).unwrap();
        assert_ne!(first, second);
        assert!(first.offset() < second.offset());
        assert_eq!(root.children_named("data").count(), 2);
        let err = root.child_named_nth("data", 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NodeNotFound);
        assert!(root.get("missing").is_none());
    }

    #[test]
    fn test_child_at_out_of_range() {
        let reader = parse(b"(x)1\n");
        let root = reader.root().unwrap();
        let x = root.child_at(0).unwrap();
        assert_eq!(x.child_count(), 0);
        assert_eq!(x.child_at(0).unwrap_err().kind(), ErrorKind::IndexOutOfRange);
        assert_eq!(root.child_at(1).unwrap_err(), Error::out_of_range(1, 1));
    }

    #[test]
    fn test_query_errors_leave_tree_usable() {
        let reader = parse(b"(x)1\n");
        let root = reader.root().unwrap();
        assert!(root.child_named("y").is_err());
        assert!(root.child_at(0).unwrap().binary().is_err());
        assert_eq!(root.child_named("x").unwrap().text_field(0).unwrap(), "1");
    }

    #[test]
    fn test_parse_field() {
        let reader = parse(b"(b)10.1,oops\n");
        let b = reader.root().unwrap().child_at(0).unwrap();
        assert_eq!(b.parse_field::<f64>(0).unwrap(), 10.1);
        assert!(b.parse_field::<f64>(1).is_err());
    }

    #[test]
    fn test_to_value() {
        let reader = parse(b"[o]16\n (a)1,2\n {b}1,z\n");
        let value = reader.document().to_value();
        assert_eq!(
            value,
            Value::Object(vec![(
                "o".to_string(),
                Value::Object(vec![
                    ("a".to_string(), Value::Text(vec!["1".into(), "2".into()])),
                    ("b".to_string(), Value::Binary(b"z".to_vec())),
                ])
            )])
        );
    }
}
