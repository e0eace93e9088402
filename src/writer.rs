//! Encoding entries into a byte buffer.
//!
//! The [`Writer`] appends entries as they are emitted. Text and binary lengths are
//! known up front and written immediately. Object lengths are only known once every
//! child has been written, so opening an object records the offset of its header
//! newline on a stack and closing it splices the decimal length in front of that
//! newline.
//!
//! ## Usage
//!
//! ```rust
//! use spio::Writer;
//!
//! let mut writer = Writer::new();
//! writer.add_txt("a", "10")?;
//! writer.add_txt_fields("c", [1, 2, 3])?;
//! writer.add_bin_value("d", &100i32)?;
//! {
//!     let mut data = writer.object("data")?;
//!     data.add_txt("a", "10")?;
//!     data.add_txt("b", "10.1")?;
//! }
//!
//! let bytes = writer.into_bytes()?;
//! assert!(bytes.ends_with(b"[data]16\n (a)10\n (b)10.1\n"));
//! # Ok::<(), spio::Error>(())
//! ```
//!
//! Offsets on the stack stay valid across insertions because objects close in
//! strict LIFO order: every splice happens after all still-open headers.

use crate::grammar::{self, NodeKind, FIELD_SEPARATOR, INDENT, TERMINATOR};
use crate::{Error, Result, SpioOptions, Value};
use bytemuck::Pod;
use serde::Serialize;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::Path;

/// Appends encoded entries to an in-memory buffer.
#[derive(Debug)]
pub struct Writer {
    buf: Vec<u8>,
    // Offset of the header newline of each open object.
    stack: Vec<usize>,
    options: SpioOptions,
}

impl Writer {
    pub fn new() -> Self {
        Self::with_options(SpioOptions::default())
    }

    /// Creates a writer whose [`add_obj`](Writer::add_obj) calls serialize with `options`.
    pub fn with_options(options: SpioOptions) -> Self {
        Writer {
            buf: Vec::with_capacity(256),
            stack: Vec::new(),
            options,
        }
    }

    /// Number of objects currently open.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.stack.is_empty()
    }

    fn write_header(&mut self, name: &str, kind: NodeKind) -> Result<()> {
        if !grammar::is_valid_name(name, kind) {
            return Err(Error::InvalidName(name.to_string()));
        }
        self.buf
            .extend(std::iter::repeat(INDENT).take(self.stack.len()));
        self.buf.push(kind.open_marker());
        self.buf.extend_from_slice(name.as_bytes());
        self.buf.push(kind.close_marker());
        Ok(())
    }

    /// Appends a text entry with `text` as its body.
    ///
    /// Commas in `text` act as field separators, so `"1,2,3"` is read back as
    /// three fields. A newline would end the entry early and is rejected.
    pub fn add_txt(&mut self, name: &str, text: &str) -> Result<()> {
        if text.as_bytes().contains(&TERMINATOR) {
            return Err(Error::InvalidText(text.to_string()));
        }
        self.write_header(name, NodeKind::Text)?;
        self.buf.extend_from_slice(text.as_bytes());
        self.buf.push(TERMINATOR);
        Ok(())
    }

    /// Appends a text entry whose fields are the `Display` renderings of `fields`.
    ///
    /// An empty iterator writes a body with no fields. A single empty field is
    /// rejected, since `(name)\n` reads back as zero fields.
    ///
    /// ```rust
    /// use spio::Writer;
    ///
    /// let mut writer = Writer::new();
    /// writer.add_txt_fields("c", [1, 2, 3])?;
    /// writer.add_txt_fields("b", [format!("{:.1}", 10.14)])?;
    /// assert_eq!(writer.as_bytes(), b"(c)1,2,3\n(b)10.1\n");
    /// # Ok::<(), spio::Error>(())
    /// ```
    pub fn add_txt_fields<I>(&mut self, name: &str, fields: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        let mut body = String::new();
        let mut count = 0;
        for (i, field) in fields.into_iter().enumerate() {
            let field = field.to_string();
            if !grammar::is_valid_field(&field) {
                return Err(Error::InvalidText(field));
            }
            if i > 0 {
                body.push(FIELD_SEPARATOR as char);
            }
            body.push_str(&field);
            count += 1;
        }
        if count == 1 && body.is_empty() {
            return Err(Error::InvalidText(body));
        }
        self.add_txt(name, &body)
    }

    /// Appends a binary entry holding `data` verbatim.
    ///
    /// The declared length is taken from the slice, so it always matches the
    /// number of raw bytes that follow.
    pub fn add_bin(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.write_header(name, NodeKind::Binary)?;
        self.buf.extend_from_slice(data.len().to_string().as_bytes());
        self.buf.push(FIELD_SEPARATOR);
        self.buf.extend_from_slice(data);
        self.buf.push(TERMINATOR);
        Ok(())
    }

    /// Appends the native-endian bytes of a plain-old-data value.
    pub fn add_bin_value<T: Pod>(&mut self, name: &str, value: &T) -> Result<()> {
        self.add_bin(name, bytemuck::bytes_of(value))
    }

    /// Appends the native-endian bytes of a slice of plain-old-data values.
    pub fn add_bin_slice<T: Pod>(&mut self, name: &str, values: &[T]) -> Result<()> {
        self.add_bin(name, bytemuck::cast_slice(values))
    }

    /// Opens an object; every entry until the matching [`close_object`](Writer::close_object)
    /// becomes its child.
    ///
    /// Prefer [`object`](Writer::object) or [`with_object`](Writer::with_object), which
    /// cannot leave the object open.
    pub fn open_object(&mut self, name: &str) -> Result<()> {
        self.write_header(name, NodeKind::Object)?;
        self.buf.push(TERMINATOR);
        self.stack.push(self.buf.len() - 1);
        Ok(())
    }

    /// Closes the most recently opened object and patches in its length.
    pub fn close_object(&mut self) -> Result<()> {
        let newline = self
            .stack
            .pop()
            .ok_or_else(|| Error::unbalanced("close_object called with no open object"))?;
        let len = self.buf.len() - newline - 1;
        let digits = len.to_string();
        tracing::trace!(offset = newline, len, "patching object length");
        self.buf.splice(newline..newline, digits.bytes());
        Ok(())
    }

    /// Opens an object and returns a guard that closes it when dropped.
    ///
    /// The guard dereferences to the writer, so children are written through it.
    /// Objects opened through the guard with [`open_object`](Writer::open_object) and
    /// left open are closed along with it.
    pub fn object(&mut self, name: &str) -> Result<ObjectGuard<'_>> {
        self.open_object(name)?;
        let depth = self.stack.len();
        Ok(ObjectGuard {
            writer: self,
            depth,
            closed: false,
        })
    }

    /// Runs `f` inside a freshly opened object and closes it on every exit path.
    ///
    /// ```rust
    /// use spio::Writer;
    ///
    /// let mut writer = Writer::new();
    /// writer.with_object("data", |w| {
    ///     w.add_txt("a", "10")?;
    ///     w.add_txt("b", "10.1")
    /// })?;
    /// assert_eq!(writer.as_bytes(), b"[data]16\n (a)10\n (b)10.1\n");
    /// # Ok::<(), spio::Error>(())
    /// ```
    pub fn with_object<F, R>(&mut self, name: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut Writer) -> Result<R>,
    {
        let mut guard = self.object(name)?;
        let out = f(&mut *guard)?;
        guard.close()?;
        Ok(out)
    }

    // Closes objects until only `depth - 1` remain open.
    fn close_to(&mut self, depth: usize) -> Result<()> {
        if self.stack.len() < depth {
            return Err(Error::unbalanced(format!(
                "scoped object at depth {} was already closed",
                depth
            )));
        }
        while self.stack.len() >= depth {
            self.close_object()?;
        }
        Ok(())
    }

    /// Writes an owned [`Value`] tree under `name`.
    pub fn add_value(&mut self, name: &str, value: &Value) -> Result<()> {
        match value {
            Value::Text(fields) => self.add_txt_fields(name, fields),
            Value::Binary(bytes) => self.add_bin(name, bytes),
            Value::Object(members) => self.with_object(name, |w| {
                for (child, value) in members {
                    w.add_value(child, value)?;
                }
                Ok(())
            }),
        }
    }

    /// Serializes any `T: Serialize` and writes it under `name`.
    ///
    /// Structs and maps become objects whose children are their fields.
    ///
    /// ```rust
    /// use serde::Serialize;
    /// use spio::{SpioOptions, Writer};
    ///
    /// #[derive(Serialize)]
    /// struct Data { a: i32, b: f64 }
    ///
    /// let mut writer = Writer::with_options(SpioOptions::new().with_float_precision(1));
    /// writer.add_obj("data", &Data { a: 10, b: 10.1 })?;
    /// assert_eq!(writer.as_bytes(), b"[data]16\n (a)10\n (b)10.1\n");
    /// # Ok::<(), spio::Error>(())
    /// ```
    pub fn add_obj<T>(&mut self, name: &str, value: &T) -> Result<()>
    where
        T: ?Sized + Serialize,
    {
        let value = crate::ser::to_value_with_options(value, &self.options)?;
        self.add_value(name, &value)
    }

    /// Bytes written so far, including any objects still open.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Finishes the document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnbalancedNesting`] if any object is still open.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        if !self.stack.is_empty() {
            return Err(Error::unbalanced(format!(
                "{} object(s) still open",
                self.stack.len()
            )));
        }
        tracing::debug!(len = self.buf.len(), "document finished");
        Ok(self.buf)
    }

    /// Writes the finished document to `path`.
    pub fn flush<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if !self.stack.is_empty() {
            return Err(Error::unbalanced(format!(
                "{} object(s) still open",
                self.stack.len()
            )));
        }
        std::fs::write(path, &self.buf)?;
        Ok(())
    }

    /// Renders the buffer for diagnostics, replacing non-UTF-8 bytes.
    #[must_use]
    pub fn dump(&self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Writer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}

/// An open object that closes itself when dropped.
///
/// Created by [`Writer::object`].
pub struct ObjectGuard<'w> {
    writer: &'w mut Writer,
    depth: usize,
    closed: bool,
}

impl ObjectGuard<'_> {
    /// Closes the object now, reporting nesting errors instead of logging them.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.writer.close_to(self.depth)
    }
}

impl Deref for ObjectGuard<'_> {
    type Target = Writer;

    fn deref(&self) -> &Writer {
        self.writer
    }
}

impl DerefMut for ObjectGuard<'_> {
    fn deref_mut(&mut self) -> &mut Writer {
        self.writer
    }
}

impl Drop for ObjectGuard<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.writer.close_to(self.depth) {
            tracing::warn!(%err, "scoped object could not be closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_entries() {
        let mut writer = Writer::new();
        writer.add_txt("a", "10").unwrap();
        writer.add_txt_fields("c", [1, 2, 3]).unwrap();
        assert_eq!(writer.into_bytes().unwrap(), b"(a)10\n(c)1,2,3\n");
    }

    #[test]
    fn test_binary_entry_layout() {
        let mut writer = Writer::new();
        writer.add_bin("d", &[0xff, b'\n', b',']).unwrap();
        assert_eq!(writer.as_bytes(), b"{d}3,\xff\n,\n");
    }

    #[test]
    fn test_binary_value_uses_native_bytes() {
        let mut writer = Writer::new();
        writer.add_bin_value("d", &100i32).unwrap();
        let mut expected = b"{d}4,".to_vec();
        expected.extend_from_slice(&100i32.to_ne_bytes());
        expected.push(b'\n');
        assert_eq!(writer.as_bytes(), &expected[..]);
    }

    #[test]
    fn test_nested_lengths_are_patched() {
        let mut writer = Writer::new();
        writer.open_object("outer").unwrap();
        writer.open_object("inner").unwrap();
        writer.add_txt("x", "1").unwrap();
        writer.close_object().unwrap();
        writer.close_object().unwrap();
        // "  (x)1\n" is 7 bytes, " [inner]7\n" is 10 more
        assert_eq!(
            writer.into_bytes().unwrap(),
            b"[outer]17\n [inner]7\n  (x)1\n"
        );
    }

    #[test]
    fn test_empty_object() {
        let mut writer = Writer::new();
        writer.with_object("e", |_| Ok(())).unwrap();
        assert_eq!(writer.as_bytes(), b"[e]0\n");
    }

    #[test]
    fn test_guard_closes_on_drop() {
        let mut writer = Writer::new();
        {
            let mut guard = writer.object("data").unwrap();
            guard.add_txt("a", "10").unwrap();
            assert_eq!(guard.depth(), 1);
        }
        assert!(writer.is_balanced());
        assert_eq!(writer.as_bytes(), b"[data]7\n (a)10\n");
    }

    #[test]
    fn test_guard_closes_on_error_path() {
        let mut writer = Writer::new();
        let result = writer.with_object("data", |w| {
            w.add_txt("a", "10")?;
            w.add_txt("bad", "line\nbreak")
        });
        assert!(matches!(result, Err(Error::InvalidText(_))));
        assert!(writer.is_balanced());
    }

    #[test]
    fn test_guard_closes_leftover_raw_objects() {
        let mut writer = Writer::new();
        {
            let mut guard = writer.object("outer").unwrap();
            guard.open_object("inner").unwrap();
        }
        assert!(writer.is_balanced());
        assert_eq!(writer.as_bytes(), b"[outer]10\n [inner]0\n");
    }

    #[test]
    fn test_unbalanced_close() {
        let mut writer = Writer::new();
        let err = writer.close_object().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UnbalancedNesting);
    }

    #[test]
    fn test_into_bytes_with_open_object() {
        let mut writer = Writer::new();
        writer.open_object("data").unwrap();
        assert!(matches!(
            writer.into_bytes(),
            Err(Error::UnbalancedNesting(_))
        ));
    }

    #[test]
    fn test_rejects_bad_names_and_fields() {
        let mut writer = Writer::new();
        assert!(matches!(
            writer.add_txt("a)", "1"),
            Err(Error::InvalidName(_))
        ));
        assert!(matches!(
            writer.add_txt_fields("a", ["x,y"]),
            Err(Error::InvalidText(_))
        ));
        // Nothing partial was written
        assert!(writer.as_bytes().is_empty());
        // A ')' is fine inside an object name
        writer.open_object("a)").unwrap();
        writer.close_object().unwrap();
    }

    #[test]
    fn test_single_empty_field_is_rejected() {
        let mut writer = Writer::new();
        assert!(matches!(
            writer.add_txt_fields("t", [""]),
            Err(Error::InvalidText(_))
        ));
        assert!(matches!(
            writer.add_value("t", &Value::Text(vec![String::new()])),
            Err(Error::InvalidText(_))
        ));
        assert!(writer.as_bytes().is_empty());

        writer.add_txt_fields("none", Vec::<String>::new()).unwrap();
        writer.add_txt_fields("pair", ["", ""]).unwrap();
        writer.add_txt("tail", "").unwrap();
        assert_eq!(writer.as_bytes(), b"(none)\n(pair),\n(tail)\n");
    }

    #[test]
    fn test_new_matches_default() {
        let fresh = Writer::new();
        let default = Writer::default();
        assert_eq!(fresh.buf.capacity(), default.buf.capacity());
        assert_eq!(
            fresh.buf.capacity(),
            Writer::with_options(SpioOptions::default()).buf.capacity()
        );
        assert!(fresh.buf.capacity() > 0);
    }

    #[test]
    fn test_multi_digit_length() {
        let mut writer = Writer::new();
        writer
            .with_object("big", |w| w.add_bin("blob", &[0u8; 120]))
            .unwrap();
        let bytes = writer.into_bytes().unwrap();
        assert!(bytes.starts_with(b"[big]132\n {blob}120,"));
    }
}
