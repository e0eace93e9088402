//! Decoding a byte buffer into a tree of [`Node`]s.
//!
//! Parsing happens once, fully, in two phases:
//!
//! 1. **Flat scan**: walk the buffer entry by entry, recording each entry's kind,
//!    name, payload range and indent level. Any malformed entry aborts the parse.
//! 2. **Tree reconstruction**: walk the flat list keeping a stack of open objects
//!    indexed by depth. An entry one level deeper than its predecessor opens that
//!    predecessor (which must be an object); a shallower entry closes objects back
//!    down to its own level. Jumps of more than one level are rejected.
//!
//! While closing objects the reader also checks that each object's declared
//! length equals the byte span of its children.
//!
//! ## Usage
//!
//! ```rust
//! use spio::Reader;
//!
//! let reader = Reader::new(b"(a)1,2,3\n[data]7\n (b)xy\n".to_vec())?;
//! let root = reader.root().unwrap();
//! assert_eq!(root.child_named("a")?.text_field(1)?, "2");
//! assert_eq!(root.child_named("data")?.child_named("b")?.text_field(0)?, "xy");
//! # Ok::<(), spio::Error>(())
//! ```

use crate::grammar::{NodeKind, FIELD_SEPARATOR, INDENT, TERMINATOR};
use crate::node::Node;
use crate::{Error, Result, SpioOptions};
use std::fmt;
use std::ops::Range;
use std::path::Path;

pub(crate) const ROOT: usize = 0;

/// One scanned entry. The synthetic root lives at index [`ROOT`].
#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) kind: NodeKind,
    pub(crate) name: Range<usize>,
    // Text: body without its newline. Binary: raw bytes. Object: the children span.
    pub(crate) payload: Range<usize>,
    pub(crate) depth: usize,
    pub(crate) offset: usize,
    pub(crate) children: Vec<usize>,
}

/// Owns a parsed document: the raw buffer plus every node scanned from it.
///
/// Nodes are handed out as [`Node`] views borrowing the reader.
#[derive(Debug, Clone)]
pub struct Reader {
    buf: Vec<u8>,
    entries: Vec<Entry>,
}

impl Reader {
    /// Parses `bytes` with default options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedEntry`] at the first entry that does not follow the
    /// grammar. No partial tree is produced.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        Self::with_options(bytes, &SpioOptions::default())
    }

    /// Parses `bytes`, honoring `options.max_depth`.
    pub fn with_options(bytes: impl Into<Vec<u8>>, options: &SpioOptions) -> Result<Self> {
        let buf = bytes.into();
        let scanned = Scanner::new(&buf).scan_all()?;
        let entries = build_tree(scanned, buf.len(), options.max_depth)?;
        tracing::debug!(
            entries = entries.len() - 1,
            len = buf.len(),
            "document parsed"
        );
        Ok(Reader { buf, entries })
    }

    /// Reads and parses the file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, &SpioOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: &SpioOptions) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::with_options(bytes, options)
    }

    /// The top-level object, or `None` for a document with no entries.
    #[must_use]
    pub fn root(&self) -> Option<Node<'_>> {
        if self.is_empty() {
            None
        } else {
            Some(self.document())
        }
    }

    /// The top-level object, present even when the document is empty.
    #[must_use]
    pub fn document(&self) -> Node<'_> {
        Node::new(self, ROOT)
    }

    /// Number of entries in the document, at every depth.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len() - 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every entry in document order.
    pub fn nodes(&self) -> impl Iterator<Item = Node<'_>> + '_ {
        (ROOT + 1..self.entries.len()).map(move |id| Node::new(self, id))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Renders the raw document for diagnostics, replacing non-UTF-8 bytes.
    #[must_use]
    pub fn dump(&self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }

    pub(crate) fn entry(&self, id: usize) -> &Entry {
        &self.entries[id]
    }

    pub(crate) fn bytes(&self, range: Range<usize>) -> &[u8] {
        &self.buf[range]
    }

    // Names and text payloads are validated as UTF-8 during the scan.
    pub(crate) fn str_at(&self, range: Range<usize>) -> &str {
        std::str::from_utf8(&self.buf[range]).unwrap_or_default()
    }
}

impl fmt::Display for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}

struct Scanner<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(data: &'a [u8]) -> Self {
        Scanner { data, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn scan_all(mut self) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        while !self.at_end() {
            let entry = self.scan_entry()?;
            tracing::trace!(
                offset = entry.offset,
                depth = entry.depth,
                kind = %entry.kind,
                "scanned entry"
            );
            entries.push(entry);
        }
        Ok(entries)
    }

    fn find(&self, byte: u8, what: &str) -> Result<usize> {
        self.data[self.pos..]
            .iter()
            .position(|&b| b == byte)
            .map(|i| self.pos + i)
            .ok_or_else(|| Error::malformed(self.pos, format!("missing {}", what)))
    }

    fn utf8(&self, range: Range<usize>, what: &str) -> Result<()> {
        std::str::from_utf8(&self.data[range.clone()])
            .map(|_| ())
            .map_err(|e| {
                Error::malformed(
                    range.start + e.valid_up_to(),
                    format!("{} is not valid UTF-8", what),
                )
            })
    }

    // Reads ASCII digits up to `delimiter` and consumes the delimiter.
    fn length(&mut self, delimiter: u8) -> Result<usize> {
        let start = self.pos;
        let digits = self.data[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let end = start + digits;
        if digits == 0 {
            return Err(Error::malformed(start, "expected decimal length"));
        }
        match self.data.get(end) {
            Some(&b) if b == delimiter => {}
            Some(_) => {
                return Err(Error::malformed(
                    end,
                    format!("non-numeric length, expected {:?}", delimiter as char),
                ))
            }
            None => return Err(Error::malformed(end, "truncated length field")),
        }
        let mut len: usize = 0;
        for &d in &self.data[start..end] {
            len = len
                .checked_mul(10)
                .and_then(|n| n.checked_add(usize::from(d - b'0')))
                .ok_or_else(|| Error::malformed(start, "length overflows"))?;
        }
        self.pos = end + 1;
        Ok(len)
    }

    fn scan_entry(&mut self) -> Result<Entry> {
        let offset = self.pos;
        while self.data.get(self.pos) == Some(&INDENT) {
            self.pos += 1;
        }
        let depth = self.pos - offset;

        let marker = *self
            .data
            .get(self.pos)
            .ok_or_else(|| Error::malformed(self.pos, "expected entry marker"))?;
        let kind = NodeKind::from_open_marker(marker).ok_or_else(|| {
            Error::malformed(
                self.pos,
                format!("unexpected byte 0x{:02x}, expected '(', '{{' or '['", marker),
            )
        })?;
        self.pos += 1;

        let close = self.find(kind.close_marker(), "closing name marker")?;
        let name = self.pos..close;
        self.utf8(name.clone(), "name")?;
        self.pos = close + 1;

        let payload = match kind {
            NodeKind::Text => {
                let newline = self.find(TERMINATOR, "newline after text")?;
                let body = self.pos..newline;
                self.utf8(body.clone(), "text")?;
                self.pos = newline + 1;
                body
            }
            NodeKind::Binary => {
                let len = self.length(FIELD_SEPARATOR)?;
                let start = self.pos;
                let end = start
                    .checked_add(len)
                    .filter(|&end| end <= self.data.len())
                    .ok_or_else(|| Error::malformed(start, "truncated binary payload"))?;
                if self.data.get(end) != Some(&TERMINATOR) {
                    return Err(Error::malformed(end, "missing newline after binary payload"));
                }
                self.pos = end + 1;
                start..end
            }
            NodeKind::Object => {
                let len = self.length(TERMINATOR)?;
                let start = self.pos;
                let end = start
                    .checked_add(len)
                    .filter(|&end| end <= self.data.len())
                    .ok_or_else(|| Error::malformed(start, "object length runs past end of input"))?;
                // Children follow as ordinary entries.
                start..end
            }
        };

        Ok(Entry {
            kind,
            name,
            payload,
            depth,
            offset,
            children: Vec::new(),
        })
    }
}

fn check_object_end(entries: &[Entry], id: usize, at: usize) -> Result<()> {
    let entry = &entries[id];
    if entry.payload.end != at {
        return Err(Error::malformed(
            at,
            format!(
                "object at byte {} declares {} bytes but its children span {}",
                entry.offset,
                entry.payload.len(),
                at.saturating_sub(entry.payload.start)
            ),
        ));
    }
    Ok(())
}

fn build_tree(scanned: Vec<Entry>, len: usize, max_depth: Option<usize>) -> Result<Vec<Entry>> {
    let mut entries = Vec::with_capacity(scanned.len() + 1);
    entries.push(Entry {
        kind: NodeKind::Object,
        name: 0..0,
        payload: 0..len,
        depth: 0,
        offset: 0,
        children: Vec::new(),
    });

    // stack[d] is the object that entries at depth d attach to.
    let mut stack = vec![ROOT];
    let mut prev: Option<usize> = None;

    for entry in scanned {
        let id = entries.len();
        let depth = entry.depth;
        if let Some(limit) = max_depth {
            if depth > limit {
                return Err(Error::DepthLimitExceeded {
                    offset: entry.offset,
                    limit,
                });
            }
        }

        let mut opened = false;
        if depth >= stack.len() {
            match prev {
                Some(p) if depth == stack.len() && entries[p].kind == NodeKind::Object => {
                    stack.push(p);
                    opened = true;
                }
                Some(p) if depth == stack.len() => {
                    return Err(Error::malformed(
                        entry.offset,
                        format!("entry nested under a {} entry", entries[p].kind),
                    ));
                }
                _ => {
                    return Err(Error::malformed(
                        entry.offset,
                        format!(
                            "indent {} jumps past nesting level {}",
                            depth,
                            stack.len() - 1
                        ),
                    ));
                }
            }
        } else {
            while stack.len() > depth + 1 {
                if let Some(closed) = stack.pop() {
                    check_object_end(&entries, closed, entry.offset)?;
                }
            }
        }

        // An object followed by a sibling or an ancestor's sibling has no children.
        if let Some(p) = prev {
            if !opened && entries[p].kind == NodeKind::Object {
                check_object_end(&entries, p, entry.offset)?;
            }
        }

        let parent = stack[depth];
        entries[parent].children.push(id);
        entries.push(entry);
        prev = Some(id);
    }

    if let Some(p) = prev {
        if entries[p].kind == NodeKind::Object {
            check_object_end(&entries, p, len)?;
        }
    }
    while stack.len() > 1 {
        if let Some(closed) = stack.pop() {
            check_object_end(&entries, closed, len)?;
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn malformed_at(input: &[u8]) -> usize {
        let err = Reader::new(input.to_vec()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedEntry, "{}", err);
        err.offset().unwrap()
    }

    #[test]
    fn test_empty_document() {
        let reader = Reader::new(Vec::new()).unwrap();
        assert!(reader.root().is_none());
        assert!(reader.is_empty());
        assert_eq!(reader.document().child_count(), 0);
    }

    #[test]
    fn test_flat_entries() {
        let reader = Reader::new(b"(a)10\n{d}2,xy\n[e]0\n".to_vec()).unwrap();
        assert_eq!(reader.len(), 3);
        let kinds: Vec<_> = reader.nodes().map(|n| n.kind()).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Text, NodeKind::Binary, NodeKind::Object]
        );
    }

    #[test]
    fn test_nesting_and_dedent() {
        let input = b"[a]13\n [b]7\n  (x)1\n(y)2\n";
        let reader = Reader::new(input.to_vec()).unwrap();
        let root = reader.root().unwrap();
        assert_eq!(root.child_count(), 2);
        let a = root.child_at(0).unwrap();
        assert_eq!(a.child_count(), 1);
        assert_eq!(a.child_at(0).unwrap().child_count(), 1);
        assert_eq!(root.child_at(1).unwrap().name(), "y");
    }

    #[test]
    fn test_dedent_by_two_levels_pops_both() {
        let input = b"[a]21\n [b]14\n  (x)1\n  (z)2\n(y)3\n";
        let reader = Reader::new(input.to_vec()).unwrap();
        let root = reader.root().unwrap();
        let names: Vec<_> = root.children().map(|n| n.name()).collect();
        assert_eq!(names, vec!["a", "y"]);
    }

    #[test]
    fn test_binary_payload_may_contain_delimiters() {
        let reader = Reader::new(b"{d}3,\n,)\n(t)ok\n".to_vec()).unwrap();
        let root = reader.root().unwrap();
        assert_eq!(root.child_at(0).unwrap().binary().unwrap(), b"\n,)");
        assert_eq!(root.child_at(1).unwrap().text_field(0).unwrap(), "ok");
    }

    #[test]
    fn test_missing_text_newline() {
        assert_eq!(malformed_at(b"(a)1,2"), 3);
    }

    #[test]
    fn test_missing_closing_marker() {
        assert_eq!(malformed_at(b"(abc\n"), 1);
    }

    #[test]
    fn test_unknown_marker() {
        assert_eq!(malformed_at(b"(a)1\n<b>2\n"), 5);
    }

    #[test]
    fn test_non_numeric_length() {
        assert_eq!(malformed_at(b"{d}4x,abcd\n"), 4);
        assert_eq!(malformed_at(b"[o]\n"), 3);
    }

    #[test]
    fn test_truncated_binary() {
        assert_eq!(malformed_at(b"{d}10,abc\n"), 6);
        assert_eq!(malformed_at(b"{d}3,abcd\n"), 8);
    }

    #[test]
    fn test_indent_jump_rejected() {
        let err = Reader::new(b"[a]7\n  (x)1\n".to_vec()).unwrap_err();
        assert_eq!(err.offset(), Some(5));
        assert!(err.to_string().contains("jumps"));
    }

    #[test]
    fn test_first_entry_indented_rejected() {
        assert_eq!(malformed_at(b" (x)1\n"), 0);
    }

    #[test]
    fn test_child_of_text_rejected() {
        let err = Reader::new(b"(a)1\n (x)1\n".to_vec()).unwrap_err();
        assert!(err.to_string().contains("text entry"));
    }

    #[test]
    fn test_object_length_mismatch() {
        // Declares 5 but the child is 6 bytes
        assert_eq!(malformed_at(b"[a]5\n (x)1\n"), 11);
        // Declares 4 but has no children
        assert_eq!(malformed_at(b"[a]4\n(x)1\n"), 5);
    }

    #[test]
    fn test_depth_limit() {
        let input = b"[a]13\n [b]7\n  (x)1\n".to_vec();
        let options = SpioOptions::new().with_max_depth(1);
        let err = Reader::with_options(input.clone(), &options).unwrap_err();
        assert!(matches!(err, Error::DepthLimitExceeded { limit: 1, .. }));
        let options = SpioOptions::new().with_max_depth(2);
        assert!(Reader::with_options(input, &options).is_ok());
    }

    #[test]
    fn test_invalid_utf8_name() {
        assert_eq!(malformed_at(b"(\xff)1\n"), 1);
    }

    #[test]
    fn test_dump_is_lossless_for_text() {
        let input = b"(a)10\n".to_vec();
        let reader = Reader::new(input).unwrap();
        assert_eq!(reader.dump(), "(a)10\n");
        assert_eq!(reader.to_string(), "(a)10\n");
    }
}
