//! Wire grammar shared by [`Writer`](crate::Writer) and [`Reader`](crate::Reader).
//!
//! A document is a run of entries packed back to back with no header, footer or
//! version field. Each entry is
//!
//! ```text
//! entry        := indent marker-entry
//! indent       := <depth> ' ' characters        (0 at top level)
//! marker-entry := '(' name ')' text-body
//!               | '{' name '}' binary-body
//!               | '[' name ']' object-body
//! text-body    := field (',' field)* '\n'
//! binary-body  := decimal-length ',' <decimal-length raw bytes> '\n'
//! object-body  := decimal-length '\n' <decimal-length bytes of child entries>
//! ```
//!
//! The length of an object counts every byte of its nested entries, recursively, and
//! nothing else: not its own digits, not its own newline. An object has no trailing
//! newline beyond the one its last child emits.
//!
//! # Example
//!
//! ```text
//! (a)10
//! (c)1,2,3
//! {d}4,<4 raw bytes>
//! [data]16
//!  (a)10
//!  (b)10.1
//! ```

use std::fmt;

pub const INDENT: u8 = b' ';
pub const FIELD_SEPARATOR: u8 = b',';
pub const TERMINATOR: u8 = b'\n';

/// The three kinds of node a document can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Comma separated textual fields.
    Text,
    /// Raw bytes with an explicit length.
    Binary,
    /// Nested entries.
    Object,
}

impl NodeKind {
    /// Marker byte that opens the name of an entry of this kind.
    #[must_use]
    pub const fn open_marker(self) -> u8 {
        match self {
            NodeKind::Text => b'(',
            NodeKind::Binary => b'{',
            NodeKind::Object => b'[',
        }
    }

    /// Marker byte that closes the name of an entry of this kind.
    #[must_use]
    pub const fn close_marker(self) -> u8 {
        match self {
            NodeKind::Text => b')',
            NodeKind::Binary => b'}',
            NodeKind::Object => b']',
        }
    }

    /// Maps an opening marker byte back to its kind.
    #[must_use]
    pub const fn from_open_marker(byte: u8) -> Option<NodeKind> {
        match byte {
            b'(' => Some(NodeKind::Text),
            b'{' => Some(NodeKind::Binary),
            b'[' => Some(NodeKind::Object),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeKind::Text => "text",
            NodeKind::Binary => "binary",
            NodeKind::Object => "object",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if `name` can be written between the markers of `kind`.
pub(crate) fn is_valid_name(name: &str, kind: NodeKind) -> bool {
    !name
        .bytes()
        .any(|b| b == kind.close_marker() || b == TERMINATOR)
}

/// Returns true if `field` can sit inside a text body without splitting or ending it.
pub(crate) fn is_valid_field(field: &str) -> bool {
    !field
        .bytes()
        .any(|b| b == FIELD_SEPARATOR || b == TERMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_pair_up() {
        for kind in [NodeKind::Text, NodeKind::Binary, NodeKind::Object] {
            assert_eq!(NodeKind::from_open_marker(kind.open_marker()), Some(kind));
            assert_ne!(kind.open_marker(), kind.close_marker());
        }
        assert_eq!(NodeKind::from_open_marker(b')'), None);
    }

    #[test]
    fn test_name_validity_depends_on_kind() {
        assert!(is_valid_name("a)b", NodeKind::Binary));
        assert!(!is_valid_name("a)b", NodeKind::Text));
        assert!(!is_valid_name("x\ny", NodeKind::Object));
        assert!(is_valid_name("", NodeKind::Object));
    }

    #[test]
    fn test_field_validity() {
        assert!(is_valid_field("10.1"));
        assert!(!is_valid_field("1,2"));
        assert!(!is_valid_field("line\n"));
    }
}
