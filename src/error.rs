//! Error types for spio encoding, decoding and tree queries.
//!
//! ## Error Categories
//!
//! - **Decode errors**: the byte stream does not follow the entry grammar. These carry
//!   the byte offset at which scanning failed and abort the whole parse.
//! - **Nesting misuse**: the writer was asked to close an object that was never opened,
//!   or to finish a document with objects still open.
//! - **Query errors**: a lookup on an already-built tree asked for the wrong kind of
//!   node, an index past the end, or a name that is not there. These never invalidate
//!   the tree.
//!
//! ## Examples
//!
//! ```rust
//! use spio::{Error, ErrorKind, Reader};
//!
//! let err = Reader::new(b"(a)1,2".to_vec()).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::MalformedEntry);
//! assert_eq!(err.offset(), Some(3));
//! ```

use crate::grammar::NodeKind;
use std::fmt;
use thiserror::Error;

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input could not be scanned as a sequence of entries.
    MalformedEntry,
    /// Open/close calls on the writer did not pair up.
    UnbalancedNesting,
    /// A query was made against a node of the wrong kind.
    TypeMismatch,
    /// A field, element or child index was past the end.
    IndexOutOfRange,
    /// A name lookup found nothing.
    NodeNotFound,
    /// The writer refused a name or field that would corrupt the stream.
    InvalidInput,
    /// Reading or writing a file failed.
    Io,
    /// Serde glue errors.
    Other,
}

/// Represents all possible errors raised by the writer, the reader and node queries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The scan hit a missing marker, delimiter or newline, a bad length field, or a
    /// payload running past the end of the buffer.
    #[error("malformed entry at byte {offset}: {msg}")]
    MalformedEntry { offset: usize, msg: String },

    /// Entry nested deeper than the configured limit.
    #[error("entry at byte {offset} exceeds maximum depth {limit}")]
    DepthLimitExceeded { offset: usize, limit: usize },

    /// `close_object` without a matching open, or output taken while objects are open.
    #[error("unbalanced nesting: {0}")]
    UnbalancedNesting(String),

    #[error("type mismatch: expected {expected} node, found {found} node")]
    TypeMismatch { expected: NodeKind, found: NodeKind },

    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no child named {name:?} at occurrence {occurrence}")]
    NodeNotFound { name: String, occurrence: usize },

    /// Binary payload length is not a whole number of elements.
    #[error("binary payload of {len} bytes is not a multiple of element width {width}")]
    MisalignedBinary { len: usize, width: usize },

    /// Text field would embed a separator or terminator.
    #[error("invalid text field: {0:?}")]
    InvalidText(String),

    /// Name would embed its closing marker or a newline.
    #[error("invalid node name: {0:?}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Creates a decode error at `offset`.
    pub fn malformed(offset: usize, msg: impl Into<String>) -> Self {
        Error::MalformedEntry {
            offset,
            msg: msg.into(),
        }
    }

    pub fn unbalanced(msg: impl Into<String>) -> Self {
        Error::UnbalancedNesting(msg.into())
    }

    pub fn type_mismatch(expected: NodeKind, found: NodeKind) -> Self {
        Error::TypeMismatch { expected, found }
    }

    pub fn out_of_range(index: usize, len: usize) -> Self {
        Error::IndexOutOfRange { index, len }
    }

    pub fn not_found(name: &str, occurrence: usize) -> Self {
        Error::NodeNotFound {
            name: name.to_string(),
            occurrence,
        }
    }

    pub fn unsupported_type(msg: &str) -> Self {
        Error::UnsupportedType(msg.to_string())
    }

    /// Creates a custom error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use spio::Error;
    ///
    /// let err = Error::custom("something went wrong");
    /// assert!(err.to_string().contains("something went wrong"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Returns the coarse category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MalformedEntry { .. } | Error::DepthLimitExceeded { .. } => {
                ErrorKind::MalformedEntry
            }
            Error::UnbalancedNesting(_) => ErrorKind::UnbalancedNesting,
            Error::TypeMismatch { .. } | Error::MisalignedBinary { .. } => ErrorKind::TypeMismatch,
            Error::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Error::NodeNotFound { .. } => ErrorKind::NodeNotFound,
            Error::InvalidText(_) | Error::InvalidName(_) => ErrorKind::InvalidInput,
            Error::Io(_) => ErrorKind::Io,
            Error::UnsupportedType(_) | Error::Custom(_) => ErrorKind::Other,
        }
    }

    /// Byte offset of a decode failure, if this is one.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::MalformedEntry { offset, .. } | Error::DepthLimitExceeded { offset, .. } => {
                Some(*offset)
            }
            _ => None,
        }
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_groups_decode_errors() {
        assert_eq!(Error::malformed(4, "x").kind(), ErrorKind::MalformedEntry);
        let depth = Error::DepthLimitExceeded {
            offset: 9,
            limit: 2,
        };
        assert_eq!(depth.kind(), ErrorKind::MalformedEntry);
        assert_eq!(depth.offset(), Some(9));
        assert_eq!(Error::out_of_range(3, 1).offset(), None);
    }

    #[test]
    fn test_display_mentions_context() {
        let err = Error::type_mismatch(NodeKind::Text, NodeKind::Binary);
        assert_eq!(
            err.to_string(),
            "type mismatch: expected text node, found binary node"
        );
        let err = Error::not_found("data", 1);
        assert!(err.to_string().contains("\"data\""));
    }

    #[test]
    fn test_io_errors_convert() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.sp").into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("missing.sp"));
    }
}
