//! Configuration options for spio encoding and decoding.
//!
//! - [`SpioOptions`]: Main configuration struct
//! - [`NumberEncoding`]: Whether the Serde layer writes numbers as text or raw bytes
//!
//! ## Examples
//!
//! ```rust
//! use spio::{to_bytes_with_options, NumberEncoding, SpioOptions};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Data { a: i32, b: f64 }
//!
//! let data = Data { a: 10, b: 10.14 };
//!
//! // One decimal place, like a "%.1f" template
//! let options = SpioOptions::new().with_float_precision(1);
//! let bytes = to_bytes_with_options(&data, options).unwrap();
//! assert_eq!(bytes, b"(a)10\n(b)10.1\n");
//!
//! // Native-endian binary numbers
//! let options = SpioOptions::new().with_numbers(NumberEncoding::Binary);
//! let bytes = to_bytes_with_options(&data, options).unwrap();
//! assert!(bytes.starts_with(b"{a}4,"));
//! ```

use std::fmt;

/// How the Serde layer encodes numeric scalars.
///
/// ```rust
/// use spio::NumberEncoding;
///
/// assert_eq!(NumberEncoding::default(), NumberEncoding::Text);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NumberEncoding {
    /// Decimal text, one field per number.
    #[default]
    Text,
    /// Native-endian bytes in a binary entry sized to the number's width.
    Binary,
}

/// Configuration options for spio.
///
/// `float_precision` and `numbers` affect serialization only; `max_depth` affects
/// decoding only.
///
/// # Examples
///
/// ```rust
/// use spio::{NumberEncoding, SpioOptions};
///
/// let options = SpioOptions::new()
///     .with_float_precision(3)
///     .with_numbers(NumberEncoding::Binary)
///     .with_max_depth(16);
/// assert_eq!(options.max_depth, Some(16));
/// ```
#[derive(Clone, Debug, Default)]
pub struct SpioOptions {
    pub float_precision: Option<usize>,
    pub numbers: NumberEncoding,
    pub max_depth: Option<usize>,
}

impl SpioOptions {
    /// Creates default options (text numbers, shortest float form, unlimited depth).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use spio::SpioOptions;
    ///
    /// let options = SpioOptions::new();
    /// assert!(options.float_precision.is_none());
    /// assert!(options.max_depth.is_none());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes text floats with exactly `digits` decimal places.
    #[must_use]
    pub fn with_float_precision(mut self, digits: usize) -> Self {
        self.float_precision = Some(digits);
        self
    }

    #[must_use]
    pub fn with_numbers(mut self, numbers: NumberEncoding) -> Self {
        self.numbers = numbers;
        self
    }

    /// Rejects documents nesting deeper than `depth` levels below the root.
    ///
    /// Top-level entries sit at depth 0, so `with_max_depth(0)` forbids any
    /// object from having children.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub(crate) fn format_float<F: fmt::Display>(&self, v: F) -> String {
        match self.float_precision {
            Some(digits) => format!("{:.*}", digits, v),
            None => v.to_string(),
        }
    }
}
