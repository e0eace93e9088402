/// Builds a [`Value`](crate::Value) from a literal-like description.
///
/// - `[a, b, c]`: a text value with one field per element, rendered with `to_string`
/// - `{ "name": value, ... }`: an object; names may repeat
/// - `bytes expr`: a binary value from anything that is `AsRef<[u8]>`
/// - any other expression: converted with `Value::from`
///
/// Members that are not a single token tree can be wrapped in parentheses.
///
/// ```rust
/// use spio::{spio, Value};
///
/// let data = spio!({
///     "a": 10,
///     "c": [1, 2, 3],
///     "blob": (bytes [0u8, 1, 2]),
///     "data": { "b": "10.1" }
/// });
/// assert_eq!(data.get("c"), Some(&Value::fields([1, 2, 3])));
/// assert_eq!(data.get("blob"), Some(&Value::Binary(vec![0, 1, 2])));
/// ```
#[macro_export]
macro_rules! spio {
    ([]) => {
        $crate::Value::Text(::std::vec::Vec::new())
    };

    ([ $($elem:expr),+ $(,)? ]) => {
        $crate::Value::Text(::std::vec![$(::std::string::ToString::to_string(&$elem)),+])
    };

    ({}) => {
        $crate::Value::object()
    };

    ({ $($key:literal : $value:tt),* $(,)? }) => {
        $crate::Value::Object(::std::vec![
            $((::std::string::ToString::to_string(&$key), $crate::spio!($value))),*
        ])
    };

    (bytes $bytes:expr) => {
        $crate::Value::Binary(::std::convert::AsRef::<[u8]>::as_ref(&$bytes).to_vec())
    };

    (( $($inner:tt)+ )) => {
        $crate::spio!($($inner)+)
    };

    ($other:expr) => {
        $crate::Value::from($other)
    };
}

#[cfg(test)]
mod tests {
    use crate::Value;

    #[test]
    fn test_spio_macro_scalars() {
        assert_eq!(spio!(42), Value::text("42"));
        assert_eq!(spio!(10.1), Value::text("10.1"));
        assert_eq!(spio!("hello"), Value::text("hello"));
        assert_eq!(spio!(true), Value::text("true"));
    }

    #[test]
    fn test_spio_macro_fields() {
        assert_eq!(spio!([]), Value::Text(vec![]));
        assert_eq!(spio!([1, 2, 3]), Value::fields([1, 2, 3]));
        assert_eq!(
            spio!(["x", 2, 'c']),
            Value::Text(vec!["x".into(), "2".into(), "c".into()])
        );
    }

    #[test]
    fn test_spio_macro_bytes() {
        assert_eq!(spio!(bytes b"ab"), Value::Binary(b"ab".to_vec()));
        let owned = vec![1u8, 2];
        assert_eq!(spio!(bytes owned), Value::Binary(vec![1, 2]));
    }

    #[test]
    fn test_spio_macro_objects() {
        assert_eq!(spio!({}), Value::object());
        let value = spio!({
            "data": { "a": 1 },
            "data": { "a": 2 },
        });
        assert_eq!(value.len(), 2);
        assert_eq!(
            value.get_nth("data", 1).and_then(|data| data.get("a")),
            Some(&Value::text("2"))
        );
    }
}
