use spio::{spio, Reader, Value, Writer};

#[test]
fn test_spio_macro_numbers() {
    assert_eq!(spio!(42), Value::text("42"));
    assert_eq!(spio!(3.5), Value::text("3.5"));
    assert_eq!(spio!(-123), Value::text("-123"));
}

#[test]
fn test_spio_macro_strings() {
    assert_eq!(spio!("hello world"), Value::text("hello world"));
    assert_eq!(spio!(String::from("owned")), Value::text("owned"));
}

#[test]
fn test_spio_macro_fields() {
    let value = spio!([1, 2, 3]);
    assert_eq!(value.as_fields().map(<[String]>::len), Some(3));
    assert_eq!(spio!([]), Value::Text(vec![]));

    let x = 10.1;
    assert_eq!(
        spio!([x, "b", 'c']),
        Value::Text(vec!["10.1".into(), "b".into(), "c".into()])
    );
}

#[test]
fn test_spio_macro_bytes() {
    assert_eq!(spio!(bytes [1u8, 2, 3]), Value::Binary(vec![1, 2, 3]));
    assert_eq!(spio!(bytes "raw"), Value::Binary(b"raw".to_vec()));
    let data = 100i32.to_ne_bytes();
    assert_eq!(spio!(bytes data).len(), 4);
}

#[test]
fn test_spio_macro_nested_objects() {
    let value = spio!({
        "a": 10,
        "c": [1, 2, 3],
        "d": (bytes [0u8, 100]),
        "data": {
            "a": "10",
            "b": 10.1
        },
        "data": {}
    });

    assert_eq!(value.len(), 5);
    assert_eq!(value.get("a"), Some(&Value::text("10")));
    assert_eq!(value.get("d"), Some(&Value::Binary(vec![0, 100])));
    let data = value.get("data").unwrap();
    assert_eq!(data.get("b"), Some(&Value::text("10.1")));
    assert_eq!(value.get_nth("data", 1), Some(&Value::object()));
}

#[test]
fn test_spio_macro_written_and_read_back() {
    let value = spio!({
        "c": [1, 2, 3],
        "data": { "a": "10", "blob": (bytes b"\n,]") }
    });
    let mut writer = Writer::new();
    writer.add_value("doc", &value).unwrap();
    let reader = Reader::new(writer.into_bytes().unwrap()).unwrap();
    let doc = reader.root().unwrap().child_named("doc").unwrap();
    assert_eq!(doc.to_value(), value);
}
