//! Writes a small document to disk, prints it, then reads every entry back.
//!
//! Run with `cargo run --example sample`.

use serde::Serialize;
use spio::{Node, Reader, SpioOptions, Writer};

#[derive(Serialize)]
struct Data {
    a: i32,
    b: f64,
}

fn print_txt(node: Node<'_>) -> spio::Result<()> {
    let fields: Vec<&str> = node.text_fields()?.collect();
    println!("{} {}", node.name(), fields.join(","));
    Ok(())
}

fn print_int(node: Node<'_>) -> spio::Result<()> {
    let values: Vec<String> = node
        .binary_vec::<i32>()?
        .iter()
        .map(i32::to_string)
        .collect();
    println!("{} {}", node.name(), values.join(","));
    Ok(())
}

fn print_data(node: Node<'_>) -> spio::Result<()> {
    println!("{}", node.name());
    print_txt(node.child_named("a")?)?;
    print_txt(node.child_named("b")?)
}

fn main() -> spio::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("test.sp");

    let data = Data { a: 10, b: 10.1 };
    let mut writer = Writer::with_options(SpioOptions::new().with_float_precision(1));

    writer.add_txt_fields("a", [data.a])?;
    writer.add_txt_fields("b", [format!("{:.1}", data.b)])?;
    writer.add_txt_fields("c", [1, 2, 3])?;
    writer.add_bin_value("d", &100i32)?;
    {
        let mut nested = writer.object("data")?;
        nested.add_txt_fields("a", [data.a])?;
        nested.add_txt_fields("b", [format!("{:.1}", data.b)])?;
    }
    writer.add_obj("data", &data)?;

    print!("{}", writer);
    writer.flush(&path)?;
    println!();

    let reader = Reader::open(&path)?;
    let Some(root) = reader.root() else {
        println!("empty document");
        return Ok(());
    };

    print_txt(root.child_named("a")?)?;
    print_txt(root.child_named("b")?)?;
    print_txt(root.child_named("c")?)?;
    print_int(root.child_named("d")?)?;
    print_data(root.child_named_nth("data", 0)?)?;
    print_data(root.child_named_nth("data", 1)?)?;
    Ok(())
}
