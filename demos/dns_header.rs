use struct_codec::{Fields, Struct, Value};

fn main() -> struct_codec::Result<()> {
    let header = Struct::from_shorthand(vec![
        ("qr", "UInt16LE:1"),
        ("opcode", "UInt16LE:4"),
        ("aa", "UInt16LE:1"),
        ("tc", "UInt16LE:1"),
        ("rd", "UInt16LE:1"),
        ("ra", "UInt16LE:1"),
        ("z", "UInt16LE:3"),
        ("rcode", "UInt16LE:4"),
    ])?;

    let mut fields = Fields::new();
    fields.insert("qr".to_string(), Value::Int(1));
    fields.insert("opcode".to_string(), Value::Int(0));
    fields.insert("aa".to_string(), Value::Int(1));
    fields.insert("tc".to_string(), Value::Int(0));
    fields.insert("rd".to_string(), Value::Int(1));
    fields.insert("ra".to_string(), Value::Int(1));
    fields.insert("z".to_string(), Value::Int(0));
    fields.insert("rcode".to_string(), Value::Int(0));

    let encoded = header.encode(&Value::Struct(fields))?;
    println!("encoded {} bytes: {encoded:02x?}", encoded.len());

    let decoded = header.decode(&encoded)?;
    println!("decoded: {decoded:?}");
    Ok(())
}
