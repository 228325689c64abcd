//! Single and array read/write of registry-known primitive types.

use crate::accessor::{read_value, write_value};
use crate::error::Result;
use crate::schema::PrimitiveDescriptor;
use crate::value::Value;

pub(crate) fn decode(desc: &PrimitiveDescriptor, buf: &[u8]) -> Result<Value> {
    match desc.array_size {
        None | Some(0) => read_value(buf, desc.type_name, desc.position),
        Some(n) => {
            let mut values = Vec::with_capacity(n as usize);
            for k in 0..n {
                let offset = desc.position + k as usize * desc.size;
                values.push(read_value(buf, desc.type_name, offset)?);
            }
            Ok(Value::Array(values))
        }
    }
}

fn zero_value(desc: &PrimitiveDescriptor) -> Value {
    if desc.type_name.is_float() {
        Value::Float(0.0)
    } else if desc.type_name.is_big_int_typed() {
        Value::Big(0)
    } else {
        Value::Int(0)
    }
}

pub(crate) fn encode(desc: &PrimitiveDescriptor, buf: &mut [u8], value: &Value) -> Result<()> {
    match desc.array_size {
        None | Some(0) => {
            let scalar = match value {
                Value::Array(items) => items.first().cloned().unwrap_or_else(|| zero_value(desc)),
                other => other.clone(),
            };
            write_value(buf, desc.type_name, desc.position, &scalar)
        }
        Some(n) => {
            let items: &[Value] = match value {
                Value::Array(items) => items,
                other => std::slice::from_ref(other),
            };
            let n = n as usize;
            for k in 0..n {
                let offset = desc.position + k * desc.size;
                let v = items.get(k).cloned().unwrap_or_else(|| zero_value(desc));
                write_value(buf, desc.type_name, offset, &v)?;
            }
            Ok(())
        }
    }
}
