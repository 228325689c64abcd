//! Nested-struct field codec: delegates to the inner schema and propagates any dynamic
//! growth the inner struct produced back up to the enclosing accumulator.

use crate::dynamic::replace_region;
use crate::error::{Error, Result};
use crate::schema::NestedDescriptor;
use crate::value::{Fields, Value};

fn element_count(desc: &NestedDescriptor) -> usize {
    desc.array_size.filter(|&n| n > 0).unwrap_or(1) as usize
}

pub(crate) fn decode(desc: &NestedDescriptor, buf: &[u8], dynamic_offset: &mut usize) -> Result<Value> {
    let scalar = matches!(desc.array_size, None | Some(0));
    let count = element_count(desc);
    let nominal = desc.schema.size();

    let mut values = Vec::with_capacity(count);
    for k in 0..count {
        let position = desc.position + *dynamic_offset + k * nominal;
        let (value, consumed) = desc.schema.decode_at(buf, position)?;
        *dynamic_offset += consumed.saturating_sub(nominal);
        values.push(value);
    }

    if scalar {
        Ok(values.into_iter().next().unwrap())
    } else {
        Ok(Value::Array(values))
    }
}

pub(crate) fn encode(desc: &NestedDescriptor, buf: &mut Vec<u8>, dynamic_offset: &mut usize, value: &Value) -> Result<()> {
    let scalar = matches!(desc.array_size, None | Some(0));
    let count = element_count(desc);
    let nominal = desc.schema.size();

    let element_at = |k: usize| -> Result<Fields> {
        if scalar {
            match value {
                Value::Null => Ok(Fields::new()),
                v => v
                    .as_struct()
                    .cloned()
                    .ok_or_else(|| Error::type_mismatch("expected a struct value for a nested field")),
            }
        } else {
            match value {
                Value::Array(items) => Ok(items.get(k).and_then(Value::as_struct).cloned().unwrap_or_default()),
                _ => Err(Error::type_mismatch("expected an array of structs for a nested array field")),
            }
        }
    };

    for k in 0..count {
        let fields = element_at(k)?;
        let position = desc.position + *dynamic_offset + k * nominal;
        let encoded = desc.schema.encode_standalone(&Value::Struct(fields))?;

        if position + nominal > buf.len() {
            let pad = position + nominal - buf.len();
            buf.resize(buf.len() + pad, 0);
        }
        replace_region(buf, position, nominal, &encoded);
        *dynamic_offset += encoded.len().saturating_sub(nominal);
    }
    Ok(())
}
