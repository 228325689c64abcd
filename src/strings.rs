//! Fixed-size, length-prefixed and null-terminated string variants, plus arrays of each.

use crate::accessor::{read_unsigned, write_unsigned};
use crate::dynamic::replace_region;
use crate::error::{Error, Result};
use crate::schema::{StringDescriptor, StringEncoding, StringLayout};
use crate::value::Value;

fn transcode(encoding: StringEncoding, s: &str) -> Result<Vec<u8>> {
    match encoding {
        StringEncoding::Utf8 => Ok(s.as_bytes().to_vec()),
        StringEncoding::Ascii => {
            if !s.is_ascii() {
                return Err(Error::type_mismatch(format!("'{s}' is not valid ASCII")));
            }
            Ok(s.as_bytes().to_vec())
        }
    }
}

fn untranscode(encoding: StringEncoding, bytes: &[u8]) -> Result<String> {
    match encoding {
        StringEncoding::Utf8 => {
            String::from_utf8(bytes.to_vec()).map_err(|e| Error::type_mismatch(format!("invalid utf8: {e}")))
        }
        StringEncoding::Ascii => Ok(bytes.iter().map(|&b| b as char).collect()),
    }
}

/// Static byte footprint of one element's fixed slot (not counting spliced dynamic payload).
fn static_stride(layout: &StringLayout) -> usize {
    match layout {
        StringLayout::Fixed { size } => *size,
        StringLayout::LengthPrefixed { prefix_bytes, .. } => *prefix_bytes,
        StringLayout::NullTerminated { .. } => 0,
    }
}

fn value_at(value: &Value, k: usize, scalar: bool) -> Option<&Value> {
    if scalar {
        Some(value)
    } else {
        match value {
            Value::Array(items) => items.get(k),
            _ if k == 0 => Some(value),
            _ => None,
        }
    }
}

pub(crate) fn encode(desc: &StringDescriptor, buf: &mut Vec<u8>, dynamic_offset: &mut usize, value: &Value) -> Result<()> {
    let scalar = matches!(desc.array_size, None | Some(0));
    let count = desc.array_size.filter(|_| !scalar).unwrap_or(1).max(1) as usize;
    let stride = static_stride(&desc.layout);

    for k in 0..count {
        let element = value_at(value, k, scalar).cloned().unwrap_or_else(|| Value::Str(String::new()));
        let text = element.as_str().map(str::to_owned).unwrap_or_default();
        let position = desc.position + *dynamic_offset + k * stride;

        match &desc.layout {
            StringLayout::Fixed { size } => {
                let bytes = transcode(desc.encoding, &text)?;
                let mut slot = vec![0u8; *size];
                let n = bytes.len().min(*size);
                slot[..n].copy_from_slice(&bytes[..n]);
                if position + size > buf.len() {
                    return Err(Error::range("buffer too short to write fixed-size string field"));
                }
                buf[position..position + size].copy_from_slice(&slot);
            }
            StringLayout::LengthPrefixed { length_type, prefix_bytes } => {
                let bytes = transcode(desc.encoding, &text)?;
                write_unsigned(buf, *length_type, position, bytes.len() as u64)?;
                replace_region(buf, position + prefix_bytes, 0, &bytes);
                *dynamic_offset += bytes.len();
            }
            StringLayout::NullTerminated { .. } => {
                let mut bytes = transcode(desc.encoding, &text)?;
                if bytes.last() != Some(&0) {
                    bytes.push(0);
                }
                replace_region(buf, position, 0, &bytes);
                *dynamic_offset += bytes.len();
            }
        }
    }
    Ok(())
}

pub(crate) fn decode(desc: &StringDescriptor, buf: &[u8], dynamic_offset: &mut usize) -> Result<Value> {
    let scalar = matches!(desc.array_size, None | Some(0));
    let count = desc.array_size.filter(|_| !scalar).unwrap_or(1).max(1) as usize;
    let stride = static_stride(&desc.layout);

    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        let position = desc.position + *dynamic_offset + values.len() * stride;
        let value = decode_one(desc, buf, position, dynamic_offset)?;
        values.push(value);
    }

    if scalar {
        Ok(values.into_iter().next().unwrap())
    } else {
        Ok(Value::Array(values))
    }
}

fn decode_one(desc: &StringDescriptor, buf: &[u8], position: usize, dynamic_offset: &mut usize) -> Result<Value> {
    match &desc.layout {
        StringLayout::Fixed { size } => {
            if position + size > buf.len() {
                return Err(Error::range("buffer too short for fixed-size string field"));
            }
            let s = untranscode(desc.encoding, &buf[position..position + size])?;
            Ok(Value::Str(s))
        }
        StringLayout::LengthPrefixed { length_type, prefix_bytes } => {
            let len = read_unsigned(buf, *length_type, position)? as usize;
            let payload_start = position + prefix_bytes;
            if payload_start + len > buf.len() {
                return Err(Error::range(format!(
                    "length-prefixed string announces {len} bytes past end of buffer (len {})",
                    buf.len()
                )));
            }
            let s = untranscode(desc.encoding, &buf[payload_start..payload_start + len])?;
            *dynamic_offset += len;
            Ok(Value::Str(s))
        }
        StringLayout::NullTerminated { max_length } => {
            let mut i = position;
            loop {
                if let Some(max) = max_length {
                    if i - position >= *max {
                        return Err(Error::range(format!(
                            "null-terminated string exceeded maxLength {max} without a terminator"
                        )));
                    }
                }
                if i >= buf.len() {
                    return Err(Error::range("null-terminated string missing terminator before end of buffer"));
                }
                if buf[i] == 0 {
                    break;
                }
                i += 1;
            }
            let s = untranscode(desc.encoding, &buf[position..i])?;
            *dynamic_offset += i - position + 1;
            Ok(Value::Str(s))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PrimitiveType;

    fn fixed_desc() -> StringDescriptor {
        StringDescriptor {
            encoding: StringEncoding::Utf8,
            layout: StringLayout::Fixed { size: 10 },
            array_size: None,
            position: 0,
        }
    }

    #[test]
    fn fixed_size_pads_with_zero_and_returns_verbatim() {
        let desc = fixed_desc();
        let mut buf = vec![0u8; 10];
        let mut offset = 0;
        encode(&desc, &mut buf, &mut offset, &Value::Str("Hi".to_string())).unwrap();
        assert_eq!(&buf, b"Hi\0\0\0\0\0\0\0\0");

        let mut offset = 0;
        let decoded = decode(&desc, &buf, &mut offset).unwrap();
        assert_eq!(decoded, Value::Str("Hi\0\0\0\0\0\0\0\0".to_string()));
    }

    #[test]
    fn length_prefixed_round_trip() {
        let desc = StringDescriptor {
            encoding: StringEncoding::Utf8,
            layout: StringLayout::LengthPrefixed { length_type: PrimitiveType::UInt16LE, prefix_bytes: 2 },
            array_size: None,
            position: 0,
        };
        let mut buf = vec![0u8; 2];
        let mut offset = 0;
        encode(&desc, &mut buf, &mut offset, &Value::Str("Hello, World!".to_string())).unwrap();
        assert_eq!(offset, 13);
        assert_eq!(&buf[0..2], &[13, 0]);
        assert_eq!(&buf[2..], b"Hello, World!");

        let mut offset = 0;
        let decoded = decode(&desc, &buf, &mut offset).unwrap();
        assert_eq!(decoded, Value::Str("Hello, World!".to_string()));
        assert_eq!(offset, 13);
    }

    #[test]
    fn null_terminated_round_trip_with_fallback() {
        let desc = StringDescriptor {
            encoding: StringEncoding::Utf8,
            layout: StringLayout::NullTerminated { max_length: None },
            array_size: None,
            position: 0,
        };
        let mut buf = vec![];
        let mut offset = 0;
        encode(&desc, &mut buf, &mut offset, &Value::Str("Test".to_string())).unwrap();
        assert_eq!(buf, b"Test\0");
        assert_eq!(offset, 5);

        let mut offset = 0;
        let decoded = decode(&desc, &buf, &mut offset).unwrap();
        assert_eq!(decoded, Value::Str("Test".to_string()));
        assert_eq!(offset, 5);
    }

    #[test]
    fn null_terminated_overrun_fails() {
        let desc = StringDescriptor {
            encoding: StringEncoding::Utf8,
            layout: StringLayout::NullTerminated { max_length: Some(5) },
            array_size: None,
            position: 0,
        };
        let buf = vec![b'a'; 6];
        let mut offset = 0;
        let err = decode(&desc, &buf, &mut offset).unwrap_err();
        assert_matches::assert_matches!(err, Error::Range(_));
    }
}
