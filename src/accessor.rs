//! Random-access typed reads/writes into a byte slice at an explicit offset.
//!
//! Every `PrimitiveType` encodes both a width and an endianness; this module is the only
//! place that calls into `byteorder`, so the rest of the crate dispatches on `PrimitiveType`
//! without ever touching raw byte order itself.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::registry::PrimitiveType;
use crate::value::Value;

fn need(buf: &[u8], offset: usize, len: usize, what: &str) -> Result<()> {
    if offset + len > buf.len() {
        return Err(Error::range(format!(
            "buffer too short to {what} at offset {offset} (need {len} bytes, have {})",
            buf.len().saturating_sub(offset)
        )));
    }
    Ok(())
}

/// Reads the host word for a bitfield as an unsigned integer, widened to `u64`.
pub(crate) fn read_unsigned(buf: &[u8], ty: PrimitiveType, offset: usize) -> Result<u64> {
    let w = ty.width_bytes();
    need(buf, offset, w, "read")?;
    let slice = &buf[offset..offset + w];
    let be = ty.is_big_endian();
    let v = match w {
        1 => slice[0] as u64,
        2 => {
            if be {
                BigEndian::read_u16(slice) as u64
            } else {
                LittleEndian::read_u16(slice) as u64
            }
        }
        4 => {
            if be {
                BigEndian::read_u32(slice) as u64
            } else {
                LittleEndian::read_u32(slice) as u64
            }
        }
        8 => {
            if be {
                BigEndian::read_u64(slice)
            } else {
                LittleEndian::read_u64(slice)
            }
        }
        _ => unreachable!("primitive widths are 1, 2, 4 or 8 bytes"),
    };
    Ok(v)
}

pub(crate) fn write_unsigned(buf: &mut [u8], ty: PrimitiveType, offset: usize, value: u64) -> Result<()> {
    let w = ty.width_bytes();
    need(buf, offset, w, "write")?;
    let slice = &mut buf[offset..offset + w];
    let be = ty.is_big_endian();
    match w {
        1 => slice[0] = value as u8,
        2 => {
            if be {
                BigEndian::write_u16(slice, value as u16)
            } else {
                LittleEndian::write_u16(slice, value as u16)
            }
        }
        4 => {
            if be {
                BigEndian::write_u32(slice, value as u32)
            } else {
                LittleEndian::write_u32(slice, value as u32)
            }
        }
        8 => {
            if be {
                BigEndian::write_u64(slice, value)
            } else {
                LittleEndian::write_u64(slice, value)
            }
        }
        _ => unreachable!("primitive widths are 1, 2, 4 or 8 bytes"),
    }
    Ok(())
}

/// Reads a single primitive at `offset` into a `Value`, applying the number/big-integer/float
/// classification from the registry.
pub(crate) fn read_value(buf: &[u8], ty: PrimitiveType, offset: usize) -> Result<Value> {
    let w = ty.width_bytes();
    need(buf, offset, w, "read")?;
    let slice = &buf[offset..offset + w];
    let be = ty.is_big_endian();

    if ty.is_float() {
        let f = match w {
            4 => {
                if be {
                    BigEndian::read_f32(slice) as f64
                } else {
                    LittleEndian::read_f32(slice) as f64
                }
            }
            8 => {
                if be {
                    BigEndian::read_f64(slice)
                } else {
                    LittleEndian::read_f64(slice)
                }
            }
            _ => unreachable!("float widths are 4 or 8 bytes"),
        };
        return Ok(Value::Float(f));
    }

    if ty.is_big_int_typed() {
        let raw = if be { BigEndian::read_u64(slice) } else { LittleEndian::read_u64(slice) };
        let v = if ty.is_signed() { raw as i64 as i128 } else { raw as i128 };
        return Ok(Value::Big(v));
    }

    let raw = read_unsigned(buf, ty, offset)?;
    let signed = if ty.is_signed() {
        match w {
            1 => raw as u8 as i8 as i64,
            2 => raw as u16 as i16 as i64,
            4 => raw as u32 as i32 as i64,
            _ => unreachable!("non-bigint signed widths are 1, 2 or 4 bytes"),
        }
    } else {
        raw as i64
    };
    Ok(Value::Int(signed))
}

/// Writes `value` as `ty` at `offset`, range-checking plain (non-bigint) integers.
pub(crate) fn write_value(buf: &mut [u8], ty: PrimitiveType, offset: usize, value: &Value) -> Result<()> {
    let w = ty.width_bytes();
    need(buf, offset, w, "write")?;

    if ty.is_float() {
        let f = value
            .as_float()
            .or_else(|| value.as_int().map(|i| i as f64))
            .ok_or_else(|| Error::type_mismatch(format!("expected a float value for {ty:?}")))?;
        let slice = &mut buf[offset..offset + w];
        let be = ty.is_big_endian();
        match w {
            4 => {
                if be {
                    BigEndian::write_f32(slice, f as f32)
                } else {
                    LittleEndian::write_f32(slice, f as f32)
                }
            }
            8 => {
                if be {
                    BigEndian::write_f64(slice, f)
                } else {
                    LittleEndian::write_f64(slice, f)
                }
            }
            _ => unreachable!("float widths are 4 or 8 bytes"),
        }
        return Ok(());
    }

    if ty.is_big_int_typed() {
        let big = value
            .as_big()
            .ok_or_else(|| Error::type_mismatch(format!("expected a big-integer value for {ty:?}")))?;
        if ty.is_signed() {
            if big < i64::MIN as i128 || big > i64::MAX as i128 {
                return Err(Error::range(format!(
                    "value {big} out of range [{}, {}] for {ty:?}",
                    i64::MIN,
                    i64::MAX
                )));
            }
        } else if big < 0 || big > u64::MAX as i128 {
            return Err(Error::range(format!(
                "value {big} out of range [0, {}] for {ty:?}",
                u64::MAX
            )));
        }
        return write_unsigned(buf, ty, offset, big as u64);
    }

    let i = value
        .as_int()
        .ok_or_else(|| Error::type_mismatch(format!("expected a number value for {ty:?}, not a big-integer")))?;

    let raw = if ty.is_signed() {
        let (lo, hi): (i64, i64) = match w {
            1 => (i8::MIN as i64, i8::MAX as i64),
            2 => (i16::MIN as i64, i16::MAX as i64),
            4 => (i32::MIN as i64, i32::MAX as i64),
            _ => unreachable!(),
        };
        if i < lo || i > hi {
            return Err(Error::range(format!("value {i} out of range [{lo}, {hi}] for {ty:?}")));
        }
        i as u64 & mask_for_width(w)
    } else {
        let hi: i64 = match w {
            1 => u8::MAX as i64,
            2 => u16::MAX as i64,
            4 => u32::MAX as i64,
            _ => unreachable!(),
        };
        if i < 0 || i > hi {
            return Err(Error::range(format!("value {i} out of range [0, {hi}] for {ty:?}")));
        }
        i as u64
    };
    write_unsigned(buf, ty, offset, raw)
}

fn mask_for_width(bytes: usize) -> u64 {
    match bytes {
        1 => 0xFF,
        2 => 0xFFFF,
        4 => 0xFFFF_FFFF,
        _ => u64::MAX,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_little_and_big_endian() {
        let mut buf = [0u8; 4];
        write_value(&mut buf, PrimitiveType::Int32BE, 0, &Value::Int(16909060)).unwrap();
        assert_eq!(buf, [0x01, 0x02, 0x03, 0x04]);
        assert_eq!(read_value(&buf, PrimitiveType::Int32BE, 0).unwrap(), Value::Int(16909060));
    }

    #[test]
    fn rejects_out_of_range() {
        let mut buf = [0u8; 1];
        let err = write_value(&mut buf, PrimitiveType::UInt8, 0, &Value::Int(300)).unwrap_err();
        assert_matches::assert_matches!(err, Error::Range(_));
    }

    #[test]
    fn big_int_round_trip() {
        let mut buf = [0u8; 8];
        write_value(&mut buf, PrimitiveType::UInt64LE, 0, &Value::Big(u64::MAX as i128)).unwrap();
        assert_eq!(read_value(&buf, PrimitiveType::UInt64LE, 0).unwrap(), Value::Big(u64::MAX as i128));
    }

    #[test]
    fn rejects_bigint_for_plain_field() {
        let mut buf = [0u8; 4];
        let err = write_value(&mut buf, PrimitiveType::UInt32LE, 0, &Value::Big(5)).unwrap_err();
        assert_matches::assert_matches!(err, Error::TypeMismatch(_));
    }
}
