//! Bit-slice extraction/insertion inside a host integer read via the buffer accessor.

use crate::accessor::{read_unsigned, write_unsigned};
use crate::error::{Error, Result};
use crate::registry::PrimitiveType;
use crate::schema::BitfieldDescriptor;
use crate::value::Value;

/// `mask_table[n]` is `(1u32 << n) - 1`, precomputed so extraction/insertion never recomputes
/// the shift at call time. Index 32 holds `u32::MAX`.
const MASK_TABLE: [u32; 33] = build_mask_table();

const fn build_mask_table() -> [u32; 33] {
    let mut table = [0u32; 33];
    let mut i = 0;
    while i < 33 {
        table[i] = if i == 32 { u32::MAX } else { (1u32 << i) - 1 };
        i += 1;
    }
    table
}

fn validate(desc: &BitfieldDescriptor, op: &str) -> Result<()> {
    let host_bits = desc.host_type.width_bits();
    if host_bits > 32 {
        return Err(Error::unsupported(format!("{:?} is not supported yet", desc.host_type)));
    }
    if desc.bit_size == 0 || desc.bit_position + desc.bit_size > host_bits {
        return Err(Error::schema(format!(
            "bitfield {bit_position}..{end} out of bounds for {host_bits}-bit host, for {op} operation",
            bit_position = desc.bit_position,
            end = desc.bit_position + desc.bit_size
        )));
    }
    Ok(())
}

pub(crate) fn decode(desc: &BitfieldDescriptor, buf: &[u8]) -> Result<Value> {
    validate(desc, "read")?;
    let host = read_unsigned(buf, desc.host_type, desc.position)? as u32;
    let mask = MASK_TABLE[desc.bit_size as usize];
    let raw = (host >> desc.bit_position) & mask;

    let value = if desc.signed && (raw & (1 << (desc.bit_size - 1))) != 0 {
        // sign-extend from bit_size bits to the full i64 working width
        let extended = raw | !mask;
        extended as i32 as i64
    } else {
        raw as i64
    };
    Ok(Value::Int(value))
}

pub(crate) fn encode(desc: &BitfieldDescriptor, buf: &mut [u8], value: &Value) -> Result<()> {
    validate(desc, "write")?;
    let v = value
        .as_int()
        .ok_or_else(|| Error::type_mismatch("expected a number value for a bitfield"))?;

    let (lo, hi) = if desc.signed {
        let half = 1i64 << (desc.bit_size - 1);
        (-half, half - 1)
    } else {
        (0, (1i64 << desc.bit_size) - 1)
    };
    if v < lo || v > hi {
        return Err(Error::range(format!(
            "value {v} out of range [{lo}, {hi}] for {}-bit field",
            desc.bit_size
        )));
    }

    let mask = MASK_TABLE[desc.bit_size as usize];
    let reduced = (v as i32 as u32) & mask;

    let host = read_unsigned(buf, desc.host_type, desc.position)? as u32;
    let cleared = host & !(mask << desc.bit_position);
    let updated = cleared | (reduced << desc.bit_position);
    write_unsigned(buf, desc.host_type, desc.position, updated as u64)
}

pub(crate) fn host_type_of(name: &str) -> Result<PrimitiveType> {
    let ty = PrimitiveType::parse(name)?;
    if ty.is_float() {
        return Err(Error::schema(format!("{name} cannot be used as a bitfield host")));
    }
    Ok(ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PrimitiveType;

    fn desc(host: PrimitiveType, position: usize, bit_position: u32, bit_size: u32, signed: bool) -> BitfieldDescriptor {
        BitfieldDescriptor {
            host_type: host,
            position,
            bit_position,
            bit_size,
            signed,
        }
    }

    #[test]
    fn packs_two_fields_into_one_byte() {
        let a = desc(PrimitiveType::UInt8, 0, 0, 3, false);
        let b = desc(PrimitiveType::UInt8, 0, 3, 5, false);
        let mut buf = [0u8; 1];
        encode(&a, &mut buf, &Value::Int(5)).unwrap();
        encode(&b, &mut buf, &Value::Int(17)).unwrap();
        assert_eq!(buf[0], 0b10001_101);
        assert_eq!(decode(&a, &buf).unwrap(), Value::Int(5));
        assert_eq!(decode(&b, &buf).unwrap(), Value::Int(17));
    }

    #[test]
    fn sign_extends_negative_value() {
        let f = desc(PrimitiveType::Int8, 0, 0, 4, true);
        let buf = [0b0000_1100u8];
        assert_eq!(decode(&f, &buf).unwrap(), Value::Int(-4));

        let mut out = [0u8; 1];
        encode(&f, &mut out, &Value::Int(-4)).unwrap();
        assert_eq!(out[0], 0b0000_1100);
    }

    #[test]
    fn rejects_out_of_range_signed_value() {
        let f = desc(PrimitiveType::Int8, 0, 0, 4, true);
        let mut buf = [0u8; 1];
        let err = encode(&f, &mut buf, &Value::Int(8)).unwrap_err();
        assert_matches::assert_matches!(err, Error::Range(_));
    }

    #[test]
    fn rejects_host_wider_than_32_bits() {
        let f = desc(PrimitiveType::UInt64LE, 0, 0, 4, false);
        let buf = [0u8; 8];
        let err = decode(&f, &buf).unwrap_err();
        assert_matches::assert_matches!(err, Error::Unsupported(_));
    }
}
