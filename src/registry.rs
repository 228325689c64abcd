//! Maps each primitive wire-type name to its width, signedness and endianness.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Int8,
    UInt8,
    Int16LE,
    Int16BE,
    UInt16LE,
    UInt16BE,
    Int32LE,
    Int32BE,
    UInt32LE,
    UInt32BE,
    Int64LE,
    Int64BE,
    UInt64LE,
    UInt64BE,
    FloatLE,
    FloatBE,
    DoubleLE,
    DoubleBE,
}

impl PrimitiveType {
    pub fn parse(name: &str) -> Result<Self> {
        use PrimitiveType::*;
        let ty = match name {
            "Int8" => Int8,
            "UInt8" => UInt8,
            "Int16LE" => Int16LE,
            "Int16BE" => Int16BE,
            "UInt16LE" => UInt16LE,
            "UInt16BE" => UInt16BE,
            "Int32LE" => Int32LE,
            "Int32BE" => Int32BE,
            "UInt32LE" => UInt32LE,
            "UInt32BE" => UInt32BE,
            "Int64LE" => Int64LE,
            "Int64BE" => Int64BE,
            "UInt64LE" => UInt64LE,
            "UInt64BE" => UInt64BE,
            "FloatLE" => FloatLE,
            "FloatBE" => FloatBE,
            "DoubleLE" => DoubleLE,
            "DoubleBE" => DoubleBE,
            other => return Err(Error::schema(format!("unknown primitive type '{other}'"))),
        };
        Ok(ty)
    }

    pub fn width_bits(self) -> u32 {
        use PrimitiveType::*;
        match self {
            Int8 | UInt8 => 8,
            Int16LE | Int16BE | UInt16LE | UInt16BE => 16,
            Int32LE | Int32BE | UInt32LE | UInt32BE | FloatLE | FloatBE => 32,
            Int64LE | Int64BE | UInt64LE | UInt64BE | DoubleLE | DoubleBE => 64,
        }
    }

    pub fn width_bytes(self) -> usize {
        self.width_bits() as usize / 8
    }

    pub fn is_signed(self) -> bool {
        use PrimitiveType::*;
        matches!(self, Int8 | Int16LE | Int16BE | Int32LE | Int32BE | Int64LE | Int64BE)
    }

    pub fn is_big_endian(self) -> bool {
        use PrimitiveType::*;
        matches!(
            self,
            Int16BE | UInt16BE | Int32BE | UInt32BE | Int64BE | UInt64BE | FloatBE | DoubleBE
        )
    }

    pub fn is_big_int_typed(self) -> bool {
        use PrimitiveType::*;
        matches!(self, Int64LE | Int64BE | UInt64LE | UInt64BE)
    }

    pub fn is_float(self) -> bool {
        use PrimitiveType::*;
        matches!(self, FloatLE | FloatBE | DoubleLE | DoubleBE)
    }

    /// True for integer types that may be used as a bitfield host (`is_float` is false
    /// and the width does not exceed 32 bits, enforced separately by the bitfield codec).
    pub fn is_integer(self) -> bool {
        !self.is_float()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_names() {
        assert_eq!(PrimitiveType::parse("UInt16LE").unwrap(), PrimitiveType::UInt16LE);
        assert!(PrimitiveType::parse("Nonsense").is_err());
    }

    #[test]
    fn width_and_signedness() {
        assert_eq!(PrimitiveType::Int32BE.width_bits(), 32);
        assert!(PrimitiveType::Int32BE.is_signed());
        assert!(!PrimitiveType::UInt32LE.is_signed());
        assert!(PrimitiveType::Int32BE.is_big_endian());
        assert!(!PrimitiveType::Int32LE.is_big_endian());
    }

    #[test]
    fn big_int_typed_only_64_bit() {
        assert!(PrimitiveType::UInt64LE.is_big_int_typed());
        assert!(!PrimitiveType::UInt32LE.is_big_int_typed());
    }

    #[test]
    fn float_classification() {
        assert!(PrimitiveType::DoubleBE.is_float());
        assert!(!PrimitiveType::Int64BE.is_float());
    }
}
