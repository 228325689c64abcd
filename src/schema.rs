//! Schema parsing, normalization and layout computation (the bitfield accumulator).

use std::sync::Arc;

use crate::bitfield;
use crate::error::{Error, Result};
use crate::registry::PrimitiveType;
use crate::struct_codec::Struct;

const MAX_ARRAY_SIZE: u64 = 1 << 53;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringEncoding {
    Utf8,
    Ascii,
}

impl StringEncoding {
    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "utf8" | "string" => Some(StringEncoding::Utf8),
            "ascii" => Some(StringEncoding::Ascii),
            _ => None,
        }
    }
}

/// Normalized shape of a string field, independent of which of the three input notations
/// (shorthand string, or descriptor object via the constructors below) produced it.
#[derive(Debug, Clone)]
pub enum StringSpec {
    Fixed { size: usize },
    LengthPrefixed { length_type: String },
    NullTerminated { max_length: Option<usize> },
}

#[derive(Debug, Clone)]
pub struct StringField {
    pub encoding: StringEncoding,
    pub spec: StringSpec,
    pub array_size: Option<u64>,
}

/// One schema entry before compilation. Construct these directly, or parse a shorthand
/// string with [`FieldDecl::parse`].
#[derive(Debug, Clone)]
pub enum FieldDecl {
    Primitive {
        type_name: String,
        array_size: Option<u64>,
    },
    Bitfield {
        host_type: String,
        bit_size: u32,
    },
    StringField(StringField),
    Nested {
        schema: Arc<Struct>,
        array_size: Option<u64>,
    },
}

impl FieldDecl {
    pub fn primitive(type_name: impl Into<String>) -> Self {
        FieldDecl::Primitive {
            type_name: type_name.into(),
            array_size: None,
        }
    }

    pub fn primitive_array(type_name: impl Into<String>, n: u64) -> Self {
        FieldDecl::Primitive {
            type_name: type_name.into(),
            array_size: Some(n),
        }
    }

    pub fn bitfield(host_type: impl Into<String>, bit_size: u32) -> Self {
        FieldDecl::Bitfield {
            host_type: host_type.into(),
            bit_size,
        }
    }

    pub fn string_fixed(encoding: StringEncoding, size: usize) -> Self {
        FieldDecl::StringField(StringField {
            encoding,
            spec: StringSpec::Fixed { size },
            array_size: None,
        })
    }

    pub fn string_length_prefixed(encoding: StringEncoding, length_type: impl Into<String>) -> Self {
        FieldDecl::StringField(StringField {
            encoding,
            spec: StringSpec::LengthPrefixed {
                length_type: length_type.into(),
            },
            array_size: None,
        })
    }

    pub fn string_null_terminated(encoding: StringEncoding, max_length: Option<usize>) -> Self {
        FieldDecl::StringField(StringField {
            encoding,
            spec: StringSpec::NullTerminated { max_length },
            array_size: None,
        })
    }

    pub fn nested(schema: Struct) -> Self {
        FieldDecl::Nested {
            schema: Arc::new(schema),
            array_size: None,
        }
    }

    pub fn nested_shared(schema: Arc<Struct>) -> Self {
        FieldDecl::Nested {
            schema,
            array_size: None,
        }
    }

    /// Attaches an array size to any declaration variant, mirroring the `[N]` shorthand
    /// suffix and the `arraySize` descriptor-object key.
    pub fn array(self, n: u64) -> Self {
        match self {
            FieldDecl::Primitive { type_name, .. } => FieldDecl::Primitive {
                type_name,
                array_size: Some(n),
            },
            FieldDecl::StringField(mut f) => {
                f.array_size = Some(n);
                FieldDecl::StringField(f)
            }
            FieldDecl::Nested { schema, .. } => FieldDecl::Nested {
                schema,
                array_size: Some(n),
            },
            other @ FieldDecl::Bitfield { .. } => other,
        }
    }

    /// Parses one of the shorthand notations: primitive (`"UInt16LE"`, `"Int32BE[8]"`),
    /// bitfield (`"UInt8:3"`), or string (`"utf8"`, `"ascii(8)"`, `"string[4]"`,
    /// `"utf8(10)[2]"`, case-insensitive encoding token).
    pub fn parse(token: &str) -> Result<Self> {
        if let Some(colon) = token.find(':') {
            let (host, bits) = token.split_at(colon);
            let bits: u32 = bits[1..]
                .parse()
                .map_err(|_| Error::schema(format!("malformed bitfield shorthand '{token}'")))?;
            return Ok(FieldDecl::bitfield(host, bits));
        }

        if let Some(spec) = parse_string_shorthand(token) {
            return spec;
        }

        let (base, array_size) = split_array_suffix(token)?;
        Ok(FieldDecl::Primitive {
            type_name: base.to_string(),
            array_size,
        })
    }
}

fn parse_string_shorthand(token: &str) -> Option<Result<FieldDecl>> {
    let (body, array_size) = match split_array_suffix(token) {
        Ok(v) => v,
        Err(e) => return Some(Err(e)),
    };

    let (enc_token, size) = if let Some(open) = body.find('(') {
        if !body.ends_with(')') {
            return None;
        }
        let enc = &body[..open];
        let digits = &body[open + 1..body.len() - 1];
        let n: usize = digits.parse().ok()?;
        (enc, Some(n))
    } else {
        (body, None)
    };

    let encoding = StringEncoding::parse(enc_token)?;
    let spec = match size {
        Some(n) => StringSpec::Fixed { size: n },
        None => StringSpec::LengthPrefixed {
            length_type: "UInt16LE".to_string(),
        },
    };
    Some(Ok(FieldDecl::StringField(StringField {
        encoding,
        spec,
        array_size,
    })))
}

fn split_array_suffix(token: &str) -> Result<(&str, Option<u64>)> {
    if let Some(open) = token.rfind('[') {
        if !token.ends_with(']') {
            return Err(Error::schema(format!("malformed array shorthand '{token}'")));
        }
        let base = &token[..open];
        let digits = &token[open + 1..token.len() - 1];
        let n: u64 = digits
            .parse()
            .map_err(|_| Error::schema(format!("malformed array size in '{token}'")))?;
        Ok((base, Some(n)))
    } else {
        Ok((token, None))
    }
}

// ---------------------------------------------------------------------------------------
// Compiled descriptors
// ---------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub(crate) struct PrimitiveDescriptor {
    pub type_name: PrimitiveType,
    pub size: usize,
    pub array_size: Option<u64>,
    pub position: usize,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct BitfieldDescriptor {
    pub host_type: PrimitiveType,
    pub position: usize,
    pub bit_position: u32,
    pub bit_size: u32,
    pub signed: bool,
}

#[derive(Debug, Clone)]
pub(crate) enum StringLayout {
    Fixed { size: usize },
    LengthPrefixed { length_type: PrimitiveType, prefix_bytes: usize },
    NullTerminated { max_length: Option<usize> },
}

#[derive(Debug, Clone)]
pub(crate) struct StringDescriptor {
    pub encoding: StringEncoding,
    pub layout: StringLayout,
    pub array_size: Option<u64>,
    pub position: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct NestedDescriptor {
    pub schema: Arc<Struct>,
    pub array_size: Option<u64>,
    pub position: usize,
}

#[derive(Debug, Clone)]
pub(crate) enum Descriptor {
    Primitive(PrimitiveDescriptor),
    Bitfield(BitfieldDescriptor),
    StringField(StringDescriptor),
    Nested(NestedDescriptor),
}

#[derive(Debug, Clone)]
pub(crate) struct Field {
    pub name: String,
    pub descriptor: Descriptor,
}

#[derive(Debug, Clone, Default)]
struct Accumulator {
    bytes: usize,
    bits: u32,
    host_bits: u32,
    host_type: Option<PrimitiveType>,
}

impl Accumulator {
    fn flush(&mut self) {
        if self.bits > 0 {
            self.bytes += (self.host_bits / 8) as usize;
            self.bits = 0;
            self.host_type = None;
            self.host_bits = 0;
        }
    }
}

#[derive(Debug)]
pub(crate) struct CompiledSchema {
    pub fields: Vec<Field>,
    pub size: usize,
}

fn array_count(array_size: Option<u64>) -> Result<u64> {
    match array_size {
        Some(n) if n >= MAX_ARRAY_SIZE => Err(Error::schema(format!("arraySize {n} is too large"))),
        Some(n) => Ok(n),
        None => Ok(1),
    }
}

pub(crate) fn compile(entries: Vec<(String, FieldDecl)>) -> Result<CompiledSchema> {
    let mut acc = Accumulator::default();
    let mut fields = Vec::with_capacity(entries.len());

    for (name, decl) in entries {
        match decl {
            FieldDecl::Bitfield { host_type, bit_size } => {
                let host = bitfield::host_type_of(&host_type)?;
                let h = host.width_bits();
                if h > 32 {
                    return Err(Error::unsupported(format!("{host_type} is not supported yet")));
                }
                if bit_size == 0 {
                    return Err(Error::schema(format!("field '{name}' has zero bit size")));
                }
                if bit_size > h {
                    return Err(Error::schema(format!(
                        "field '{name}' bit size {bit_size} exceeds host width {h}"
                    )));
                }

                let overflows = acc.bits + bit_size > acc.host_bits;
                let host_changed = acc.host_type.map(|t| t != host).unwrap_or(false);
                if acc.bits > 0 && (overflows || host_changed) {
                    acc.flush();
                }

                let position = acc.bytes;
                let bit_position = acc.bits;
                fields.push(Field {
                    name,
                    descriptor: Descriptor::Bitfield(BitfieldDescriptor {
                        host_type: host,
                        position,
                        bit_position,
                        bit_size,
                        signed: host.is_signed(),
                    }),
                });

                acc.bits += bit_size;
                acc.host_type = Some(host);
                acc.host_bits = h;
            }
            other => {
                acc.flush();
                let position = acc.bytes;
                let (descriptor, element_size, count) = compile_non_bitfield(&name, other)?;
                acc.bytes += element_size * count as usize;
                fields.push(Field { name, descriptor: descriptor_at(descriptor, position) });
            }
        }
    }

    acc.flush();
    Ok(CompiledSchema { fields, size: acc.bytes })
}

enum Placed {
    Primitive { type_name: PrimitiveType, size: usize, array_size: Option<u64> },
    StringField { encoding: StringEncoding, layout: StringLayout, size: usize, array_size: Option<u64> },
    Nested { schema: Arc<Struct>, size: usize, array_size: Option<u64> },
}

fn descriptor_at(placed: Placed, position: usize) -> Descriptor {
    match placed {
        Placed::Primitive { type_name, size, array_size } => Descriptor::Primitive(PrimitiveDescriptor {
            type_name,
            size,
            array_size,
            position,
        }),
        Placed::StringField { encoding, layout, array_size, .. } => Descriptor::StringField(StringDescriptor {
            encoding,
            layout,
            array_size,
            position,
        }),
        Placed::Nested { schema, array_size, .. } => Descriptor::Nested(NestedDescriptor {
            schema,
            array_size,
            position,
        }),
    }
}

fn compile_non_bitfield(name: &str, decl: FieldDecl) -> Result<(Placed, usize, u64)> {
    match decl {
        FieldDecl::Primitive { type_name, array_size } => {
            let ty = PrimitiveType::parse(&type_name)?;
            let count = array_count(array_size)?;
            let size = ty.width_bytes();
            Ok((Placed::Primitive { type_name: ty, size, array_size }, size, count))
        }
        FieldDecl::StringField(f) => {
            let count = array_count(f.array_size)?;
            let (layout, size) = match f.spec {
                StringSpec::Fixed { size } => (StringLayout::Fixed { size }, size),
                StringSpec::LengthPrefixed { length_type } => {
                    let lty = PrimitiveType::parse(&length_type)?;
                    if lty.is_big_int_typed() {
                        return Err(Error::unsupported(format!(
                            "field '{name}' cannot use a 64-bit length prefix ({length_type})"
                        )));
                    }
                    if !lty.is_integer() || lty.is_signed() {
                        return Err(Error::schema(format!(
                            "field '{name}' length prefix type must be an unsigned integer, got {length_type}"
                        )));
                    }
                    let bytes = lty.width_bytes();
                    (StringLayout::LengthPrefixed { length_type: lty, prefix_bytes: bytes }, bytes)
                }
                StringSpec::NullTerminated { max_length } => (StringLayout::NullTerminated { max_length }, 0),
            };
            Ok((
                Placed::StringField { encoding: f.encoding, layout, size, array_size: f.array_size },
                size,
                count,
            ))
        }
        FieldDecl::Nested { schema, array_size } => {
            let count = array_count(array_size)?;
            let size = schema.size();
            Ok((Placed::Nested { schema, size, array_size }, size, count))
        }
        FieldDecl::Bitfield { .. } => unreachable!("bitfields are handled by the caller"),
    }
}

/// Rejects schema entries that are not a fully static layout, used by `Union::new` to
/// enforce "no dynamic string members". This also covers the bare `utf8`/`ascii`/`string`
/// shorthand tokens, since those default to a length-prefixed (dynamic) layout.
pub(crate) fn is_dynamic_string(decl: &FieldDecl) -> bool {
    matches!(
        decl,
        FieldDecl::StringField(StringField {
            spec: StringSpec::LengthPrefixed { .. } | StringSpec::NullTerminated { .. },
            ..
        })
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_primitive_shorthand() {
        let decl = FieldDecl::parse("UInt16LE").unwrap();
        assert_matches::assert_matches!(decl, FieldDecl::Primitive { array_size: None, .. });

        let decl = FieldDecl::parse("Int32BE[8]").unwrap();
        assert_matches::assert_matches!(decl, FieldDecl::Primitive { array_size: Some(8), .. });
    }

    #[test]
    fn parses_bitfield_shorthand() {
        let decl = FieldDecl::parse("UInt8:3").unwrap();
        assert_matches::assert_matches!(decl, FieldDecl::Bitfield { bit_size: 3, .. });
    }

    #[test]
    fn parses_string_shorthand_variants() {
        assert_matches::assert_matches!(
            FieldDecl::parse("utf8").unwrap(),
            FieldDecl::StringField(StringField { spec: StringSpec::LengthPrefixed { .. }, .. })
        );
        assert_matches::assert_matches!(
            FieldDecl::parse("ascii(8)").unwrap(),
            FieldDecl::StringField(StringField { spec: StringSpec::Fixed { size: 8 }, .. })
        );
        assert_matches::assert_matches!(
            FieldDecl::parse("string[4]").unwrap(),
            FieldDecl::StringField(StringField { array_size: Some(4), .. })
        );
    }

    #[test]
    fn consecutive_bitfields_share_host() {
        let compiled = compile(vec![
            ("a".into(), FieldDecl::bitfield("UInt8", 3)),
            ("b".into(), FieldDecl::bitfield("UInt8", 5)),
        ])
        .unwrap();
        assert_eq!(compiled.size, 1);
    }

    #[test]
    fn non_bitfield_interrupts_packing() {
        let compiled = compile(vec![
            ("a".into(), FieldDecl::bitfield("UInt8", 4)),
            ("c".into(), FieldDecl::primitive("Int8")),
            ("b".into(), FieldDecl::bitfield("UInt8", 4)),
        ])
        .unwrap();
        assert_eq!(compiled.size, 3);
    }

    #[test]
    fn differing_host_size_flushes() {
        let compiled = compile(vec![
            ("a".into(), FieldDecl::bitfield("UInt8", 4)),
            ("b".into(), FieldDecl::bitfield("UInt16LE", 4)),
        ])
        .unwrap();
        assert_eq!(compiled.size, 3);
    }
}
