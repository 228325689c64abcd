//! The `Struct` facade: compiles a field list into a [`schema::CompiledSchema`] once, then
//! encodes/decodes values against it any number of times.

use crate::error::{Error, Result};
use crate::schema::{self, CompiledSchema, Descriptor, FieldDecl};
use crate::value::{Fields, Value};
use crate::{bitfield, nested, primitive, strings};

/// A compiled struct schema: an ordered list of fields with their byte/bit layout resolved.
#[derive(Debug)]
pub struct Struct {
    compiled: CompiledSchema,
}

/// Shifts a descriptor's static position by `delta`, used to place a field at its actual
/// offset within the enclosing buffer (struct base plus bytes consumed by dynamic fields
/// that preceded it).
fn shifted(descriptor: &Descriptor, delta: usize) -> Descriptor {
    match descriptor {
        Descriptor::Primitive(d) => {
            let mut d = d.clone();
            d.position += delta;
            Descriptor::Primitive(d)
        }
        Descriptor::Bitfield(d) => {
            let mut d = *d;
            d.position += delta;
            Descriptor::Bitfield(d)
        }
        Descriptor::StringField(d) => {
            let mut d = d.clone();
            d.position += delta;
            Descriptor::StringField(d)
        }
        Descriptor::Nested(d) => {
            let mut d = d.clone();
            d.position += delta;
            Descriptor::Nested(d)
        }
    }
}

impl Struct {
    /// Compiles a field list (name, declaration) into layout order, applying the bitfield
    /// accumulator and computing each field's static byte position.
    pub fn new(entries: Vec<(String, FieldDecl)>) -> Result<Self> {
        Ok(Struct { compiled: schema::compile(entries)? })
    }

    /// Convenience constructor taking the shorthand notation for every field
    /// (`[("flags", "UInt8:3"), ("name", "utf8(16)")]`).
    pub fn from_shorthand(entries: Vec<(impl Into<String>, &str)>) -> Result<Self> {
        let mut parsed = Vec::with_capacity(entries.len());
        for (name, token) in entries {
            parsed.push((name.into(), FieldDecl::parse(token)?));
        }
        Self::new(parsed)
    }

    /// Nominal (static) byte size: the size before any dynamic string/nested growth.
    pub fn size(&self) -> usize {
        self.compiled.size
    }

    pub fn decode(&self, buf: &[u8]) -> Result<Value> {
        self.decode_with_sink(buf, None)
    }

    /// Like [`Self::decode`], but additionally invokes `sink` with the total number of
    /// bytes consumed (static size plus any dynamic string/nested growth).
    pub fn decode_with_sink(&self, buf: &[u8], sink: Option<&mut dyn FnMut(usize)>) -> Result<Value> {
        if buf.len() < self.size() {
            return Err(Error::range(format!(
                "buffer of length {} is shorter than struct size {}",
                buf.len(),
                self.size()
            )));
        }
        let (value, consumed) = self.decode_at(buf, 0)?;
        if let Some(sink) = sink {
            sink(consumed);
        }
        Ok(value)
    }

    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        self.encode_standalone(value)
    }

    /// Decodes a struct value whose fields begin at absolute offset `base` within `buf`.
    /// Returns the value plus the total number of bytes consumed, including any dynamic
    /// growth past the nominal size, used by the nested-struct codec to know how far to
    /// advance the enclosing accumulator.
    pub(crate) fn decode_at(&self, buf: &[u8], base: usize) -> Result<(Value, usize)> {
        let mut fields = Fields::new();
        let mut dynamic_offset = 0usize;

        for field in &self.compiled.fields {
            let value = match &field.descriptor {
                Descriptor::Primitive(_) => {
                    let d = shifted(&field.descriptor, base + dynamic_offset);
                    primitive::decode(as_primitive(&d), buf)?
                }
                Descriptor::Bitfield(_) => {
                    let d = shifted(&field.descriptor, base + dynamic_offset);
                    bitfield::decode(as_bitfield(&d), buf)?
                }
                Descriptor::StringField(_) => {
                    let d = shifted(&field.descriptor, base);
                    strings::decode(as_string(&d), buf, &mut dynamic_offset)?
                }
                Descriptor::Nested(_) => {
                    let d = shifted(&field.descriptor, base);
                    nested::decode(as_nested(&d), buf, &mut dynamic_offset)?
                }
            };
            fields.insert(field.name.clone(), value);
        }

        let consumed = self.size() + dynamic_offset;
        Ok((Value::Struct(fields), consumed))
    }

    /// Encodes a struct value into a freshly allocated buffer sized to the nominal layout,
    /// growing it in place for any dynamic fields.
    pub(crate) fn encode_standalone(&self, value: &Value) -> Result<Vec<u8>> {
        let source = value
            .as_struct()
            .ok_or_else(|| Error::type_mismatch("expected a struct value"))?;
        let mut buf = vec![0u8; self.size()];
        let mut dynamic_offset = 0usize;

        for field in &self.compiled.fields {
            let field_value = source.get(&field.name).cloned().unwrap_or(Value::Null);

            match &field.descriptor {
                Descriptor::Primitive(_) => {
                    let shifted = shifted(&field.descriptor, dynamic_offset);
                    primitive::encode(as_primitive(&shifted), &mut buf, &field_value)?;
                }
                Descriptor::Bitfield(_) => {
                    let shifted = shifted(&field.descriptor, dynamic_offset);
                    bitfield::encode(as_bitfield(&shifted), &mut buf, &field_value)?;
                }
                Descriptor::StringField(_) => {
                    strings::encode(as_string(&field.descriptor), &mut buf, &mut dynamic_offset, &field_value)?;
                }
                Descriptor::Nested(_) => {
                    nested::encode(as_nested(&field.descriptor), &mut buf, &mut dynamic_offset, &field_value)?;
                }
            }
        }
        Ok(buf)
    }
}

fn as_primitive(d: &Descriptor) -> &schema::PrimitiveDescriptor {
    match d {
        Descriptor::Primitive(p) => p,
        _ => unreachable!("descriptor kind checked by caller"),
    }
}

fn as_bitfield(d: &Descriptor) -> &schema::BitfieldDescriptor {
    match d {
        Descriptor::Bitfield(b) => b,
        _ => unreachable!("descriptor kind checked by caller"),
    }
}

fn as_string(d: &Descriptor) -> &schema::StringDescriptor {
    match d {
        Descriptor::StringField(s) => s,
        _ => unreachable!("descriptor kind checked by caller"),
    }
}

fn as_nested(d: &Descriptor) -> &schema::NestedDescriptor {
    match d {
        Descriptor::Nested(n) => n,
        _ => unreachable!("descriptor kind checked by caller"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_mixed_fields() {
        let s = Struct::from_shorthand(vec![
            ("flags", "UInt8:3"),
            ("mode", "UInt8:5"),
            ("id", "UInt16LE"),
        ])
        .unwrap();

        let mut fields = Fields::new();
        fields.insert("flags".to_string(), Value::Int(5));
        fields.insert("mode".to_string(), Value::Int(17));
        fields.insert("id".to_string(), Value::Int(0xBEEF));

        let encoded = s.encode(&Value::Struct(fields)).unwrap();
        assert_eq!(encoded.len(), s.size());

        let decoded = s.decode(&encoded).unwrap();
        let back = decoded.as_struct().unwrap();
        assert_eq!(back.get("flags"), Some(&Value::Int(5)));
        assert_eq!(back.get("mode"), Some(&Value::Int(17)));
        assert_eq!(back.get("id"), Some(&Value::Int(0xBEEF)));
    }

    #[test]
    fn length_prefixed_string_followed_by_fixed_field_shifts_correctly() {
        let s = Struct::from_shorthand(vec![("name", "utf8"), ("age", "UInt8")]).unwrap();

        let mut fields = Fields::new();
        fields.insert("name".to_string(), Value::Str("Ferris".to_string()));
        fields.insert("age".to_string(), Value::Int(9));

        let encoded = s.encode(&Value::Struct(fields)).unwrap();
        let decoded = s.decode(&encoded).unwrap();
        let back = decoded.as_struct().unwrap();
        assert_eq!(back.get("name"), Some(&Value::Str("Ferris".to_string())));
        assert_eq!(back.get("age"), Some(&Value::Int(9)));
    }

    #[test]
    fn nested_struct_field_round_trips() {
        let inner = Struct::from_shorthand(vec![("x", "Int16LE"), ("y", "Int16LE")]).unwrap();
        let outer = Struct::new(vec![
            ("point".to_string(), FieldDecl::nested(inner)),
            ("tag".to_string(), FieldDecl::primitive("UInt8")),
        ])
        .unwrap();

        let mut point = Fields::new();
        point.insert("x".to_string(), Value::Int(-5));
        point.insert("y".to_string(), Value::Int(12));
        let mut outer_fields = Fields::new();
        outer_fields.insert("point".to_string(), Value::Struct(point));
        outer_fields.insert("tag".to_string(), Value::Int(7));

        let encoded = outer.encode(&Value::Struct(outer_fields)).unwrap();
        let decoded = outer.decode(&encoded).unwrap();
        let back = decoded.as_struct().unwrap();
        let point_back = back.get("point").unwrap().as_struct().unwrap();
        assert_eq!(point_back.get("x"), Some(&Value::Int(-5)));
        assert_eq!(point_back.get("y"), Some(&Value::Int(12)));
        assert_eq!(back.get("tag"), Some(&Value::Int(7)));
    }
}
