//! `Union`: members overlay byte offset 0 of the same window. Each member is compiled as an
//! independent single-field [`Struct`], reusing the struct compiler instead of duplicating
//! its single-field layout math.

use crate::error::{Error, Result};
use crate::schema::{is_dynamic_string, FieldDecl};
use crate::struct_codec::Struct;
use crate::value::{Fields, Value};

struct Member {
    name: String,
    schema: Struct,
}

/// Same public shape as `Struct`, but members overlay offset 0 rather than being laid out
/// consecutively; `size` is the widest member instead of the sum of all of them.
pub struct Union {
    members: Vec<Member>,
    size: usize,
}

impl Union {
    pub fn new(entries: Vec<(String, FieldDecl)>) -> Result<Self> {
        let mut members = Vec::with_capacity(entries.len());
        let mut size = 0usize;

        for (name, decl) in entries {
            if is_dynamic_string(&decl) {
                return Err(Error::schema(format!(
                    "union member '{name}' must be a fully static layout (no length prefix, no null terminator, no bare string shorthand)"
                )));
            }
            let schema = Struct::new(vec![(name.clone(), decl)])?;
            size = size.max(schema.size());
            members.push(Member { name, schema });
        }

        Ok(Union { members, size })
    }

    pub fn from_shorthand(entries: Vec<(impl Into<String>, &str)>) -> Result<Self> {
        let mut parsed = Vec::with_capacity(entries.len());
        for (name, token) in entries {
            parsed.push((name.into(), FieldDecl::parse(token)?));
        }
        Self::new(parsed)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Writes the first member present in `value` with a non-null value; every other byte
    /// in the returned buffer stays zero.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let source = value
            .as_struct()
            .ok_or_else(|| Error::type_mismatch("expected a struct value"))?;
        let mut buf = vec![0u8; self.size];

        for member in &self.members {
            match source.get(&member.name) {
                Some(v) if !v.is_null() => {
                    let mut single = Fields::new();
                    single.insert(member.name.clone(), v.clone());
                    let encoded = member.schema.encode(&Value::Struct(single))?;
                    buf[..encoded.len()].copy_from_slice(&encoded);
                    return Ok(buf);
                }
                _ => continue,
            }
        }
        Ok(buf)
    }

    /// Decodes every member independently from the same leading `size` window.
    pub fn decode(&self, buf: &[u8]) -> Result<Value> {
        if buf.len() < self.size {
            return Err(Error::range(format!(
                "buffer of length {} is shorter than union size {}",
                buf.len(),
                self.size
            )));
        }
        let mut fields = Fields::new();
        for member in &self.members {
            let window = &buf[..member.schema.size()];
            let decoded = member.schema.decode(window)?;
            let value = decoded
                .as_struct()
                .and_then(|f| f.get(&member.name))
                .cloned()
                .unwrap_or(Value::Null);
            fields.insert(member.name.clone(), value);
        }
        Ok(Value::Struct(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_union_has_zero_size() {
        let u = Union::new(vec![]).unwrap();
        assert_eq!(u.size(), 0);
        assert_eq!(u.encode(&Value::Struct(Fields::new())).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn rejects_bare_dynamic_string_member() {
        let err = Union::from_shorthand(vec![("s", "utf8")]).unwrap_err();
        assert_matches::assert_matches!(err, Error::Schema(_));
    }

    #[test]
    fn accepts_fixed_size_string_member() {
        let u = Union::from_shorthand(vec![("s", "utf8(8)")]).unwrap();
        assert_eq!(u.size(), 8);
    }

    #[test]
    fn first_defined_member_wins() {
        let u = Union::from_shorthand(vec![("a", "UInt32LE"), ("b", "UInt32LE")]).unwrap();

        let mut both = Fields::new();
        both.insert("a".to_string(), Value::Int(1));
        both.insert("b".to_string(), Value::Int(2));
        assert_eq!(u.encode(&Value::Struct(both)).unwrap(), vec![1, 0, 0, 0]);

        let mut only_b = Fields::new();
        only_b.insert("b".to_string(), Value::Int(99));
        assert_eq!(u.encode(&Value::Struct(only_b)).unwrap(), vec![99, 0, 0, 0]);

        let empty = Fields::new();
        assert_eq!(u.encode(&Value::Struct(empty)).unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn size_is_max_of_members() {
        let u = Union::from_shorthand(vec![("a", "UInt8"), ("b", "UInt32LE")]).unwrap();
        assert_eq!(u.size(), 4);
    }

    #[test]
    fn decode_reads_every_member_from_offset_zero() {
        let u = Union::from_shorthand(vec![("a", "UInt8"), ("b", "UInt16LE")]).unwrap();
        let decoded = u.decode(&[0x34, 0x12]).unwrap();
        let fields = decoded.as_struct().unwrap();
        assert_eq!(fields.get("a"), Some(&Value::Int(0x34)));
        assert_eq!(fields.get("b"), Some(&Value::Int(0x1234)));
    }
}
