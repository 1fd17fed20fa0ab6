use std::borrow::Cow;

use crate::error::{Result, SchematicError};

use super::shape::Shape;
use super::value::{Endian, NbtTag, NbtValue};

/// Mirror of the parser's path tracking.
enum PathPart {
    Key(String),
    Index(usize),
}

struct Writer {
    out: Vec<u8>,
    endian: Endian,
    path: Vec<PathPart>,
}

/// Serialize `value` as one unnamed root compound under `shape`.
///
/// Compound keys are written sorted alphabetically, unconditionally; the
/// on-disk tag byte of every field comes from the shape, never from the
/// runtime value.
pub(crate) fn serialize(value: &NbtValue<'_>, shape: &Shape, endian: Endian) -> Result<Vec<u8>> {
    let mut writer = Writer {
        out: Vec::new(),
        endian,
        path: Vec::new(),
    };

    if value.tag() != NbtTag::Compound {
        return Err(SchematicError::TypeMismatch {
            path: writer.render_path(),
            expected: NbtTag::Compound.name(),
            found: value.tag().name(),
        });
    }
    if shape.serialized_tag() != Some(NbtTag::Compound) {
        return Err(writer.unserializable());
    }

    writer.put_u8(NbtTag::Compound.to_u8());
    writer.put_str("")?;
    writer.write_compound(value, shape)?;
    Ok(writer.out)
}

impl Writer {
    fn render_path(&self) -> String {
        let mut out = String::new();
        for part in &self.path {
            match part {
                PathPart::Key(key) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(key);
                }
                PathPart::Index(index) => {
                    out.push('[');
                    out.push_str(&index.to_string());
                    out.push(']');
                }
            }
        }
        if out.is_empty() {
            out.push_str("(root)");
        }
        out
    }

    fn unserializable(&self) -> SchematicError {
        SchematicError::Unserializable {
            path: self.render_path(),
        }
    }

    fn mismatch(&self, expected: &'static str, found: &'static str) -> SchematicError {
        SchematicError::TypeMismatch {
            path: self.render_path(),
            expected,
            found,
        }
    }

    fn put_u8(&mut self, v: u8) {
        self.out.push(v);
    }

    fn put_i16(&mut self, v: i16) {
        match self.endian {
            Endian::Big => self.out.extend_from_slice(&v.to_be_bytes()),
            Endian::Little => self.out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn put_u16(&mut self, v: u16) {
        match self.endian {
            Endian::Big => self.out.extend_from_slice(&v.to_be_bytes()),
            Endian::Little => self.out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn put_i32(&mut self, v: i32) {
        match self.endian {
            Endian::Big => self.out.extend_from_slice(&v.to_be_bytes()),
            Endian::Little => self.out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn put_i64(&mut self, v: i64) {
        match self.endian {
            Endian::Big => self.out.extend_from_slice(&v.to_be_bytes()),
            Endian::Little => self.out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    fn put_str(&mut self, s: &str) -> Result<()> {
        let len = u16::try_from(s.len()).map_err(|_| SchematicError::StringTooLong {
            path: self.render_path(),
        })?;
        self.put_u16(len);
        self.out.extend_from_slice(s.as_bytes());
        Ok(())
    }

    fn write_compound(&mut self, value: &NbtValue<'_>, shape: &Shape) -> Result<()> {
        let entries = value
            .entries()
            .ok_or_else(|| self.mismatch("Compound", value.tag().name()))?;

        let mut sorted: Vec<&(Cow<'_, str>, NbtValue<'_>)> = entries.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, field_value) in sorted {
            self.path.push(PathPart::Key(name.to_string()));
            let field_shape = shape
                .field(name)
                .cloned()
                .ok_or_else(|| self.unserializable())?;
            let tag = field_shape
                .serialized_tag()
                .ok_or_else(|| self.unserializable())?;
            self.path.pop();

            self.put_u8(tag.to_u8());
            self.put_str(name)?;
            self.path.push(PathPart::Key(name.to_string()));
            self.write_payload(field_value, &field_shape)?;
            self.path.pop();
        }
        self.put_u8(NbtTag::End.to_u8());
        Ok(())
    }

    fn write_payload(&mut self, value: &NbtValue<'_>, shape: &Shape) -> Result<()> {
        let expected = match shape.serialized_tag() {
            Some(tag) => tag,
            None => return Err(self.unserializable()),
        };
        if value.tag() != expected {
            return Err(self.mismatch(shape.expected_name(), value.tag().name()));
        }

        match value {
            NbtValue::Byte(v) => self.put_u8(*v as u8),
            NbtValue::Short(v) => self.put_i16(*v),
            NbtValue::Int(v) => self.put_i32(*v),
            NbtValue::Long(v) => self.put_i64(*v),
            NbtValue::Float(v) => self.put_i32(v.to_bits() as i32),
            NbtValue::Double(v) => self.put_i64(v.to_bits() as i64),
            NbtValue::ByteArray(bytes) => {
                self.put_i32(bytes.len() as i32);
                self.out.extend_from_slice(bytes);
            }
            NbtValue::String(s) => self.put_str(s)?,
            NbtValue::List(_, items) => {
                let element_shape = shape.element().clone();
                let element_tag = element_shape
                    .serialized_tag()
                    .ok_or_else(|| self.unserializable())?;
                self.put_u8(element_tag.to_u8());
                self.put_i32(items.len() as i32);
                for (index, item) in items.iter().enumerate() {
                    self.path.push(PathPart::Index(index));
                    self.write_payload(item, &element_shape)?;
                    self.path.pop();
                }
            }
            NbtValue::Compound(_) => self.write_compound(value, shape)?,
            NbtValue::IntArray(array) => {
                self.put_i32(array.len() as i32);
                if array.endian() == self.endian {
                    self.out.extend_from_slice(array.raw_bytes());
                } else {
                    for v in array.iter() {
                        self.put_i32(v);
                    }
                }
            }
            NbtValue::LongArray(array) => {
                self.put_i32(array.len() as i32);
                if array.endian() == self.endian {
                    self.out.extend_from_slice(array.raw_bytes());
                } else {
                    for v in array.iter() {
                        self.put_i64(v);
                    }
                }
            }
        }
        Ok(())
    }
}
