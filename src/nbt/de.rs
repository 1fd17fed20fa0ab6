use std::borrow::Cow;

use crate::error::{Result, SchematicError};

use super::cursor::ByteCursor;
use super::shape::Shape;
use super::value::{Endian, IntArray, LongArray, NbtTag, NbtValue};

/// One step of the dotted error path: a compound key or a list index.
enum PathPart<'a> {
    Key(Cow<'a, str>),
    Index(usize),
}

pub(crate) struct Parser<'a> {
    cur: ByteCursor<'a>,
    path: Vec<PathPart<'a>>,
    endian: Endian,
}

/// Parse exactly one unnamed root compound from `bytes` under `shape`.
pub(crate) fn parse<'a>(bytes: &'a [u8], shape: &Shape, endian: Endian) -> Result<NbtValue<'a>> {
    let mut parser = Parser {
        cur: ByteCursor::new(bytes, endian),
        path: Vec::new(),
        endian,
    };

    let root_tag = parser.cur.u8().map_err(|_| parser.eof())?;
    if NbtTag::from_u8(root_tag) != Some(NbtTag::Compound) {
        return Err(SchematicError::InvalidRoot);
    }
    let root_name = parser.read_string()?;
    if !root_name.is_empty() {
        return Err(SchematicError::InvalidRoot);
    }

    if !shape.matches(NbtTag::Compound) {
        return Err(SchematicError::TypeMismatch {
            path: parser.render_path(),
            expected: shape.expected_name(),
            found: NbtTag::Compound.name(),
        });
    }
    parser.read_compound(shape)
}

impl<'a> Parser<'a> {
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

    fn eof(&self) -> SchematicError {
        SchematicError::UnexpectedEof {
            path: self.render_path(),
        }
    }

    fn read_tag(&mut self) -> Result<NbtTag> {
        let byte = self.cur.u8().map_err(|_| self.eof())?;
        NbtTag::from_u8(byte).ok_or_else(|| SchematicError::UnknownTag {
            tag: byte,
            path: self.render_path(),
        })
    }

    fn read_string(&mut self) -> Result<Cow<'a, str>> {
        let len = self.cur.u16().map_err(|_| self.eof())? as usize;
        let bytes = self.cur.take(len).map_err(|_| self.eof())?;
        let text = std::str::from_utf8(bytes).map_err(|_| SchematicError::InvalidUtf8 {
            path: self.render_path(),
        })?;
        Ok(Cow::Borrowed(text))
    }

    /// Signed element count prefixing arrays and lists. Negative counts only
    /// appear in corrupt files; reported as truncation.
    fn read_count(&mut self) -> Result<usize> {
        let count = self.cur.i32().map_err(|_| self.eof())?;
        usize::try_from(count).map_err(|_| self.eof())
    }

    fn read_compound(&mut self, shape: &Shape) -> Result<NbtValue<'a>> {
        let mut entries = Vec::new();
        loop {
            let tag = self.read_tag()?;
            if tag == NbtTag::End {
                break;
            }
            let name = self.read_string()?;
            match shape.field(&name) {
                Some(field_shape) => {
                    self.path.push(PathPart::Key(name.clone()));
                    let field_shape = field_shape.clone();
                    let value = self.read_payload(tag, &field_shape)?;
                    self.path.pop();
                    entries.push((name, value));
                }
                // Not in the schema: advance past the payload without
                // materializing anything.
                None => self.skip_payload(tag)?,
            }
        }
        Ok(NbtValue::Compound(entries))
    }

    fn read_payload(&mut self, tag: NbtTag, shape: &Shape) -> Result<NbtValue<'a>> {
        if !shape.matches(tag) {
            return Err(SchematicError::TypeMismatch {
                path: self.render_path(),
                expected: shape.expected_name(),
                found: tag.name(),
            });
        }
        match tag {
            NbtTag::End => Err(SchematicError::UnknownTag {
                tag: 0,
                path: self.render_path(),
            }),
            NbtTag::Byte => Ok(NbtValue::Byte(self.cur.i8().map_err(|_| self.eof())?)),
            NbtTag::Short => Ok(NbtValue::Short(self.cur.i16().map_err(|_| self.eof())?)),
            NbtTag::Int => Ok(NbtValue::Int(self.cur.i32().map_err(|_| self.eof())?)),
            NbtTag::Long => Ok(NbtValue::Long(self.cur.i64().map_err(|_| self.eof())?)),
            NbtTag::Float => Ok(NbtValue::Float(self.cur.f32().map_err(|_| self.eof())?)),
            NbtTag::Double => Ok(NbtValue::Double(self.cur.f64().map_err(|_| self.eof())?)),
            NbtTag::ByteArray => {
                let len = self.read_count()?;
                let bytes = self.cur.take(len).map_err(|_| self.eof())?;
                Ok(NbtValue::ByteArray(Cow::Borrowed(bytes)))
            }
            NbtTag::String => Ok(NbtValue::String(self.read_string()?)),
            NbtTag::List => self.read_list(shape),
            NbtTag::Compound => self.read_compound(shape),
            NbtTag::IntArray => {
                let len = self.read_count()?;
                let bytes = self.cur.take(len * 4).map_err(|_| self.eof())?;
                Ok(NbtValue::IntArray(IntArray::from_raw(bytes, self.endian)))
            }
            NbtTag::LongArray => {
                let len = self.read_count()?;
                let bytes = self.cur.take(len * 8).map_err(|_| self.eof())?;
                Ok(NbtValue::LongArray(LongArray::from_raw(bytes, self.endian)))
            }
        }
    }

    fn read_list(&mut self, shape: &Shape) -> Result<NbtValue<'a>> {
        let element_tag = self.read_tag()?;
        let count = self.read_count()?;
        if count == 0 {
            // Empty lists carry an arbitrary (often End) element tag.
            return Ok(NbtValue::List(element_tag, Vec::new()));
        }
        if element_tag == NbtTag::End {
            return Err(SchematicError::UnknownTag {
                tag: 0,
                path: self.render_path(),
            });
        }
        let element_shape = shape.element().clone();
        let mut items = Vec::with_capacity(count);
        for index in 0..count {
            self.path.push(PathPart::Index(index));
            let item = self.read_payload(element_tag, &element_shape)?;
            self.path.pop();
            items.push(item);
        }
        Ok(NbtValue::List(element_tag, items))
    }

    /// Advance past one payload of `tag` without building a value.
    fn skip_payload(&mut self, tag: NbtTag) -> Result<()> {
        if let Some(width) = tag.fixed_width() {
            return self.cur.skip(width).map_err(|_| self.eof());
        }
        match tag {
            NbtTag::End => Ok(()),
            NbtTag::ByteArray => {
                let len = self.read_count()?;
                self.cur.skip(len).map_err(|_| self.eof())
            }
            NbtTag::String => {
                let len = self.cur.u16().map_err(|_| self.eof())? as usize;
                self.cur.skip(len).map_err(|_| self.eof())
            }
            NbtTag::List => {
                let element_tag = self.read_tag()?;
                let count = self.read_count()?;
                if let Some(width) = element_tag.fixed_width() {
                    return self
                        .cur
                        .skip(count.checked_mul(width).ok_or_else(|| self.eof())?)
                        .map_err(|_| self.eof());
                }
                for _ in 0..count {
                    self.skip_payload(element_tag)?;
                }
                Ok(())
            }
            NbtTag::Compound => {
                loop {
                    let inner = self.read_tag()?;
                    if inner == NbtTag::End {
                        return Ok(());
                    }
                    let len = self.cur.u16().map_err(|_| self.eof())? as usize;
                    self.cur.skip(len).map_err(|_| self.eof())?;
                    self.skip_payload(inner)?;
                }
            }
            NbtTag::IntArray => {
                let len = self.read_count()?;
                self.cur
                    .skip(len.checked_mul(4).ok_or_else(|| self.eof())?)
                    .map_err(|_| self.eof())
            }
            NbtTag::LongArray => {
                let len = self.read_count()?;
                self.cur
                    .skip(len.checked_mul(8).ok_or_else(|| self.eof())?)
                    .map_err(|_| self.eof())
            }
            // Fixed-width kinds were skipped above.
            _ => Ok(()),
        }
    }
}
