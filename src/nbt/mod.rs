//! Schema-directed NBT codec.
//!
//! Parsing is guided by a [`Shape`]: fields the schema does not name are
//! skipped over structurally, array payloads come back as zero-copy views
//! into the input buffer, and every error carries the dotted path to the
//! field that caused it.

mod cursor;
mod de;
mod ser;
mod shape;
mod value;

pub use shape::Shape;
pub use value::{Endian, IntArray, LongArray, NbtTag, NbtValue};

use crate::error::Result;

/// A shape plus an endianness, bundled as a reusable codec.
#[derive(Debug, Clone)]
pub struct Nbt {
    shape: Shape,
    endian: Endian,
}

impl Nbt {
    pub fn new(shape: Shape) -> Self {
        Nbt {
            shape,
            endian: Endian::Big,
        }
    }

    pub fn with_endian(shape: Shape, endian: Endian) -> Self {
        Nbt { shape, endian }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Parse exactly one unnamed root compound. The returned tree borrows
    /// `bytes`; string and array payloads are views, not copies.
    pub fn parse<'a>(&self, bytes: &'a [u8]) -> Result<NbtValue<'a>> {
        de::parse(bytes, &self.shape, self.endian)
    }

    /// Serialize a value tree. Compound keys are re-sorted alphabetically;
    /// values under a [`Shape::Any`] cannot be written and fail explicitly.
    pub fn serialize(&self, value: &NbtValue<'_>) -> Result<Vec<u8>> {
        ser::serialize(value, &self.shape, self.endian)
    }
}
