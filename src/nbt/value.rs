use std::borrow::Cow;

/// Byte order used for every multi-byte read and write.
///
/// Java-edition files are big-endian throughout; the little-endian mode
/// exists for consumer formats that reuse the NBT grammar with flipped
/// numerics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// The thirteen NBT tag kinds, by on-disk tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NbtTag {
    End = 0,
    Byte = 1,
    Short = 2,
    Int = 3,
    Long = 4,
    Float = 5,
    Double = 6,
    ByteArray = 7,
    String = 8,
    List = 9,
    Compound = 10,
    IntArray = 11,
    LongArray = 12,
}

impl NbtTag {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(NbtTag::End),
            1 => Some(NbtTag::Byte),
            2 => Some(NbtTag::Short),
            3 => Some(NbtTag::Int),
            4 => Some(NbtTag::Long),
            5 => Some(NbtTag::Float),
            6 => Some(NbtTag::Double),
            7 => Some(NbtTag::ByteArray),
            8 => Some(NbtTag::String),
            9 => Some(NbtTag::List),
            10 => Some(NbtTag::Compound),
            11 => Some(NbtTag::IntArray),
            12 => Some(NbtTag::LongArray),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            NbtTag::End => "End",
            NbtTag::Byte => "Byte",
            NbtTag::Short => "Short",
            NbtTag::Int => "Int",
            NbtTag::Long => "Long",
            NbtTag::Float => "Float",
            NbtTag::Double => "Double",
            NbtTag::ByteArray => "ByteArray",
            NbtTag::String => "String",
            NbtTag::List => "List",
            NbtTag::Compound => "Compound",
            NbtTag::IntArray => "IntArray",
            NbtTag::LongArray => "LongArray",
        }
    }

    /// Payload width of the fixed-size leaf kinds, `None` for everything
    /// variable-length. Used by the structural field skipper.
    pub(crate) fn fixed_width(self) -> Option<usize> {
        match self {
            NbtTag::Byte => Some(1),
            NbtTag::Short => Some(2),
            NbtTag::Int => Some(4),
            NbtTag::Long => Some(8),
            NbtTag::Float => Some(4),
            NbtTag::Double => Some(8),
            _ => None,
        }
    }
}

/// Zero-copy view over an `IntArray` payload: raw element bytes plus the
/// endianness they were encoded with. Elements decode on access, never up
/// front — height maps and block data can run to millions of entries.
#[derive(Debug, Clone)]
pub struct IntArray<'a> {
    bytes: Cow<'a, [u8]>,
    endian: Endian,
}

impl<'a> IntArray<'a> {
    pub(crate) fn from_raw(bytes: &'a [u8], endian: Endian) -> Self {
        IntArray {
            bytes: Cow::Borrowed(bytes),
            endian,
        }
    }

    pub fn from_ints(values: &[i32], endian: Endian) -> IntArray<'static> {
        let mut bytes = Vec::with_capacity(values.len() * 4);
        for &v in values {
            match endian {
                Endian::Big => bytes.extend_from_slice(&v.to_be_bytes()),
                Endian::Little => bytes.extend_from_slice(&v.to_le_bytes()),
            }
        }
        IntArray {
            bytes: Cow::Owned(bytes),
            endian,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / 4
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<i32> {
        let raw = self.bytes.get(index * 4..index * 4 + 4)?;
        let raw: [u8; 4] = raw.try_into().ok()?;
        Some(match self.endian {
            Endian::Big => i32::from_be_bytes(raw),
            Endian::Little => i32::from_le_bytes(raw),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    pub fn to_vec(&self) -> Vec<i32> {
        self.iter().collect()
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }
}

impl PartialEq for IntArray<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

/// Zero-copy view over a `LongArray` payload. Same contract as [`IntArray`].
#[derive(Debug, Clone)]
pub struct LongArray<'a> {
    bytes: Cow<'a, [u8]>,
    endian: Endian,
}

impl<'a> LongArray<'a> {
    pub(crate) fn from_raw(bytes: &'a [u8], endian: Endian) -> Self {
        LongArray {
            bytes: Cow::Borrowed(bytes),
            endian,
        }
    }

    pub fn from_longs(values: &[i64], endian: Endian) -> LongArray<'static> {
        let mut bytes = Vec::with_capacity(values.len() * 8);
        for &v in values {
            match endian {
                Endian::Big => bytes.extend_from_slice(&v.to_be_bytes()),
                Endian::Little => bytes.extend_from_slice(&v.to_le_bytes()),
            }
        }
        LongArray {
            bytes: Cow::Owned(bytes),
            endian,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / 8
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<i64> {
        let raw = self.bytes.get(index * 8..index * 8 + 8)?;
        let raw: [u8; 8] = raw.try_into().ok()?;
        Some(match self.endian {
            Endian::Big => i64::from_be_bytes(raw),
            Endian::Little => i64::from_le_bytes(raw),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    pub fn to_vec(&self) -> Vec<i64> {
        self.iter().collect()
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }
}

impl PartialEq for LongArray<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

/// A parsed NBT tree. Borrows the input buffer wherever the format allows:
/// strings and the three array kinds are views, not copies.
///
/// Compounds keep the order fields appeared in on disk; equality ignores
/// that order (the writer re-sorts keys anyway). A list stores its shared
/// element tag once, not per item.
#[derive(Debug, Clone)]
pub enum NbtValue<'a> {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Cow<'a, [u8]>),
    String(Cow<'a, str>),
    List(NbtTag, Vec<NbtValue<'a>>),
    Compound(Vec<(Cow<'a, str>, NbtValue<'a>)>),
    IntArray(IntArray<'a>),
    LongArray(LongArray<'a>),
}

impl<'a> NbtValue<'a> {
    pub fn tag(&self) -> NbtTag {
        match self {
            NbtValue::Byte(_) => NbtTag::Byte,
            NbtValue::Short(_) => NbtTag::Short,
            NbtValue::Int(_) => NbtTag::Int,
            NbtValue::Long(_) => NbtTag::Long,
            NbtValue::Float(_) => NbtTag::Float,
            NbtValue::Double(_) => NbtTag::Double,
            NbtValue::ByteArray(_) => NbtTag::ByteArray,
            NbtValue::String(_) => NbtTag::String,
            NbtValue::List(_, _) => NbtTag::List,
            NbtValue::Compound(_) => NbtTag::Compound,
            NbtValue::IntArray(_) => NbtTag::IntArray,
            NbtValue::LongArray(_) => NbtTag::LongArray,
        }
    }

    /// Compound field lookup by name. `None` for non-compounds too.
    pub fn get(&self, key: &str) -> Option<&NbtValue<'a>> {
        match self {
            NbtValue::Compound(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn entries(&self) -> Option<&[(Cow<'a, str>, NbtValue<'a>)]> {
        match self {
            NbtValue::Compound(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_byte(&self) -> Option<i8> {
        match self {
            NbtValue::Byte(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_short(&self) -> Option<i16> {
        match self {
            NbtValue::Short(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            NbtValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            NbtValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NbtValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<(NbtTag, &[NbtValue<'a>])> {
        match self {
            NbtValue::List(tag, items) => Some((*tag, items)),
            _ => None,
        }
    }

    pub fn as_long_array(&self) -> Option<&LongArray<'a>> {
        match self {
            NbtValue::LongArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_int_array(&self) -> Option<&IntArray<'a>> {
        match self {
            NbtValue::IntArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_byte_array(&self) -> Option<&[u8]> {
        match self {
            NbtValue::ByteArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_byte(&self, key: &str) -> Option<i8> {
        self.get(key).and_then(NbtValue::as_byte)
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(NbtValue::as_int)
    }

    pub fn get_long(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(NbtValue::as_long)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(NbtValue::as_str)
    }

    pub fn get_list(&self, key: &str) -> Option<(NbtTag, &[NbtValue<'a>])> {
        self.get(key).and_then(NbtValue::as_list)
    }

    pub fn get_long_array(&self, key: &str) -> Option<&LongArray<'a>> {
        self.get(key).and_then(NbtValue::as_long_array)
    }
}

impl PartialEq for NbtValue<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NbtValue::Byte(a), NbtValue::Byte(b)) => a == b,
            (NbtValue::Short(a), NbtValue::Short(b)) => a == b,
            (NbtValue::Int(a), NbtValue::Int(b)) => a == b,
            (NbtValue::Long(a), NbtValue::Long(b)) => a == b,
            (NbtValue::Float(a), NbtValue::Float(b)) => a == b,
            (NbtValue::Double(a), NbtValue::Double(b)) => a == b,
            (NbtValue::ByteArray(a), NbtValue::ByteArray(b)) => a == b,
            (NbtValue::String(a), NbtValue::String(b)) => a == b,
            (NbtValue::List(ta, a), NbtValue::List(tb, b)) => {
                (a.is_empty() && b.is_empty() || ta == tb) && a == b
            }
            (NbtValue::Compound(a), NbtValue::Compound(b)) => {
                // Field order comes from the file and carries no meaning.
                a.len() == b.len()
                    && a.iter().all(|(key, value)| {
                        b.iter().any(|(other_key, other_value)| {
                            key == other_key && value == other_value
                        })
                    })
            }
            (NbtValue::IntArray(a), NbtValue::IntArray(b)) => a == b,
            (NbtValue::LongArray(a), NbtValue::LongArray(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_equality_ignores_order() {
        let a = NbtValue::Compound(vec![
            ("x".into(), NbtValue::Int(1)),
            ("y".into(), NbtValue::Int(2)),
        ]);
        let b = NbtValue::Compound(vec![
            ("y".into(), NbtValue::Int(2)),
            ("x".into(), NbtValue::Int(1)),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn long_array_decodes_per_endian() {
        let be = LongArray::from_longs(&[1, -2, i64::MAX], Endian::Big);
        let le = LongArray::from_longs(&[1, -2, i64::MAX], Endian::Little);
        assert_eq!(be.to_vec(), vec![1, -2, i64::MAX]);
        assert_eq!(le.to_vec(), vec![1, -2, i64::MAX]);
        assert_eq!(be, le);
        assert_ne!(be.raw_bytes(), le.raw_bytes());
    }
}
