use super::value::Endian;

/// Raised when a read runs past the end of the buffer. The parser attaches
/// the current field path before surfacing it.
pub(crate) struct Eof;

/// Bounds-checked reader over a borrowed byte buffer with explicit
/// endianness. Every multi-byte primitive goes through here; nothing else
/// in the codec touches raw offsets.
pub(crate) struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8], endian: Endian) -> Self {
        ByteCursor {
            buf,
            pos: 0,
            endian,
        }
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], Eof> {
        let bytes = self
            .buf
            .get(self.pos..self.pos.checked_add(len).ok_or(Eof)?)
            .ok_or(Eof)?;
        self.pos += len;
        Ok(bytes)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), Eof> {
        self.take(len).map(|_| ())
    }

    pub fn u8(&mut self) -> Result<u8, Eof> {
        let b = *self.buf.get(self.pos).ok_or(Eof)?;
        self.pos += 1;
        Ok(b)
    }

    pub fn i8(&mut self) -> Result<i8, Eof> {
        self.u8().map(|b| b as i8)
    }

    pub fn u16(&mut self) -> Result<u16, Eof> {
        let raw: [u8; 2] = self.take(2)?.try_into().map_err(|_| Eof)?;
        Ok(match self.endian {
            Endian::Big => u16::from_be_bytes(raw),
            Endian::Little => u16::from_le_bytes(raw),
        })
    }

    pub fn i16(&mut self) -> Result<i16, Eof> {
        self.u16().map(|v| v as i16)
    }

    pub fn i32(&mut self) -> Result<i32, Eof> {
        let raw: [u8; 4] = self.take(4)?.try_into().map_err(|_| Eof)?;
        Ok(match self.endian {
            Endian::Big => i32::from_be_bytes(raw),
            Endian::Little => i32::from_le_bytes(raw),
        })
    }

    pub fn i64(&mut self) -> Result<i64, Eof> {
        let raw: [u8; 8] = self.take(8)?.try_into().map_err(|_| Eof)?;
        Ok(match self.endian {
            Endian::Big => i64::from_be_bytes(raw),
            Endian::Little => i64::from_le_bytes(raw),
        })
    }

    pub fn f32(&mut self) -> Result<f32, Eof> {
        self.i32().map(|v| f32::from_bits(v as u32))
    }

    pub fn f64(&mut self) -> Result<f64, Eof> {
        self.i64().map(|v| f64::from_bits(v as u64))
    }
}
