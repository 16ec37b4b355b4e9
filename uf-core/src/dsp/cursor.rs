//! Bounds-checked reader over a package image
//!
//! Every record is validated against the remaining buffer before the cursor
//! advances. Chained records advance by their own declared `size`; fixed
//! records advance by their structure size.

use crate::error::{Result, UfError};

/// Forward-only cursor over a package image
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Cursor positioned at `pos`
    pub fn at(buf: &'a [u8], pos: usize) -> Result<Self> {
        if pos > buf.len() {
            return Err(UfError::PackageShort {
                record: "offset",
                offset: pos,
                needed: 0,
                available: 0,
            });
        }
        Ok(Self { buf, pos })
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Take a fixed-size record and advance past it
    pub fn fixed(&mut self, record: &'static str, len: usize) -> Result<Record<'a>> {
        let rec = self.view(record, len)?;
        self.pos += len;
        Ok(rec)
    }

    /// Take a self-sized record whose `size` field (u32 at offset 0) covers
    /// at least `header_len` bytes, and advance by that size.
    ///
    /// The returned record spans the full declared size, so nested records
    /// (primitives inside a domain, actions inside a primitive) can be read
    /// through a child cursor.
    pub fn chained(&mut self, record: &'static str, header_len: usize) -> Result<Record<'a>> {
        let head = self.view(record, 4)?;
        let size = head.u32(0)?;
        if (size as usize) < header_len {
            return Err(UfError::RecordSizeInvalid {
                record,
                offset: self.pos,
                size,
            });
        }
        let rec = self.view(record, size as usize)?;
        self.pos += size as usize;
        Ok(rec)
    }

    fn view(&self, record: &'static str, len: usize) -> Result<Record<'a>> {
        let end = self.pos.checked_add(len).ok_or(UfError::PackageShort {
            record,
            offset: self.pos,
            needed: len,
            available: self.remaining(),
        })?;
        let bytes = self.buf.get(self.pos..end).ok_or(UfError::PackageShort {
            record,
            offset: self.pos,
            needed: len,
            available: self.remaining(),
        })?;
        Ok(Record {
            name: record,
            offset: self.pos,
            bytes,
        })
    }
}

/// Borrowed view of one record; field offsets are relative to its start
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    name: &'static str,
    offset: usize,
    bytes: &'a [u8],
}

impl<'a> Record<'a> {
    /// Absolute offset of the record in the image
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    fn field(&self, at: usize, len: usize) -> Result<&'a [u8]> {
        at.checked_add(len)
            .and_then(|end| self.bytes.get(at..end))
            .ok_or(UfError::PackageShort {
                record: self.name,
                offset: self.offset + at,
                needed: len,
                available: self.bytes.len().saturating_sub(at),
            })
    }

    pub fn u8(&self, at: usize) -> Result<u8> {
        Ok(self.field(at, 1)?[0])
    }

    pub fn u16(&self, at: usize) -> Result<u16> {
        let b = self.field(at, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn u32(&self, at: usize) -> Result<u32> {
        let b = self.field(at, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn i32(&self, at: usize) -> Result<i32> {
        Ok(self.u32(at)? as i32)
    }

    pub fn array<const N: usize>(&self, at: usize) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.field(at, N)?);
        Ok(out)
    }

    /// Fixed-width character field, cut at the first NUL
    pub fn cstr(&self, at: usize, len: usize) -> Result<String> {
        let raw = self.field(at, len)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }

    /// Child cursor over the bytes after `header_len`
    pub fn body(&self, header_len: usize) -> Result<ByteCursor<'a>> {
        ByteCursor::at(self.bytes, header_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_advances() {
        let buf = [1u8, 0, 0, 0, 2, 0, 0, 0];
        let mut c = ByteCursor::new(&buf);
        let a = c.fixed("a", 4).unwrap();
        assert_eq!(a.u32(0).unwrap(), 1);
        let b = c.fixed("b", 4).unwrap();
        assert_eq!(b.u32(0).unwrap(), 2);
        assert_eq!(c.remaining(), 0);
        assert!(c.fixed("c", 1).is_err());
    }

    #[test]
    fn test_chained_uses_declared_size() {
        // size 6, then 2 trailing bytes of payload, then size 4
        let buf = [6u8, 0, 0, 0, 0xAA, 0xBB, 4, 0, 0, 0];
        let mut c = ByteCursor::new(&buf);
        let r = c.chained("rec", 4).unwrap();
        assert_eq!(r.len(), 6);
        assert_eq!(c.position(), 6);
        let r2 = c.chained("rec", 4).unwrap();
        assert_eq!(r2.offset(), 6);
    }

    #[test]
    fn test_chained_rejects_undersized_and_overlong() {
        let buf = [2u8, 0, 0, 0];
        let mut c = ByteCursor::new(&buf);
        assert!(matches!(
            c.chained("rec", 4),
            Err(UfError::RecordSizeInvalid { size: 2, .. })
        ));

        let buf = [64u8, 0, 0, 0, 0, 0];
        let mut c = ByteCursor::new(&buf);
        assert!(matches!(c.chained("rec", 4), Err(UfError::PackageShort { .. })));
    }

    #[test]
    fn test_cstr_stops_at_nul() {
        let buf = *b"abc\0def\0";
        let mut c = ByteCursor::new(&buf);
        let r = c.fixed("s", 8).unwrap();
        assert_eq!(r.cstr(0, 8).unwrap(), "abc");
        assert_eq!(r.cstr(4, 4).unwrap(), "def");
        assert!(r.cstr(6, 4).is_err());
    }
}
