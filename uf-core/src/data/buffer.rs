//! Typed data buffers
//!
//! A `DataBuffer` is the request or response payload of a primitive call: a
//! type tag, a byte buffer whose length is the buffer capacity, and the
//! number of bytes actually produced.

use uf_protocol::DataType;

use crate::error::{Result, UfError};

/// Request/response payload passed through the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBuffer {
    /// Logical type of the payload
    pub data_type: DataType,
    buf: Vec<u8>,
    data_len: u32,
    allocate: bool,
}

impl DataBuffer {
    /// Zeroed buffer of `buf_len` bytes
    pub fn new(data_type: DataType, buf_len: usize) -> Self {
        Self {
            data_type,
            buf: vec![0; buf_len],
            data_len: 0,
            allocate: false,
        }
    }

    /// Empty response buffer the dispatcher sizes from the resolved type
    pub fn allocate(data_type: DataType) -> Self {
        Self {
            data_type,
            buf: Vec::new(),
            data_len: 0,
            allocate: true,
        }
    }

    /// Empty request
    pub fn void() -> Self {
        Self::new(DataType::Void, 0)
    }

    pub fn from_u32(data_type: DataType, value: u32) -> Self {
        Self {
            data_type,
            buf: value.to_le_bytes().to_vec(),
            data_len: 4,
            allocate: false,
        }
    }

    pub fn from_bytes(data_type: DataType, bytes: &[u8]) -> Self {
        Self {
            data_type,
            buf: bytes.to_vec(),
            data_len: bytes.len() as u32,
            allocate: false,
        }
    }

    /// NUL-terminated string payload
    pub fn from_string(value: &str) -> Self {
        let mut buf = value.as_bytes().to_vec();
        buf.push(0);
        Self {
            data_type: DataType::String,
            data_len: buf.len() as u32,
            buf,
            allocate: false,
        }
    }

    /// Buffer capacity in bytes
    pub fn buf_len(&self) -> usize {
        self.buf.len()
    }

    /// Bytes produced by the last successful write
    pub fn data_len(&self) -> u32 {
        self.data_len
    }

    pub fn set_data_len(&mut self, len: u32) {
        self.data_len = len;
    }

    /// True while the buffer still waits for dispatcher allocation
    pub fn needs_allocation(&self) -> bool {
        self.allocate && self.buf.is_empty()
    }

    /// Whole buffer, including bytes past `data_len`
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    /// Produced bytes only
    pub fn data(&self) -> &[u8] {
        let end = (self.data_len as usize).min(self.buf.len());
        &self.buf[..end]
    }

    /// Replace the storage with a zeroed buffer of `buf_len` bytes
    pub fn reallocate(&mut self, buf_len: usize) {
        self.buf = vec![0; buf_len];
        self.data_len = 0;
        self.allocate = false;
    }

    /// Zero the contents without changing capacity
    pub fn clear(&mut self) {
        self.buf.iter_mut().for_each(|b| *b = 0);
        self.data_len = 0;
    }

    /// First 32 bits, little-endian
    pub fn u32_value(&self) -> Option<u32> {
        let bytes: [u8; 4] = self.buf.get(..4)?.try_into().ok()?;
        Some(u32::from_le_bytes(bytes))
    }

    pub fn u64_value(&self) -> Option<u64> {
        let bytes: [u8; 8] = self.buf.get(..8)?.try_into().ok()?;
        Some(u64::from_le_bytes(bytes))
    }

    /// Store a 32-bit value, failing with `NeedLargerBuffer` when the
    /// capacity is under four bytes.
    pub fn set_u32(&mut self, value: u32) -> Result<()> {
        self.write(&value.to_le_bytes())
    }

    /// Copy `bytes` into the buffer and update `data_len`
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.buf.len() {
            self.data_len = bytes.len() as u32;
            return Err(UfError::NeedLargerBuffer {
                needed: bytes.len() as u32,
            });
        }
        self.buf[..bytes.len()].copy_from_slice(bytes);
        self.data_len = bytes.len() as u32;
        Ok(())
    }

    /// Write a NUL-terminated string
    pub fn write_str(&mut self, value: &str) -> Result<()> {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        self.write(&bytes)
    }

    /// Payload read as a NUL-terminated string
    pub fn string_value(&self) -> String {
        let end = self.buf.iter().position(|&b| b == 0).unwrap_or(self.buf.len());
        String::from_utf8_lossy(&self.buf[..end]).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_flag() {
        let mut b = DataBuffer::allocate(DataType::Auto);
        assert!(b.needs_allocation());
        b.reallocate(4);
        assert!(!b.needs_allocation());
        assert_eq!(b.buf_len(), 4);
    }

    #[test]
    fn test_write_too_small_reports_needed() {
        let mut b = DataBuffer::new(DataType::Binary, 2);
        match b.write(&[1, 2, 3]) {
            Err(UfError::NeedLargerBuffer { needed }) => assert_eq!(needed, 3),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(b.as_bytes(), &[0, 0]);
    }

    #[test]
    fn test_u32_roundtrip_and_string() {
        let mut b = DataBuffer::new(DataType::Uint32, 4);
        b.set_u32(2931).unwrap();
        assert_eq!(b.u32_value(), Some(2931));

        let s = DataBuffer::from_string("TCPU.D0");
        assert_eq!(s.string_value(), "TCPU.D0");
        assert_eq!(s.data_len(), 8);
    }

    #[test]
    fn test_clear_zeroes() {
        let mut b = DataBuffer::from_u32(DataType::Uint32, 7);
        b.clear();
        assert_eq!(b.u32_value(), Some(0));
        assert_eq!(b.data_len(), 0);
    }
}
