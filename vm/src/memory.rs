//! Flat, word-addressable memory bus.
//!
//! Deliberately the plain, obviously-correct pointer arithmetic noted as
//! the fix for a retrieved off-by-nine bug in the byte-pointer
//! computation: the buffer's address is `&buffer[0]`, full stop.

use crate::error::VmError;

/// A flat byte buffer addressed in 4-byte-aligned, little-endian words.
#[derive(Debug, Clone)]
pub struct MemoryBus {
    bytes: Vec<u8>,
}

impl MemoryBus {
    /// Allocate a zero-initialized bus holding `words` 32-bit words.
    pub fn new(words: usize) -> Self {
        Self {
            bytes: vec![0u8; words * 4],
        }
    }

    /// Total addressable span, in bytes.
    pub fn len(&self) -> u32 {
        self.bytes.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn check(&self, address: u32) -> Result<(), VmError> {
        if address % 4 != 0 {
            return Err(VmError::UnalignedAccess { address });
        }
        let end = address.checked_add(4).ok_or(VmError::Segfault {
            address,
            len: 4,
            bound: self.len(),
        })?;
        if end > self.len() {
            return Err(VmError::Segfault {
                address,
                len: 4,
                bound: self.len(),
            });
        }
        Ok(())
    }

    /// Read a little-endian word at `address`.
    pub fn read(&self, address: u32) -> Result<u32, VmError> {
        self.check(address)?;
        let start = address as usize;
        let slice = &self.bytes[start..start + 4];
        Ok(u32::from_le_bytes(slice.try_into().expect("checked length is 4")))
    }

    /// Write a little-endian word at `address`.
    pub fn write(&mut self, address: u32, value: u32) -> Result<(), VmError> {
        self.check(address)?;
        let start = address as usize;
        self.bytes[start..start + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Load raw bytes at `address`, e.g. a program's code section. Does
    /// not require word alignment; used by program loading, not by the
    /// interpreter's `readMemory32`/`writeMemory32`.
    pub fn load(&mut self, address: u32, data: &[u8]) -> Result<(), VmError> {
        let end = address as usize + data.len();
        if end > self.bytes.len() {
            return Err(VmError::Segfault {
                address,
                len: data.len() as u32,
                bound: self.len(),
            });
        }
        self.bytes[address as usize..end].copy_from_slice(data);
        Ok(())
    }
}
