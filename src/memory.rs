//! The memory the install emitter writes programs to.

use std::fmt;

/// Size of the 6502 address space.
pub const ADDRESS_SPACE: usize = 0x10000;

/// Byte addressable memory of a 6502 machine.
pub trait Memory {
    /// Error type returned by all methods of this trait.
    type Error: fmt::Display;

    /// Reads the byte at `addr`.
    fn read(&mut self, addr: u16) -> Result<u8, Self::Error>;

    /// Overwrites the byte at `addr`.
    fn write(&mut self, addr: u16, byte: u8) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryError {
    pub address: u16,
    pub kind: MemoryErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryErrorKind {
    /// The address lies past the end of the memory.
    InvalidAddress,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            MemoryErrorKind::InvalidAddress => write!(f, "no memory at {:04X}", self.address),
        }
    }
}

/// A plain memory image. Use `vec![0; ADDRESS_SPACE]` for the full address space.
impl Memory for Vec<u8> {
    type Error = MemoryError;

    fn read(&mut self, address: u16) -> Result<u8, Self::Error> {
        self.get(address as usize).copied().ok_or(MemoryError {
            address,
            kind: MemoryErrorKind::InvalidAddress,
        })
    }

    fn write(&mut self, address: u16, byte: u8) -> Result<(), Self::Error> {
        match self.get_mut(address as usize) {
            Some(cell) => {
                *cell = byte;
                Ok(())
            }
            None => Err(MemoryError {
                address,
                kind: MemoryErrorKind::InvalidAddress,
            }),
        }
    }
}
