use std::ops::{Deref, DerefMut, Range};

use crate::constants::{MEMORY_SIZE, PROGRAM_START, SPRITE_SHEET};
use crate::error::{Error, Result};
use crate::opcode;

/// # Memory
/// 4096 bytes of flat addressable memory.
///
/// ```text
/// 0x000-0x04F  built in font (16 glyphs of 5 bytes)
/// 0x050-0x1FF  unused
/// 0x200-0xFFF  program and data
/// ```
///
/// Addresses are u16 as they are on the machine; lengths are usize.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Memory {
    bytes: [u8; MEMORY_SIZE],
}

impl Memory {
    /// Zeroed memory with the sprite sheet baked in at 0x000
    pub fn new() -> Self {
        let mut bytes = [0; MEMORY_SIZE];
        bytes[..SPRITE_SHEET.len()].copy_from_slice(&SPRITE_SHEET);
        Memory { bytes }
    }

    /// How many bytes a program loaded at `PROGRAM_START` may occupy
    pub fn program_capacity() -> usize {
        MEMORY_SIZE - PROGRAM_START as usize
    }

    /// Copy a program verbatim to `PROGRAM_START`
    ///
    /// # Arguments
    /// * `program` the raw bytes of a ROM
    pub fn load_program(&mut self, program: &[u8]) -> Result<()> {
        let capacity = Self::program_capacity();
        if program.len() > capacity {
            return Err(Error::ProgramTooLarge {
                size: program.len(),
                capacity,
            });
        }
        self.write(PROGRAM_START, program)
    }

    /// Gets the instruction word at `pc`.
    /// Memory is stored as bytes, but opcodes are 16 bits so we combine two subsequent bytes.
    pub fn fetch(&self, pc: u16) -> Result<u16> {
        let bytes = self
            .read(pc, 2)
            .map_err(|_| Error::OutOfBoundsFetch { pc })?;
        Ok(opcode::from_bytes(bytes[0], bytes[1]))
    }

    /// Borrow `len` bytes starting at `address`
    pub fn read(&self, address: u16, len: usize) -> Result<&[u8]> {
        let range = Self::range(address, len)?;
        Ok(&self.bytes[range])
    }

    /// Overwrite memory starting at `address` with `data`
    pub fn write(&mut self, address: u16, data: &[u8]) -> Result<()> {
        let range = Self::range(address, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    fn range(address: u16, len: usize) -> Result<Range<usize>> {
        let start = address as usize;
        let end = start + len;
        if end > MEMORY_SIZE {
            return Err(Error::AddressOutOfBounds { address, len });
        }
        Ok(start..end)
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Memory {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl DerefMut for Memory {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_is_baked_in() {
        let memory = Memory::new();
        assert_eq!(memory[..80], SPRITE_SHEET);
        assert!(memory[80..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_load_program_at_0x200() {
        let mut memory = Memory::new();
        memory.load_program(&[0x00, 0xE0]).unwrap();
        assert_eq!(memory[0x200..0x202], [0x00, 0xE0]);
    }

    #[test]
    fn test_load_program_leaves_font_alone() {
        let mut memory = Memory::new();
        memory.load_program(&[0xFF; 16]).unwrap();
        assert_eq!(memory[..80], SPRITE_SHEET);
    }

    #[test]
    fn test_load_program_fills_memory_exactly() {
        let mut memory = Memory::new();
        let program = vec![0xAB; Memory::program_capacity()];
        memory.load_program(&program).unwrap();
        assert_eq!(memory[MEMORY_SIZE - 1], 0xAB);
    }

    #[test]
    fn test_load_program_too_large() {
        let mut memory = Memory::new();
        let program = vec![0; Memory::program_capacity() + 1];
        match memory.load_program(&program) {
            Err(Error::ProgramTooLarge { size, capacity }) => {
                assert_eq!(size, 0xE01);
                assert_eq!(capacity, 0xE00);
            }
            other => panic!("expected ProgramTooLarge but got {:?}", other),
        }
    }

    #[test]
    fn test_fetch_word() {
        let mut memory = Memory::new();
        memory[0x200..0x202].copy_from_slice(&[0xAA, 0xBB]);
        assert_eq!(memory.fetch(0x200).unwrap(), 0xAABB);
    }

    #[test]
    fn test_fetch_last_word() {
        let memory = Memory::new();
        assert_eq!(memory.fetch(0xFFE).unwrap(), 0x0000);
    }

    #[test]
    fn test_fetch_straddling_end_fails() {
        let memory = Memory::new();
        assert!(matches!(
            memory.fetch(0xFFF),
            Err(Error::OutOfBoundsFetch { pc: 0xFFF })
        ));
    }

    #[test]
    fn test_write_past_end_fails_without_writing() {
        let mut memory = Memory::new();
        let result = memory.write(0xFFE, &[1, 2, 3]);
        assert!(matches!(
            result,
            Err(Error::AddressOutOfBounds {
                address: 0xFFE,
                len: 3
            })
        ));
        assert_eq!(memory[0xFFE..], [0, 0]);
    }

    #[test]
    fn test_read_slice() {
        let memory = Memory::new();
        assert_eq!(memory.read(0x0, 5).unwrap(), &[0xF0, 0x90, 0x90, 0x90, 0xF0]);
    }
}
