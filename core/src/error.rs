use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can stop the emulator.
///
/// None of these are recoverable; the instruction set is fixed so any of them
/// means the program is unsupported or malformed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unrecognised opcode {opcode:#06X} at {address:#05X}")]
    UnrecognisedOpcode { opcode: u16, address: u16 },
    #[error("return at {address:#05X} with an empty call stack")]
    EmptyCallStack { address: u16 },
    #[error("program counter {pc:#06X} is outside of addressable memory")]
    OutOfBoundsFetch { pc: u16 },
    #[error("access of {len} byte(s) at {address:#06X} runs past the end of memory")]
    AddressOutOfBounds { address: u16, len: usize },
    #[error("program is {size} bytes but only {capacity} bytes are available")]
    ProgramTooLarge { size: usize, capacity: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
