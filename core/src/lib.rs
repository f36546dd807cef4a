pub use chip8::{Chip8, Config};
pub use error::{Error, Result};
pub use framebuffer::FrameBuffer;
pub use instruction::Cycle;
pub use pacer::{Mute, Pacer, Screen, Speaker};

mod chip8;
pub mod constants;
mod error;
pub mod framebuffer;
mod instruction;
pub mod memory;
mod opcode;
mod operations;
mod pacer;
pub mod state;
