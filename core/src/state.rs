use crate::constants::{PROGRAM_START, REGISTER_COUNT};
use crate::framebuffer::FrameBuffer;
use crate::memory::Memory;

/// A snapshot of the machine's internal state
///
/// ## CPU
/// Registers
/// - (v) 16 primary 8-bit registers (V0..VF)
///     - the first 15 (V0..VE) are general purpose registers
///     - the 16th (VF) is the flags register and is clobbered by arithmetic, shifts and draws
/// - (i) a 16-bit memory address register; not masked to 12 bits
///
/// Counter
/// - (pc) a 16-bit program counter
///
/// Stack
/// - return addresses pushed by calls; no depth limit is enforced
///
/// Timers
/// - 2 8-bit timers (delay & sound)
/// - both count down to 0 at 60Hz and stop there
/// - a tone is emitted as the sound timer passes through 1
///
/// ## Memory
/// - 4096 bytes of addressable memory
/// - 64x32 frame buffer
///
/// ## Input
/// - While `register_needing_key` is set, emulation halts; the next key press is written
///   into the V register it names and the latch is cleared
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    pub v: [u8; REGISTER_COUNT],
    pub i: u16,
    pub pc: u16,
    pub stack: Vec<u16>,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub memory: Memory,
    pub frame_buffer: FrameBuffer,
    pub register_needing_key: Option<u8>,
}

impl State {
    pub fn new() -> Self {
        State {
            v: [0; REGISTER_COUNT],
            i: 0,
            pc: PROGRAM_START,
            stack: Vec::with_capacity(16),
            delay_timer: 0,
            sound_timer: 0,
            memory: Memory::new(),
            frame_buffer: FrameBuffer::new(),
            register_needing_key: None,
        }
    }

    /// The flags register
    pub fn vf(&self) -> u8 {
        self.v[0xF]
    }

    /// Counts both timers down by one, stopping at 0.
    /// Returns whether a tone should sound, which happens as the sound timer passes through 1.
    pub fn tick_timers(&mut self) -> bool {
        let beep = self.sound_timer == 1;
        self.sound_timer = self.sound_timer.saturating_sub(1);
        self.delay_timer = self.delay_timer.saturating_sub(1);
        beep
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}
