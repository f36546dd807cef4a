use std::cmp::Ordering;
use std::collections::VecDeque;
use std::io::Read;
use std::mem;

use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::constants::{KEY_COUNT, MAX_SAVED_STATES};
use crate::error::{Error, Result};
use crate::framebuffer::FrameBuffer;
use crate::instruction::{from_op, Context, Cycle};
use crate::state::State;

/// Settings fixed for the lifetime of a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Config {
    /// Shift Vx in place for 8xy6/8xyE and leave I alone after Fx55/Fx65
    pub quirks: bool,
}

/// How a single cycle moved the call stack
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StackChange {
    Unchanged,
    Pushed,
    Popped(u16),
}

/// Everything needed to undo one cycle.
/// `state` is saved without its call stack; `stack` is the push or pop to roll back instead.
#[derive(Debug)]
struct Snapshot {
    state: State,
    stack: StackChange,
}

/// # Chip-8
/// Chip-8 is a virtual machine and corresponding interpreted language.
///
/// Tracks:
///  - current `state`
///  - `previous_states` for rewinding
///  - `pressed_keys` with public interfaces for manipulating them
///  - the random number source used by `Cxnn`
///
/// Supplies interfaces for:
/// - loading roms
/// - pressing and releasing keys
/// - advancing and reversing the CPU
/// - advancing its timers
/// - inspecting its frame buffer for rendering by some display
pub struct Chip8 {
    state: State,
    previous_states: VecDeque<Snapshot>,
    pressed_keys: [bool; KEY_COUNT],
    rng: StdRng,
    config: Config,
}

impl Chip8 {
    pub fn new(config: Config) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// A Chip-8 whose random numbers are reproducible
    pub fn with_seed(config: Config, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: Config, rng: StdRng) -> Self {
        Chip8 {
            state: State::new(),
            previous_states: VecDeque::with_capacity(MAX_SAVED_STATES),
            pressed_keys: [false; KEY_COUNT],
            rng,
            config,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Direct access to the machine, e.g. to set up a scenario
    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    /// Copy a program into memory at 0x200
    ///
    /// # Arguments
    /// * `program` the raw ROM
    pub fn load_program(&mut self, program: &[u8]) -> Result<()> {
        self.state.memory.load_program(program)?;
        info!("loaded {} byte program", program.len());
        Ok(())
    }

    /// Load a rom from a source file
    ///
    /// # Arguments
    /// * `reader` a file reader that contains a ROM
    pub fn load_rom(&mut self, reader: &mut dyn Read) -> Result<()> {
        let mut program = Vec::new();
        reader.read_to_end(&mut program)?;
        self.load_program(&program)
    }

    /// The current contents of the display
    pub fn frame(&self) -> &FrameBuffer {
        &self.state.frame_buffer
    }

    /// Whether execution is suspended on `Fx0A`
    pub fn awaiting_key(&self) -> bool {
        self.state.register_needing_key.is_some()
    }

    /// Set the pressed status of key
    ///
    /// # Arguments
    /// * `key` the 8-bit representation of the key that was pressed
    pub fn key_press(&mut self, key: u8) {
        let Some(pressed) = self.pressed_keys.get_mut(key as usize) else {
            return;
        };
        *pressed = true;
        if let Some(register) = self.state.register_needing_key.take() {
            debug!("key {:X} released the wait on v{:X}", key, register);
            self.state.v[register as usize] = key;
        }
    }

    /// Unset the pressed status of key
    ///
    /// # Arguments
    /// * `key` the 8-bit representation of the key that was released
    pub fn key_release(&mut self, key: u8) {
        if let Some(pressed) = self.pressed_keys.get_mut(key as usize) {
            *pressed = false;
        }
    }

    /// Advances the CPU by a single cycle
    /// - does nothing while awaiting a keypress
    /// - gets and executes the next opcode
    ///
    /// A failed cycle leaves the state as it was before the cycle.
    pub fn step(&mut self) -> Result<Cycle> {
        if self.awaiting_key() {
            return Ok(Cycle::AwaitingKey);
        }
        let address = self.state.pc;
        let op = self.state.memory.fetch(address)?;
        trace!(
            "{:04X} v{:02X?} i{:04X} pc{:04X}",
            op,
            self.state.v,
            self.state.i,
            address
        );
        let operation = from_op(&op).ok_or(Error::UnrecognisedOpcode {
            opcode: op,
            address,
        })?;

        // The stack is left out of the snapshot; one cycle moves it by at most one entry
        let stack = mem::take(&mut self.state.stack);
        let snapshot = self.state.clone();
        self.state.stack = stack;
        let depth = self.state.stack.len();
        let top = self.state.stack.last().copied();

        let mut ctx = Context {
            pressed_keys: &self.pressed_keys,
            rng: &mut self.rng,
            quirks: self.config.quirks,
        };
        let cycle = operation(&op, &mut self.state, &mut ctx)?;

        let change = match (self.state.stack.len().cmp(&depth), top) {
            (Ordering::Greater, _) => StackChange::Pushed,
            (Ordering::Less, Some(popped)) => StackChange::Popped(popped),
            _ => StackChange::Unchanged,
        };
        self.save_state(snapshot, change);
        Ok(cycle)
    }

    /// Reverses the CPU by a single cycle if possible
    /// - if there are previous_states, pops the last one and restores it
    /// - the call stack is rolled back by undoing that cycle's push or pop
    ///
    /// Returns whether anything was restored.
    pub fn reverse_cpu(&mut self) -> bool {
        let Some(Snapshot { mut state, stack }) = self.previous_states.pop_front() else {
            return false;
        };
        let mut call_stack = mem::take(&mut self.state.stack);
        match stack {
            StackChange::Unchanged => {}
            StackChange::Pushed => {
                call_stack.pop();
            }
            StackChange::Popped(address) => call_stack.push(address),
        }
        state.stack = call_stack;
        self.state = state;
        true
    }

    /// Puts a state in previous_states
    /// - if there are already MAX_SAVED_STATES saved then the oldest is dropped
    ///
    /// # Arguments
    /// * `state` the state before a cycle, with an empty call stack
    /// * `stack` what that cycle did to the call stack
    fn save_state(&mut self, state: State, stack: StackChange) {
        if self.previous_states.len() == MAX_SAVED_STATES {
            self.previous_states.pop_back();
        }
        self.previous_states.push_front(Snapshot { state, stack });
    }

    /// Counts both timers down by one; called once per 60Hz frame.
    /// Returns whether a tone should sound.
    pub fn tick_timers(&mut self) -> bool {
        let beep = self.state.tick_timers();
        if beep {
            debug!("sound timer expired");
        }
        beep
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chip8_with(program: &[u8]) -> Chip8 {
        let mut chip8 = Chip8::with_seed(Config::default(), 0);
        chip8.load_program(program).unwrap();
        chip8
    }

    #[test]
    fn test_cycles_while_no_register_needs_key() {
        // insert a cls opcode so there's something to run
        let mut chip8 = chip8_with(&[0x00, 0xE0]);
        let starting_pc = chip8.state.pc;
        assert_eq!(chip8.step().unwrap(), Cycle::Redraw);
        assert_eq!(chip8.state.pc, starting_pc + 0x2);
    }

    #[test]
    fn test_captures_key_presses() {
        let mut chip8 = Chip8::default();
        chip8.state.register_needing_key = Some(0x1);
        chip8.key_press(0xE);
        assert_eq!(chip8.state.register_needing_key, None);
        assert_eq!(chip8.state.v[0x1], 0xE);
        assert!(chip8.pressed_keys[0xE]);
    }

    #[test]
    fn test_releases_keys() {
        let mut chip8 = Chip8::default();
        chip8.key_press(0x3);
        chip8.key_release(0x3);
        assert!(!chip8.pressed_keys[0x3]);
    }

    #[test]
    fn test_ignores_unknown_keys() {
        let mut chip8 = Chip8::default();
        chip8.state.register_needing_key = Some(0x1);
        chip8.key_press(0x10);
        assert_eq!(chip8.state.register_needing_key, Some(0x1));
    }

    #[test]
    fn test_doesnt_cycle_while_register_needs_key() {
        let mut chip8 = chip8_with(&[0x00, 0xE0]);
        let starting_pc = chip8.state.pc;
        chip8.state.register_needing_key = Some(0x1);
        assert_eq!(chip8.step().unwrap(), Cycle::AwaitingKey);
        assert_eq!(chip8.state.pc, starting_pc);
    }

    #[test]
    fn test_wait_for_key_resumes() {
        // F30A; 7301
        let mut chip8 = chip8_with(&[0xF3, 0x0A, 0x73, 0x01]);
        assert_eq!(chip8.step().unwrap(), Cycle::AwaitingKey);
        assert_eq!(chip8.step().unwrap(), Cycle::AwaitingKey);
        chip8.key_press(0x7);
        assert_eq!(chip8.step().unwrap(), Cycle::Ran);
        assert_eq!(chip8.state.v[0x3], 0x8);
    }

    #[test]
    fn test_unrecognised_opcode_reports_address() {
        let mut chip8 = chip8_with(&[0x00, 0xE0, 0x51, 0x21]);
        chip8.step().unwrap();
        match chip8.step() {
            Err(Error::UnrecognisedOpcode { opcode, address }) => {
                assert_eq!(opcode, 0x5121);
                assert_eq!(address, 0x202);
            }
            other => panic!("expected UnrecognisedOpcode but got {:?}", other),
        }
    }

    #[test]
    fn test_fetch_past_memory_fails() {
        // BFFF jumps to 0xFFF + V0
        let mut chip8 = chip8_with(&[0xBF, 0xFF]);
        chip8.step().unwrap();
        assert_eq!(chip8.state.pc, 0xFFF);
        assert!(matches!(chip8.step(), Err(Error::OutOfBoundsFetch { pc: 0xFFF })));
    }

    #[test]
    fn test_failed_cycle_isnt_saved() {
        let mut chip8 = chip8_with(&[0x00, 0xEE]);
        assert!(chip8.step().is_err());
        assert!(chip8.previous_states.is_empty());
    }

    #[test]
    fn test_load_rom_reads_everything() {
        let mut chip8 = Chip8::default();
        let mut rom: &[u8] = &[0x12, 0x00, 0xAB];
        chip8.load_rom(&mut rom).unwrap();
        assert_eq!(chip8.state.memory[0x200..0x203], [0x12, 0x00, 0xAB]);
    }

    #[test]
    fn test_reverse_restores_previous_state() {
        // 6005; 7001
        let mut chip8 = chip8_with(&[0x60, 0x05, 0x70, 0x01]);
        chip8.step().unwrap();
        chip8.step().unwrap();
        assert_eq!(chip8.state.v[0x0], 0x6);
        assert!(chip8.reverse_cpu());
        assert_eq!(chip8.state.v[0x0], 0x5);
        assert_eq!(chip8.state.pc, 0x202);
        assert!(chip8.reverse_cpu());
        assert_eq!(chip8.state.pc, 0x200);
        assert!(!chip8.reverse_cpu());
    }

    #[test]
    fn test_chip8_saves_state() {
        let mut chip8 = Chip8::default();
        chip8.save_state(State::new(), StackChange::Unchanged);
        assert_eq!(chip8.previous_states.len(), 1);
    }

    #[test]
    fn test_chip8_drops_old_saved_states() {
        let mut chip8 = Chip8::default();
        for _ in 0..MAX_SAVED_STATES {
            chip8.save_state(State::new(), StackChange::Unchanged);
        }
        assert_eq!(MAX_SAVED_STATES, chip8.previous_states.len());
        chip8.save_state(State::new(), StackChange::Unchanged);
        assert_eq!(MAX_SAVED_STATES, chip8.previous_states.len());
    }

    #[test]
    fn test_history_doesnt_copy_the_call_stack() {
        // 2200 calls itself forever
        let mut chip8 = chip8_with(&[0x22, 0x00]);
        for _ in 0..5000 {
            chip8.step().unwrap();
        }
        assert_eq!(chip8.state.stack.len(), 5000);
        assert_eq!(chip8.previous_states.len(), MAX_SAVED_STATES);
        let retained: usize = chip8
            .previous_states
            .iter()
            .map(|snapshot| snapshot.state.stack.len())
            .sum();
        assert_eq!(retained, 0);
    }

    #[test]
    fn test_reverse_unwinds_deep_recursion() {
        let mut chip8 = chip8_with(&[0x22, 0x00]);
        for _ in 0..1000 {
            chip8.step().unwrap();
        }
        for _ in 0..MAX_SAVED_STATES {
            assert!(chip8.reverse_cpu());
        }
        assert!(!chip8.reverse_cpu());
        assert_eq!(chip8.state.stack.len(), 1000 - MAX_SAVED_STATES);
        assert!(chip8.state.stack.iter().all(|&address| address == 0x202));
        assert_eq!(chip8.state.pc, 0x200);
    }

    #[test]
    fn test_reverse_restores_popped_return_address() {
        // 2204; 0000; 00EE
        let mut chip8 = chip8_with(&[0x22, 0x04, 0x00, 0x00, 0x00, 0xEE]);
        chip8.step().unwrap();
        assert_eq!(chip8.state.stack, [0x202]);
        chip8.step().unwrap();
        assert!(chip8.state.stack.is_empty());
        assert_eq!(chip8.state.pc, 0x202);

        assert!(chip8.reverse_cpu());
        assert_eq!(chip8.state.stack, [0x202]);
        assert_eq!(chip8.state.pc, 0x204);
        assert!(chip8.reverse_cpu());
        assert!(chip8.state.stack.is_empty());
        assert_eq!(chip8.state.pc, 0x200);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        // C0FF
        let mut a = chip8_with(&[0xC0, 0xFF]);
        let mut b = chip8_with(&[0xC0, 0xFF]);
        a.step().unwrap();
        b.step().unwrap();
        assert_eq!(a.state.v[0x0], b.state.v[0x0]);
    }
}
