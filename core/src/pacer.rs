use std::time::Duration;

use crate::chip8::Chip8;
use crate::constants::FRAME_DURATION;
use crate::error::Result;
use crate::framebuffer::FrameBuffer;
use crate::instruction::Cycle;

/// Something that can show a frame to the user
pub trait Screen {
    fn present(&mut self, frame: &FrameBuffer);
}

/// Something that can make a beep
pub trait Speaker {
    fn beep(&mut self);
}

/// A speaker that never makes a sound
pub struct Mute;

impl Speaker for Mute {
    fn beep(&mut self) {}
}

/// # Pacer
/// Runs the CPU as fast as it's asked to while keeping the timers and the display at 60Hz.
///
/// Wall clock time is accumulated as lag and drained a frame at a time. Each drained frame
/// - presents the frame buffer if any cycle since the last frame changed it
/// - beeps if the sound timer is about to pass through 1
/// - counts both timers down
///
/// Timers only ever advance when lag is drained, so a fast CPU doesn't speed them up and a
/// stalled loop delays them rather than skipping ahead.
#[derive(Debug, Default)]
pub struct Pacer {
    lag: Duration,
    pending_redraw: bool,
}

impl Pacer {
    pub fn new() -> Self {
        Pacer {
            lag: Duration::ZERO,
            pending_redraw: false,
        }
    }

    /// Runs a single CPU cycle, remembering whether the display needs redrawing
    pub fn cycle(&mut self, chip8: &mut Chip8) -> Result<Cycle> {
        let cycle = chip8.step()?;
        if cycle == Cycle::Redraw {
            self.pending_redraw = true;
        }
        Ok(cycle)
    }

    /// Forces the next drained frame to present, e.g. after rewinding
    pub fn request_redraw(&mut self) {
        self.pending_redraw = true;
    }

    pub fn pending_redraw(&self) -> bool {
        self.pending_redraw
    }

    /// Time accumulated but not yet drained
    pub fn lag(&self) -> Duration {
        self.lag
    }

    /// Accumulates `elapsed` wall clock time and drains as many whole frames as it covers.
    /// Returns the number of frames drained.
    ///
    /// # Arguments
    /// * `elapsed` time since the previous call
    /// * `chip8` whose timers are counted down
    /// * `screen` presented to when a redraw is pending
    /// * `speaker` beeped when the sound timer passes through 1
    pub fn advance(
        &mut self,
        elapsed: Duration,
        chip8: &mut Chip8,
        screen: &mut dyn Screen,
        speaker: &mut dyn Speaker,
    ) -> u32 {
        self.drain(elapsed, chip8, screen, Some(speaker))
    }

    /// Like `advance` but the timers stand still, e.g. while rewinding.
    /// Frames are still presented at 60Hz.
    pub fn hold(&mut self, elapsed: Duration, chip8: &mut Chip8, screen: &mut dyn Screen) -> u32 {
        self.drain(elapsed, chip8, screen, None)
    }

    fn drain(
        &mut self,
        elapsed: Duration,
        chip8: &mut Chip8,
        screen: &mut dyn Screen,
        mut speaker: Option<&mut dyn Speaker>,
    ) -> u32 {
        self.lag += elapsed;
        let mut frames = 0;
        while self.lag >= FRAME_DURATION {
            if self.pending_redraw {
                screen.present(chip8.frame());
                self.pending_redraw = false;
            }
            if let Some(speaker) = speaker.as_deref_mut() {
                if chip8.tick_timers() {
                    speaker.beep();
                }
            }
            self.lag -= FRAME_DURATION;
            frames += 1;
        }
        frames
    }
}
