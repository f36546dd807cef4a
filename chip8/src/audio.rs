use std::time::Duration;

use log::warn;
use sdl2::audio::{AudioQueue, AudioSpecDesired};

use emu8_core::Speaker;

const SAMPLE_RATE: i32 = 44_100;
const PITCH: i32 = 440;
const VOLUME: i16 = 2_000;
const BEEP_LENGTH: Duration = Duration::from_millis(100);

/// # Beeper
/// Plays a short square wave through an SDL2 audio queue each time it's asked to beep.
/// Queued tones play out in the background so beeping never stalls the emulator.
pub struct Beeper {
    queue: AudioQueue<i16>,
    tone: Vec<i16>,
}

impl Beeper {
    pub fn new(sdl: &sdl2::Sdl) -> Result<Self, String> {
        let audio = sdl.audio()?;
        let desired = AudioSpecDesired {
            freq: Some(SAMPLE_RATE),
            channels: Some(1),
            samples: None,
        };
        let queue = audio.open_queue::<i16, _>(None, &desired)?;
        let tone = square_wave(queue.spec().freq, PITCH, BEEP_LENGTH);
        queue.resume();
        Ok(Beeper { queue, tone })
    }
}

impl Speaker for Beeper {
    fn beep(&mut self) {
        if let Err(e) = self.queue.queue_audio(&self.tone) {
            warn!("failed to queue tone: {}", e);
        }
    }
}

/// Mono samples of a square wave at `pitch` Hz lasting `length`
fn square_wave(sample_rate: i32, pitch: i32, length: Duration) -> Vec<i16> {
    let count = (sample_rate as u128 * length.as_millis() / 1000) as usize;
    let period = (sample_rate / pitch).max(2) as usize;
    (0..count)
        .map(|i| if i % period < period / 2 { VOLUME } else { -VOLUME })
        .collect()
}
