use std::fs::File;
use std::io::BufReader;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use log::{info, warn};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;

use display::Display;
use emu8_core::{Chip8, Config, Mute, Pacer, Speaker};

use crate::audio::Beeper;
use crate::keymap::keymap;
use crate::Args;

/// How long the loop yields between cycles unless fast forwarding
const YIELD: Duration = Duration::from_millis(2);

pub fn run(args: &Args) -> anyhow::Result<()> {
    let config = Config {
        quirks: args.quirks,
    };
    let mut chip8 = match args.seed {
        Some(seed) => Chip8::with_seed(config, seed),
        None => Chip8::new(config),
    };

    // Load ROM
    let file = File::open(&args.rom)
        .with_context(|| format!("unable to open {}", args.rom.display()))?;
    let mut reader = BufReader::new(file);
    chip8
        .load_rom(&mut reader)
        .with_context(|| format!("unable to load {}", args.rom.display()))?;

    // Get SDL2 context
    let sdl = sdl2::init().map_err(|e| anyhow!("unable to initialise SDL2: {}", e))?;
    let mut display = Display::new(&sdl, args.scale)
        .map_err(|e| anyhow!("unable to open a window: {}", e))?;
    let mut speaker: Box<dyn Speaker> = match Beeper::new(&sdl) {
        Ok(beeper) => Box::new(beeper),
        Err(e) => {
            warn!("audio unavailable, running muted: {}", e);
            Box::new(Mute)
        }
    };
    let mut events = sdl
        .event_pump()
        .map_err(|e| anyhow!("unable to read input events: {}", e))?;

    let mut pacer = Pacer::new();
    pacer.request_redraw();
    let mut last_cycle = Instant::now();

    // Whether or not to yield between cycles
    let mut fast_forward = false;
    // Whether the game's state should be cycled forwards or backwards
    let mut rewind = false;

    'event: loop {
        // Handle input
        for event in events.poll_iter() {
            match event {
                Event::Quit { .. } => break 'event,
                Event::KeyDown {
                    keycode: Some(key), ..
                } => match (key, keymap(key)) {
                    (_, Some(kc)) => chip8.key_press(kc),
                    (Keycode::Space, _) => fast_forward = true,
                    (Keycode::Escape, _) => rewind = true,
                    _ => continue,
                },
                Event::KeyUp {
                    keycode: Some(key), ..
                } => match (key, keymap(key)) {
                    (_, Some(kc)) => chip8.key_release(kc),
                    (Keycode::Space, _) => fast_forward = false,
                    (Keycode::Escape, _) => rewind = false,
                    _ => continue,
                },
                _ => continue,
            };
        }

        // Update state; timers only run forwards
        let current_time = Instant::now();
        let elapsed = current_time - last_cycle;
        last_cycle = current_time;
        if rewind {
            if chip8.reverse_cpu() {
                pacer.request_redraw();
            }
            pacer.hold(elapsed, &mut chip8, &mut display);
        } else {
            pacer.cycle(&mut chip8).with_context(|| {
                format!("emulation halted at PC {:#05X}", chip8.state().pc)
            })?;
            pacer.advance(elapsed, &mut chip8, &mut display, speaker.as_mut());
        }

        // Yield unless fast forwarding
        if !fast_forward {
            std::thread::sleep(YIELD);
        }
    }

    info!("window closed, exiting");
    Ok(())
}
