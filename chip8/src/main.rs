use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

mod audio;
mod keymap;
mod run;

/// Runs a Chip-8 ROM in an SDL2 window.
///
/// Hold Space to fast forward and Escape to rewind.
#[derive(Debug, Parser)]
#[command(name = "chip8", version)]
pub struct Args {
    /// ROM image to run
    #[arg(value_name = "ROM")]
    pub rom: PathBuf,

    /// Shift Vx in place for 8xy6/8xyE and leave I alone after Fx55/Fx65
    #[arg(long)]
    pub quirks: bool,

    /// Width and height in window pixels of each Chip-8 pixel
    #[arg(long, default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..=64))]
    pub scale: u32,

    /// Seed for Cxnn's random numbers, for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run::run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
