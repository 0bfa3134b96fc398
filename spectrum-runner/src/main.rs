//! Console ZX Spectrum 48K runner.
//!
//! Loads a 16 KB ROM (or a built-in test loop when none is given), runs
//! frames at 50 Hz with wall-clock pacing, and reports timing statistics.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use machine_spectrum::{Spectrum, ROM_SIZE};

#[derive(Parser)]
#[command(name = "spectrum-runner", about = "ZX Spectrum 48K console runner")]
struct Args {
    /// Path to a 16 KB Spectrum ROM image.
    rom: Option<PathBuf>,

    /// Emulation speed multiplier (1.0 = real time).
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Run as fast as the host allows, ignoring the wall clock.
    #[arg(long)]
    unlimited: bool,

    /// Number of frames to run before reporting.
    #[arg(long, default_value_t = 250)]
    frames: u32,
}

/// A trivial ROM: two NOPs and a jump back, 18 T-states per lap. Lets the
/// runner exercise pacing without a real system ROM.
fn test_rom() -> Vec<u8> {
    let mut rom = vec![0u8; ROM_SIZE];
    rom[0] = 0x00; // NOP
    rom[1] = 0x00; // NOP
    rom[2] = 0xC3; // JP 0x0000
    rom[3] = 0x00;
    rom[4] = 0x00;
    rom
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut spectrum = Spectrum::new();

    let rom = match &args.rom {
        Some(path) => match fs::read(path) {
            Ok(data) => data,
            Err(err) => {
                eprintln!("Failed to read {}: {err}", path.display());
                process::exit(1);
            }
        },
        None => {
            log::info!("no ROM given, using built-in test loop");
            test_rom()
        }
    };

    if let Err(err) = spectrum.load_rom(&rom) {
        eprintln!("Failed to load ROM: {err}");
        process::exit(1);
    }

    spectrum.set_speed(args.speed);
    spectrum.set_unlimited(args.unlimited);
    spectrum.reset();

    println!(
        "Running {} frames at {}x speed{}...",
        args.frames,
        args.speed,
        if args.unlimited { " (unlimited)" } else { "" }
    );

    for _ in 0..args.frames {
        spectrum.run_frame();
    }

    let stats = spectrum.stats();
    println!();
    println!("=== Timing statistics ===");
    println!("Target CPU frequency: {:.0} Hz", stats.target_hz);
    println!("Actual CPU frequency: {:.0} Hz", stats.actual_hz);
    if stats.target_hz > 0.0 {
        println!(
            "Accuracy: {:.2}%",
            stats.actual_hz / stats.target_hz * 100.0
        );
    }
    println!("Frames: {} ({:.2} FPS)", stats.frame_count, stats.frame_rate);
    println!("Total cycles: {}", stats.total_cycles);
    println!("Uptime: {:.2}s", stats.uptime);
}
