//! ZX Spectrum 48K system emulation.
//!
//! Wires the Z80 core to the Spectrum's memory map, ULA port, keyboard
//! matrix and 50 Hz frame interrupt, with wall-clock pacing for real-time
//! running. Memory contention and the floating bus are not modeled.

mod timing;

pub use timing::{FrameEvent, FrameTimer, TimingController, TimingStats};

use cpu_z80::Z80;
use retro_core::{Bus, IoBus};
use thiserror::Error;

/// 16 KB ROM at 0x0000-0x3FFF.
pub const ROM_SIZE: usize = 0x4000;
/// 48 KB RAM at 0x4000-0xFFFF.
pub const RAM_SIZE: usize = 0xC000;
/// Bitmap plus attribute screen memory, starting at 0x4000.
pub const SCREEN_SIZE: usize = 0x1B00;

#[derive(Debug, Error)]
pub enum SpectrumError {
    #[error("ROM image must be exactly {expected} bytes, got {actual}")]
    RomSize { expected: usize, actual: usize },
}

/// Spectrum memory map and ULA state behind the bus traits.
pub struct SpectrumBus {
    rom: Box<[u8; ROM_SIZE]>,
    ram: Box<[u8; RAM_SIZE]>,
    /// Keyboard matrix: 8 rows of 5 active-low key bits.
    keyboard: [u8; 8],
    border: u8,
    speaker: bool,
    tape_in: bool,
}

impl SpectrumBus {
    fn new() -> Self {
        Self {
            rom: Box::new([0; ROM_SIZE]),
            ram: Box::new([0; RAM_SIZE]),
            keyboard: [0x1F; 8],
            border: 0,
            speaker: false,
            tape_in: false,
        }
    }
}

impl Bus for SpectrumBus {
    fn read(&mut self, address: u16) -> u8 {
        if address < 0x4000 {
            self.rom[address as usize]
        } else {
            self.ram[(address - 0x4000) as usize]
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        // Writes to the ROM region are ignored.
        if address >= 0x4000 {
            self.ram[(address - 0x4000) as usize] = value;
        }
    }
}

impl IoBus for SpectrumBus {
    fn read_io(&mut self, port: u16) -> u8 {
        // ULA port: any address with A0 low.
        if port & 0x01 == 0 {
            // Each low bit among A15..A8 selects a keyboard row; selected
            // rows are ANDed together (keys read active-low).
            let mut result = 0x1F;
            for row in 0..8 {
                if port & (1 << (row + 8)) == 0 {
                    result &= self.keyboard[row];
                }
            }
            if self.tape_in {
                result |= 0x40;
            }
            return result;
        }

        // Kempston joystick, no input.
        if port & 0xFF == 0x1F {
            return 0x00;
        }

        0xFF
    }

    fn write_io(&mut self, port: u16, value: u8) {
        if port & 0x01 == 0 {
            self.border = value & 0x07;
            self.speaker = value & 0x10 != 0;
        }
    }
}

/// A ZX Spectrum 48K.
pub struct Spectrum {
    cpu: Z80,
    bus: SpectrumBus,
    timing: TimingController,
    frame: FrameTimer,
    int_pulse: bool,
}

impl Spectrum {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cpu: Z80::new(),
            bus: SpectrumBus::new(),
            timing: TimingController::spectrum(),
            frame: FrameTimer::spectrum(),
            int_pulse: false,
        }
    }

    /// Load the 16 KB system ROM.
    pub fn load_rom(&mut self, data: &[u8]) -> Result<(), SpectrumError> {
        if data.len() != ROM_SIZE {
            return Err(SpectrumError::RomSize {
                expected: ROM_SIZE,
                actual: data.len(),
            });
        }
        self.bus.rom.copy_from_slice(data);
        log::info!("loaded {} byte ROM image", data.len());
        Ok(())
    }

    /// Poke a program into memory. Bytes landing in the ROM region are
    /// dropped, like any other write.
    pub fn load_snapshot(&mut self, address: u16, data: &[u8]) {
        if address < 0x4000 {
            log::warn!("snapshot starts at {address:#06X}, ROM-region bytes are ignored");
        }
        for (i, &byte) in data.iter().enumerate() {
            self.bus.write(address.wrapping_add(i as u16), byte);
        }
    }

    /// Reset the machine.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.bus.border = 0;
        self.frame = FrameTimer::spectrum();
        self.int_pulse = false;
    }

    /// Execute one frame of emulation, then synchronise to the wall clock.
    ///
    /// INT is raised at the start of vertical blank and lowered after the
    /// following step, so a pending interrupt is accepted exactly once.
    pub fn run_frame(&mut self) {
        loop {
            let cycles = self.cpu.step(&mut self.bus);
            if self.int_pulse {
                self.cpu.set_int(false);
                self.int_pulse = false;
            }

            let event = self.frame.add_cycles(cycles);
            if event.vblank_start {
                self.cpu.set_int(true);
                self.int_pulse = true;
            }

            self.timing.add_cycles(cycles);
            if event.frame_complete {
                break;
            }
        }

        self.timing.sync_frame();
    }

    /// Screen memory (bitmap plus attributes).
    #[must_use]
    pub fn screen(&self) -> &[u8] {
        &self.bus.ram[..SCREEN_SIZE]
    }

    #[must_use]
    pub fn border(&self) -> u8 {
        self.bus.border
    }

    #[must_use]
    pub fn speaker(&self) -> bool {
        self.bus.speaker
    }

    pub fn set_tape_in(&mut self, level: bool) {
        self.bus.tape_in = level;
    }

    /// Press a key in the 8x5 matrix.
    pub fn press_key(&mut self, row: u8, col: u8) {
        if row < 8 && col < 5 {
            self.bus.keyboard[row as usize] &= !(1 << col);
        }
    }

    /// Release a key in the 8x5 matrix.
    pub fn release_key(&mut self, row: u8, col: u8) {
        if row < 8 && col < 5 {
            self.bus.keyboard[row as usize] |= 1 << col;
        }
    }

    /// Set the emulation speed multiplier (1.0 = real time).
    pub fn set_speed(&mut self, multiplier: f64) {
        self.timing.set_speed_multiplier(multiplier);
    }

    /// Run without wall-clock pacing.
    pub fn set_unlimited(&mut self, unlimited: bool) {
        self.timing.set_unlimited(unlimited);
    }

    #[must_use]
    pub fn stats(&self) -> TimingStats {
        self.timing.stats()
    }

    #[must_use]
    pub fn cpu(&self) -> &Z80 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Z80 {
        &mut self.cpu
    }

    /// Read memory without bus side effects, for tests and debuggers.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        if address < 0x4000 {
            self.bus.rom[address as usize]
        } else {
            self.bus.ram[(address - 0x4000) as usize]
        }
    }

    /// Step the CPU once against the machine bus.
    pub fn step(&mut self) -> u32 {
        self.cpu.step(&mut self.bus)
    }
}

impl Default for Spectrum {
    fn default() -> Self {
        Self::new()
    }
}
