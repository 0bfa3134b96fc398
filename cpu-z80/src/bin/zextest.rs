//! CP/M harness for running ZEXDOC/ZEXALL Z80 instruction exercisers.
//!
//! Usage:
//!   cargo run -p cpu-z80 --bin zextest --release -- path/to/zexdoc.com
//!
//! The test output is printed in real time so you can watch progress. Every
//! test line must end in "OK"; any "ERROR" line is an emulation bug.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::process;
use std::time::Instant;

use cpu_z80::Z80;
use retro_core::{Bus, IoBus};

/// A minimal CP/M memory/IO implementation for running ZEX tests.
struct CpmBus {
    memory: Box<[u8; 65536]>,
}

impl CpmBus {
    fn new() -> Self {
        let mut memory = Box::new([0u8; 65536]);

        // At 0x0000: JP 0x0000 (warm boot trap - infinite loop we detect)
        memory[0x0000] = 0xC3;
        memory[0x0001] = 0x00;
        memory[0x0002] = 0x00;

        // At 0x0005: JP 0x0005 (BDOS entry - we intercept before this executes)
        memory[0x0005] = 0xC3;
        memory[0x0006] = 0x05;
        memory[0x0007] = 0x00;

        Self { memory }
    }

    fn load_com(&mut self, data: &[u8]) {
        // CP/M COM files load at 0x0100
        let start = 0x0100;
        for (i, &byte) in data.iter().enumerate() {
            if start + i < 65536 {
                self.memory[start + i] = byte;
            }
        }
    }
}

impl Bus for CpmBus {
    fn read(&mut self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.memory[address as usize] = value;
    }
}

impl IoBus for CpmBus {
    fn read_io(&mut self, _port: u16) -> u8 {
        0xFF
    }

    fn write_io(&mut self, _port: u16, _value: u8) {}
}

/// Handle a CP/M BDOS call. Returns true if the program is done.
fn handle_bdos(cpu: &mut Z80, bus: &CpmBus) -> bool {
    match cpu.c() {
        0 => {
            // System reset
            return true;
        }
        2 => {
            // Console output - character in E
            print!("{}", cpu.e() as char);
            io::stdout().flush().ok();
        }
        6 => {
            // Direct console I/O
            let e = cpu.e();
            if e == 0xFF {
                cpu.regs_mut().a = 0x00; // no key ready
            } else if e == 0x00 {
                cpu.regs_mut().a = 0x0D; // fake Enter
            } else {
                print!("{}", e as char);
                io::stdout().flush().ok();
            }
        }
        9 => {
            // Print string - DE points to $-terminated string
            let mut addr = cpu.de();
            loop {
                let ch = bus.memory[addr as usize];
                if ch == b'$' {
                    break;
                }
                print!("{}", ch as char);
                addr = addr.wrapping_add(1);
            }
            io::stdout().flush().ok();
        }
        _ => {}
    }

    false
}

fn run_test(name: &str, image: &[u8]) {
    let mut cpu = Z80::new();
    let mut bus = CpmBus::new();

    bus.load_com(image);

    // CP/M program layout: PC at the COM load address, stack high, a
    // return address of 0x0000 on the stack so a final RET warm-boots.
    cpu.regs_mut().pc = 0x0100;
    cpu.regs_mut().sp = 0xF000;
    let sp = cpu.regs().sp.wrapping_sub(2);
    cpu.regs_mut().sp = sp;
    bus.write(sp, 0x00);
    bus.write(sp.wrapping_add(1), 0x00);

    let start_time = Instant::now();
    let mut instructions: u64 = 0;
    let mut cycles: u64 = 0;

    let report_interval = 100_000_000u64;
    let mut next_report = report_interval;

    eprintln!("Running {name}...\n");

    loop {
        if cpu.pc() == 0x0005 {
            if handle_bdos(&mut cpu, &bus) {
                break;
            }
            cpu.force_ret(&mut bus);
            continue;
        }

        if cpu.pc() == 0x0000 || cpu.is_halted() {
            break;
        }

        cycles += u64::from(cpu.step(&mut bus));
        instructions += 1;

        if instructions >= next_report {
            let elapsed = start_time.elapsed().as_secs_f64();
            let mips = instructions as f64 / elapsed / 1_000_000.0;
            eprint!(
                "\r[{:.1}s] {:>6.2}B instructions, {:.1} MIPS",
                elapsed,
                instructions as f64 / 1_000_000_000.0,
                mips
            );
            io::stderr().flush().ok();
            next_report += report_interval;
        }
    }

    let elapsed = start_time.elapsed();
    eprintln!("\n\nCompleted in {:.2}s", elapsed.as_secs_f64());
    eprintln!(
        "Instructions: {} ({:.2}B)",
        instructions,
        instructions as f64 / 1_000_000_000.0
    );
    eprintln!("Cycles: {cycles}");
    eprintln!(
        "Speed: {:.1} MIPS",
        instructions as f64 / elapsed.as_secs_f64() / 1_000_000.0
    );
}

fn main() {
    let path = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: zextest <path-to-zexdoc.com-or-zexall.com>");
        process::exit(1);
    });

    let image = fs::read(&path).unwrap_or_else(|err| {
        eprintln!("Failed to read {path}: {err}");
        process::exit(1);
    });

    run_test(&path, &image);
}
