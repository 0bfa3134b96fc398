//! Shared helpers for the integration test suites.

#![allow(dead_code)]

use cpu_z80::Z80;
use retro_core::SimpleBus;

/// Build a CPU and bus with a program loaded and PC pointing at it.
pub fn cpu_with_program(addr: u16, program: &[u8]) -> (Z80, SimpleBus) {
    let mut bus = SimpleBus::new();
    bus.load(addr, program);
    let mut cpu = Z80::new();
    cpu.regs_mut().pc = addr;
    (cpu, bus)
}

/// Run until HALT, returning total cycles (including the HALT itself).
pub fn run_until_halt(cpu: &mut Z80, bus: &mut SimpleBus) -> u64 {
    let mut cycles = 0u64;
    for _ in 0..10_000 {
        if cpu.is_halted() {
            return cycles;
        }
        cycles += u64::from(cpu.step(bus));
    }
    panic!("program did not halt");
}

/// Step once and return the cycles consumed.
pub fn step(cpu: &mut Z80, bus: &mut SimpleBus) -> u32 {
    cpu.step(bus)
}

/// Step N times.
pub fn step_n(cpu: &mut Z80, bus: &mut SimpleBus, n: usize) {
    for _ in 0..n {
        cpu.step(bus);
    }
}
