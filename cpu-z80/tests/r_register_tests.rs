//! R register semantics: one bump per M1 cycle, bit 7 latched.

mod common;

use common::{cpu_with_program, step, step_n};
use cpu_z80::Z80;
use retro_core::SimpleBus;

#[test]
fn r_advances_once_per_plain_opcode() {
    let program = [0x00u8; 40]; // NOPs
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &program);
    assert_eq!(cpu.regs().r, 0);
    step_n(&mut cpu, &mut bus, 25);
    assert_eq!(cpu.regs().r, 25);
}

#[test]
fn r_advances_twice_per_prefixed_opcode() {
    // CB 00 (RLC B), ED 44 (NEG), DD 09 (ADD IX,BC), FD 29 (ADD IY,IY)
    let (mut cpu, mut bus) =
        cpu_with_program(0x0000, &[0xCB, 0x00, 0xED, 0x44, 0xDD, 0x09, 0xFD, 0x29]);
    step(&mut cpu, &mut bus);
    assert_eq!(cpu.regs().r, 2, "CB pair");
    step(&mut cpu, &mut bus);
    assert_eq!(cpu.regs().r, 4, "ED pair");
    step(&mut cpu, &mut bus);
    assert_eq!(cpu.regs().r, 6, "DD pair");
    step(&mut cpu, &mut bus);
    assert_eq!(cpu.regs().r, 8, "FD pair");
}

#[test]
fn r_advances_twice_for_ddcb() {
    // DD CB 00 46: BIT 0,(IX+0). Displacement and sub-opcode are not M1s.
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0xDD, 0xCB, 0x00, 0x46]);
    step(&mut cpu, &mut bus);
    assert_eq!(cpu.regs().r, 2);
}

#[test]
fn r_gains_an_extra_bump_per_block_repeat() {
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0xED, 0xB0]); // LDIR
    cpu.regs_mut().set_hl(0x4000);
    cpu.regs_mut().set_de(0x5000);
    cpu.regs_mut().set_bc(0x0002);

    step(&mut cpu, &mut bus); // continuing: ED + B0 + refetch bump
    assert_eq!(cpu.regs().r, 3);
    step(&mut cpu, &mut bus); // terminating: ED + B0 only
    assert_eq!(cpu.regs().r, 5);
}

#[test]
fn r_low_seven_bits_wrap() {
    let program = [0x00u8; 200];
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &program);
    cpu.regs_mut().r = 0x7E;
    step_n(&mut cpu, &mut bus, 4);
    assert_eq!(cpu.regs().r, 0x02, "wraps within the low 7 bits");
}

#[test]
fn r_bit_seven_is_latched() {
    let mut bus = SimpleBus::new();
    // LD A,0xFF; LD R,A; then NOPs.
    bus.load(0x0000, &[0x3E, 0xFF, 0xED, 0x4F, 0x00, 0x00, 0x00]);
    let mut cpu = Z80::new();
    cpu.regs_mut().pc = 0x0000;

    cpu.step(&mut bus); // LD A,0xFF
    cpu.step(&mut bus); // LD R,A
    assert_eq!(cpu.regs().r, 0xFF);

    cpu.step(&mut bus); // NOP
    assert_eq!(cpu.regs().r, 0x80, "low bits advance, bit 7 stays");
    cpu.step(&mut bus);
    assert_eq!(cpu.regs().r, 0x81);
}

#[test]
fn ld_a_r_round_trip_sees_post_increment() {
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0xED, 0x5F]); // LD A,R
    cpu.regs_mut().r = 0x10;
    step(&mut cpu, &mut bus);
    assert_eq!(cpu.regs().a, 0x12, "the two prefix M1s land before the read");
}
