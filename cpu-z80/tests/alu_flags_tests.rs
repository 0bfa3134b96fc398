//! Flag behaviour of the 8-bit ALU as observed through executed
//! instructions, including the undocumented X and Y bits.

mod common;

use common::{cpu_with_program, run_until_halt, step};
use cpu_z80::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};

#[test]
fn add_copies_xy_from_result() {
    // LD A,0x28; ADD A,A -> 0x50: Y set from bit 5, H from the nibble carry.
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0x3E, 0x28, 0x87, 0x76]);
    run_until_halt(&mut cpu, &mut bus);

    assert_eq!(cpu.regs().a, 0x50);
    let f = cpu.regs().f;
    assert_ne!(f & YF, 0, "Y from result bit 5");
    assert_eq!(f & XF, 0, "X from result bit 3");
    assert_ne!(f & HF, 0, "8+8 carries out of bit 3");
    assert_eq!(f & (SF | ZF | PF | NF | CF), 0);
}

#[test]
fn cp_takes_xy_from_operand() {
    // LD A,0x20; CP 0x08
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0x3E, 0x20, 0xFE, 0x08, 0x76]);
    run_until_halt(&mut cpu, &mut bus);

    let f = cpu.regs().f;
    assert_ne!(f & NF, 0);
    assert_eq!(f & ZF, 0);
    assert_eq!(f & CF, 0);
    assert_eq!(f & HF, 0);
    assert_ne!(f & XF, 0, "X from operand bit 3, not result");
    assert_eq!(f & YF, 0, "Y from operand bit 5, not result");
}

#[test]
fn inc_preserves_carry() {
    // LD A,0xFF; SCF; INC A
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0x3E, 0xFF, 0x37, 0x3C, 0x76]);
    run_until_halt(&mut cpu, &mut bus);

    assert_eq!(cpu.regs().a, 0x00);
    let f = cpu.regs().f;
    assert_ne!(f & ZF, 0);
    assert_ne!(f & HF, 0);
    assert_ne!(f & CF, 0, "INC must not touch C");
    assert_eq!(f & NF, 0);
}

#[test]
fn dec_preserves_carry_and_sets_n() {
    // SCF; DEC B with B=0
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0x37, 0x05, 0x76]);
    cpu.regs_mut().b = 0x00;
    run_until_halt(&mut cpu, &mut bus);

    assert_eq!(cpu.regs().b, 0xFF);
    let f = cpu.regs().f;
    assert_ne!(f & NF, 0);
    assert_ne!(f & HF, 0);
    assert_ne!(f & CF, 0, "DEC must not touch C");
    assert_ne!(f & SF, 0);
}

#[test]
fn and_sets_h_or_xor_clear_it() {
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0x3E, 0x0F, 0xE6, 0x0F, 0x76]); // AND 0x0F
    run_until_halt(&mut cpu, &mut bus);
    assert_ne!(cpu.regs().f & HF, 0, "AND sets H");
    assert_eq!(cpu.regs().f & (NF | CF), 0);

    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0x3E, 0x0F, 0xF6, 0xF0, 0x76]); // OR 0xF0
    run_until_halt(&mut cpu, &mut bus);
    assert_eq!(cpu.regs().f & HF, 0, "OR clears H");
    assert_ne!(cpu.regs().f & PF, 0, "0xFF has even parity");

    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0x3E, 0xFF, 0xEE, 0xFF, 0x76]); // XOR 0xFF
    run_until_halt(&mut cpu, &mut bus);
    assert_eq!(cpu.regs().a, 0x00);
    assert_ne!(cpu.regs().f & ZF, 0);
    assert_eq!(cpu.regs().f & HF, 0, "XOR clears H");
}

#[test]
fn accumulator_rotates_preserve_s_z_pv() {
    // XOR A (Z=1, PV=1); RLCA with A=0 keeps Z and PV.
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0xAF, 0x07, 0x76]);
    run_until_halt(&mut cpu, &mut bus);
    let f = cpu.regs().f;
    assert_ne!(f & ZF, 0, "RLCA preserves Z");
    assert_ne!(f & PF, 0, "RLCA preserves PV");
    assert_eq!(f & (HF | NF | CF), 0);

    // RRA shifts the carry into bit 7 and preserves S/Z/PV.
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0xAF, 0x37, 0x1F, 0x76]); // XOR A; SCF; RRA
    run_until_halt(&mut cpu, &mut bus);
    assert_eq!(cpu.regs().a, 0x80);
    let f = cpu.regs().f;
    assert_ne!(f & ZF, 0, "Z still reflects the XOR, not the rotate");
    assert_eq!(f & CF, 0, "bit 0 of 0x00 shifted out");
}

#[test]
fn scf_ccf_cpl_take_xy_from_a() {
    // LD A,0x28; SCF; then CCF; then CPL.
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0x3E, 0x28, 0x37, 0x3F, 0x2F, 0x76]);

    step(&mut cpu, &mut bus); // LD A,0x28
    step(&mut cpu, &mut bus); // SCF
    let f = cpu.regs().f;
    assert_ne!(f & CF, 0);
    assert_eq!(f & (HF | NF), 0);
    assert_ne!(f & XF, 0, "SCF X from A");
    assert_ne!(f & YF, 0, "SCF Y from A");

    step(&mut cpu, &mut bus); // CCF
    let f = cpu.regs().f;
    assert_eq!(f & CF, 0, "CCF inverts carry");
    assert_ne!(f & HF, 0, "CCF moves old carry into H");
    assert_ne!(f & XF, 0, "CCF X from A");
    assert_ne!(f & YF, 0, "CCF Y from A");

    step(&mut cpu, &mut bus); // CPL
    let a = cpu.regs().a;
    assert_eq!(a, 0xD7);
    let f = cpu.regs().f;
    assert_ne!(f & (HF | NF), 0);
    assert_eq!(f & XF != 0, a & XF != 0, "CPL X from new A");
    assert_eq!(f & YF != 0, a & YF != 0, "CPL Y from new A");
}

#[test]
fn neg_of_a() {
    // LD A,1; NEG
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0x3E, 0x01, 0xED, 0x44, 0x76]);
    run_until_halt(&mut cpu, &mut bus);
    assert_eq!(cpu.regs().a, 0xFF);
    let f = cpu.regs().f;
    assert_ne!(f & NF, 0);
    assert_ne!(f & CF, 0, "C set when A was non-zero");
    assert_eq!(f & PF, 0);
}

#[test]
fn daa_corrects_bcd_addition() {
    // LD A,0x15; ADD A,0x27; DAA -> 0x42
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0x3E, 0x15, 0xC6, 0x27, 0x27, 0x76]);
    run_until_halt(&mut cpu, &mut bus);
    assert_eq!(cpu.regs().a, 0x42);
    assert_eq!(cpu.regs().f & CF, 0);
}

#[test]
fn daa_corrects_bcd_subtraction() {
    // LD A,0x42; SUB 0x15; DAA -> 0x27, N preserved.
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0x3E, 0x42, 0xD6, 0x15, 0x27, 0x76]);
    run_until_halt(&mut cpu, &mut bus);
    assert_eq!(cpu.regs().a, 0x27);
    assert_ne!(cpu.regs().f & NF, 0);
}

#[test]
fn daa_wraps_past_99_with_carry() {
    // LD A,0x99; ADD A,0x02; DAA -> 0x01 with carry.
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0x3E, 0x99, 0xC6, 0x02, 0x27, 0x76]);
    run_until_halt(&mut cpu, &mut bus);
    assert_eq!(cpu.regs().a, 0x01);
    assert_ne!(cpu.regs().f & CF, 0);
}

#[test]
fn sll_through_cb_page() {
    // LD B,0x80; SLL B (CB 30) -> 0x01, carry out.
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0x06, 0x80, 0xCB, 0x30, 0x76]);
    run_until_halt(&mut cpu, &mut bus);
    assert_eq!(cpu.regs().b, 0x01);
    assert_ne!(cpu.regs().f & CF, 0);
    assert_eq!(cpu.regs().f & ZF, 0);
}

#[test]
fn rrd_exchanges_nibbles() {
    // LD HL,0x4000; RRD with A=0x84, (HL)=0x20 -> A=0x80, (HL)=0x42.
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0x21, 0x00, 0x40, 0xED, 0x67, 0x76]);
    cpu.regs_mut().a = 0x84;
    bus.load(0x4000, &[0x20]);
    run_until_halt(&mut cpu, &mut bus);
    assert_eq!(cpu.regs().a, 0x80);
    assert_eq!(bus.peek(0x4000), 0x42);
    assert_eq!(cpu.regs().wz, 0x4001, "WZ = HL+1");
    assert_ne!(cpu.regs().f & SF, 0);
    assert_eq!(cpu.regs().f & (HF | NF), 0);
}

#[test]
fn rld_exchanges_nibbles() {
    // RLD with A=0x7A, (HL)=0x31 -> A=0x73, (HL)=0x1A.
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0x21, 0x00, 0x40, 0xED, 0x6F, 0x76]);
    cpu.regs_mut().a = 0x7A;
    bus.load(0x4000, &[0x31]);
    run_until_halt(&mut cpu, &mut bus);
    assert_eq!(cpu.regs().a, 0x73);
    assert_eq!(bus.peek(0x4000), 0x1A);
}

#[test]
fn bit_on_register_and_memory() {
    // LD HL,0x8000; LD (HL),0x0F; BIT 7,(HL): Z set, H set.
    let (mut cpu, mut bus) =
        cpu_with_program(0x0000, &[0x21, 0x00, 0x80, 0x36, 0x0F, 0xCB, 0x7E, 0x76]);
    run_until_halt(&mut cpu, &mut bus);
    let f = cpu.regs().f;
    assert_ne!(f & ZF, 0, "bit 7 of 0x0F is clear");
    assert_ne!(f & PF, 0, "PV mirrors Z for BIT");
    assert_ne!(f & HF, 0);
    assert_eq!(f & NF, 0);

    // BIT 0,B with bit set: Z clear; X/Y from the operand.
    let (mut cpu, mut bus) = cpu_with_program(0x0000, &[0x06, 0x29, 0xCB, 0x40, 0x76]);
    run_until_halt(&mut cpu, &mut bus);
    let f = cpu.regs().f;
    assert_eq!(f & ZF, 0);
    assert_ne!(f & XF, 0, "X from operand");
    assert_ne!(f & YF, 0, "Y from operand");
}

#[test]
fn res_and_set_on_memory() {
    let (mut cpu, mut bus) = cpu_with_program(
        0x0000,
        &[
            0x21, 0x00, 0x80, // LD HL,0x8000
            0x36, 0xFF, // LD (HL),0xFF
            0xCB, 0xBE, // RES 7,(HL)
            0xCB, 0xC6, // SET 0,(HL) (already set, no-op)
            0x76,
        ],
    );
    run_until_halt(&mut cpu, &mut bus);
    assert_eq!(bus.peek(0x8000), 0x7F);
}
