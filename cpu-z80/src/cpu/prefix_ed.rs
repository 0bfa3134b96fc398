//! ED-prefixed instructions: extended loads, 16-bit ALU, interrupt
//! control, rotate-digit, and the sixteen block operations.

use retro_core::IoBus;

use super::Z80;
use crate::alu;
use crate::flags::{parity, sz53, sz53p, CF, HF, NF, PF, SF, XF, YF, ZF};

impl Z80 {
    pub(crate) fn execute_ed<B: IoBus>(&mut self, bus: &mut B) -> u32 {
        let opcode = self.fetch_opcode(bus);
        let x = opcode >> 6;
        let y = (opcode >> 3) & 7;
        let z = opcode & 7;
        let p = y >> 1;
        let q = y & 1;

        match x {
            1 => match z {
                // IN r,(C); y=6 is the undocumented IN (C), flags only.
                0 => {
                    let bc = self.regs.bc();
                    let value = bus.read_io(bc);
                    if y != 6 {
                        self.set_reg8(y, value);
                    }
                    self.regs.f = (self.regs.f & CF) | sz53p(value);
                    self.regs.wz = bc.wrapping_add(1);
                    12
                }

                // OUT (C),r; y=6 is the undocumented OUT (C),0.
                1 => {
                    let value = if y == 6 { 0 } else { self.reg8(y) };
                    let bc = self.regs.bc();
                    bus.write_io(bc, value);
                    self.regs.wz = bc.wrapping_add(1);
                    12
                }

                // SBC HL,rp / ADC HL,rp
                2 => {
                    let hl = self.regs.hl();
                    let operand = self.rp(p);
                    let carry = self.regs.f & CF != 0;
                    let (value, flags) = if q == 0 {
                        alu::sbc16(hl, operand, carry)
                    } else {
                        alu::adc16(hl, operand, carry)
                    };
                    self.regs.set_hl(value);
                    self.regs.f = flags;
                    self.regs.wz = hl.wrapping_add(1);
                    15
                }

                // LD (nn),rp / LD rp,(nn)
                3 => {
                    let addr = self.fetch_word(bus);
                    if q == 0 {
                        let value = self.rp(p);
                        self.write_word(bus, addr, value);
                    } else {
                        let value = self.read_word(bus, addr);
                        self.set_rp(p, value);
                    }
                    self.regs.wz = addr.wrapping_add(1);
                    20
                }

                // NEG, duplicated across every y.
                4 => {
                    let r = alu::neg(self.regs.a);
                    self.regs.a = r.value;
                    self.regs.f = r.flags;
                    8
                }

                // RETN/RETI, duplicated across every y. Both restore IFF1
                // from IFF2.
                5 => {
                    self.regs.pc = self.pop(bus);
                    self.regs.wz = self.regs.pc;
                    self.regs.iff1 = self.regs.iff2;
                    14
                }

                // IM 0/1/2 with hardware duplicates (the 0/1 slots act as 0).
                6 => {
                    self.regs.im = match y {
                        0 | 1 | 4 | 5 => 0,
                        2 | 6 => 1,
                        _ => 2,
                    };
                    8
                }

                _ => match y {
                    // LD I,A
                    0 => {
                        self.regs.i = self.regs.a;
                        9
                    }
                    // LD R,A (loads all 8 bits, including the latched bit 7)
                    1 => {
                        self.regs.r = self.regs.a;
                        9
                    }
                    // LD A,I: PV reads the pre-interrupt state via IFF2.
                    2 => {
                        self.regs.a = self.regs.i;
                        self.regs.f = (self.regs.f & CF)
                            | sz53(self.regs.a)
                            | if self.regs.iff2 { PF } else { 0 };
                        9
                    }
                    // LD A,R: R already reflects the ED fetch increments.
                    3 => {
                        self.regs.a = self.regs.r;
                        self.regs.f = (self.regs.f & CF)
                            | sz53(self.regs.a)
                            | if self.regs.iff2 { PF } else { 0 };
                        9
                    }
                    4 => self.rrd(bus),
                    5 => self.rld(bus),
                    _ => 8,
                },
            },

            2 if z <= 3 && y >= 4 => self.execute_block_op(bus, y, z),

            // Every other ED opcode is a NOP.
            _ => 8,
        }
    }

    /// RRD: low nibble of (HL) rotates into A's low nibble.
    fn rrd<B: IoBus>(&mut self, bus: &mut B) -> u32 {
        let addr = self.regs.hl();
        let value = bus.read(addr);
        let result = (self.regs.a & 0x0F) << 4 | value >> 4;
        self.regs.a = (self.regs.a & 0xF0) | (value & 0x0F);
        bus.write(addr, result);
        self.regs.f = (self.regs.f & CF) | sz53p(self.regs.a);
        self.regs.wz = addr.wrapping_add(1);
        18
    }

    /// RLD: high nibble of (HL) rotates into A's low nibble.
    fn rld<B: IoBus>(&mut self, bus: &mut B) -> u32 {
        let addr = self.regs.hl();
        let value = bus.read(addr);
        let result = value << 4 | (self.regs.a & 0x0F);
        self.regs.a = (self.regs.a & 0xF0) | (value >> 4);
        bus.write(addr, result);
        self.regs.f = (self.regs.f & CF) | sz53p(self.regs.a);
        self.regs.wz = addr.wrapping_add(1);
        18
    }

    fn execute_block_op<B: IoBus>(&mut self, bus: &mut B, y: u8, z: u8) -> u32 {
        let increment = y & 1 == 0;
        let repeat = y >= 6;
        match z {
            0 => self.block_ld(bus, increment, repeat),
            1 => self.block_cp(bus, increment, repeat),
            2 => self.block_in(bus, increment, repeat),
            _ => self.block_out(bus, increment, repeat),
        }
    }

    /// LDI/LDD/LDIR/LDDR.
    fn block_ld<B: IoBus>(&mut self, bus: &mut B, increment: bool, repeat: bool) -> u32 {
        let delta: u16 = if increment { 1 } else { 0xFFFF };
        let hl = self.regs.hl();
        let de = self.regs.de();
        let value = bus.read(hl);
        bus.write(de, value);
        self.regs.set_hl(hl.wrapping_add(delta));
        self.regs.set_de(de.wrapping_add(delta));
        let bc = self.regs.bc().wrapping_sub(1);
        self.regs.set_bc(bc);

        // X/Y come from bits 3 and 1 of (transferred byte + A).
        let n = value.wrapping_add(self.regs.a);
        let mut f = self.regs.f & (SF | ZF | CF);
        if bc != 0 {
            f |= PF;
        }
        if n & 0x08 != 0 {
            f |= XF;
        }
        if n & 0x02 != 0 {
            f |= YF;
        }
        self.regs.f = f;

        if repeat && bc != 0 {
            self.regs.pc = self.regs.pc.wrapping_sub(2);
            self.regs.wz = self.regs.pc.wrapping_add(1);
            self.inc_r();
            21
        } else {
            16
        }
    }

    /// CPI/CPD/CPIR/CPDR.
    fn block_cp<B: IoBus>(&mut self, bus: &mut B, increment: bool, repeat: bool) -> u32 {
        let delta: u16 = if increment { 1 } else { 0xFFFF };
        let hl = self.regs.hl();
        let value = bus.read(hl);
        let a = self.regs.a;
        let result = a.wrapping_sub(value);
        let half = (a & 0x0F) < (value & 0x0F);
        self.regs.set_hl(hl.wrapping_add(delta));
        self.regs.wz = self.regs.wz.wrapping_add(delta);
        let bc = self.regs.bc().wrapping_sub(1);
        self.regs.set_bc(bc);

        let mut f = (self.regs.f & CF) | NF;
        if result & 0x80 != 0 {
            f |= SF;
        }
        if result == 0 {
            f |= ZF;
        }
        if half {
            f |= HF;
        }
        if bc != 0 {
            f |= PF;
        }
        // X/Y come from bits 3 and 1 of (A - byte - post-op half-carry).
        let n = result.wrapping_sub(u8::from(half));
        if n & 0x08 != 0 {
            f |= XF;
        }
        if n & 0x02 != 0 {
            f |= YF;
        }
        self.regs.f = f;

        if repeat && bc != 0 && result != 0 {
            self.regs.pc = self.regs.pc.wrapping_sub(2);
            self.regs.wz = self.regs.pc.wrapping_add(1);
            self.inc_r();
            21
        } else {
            16
        }
    }

    /// INI/IND/INIR/INDR.
    fn block_in<B: IoBus>(&mut self, bus: &mut B, increment: bool, repeat: bool) -> u32 {
        let delta: u16 = if increment { 1 } else { 0xFFFF };
        let bc = self.regs.bc();
        let value = bus.read_io(bc);
        bus.write(self.regs.hl(), value);
        let hl = self.regs.hl();
        self.regs.set_hl(hl.wrapping_add(delta));
        self.regs.b = self.regs.b.wrapping_sub(1);
        self.regs.wz = bc.wrapping_add(delta);

        let c_adj = if increment {
            self.regs.c.wrapping_add(1)
        } else {
            self.regs.c.wrapping_sub(1)
        };
        let k = u16::from(value) + u16::from(c_adj);
        self.regs.f = self.block_io_flags(value, k);

        if repeat && self.regs.b != 0 {
            self.regs.pc = self.regs.pc.wrapping_sub(2);
            self.inc_r();
            21
        } else {
            16
        }
    }

    /// OUTI/OUTD/OTIR/OTDR. B decrements before the port access.
    fn block_out<B: IoBus>(&mut self, bus: &mut B, increment: bool, repeat: bool) -> u32 {
        let delta: u16 = if increment { 1 } else { 0xFFFF };
        let hl = self.regs.hl();
        let value = bus.read(hl);
        self.regs.b = self.regs.b.wrapping_sub(1);
        let bc = self.regs.bc();
        bus.write_io(bc, value);
        self.regs.set_hl(hl.wrapping_add(delta));
        self.regs.wz = bc.wrapping_add(delta);

        let k = u16::from(value) + u16::from(self.regs.l);
        self.regs.f = self.block_io_flags(value, k);

        if repeat && self.regs.b != 0 {
            self.regs.pc = self.regs.pc.wrapping_sub(2);
            self.inc_r();
            21
        } else {
            16
        }
    }

    /// Shared flag rule for the block I/O instructions: S/Z from the
    /// decremented B, H and C from the carry of k, PV from
    /// parity((k & 7) XOR B), N from bit 7 of the transferred byte, X/Y
    /// from bits 3 and 1 of k.
    fn block_io_flags(&self, value: u8, k: u16) -> u8 {
        let b = self.regs.b;
        let mut f = 0;
        if b & 0x80 != 0 {
            f |= SF;
        }
        if b == 0 {
            f |= ZF;
        }
        if k > 0xFF {
            f |= HF | CF;
        }
        if parity((k as u8 & 0x07) ^ b) {
            f |= PF;
        }
        if value & 0x80 != 0 {
            f |= NF;
        }
        if k & 0x08 != 0 {
            f |= XF;
        }
        if k & 0x02 != 0 {
            f |= YF;
        }
        f
    }
}
