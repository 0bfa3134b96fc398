//! Base-page instruction decode and execute.
//!
//! Opcodes are decomposed into the x/y/z/p/q fields of the ZiLOG decode
//! table and dispatched structurally, so heavy families (all 64 LD r,r',
//! the 8x8 ALU block) share one path each.

use retro_core::IoBus;

use super::Z80;
use crate::alu;
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};

impl Z80 {
    /// Decode and execute one opcode, returning the T-states consumed.
    pub(crate) fn execute<B: IoBus>(&mut self, bus: &mut B, opcode: u8) -> u32 {
        let x = opcode >> 6;
        let y = (opcode >> 3) & 7;
        let z = opcode & 7;
        let p = y >> 1;
        let q = y & 1;

        match x {
            0 => self.execute_x0(bus, y, z, p, q),
            1 => self.execute_x1(bus, opcode, y, z),
            2 => self.execute_x2(bus, y, z),
            _ => self.execute_x3(bus, y, z, p, q),
        }
    }

    /// Apply an ALU operation (by y encoding) to the accumulator.
    pub(crate) fn alu_a(&mut self, op: u8, val: u8) {
        let carry = self.regs.f & CF != 0;
        let r = match op & 7 {
            0 => alu::add8(self.regs.a, val, false),
            1 => alu::add8(self.regs.a, val, carry),
            2 => alu::sub8(self.regs.a, val, false),
            3 => alu::sub8(self.regs.a, val, carry),
            4 => alu::and8(self.regs.a, val),
            5 => alu::xor8(self.regs.a, val),
            6 => alu::or8(self.regs.a, val),
            _ => alu::cp8(self.regs.a, val),
        };
        self.regs.a = r.value;
        self.regs.f = r.flags;
    }

    /// Apply a rotate/shift operation (by y encoding), committing flags.
    pub(crate) fn rotate_shift(&mut self, op: u8, val: u8) -> u8 {
        let carry = self.regs.f & CF != 0;
        let r = match op & 7 {
            0 => alu::rlc8(val),
            1 => alu::rrc8(val),
            2 => alu::rl8(val, carry),
            3 => alu::rr8(val, carry),
            4 => alu::sla8(val),
            5 => alu::sra8(val),
            6 => alu::sll8(val),
            _ => alu::srl8(val),
        };
        self.regs.f = r.flags;
        r.value
    }

    /// BIT n flag computation. X/Y come from the operand; the (HL) and
    /// indexed forms overwrite them from the WZ high byte afterwards.
    pub(crate) fn bit_flags(&mut self, val: u8, bit: u8) {
        let result = val & (1 << bit);
        let mut f = (self.regs.f & CF) | HF;
        if result == 0 {
            f |= ZF | PF;
        }
        if bit == 7 && result != 0 {
            f |= SF;
        }
        f |= val & (XF | YF);
        self.regs.f = f;
    }

    /// Opcodes 0x00-0x3F: loads, 16-bit arithmetic, indirect loads,
    /// accumulator rotates, flag operations.
    fn execute_x0<B: IoBus>(&mut self, bus: &mut B, y: u8, z: u8, p: u8, q: u8) -> u32 {
        match z {
            0 => match y {
                // NOP
                0 => 4,
                // EX AF,AF'
                1 => {
                    std::mem::swap(&mut self.regs.a, &mut self.regs.a_alt);
                    std::mem::swap(&mut self.regs.f, &mut self.regs.f_alt);
                    4
                }
                // DJNZ d
                2 => {
                    self.regs.b = self.regs.b.wrapping_sub(1);
                    let d = self.fetch_byte(bus) as i8;
                    if self.regs.b != 0 {
                        self.regs.pc = self.regs.pc.wrapping_add(d as u16);
                        self.regs.wz = self.regs.pc;
                        13
                    } else {
                        8
                    }
                }
                // JR d
                3 => {
                    let d = self.fetch_byte(bus) as i8;
                    self.regs.pc = self.regs.pc.wrapping_add(d as u16);
                    self.regs.wz = self.regs.pc;
                    12
                }
                // JR cc,d
                _ => {
                    let d = self.fetch_byte(bus) as i8;
                    if self.condition(y - 4) {
                        self.regs.pc = self.regs.pc.wrapping_add(d as u16);
                        self.regs.wz = self.regs.pc;
                        12
                    } else {
                        7
                    }
                }
            },

            1 => {
                if q == 0 {
                    // LD rp,nn
                    let value = self.fetch_word(bus);
                    self.set_rp(p, value);
                    10
                } else {
                    // ADD HL,rp
                    let hl = self.regs.hl();
                    let (value, add_flags) = alu::add16(hl, self.rp(p));
                    self.regs.set_hl(value);
                    self.regs.f = (self.regs.f & (SF | ZF | PF)) | add_flags;
                    self.regs.wz = hl.wrapping_add(1);
                    11
                }
            }

            2 => match y {
                // LD (BC),A
                0 => {
                    let bc = self.regs.bc();
                    bus.write(bc, self.regs.a);
                    self.regs.wz = u16::from(self.regs.a) << 8 | (bc.wrapping_add(1) & 0xFF);
                    7
                }
                // LD A,(BC)
                1 => {
                    let bc = self.regs.bc();
                    self.regs.a = bus.read(bc);
                    self.regs.wz = bc.wrapping_add(1);
                    7
                }
                // LD (DE),A
                2 => {
                    let de = self.regs.de();
                    bus.write(de, self.regs.a);
                    self.regs.wz = u16::from(self.regs.a) << 8 | (de.wrapping_add(1) & 0xFF);
                    7
                }
                // LD A,(DE)
                3 => {
                    let de = self.regs.de();
                    self.regs.a = bus.read(de);
                    self.regs.wz = de.wrapping_add(1);
                    7
                }
                // LD (nn),HL
                4 => {
                    let addr = self.fetch_word(bus);
                    let hl = self.regs.hl();
                    self.write_word(bus, addr, hl);
                    self.regs.wz = addr.wrapping_add(1);
                    16
                }
                // LD HL,(nn)
                5 => {
                    let addr = self.fetch_word(bus);
                    let value = self.read_word(bus, addr);
                    self.regs.set_hl(value);
                    self.regs.wz = addr.wrapping_add(1);
                    16
                }
                // LD (nn),A
                6 => {
                    let addr = self.fetch_word(bus);
                    bus.write(addr, self.regs.a);
                    self.regs.wz = u16::from(self.regs.a) << 8 | (addr.wrapping_add(1) & 0xFF);
                    13
                }
                // LD A,(nn)
                _ => {
                    let addr = self.fetch_word(bus);
                    self.regs.a = bus.read(addr);
                    self.regs.wz = addr.wrapping_add(1);
                    13
                }
            },

            3 => {
                // INC rp / DEC rp
                let value = self.rp(p);
                if q == 0 {
                    self.set_rp(p, value.wrapping_add(1));
                } else {
                    self.set_rp(p, value.wrapping_sub(1));
                }
                6
            }

            // INC r
            4 => {
                if y == 6 {
                    let addr = self.regs.hl();
                    let r = alu::inc8(bus.read(addr));
                    bus.write(addr, r.value);
                    self.regs.f = (self.regs.f & CF) | r.flags;
                    11
                } else {
                    let r = alu::inc8(self.reg8(y));
                    self.set_reg8(y, r.value);
                    self.regs.f = (self.regs.f & CF) | r.flags;
                    4
                }
            }

            // DEC r
            5 => {
                if y == 6 {
                    let addr = self.regs.hl();
                    let r = alu::dec8(bus.read(addr));
                    bus.write(addr, r.value);
                    self.regs.f = (self.regs.f & CF) | r.flags;
                    11
                } else {
                    let r = alu::dec8(self.reg8(y));
                    self.set_reg8(y, r.value);
                    self.regs.f = (self.regs.f & CF) | r.flags;
                    4
                }
            }

            // LD r,n
            6 => {
                let value = self.fetch_byte(bus);
                if y == 6 {
                    bus.write(self.regs.hl(), value);
                    10
                } else {
                    self.set_reg8(y, value);
                    7
                }
            }

            _ => match y {
                // RLCA / RRCA / RLA / RRA: S, Z and PV are preserved.
                0..=3 => {
                    let carry = self.regs.f & CF != 0;
                    let r = match y {
                        0 => alu::rlc8(self.regs.a),
                        1 => alu::rrc8(self.regs.a),
                        2 => alu::rl8(self.regs.a, carry),
                        _ => alu::rr8(self.regs.a, carry),
                    };
                    self.regs.a = r.value;
                    self.regs.f = (self.regs.f & (SF | ZF | PF)) | (r.flags & !(SF | ZF | PF));
                    4
                }
                // DAA
                4 => {
                    let r = alu::daa(self.regs.a, self.regs.f);
                    self.regs.a = r.value;
                    self.regs.f = r.flags;
                    4
                }
                // CPL
                5 => {
                    self.regs.a = !self.regs.a;
                    self.regs.f = (self.regs.f & (SF | ZF | PF | CF))
                        | HF
                        | NF
                        | (self.regs.a & (XF | YF));
                    4
                }
                // SCF
                6 => {
                    self.regs.f =
                        (self.regs.f & (SF | ZF | PF)) | CF | (self.regs.a & (XF | YF));
                    4
                }
                // CCF
                _ => {
                    let old_carry = self.regs.f & CF;
                    let mut f = self.regs.f & (SF | ZF | PF);
                    if old_carry != 0 {
                        f |= HF;
                    } else {
                        f |= CF;
                    }
                    self.regs.f = f | (self.regs.a & (XF | YF));
                    4
                }
            },
        }
    }

    /// Opcodes 0x40-0x7F: LD r,r' plus HALT at 0x76.
    fn execute_x1<B: IoBus>(&mut self, bus: &mut B, opcode: u8, y: u8, z: u8) -> u32 {
        if opcode == 0x76 {
            self.regs.halted = true;
            return 4;
        }

        if z == 6 {
            let value = bus.read(self.regs.hl());
            self.set_reg8(y, value);
            7
        } else if y == 6 {
            bus.write(self.regs.hl(), self.reg8(z));
            7
        } else {
            let value = self.reg8(z);
            self.set_reg8(y, value);
            4
        }
    }

    /// Opcodes 0x80-0xBF: 8-bit ALU on {B,C,D,E,H,L,(HL),A}.
    fn execute_x2<B: IoBus>(&mut self, bus: &mut B, y: u8, z: u8) -> u32 {
        if z == 6 {
            let value = bus.read(self.regs.hl());
            self.alu_a(y, value);
            7
        } else {
            let value = self.reg8(z);
            self.alu_a(y, value);
            4
        }
    }

    /// Opcodes 0xC0-0xFF: control flow, stack, I/O, prefixes.
    fn execute_x3<B: IoBus>(&mut self, bus: &mut B, y: u8, z: u8, p: u8, q: u8) -> u32 {
        match z {
            // RET cc
            0 => {
                if self.condition(y) {
                    self.regs.pc = self.pop(bus);
                    self.regs.wz = self.regs.pc;
                    11
                } else {
                    5
                }
            }

            1 => {
                if q == 0 {
                    // POP rp2
                    let value = self.pop(bus);
                    self.set_rp_af(p, value);
                    10
                } else {
                    match p {
                        // RET
                        0 => {
                            self.regs.pc = self.pop(bus);
                            self.regs.wz = self.regs.pc;
                            10
                        }
                        // EXX
                        1 => {
                            std::mem::swap(&mut self.regs.b, &mut self.regs.b_alt);
                            std::mem::swap(&mut self.regs.c, &mut self.regs.c_alt);
                            std::mem::swap(&mut self.regs.d, &mut self.regs.d_alt);
                            std::mem::swap(&mut self.regs.e, &mut self.regs.e_alt);
                            std::mem::swap(&mut self.regs.h, &mut self.regs.h_alt);
                            std::mem::swap(&mut self.regs.l, &mut self.regs.l_alt);
                            4
                        }
                        // JP HL
                        2 => {
                            self.regs.pc = self.regs.hl();
                            4
                        }
                        // LD SP,HL
                        _ => {
                            self.regs.sp = self.regs.hl();
                            6
                        }
                    }
                }
            }

            // JP cc,nn (operand fetched and WZ set whether taken or not)
            2 => {
                let addr = self.fetch_word(bus);
                self.regs.wz = addr;
                if self.condition(y) {
                    self.regs.pc = addr;
                }
                10
            }

            3 => match y {
                // JP nn
                0 => {
                    let addr = self.fetch_word(bus);
                    self.regs.pc = addr;
                    self.regs.wz = addr;
                    10
                }
                // CB prefix
                1 => self.execute_cb(bus),
                // OUT (n),A
                2 => {
                    let n = self.fetch_byte(bus);
                    let port = u16::from(self.regs.a) << 8 | u16::from(n);
                    bus.write_io(port, self.regs.a);
                    self.regs.wz = port;
                    11
                }
                // IN A,(n)
                3 => {
                    let n = self.fetch_byte(bus);
                    let port = u16::from(self.regs.a) << 8 | u16::from(n);
                    self.regs.a = bus.read_io(port);
                    self.regs.wz = port.wrapping_add(1);
                    11
                }
                // EX (SP),HL
                4 => {
                    let sp = self.regs.sp;
                    let value = self.read_word(bus, sp);
                    let hl = self.regs.hl();
                    self.write_word(bus, sp, hl);
                    self.regs.set_hl(value);
                    self.regs.wz = value;
                    19
                }
                // EX DE,HL
                5 => {
                    let de = self.regs.de();
                    let hl = self.regs.hl();
                    self.regs.set_de(hl);
                    self.regs.set_hl(de);
                    4
                }
                // DI (applied one instruction late, symmetric with EI)
                6 => {
                    self.pending_di = true;
                    4
                }
                // EI (interrupts stay masked for one more instruction)
                _ => {
                    self.pending_ei = true;
                    4
                }
            },

            // CALL cc,nn
            4 => {
                let addr = self.fetch_word(bus);
                self.regs.wz = addr;
                if self.condition(y) {
                    let pc = self.regs.pc;
                    self.push(bus, pc);
                    self.regs.pc = addr;
                    17
                } else {
                    10
                }
            }

            5 => {
                if q == 0 {
                    // PUSH rp2
                    let value = self.rp_af(p);
                    self.push(bus, value);
                    11
                } else {
                    match p {
                        // CALL nn
                        0 => {
                            let addr = self.fetch_word(bus);
                            let pc = self.regs.pc;
                            self.push(bus, pc);
                            self.regs.pc = addr;
                            self.regs.wz = addr;
                            17
                        }
                        // DD prefix (IX)
                        1 => self.execute_dd_fd(bus, true),
                        // ED prefix
                        2 => self.execute_ed(bus),
                        // FD prefix (IY)
                        _ => self.execute_dd_fd(bus, false),
                    }
                }
            }

            // ALU n
            6 => {
                let value = self.fetch_byte(bus);
                self.alu_a(y, value);
                7
            }

            // RST y*8
            _ => {
                let pc = self.regs.pc;
                self.push(bus, pc);
                self.regs.pc = u16::from(y) * 8;
                self.regs.wz = self.regs.pc;
                11
            }
        }
    }
}
