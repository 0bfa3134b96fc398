//! DD/FD-prefixed instructions (IX and IY forms), including the DDCB/FDCB
//! bit-operation page.

use retro_core::IoBus;

use super::Z80;
use crate::alu;
use crate::flags::{CF, XF, YF};

impl Z80 {
    /// Entered after a DD (use_ix) or FD (!use_ix) prefix fetch.
    ///
    /// Chained prefixes each cost 4 T-states and the last one wins; ED
    /// cancels the index prefix entirely.
    pub(crate) fn execute_dd_fd<B: IoBus>(&mut self, bus: &mut B, mut use_ix: bool) -> u32 {
        let mut ignored = 0u32;
        loop {
            let opcode = self.fetch_opcode(bus);
            match opcode {
                0xDD => {
                    use_ix = true;
                    ignored += 4;
                }
                0xFD => {
                    use_ix = false;
                    ignored += 4;
                }
                0xED => return ignored + 4 + self.execute_ed(bus),
                0xCB => return ignored + self.execute_ddcb_fdcb(bus, use_ix),
                _ => return ignored + self.execute_indexed(bus, opcode, use_ix),
            }
        }
    }

    fn index_reg(&self, use_ix: bool) -> u16 {
        if use_ix {
            self.regs.ix
        } else {
            self.regs.iy
        }
    }

    fn set_index_reg(&mut self, use_ix: bool, value: u16) {
        if use_ix {
            self.regs.ix = value;
        } else {
            self.regs.iy = value;
        }
    }

    /// Fetch the displacement byte (not an M1 cycle) and form the effective
    /// address. WZ tracks it.
    fn indexed_addr<B: IoBus>(&mut self, bus: &mut B, use_ix: bool) -> u16 {
        let d = self.fetch_byte(bus) as i8;
        let addr = self.index_reg(use_ix).wrapping_add(d as u16);
        self.regs.wz = addr;
        addr
    }

    fn execute_indexed<B: IoBus>(&mut self, bus: &mut B, opcode: u8, use_ix: bool) -> u32 {
        let x = opcode >> 6;
        let y = (opcode >> 3) & 7;
        let z = opcode & 7;

        // Displacement family: operands that reach memory via (HL) are
        // promoted to (IX+d)/(IY+d).
        match opcode {
            // LD (IX+d),n
            0x36 => {
                let addr = self.indexed_addr(bus, use_ix);
                let value = self.fetch_byte(bus);
                bus.write(addr, value);
                return 19;
            }
            // INC (IX+d)
            0x34 => {
                let addr = self.indexed_addr(bus, use_ix);
                let r = alu::inc8(bus.read(addr));
                bus.write(addr, r.value);
                self.regs.f = (self.regs.f & CF) | r.flags;
                return 23;
            }
            // DEC (IX+d)
            0x35 => {
                let addr = self.indexed_addr(bus, use_ix);
                let r = alu::dec8(bus.read(addr));
                bus.write(addr, r.value);
                self.regs.f = (self.regs.f & CF) | r.flags;
                return 23;
            }
            _ => {}
        }

        // LD r,(IX+d) / LD (IX+d),r. The r operand is the plain register
        // file here, never IXH/IXL; 0x76 stays HALT.
        if x == 1 && opcode != 0x76 && (y == 6 || z == 6) {
            let addr = self.indexed_addr(bus, use_ix);
            if y == 6 {
                bus.write(addr, self.reg8(z));
            } else {
                let value = bus.read(addr);
                self.set_reg8(y, value);
            }
            return 19;
        }

        // ALU A,(IX+d)
        if x == 2 && z == 6 {
            let addr = self.indexed_addr(bus, use_ix);
            let value = bus.read(addr);
            self.alu_a(y, value);
            return 19;
        }

        // EX DE,HL and EXX ignore the index prefix entirely.
        if opcode == 0xEB || opcode == 0xD9 {
            return self.execute(bus, opcode) + 4;
        }

        // Pass-through: run the base instruction with IX/IY standing in for
        // HL, then swap back. Covers the 16-bit HL forms and the
        // undocumented IXH/IXL/IYH/IYL register halves.
        let saved_hl = self.regs.hl();
        let index = self.index_reg(use_ix);
        self.regs.set_hl(index);
        let cycles = self.execute(bus, opcode);
        let new_index = self.regs.hl();
        self.set_index_reg(use_ix, new_index);
        self.regs.set_hl(saved_hl);
        cycles + 4
    }

    /// DDCB/FDCB page: DD/FD, CB, displacement, sub-opcode. The
    /// displacement and sub-opcode are not M1 fetches, so only the two
    /// prefix bytes bump R.
    fn execute_ddcb_fdcb<B: IoBus>(&mut self, bus: &mut B, use_ix: bool) -> u32 {
        let addr = self.indexed_addr(bus, use_ix);
        let opcode = self.fetch_byte(bus);
        let x = opcode >> 6;
        let y = (opcode >> 3) & 7;
        let z = opcode & 7;

        let value = bus.read(addr);
        match x {
            0 => {
                let result = self.rotate_shift(y, value);
                bus.write(addr, result);
                // Undocumented: the result is also copied into the register
                // selected by z, except when z is 6.
                if z != 6 {
                    self.set_reg8(z, result);
                }
                23
            }
            1 => {
                // BIT n,(IX+d): X/Y from the WZ high byte, no write-back.
                self.bit_flags(value, y);
                let hi = (self.regs.wz >> 8) as u8;
                self.regs.f = (self.regs.f & !(XF | YF)) | (hi & (XF | YF));
                20
            }
            2 => {
                let result = value & !(1 << y);
                bus.write(addr, result);
                if z != 6 {
                    self.set_reg8(z, result);
                }
                23
            }
            _ => {
                let result = value | (1 << y);
                bus.write(addr, result);
                if z != 6 {
                    self.set_reg8(z, result);
                }
                23
            }
        }
    }
}
