//! CB-prefixed instructions: rotates, shifts, BIT, RES, SET.

use retro_core::IoBus;

use super::Z80;
use crate::flags::{XF, YF};

impl Z80 {
    pub(crate) fn execute_cb<B: IoBus>(&mut self, bus: &mut B) -> u32 {
        let opcode = self.fetch_opcode(bus);
        let x = opcode >> 6;
        let y = (opcode >> 3) & 7;
        let z = opcode & 7;

        if z == 6 {
            // (HL) operand
            let addr = self.regs.hl();
            let value = bus.read(addr);
            match x {
                0 => {
                    let result = self.rotate_shift(y, value);
                    bus.write(addr, result);
                    15
                }
                1 => {
                    // BIT n,(HL): X and Y come from the WZ high byte.
                    self.bit_flags(value, y);
                    let hi = (self.regs.wz >> 8) as u8;
                    self.regs.f = (self.regs.f & !(XF | YF)) | (hi & (XF | YF));
                    12
                }
                2 => {
                    bus.write(addr, value & !(1 << y));
                    15
                }
                _ => {
                    bus.write(addr, value | (1 << y));
                    15
                }
            }
        } else {
            let value = self.reg8(z);
            match x {
                0 => {
                    let result = self.rotate_shift(y, value);
                    self.set_reg8(z, result);
                }
                1 => self.bit_flags(value, y),
                2 => self.set_reg8(z, value & !(1 << y)),
                _ => self.set_reg8(z, value | (1 << y)),
            }
            8
        }
    }
}
