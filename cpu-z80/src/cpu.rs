//! Z80 CPU state and step engine.

use retro_core::{Cpu, IoBus};

use crate::flags::{CF, PF, SF, ZF};
use crate::registers::Registers;

// Instruction execution split into separate files for readability.
mod decode;
mod prefix_cb;
mod prefix_ddfd;
mod prefix_ed;

/// Hook invoked on every M1 (opcode fetch) cycle: `(pc, opcode, context)`.
///
/// Used by coverage-measurement harnesses. Prefix bytes each produce their
/// own call; displacement and DDCB/FDCB sub-opcode bytes do not.
pub type M1Hook = Box<dyn FnMut(u16, u8, &'static str)>;

/// Z80 CPU.
///
/// The CPU does not own the bus; it is passed to `step()` on each call so
/// the host can share it with other components between steps.
pub struct Z80 {
    regs: Registers,

    // Interrupt lines and deferral state
    int_line: bool,
    nmi_line: bool,
    nmi_latched: bool,
    pending_ei: bool,
    pending_di: bool,

    // Mode 0 injected-instruction buffer
    mode0_buffer: Option<Vec<u8>>,
    mode0_index: usize,
    mode0_active: bool,

    /// Total T-states executed.
    cycles: u64,

    m1_hook: Option<M1Hook>,
}

impl Z80 {
    /// Create a new Z80 in its power-on state: SP=0xFFFF, A=F=0xFF.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers {
                a: 0xFF,
                f: 0xFF,
                sp: 0xFFFF,
                ..Registers::default()
            },
            int_line: false,
            nmi_line: false,
            nmi_latched: false,
            pending_ei: false,
            pending_di: false,
            mode0_buffer: None,
            mode0_index: 0,
            mode0_active: false,
            cycles: 0,
            m1_hook: None,
        }
    }

    /// The architectural register file.
    #[must_use]
    pub fn regs(&self) -> &Registers {
        &self.regs
    }

    /// Mutable access to the register file, for hosts and test harnesses.
    pub fn regs_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    /// Total T-states executed since creation. Survives `reset()`.
    #[must_use]
    pub fn total_cycles(&self) -> u64 {
        self.cycles
    }

    /// True between a HALT and the next accepted interrupt.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.regs.halted
    }

    /// Install or remove the M1 fetch hook.
    pub fn set_m1_hook(&mut self, hook: Option<M1Hook>) {
        self.m1_hook = hook;
    }

    /// A Mode 0 instruction buffer is armed and waiting for the next step.
    #[must_use]
    pub fn mode0_armed(&self) -> bool {
        self.mode0_buffer.is_some()
    }

    /// The injected Mode 0 instruction is currently executing.
    #[must_use]
    pub fn mode0_active(&self) -> bool {
        self.mode0_active
    }

    /// Get the C register (BDOS function number in CP/M harnesses).
    #[must_use]
    pub fn c(&self) -> u8 {
        self.regs.c
    }

    /// Get the E register.
    #[must_use]
    pub fn e(&self) -> u8 {
        self.regs.e
    }

    /// Get the DE register pair.
    #[must_use]
    pub fn de(&self) -> u16 {
        self.regs.de()
    }

    /// Force a return from a subroutine call: pop PC from the stack.
    ///
    /// Used by test harnesses to resume after handling a trapped system
    /// call (e.g. CP/M BDOS emulation).
    pub fn force_ret<B: IoBus>(&mut self, bus: &mut B) {
        self.regs.pc = self.pop(bus);
    }

    /// Increment R, preserving bit 7.
    pub(crate) fn inc_r(&mut self) {
        self.regs.r = (self.regs.r & 0x80) | (self.regs.r.wrapping_add(1) & 0x7F);
    }

    /// Read the next instruction byte. During Mode 0 execution the byte
    /// comes from the injected buffer (padded with 0x00 past its end) and
    /// PC does not advance.
    pub(crate) fn fetch_byte<B: IoBus>(&mut self, bus: &mut B) -> u8 {
        if self.mode0_active {
            let byte = self
                .mode0_buffer
                .as_ref()
                .and_then(|buf| buf.get(self.mode0_index).copied())
                .unwrap_or(0x00);
            self.mode0_index += 1;
            byte
        } else {
            let byte = bus.read(self.regs.pc);
            self.regs.pc = self.regs.pc.wrapping_add(1);
            byte
        }
    }

    /// An M1 cycle: fetch an opcode byte and bump R.
    pub(crate) fn fetch_opcode<B: IoBus>(&mut self, bus: &mut B) -> u8 {
        let pc = self.regs.pc;
        let opcode = self.fetch_byte(bus);
        self.inc_r();
        let context = if self.mode0_active { "mode0" } else { "fetch" };
        if let Some(hook) = self.m1_hook.as_mut() {
            hook(pc, opcode, context);
        }
        opcode
    }

    /// Fetch a little-endian word operand.
    pub(crate) fn fetch_word<B: IoBus>(&mut self, bus: &mut B) -> u16 {
        let low = self.fetch_byte(bus);
        let high = self.fetch_byte(bus);
        u16::from(high) << 8 | u16::from(low)
    }

    pub(crate) fn read_word<B: IoBus>(&mut self, bus: &mut B, addr: u16) -> u16 {
        let low = bus.read(addr);
        let high = bus.read(addr.wrapping_add(1));
        u16::from(high) << 8 | u16::from(low)
    }

    pub(crate) fn write_word<B: IoBus>(&mut self, bus: &mut B, addr: u16, value: u16) {
        bus.write(addr, value as u8);
        bus.write(addr.wrapping_add(1), (value >> 8) as u8);
    }

    /// Push a word: high byte first, SP decrements twice.
    pub(crate) fn push<B: IoBus>(&mut self, bus: &mut B, value: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.write(self.regs.sp, (value >> 8) as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        bus.write(self.regs.sp, value as u8);
    }

    pub(crate) fn pop<B: IoBus>(&mut self, bus: &mut B) -> u16 {
        let low = bus.read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let high = bus.read(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(1);
        u16::from(high) << 8 | u16::from(low)
    }

    /// Read a register by its 3-bit operand encoding. Index 6 denotes (HL)
    /// and must be handled by the caller as a memory access.
    pub(crate) fn reg8(&self, index: u8) -> u8 {
        match index & 7 {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            7 => self.regs.a,
            _ => unreachable!("register index 6 denotes (HL)"),
        }
    }

    pub(crate) fn set_reg8(&mut self, index: u8, value: u8) {
        match index & 7 {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => self.regs.h = value,
            5 => self.regs.l = value,
            7 => self.regs.a = value,
            _ => unreachable!("register index 6 denotes (HL)"),
        }
    }

    /// Register pair by 2-bit encoding (SP variant).
    pub(crate) fn rp(&self, index: u8) -> u16 {
        match index & 3 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.regs.hl(),
            _ => self.regs.sp,
        }
    }

    pub(crate) fn set_rp(&mut self, index: u8, value: u16) {
        match index & 3 {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.regs.set_hl(value),
            _ => self.regs.sp = value,
        }
    }

    /// Register pair by 2-bit encoding (AF variant, for PUSH/POP).
    pub(crate) fn rp_af(&self, index: u8) -> u16 {
        match index & 3 {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.regs.hl(),
            _ => self.regs.af(),
        }
    }

    pub(crate) fn set_rp_af(&mut self, index: u8, value: u16) {
        match index & 3 {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.regs.set_hl(value),
            _ => self.regs.set_af(value),
        }
    }

    /// Evaluate a condition code (NZ, Z, NC, C, PO, PE, P, M).
    pub(crate) fn condition(&self, cc: u8) -> bool {
        match cc & 7 {
            0 => self.regs.f & ZF == 0,
            1 => self.regs.f & ZF != 0,
            2 => self.regs.f & CF == 0,
            3 => self.regs.f & CF != 0,
            4 => self.regs.f & PF == 0,
            5 => self.regs.f & PF != 0,
            6 => self.regs.f & SF == 0,
            _ => self.regs.f & SF != 0,
        }
    }

    /// Check the interrupt lines; if one is accepted, perform the
    /// acknowledge sequence and return its cycle count.
    fn poll_interrupts<B: IoBus>(&mut self, bus: &mut B) -> Option<u32> {
        // NMI: edge-triggered.
        if self.nmi_line && !self.nmi_latched {
            self.nmi_latched = true;
            self.regs.halted = false;
            self.regs.iff2 = self.regs.iff1;
            self.regs.iff1 = false;
            let pc = self.regs.pc;
            self.push(bus, pc);
            self.regs.pc = 0x0066;
            self.regs.wz = self.regs.pc;
            self.inc_r();
            return Some(11);
        }
        if !self.nmi_line {
            self.nmi_latched = false;
        }

        // Maskable INT: level-triggered, gated by IFF1 and EI/DI deferral.
        if self.int_line && self.regs.iff1 && !self.pending_ei && !self.pending_di {
            self.regs.halted = false;
            self.regs.iff1 = false;
            self.regs.iff2 = false;

            match self.regs.im {
                0 => {
                    if let Some(bytes) = bus.mode0_instruction() {
                        if !bytes.is_empty() {
                            // Arm the buffer; the injected instruction runs
                            // (and is charged) on the next step.
                            self.mode0_buffer = Some(bytes);
                            self.mode0_index = 0;
                            return Some(0);
                        }
                    }
                    // No controller: RST 38H, as on an undriven bus.
                    let pc = self.regs.pc;
                    self.push(bus, pc);
                    self.regs.pc = 0x0038;
                    self.regs.wz = self.regs.pc;
                    self.inc_r();
                    Some(13)
                }
                1 => {
                    let pc = self.regs.pc;
                    self.push(bus, pc);
                    self.regs.pc = 0x0038;
                    self.regs.wz = self.regs.pc;
                    self.inc_r();
                    Some(13)
                }
                _ => {
                    // The vector byte is used as supplied; odd vectors form
                    // an odd table address exactly as on silicon.
                    let vector = bus.interrupt_vector();
                    let table = u16::from(self.regs.i) << 8 | u16::from(vector);
                    let pc = self.regs.pc;
                    self.push(bus, pc);
                    self.regs.pc = self.read_word(bus, table);
                    self.regs.wz = self.regs.pc;
                    self.inc_r();
                    Some(19)
                }
            }
        } else {
            None
        }
    }

    /// Execute one instruction from the armed Mode 0 buffer.
    fn step_mode0<B: IoBus>(&mut self, bus: &mut B) -> u32 {
        self.mode0_active = true;
        let opcode = self.fetch_opcode(bus);
        let cycles = self.execute(bus, opcode);
        self.mode0_active = false;
        self.mode0_buffer = None;
        self.mode0_index = 0;
        cycles
    }

    /// Execute one instruction (or one interrupt acknowledge sequence) and
    /// return the T-states consumed.
    pub fn step<B: IoBus>(&mut self, bus: &mut B) -> u32 {
        // Injected Mode 0 instruction carried over from the arming step.
        if self.mode0_buffer.is_some() {
            let cycles = self.step_mode0(bus);
            self.cycles += u64::from(cycles);
            return cycles;
        }

        if let Some(cycles) = self.poll_interrupts(bus) {
            self.cycles += u64::from(cycles);
            return cycles;
        }

        if self.regs.halted {
            self.cycles += 4;
            return 4;
        }

        // Apply deferred EI/DI exactly one instruction boundary late.
        if self.pending_ei {
            self.regs.iff1 = true;
            self.regs.iff2 = true;
            self.pending_ei = false;
        }
        if self.pending_di {
            self.regs.iff1 = false;
            self.regs.iff2 = false;
            self.pending_di = false;
        }

        let opcode = self.fetch_opcode(bus);
        let cycles = self.execute(bus, opcode);
        self.cycles += u64::from(cycles);
        cycles
    }

    /// Reset the CPU. Register-pair contents and the cumulative cycle
    /// counter survive; control state is cleared.
    pub fn reset(&mut self) {
        self.regs.pc = 0x0000;
        self.regs.i = 0x00;
        self.regs.r = 0x00;
        self.regs.iff1 = false;
        self.regs.iff2 = false;
        self.regs.im = 0;
        self.regs.halted = false;
        self.pending_ei = false;
        self.pending_di = false;
        self.nmi_latched = false;
        self.mode0_buffer = None;
        self.mode0_index = 0;
        self.mode0_active = false;
    }

    /// Current program counter.
    #[must_use]
    pub fn pc(&self) -> u16 {
        self.regs.pc
    }

    /// Drive the level-triggered maskable interrupt line.
    pub fn set_int(&mut self, asserted: bool) {
        self.int_line = asserted;
    }

    /// Drive the edge-triggered non-maskable interrupt line.
    pub fn set_nmi(&mut self, asserted: bool) {
        self.nmi_line = asserted;
    }
}

impl Default for Z80 {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: IoBus> Cpu<B> for Z80 {
    fn step(&mut self, bus: &mut B) -> u32 {
        Z80::step(self, bus)
    }

    fn reset(&mut self) {
        Z80::reset(self);
    }

    fn pc(&self) -> u16 {
        Z80::pc(self)
    }

    fn set_int(&mut self, asserted: bool) {
        Z80::set_int(self, asserted);
    }

    fn set_nmi(&mut self, asserted: bool) {
        Z80::set_nmi(self, asserted);
    }
}
