use crate::Bus;

/// A bus that also supports separate I/O port operations.
///
/// The Z80 has a separate 16-bit I/O address space accessed via IN and OUT
/// instructions. The CPU always passes the full 16-bit port address
/// (A15..A0 as on the real bus); devices that decode only A7..A0 must mask
/// internally.
pub trait IoBus: Bus {
    /// Read a byte from the given I/O port.
    fn read_io(&mut self, port: u16) -> u8;

    /// Write a byte to the given I/O port.
    fn write_io(&mut self, port: u16, value: u8);

    /// Instruction bytes placed on the data bus during a Mode 0 interrupt
    /// acknowledge.
    ///
    /// Devices that act as an interrupt controller override this. When it
    /// returns `None` (the default), the CPU falls back to RST 38H.
    fn mode0_instruction(&mut self) -> Option<Vec<u8>> {
        None
    }

    /// Vector byte placed on the data bus during a Mode 2 interrupt
    /// acknowledge. Defaults to 0xFF, the value of an undriven bus.
    fn interrupt_vector(&mut self) -> u8 {
        0xFF
    }
}
