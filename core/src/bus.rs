/// A bus that supports memory read/write operations.
///
/// This is the base trait for all systems. The bus is synchronous and never
/// fails in-band; side-effect-free reads are not required, so I/O-mapped
/// memory is permitted.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);
}
