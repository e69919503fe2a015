//! Memory and I/O bus interface.

/// Memory bus interface.
///
/// Components access memory through this trait. The bus handles address
/// decoding and routing to the appropriate device. Reads are total: an
/// unmapped address returns whatever the board floats onto the bus
/// (conventionally `0xFF`), never an error.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);
}

/// A bus that also supports separate I/O port operations.
///
/// Z80-family CPUs have a separate 16-bit I/O address space accessed via
/// IN and OUT instructions. Boards without port-mapped devices can rely on
/// the defaults: reads float high and writes are ignored.
pub trait IoBus: Bus {
    /// Read a byte from the given I/O port.
    fn read_io(&mut self, port: u16) -> u8 {
        let _ = port;
        0xFF
    }

    /// Write a byte to the given I/O port.
    fn write_io(&mut self, port: u16, value: u8) {
        let _ = (port, value);
    }
}

/// Flat 64 KiB RAM with a 256-entry port latch.
///
/// Port reads return the last value written to the low byte of the port
/// address, or `0xFF` if nothing was written there. Useful for tests and
/// tooling that don't need a real board.
pub struct SimpleBus {
    ram: Box<[u8; 0x10000]>,
    ports: [Option<u8>; 256],
}

impl SimpleBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            ram: Box::new([0; 0x10000]),
            ports: [None; 256],
        }
    }

    /// Copy `data` into RAM starting at `address`, wrapping at 64 KiB.
    pub fn load(&mut self, address: u16, data: &[u8]) {
        let mut addr = address;
        for &byte in data {
            self.ram[addr as usize] = byte;
            addr = addr.wrapping_add(1);
        }
    }

    /// Read RAM without side effects.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.ram[address as usize]
    }

    /// Preload the value returned by reads of ports with this low byte.
    pub fn set_port(&mut self, port: u8, value: u8) {
        self.ports[port as usize] = Some(value);
    }

    /// Last value written to ports with this low byte.
    #[must_use]
    pub fn port(&self, port: u8) -> Option<u8> {
        self.ports[port as usize]
    }
}

impl Default for SimpleBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for SimpleBus {
    fn read(&mut self, address: u16) -> u8 {
        self.ram[address as usize]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram[address as usize] = value;
    }
}

impl IoBus for SimpleBus {
    fn read_io(&mut self, port: u16) -> u8 {
        self.ports[(port & 0xFF) as usize].unwrap_or(0xFF)
    }

    fn write_io(&mut self, port: u16, value: u8) {
        self.ports[(port & 0xFF) as usize] = Some(value);
    }
}
