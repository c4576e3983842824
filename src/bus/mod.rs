use crate::{bus::memory::Memory, Error, Result};

use log::warn;

pub mod memory;

/// Chip-8 address (12-bit)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Address(u16);

impl Address {
    pub fn new(addr: u16) -> Self {
        Self(addr)
    }

    pub fn raw(&self) -> u16 {
        self.0
    }

    /// Checked address for byte accesses
    pub fn checked_address(&self) -> Result<usize> {
        Self::check(self.0 as usize)
    }

    /// Checked next address for word accesses
    pub fn checked_next_address(&self) -> Result<usize> {
        Self::check(self.0 as usize + 1)
    }

    fn check(address: usize) -> Result<usize> {
        if address < Memory::SIZE {
            Ok(address)
        } else {
            Err(Error::AddressOutOfRange { address })
        }
    }
}

/// Memory bus.
///
/// Single-address accesses fault outside memory, bulk `read_bytes`/`write_bytes`
/// clip to the valid range instead.
#[derive(Default)]
pub struct Bus {
    mem: Memory,
}

impl Bus {
    pub fn read_byte(&self, addr: Address) -> Result<u8> {
        Ok(self.mem[addr.checked_address()?])
    }

    pub fn write_byte(&mut self, addr: Address, data: u8) -> Result<()> {
        self.mem[addr.checked_address()?] = data;

        Ok(())
    }

    /// Reads a big-endian word at `addr`, `addr + 1`
    pub fn read_word(&self, addr: Address) -> Result<u16> {
        let (hi, lo) = (addr.checked_address()?, addr.checked_next_address()?);

        Ok(u16::from_be_bytes([self.mem[hi], self.mem[lo]]))
    }

    pub fn write_word(&mut self, addr: Address, data: u16) -> Result<()> {
        let (hi, lo) = (addr.checked_address()?, addr.checked_next_address()?);
        let [hi_byte, lo_byte] = data.to_be_bytes();

        self.mem[hi] = hi_byte;
        self.mem[lo] = lo_byte;

        Ok(())
    }

    /// Returns up to `len` bytes starting at `addr`, truncated at the end of memory
    pub fn read_bytes(&self, addr: Address, len: usize) -> Vec<u8> {
        self.mem[Memory::clip(addr.raw() as usize, len)].to_vec()
    }

    /// Writes `bytes` starting at `addr`, truncated at the end of memory.
    /// Returns the number of bytes actually written.
    pub fn write_bytes(&mut self, addr: Address, bytes: &[u8]) -> usize {
        let range = Memory::clip(addr.raw() as usize, bytes.len());
        let written = range.len();

        if written < bytes.len() {
            warn!(
                "Write of {} bytes at {:#06X} clipped to {} bytes",
                bytes.len(),
                addr.raw(),
                written
            );
        }

        self.mem[range].copy_from_slice(&bytes[..written]);

        written
    }

    /// Returns `len` bytes starting at `start`, faulting instead of clipping
    pub fn slice(&self, start: usize, len: usize) -> Result<&[u8]> {
        let end = Self::checked_end(start, len)?;

        Ok(&self.mem[start..end])
    }

    /// Mutable counterpart of [`Bus::slice`]
    pub fn slice_mut(&mut self, start: usize, len: usize) -> Result<&mut [u8]> {
        let end = Self::checked_end(start, len)?;

        Ok(&mut self.mem[start..end])
    }

    fn checked_end(start: usize, len: usize) -> Result<usize> {
        let end = start.saturating_add(len);

        if end > Memory::SIZE {
            // First byte that falls outside memory
            let address = usize::max(start, Memory::SIZE);

            return Err(Error::AddressOutOfRange { address });
        }

        Ok(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_bus_is_zeroed() {
        let bus = Bus::default();

        assert!(bus.read_bytes(Address::new(0), Memory::SIZE).iter().all(|&b| b == 0));
    }

    #[test]
    fn bytes_round_trip() {
        let mut bus = Bus::default();

        assert_eq!(bus.write_bytes(Address::new(0x300), &[1, 2, 3, 4]), 4);
        assert_eq!(bus.read_bytes(Address::new(0x300), 4), vec![1, 2, 3, 4]);
        assert_eq!(bus.read_bytes(Address::new(0x304), 1), vec![0]);
    }

    #[test]
    fn read_bytes_clips() {
        let mut bus = Bus::default();
        bus.write_bytes(Address::new(0xFFE), &[0xAA, 0xBB]);

        assert_eq!(bus.read_bytes(Address::new(0xFFE), 16), vec![0xAA, 0xBB]);
        assert!(bus.read_bytes(Address::new(0x1000), 16).is_empty());
        assert!(bus.read_bytes(Address::new(0xFFFF), 1).is_empty());
    }

    #[test]
    fn write_bytes_clips() {
        let mut bus = Bus::default();

        assert_eq!(bus.write_bytes(Address::new(0xFFD), &[1, 2, 3, 4, 5]), 3);
        assert_eq!(bus.read_bytes(Address::new(0xFFD), 3), vec![1, 2, 3]);
        assert_eq!(bus.write_bytes(Address::new(0x1000), &[9]), 0);
    }

    #[test]
    fn word_is_big_endian() -> Result<()> {
        let mut bus = Bus::default();
        bus.write_word(Address::new(0x10), 0x1234)?;

        assert_eq!(bus.read_bytes(Address::new(0x10), 2), vec![0x12, 0x34]);
        assert_eq!(bus.read_word(Address::new(0x10))?, 0x1234);
        Ok(())
    }

    #[test]
    fn single_access_out_of_range_faults() {
        let mut bus = Bus::default();

        assert!(matches!(
            bus.read_byte(Address::new(0x1000)),
            Err(Error::AddressOutOfRange { address: 0x1000 })
        ));
        assert!(bus.write_byte(Address::new(0x2000), 1).is_err());
        assert!(matches!(
            bus.read_word(Address::new(0xFFF)),
            Err(Error::AddressOutOfRange { address: 0x1000 })
        ));
        assert!(bus.write_word(Address::new(0xFFF), 0).is_err());
    }

    #[test]
    fn slice_faults_past_end() {
        let mut bus = Bus::default();

        assert_eq!(bus.slice(0xFF0, 16).map(<[u8]>::len).ok(), Some(16));
        assert!(matches!(
            bus.slice(0xFF0, 17),
            Err(Error::AddressOutOfRange { address: 0x1000 })
        ));
        assert!(bus.slice_mut(0x1005, 1).is_err());
    }
}
