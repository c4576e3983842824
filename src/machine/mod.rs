use crate::{
    bus::{Address, Bus},
    cpu::{
        opcode::Opcode,
        regfile::{RegFile, NUM_GPRS, STACK_DEPTH},
    },
    display::Display,
    timer::Timers,
    Result,
};

use std::sync::Arc;

/// Chip-8 machine state: memory, register file, call stack, timers and display.
///
/// Storage and bounds checks only; opcode semantics live in [`crate::cpu::Cpu`].
/// Whole-file accessors copy by value in both directions.
#[derive(Default)]
pub struct Machine {
    pub(crate) bus: Bus,
    pub(crate) regfile: RegFile,
    pub(crate) display: Display,
    pub(crate) timers: Arc<Timers>,
}

impl Machine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Up to `len` bytes at `addr`, clipped at the end of memory
    pub fn read_bytes(&self, addr: u16, len: usize) -> Vec<u8> {
        self.bus.read_bytes(Address::new(addr), len)
    }

    /// Writes `bytes` at `addr`, clipped at the end of memory; returns bytes written
    pub fn write_bytes(&mut self, addr: u16, bytes: &[u8]) -> usize {
        self.bus.write_bytes(Address::new(addr), bytes)
    }

    pub fn read_opcode(&self, addr: u16) -> Result<u16> {
        self.bus.read_word(Address::new(addr))
    }

    pub fn write_opcode(&mut self, addr: u16, opcode: u16) -> Result<()> {
        self.bus.write_word(Address::new(addr), opcode)
    }

    /// Reads the opcode at `pc` and advances `pc` by 2
    pub fn fetch_opcode(&mut self) -> Result<Opcode> {
        let opcode = Opcode::new(self.bus.read_word(Address::new(self.regfile.pc))?);

        self.regfile.advance_pc();

        Ok(opcode)
    }

    pub fn register(&self, index: usize) -> Option<u8> {
        self.regfile.gprs.get(index)
    }

    pub fn set_register(&mut self, index: usize, value: u8) {
        self.regfile.gprs.set(index, value);
    }

    pub fn registers(&self) -> [u8; NUM_GPRS] {
        self.regfile.gprs.to_array()
    }

    pub fn set_registers(&mut self, values: [u8; NUM_GPRS]) {
        self.regfile.gprs.load(values);
    }

    pub fn stack(&self) -> [u16; STACK_DEPTH] {
        self.regfile.stack.frames()
    }

    pub fn set_stack(&mut self, frames: [u16; STACK_DEPTH]) {
        self.regfile.stack.load(frames);
    }

    pub fn pc(&self) -> u16 {
        self.regfile.pc
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.regfile.pc = pc;
    }

    pub fn sp(&self) -> u8 {
        self.regfile.stack.sp()
    }

    pub fn set_sp(&mut self, sp: u8) -> Result<()> {
        self.regfile.stack.set_sp(sp)
    }

    pub fn index(&self) -> u16 {
        self.regfile.index
    }

    pub fn set_index(&mut self, index: u16) {
        self.regfile.index = index;
    }

    pub fn delay_timer(&self) -> u8 {
        self.timers.delay()
    }

    pub fn set_delay_timer(&self, value: u8) {
        self.timers.set_delay(value);
    }

    pub fn sound_timer(&self) -> u8 {
        self.timers.sound()
    }

    pub fn set_sound_timer(&self, value: u8) {
        self.timers.set_sound(value);
    }

    pub fn timers(&self) -> &Arc<Timers> {
        &self.timers
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn clear_display(&mut self) {
        self.display.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bus::memory::Memory, Error};

    #[test]
    fn fresh_machine_is_zeroed() {
        let machine = Machine::new();

        assert!(machine.read_bytes(0, Memory::SIZE).iter().all(|&b| b == 0));
        assert_eq!(machine.registers(), [0; NUM_GPRS]);
        assert_eq!(machine.stack(), [0; STACK_DEPTH]);
        assert_eq!(machine.pc(), 0);
        assert_eq!(machine.sp(), 0);
        assert_eq!(machine.index(), 0);
        assert_eq!(machine.delay_timer(), 0);
        assert_eq!(machine.sound_timer(), 0);
        assert!(machine.display().as_slice().iter().all(|&p| p == 0));
    }

    #[test]
    fn fetch_is_big_endian_and_advances_pc() -> Result<()> {
        let mut machine = Machine::new();
        machine.write_opcode(0x000, 0x1234)?;

        assert_eq!(machine.fetch_opcode()?.raw(), 0x1234);
        assert_eq!(machine.pc(), 0x0002);
        Ok(())
    }

    #[test]
    fn fetch_past_end_faults() {
        let mut machine = Machine::new();
        machine.set_pc(0xFFF);

        assert!(matches!(
            machine.fetch_opcode(),
            Err(Error::AddressOutOfRange { address: 0x1000 })
        ));
        assert_eq!(machine.pc(), 0xFFF);
    }

    #[test]
    fn opcode_accessors_fault_out_of_range() {
        let mut machine = Machine::new();

        assert!(machine.write_opcode(0xFFF, 0x00E0).is_err());
        assert!(machine.read_opcode(0x1000).is_err());
        assert!(machine.read_bytes(0xFFE, 2).iter().all(|&b| b == 0));
    }

    #[test]
    fn register_file_round_trip() {
        let mut machine = Machine::new();
        let values = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];
        machine.set_registers(values);
        machine.set_register(5, 0x7F);
        machine.set_register(16, 0x7F);

        assert_eq!(machine.register(5), Some(0x7F));
        assert_eq!(machine.register(16), None);
        assert_eq!(machine.registers()[15], 16);
    }

    #[test]
    fn stack_round_trip() {
        let mut machine = Machine::new();
        let frames = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];
        machine.set_stack(frames);

        assert_eq!(machine.stack(), frames);
        assert_eq!(machine.sp(), 0);
    }

    #[test]
    fn clear_display() {
        let mut machine = Machine::new();
        machine.display.as_mut_slice()[100] = 1;
        machine.clear_display();

        assert!(machine.display().as_slice().iter().all(|&p| p == 0));
    }
}
