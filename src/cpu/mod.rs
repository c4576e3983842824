use crate::{
    bus::Address,
    cpu::opcode::Opcode,
    machine::Machine,
    sound::{Mute, Sound},
    timer::TimerTask,
    Result,
};

use log::trace;
use std::{sync::Arc, time::Duration};

pub mod opcode;
pub mod regfile;

type OpcodePattern = u16;
type OpcodeMask = u16;
type OpcodeHandler = fn(&mut Cpu, Opcode) -> Result<()>;

/// Opcode descriptor (opcode pattern, mask, handler)
#[derive(Clone, Copy)]
struct OpcodeDesc(OpcodePattern, OpcodeMask, OpcodeHandler);

/// Opcode descriptors kept ordered from most to least specific mask
#[derive(Default)]
struct OpcodeMatcher {
    registered_opcodes: Vec<OpcodeDesc>,
}

impl OpcodeMatcher {
    /// Inserts after every descriptor with an equally or more specific mask
    pub fn register(&mut self, desc: OpcodeDesc) {
        let specificity = desc.1.count_ones();
        let position = self
            .registered_opcodes
            .iter()
            .position(|OpcodeDesc(_, mask, _)| mask.count_ones() < specificity)
            .unwrap_or(self.registered_opcodes.len());

        self.registered_opcodes.insert(position, desc);
    }

    fn find(&self, opcode: u16) -> Option<&OpcodeDesc> {
        self.registered_opcodes
            .iter()
            .find(|OpcodeDesc(pattern, mask, _)| opcode & mask == *pattern)
    }

    /// Matches opcode against registered opcodes and returns corresponding opcode handler
    pub fn match_opcode(&self, opcode: u16) -> Option<OpcodeHandler> {
        self.find(opcode).map(|&OpcodeDesc(_, _, handler)| handler)
    }
}

/// Execution engine: fetch, decode and execute against a [`Machine`],
/// with the 60 Hz timer task running alongside.
pub struct Cpu {
    machine: Machine,
    matcher: OpcodeMatcher,
    timer: TimerTask,
    sound: Box<dyn Sound>,
}

impl Cpu {
    pub fn new(machine: Machine) -> Self {
        const OPCODE_DESCS: [OpcodeDesc; 19] = [
            OpcodeDesc(0x00E0, 0xFFFF, Cpu::cls),
            OpcodeDesc(0x00EE, 0xFFFF, Cpu::ret),
            OpcodeDesc(0x1000, 0xF000, Cpu::jp),
            OpcodeDesc(0x2000, 0xF000, Cpu::call),
            OpcodeDesc(0x3000, 0xF000, Cpu::se_imm),
            OpcodeDesc(0x4000, 0xF000, Cpu::sne_imm),
            OpcodeDesc(0x5000, 0xF00F, Cpu::se_reg),
            OpcodeDesc(0x6000, 0xF000, Cpu::ldv),
            OpcodeDesc(0x7000, 0xF000, Cpu::add_imm),
            OpcodeDesc(0x8000, 0xF00F, Cpu::ld_reg),
            OpcodeDesc(0x8001, 0xF00F, Cpu::or),
            OpcodeDesc(0x8002, 0xF00F, Cpu::and),
            OpcodeDesc(0x8003, 0xF00F, Cpu::xor),
            OpcodeDesc(0xA000, 0xF000, Cpu::ldi),
            OpcodeDesc(0xF007, 0xF0FF, Cpu::ld_from_dt),
            OpcodeDesc(0xF018, 0xF0FF, Cpu::ld_st),
            OpcodeDesc(0xF01E, 0xF0FF, Cpu::add_i),
            OpcodeDesc(0xF055, 0xF0FF, Cpu::store_regs),
            OpcodeDesc(0xF065, 0xF0FF, Cpu::load_regs),
        ];

        let mut matcher = OpcodeMatcher::default();

        for desc in OPCODE_DESCS {
            matcher.register(desc);
        }

        let timer = TimerTask::new(Arc::clone(machine.timers()));

        Self {
            machine,
            matcher,
            timer,
            sound: Box::new(Mute),
        }
    }

    pub fn with_sound(mut self, sound: impl Sound + 'static) -> Self {
        self.sound = Box::new(sound);
        self
    }

    /// Overrides the 60 Hz tick period, restarting the timer if it was running
    pub fn set_timer_period(&mut self, period: Duration) -> Result<()> {
        let was_running = self.timer.is_running();

        self.timer.stop();
        self.timer = TimerTask::with_period(Arc::clone(self.machine.timers()), period);

        if was_running {
            self.timer.start()?;
        }

        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    /// Starts the timer task; no-op if already running
    pub fn start(&mut self) -> Result<()> {
        self.timer.start()
    }

    /// Stops the timer task; DT and ST are left untouched afterwards
    pub fn stop(&mut self) {
        self.timer.stop();
    }

    /// Executes a single Chip-8 instruction.
    ///
    /// Unrecognized opcodes do nothing beyond the fetch.
    pub fn step(&mut self) -> Result<()> {
        let opcode = self.machine.fetch_opcode()?;

        match self.matcher.match_opcode(opcode.raw()) {
            Some(handler) => {
                trace!("{:#06X}: {:?}", self.machine.pc().wrapping_sub(2), opcode);
                handler(self, opcode)
            }
            None => {
                trace!("Ignoring unrecognized {:?}", opcode);
                Ok(())
            }
        }
    }

    /// Executes `steps` instructions, stopping at the first fatal error
    pub fn run(&mut self, steps: usize) -> Result<()> {
        for _ in 0..steps {
            self.step()?;
        }

        Ok(())
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.machine.regfile.advance_pc();
        }
    }

    // --- Opcode handlers

    /// Adds immediate
    fn add_imm(&mut self, opcode: Opcode) -> Result<()> {
        let gprs = &mut self.machine.regfile.gprs;
        let x = opcode.x();

        gprs[x] = gprs[x].wrapping_add(opcode.kk());

        Ok(())
    }

    /// Adds Vx to index register
    fn add_i(&mut self, opcode: Opcode) -> Result<()> {
        let regfile = &mut self.machine.regfile;

        regfile.index = regfile.index.wrapping_add(regfile.gprs[opcode.x()] as u16);

        Ok(())
    }

    /// Bitwise AND
    fn and(&mut self, opcode: Opcode) -> Result<()> {
        let gprs = &mut self.machine.regfile.gprs;
        let vy = gprs[opcode.y()];
        gprs[opcode.x()] &= vy;

        Ok(())
    }

    /// Calls subroutine
    fn call(&mut self, opcode: Opcode) -> Result<()> {
        let target = Address::new(opcode.nnn());
        target.checked_address()?;

        let regfile = &mut self.machine.regfile;
        regfile.stack.push(regfile.pc)?;
        regfile.pc = target.raw();

        Ok(())
    }

    /// Clears screen
    fn cls(&mut self, _opcode: Opcode) -> Result<()> {
        self.machine.clear_display();

        Ok(())
    }

    /// Jumps to other location in program
    fn jp(&mut self, opcode: Opcode) -> Result<()> {
        self.machine.regfile.pc = opcode.nnn();

        Ok(())
    }

    /// Loads Vx with delay timer
    fn ld_from_dt(&mut self, opcode: Opcode) -> Result<()> {
        self.machine.regfile.gprs[opcode.x()] = self.machine.timers.delay();

        Ok(())
    }

    /// Loads Vx with Vy
    fn ld_reg(&mut self, opcode: Opcode) -> Result<()> {
        let gprs = &mut self.machine.regfile.gprs;
        let vy = gprs[opcode.y()];
        gprs[opcode.x()] = vy;

        Ok(())
    }

    /// Loads sound timer with Vx, beeping when the timer gets armed
    fn ld_st(&mut self, opcode: Opcode) -> Result<()> {
        let value = self.machine.regfile.gprs[opcode.x()];
        let previous = self.machine.timers.set_sound(value);

        if previous == 0 && value != 0 {
            self.sound.beep();
        }

        Ok(())
    }

    /// Loads index register
    fn ldi(&mut self, opcode: Opcode) -> Result<()> {
        self.machine.regfile.index = opcode.nnn();

        Ok(())
    }

    /// Loads GPR with immediate
    fn ldv(&mut self, opcode: Opcode) -> Result<()> {
        self.machine.regfile.gprs[opcode.x()] = opcode.kk();

        Ok(())
    }

    /// Loads V0..=Vx from memory at I
    fn load_regs(&mut self, opcode: Opcode) -> Result<()> {
        let Machine { bus, regfile, .. } = &mut self.machine;
        let x = opcode.x();

        regfile
            .gprs
            .up_to_mut(x)
            .copy_from_slice(bus.slice(regfile.index as usize, x + 1)?);

        Ok(())
    }

    /// Bitwise OR
    fn or(&mut self, opcode: Opcode) -> Result<()> {
        let gprs = &mut self.machine.regfile.gprs;
        let vy = gprs[opcode.y()];
        gprs[opcode.x()] |= vy;

        Ok(())
    }

    /// Returns from subroutine
    fn ret(&mut self, _opcode: Opcode) -> Result<()> {
        let regfile = &mut self.machine.regfile;

        regfile.pc = regfile.stack.pop()?;

        Ok(())
    }

    /// Skips next instruction if Vx == kk
    fn se_imm(&mut self, opcode: Opcode) -> Result<()> {
        let vx = self.machine.regfile.gprs[opcode.x()];

        self.skip_if(vx == opcode.kk());

        Ok(())
    }

    /// Skips next instruction if Vx == Vy
    fn se_reg(&mut self, opcode: Opcode) -> Result<()> {
        let gprs = &self.machine.regfile.gprs;
        let equal = gprs[opcode.x()] == gprs[opcode.y()];

        self.skip_if(equal);

        Ok(())
    }

    /// Skips next instruction if Vx != kk
    fn sne_imm(&mut self, opcode: Opcode) -> Result<()> {
        let vx = self.machine.regfile.gprs[opcode.x()];

        self.skip_if(vx != opcode.kk());

        Ok(())
    }

    /// Stores V0..=Vx to memory at I
    fn store_regs(&mut self, opcode: Opcode) -> Result<()> {
        let Machine { bus, regfile, .. } = &mut self.machine;
        let x = opcode.x();

        bus.slice_mut(regfile.index as usize, x + 1)?
            .copy_from_slice(regfile.gprs.up_to(x));

        Ok(())
    }

    /// Bitwise XOR
    fn xor(&mut self, opcode: Opcode) -> Result<()> {
        let gprs = &mut self.machine.regfile.gprs;
        let vy = gprs[opcode.y()];
        gprs[opcode.x()] ^= vy;

        Ok(())
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new(Machine::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_cpu: &mut Cpu, _opcode: Opcode) -> Result<()> {
        Ok(())
    }

    #[test]
    fn matcher_prefers_specific_masks() {
        let mut matcher = OpcodeMatcher::default();
        matcher.register(OpcodeDesc(0x0000, 0xF000, noop));
        matcher.register(OpcodeDesc(0xF000, 0xF000, noop));
        matcher.register(OpcodeDesc(0xF055, 0xF0FF, noop));
        matcher.register(OpcodeDesc(0x00E0, 0xFFFF, noop));

        let pattern = |opcode| matcher.find(opcode).map(|&OpcodeDesc(pattern, _, _)| pattern);

        assert_eq!(pattern(0x00E0), Some(0x00E0));
        assert_eq!(pattern(0x00E1), Some(0x0000));
        assert_eq!(pattern(0xF355), Some(0xF055));
        assert_eq!(pattern(0xF365), Some(0xF000));
        assert_eq!(pattern(0x1000), None);
    }

    #[test]
    fn instruction_patterns_never_overlap() {
        let cpu = Cpu::default();

        for opcode in 0..=u16::MAX {
            let matches = cpu
                .matcher
                .registered_opcodes
                .iter()
                .filter(|OpcodeDesc(pattern, mask, _)| opcode & mask == *pattern)
                .count();

            assert!(matches <= 1, "{:04X} matches {} patterns", opcode, matches);
        }
    }

    #[test]
    fn registered_in_specificity_order() {
        let cpu = Cpu::default();
        let specificity: Vec<u32> = cpu
            .matcher
            .registered_opcodes
            .iter()
            .map(|OpcodeDesc(_, mask, _)| mask.count_ones())
            .collect();

        assert!(specificity.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(specificity.len(), 19);
    }

    #[test]
    fn unrecognized_opcodes_are_noops() -> Result<()> {
        let mut cpu = Cpu::default();
        let unknown: [u16; 6] = [0x0123, 0x5121, 0x8124, 0x9120, 0xD123, 0xF129];

        for (i, opcode) in unknown.iter().enumerate() {
            cpu.machine_mut().write_opcode(i as u16 * 2, *opcode)?;
        }
        cpu.machine_mut().set_registers([7; 16]);

        cpu.run(unknown.len())?;

        assert_eq!(cpu.machine().pc(), unknown.len() as u16 * 2);
        assert_eq!(cpu.machine().registers(), [7; 16]);
        assert_eq!(cpu.machine().index(), 0);
        assert_eq!(cpu.machine().sp(), 0);
        Ok(())
    }
}
