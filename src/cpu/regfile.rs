use crate::{Error, Result};

use log::{debug, warn};
use std::{mem::size_of, ops::{Index, IndexMut}};

pub const NUM_GPRS: usize = 16;

pub const STACK_DEPTH: usize = 16;

/// Chip-8 general-purpose registers V0-VF
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Gprs([u8; NUM_GPRS]);

impl Gprs {
    /// Returns None for indices past VF
    pub fn get(&self, index: usize) -> Option<u8> {
        self.0.get(index).copied()
    }

    /// Writes to an index past VF are ignored
    pub fn set(&mut self, index: usize, value: u8) {
        match self.0.get_mut(index) {
            Some(reg) => *reg = value,
            None => warn!("Ignoring write to nonexistent register V{}", index),
        }
    }

    pub fn to_array(&self) -> [u8; NUM_GPRS] {
        self.0
    }

    pub fn load(&mut self, values: [u8; NUM_GPRS]) {
        self.0 = values;
    }

    /// V0..=Vx
    pub fn up_to(&self, x: usize) -> &[u8] {
        &self.0[..=x]
    }

    pub fn up_to_mut(&mut self, x: usize) -> &mut [u8] {
        &mut self.0[..=x]
    }
}

impl Index<usize> for Gprs {
    type Output = u8;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for Gprs {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

/// Fixed-depth call stack.
///
/// `sp` counts the pushed frames: 0 is empty, [`STACK_DEPTH`] is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stack {
    frames: [u16; STACK_DEPTH],
    sp: u8,
}

impl Stack {
    pub fn push(&mut self, addr: u16) -> Result<()> {
        let sp = self.sp as usize;

        if sp >= STACK_DEPTH {
            return Err(Error::StackOverflow);
        }

        self.frames[sp] = addr;
        self.sp += 1;
        debug!("Pushed return address {:#06X}, depth {}", addr, self.sp);

        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16> {
        if self.sp == 0 {
            return Err(Error::StackUnderflow);
        }

        self.sp -= 1;
        let addr = self.frames[self.sp as usize];
        debug!("Popped return address {:#06X}, depth {}", addr, self.sp);

        Ok(addr)
    }

    pub fn sp(&self) -> u8 {
        self.sp
    }

    pub fn set_sp(&mut self, sp: u8) -> Result<()> {
        if sp as usize > STACK_DEPTH {
            return Err(Error::InvalidStackPointer(sp));
        }

        self.sp = sp;

        Ok(())
    }

    pub fn frames(&self) -> [u16; STACK_DEPTH] {
        self.frames
    }

    pub fn load(&mut self, frames: [u16; STACK_DEPTH]) {
        self.frames = frames;
    }
}

/// Chip-8 register file
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RegFile {
    /// 16-bit program counter
    pub pc: u16,

    /// 16 8-bit general purpose registers, V0-VF
    pub gprs: Gprs,

    /// 16-bit index register
    pub index: u16,

    /// Return addresses for CALL/RET
    pub stack: Stack,
}

impl RegFile {
    pub fn advance_pc(&mut self) {
        self.pc = self.pc.wrapping_add(size_of::<u16>() as u16);
    }
}
