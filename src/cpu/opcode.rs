use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Opcode(u16);

impl Opcode {
    pub fn new(opcode: u16) -> Self {
        Self(opcode)
    }

    pub fn raw(&self) -> u16 {
        self.0
    }

    pub fn kk(&self) -> u8 {
        (self.raw() & 0xFF) as u8
    }

    pub fn nnn(&self) -> u16 {
        self.raw() & 0xFFF
    }

    pub fn x(&self) -> usize {
        (self.raw().wrapping_shr(8) & 0xF) as usize
    }

    pub fn y(&self) -> usize {
        (self.raw().wrapping_shr(4) & 0xF) as usize
    }
}

impl fmt::Debug for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opcode({:04X})", self.0)
    }
}
