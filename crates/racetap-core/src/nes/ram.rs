use core::ops::{Deref, DerefMut};

pub const INTERNAL_RAM_SIZE: usize = 2048;

/// The console's 2 KiB internal RAM, reconstructed from observed writes.
///
/// Reads through the tap are invisible, so cells the game never writes
/// stay at their power-on value of zero.
#[derive(Clone, PartialEq, Eq)]
pub struct Ram(Box<[u8; INTERNAL_RAM_SIZE]>);

impl Ram {
    pub fn new() -> Self {
        Self(Box::new([0; INTERNAL_RAM_SIZE]))
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.0[addr as usize & (INTERNAL_RAM_SIZE - 1)]
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        self.0[addr as usize & (INTERNAL_RAM_SIZE - 1)] = value;
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Ram {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.0.as_slice()
    }
}

impl DerefMut for Ram {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut_slice()
    }
}

impl std::fmt::Debug for Ram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ram({} bytes)", INTERNAL_RAM_SIZE)
    }
}
