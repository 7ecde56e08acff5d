use crate::register::{Register, Word, REGISTER_COUNT};

/// The register file: `REGISTER_COUNT` words, zero on creation. Indexing cannot fail because a
/// `Register` is always in range.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Registers {
  regs: [Word; REGISTER_COUNT]
}

impl Default for Registers {
  fn default() -> Registers {
    Registers { regs: [0; REGISTER_COUNT] }
  }
}

impl Registers {
  pub fn new() -> Registers {
    Registers::default()
  }

  pub fn get(&self, register: Register) -> Word {
    self.regs[register.idx()]
  }

  pub fn set(&mut self, register: Register, value: Word) {
    self.regs[register.idx()] = value;
  }

  pub fn as_slice(&self) -> &[Word] {
    &self.regs
  }
}
