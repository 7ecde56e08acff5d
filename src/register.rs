//! Register indices and machine words. A `Register` can only be built for an index that fits the
//! 5 bit register fields of the instruction encoding, so the register file never needs a bounds
//! check of its own.

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};

/// Contents of a register or a memory cell. Wide enough for the 31 bit `LOAD_CONST` immediate.
pub type Word = u32;

/// Size of the register file.
pub const REGISTER_COUNT: usize = 32;

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct Register(u8);

impl Register {
  /// Returns `None` if `index` does not name one of the `REGISTER_COUNT` registers.
  pub fn new(index: u8) -> Option<Register> {
    match (index as usize) < REGISTER_COUNT {
      true  => Some(Register(index)),
      false => None
    }
  }

  /// Builds a register from the bits of a 5 bit register field. Callers check the field width
  /// first, so nothing is lost to the modulus.
  pub(crate) fn from_field(bits: u64) -> Register {
    Register((bits % REGISTER_COUNT as u64) as u8)
  }

  /// Converts the register to an index into the register file.
  pub fn idx(&self) -> usize {
    self.0 as usize
  }

  pub fn number(&self) -> u8 {
    self.0
  }

  /// Every register, in index order.
  pub fn all() -> impl Iterator<Item = Register> {
    (0..REGISTER_COUNT as u8).map(Register)
  }
}

impl TryFrom<i64> for Register {
  type Error = i64;

  fn try_from(value: i64) -> Result<Register, i64> {
    u8::try_from(value).ok()
                       .and_then(Register::new)
                       .ok_or(value)
  }
}

impl Display for Register {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "R[{}]", self.0)
  }
}
