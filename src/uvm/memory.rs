use std::convert::TryFrom;

use crate::register::Word;

/// Number of cells in memory unless configured otherwise.
pub const DEFAULT_MEMORY_SIZE: usize = 256;

/// Fixed size, zero initialized data memory. Addresses are computed at run time from register
/// contents, so every access is bounds checked.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Memory {
  cells: Vec<Word>
}

impl Default for Memory {
  fn default() -> Memory {
    Memory::new(DEFAULT_MEMORY_SIZE)
  }
}

impl Memory {
  pub fn new(size: usize) -> Memory {
    Memory { cells: vec![0; size] }
  }

  pub fn len(&self) -> usize {
    self.cells.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cells.is_empty()
  }

  /// Converts a computed address to an index, or `None` if it lies outside memory.
  pub fn index(&self, address: u64) -> Option<usize> {
    usize::try_from(address).ok()
                            .filter(|&idx| idx < self.cells.len())
  }

  pub fn get(&self, address: u64) -> Option<Word> {
    self.index(address).map(|idx| self.cells[idx])
  }

  /// Writes `value` at `idx`. Returns `false`, leaving memory untouched, if `idx` is out of bounds.
  pub fn set(&mut self, idx: usize, value: Word) -> bool {
    match self.cells.get_mut(idx) {
      Some(cell) => {
        *cell = value;
        true
      }
      None => false
    }
  }

  pub fn as_slice(&self) -> &[Word] {
    &self.cells
  }
}
