//! The educational virtual machine: a register file, a fixed data memory, and a program counter
//! walking a binary image one variable width instruction at a time.

use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};
use tracing::{debug, info};

use crate::bytecode::{decode_instruction, Instruction};
use crate::error::{MachineError, RangeError};
use crate::register::{Register, Word};

mod memory;
mod observer;
mod range;
mod registers;

pub use memory::{Memory, DEFAULT_MEMORY_SIZE};
#[cfg(feature = "trace_computation")]
pub use observer::StepTable;
pub use observer::{Effect, Observer, Recorder, StepEvent};
pub use range::MemoryRange;
pub use registers::Registers;

/// Tunables of a machine instance.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct MachineConfig {
  pub memory_size : usize,
  /// Stop with `StepLimitExceeded` after this many steps. The instruction set cannot loop, so
  /// this only guards against oversized images.
  pub step_limit  : Option<u64>,
}

impl Default for MachineConfig {
  fn default() -> MachineConfig {
    MachineConfig {
      memory_size : DEFAULT_MEMORY_SIZE,
      step_limit  : None
    }
  }
}

pub struct UVM {
  config    : MachineConfig,

  // Memory Stores
  image     : Vec<u8>,  // Code memory, read only
  memory    : Memory,   // Data memory

  // Registers //
  registers : Registers,
  pc        : usize,    // Byte offset of the next instruction

  steps       : u64,
  last_effect : Option<Effect>, // Highlighted when displayed
}

impl UVM {

  // region Construction and state access

  pub fn new() -> UVM {
    UVM::with_config(MachineConfig::default())
  }

  pub fn with_config(config: MachineConfig) -> UVM {
    UVM {
      config,
      image       : vec![],
      memory      : Memory::new(config.memory_size),
      registers   : Registers::new(),
      pc          : 0,
      steps       : 0,
      last_effect : None,
    }
  }

  /// Replaces the program and rewinds the program counter. Registers and memory are kept.
  pub fn load<B: Into<Vec<u8>>>(&mut self, image: B) {
    self.image = image.into();
    self.pc    = 0;
    self.steps = 0;
    info!(bytes = self.image.len(), "loaded program");
  }

  /// Zeroes registers and memory and rewinds the program counter.
  pub fn reset(&mut self) {
    self.memory      = Memory::new(self.config.memory_size);
    self.registers   = Registers::new();
    self.pc          = 0;
    self.steps       = 0;
    self.last_effect = None;
  }

  pub fn config(&self) -> &MachineConfig {
    &self.config
  }

  pub fn image(&self) -> &[u8] {
    &self.image
  }

  pub fn registers(&self) -> &Registers {
    &self.registers
  }

  pub fn memory(&self) -> &Memory {
    &self.memory
  }

  pub fn pc(&self) -> usize {
    self.pc
  }

  /// Number of instructions executed since the last `load` or `reset`.
  pub fn steps(&self) -> u64 {
    self.steps
  }

  pub fn is_halted(&self) -> bool {
    self.pc >= self.image.len()
  }

  /// Read-only view of an inclusive range of memory.
  pub fn memory_slice(&self, range: &MemoryRange) -> Result<&[Word], RangeError> {
    range.check(self.memory.len())?;
    Ok(&self.memory.as_slice()[range.start()..=range.end()])
  }

  // endregion

  // region Execution

  /// Executes the next instruction. Returns `None` once the program counter has reached the end
  /// of the image. On error nothing about the machine has changed.
  pub fn step(&mut self) -> Result<Option<StepEvent>, MachineError> {
    self.step_with(&mut ())
  }

  pub fn step_with<O: Observer + ?Sized>(&mut self, observer: &mut O)
    -> Result<Option<StepEvent>, MachineError>
  {
    if self.is_halted() {
      return Ok(None);
    }
    if let Some(limit) = self.config.step_limit {
      if self.steps >= limit {
        return Err(MachineError::StepLimitExceeded { limit });
      }
    }

    // Fetch and decode. `decode_instruction` sniffs the opcode from the leading byte, then
    // checks that the whole instruction is present.
    let pc          = self.pc;
    let instruction = decode_instruction(&self.image, pc)?;

    // Execute
    let effect = self.effect_of(&instruction, pc)?;
    self.apply(effect);
    self.pc    += instruction.operation().width();
    self.steps += 1;

    let event = StepEvent { pc, instruction, effect };
    debug!(pc, %instruction, %effect, "step");
    observer.on_step(&event, self);

    Ok(Some(event))
  }

  /// Runs until the program counter reaches the end of the image. Returns the number of steps.
  pub fn run(&mut self) -> Result<u64, MachineError> {
    self.run_with(&mut ())
  }

  pub fn run_with<O: Observer + ?Sized>(&mut self, observer: &mut O) -> Result<u64, MachineError> {
    let start = self.steps;
    while self.step_with(observer)?.is_some() {}
    let executed = self.steps - start;
    info!(steps = executed, "halted");
    Ok(executed)
  }

  /// Computes what `instruction` will change without changing anything. Memory bounds are checked
  /// here so that a faulting instruction has no effect at all.
  fn effect_of(&self, instruction: &Instruction, pc: usize) -> Result<Effect, MachineError> {
    let effect = match *instruction {

      Instruction::LoadConst { value, dest } => {
        Effect::Register { register: dest, value }
      }

      Instruction::ReadMem { dest, address } => {
        let address = self.registers.get(address) as u64;
        let value   = self.memory.get(address).ok_or_else(|| self.out_of_bounds(pc, address))?;
        Effect::Register { register: dest, value }
      }

      Instruction::WriteMem { value, base, offset } => {
        let address = self.registers.get(base) as u64 + offset as u64;
        let address = self.memory.index(address).ok_or_else(|| self.out_of_bounds(pc, address))?;
        Effect::Memory { address, value: self.registers.get(value) }
      }

      Instruction::Leq { left, dest, right } => {
        let value = (self.registers.get(left) <= self.registers.get(right)) as Word;
        Effect::Register { register: dest, value }
      }

    };
    Ok(effect)
  }

  fn apply(&mut self, effect: Effect) {
    match effect {
      Effect::Register { register, value } => self.registers.set(register, value),
      Effect::Memory { address, value } => {
        // `effect_of` already bounds checked the address.
        let written = self.memory.set(address, value);
        debug_assert!(written);
      }
    }
    self.last_effect = Some(effect);
  }

  fn out_of_bounds(&self, pc: usize, address: u64) -> MachineError {
    MachineError::MemoryOutOfBounds { pc, address, size: self.memory.len() }
  }

  // endregion

  // region Display methods

  fn make_register_table<I>(name: &str, cells: I, highlight: Option<usize>) -> Table
    where I: IntoIterator<Item = (usize, Word)>
  {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents"]);

    for (i, value) in cells {
      match Some(i) == highlight {

        true  => {
          table.add_row(row![r->format!("* --> {}[{}] =", name, i), value]);
        }

        false => {
          table.add_row(row![r->format!("{}[{}] =", name, i), value]);
        }

      } // end match on highlight
    } // end for
    table
  }

  // endregion
}

impl Default for UVM {
  fn default() -> UVM {
    UVM::new()
  }
}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

/// Shows every register and the non-zero memory cells, marking the last cell written.
impl Display for UVM {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let (register_highlight, memory_highlight) = match self.last_effect {
      Some(Effect::Register { register, .. }) => (Some(register.idx()), None),
      Some(Effect::Memory { address, .. })    => (None, Some(address)),
      None                                    => (None, None)
    };

    let r_table = UVM::make_register_table(
      "R",
      Register::all().map(|r| (r.idx(), self.registers.get(r))),
      register_highlight
    );
    let m_table = UVM::make_register_table(
      "M",
      self.memory
          .as_slice()
          .iter()
          .copied()
          .enumerate()
          .filter(|&(i, value)| value != 0 || Some(i) == memory_highlight),
      memory_highlight
    );

    let mut combined_table = table!([r_table, m_table]);

    combined_table.set_titles(row![ub->"Registers", ub->"Memory"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    write!(
      f,
      "PC: {} of {} bytes\tSteps: {}\n{}",
      self.pc, self.image.len(), self.steps, combined_table
    )
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::{assemble, encode, Operation};
  use crate::error::BytecodeError;

  fn machine_for(text: &str) -> UVM {
    let mut machine = UVM::new();
    machine.load(assemble(text).unwrap().image);
    machine
  }

  fn reg(i: u8) -> Register {
    Register::new(i).unwrap()
  }

  #[test]
  fn load_const() {
    let mut machine = machine_for("LOAD_CONST 2147483647 31");
    assert_eq!(machine.run(), Ok(1));
    assert_eq!(machine.registers().get(reg(31)), 2147483647);
    assert_eq!(machine.pc(), 6);
    assert!(machine.is_halted());
  }

  #[test]
  fn leq_compares_registers() {
    let mut machine = machine_for("
      LOAD_CONST 10 0
      LOAD_CONST 20 1
      LEQ 0 2 1   # 10 <= 20
      LEQ 1 3 0   # 20 <= 10
      LEQ 0 4 0   # 10 <= 10
    ");
    machine.run().unwrap();
    assert_eq!(machine.registers().get(reg(2)), 1);
    assert_eq!(machine.registers().get(reg(3)), 0);
    assert_eq!(machine.registers().get(reg(4)), 1);
  }

  #[test]
  fn write_then_read_memory() {
    let mut machine = machine_for("
      LOAD_CONST 5 0
      WRITE_MEM 0 1 3     # M[R1 + 3] <- R0
      LOAD_CONST 3 2
      READ_MEM 4 2        # R4 <- M[R2]
    ");
    machine.run().unwrap();
    assert_eq!(machine.memory().as_slice()[3], 5);
    assert_eq!(machine.registers().get(reg(4)), 5);
    assert_eq!(machine.pc(), 6 + 3 + 6 + 2);
  }

  #[test]
  fn step_events() {
    let mut machine  = machine_for("LOAD_CONST 7 1\nWRITE_MEM 1 0 9");
    let mut recorder = Recorder::new();
    assert_eq!(machine.run_with(&mut recorder), Ok(2));

    let effects: Vec<(usize, Effect)> = recorder.events.iter().map(|e| (e.pc, e.effect)).collect();
    assert_eq!(
      effects,
      vec![
        (0, Effect::Register { register: reg(1), value: 7 }),
        (6, Effect::Memory { address: 9, value: 7 }),
      ]
    );
    assert_eq!(machine.step(), Ok(None));
  }

  #[test]
  fn empty_image_halts_immediately() {
    let mut machine = UVM::new();
    assert_eq!(machine.run(), Ok(0));
    assert_eq!(machine.pc(), 0);
  }

  #[test]
  fn truncated_instruction_changes_nothing() {
    let mut image = encode(Operation::LoadConst, &[1, 0]).unwrap();
    image.extend(&encode(Operation::LoadConst, &[9, 1]).unwrap()[..4]);

    let mut machine = UVM::new();
    machine.load(image);
    assert_eq!(
      machine.run(),
      Err(MachineError::Decode(BytecodeError::TruncatedInstruction {
        operation: Operation::LoadConst,
        offset: 6,
        needed: 6,
        available: 4
      }))
    );
    assert_eq!(machine.pc(), 6);
    assert_eq!(machine.registers().get(reg(0)), 1);
    assert_eq!(machine.registers().get(reg(1)), 0);
  }

  #[test]
  fn unknown_opcode_is_fatal() {
    let mut machine = UVM::new();
    machine.load(vec![0xFF, 0xFF]);
    assert_eq!(
      machine.step(),
      Err(MachineError::Decode(BytecodeError::UnknownOpcode { opcode: 63, offset: 0 }))
    );
    assert_eq!(machine.pc(), 0);
  }

  #[test]
  fn write_out_of_bounds_changes_nothing() {
    let mut machine = machine_for("LOAD_CONST 250 0\nLOAD_CONST 1 1\nWRITE_MEM 1 0 6");
    assert_eq!(
      machine.run(),
      Err(MachineError::MemoryOutOfBounds { pc: 12, address: 256, size: 256 })
    );
    assert!(machine.memory().as_slice().iter().all(|&w| w == 0));
    assert_eq!(machine.pc(), 12);
  }

  #[test]
  fn read_out_of_bounds() {
    let mut machine = machine_for("LOAD_CONST 2147483647 0\nREAD_MEM 1 0");
    assert!(matches!(
      machine.run(),
      Err(MachineError::MemoryOutOfBounds { pc: 6, address: 2147483647, .. })
    ));
  }

  #[test]
  fn configured_memory_size() {
    let config = MachineConfig { memory_size: 4, ..MachineConfig::default() };
    let mut machine = UVM::with_config(config);
    machine.load(assemble("LOAD_CONST 9 0\nWRITE_MEM 0 1 3\nWRITE_MEM 0 1 4").unwrap().image);
    assert!(matches!(machine.run(), Err(MachineError::MemoryOutOfBounds { size: 4, .. })));
    assert_eq!(machine.memory().as_slice(), &[0, 0, 0, 9]);
  }

  #[test]
  fn step_limit() {
    let config = MachineConfig { step_limit: Some(1), ..MachineConfig::default() };
    let mut machine = UVM::with_config(config);
    machine.load(assemble("LOAD_CONST 1 0\nLOAD_CONST 2 0").unwrap().image);
    assert_eq!(machine.run(), Err(MachineError::StepLimitExceeded { limit: 1 }));
    assert_eq!(machine.registers().get(reg(0)), 1);
  }

  #[test]
  fn memory_slice() {
    let mut machine = machine_for("LOAD_CONST 42 0\nWRITE_MEM 0 1 2");
    machine.run().unwrap();
    let range = MemoryRange::parse("1:3", machine.memory().len()).unwrap();
    assert_eq!(machine.memory_slice(&range), Ok(&[0, 42, 0][..]));

    let small = UVM::with_config(MachineConfig { memory_size: 2, step_limit: None });
    assert!(small.memory_slice(&range).is_err());
  }

  #[test]
  fn reset_zeroes_state() {
    let mut machine = machine_for("LOAD_CONST 42 0\nWRITE_MEM 0 0 0");
    machine.run().unwrap();
    machine.reset();
    assert_eq!(machine.registers(), &Registers::new());
    assert_eq!(machine.memory(), &Memory::default());
    assert_eq!(machine.run(), Ok(2));
  }

  #[test]
  fn display_marks_last_write() {
    let mut machine = machine_for("LOAD_CONST 42 0\nWRITE_MEM 0 1 17");
    machine.run().unwrap();
    let text = machine.to_string();
    assert!(text.contains("PC: 9 of 9 bytes"));
    assert!(text.contains("* --> M[17] ="));
    assert!(text.contains("R[31] ="));
  }
}
