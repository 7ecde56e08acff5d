//! Step events and the observers that receive them. The execution loop itself never prints.

use std::fmt::{Display, Formatter};
#[cfg(feature = "trace_computation")]
use std::io::{self, Write};

use crate::bytecode::Instruction;
use crate::register::{Register, Word};
use super::UVM;

/// The single state change made by one instruction.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Effect {
  Register { register: Register, value: Word },
  Memory { address: usize, value: Word },
}

impl Display for Effect {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Effect::Register { register, value } => write!(f, "{} <- {}", register, value),
      Effect::Memory { address, value }    => write!(f, "M[{}] <- {}", address, value),
    }
  }
}

/// One executed instruction: where it was fetched, what it was, and what it changed.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct StepEvent {
  pub pc          : usize,
  pub instruction : Instruction,
  pub effect      : Effect,
}

impl Display for StepEvent {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:04}: {:<20} {}", self.pc, self.instruction.to_string(), self.effect)
  }
}

/// Receives every step after its effect has been applied to `machine`.
pub trait Observer {
  fn on_step(&mut self, event: &StepEvent, machine: &UVM);
}

/// Observes nothing.
impl Observer for () {
  fn on_step(&mut self, _event: &StepEvent, _machine: &UVM) {}
}

/// Keeps every step event in order.
#[derive(Clone, Default, Debug)]
pub struct Recorder {
  pub events: Vec<StepEvent>
}

impl Recorder {
  pub fn new() -> Recorder {
    Recorder::default()
  }
}

impl Observer for Recorder {
  fn on_step(&mut self, event: &StepEvent, _machine: &UVM) {
    self.events.push(*event);
  }
}

/// Writes each step followed by the machine tables, the way the VM state is traced during
/// computation. The first write error stops further output and is kept for `finish`.
#[cfg(feature = "trace_computation")]
pub struct StepTable<W: Write> {
  out   : W,
  error : Option<io::Error>,
}

#[cfg(feature = "trace_computation")]
impl<W: Write> StepTable<W> {
  pub fn new(out: W) -> StepTable<W> {
    StepTable { out, error: None }
  }

  pub fn finish(self) -> io::Result<W> {
    match self.error {
      Some(error) => Err(error),
      None        => Ok(self.out)
    }
  }
}

#[cfg(feature = "trace_computation")]
impl<W: Write> Observer for StepTable<W> {
  fn on_step(&mut self, event: &StepEvent, machine: &UVM) {
    if self.error.is_some() {
      return;
    }
    if let Err(error) = writeln!(self.out, "{}\n{}", event, machine) {
      self.error = Some(error);
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::Operation;

  #[test]
  fn event_display() {
    let event = StepEvent {
      pc: 6,
      instruction: Instruction::from_operands(Operation::WriteMem, &[0, 0, 3]).unwrap(),
      effect: Effect::Memory { address: 3, value: 5 }
    };
    assert_eq!(event.to_string(), "0006: WRITE_MEM 0 0 3      M[3] <- 5");
  }

  #[cfg(feature = "trace_computation")]
  #[test]
  fn step_table_writes_every_step() {
    let mut machine = UVM::new();
    machine.load(crate::bytecode::assemble("LOAD_CONST 10 0\nLOAD_CONST 20 1").unwrap().image);

    let mut table = StepTable::new(Vec::new());
    machine.run_with(&mut table).unwrap();
    let text = String::from_utf8(table.finish().unwrap()).unwrap();

    assert!(text.contains("0000: LOAD_CONST 10 0"));
    assert!(text.contains("0006: LOAD_CONST 20 1"));
    assert!(text.contains("R[1] <- 20"));
  }
}
