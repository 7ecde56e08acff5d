//! The assembler's trace: one entry per encoded instruction, keyed by source line, in program
//! order. It exists for diagnostics only; nothing executes from it.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::{Instruction, Operand};

/// The fields of one instruction exactly as they were handed to the encoder.
#[derive(Serialize, Clone, Eq, PartialEq, Debug)]
pub struct TraceEntry {
  #[serde(skip)]
  pub line: usize,
  pub mnemonic: &'static str,
  #[serde(rename = "A")]
  pub a: u8,
  #[serde(rename = "B")]
  pub b: Operand,
  #[serde(rename = "C")]
  pub c: Operand,
  #[serde(rename = "D", skip_serializing_if = "Option::is_none")]
  pub d: Option<Operand>,
}

impl TraceEntry {
  pub fn new(line: usize, instruction: &Instruction) -> TraceEntry {
    let operation = instruction.operation();
    let operands  = instruction.operands();
    TraceEntry {
      line,
      mnemonic : operation.mnemonic(),
      a        : operation.code(),
      b        : operands[0],
      c        : operands[1],
      d        : operands.get(2).copied(),
    }
  }

  /// The key of this entry in the trace document.
  pub fn key(&self) -> String {
    format!("instruction_{}", self.line)
  }
}

/// Serializes as a JSON object whose keys keep insertion order.
#[derive(Clone, Default, Eq, PartialEq, Debug)]
pub struct Trace {
  entries: Vec<TraceEntry>
}

impl Trace {
  pub fn new() -> Trace {
    Trace::default()
  }

  pub fn push(&mut self, entry: TraceEntry) {
    self.entries.push(entry);
  }

  pub fn entries(&self) -> &[TraceEntry] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Pretty printed JSON, two space indent.
  pub fn to_json(&self) -> serde_json::Result<String> {
    serde_json::to_string_pretty(self)
  }
}

impl Serialize for Trace {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.entries.len()))?;
    for entry in &self.entries {
      map.serialize_entry(&entry.key(), entry)?;
    }
    map.end()
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::Operation;

  #[test]
  fn trace_document_shape() {
    let mut trace = Trace::new();
    let load = Instruction::from_operands(Operation::LoadConst, &[10, 0]).unwrap();
    let leq  = Instruction::from_operands(Operation::Leq, &[0, 2, 1]).unwrap();
    trace.push(TraceEntry::new(3, &load));
    trace.push(TraceEntry::new(1, &leq));

    let expected = r#"{
  "instruction_3": {
    "mnemonic": "LOAD_CONST",
    "A": 57,
    "B": 10,
    "C": 0
  },
  "instruction_1": {
    "mnemonic": "LEQ",
    "A": 19,
    "B": 0,
    "C": 2,
    "D": 1
  }
}"#;
    assert_eq!(trace.to_json().unwrap(), expected);
  }

  #[test]
  fn empty_trace() {
    assert_eq!(Trace::new().to_json().unwrap(), "{}");
  }
}
