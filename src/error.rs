//! Errors raised by the codec, the assembler, and the virtual machine. Every error is fatal:
//! nothing in this crate retries or recovers.

use thiserror::Error;

use crate::bytecode::Operation;

/// Codec results. The machine and the assembler name their own error type.
pub type Result<T, E = BytecodeError> = std::result::Result<T, E>;

/// Errors that can occur while encoding or decoding a single instruction.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum BytecodeError {
  /// Assembly named an operation outside the instruction set.
  #[error("unknown mnemonic '{0}'")]
  UnknownMnemonic(String),

  /// The leading 6 bits of an instruction match no opcode.
  #[error("unknown opcode {opcode} at byte offset {offset}")]
  UnknownOpcode { opcode: u8, offset: usize },

  #[error("{operation} requires {expected} operands but was given {found}")]
  OperandCountMismatch {
    operation: Operation,
    expected: usize,
    found: usize
  },

  /// An operand does not fit its field. Operands are never masked.
  #[error("{operation} operand {field} = {value} does not fit in {width} bits")]
  OperandOutOfRange {
    operation: Operation,
    field: &'static str,
    value: i64,
    width: u32
  },

  #[error(
    "truncated {operation} at byte offset {offset}: needs {needed} bytes but only {available} remain"
  )]
  TruncatedInstruction {
    operation: Operation,
    offset: usize,
    needed: usize,
    available: usize
  },

  /// An instruction was requested at or past the end of the image.
  #[error("no instruction at byte offset {offset}: the image ends at byte {len}")]
  EndOfImage { offset: usize, len: usize },
}

/// Errors that stop the assembler. Every variant names the 1-based source line.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum AssemblyError {
  #[error("line {line}: {reason}")]
  Syntax { line: usize, reason: String },

  /// The codec error is printed inline and is not exposed through `source()`.
  #[error("line {line}: {error}")]
  Encoding { line: usize, error: BytecodeError },
}

impl AssemblyError {
  pub fn line(&self) -> usize {
    match self {
      | AssemblyError::Syntax { line, .. }
      | AssemblyError::Encoding { line, .. } => *line
    }
  }
}

/// Errors that stop the virtual machine. State is left exactly as it was before the failing step.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum MachineError {
  #[error(transparent)]
  Decode(#[from] BytecodeError),

  #[error("memory address {address} out of bounds (memory size {size}) at pc {pc}")]
  MemoryOutOfBounds { pc: usize, address: u64, size: usize },

  /// Only reachable when a step limit is configured.
  #[error("step limit of {limit} exceeded")]
  StepLimitExceeded { limit: u64 },
}

/// A malformed or out of bounds `start:end` memory range request.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum RangeError {
  #[error("invalid memory range '{request}': {reason}")]
  InvalidRangeRequest { request: String, reason: String },
}
