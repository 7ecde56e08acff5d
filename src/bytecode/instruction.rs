use std::convert::TryFrom;
use std::fmt::{Display, Formatter};

use strum_macros::{Display as StrumDisplay, EnumString, IntoStaticStr};
use num_enum::{TryFromPrimitive, IntoPrimitive};

use crate::error::BytecodeError;
use crate::register::{Register, Word};

/// A textual or decoded operand value before it has been checked against its field.
pub type Operand = i64;

/// Width of the opcode field that leads every instruction.
pub const OPCODE_BITS: u32 = 6;

/**
  Opcodes of the virtual machine.

  The discriminant of each variant is its numeric opcode, so `TryFromPrimitive` is the decoder's
  opcode lookup and `IntoPrimitive` is the encoder's. The strum derives give the mnemonic in both
  directions; parsing ignores case.
*/
#[derive(
StrumDisplay, IntoStaticStr, EnumString, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq,         PartialEq,        Debug,         Hash
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[repr(u8)]
pub enum Operation {
  LoadConst = 57,  // LOAD_CONST value dest
  ReadMem   = 28,  // READ_MEM   dest address
  WriteMem  = 61,  // WRITE_MEM  value base offset
  Leq       = 19,  // LEQ        left dest right
}

/// A named operand field of an instruction. `shift` counts from the least significant bit of the
/// whole instruction read as a big-endian integer.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct Field {
  pub name  : &'static str,
  pub width : u32,
  pub shift : u32,
}

impl Field {
  const fn new(name: &'static str, width: u32, shift: u32) -> Field {
    Field { name, width, shift }
  }

  /// Largest value the field can hold.
  pub fn max_value(&self) -> u64 {
    (1u64 << self.width) - 1
  }

  pub fn contains(&self, value: Operand) -> bool {
    value >= 0 && (value as u64) <= self.max_value()
  }

  pub fn pack(&self, value: u64) -> u64 {
    value << self.shift
  }

  pub fn extract(&self, packed: u64) -> u64 {
    (packed >> self.shift) & self.max_value()
  }
}

// [A:6][B:31][C:5][unused:6]
const LOAD_CONST_FIELDS: [Field; 2] = [Field::new("B", 31, 11), Field::new("C", 5, 6)];
// [A:6][B:5][C:5]
const READ_MEM_FIELDS: [Field; 2] = [Field::new("B", 5, 5), Field::new("C", 5, 0)];
// [A:6][B:5][C:5][D:5][unused:3]
const THREE_REGISTER_FIELDS: [Field; 3] = [
  Field::new("B", 5, 13),
  Field::new("C", 5, 8),
  Field::new("D", 5, 3)
];

impl Operation {
  /// Every operation of the instruction set.
  pub const ALL: [Operation; 4] = [
    Operation::LoadConst,
    Operation::ReadMem,
    Operation::WriteMem,
    Operation::Leq
  ];

  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  pub fn mnemonic(&self) -> &'static str {
    (*self).into()
  }

  /// Total size of the encoded instruction in bytes.
  pub fn width(&self) -> usize {
    match self {
      Operation::LoadConst => 6,
      Operation::ReadMem   => 2,
      Operation::WriteMem  => 3,
      Operation::Leq       => 3,
    }
  }

  /// The operand fields following the opcode, in assembly order.
  pub fn fields(&self) -> &'static [Field] {
    match self {
      Operation::LoadConst => &LOAD_CONST_FIELDS,
      Operation::ReadMem   => &READ_MEM_FIELDS,
      | Operation::WriteMem
      | Operation::Leq     => &THREE_REGISTER_FIELDS,
    }
  }

  pub fn arity(&self) -> usize {
    self.fields().len()
  }

  /// The opcode field. It always occupies the 6 most significant bits.
  pub fn opcode_field(&self) -> Field {
    Field::new("A", OPCODE_BITS, 8 * self.width() as u32 - OPCODE_BITS)
  }

  /// Resolves the opcode from the first byte of an instruction, before its width is known.
  pub fn from_leading_byte(byte: u8) -> Result<Operation, u8> {
    let code = byte >> (8 - OPCODE_BITS);
    Operation::try_from(code).map_err(|_| code)
  }
}

/// Holds the unencoded components of an instruction, one variant per opcode. Registers are already
/// range checked by construction; `value` and `offset` are checked when encoding.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Instruction {
  /// `registers[dest] <- value`
  LoadConst { value: Word, dest: Register },
  /// `registers[dest] <- memory[registers[address]]`
  ReadMem { dest: Register, address: Register },
  /// `memory[registers[base] + offset] <- registers[value]`
  WriteMem { value: Register, base: Register, offset: u8 },
  /// `registers[dest] <- registers[left] <= registers[right]`
  Leq { left: Register, dest: Register, right: Register },
}

impl Instruction {
  pub fn operation(&self) -> Operation {
    match self {
      Instruction::LoadConst { .. } => Operation::LoadConst,
      Instruction::ReadMem   { .. } => Operation::ReadMem,
      Instruction::WriteMem  { .. } => Operation::WriteMem,
      Instruction::Leq       { .. } => Operation::Leq,
    }
  }

  /// The operand tuple in field order, as it appears in assembly.
  pub fn operands(&self) -> Vec<Operand> {
    match *self {
      Instruction::LoadConst { value, dest } => {
        vec![value as Operand, dest.number() as Operand]
      }
      Instruction::ReadMem { dest, address } => {
        vec![dest.number() as Operand, address.number() as Operand]
      }
      Instruction::WriteMem { value, base, offset } => {
        vec![value.number() as Operand, base.number() as Operand, offset as Operand]
      }
      Instruction::Leq { left, dest, right } => {
        vec![left.number() as Operand, dest.number() as Operand, right.number() as Operand]
      }
    }
  }

  /**
    Builds an instruction from an operand tuple, checking arity and that every operand fits the
    width of its field. This is the only place operand values are validated.
  */
  pub fn from_operands(operation: Operation, operands: &[Operand])
    -> Result<Instruction, BytecodeError>
  {
    let fields = operation.fields();
    if operands.len() != fields.len() {
      return Err(BytecodeError::OperandCountMismatch {
        operation,
        expected: fields.len(),
        found: operands.len()
      });
    }

    for (field, &value) in fields.iter().zip(operands) {
      if !field.contains(value) {
        return Err(BytecodeError::OperandOutOfRange {
          operation,
          field: field.name,
          value,
          width: field.width
        });
      }
    }

    let register = |i: usize| Register::from_field(operands[i] as u64);
    let instruction = match operation {
      Operation::LoadConst => Instruction::LoadConst {
        value : operands[0] as Word,
        dest  : register(1)
      },
      Operation::ReadMem => Instruction::ReadMem {
        dest    : register(0),
        address : register(1)
      },
      Operation::WriteMem => Instruction::WriteMem {
        value  : register(0),
        base   : register(1),
        offset : operands[2] as u8
      },
      Operation::Leq => Instruction::Leq {
        left  : register(0),
        dest  : register(1),
        right : register(2)
      },
    };
    Ok(instruction)
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.operation())?;
    for operand in self.operands() {
      write!(f, " {}", operand)?;
    }
    Ok(())
  }
}
