/*!
  This module is responsible for the encoding and decoding of binary instructions. Both the
  assembler and the virtual machine go through these functions; neither does its own bit math.

*/

use super::{Instruction, Operand, Operation};
use crate::error::{BytecodeError, Result};

/// An instruction is packed into the low bits of this type before serialization. The widest
/// instruction is 48 bits.
pub type PackedInstruction = u64;

const PACKED_BYTES: usize = std::mem::size_of::<PackedInstruction>();

/**
  Encodes `operation` with the given operand tuple into exactly `operation.width()` big-endian
  bytes. Fails if the arity is wrong or any operand does not fit its field. Unused trailing bits
  are zero.
*/
pub fn encode(operation: Operation, operands: &[Operand]) -> Result<Vec<u8>> {
  let instruction = Instruction::from_operands(operation, operands)?;
  Ok(encode_instruction(&instruction))
}

/// Like `encode`, but resolves the operation from its mnemonic first.
pub fn encode_mnemonic(mnemonic: &str, operands: &[Operand]) -> Result<Vec<u8>> {
  let operation = mnemonic.parse::<Operation>()
                          .map_err(|_| BytecodeError::UnknownMnemonic(mnemonic.to_string()))?;
  encode(operation, operands)
}

/// Encodes an already validated instruction.
pub fn encode_instruction(instruction: &Instruction) -> Vec<u8> {
  let operation = instruction.operation();
  let mut packed =
    operation.opcode_field().pack(operation.code() as PackedInstruction);
  for (field, value) in operation.fields().iter().zip(instruction.operands()) {
    packed |= field.pack(value as PackedInstruction);
  }

  let bytes = packed.to_be_bytes();
  bytes[PACKED_BYTES - operation.width()..].to_vec()
}

/**
  Resolves the operation of the instruction starting at `offset` from its leading byte alone.
  This is how the width of the instruction is learned before it is decoded. An `offset` at or
  past the end of the image is `EndOfImage`.
*/
pub fn peek_operation(image: &[u8], offset: usize) -> Result<Operation> {
  let leading_byte = image.get(offset)
                          .copied()
                          .ok_or(BytecodeError::EndOfImage { offset, len: image.len() })?;
  Operation::from_leading_byte(leading_byte)
    .map_err(|opcode| BytecodeError::UnknownOpcode { opcode, offset })
}

/// Decodes the instruction starting at `offset` in `image`.
pub fn decode_instruction(image: &[u8], offset: usize) -> Result<Instruction> {
  let operation = peek_operation(image, offset)?;
  let width     = operation.width();
  let available = image.len().saturating_sub(offset);
  if available < width {
    return Err(BytecodeError::TruncatedInstruction {
      operation,
      offset,
      needed: width,
      available
    });
  }

  let mut bytes = [0u8; PACKED_BYTES];
  bytes[PACKED_BYTES - width..].copy_from_slice(&image[offset..offset + width]);
  let packed = PackedInstruction::from_be_bytes(bytes);

  let operands: Vec<Operand> =
    operation.fields()
             .iter()
             .map(|field| field.extract(packed) as Operand)
             .collect();
  Instruction::from_operands(operation, &operands)
}

/**
  Decodes an entire binary image, returning each instruction with its byte offset. Uses the same
  fetch discipline as the virtual machine, so an image that disassembles cleanly also fetches
  cleanly.
*/
pub fn disassemble(image: &[u8]) -> Result<Vec<(usize, Instruction)>> {
  let mut offset = 0;
  let mut listing = Vec::new();
  while offset < image.len() {
    let instruction = decode_instruction(image, offset)?;
    listing.push((offset, instruction));
    offset += instruction.operation().width();
  }
  Ok(listing)
}
