/*!

  Instructions are variable width, bit packed, and big-endian. Bit 0 is the most significant bit
  of the first byte. Every instruction leads with the same 6 bit opcode, so the decoder can learn
  an instruction's width from its first byte before committing to a decode:

    LOAD_CONST  6 bytes   [A:6][B:31][C:5][unused:6]    B: immediate, C: destination register
    READ_MEM    2 bytes   [A:6][B:5][C:5]                B: destination, C: address register
    WRITE_MEM   3 bytes   [A:6][B:5][C:5][D:5][unused:3] B: value, C: base register, D: offset
    LEQ         3 bytes   [A:6][B:5][C:5][D:5][unused:3] B: left, C: destination, D: right

  Unused bits are written as zero and ignored when decoding. A binary image is the plain
  concatenation of encoded instructions: no header, no padding.

  The field table in `instruction` is the only description of this layout. The assembler and the
  virtual machine both go through `binary`.

*/

mod assembly;
mod binary;
mod instruction;
mod trace;

pub use assembly::{assemble, assemble_lines, parse_line, resolve_line, Assembly, SourceLine};
pub use binary::{decode_instruction, disassemble, encode, encode_instruction, encode_mnemonic,
                 peek_operation, PackedInstruction};
pub use instruction::{Field, Instruction, Operand, Operation, OPCODE_BITS};
pub use trace::{Trace, TraceEntry};
