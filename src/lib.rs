/*!
  An educational virtual machine. A text program is assembled into a packed binary image, and the
  image is executed against 32 registers and a small data memory:

  ```text
  text -> [`bytecode::assemble`] -> image + trace -> [`UVM::run`] -> registers/memory -> slice
  ```

  The instruction set has no control flow, so every program runs straight through once.
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod bytecode;
pub mod error;
pub mod register;
pub mod uvm;

pub use bytecode::{assemble, Assembly, Instruction, Operation, Trace};
pub use error::{AssemblyError, BytecodeError, MachineError, RangeError};
pub use register::{Register, Word, REGISTER_COUNT};
pub use uvm::{MachineConfig, MemoryRange, UVM};
