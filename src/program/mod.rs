//! VM-side IR: operand ids, instructions, programs, and the value
//! bindings the compiler uses to emit typed outputs.

pub mod instruction;
pub mod validate;
pub mod value;

pub use instruction::{Instruction, OperandId, Program, ProgramInput, ProgramOutput};
pub use validate::{validate, ValidateError};
pub use value::ValueBinding;
