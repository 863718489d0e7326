//! The virtual machine: kernel registry and sequential interpreter.

pub mod interp;
pub mod registry;

pub use interp::{run_program, ExecError, ExecutionOutputs, Interpreter, VmState};
pub use registry::{Kernel, KernelError, KernelRegistry};
