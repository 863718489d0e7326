//! FlowVM - tensor dataflow graph compiler and virtual machine
//!
//! Compiles a dataflow graph of typed tensor operations into a linear
//! instruction program and executes it on a small register-style
//! interpreter with memory-usage instrumentation.
//!
//! The pipeline is: [`ir::Graph`] → [`compiler::compile`] →
//! [`program::Program`] → [`vm::Interpreter`] → tensor outputs.
//! Static type knowledge attached to graph values survives lowering as
//! per-output instruction annotations, so the interpreter can
//! allocate, validate, and retire tensor storage without re-deriving
//! types at run time.

#![allow(clippy::needless_range_loop)] // Clearer for tensor index math
#![allow(clippy::collapsible_if)] // Sometimes clearer for control flow

pub mod compiler;
pub mod error;
pub mod inspect;
pub mod ir;
pub mod kernels;
pub mod logging;
pub mod meminfo;
pub mod program;
pub mod tensor;
pub mod vm;

pub use compiler::{compile, CompileError};
pub use error::{ErrorCategory, FlowResult, FlowVmError};
pub use ir::{DType, Dim, Graph, Node, TypeDesc, ValueDecl};
pub use meminfo::MemoryMonitor;
pub use program::{Instruction, OperandId, Program, ValueBinding};
pub use tensor::{Tensor, TensorError};
pub use vm::{
    run_program, ExecError, ExecutionOutputs, Interpreter, Kernel, KernelError, KernelRegistry,
    VmState,
};
