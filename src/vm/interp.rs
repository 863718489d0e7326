//! Sequential program interpreter.
//!
//! Executes a [`Program`] one instruction at a time against a
//! live-value table mapping operand ids to concrete tensors. Each
//! opcode is dispatched to its registered kernel; kernel outputs are
//! written back into the table, and input operands whose last consumer
//! has executed are retired so peak memory tracks the live working set
//! rather than the whole program's value count.
//!
//! Execution either halts with every declared output bound or fails
//! and leaves the outputs undefined; there is no partial-success mode.

use crate::ir::{Dim, TypeDesc};
use crate::meminfo::MemoryMonitor;
use crate::program::{OperandId, Program};
use crate::tensor::Tensor;
use crate::vm::registry::{KernelError, KernelRegistry};
use std::collections::HashMap;
use thiserror::Error;

/// Interpreter lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    /// Before the first instruction.
    Ready,
    /// Executing (or about to execute) the instruction at `pc`.
    Running { pc: usize },
    /// All instructions executed; outputs are bound.
    Halted,
    /// An unrecoverable error occurred; outputs are undefined.
    Failed,
}

/// Fatal execution failures. All carry enough context (instruction
/// index, opcode) to reproduce; none are retried.
#[derive(Debug, Error)]
pub enum ExecError {
    /// A malformed program read an operand that was never produced.
    /// This is a compiler-bug-class failure, not a data problem.
    #[error("undefined operand {operand} read by instruction {pc} ('{opcode}')")]
    UndefinedOperand {
        pc: usize,
        opcode: String,
        operand: OperandId,
    },

    #[error("no kernel registered for opcode '{opcode}' (instruction {pc})")]
    UnknownOpcode { pc: usize, opcode: String },

    #[error("kernel '{opcode}' failed at instruction {pc}: {source}")]
    KernelExecution {
        pc: usize,
        opcode: String,
        #[source]
        source: KernelError,
    },

    /// A kernel produced output contradicting the instruction's
    /// declared static type. Never silently coerced.
    #[error("type mismatch at instruction {pc} ('{opcode}') output {output}: declared {declared}, produced {produced}")]
    TypeMismatch {
        pc: usize,
        opcode: String,
        output: usize,
        declared: String,
        produced: String,
    },

    #[error("instruction {pc} ('{opcode}') produced {got} outputs, expected {expected}")]
    OutputArity {
        pc: usize,
        opcode: String,
        expected: usize,
        got: usize,
    },

    #[error("program input '{0}' was never bound")]
    MissingInput(String),

    #[error("'{0}' is not a program input")]
    UnknownInput(String),

    #[error("program output '{name}' ({operand}) was never produced")]
    MissingOutput { name: String, operand: OperandId },

    #[error("interpreter cannot continue from state {state}")]
    InvalidState { state: String },
}

/// Tensors bound to the program's declared outputs, in declaration
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutputs {
    values: Vec<(String, Tensor)>,
}

impl ExecutionOutputs {
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Tensor)> {
        self.values.iter()
    }

    pub fn into_vec(self) -> Vec<(String, Tensor)> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Sequential interpreter over a single program.
///
/// Owns its live-value table exclusively for the lifetime of one
/// execution; kernels are blocking calls and no instruction is
/// suspended mid-dispatch, so aborting between instructions is always
/// a safe cancellation point for an embedding host.
pub struct Interpreter<'p> {
    program: &'p Program,
    registry: &'p KernelRegistry,
    monitor: MemoryMonitor,
    state: VmState,
    values: HashMap<OperandId, Tensor>,
    last_use: HashMap<OperandId, usize>,
}

impl<'p> Interpreter<'p> {
    pub fn new(program: &'p Program, registry: &'p KernelRegistry) -> Self {
        // Retirement schedule: last instruction index reading each
        // operand, computed once ahead of execution.
        let mut last_use = HashMap::new();
        for (pc, inst) in program.instructions.iter().enumerate() {
            for &id in &inst.inputs {
                last_use.insert(id, pc);
            }
        }
        Self {
            program,
            registry,
            monitor: MemoryMonitor::disabled(),
            state: VmState::Ready,
            values: HashMap::new(),
            last_use,
        }
    }

    /// Attach a memory monitor sampled around instruction boundaries.
    pub fn with_monitor(mut self, monitor: MemoryMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn state(&self) -> VmState {
        self.state
    }

    /// Bind a tensor to a declared program input. Only valid before
    /// execution starts.
    pub fn feed_input(&mut self, name: &str, tensor: Tensor) -> Result<(), ExecError> {
        if self.state != VmState::Ready {
            return Err(self.invalid_state());
        }
        let input = self
            .program
            .input_named(name)
            .ok_or_else(|| ExecError::UnknownInput(name.to_string()))?;
        self.values.insert(input.id, tensor);
        Ok(())
    }

    /// True while `id` is resolvable in the live-value table.
    pub fn is_live(&self, id: OperandId) -> bool {
        self.values.contains_key(&id)
    }

    /// Number of operands currently held live.
    pub fn live_count(&self) -> usize {
        self.values.len()
    }

    /// Execute the whole program and return the declared outputs.
    pub fn run(&mut self) -> Result<ExecutionOutputs, ExecError> {
        self.start()?;
        while let VmState::Running { pc } = self.state {
            self.execute_at(pc)?;
        }
        self.outputs()
    }

    /// Execute one instruction. The first call performs the
    /// ready-check and starts at instruction 0.
    pub fn step(&mut self) -> Result<VmState, ExecError> {
        if self.state == VmState::Ready {
            self.start()?;
        }
        match self.state {
            VmState::Running { pc } => {
                self.execute_at(pc)?;
                Ok(self.state)
            }
            VmState::Halted => Ok(VmState::Halted),
            VmState::Failed => Err(self.invalid_state()),
            VmState::Ready => unreachable!("start() leaves Ready"),
        }
    }

    /// The declared outputs of a halted execution.
    pub fn outputs(&self) -> Result<ExecutionOutputs, ExecError> {
        if self.state != VmState::Halted {
            return Err(self.invalid_state());
        }
        let mut values = Vec::with_capacity(self.program.outputs.len());
        for output in &self.program.outputs {
            let tensor = self
                .values
                .get(&output.id)
                .cloned()
                .ok_or_else(|| ExecError::MissingOutput {
                    name: output.name.clone(),
                    operand: output.id,
                })?;
            values.push((output.name.clone(), tensor));
        }
        Ok(ExecutionOutputs { values })
    }

    fn invalid_state(&self) -> ExecError {
        ExecError::InvalidState {
            state: format!("{:?}", self.state),
        }
    }

    fn start(&mut self) -> Result<(), ExecError> {
        if self.state != VmState::Ready {
            return Err(self.invalid_state());
        }
        for input in &self.program.inputs {
            if !self.values.contains_key(&input.id) {
                // Precondition failure, not an execution failure: the
                // caller may still feed the input and run.
                return Err(ExecError::MissingInput(input.name.clone()));
            }
        }
        self.state = if self.program.instructions.is_empty() {
            VmState::Halted
        } else {
            VmState::Running { pc: 0 }
        };
        Ok(())
    }

    fn execute_at(&mut self, pc: usize) -> Result<(), ExecError> {
        self.state = VmState::Running { pc };
        match self.dispatch(pc) {
            Ok(()) => {
                self.state = if pc + 1 == self.program.instructions.len() {
                    VmState::Halted
                } else {
                    VmState::Running { pc: pc + 1 }
                };
                Ok(())
            }
            Err(err) => {
                tracing::error!(pc, error = %err, "instruction failed");
                self.state = VmState::Failed;
                Err(err)
            }
        }
    }

    fn dispatch(&mut self, pc: usize) -> Result<(), ExecError> {
        let program = self.program;
        let inst = &program.instructions[pc];
        let mem_before = self.monitor.sample();

        let mut inputs: Vec<&Tensor> = Vec::with_capacity(inst.inputs.len());
        for &id in &inst.inputs {
            let tensor = self
                .values
                .get(&id)
                .ok_or_else(|| ExecError::UndefinedOperand {
                    pc,
                    opcode: inst.opcode.clone(),
                    operand: id,
                })?;
            inputs.push(tensor);
        }

        let kernel = self
            .registry
            .get(&inst.opcode)
            .ok_or_else(|| ExecError::UnknownOpcode {
                pc,
                opcode: inst.opcode.clone(),
            })?;

        let produced = kernel
            .execute(&inputs, &inst.output_types)
            .map_err(|source| ExecError::KernelExecution {
                pc,
                opcode: inst.opcode.clone(),
                source,
            })?;

        if produced.len() != inst.outputs.len() {
            return Err(ExecError::OutputArity {
                pc,
                opcode: inst.opcode.clone(),
                expected: inst.outputs.len(),
                got: produced.len(),
            });
        }
        for (i, (tensor, hint)) in produced.iter().zip(&inst.output_types).enumerate() {
            if !hint_admits(hint, tensor) {
                return Err(ExecError::TypeMismatch {
                    pc,
                    opcode: inst.opcode.clone(),
                    output: i,
                    declared: hint.to_string(),
                    produced: tensor.summary(),
                });
            }
        }

        for (&id, tensor) in inst.outputs.iter().zip(produced) {
            self.values.insert(id, tensor);
        }

        for &id in &inst.inputs {
            if self.last_use.get(&id) == Some(&pc) && !program.is_output_id(id) {
                if self.values.remove(&id).is_some() {
                    tracing::trace!(operand = %id, pc, "retired operand");
                }
            }
        }

        if let Some(before) = mem_before {
            let after = self.monitor.sample().unwrap_or(-1);
            if before < 0 || after < 0 {
                tracing::trace!(
                    pc,
                    opcode = %inst.opcode,
                    "memory usage not reported on this platform"
                );
            } else {
                tracing::trace!(
                    pc,
                    opcode = %inst.opcode,
                    before_bytes = before,
                    after_bytes = after,
                    delta_bytes = after - before,
                    "instruction memory usage"
                );
            }
        }
        Ok(())
    }
}

/// Feed every named input and run to completion in one call.
pub fn run_program(
    program: &Program,
    registry: &KernelRegistry,
    inputs: Vec<(String, Tensor)>,
) -> Result<ExecutionOutputs, ExecError> {
    let mut interp = Interpreter::new(program, registry);
    for (name, tensor) in inputs {
        interp.feed_input(&name, tensor)?;
    }
    interp.run()
}

/// Whether a declared static type admits the tensor a kernel actually
/// produced. Unknown dimensions are wildcards; everything else must
/// match exactly.
fn hint_admits(hint: &TypeDesc, tensor: &Tensor) -> bool {
    match hint {
        TypeDesc::Undefined => true,
        TypeDesc::Tensor { dtype, dims } => {
            *dtype == tensor.dtype()
                && dims.len() == tensor.rank()
                && dims.iter().zip(tensor.shape()).all(|(dim, &extent)| match dim {
                    Dim::Known(n) => *n == extent,
                    Dim::Unknown => true,
                })
        }
    }
}
