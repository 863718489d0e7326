//! Opcode-keyed kernel registry.
//!
//! The interpreter is decoupled from any specific kernel
//! implementation: execution behavior is looked up by opcode name at
//! dispatch time, so new opcodes can be added without touching the
//! interpreter.

use crate::ir::{DType, TypeDesc};
use crate::tensor::{Tensor, TensorError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Failures raised by kernel implementations.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("expected {expected} inputs, got {got}")]
    Arity { expected: usize, got: usize },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("unsupported dtype {dtype} for {op}")]
    UnsupportedDType { op: &'static str, dtype: DType },

    #[error(transparent)]
    Tensor(#[from] TensorError),

    #[error("{0}")]
    Other(String),
}

/// Executable behavior bound to an opcode.
///
/// Kernels are blocking, deterministic calls: they receive the
/// resolved input tensors and the instruction's output type
/// annotations as allocation hints, and return one concrete tensor
/// per declared output. An undefined hint means the kernel must derive
/// shape and kind from its inputs itself.
pub trait Kernel: Send + Sync {
    fn execute(&self, inputs: &[&Tensor], hints: &[TypeDesc]) -> Result<Vec<Tensor>, KernelError>;
}

impl<F> Kernel for F
where
    F: Fn(&[&Tensor], &[TypeDesc]) -> Result<Vec<Tensor>, KernelError> + Send + Sync,
{
    fn execute(&self, inputs: &[&Tensor], hints: &[TypeDesc]) -> Result<Vec<Tensor>, KernelError> {
        self(inputs, hints)
    }
}

/// Lookup table from opcode name to kernel.
#[derive(Default)]
pub struct KernelRegistry {
    kernels: HashMap<String, Arc<dyn Kernel>>,
}

impl KernelRegistry {
    /// An empty registry with no opcodes bound.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in kernel set.
    pub fn with_default_kernels() -> Self {
        let mut registry = Self::new();
        crate::kernels::install(&mut registry);
        registry
    }

    /// Bind `kernel` to `opcode`, replacing any previous binding.
    pub fn register(&mut self, opcode: impl Into<String>, kernel: impl Kernel + 'static) {
        self.kernels.insert(opcode.into(), Arc::new(kernel));
    }

    pub fn get(&self, opcode: &str) -> Option<Arc<dyn Kernel>> {
        self.kernels.get(opcode).cloned()
    }

    pub fn contains(&self, opcode: &str) -> bool {
        self.kernels.contains_key(opcode)
    }

    /// Registered opcode names, sorted for stable output.
    pub fn opcodes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.kernels.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_registration() {
        let mut registry = KernelRegistry::new();
        registry.register(
            "Double",
            |inputs: &[&Tensor], _hints: &[TypeDesc]| -> Result<Vec<Tensor>, KernelError> {
                let values = inputs[0].as_f32()?;
                let doubled: Vec<f32> = values.iter().map(|v| v * 2.0).collect();
                Ok(vec![Tensor::from_f32(inputs[0].shape().to_vec(), &doubled)?])
            },
        );

        assert!(registry.contains("Double"));
        let kernel = registry.get("Double").unwrap();
        let input = Tensor::from_f32(vec![2], &[1.0, 2.0]).unwrap();
        let outputs = kernel.execute(&[&input], &[TypeDesc::Undefined]).unwrap();
        assert_eq!(outputs[0].as_f32().unwrap(), vec![2.0, 4.0]);
    }

    #[test]
    fn test_missing_opcode() {
        let registry = KernelRegistry::new();
        assert!(registry.get("Nothing").is_none());
    }

    #[test]
    fn test_rebinding_replaces() {
        let mut registry = KernelRegistry::new();
        let constant = |value: f32| {
            move |_inputs: &[&Tensor], _hints: &[TypeDesc]| -> Result<Vec<Tensor>, KernelError> {
                Ok(vec![Tensor::from_f32(vec![], &[value])?])
            }
        };
        registry.register("K", constant(1.0));
        registry.register("K", constant(2.0));

        let out = registry.get("K").unwrap().execute(&[], &[]).unwrap();
        assert_eq!(out[0].as_f32().unwrap(), vec![2.0]);
    }

    #[test]
    fn test_opcodes_sorted() {
        let mut registry = KernelRegistry::with_default_kernels();
        registry.register(
            "AAA",
            |_: &[&Tensor], _: &[TypeDesc]| -> Result<Vec<Tensor>, KernelError> { Ok(Vec::new()) },
        );
        let names = registry.opcodes();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert_eq!(names[0], "AAA");
    }
}
