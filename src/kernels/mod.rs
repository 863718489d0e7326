//! Built-in kernel implementations.
//!
//! The interpreter treats opcode execution as a pluggable capability;
//! this module provides the default set so lowered programs run out of
//! the box. Hosts can overwrite or extend any binding on their own
//! [`KernelRegistry`].

pub mod elementwise;
pub mod matmul;
pub mod shape;

use crate::vm::KernelRegistry;

/// Register every built-in kernel under its opcode name.
pub fn install(registry: &mut KernelRegistry) {
    registry.register("Add", elementwise::add());
    registry.register("Sub", elementwise::sub());
    registry.register("Mul", elementwise::mul());
    registry.register("Div", elementwise::div());
    registry.register("Neg", elementwise::neg());
    registry.register("Relu", elementwise::relu());
    registry.register("Sigmoid", elementwise::sigmoid());
    registry.register("Tanh", elementwise::tanh());
    registry.register("Exp", elementwise::exp());
    registry.register("MatMul", matmul::MatMul);
    registry.register("Reshape", shape::Reshape);
    registry.register("Identity", shape::Identity);
}
