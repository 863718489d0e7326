//! Naive row-major matrix multiplication.

use crate::ir::{DType, TypeDesc};
use crate::tensor::Tensor;
use crate::vm::{Kernel, KernelError};

/// `C[m,n] = A[m,k] * B[k,n]` for rank-2 float tensors.
pub struct MatMul;

impl Kernel for MatMul {
    fn execute(&self, inputs: &[&Tensor], _hints: &[TypeDesc]) -> Result<Vec<Tensor>, KernelError> {
        if inputs.len() != 2 {
            return Err(KernelError::Arity {
                expected: 2,
                got: inputs.len(),
            });
        }
        let (a, b) = (inputs[0], inputs[1]);
        if a.rank() != 2 || b.rank() != 2 {
            return Err(KernelError::ShapeMismatch(format!(
                "MatMul requires rank-2 operands, got {:?} and {:?}",
                a.shape(),
                b.shape()
            )));
        }
        let (m, k) = (a.shape()[0], a.shape()[1]);
        let (k2, n) = (b.shape()[0], b.shape()[1]);
        if k != k2 {
            return Err(KernelError::ShapeMismatch(format!(
                "MatMul inner dimensions differ: {:?} x {:?}",
                a.shape(),
                b.shape()
            )));
        }
        if a.dtype() != b.dtype() {
            return Err(KernelError::Other(format!(
                "MatMul: operand dtypes differ ({} vs {})",
                a.dtype(),
                b.dtype()
            )));
        }

        let out = match a.dtype() {
            DType::F32 => {
                let xs = a.as_f32()?;
                let ys = b.as_f32()?;
                let mut values = vec![0.0f32; m * n];
                for i in 0..m {
                    for l in 0..k {
                        let x = xs[i * k + l];
                        for j in 0..n {
                            values[i * n + j] += x * ys[l * n + j];
                        }
                    }
                }
                Tensor::from_f32(vec![m, n], &values)?
            }
            DType::F64 => {
                let xs = a.as_f64()?;
                let ys = b.as_f64()?;
                let mut values = vec![0.0f64; m * n];
                for i in 0..m {
                    for l in 0..k {
                        let x = xs[i * k + l];
                        for j in 0..n {
                            values[i * n + j] += x * ys[l * n + j];
                        }
                    }
                }
                Tensor::from_f64(vec![m, n], &values)?
            }
            dtype => {
                return Err(KernelError::UnsupportedDType {
                    op: "MatMul",
                    dtype,
                });
            }
        };
        Ok(vec![out])
    }
}
