//! Elementwise arithmetic and activation kernels.
//!
//! Operands must agree in dtype and shape; broadcasting is left to a
//! graph-level rewrite. Float math is carried out in f64 and narrowed
//! back to the operand dtype.

use crate::ir::{DType, TypeDesc};
use crate::tensor::Tensor;
use crate::vm::{Kernel, KernelError};
use half::f16;

/// Binary elementwise kernel. `int` is `None` for operations without
/// an integer counterpart (e.g. `Div`).
pub struct Binary {
    op: &'static str,
    float: fn(f64, f64) -> f64,
    int: Option<fn(i64, i64) -> i64>,
}

impl Kernel for Binary {
    fn execute(&self, inputs: &[&Tensor], _hints: &[TypeDesc]) -> Result<Vec<Tensor>, KernelError> {
        if inputs.len() != 2 {
            return Err(KernelError::Arity {
                expected: 2,
                got: inputs.len(),
            });
        }
        let (a, b) = (inputs[0], inputs[1]);
        if a.dtype() != b.dtype() {
            return Err(KernelError::Other(format!(
                "{}: operand dtypes differ ({} vs {})",
                self.op,
                a.dtype(),
                b.dtype()
            )));
        }
        if a.shape() != b.shape() {
            return Err(KernelError::ShapeMismatch(format!(
                "{}: {:?} vs {:?}",
                self.op,
                a.shape(),
                b.shape()
            )));
        }

        let shape = a.shape().to_vec();
        let f = self.float;
        let out = match a.dtype() {
            DType::F32 => {
                let xs = a.as_f32()?;
                let ys = b.as_f32()?;
                let values: Vec<f32> = xs
                    .iter()
                    .zip(&ys)
                    .map(|(&x, &y)| f(x as f64, y as f64) as f32)
                    .collect();
                Tensor::from_f32(shape, &values)?
            }
            DType::F64 => {
                let xs = a.as_f64()?;
                let ys = b.as_f64()?;
                let values: Vec<f64> = xs.iter().zip(&ys).map(|(&x, &y)| f(x, y)).collect();
                Tensor::from_f64(shape, &values)?
            }
            DType::F16 => {
                let xs = a.as_f16()?;
                let ys = b.as_f16()?;
                let values: Vec<f16> = xs
                    .iter()
                    .zip(&ys)
                    .map(|(&x, &y)| f16::from_f64(f(x.to_f64(), y.to_f64())))
                    .collect();
                Tensor::from_f16(shape, &values)?
            }
            DType::I32 => {
                let g = self.int.ok_or(KernelError::UnsupportedDType {
                    op: self.op,
                    dtype: DType::I32,
                })?;
                let xs = a.as_i32()?;
                let ys = b.as_i32()?;
                let values: Vec<i32> = xs
                    .iter()
                    .zip(&ys)
                    .map(|(&x, &y)| g(x as i64, y as i64) as i32)
                    .collect();
                Tensor::from_i32(shape, &values)?
            }
            DType::I64 => {
                let g = self.int.ok_or(KernelError::UnsupportedDType {
                    op: self.op,
                    dtype: DType::I64,
                })?;
                let xs = a.as_i64()?;
                let ys = b.as_i64()?;
                let values: Vec<i64> = xs.iter().zip(&ys).map(|(&x, &y)| g(x, y)).collect();
                Tensor::from_i64(shape, &values)?
            }
            dtype => {
                return Err(KernelError::UnsupportedDType { op: self.op, dtype });
            }
        };
        Ok(vec![out])
    }
}

/// Unary elementwise kernel.
pub struct Unary {
    op: &'static str,
    float: fn(f64) -> f64,
    int: Option<fn(i64) -> i64>,
}

impl Kernel for Unary {
    fn execute(&self, inputs: &[&Tensor], _hints: &[TypeDesc]) -> Result<Vec<Tensor>, KernelError> {
        if inputs.len() != 1 {
            return Err(KernelError::Arity {
                expected: 1,
                got: inputs.len(),
            });
        }
        let a = inputs[0];
        let shape = a.shape().to_vec();
        let f = self.float;
        let out = match a.dtype() {
            DType::F32 => {
                let values: Vec<f32> = a.as_f32()?.iter().map(|&x| f(x as f64) as f32).collect();
                Tensor::from_f32(shape, &values)?
            }
            DType::F64 => {
                let values: Vec<f64> = a.as_f64()?.iter().map(|&x| f(x)).collect();
                Tensor::from_f64(shape, &values)?
            }
            DType::F16 => {
                let values: Vec<f16> = a
                    .as_f16()?
                    .iter()
                    .map(|&x| f16::from_f64(f(x.to_f64())))
                    .collect();
                Tensor::from_f16(shape, &values)?
            }
            DType::I32 => {
                let g = self.int.ok_or(KernelError::UnsupportedDType {
                    op: self.op,
                    dtype: DType::I32,
                })?;
                let values: Vec<i32> = a.as_i32()?.iter().map(|&x| g(x as i64) as i32).collect();
                Tensor::from_i32(shape, &values)?
            }
            DType::I64 => {
                let g = self.int.ok_or(KernelError::UnsupportedDType {
                    op: self.op,
                    dtype: DType::I64,
                })?;
                let values: Vec<i64> = a.as_i64()?.iter().map(|&x| g(x)).collect();
                Tensor::from_i64(shape, &values)?
            }
            dtype => {
                return Err(KernelError::UnsupportedDType { op: self.op, dtype });
            }
        };
        Ok(vec![out])
    }
}

pub fn add() -> Binary {
    Binary {
        op: "Add",
        float: |a, b| a + b,
        int: Some(|a, b| a.wrapping_add(b)),
    }
}

pub fn sub() -> Binary {
    Binary {
        op: "Sub",
        float: |a, b| a - b,
        int: Some(|a, b| a.wrapping_sub(b)),
    }
}

pub fn mul() -> Binary {
    Binary {
        op: "Mul",
        float: |a, b| a * b,
        int: Some(|a, b| a.wrapping_mul(b)),
    }
}

pub fn div() -> Binary {
    Binary {
        op: "Div",
        float: |a, b| a / b,
        int: None,
    }
}

pub fn neg() -> Unary {
    Unary {
        op: "Neg",
        float: |x| -x,
        int: Some(|x| x.wrapping_neg()),
    }
}

pub fn relu() -> Unary {
    Unary {
        op: "Relu",
        float: |x| x.max(0.0),
        int: Some(|x| x.max(0)),
    }
}

pub fn sigmoid() -> Unary {
    Unary {
        op: "Sigmoid",
        float: |x| 1.0 / (1.0 + (-x).exp()),
        int: None,
    }
}

pub fn tanh() -> Unary {
    Unary {
        op: "Tanh",
        float: f64::tanh,
        int: None,
    }
}

pub fn exp() -> Unary {
    Unary {
        op: "Exp",
        float: f64::exp,
        int: None,
    }
}
