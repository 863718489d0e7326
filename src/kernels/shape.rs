//! Shape-manipulation kernels.

use crate::ir::TypeDesc;
use crate::tensor::Tensor;
use crate::vm::{Kernel, KernelError};

/// Reinterpret a tensor under a new shape with the same element count.
///
/// The target shape comes from a second i64 input tensor when present,
/// otherwise from the instruction's output type annotation — this is
/// the one built-in kernel that depends on the compiler having
/// propagated a defined, fully known output type.
pub struct Reshape;

impl Kernel for Reshape {
    fn execute(&self, inputs: &[&Tensor], hints: &[TypeDesc]) -> Result<Vec<Tensor>, KernelError> {
        let target: Vec<usize> = match inputs {
            [_, shape] => shape
                .as_i64()?
                .iter()
                .map(|&d| {
                    usize::try_from(d).map_err(|_| {
                        KernelError::ShapeMismatch(format!("Reshape: negative extent {}", d))
                    })
                })
                .collect::<Result<_, _>>()?,
            [_] => hints
                .first()
                .and_then(TypeDesc::known_shape)
                .ok_or_else(|| {
                    KernelError::Other(
                        "Reshape needs a shape input or a fully known output type".into(),
                    )
                })?,
            _ => {
                return Err(KernelError::Arity {
                    expected: 2,
                    got: inputs.len(),
                })
            }
        };

        let data = inputs[0];
        let count: usize = target.iter().product();
        if count != data.element_count() {
            return Err(KernelError::ShapeMismatch(format!(
                "Reshape: {} elements into shape {:?}",
                data.element_count(),
                target
            )));
        }
        Ok(vec![data.clone().with_shape_unchecked(target)])
    }
}

/// Pass a tensor through unchanged.
pub struct Identity;

impl Kernel for Identity {
    fn execute(&self, inputs: &[&Tensor], _hints: &[TypeDesc]) -> Result<Vec<Tensor>, KernelError> {
        if inputs.len() != 1 {
            return Err(KernelError::Arity {
                expected: 1,
                got: inputs.len(),
            });
        }
        Ok(vec![inputs[0].clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::DType;

    #[test]
    fn test_reshape_via_shape_input() {
        let data = Tensor::from_f32(vec![2, 3], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let shape = Tensor::from_i64(vec![2], &[3, 2]).unwrap();
        let out = Reshape.execute(&[&data, &shape], &[]).unwrap();
        assert_eq!(out[0].shape(), &[3, 2]);
        assert_eq!(out[0].as_f32().unwrap(), data.as_f32().unwrap());
    }

    #[test]
    fn test_reshape_via_hint() {
        let data = Tensor::from_f32(vec![4], &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let hint = TypeDesc::tensor(DType::F32, &[2, 2]);
        let out = Reshape.execute(&[&data], &[hint]).unwrap();
        assert_eq!(out[0].shape(), &[2, 2]);
    }

    #[test]
    fn test_reshape_without_target_fails() {
        let data = Tensor::from_f32(vec![4], &[0.0; 4]).unwrap();
        let err = Reshape.execute(&[&data], &[TypeDesc::Undefined]).unwrap_err();
        assert!(matches!(err, KernelError::Other(_)));
    }

    #[test]
    fn test_reshape_count_mismatch() {
        let data = Tensor::from_f32(vec![4], &[0.0; 4]).unwrap();
        let shape = Tensor::from_i64(vec![2], &[3, 2]).unwrap();
        let err = Reshape.execute(&[&data, &shape], &[]).unwrap_err();
        assert!(matches!(err, KernelError::ShapeMismatch(_)));
    }

    #[test]
    fn test_identity() {
        let data = Tensor::from_i32(vec![2], &[7, 9]).unwrap();
        let out = Identity.execute(&[&data], &[]).unwrap();
        assert_eq!(out[0], data);
    }
}
