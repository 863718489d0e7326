//! Concrete host tensors.
//!
//! A [`Tensor`] owns its buffer as raw little-endian bytes together
//! with the element kind and shape needed to interpret it. Typed
//! constructors and accessors do the byte-level conversion and check
//! the element kind, so kernels never reinterpret a buffer under the
//! wrong type.

use crate::ir::DType;
use half::f16;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced by tensor construction and typed access.
#[derive(Debug, Error)]
pub enum TensorError {
    #[error("expected {expected} data, found {found}")]
    DTypeMismatch { expected: DType, found: DType },

    #[error("data length {len} does not match {count} x {dtype} ({expected} bytes)")]
    DataLength {
        len: usize,
        count: usize,
        dtype: DType,
        expected: usize,
    },
}

/// A concrete tensor value: element kind, shape, and owned data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    dtype: DType,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl Tensor {
    /// Create a tensor from raw little-endian bytes.
    pub fn new(dtype: DType, shape: Vec<usize>, data: Vec<u8>) -> Result<Self, TensorError> {
        let count: usize = shape.iter().product();
        let expected = count * dtype.element_size();
        if data.len() != expected {
            return Err(TensorError::DataLength {
                len: data.len(),
                count,
                dtype,
                expected,
            });
        }
        Ok(Self { dtype, shape, data })
    }

    /// Create a zero-filled tensor.
    pub fn zeros(dtype: DType, shape: Vec<usize>) -> Self {
        let count: usize = shape.iter().product();
        let data = vec![0u8; count * dtype.element_size()];
        Self { dtype, shape, data }
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn byte_size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Reinterpret this tensor under a new shape with the same element
    /// count. The caller must have checked the counts match.
    pub(crate) fn with_shape_unchecked(mut self, shape: Vec<usize>) -> Self {
        debug_assert_eq!(self.element_count(), shape.iter().product::<usize>());
        self.shape = shape;
        self
    }

    /// Drop the payload, keeping dtype and shape. Used by the inspect
    /// tooling when eliding large constants; an elided tensor must not
    /// reach the interpreter.
    pub(crate) fn elide_data(&mut self) {
        self.data = Vec::new();
    }

    fn check_dtype(&self, expected: DType) -> Result<(), TensorError> {
        if self.dtype != expected {
            return Err(TensorError::DTypeMismatch {
                expected,
                found: self.dtype,
            });
        }
        Ok(())
    }
}

macro_rules! typed_access {
    ($from:ident, $as:ident, $ty:ty, $dtype:expr, $width:expr) => {
        impl Tensor {
            pub fn $from(shape: Vec<usize>, values: &[$ty]) -> Result<Self, TensorError> {
                let mut data = Vec::with_capacity(values.len() * $width);
                for v in values {
                    data.extend_from_slice(&v.to_le_bytes());
                }
                Self::new($dtype, shape, data)
            }

            pub fn $as(&self) -> Result<Vec<$ty>, TensorError> {
                self.check_dtype($dtype)?;
                Ok(self
                    .data
                    .chunks_exact($width)
                    .map(|c| <$ty>::from_le_bytes(c.try_into().unwrap()))
                    .collect())
            }
        }
    };
}

typed_access!(from_f32, as_f32, f32, DType::F32, 4);
typed_access!(from_f64, as_f64, f64, DType::F64, 8);
typed_access!(from_i32, as_i32, i32, DType::I32, 4);
typed_access!(from_i64, as_i64, i64, DType::I64, 8);
typed_access!(from_f16, as_f16, f16, DType::F16, 2);

impl Tensor {
    pub fn from_u8(shape: Vec<usize>, values: &[u8]) -> Result<Self, TensorError> {
        Self::new(DType::U8, shape, values.to_vec())
    }

    pub fn as_u8(&self) -> Result<Vec<u8>, TensorError> {
        self.check_dtype(DType::U8)?;
        Ok(self.data.clone())
    }

    pub fn from_bool(shape: Vec<usize>, values: &[bool]) -> Result<Self, TensorError> {
        Self::new(DType::Bool, shape, values.iter().map(|&b| b as u8).collect())
    }

    pub fn as_bool(&self) -> Result<Vec<bool>, TensorError> {
        self.check_dtype(DType::Bool)?;
        Ok(self.data.iter().map(|&b| b != 0).collect())
    }

    /// Short human-readable summary, e.g. `f32[2,3] (6 elements)`.
    pub fn summary(&self) -> String {
        let dims: Vec<String> = self.shape.iter().map(|d| d.to_string()).collect();
        format!(
            "{}[{}] ({} elements)",
            self.dtype,
            dims.join(","),
            self.element_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_round_trip() {
        let t = Tensor::from_f32(vec![2, 2], &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(t.dtype(), DType::F32);
        assert_eq!(t.shape(), &[2, 2]);
        assert_eq!(t.byte_size(), 16);
        assert_eq!(t.as_f32().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_i64_round_trip() {
        let t = Tensor::from_i64(vec![3], &[-1, 0, 7]).unwrap();
        assert_eq!(t.as_i64().unwrap(), vec![-1, 0, 7]);
    }

    #[test]
    fn test_f16_round_trip() {
        let values = [f16::from_f32(0.5), f16::from_f32(-2.0)];
        let t = Tensor::from_f16(vec![2], &values).unwrap();
        assert_eq!(t.as_f16().unwrap(), values.to_vec());
    }

    #[test]
    fn test_dtype_mismatch() {
        let t = Tensor::from_f32(vec![1], &[1.0]).unwrap();
        let err = t.as_i32().unwrap_err();
        assert!(matches!(err, TensorError::DTypeMismatch { .. }));
    }

    #[test]
    fn test_data_length_checked() {
        let err = Tensor::new(DType::F32, vec![2], vec![0u8; 7]).unwrap_err();
        assert!(matches!(err, TensorError::DataLength { expected: 8, .. }));
    }

    #[test]
    fn test_scalar() {
        let t = Tensor::from_f64(vec![], &[3.25]).unwrap();
        assert_eq!(t.element_count(), 1);
        assert_eq!(t.rank(), 0);
        assert_eq!(t.as_f64().unwrap(), vec![3.25]);
    }

    #[test]
    fn test_zeros() {
        let t = Tensor::zeros(DType::I32, vec![4]);
        assert_eq!(t.as_i32().unwrap(), vec![0; 4]);
    }

    #[test]
    fn test_summary() {
        let t = Tensor::zeros(DType::F32, vec![2, 3]);
        assert_eq!(t.summary(), "f32[2,3] (6 elements)");
    }
}
