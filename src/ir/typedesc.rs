//! Static type descriptors for graph values and instruction outputs.
//!
//! A [`TypeDesc`] records whatever is known about a tensor at compile
//! time: nothing at all (`Undefined`), or an element kind plus a shape
//! whose individual dimensions may still be unknown. The two degenerate
//! cases "statically zero elements" and "element count unknown" are
//! deliberately kept distinct; conflating them corrupts downstream
//! allocation decisions.

use crate::ir::DType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One dimension of a static shape.
///
/// Tagged rather than a sentinel value so that "unknown extent" can
/// never be confused with a real extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dim {
    Known(usize),
    Unknown,
}

impl Dim {
    pub fn as_known(&self) -> Option<usize> {
        match self {
            Dim::Known(n) => Some(*n),
            Dim::Unknown => None,
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Known(n) => write!(f, "{}", n),
            Dim::Unknown => f.write_str("?"),
        }
    }
}

/// Optional static tensor type: element kind + shape, or nothing.
///
/// The invariant is that a descriptor is either fully undefined or has
/// a defined element kind; the shape may independently contain unknown
/// dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDesc {
    Undefined,
    Tensor { dtype: DType, dims: Vec<Dim> },
}

impl TypeDesc {
    /// A scalar (rank 0) descriptor of the given element kind.
    pub fn of(dtype: DType) -> Self {
        TypeDesc::Tensor {
            dtype,
            dims: Vec::new(),
        }
    }

    /// Descriptor with a fully known shape.
    pub fn tensor(dtype: DType, shape: &[usize]) -> Self {
        TypeDesc::Tensor {
            dtype,
            dims: shape.iter().map(|&d| Dim::Known(d)).collect(),
        }
    }

    /// Replace the element kind, keeping any existing shape.
    pub fn with_kind(self, dtype: DType) -> Self {
        match self {
            TypeDesc::Undefined => TypeDesc::of(dtype),
            TypeDesc::Tensor { dims, .. } => TypeDesc::Tensor { dtype, dims },
        }
    }

    /// Replace the shape. A shape without an element kind is not
    /// representable, so this is a no-op on an undefined descriptor.
    pub fn with_shape(self, dims: Vec<Dim>) -> Self {
        match self {
            TypeDesc::Undefined => TypeDesc::Undefined,
            TypeDesc::Tensor { dtype, .. } => TypeDesc::Tensor { dtype, dims },
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, TypeDesc::Tensor { .. })
    }

    pub fn dtype(&self) -> Option<DType> {
        match self {
            TypeDesc::Undefined => None,
            TypeDesc::Tensor { dtype, .. } => Some(*dtype),
        }
    }

    pub fn dims(&self) -> Option<&[Dim]> {
        match self {
            TypeDesc::Undefined => None,
            TypeDesc::Tensor { dims, .. } => Some(dims),
        }
    }

    pub fn rank(&self) -> Option<usize> {
        self.dims().map(|d| d.len())
    }

    /// Number of elements if every dimension is known.
    ///
    /// A rank-0 (scalar) descriptor has exactly one element, which is
    /// distinct from `None` ("count not statically known") and from
    /// `Some(0)` ("statically known to be empty").
    pub fn element_count(&self) -> Option<usize> {
        match self {
            TypeDesc::Undefined => None,
            TypeDesc::Tensor { dims, .. } => {
                let mut count: usize = 1;
                for dim in dims {
                    count = count.checked_mul(dim.as_known()?)?;
                }
                Some(count)
            }
        }
    }

    /// The shape as concrete extents, if every dimension is known.
    pub fn known_shape(&self) -> Option<Vec<usize>> {
        self.dims()?.iter().map(Dim::as_known).collect()
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Undefined => f.write_str("undef"),
            TypeDesc::Tensor { dtype, dims } => {
                write!(f, "{}[", dtype)?;
                for (i, dim) in dims.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", dim)?;
                }
                f.write_str("]")
            }
        }
    }
}
