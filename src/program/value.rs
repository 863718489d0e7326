//! Binding of a graph value to an instruction operand.

use crate::ir::TypeDesc;
use crate::program::{Instruction, OperandId};

/// Binds one graph-level value to its VM operand id, carrying whatever
/// static type the graph declared for it.
///
/// Created by the compiler when a value is first scheduled for
/// production and immutable afterwards. Many instructions may read the
/// operand; exactly one produces it.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueBinding {
    operand_id: OperandId,
    static_type: Option<TypeDesc>,
}

impl ValueBinding {
    pub fn new(operand_id: OperandId, static_type: Option<TypeDesc>) -> Self {
        Self {
            operand_id,
            static_type,
        }
    }

    pub fn operand_id(&self) -> OperandId {
        self.operand_id
    }

    pub fn static_type(&self) -> Option<&TypeDesc> {
        self.static_type.as_ref()
    }

    /// Append this value to `inst` as an output, together with its
    /// static type annotation.
    ///
    /// A defined, non-empty static type is propagated as an
    /// allocation/validation hint: element kind plus the shape copied
    /// dimension by dimension. An absent static type, an undefined
    /// one, or one statically known to hold zero elements is
    /// normalized to an undefined annotation instead of propagating a
    /// zero-length shape. A type whose element count is merely
    /// *unknown* (some dimension unknown) is still propagated — only
    /// the statically-empty case collapses.
    pub fn emit_as_output(&self, inst: &mut Instruction) {
        inst.outputs.push(self.operand_id);
        let annotation = match &self.static_type {
            Some(ty) if ty.is_defined() && ty.element_count() != Some(0) => ty.clone(),
            _ => TypeDesc::Undefined,
        };
        inst.output_types.push(annotation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DType, Dim};

    fn emit(static_type: Option<TypeDesc>) -> (Instruction, TypeDesc) {
        let mut inst = Instruction::new("Add");
        let binding = ValueBinding::new(OperandId(3), static_type);
        binding.emit_as_output(&mut inst);
        assert_eq!(inst.outputs, vec![OperandId(3)]);
        assert_eq!(inst.output_types.len(), 1);
        let ty = inst.output_types[0].clone();
        (inst, ty)
    }

    #[test]
    fn test_defined_type_is_propagated() {
        let (_, ty) = emit(Some(TypeDesc::tensor(DType::F32, &[2, 3])));
        assert_eq!(ty, TypeDesc::tensor(DType::F32, &[2, 3]));
    }

    #[test]
    fn test_scalar_is_propagated() {
        // Rank 0 has exactly one element; it must not collapse to
        // undefined the way the empty tensor does.
        let (_, ty) = emit(Some(TypeDesc::of(DType::F32)));
        assert_eq!(ty, TypeDesc::of(DType::F32));
    }

    #[test]
    fn test_absent_type_collapses_to_undefined() {
        let (_, ty) = emit(None);
        assert_eq!(ty, TypeDesc::Undefined);
    }

    #[test]
    fn test_empty_tensor_collapses_to_undefined() {
        let (_, ty) = emit(Some(TypeDesc::tensor(DType::F32, &[0])));
        assert_eq!(ty, TypeDesc::Undefined);
    }

    #[test]
    fn test_absent_and_empty_collapse_identically() {
        let (_, absent) = emit(None);
        let (_, empty) = emit(Some(TypeDesc::tensor(DType::F32, &[0, 4])));
        assert_eq!(absent, empty);
    }

    #[test]
    fn test_undefined_static_type_collapses() {
        let (_, ty) = emit(Some(TypeDesc::Undefined));
        assert_eq!(ty, TypeDesc::Undefined);
    }

    #[test]
    fn test_unknown_count_is_still_propagated() {
        let declared = TypeDesc::Tensor {
            dtype: DType::F32,
            dims: vec![Dim::Known(2), Dim::Unknown],
        };
        let (_, ty) = emit(Some(declared.clone()));
        assert_eq!(ty, declared);
    }

    #[test]
    fn test_emission_appends() {
        let mut inst = Instruction::new("Split");
        ValueBinding::new(OperandId(1), Some(TypeDesc::tensor(DType::F32, &[4])))
            .emit_as_output(&mut inst);
        ValueBinding::new(OperandId(2), None).emit_as_output(&mut inst);

        assert_eq!(inst.outputs, vec![OperandId(1), OperandId(2)]);
        assert_eq!(inst.output_types.len(), 2);
        assert!(inst.output_types[0].is_defined());
        assert!(!inst.output_types[1].is_defined());
    }
}
