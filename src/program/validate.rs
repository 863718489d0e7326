//! Structural validation of programs.
//!
//! A well-formed program satisfies the invariants the compiler
//! guarantees: every instruction input is produced by a strictly
//! earlier instruction or is a designated program input, no operand id
//! is produced twice, and each instruction carries exactly one type
//! annotation per output. Validation failures indicate a compiler bug
//! or a corrupted serialized program, not bad runtime data.

use crate::program::{OperandId, Program};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidateError {
    #[error("instruction {pc} reads operand {operand} before it is produced")]
    ForwardReference { pc: usize, operand: OperandId },

    #[error("operand {operand} is produced twice (second time by instruction {pc})")]
    DuplicateProduction { pc: usize, operand: OperandId },

    #[error("instruction {pc} has {outputs} outputs but {types} type annotations")]
    TypeArityMismatch {
        pc: usize,
        outputs: usize,
        types: usize,
    },

    #[error("program output {operand} is never produced")]
    UnproducedOutput { operand: OperandId },
}

/// Check the structural invariants of `program`.
pub fn validate(program: &Program) -> Result<(), ValidateError> {
    let mut produced: HashSet<OperandId> = HashSet::new();
    for input in &program.inputs {
        // Duplicate declared inputs count as duplicate production.
        if !produced.insert(input.id) {
            return Err(ValidateError::DuplicateProduction {
                pc: 0,
                operand: input.id,
            });
        }
    }

    for (pc, inst) in program.instructions.iter().enumerate() {
        if inst.outputs.len() != inst.output_types.len() {
            return Err(ValidateError::TypeArityMismatch {
                pc,
                outputs: inst.outputs.len(),
                types: inst.output_types.len(),
            });
        }
        for &operand in &inst.inputs {
            if !produced.contains(&operand) {
                return Err(ValidateError::ForwardReference { pc, operand });
            }
        }
        for &operand in &inst.outputs {
            if !produced.insert(operand) {
                return Err(ValidateError::DuplicateProduction { pc, operand });
            }
        }
    }

    for output in &program.outputs {
        if !produced.contains(&output.id) {
            return Err(ValidateError::UnproducedOutput { operand: output.id });
        }
    }

    Ok(())
}
