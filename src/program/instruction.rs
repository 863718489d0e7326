//! Instructions and programs.

use crate::ir::TypeDesc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one produced value within a [`Program`].
///
/// Ids are dense indices assigned by the compiler in first-production
/// order; they are the addressing unit for instruction inputs and
/// outputs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct OperandId(pub u32);

impl fmt::Display for OperandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// One VM instruction: an opcode, the operands it reads, the operands
/// it produces, and one static type annotation per output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: String,
    pub inputs: Vec<OperandId>,
    pub outputs: Vec<OperandId>,
    pub output_types: Vec<TypeDesc>,
}

impl Instruction {
    pub fn new(opcode: impl Into<String>) -> Self {
        Self {
            opcode: opcode.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            output_types: Vec::new(),
        }
    }

    pub fn add_input(&mut self, id: OperandId) {
        self.inputs.push(id);
    }
}

/// A value fed into the program before execution.
///
/// `from_constant` marks inputs lowered from embedded graph constants;
/// a host can feed those automatically from the graph instead of
/// requiring the caller to supply them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramInput {
    pub name: String,
    pub id: OperandId,
    #[serde(default)]
    pub from_constant: bool,
}

/// A value handed back to the caller after execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramOutput {
    pub name: String,
    pub id: OperandId,
}

/// An ordered instruction sequence plus the designated boundary
/// operands. Program order is a valid topological order of the data
/// dependencies; no operand id is produced twice.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub instructions: Vec<Instruction>,
    pub inputs: Vec<ProgramInput>,
    pub outputs: Vec<ProgramOutput>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_input_id(&self, id: OperandId) -> bool {
        self.inputs.iter().any(|input| input.id == id)
    }

    pub fn is_output_id(&self, id: OperandId) -> bool {
        self.outputs.iter().any(|output| output.id == id)
    }

    pub fn input_named(&self, name: &str) -> Option<&ProgramInput> {
        self.inputs.iter().find(|input| input.name == name)
    }

    /// Serialize to JSON. The round trip through
    /// [`Program::from_json`] yields an instruction-for-instruction
    /// identical program.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DType, TypeDesc};

    #[test]
    fn test_operand_id_display() {
        assert_eq!(OperandId(7).to_string(), "%7");
    }

    #[test]
    fn test_boundary_lookups() {
        let program = Program {
            instructions: Vec::new(),
            inputs: vec![ProgramInput {
                name: "a".into(),
                id: OperandId(0),
                from_constant: false,
            }],
            outputs: vec![ProgramOutput {
                name: "b".into(),
                id: OperandId(1),
            }],
        };
        assert!(program.is_input_id(OperandId(0)));
        assert!(!program.is_input_id(OperandId(1)));
        assert!(program.is_output_id(OperandId(1)));
        assert_eq!(program.input_named("a").unwrap().id, OperandId(0));
        assert!(program.input_named("missing").is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let mut inst = Instruction::new("Add");
        inst.add_input(OperandId(0));
        inst.add_input(OperandId(1));
        inst.outputs.push(OperandId(2));
        inst.output_types.push(TypeDesc::tensor(DType::F32, &[2]));

        let program = Program {
            instructions: vec![inst],
            inputs: vec![
                ProgramInput {
                    name: "a".into(),
                    id: OperandId(0),
                    from_constant: false,
                },
                ProgramInput {
                    name: "b".into(),
                    id: OperandId(1),
                    from_constant: true,
                },
            ],
            outputs: vec![ProgramOutput {
                name: "c".into(),
                id: OperandId(2),
            }],
        };

        let json = program.to_json().unwrap();
        let back = Program::from_json(&json).unwrap();
        assert_eq!(back, program);
    }
}
