//! Dataflow graph structures.
//!
//! The graph is the compiler's input: nodes name an operation and the
//! values it consumes and produces. Values are identified by unique
//! string names; each output declaration may carry a static type or be
//! untyped. The graph also declares its boundary inputs/outputs and
//! may embed named constant tensors (initializers).

use crate::ir::TypeDesc;
use crate::tensor::Tensor;
use serde::{Deserialize, Serialize};

/// Declaration of a produced value: its name and optional static type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueDecl {
    pub name: String,
    #[serde(default)]
    pub ty: Option<TypeDesc>,
}

impl ValueDecl {
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
        }
    }

    pub fn typed(name: impl Into<String>, ty: TypeDesc) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty),
        }
    }
}

/// One graph operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub opcode: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<ValueDecl>,
}

/// A constant tensor embedded in the graph.
///
/// `elided_elements` is set by the inspect tooling when the payload
/// has been stripped for printing; such a graph is display-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    pub tensor: Tensor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elided_elements: Option<u64>,
}

/// A dataflow graph: operations plus declared boundary values.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub inputs: Vec<ValueDecl>,
    pub outputs: Vec<String>,
    #[serde(default)]
    pub constants: Vec<Constant>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_input(&mut self, decl: ValueDecl) {
        self.inputs.push(decl);
    }

    pub fn add_node(&mut self, opcode: impl Into<String>, inputs: Vec<String>, outputs: Vec<ValueDecl>) {
        self.nodes.push(Node {
            opcode: opcode.into(),
            inputs,
            outputs,
        });
    }

    pub fn add_constant(&mut self, name: impl Into<String>, tensor: Tensor) {
        self.constants.push(Constant {
            name: name.into(),
            tensor,
            elided_elements: None,
        });
    }

    pub fn mark_output(&mut self, name: impl Into<String>) {
        self.outputs.push(name.into());
    }
}
