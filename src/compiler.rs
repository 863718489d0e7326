//! Lowering pass: dataflow graph to linear instruction program.
//!
//! Walks the graph in a deterministic dependency order, assigns a
//! fresh operand id to each value the first time it is produced, and
//! appends one instruction per graph operation. Lowering the same
//! graph twice yields byte-identical programs: the topological order
//! breaks ties by node declaration index and ids are handed out
//! densely in first-production order, so determinism is structural.

use crate::ir::{Graph, TypeDesc};
use crate::program::{Instruction, OperandId, Program, ProgramInput, ProgramOutput, ValueBinding};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use thiserror::Error;

/// Fatal lowering failures. Both indicate a malformed or cyclic input
/// graph and are never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("unresolved dependency: node {node} ('{opcode}') consumes '{value}' which is not available before it")]
    UnresolvedDependency {
        node: usize,
        opcode: String,
        value: String,
    },

    #[error("duplicate production of value '{value}' by node {node} ('{opcode}')")]
    DuplicateProduction {
        node: usize,
        opcode: String,
        value: String,
    },

    #[error("value '{0}' is declared more than once at the graph boundary")]
    DuplicateDeclaration(String),

    #[error("graph output '{0}' is never produced")]
    UndefinedGraphOutput(String),
}

/// Where a value comes from, for dependency-edge construction.
#[derive(Clone, Copy)]
enum Producer {
    Boundary,
    Node(usize),
}

/// Lower `graph` into an executable [`Program`].
pub fn compile(graph: &Graph) -> Result<Program, CompileError> {
    let order = topo_order(graph)?;

    let mut program = Program::new();
    let mut env: HashMap<String, ValueBinding> = HashMap::new();
    let mut next_id: u32 = 0;
    let mut fresh = |env: &mut HashMap<String, ValueBinding>,
                     name: &str,
                     ty: Option<TypeDesc>|
     -> OperandId {
        let id = OperandId(next_id);
        next_id += 1;
        env.insert(name.to_string(), ValueBinding::new(id, ty));
        id
    };

    // Boundary values get their ids before any node output: declared
    // inputs first, then embedded constants.
    for decl in &graph.inputs {
        let id = fresh(&mut env, &decl.name, decl.ty.clone());
        program.inputs.push(ProgramInput {
            name: decl.name.clone(),
            id,
            from_constant: false,
        });
    }
    for constant in &graph.constants {
        let ty = TypeDesc::tensor(constant.tensor.dtype(), constant.tensor.shape());
        let id = fresh(&mut env, &constant.name, Some(ty));
        program.inputs.push(ProgramInput {
            name: constant.name.clone(),
            id,
            from_constant: true,
        });
    }

    for &node_idx in &order {
        let node = &graph.nodes[node_idx];
        let mut inst = Instruction::new(node.opcode.clone());
        for name in &node.inputs {
            let binding = env.get(name).ok_or_else(|| CompileError::UnresolvedDependency {
                node: node_idx,
                opcode: node.opcode.clone(),
                value: name.clone(),
            })?;
            inst.add_input(binding.operand_id());
        }
        for decl in &node.outputs {
            if env.contains_key(&decl.name) {
                return Err(CompileError::DuplicateProduction {
                    node: node_idx,
                    opcode: node.opcode.clone(),
                    value: decl.name.clone(),
                });
            }
            fresh(&mut env, &decl.name, decl.ty.clone());
            env[&decl.name].emit_as_output(&mut inst);
        }
        program.instructions.push(inst);
    }

    for name in &graph.outputs {
        let binding = env
            .get(name)
            .ok_or_else(|| CompileError::UndefinedGraphOutput(name.clone()))?;
        program.outputs.push(ProgramOutput {
            name: name.clone(),
            id: binding.operand_id(),
        });
    }

    tracing::debug!(
        nodes = graph.nodes.len(),
        instructions = program.instructions.len(),
        operands = next_id,
        "lowered graph to program"
    );
    Ok(program)
}

/// Deterministic topological order over graph nodes, ties broken by
/// declaration index.
fn topo_order(graph: &Graph) -> Result<Vec<usize>, CompileError> {
    let mut producers: HashMap<&str, Producer> = HashMap::new();
    for decl in &graph.inputs {
        if producers.insert(&decl.name, Producer::Boundary).is_some() {
            return Err(CompileError::DuplicateDeclaration(decl.name.clone()));
        }
    }
    for constant in &graph.constants {
        if producers.insert(&constant.name, Producer::Boundary).is_some() {
            return Err(CompileError::DuplicateDeclaration(constant.name.clone()));
        }
    }
    for (idx, node) in graph.nodes.iter().enumerate() {
        for decl in &node.outputs {
            if producers.insert(&decl.name, Producer::Node(idx)).is_some() {
                return Err(CompileError::DuplicateProduction {
                    node: idx,
                    opcode: node.opcode.clone(),
                    value: decl.name.clone(),
                });
            }
        }
    }

    let mut indegree = vec![0usize; graph.nodes.len()];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); graph.nodes.len()];
    for (idx, node) in graph.nodes.iter().enumerate() {
        for name in &node.inputs {
            match producers.get(name.as_str()) {
                None => {
                    return Err(CompileError::UnresolvedDependency {
                        node: idx,
                        opcode: node.opcode.clone(),
                        value: name.clone(),
                    })
                }
                Some(Producer::Boundary) => {}
                Some(Producer::Node(src)) => {
                    successors[*src].push(idx);
                    indegree[idx] += 1;
                }
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == 0)
        .map(|(idx, _)| Reverse(idx))
        .collect();
    let mut order = Vec::with_capacity(graph.nodes.len());
    let mut placed = vec![false; graph.nodes.len()];

    while let Some(Reverse(idx)) = ready.pop() {
        order.push(idx);
        placed[idx] = true;
        for &next in &successors[idx] {
            indegree[next] -= 1;
            if indegree[next] == 0 {
                ready.push(Reverse(next));
            }
        }
    }

    if order.len() != graph.nodes.len() {
        // A cycle. Report the first unplaced node and one of the
        // inputs that keeps it waiting.
        let (idx, node) = graph
            .nodes
            .iter()
            .enumerate()
            .find(|(idx, _)| !placed[*idx])
            .expect("unplaced node must exist");
        let value = node
            .inputs
            .iter()
            .find(|name| {
                matches!(producers.get(name.as_str()), Some(Producer::Node(src)) if !placed[*src])
            })
            .cloned()
            .unwrap_or_default();
        return Err(CompileError::UnresolvedDependency {
            node: idx,
            opcode: node.opcode.clone(),
            value,
        });
    }

    Ok(order)
}
