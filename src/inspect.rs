//! Human-readable rendering and large-constant stripping.
//!
//! Diagnostic tooling only: stripping elides the payload of embedded
//! constants above an element-count threshold so a dumped graph stays
//! readable, and rendering produces text listings of graphs and
//! programs. None of this ever affects lowering or execution.

use crate::ir::Graph;
use crate::program::Program;
use std::fmt::Write as _;

/// Options for constant stripping.
#[derive(Debug, Clone, Copy)]
pub struct StripOptions {
    /// Constants with more elements than this lose their payload.
    pub threshold: usize,
}

impl Default for StripOptions {
    fn default() -> Self {
        Self { threshold: 20 }
    }
}

/// Elide the payload of every constant whose element count exceeds the
/// threshold, recording the original count. Returns how many constants
/// were stripped. A stripped graph is display-only.
pub fn strip_large_constants(graph: &mut Graph, options: &StripOptions) -> usize {
    let mut stripped = 0;
    for constant in &mut graph.constants {
        let count = constant.tensor.element_count();
        if count > options.threshold && constant.elided_elements.is_none() {
            constant.tensor.elide_data();
            constant.elided_elements = Some(count as u64);
            stripped += 1;
        }
    }
    if stripped > 0 {
        tracing::debug!(stripped, threshold = options.threshold, "elided large constants");
    }
    stripped
}

/// Text listing of a graph: boundary values, constants, then nodes in
/// declaration order.
pub fn render_graph(graph: &Graph) -> String {
    let mut out = String::new();
    for decl in &graph.inputs {
        match &decl.ty {
            Some(ty) => writeln!(out, "input {}: {}", decl.name, ty).unwrap(),
            None => writeln!(out, "input {}: untyped", decl.name).unwrap(),
        }
    }
    for constant in &graph.constants {
        match constant.elided_elements {
            Some(count) => writeln!(
                out,
                "const {}: {} = <elided {} elements>",
                constant.name,
                constant.tensor.summary(),
                count
            )
            .unwrap(),
            None => writeln!(out, "const {}: {}", constant.name, constant.tensor.summary())
                .unwrap(),
        }
    }
    for (idx, node) in graph.nodes.iter().enumerate() {
        let outputs: Vec<&str> = node.outputs.iter().map(|d| d.name.as_str()).collect();
        writeln!(
            out,
            "node {}: {} = {}({})",
            idx,
            outputs.join(", "),
            node.opcode,
            node.inputs.join(", ")
        )
        .unwrap();
    }
    for name in &graph.outputs {
        writeln!(out, "output {}", name).unwrap();
    }
    out
}

/// Text listing of a lowered program, one instruction per line.
pub fn render_program(program: &Program) -> String {
    let mut out = String::new();
    for input in &program.inputs {
        let kind = if input.from_constant { "const input" } else { "input" };
        writeln!(out, "{} {} = {}", kind, input.id, input.name).unwrap();
    }
    for (pc, inst) in program.instructions.iter().enumerate() {
        let outputs: Vec<String> = inst
            .outputs
            .iter()
            .zip(&inst.output_types)
            .map(|(id, ty)| format!("{}: {}", id, ty))
            .collect();
        let inputs: Vec<String> = inst.inputs.iter().map(|id| id.to_string()).collect();
        writeln!(
            out,
            "{:4}  {} = {} {}",
            pc,
            outputs.join(", "),
            inst.opcode,
            inputs.join(", ")
        )
        .unwrap();
    }
    for output in &program.outputs {
        writeln!(out, "output {} = {}", output.id, output.name).unwrap();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::ir::{DType, TypeDesc, ValueDecl};
    use crate::tensor::Tensor;

    fn graph_with_constants() -> Graph {
        let mut graph = Graph::new();
        graph.add_input(ValueDecl::typed("x", TypeDesc::tensor(DType::F32, &[4])));
        graph.add_constant("small", Tensor::zeros(DType::F32, vec![4]));
        graph.add_constant("large", Tensor::zeros(DType::F32, vec![8, 8]));
        graph.add_node(
            "Mul",
            vec!["x".into(), "small".into()],
            vec![ValueDecl::untyped("y")],
        );
        graph.mark_output("y");
        graph
    }

    #[test]
    fn test_strip_respects_threshold() {
        let mut graph = graph_with_constants();
        let stripped = strip_large_constants(&mut graph, &StripOptions { threshold: 20 });
        assert_eq!(stripped, 1);

        // Below-threshold constant keeps its payload.
        assert_eq!(graph.constants[0].tensor.byte_size(), 16);
        assert!(graph.constants[0].elided_elements.is_none());

        // Above-threshold constant loses the payload but keeps its
        // dtype, shape, and original count.
        assert_eq!(graph.constants[1].tensor.byte_size(), 0);
        assert_eq!(graph.constants[1].tensor.shape(), &[8, 8]);
        assert_eq!(graph.constants[1].elided_elements, Some(64));
    }

    #[test]
    fn test_strip_is_idempotent() {
        let mut graph = graph_with_constants();
        let options = StripOptions::default();
        assert_eq!(strip_large_constants(&mut graph, &options), 1);
        assert_eq!(strip_large_constants(&mut graph, &options), 0);
    }

    #[test]
    fn test_render_graph_mentions_elision() {
        let mut graph = graph_with_constants();
        strip_large_constants(&mut graph, &StripOptions::default());
        let text = render_graph(&graph);
        assert!(text.contains("input x: f32[4]"));
        assert!(text.contains("<elided 64 elements>"));
        assert!(text.contains("node 0: y = Mul(x, small)"));
        assert!(text.contains("output y"));
    }

    #[test]
    fn test_render_program() {
        let graph = graph_with_constants();
        let program = compile(&graph).unwrap();
        let text = render_program(&program);
        assert!(text.contains("input %0 = x"));
        assert!(text.contains("const input %1 = small"));
        assert!(text.contains("Mul"));
        assert!(text.contains("output %3 = y"));
    }
}
