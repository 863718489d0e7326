//! Program serialization tests
//!
//! A serialized program must re-parse into an instruction-for-
//! instruction identical program, including undefined type markers
//! and unknown dimensions.

use flowvm::program::validate;
use flowvm::{compile, DType, Dim, Graph, Program, TypeDesc, ValueDecl};
use std::io::Write;

fn mixed_graph() -> Graph {
    let mut graph = Graph::new();
    graph.add_input(ValueDecl::typed("x", TypeDesc::tensor(DType::F32, &[2, 3])));
    graph.add_input(ValueDecl::untyped("mask"));
    graph.add_node(
        "Mul",
        vec!["x".into(), "mask".into()],
        vec![ValueDecl::typed(
            "scaled",
            TypeDesc::Tensor {
                dtype: DType::F32,
                dims: vec![Dim::Known(2), Dim::Unknown],
            },
        )],
    );
    graph.add_node(
        "Relu",
        vec!["scaled".into()],
        vec![ValueDecl::untyped("y")],
    );
    // An explicitly empty declared type collapses to an undefined
    // annotation but must still round-trip as such.
    graph.add_node(
        "Identity",
        vec!["y".into()],
        vec![ValueDecl::typed("z", TypeDesc::tensor(DType::F32, &[0]))],
    );
    graph.mark_output("z");
    graph
}

#[test]
fn test_json_round_trip_is_identical() {
    let program = compile(&mixed_graph()).unwrap();
    validate(&program).unwrap();

    let json = program.to_json().unwrap();
    let reparsed = Program::from_json(&json).unwrap();
    assert_eq!(reparsed, program);

    // Instruction-for-instruction, including the annotations.
    for (a, b) in program.instructions.iter().zip(&reparsed.instructions) {
        assert_eq!(a.opcode, b.opcode);
        assert_eq!(a.inputs, b.inputs);
        assert_eq!(a.outputs, b.outputs);
        assert_eq!(a.output_types, b.output_types);
    }
}

#[test]
fn test_round_trip_through_disk() {
    let program = compile(&mixed_graph()).unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(program.to_json().unwrap().as_bytes()).unwrap();
    file.flush().unwrap();

    let json = std::fs::read_to_string(file.path()).unwrap();
    let reparsed = Program::from_json(&json).unwrap();
    assert_eq!(reparsed, program);
}

#[test]
fn test_annotations_survive_round_trip() {
    let program = compile(&mixed_graph()).unwrap();
    let reparsed = Program::from_json(&program.to_json().unwrap()).unwrap();

    // Unknown dim preserved.
    assert_eq!(
        reparsed.instructions[0].output_types[0],
        TypeDesc::Tensor {
            dtype: DType::F32,
            dims: vec![Dim::Known(2), Dim::Unknown],
        }
    );
    // Untyped output and empty-typed output both serialized as the
    // undefined marker.
    assert_eq!(reparsed.instructions[1].output_types[0], TypeDesc::Undefined);
    assert_eq!(reparsed.instructions[2].output_types[0], TypeDesc::Undefined);
}

#[test]
fn test_serialization_is_stable() {
    let graph = mixed_graph();
    let first = compile(&graph).unwrap().to_json().unwrap();
    let second = compile(&graph).unwrap().to_json().unwrap();
    assert_eq!(first, second);
}
