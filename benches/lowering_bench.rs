//! Lowering and execution benchmark
//!
//! Measures graph-to-program lowering and interpreter throughput on a
//! long elementwise chain.
//!
//! Run with: `cargo bench --bench lowering_bench`

use std::hint::black_box;
use std::time::Instant;

use flowvm::{compile, DType, Graph, Interpreter, KernelRegistry, Tensor, TypeDesc, ValueDecl};

fn chain_graph(depth: usize, width: usize) -> Graph {
    let mut graph = Graph::new();
    graph.add_input(ValueDecl::typed(
        "x",
        TypeDesc::tensor(DType::F32, &[width]),
    ));
    let mut prev = "x".to_string();
    for i in 0..depth {
        let name = format!("v{}", i);
        let opcode = if i % 2 == 0 { "Relu" } else { "Neg" };
        graph.add_node(opcode, vec![prev], vec![ValueDecl::untyped(name.clone())]);
        prev = name;
    }
    graph.mark_output(prev);
    graph
}

fn bench<F: FnMut()>(name: &str, iterations: usize, mut f: F) {
    // Warmup
    for _ in 0..iterations.min(10) {
        f();
    }
    let start = Instant::now();
    for _ in 0..iterations {
        f();
    }
    let elapsed = start.elapsed();
    println!(
        "{:<30} {:>8} iters  {:>10.3} ms total  {:>10.3} us/iter",
        name,
        iterations,
        elapsed.as_secs_f64() * 1e3,
        elapsed.as_secs_f64() * 1e6 / iterations as f64
    );
}

fn main() {
    let depths = [16usize, 128, 512];
    for &depth in &depths {
        let graph = chain_graph(depth, 64);
        bench(&format!("lower_chain_{}", depth), 200, || {
            black_box(compile(&graph).unwrap());
        });
    }

    let registry = KernelRegistry::with_default_kernels();
    for &depth in &depths {
        let graph = chain_graph(depth, 64);
        let program = compile(&graph).unwrap();
        let input = Tensor::from_f32(vec![64], &vec![1.0f32; 64]).unwrap();
        bench(&format!("execute_chain_{}", depth), 200, || {
            let mut interp = Interpreter::new(&program, &registry);
            interp.feed_input("x", input.clone()).unwrap();
            black_box(interp.run().unwrap());
        });
    }
}
