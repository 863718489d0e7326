//! Graph-side IR: element kinds, static type descriptors, and the
//! dataflow graph handed to the compiler.

pub mod dtype;
pub mod graph;
pub mod typedesc;

pub use dtype::DType;
pub use graph::{Constant, Graph, Node, ValueDecl};
pub use typedesc::{Dim, TypeDesc};
