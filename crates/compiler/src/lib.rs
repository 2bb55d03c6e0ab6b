//! Concat Compiler Library
//!
//! Compile-time analysis that sequences definitions before type checking.
//!
//! # Modules
//!
//! - `ast`: the definition fragment the analysis reads
//! - `graph`: the dependency cycle resolver (`cycles`, `graph_from_edges`)
//! - `call_graph`: `DefinitionGraph`, which groups mutually recursive
//!   definitions using the resolver

pub mod ast;
pub mod call_graph;
pub mod graph;

pub use ast::{Program, Statement, WordDef};
pub use call_graph::DefinitionGraph;
pub use graph::{Cycles, Graph, cycles, graph_from_edges};
