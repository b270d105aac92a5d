//! Python front end: tree-sitter-python traversal and the queries built on it.

pub mod call_graph;
pub mod categories;
pub mod syntax;
pub mod walker;

pub use call_graph::{CallGraph, CallSite, FunctionRecord};
pub use categories::{LineCategory, LineCategoryMap};
pub use walker::{walk, StructuralWalk};
