//! Intra-file call graph and recursion detection.
//!
//! A function is recursive when it can reach itself over the call graph, so
//! mutual recursion (`is_even` -> `is_odd` -> `is_even`) is found the same way
//! as a direct self-call.

use crate::analyzers::signals::NodeRef;
use crate::analyzers::summary::RecursionShape;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, BTreeSet};

/// A call made from inside a function body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallSite {
    pub callee: String,
    pub in_loop: bool,
}

/// A function definition seen by the walker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionRecord {
    pub name: String,
    pub node: NodeRef,
    pub memoized: bool,
    pub calls: Vec<CallSite>,
}

pub struct CallGraph {
    graph: DiGraph<String, ()>,
    index: BTreeMap<String, NodeIndex>,
}

impl CallGraph {
    /// Functions sharing a name collapse into one node.
    pub fn build(functions: &[FunctionRecord]) -> Self {
        let mut graph = DiGraph::new();
        let mut index = BTreeMap::new();
        for function in functions {
            index
                .entry(function.name.clone())
                .or_insert_with(|| graph.add_node(function.name.clone()));
        }
        for function in functions {
            let caller = index[&function.name];
            for call in &function.calls {
                if let Some(&callee) = index.get(&call.callee) {
                    graph.update_edge(caller, callee, ());
                }
            }
        }
        Self { graph, index }
    }

    pub fn reaches(&self, from: &str, to: &str) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&from), Some(&to)) => has_path_connecting(&self.graph, from, to, None),
            _ => false,
        }
    }

    pub fn is_recursive(&self, name: &str) -> bool {
        let Some(&node) = self.index.get(name) else {
            return false;
        };
        self.graph
            .neighbors(node)
            .any(|next| has_path_connecting(&self.graph, next, node, None))
    }

    pub fn recursive_functions(&self) -> BTreeSet<String> {
        self.index
            .keys()
            .filter(|name| self.is_recursive(name))
            .cloned()
            .collect()
    }
}

/// Shape of every recursive function; definitions sharing a name keep the worst.
pub fn recursion_shapes(
    functions: &[FunctionRecord],
    graph: &CallGraph,
) -> BTreeMap<String, RecursionShape> {
    let mut shapes: BTreeMap<String, RecursionShape> = BTreeMap::new();
    for function in functions {
        if !graph.is_recursive(&function.name) {
            continue;
        }
        let shape = shape_of(function, graph);
        shapes
            .entry(function.name.clone())
            .and_modify(|existing| *existing = (*existing).max(shape))
            .or_insert(shape);
    }
    shapes
}

/// Shape of one definition, assuming it sits on a cycle.
pub fn shape_of(function: &FunctionRecord, graph: &CallGraph) -> RecursionShape {
    if function.memoized {
        return RecursionShape::Memoized;
    }
    let cycle_calls: Vec<&CallSite> = function
        .calls
        .iter()
        .filter(|call| graph.reaches(&call.callee, &function.name))
        .collect();
    if cycle_calls.len() >= 2 || cycle_calls.iter().any(|call| call.in_loop) {
        RecursionShape::Branching
    } else {
        RecursionShape::Linear
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LineSpan;

    fn record(name: &str, calls: &[(&str, bool)]) -> FunctionRecord {
        FunctionRecord {
            name: name.to_string(),
            node: NodeRef {
                span: LineSpan::single(1),
                start_byte: 0,
                end_byte: 0,
                kind: "function_definition",
            },
            memoized: false,
            calls: calls
                .iter()
                .map(|(callee, in_loop)| CallSite {
                    callee: callee.to_string(),
                    in_loop: *in_loop,
                })
                .collect(),
        }
    }

    #[test]
    fn test_direct_recursion() {
        let functions = vec![record("fact", &[("fact", false)]), record("main", &[("fact", false)])];
        let graph = CallGraph::build(&functions);
        assert!(graph.is_recursive("fact"));
        assert!(!graph.is_recursive("main"));
        let shapes = recursion_shapes(&functions, &graph);
        assert_eq!(shapes.get("fact"), Some(&RecursionShape::Linear));
        assert_eq!(shapes.len(), 1);
    }

    #[test]
    fn test_mutual_recursion_detected_by_reachability() {
        let functions = vec![
            record("is_even", &[("is_odd", false)]),
            record("is_odd", &[("is_even", false)]),
        ];
        let graph = CallGraph::build(&functions);
        assert_eq!(
            graph.recursive_functions(),
            BTreeSet::from(["is_even".to_string(), "is_odd".to_string()])
        );
    }

    #[test]
    fn test_branching_shapes() {
        let functions = vec![
            record("fib", &[("fib", false), ("fib", false)]),
            record("perm", &[("perm", true)]),
        ];
        let graph = CallGraph::build(&functions);
        let shapes = recursion_shapes(&functions, &graph);
        assert_eq!(shapes["fib"], RecursionShape::Branching);
        assert_eq!(shapes["perm"], RecursionShape::Branching);
    }

    #[test]
    fn test_memoized_recursion() {
        let mut fib = record("fib", &[("fib", false), ("fib", false)]);
        fib.memoized = true;
        let functions = vec![fib];
        let graph = CallGraph::build(&functions);
        let shapes = recursion_shapes(&functions, &graph);
        assert_eq!(shapes["fib"], RecursionShape::Memoized);
    }

    #[test]
    fn test_calls_to_unknown_functions_ignored() {
        let functions = vec![record("main", &[("print", false), ("len", false)])];
        let graph = CallGraph::build(&functions);
        assert!(graph.recursive_functions().is_empty());
    }
}
