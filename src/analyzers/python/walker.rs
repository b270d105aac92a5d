//! Single depth-first pass over a Python tree.
//!
//! All traversal state is threaded through `visit` as two accumulators: a
//! `Scope` (loop frames and name bindings of the enclosing function) and an
//! `Accumulator` (counters, line categories, signal sites, function records).
//! Nesting is syntactic: a loop in a function called from another loop does
//! not count as nested.

use super::call_graph::{recursion_shapes, shape_of, CallGraph, CallSite, FunctionRecord};
use super::categories::{LineCategory, LineCategoryMap};
use super::syntax::{
    adjacent_comparison, decorators, identifiers_in, is_comprehension, is_hashed_container,
    is_memo_decorator, is_string_expr, membership_container, swap_target, unparenthesize, Callee,
};
use crate::analyzers::signals::{NodeRef, Signal, SignalSite};
use crate::analyzers::summary::{RecursionShape, StructuralSummary};
use crate::core::SourceUnit;
use std::collections::BTreeSet;
use tracing::{debug, debug_span};
use tree_sitter::Node;

/// Everything one walk produces.
#[derive(Clone, Debug)]
pub struct StructuralWalk {
    pub summary: StructuralSummary,
    pub categories: LineCategoryMap,
    pub sites: Vec<SignalSite>,
    pub functions: Vec<FunctionRecord>,
}

impl StructuralWalk {
    pub fn sites_of(&self, signal: Signal) -> impl Iterator<Item = &SignalSite> + '_ {
        self.sites.iter().filter(move |site| site.signal == signal)
    }
}

pub fn walk(unit: &SourceUnit) -> StructuralWalk {
    let _span = debug_span!("walk", path = %unit.path().display()).entered();
    let mut acc = Accumulator::new(unit.line_count());
    let mut scope = Scope::default();
    visit(unit.root(), unit, &mut scope, &mut acc);
    let walk = acc.finish(unit);
    debug!(
        loops = walk.summary.loop_count,
        depth = walk.summary.max_loop_nest_depth,
        sites = walk.sites.len(),
        "walk complete"
    );
    walk
}

struct Accumulator {
    summary: StructuralSummary,
    categories: LineCategoryMap,
    sites: Vec<SignalSite>,
    functions: Vec<FunctionRecord>,
}

#[derive(Default)]
struct Scope {
    loops: Vec<LoopFrame>,
    function: Option<usize>,
    string_names: BTreeSet<String>,
    hashed_names: BTreeSet<String>,
}

impl Scope {
    fn in_loop(&self) -> bool {
        !self.loops.is_empty()
    }

    fn innermost(&self) -> Option<&NodeRef> {
        self.loops.last().map(|frame| &frame.node)
    }
}

struct LoopFrame {
    node: NodeRef,
    iterated: BTreeSet<String>,
    built: BTreeSet<String>,
    pending: Vec<PendingMembership>,
}

struct PendingMembership {
    container: String,
    test: NodeRef,
}

fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

fn visit(node: Node<'_>, unit: &SourceUnit, scope: &mut Scope, acc: &mut Accumulator) {
    match node.kind() {
        "comment" => acc.categories.record(line_of(node), LineCategory::Comment),
        "function_definition" => visit_function(node, unit, scope, acc),
        "for_statement" => visit_for(node, unit, scope, acc),
        "while_statement" => visit_while(node, unit, scope, acc),
        _ if is_comprehension(node) => visit_comprehension(node, unit, scope, acc),
        kind => {
            match kind {
                "call" => on_call(node, unit, scope, acc),
                "augmented_assignment" => on_augmented_assignment(node, unit, scope, acc),
                "assignment" => on_assignment(node, unit, scope, acc),
                "comparison_operator" => on_comparison(node, unit, scope, acc),
                "binary_operator" => {
                    if is_string_expr(node, unit, &scope.string_names) {
                        acc.categories
                            .record(line_of(node), LineCategory::string_op(scope.in_loop()));
                    }
                }
                "if_statement" | "elif_clause" | "else_clause" | "conditional_expression"
                | "case_clause" => acc.categories.record(line_of(node), LineCategory::Branch),
                "except_clause" | "except_group_clause" => {
                    acc.summary.exception_handler_count += 1;
                    acc.categories
                        .record(line_of(node), LineCategory::ExceptionHandler);
                }
                _ => {}
            }
            visit_children(node, unit, scope, acc);
        }
    }
}

fn visit_children(node: Node<'_>, unit: &SourceUnit, scope: &mut Scope, acc: &mut Accumulator) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        visit(child, unit, scope, acc);
    }
}

fn visit_function(node: Node<'_>, unit: &SourceUnit, scope: &mut Scope, acc: &mut Accumulator) {
    let name = node
        .child_by_field_name("name")
        .map(|n| unit.text(n).to_string())
        .unwrap_or_default();
    let memoized = decorators(node, unit)
        .into_iter()
        .any(is_memo_decorator);
    acc.functions.push(FunctionRecord {
        name,
        node: NodeRef::of(node),
        memoized,
        calls: Vec::new(),
    });

    // Defaults are evaluated where the function is defined.
    if let Some(parameters) = node.child_by_field_name("parameters") {
        visit(parameters, unit, scope, acc);
    }

    let mut body_scope = Scope {
        function: Some(acc.functions.len() - 1),
        ..Scope::default()
    };
    if let Some(body) = node.child_by_field_name("body") {
        visit(body, unit, &mut body_scope, acc);
    }
}

fn visit_for(node: Node<'_>, unit: &SourceUnit, scope: &mut Scope, acc: &mut Accumulator) {
    acc.categories.record(line_of(node), LineCategory::LoopHeader);
    let body_id = node.child_by_field_name("body").map(|b| b.id());
    let iterated = node
        .child_by_field_name("right")
        .map(|right| identifiers_in(right, unit))
        .unwrap_or_default();

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if Some(child.id()) == body_id {
            enter_loop(node, iterated.clone(), scope, acc);
            visit(child, unit, scope, acc);
            exit_loop(scope, acc);
        } else {
            visit(child, unit, scope, acc);
        }
    }
}

fn visit_while(node: Node<'_>, unit: &SourceUnit, scope: &mut Scope, acc: &mut Accumulator) {
    acc.categories.record(line_of(node), LineCategory::LoopHeader);
    let alternative_id = node.child_by_field_name("alternative").map(|a| a.id());
    let iterated = node
        .child_by_field_name("condition")
        .map(|condition| identifiers_in(condition, unit))
        .unwrap_or_default();

    // The condition is re-evaluated on every iteration, so it sits inside the frame.
    enter_loop(node, iterated, scope, acc);
    let mut alternative = None;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if Some(child.id()) == alternative_id {
            alternative = Some(child);
        } else {
            visit(child, unit, scope, acc);
        }
    }
    exit_loop(scope, acc);

    if let Some(alternative) = alternative {
        visit(alternative, unit, scope, acc);
    }
}

fn visit_comprehension(node: Node<'_>, unit: &SourceUnit, scope: &mut Scope, acc: &mut Accumulator) {
    acc.summary.comprehension_count += 1;

    let mut cursor = node.walk();
    let clauses: Vec<Node<'_>> = node
        .named_children(&mut cursor)
        .filter(|child| child.kind() == "for_in_clause")
        .collect();

    // Only the first iterable is evaluated outside the comprehension's loops.
    let first_iterable = clauses
        .first()
        .and_then(|clause| clause.child_by_field_name("right"));
    if let Some(iterable) = first_iterable {
        visit(iterable, unit, scope, acc);
    }

    for clause in &clauses {
        acc.categories.record(line_of(*clause), LineCategory::LoopHeader);
        let iterated = clause
            .child_by_field_name("right")
            .map(|right| identifiers_in(right, unit))
            .unwrap_or_default();
        enter_loop(node, iterated, scope, acc);
    }

    let skipped = first_iterable.map(|n| n.id());
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "for_in_clause" {
            let mut clause_cursor = child.walk();
            for part in child.named_children(&mut clause_cursor) {
                if Some(part.id()) != skipped {
                    visit(part, unit, scope, acc);
                }
            }
        } else {
            visit(child, unit, scope, acc);
        }
    }

    for _ in &clauses {
        exit_loop(scope, acc);
    }
}

fn enter_loop(node: Node<'_>, iterated: BTreeSet<String>, scope: &mut Scope, acc: &mut Accumulator) {
    acc.summary.loop_count += 1;
    if let Some(outermost) = scope.loops.first() {
        acc.sites.push(SignalSite::new(
            Signal::NestedLoop,
            outermost.node.clone(),
            NodeRef::of(node),
        ));
    }
    scope.loops.push(LoopFrame {
        node: NodeRef::of(node),
        iterated,
        built: BTreeSet::new(),
        pending: Vec::new(),
    });
    acc.summary.max_loop_nest_depth = acc.summary.max_loop_nest_depth.max(scope.loops.len());
}

/// Pop the innermost frame, settling membership tests against what it iterated or built.
/// Unsettled tests and built names move to the enclosing frame.
fn exit_loop(scope: &mut Scope, acc: &mut Accumulator) {
    let Some(frame) = scope.loops.pop() else {
        return;
    };
    let LoopFrame {
        node,
        iterated,
        built,
        pending,
    } = frame;

    let (settled, unsettled): (Vec<_>, Vec<_>) = pending
        .into_iter()
        .partition(|test| iterated.contains(&test.container) || built.contains(&test.container));
    for test in settled {
        acc.sites.push(SignalSite::new(
            Signal::NestedDuplicateCheck,
            node.clone(),
            test.test,
        ));
    }

    if let Some(parent) = scope.loops.last_mut() {
        parent.pending.extend(unsettled);
        parent.built.extend(built);
    }
}

fn push_loop_site(signal: Signal, focus: Node<'_>, scope: &Scope, acc: &mut Accumulator) {
    if let Some(anchor) = scope.innermost() {
        acc.sites
            .push(SignalSite::new(signal, anchor.clone(), NodeRef::of(focus)));
    }
}

fn on_call(node: Node<'_>, unit: &SourceUnit, scope: &mut Scope, acc: &mut Accumulator) {
    acc.summary.function_call_count += 1;
    let callee = Callee::of(node, unit);
    let in_loop = scope.in_loop();

    let category = if callee.is_sort() {
        LineCategory::SortCall
    } else if callee.is_regex() {
        LineCategory::RegexCall
    } else if callee.is_collection_op() {
        LineCategory::collection_op(in_loop)
    } else if callee.is_string_op() {
        LineCategory::string_op(in_loop)
    } else {
        LineCategory::Call
    };
    acc.categories.record(line_of(node), category);

    if callee.is_sort() {
        acc.summary.sort_call_count += 1;
        push_loop_site(Signal::SortInLoop, node, scope, acc);
    }
    if callee.is_regex() {
        push_loop_site(Signal::RegexCallInLoop, node, scope, acc);
    }
    if callee.is_io() {
        acc.summary.io_op_count += 1;
        push_loop_site(Signal::IoInLoop, node, scope, acc);
    }
    if callee.is_list_op() {
        acc.summary.list_op_count += 1;
    }
    if callee.method_name() == Some("append") {
        push_loop_site(Signal::ListAppendInLoop, node, scope, acc);
    }
    if let (Some(name), Some(frame)) = (callee.built_collection(), scope.loops.last_mut()) {
        frame.built.insert(name.to_string());
    }
    if let (Some(function), Some(name)) = (scope.function, callee.graph_name()) {
        acc.functions[function].calls.push(CallSite {
            callee: name.to_string(),
            in_loop,
        });
    }
}

fn on_augmented_assignment(
    node: Node<'_>,
    unit: &SourceUnit,
    scope: &mut Scope,
    acc: &mut Accumulator,
) {
    let in_loop = scope.in_loop();
    let operator = node
        .child_by_field_name("operator")
        .map(|op| unit.text(op))
        .unwrap_or_default();
    let (Some(left), Some(right)) = (
        node.child_by_field_name("left"),
        node.child_by_field_name("right"),
    ) else {
        return;
    };

    let stringy = operator == "+="
        && (is_string_expr(right, unit, &scope.string_names)
            || (left.kind() == "identifier" && scope.string_names.contains(unit.text(left))));
    if stringy {
        acc.categories
            .record(line_of(node), LineCategory::string_op(in_loop));
        push_loop_site(Signal::StringConcatInLoop, node, scope, acc);
        return;
    }

    if left.kind() == "subscript" {
        acc.categories
            .record(line_of(node), LineCategory::collection_op(in_loop));
        if operator == "+=" && unparenthesize(right).kind() == "integer" {
            push_loop_site(Signal::DictManualCountInLoop, node, scope, acc);
        }
        return;
    }

    acc.categories.record(line_of(node), LineCategory::Assignment);
}

fn on_assignment(node: Node<'_>, unit: &SourceUnit, scope: &mut Scope, acc: &mut Accumulator) {
    let in_loop = scope.in_loop();
    let Some(left) = node.child_by_field_name("left") else {
        return;
    };
    let right = node.child_by_field_name("right");

    match left.kind() {
        "identifier" => {
            let name = unit.text(left).to_string();
            let is_string = right.is_some_and(|r| is_string_expr(r, unit, &scope.string_names));
            let is_hashed = right.is_some_and(|r| is_hashed_container(r, unit));
            if is_string {
                scope.string_names.insert(name.clone());
            } else {
                scope.string_names.remove(&name);
            }
            if is_hashed {
                scope.hashed_names.insert(name);
            } else {
                scope.hashed_names.remove(&name);
            }
            acc.categories.record(line_of(node), LineCategory::Assignment);
        }
        "subscript" => {
            acc.categories
                .record(line_of(node), LineCategory::collection_op(in_loop));
            let value = left
                .child_by_field_name("value")
                .map(|v| unit.text(v))
                .unwrap_or_default();
            let counts_with_get = right.is_some_and(|r| {
                r.kind() == "binary_operator" && unit.text(r).contains(&format!("{value}.get("))
            });
            if counts_with_get {
                push_loop_site(Signal::DictManualCountInLoop, node, scope, acc);
            }
        }
        "pattern_list" => {
            if let Some(array) = swap_target(node, unit) {
                acc.categories
                    .record(line_of(node), LineCategory::collection_op(in_loop));
                if scope.loops.len() >= 2 && guarded_by_adjacent_compare(node, array, unit) {
                    let outer = scope.loops[scope.loops.len() - 2].node.clone();
                    acc.sites.push(SignalSite::new(
                        Signal::SwapInNestedLoop,
                        outer,
                        NodeRef::of(node),
                    ));
                }
            } else {
                acc.categories.record(line_of(node), LineCategory::Assignment);
            }
        }
        _ => acc.categories.record(line_of(node), LineCategory::Assignment),
    }
}

/// Whether an enclosing `if` (inside the innermost loop) compares the same
/// adjacent elements the swap exchanges.
fn guarded_by_adjacent_compare(node: Node<'_>, array: &str, unit: &SourceUnit) -> bool {
    let mut current = node.parent();
    while let Some(ancestor) = current {
        match ancestor.kind() {
            "for_statement" | "while_statement" | "function_definition" => return false,
            "if_statement" => {
                let compares = ancestor
                    .child_by_field_name("condition")
                    .and_then(|condition| adjacent_comparison(condition, unit))
                    .is_some_and(|(compared, _)| compared == array);
                if compares {
                    return true;
                }
            }
            _ => {}
        }
        current = ancestor.parent();
    }
    false
}

fn on_comparison(node: Node<'_>, unit: &SourceUnit, scope: &mut Scope, acc: &mut Accumulator) {
    let Some(container) = membership_container(node, unit) else {
        return;
    };
    acc.categories
        .record(line_of(node), LineCategory::collection_op(scope.in_loop()));
    if scope.hashed_names.contains(container) {
        return;
    }
    if let Some(frame) = scope.loops.last_mut() {
        frame.pending.push(PendingMembership {
            container: container.to_string(),
            test: NodeRef::of(node),
        });
    }
}

impl Accumulator {
    fn new(line_count: usize) -> Self {
        Self {
            summary: StructuralSummary::default(),
            categories: LineCategoryMap::new(line_count),
            sites: Vec::new(),
            functions: Vec::new(),
        }
    }

    fn finish(mut self, unit: &SourceUnit) -> StructuralWalk {
        for (index, line) in unit.source().lines().enumerate() {
            if line.trim().is_empty() {
                self.categories.record(index + 1, LineCategory::Blank);
            }
        }

        let graph = CallGraph::build(&self.functions);
        self.summary.recursive_function_names = graph.recursive_functions();
        self.summary.recursion_shapes = recursion_shapes(&self.functions, &graph);
        for function in &self.functions {
            if graph.is_recursive(&function.name)
                && shape_of(function, &graph) == RecursionShape::Branching
            {
                self.sites.push(SignalSite::new(
                    Signal::BranchingRecursion,
                    function.node.clone(),
                    function.node.clone(),
                ));
            }
        }

        self.sites.sort();
        self.sites.dedup();

        let fired = |signal: Signal| self.sites.iter().any(|site| site.signal == signal);
        self.summary.string_concat_in_loop = fired(Signal::StringConcatInLoop);
        self.summary.list_append_in_loop = fired(Signal::ListAppendInLoop);
        self.summary.dict_manual_count_in_loop = fired(Signal::DictManualCountInLoop);
        self.summary.regex_call_in_loop = fired(Signal::RegexCallInLoop);
        self.summary.nested_duplicate_check = fired(Signal::NestedDuplicateCheck);

        StructuralWalk {
            summary: self.summary,
            categories: self.categories,
            sites: self.sites,
            functions: self.functions,
        }
    }
}
