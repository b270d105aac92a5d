//! Small queries over tree-sitter-python nodes shared by the walker and the
//! rewrite templates.

use crate::core::SourceUnit;
use std::collections::BTreeSet;
use tree_sitter::Node;

pub const LOOP_STATEMENTS: &[&str] = &["for_statement", "while_statement"];

pub const COMPREHENSIONS: &[&str] = &[
    "list_comprehension",
    "set_comprehension",
    "dictionary_comprehension",
    "generator_expression",
];

pub const LIST_OPS: &[&str] = &["append", "extend", "insert", "remove"];

pub const COLLECTION_METHODS: &[&str] = &[
    "append",
    "extend",
    "insert",
    "remove",
    "add",
    "pop",
    "update",
    "discard",
    "setdefault",
    "appendleft",
];

/// Methods that grow the receiver; used to tell which names a loop builds.
pub const BUILDER_METHODS: &[&str] = &["append", "extend", "insert", "add", "update", "appendleft"];

/// Methods that change the receiver in place.
pub const MUTATING_METHODS: &[&str] = &[
    "append",
    "extend",
    "insert",
    "add",
    "update",
    "appendleft",
    "pop",
    "popleft",
    "popitem",
    "remove",
    "discard",
    "clear",
    "setdefault",
    "sort",
    "reverse",
];

pub const STRING_METHODS: &[&str] = &[
    "join",
    "format",
    "replace",
    "split",
    "strip",
    "lstrip",
    "rstrip",
    "lower",
    "upper",
    "title",
    "startswith",
    "endswith",
    "encode",
    "decode",
];

pub const REGEX_FUNCTIONS: &[&str] = &[
    "search", "match", "fullmatch", "findall", "finditer", "sub", "subn", "split", "compile",
];

const IO_FUNCTIONS: &[&str] = &["print", "open", "input"];
const IO_METHODS: &[&str] = &["read", "readline", "readlines", "write", "writelines", "flush"];
const STRING_BUILTINS: &[&str] = &["str", "repr", "chr", "format"];
const HASHED_CONSTRUCTORS: &[&str] = &[
    "set",
    "frozenset",
    "dict",
    "Counter",
    "defaultdict",
    "OrderedDict",
];
const MEMO_DECORATORS: &[&str] = &["lru_cache", "cache"];

/// What a call expression invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callee<'a> {
    /// `name(...)`
    Function(&'a str),
    /// `object.method(...)`; `object` is set only when the receiver is a bare name.
    Method {
        object: Option<&'a str>,
        method: &'a str,
    },
    Other,
}

impl<'a> Callee<'a> {
    pub fn of(call: Node<'_>, unit: &'a SourceUnit) -> Self {
        let Some(function) = call.child_by_field_name("function") else {
            return Callee::Other;
        };
        match function.kind() {
            "identifier" => Callee::Function(unit.text(function)),
            "attribute" => {
                let Some(attribute) = function.child_by_field_name("attribute") else {
                    return Callee::Other;
                };
                let object = function
                    .child_by_field_name("object")
                    .filter(|o| o.kind() == "identifier")
                    .map(|o| unit.text(o));
                Callee::Method {
                    object,
                    method: unit.text(attribute),
                }
            }
            _ => Callee::Other,
        }
    }

    pub fn method_name(&self) -> Option<&'a str> {
        match self {
            Callee::Method { method, .. } => Some(*method),
            _ => None,
        }
    }

    pub fn is_sort(&self) -> bool {
        matches!(self, Callee::Function("sorted") | Callee::Method { method: "sort", .. })
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Callee::Method { object: Some("re"), method } if REGEX_FUNCTIONS.contains(method))
    }

    pub fn is_io(&self) -> bool {
        match self {
            Callee::Function(name) => IO_FUNCTIONS.contains(name),
            Callee::Method { method, .. } => IO_METHODS.contains(method),
            Callee::Other => false,
        }
    }

    pub fn is_list_op(&self) -> bool {
        self.method_name().is_some_and(|m| LIST_OPS.contains(&m))
    }

    pub fn is_collection_op(&self) -> bool {
        self.method_name()
            .is_some_and(|m| COLLECTION_METHODS.contains(&m))
    }

    pub fn is_string_op(&self) -> bool {
        match self {
            Callee::Function(name) => STRING_BUILTINS.contains(name),
            Callee::Method { method, .. } => STRING_METHODS.contains(method),
            Callee::Other => false,
        }
    }

    /// Receiver name when the call grows a named collection (`seen.append(x)`).
    pub fn built_collection(&self) -> Option<&'a str> {
        match self {
            Callee::Method {
                object: Some(object),
                method,
            } if BUILDER_METHODS.contains(method) => Some(*object),
            _ => None,
        }
    }

    /// Receiver name when the call changes a named object in place (`path.pop()`).
    pub fn mutated_receiver(&self) -> Option<&'a str> {
        match self {
            Callee::Method {
                object: Some(object),
                method,
            } if MUTATING_METHODS.contains(method) => Some(*object),
            _ => None,
        }
    }

    /// Name used for call-graph edges: plain calls and `self.`/`cls.` methods.
    pub fn graph_name(&self) -> Option<&'a str> {
        match self {
            Callee::Function(name) => Some(*name),
            Callee::Method {
                object: Some("self" | "cls"),
                method,
            } => Some(*method),
            _ => None,
        }
    }
}

/// Named, non-comment statements of a block.
pub fn statements(block: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = block.walk();
    block
        .named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect()
}

/// Unwrap `expression_statement` to the single expression it holds.
pub fn statement_expression(stmt: Node<'_>) -> Option<Node<'_>> {
    if stmt.kind() != "expression_statement" || stmt.named_child_count() != 1 {
        return None;
    }
    stmt.named_child(0)
}

pub fn unparenthesize(mut node: Node<'_>) -> Node<'_> {
    while node.kind() == "parenthesized_expression" && node.named_child_count() == 1 {
        match node.named_child(0) {
            Some(inner) => node = inner,
            None => break,
        }
    }
    node
}

pub fn is_loop(node: Node<'_>) -> bool {
    LOOP_STATEMENTS.contains(&node.kind())
}

pub fn is_comprehension(node: Node<'_>) -> bool {
    COMPREHENSIONS.contains(&node.kind())
}

/// Every identifier appearing in `node`.
pub fn identifiers_in(node: Node<'_>, unit: &SourceUnit) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    collect_identifiers(node, unit, &mut names);
    names
}

fn collect_identifiers(node: Node<'_>, unit: &SourceUnit, names: &mut BTreeSet<String>) {
    if node.kind() == "identifier" {
        names.insert(unit.text(node).to_string());
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_identifiers(child, unit, names);
    }
}

/// Whether an expression evidently produces a `str`.
pub fn is_string_expr(node: Node<'_>, unit: &SourceUnit, string_names: &BTreeSet<String>) -> bool {
    let node = unparenthesize(node);
    match node.kind() {
        "string" | "concatenated_string" => true,
        "identifier" => string_names.contains(unit.text(node)),
        "call" => Callee::of(node, unit).is_string_op(),
        "binary_operator" => {
            let operator = node
                .child_by_field_name("operator")
                .map(|op| unit.text(op))
                .unwrap_or_default();
            if operator != "+" && operator != "%" {
                return false;
            }
            [node.child_by_field_name("left"), node.child_by_field_name("right")]
                .into_iter()
                .flatten()
                .any(|side| is_string_expr(side, unit, string_names))
        }
        _ => false,
    }
}

/// Whether an expression builds a hashed container (`set()`, `{}`, `Counter(...)`).
pub fn is_hashed_container(node: Node<'_>, unit: &SourceUnit) -> bool {
    let node = unparenthesize(node);
    match node.kind() {
        "set" | "dictionary" | "set_comprehension" | "dictionary_comprehension" => true,
        "call" => match Callee::of(node, unit) {
            Callee::Function(name) => HASHED_CONSTRUCTORS.contains(&name),
            Callee::Method { method, .. } => HASHED_CONSTRUCTORS.contains(&method),
            Callee::Other => false,
        },
        _ => false,
    }
}

/// Whether an expression is an empty dict (`{}` or `dict()`).
pub fn is_empty_dict(node: Node<'_>, unit: &SourceUnit) -> bool {
    let node = unparenthesize(node);
    match node.kind() {
        "dictionary" => node.named_child_count() == 0,
        "call" => {
            Callee::of(node, unit) == Callee::Function("dict")
                && node
                    .child_by_field_name("arguments")
                    .is_some_and(|args| args.named_child_count() == 0)
        }
        _ => false,
    }
}

/// `(value, index)` texts of `name[index]`; the value must be a bare name.
pub fn subscript_parts<'a>(node: Node<'_>, unit: &'a SourceUnit) -> Option<(&'a str, &'a str)> {
    if node.kind() != "subscript" {
        return None;
    }
    let value = node.child_by_field_name("value")?;
    if value.kind() != "identifier" {
        return None;
    }
    let index = node.child_by_field_name("subscript")?;
    Some((unit.text(value), unit.text(index)))
}

/// `a` and `b` index neighbouring elements (`j` / `j + 1`, `i - 1` / `i`).
pub fn is_adjacent_index(a: &str, b: &str) -> bool {
    let a: String = a.chars().filter(|c| !c.is_whitespace()).collect();
    let b: String = b.chars().filter(|c| !c.is_whitespace()).collect();
    b == format!("{a}+1") || a == format!("{b}+1") || a == format!("{b}-1") || b == format!("{a}-1")
}

/// For adjacent indices, whether `a` is the lower one.
pub fn is_lower_index(a: &str, b: &str) -> bool {
    let a: String = a.chars().filter(|c| !c.is_whitespace()).collect();
    let b: String = b.chars().filter(|c| !c.is_whitespace()).collect();
    b == format!("{a}+1") || a == format!("{b}-1")
}

/// Recognize `xs[i], xs[j] = xs[j], xs[i]` on adjacent indices; returns the array name.
pub fn swap_target<'a>(assignment: Node<'_>, unit: &'a SourceUnit) -> Option<&'a str> {
    if assignment.kind() != "assignment" {
        return None;
    }
    let left = assignment.child_by_field_name("left")?;
    let right = assignment.child_by_field_name("right")?;
    if left.kind() != "pattern_list" || right.kind() != "expression_list" {
        return None;
    }
    if left.named_child_count() != 2 || right.named_child_count() != 2 {
        return None;
    }
    let (l0, l1) = (left.named_child(0)?, left.named_child(1)?);
    let (r0, r1) = (right.named_child(0)?, right.named_child(1)?);
    let (array, i) = subscript_parts(l0, unit)?;
    let (array_b, j) = subscript_parts(l1, unit)?;
    if array != array_b || !is_adjacent_index(i, j) {
        return None;
    }
    if unit.text(r0) != unit.text(l1) || unit.text(r1) != unit.text(l0) {
        return None;
    }
    Some(array)
}

/// Recognize `xs[i] > xs[j]` (or `<`, `>=`, `<=`) on adjacent indices.
///
/// Returns the array name and whether a swap under this condition sorts ascending.
pub fn adjacent_comparison<'a>(condition: Node<'_>, unit: &'a SourceUnit) -> Option<(&'a str, bool)> {
    let condition = unparenthesize(condition);
    if condition.kind() != "comparison_operator" || condition.named_child_count() != 2 {
        return None;
    }
    let mut cursor = condition.walk();
    let operators: Vec<&str> = condition
        .children_by_field_name("operators", &mut cursor)
        .map(|op| op.kind())
        .collect();
    let [operator] = operators.as_slice() else {
        return None;
    };
    let (left, right) = (condition.named_child(0)?, condition.named_child(1)?);
    let (array, i) = subscript_parts(left, unit)?;
    let (array_b, j) = subscript_parts(right, unit)?;
    if array != array_b || !is_adjacent_index(i, j) {
        return None;
    }
    let left_is_lower = is_lower_index(i, j);
    let ascending = match *operator {
        ">" | ">=" => left_is_lower,
        "<" | "<=" => !left_is_lower,
        _ => return None,
    };
    Some((array, ascending))
}

/// Membership test `x in name` / `x not in name`; returns the container name.
pub fn membership_container<'a>(comparison: Node<'_>, unit: &'a SourceUnit) -> Option<&'a str> {
    if comparison.kind() != "comparison_operator" || comparison.named_child_count() != 2 {
        return None;
    }
    let mut cursor = comparison.walk();
    let is_membership = comparison
        .children_by_field_name("operators", &mut cursor)
        .any(|op| matches!(op.kind(), "in" | "not in"));
    if !is_membership {
        return None;
    }
    let container = comparison.named_child(1)?;
    (container.kind() == "identifier").then(|| unit.text(container))
}

/// Decorators applied to a definition, as source text without the `@`.
pub fn decorators<'a>(definition: Node<'_>, unit: &'a SourceUnit) -> Vec<&'a str> {
    let Some(parent) = definition.parent().filter(|p| p.kind() == "decorated_definition") else {
        return Vec::new();
    };
    let mut cursor = parent.walk();
    parent
        .named_children(&mut cursor)
        .filter(|n| n.kind() == "decorator")
        .map(|d| unit.text(d).trim_start_matches('@').trim())
        .collect()
}

/// `@lru_cache`, `@functools.lru_cache(maxsize=None)`, `@cache`, ...
pub fn is_memo_decorator(decorator: &str) -> bool {
    let callee = decorator.split('(').next().unwrap_or_default().trim();
    let last = callee.rsplit('.').next().unwrap_or_default();
    MEMO_DECORATORS.contains(&last)
}

pub fn is_async_function(function: Node<'_>) -> bool {
    let mut cursor = function.walk();
    let is_async = function
        .children(&mut cursor)
        .take_while(|c| c.kind() != "def")
        .any(|c| c.kind() == "async");
    is_async
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
        if node.kind() == kind {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        children.into_iter().find_map(|c| first_of_kind(c, kind))
    }

    #[test]
    fn test_adjacent_indices() {
        assert!(is_adjacent_index("j", "j + 1"));
        assert!(is_adjacent_index("j+1", "j"));
        assert!(is_adjacent_index("i - 1", "i"));
        assert!(!is_adjacent_index("i", "j"));
        assert!(is_lower_index("j", "j+1"));
        assert!(!is_lower_index("j + 1", "j"));
    }

    #[test]
    fn test_callee_classification() {
        let unit = SourceUnit::parse("re.search(p, s)\nitems.sort()\nsorted(x)\nprint(1)\n").unwrap();
        let root = unit.root();
        let mut cursor = root.walk();
        let calls: Vec<_> = root
            .named_children(&mut cursor)
            .filter_map(statement_expression)
            .collect();
        assert!(Callee::of(calls[0], &unit).is_regex());
        assert!(Callee::of(calls[1], &unit).is_sort());
        assert!(Callee::of(calls[2], &unit).is_sort());
        assert!(Callee::of(calls[3], &unit).is_io());
    }

    #[test]
    fn test_swap_and_comparison() {
        let unit = SourceUnit::parse("if a[j] > a[j + 1]:\n    a[j], a[j + 1] = a[j + 1], a[j]\n").unwrap();
        let assignment = first_of_kind(unit.root(), "assignment").unwrap();
        assert_eq!(swap_target(assignment, &unit), Some("a"));
        let comparison = first_of_kind(unit.root(), "comparison_operator").unwrap();
        assert_eq!(adjacent_comparison(comparison, &unit), Some(("a", true)));
    }

    #[test]
    fn test_membership_container() {
        let unit = SourceUnit::parse("x not in seen\n").unwrap();
        let comparison = first_of_kind(unit.root(), "comparison_operator").unwrap();
        assert_eq!(membership_container(comparison, &unit), Some("seen"));
    }

    #[test]
    fn test_memo_decorators() {
        assert!(is_memo_decorator("functools.lru_cache(maxsize=None)"));
        assert!(is_memo_decorator("cache"));
        assert!(!is_memo_decorator("staticmethod"));
    }

    #[test]
    fn test_string_expressions() {
        let unit = SourceUnit::parse("str(x)\n'a' + y\nx + y\n").unwrap();
        let root = unit.root();
        let mut cursor = root.walk();
        let exprs: Vec<_> = root
            .named_children(&mut cursor)
            .filter_map(statement_expression)
            .collect();
        let names = BTreeSet::new();
        assert!(is_string_expr(exprs[0], &unit, &names));
        assert!(is_string_expr(exprs[1], &unit, &names));
        assert!(!is_string_expr(exprs[2], &unit, &names));
    }
}
