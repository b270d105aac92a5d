//! Rewrite templates. Each one recognizes a literal shape around a match and
//! synthesizes replacement lines, or refuses with `UnsupportedRewrite`.

use crate::analyzers::python::syntax::{
    adjacent_comparison, identifiers_in, is_async_function, is_empty_dict, statement_expression,
    statements, swap_target, unparenthesize, Callee,
};
use crate::core::{Error, LineSpan, Result, SourceUnit};
use crate::patterns::{PatternMatch, TemplateId};
use std::collections::BTreeSet;
use tree_sitter::Node;

pub const FUNCTOOLS_IMPORT: &str = "import functools";
pub const COLLECTIONS_IMPORT: &str = "import collections";

/// Replacement for a contiguous block of original lines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edit {
    pub span: LineSpan,
    pub lines: Vec<String>,
    /// Indentation for the annotation comment.
    pub indent: String,
    pub imports: &'static [&'static str],
    pub rationale: &'static str,
}

/// Per-run state shared between template applications.
#[derive(Debug, Default)]
pub struct TemplateContext {
    next_pattern_name: usize,
}

impl TemplateContext {
    fn fresh_pattern_name(&mut self, source: &str) -> String {
        loop {
            self.next_pattern_name += 1;
            let name = format!("_pattern_{}", self.next_pattern_name);
            if !source.contains(&name) {
                return name;
            }
        }
    }
}

pub fn synthesize(
    template: TemplateId,
    pattern: &PatternMatch,
    unit: &SourceUnit,
    context: &mut TemplateContext,
) -> Result<Edit> {
    let refuse = |reason: &str| Error::unsupported(pattern.pattern_id, reason);
    let anchor = pattern
        .anchor
        .resolve(unit)
        .ok_or_else(|| refuse("matched construct no longer present"))?;

    match template {
        TemplateId::Join => join(anchor, unit).map_err(refuse),
        TemplateId::Comprehension => comprehension(anchor, unit).map_err(refuse),
        TemplateId::Counter => counter(anchor, unit).map_err(refuse),
        TemplateId::BuiltinSort => builtin_sort(anchor, unit).map_err(refuse),
        TemplateId::Memoize => memoize(anchor, unit).map_err(refuse),
        TemplateId::PrecompileRegex => {
            let call = pattern
                .focus
                .resolve(unit)
                .ok_or_else(|| refuse("regex call no longer present"))?;
            precompile_regex(anchor, call, unit, context).map_err(refuse)
        }
    }
}

type Shape<T> = std::result::Result<T, &'static str>;

struct ForLoop<'t> {
    node: Node<'t>,
    target: Node<'t>,
    iterable: Node<'t>,
    body: Vec<Node<'t>>,
}

fn simple_for(node: Node<'_>) -> Shape<ForLoop<'_>> {
    if node.kind() != "for_statement" {
        return Err("only `for` statements are rewritten");
    }
    let mut cursor = node.walk();
    if node.children(&mut cursor).any(|c| c.kind() == "async") {
        return Err("`async for` loops are not rewritten");
    }
    if node.child_by_field_name("alternative").is_some() {
        return Err("loop has an `else` clause");
    }
    let target = node.child_by_field_name("left").ok_or("loop has no target")?;
    let iterable = node.child_by_field_name("right").ok_or("loop has no iterable")?;
    let body = node
        .child_by_field_name("body")
        .map(statements)
        .ok_or("loop has no body")?;
    Ok(ForLoop {
        node,
        target,
        iterable,
        body,
    })
}

impl<'t> ForLoop<'t> {
    fn single_statement(&self) -> Shape<Node<'t>> {
        match self.body.as_slice() {
            [statement] => Ok(*statement),
            _ => Err("loop body has more than one statement"),
        }
    }

    /// `for <target> in <iterable>` as it appears inside a comprehension.
    fn clause(&self, unit: &SourceUnit) -> String {
        let iterable = if self.iterable.kind() == "expression_list" {
            format!("({})", unit.text(self.iterable))
        } else {
            unit.text(self.iterable).to_string()
        };
        format!("for {} in {}", unit.text(self.target), iterable)
    }
}

fn mentions(node: Node<'_>, unit: &SourceUnit, name: &str) -> bool {
    identifiers_in(node, unit).contains(name)
}

/// Wrap expressions that cannot stand unparenthesized before `for`.
fn element_text(node: Node<'_>, unit: &SourceUnit) -> String {
    match node.kind() {
        "lambda" | "named_expression" | "yield" => format!("({})", unit.text(node)),
        _ => unit.text(node).to_string(),
    }
}

/// `acc += expr` over a loop becomes one `"".join(...)`.
fn join(anchor: Node<'_>, unit: &SourceUnit) -> Shape<Edit> {
    let lp = simple_for(anchor)?;
    let statement = lp.single_statement()?;
    let assignment = statement_expression(statement)
        .filter(|n| n.kind() == "augmented_assignment")
        .ok_or("loop body is not a single `+=` statement")?;
    let operator = assignment
        .child_by_field_name("operator")
        .map(|op| unit.text(op));
    if operator != Some("+=") {
        return Err("loop body is not a single `+=` statement");
    }
    let (Some(left), Some(right)) = (
        assignment.child_by_field_name("left"),
        assignment.child_by_field_name("right"),
    ) else {
        return Err("incomplete assignment");
    };
    if left.kind() != "identifier" {
        return Err("accumulator is not a plain name");
    }
    let accumulator = unit.text(left);
    if mentions(right, unit, accumulator) || mentions(lp.iterable, unit, accumulator) {
        return Err("appended text depends on the accumulator");
    }

    let indent = unit.indentation_of(lp.node).to_string();
    let line = format!(
        "{indent}{accumulator} += \"\".join({} {})",
        element_text(right, unit),
        lp.clause(unit)
    );
    Ok(Edit {
        span: LineSpan::of(lp.node),
        lines: vec![line],
        indent,
        imports: &[],
        rationale: "builds the string once instead of copying it on every iteration",
    })
}

/// `acc.append(expr)` (optionally under one `if`) becomes `acc.extend([...])`.
fn comprehension(anchor: Node<'_>, unit: &SourceUnit) -> Shape<Edit> {
    let lp = simple_for(anchor)?;
    let statement = lp.single_statement()?;

    let (append_statement, condition) = if statement.kind() == "if_statement" {
        if statement.child_by_field_name("alternative").is_some() {
            return Err("conditional append has an `else` branch");
        }
        let consequence = statement
            .child_by_field_name("consequence")
            .map(statements)
            .unwrap_or_default();
        let [inner] = consequence.as_slice() else {
            return Err("conditional block has more than one statement");
        };
        let condition = statement
            .child_by_field_name("condition")
            .ok_or("condition missing")?;
        (*inner, Some(condition))
    } else {
        (statement, None)
    };

    let call = statement_expression(append_statement)
        .filter(|n| n.kind() == "call")
        .ok_or("loop body is not a single `append` call")?;
    let Callee::Method {
        object: Some(accumulator),
        method: "append",
    } = Callee::of(call, unit)
    else {
        return Err("loop body is not a single `append` call");
    };
    let arguments = call.child_by_field_name("arguments").ok_or("call has no arguments")?;
    let element = match arguments.named_child_count() {
        1 => arguments.named_child(0).ok_or("call has no arguments")?,
        _ => return Err("`append` takes exactly one argument"),
    };
    if matches!(
        element.kind(),
        "keyword_argument" | "list_splat" | "dictionary_splat"
    ) {
        return Err("`append` argument is not a plain expression");
    }

    let depends = mentions(element, unit, accumulator)
        || mentions(lp.iterable, unit, accumulator)
        || condition.is_some_and(|c| mentions(c, unit, accumulator));
    if depends {
        return Err("appended value depends on the list being built");
    }

    let filter = condition
        .map(|c| format!(" if {}", unit.text(c)))
        .unwrap_or_default();
    let indent = unit.indentation_of(lp.node).to_string();
    let line = format!(
        "{indent}{accumulator}.extend([{} {}{filter}])",
        element_text(element, unit),
        lp.clause(unit)
    );
    Ok(Edit {
        span: LineSpan::of(lp.node),
        lines: vec![line],
        indent,
        imports: &[],
        rationale: "a comprehension builds the list without per-item method lookups",
    })
}

fn is_integer(node: Node<'_>, unit: &SourceUnit, value: &str) -> bool {
    let node = unparenthesize(node);
    node.kind() == "integer" && unit.text(node) == value
}

/// `dict[key]` where both sides are the expected names.
fn is_keyed(node: Node<'_>, unit: &SourceUnit, dict: &str, key: &str) -> bool {
    node.kind() == "subscript"
        && node
            .child_by_field_name("value")
            .is_some_and(|v| v.kind() == "identifier" && unit.text(v) == dict)
        && node
            .child_by_field_name("subscript")
            .is_some_and(|k| unit.text(k) == key)
}

/// `d[k] += 1`
fn is_increment(statement: Node<'_>, unit: &SourceUnit, dict: &str, key: &str) -> bool {
    let Some(assignment) = statement_expression(statement).filter(|n| n.kind() == "augmented_assignment") else {
        return false;
    };
    let operator = assignment
        .child_by_field_name("operator")
        .map(|op| unit.text(op));
    operator == Some("+=")
        && assignment
            .child_by_field_name("left")
            .is_some_and(|l| is_keyed(l, unit, dict, key))
        && assignment
            .child_by_field_name("right")
            .is_some_and(|r| is_integer(r, unit, "1"))
}

/// `d[k] = <value>`; returns the value node.
fn keyed_store<'t>(statement: Node<'t>, unit: &SourceUnit, dict: &str, key: &str) -> Option<Node<'t>> {
    let assignment = statement_expression(statement).filter(|n| n.kind() == "assignment")?;
    let left = assignment.child_by_field_name("left")?;
    if !is_keyed(left, unit, dict, key) {
        return None;
    }
    assignment.child_by_field_name("right")
}

/// `d.get(k, 0) + 1`
fn is_get_plus_one(node: Node<'_>, unit: &SourceUnit, dict: &str, key: &str) -> bool {
    let compact: String = unit.text(node).chars().filter(|c| !c.is_whitespace()).collect();
    compact == format!("{dict}.get({key},0)+1")
}

/// The counting statement the loop body may consist of.
fn counts_into(statement: Node<'_>, unit: &SourceUnit, dict: &str, key: &str) -> Option<CountShape> {
    if is_increment(statement, unit, dict, key) {
        return Some(CountShape::Increment);
    }
    if keyed_store(statement, unit, dict, key).is_some_and(|v| is_get_plus_one(v, unit, dict, key)) {
        return Some(CountShape::GetPlusOne);
    }
    if statement.kind() != "if_statement" {
        return None;
    }
    // if k in d: d[k] += 1 / else: d[k] = 1
    let condition = statement.child_by_field_name("condition")?;
    let compact: String = unit.text(condition).chars().filter(|c| !c.is_whitespace()).collect();
    if compact != format!("{key}in{dict}") {
        return None;
    }
    let consequence = statement
        .child_by_field_name("consequence")
        .map(statements)
        .unwrap_or_default();
    let alternative = statement.child_by_field_name("alternative")?;
    if alternative.kind() != "else_clause" {
        return None;
    }
    let otherwise = alternative
        .child_by_field_name("body")
        .map(statements)
        .unwrap_or_default();
    match (consequence.as_slice(), otherwise.as_slice()) {
        ([hit], [miss])
            if is_increment(*hit, unit, dict, key)
                && keyed_store(*miss, unit, dict, key).is_some_and(|v| is_integer(v, unit, "1")) =>
        {
            Some(CountShape::Branch)
        }
        _ => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CountShape {
    Increment,
    GetPlusOne,
    Branch,
}

/// `d = {}` + counting loop becomes `d = collections.Counter(iterable)`.
fn counter(anchor: Node<'_>, unit: &SourceUnit) -> Shape<Edit> {
    let lp = simple_for(anchor)?;
    if lp.target.kind() != "identifier" {
        return Err("loop target is not a plain name");
    }
    let key = unit.text(lp.target);

    let init = lp
        .node
        .prev_named_sibling()
        .ok_or("counting dict is not initialized right before the loop")?;
    let assignment = statement_expression(init)
        .filter(|n| n.kind() == "assignment")
        .ok_or("counting dict is not initialized right before the loop")?;
    let (Some(name), Some(value)) = (
        assignment.child_by_field_name("left"),
        assignment.child_by_field_name("right"),
    ) else {
        return Err("counting dict is not initialized right before the loop");
    };
    if name.kind() != "identifier" {
        return Err("counting dict is not a plain name");
    }
    let dict = unit.text(name);
    let defaulting = {
        let compact: String = unit.text(value).chars().filter(|c| !c.is_whitespace()).collect();
        compact == "defaultdict(int)" || compact == "collections.defaultdict(int)"
    };
    if !defaulting && !is_empty_dict(value, unit) {
        return Err("counting dict does not start empty");
    }

    let statement = lp.single_statement()?;
    let shape = counts_into(statement, unit, dict, key).ok_or("loop body is not a counting statement")?;
    if shape == CountShape::Increment && !defaulting {
        return Err("plain `d[k] += 1` on an empty dict raises KeyError");
    }
    if mentions(lp.iterable, unit, dict) {
        return Err("iterable depends on the counting dict");
    }

    let indent = unit.indentation_of(init).to_string();
    let iterable = unit.text(lp.iterable);
    let iterable = if lp.iterable.kind() == "expression_list" {
        format!("({iterable})")
    } else {
        iterable.to_string()
    };
    Ok(Edit {
        span: LineSpan::new(LineSpan::of(init).start, LineSpan::of(lp.node).end),
        lines: vec![format!("{indent}{dict} = collections.Counter({iterable})")],
        indent,
        imports: &[COLLECTIONS_IMPORT],
        rationale: "Counter tallies items in C instead of one dict update per iteration",
    })
}

/// Hand-written adjacent compare-and-swap passes become `list.sort()`.
fn builtin_sort(anchor: Node<'_>, unit: &SourceUnit) -> Shape<Edit> {
    let outer = simple_for(anchor)?;
    let inner = simple_for(outer.single_statement()?)
        .map_err(|_| "outer loop holds more than the inner pass")?;
    let guard = inner.single_statement()?;
    if guard.kind() != "if_statement" || guard.child_by_field_name("alternative").is_some() {
        return Err("inner loop is not a single compare-and-swap");
    }
    let (array, ascending) = guard
        .child_by_field_name("condition")
        .and_then(|c| adjacent_comparison(c, unit))
        .ok_or("condition does not compare adjacent elements")?;
    let consequence = guard
        .child_by_field_name("consequence")
        .map(statements)
        .unwrap_or_default();
    let [swap] = consequence.as_slice() else {
        return Err("swap block has more than one statement");
    };
    let swapped = statement_expression(*swap).and_then(|a| swap_target(a, unit));
    if swapped != Some(array) {
        return Err("swap does not exchange the compared elements");
    }

    let indent = unit.indentation_of(outer.node).to_string();
    let call = if ascending { "sort()" } else { "sort(reverse=True)" };
    Ok(Edit {
        span: LineSpan::of(outer.node),
        lines: vec![format!("{indent}{array}.{call}")],
        indent,
        imports: &[],
        rationale: "the built-in Timsort replaces the quadratic swap passes",
    })
}

/// Decorate a branching recursive function with an unbounded LRU cache.
fn memoize(anchor: Node<'_>, unit: &SourceUnit) -> Shape<Edit> {
    if anchor.kind() != "function_definition" {
        return Err("match is not a function definition");
    }
    if is_async_function(anchor) {
        return Err("async functions cannot be cached with lru_cache");
    }
    let parameters = anchor
        .child_by_field_name("parameters")
        .ok_or("function has no parameter list")?;
    let mut names = BTreeSet::new();
    let mut cursor = parameters.walk();
    for (index, parameter) in parameters.named_children(&mut cursor).enumerate() {
        let name = match parameter.kind() {
            "identifier" => Some(parameter),
            "typed_parameter" => parameter.named_child(0).filter(|n| n.kind() == "identifier"),
            "default_parameter" | "typed_default_parameter" => {
                let default = parameter.child_by_field_name("value");
                if default.is_some_and(|d| matches!(d.kind(), "list" | "dictionary" | "set")) {
                    return Err("parameter has a mutable default");
                }
                parameter.child_by_field_name("name")
            }
            "comment" => continue,
            _ => None,
        }
        .ok_or("only plain positional parameters can be cached")?;
        if index == 0 && matches!(unit.text(name), "self" | "cls") {
            return Err("methods are not cached");
        }
        names.insert(unit.text(name));
    }

    let body = anchor.child_by_field_name("body").ok_or("function has no body")?;
    let locals = local_bindings(body, unit);
    if let Some(reason) = side_effect(body, &names, &locals, unit) {
        return Err(reason);
    }
    let start = LineSpan::of(anchor).start;
    let body_line = LineSpan::of(body).start;
    let end = if body_line > start { body_line - 1 } else { start };
    let span = LineSpan::new(start, end);

    let indent = unit.indentation_of(anchor).to_string();
    let mut lines = vec![format!("{indent}@functools.lru_cache(maxsize=None)")];
    lines.extend(
        unit.source()
            .lines()
            .skip(start - 1)
            .take(span.len())
            .map(str::to_string),
    );
    Ok(Edit {
        span,
        lines,
        indent,
        imports: &[FUNCTOOLS_IMPORT],
        rationale: "caching makes each distinct argument computed once",
    })
}

/// Names the function body binds with plain assignment or a `for` target.
fn local_bindings<'u>(body: Node<'_>, unit: &'u SourceUnit) -> BTreeSet<&'u str> {
    fn bind<'u>(target: Node<'_>, unit: &'u SourceUnit, names: &mut BTreeSet<&'u str>) {
        match target.kind() {
            "identifier" => {
                names.insert(unit.text(target));
            }
            "pattern_list" | "tuple_pattern" | "list_pattern" | "parenthesized_expression" => {
                let mut cursor = target.walk();
                for child in target.named_children(&mut cursor) {
                    bind(child, unit, names);
                }
            }
            _ => {}
        }
    }

    fn collect<'u>(node: Node<'_>, unit: &'u SourceUnit, names: &mut BTreeSet<&'u str>) {
        let target = match node.kind() {
            "assignment" | "for_statement" => node.child_by_field_name("left"),
            "named_expression" => node.child_by_field_name("name"),
            _ => None,
        };
        if let Some(target) = target {
            bind(target, unit, names);
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            collect(child, unit, names);
        }
    }

    let mut names = BTreeSet::new();
    collect(body, unit, &mut names);
    names
}

/// `a[i] = ...`, `obj.x = ...`, `del a[i]`, including inside tuple targets.
fn stores_into_object(target: Node<'_>) -> bool {
    match target.kind() {
        "subscript" | "attribute" => true,
        "pattern_list" | "tuple_pattern" | "list_pattern" | "expression_list" | "tuple" | "list"
        | "parenthesized_expression" | "list_splat_pattern" => {
            let mut cursor = target.walk();
            let nested = target.named_children(&mut cursor).any(stores_into_object);
            nested
        }
        _ => false,
    }
}

/// First construct whose effect a result cache would skip or share between calls.
fn side_effect(
    node: Node<'_>,
    parameters: &BTreeSet<&str>,
    locals: &BTreeSet<&str>,
    unit: &SourceUnit,
) -> Option<&'static str> {
    match node.kind() {
        "global_statement" | "nonlocal_statement" => {
            return Some("function rebinds `global` or `nonlocal` names");
        }
        "assignment" | "augmented_assignment" => {
            if node.child_by_field_name("left").is_some_and(stores_into_object) {
                return Some("function assigns to a subscript or attribute");
            }
        }
        "delete_statement" => {
            let mut cursor = node.walk();
            let deletes_item = node.named_children(&mut cursor).any(stores_into_object);
            if deletes_item {
                return Some("function assigns to a subscript or attribute");
            }
        }
        "call" => {
            let callee = Callee::of(node, unit);
            if callee.is_io() {
                return Some("function performs I/O");
            }
            if let Some(receiver) = callee.mutated_receiver() {
                if parameters.contains(receiver) {
                    return Some("function mutates an argument, so cached calls would share it");
                }
                if !locals.contains(receiver) {
                    return Some("function mutates state outside its own scope");
                }
            }
        }
        _ => {}
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
    children
        .into_iter()
        .find_map(|child| side_effect(child, parameters, locals, unit))
}

/// Positional arity without `flags`, per module-level regex function.
fn regex_arity(function: &str) -> Option<usize> {
    match function {
        "search" | "match" | "fullmatch" | "findall" | "finditer" => Some(2),
        "split" => Some(3),
        "sub" | "subn" => Some(4),
        "compile" => Some(1),
        _ => None,
    }
}

fn is_plain_string_literal(node: Node<'_>, unit: &SourceUnit) -> bool {
    if node.kind() != "string" {
        return false;
    }
    let mut cursor = node.walk();
    if node.children(&mut cursor).any(|c| c.kind() == "interpolation") {
        return false;
    }
    let prefix: String = unit
        .text(node)
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    !prefix.to_ascii_lowercase().contains('f')
}

/// Hoist `re.compile(<literal>)` above the loop and call the compiled pattern inside it.
fn precompile_regex(
    anchor: Node<'_>,
    call: Node<'_>,
    unit: &SourceUnit,
    context: &mut TemplateContext,
) -> Shape<Edit> {
    if !matches!(anchor.kind(), "for_statement" | "while_statement") {
        return Err("regex call sits in a comprehension");
    }
    let Callee::Method {
        object: Some("re"),
        method: function,
    } = Callee::of(call, unit)
    else {
        return Err("call is not a module-level `re` function");
    };
    let arity = regex_arity(function).ok_or("unsupported `re` function")?;
    let arguments = call.child_by_field_name("arguments").ok_or("call has no arguments")?;
    if arguments.kind() != "argument_list" {
        return Err("call has no argument list");
    }

    let mut cursor = arguments.walk();
    let args: Vec<Node<'_>> = arguments
        .named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect();
    let positional = args
        .iter()
        .take_while(|a| !matches!(a.kind(), "keyword_argument" | "list_splat" | "dictionary_splat"))
        .count();
    let literal = match args.first() {
        Some(first) if positional > 0 && is_plain_string_literal(*first, unit) => *first,
        _ => return Err("pattern is not a string literal"),
    };
    if positional > arity {
        return Err("call passes flags positionally");
    }
    let passes_flags = args.iter().any(|a| {
        a.kind() == "keyword_argument"
            && a.child_by_field_name("name")
                .is_some_and(|n| unit.text(n) == "flags")
    });
    if passes_flags || args.iter().any(|a| matches!(a.kind(), "list_splat" | "dictionary_splat")) {
        return Err("call passes flags");
    }

    let name = context.fresh_pattern_name(unit.source());
    let replacement = if function == "compile" {
        name.clone()
    } else {
        let rest: Vec<&str> = args[1..].iter().map(|a| unit.text(*a)).collect();
        format!("{name}.{function}({})", rest.join(", "))
    };

    let source = unit.source();
    let line_start = anchor.start_byte() - anchor.start_position().column;
    let line_end = source[anchor.end_byte()..]
        .find('\n')
        .map_or(source.len(), |offset| anchor.end_byte() + offset);
    let mut block = String::with_capacity(line_end - line_start);
    block.push_str(&source[line_start..call.start_byte()]);
    block.push_str(&replacement);
    block.push_str(&source[call.end_byte()..line_end]);

    let indent = unit.indentation_of(anchor).to_string();
    let mut lines = vec![format!("{indent}{name} = re.compile({})", unit.text(literal))];
    lines.extend(block.lines().map(|line| line.trim_end_matches('\r').to_string()));
    Ok(Edit {
        span: LineSpan::of(anchor),
        lines,
        indent,
        imports: &[],
        rationale: "the pattern is compiled once instead of looked up on every iteration",
    })
}
