//! Module-level `import` bookkeeping for rewritten sources.

use crate::core::SourceUnit;
use std::collections::BTreeSet;

/// Whether a top-level `import <module>` (without alias) is present.
pub fn has_import(unit: &SourceUnit, module: &str) -> bool {
    let root = unit.root();
    let mut cursor = root.walk();
    let found = root
        .named_children(&mut cursor)
        .filter(|statement| statement.kind() == "import_statement")
        .any(|statement| {
            let mut names = statement.walk();
            let imports_module = statement
                .children_by_field_name("name", &mut names)
                .any(|name| name.kind() == "dotted_name" && unit.text(name) == module);
            imports_module
        });
    found
}

/// Line index (0-based) where new imports go: after leading comments, the
/// module docstring, and `from __future__` imports.
pub fn insertion_index(unit: &SourceUnit) -> usize {
    let root = unit.root();
    let mut cursor = root.walk();
    let mut after = 0;
    let mut seen_statement = false;
    for node in root.named_children(&mut cursor) {
        let skippable = match node.kind() {
            "comment" => !seen_statement,
            "future_import_statement" => true,
            "expression_statement" if !seen_statement => is_docstring(node),
            _ => false,
        };
        if !skippable {
            break;
        }
        if node.kind() != "comment" {
            seen_statement = true;
        }
        after = node.end_position().row + 1;
    }
    after
}

fn is_docstring(statement: tree_sitter::Node<'_>) -> bool {
    statement.named_child_count() == 1
        && statement
            .named_child(0)
            .is_some_and(|child| child.kind() == "string")
}

/// Insert `import <module>` lines the text does not have yet.
///
/// Returns the new text, or `None` when nothing had to be added.
pub fn ensure_imports(unit: &SourceUnit, required: &BTreeSet<&'static str>) -> Option<String> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|line| {
            let module = line.trim_start_matches("import ").trim();
            !has_import(unit, module)
        })
        .collect();
    if missing.is_empty() {
        return None;
    }

    let mut lines: Vec<&str> = unit.source().lines().collect();
    let at = insertion_index(unit).min(lines.len());
    for (offset, line) in missing.iter().enumerate() {
        lines.insert(at + offset, line);
    }
    let trailing_newline = unit.source().ends_with('\n') || unit.source().is_empty();
    Some(join_lines(&lines, trailing_newline, unit.line_ending()))
}

/// Rejoin lines split with `str::lines`, restoring the file's terminator.
pub(crate) fn join_lines<S: AsRef<str>>(lines: &[S], trailing_newline: bool, newline: &str) -> String {
    let mut text = lines
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join(newline);
    if trailing_newline && !text.is_empty() {
        text.push_str(newline);
    }
    text
}
