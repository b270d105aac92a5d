use super::errors::{Error, Result};
use super::LineSpan;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Parser, Tree};

const DEFAULT_MODULE_PATH: &str = "<module>";

/// One parsed Python source file.
///
/// Owns both the text and the tree-sitter tree. Immutable after construction;
/// every analysis stage borrows it.
#[derive(Clone, Debug)]
pub struct SourceUnit {
    source: String,
    tree: Tree,
    path: PathBuf,
}

impl SourceUnit {
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        Self::parse_with_path(source, PathBuf::from(DEFAULT_MODULE_PATH))
    }

    /// Parse `source`, failing on the first `ERROR` or `MISSING` node.
    pub fn parse_with_path(source: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();
        let path = path.into();

        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| Error::parse(&path, 0, 0, format!("failed to load Python grammar: {e}")))?;

        let tree = parser
            .parse(&source, None)
            .ok_or_else(|| Error::parse(&path, 0, 0, "parser produced no tree"))?;

        if let Some(bad) = first_error_node(tree.root_node()) {
            let position = bad.start_position();
            let message = if bad.is_missing() {
                format!("missing `{}`", bad.kind())
            } else {
                "invalid syntax".to_string()
            };
            return Err(Error::parse(
                &path,
                position.row + 1,
                position.column + 1,
                message,
            ));
        }

        Ok(Self { source, tree, path })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of physical lines; an empty file has none.
    pub fn line_count(&self) -> usize {
        self.source.lines().count()
    }

    /// Text of a 1-based line, without its terminator.
    pub fn line(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|index| self.source.lines().nth(index))
    }

    /// `"\r\n"` when the file uses CRLF terminators, otherwise `"\n"`.
    pub fn line_ending(&self) -> &'static str {
        if self.source.contains("\r\n") {
            "\r\n"
        } else {
            "\n"
        }
    }

    pub fn text(&self, node: Node<'_>) -> &str {
        self.source.get(node.byte_range()).unwrap_or_default()
    }

    /// Leading whitespace of the line a node starts on.
    pub fn indentation_of(&self, node: Node<'_>) -> &str {
        let line = self.line(node.start_position().row + 1).unwrap_or_default();
        let trimmed = line.trim_start();
        &line[..line.len() - trimmed.len()]
    }

    /// Locate the node of `kind` covering exactly `span` bytes.
    pub fn node_at(&self, byte_range: std::ops::Range<usize>, kind: &str) -> Option<Node<'_>> {
        let mut node = self
            .root()
            .descendant_for_byte_range(byte_range.start, byte_range.end)?;
        loop {
            if node.kind() == kind && node.byte_range() == byte_range {
                return Some(node);
            }
            node = node.parent()?;
        }
    }
}

impl LineSpan {
    /// 1-based inclusive line span of a node.
    pub fn of(node: Node<'_>) -> Self {
        let start = node.start_position().row + 1;
        let end_position = node.end_position();
        let mut end = end_position.row + 1;
        if end_position.column == 0 && end > start {
            end -= 1;
        }
        Self::new(start, end)
    }
}

fn first_error_node(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error_node(child) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_ending_detection() {
        assert_eq!(SourceUnit::parse("x = 1\n").unwrap().line_ending(), "\n");
        assert_eq!(SourceUnit::parse("x = 1\r\ny = 2\r\n").unwrap().line_ending(), "\r\n");
        assert_eq!(SourceUnit::parse("").unwrap().line_ending(), "\n");
    }

    #[test]
    fn test_parse_valid_module() {
        let unit = SourceUnit::parse("x = 1\nprint(x)\n").unwrap();
        assert_eq!(unit.root().kind(), "module");
        assert_eq!(unit.line_count(), 2);
        assert_eq!(unit.line(2), Some("print(x)"));
        assert_eq!(unit.line(3), None);
    }

    #[test]
    fn test_parse_error_reports_location() {
        let err = SourceUnit::parse_with_path("def broken(:\n    pass\n", "bad.py").unwrap_err();
        match err {
            Error::Parse { file, line, .. } => {
                assert_eq!(file, PathBuf::from("bad.py"));
                assert_eq!(line, 1);
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_source_has_no_lines() {
        let unit = SourceUnit::parse("").unwrap();
        assert_eq!(unit.line_count(), 0);
    }

    #[test]
    fn test_indentation_and_node_lookup() {
        let unit = SourceUnit::parse("def f(items):\n    for x in items:\n        pass\n").unwrap();
        let source = unit.source();
        let start = source.find("for").unwrap();
        let end = source.find("pass").unwrap() + "pass".len();
        let node = unit.node_at(start..end, "for_statement").unwrap();
        assert_eq!(unit.indentation_of(node), "    ");
        assert_eq!(LineSpan::of(node), LineSpan::new(2, 3));
    }
}
