//! Tree-sitter based syntax layer for Python candidates
//!
//! Every stage that needs structure (reconstruction checks, repair, function
//! resolution) goes through `SyntaxTree`, an immutable source + tree pair.
//! Rewrites are line-span edits followed by a fresh parse.

use std::cell::RefCell;
use tree_sitter::{Node, Parser, Tree};

thread_local! {
    static PYTHON_PARSER: RefCell<Parser> = RefCell::new({
        let mut p = Parser::new();
        // Ignore error here - will be caught at parse time if language fails
        let _ = p.set_language(&tree_sitter_python::LANGUAGE.into());
        p
    });
}

/// Indentation unit of emitted code
pub const INDENT: &str = "    ";

/// Immutable parse of a candidate
pub struct SyntaxTree {
    source: String,
    tree: Tree,
}

/// Top-level function summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub name: String,
    pub parameters: Vec<String>,
    /// 1-based
    pub start_line: usize,
    pub end_line: usize,
}

impl SyntaxTree {
    /// Parse Python source; `None` only when the parser produced no tree
    pub fn parse(source: impl Into<String>) -> Option<Self> {
        let source = source.into();
        let tree = PYTHON_PARSER.with(|p| p.borrow_mut().parse(&source, None))?;
        Some(Self { source, tree })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn into_source(self) -> String {
        self.source
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn has_error(&self) -> bool {
        self.root().has_error()
    }

    /// 1-based line of the first error or missing node
    pub fn first_error_line(&self) -> Option<usize> {
        if !self.has_error() {
            return None;
        }

        descendants(self.root())
            .into_iter()
            .find(|n| n.is_error() || n.is_missing())
            .map(|n| n.start_position().row + 1)
            .or(Some(1))
    }

    pub fn text(&self, node: Node<'_>) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Top-level `function_definition` nodes, decorated ones included
    pub fn function_nodes(&self) -> Vec<Node<'_>> {
        let root = self.root();
        let mut cursor = root.walk();
        root.named_children(&mut cursor)
            .filter_map(|node| match node.kind() {
                "function_definition" => Some(node),
                "decorated_definition" => node
                    .child_by_field_name("definition")
                    .filter(|def| def.kind() == "function_definition"),
                _ => None,
            })
            .collect()
    }

    pub fn functions(&self) -> Vec<FunctionInfo> {
        self.function_nodes()
            .into_iter()
            .filter_map(|node| {
                let name = self.text(node.child_by_field_name("name")?).to_string();
                Some(FunctionInfo {
                    name,
                    parameters: self.parameter_names(node),
                    start_line: node.start_position().row + 1,
                    end_line: node.end_position().row + 1,
                })
            })
            .collect()
    }

    /// Top-level function with exactly this name
    pub fn find_function(&self, name: &str) -> Option<Node<'_>> {
        self.function_nodes().into_iter().find(|node| {
            node.child_by_field_name("name").map(|n| self.text(n) == name).unwrap_or(false)
        })
    }

    /// Exact name, else the only function, else the closest substring match
    pub fn resolve_function(&self, name: &str) -> Option<Node<'_>> {
        if let Some(node) = self.find_function(name) {
            return Some(node);
        }

        let nodes = self.function_nodes();
        if nodes.len() == 1 {
            return nodes.into_iter().next();
        }

        let wanted = name.to_ascii_lowercase();
        nodes
            .into_iter()
            .filter_map(|node| {
                let found = self.text(node.child_by_field_name("name")?).to_ascii_lowercase();
                let overlap = if found.contains(&wanted) || wanted.contains(&found) {
                    found.len().min(wanted.len())
                } else {
                    0
                };
                (overlap > 0).then_some((overlap, node))
            })
            .fold(None, |best: Option<(usize, Node<'_>)>, (overlap, node)| match best {
                Some((score, _)) if score >= overlap => best,
                _ => Some((overlap, node)),
            })
            .map(|(_, node)| node)
    }

    /// Name of a function definition node
    pub fn function_name(&self, function: Node<'_>) -> Option<&str> {
        function.child_by_field_name("name").map(|n| self.text(n))
    }

    /// Plain parameter names of a function definition, in order
    pub fn parameter_names(&self, function: Node<'_>) -> Vec<String> {
        let Some(params) = function.child_by_field_name("parameters") else {
            return Vec::new();
        };

        let mut cursor = params.walk();
        params
            .named_children(&mut cursor)
            .filter_map(|param| match param.kind() {
                "identifier" => Some(self.text(param).to_string()),
                "typed_parameter" => {
                    let mut inner = param.walk();
                    let first = param.named_children(&mut inner).next();
                    first.filter(|n| n.kind() == "identifier").map(|n| self.text(n).to_string())
                }
                "default_parameter" | "typed_default_parameter" => {
                    param.child_by_field_name("name").map(|n| self.text(n).to_string())
                }
                _ => None,
            })
            .collect()
    }
}

/// Preorder walk of `node` and everything below it
pub fn descendants(node: Node<'_>) -> Vec<Node<'_>> {
    let mut nodes = Vec::new();
    let mut cursor = node.walk();

    loop {
        nodes.push(cursor.node());

        if cursor.goto_first_child() {
            continue;
        }

        loop {
            if cursor.node() == node {
                return nodes;
            }
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return nodes;
            }
        }
    }
}

/// Named statement children of a `block` node
pub fn block_statements(block: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = block.walk();
    block.named_children(&mut cursor).filter(|n| n.kind() != "comment").collect()
}

/// Leading whitespace of a line
pub fn line_indent(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Replace rows `start..=end` (0-based) with `replacement`
pub fn replace_rows(source: &str, start: usize, end: usize, replacement: &[String]) -> String {
    let lines: Vec<&str> = source.split('\n').collect();
    let end = end.min(lines.len().saturating_sub(1));

    let mut out: Vec<String> = Vec::with_capacity(lines.len() + replacement.len());
    out.extend(lines[..start].iter().map(|l| l.to_string()));
    out.extend(replacement.iter().cloned());
    out.extend(lines[end + 1..].iter().map(|l| l.to_string()));
    out.join("\n")
}

/// Last row that belongs to `node`, ignoring a trailing zero-column end
pub fn last_row(node: Node<'_>) -> usize {
    let end = node.end_position();
    if end.column == 0 && end.row > node.start_position().row { end.row - 1 } else { end.row }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
import math

def area(radius: float, *, precise=False) -> float:
    return math.pi * radius ** 2

@cache
def helper(x):
    return x
";

    #[test]
    fn test_parse_and_functions() {
        let tree = SyntaxTree::parse(SAMPLE).unwrap();
        assert!(!tree.has_error());
        assert_eq!(tree.first_error_line(), None);

        let functions = tree.functions();
        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].name, "area");
        assert_eq!(functions[0].parameters, vec!["radius", "precise"]);
        assert_eq!(functions[0].start_line, 3);
        assert_eq!(functions[1].name, "helper");
        assert!(tree.find_function("helper").is_some());
        assert!(tree.find_function("missing").is_none());
    }

    #[test]
    fn test_resolve_function() {
        let tree = SyntaxTree::parse(SAMPLE).unwrap();
        let name = |n| tree.function_name(n).unwrap().to_string();

        assert_eq!(name(tree.resolve_function("helper").unwrap()), "helper");
        assert_eq!(name(tree.resolve_function("circle_area").unwrap()), "area");
        assert!(tree.resolve_function("volume").is_none());

        let single = SyntaxTree::parse("def classify_value(v):\n    return v\n").unwrap();
        assert!(single.resolve_function("classify").is_some());
        assert!(single.resolve_function("anything").is_some());
    }

    #[test]
    fn test_error_line() {
        let tree = SyntaxTree::parse("def f(x):\n    return x\n  y = (\n").unwrap();
        assert!(tree.has_error());
        assert!(tree.first_error_line().is_some());
    }

    #[test]
    fn test_replace_rows() {
        let out = replace_rows("a\nb\nc\n", 1, 1, &["x".to_string(), "y".to_string()]);
        assert_eq!(out, "a\nx\ny\nc\n");
    }

    #[test]
    fn test_descendants_stays_inside_node() {
        let tree = SyntaxTree::parse(SAMPLE).unwrap();
        let area = tree.find_function("area").unwrap();
        let kinds: Vec<_> = descendants(area).iter().map(|n| n.kind()).collect();
        assert!(kinds.contains(&"return_statement"));
        assert!(!kinds.contains(&"decorator"));
    }
}
