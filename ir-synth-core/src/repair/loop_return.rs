//! Moves a fallback `return` out of a loop body
//!
//! Recognizes a loop whose body ends in a constant return that shares its
//! level with an earlier conditional return:
//!
//! ```text
//! for item in items:
//!     if matches(item):
//!         return item
//!     return None      <- runs on the first iteration
//! ```
//!
//! and moves that return to the line right after the loop.

use crate::syntax::{SyntaxTree, block_statements, descendants, last_row, line_indent, replace_rows};
use tree_sitter::Node;

const LITERAL_KINDS: &[&str] =
    &["string", "concatenated_string", "integer", "float", "true", "false", "none"];

pub fn transform(tree: &SyntaxTree, function_name: &str) -> Option<SyntaxTree> {
    let function = tree.resolve_function(function_name)?;
    let budget = descendants(function).iter().filter(|n| is_loop(n)).count();
    if budget == 0 {
        return None;
    }

    let mut current: Option<SyntaxTree> = None;
    for _ in 0..budget {
        let working = current.as_ref().unwrap_or(tree);
        let Some(next) = relocate_first(working, function_name) else {
            break;
        };
        current = Some(next);
    }
    current
}

fn relocate_first(tree: &SyntaxTree, function_name: &str) -> Option<SyntaxTree> {
    let function = tree.resolve_function(function_name)?;
    let (loop_node, fallback) = descendants(function)
        .into_iter()
        .filter(is_loop)
        .find_map(|node| misplaced_return(node).map(|ret| (node, ret)))?;

    let lines: Vec<&str> = tree.source().split('\n').collect();
    let loop_indent = line_indent(lines.get(loop_node.start_position().row)?);

    let start = fallback.start_position().row;
    let end = last_row(fallback);
    let return_indent = line_indent(lines.get(start)?);

    // The return must own its lines; `if x: return 1; return 0` style is left alone
    if fallback.start_position().column != return_indent.len() {
        return None;
    }

    let moved: Vec<String> = lines[start..=end]
        .iter()
        .map(|line| {
            let body = line.strip_prefix(return_indent).unwrap_or(line.trim_start());
            format!("{}{}", loop_indent, body)
        })
        .collect();

    SyntaxTree::parse(replace_rows(tree.source(), start, end, &moved))
}

fn is_loop(node: &Node<'_>) -> bool {
    matches!(node.kind(), "for_statement" | "while_statement")
}

/// The trailing constant return of `loop_node`'s body, if it sits after a conditional return
fn misplaced_return(loop_node: Node<'_>) -> Option<Node<'_>> {
    if loop_node.child_by_field_name("alternative").is_some() {
        return None;
    }

    let body = loop_node.child_by_field_name("body")?;
    let statements = block_statements(body);
    let (last, earlier) = statements.split_last()?;

    if last.kind() != "return_statement" || !returns_constant(*last) {
        return None;
    }

    earlier
        .iter()
        .any(|stmt| stmt.kind() == "if_statement" && contains_return(*stmt))
        .then_some(*last)
}

fn returns_constant(ret: Node<'_>) -> bool {
    let mut cursor = ret.walk();
    let value = ret.named_children(&mut cursor).next();
    match value {
        None => true,
        Some(v) if LITERAL_KINDS.contains(&v.kind()) => true,
        Some(v) if v.kind() == "unary_operator" => {
            let mut inner = v.walk();
            v.named_children(&mut inner).all(|n| matches!(n.kind(), "integer" | "float"))
        }
        Some(_) => false,
    }
}

fn contains_return(node: Node<'_>) -> bool {
    descendants(node).iter().any(|n| n.kind() == "return_statement")
}
