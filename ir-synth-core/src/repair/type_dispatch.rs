//! Replaces type-name introspection with an explicit `isinstance` chain
//!
//! A body that answers with `type(x).__name__` returns whatever the runtime
//! calls the type, and `True` reports itself as `'bool'` rather than falling
//! through to the declared fallback. The rewrite returns declared literals
//! only and tests `bool` before `int`.

use super::RepairHints;
use crate::syntax::{
    INDENT, SyntaxTree, block_statements, descendants, last_row, line_indent, replace_rows,
};
use tree_sitter::Node;

/// Most specific first; `bool` subclasses `int`
const BUILTIN_ORDER: &[&str] = &[
    "bool", "int", "float", "complex", "str", "bytes", "list", "tuple", "dict", "set", "frozenset",
];

const NONE_TYPE: &str = "NoneType";

const LITERAL_KINDS: &[&str] = &["string", "integer", "float", "true", "false", "none"];

/// Rewrite only when the function introspects a type name
pub fn transform(
    tree: &SyntaxTree,
    function_name: &str,
    hints: &RepairHints,
) -> Option<SyntaxTree> {
    let function = tree.resolve_function(function_name)?;
    if !introspects_type_name(tree, function) {
        return None;
    }
    rewrite(tree, function, hints)
}

/// Rewrite regardless of how the body currently dispatches
pub fn force_type_dispatch(
    tree: &SyntaxTree,
    function_name: &str,
    hints: &RepairHints,
) -> Option<SyntaxTree> {
    let function = tree.resolve_function(function_name)?;
    rewrite(tree, function, hints)
}

pub fn introspects_type_name(tree: &SyntaxTree, function: Node<'_>) -> bool {
    descendants(function).iter().any(|node| {
        node.kind() == "attribute"
            && node.child_by_field_name("attribute").is_some_and(|a| tree.text(a) == "__name__")
            && node
                .child_by_field_name("object")
                .is_some_and(|obj| is_type_call(tree, obj) || is_class_attribute(tree, obj))
    })
}

fn is_type_call(tree: &SyntaxTree, node: Node<'_>) -> bool {
    node.kind() == "call"
        && node.child_by_field_name("function").is_some_and(|f| tree.text(f) == "type")
}

fn is_class_attribute(tree: &SyntaxTree, node: Node<'_>) -> bool {
    node.kind() == "attribute"
        && node.child_by_field_name("attribute").is_some_and(|a| tree.text(a) == "__class__")
}

/// Ordered type -> literal table, first insertion wins
#[derive(Debug, Default)]
struct DispatchTable {
    entries: Vec<(String, String)>,
}

impl DispatchTable {
    fn insert(&mut self, type_name: &str, literal: &str) {
        let type_name = canonical_type(type_name);
        if !self.contains(&type_name) {
            self.entries.push((type_name, literal.to_string()));
        }
    }

    fn contains(&self, type_name: &str) -> bool {
        self.entries.iter().any(|(t, _)| t == type_name)
    }

    fn has_literal(&self, literal: &str) -> bool {
        self.entries.iter().any(|(_, l)| l == literal)
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ordered(&self, fallback: &str) -> Vec<(String, String)> {
        let mut ordered: Vec<(String, String)> = Vec::with_capacity(self.entries.len() + 1);

        if self.contains("int") && !self.contains("bool") {
            ordered.push(("bool".to_string(), fallback.to_string()));
        }
        for builtin in BUILTIN_ORDER {
            ordered.extend(self.entries.iter().filter(|(t, _)| t == builtin).cloned());
        }
        ordered.extend(
            self.entries.iter().filter(|(t, _)| !BUILTIN_ORDER.contains(&t.as_str())).cloned(),
        );
        ordered
    }

    fn render(&self, parameter: &str, fallback: &str, indent: &str) -> Vec<String> {
        let mut lines = Vec::new();
        for (i, (type_name, literal)) in self.ordered(fallback).iter().enumerate() {
            let keyword = if i == 0 { "if" } else { "elif" };
            let condition = if type_name == NONE_TYPE {
                format!("{} is None", parameter)
            } else {
                format!("isinstance({}, {})", parameter, type_name)
            };
            lines.push(format!("{}{} {}:", indent, keyword, condition));
            lines.push(format!("{}{}return {}", indent, INDENT, literal));
        }
        lines.push(format!("{}return {}", indent, fallback));
        lines
    }
}

fn canonical_type(type_name: &str) -> String {
    match type_name.trim() {
        "None" | "NoneType" | "type(None)" => NONE_TYPE.to_string(),
        other => other.to_string(),
    }
}

fn rewrite(tree: &SyntaxTree, function: Node<'_>, hints: &RepairHints) -> Option<SyntaxTree> {
    let parameter = tree.parameter_names(function).into_iter().next()?;
    let body = function.child_by_field_name("body")?;
    let statements = block_statements(body);
    let first = *statements.first()?;

    // One-line bodies (`def f(x): return ...`) share the header row
    if first.start_position().row == function.start_position().row {
        return None;
    }

    let rest = match statements.split_first() {
        Some((head, rest)) if is_docstring(*head) => rest,
        _ => &statements[..],
    };
    let replace_from = rest.first()?.start_position().row;
    let replace_to = last_row(*rest.last()?);

    let mut table = DispatchTable::default();
    for (type_name, literal) in &hints.type_literals {
        table.insert(type_name, literal);
    }
    collect_isinstance_pairs(tree, function, &parameter, &mut table);
    collect_returned_type_names(tree, function, &mut table);
    if table.is_empty() {
        return None;
    }

    let fallback = hints
        .fallback
        .clone()
        .or_else(|| trailing_literal(tree, rest, &table))
        .unwrap_or_else(|| "None".to_string());

    let lines: Vec<&str> = tree.source().split('\n').collect();
    let indent = line_indent(lines.get(first.start_position().row)?);
    let rendered = table.render(&parameter, &fallback, indent);

    SyntaxTree::parse(replace_rows(tree.source(), replace_from, replace_to, &rendered))
}

fn is_docstring(node: Node<'_>) -> bool {
    if node.kind() != "expression_statement" {
        return false;
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
    children.len() == 1 && children[0].kind() == "string"
}

fn literal_value<'t>(tree: &'t SyntaxTree, ret: Node<'_>) -> Option<&'t str> {
    let mut cursor = ret.walk();
    let value = ret.named_children(&mut cursor).next()?;
    LITERAL_KINDS.contains(&value.kind()).then(|| tree.text(value))
}

/// `if isinstance(p, T): return L` and `elif` clauses of the same shape
fn collect_isinstance_pairs(
    tree: &SyntaxTree,
    function: Node<'_>,
    parameter: &str,
    table: &mut DispatchTable,
) {
    for node in descendants(function) {
        if !matches!(node.kind(), "if_statement" | "elif_clause") {
            continue;
        }
        let Some(types) =
            node.child_by_field_name("condition").and_then(|c| condition_types(tree, c, parameter))
        else {
            continue;
        };
        let literal = node.child_by_field_name("consequence").and_then(|block| {
            block_statements(block)
                .into_iter()
                .find(|stmt| stmt.kind() == "return_statement")
                .and_then(|ret| literal_value(tree, ret))
        });
        if let Some(literal) = literal {
            for type_name in types {
                table.insert(&type_name, literal);
            }
        }
    }
}

/// Types tested by `isinstance(p, T)`, `isinstance(p, (T, U))` or `p is None`
fn condition_types(
    tree: &SyntaxTree,
    condition: Node<'_>,
    parameter: &str,
) -> Option<Vec<String>> {
    if condition.kind() == "comparison_operator" {
        let words: Vec<&str> = tree.text(condition).split_whitespace().collect();
        let is_none = words == [parameter, "is", "None"];
        return is_none.then(|| vec![NONE_TYPE.to_string()]);
    }
    if condition.kind() != "call"
        || tree.text(condition.child_by_field_name("function")?) != "isinstance"
    {
        return None;
    }

    let arguments = condition.child_by_field_name("arguments")?;
    let mut cursor = arguments.walk();
    let args: Vec<Node<'_>> = arguments.named_children(&mut cursor).collect();
    let [subject, spec] = args.as_slice() else {
        return None;
    };
    if tree.text(*subject) != parameter {
        return None;
    }

    match spec.kind() {
        "identifier" | "attribute" => Some(vec![tree.text(*spec).to_string()]),
        "tuple" => {
            let mut inner = spec.walk();
            Some(spec.named_children(&mut inner).map(|n| tree.text(n).to_string()).collect())
        }
        _ => None,
    }
}

/// `return 'int'` style returns naming a builtin type
fn collect_returned_type_names(tree: &SyntaxTree, function: Node<'_>, table: &mut DispatchTable) {
    for node in descendants(function) {
        if node.kind() != "return_statement" {
            continue;
        }
        let Some(literal) = literal_value(tree, node).filter(|l| l.starts_with(['\'', '"'])) else {
            continue;
        };
        let name = literal.trim_matches(|c| c == '\'' || c == '"');
        if BUILTIN_ORDER.contains(&name) || name == NONE_TYPE {
            table.insert(name, literal);
        }
    }
}

/// A trailing literal return that is not one of the dispatch literals
fn trailing_literal(
    tree: &SyntaxTree,
    statements: &[Node<'_>],
    table: &DispatchTable,
) -> Option<String> {
    let last = statements.last().filter(|n| n.kind() == "return_statement")?;
    literal_value(tree, *last).filter(|l| !table.has_literal(l)).map(str::to_string)
}
