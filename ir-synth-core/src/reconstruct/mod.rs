//! Structural reconstruction of nested source from a flat statement list
//!
//! The provider's schema is flat, the target language is not. All nesting
//! inference lives behind `SourceAssembler` so a different strategy (for
//! example a natively nested schema) can replace it without touching repair
//! or validation.

pub mod imports;

use crate::errors::AssemblyError;
use crate::ir::{Signature, Statement, StatementKind};
use crate::syntax::{INDENT, SyntaxTree, line_indent};
use regex_utils::python;
use tracing::{debug, warn};

/// Turns a signature and statement list into candidate source
pub trait SourceAssembler: Send + Sync {
    fn assemble(
        &self,
        signature: &Signature,
        statements: &[Statement],
    ) -> Result<Assembly, AssemblyError>;
}

/// Reconstructed text plus the soft warnings raised on the way
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    pub source: String,
    pub warnings: Vec<String>,
}

/// Indent-level stack seeded with the base level
#[derive(Debug)]
struct IndentStack {
    levels: Vec<usize>,
}

impl IndentStack {
    fn new(base: usize) -> Self {
        Self { levels: vec![base] }
    }

    fn base(&self) -> usize {
        self.levels[0]
    }

    fn depth(&self) -> usize {
        *self.levels.last().unwrap_or(&self.levels[0])
    }

    fn push(&mut self) {
        let next = self.depth() + 1;
        self.levels.push(next);
    }

    /// Pops one level; never below the base. Returns false when nothing was open.
    fn pop(&mut self) -> bool {
        if self.levels.len() > 1 {
            self.levels.pop();
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.levels.truncate(1);
    }
}

/// Infers block nesting from statement kinds and block terminators
#[derive(Debug, Default, Clone)]
pub struct IndentReconstructor;

impl IndentReconstructor {
    pub fn new() -> Self {
        Self
    }

    /// Emit `statements` as body lines starting at `base_indent` levels
    pub fn reconstruct(
        &self,
        statements: &[Statement],
        base_indent: usize,
    ) -> Result<Assembly, AssemblyError> {
        let mut stack = IndentStack::new(base_indent);
        let mut lines: Vec<String> = Vec::new();
        let mut warnings = Vec::new();
        let mut previous: Option<&Statement> = None;

        for (index, stmt) in statements.iter().enumerate() {
            if stmt.code.trim().is_empty() {
                return Err(AssemblyError::MissingCode { index });
            }

            if previous.is_some_and(Statement::opens_block) {
                stack.push();
            }

            // elif/else re-align with their `if`, whether or not the level was just pushed
            if stmt.kind.is_branch_continuation() && !stack.pop() {
                let message =
                    format!("statement {}: `{}` has no open block to close", index, stmt.kind);
                warn!("{}", message);
                warnings.push(message);
            }

            // A second consecutive return inside a block is the function's fallback
            let after_return = previous.is_some_and(|p| p.kind == StatementKind::Return);
            if stmt.kind == StatementKind::Return && after_return && stack.depth() > stack.base() {
                debug!("statement {}: consecutive return, dedenting to base level", index);
                stack.reset();
            }

            if let StatementKind::Other(kind) = &stmt.kind {
                let message =
                    format!("statement {}: unknown kind `{}`, keeping current indent", index, kind);
                warn!("{}", message);
                warnings.push(message);
            }

            let prefix = INDENT.repeat(stack.depth());

            if let Some(rationale) = &stmt.rationale {
                for line in rationale.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    let text = line.trim_start_matches('#').trim_start();
                    lines.push(format!("{}# {}", prefix, text));
                }
            }

            for line in code_lines(stmt) {
                if line.is_empty() {
                    lines.push(String::new());
                } else {
                    lines.push(format!("{}{}", prefix, line));
                }
            }

            previous = Some(stmt);
        }

        stack.reset();
        debug_assert_eq!(stack.depth(), base_indent);

        Ok(Assembly { source: lines.join("\n"), warnings })
    }
}

impl SourceAssembler for IndentReconstructor {
    fn assemble(
        &self,
        signature: &Signature,
        statements: &[Statement],
    ) -> Result<Assembly, AssemblyError> {
        if statements.is_empty() {
            return Err(AssemblyError::EmptyBody);
        }

        let body = self.reconstruct(statements, 1)?;
        let mut lines = imports::missing_imports(signature, statements);
        if !lines.is_empty() {
            lines.push(String::new());
        }

        lines.push(signature.render_header());
        if let Some(doc) = signature.docstring.as_deref().filter(|d| !d.trim().is_empty()) {
            lines.extend(render_docstring(doc));
        }
        lines.push(body.source);

        let mut source = lines.join("\n");
        source.push('\n');

        let tree = SyntaxTree::parse(source.as_str()).ok_or(AssemblyError::Untokenizable)?;
        if let Some(line) = tree.first_error_line() {
            let snippet = source.lines().nth(line - 1).unwrap_or("").trim().to_string();
            return Err(AssemblyError::Unparseable { line, snippet });
        }

        Ok(Assembly { source, warnings: body.warnings })
    }
}

/// Code lines of one statement, dedented to a common margin, with the
/// return keyword and comment marker normalized
fn code_lines(stmt: &Statement) -> Vec<String> {
    let raw: Vec<&str> = stmt.code.trim_end().lines().collect();
    let margin = raw
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| line_indent(l).len())
        .min()
        .unwrap_or(0);

    let mut lines: Vec<String> = raw
        .iter()
        .map(|l| {
            if l.trim().is_empty() {
                String::new()
            } else {
                l.get(margin..).unwrap_or_else(|| l.trim_start()).to_string()
            }
        })
        .skip_while(|l| l.is_empty())
        .collect();

    let Some(first) = lines.first_mut() else {
        return lines;
    };

    match stmt.kind {
        StatementKind::Return if !python::starts_with_return(first) => {
            *first = format!("return {}", first);
        }
        StatementKind::Comment => {
            for line in lines.iter_mut().filter(|l| !l.is_empty()) {
                if !line.starts_with('#') {
                    *line = format!("# {}", line);
                }
            }
        }
        _ => {}
    }

    lines
}

fn render_docstring(doc: &str) -> Vec<String> {
    let escaped = doc.trim().replace("\"\"\"", "\\\"\\\"\\\"");
    let mut doc_lines = escaped.lines();
    let first = doc_lines.next().unwrap_or("");
    let rest: Vec<&str> = doc_lines.collect();

    if rest.is_empty() {
        return vec![format!("{}\"\"\"{}\"\"\"", INDENT, first)];
    }

    let mut lines = vec![format!("{}\"\"\"{}", INDENT, first)];
    for line in rest {
        let trimmed = line.trim();
        lines.push(if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}{}", INDENT, trimmed)
        });
    }
    lines.push(format!("{}\"\"\"", INDENT));
    lines
}
