//! Shared IR and statement model
//!
//! The IR captures a function's signature and behavioral assertions; the
//! statement records are what the structured-generation provider returns.
//! Nesting is never encoded in a statement, only inferred later.

pub mod schema;

use crate::errors::{Result, SynthesisError};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use schema::statement_list_schema;

/// Kind tag of a flat statement record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatementKind {
    Assignment,
    Return,
    If,
    Elif,
    Else,
    For,
    While,
    Call,
    Expression,
    Comment,
    /// Anything the schema did not anticipate; kept so reconstruction can warn
    Other(String),
}

impl StatementKind {
    /// Kinds whose code may open an indented block
    pub fn is_block_opener(&self) -> bool {
        matches!(self, Self::If | Self::Elif | Self::Else | Self::For | Self::While)
    }

    /// Kinds that continue an `if` chain at the header's level
    pub fn is_branch_continuation(&self) -> bool {
        matches!(self, Self::Elif | Self::Else)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Assignment => "assignment",
            Self::Return => "return",
            Self::If => "if",
            Self::Elif => "elif",
            Self::Else => "else",
            Self::For => "for",
            Self::While => "while",
            Self::Call => "call",
            Self::Expression => "expression",
            Self::Comment => "comment",
            Self::Other(kind) => kind,
        }
    }
}

impl From<String> for StatementKind {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "assignment" => Self::Assignment,
            "return" => Self::Return,
            "if" => Self::If,
            "elif" => Self::Elif,
            "else" => Self::Else,
            "for" => Self::For,
            "while" => Self::While,
            "call" => Self::Call,
            "expression" => Self::Expression,
            "comment" => Self::Comment,
            _ => Self::Other(value),
        }
    }
}

impl From<StatementKind> for String {
    fn from(kind: StatementKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One flat, schema-constrained unit of generated code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    #[serde(default)]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl Statement {
    pub fn new(kind: StatementKind, code: impl Into<String>) -> Self {
        Self { kind, code: code.into(), rationale: None }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    /// True when the code ends with the block terminator
    pub fn opens_block(&self) -> bool {
        self.kind.is_block_opener() && self.code.trim_end().ends_with(':')
    }
}

/// Function parameter with an optional type hint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_hint: Option<&str>) -> Self {
        Self { name: name.into(), type_hint: type_hint.map(str::to_string) }
    }

    fn render(&self) -> String {
        match &self.type_hint {
            Some(hint) => format!("{}: {}", self.name, hint),
            None => self.name.clone(),
        }
    }
}

/// Function signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
}

impl Signature {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), parameters: Vec::new(), return_type: None, docstring: None }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    pub fn with_docstring(mut self, docstring: impl Into<String>) -> Self {
        self.docstring = Some(docstring.into());
        self
    }

    /// `def name(a: T, b) -> R:`
    pub fn render_header(&self) -> String {
        let params = self.parameters.iter().map(Parameter::render).collect::<Vec<_>>().join(", ");
        match &self.return_type {
            Some(ret) => format!("def {}({}) -> {}:", self.name, params, ret),
            None => format!("def {}({}):", self.name, params),
        }
    }

    /// Every type hint in the signature, parameters first
    pub fn type_hints(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter_map(|p| p.type_hint.as_deref())
            .chain(self.return_type.as_deref())
    }
}

/// A single free-text behavioral claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assertion {
    pub text: String,
}

impl Assertion {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl From<&str> for Assertion {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Unresolved placeholder somewhere in the IR
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedHole {
    pub identifier: String,
    pub hole_kind: String,
    #[serde(default)]
    pub location: String,
}

/// Structured capture of one function's intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionIr {
    #[serde(default)]
    pub intent: String,
    pub signature: Signature,
    #[serde(default)]
    pub assertions: Vec<Assertion>,
    #[serde(default)]
    pub holes: Vec<TypedHole>,
}

impl FunctionIr {
    pub fn new(signature: Signature) -> Self {
        Self { intent: String::new(), signature, assertions: Vec::new(), holes: Vec::new() }
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = intent.into();
        self
    }

    pub fn with_assertions<I, A>(mut self, assertions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Assertion>,
    {
        self.assertions.extend(assertions.into_iter().map(Into::into));
        self
    }

    /// Holes must be empty before an episode may start
    pub fn ensure_complete(&self) -> Result<()> {
        if self.holes.is_empty() {
            return Ok(());
        }

        Err(SynthesisError::Hole {
            holes: self.holes.iter().map(|h| h.identifier.clone()).collect(),
        })
    }

    /// Intent text plus docstring, the prose the validator classifies
    pub fn description(&self) -> String {
        match &self.signature.docstring {
            Some(doc) if !self.intent.is_empty() => format!("{}\n{}", self.intent, doc),
            Some(doc) => doc.clone(),
            None => self.intent.clone(),
        }
    }
}

/// One failing synthesized case
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Human label of the synthesized case
    pub case: String,
    /// Python reprs of the arguments
    pub inputs: Vec<String>,
    /// Python repr of the expected value
    pub expected: String,
    pub actual_or_error: String,
}

impl ValidationIssue {
    /// Renders inputs as a Python argument tuple
    pub fn inputs_display(&self) -> String {
        match self.inputs.len() {
            1 => format!("({},)", self.inputs[0]),
            _ => format!("({})", self.inputs.join(", ")),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: inputs={} expected={} actual={}",
            self.case,
            self.inputs_display(),
            self.expected,
            self.actual_or_error
        )
    }
}

/// One produced candidate and everything learned about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCandidate {
    pub source_text: String,
    /// 1-based attempt that produced this candidate
    pub attempt_index: u32,
    pub temperature: f32,
    pub applied_repairs: Vec<String>,
    pub validation_issues: Vec<ValidationIssue>,
    pub warnings: Vec<String>,
}

impl GeneratedCandidate {
    pub fn new(source_text: impl Into<String>, attempt_index: u32, temperature: f32) -> Self {
        Self {
            source_text: source_text.into(),
            attempt_index,
            temperature,
            applied_repairs: Vec::new(),
            validation_issues: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Score for best-so-far tracking; lower is better
    pub fn failing_cases(&self) -> usize {
        self.validation_issues.len()
    }

    pub fn passed(&self) -> bool {
        self.validation_issues.is_empty()
    }
}
