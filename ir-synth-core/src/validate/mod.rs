//! Assertion-based validation
//!
//! Compiles free-text assertions (plus edge cases for type-dispatching
//! functions) into executable cases and checks a candidate against them.

pub mod edge_cases;
pub mod oracle;
pub mod runner;
pub mod values;

use crate::config::ValidationConfig;
use crate::ir::{FunctionIr, ValidationIssue};
use crate::syntax::SyntaxTree;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub use edge_cases::{infer_fallback, is_type_dispatching, repair_hints};
pub use oracle::{AssertionMatcher, OracleCompiler, ReturnsForCategory, ReturnsIfKeyword, TestCase};
pub use runner::{CandidateRunner, CaseOutcome, PythonRunner, python_available};

/// Case label used when the target function cannot be found
pub const FUNCTION_NOT_FOUND: &str = "function lookup";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    pub issues: Vec<ValidationIssue>,
    pub cases_run: usize,
}

impl ValidationResult {
    fn from_issues(issues: Vec<ValidationIssue>, cases_run: usize) -> Self {
        Self { passed: issues.is_empty(), issues, cases_run }
    }

    fn single(case: &str, expected: String, actual_or_error: String) -> Self {
        Self::from_issues(
            vec![ValidationIssue {
                case: case.to_string(),
                inputs: Vec::new(),
                expected,
                actual_or_error,
            }],
            0,
        )
    }
}

#[async_trait]
pub trait CandidateValidator: Send + Sync {
    async fn validate(
        &self,
        source: &str,
        function_name: &str,
        ir: &FunctionIr,
    ) -> ValidationResult;
}

/// Validates candidates against cases synthesized from the IR's assertions
pub struct AssertionValidator {
    compiler: OracleCompiler,
    runner: Arc<dyn CandidateRunner>,
    default_fallback: String,
}

impl AssertionValidator {
    pub fn new(config: &ValidationConfig) -> Self {
        let runner = PythonRunner::new(config.python.clone(), config.case_timeout());
        Self::with_runner(Arc::new(runner), config.default_fallback.clone())
    }

    pub fn with_runner(
        runner: Arc<dyn CandidateRunner>,
        default_fallback: impl Into<String>,
    ) -> Self {
        Self { compiler: OracleCompiler::new(), runner, default_fallback: default_fallback.into() }
    }

    pub fn with_compiler(mut self, compiler: OracleCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Assertion cases followed by edge cases, first occurrence of each input tuple wins
    pub fn synthesize_cases(&self, ir: &FunctionIr) -> Vec<TestCase> {
        let mut cases = self.compiler.compile(ir);
        cases.extend(edge_cases::edge_cases(ir, &self.default_fallback));
        oracle::dedup_inputs(cases)
    }
}

#[async_trait]
impl CandidateValidator for AssertionValidator {
    async fn validate(
        &self,
        source: &str,
        function_name: &str,
        ir: &FunctionIr,
    ) -> ValidationResult {
        let resolved = {
            let Some(tree) = SyntaxTree::parse(source) else {
                return ValidationResult::single(
                    "parse",
                    "parseable source".into(),
                    "no syntax tree".into(),
                );
            };
            if let Some(line) = tree.first_error_line() {
                return ValidationResult::single(
                    "parse",
                    "parseable source".into(),
                    format!("syntax error on line {}", line),
                );
            }

            match tree.resolve_function(function_name).and_then(|f| tree.function_name(f)) {
                Some(name) => name.to_string(),
                None => {
                    let defined: Vec<String> =
                        tree.functions().into_iter().map(|f| f.name).collect();
                    let found =
                        if defined.is_empty() { "none".to_string() } else { defined.join(", ") };
                    return ValidationResult::single(
                        FUNCTION_NOT_FOUND,
                        format!("function '{}'", function_name),
                        format!("not found; defined functions: {}", found),
                    );
                }
            }
        };

        if resolved != function_name {
            debug!("Resolved function '{}' as '{}'", function_name, resolved);
        }

        let cases = self.synthesize_cases(ir);
        if cases.is_empty() {
            debug!("No cases synthesized for {}; nothing to check", function_name);
            return ValidationResult::from_issues(Vec::new(), 0);
        }

        let outcomes = match self.runner.run(source, &resolved, &cases).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                warn!("Candidate execution failed: {}", e);
                return ValidationResult::single("execution", "completed run".into(), e.to_string());
            }
        };

        let issues = outcomes
            .iter()
            .filter(|o| !o.passed)
            .filter_map(|o| {
                let case = cases.get(o.index)?;
                Some(ValidationIssue {
                    case: case.label.clone(),
                    inputs: case.inputs.clone(),
                    expected: case.expected.clone(),
                    actual_or_error: o.actual.clone(),
                })
            })
            .collect();

        debug!("Validated {} against {} case(s)", resolved, cases.len());
        ValidationResult::from_issues(issues, cases.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RunnerError;
    use crate::ir::{Parameter, Signature};

    /// Answers every case from a fixed function of the inputs
    struct ScriptedRunner;

    #[async_trait]
    impl CandidateRunner for ScriptedRunner {
        async fn run(
            &self,
            _source: &str,
            _function: &str,
            cases: &[TestCase],
        ) -> Result<Vec<CaseOutcome>, RunnerError> {
            Ok(cases
                .iter()
                .enumerate()
                .map(|(index, case)| CaseOutcome {
                    index,
                    passed: case.inputs[0] != "True",
                    actual: "'bool'".to_string(),
                })
                .collect())
        }
    }

    struct BrokenRunner;

    #[async_trait]
    impl CandidateRunner for BrokenRunner {
        async fn run(
            &self,
            _: &str,
            _: &str,
            _: &[TestCase],
        ) -> Result<Vec<CaseOutcome>, RunnerError> {
            Err(RunnerError::Harness { message: "crashed".to_string() })
        }
    }

    fn type_label_ir() -> FunctionIr {
        FunctionIr::new(Signature::new("type_label").with_parameter(Parameter::new("value", None)))
            .with_assertions([
                "Returns 'int' for integer inputs",
                "Returns 'str' for string inputs",
            ])
    }

    const SOURCE: &str = "def type_label(value):\n    return type(value).__name__\n";

    #[tokio::test]
    async fn test_failing_cases_become_issues() {
        let validator = AssertionValidator::with_runner(Arc::new(ScriptedRunner), "'other'");
        let result = validator.validate(SOURCE, "type_label", &type_label_ir()).await;

        assert!(!result.passed);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].case, "boolean edge case");
        assert_eq!(result.issues[0].inputs, vec!["True"]);
        assert_eq!(result.issues[0].expected, "'other'");
        assert!(result.cases_run > 1);
    }

    #[tokio::test]
    async fn test_function_not_found_is_an_issue() {
        let validator = AssertionValidator::with_runner(Arc::new(ScriptedRunner), "'other'");
        let source = "def alpha(x):\n    return x\n\ndef beta(x):\n    return x\n";
        let result = validator.validate(source, "type_label", &type_label_ir()).await;

        assert!(!result.passed);
        assert_eq!(result.issues[0].case, FUNCTION_NOT_FOUND);
        assert!(result.issues[0].actual_or_error.contains("alpha, beta"));
    }

    #[tokio::test]
    async fn test_runner_failure_is_a_single_issue() {
        let validator = AssertionValidator::with_runner(Arc::new(BrokenRunner), "'other'");
        let result = validator.validate(SOURCE, "type_label", &type_label_ir()).await;
        assert_eq!(result.issues.len(), 1);
        assert!(result.issues[0].actual_or_error.contains("crashed"));
    }

    #[tokio::test]
    async fn test_no_cases_passes() {
        let validator = AssertionValidator::with_runner(Arc::new(BrokenRunner), "'other'");
        let ir = FunctionIr::new(Signature::new("f").with_parameter(Parameter::new("x", None)))
            .with_assertions(["Is pleasant to read"]);
        let result = validator.validate("def f(x):\n    return x\n", "f", &ir).await;
        assert!(result.passed);
        assert_eq!(result.cases_run, 0);
    }

    #[test]
    fn test_synthesized_cases_include_boolean_once() {
        let validator = AssertionValidator::new(&ValidationConfig::default());
        let cases = validator.synthesize_cases(&type_label_ir());
        assert_eq!(cases.iter().filter(|c| c.inputs == vec!["True".to_string()]).count(), 1);
    }
}
