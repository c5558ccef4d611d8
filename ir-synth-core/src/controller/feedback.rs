//! Feedback block injected into retry prompts

use crate::ir::{GeneratedCandidate, ValidationIssue};
use crate::validate::FUNCTION_NOT_FOUND;
use once_cell::sync::Lazy;
use regex::Regex;
use regex_utils::python::TYPE_NAME_INTROSPECTION;

pub const LITERAL_VALUE_GUIDANCE: &str =
    "Return only declared literal values, never a dynamically computed type name.";

pub const BOOL_BEFORE_INT_GUIDANCE: &str =
    "Check the boolean case before the integer case: isinstance(True, int) is True in Python.";

pub const EXCEPTION_GUIDANCE: &str =
    "Handle every input named in the cases above and return a value instead of raising.";

pub const ASSEMBLY_GUIDANCE: &str = "The previous statement list did not form valid Python. \
     Give every block header its own statement ending with ':' and keep each statement a \
     complete line.";

static UNCAUGHT_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z_]\w*(?:Error|Exception)\b|timed out|load error)")
        .expect("Invalid regex pattern")
});

/// Builtin type names a type-name-returning candidate produces
const TYPE_NAME_REPRS: &[&str] = &[
    "'bool'", "'int'", "'float'", "'complex'", "'str'", "'bytes'", "'list'", "'tuple'", "'dict'",
    "'set'", "'frozenset'", "'NoneType'",
];

/// Recognized defect classes of a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefectClass {
    DynamicTypeName,
    BoolBeforeInt,
    FunctionNotFound,
    UncaughtException,
}

pub fn classify(source: &str, issues: &[ValidationIssue]) -> Vec<DefectClass> {
    let mut classes = Vec::new();

    let computed_name = TYPE_NAME_INTROSPECTION.is_match(source)
        || issues.iter().any(|i| {
            TYPE_NAME_REPRS.contains(&i.actual_or_error.as_str())
                && !TYPE_NAME_REPRS.contains(&i.expected.as_str())
        });
    if computed_name {
        classes.push(DefectClass::DynamicTypeName);
    }
    let boolean_input = |i: &ValidationIssue| {
        matches!(i.inputs.first().map(String::as_str), Some("True" | "False"))
    };
    if issues.iter().any(boolean_input) {
        classes.push(DefectClass::BoolBeforeInt);
    }
    if issues.iter().any(|i| i.case == FUNCTION_NOT_FOUND) {
        classes.push(DefectClass::FunctionNotFound);
    }
    if issues.iter().any(|i| UNCAUGHT_ERROR.is_match(&i.actual_or_error)) {
        classes.push(DefectClass::UncaughtException);
    }
    classes
}

pub struct FeedbackBuilder<'a> {
    function_name: &'a str,
    max_cases: usize,
}

impl<'a> FeedbackBuilder<'a> {
    pub fn new(function_name: &'a str, max_cases: usize) -> Self {
        Self { function_name, max_cases }
    }

    fn guidance(&self, class: DefectClass) -> String {
        match class {
            DefectClass::DynamicTypeName => LITERAL_VALUE_GUIDANCE.to_string(),
            DefectClass::BoolBeforeInt => BOOL_BEFORE_INT_GUIDANCE.to_string(),
            DefectClass::FunctionNotFound => {
                format!("Define the function with the exact name `{}`.", self.function_name)
            }
            DefectClass::UncaughtException => EXCEPTION_GUIDANCE.to_string(),
        }
    }

    /// Feedback after a candidate failed validation
    pub fn for_candidate(&self, candidate: &GeneratedCandidate) -> String {
        let issues = &candidate.validation_issues;
        let mut lines = vec![format!(
            "Attempt {} of `{}` failed {} case(s):",
            candidate.attempt_index,
            self.function_name,
            issues.len()
        )];

        for issue in issues.iter().take(self.max_cases) {
            lines.push(format!(
                "- inputs={} expected={} actual={}",
                issue.inputs_display(),
                issue.expected,
                issue.actual_or_error
            ));
        }
        if issues.len() > self.max_cases {
            lines.push(format!("- ... and {} more", issues.len() - self.max_cases));
        }

        let guidance: Vec<String> = classify(&candidate.source_text, issues)
            .into_iter()
            .map(|class| self.guidance(class))
            .collect();
        if !guidance.is_empty() {
            lines.push("Guidance:".to_string());
            lines.extend(guidance.into_iter().map(|g| format!("- {}", g)));
        }

        lines.join("\n")
    }

    /// Feedback after the statement list could not be assembled
    pub fn for_assembly_failure(&self, attempt_index: u32, error: &str) -> String {
        format!(
            "Attempt {} of `{}` could not be assembled: {}\nGuidance:\n- {}",
            attempt_index, self.function_name, error, ASSEMBLY_GUIDANCE
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(case: &str, input: &str, expected: &str, actual: &str) -> ValidationIssue {
        ValidationIssue {
            case: case.to_string(),
            inputs: vec![input.to_string()],
            expected: expected.to_string(),
            actual_or_error: actual.to_string(),
        }
    }

    #[test]
    fn test_type_name_defect_guidance() {
        let mut candidate =
            GeneratedCandidate::new("def f(x):\n    return type(x).__name__\n", 1, 0.3);
        candidate.validation_issues.push(issue("boolean edge case", "True", "'other'", "'bool'"));

        let text = FeedbackBuilder::new("f", 8).for_candidate(&candidate);
        assert!(text.contains("inputs=(True,) expected='other' actual='bool'"));
        assert!(text.contains(LITERAL_VALUE_GUIDANCE));
        assert!(text.contains(BOOL_BEFORE_INT_GUIDANCE));
        assert!(!text.contains(EXCEPTION_GUIDANCE));
    }

    #[test]
    fn test_case_list_is_truncated() {
        let mut candidate = GeneratedCandidate::new("def f(x):\n    return x\n", 2, 0.45);
        for n in 0..5 {
            candidate.validation_issues.push(issue("integer input", &n.to_string(), "0", "1"));
        }
        let text = FeedbackBuilder::new("f", 2).for_candidate(&candidate);
        assert!(text.starts_with("Attempt 2 of `f` failed 5 case(s):"));
        assert!(text.contains("... and 3 more"));
        assert!(!text.contains("Guidance:"));
    }

    #[test]
    fn test_exception_and_lookup_classes() {
        let issues = vec![
            issue("zero input", "0", "0", "ZeroDivisionError: division by zero"),
            ValidationIssue {
                case: FUNCTION_NOT_FOUND.to_string(),
                inputs: Vec::new(),
                expected: "function 'f'".to_string(),
                actual_or_error: "not found".to_string(),
            },
        ];
        let classes = classify("", &issues);
        assert_eq!(classes, vec![DefectClass::FunctionNotFound, DefectClass::UncaughtException]);
        assert_eq!(
            FeedbackBuilder::new("label_value", 8).guidance(DefectClass::FunctionNotFound),
            "Define the function with the exact name `label_value`."
        );
    }

    #[test]
    fn test_assembly_failure_feedback() {
        let text = FeedbackBuilder::new("f", 8).for_assembly_failure(3, "statement 2 has no code");
        assert!(text.contains("statement 2 has no code"));
        assert!(text.contains(ASSEMBLY_GUIDANCE));
    }
}
