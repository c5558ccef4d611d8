//! Prompt rendering for the statement provider

use crate::ir::FunctionIr;

const STATEMENT_RULES: &str = "\
Answer with a JSON object {\"statements\": [...]}; each statement has `kind`, `code` and an \
optional `rationale`.
- kind is one of: assignment, return, if, elif, else, for, while, call, expression, comment.
- One statement per line of code. Do not indent; nesting is inferred.
- Block headers (if, elif, else, for, while) end with ':'.
- Return statements start with `return`.
- Do not repeat the signature line.";

pub struct PromptBuilder<'a> {
    ir: &'a FunctionIr,
    feedback: Option<&'a str>,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(ir: &'a FunctionIr) -> Self {
        Self { ir, feedback: None }
    }

    pub fn with_feedback(mut self, feedback: Option<&'a str>) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn build(&self) -> String {
        let signature = &self.ir.signature;
        let mut sections = Vec::new();

        sections.push(format!(
            "Write the body of the Python function `{}`.\n\n{}",
            signature.name,
            signature.render_header()
        ));

        if !self.ir.intent.trim().is_empty() {
            sections.push(format!("Intent: {}", self.ir.intent.trim()));
        }
        if let Some(doc) = signature.docstring.as_deref().filter(|d| !d.trim().is_empty()) {
            sections.push(format!("Docstring: {}", doc.trim()));
        }

        if !self.ir.assertions.is_empty() {
            let behaviors: Vec<String> =
                self.ir.assertions.iter().map(|a| format!("- {}", a.text)).collect();
            sections.push(format!("Required behavior:\n{}", behaviors.join("\n")));
        }

        sections.push(STATEMENT_RULES.to_string());

        if let Some(feedback) = self.feedback {
            sections.push(format!("Feedback from the previous attempt:\n{}", feedback));
        }

        sections.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Parameter, Signature};

    fn sample_ir() -> FunctionIr {
        FunctionIr::new(
            Signature::new("clamp")
                .with_parameter(Parameter::new("x", Some("int")))
                .with_return_type("int"),
        )
        .with_intent("Clamp a value into 0..=10")
        .with_assertions(["Returns 0 if negative"])
    }

    #[test]
    fn test_first_attempt_prompt() {
        let ir = sample_ir();
        let prompt = PromptBuilder::new(&ir).build();
        assert!(prompt.contains("def clamp(x: int) -> int:"));
        assert!(prompt.contains("Intent: Clamp a value into 0..=10"));
        assert!(prompt.contains("- Returns 0 if negative"));
        assert!(!prompt.contains("Feedback"));
    }

    #[test]
    fn test_feedback_is_appended_last() {
        let ir = sample_ir();
        let prompt = PromptBuilder::new(&ir).with_feedback(Some("Attempt 1 failed")).build();
        assert!(prompt.ends_with("Feedback from the previous attempt:\nAttempt 1 failed"));
    }
}
