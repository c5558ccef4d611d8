//! Test-case synthesis from free-text assertions
//!
//! Every phrasing is an independent `AssertionMatcher`. An assertion no
//! matcher recognizes contributes nothing; it is never an error.

use super::values::{Category, default_for_hint, keyword_input, normalize_literal};
use crate::ir::{Assertion, FunctionIr, Signature};
use regex_utils::assertion::{CONDITION_KEYWORD, RETURNS_FOR, RETURNS_IF};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One executable case: Python literal inputs and the expected literal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub label: String,
    pub inputs: Vec<String>,
    pub expected: String,
}

pub trait AssertionMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    fn cases(&self, assertion: &Assertion, signature: &Signature) -> Vec<TestCase>;
}

/// Build the argument list: `primary` for the first parameter, neutral defaults for the rest
pub fn arguments(signature: &Signature, primary: &str) -> Option<Vec<String>> {
    let (_, extra) = signature.parameters.split_first()?;
    let mut inputs = vec![primary.to_string()];
    inputs.extend(extra.iter().map(|p| default_for_hint(p.type_hint.as_deref()).to_string()));
    Some(inputs)
}

fn category_cases(signature: &Signature, category: Category, expected: &str) -> Vec<TestCase> {
    category
        .samples()
        .iter()
        .filter_map(|sample| {
            Some(TestCase {
                label: format!("{} input {}", category.label(), sample),
                inputs: arguments(signature, sample)?,
                expected: expected.to_string(),
            })
        })
        .collect()
}

/// "Returns V for C inputs"
#[derive(Debug, Default)]
pub struct ReturnsForCategory;

impl ReturnsForCategory {
    /// Category and expected literal named by the assertion
    pub fn parse(text: &str) -> Option<(Category, String)> {
        let caps = RETURNS_FOR.captures(text)?;
        let category = Category::from_phrase(&caps["category"])?;
        let expected = normalize_literal(&caps["value"])?;
        Some((category, expected))
    }
}

impl AssertionMatcher for ReturnsForCategory {
    fn name(&self) -> &'static str {
        "returns-for-category"
    }

    fn cases(&self, assertion: &Assertion, signature: &Signature) -> Vec<TestCase> {
        match Self::parse(&assertion.text) {
            Some((category, expected)) => category_cases(signature, category, &expected),
            None => Vec::new(),
        }
    }
}

/// "Returns V if K" / "Returns V when K"
#[derive(Debug, Default)]
pub struct ReturnsIfKeyword;

/// A condition the input must satisfy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Keyword(String),
    Category(Category),
}

impl ReturnsIfKeyword {
    pub fn parse(text: &str) -> Option<(Condition, String)> {
        let caps = RETURNS_IF.captures(text)?;
        let condition = &caps["condition"];
        let expected = normalize_literal(&caps["value"])?;

        let keyword = CONDITION_KEYWORD
            .find_iter(condition)
            .find(|m| !is_negated(&condition[..m.start()]))
            .map(|m| Condition::Keyword(m.as_str().to_ascii_lowercase()));

        // "if the value is an integer"
        let condition = keyword.or_else(|| {
            let negated = condition.to_ascii_lowercase().contains("not ");
            (!negated).then(|| Category::from_phrase(condition)).flatten().map(Condition::Category)
        })?;
        Some((condition, expected))
    }
}

fn is_negated(prefix: &str) -> bool {
    let prefix = prefix.to_ascii_lowercase();
    prefix.ends_with("non-") || prefix.ends_with("non ") || prefix.ends_with("not ")
}

impl AssertionMatcher for ReturnsIfKeyword {
    fn name(&self) -> &'static str {
        "returns-if-keyword"
    }

    fn cases(&self, assertion: &Assertion, signature: &Signature) -> Vec<TestCase> {
        let Some((condition, expected)) = Self::parse(&assertion.text) else {
            return Vec::new();
        };

        match condition {
            Condition::Keyword(keyword) => {
                let hint = signature.parameters.first().and_then(|p| p.type_hint.as_deref());
                let case = keyword_input(&keyword, hint).and_then(|input| {
                    Some(TestCase {
                        label: format!("{} input", keyword),
                        inputs: arguments(signature, &input)?,
                        expected: expected.clone(),
                    })
                });
                case.into_iter().collect()
            }
            Condition::Category(category) => category_cases(signature, category, &expected),
        }
    }
}

/// Runs every matcher over every assertion
pub struct OracleCompiler {
    matchers: Vec<Box<dyn AssertionMatcher>>,
}

impl Default for OracleCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl OracleCompiler {
    pub fn new() -> Self {
        Self { matchers: vec![Box::new(ReturnsForCategory), Box::new(ReturnsIfKeyword)] }
    }

    /// Add a phrasing; existing matchers are untouched
    pub fn with_matcher(mut self, matcher: Box<dyn AssertionMatcher>) -> Self {
        self.matchers.push(matcher);
        self
    }

    pub fn compile(&self, ir: &FunctionIr) -> Vec<TestCase> {
        let mut cases = Vec::new();
        for assertion in &ir.assertions {
            for matcher in &self.matchers {
                cases.extend(matcher.cases(assertion, &ir.signature));
            }
        }
        dedup_inputs(cases)
    }
}

/// Keep the first case for each distinct input tuple
pub fn dedup_inputs(cases: Vec<TestCase>) -> Vec<TestCase> {
    let mut seen = HashSet::new();
    cases.into_iter().filter(|case| seen.insert(case.inputs.clone())).collect()
}
