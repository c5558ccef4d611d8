//! Edge cases for type-dispatching functions
//!
//! A function that classifies its input by runtime type gets extra cases for
//! the categories no assertion covers, each expecting the fallback. The
//! boolean case is the one that catches `bool` slipping into an `int` branch.

use super::oracle::{Condition, ReturnsForCategory, ReturnsIfKeyword, TestCase, arguments};
use super::values::{Category, normalize_literal, python_str_repr};
use crate::ir::FunctionIr;
use crate::repair::RepairHints;
use regex_utils::assertion::{TYPE_CHECK_VOCABULARY, is_fallback_phrase, quoted_literals};
use std::collections::BTreeSet;

/// Categories named by the assertions, either as a "for C inputs" phrase or as a quoted type name
fn named_categories(ir: &FunctionIr) -> BTreeSet<Category> {
    let mut categories = BTreeSet::new();
    for assertion in &ir.assertions {
        if let Some((category, _)) = ReturnsForCategory::parse(&assertion.text) {
            categories.insert(category);
        }
        let literals = quoted_literals(&assertion.text);
        categories.extend(literals.iter().filter_map(|l| type_literal_category(l)));
    }
    categories
}

/// `'int'`, `'str'`, ... but not free words like `'text'`
fn type_literal_category(literal: &str) -> Option<Category> {
    let literal = literal.trim();
    [
        Category::Integer,
        Category::Boolean,
        Category::String,
        Category::List,
        Category::Float,
        Category::Mapping,
        Category::Null,
        Category::Tuple,
        Category::Set,
        Category::Bytes,
    ]
    .into_iter()
    .find(|c| c.type_name() == literal)
}

/// Categories an assertion already exercises with its own expected value
fn covered_categories(ir: &FunctionIr) -> BTreeSet<Category> {
    let mut covered = BTreeSet::new();
    for assertion in &ir.assertions {
        if let Some((category, _)) = ReturnsForCategory::parse(&assertion.text) {
            covered.insert(category);
        }
        if let Some((Condition::Category(category), _)) = ReturnsIfKeyword::parse(&assertion.text) {
            covered.insert(category);
        }
    }
    covered
}

/// Intent mentions type checking, or the assertions name at least two types
pub fn is_type_dispatching(ir: &FunctionIr) -> bool {
    TYPE_CHECK_VOCABULARY.is_match(&ir.description()) || named_categories(ir).len() >= 2
}

/// Literal of the assertion phrased as a fallback, else `default`
pub fn infer_fallback(ir: &FunctionIr, default: &str) -> String {
    ir.assertions
        .iter()
        .filter(|a| is_fallback_phrase(&a.text))
        .find_map(|a| fallback_literal(&a.text))
        .unwrap_or_else(|| default.to_string())
}

fn fallback_literal(text: &str) -> Option<String> {
    if let Some(literal) = quoted_literals(text).last() {
        return Some(python_str_repr(literal));
    }

    // "Returns None otherwise"
    let lower = text.to_ascii_lowercase();
    let start = lower
        .find("returns ")
        .map(|i| i + "returns ".len())
        .or_else(|| lower.find("return ").map(|i| i + "return ".len()))?;
    text[start..].split_whitespace().next().and_then(normalize_literal)
}

/// Fallback-expecting cases for uncovered edge categories
pub fn edge_cases(ir: &FunctionIr, default_fallback: &str) -> Vec<TestCase> {
    if !is_type_dispatching(ir) {
        return Vec::new();
    }

    let covered = covered_categories(ir);
    let fallback = infer_fallback(ir, default_fallback);

    Category::EDGE
        .iter()
        .filter(|category| !covered.contains(category))
        .filter_map(|category| {
            let sample = category.samples().first()?;
            Some(TestCase {
                label: format!("{} edge case", category.label()),
                inputs: arguments(&ir.signature, sample)?,
                expected: fallback.clone(),
            })
        })
        .collect()
}

/// Type -> literal pairs and fallback for the type-dispatch rewrite
pub fn repair_hints(ir: &FunctionIr, default_fallback: &str) -> RepairHints {
    let mut type_literals: Vec<(String, String)> = Vec::new();
    for assertion in &ir.assertions {
        let pair = ReturnsForCategory::parse(&assertion.text).or_else(|| {
            match ReturnsIfKeyword::parse(&assertion.text)? {
                (Condition::Category(category), expected) => Some((category, expected)),
                _ => None,
            }
        });
        if let Some((category, expected)) = pair {
            if !type_literals.iter().any(|(t, _)| t == category.type_name()) {
                type_literals.push((category.type_name().to_string(), expected));
            }
        }
    }

    RepairHints { type_literals, fallback: Some(infer_fallback(ir, default_fallback)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Parameter, Signature};
    use proptest::prelude::*;

    fn make_ir(intent: &str, assertions: &[&str]) -> FunctionIr {
        FunctionIr::new(Signature::new("type_label").with_parameter(Parameter::new("value", None)))
            .with_intent(intent)
            .with_assertions(assertions.iter().copied())
    }

    const TYPE_ASSERTIONS: [&str; 3] = [
        "Returns 'int' for integer inputs",
        "Returns 'str' for string inputs",
        "Returns 'list' for list inputs",
    ];

    #[test]
    fn test_boolean_edge_case_expects_default_fallback() {
        let ir = make_ir("Label a value", &TYPE_ASSERTIONS);
        assert!(is_type_dispatching(&ir));

        let cases = edge_cases(&ir, "'other'");
        let labels: Vec<&str> = cases.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["float edge case", "mapping edge case", "null edge case", "boolean edge case"]
        );

        let boolean = cases.iter().find(|c| c.label == "boolean edge case").unwrap();
        assert_eq!(boolean.inputs, vec!["True"]);
        assert_eq!(boolean.expected, "'other'");
    }

    #[test]
    fn test_fallback_literal_from_assertion() {
        let ir = make_ir(
            "Label a value",
            &["Returns 'int' for integer inputs", "Returns 'unknown' otherwise"],
        );
        assert_eq!(infer_fallback(&ir, "'other'"), "'unknown'");

        let ir = make_ir("Label a value", &["Returns None for anything else"]);
        assert_eq!(infer_fallback(&ir, "'other'"), "None");
    }

    #[test]
    fn test_vocabulary_triggers_without_two_types() {
        let ir =
            make_ir("Dispatch on the type of the value", &["Returns 'mapping' for dict inputs"]);
        assert!(is_type_dispatching(&ir));
        let labels: Vec<String> = edge_cases(&ir, "'other'").into_iter().map(|c| c.label).collect();
        assert!(!labels.contains(&"mapping edge case".to_string()));
        assert!(labels.contains(&"boolean edge case".to_string()));
    }

    #[test]
    fn test_plain_functions_get_no_edge_cases() {
        let ir = make_ir("Double a number", &["Returns 0 if zero"]);
        assert!(!is_type_dispatching(&ir));
        assert!(edge_cases(&ir, "'other'").is_empty());
    }

    #[test]
    fn test_repair_hints() {
        let ir = make_ir("Label a value", &TYPE_ASSERTIONS);
        let hints = repair_hints(&ir, "'other'");
        assert_eq!(
            hints.type_literals,
            vec![
                ("int".to_string(), "'int'".to_string()),
                ("str".to_string(), "'str'".to_string()),
                ("list".to_string(), "'list'".to_string()),
            ]
        );
        assert_eq!(hints.fallback.as_deref(), Some("'other'"));
    }

    const CATEGORY_WORDS: [&str; 8] =
        ["integer", "string", "list", "float", "tuple", "set", "bytes", "mapping"];

    proptest! {
        #[test]
        fn prop_two_types_always_probe_boolean(
            a in 0usize..8,
            b in 0usize..8,
            fallback in "[a-z]{1,8}",
        ) {
            prop_assume!(a != b);
            let assertions = [
                format!("Returns '{}' for {} inputs", CATEGORY_WORDS[a], CATEGORY_WORDS[a]),
                format!("Returns '{}' for {} inputs", CATEGORY_WORDS[b], CATEGORY_WORDS[b]),
            ];
            let ir = make_ir("", &[assertions[0].as_str(), assertions[1].as_str()]);
            let default = format!("'{}'", fallback);

            let cases = edge_cases(&ir, &default);
            let boolean = cases.iter().find(|c| c.inputs == vec!["True".to_string()]);
            prop_assert!(boolean.is_some());
            prop_assert_eq!(&boolean.unwrap().expected, &default);
        }
    }
}
