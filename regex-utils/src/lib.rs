//! Regex utilities for ir-synth
//! Extracted to a separate crate for compilation optimization

use once_cell::sync::Lazy;
use regex::Regex;

/// Phrasings recognized in free-text behavioral assertions
pub mod assertion {
    use super::*;

    /// "Returns V for C inputs"
    pub static RETURNS_FOR: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?i)^\s*(?:it\s+)?returns?\s+(?P<value>.+?)\s+for\s+(?:an?\s+|all\s+|any\s+)?(?P<category>[a-z_][a-z_ -]*?)\s+(?:inputs?|values?|arguments?|args?|parameters?)\s*\.?\s*$",
        )
        .expect("Invalid regex pattern")
    });

    /// "Returns V if K" / "Returns V when K"
    pub static RETURNS_IF: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)^\s*(?:it\s+)?returns?\s+(?P<value>.+?)\s+(?:if|when)\s+(?P<condition>.+?)\s*\.?\s*$")
            .expect("Invalid regex pattern")
    });

    /// Keywords a "Returns V if K" condition can name
    pub static CONDITION_KEYWORD: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)\b(zero|negative|positive|empty|none|null|true|false)\b")
            .expect("Invalid regex pattern")
    });

    /// Wording that marks an assertion as describing the fallback value
    pub static FALLBACK_PHRASE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)\b(?:otherwise|fallback|default|any\s+other|all\s+other|else)\b")
            .expect("Invalid regex pattern")
    });

    /// Single- or double-quoted literal
    pub static QUOTED_LITERAL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"'([^'\n]*)'|"([^"\n]*)""#).expect("Invalid regex pattern")
    });

    /// Intent vocabulary that signals runtime type dispatch
    pub static TYPE_CHECK_VOCABULARY: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?i)\b(?:isinstance|type\s+of|data\s*types?|type\s+names?|type[\s-]check\w*|runtime\s+types?|what\s+type|dispatch\w*\s+on\s+(?:the\s+)?type)\b",
        )
        .expect("Invalid regex pattern")
    });

    /// Contents of every quoted literal in `text`, in order of appearance
    pub fn quoted_literals(text: &str) -> Vec<String> {
        QUOTED_LITERAL
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// True when the assertion is phrased as a fallback ("otherwise", "any other", ...)
    pub fn is_fallback_phrase(text: &str) -> bool {
        FALLBACK_PHRASE.is_match(text)
    }
}

/// Python surface patterns used by reconstruction and feedback
pub mod python {
    use super::*;

    /// Code that already starts with the `return` keyword
    pub static RETURN_KEYWORD: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^return\b").expect("Invalid regex pattern"));

    /// `import a, b` or `from m import a, b`
    pub static IMPORT_LINE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"^\s*(?:from\s+[\w.]+\s+import\s+(?P<from_names>.+)|import\s+(?P<modules>.+))$")
            .expect("Invalid regex pattern")
    });

    /// Bare identifier
    pub static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*\b").expect("Invalid regex pattern")
    });

    /// `type(x).__name__` or `x.__class__.__name__`
    pub static TYPE_NAME_INTROSPECTION: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"type\s*\(\s*[\w.]+\s*\)\s*\.__name__|\.__class__\.__name__")
            .expect("Invalid regex pattern")
    });

    /// True when `code` begins with an explicit `return`
    pub fn starts_with_return(code: &str) -> bool {
        RETURN_KEYWORD.is_match(code.trim_start())
    }

    /// Names bound by an import line, `None` when the line is not an import
    pub fn imported_names(line: &str) -> Option<Vec<String>> {
        let caps = IMPORT_LINE.captures(line)?;
        let list = caps.name("from_names").or_else(|| caps.name("modules"))?.as_str();

        let names = list
            .trim_matches(|c| c == '(' || c == ')' || c == ' ')
            .split(',')
            .filter_map(|part| {
                let part = part.trim();
                // `import a.b as c` binds `c`; `import a.b` binds `a`
                let bound = match part.split_once(" as ") {
                    Some((_, alias)) => alias.trim(),
                    None => part.split('.').next().unwrap_or(part),
                };
                (!bound.is_empty()).then(|| bound.to_string())
            })
            .collect();

        Some(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returns_for_phrasing() {
        let caps = assertion::RETURNS_FOR.captures("Returns 'int' for integer inputs").unwrap();
        assert_eq!(&caps["value"], "'int'");
        assert_eq!(&caps["category"], "integer");

        let caps = assertion::RETURNS_FOR.captures("returns \"list\" for list values.").unwrap();
        assert_eq!(&caps["value"], "\"list\"");
        assert_eq!(&caps["category"], "list");
    }

    #[test]
    fn test_returns_if_phrasing() {
        let caps = assertion::RETURNS_IF.captures("Returns 0 if the input is zero").unwrap();
        assert_eq!(&caps["value"], "0");
        assert_eq!(&caps["condition"], "the input is zero");

        assert!(assertion::RETURNS_IF.captures("Raises on bad input").is_none());
    }

    #[test]
    fn test_quoted_literals() {
        assert_eq!(
            assertion::quoted_literals("Returns 'other' for anything else, never \"bool\""),
            vec!["other".to_string(), "bool".to_string()]
        );
    }

    #[test]
    fn test_fallback_phrase() {
        assert!(assertion::is_fallback_phrase("Returns 'other' otherwise"));
        assert!(assertion::is_fallback_phrase("Returns 'other' for all other inputs"));
        assert!(!assertion::is_fallback_phrase("Returns 'int' for integer inputs"));
    }

    #[test]
    fn test_type_check_vocabulary() {
        assert!(assertion::TYPE_CHECK_VOCABULARY.is_match("Return the type name of a value"));
        assert!(assertion::TYPE_CHECK_VOCABULARY.is_match("uses isinstance to classify"));
        assert!(!assertion::TYPE_CHECK_VOCABULARY.is_match("sum two numbers"));
    }

    #[test]
    fn test_return_keyword() {
        assert!(python::starts_with_return("return x"));
        assert!(python::starts_with_return("  return"));
        assert!(!python::starts_with_return("returned_value + 1"));
        assert!(!python::starts_with_return("x"));
    }

    #[test]
    fn test_imported_names() {
        assert_eq!(
            python::imported_names("from typing import List, Optional"),
            Some(vec!["List".to_string(), "Optional".to_string()])
        );
        assert_eq!(
            python::imported_names("import collections.abc as cabc, os"),
            Some(vec!["cabc".to_string(), "os".to_string()])
        );
        assert_eq!(python::imported_names("x = 1"), None);
    }

    #[test]
    fn test_type_name_introspection() {
        assert!(python::TYPE_NAME_INTROSPECTION.is_match("return type(value).__name__"));
        assert!(python::TYPE_NAME_INTROSPECTION.is_match("return value.__class__.__name__"));
        assert!(!python::TYPE_NAME_INTROSPECTION.is_match("return 'int'"));
    }
}
