//! Python literal helpers and the fixed category sample table

use regex_utils::python::IDENTIFIER;

/// Words a category phrase may carry around the category itself
const FILLER_WORDS: &[&str] = &[
    "a", "an", "the", "all", "any", "each", "every", "is", "are", "of", "type", "given", "value",
    "values", "input", "inputs", "argument", "arguments",
];

/// Input categories an assertion can name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Integer,
    Boolean,
    String,
    List,
    Float,
    Mapping,
    Null,
    Tuple,
    Set,
    Bytes,
}

impl Category {
    /// Categories probed for type-dispatching functions when no assertion covers them
    pub const EDGE: [Category; 4] =
        [Category::Float, Category::Mapping, Category::Null, Category::Boolean];

    /// Resolve a free-text category phrase ("integer", "all dicts", "floating point", ...)
    ///
    /// Apart from filler words the phrase must name the category and nothing
    /// else; a qualified phrase such as "positive integer" is a narrower set
    /// than the category's samples and resolves to `None`.
    pub fn from_phrase(phrase: &str) -> Option<Self> {
        let phrase = phrase.trim().to_ascii_lowercase();
        let words: Vec<&str> = phrase
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty() && !FILLER_WORDS.contains(w))
            .collect();

        match words.as_slice() {
            [word] => Self::from_word(word),
            [first, second] => Self::from_word(&format!("{} {}", first, second)),
            _ => None,
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        let category = match word {
            "int" | "integer" | "integers" | "ints" | "whole number" | "whole numbers" => {
                Self::Integer
            }
            "bool" | "boolean" | "booleans" | "bools" => Self::Boolean,
            "str" | "string" | "strings" | "text" => Self::String,
            "list" | "lists" | "array" | "arrays" => Self::List,
            "float" | "floats" | "floating point" | "decimal" | "real" => Self::Float,
            "dict" | "dicts" | "dictionary" | "dictionaries" | "mapping" | "mappings" | "map" => {
                Self::Mapping
            }
            "none" | "null" | "nonetype" | "nil" => Self::Null,
            "tuple" | "tuples" => Self::Tuple,
            "set" | "sets" => Self::Set,
            "bytes" | "byte" => Self::Bytes,
            _ => return None,
        };
        Some(category)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::List => "list",
            Self::Float => "float",
            Self::Mapping => "mapping",
            Self::Null => "null",
            Self::Tuple => "tuple",
            Self::Set => "set",
            Self::Bytes => "bytes",
        }
    }

    /// Python runtime type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer => "int",
            Self::Boolean => "bool",
            Self::String => "str",
            Self::List => "list",
            Self::Float => "float",
            Self::Mapping => "dict",
            Self::Null => "NoneType",
            Self::Tuple => "tuple",
            Self::Set => "set",
            Self::Bytes => "bytes",
        }
    }

    /// Canonical sample inputs as Python literals
    pub fn samples(&self) -> &'static [&'static str] {
        match self {
            Self::Integer => &["42", "-7"],
            Self::Boolean => &["True", "False"],
            Self::String => &["'hello'"],
            Self::List => &["[1, 2, 3]"],
            Self::Float => &["3.14"],
            Self::Mapping => &["{'a': 1}"],
            Self::Null => &["None"],
            Self::Tuple => &["(1, 2)"],
            Self::Set => &["{1, 2}"],
            Self::Bytes => &["b'data'"],
        }
    }
}

/// Python `repr` of a str
pub fn python_str_repr(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Normalize an assertion's value text into a Python literal
pub fn normalize_literal(text: &str) -> Option<String> {
    let text = text.trim().trim_end_matches(['.', ',', ';']).trim();
    if text.is_empty() {
        return None;
    }

    for quote in ['\'', '"'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            let inner = &text[1..text.len() - 1];
            if !inner.contains(quote) {
                return Some(python_str_repr(inner));
            }
        }
    }

    if let Ok(n) = text.parse::<i64>() {
        return Some(n.to_string());
    }
    if text.parse::<f64>().is_ok_and(f64::is_finite) {
        return Some(text.to_string());
    }

    match text.to_ascii_lowercase().as_str() {
        "true" => return Some("True".to_string()),
        "false" => return Some("False".to_string()),
        "none" | "null" => return Some("None".to_string()),
        "[]" | "{}" | "()" => return Some(text.to_string()),
        _ => {}
    }

    let single_word =
        IDENTIFIER.find(text).is_some_and(|m| m.start() == 0 && m.end() == text.len());
    single_word.then(|| python_str_repr(text))
}

/// Base type name of an annotation: `List[int]` -> `list`, `typing.Dict` -> `dict`
fn base_type(hint: &str) -> String {
    let head = hint.split('[').next().unwrap_or(hint).trim();
    let head = head.rsplit('.').next().unwrap_or(head);
    head.to_ascii_lowercase()
}

/// Input satisfying an "if K" keyword
pub fn keyword_input(keyword: &str, type_hint: Option<&str>) -> Option<String> {
    let input = match keyword.to_ascii_lowercase().as_str() {
        "zero" => "0".to_string(),
        "negative" => "-5".to_string(),
        "positive" => "5".to_string(),
        "empty" => empty_value(type_hint).to_string(),
        "none" | "null" => "None".to_string(),
        "true" => "True".to_string(),
        "false" => "False".to_string(),
        _ => return None,
    };
    Some(input)
}

fn empty_value(type_hint: Option<&str>) -> &'static str {
    match type_hint.map(base_type).as_deref() {
        Some("str") => "''",
        Some("dict" | "mapping" | "mutablemapping") => "{}",
        Some("tuple") => "()",
        Some("set" | "frozenset") => "set()",
        Some("bytes") => "b''",
        _ => "[]",
    }
}

/// Neutral argument for a parameter the case does not exercise
pub fn default_for_hint(type_hint: Option<&str>) -> &'static str {
    match type_hint.map(base_type).as_deref() {
        Some("int") => "0",
        Some("float") => "0.0",
        Some("str") => "''",
        Some("bool") => "False",
        Some("list" | "sequence" | "iterable") => "[]",
        Some("dict" | "mapping") => "{}",
        Some("tuple") => "()",
        Some("set") => "set()",
        Some("bytes") => "b''",
        _ => "None",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_literal() {
        assert_eq!(normalize_literal("'int'").as_deref(), Some("'int'"));
        assert_eq!(normalize_literal("\"list\".").as_deref(), Some("'list'"));
        assert_eq!(normalize_literal("-1").as_deref(), Some("-1"));
        assert_eq!(normalize_literal("2.5").as_deref(), Some("2.5"));
        assert_eq!(normalize_literal("true").as_deref(), Some("True"));
        assert_eq!(normalize_literal("None").as_deref(), Some("None"));
        assert_eq!(normalize_literal("positive").as_deref(), Some("'positive'"));
        assert_eq!(normalize_literal("the sum of both"), None);
        assert_eq!(normalize_literal("inf"), Some("'inf'".to_string()));
    }

    #[test]
    fn test_str_repr_matches_python() {
        assert_eq!(python_str_repr("it's"), "\"it's\"");
        assert_eq!(python_str_repr("a\nb"), "'a\\nb'");
        assert_eq!(python_str_repr("both ' and \""), "'both \\' and \"'");
    }

    #[test]
    fn test_category_phrases() {
        assert_eq!(Category::from_phrase("integer"), Some(Category::Integer));
        assert_eq!(Category::from_phrase("Dictionaries"), Some(Category::Mapping));
        assert_eq!(Category::from_phrase("floating point"), Some(Category::Float));
        assert_eq!(Category::from_phrase("floating-point"), Some(Category::Float));
        assert_eq!(Category::from_phrase("the value is a string"), Some(Category::String));
        assert_eq!(Category::from_phrase("whole numbers"), Some(Category::Integer));
        assert_eq!(Category::from_phrase("positive integer"), None);
        assert_eq!(Category::from_phrase("non-empty list"), None);
        assert_eq!(Category::from_phrase("even integer"), None);
        assert_eq!(Category::from_phrase("other"), None);
    }

    #[test]
    fn test_empty_follows_type_hint() {
        assert_eq!(keyword_input("empty", Some("str")).as_deref(), Some("''"));
        assert_eq!(keyword_input("empty", Some("Dict[str, int]")).as_deref(), Some("{}"));
        assert_eq!(keyword_input("empty", Some("typing.List[int]")).as_deref(), Some("[]"));
        assert_eq!(keyword_input("empty", None).as_deref(), Some("[]"));
        assert_eq!(keyword_input("sideways", None), None);
    }

    #[test]
    fn test_defaults_for_extra_parameters() {
        assert_eq!(default_for_hint(Some("int")), "0");
        assert_eq!(default_for_hint(Some("Optional[str]")), "None");
        assert_eq!(default_for_hint(None), "None");
    }
}
