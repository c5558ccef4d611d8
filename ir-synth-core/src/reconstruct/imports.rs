//! Import synthesis for annotation identifiers the body never imported

use crate::ir::{Signature, Statement, StatementKind};
use regex_utils::{assertion::QUOTED_LITERAL, python};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Identifier -> module that provides it
const KNOWN_IMPORTS: &[(&str, &str)] = &[
    ("Any", "typing"),
    ("Callable", "typing"),
    ("Dict", "typing"),
    ("FrozenSet", "typing"),
    ("Iterable", "typing"),
    ("Iterator", "typing"),
    ("List", "typing"),
    ("Literal", "typing"),
    ("Mapping", "typing"),
    ("Optional", "typing"),
    ("Sequence", "typing"),
    ("Set", "typing"),
    ("Tuple", "typing"),
    ("Union", "typing"),
    ("Decimal", "decimal"),
    ("Fraction", "fractions"),
    ("date", "datetime"),
    ("datetime", "datetime"),
    ("timedelta", "datetime"),
    ("Path", "pathlib"),
    ("Counter", "collections"),
    ("OrderedDict", "collections"),
    ("defaultdict", "collections"),
    ("deque", "collections"),
    ("Enum", "enum"),
];

fn module_for(name: &str) -> Option<&'static str> {
    KNOWN_IMPORTS.iter().find(|(known, _)| *known == name).map(|(_, module)| *module)
}

/// `from module import ...` lines for every known identifier the signature
/// or statements use without importing it, sorted by module
pub fn missing_imports(signature: &Signature, statements: &[Statement]) -> Vec<String> {
    let mut declared: HashSet<String> = HashSet::new();
    let mut used: Vec<String> = Vec::new();

    for hint in signature.type_hints() {
        used.extend(identifiers(hint));
    }

    for stmt in statements {
        if stmt.kind == StatementKind::Comment {
            continue;
        }
        for line in stmt.code.lines() {
            if let Some(names) = python::imported_names(line) {
                declared.extend(names);
                continue;
            }
            let without_strings = QUOTED_LITERAL.replace_all(line, "''");
            let code = without_strings.split('#').next().unwrap_or("");
            used.extend(identifiers(code));
        }
    }

    let mut by_module: BTreeMap<&'static str, BTreeSet<String>> = BTreeMap::new();
    for name in used {
        if declared.contains(&name) {
            continue;
        }
        if let Some(module) = module_for(&name) {
            by_module.entry(module).or_default().insert(name);
        }
    }

    by_module
        .into_iter()
        .map(|(module, names)| {
            format!("from {} import {}", module, names.into_iter().collect::<Vec<_>>().join(", "))
        })
        .collect()
}

fn identifiers(text: &str) -> impl Iterator<Item = String> + '_ {
    python::IDENTIFIER.find_iter(text).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Parameter;

    #[test]
    fn test_signature_hints_are_imported() {
        let sig = Signature::new("first")
            .with_parameter(Parameter::new("items", Some("List[int]")))
            .with_return_type("Optional[int]");
        assert_eq!(missing_imports(&sig, &[]), vec!["from typing import List, Optional"]);
    }

    #[test]
    fn test_declared_imports_are_skipped() {
        let sig = Signature::new("total").with_return_type("Decimal");
        let statements = vec![
            Statement::new(StatementKind::Expression, "from decimal import Decimal"),
            Statement::new(StatementKind::Assignment, "counts = Counter(values)"),
            Statement::new(StatementKind::Return, "return Decimal(len(counts))"),
        ];
        assert_eq!(missing_imports(&sig, &statements), vec!["from collections import Counter"]);
    }

    #[test]
    fn test_strings_and_comments_are_ignored() {
        let sig = Signature::new("label");
        let statements = vec![
            Statement::new(StatementKind::Return, "return 'List'  # Optional here"),
            Statement::new(StatementKind::Comment, "Dict is not used"),
        ];
        assert!(missing_imports(&sig, &statements).is_empty());
    }
}
