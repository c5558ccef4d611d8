//! Deterministic syntax-tree repair
//!
//! Each transformer recognizes one defect signature and returns a rewritten
//! tree or `None`. The engine runs them once, in priority order, and never
//! lets a transformer make the source worse.

pub mod loop_return;
pub mod type_dispatch;

use crate::syntax::SyntaxTree;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Repair label recorded when the validator forces the type-dispatch rewrite
pub const VALIDATOR_TRIGGERED_TYPE_DISPATCH: &str = "type-dispatch (validator-triggered)";

/// Known type -> literal pairs and the fallback literal, usually derived from assertions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairHints {
    pub type_literals: Vec<(String, String)>,
    pub fallback: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transformer {
    LoopReturn,
    TypeDispatch,
}

impl Transformer {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoopReturn => "loop-return",
            Self::TypeDispatch => "type-dispatch",
        }
    }

    pub fn apply(
        &self,
        tree: &SyntaxTree,
        function_name: &str,
        hints: &RepairHints,
    ) -> Option<SyntaxTree> {
        match self {
            Self::LoopReturn => loop_return::transform(tree, function_name),
            Self::TypeDispatch => type_dispatch::transform(tree, function_name, hints),
        }
    }
}

/// Result of one repair pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairOutcome {
    pub source: String,
    pub applied: Vec<String>,
}

impl RepairOutcome {
    fn unchanged(source: &str) -> Self {
        Self { source: source.to_string(), applied: Vec::new() }
    }
}

#[derive(Debug, Clone)]
pub struct RepairEngine {
    transformers: Vec<Transformer>,
}

impl Default for RepairEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RepairEngine {
    pub fn new() -> Self {
        Self { transformers: vec![Transformer::LoopReturn, Transformer::TypeDispatch] }
    }

    pub fn transformers(&self) -> &[Transformer] {
        &self.transformers
    }

    /// Single pass over every transformer
    pub fn repair(&self, source: &str, function_name: &str) -> RepairOutcome {
        self.repair_with_hints(source, function_name, &RepairHints::default())
    }

    /// Bare text-to-text contract
    pub fn repair_source(&self, source: &str, function_name: &str) -> String {
        self.repair(source, function_name).source
    }

    pub fn repair_with_hints(
        &self,
        source: &str,
        function_name: &str,
        hints: &RepairHints,
    ) -> RepairOutcome {
        let Some(mut tree) = SyntaxTree::parse(source) else {
            return RepairOutcome::unchanged(source);
        };
        if tree.has_error() {
            debug!("Skipping repair of unparseable source");
            return RepairOutcome::unchanged(source);
        }

        let mut applied = Vec::new();
        for transformer in &self.transformers {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                transformer.apply(&tree, function_name, hints)
            }));

            match result {
                Ok(Some(next)) if next.has_error() => {
                    warn!("Discarding {} rewrite that does not parse", transformer.name());
                }
                Ok(Some(next)) if next.source() != tree.source() => {
                    debug!("Applied {} repair to {}", transformer.name(), function_name);
                    applied.push(transformer.name().to_string());
                    tree = next;
                }
                Ok(_) => {}
                Err(_) => {
                    warn!("{} transformer panicked; keeping previous source", transformer.name());
                }
            }
        }

        RepairOutcome { source: tree.into_source(), applied }
    }

    /// Type-dispatch rewrite without the introspection trigger.
    /// `None` when the rewrite declines, fails, or changes nothing.
    pub fn force_type_dispatch(
        &self,
        source: &str,
        function_name: &str,
        hints: &RepairHints,
    ) -> Option<String> {
        let tree = SyntaxTree::parse(source).filter(|t| !t.has_error())?;
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            type_dispatch::force_type_dispatch(&tree, function_name, hints)
        }));

        match result {
            Ok(Some(next)) if !next.has_error() && next.source() != source => {
                Some(next.into_source())
            }
            Ok(_) => None,
            Err(_) => {
                warn!("Forced type-dispatch rewrite panicked");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOTH_DEFECTS: &str = "\
def describe(value):
    for kind in (int, str):
        if isinstance(value, kind):
            return type(value).__name__
        return 'other'
";

    #[test]
    fn test_transformers_run_in_priority_order() {
        let engine = RepairEngine::new();
        assert_eq!(engine.transformers(), &[Transformer::LoopReturn, Transformer::TypeDispatch]);

        let outcome = engine.repair_with_hints(
            BOTH_DEFECTS,
            "describe",
            &RepairHints {
                type_literals: vec![("int".into(), "'int'".into()), ("str".into(), "'str'".into())],
                fallback: Some("'other'".into()),
            },
        );
        assert_eq!(outcome.applied, vec!["loop-return", "type-dispatch"]);
        assert!(outcome.source.contains("if isinstance(value, bool):"));
        assert!(!outcome.source.contains("__name__"));
    }

    #[test]
    fn test_repair_is_idempotent() {
        let engine = RepairEngine::new();
        let once = engine.repair_source(BOTH_DEFECTS, "describe");
        let twice = engine.repair(&once, "describe");
        assert_eq!(twice.source, once);
        assert!(twice.applied.is_empty());
    }

    #[test]
    fn test_unparseable_input_is_returned_unchanged() {
        let broken = "def f(x):\n    return (x +\n";
        let outcome = RepairEngine::new().repair(broken, "f");
        assert_eq!(outcome.source, broken);
        assert!(outcome.applied.is_empty());
    }

    #[test]
    fn test_clean_source_is_untouched() {
        let clean = "def double(x):\n    return x * 2\n";
        let outcome = RepairEngine::new().repair(clean, "double");
        assert_eq!(outcome, RepairOutcome::unchanged(clean));
    }

    #[test]
    fn test_force_type_dispatch_declines_without_pairs() {
        let clean = "def double(x):\n    return x * 2\n";
        let hints = RepairHints::default();
        let forced = RepairEngine::new().force_type_dispatch(clean, "double", &hints);
        assert!(forced.is_none());
    }
}
