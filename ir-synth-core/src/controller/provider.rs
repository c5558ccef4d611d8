//! Seam to the external structured-generation provider

use crate::errors::ProviderError;
use crate::ir::Statement;
use async_trait::async_trait;
use serde::Deserialize;

/// Black box returning a schema-valid statement list
#[async_trait]
pub trait StatementProvider: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        schema: &serde_json::Value,
        temperature: f32,
    ) -> Result<Vec<Statement>, ProviderError>;
}

#[derive(Deserialize)]
struct StatementList {
    statements: Vec<Statement>,
}

/// Parse a raw provider response: `{"statements": [...]}` or a bare array
pub fn parse_statement_list(response: &str) -> Result<Vec<Statement>, ProviderError> {
    let value: serde_json::Value = serde_json::from_str(response.trim())
        .map_err(|e| ProviderError::invalid(format!("not JSON: {}", e)))?;

    let parsed = if value.is_array() {
        serde_json::from_value::<Vec<Statement>>(value)
    } else {
        serde_json::from_value::<StatementList>(value).map(|list| list.statements)
    };
    parsed.map_err(|e| ProviderError::invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::StatementKind;

    #[test]
    fn test_parse_wrapped_and_bare() {
        let wrapped = r#"{"statements": [{"kind": "return", "code": "return 1"}]}"#;
        let bare = r#"[{"kind": "if", "code": "if x:", "rationale": "guard"}]"#;

        assert_eq!(parse_statement_list(wrapped).unwrap()[0].kind, StatementKind::Return);
        let statements = parse_statement_list(bare).unwrap();
        assert_eq!(statements[0].rationale.as_deref(), Some("guard"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse_statement_list("nope"), Err(ProviderError::InvalidResponse { .. })));
        assert!(matches!(
            parse_statement_list(r#"{"lines": []}"#),
            Err(ProviderError::InvalidResponse { .. })
        ));
    }
}
