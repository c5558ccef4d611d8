//! JSON schema handed to the structured-generation provider

use serde_json::{Value, json};

/// Schema of the flat statement list the provider must honor
pub fn statement_list_schema() -> Value {
    json!({
        "type": "object",
        "required": ["statements"],
        "additionalProperties": false,
        "properties": {
            "statements": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["kind", "code"],
                    "additionalProperties": false,
                    "properties": {
                        "kind": {
                            "type": "string",
                            "enum": [
                                "assignment", "return", "if", "elif", "else",
                                "for", "while", "call", "expression", "comment"
                            ]
                        },
                        "code": { "type": "string" },
                        "rationale": { "type": "string" }
                    }
                }
            }
        }
    })
}
