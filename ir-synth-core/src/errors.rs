//! Error types for the synthesis pipeline
//!
//! Each layer owns a narrow error enum; `SynthesisError` is what an episode
//! can surface to its caller. Exhaustion is deliberately absent: an exhausted
//! episode still returns its best candidate.

use std::time::Duration;
use thiserror::Error;

/// Failure to turn a statement list into parseable source
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssemblyError {
    /// A statement arrived without any code
    #[error("statement {index} has no code")]
    MissingCode { index: usize },

    /// The provider returned no statements at all
    #[error("statement list is empty")]
    EmptyBody,

    /// The assembled text contains a syntax error
    #[error("assembled source does not parse (first error on line {line}): {snippet}")]
    Unparseable { line: usize, snippet: String },

    /// The parser produced no tree at all
    #[error("assembled source could not be tokenized")]
    Untokenizable,
}

/// Failure reported by the external statement provider
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The call did not complete within the configured budget
    #[error("provider call timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// The provider answered with an error
    #[error("provider error: {message}")]
    Failed { message: String },

    /// The provider answered with something that is not a statement list
    #[error("invalid provider response: {message}")]
    InvalidResponse { message: String },
}

impl ProviderError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed { message: message.into() }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidResponse { message: message.into() }
    }
}

/// Failure of the candidate execution machinery itself (not of the candidate)
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("interpreter '{interpreter}' could not be started: {source}")]
    InterpreterUnavailable {
        interpreter: String,
        #[source]
        source: std::io::Error,
    },

    #[error("candidate execution exceeded {duration:?}")]
    Timeout { duration: Duration },

    #[error("harness failed: {message}")]
    Harness { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors an episode surfaces to its caller
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The IR still contains unresolved holes; never retried
    #[error("IR has {} unresolved hole(s): {}", .holes.len(), .holes.join(", "))]
    Hole { holes: Vec<String> },

    /// No attempt produced parseable source
    #[error(
        "all {attempts} attempt(s) failed before producing a candidate; last error: {last_error}"
    )]
    Fatal { attempts: u32, last_error: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid episode transition: {0}")]
    StateTransition(String),
}

pub type Result<T> = std::result::Result<T, SynthesisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hole_error_names_holes() {
        let err = SynthesisError::Hole { holes: vec!["?ret".to_string(), "?cond".to_string()] };
        let message = err.to_string();
        assert!(message.contains("2 unresolved"));
        assert!(message.contains("?ret, ?cond"));
    }

    #[test]
    fn test_provider_timeout_message() {
        let err = ProviderError::Timeout { duration: Duration::from_millis(250) };
        assert!(err.to_string().contains("timed out"));
    }
}
