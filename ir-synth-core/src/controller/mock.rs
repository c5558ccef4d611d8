//! Scripted statement provider for tests

#![cfg(test)]

use super::provider::StatementProvider;
use crate::errors::ProviderError;
use crate::ir::Statement;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub enum MockResponse {
    Statements(Vec<Statement>),
    Error(ProviderError),
    Delayed(Duration, Vec<Statement>),
}

/// Replays queued responses, then repeats the fallback response if one is set
#[derive(Clone, Default)]
pub struct MockStatementProvider {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    repeat: Option<Vec<Statement>>,
    calls: Arc<Mutex<Vec<(String, f32)>>>,
}

impl MockStatementProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call with `statements`
    pub fn repeating(statements: Vec<Statement>) -> Self {
        Self { repeat: Some(statements), ..Self::default() }
    }

    pub fn push(&self, response: MockResponse) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }

    pub fn temperatures(&self) -> Vec<f32> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl StatementProvider for MockStatementProvider {
    async fn generate(
        &self,
        prompt: &str,
        _schema: &serde_json::Value,
        temperature: f32,
    ) -> Result<Vec<Statement>, ProviderError> {
        self.calls.lock().unwrap().push((prompt.to_string(), temperature));

        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(MockResponse::Statements(statements)) => Ok(statements),
            Some(MockResponse::Error(error)) => Err(error),
            Some(MockResponse::Delayed(delay, statements)) => {
                tokio::time::sleep(delay).await;
                Ok(statements)
            }
            None => {
                self.repeat.clone().ok_or_else(|| ProviderError::failed("no scripted response"))
            }
        }
    }
}
