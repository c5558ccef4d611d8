//! Episode state machine

use crate::errors::{Result, SynthesisError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EpisodeState {
    Request,
    Assemble,
    Repair,
    Validate,
    Success,
    Retry,
    Exhausted,
    Fatal,
}

impl EpisodeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Exhausted | Self::Fatal)
    }
}

impl fmt::Display for EpisodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => write!(f, "REQUEST"),
            Self::Assemble => write!(f, "ASSEMBLE"),
            Self::Repair => write!(f, "REPAIR"),
            Self::Validate => write!(f, "VALIDATE"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Retry => write!(f, "RETRY"),
            Self::Exhausted => write!(f, "EXHAUSTED"),
            Self::Fatal => write!(f, "FATAL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: EpisodeState,
    pub to: EpisodeState,
    pub at: DateTime<Utc>,
    pub reason: Option<String>,
}

pub struct EpisodeStateMachine {
    current_state: EpisodeState,
    transition_history: Vec<StateTransition>,
}

impl Default for EpisodeStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl EpisodeStateMachine {
    pub fn new() -> Self {
        Self { current_state: EpisodeState::Request, transition_history: Vec::new() }
    }

    pub fn current_state(&self) -> EpisodeState {
        self.current_state
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.transition_history
    }

    pub fn into_history(self) -> Vec<StateTransition> {
        self.transition_history
    }

    pub fn transition_to(&mut self, new_state: EpisodeState) -> Result<()> {
        self.record(new_state, None)
    }

    pub fn transition_with_reason(
        &mut self,
        new_state: EpisodeState,
        reason: impl Into<String>,
    ) -> Result<()> {
        self.record(new_state, Some(reason.into()))
    }

    fn record(&mut self, new_state: EpisodeState, reason: Option<String>) -> Result<()> {
        if !Self::is_valid_transition(self.current_state, new_state) {
            return Err(SynthesisError::StateTransition(format!(
                "{} -> {}",
                self.current_state, new_state
            )));
        }

        match &reason {
            Some(reason) => debug!("Episode {} -> {} ({})", self.current_state, new_state, reason),
            None => debug!("Episode {} -> {}", self.current_state, new_state),
        }

        self.transition_history.push(StateTransition {
            from: self.current_state,
            to: new_state,
            at: Utc::now(),
            reason,
        });
        self.current_state = new_state;
        Ok(())
    }

    fn is_valid_transition(from: EpisodeState, to: EpisodeState) -> bool {
        use EpisodeState::*;

        match (from, to) {
            (Request, Assemble) => true,
            // Provider error or timeout
            (Request, Retry | Exhausted | Fatal) => true,

            (Assemble, Repair) => true,
            (Assemble, Retry | Exhausted | Fatal) => true,

            (Repair, Validate) => true,

            (Validate, Success | Retry | Exhausted) => true,

            (Retry, Request) => true,

            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut machine = EpisodeStateMachine::new();
        for state in [
            EpisodeState::Assemble,
            EpisodeState::Repair,
            EpisodeState::Validate,
            EpisodeState::Success,
        ] {
            machine.transition_to(state).unwrap();
        }
        assert!(machine.current_state().is_terminal());
        assert_eq!(machine.history().len(), 4);
        assert_eq!(machine.history()[0].from, EpisodeState::Request);
    }

    #[test]
    fn test_retry_loops_back_to_request() {
        let mut machine = EpisodeStateMachine::new();
        machine.transition_to(EpisodeState::Assemble).unwrap();
        machine.transition_with_reason(EpisodeState::Retry, "does not parse").unwrap();
        machine.transition_to(EpisodeState::Request).unwrap();
        assert_eq!(machine.history()[1].reason.as_deref(), Some("does not parse"));
    }

    #[test]
    fn test_repair_cannot_fail_the_episode() {
        let mut machine = EpisodeStateMachine::new();
        machine.transition_to(EpisodeState::Assemble).unwrap();
        machine.transition_to(EpisodeState::Repair).unwrap();
        assert!(machine.transition_to(EpisodeState::Fatal).is_err());
        assert!(machine.transition_to(EpisodeState::Retry).is_err());
        assert_eq!(machine.current_state(), EpisodeState::Repair);
    }

    #[test]
    fn test_validation_never_fatal() {
        let mut machine = EpisodeStateMachine::new();
        for state in [EpisodeState::Assemble, EpisodeState::Repair, EpisodeState::Validate] {
            machine.transition_to(state).unwrap();
        }
        assert!(matches!(
            machine.transition_to(EpisodeState::Fatal),
            Err(SynthesisError::StateTransition(_))
        ));
    }
}
