//! Generation controller
//!
//! Drives one episode per IR: request a statement list, assemble, repair,
//! validate, then accept, retry with feedback, or stop. Attempts inside an
//! episode are strictly sequential; independent episodes share nothing but
//! the read-only configuration.

pub mod feedback;
mod mock;
pub mod prompt;
pub mod provider;
pub mod state;

use crate::config::SynthesisConfig;
use crate::errors::{ProviderError, Result, SynthesisError};
use crate::ir::{FunctionIr, GeneratedCandidate, statement_list_schema};
use crate::reconstruct::{IndentReconstructor, SourceAssembler};
use crate::repair::{RepairEngine, RepairHints, VALIDATOR_TRIGGERED_TYPE_DISPATCH};
use crate::validate::{self, AssertionValidator, CandidateValidator};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use feedback::{FeedbackBuilder, LITERAL_VALUE_GUIDANCE};
pub use prompt::PromptBuilder;
pub use provider::{StatementProvider, parse_statement_list};
pub use state::{EpisodeState, EpisodeStateMachine, StateTransition};

#[cfg(test)]
pub(crate) use mock::{MockResponse, MockStatementProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeStatus {
    /// A candidate passed every synthesized case
    Success,
    /// Budget spent; the candidate is the best one seen
    Exhausted,
}

/// What happened in one attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt_index: u32,
    pub temperature: f32,
    /// Last stage the attempt reached
    pub stage: EpisodeState,
    pub failing_cases: Option<usize>,
    pub applied_repairs: Vec<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl AttemptRecord {
    fn new(attempt_index: u32, temperature: f32) -> Self {
        Self {
            attempt_index,
            temperature,
            stage: EpisodeState::Request,
            failing_cases: None,
            applied_repairs: Vec::new(),
            error: None,
            duration_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeReport {
    pub episode_id: Uuid,
    pub function_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub attempts: Vec<AttemptRecord>,
    pub transitions: Vec<StateTransition>,
}

impl EpisodeReport {
    fn new(function_name: &str) -> Self {
        Self {
            episode_id: Uuid::new_v4(),
            function_name: function_name.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            attempts: Vec::new(),
            transitions: Vec::new(),
        }
    }

    fn finish(&mut self, machine: EpisodeStateMachine) {
        self.finished_at = Some(Utc::now());
        self.transitions = machine.into_history();
    }
}

/// Result handed to the downstream consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeOutcome {
    pub status: EpisodeStatus,
    pub candidate: GeneratedCandidate,
    pub report: EpisodeReport,
}

impl EpisodeOutcome {
    pub fn is_success(&self) -> bool {
        self.status == EpisodeStatus::Success
    }
}

pub struct GenerationController {
    provider: Arc<dyn StatementProvider>,
    assembler: Box<dyn SourceAssembler>,
    repair: RepairEngine,
    validator: Box<dyn CandidateValidator>,
    config: SynthesisConfig,
}

impl GenerationController {
    pub fn new(provider: Arc<dyn StatementProvider>, config: SynthesisConfig) -> Self {
        Self {
            provider,
            assembler: Box::new(IndentReconstructor::new()),
            repair: RepairEngine::new(),
            validator: Box::new(AssertionValidator::new(&config.validation)),
            config,
        }
    }

    pub fn with_assembler(mut self, assembler: Box<dyn SourceAssembler>) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn with_validator(mut self, validator: Box<dyn CandidateValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Run independent episodes with at most `concurrency` in flight, results in input order
    pub async fn run_batch(
        &self,
        irs: &[FunctionIr],
        concurrency: usize,
    ) -> Vec<Result<EpisodeOutcome>> {
        futures::stream::iter(irs.iter().map(|ir| self.run_episode(ir)))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    pub async fn run_episode(&self, ir: &FunctionIr) -> Result<EpisodeOutcome> {
        ir.ensure_complete()?;
        self.config.check()?;

        let function_name = ir.signature.name.as_str();
        let generation = &self.config.generation;
        let max_attempts = generation.max_attempts;
        let schema = statement_list_schema();
        let hints = validate::repair_hints(ir, &self.config.validation.default_fallback);
        let feedback_builder = FeedbackBuilder::new(function_name, generation.max_feedback_cases);

        let mut report = EpisodeReport::new(function_name);
        let mut machine = EpisodeStateMachine::new();
        let mut best: Option<GeneratedCandidate> = None;
        let mut feedback: Option<String> = None;
        // Latest validation feedback, kept across assembly failures
        let mut candidate_feedback: Option<String> = None;
        let mut last_error = String::new();

        info!(
            "Starting episode {} for {} ({} attempt(s))",
            report.episode_id, function_name, max_attempts
        );

        for attempt in 1..=max_attempts {
            let started = Instant::now();
            let temperature = generation.temperature_for(attempt);
            let mut record = AttemptRecord::new(attempt, temperature);
            if attempt > 1 {
                machine.transition_to(EpisodeState::Request)?;
            }

            let prompt = PromptBuilder::new(ir).with_feedback(feedback.as_deref()).build();
            debug!("Attempt {} of {} at temperature {:.2}", attempt, function_name, temperature);

            let requested = tokio::time::timeout(
                generation.provider_timeout(),
                self.provider.generate(&prompt, &schema, temperature),
            )
            .await
            .unwrap_or_else(|_| {
                Err(ProviderError::Timeout { duration: generation.provider_timeout() })
            });

            let statements = match requested {
                Ok(statements) => statements,
                Err(e) => {
                    warn!("Provider failed on attempt {}: {}", attempt, e);
                    last_error = e.to_string();
                    record.error = Some(last_error.clone());
                    self.finish_attempt(&mut report, record, started);
                    let retry = fail_attempt(
                        &mut machine,
                        attempt,
                        max_attempts,
                        best.is_some(),
                        &last_error,
                    )?;
                    if retry {
                        continue;
                    }
                    break;
                }
            };

            machine.transition_to(EpisodeState::Assemble)?;
            record.stage = EpisodeState::Assemble;
            let assembly = match self.assembler.assemble(&ir.signature, &statements) {
                Ok(assembly) => assembly,
                Err(e) => {
                    warn!("Assembly failed on attempt {}: {}", attempt, e);
                    last_error = e.to_string();
                    let note = feedback_builder.for_assembly_failure(attempt, &last_error);
                    feedback = Some(match &candidate_feedback {
                        Some(previous) => format!("{}\n\n{}", previous, note),
                        None => note,
                    });
                    record.error = Some(last_error.clone());
                    self.finish_attempt(&mut report, record, started);
                    let retry = fail_attempt(
                        &mut machine,
                        attempt,
                        max_attempts,
                        best.is_some(),
                        &last_error,
                    )?;
                    if retry {
                        continue;
                    }
                    break;
                }
            };

            machine.transition_to(EpisodeState::Repair)?;
            record.stage = EpisodeState::Repair;
            let mut candidate = GeneratedCandidate::new(assembly.source, attempt, temperature);
            candidate.warnings = assembly.warnings;
            if self.config.repair.enabled {
                let outcome =
                    self.repair.repair_with_hints(&candidate.source_text, function_name, &hints);
                candidate.source_text = outcome.source;
                candidate.applied_repairs = outcome.applied;
            }

            machine.transition_to(EpisodeState::Validate)?;
            record.stage = EpisodeState::Validate;
            let result = self.validator.validate(&candidate.source_text, function_name, ir).await;
            candidate.validation_issues = result.issues;

            if !candidate.passed() && self.forced_dispatch_applies(&candidate) {
                self.retry_with_type_dispatch(&mut candidate, ir, &hints).await;
            }

            record.failing_cases = Some(candidate.failing_cases());
            record.applied_repairs = candidate.applied_repairs.clone();

            if candidate.passed() {
                machine.transition_to(EpisodeState::Success)?;
                record.stage = EpisodeState::Success;
                self.finish_attempt(&mut report, record, started);
                report.finish(machine);
                info!("Episode {} succeeded on attempt {}", report.episode_id, attempt);
                return Ok(EpisodeOutcome { status: EpisodeStatus::Success, candidate, report });
            }

            debug!("Attempt {} failed {} case(s)", attempt, candidate.failing_cases());
            candidate_feedback = Some(feedback_builder.for_candidate(&candidate));
            feedback = candidate_feedback.clone();
            last_error = format!("{} failing case(s)", candidate.failing_cases());
            best = Some(match best {
                // Equal scores prefer the later attempt
                Some(previous) if previous.failing_cases() < candidate.failing_cases() => previous,
                _ => candidate,
            });
            self.finish_attempt(&mut report, record, started);

            if attempt < max_attempts {
                machine.transition_with_reason(EpisodeState::Retry, last_error.clone())?;
            } else {
                machine.transition_to(EpisodeState::Exhausted)?;
            }
        }

        report.finish(machine);
        match best {
            Some(candidate) => {
                info!(
                    "Episode {} exhausted; best candidate from attempt {} fails {} case(s)",
                    report.episode_id,
                    candidate.attempt_index,
                    candidate.failing_cases()
                );
                Ok(EpisodeOutcome { status: EpisodeStatus::Exhausted, candidate, report })
            }
            None => {
                warn!("Episode {} produced no candidate", report.episode_id);
                Err(SynthesisError::Fatal { attempts: max_attempts, last_error })
            }
        }
    }

    fn finish_attempt(
        &self,
        report: &mut EpisodeReport,
        mut record: AttemptRecord,
        started: Instant,
    ) {
        record.duration_ms = started.elapsed().as_millis() as u64;
        report.attempts.push(record);
    }

    fn forced_dispatch_applies(&self, candidate: &GeneratedCandidate) -> bool {
        self.config.repair.enabled
            && self.config.repair.auto_type_dispatch_repair
            && candidate
                .validation_issues
                .iter()
                .any(|i| matches!(i.inputs.first().map(String::as_str), Some("True" | "False")))
    }

    /// Force the type-dispatch rewrite and keep it when it fails fewer cases
    async fn retry_with_type_dispatch(
        &self,
        candidate: &mut GeneratedCandidate,
        ir: &FunctionIr,
        hints: &RepairHints,
    ) {
        let function_name = ir.signature.name.as_str();
        let Some(rewritten) =
            self.repair.force_type_dispatch(&candidate.source_text, function_name, hints)
        else {
            return;
        };

        let result = self.validator.validate(&rewritten, function_name, ir).await;
        if result.issues.len() < candidate.failing_cases() {
            debug!(
                "Validator-triggered type dispatch: {} -> {} failing case(s)",
                candidate.failing_cases(),
                result.issues.len()
            );
            candidate.source_text = rewritten;
            candidate.validation_issues = result.issues;
            candidate.applied_repairs.push(VALIDATOR_TRIGGERED_TYPE_DISPATCH.to_string());
        }
    }
}

/// Route a failed request or assembly; true when another attempt follows
fn fail_attempt(
    machine: &mut EpisodeStateMachine,
    attempt: u32,
    max_attempts: u32,
    have_candidate: bool,
    reason: &str,
) -> Result<bool> {
    if attempt < max_attempts {
        machine.transition_with_reason(EpisodeState::Retry, reason)?;
        Ok(true)
    } else if have_candidate {
        machine.transition_with_reason(EpisodeState::Exhausted, reason)?;
        Ok(false)
    } else {
        machine.transition_with_reason(EpisodeState::Fatal, reason)?;
        Ok(false)
    }
}
