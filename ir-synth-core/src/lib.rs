//! Core functionality for ir-synth
//!
//! Turns a function IR (signature plus behavioral assertions) into a
//! validated Python implementation: a flat statement list from an external
//! provider is reconstructed into nested source, repaired, checked against
//! cases synthesized from the assertions, and retried with feedback until it
//! passes or the attempt budget runs out.

pub mod config;
pub mod controller;
pub mod errors;
pub mod ir;
pub mod reconstruct;
pub mod repair;
pub mod syntax;
pub mod validate;

pub use config::SynthesisConfig;
pub use controller::{EpisodeOutcome, EpisodeStatus, GenerationController, StatementProvider};
pub use errors::{AssemblyError, ProviderError, Result, RunnerError, SynthesisError};
pub use ir::{
    Assertion, FunctionIr, GeneratedCandidate, Parameter, Signature, Statement, StatementKind,
};
pub use reconstruct::{IndentReconstructor, SourceAssembler};
pub use repair::{RepairEngine, RepairHints};
pub use validate::{AssertionValidator, CandidateValidator, ValidationResult};
