//! Read-only configuration shared by every episode

use crate::errors::SynthesisError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration, loadable from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    pub generation: GenerationConfig,
    pub validation: ValidationConfig,
    pub repair: RepairConfig,
}

/// Retry budget and sampling schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Maximum provider requests per episode
    pub max_attempts: u32,

    /// Temperature of the first attempt
    pub base_temperature: f32,

    /// Added per subsequent attempt
    pub temperature_step: f32,

    /// Upper bound on the schedule
    pub max_temperature: f32,

    /// Per-call provider budget in seconds
    pub provider_timeout_secs: u64,

    /// Failing cases quoted in the feedback block
    pub max_feedback_cases: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_temperature: 0.3,
            temperature_step: 0.15,
            max_temperature: 0.9,
            provider_timeout_secs: 60,
            max_feedback_cases: 8,
        }
    }
}

impl GenerationConfig {
    /// Temperature for a 1-based attempt index
    pub fn temperature_for(&self, attempt_index: u32) -> f32 {
        let steps = attempt_index.saturating_sub(1) as f32;
        (self.base_temperature + steps * self.temperature_step).min(self.max_temperature)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}

/// Candidate execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Interpreter used to execute candidates
    pub python: String,

    /// Wall-clock budget of a single synthesized case
    pub case_timeout_ms: u64,

    /// Python literal expected for uncovered categories when no assertion names one
    pub default_fallback: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            python: "python3".to_string(),
            case_timeout_ms: 2000,
            default_fallback: "'other'".to_string(),
        }
    }
}

impl ValidationConfig {
    pub fn case_timeout(&self) -> Duration {
        Duration::from_millis(self.case_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Run the repair engine between assembly and validation
    pub enabled: bool,

    /// Force the type-dispatch rewrite when validation fails on a boolean case
    pub auto_type_dispatch_repair: bool,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self { enabled: true, auto_type_dispatch_repair: true }
    }
}

impl SynthesisConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse synthesis config")?;
        config.check()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read synthesis config {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Reject settings no episode can run with
    pub fn check(&self) -> std::result::Result<(), SynthesisError> {
        if self.generation.max_attempts == 0 {
            return Err(SynthesisError::Config(
                "generation.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.generation.max_temperature < self.generation.base_temperature {
            return Err(SynthesisError::Config(
                "generation.max_temperature is below generation.base_temperature".to_string(),
            ));
        }
        Ok(())
    }
}
