use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub plan: PlanConfig,
}

/// Configuration for the scene scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Period of the recurring drift check, in milliseconds.
    pub drift_check_period_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            drift_check_period_ms: 1_000,
        }
    }
}

impl SchedulerConfig {
    pub fn drift_check_period(&self) -> Duration {
        Duration::from_millis(self.drift_check_period_ms)
    }
}

/// Limits applied while normalizing a raw, model-generated scene plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Hard cap on the number of scenes kept from a raw plan.
    pub max_scenes: usize,
    /// Inclusive range the per-scene `steps` value is clamped into.
    pub min_steps: u32,
    pub max_steps: u32,
    /// Inclusive range controlnet conditioning scales are clamped into.
    pub min_conditioning_scale: f64,
    pub max_conditioning_scale: f64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            max_scenes: 24,
            min_steps: 1,
            max_steps: 100,
            min_conditioning_scale: 0.1,
            max_conditioning_scale: 0.6,
        }
    }
}
