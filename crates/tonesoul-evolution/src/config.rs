//! Self-monitoring configuration
//!
//! Every numeric policy constant the engines use lives here. The defaults
//! are inherited values, not tuned ones.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LearningConfig {
    /// Smoothing rate for pattern success-rate updates.
    pub learning_rate: f64,
    /// Minimum gap between surfaced adaptation suggestions.
    pub adaptation_cooldown_secs: i64,
    /// Interaction history ring capacity.
    pub interaction_capacity: usize,
    /// Samples kept per rolling metric.
    pub metrics_window: usize,
    /// Recent/prior success ratio below which degradation is flagged.
    pub degradation_ratio: f64,
    /// Mean latency ceiling over the last 20 samples.
    pub response_time_ceiling_ms: f64,
    /// Evolution record ring capacity.
    pub record_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetacognitionConfig {
    pub confidence_threshold: f64,
    /// Failed steps in one ledger that trigger reflection.
    pub error_pattern_threshold: usize,
    pub reflection_cooldown_secs: i64,
    pub history_capacity: usize,
    pub confidence_history_capacity: usize,
    /// Records examined by one reflection.
    pub reflection_window: usize,
    /// EMA weight for persistent load metrics.
    pub ema_alpha: f64,
    /// Threshold decrement per declining-confidence reflection, and its floor.
    pub threshold_step: f64,
    pub threshold_floor: f64,
    /// Cooldown increment per high-load reflection, and its ceiling.
    pub cooldown_step_secs: i64,
    pub cooldown_ceiling_secs: i64,
    pub insight_capacity: usize,
    pub record_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Items below this confidence are extracted but not integrated.
    pub min_integration_confidence: f64,
    /// Nodes untouched for this long decay on each cycle.
    pub stale_after_secs: i64,
    pub decay_factor: f64,
    /// Nodes below this confidence are left out of summaries.
    pub reporting_floor: f64,
    pub connection_increment: f64,
    /// Confidence at which an isolated node counts as an opportunity.
    pub opportunity_confidence: f64,
    pub record_capacity: usize,
}

// ============================================================
// Defaults
// ============================================================

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            adaptation_cooldown_secs: 3600,
            interaction_capacity: 10_000,
            metrics_window: 1000,
            degradation_ratio: 0.9,
            response_time_ceiling_ms: 2000.0,
            record_capacity: 1000,
        }
    }
}

impl Default for MetacognitionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            error_pattern_threshold: 3,
            reflection_cooldown_secs: 1800,
            history_capacity: 1000,
            confidence_history_capacity: 500,
            reflection_window: 10,
            ema_alpha: 0.1,
            threshold_step: 0.05,
            threshold_floor: 0.5,
            cooldown_step_secs: 600,
            cooldown_ceiling_secs: 7200,
            insight_capacity: 1000,
            record_capacity: 1000,
        }
    }
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            min_integration_confidence: 0.5,
            stale_after_secs: 3600,
            decay_factor: 0.99,
            reporting_floor: 0.1,
            connection_increment: 0.1,
            opportunity_confidence: 0.7,
            record_capacity: 1000,
        }
    }
}
