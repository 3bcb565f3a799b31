//! Adaptive learning engine
//!
//! Matches each ledger against a small registry of learning patterns, runs
//! the category-specific learning function for confident matches, keeps
//! rolling performance metrics and surfaces (never applies) adaptation
//! suggestions.

use crate::config::LearningConfig;
use crate::record::{EvolutionRecord, LearningType};
use crate::ring::RingBuffer;
use crate::{mean, Context};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::time::Instant;
use tonesoul_core::Ledger;
use tracing::{debug, info};

pub const SYSTEM_VERSION: &str = "1.0.0";

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LearningPattern {
    pub id: String,
    pub pattern_type: LearningType,
    pub trigger_conditions: Vec<String>,
    pub success_indicators: Vec<String>,
    pub failure_indicators: Vec<String>,
    pub confidence_threshold: f64,
    pub adaptation_weight: f64,
    pub usage_count: u64,
    pub success_rate: f64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl LearningPattern {
    pub fn new(
        pattern_type: LearningType,
        trigger_conditions: &[&str],
        success_indicators: &[&str],
        failure_indicators: &[&str],
        confidence_threshold: f64,
        adaptation_weight: f64,
    ) -> Self {
        let now = Utc::now();
        let owned = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            pattern_type,
            trigger_conditions: owned(trigger_conditions),
            success_indicators: owned(success_indicators),
            failure_indicators: owned(failure_indicators),
            confidence_threshold,
            adaptation_weight,
            usage_count: 0,
            success_rate: 0.0,
            created_at: now,
            last_updated: now,
        }
    }

    /// Non-empty intersection between context keys and trigger conditions.
    pub fn is_triggered_by(&self, context: &Context) -> bool {
        self.trigger_conditions
            .iter()
            .any(|c| context.contains_key(c.as_str()))
    }

    /// Fraction of trigger conditions present in the context, either as a
    /// key or inside a stringified value.
    pub fn context_match(&self, context: &Context) -> f64 {
        if self.trigger_conditions.is_empty() {
            return 0.5;
        }
        let matched = self
            .trigger_conditions
            .iter()
            .filter(|c| {
                context.contains_key(c.as_str())
                    || context.values().any(|v| match v {
                        Value::String(s) => s.contains(c.as_str()),
                        other => other.to_string().contains(c.as_str()),
                    })
            })
            .count();
        matched as f64 / self.trigger_conditions.len() as f64
    }
}

/// The three patterns every engine starts with.
pub fn seed_patterns() -> Vec<LearningPattern> {
    vec![
        LearningPattern::new(
            LearningType::FeedbackAdaptation,
            &["user_satisfaction_low", "response_time_high"],
            &["user_satisfaction_improved", "response_time_reduced"],
            &["user_satisfaction_decreased", "error_rate_increased"],
            0.7,
            0.1,
        ),
        LearningPattern::new(
            LearningType::PatternRecognition,
            &["repeated_query_type", "similar_context"],
            &["accurate_classification", "appropriate_routing"],
            &["misclassification", "wrong_module_routing"],
            0.8,
            0.05,
        ),
        LearningPattern::new(
            LearningType::EmotionalCalibration,
            &["emotional_mismatch", "tone_inconsistency"],
            &["emotional_alignment", "positive_feedback"],
            &["emotional_disconnect", "negative_feedback"],
            0.75,
            0.08,
        ),
    ]
}

/// 0.6 x success ratio + 0.4 x mean trust weight; 0 for an empty ledger.
pub fn trace_quality(ledger: &Ledger) -> f64 {
    if ledger.is_empty() {
        return 0.0;
    }
    ledger.success_ratio() * 0.6 + ledger.mean_trust_weight() * 0.4
}

#[derive(Serialize, Clone, Debug)]
pub struct InteractionRecord {
    pub trace_id: String,
    pub timestamp: DateTime<Utc>,
    pub steps: usize,
    pub total_latency_ms: u64,
    pub success_ratio: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProcessingPattern {
    pub input_type: String,
    pub processing_path: Vec<String>,
    pub success_indicators: Vec<String>,
}

/// Category-specific findings of one learning function.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "learning_type", rename_all = "snake_case")]
pub enum LearningDetail {
    FeedbackAdaptation { improvements_identified: Vec<String> },
    PatternRecognition { pattern_learned: ProcessingPattern },
    EmotionalCalibration { calibration_adjustments: Vec<String> },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct LearningOutcome {
    pub pattern_id: String,
    pub success: bool,
    pub confidence: f64,
    #[serde(flatten)]
    pub detail: LearningDetail,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AdaptationSuggestion {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: String,
    pub description: String,
    pub recommended_action: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SurfacedAdaptation {
    pub surfaced_at: DateTime<Utc>,
    pub trace_id: String,
    pub suggestions: Vec<AdaptationSuggestion>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthSummary {
    pub cognitive_health: f64,
    pub moral_consistency: f64,
    pub knowledge_coherence: f64,
    pub overall_performance: f64,
    pub learning_efficiency: f64,
    pub adaptation_speed: f64,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct PerformanceSummary {
    pub total_interactions: u64,
    pub active_patterns: usize,
    pub overall_performance: f64,
    pub system_health: Option<HealthSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_response_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_success_rate: Option<f64>,
}

#[derive(Serialize, Clone, Debug, Default)]
pub struct LearningResult {
    pub learning_opportunities_detected: usize,
    pub learning_results: Vec<LearningOutcome>,
    pub adaptation_suggestions: Vec<AdaptationSuggestion>,
    pub system_performance: PerformanceSummary,
    pub processing_time_ms: u64,
}

/// Long-lived aggregate the learning engine reports on.
#[derive(Serialize, Clone, Debug)]
pub struct SystemEvolutionState {
    pub id: String,
    pub version: String,
    pub active_learning_patterns: Vec<String>,
    pub total_interactions: u64,
    pub overall_performance_score: f64,
    pub learning_efficiency: f64,
    pub adaptation_speed: f64,
    pub evolution_history: RingBuffer<String>,
    pub last_major_evolution: Option<DateTime<Utc>>,
    pub cognitive_health_score: f64,
    pub moral_consistency_score: f64,
    pub knowledge_coherence_score: f64,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl SystemEvolutionState {
    pub fn new(version: impl Into<String>, history_capacity: usize) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            version: version.into(),
            active_learning_patterns: Vec::new(),
            total_interactions: 0,
            overall_performance_score: 0.5,
            learning_efficiency: 0.5,
            adaptation_speed: 0.5,
            evolution_history: RingBuffer::new(history_capacity),
            last_major_evolution: None,
            cognitive_health_score: 1.0,
            moral_consistency_score: 1.0,
            knowledge_coherence_score: 1.0,
            created_at: now,
            last_updated: now,
        }
    }

    pub fn add_evolution_record(&mut self, record_id: String, now: DateTime<Utc>) {
        self.evolution_history.push(record_id);
        self.last_major_evolution = Some(now);
        self.last_updated = now;
    }

    pub fn health_summary(&self) -> HealthSummary {
        HealthSummary {
            cognitive_health: self.cognitive_health_score,
            moral_consistency: self.moral_consistency_score,
            knowledge_coherence: self.knowledge_coherence_score,
            overall_performance: self.overall_performance_score,
            learning_efficiency: self.learning_efficiency,
            adaptation_speed: self.adaptation_speed,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PatternUsage {
    pub pattern_id: String,
    pub pattern_type: LearningType,
    pub usage_count: u64,
    pub success_rate: f64,
}

#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct PerformanceTrends {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_rate_trend: Option<Trend>,
}

#[derive(Serialize, Clone, Debug)]
pub struct LearningInsights {
    pub most_active_patterns: Vec<PatternUsage>,
    pub performance_trends: PerformanceTrends,
    pub adaptation_history: Vec<SurfacedAdaptation>,
    pub total_evolution_records: usize,
    pub recent_evolutions: Vec<EvolutionRecord>,
    pub system_state: SystemEvolutionState,
}

pub struct AdaptiveLearningEngine {
    config: LearningConfig,
    patterns: Vec<LearningPattern>,
    interactions: RingBuffer<InteractionRecord>,
    response_times: VecDeque<f64>,
    success_ratios: VecDeque<f64>,
    records: RingBuffer<EvolutionRecord>,
    adaptations: RingBuffer<SurfacedAdaptation>,
    state: SystemEvolutionState,
    last_adaptation: Option<DateTime<Utc>>,
}

impl AdaptiveLearningEngine {
    pub fn new(config: LearningConfig) -> Self {
        let patterns = seed_patterns();
        let mut state = SystemEvolutionState::new(SYSTEM_VERSION, config.record_capacity);
        state.active_learning_patterns = patterns.iter().map(|p| p.id.clone()).collect();
        Self {
            interactions: RingBuffer::new(config.interaction_capacity),
            response_times: VecDeque::new(),
            success_ratios: VecDeque::new(),
            records: RingBuffer::new(config.record_capacity),
            adaptations: RingBuffer::new(config.record_capacity),
            patterns,
            state,
            last_adaptation: None,
            config,
        }
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    pub fn patterns(&self) -> &[LearningPattern] {
        &self.patterns
    }

    pub fn state(&self) -> &SystemEvolutionState {
        &self.state
    }

    pub fn records(&self) -> &RingBuffer<EvolutionRecord> {
        &self.records
    }

    pub fn interactions(&self) -> &RingBuffer<InteractionRecord> {
        &self.interactions
    }

    pub fn process_interaction(&mut self, ledger: &Ledger, context: &Context) -> LearningResult {
        self.process_interaction_at(ledger, context, Utc::now())
    }

    pub fn process_interaction_at(
        &mut self,
        ledger: &Ledger,
        context: &Context,
        now: DateTime<Utc>,
    ) -> LearningResult {
        let started = Instant::now();

        let interaction = InteractionRecord {
            trace_id: ledger.id().to_string(),
            timestamp: now,
            steps: ledger.len(),
            total_latency_ms: ledger.total_latency_ms(),
            success_ratio: ledger.success_ratio(),
        };
        self.state.total_interactions += 1;

        // Candidates are scored against the pattern state before any update.
        let candidates: Vec<(usize, f64)> = self
            .patterns
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_triggered_by(context))
            .map(|(i, p)| (i, self.pattern_confidence(p, ledger, context)))
            .collect();

        let mut outcomes = Vec::new();
        for &(index, confidence) in &candidates {
            if let Some(outcome) = self.execute_learning(index, confidence, ledger, context, now) {
                outcomes.push(outcome);
            }
        }

        self.update_metrics(&interaction, now);
        self.interactions.push(interaction);

        let suggestions = self.check_adaptation_needs(ledger, now);

        debug!(
            trace_id = %ledger.id(),
            candidates = candidates.len(),
            learned = outcomes.len(),
            suggestions = suggestions.len(),
            "Learning cycle complete"
        );

        LearningResult {
            learning_opportunities_detected: candidates.len(),
            learning_results: outcomes,
            adaptation_suggestions: suggestions,
            system_performance: self.performance_summary(),
            processing_time_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// 0.5 x base + 0.3 x context match + 0.2 x trace quality, clamped to [0, 1].
    /// The base is the pattern's success rate once used, 0.5 before.
    pub fn pattern_confidence(&self, pattern: &LearningPattern, ledger: &Ledger, context: &Context) -> f64 {
        let base = if pattern.usage_count > 0 {
            pattern.success_rate
        } else {
            0.5
        };
        let confidence =
            base * 0.5 + pattern.context_match(context) * 0.3 + trace_quality(ledger) * 0.2;
        confidence.clamp(0.0, 1.0)
    }

    fn execute_learning(
        &mut self,
        index: usize,
        confidence: f64,
        ledger: &Ledger,
        context: &Context,
        now: DateTime<Utc>,
    ) -> Option<LearningOutcome> {
        let pattern = self.patterns.get_mut(index)?;
        if confidence < pattern.confidence_threshold {
            return None;
        }

        pattern.usage_count += 1;
        pattern.last_updated = now;

        let (success, detail) = match pattern.pattern_type {
            LearningType::FeedbackAdaptation => learn_from_feedback(context),
            LearningType::PatternRecognition => learn_pattern_recognition(ledger, context),
            LearningType::EmotionalCalibration => learn_emotional_calibration(context),
            // No seed pattern carries these categories.
            LearningType::KnowledgeExpansion | LearningType::MetacognitiveImprovement => {
                return None
            }
        };

        let pattern_id = pattern.id.clone();
        if success {
            let before = pattern.success_rate;
            let after = (before + (1.0 - before) * self.config.learning_rate).clamp(0.0, 1.0);
            pattern.success_rate = after;
            let evolution_type = pattern.pattern_type;
            let usage = pattern.usage_count;

            let record = EvolutionRecord::integrated(
                evolution_type,
                json!({ "pattern_id": pattern_id, "success_rate": before, "usage_count": usage - 1 }),
                json!({ "pattern_id": pattern_id, "success_rate": after, "usage_count": usage }),
                format!("System evolved through {}", evolution_type),
                ledger.id().to_string(),
                context.clone(),
                now,
            );
            self.state.add_evolution_record(record.id.clone(), now);
            self.records.push(record);
        }

        Some(LearningOutcome {
            pattern_id,
            success,
            confidence,
            detail,
        })
    }

    fn update_metrics(&mut self, interaction: &InteractionRecord, now: DateTime<Utc>) {
        let window = self.config.metrics_window.max(1);
        push_capped(&mut self.response_times, interaction.total_latency_ms as f64, window);
        push_capped(&mut self.success_ratios, interaction.success_ratio, window);

        if let Some(avg) = tail_mean(&self.success_ratios, 100) {
            self.state.overall_performance_score = avg.clamp(0.0, 1.0);
        }
        self.state.last_updated = now;
    }

    fn check_adaptation_needs(&mut self, ledger: &Ledger, now: DateTime<Utc>) -> Vec<AdaptationSuggestion> {
        let mut suggestions = Vec::new();

        if let Some(last) = self.last_adaptation {
            if now - last < Duration::seconds(self.config.adaptation_cooldown_secs) {
                return suggestions;
            }
        }

        let n = self.success_ratios.len();
        if n >= 50 {
            let recent = mean(self.success_ratios.range(n - 20..).copied());
            let prior = mean(self.success_ratios.range(n - 50..n - 20).copied());
            if recent < prior * self.config.degradation_ratio {
                suggestions.push(AdaptationSuggestion {
                    kind: "performance_degradation".into(),
                    severity: "medium".into(),
                    description: "Recent performance has declined".into(),
                    recommended_action: "review_and_adjust_patterns".into(),
                });
            }
        }

        if let Some(avg) = tail_mean(&self.response_times, 20).filter(|_| self.response_times.len() >= 20) {
            if avg > self.config.response_time_ceiling_ms {
                suggestions.push(AdaptationSuggestion {
                    kind: "response_time_high".into(),
                    severity: "high".into(),
                    description: "Average response time is too high".into(),
                    recommended_action: "optimize_processing_pipeline".into(),
                });
            }
        }

        if !suggestions.is_empty() {
            info!(
                count = suggestions.len(),
                trace_id = %ledger.id(),
                "Surfacing adaptation suggestions"
            );
            self.last_adaptation = Some(now);
            self.adaptations.push(SurfacedAdaptation {
                surfaced_at: now,
                trace_id: ledger.id().to_string(),
                suggestions: suggestions.clone(),
            });
        }
        suggestions
    }

    pub fn performance_summary(&self) -> PerformanceSummary {
        PerformanceSummary {
            total_interactions: self.state.total_interactions,
            active_patterns: self.state.active_learning_patterns.len(),
            overall_performance: self.state.overall_performance_score,
            system_health: Some(self.state.health_summary()),
            avg_response_time: tail_mean(&self.response_times, 10),
            recent_success_rate: tail_mean(&self.success_ratios, 10),
        }
    }

    pub fn insights(&self) -> LearningInsights {
        let mut usage: Vec<PatternUsage> = self
            .patterns
            .iter()
            .map(|p| PatternUsage {
                pattern_id: p.id.clone(),
                pattern_type: p.pattern_type,
                usage_count: p.usage_count,
                success_rate: p.success_rate,
            })
            .collect();
        // Stable sort keeps seed order among equal usage counts.
        usage.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
        usage.truncate(5);

        let n = self.success_ratios.len();
        let success_rate_trend = if n >= 10 {
            let recent = mean(self.success_ratios.range(n - 10..).copied());
            let older = if n >= 20 {
                mean(self.success_ratios.range(n - 20..n - 10).copied())
            } else {
                recent
            };
            Some(if recent > older {
                Trend::Improving
            } else {
                Trend::Declining
            })
        } else {
            None
        };

        LearningInsights {
            most_active_patterns: usage,
            performance_trends: PerformanceTrends { success_rate_trend },
            adaptation_history: self.adaptations.iter().cloned().collect(),
            total_evolution_records: self.records.len(),
            recent_evolutions: self.records.recent(10).cloned().collect(),
            system_state: self.state.clone(),
        }
    }
}

impl Default for AdaptiveLearningEngine {
    fn default() -> Self {
        Self::new(LearningConfig::default())
    }
}

// ============================================================
// Learning functions
// ============================================================

fn learn_from_feedback(context: &Context) -> (bool, LearningDetail) {
    let signals = context.get("feedback_signals").and_then(Value::as_object);
    let signal = |key: &str| signals.and_then(|s| s.get(key)).and_then(Value::as_f64);

    let mut improvements = Vec::new();
    if signal("response_time").is_some_and(|t| t > 1000.0) {
        improvements.push("optimize_response_time".to_string());
    }
    if signal("user_satisfaction").is_some_and(|s| s < 0.7) {
        improvements.push("improve_response_quality".to_string());
    }
    (
        !improvements.is_empty(),
        LearningDetail::FeedbackAdaptation {
            improvements_identified: improvements,
        },
    )
}

fn learn_pattern_recognition(ledger: &Ledger, context: &Context) -> (bool, LearningDetail) {
    let input_type = context
        .get("input_type")
        .or_else(|| context.get("intent_type"))
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    let pattern = ProcessingPattern {
        input_type,
        processing_path: ledger.tools().into_iter().map(String::from).collect(),
        success_indicators: ledger
            .steps()
            .iter()
            .filter(|s| s.is_success())
            .map(|s| s.evidence.clone())
            .collect(),
    };
    (
        true,
        LearningDetail::PatternRecognition {
            pattern_learned: pattern,
        },
    )
}

fn learn_emotional_calibration(context: &Context) -> (bool, LearningDetail) {
    let emotion = context
        .get("emotional_context")
        .and_then(|e| e.get("user_emotion"))
        .and_then(Value::as_str);
    let tone = context
        .get("response_tone")
        .and_then(Value::as_str)
        .unwrap_or("neutral");

    let mut adjustments = Vec::new();
    match emotion {
        Some("frustrated") if tone != "empathetic" => adjustments.push("increase_empathy".to_string()),
        Some("happy") if tone == "formal" => adjustments.push("match_positive_tone".to_string()),
        _ => {}
    }
    (
        !adjustments.is_empty(),
        LearningDetail::EmotionalCalibration {
            calibration_adjustments: adjustments,
        },
    )
}

fn push_capped(values: &mut VecDeque<f64>, value: f64, cap: usize) {
    values.push_back(value);
    while values.len() > cap {
        values.pop_front();
    }
}

/// Mean of the newest `n` samples, or of all of them when fewer exist.
fn tail_mean(values: &VecDeque<f64>, n: usize) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let take = n.min(values.len());
    Some(mean(values.range(values.len() - take..).copied()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonesoul_core::{TraceStep, TrustLevel};

    fn ledger_all_a() -> Ledger {
        let mut ledger = Ledger::new(None);
        ledger
            .append(TraceStep::success("core.tone_router.v1", "ok", TrustLevel::A))
            .unwrap();
        ledger
    }

    #[test]
    fn context_match_counts_keys_and_values() {
        let pattern = &seed_patterns()[1];
        let mut ctx = Context::new();
        ctx.insert("repeated_query_type".into(), json!(true));
        assert!((pattern.context_match(&ctx) - 0.5).abs() < 1e-9);
        ctx.insert("note".into(), json!("similar_context seen"));
        assert!((pattern.context_match(&ctx) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fresh_pattern_confidence_uses_half_base() {
        let engine = AdaptiveLearningEngine::default();
        let mut ctx = Context::new();
        ctx.insert("repeated_query_type".into(), json!(true));
        // 0.25 + 0.3 * 0.5 + 0.2 * 1.0
        let c = engine.pattern_confidence(&engine.patterns()[1], &ledger_all_a(), &ctx);
        assert!((c - 0.6).abs() < 1e-9);
    }

    #[test]
    fn tail_mean_uses_available_samples() {
        let values: VecDeque<f64> = vec![1.0, 0.0].into();
        assert_eq!(tail_mean(&values, 10), Some(0.5));
        assert_eq!(tail_mean(&VecDeque::new(), 10), None);
    }
}
