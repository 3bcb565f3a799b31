//! Metacognitive monitor
//!
//! Watches every ledger for decision quality: confidence, cognitive load and
//! four bias detectors drive a closed cognitive-state machine. Persistent low
//! confidence, repeated failures or degraded load trigger a reflection, which
//! mines recent records for problem patterns and makes bounded adjustments to
//! the monitor's own thresholds.

use crate::config::MetacognitionConfig;
use crate::learning::Trend;
use crate::record::{EvolutionRecord, LearningType};
use crate::ring::RingBuffer;
use crate::{mean, Context};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Instant;
use tonesoul_core::{Ledger, TraceStatus, TrustLevel};
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CognitiveState {
    Optimal,
    Learning,
    Confused,
    Overconfident,
    Uncertain,
    Degraded,
}

impl CognitiveState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Optimal => "optimal",
            Self::Learning => "learning",
            Self::Confused => "confused",
            Self::Overconfident => "overconfident",
            Self::Uncertain => "uncertain",
            Self::Degraded => "degraded",
        }
    }
}

impl std::fmt::Display for CognitiveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Five load dimensions, each in [0, 1].
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct CognitiveLoad {
    pub processing_complexity: f64,
    pub decision_difficulty: f64,
    pub information_overload: f64,
    pub context_switching_cost: f64,
    pub memory_usage: f64,
}

impl CognitiveLoad {
    pub fn baseline() -> Self {
        Self {
            processing_complexity: 0.5,
            decision_difficulty: 0.5,
            information_overload: 0.0,
            context_switching_cost: 0.0,
            memory_usage: 0.3,
        }
    }

    pub fn mean(&self) -> f64 {
        (self.processing_complexity
            + self.decision_difficulty
            + self.information_overload
            + self.context_switching_cost
            + self.memory_usage)
            / 5.0
    }

    /// Exponential moving average toward `sample`.
    pub fn blend(&mut self, sample: &CognitiveLoad, alpha: f64) {
        let ema = |old: f64, new: f64| (1.0 - alpha) * old + alpha * new;
        self.processing_complexity = ema(self.processing_complexity, sample.processing_complexity);
        self.decision_difficulty = ema(self.decision_difficulty, sample.decision_difficulty);
        self.information_overload = ema(self.information_overload, sample.information_overload);
        self.context_switching_cost = ema(self.context_switching_cost, sample.context_switching_cost);
        self.memory_usage = ema(self.memory_usage, sample.memory_usage);
    }
}

// ============================================================
// Decision analysis
// ============================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UncertaintyIssue {
    LowTrust,
    Failure,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DecisionPoint {
    pub step_index: usize,
    pub tool: String,
    pub confidence_indicator: TrustLevel,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct UncertaintyIndicator {
    pub step_index: usize,
    pub tool: String,
    pub issue: UncertaintyIssue,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DecisionAnalysis {
    pub decision_path_length: usize,
    pub decision_complexity: f64,
    pub information_sources: Vec<String>,
    pub decision_points: Vec<DecisionPoint>,
    pub uncertainty_indicators: Vec<UncertaintyIndicator>,
}

/// Decision points are routing and classification steps; uncertainty is a
/// trust-C or failed step.
pub fn analyze_decisions(ledger: &Ledger) -> DecisionAnalysis {
    let mut decision_points = Vec::new();
    let mut information_sources = Vec::new();
    let mut uncertainty_indicators = Vec::new();

    for (i, step) in ledger.steps().iter().enumerate() {
        let tool = step.tool.to_lowercase();
        if tool.contains("router") || tool.contains("classifier") {
            decision_points.push(DecisionPoint {
                step_index: i,
                tool: step.tool.clone(),
                confidence_indicator: step.trust_level,
            });
        }
        if step.is_success() {
            information_sources.push(step.tool.clone());
        }
        if step.trust_level == TrustLevel::C || step.status == TraceStatus::Fail {
            uncertainty_indicators.push(UncertaintyIndicator {
                step_index: i,
                tool: step.tool.clone(),
                issue: if step.trust_level == TrustLevel::C {
                    UncertaintyIssue::LowTrust
                } else {
                    UncertaintyIssue::Failure
                },
            });
        }
    }

    let factors = [
        (ledger.len() as f64 / 10.0).min(1.0),
        (decision_points.len() as f64 / 5.0).min(1.0),
        (uncertainty_indicators.len() as f64 / 3.0).min(1.0),
    ];

    DecisionAnalysis {
        decision_path_length: ledger.len(),
        decision_complexity: factors.iter().sum::<f64>() / factors.len() as f64,
        information_sources,
        decision_points,
        uncertainty_indicators,
    }
}

/// 0.6 x success ratio + 0.4 x mean trust weight; 0 for an empty ledger.
pub fn decision_confidence(ledger: &Ledger) -> f64 {
    if ledger.is_empty() {
        return 0.0;
    }
    (ledger.success_ratio() * 0.6 + ledger.mean_trust_weight() * 0.4).clamp(0.0, 1.0)
}

// ============================================================
// Bias detection
// ============================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum BiasKind {
    ConfirmationBias,
    OverconfidenceBias,
    AnchoringBias,
    AvailabilityBias,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Medium,
    High,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DetectedBias {
    pub bias_type: BiasKind,
    pub confidence: f64,
    pub evidence: String,
    pub impact_assessment: Impact,
}

/// Run all four detectors, in fixed order.
pub fn detect_biases(ledger: &Ledger) -> Vec<DetectedBias> {
    [
        detect_confirmation_bias(ledger),
        detect_overconfidence_bias(ledger),
        detect_anchoring_bias(ledger),
        detect_availability_bias(ledger),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// One tool used for more than 70% of steps.
fn detect_confirmation_bias(ledger: &Ledger) -> Option<DetectedBias> {
    let mut usage: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for tool in ledger.tools() {
        let count = usage.entry(tool).or_insert(0);
        if *count == 0 {
            order.push(tool);
        }
        *count += 1;
    }
    // First-seen tool wins ties.
    let (tool, max) = order
        .iter()
        .map(|t| (*t, usage[t]))
        .fold(None, |best: Option<(&str, usize)>, (t, n)| match best {
            Some((_, m)) if m >= n => best,
            _ => Some((t, n)),
        })?;
    if max as f64 / ledger.len() as f64 > 0.7 {
        return Some(DetectedBias {
            bias_type: BiasKind::ConfirmationBias,
            confidence: 0.6,
            evidence: format!("Over-reliance on {}", tool),
            impact_assessment: Impact::Medium,
        });
    }
    None
}

/// More than 30% of trust-A steps failed.
fn detect_overconfidence_bias(ledger: &Ledger) -> Option<DetectedBias> {
    let high: Vec<_> = ledger
        .steps()
        .iter()
        .filter(|s| s.trust_level == TrustLevel::A)
        .collect();
    if high.is_empty() {
        return None;
    }
    let failed = high.iter().filter(|s| !s.is_success()).count();
    if failed as f64 / high.len() as f64 > 0.3 {
        return Some(DetectedBias {
            bias_type: BiasKind::OverconfidenceBias,
            confidence: 0.7,
            evidence: format!("{} high-confidence steps failed", failed),
            impact_assessment: Impact::High,
        });
    }
    None
}

/// Later steps reuse more than 80% of the first two steps' tools.
fn detect_anchoring_bias(ledger: &Ledger) -> Option<DetectedBias> {
    let steps = ledger.steps();
    if steps.len() < 3 {
        return None;
    }
    let early: BTreeSet<&str> = steps[..2].iter().map(|s| s.tool.as_str()).collect();
    let later: BTreeSet<&str> = steps[2..].iter().map(|s| s.tool.as_str()).collect();
    let overlap = early.intersection(&later).count();
    if overlap as f64 / early.len() as f64 > 0.8 {
        return Some(DetectedBias {
            bias_type: BiasKind::AnchoringBias,
            confidence: 0.5,
            evidence: "High repetition of early processing tools".into(),
            impact_assessment: Impact::Medium,
        });
    }
    None
}

/// Reserved: ledgers alone carry no cross-request recency signal.
fn detect_availability_bias(_ledger: &Ledger) -> Option<DetectedBias> {
    None
}

// ============================================================
// Records, reflection and results
// ============================================================

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CognitiveRecord {
    pub timestamp: DateTime<Utc>,
    pub trace_id: String,
    pub cognitive_state: CognitiveState,
    pub decision_confidence: f64,
    pub cognitive_load: CognitiveLoad,
    pub biases_detected: Vec<DetectedBias>,
    pub reflection_triggered: bool,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionTrigger {
    LowConfidenceDecision,
    RepeatedErrors,
    PerformanceDegradation,
    ConflictingInformation,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    DecliningConfidence,
    HighCognitiveLoad,
    FrequentBiases,
}

impl ProblemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DecliningConfidence => "declining_confidence",
            Self::HighCognitiveLoad => "high_cognitive_load",
            Self::FrequentBiases => "frequent_biases",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ProblemPattern {
    #[serde(rename = "type")]
    pub kind: ProblemKind,
    pub severity: Severity,
    pub evidence: Value,
    pub description: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReflectionInsight {
    pub insight_type: ProblemKind,
    pub description: String,
    pub impact_assessment: BTreeMap<String, f64>,
    pub recommended_actions: Vec<String>,
    pub confidence: f64,
}

/// A reflection insight kept for later review.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetacognitiveInsight {
    pub id: String,
    pub insight_type: ProblemKind,
    pub description: String,
    pub trigger_context: Context,
    pub impact_assessment: BTreeMap<String, f64>,
    pub recommended_actions: Vec<String>,
    pub confidence_level: f64,
    pub validation_status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ImprovementSuggestion {
    pub priority: Severity,
    pub category: String,
    pub suggestion: String,
    pub expected_impact: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CognitiveAdjustment {
    pub adjustment_type: String,
    pub old_value: Value,
    pub new_value: Value,
    pub reason: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReflectionResult {
    pub reflection_id: String,
    pub timestamp: DateTime<Utc>,
    pub trigger_trace_id: String,
    pub triggers: Vec<ReflectionTrigger>,
    pub problem_patterns: Vec<ProblemPattern>,
    pub insights_generated: Vec<ReflectionInsight>,
    pub improvement_suggestions: Vec<ImprovementSuggestion>,
    pub cognitive_adjustments: Vec<CognitiveAdjustment>,
}

/// Per-call observation about the current state or load.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StateInsight {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub confidence: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct MonitorResult {
    pub cognitive_state: CognitiveState,
    pub decision_confidence: f64,
    pub decision_complexity: f64,
    pub cognitive_load: CognitiveLoad,
    pub biases_detected: Vec<DetectedBias>,
    pub reflection_performed: bool,
    pub reflection_results: Option<ReflectionResult>,
    pub metacognitive_insights: Vec<StateInsight>,
    pub processing_time_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct CognitiveSummary {
    pub current_state: CognitiveState,
    pub recent_confidence_trend: Trend,
    pub cognitive_load_summary: CognitiveLoad,
    pub bias_frequency: f64,
    pub reflection_frequency: usize,
    pub total_insights_generated: usize,
    pub system_self_awareness_score: f64,
    pub confidence_threshold: f64,
    pub reflection_cooldown_secs: i64,
}

// ============================================================
// Monitor
// ============================================================

pub struct MetacognitiveMonitor {
    config: MetacognitionConfig,
    state: CognitiveState,
    history: RingBuffer<CognitiveRecord>,
    confidence_history: RingBuffer<f64>,
    load: CognitiveLoad,
    insights: RingBuffer<MetacognitiveInsight>,
    insights_total: usize,
    records: RingBuffer<EvolutionRecord>,
    confidence_threshold: f64,
    reflection_cooldown: Duration,
    last_reflection: Option<DateTime<Utc>>,
}

impl MetacognitiveMonitor {
    pub fn new(config: MetacognitionConfig) -> Self {
        Self {
            state: CognitiveState::Optimal,
            history: RingBuffer::new(config.history_capacity),
            confidence_history: RingBuffer::new(config.confidence_history_capacity),
            load: CognitiveLoad::baseline(),
            insights: RingBuffer::new(config.insight_capacity),
            insights_total: 0,
            records: RingBuffer::new(config.record_capacity),
            confidence_threshold: config.confidence_threshold,
            reflection_cooldown: Duration::seconds(config.reflection_cooldown_secs),
            last_reflection: None,
            config,
        }
    }

    pub fn current_state(&self) -> CognitiveState {
        self.state
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    pub fn reflection_cooldown(&self) -> Duration {
        self.reflection_cooldown
    }

    pub fn load_metrics(&self) -> &CognitiveLoad {
        &self.load
    }

    pub fn history(&self) -> &RingBuffer<CognitiveRecord> {
        &self.history
    }

    pub fn insights(&self) -> &RingBuffer<MetacognitiveInsight> {
        &self.insights
    }

    pub fn records(&self) -> &RingBuffer<EvolutionRecord> {
        &self.records
    }

    pub fn monitor(&mut self, ledger: &Ledger, context: &Context) -> MonitorResult {
        self.monitor_at(ledger, context, Utc::now())
    }

    pub fn monitor_at(&mut self, ledger: &Ledger, context: &Context, now: DateTime<Utc>) -> MonitorResult {
        let started = Instant::now();

        let analysis = analyze_decisions(ledger);
        let load = self.assess_load(ledger, context);
        let biases = detect_biases(ledger);
        let confidence = decision_confidence(ledger);
        self.confidence_history.push(confidence);

        let state = next_state(biases.as_slice(), confidence, load.mean());
        if state != self.state {
            debug!(from = %self.state, to = %state, "Cognitive state changed");
        }
        self.state = state;

        let triggers = self.reflection_triggers(ledger, &analysis, now);
        let reflect = !triggers.is_empty();

        let record = CognitiveRecord {
            timestamp: now,
            trace_id: ledger.id().to_string(),
            cognitive_state: state,
            decision_confidence: confidence,
            cognitive_load: load,
            biases_detected: biases.clone(),
            reflection_triggered: reflect,
        };
        let observations = state_insights(&record);
        self.history.push(record);

        let reflection = if reflect {
            Some(self.reflect(ledger, context, triggers, now))
        } else {
            None
        };

        MonitorResult {
            cognitive_state: state,
            decision_confidence: confidence,
            decision_complexity: analysis.decision_complexity,
            cognitive_load: load,
            biases_detected: biases,
            reflection_performed: reflect,
            reflection_results: reflection,
            metacognitive_insights: observations,
            processing_time_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Per-call load vector; also folds it into the persistent EMA.
    fn assess_load(&mut self, ledger: &Ledger, context: &Context) -> CognitiveLoad {
        let steps = ledger.len();
        let denom = steps.max(1) as f64;

        let difficult = ledger
            .steps()
            .iter()
            .filter(|s| !s.is_success() || s.trust_level == TrustLevel::C)
            .count();
        let switches = ledger
            .steps()
            .windows(2)
            .filter(|w| w[0].tool != w[1].tool)
            .count();
        let context_size = serde_json::to_string(context).map(|s| s.len()).unwrap_or(0);

        let sample = CognitiveLoad {
            processing_complexity: (steps as f64 / 15.0).min(1.0),
            decision_difficulty: (difficult as f64 / denom * 2.0).min(1.0),
            information_overload: (context_size as f64 / 1000.0).min(1.0),
            context_switching_cost: (switches as f64 / denom * 2.0).min(1.0),
            memory_usage: (self.history.len() as f64 / self.config.history_capacity.max(1) as f64)
                .min(1.0),
        };
        self.load.blend(&sample, self.config.ema_alpha);
        sample
    }

    fn reflection_triggers(
        &self,
        ledger: &Ledger,
        analysis: &DecisionAnalysis,
        now: DateTime<Utc>,
    ) -> Vec<ReflectionTrigger> {
        if let Some(last) = self.last_reflection {
            if now - last < self.reflection_cooldown {
                return Vec::new();
            }
        }

        let mut triggers = Vec::new();
        if self.confidence_history.len() >= 3
            && self
                .confidence_history
                .recent(3)
                .all(|c| *c < self.confidence_threshold)
        {
            triggers.push(ReflectionTrigger::LowConfidenceDecision);
        }
        if ledger.failed_steps() >= self.config.error_pattern_threshold {
            triggers.push(ReflectionTrigger::RepeatedErrors);
        }
        if self.state == CognitiveState::Degraded {
            triggers.push(ReflectionTrigger::PerformanceDegradation);
        }
        if analysis.uncertainty_indicators.len() >= 2 {
            triggers.push(ReflectionTrigger::ConflictingInformation);
        }
        triggers
    }

    fn reflect(
        &mut self,
        ledger: &Ledger,
        context: &Context,
        triggers: Vec<ReflectionTrigger>,
        now: DateTime<Utc>,
    ) -> ReflectionResult {
        self.last_reflection = Some(now);

        let recent: Vec<&CognitiveRecord> = self.history.recent(self.config.reflection_window).collect();
        let patterns = identify_problem_patterns(&recent);

        let mut generated = Vec::new();
        for pattern in &patterns {
            let insight = insight_for(pattern.kind);
            self.insights.push(MetacognitiveInsight {
                id: uuid::Uuid::new_v4().to_string(),
                insight_type: insight.insight_type,
                description: insight.description.clone(),
                trigger_context: context.clone(),
                impact_assessment: insight.impact_assessment.clone(),
                recommended_actions: insight.recommended_actions.clone(),
                confidence_level: insight.confidence,
                validation_status: "pending".into(),
                created_at: now,
            });
            self.insights_total += 1;
            generated.push(insight);
        }

        let suggestions = patterns.iter().map(improvement_for).collect();
        let adjustments = self.adjust(&patterns, ledger, context, now);

        info!(
            trace_id = %ledger.id(),
            triggers = ?triggers,
            patterns = patterns.len(),
            adjustments = adjustments.len(),
            "Reflection performed"
        );

        ReflectionResult {
            reflection_id: uuid::Uuid::new_v4().to_string(),
            timestamp: now,
            trigger_trace_id: ledger.id().to_string(),
            triggers,
            problem_patterns: patterns,
            insights_generated: generated,
            improvement_suggestions: suggestions,
            cognitive_adjustments: adjustments,
        }
    }

    /// Bounded self-adjustment: the threshold only goes down to its floor and
    /// the cooldown only up to its ceiling.
    fn adjust(
        &mut self,
        patterns: &[ProblemPattern],
        ledger: &Ledger,
        context: &Context,
        now: DateTime<Utc>,
    ) -> Vec<CognitiveAdjustment> {
        let mut adjustments = Vec::new();
        for pattern in patterns {
            let adjustment = match pattern.kind {
                ProblemKind::DecliningConfidence => {
                    let old = self.confidence_threshold;
                    let new = (old - self.config.threshold_step).max(self.config.threshold_floor);
                    self.confidence_threshold = new;
                    CognitiveAdjustment {
                        adjustment_type: "confidence_threshold".into(),
                        old_value: json!(old),
                        new_value: json!(new),
                        reason: "Adapting to declining confidence pattern".into(),
                    }
                }
                ProblemKind::HighCognitiveLoad => {
                    let old = self.reflection_cooldown;
                    let new = (old + Duration::seconds(self.config.cooldown_step_secs))
                        .min(Duration::seconds(self.config.cooldown_ceiling_secs));
                    self.reflection_cooldown = new;
                    CognitiveAdjustment {
                        adjustment_type: "reflection_cooldown".into(),
                        old_value: json!(old.num_seconds()),
                        new_value: json!(new.num_seconds()),
                        reason: "Reducing reflection frequency to manage cognitive load".into(),
                    }
                }
                ProblemKind::FrequentBiases => continue,
            };

            info!(
                adjustment = %adjustment.adjustment_type,
                old = %adjustment.old_value,
                new = %adjustment.new_value,
                "Metacognitive self-adjustment"
            );
            self.records.push(EvolutionRecord::integrated(
                LearningType::MetacognitiveImprovement,
                json!({ adjustment.adjustment_type.as_str(): adjustment.old_value }),
                json!({ adjustment.adjustment_type.as_str(): adjustment.new_value }),
                adjustment.reason.clone(),
                ledger.id().to_string(),
                context.clone(),
                now,
            ));
            adjustments.push(adjustment);
        }
        adjustments
    }

    pub fn summary(&self) -> CognitiveSummary {
        let recent: Vec<&CognitiveRecord> = self.history.recent(20).collect();
        let bias_frequency = if recent.is_empty() {
            0.0
        } else {
            recent.iter().map(|r| r.biases_detected.len()).sum::<usize>() as f64 / recent.len() as f64
        };

        CognitiveSummary {
            current_state: self.state,
            recent_confidence_trend: self.confidence_trend(),
            cognitive_load_summary: self.load,
            bias_frequency,
            reflection_frequency: recent.iter().filter(|r| r.reflection_triggered).count(),
            total_insights_generated: self.insights_total,
            system_self_awareness_score: self.self_awareness_score(),
            confidence_threshold: self.confidence_threshold,
            reflection_cooldown_secs: self.reflection_cooldown.num_seconds(),
        }
    }

    /// Newest five readings against the five before them (or themselves when
    /// fewer than ten exist), with a 10% dead band.
    pub fn confidence_trend(&self) -> Trend {
        let n = self.confidence_history.len();
        if n < 5 {
            return Trend::InsufficientData;
        }
        let recent = mean(self.confidence_history.recent(5).copied());
        let older = if n >= 10 {
            mean(self.confidence_history.recent(10).take(5).copied())
        } else {
            recent
        };
        if recent > older * 1.1 {
            Trend::Improving
        } else if recent < older * 0.9 {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }

    /// Mean of the available factors: reflection rate near 0.2, insight count,
    /// and state stability over the last ten records.
    pub fn self_awareness_score(&self) -> f64 {
        let mut factors = Vec::new();

        if !self.history.is_empty() {
            let reflected = self.history.iter().filter(|r| r.reflection_triggered).count();
            let rate = reflected as f64 / self.history.len() as f64;
            factors.push(if (0.1..=0.3).contains(&rate) {
                1.0
            } else {
                (1.0 - (rate - 0.2).abs() * 5.0).max(0.0)
            });
        }

        factors.push((self.insights_total as f64 / 10.0).min(1.0));

        if self.history.len() >= 10 {
            let distinct: BTreeSet<&str> = self
                .history
                .recent(10)
                .map(|r| r.cognitive_state.as_str())
                .collect();
            factors.push(1.0 - (distinct.len() as f64 - 1.0) / 9.0);
        }

        mean(factors.into_iter()).clamp(0.0, 1.0)
    }
}

impl Default for MetacognitiveMonitor {
    fn default() -> Self {
        Self::new(MetacognitionConfig::default())
    }
}

/// State transition, evaluated in fixed priority order.
pub fn next_state(biases: &[DetectedBias], confidence: f64, mean_load: f64) -> CognitiveState {
    let overconfident = biases
        .iter()
        .any(|b| b.bias_type == BiasKind::OverconfidenceBias);
    if biases.len() >= 2 {
        CognitiveState::Confused
    } else if confidence < 0.3 {
        CognitiveState::Uncertain
    } else if confidence > 0.9 && overconfident {
        CognitiveState::Overconfident
    } else if mean_load > 0.8 {
        CognitiveState::Degraded
    } else if confidence < 0.7 && mean_load > 0.6 {
        CognitiveState::Learning
    } else {
        CognitiveState::Optimal
    }
}

fn identify_problem_patterns(history: &[&CognitiveRecord]) -> Vec<ProblemPattern> {
    let mut patterns = Vec::new();
    if history.is_empty() {
        return patterns;
    }

    let confidences: Vec<f64> = history.iter().map(|r| r.decision_confidence).collect();
    if confidences.len() >= 5 {
        let last5 = &confidences[confidences.len() - 5..];
        if last5.windows(2).all(|w| w[0] > w[1]) {
            patterns.push(ProblemPattern {
                kind: ProblemKind::DecliningConfidence,
                severity: Severity::High,
                evidence: json!(last5),
                description: "Decision confidence has been consistently declining".into(),
            });
        }
    }

    let total = history.len() as f64;
    let high_load = history
        .iter()
        .filter(|r| r.cognitive_load.processing_complexity > 0.8)
        .count() as f64;
    if high_load / total > 0.6 {
        patterns.push(ProblemPattern {
            kind: ProblemKind::HighCognitiveLoad,
            severity: Severity::Medium,
            evidence: json!({ "high_load_ratio": high_load / total }),
            description: "Cognitive load has been consistently high".into(),
        });
    }

    let bias_count = history.iter().map(|r| r.biases_detected.len()).sum::<usize>() as f64;
    if bias_count > total * 0.5 {
        patterns.push(ProblemPattern {
            kind: ProblemKind::FrequentBiases,
            severity: Severity::Medium,
            evidence: json!({ "bias_frequency": bias_count / total }),
            description: "Cognitive biases are occurring frequently".into(),
        });
    }
    patterns
}

fn insight_for(kind: ProblemKind) -> ReflectionInsight {
    let (description, impact, actions, confidence): (&str, &[(&str, f64)], [&str; 3], f64) = match kind {
        ProblemKind::DecliningConfidence => (
            "System confidence is declining, possibly due to encountering unfamiliar scenarios",
            &[("decision_quality", -0.3), ("user_satisfaction", -0.2)],
            ["increase_learning_rate", "seek_additional_validation", "expand_knowledge_base"],
            0.8,
        ),
        ProblemKind::HighCognitiveLoad => (
            "Cognitive load is consistently high, indicating processing inefficiency",
            &[("response_time", -0.4), ("accuracy", -0.1)],
            ["optimize_processing_pipeline", "implement_caching", "simplify_decision_trees"],
            0.7,
        ),
        ProblemKind::FrequentBiases => (
            "Cognitive biases are occurring frequently, affecting decision quality",
            &[("decision_accuracy", -0.3), ("fairness", -0.4)],
            [
                "implement_bias_correction",
                "diversify_information_sources",
                "add_devil_advocate_mechanism",
            ],
            0.75,
        ),
    };
    ReflectionInsight {
        insight_type: kind,
        description: description.into(),
        impact_assessment: impact.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        recommended_actions: actions.iter().map(|a| a.to_string()).collect(),
        confidence,
    }
}

fn improvement_for(pattern: &ProblemPattern) -> ImprovementSuggestion {
    match pattern.severity {
        Severity::High => ImprovementSuggestion {
            priority: Severity::High,
            category: "cognitive_optimization".into(),
            suggestion: format!("Address {} immediately", pattern.kind.as_str()),
            expected_impact: "significant_improvement".into(),
        },
        Severity::Medium => ImprovementSuggestion {
            priority: Severity::Medium,
            category: "performance_tuning".into(),
            suggestion: format!("Monitor and gradually improve {}", pattern.kind.as_str()),
            expected_impact: "moderate_improvement".into(),
        },
    }
}

fn state_insights(record: &CognitiveRecord) -> Vec<StateInsight> {
    let mut insights = Vec::new();
    match record.cognitive_state {
        CognitiveState::Confused => insights.push(StateInsight {
            kind: "state_awareness".into(),
            message: "System is in a confused state, consider simplifying the current task".into(),
            confidence: 0.8,
        }),
        CognitiveState::Overconfident => insights.push(StateInsight {
            kind: "confidence_calibration".into(),
            message: "System may be overconfident, recommend additional validation".into(),
            confidence: 0.7,
        }),
        _ => {}
    }
    if record.cognitive_load.mean() > 0.8 {
        insights.push(StateInsight {
            kind: "load_management".into(),
            message: "High cognitive load detected, consider breaking down the task".into(),
            confidence: 0.9,
        });
    }
    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonesoul_core::TraceStep;

    fn ledger(steps: Vec<TraceStep>) -> Ledger {
        let mut ledger = Ledger::new(None);
        for step in steps {
            ledger.append(step).unwrap();
        }
        ledger
    }

    #[test]
    fn transition_priority_order() {
        let bias = |kind| DetectedBias {
            bias_type: kind,
            confidence: 0.5,
            evidence: String::new(),
            impact_assessment: Impact::Medium,
        };
        let two = [bias(BiasKind::ConfirmationBias), bias(BiasKind::OverconfidenceBias)];
        assert_eq!(next_state(&two, 0.1, 0.9), CognitiveState::Confused);
        assert_eq!(next_state(&[], 0.2, 0.9), CognitiveState::Uncertain);
        let over = [bias(BiasKind::OverconfidenceBias)];
        assert_eq!(next_state(&over, 0.95, 0.9), CognitiveState::Overconfident);
        assert_eq!(next_state(&[], 0.95, 0.85), CognitiveState::Degraded);
        assert_eq!(next_state(&[], 0.5, 0.65), CognitiveState::Learning);
        assert_eq!(next_state(&[], 0.5, 0.5), CognitiveState::Optimal);
    }

    #[test]
    fn anchoring_needs_reuse_of_both_early_tools() {
        let l = ledger(vec![
            TraceStep::success("a", "x", TrustLevel::B),
            TraceStep::success("b", "x", TrustLevel::B),
            TraceStep::success("a", "x", TrustLevel::B),
            TraceStep::success("b", "x", TrustLevel::B),
        ]);
        assert!(detect_anchoring_bias(&l).is_some());

        let l = ledger(vec![
            TraceStep::success("a", "x", TrustLevel::B),
            TraceStep::success("b", "x", TrustLevel::B),
            TraceStep::success("a", "x", TrustLevel::B),
        ]);
        assert!(detect_anchoring_bias(&l).is_none());
    }

    #[test]
    fn decision_points_are_router_and_classifier_steps() {
        let l = ledger(vec![
            TraceStep::success("core.tone_bridge.v1", "x", TrustLevel::C),
            TraceStep::success("core.tone_classifier.v1", "x", TrustLevel::C),
            TraceStep::success("core.tone_router.v1", "x", TrustLevel::B),
        ]);
        let analysis = analyze_decisions(&l);
        assert_eq!(analysis.decision_points.len(), 2);
        assert_eq!(analysis.uncertainty_indicators.len(), 2);
        assert_eq!(analysis.information_sources.len(), 3);
    }
}
