//! ToneSoulRuntime - the single entry point surfaces call into
//!
//! Owns the pipeline and the shared engine state. A request runs the
//! pipeline synchronously, then feeds the finished ledger to the three
//! engines under their own locks.

use crate::config::ToneSoulConfig;
use crate::result::ProcessResult;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tonesoul_core::{Error, Ledger, Result, TraceId};
use tonesoul_evolution::learning::{PatternUsage, SurfacedAdaptation};
use tonesoul_evolution::{
    CognitiveState, CognitiveSummary, Context, EngineState, KnowledgeSummary, LearningInsights,
    ReflectionReport,
};
use tonesoul_pipeline::{
    create_default_registry, IntentPipeline, Payload, RoutingPolicy, ToneClassifier, ToneFunction,
    ToneRouter, VowManager, VowSummary,
};
use tracing::{debug, info, warn};

pub const SYSTEM_VERSION: &str = "1.0.0-evolution";
pub const EVOLUTION_MODULES: [&str; 3] = ["adaptive_learning", "metacognitive", "knowledge_evolution"];

/// Registered responders and the live routing table.
#[derive(Clone, Debug, Serialize)]
pub struct ModuleListing {
    pub available_modules: Vec<String>,
    pub routing_table: BTreeMap<String, String>,
    pub evolution_modules: Vec<String>,
}

/// Full snapshot of all three engines.
#[derive(Clone, Debug, Serialize)]
pub struct SystemStatus {
    pub adaptive_learning: LearningInsights,
    pub metacognitive: CognitiveSummary,
    pub knowledge_evolution: KnowledgeSummary,
    pub system_version: String,
    pub evolution_enabled: bool,
}

/// Condensed view of where the system could improve next.
#[derive(Clone, Debug, Serialize)]
pub struct EvolutionOverview {
    pub learning_patterns: Vec<PatternUsage>,
    pub cognitive_state: CognitiveState,
    pub knowledge_health: f64,
    pub self_awareness_score: f64,
    pub total_knowledge_nodes: usize,
    pub recent_adaptations: Vec<SurfacedAdaptation>,
    pub evolution_opportunities: Vec<String>,
}

pub struct ToneSoulRuntime {
    config: ToneSoulConfig,
    pipeline: IntentPipeline,
    engines: EngineState,
    last_tone: Mutex<Option<ToneFunction>>,
}

impl ToneSoulRuntime {
    pub fn new(config: ToneSoulConfig) -> Self {
        let responders = create_default_registry().with_apology(config.pipeline.fallback_apology.clone());
        let pipeline = IntentPipeline::new(
            ToneClassifier::new(),
            Arc::new(ToneRouter::new()),
            responders,
            Arc::new(VowManager::new()),
        );
        let engines = EngineState::new(
            config.learning.clone(),
            config.metacognition.clone(),
            config.knowledge.clone(),
        );
        info!(
            responders = pipeline.responders().list().len(),
            max_sentence_chars = config.pipeline.max_sentence_chars,
            "Runtime initialized"
        );
        Self {
            config,
            pipeline,
            engines,
            last_tone: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ToneSoulConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &IntentPipeline {
        &self.pipeline
    }

    pub fn engines(&self) -> &EngineState {
        &self.engines
    }

    pub fn vows(&self) -> &Arc<VowManager> {
        self.pipeline.vows()
    }

    // ============================================================
    // Processing
    // ============================================================

    pub async fn process(&self, sentence: &str, trace_id: Option<TraceId>) -> ProcessResult {
        self.process_with_feedback(sentence, trace_id, None).await
    }

    /// Run the pipeline and all three engines. `user_satisfaction` defaults
    /// to the configured score when the caller has none.
    pub async fn process_with_feedback(
        &self,
        sentence: &str,
        trace_id: Option<TraceId>,
        user_satisfaction: Option<f64>,
    ) -> ProcessResult {
        let start = Instant::now();
        let trace_id = trace_id.unwrap_or_else(TraceId::generate);

        if let Err(e) = self.validate(sentence) {
            warn!(trace_id = %trace_id, error = %e, "Rejected input");
            return ProcessResult::failure(trace_id, sentence, e.to_string());
        }

        let mut payload = match self.pipeline.run(sentence, Some(trace_id.clone())) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(trace_id = %trace_id, error = %e, "Pipeline failed");
                return ProcessResult::failure(trace_id, sentence, e.to_string());
            }
        };
        let Some(ledger) = payload.ledger.take() else {
            let e = Error::missing_ledger("runtime");
            warn!(trace_id = %trace_id, error = %e, "Pipeline returned no ledger");
            return ProcessResult::failure(trace_id, sentence, e.to_string());
        };

        let satisfaction = user_satisfaction
            .unwrap_or(self.config.pipeline.default_user_satisfaction)
            .clamp(0.0, 1.0);
        let context = self.evolution_context(&payload, &ledger, satisfaction).await;
        let insights = self.engines.observe(&ledger, &context).await;

        debug!(
            trace_id = %trace_id,
            tone = ?payload.tone_function,
            steps = ledger.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request processed"
        );
        ProcessResult::completed(payload, ledger, insights)
    }

    fn validate(&self, sentence: &str) -> Result<()> {
        let chars = sentence.chars().count();
        let max = self.config.pipeline.max_sentence_chars;
        if chars > max {
            return Err(Error::validation(format!(
                "sentence is {} characters, limit is {}",
                chars, max
            )));
        }
        Ok(())
    }

    /// Signals the engines key on. Flags are only present when they hold,
    /// since learning patterns trigger on key presence.
    async fn evolution_context(&self, payload: &Payload, ledger: &Ledger, satisfaction: f64) -> Context {
        let tone = payload.tone_function.unwrap_or(ToneFunction::Unknown);
        let intent = payload.coarse_intent.map(|i| i.as_str()).unwrap_or("unknown");
        let response_time = ledger.total_latency_ms() as f64;

        let mut context = Context::new();
        context.insert("original_sentence".into(), json!(payload.sentence));
        context.insert("intent_type".into(), json!(intent));
        context.insert("tone_function".into(), json!(tone.as_str()));
        context.insert("processing_success".into(), json!(true));
        context.insert("user_satisfaction".into(), json!(satisfaction));
        context.insert("response_time".into(), json!(response_time));
        context.insert(
            "feedback_signals".into(),
            json!({ "response_time": response_time, "user_satisfaction": satisfaction }),
        );

        let previous = self.last_tone.lock().await.replace(tone);
        if previous == Some(tone) {
            context.insert("repeated_query_type".into(), json!(true));
        }
        if response_time > self.config.learning.response_time_ceiling_ms {
            context.insert("response_time_high".into(), json!(true));
        }
        if satisfaction < self.config.pipeline.low_satisfaction_threshold {
            context.insert("user_satisfaction_low".into(), json!(true));
        }
        context
    }

    // ============================================================
    // Engine snapshots
    // ============================================================

    pub async fn get_learning_insights(&self) -> LearningInsights {
        self.engines.learning_insights().await
    }

    pub async fn get_cognitive_summary(&self) -> CognitiveSummary {
        self.engines.cognitive_summary().await
    }

    pub async fn get_knowledge_summary(&self) -> KnowledgeSummary {
        self.engines.knowledge_summary().await
    }

    pub async fn trigger_reflection(&self, context: Option<Context>) -> Result<ReflectionReport> {
        let report = self.engines.trigger_reflection(context).await?;
        info!(
            performed = report.reflection_triggered,
            state = %report.reflection_results.cognitive_state,
            "Manual reflection"
        );
        Ok(report)
    }

    pub async fn status(&self) -> SystemStatus {
        SystemStatus {
            adaptive_learning: self.get_learning_insights().await,
            metacognitive: self.get_cognitive_summary().await,
            knowledge_evolution: self.get_knowledge_summary().await,
            system_version: SYSTEM_VERSION.to_string(),
            evolution_enabled: true,
        }
    }

    pub async fn evolution_overview(&self) -> EvolutionOverview {
        let learning = self.get_learning_insights().await;
        let cognitive = self.get_cognitive_summary().await;
        let knowledge = self.get_knowledge_summary().await;
        EvolutionOverview {
            learning_patterns: learning.most_active_patterns,
            cognitive_state: cognitive.current_state,
            knowledge_health: knowledge.knowledge_health_score,
            self_awareness_score: cognitive.system_self_awareness_score,
            total_knowledge_nodes: knowledge.total_knowledge_nodes,
            recent_adaptations: learning.adaptation_history,
            evolution_opportunities: knowledge.evolution_opportunities,
        }
    }

    // ============================================================
    // Routing and vows
    // ============================================================

    pub fn list_modules(&self) -> ModuleListing {
        ModuleListing {
            available_modules: self
                .pipeline
                .responders()
                .list()
                .into_iter()
                .map(String::from)
                .collect(),
            routing_table: self.pipeline.router().available_routes(),
            evolution_modules: EVOLUTION_MODULES.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Replace the route for one tone function; returns the previous policy.
    pub fn rebind_route(&self, tone: ToneFunction, policy: RoutingPolicy) -> Option<RoutingPolicy> {
        self.pipeline.router().rebind(tone, policy)
    }

    pub fn list_vows(&self) -> Vec<VowSummary> {
        let now = chrono::Utc::now();
        self.vows().list().iter().map(|c| c.summary_at(now)).collect()
    }

    pub fn fulfill_vow(&self, id: &str) -> Result<VowSummary> {
        let commitment = self.vows().fulfill(id)?;
        info!(vow = %id, "Commitment fulfilled");
        Ok(commitment.summary_at(chrono::Utc::now()))
    }

    pub fn withdraw_vow(&self, id: &str) -> Result<VowSummary> {
        let commitment = self.vows().withdraw(id)?;
        info!(vow = %id, "Commitment withdrawn");
        Ok(commitment.summary_at(chrono::Utc::now()))
    }
}

impl Default for ToneSoulRuntime {
    fn default() -> Self {
        Self::new(ToneSoulConfig::default())
    }
}
