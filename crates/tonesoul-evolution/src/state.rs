//! Shared engine state
//!
//! Each engine sits behind its own async mutex, so one request's learning
//! update never blocks another's knowledge read for longer than one engine
//! call. Summaries are built under the lock and returned as owned snapshots.

use crate::config::{KnowledgeConfig, LearningConfig, MetacognitionConfig};
use crate::knowledge::{EvolutionResult, KnowledgeGraph, KnowledgeSummary};
use crate::learning::{AdaptiveLearningEngine, LearningInsights, LearningResult};
use crate::metacognition::{CognitiveSummary, MetacognitiveMonitor, MonitorResult};
use crate::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;
use tonesoul_core::{Ledger, Result, TraceStep, TrustLevel};

pub const REFLECTION_TOOL: &str = "manual_reflection_trigger";

/// Per-request output of all three engines.
#[derive(Clone, Debug, Serialize)]
pub struct EvolutionInsights {
    pub adaptive_learning: LearningResult,
    pub metacognitive_analysis: MonitorResult,
    pub knowledge_evolution: EvolutionResult,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReflectionReport {
    pub reflection_triggered: bool,
    pub reflection_results: MonitorResult,
    pub timestamp: DateTime<Utc>,
}

pub struct EngineState {
    learning: Mutex<AdaptiveLearningEngine>,
    metacognition: Mutex<MetacognitiveMonitor>,
    knowledge: Mutex<KnowledgeGraph>,
}

impl EngineState {
    pub fn new(
        learning: LearningConfig,
        metacognition: MetacognitionConfig,
        knowledge: KnowledgeConfig,
    ) -> Self {
        Self {
            learning: Mutex::new(AdaptiveLearningEngine::new(learning)),
            metacognition: Mutex::new(MetacognitiveMonitor::new(metacognition)),
            knowledge: Mutex::new(KnowledgeGraph::new(knowledge)),
        }
    }

    pub fn learning(&self) -> &Mutex<AdaptiveLearningEngine> {
        &self.learning
    }

    pub fn metacognition(&self) -> &Mutex<MetacognitiveMonitor> {
        &self.metacognition
    }

    pub fn knowledge(&self) -> &Mutex<KnowledgeGraph> {
        &self.knowledge
    }

    /// Feed one completed ledger to every engine. The engines only read the
    /// ledger, so their order does not matter.
    pub async fn observe(&self, ledger: &Ledger, context: &Context) -> EvolutionInsights {
        let adaptive_learning = self.learning.lock().await.process_interaction(ledger, context);
        let metacognitive_analysis = self.metacognition.lock().await.monitor(ledger, context);
        let knowledge_evolution = self.knowledge.lock().await.process_evolution(ledger, context);
        EvolutionInsights {
            adaptive_learning,
            metacognitive_analysis,
            knowledge_evolution,
        }
    }

    pub async fn learning_insights(&self) -> LearningInsights {
        self.learning.lock().await.insights()
    }

    pub async fn cognitive_summary(&self) -> CognitiveSummary {
        self.metacognition.lock().await.summary()
    }

    pub async fn knowledge_summary(&self) -> KnowledgeSummary {
        self.knowledge.lock().await.summary()
    }

    /// One monitor cycle over a synthetic single-step ledger.
    pub async fn trigger_reflection(&self, extra: Option<Context>) -> Result<ReflectionReport> {
        let now = Utc::now();
        let mut ledger = Ledger::new(None);
        ledger.append(
            TraceStep::success(REFLECTION_TOOL, "Manual reflection triggered by user", TrustLevel::A).at(now),
        )?;

        let mut context = Context::new();
        context.insert("trigger_type".into(), json!("manual"));
        context.insert("timestamp".into(), json!(now.to_rfc3339()));
        context.insert("purpose".into(), json!("system_health_check"));
        if let Some(extra) = extra {
            context.extend(extra);
        }

        let result = self.metacognition.lock().await.monitor_at(&ledger, &context, now);
        Ok(ReflectionReport {
            reflection_triggered: result.reflection_performed,
            reflection_results: result,
            timestamp: now,
        })
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new(
            LearningConfig::default(),
            MetacognitionConfig::default(),
            KnowledgeConfig::default(),
        )
    }
}
