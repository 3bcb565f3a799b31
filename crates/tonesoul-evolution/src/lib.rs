//! ToneSoul Evolution - adaptive learning, metacognition and knowledge growth
//!
//! Three engines that consume finished ledgers and mutate long-lived process
//! state. None of them fails: an unusable ledger yields a zero-effect result.

pub mod config;
pub mod knowledge;
pub mod learning;
pub mod metacognition;
pub mod record;
pub mod ring;
pub mod state;

pub use config::{KnowledgeConfig, LearningConfig, MetacognitionConfig};
pub use knowledge::{EvolutionResult, KnowledgeGraph, KnowledgeNode, KnowledgeSummary};
pub use learning::{
    AdaptiveLearningEngine, LearningInsights, LearningPattern, LearningResult, SystemEvolutionState,
    Trend,
};
pub use metacognition::{
    CognitiveState, CognitiveSummary, MetacognitiveInsight, MetacognitiveMonitor, MonitorResult,
};
pub use record::{EvolutionRecord, EvolutionStatus, LearningType};
pub use ring::RingBuffer;
pub use state::{EngineState, EvolutionInsights, ReflectionReport};

/// Free-form key/value context that accompanies a ledger into the engines.
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Arithmetic mean; 0.0 when there are no values.
pub(crate) fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}
