//! Evolution records: the audit trail of every state mutation the
//! self-monitoring engines perform

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Category of a learning pattern or an evolution record.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LearningType {
    PatternRecognition,
    FeedbackAdaptation,
    KnowledgeExpansion,
    EmotionalCalibration,
    MetacognitiveImprovement,
}

impl LearningType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PatternRecognition => "pattern_recognition",
            Self::FeedbackAdaptation => "feedback_adaptation",
            Self::KnowledgeExpansion => "knowledge_expansion",
            Self::EmotionalCalibration => "emotional_calibration",
            Self::MetacognitiveImprovement => "metacognitive_improvement",
        }
    }
}

impl std::fmt::Display for LearningType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionStatus {
    Learning,
    Adapting,
    Validating,
    Integrated,
    Rejected,
    Archived,
}

/// One state mutation, with enough before-state to roll it back.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EvolutionRecord {
    pub id: String,
    pub evolution_type: LearningType,
    pub status: EvolutionStatus,
    pub before_state: Value,
    pub after_state: Value,
    pub change_description: String,
    pub trigger_source_trace_id: String,
    pub trigger_context: Map<String, Value>,
    pub validation_criteria: Vec<String>,
    pub initiated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rollback_data: Option<Value>,
}

impl EvolutionRecord {
    /// A completed, integrated mutation. The before state doubles as the
    /// rollback payload.
    pub fn integrated(
        evolution_type: LearningType,
        before_state: Value,
        after_state: Value,
        change_description: impl Into<String>,
        trigger_source_trace_id: impl Into<String>,
        trigger_context: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            evolution_type,
            status: EvolutionStatus::Integrated,
            rollback_data: Some(before_state.clone()),
            before_state,
            after_state,
            change_description: change_description.into(),
            trigger_source_trace_id: trigger_source_trace_id.into(),
            trigger_context,
            validation_criteria: vec![
                "performance_improvement".into(),
                "consistency_check".into(),
                "safety_validation".into(),
            ],
            initiated_at: now,
            completed_at: Some(now),
        }
    }
}
