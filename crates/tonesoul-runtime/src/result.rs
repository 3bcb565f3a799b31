//! Outcome of one `process` call

use serde::Serialize;
use tonesoul_core::{Ledger, TraceId, TraceStep};
use tonesoul_evolution::EvolutionInsights;
use tonesoul_pipeline::{CoarseIntent, Commitment, Payload, RoutingDecision, ToneFunction};

/// Always structurally complete: either every field from a finished run, or
/// a failure with an empty ledger and a message.
#[derive(Clone, Debug, Serialize)]
pub struct ProcessResult {
    pub success: bool,
    pub trace_id: TraceId,
    pub original_sentence: String,
    pub coarse_intent: Option<CoarseIntent>,
    pub tone_function: Option<ToneFunction>,
    pub routing_decision: Option<RoutingDecision>,
    pub responder_output: Option<String>,
    /// The full commitment, scope and bindings included.
    pub vow: Option<Commitment>,
    pub ledger: Vec<TraceStep>,
    pub total_latency_ms: u64,
    pub evolution_insights: Option<EvolutionInsights>,
    pub message: Option<String>,
}

impl ProcessResult {
    pub(crate) fn completed(payload: Payload, ledger: Ledger, insights: EvolutionInsights) -> Self {
        Self {
            success: true,
            trace_id: ledger.id().clone(),
            original_sentence: payload.sentence,
            coarse_intent: payload.coarse_intent,
            tone_function: payload.tone_function,
            routing_decision: payload.routing,
            responder_output: payload.response,
            vow: payload.vow,
            total_latency_ms: ledger.total_latency_ms(),
            ledger: ledger.steps().to_vec(),
            evolution_insights: Some(insights),
            message: None,
        }
    }

    pub(crate) fn failure(trace_id: TraceId, sentence: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            trace_id,
            original_sentence: sentence.to_string(),
            coarse_intent: None,
            tone_function: None,
            routing_decision: None,
            responder_output: None,
            vow: None,
            ledger: Vec::new(),
            total_latency_ms: 0,
            evolution_insights: None,
            message: Some(message.into()),
        }
    }

    /// Ledger tool identifiers in execution order.
    pub fn tools(&self) -> Vec<&str> {
        self.ledger.iter().map(|s| s.tool.as_str()).collect()
    }
}
