//! Bridge: entry stage, coarse intent from syntax alone

use crate::keywords::{self, REQUEST_MARKERS};
use crate::payload::Payload;
use crate::tone::CoarseIntent;
use std::time::Instant;
use tonesoul_core::{digest_input, Ledger, Result, TraceId, TraceStep, TrustLevel};
use tracing::debug;

pub const BRIDGE_TOOL: &str = "core.tone_bridge.v1";

#[derive(Clone, Debug, Default)]
pub struct ToneBridge;

impl ToneBridge {
    pub fn new() -> Self {
        Self
    }

    /// Trailing question mark, then request markers, else statement.
    pub fn coarse_intent(sentence: &str) -> CoarseIntent {
        let trimmed = sentence.trim_end();
        if trimmed.ends_with('?') || trimmed.ends_with('？') {
            CoarseIntent::Question
        } else if keywords::contains_any(trimmed, REQUEST_MARKERS) {
            CoarseIntent::Request
        } else {
            CoarseIntent::Statement
        }
    }

    /// Open a ledger for `sentence` and record the coarse intent.
    pub fn analyze(&self, sentence: &str, trace_id: Option<TraceId>) -> Result<Payload> {
        let start = Instant::now();
        let intent = Self::coarse_intent(sentence);
        let evidence = format!("Analyzed sentence. Detected intent: {}.", intent);

        let mut ledger = Ledger::new(trace_id);
        ledger.append(
            TraceStep::success(BRIDGE_TOOL, evidence, TrustLevel::C)
                .with_input_digest(digest_input(sentence))
                .with_latency(start.elapsed().as_millis() as u64),
        )?;
        debug!(trace_id = %ledger.id(), intent = %intent, "Bridge analyzed sentence");

        let mut payload = Payload::new(sentence, ledger);
        payload.coarse_intent = Some(intent);
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coarse_intent_rules() {
        assert_eq!(ToneBridge::coarse_intent("Is it raining?"), CoarseIntent::Question);
        assert_eq!(ToneBridge::coarse_intent("下雨了嗎？"), CoarseIntent::Question);
        assert_eq!(ToneBridge::coarse_intent("Please close the door"), CoarseIntent::Request);
        assert_eq!(ToneBridge::coarse_intent("請關門"), CoarseIntent::Request);
        assert_eq!(ToneBridge::coarse_intent("The sky is blue."), CoarseIntent::Statement);
        assert_eq!(ToneBridge::coarse_intent(""), CoarseIntent::Statement);
    }

    #[test]
    fn analyze_opens_ledger_with_one_low_trust_step() {
        let payload = ToneBridge::new()
            .analyze("Where is it?", Some(TraceId::new("fixed")))
            .unwrap();
        let ledger = payload.ledger("test").unwrap();
        assert_eq!(ledger.id().as_str(), "fixed");
        assert_eq!(ledger.len(), 1);
        let step = &ledger.steps()[0];
        assert_eq!(step.tool, BRIDGE_TOOL);
        assert_eq!(step.trust_level, TrustLevel::C);
        assert_eq!(step.evidence, "Analyzed sentence. Detected intent: question.");
        assert!(step.input_digest.is_some());
    }
}
