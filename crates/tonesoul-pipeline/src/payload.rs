//! Payload threaded through the pipeline stages

use crate::router::RoutingDecision;
use crate::tone::{CoarseIntent, ToneFunction};
use crate::vow::Commitment;
use serde::Serialize;
use tonesoul_core::{Error, Ledger, Result};

/// Each stage consumes a payload and returns it enriched, with exactly one
/// more step on the ledger.
#[derive(Clone, Debug, Serialize)]
pub struct Payload {
    pub sentence: String,
    pub ledger: Option<Ledger>,
    pub coarse_intent: Option<CoarseIntent>,
    pub tone_function: Option<ToneFunction>,
    pub routing: Option<RoutingDecision>,
    pub response: Option<String>,
    pub vow: Option<Commitment>,
}

impl Payload {
    pub fn new(sentence: impl Into<String>, ledger: Ledger) -> Self {
        Self {
            sentence: sentence.into(),
            ledger: Some(ledger),
            coarse_intent: None,
            tone_function: None,
            routing: None,
            response: None,
            vow: None,
        }
    }

    /// Payload with no ledger attached; stages reject it.
    pub fn detached(sentence: impl Into<String>) -> Self {
        Self {
            ledger: None,
            ..Self::new(sentence, Ledger::new(None))
        }
    }

    pub fn ledger(&self, stage: &'static str) -> Result<&Ledger> {
        self.ledger.as_ref().ok_or(Error::missing_ledger(stage))
    }

    pub fn ledger_mut(&mut self, stage: &'static str) -> Result<&mut Ledger> {
        self.ledger.as_mut().ok_or(Error::missing_ledger(stage))
    }

    pub fn into_ledger(self) -> Option<Ledger> {
        self.ledger
    }
}
