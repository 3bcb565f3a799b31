//! Classifier: coarse intent + text -> tone function via a priority cascade

use crate::keywords::{self, KeywordSet};
use crate::payload::Payload;
use crate::tone::{CoarseIntent, ToneFunction};
use crate::vow;
use std::time::Instant;
use tonesoul_core::{Result, TraceStep, TrustLevel};
use tracing::{debug, warn};

pub const CLASSIFIER_TOOL: &str = "core.tone_classifier.v1";

/// Keyword tables consulted by the cascade.
#[derive(Clone, Debug)]
pub struct ClassifierTables {
    pub commitment: KeywordSet,
    pub appreciation: KeywordSet,
    pub complaint: KeywordSet,
    pub assistance: KeywordSet,
    pub opinion: KeywordSet,
    pub instructional: KeywordSet,
    pub factual: KeywordSet,
    pub casual: KeywordSet,
}

impl Default for ClassifierTables {
    fn default() -> Self {
        Self {
            commitment: KeywordSet::new("commitment", vow::commitment_keywords()),
            appreciation: KeywordSet::new("appreciation", keywords::APPRECIATION.iter().copied()),
            complaint: KeywordSet::new("complaint", keywords::COMPLAINT.iter().copied()),
            assistance: KeywordSet::new("assistance", keywords::ASSISTANCE.iter().copied()),
            opinion: KeywordSet::new("opinion", keywords::OPINION.iter().copied()),
            instructional: KeywordSet::new("instructional", keywords::INSTRUCTIONAL.iter().copied()),
            factual: KeywordSet::new("factual", keywords::FACTUAL.iter().copied()),
            casual: KeywordSet::new("casual", keywords::CASUAL.iter().copied()),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ToneClassifier {
    tables: ClassifierTables,
}

impl ToneClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(tables: ClassifierTables) -> Self {
        Self { tables }
    }

    /// Classify the payload sentence and append one step.
    ///
    /// A missing ledger is the only error. Faults inside the cascade are
    /// recorded as a fail step and classify as `unknown`.
    pub fn classify(&self, mut payload: Payload) -> Result<Payload> {
        let start = Instant::now();
        payload.ledger("classifier")?;
        let intent = payload.coarse_intent;
        let intent_label = intent.map(|i| i.as_str()).unwrap_or("");

        let (tone, step) = match self.cascade(intent, &payload.sentence) {
            Ok(tone) => {
                let evidence = format!("Classified as {} based on intent_type='{}'", tone, intent_label);
                (tone, TraceStep::success(CLASSIFIER_TOOL, evidence, TrustLevel::C))
            }
            Err(e) => {
                warn!(error = %e, "Classification failed, substituting unknown");
                (
                    ToneFunction::Unknown,
                    TraceStep::fail(CLASSIFIER_TOOL, format!("Classification failed: {}", e)),
                )
            }
        };

        let latency = start.elapsed().as_millis() as u64;
        payload.ledger_mut("classifier")?.append(step.with_latency(latency))?;
        debug!(tone = %tone, "Classifier result");
        payload.tone_function = Some(tone);
        Ok(payload)
    }

    /// The cascade. Order is significant: earlier rules win ties.
    pub fn cascade(&self, intent: Option<CoarseIntent>, sentence: &str) -> Result<ToneFunction> {
        let text = sentence.trim();
        if text.is_empty() {
            return Ok(ToneFunction::Unknown);
        }
        let t = &self.tables;

        if t.commitment.matches(text)? {
            return Ok(ToneFunction::VowDeclaration);
        }
        if t.appreciation.matches(text)? {
            return Ok(ToneFunction::Appreciation);
        }
        if t.complaint.matches(text)? {
            return Ok(ToneFunction::Complaint);
        }
        if t.assistance.matches(text)? {
            return Ok(ToneFunction::AssistanceSeeking);
        }

        let tone = match intent {
            Some(CoarseIntent::Question) => {
                if t.opinion.matches(text)? {
                    ToneFunction::OpinionSeeking
                } else if t.instructional.matches(text)? {
                    ToneFunction::Instructional
                } else if t.factual.matches(text)? {
                    ToneFunction::FactualInquiry
                } else {
                    ToneFunction::OpinionSeeking
                }
            }
            Some(CoarseIntent::Request) => ToneFunction::ActionRequest,
            Some(CoarseIntent::Statement) => {
                if t.casual.matches(text)? {
                    ToneFunction::CasualChat
                } else {
                    ToneFunction::StatementDeclaration
                }
            }
            None => ToneFunction::Unknown,
        };
        Ok(tone)
    }
}
