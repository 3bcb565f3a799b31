//! Audit ledger: the append-only, per-request step record
//!
//! Wire format (one request):
//!
//!   { "id": "6f1c…", "steps": [
//!       { "tool": "core.bridge.v1", "status": "success", "input_digest": "9a3e…",
//!         "evidence": "Detected intent: question", "trust_level": "C",
//!         "latency_ms": 0, "timestamp": "2026-10-19T08:12:44.120Z" },
//!       ...
//!   ] }
//!
//! Steps are never removed, reordered, or edited once appended. Parsing the
//! wire form replays every step through `append`, so a parsed ledger obeys
//! the same invariants as one built in-process.

use crate::error::{Error, Result};
use crate::types::TraceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Outcome of one stage.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    Success,
    Fail,
}

impl std::fmt::Display for TraceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// Trust tier attached to a step's evidence.
///
/// A = externally verified, B = internally validated, C = heuristic.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrustLevel {
    A,
    B,
    C,
}

impl TrustLevel {
    /// Numeric weight used by every score that averages trust.
    pub fn weight(self) -> f64 {
        match self {
            Self::A => 1.0,
            Self::B => 0.7,
            Self::C => 0.4,
        }
    }
}

impl std::fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
            Self::C => write!(f, "C"),
        }
    }
}

/// One stage's execution record.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TraceStep {
    pub tool: String,
    pub status: TraceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_digest: Option<String>,
    pub evidence: String,
    pub trust_level: TrustLevel,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl TraceStep {
    pub fn new(
        tool: impl Into<String>,
        status: TraceStatus,
        evidence: impl Into<String>,
        trust_level: TrustLevel,
    ) -> Self {
        Self {
            tool: tool.into(),
            status,
            input_digest: None,
            evidence: evidence.into(),
            trust_level,
            latency_ms: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn success(tool: impl Into<String>, evidence: impl Into<String>, trust_level: TrustLevel) -> Self {
        Self::new(tool, TraceStatus::Success, evidence, trust_level)
    }

    /// Failed step. Failures always carry trust level C.
    pub fn fail(tool: impl Into<String>, evidence: impl Into<String>) -> Self {
        Self::new(tool, TraceStatus::Fail, evidence, TrustLevel::C)
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_input_digest(mut self, digest: impl Into<String>) -> Self {
        self.input_digest = Some(digest.into());
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == TraceStatus::Success
    }

    fn validate(&self) -> Result<()> {
        if self.tool.trim().is_empty() {
            return Err(Error::validation("trace step is missing a tool identifier"));
        }
        if self.evidence.trim().is_empty() {
            return Err(Error::validation(format!(
                "trace step from {} is missing evidence",
                self.tool
            )));
        }
        if let Some(digest) = &self.input_digest {
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(Error::validation(format!(
                    "trace step from {} has a malformed input digest",
                    self.tool
                )));
            }
        }
        Ok(())
    }
}

/// SHA-256 of the raw input, lowercase hex.
pub fn digest_input(text: &str) -> String {
    let digest = ring::digest::digest(&ring::digest::SHA256, text.as_bytes());
    let mut out = String::with_capacity(64);
    for byte in digest.as_ref() {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Append-only ordered record of one request's processing steps.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "WireLedger")]
pub struct Ledger {
    id: TraceId,
    steps: Vec<TraceStep>,
}

#[derive(Deserialize)]
struct WireLedger {
    id: String,
    steps: Vec<TraceStep>,
}

impl TryFrom<WireLedger> for Ledger {
    type Error = Error;

    fn try_from(wire: WireLedger) -> Result<Self> {
        if wire.id.trim().is_empty() {
            return Err(Error::validation("ledger id must not be empty"));
        }
        let mut ledger = Ledger::with_id(wire.id);
        for step in wire.steps {
            ledger.append(step)?;
        }
        Ok(ledger)
    }
}

impl Ledger {
    /// Empty ledger; generates an id when none is supplied.
    pub fn new(id: Option<TraceId>) -> Self {
        Self {
            id: id.unwrap_or_else(TraceId::generate),
            steps: Vec::new(),
        }
    }

    pub fn with_id(id: impl Into<TraceId>) -> Self {
        Self::new(Some(id.into()))
    }

    pub fn id(&self) -> &TraceId {
        &self.id
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last(&self) -> Option<&TraceStep> {
        self.steps.last()
    }

    /// Append a step to the end of the ledger.
    ///
    /// Rejects steps missing required fields and steps timestamped before
    /// the current last step.
    pub fn append(&mut self, step: TraceStep) -> Result<()> {
        step.validate()?;
        if let Some(last) = self.steps.last() {
            if step.timestamp < last.timestamp {
                return Err(Error::validation(format!(
                    "step from {} at {} precedes last step at {}",
                    step.tool,
                    step.timestamp.to_rfc3339(),
                    last.timestamp.to_rfc3339()
                )));
            }
        }
        self.steps.push(step);
        Ok(())
    }

    pub fn tools(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.tool.as_str()).collect()
    }

    pub fn total_latency_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.latency_ms).sum()
    }

    /// Successful steps / total steps; 0.0 for an empty ledger.
    pub fn success_ratio(&self) -> f64 {
        if self.steps.is_empty() {
            return 0.0;
        }
        let ok = self.steps.iter().filter(|s| s.is_success()).count();
        ok as f64 / self.steps.len() as f64
    }

    /// Mean trust weight (A=1.0, B=0.7, C=0.4); 0.0 for an empty ledger.
    pub fn mean_trust_weight(&self) -> f64 {
        if self.steps.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.steps.iter().map(|s| s.trust_level.weight()).sum();
        sum / self.steps.len() as f64
    }

    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| !s.is_success()).count()
    }

    /// Serialize to the canonical wire form.
    pub fn to_wire(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({ "id": self.id.as_str(), "steps": self.steps })
    }

    /// Parse the wire form, re-validating every step.
    pub fn from_wire(json: &str) -> Result<Self> {
        let wire: WireLedger = serde_json::from_str(json)?;
        Ledger::try_from(wire)
    }
}
