//! Vow lifecycle: commitment parsing and the in-memory commitment registry
//!
//! Lifecycle:
//!
//!   active ──fulfill──► fulfilled
//!     │
//!     ├──withdraw─────► withdrawn
//!     │
//!     └──(deadline passes, observed lazily)──► expired
//!
//! No timer drives expiry; `is_expired_at` compares the deadline to the
//! supplied clock. Commitments are never removed from the registry.

use crate::keywords::{self, locate};
use crate::payload::Payload;
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tonesoul_core::{Error, Result, TraceId, TraceStep, TrustLevel};
use tracing::{debug, info, warn};

pub const VOW_TOOL: &str = "core.vow_manager.v1";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VowStatus {
    Active,
    Fulfilled,
    Withdrawn,
    Violated,
    Expired,
}

impl std::fmt::Display for VowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Fulfilled => "fulfilled",
            Self::Withdrawn => "withdrawn",
            Self::Violated => "violated",
            Self::Expired => "expired",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum VowPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl std::fmt::Display for VowPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ScopeTag {
    General,
    TimeBound,
    TaskCompletion,
    QualityAssurance,
}

/// Commitment keyword table, most specific first.
pub const COMMITMENT_KEYWORDS: &[(&str, VowPriority, f64)] = &[
    ("I swear", VowPriority::Critical, 0.95),
    ("I vow", VowPriority::Critical, 0.95),
    ("我發誓", VowPriority::Critical, 0.95),
    ("I promise", VowPriority::High, 0.9),
    ("I guarantee", VowPriority::High, 0.9),
    ("I commit to", VowPriority::High, 0.9),
    ("我承諾", VowPriority::High, 0.9),
    ("我保證", VowPriority::High, 0.9),
    ("I agree to", VowPriority::Medium, 0.8),
    ("我答應", VowPriority::Medium, 0.8),
    ("I will try to", VowPriority::Low, 0.6),
];

pub fn commitment_keywords() -> impl Iterator<Item = &'static str> {
    COMMITMENT_KEYWORDS.iter().map(|(k, _, _)| *k)
}

/// Conditions under which a commitment may be withdrawn, and who repairs it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WithdrawalPolicy {
    pub conditions: Vec<String>,
    pub repair_owner: String,
    #[serde(default)]
    pub repair_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub repair_actions: Vec<String>,
}

impl WithdrawalPolicy {
    pub fn for_priority(priority: VowPriority) -> Self {
        let (conditions, owner, actions): (&[&str], &str, &[&str]) = match priority {
            VowPriority::Critical => (
                &["force majeure", "systemic error"],
                "system_admin",
                &["public apology", "remediation plan"],
            ),
            VowPriority::High => (
                &["major change", "technical limitation"],
                "module_owner",
                &["explain reason", "offer alternative"],
            ),
            VowPriority::Medium => (
                &["circumstance change", "resource limit"],
                "task_owner",
                &["explain situation"],
            ),
            VowPriority::Low => (&["general change"], "user", &["brief explanation"]),
        };
        Self {
            conditions: conditions.iter().map(|s| s.to_string()).collect(),
            repair_owner: owner.to_string(),
            repair_deadline: None,
            repair_actions: actions.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A structured promise with lifecycle state.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Commitment {
    pub id: String,
    pub commitment: String,
    pub original_sentence: String,
    pub scope: BTreeSet<ScopeTag>,
    pub status: VowStatus,
    pub priority: VowPriority,
    pub created_at: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub withdrawal: WithdrawalPolicy,
    pub bindings: BTreeMap<String, Value>,
    pub source_trace_id: TraceId,
    pub confidence: f64,
}

impl Commitment {
    pub fn is_active(&self) -> bool {
        self.status == VowStatus::Active
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if self.deadline.is_some_and(|d| now > d) {
            return true;
        }
        self.status == VowStatus::Expired
    }

    pub fn fulfill_at(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !self.is_active() {
            return Err(Error::invalid_transition(&self.id, self.status, VowStatus::Fulfilled));
        }
        if self.is_expired_at(now) {
            return Err(Error::invalid_transition(&self.id, VowStatus::Expired, VowStatus::Fulfilled));
        }
        self.status = VowStatus::Fulfilled;
        self.fulfilled_at = Some(now);
        Ok(())
    }

    pub fn withdraw(&mut self) -> Result<()> {
        if !self.is_active() {
            return Err(Error::invalid_transition(&self.id, self.status, VowStatus::Withdrawn));
        }
        self.status = VowStatus::Withdrawn;
        Ok(())
    }

    pub fn summary_at(&self, now: DateTime<Utc>) -> VowSummary {
        VowSummary {
            id: self.id.clone(),
            commitment: self.commitment.clone(),
            status: self.status,
            priority: self.priority,
            created_at: self.created_at,
            deadline: self.deadline,
            is_active: self.is_active(),
            is_expired: self.is_expired_at(now),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VowSummary {
    pub id: String,
    pub commitment: String,
    pub status: VowStatus,
    pub priority: VowPriority,
    pub created_at: DateTime<Utc>,
    pub deadline: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub is_expired: bool,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty sentence provided")]
    EmptyText,
    #[error("no commitment keyword found in sentence")]
    NoKeyword,
    #[error("no commitment content found after keyword '{0}'")]
    EmptyCommitment(String),
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Validation(e.to_string())
    }
}

/// Parsed, not-yet-registered commitment fields.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedCommitment {
    pub keyword: &'static str,
    pub body: String,
    pub scope: BTreeSet<ScopeTag>,
    pub priority: VowPriority,
    pub confidence: f64,
    pub deadline: Option<DateTime<Utc>>,
}

pub fn parse_commitment(text: &str) -> std::result::Result<ParsedCommitment, ParseError> {
    parse_commitment_at(text, Local::now())
}

/// Parse against an explicit local clock (day boundaries are local).
pub fn parse_commitment_at(
    text: &str,
    now: DateTime<Local>,
) -> std::result::Result<ParsedCommitment, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::EmptyText);
    }

    let (keyword, priority, confidence, at) = COMMITMENT_KEYWORDS
        .iter()
        .find_map(|&(kw, priority, confidence)| {
            locate(text, kw).map(|at| (kw, priority, confidence, at))
        })
        .ok_or(ParseError::NoKeyword)?;

    let body = text[at + keyword.len()..].trim();
    if body.is_empty() {
        return Err(ParseError::EmptyCommitment(keyword.to_string()));
    }

    Ok(ParsedCommitment {
        keyword,
        body: body.to_string(),
        scope: infer_scope(body),
        priority,
        confidence,
        deadline: infer_deadline(body, now),
    })
}

pub fn infer_scope(body: &str) -> BTreeSet<ScopeTag> {
    let mut scope = BTreeSet::from([ScopeTag::General]);
    if keywords::contains_any(body, keywords::TEMPORAL) {
        scope.insert(ScopeTag::TimeBound);
    }
    if keywords::contains_any(body, keywords::COMPLETION) {
        scope.insert(ScopeTag::TaskCompletion);
    }
    if keywords::contains_any(body, keywords::QUALITY) {
        scope.insert(ScopeTag::QualityAssurance);
    }
    scope
}

/// Deadline from temporal markers. Tomorrow is checked before today.
pub fn infer_deadline(body: &str, now: DateTime<Local>) -> Option<DateTime<Utc>> {
    let today = now.date_naive();
    let has = |markers: &[&str]| keywords::contains_any(body, markers);

    if has(&["tomorrow", "明天"]) {
        end_of_day(today + Duration::days(1))
    } else if has(&["today", "今天"]) {
        end_of_day(today)
    } else if has(&["next week", "下週"]) {
        Some((now + Duration::days(7)).with_timezone(&Utc))
    } else if has(&["this week", "本週"]) {
        let to_sunday = 6 - i64::from(today.weekday().num_days_from_monday());
        end_of_day(today + Duration::days(to_sunday))
    } else {
        None
    }
}

fn end_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    let naive = date.and_hms_opt(23, 59, 59)?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Creates commitments from vow declarations and tracks their lifecycle.
#[derive(Default)]
pub struct VowManager {
    registry: DashMap<String, Commitment>,
}

impl VowManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the payload sentence into a commitment and append one step.
    ///
    /// A parse failure is recorded as a fail step and leaves `payload.vow`
    /// empty; only a missing ledger is returned as an error.
    pub fn process_vow(&self, payload: Payload) -> Result<Payload> {
        self.process_vow_at(payload, Local::now())
    }

    pub fn process_vow_at(&self, mut payload: Payload, now: DateTime<Local>) -> Result<Payload> {
        let start = Instant::now();
        let source_id = payload.ledger("vow")?.id().clone();

        let step = match parse_commitment_at(&payload.sentence, now) {
            Ok(parsed) => {
                let commitment = self.register(parsed, &payload.sentence, source_id, now.with_timezone(&Utc));
                info!(vow_id = %commitment.id, priority = %commitment.priority, "Commitment created");
                let evidence = format!(
                    "Created commitment {} with commitment: '{}'",
                    commitment.id, commitment.commitment
                );
                payload.response = Some(format!("Commitment recorded: {}", commitment.commitment));
                payload.vow = Some(commitment);
                TraceStep::success(VOW_TOOL, evidence, TrustLevel::B)
            }
            Err(e) => {
                warn!(error = %e, "Commitment creation failed");
                payload.response = Some(format!("I could not record that as a commitment: {}", e));
                TraceStep::fail(VOW_TOOL, format!("Commitment creation failed: {}", e))
            }
        };

        let latency = start.elapsed().as_millis() as u64;
        payload.ledger_mut("vow")?.append(step.with_latency(latency))?;
        Ok(payload)
    }

    fn register(
        &self,
        parsed: ParsedCommitment,
        sentence: &str,
        source_trace_id: TraceId,
        created_at: DateTime<Utc>,
    ) -> Commitment {
        let commitment = Commitment {
            id: uuid::Uuid::new_v4().to_string(),
            commitment: parsed.body,
            original_sentence: sentence.trim().to_string(),
            scope: parsed.scope,
            status: VowStatus::Active,
            priority: parsed.priority,
            created_at,
            deadline: parsed.deadline,
            fulfilled_at: None,
            withdrawal: WithdrawalPolicy::for_priority(parsed.priority),
            bindings: BTreeMap::from([(
                "original_keyword".to_string(),
                Value::String(parsed.keyword.to_string()),
            )]),
            source_trace_id,
            confidence: parsed.confidence,
        };
        self.registry.insert(commitment.id.clone(), commitment.clone());
        commitment
    }

    pub fn get(&self, id: &str) -> Option<Commitment> {
        self.registry.get(id).map(|c| c.value().clone())
    }

    /// All commitments, oldest first.
    pub fn list(&self) -> Vec<Commitment> {
        let mut all: Vec<Commitment> = self.registry.iter().map(|c| c.value().clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub fn active(&self) -> Vec<Commitment> {
        self.list().into_iter().filter(|c| c.is_active()).collect()
    }

    /// Commitments observed as expired at `now`.
    pub fn expired_at(&self, now: DateTime<Utc>) -> Vec<Commitment> {
        self.list().into_iter().filter(|c| c.is_expired_at(now)).collect()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn fulfill(&self, id: &str) -> Result<Commitment> {
        self.fulfill_at(id, Utc::now())
    }

    pub fn fulfill_at(&self, id: &str, now: DateTime<Utc>) -> Result<Commitment> {
        let mut entry = self
            .registry
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("commitment {}", id)))?;
        entry.fulfill_at(now)?;
        debug!(vow_id = %id, "Commitment fulfilled");
        Ok(entry.value().clone())
    }

    pub fn withdraw(&self, id: &str) -> Result<Commitment> {
        let mut entry = self
            .registry
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("commitment {}", id)))?;
        entry.withdraw()?;
        debug!(vow_id = %id, "Commitment withdrawn");
        Ok(entry.value().clone())
    }

    pub fn summary(&self, id: &str) -> Option<VowSummary> {
        self.registry.get(id).map(|c| c.summary_at(Utc::now()))
    }
}
