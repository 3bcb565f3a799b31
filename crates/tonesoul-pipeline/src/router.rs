//! Router: tone function -> routing policy
//!
//! The table is a `DashMap` so operators can rebind a tone function while
//! requests are in flight; each lookup sees the entry as of that moment.

use crate::payload::Payload;
use crate::tone::ToneFunction;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tonesoul_core::{Result, TraceStep, TrustLevel};
use tracing::{debug, info, warn};

pub const ROUTER_TOOL: &str = "core.tone_router.v1";
pub const DEFAULT_HANDLER: &str = "default_handler";
pub const VOW_MODULE: &str = "vow_checker";

/// Where a routed payload goes next.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RoutingTarget {
    Responder(String),
    VowPath,
    Fallback,
}

impl RoutingTarget {
    pub fn responder(id: impl Into<String>) -> Self {
        Self::Responder(id.into())
    }

    /// Module name as it appears in evidence and route listings.
    pub fn module_name(&self) -> &str {
        match self {
            Self::Responder(id) => id,
            Self::VowPath => VOW_MODULE,
            Self::Fallback => DEFAULT_HANDLER,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RoutePriority {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for RoutePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutingPolicy {
    pub target: RoutingTarget,
    pub priority: RoutePriority,
    /// Advisory budget; nothing in the pipeline enforces it.
    pub timeout_ms: u64,
}

impl RoutingPolicy {
    pub fn new(target: RoutingTarget, priority: RoutePriority, timeout_ms: u64) -> Self {
        Self { target, priority, timeout_ms }
    }

    pub fn fallback() -> Self {
        Self::new(RoutingTarget::Fallback, RoutePriority::Low, 2000)
    }
}

/// Outcome of routing one payload.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutingDecision {
    pub next_module: String,
    pub target: RoutingTarget,
    pub priority: RoutePriority,
    pub timeout_ms: u64,
    pub fallback: bool,
}

impl RoutingDecision {
    fn from_policy(policy: RoutingPolicy, fallback: bool) -> Self {
        Self {
            next_module: policy.target.module_name().to_string(),
            target: policy.target,
            priority: policy.priority,
            timeout_ms: policy.timeout_ms,
            fallback,
        }
    }
}

pub struct ToneRouter {
    table: DashMap<ToneFunction, RoutingPolicy>,
    fallback: RoutingPolicy,
}

impl Default for ToneRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ToneRouter {
    pub fn new() -> Self {
        use RoutePriority::*;
        use ToneFunction::*;
        let r = RoutingTarget::responder;
        let table = DashMap::new();
        for (tone, target, priority, timeout) in [
            (Instructional, r("qa"), High, 5000),
            (FactualInquiry, r("knowledge_base"), High, 4000),
            (OpinionSeeking, r("reflection"), Medium, 3000),
            (VowDeclaration, RoutingTarget::VowPath, High, 2000),
            (StatementDeclaration, r("statement_processor"), Low, 2000),
            (EmotionalVent, r("empathy"), High, 2000),
            (Appreciation, r("gratitude"), Medium, 1500),
            (Complaint, r("complaint"), High, 3000),
            (ActionRequest, r("action_executor"), High, 4000),
            (AssistanceSeeking, r("assistance"), High, 3500),
            (CasualChat, r("conversation"), Low, 2000),
        ] {
            table.insert(tone, RoutingPolicy::new(target, priority, timeout));
        }
        Self {
            table,
            fallback: RoutingPolicy::fallback(),
        }
    }

    /// Route the payload's tone function and append one step.
    pub fn route(&self, mut payload: Payload) -> Result<Payload> {
        let start = Instant::now();
        payload.ledger("router")?;

        let (decision, step) = match payload.tone_function {
            Some(tone) => match self.table.get(&tone) {
                Some(policy) => {
                    let decision = RoutingDecision::from_policy(policy.value().clone(), false);
                    let evidence = format!(
                        "Routing to {} based on function {}",
                        decision.next_module, tone
                    );
                    (decision, TraceStep::success(ROUTER_TOOL, evidence, TrustLevel::B))
                }
                None => {
                    let decision = RoutingDecision::from_policy(self.fallback.clone(), true);
                    let evidence = format!(
                        "Using fallback strategy: routing to {} for unknown function {}",
                        decision.next_module, tone
                    );
                    debug!(tone = %tone, "No route, using fallback");
                    (decision, TraceStep::success(ROUTER_TOOL, evidence, TrustLevel::B))
                }
            },
            None => {
                warn!("Routing payload without a tone function");
                let decision = RoutingDecision::from_policy(self.fallback.clone(), true);
                (
                    decision,
                    TraceStep::fail(
                        ROUTER_TOOL,
                        "Routing failed: payload carries no tone function. Using fallback strategy.",
                    ),
                )
            }
        };

        let latency = start.elapsed().as_millis() as u64;
        payload.ledger_mut("router")?.append(step.with_latency(latency))?;
        payload.routing = Some(decision);
        Ok(payload)
    }

    /// Replace the policy for `tone`, returning the previous one.
    pub fn rebind(&self, tone: ToneFunction, policy: RoutingPolicy) -> Option<RoutingPolicy> {
        info!(tone = %tone, module = %policy.target.module_name(), "Route rebound");
        self.table.insert(tone, policy)
    }

    pub fn policy_for(&self, tone: ToneFunction) -> RoutingPolicy {
        self.table
            .get(&tone)
            .map(|p| p.value().clone())
            .unwrap_or_else(|| self.fallback.clone())
    }

    /// Tone function name -> module name, plus the `fallback` entry.
    pub fn available_routes(&self) -> BTreeMap<String, String> {
        let mut routes: BTreeMap<String, String> = self
            .table
            .iter()
            .map(|e| (e.key().as_str().to_string(), e.value().target.module_name().to_string()))
            .collect();
        routes.insert("fallback".to_string(), self.fallback.target.module_name().to_string());
        routes
    }
}
