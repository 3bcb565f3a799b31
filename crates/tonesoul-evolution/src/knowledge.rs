//! Knowledge evolution graph
//!
//! Concept-indexed nodes grown from ledger evidence. Each cycle extracts
//! candidate items with fixed patterns, integrates the ones that clear the
//! trust and confidence bar, decays stale nodes and strengthens connections
//! between concepts that co-occur. Nodes are never removed; low-confidence
//! nodes only drop out of the summary.

use crate::config::KnowledgeConfig;
use crate::record::{EvolutionRecord, LearningType};
use crate::ring::RingBuffer;
use crate::{mean, Context};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;
use std::time::Instant;
use tonesoul_core::{Ledger, TraceStep, TrustLevel};
use tracing::{debug, warn};

/// Where a node's knowledge came from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum NodeOrigin {
    Seed,
    Definition,
    Relation,
    Pipeline,
    Commitment,
}

impl NodeOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Definition => "definition",
            Self::Relation => "relation",
            Self::Pipeline => "pipeline",
            Self::Commitment => "commitment",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeNode {
    pub id: String,
    pub concept: String,
    pub content: String,
    pub origin: NodeOrigin,
    pub confidence: f64,
    pub source_traces: Vec<String>,
    /// Concept key -> weight in (0, 1].
    pub connections: BTreeMap<String, f64>,
    pub validation_count: u64,
    pub contradiction_count: u64,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub decay_factor: f64,
}

/// Candidate knowledge pulled out of one step's evidence.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct KnowledgeItem {
    pub concept: String,
    pub content: String,
    pub related: Option<String>,
    pub origin: NodeOrigin,
    /// Base pattern confidence times the step's trust weight.
    pub confidence: f64,
    pub trust_level: TrustLevel,
    pub step_success: bool,
    pub negated: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct EvolutionStats {
    pub nodes_created: u64,
    pub nodes_updated: u64,
    pub contradictions: u64,
    pub connections_strengthened: u64,
    pub nodes_decayed: u64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct EvolutionResult {
    pub knowledge_extracted: usize,
    pub knowledge_validated: usize,
    pub knowledge_integrated: usize,
    pub connections_updated: usize,
    pub knowledge_graph_size: usize,
    pub evolution_stats: EvolutionStats,
    pub evolution_opportunities: usize,
    pub processing_time_ms: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct KnowledgeSummary {
    pub total_knowledge_nodes: usize,
    pub total_connections: usize,
    pub average_confidence: f64,
    pub concept_distribution: BTreeMap<String, usize>,
    pub evolution_stats: EvolutionStats,
    pub knowledge_health_score: f64,
    pub evolution_opportunities: Vec<String>,
    pub knowledge_graph_size: usize,
}

// ============================================================
// Extraction
// ============================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PatternKind {
    Definition,
    Relation,
    Route,
    Commitment,
    Intent,
    Classification,
}

impl PatternKind {
    fn base_confidence(self) -> f64 {
        match self {
            Self::Definition => 0.9,
            Self::Relation => 0.8,
            Self::Route | Self::Commitment => 0.75,
            Self::Intent | Self::Classification => 0.6,
        }
    }
}

const PHRASE: &str = r"[\p{L}\p{N}_-]+(?:\s+[\p{L}\p{N}_-]+){0,3}";

static EXTRACTORS: LazyLock<Vec<(PatternKind, Regex)>> = LazyLock::new(|| {
    let specs = [
        (
            PatternKind::Definition,
            format!(r"(?i)({PHRASE})\s+is\s+(not\s+)?defined\s+as\s+([^.。;]+)"),
        ),
        (
            PatternKind::Relation,
            format!(
                r"(?i)({PHRASE})\s+is\s+(not\s+)?(?:related\s+to|connected\s+(?:with|to))\s+({PHRASE})"
            ),
        ),
        (
            PatternKind::Route,
            r"(?i)routing to (\S+) based on function (\w+)".to_string(),
        ),
        (
            PatternKind::Commitment,
            r"Created commitment \S+ with commitment: '(.+)'".to_string(),
        ),
        (PatternKind::Intent, r"Detected intent: (\w+)".to_string()),
        (PatternKind::Classification, r"Classified as (\w+)".to_string()),
    ];
    specs
        .into_iter()
        .filter_map(|(kind, pattern)| match Regex::new(&pattern) {
            Ok(re) => Some((kind, re)),
            Err(e) => {
                warn!(?kind, error = %e, "Skipping knowledge pattern that failed to compile");
                None
            }
        })
        .collect()
});

const NEGATION_WORDS: &[&str] = &["not", "false", "incorrect", "never", "no"];
const NEGATION_MARKERS: &[&str] = &["不", "沒有", "錯誤"];

fn is_negated(text: &str) -> bool {
    let lower = text.to_lowercase();
    let words = lower.split(|c: char| !c.is_alphanumeric() && c != '\'');
    let has_word = words.into_iter().any(|w| NEGATION_WORDS.contains(&w));
    has_word || NEGATION_MARKERS.iter().any(|m| lower.contains(m))
}

/// Every candidate item in one step's evidence.
pub fn extract_items(step: &TraceStep) -> Vec<KnowledgeItem> {
    let mut items = Vec::new();
    let weight = step.trust_level.weight();

    for (kind, re) in EXTRACTORS.iter() {
        for caps in re.captures_iter(&step.evidence) {
            let group = |i: usize| caps.get(i).map(|m| m.as_str().trim().to_string());
            let whole = group(0).unwrap_or_default();

            let (concept, content, related, origin, negated) = match kind {
                PatternKind::Definition => {
                    let content = group(3).unwrap_or_default();
                    let negated = caps.get(2).is_some() || is_negated(&content);
                    (group(1), content, None, NodeOrigin::Definition, negated)
                }
                PatternKind::Relation => {
                    let negated = caps.get(2).is_some();
                    (group(1), whole, group(3), NodeOrigin::Relation, negated)
                }
                // Evidence reads "Routing to <module> based on function <tone>".
                PatternKind::Route => (group(2), whole, group(1), NodeOrigin::Pipeline, false),
                PatternKind::Commitment => (
                    Some("commitment".to_string()),
                    group(1).unwrap_or_default(),
                    None,
                    NodeOrigin::Commitment,
                    false,
                ),
                PatternKind::Intent | PatternKind::Classification => {
                    (group(1), whole, None, NodeOrigin::Pipeline, false)
                }
            };

            let Some(concept) = concept.filter(|c| !c.is_empty()) else {
                continue;
            };
            items.push(KnowledgeItem {
                concept,
                content,
                related: related.filter(|r| !r.is_empty()),
                origin,
                confidence: (kind.base_confidence() * weight).clamp(0.0, 1.0),
                trust_level: step.trust_level,
                step_success: step.is_success(),
                negated,
            });
        }
    }
    items
}

pub fn concept_key(label: &str) -> String {
    label.trim().to_lowercase()
}

// ============================================================
// Graph
// ============================================================

pub struct KnowledgeGraph {
    config: KnowledgeConfig,
    nodes: BTreeMap<String, KnowledgeNode>,
    stats: EvolutionStats,
    records: RingBuffer<EvolutionRecord>,
}

impl KnowledgeGraph {
    pub fn new(config: KnowledgeConfig) -> Self {
        let mut graph = Self {
            nodes: BTreeMap::new(),
            stats: EvolutionStats::default(),
            records: RingBuffer::new(config.record_capacity),
            config,
        };
        graph.seed(Utc::now());
        graph
    }

    fn seed(&mut self, now: DateTime<Utc>) {
        let seeds = [
            ("greeting", "Social opening such as hello or good morning"),
            ("gratitude", "Expression of thanks or appreciation"),
            ("question", "Request for information, usually ending in a question mark"),
            ("commitment", "Promise to perform or complete something"),
            ("complaint", "Expression of dissatisfaction with a result"),
        ];
        let decay = self.config.decay_factor;
        for (concept, content) in seeds {
            self.nodes.insert(
                concept.to_string(),
                new_node(concept, content, NodeOrigin::Seed, 0.8, None, decay, now),
            );
        }
    }

    pub fn config(&self) -> &KnowledgeConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, concept: &str) -> Option<&KnowledgeNode> {
        self.nodes.get(&concept_key(concept))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &KnowledgeNode> {
        self.nodes.values()
    }

    pub fn stats(&self) -> &EvolutionStats {
        &self.stats
    }

    pub fn records(&self) -> &RingBuffer<EvolutionRecord> {
        &self.records
    }

    pub fn process_evolution(&mut self, ledger: &Ledger, context: &Context) -> EvolutionResult {
        self.process_evolution_at(ledger, context, Utc::now())
    }

    pub fn process_evolution_at(
        &mut self,
        ledger: &Ledger,
        context: &Context,
        now: DateTime<Utc>,
    ) -> EvolutionResult {
        let started = Instant::now();
        if ledger.is_empty() {
            return EvolutionResult {
                knowledge_graph_size: self.nodes.len(),
                evolution_stats: self.stats.clone(),
                evolution_opportunities: self.opportunities().len(),
                ..EvolutionResult::default()
            };
        }

        self.decay(now);

        let items: Vec<KnowledgeItem> = ledger.steps().iter().flat_map(extract_items).collect();
        let validated: Vec<&KnowledgeItem> = items.iter().filter(|i| self.is_valid(i)).collect();

        let mut integrated = 0;
        let mut touched: Vec<String> = Vec::new();
        for item in &validated {
            let keys = self.integrate(item, ledger, context, now);
            if !keys.is_empty() {
                integrated += 1;
            }
            for key in keys {
                if !touched.contains(&key) {
                    touched.push(key);
                }
            }
        }

        let connections_updated = self.strengthen(&touched);

        debug!(
            trace_id = %ledger.id(),
            extracted = items.len(),
            validated = validated.len(),
            integrated,
            connections_updated,
            "Knowledge cycle complete"
        );

        EvolutionResult {
            knowledge_extracted: items.len(),
            knowledge_validated: validated.len(),
            knowledge_integrated: integrated,
            connections_updated,
            knowledge_graph_size: self.nodes.len(),
            evolution_stats: self.stats.clone(),
            evolution_opportunities: self.opportunities().len(),
            processing_time_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Trust-C evidence and failed steps are extracted but never integrated.
    fn is_valid(&self, item: &KnowledgeItem) -> bool {
        item.step_success
            && item.trust_level != TrustLevel::C
            && item.confidence >= self.config.min_integration_confidence
    }

    fn decay(&mut self, now: DateTime<Utc>) {
        let stale_after = Duration::seconds(self.config.stale_after_secs);
        for node in self.nodes.values_mut() {
            if now - node.last_accessed > stale_after {
                node.confidence = (node.confidence * node.decay_factor).clamp(0.0, 1.0);
                self.stats.nodes_decayed += 1;
            }
        }
    }

    /// Create or update the item's nodes; returns the keys touched.
    fn integrate(
        &mut self,
        item: &KnowledgeItem,
        ledger: &Ledger,
        context: &Context,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let mut labels = vec![(item.concept.as_str(), item.content.as_str())];
        if let Some(related) = &item.related {
            labels.push((related.as_str(), item.content.as_str()));
        }

        let trace_id = ledger.id().to_string();
        let decay = self.config.decay_factor;
        let mut touched = Vec::new();
        for (label, content) in labels {
            let key = concept_key(label);
            if key.is_empty() {
                continue;
            }

            let (before, after, description) = match self.nodes.get_mut(&key) {
                Some(node) => {
                    let before = json!({ "confidence": node.confidence,
                        "validation_count": node.validation_count,
                        "contradiction_count": node.contradiction_count });
                    if item.negated {
                        node.contradiction_count += 1;
                        node.confidence = (node.confidence - 0.1).max(0.0);
                        self.stats.contradictions += 1;
                    } else {
                        node.validation_count += 1;
                        node.confidence = (node.confidence + item.confidence * 0.1).min(1.0);
                    }
                    if !node.source_traces.contains(&trace_id) {
                        node.source_traces.push(trace_id.clone());
                    }
                    node.last_accessed = now;
                    self.stats.nodes_updated += 1;
                    let after = json!({ "confidence": node.confidence,
                        "validation_count": node.validation_count,
                        "contradiction_count": node.contradiction_count });
                    (before, after, format!("Updated knowledge node '{}'", key))
                }
                // Nothing to contradict yet.
                None if item.negated => continue,
                None => {
                    let node = new_node(
                        label,
                        content,
                        item.origin,
                        item.confidence,
                        Some(&trace_id),
                        decay,
                        now,
                    );
                    let after = json!({ "concept": node.concept, "confidence": node.confidence });
                    self.nodes.insert(key.clone(), node);
                    self.stats.nodes_created += 1;
                    (json!(null), after, format!("Created knowledge node '{}'", key))
                }
            };

            self.records.push(EvolutionRecord::integrated(
                LearningType::KnowledgeExpansion,
                before,
                after,
                description,
                trace_id.clone(),
                context.clone(),
                now,
            ));
            touched.push(key);
        }
        touched
    }

    /// Pairwise strengthen every concept touched in this cycle; returns the
    /// number of undirected pairs.
    fn strengthen(&mut self, keys: &[String]) -> usize {
        let mut pairs = 0;
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                self.bump(a, b);
                self.bump(b, a);
                pairs += 1;
            }
        }
        self.stats.connections_strengthened += pairs as u64;
        pairs
    }

    fn bump(&mut self, from: &str, to: &str) {
        let increment = self.config.connection_increment;
        if let Some(node) = self.nodes.get_mut(from) {
            let weight = node.connections.entry(to.to_string()).or_insert(0.0);
            *weight = (*weight + increment).min(1.0);
        }
    }

    fn reported(&self) -> impl Iterator<Item = (&String, &KnowledgeNode)> {
        let floor = self.config.reporting_floor;
        self.nodes.iter().filter(move |(_, n)| n.confidence >= floor)
    }

    /// Confident reported nodes with no connections, by concept.
    pub fn opportunities(&self) -> Vec<String> {
        self.reported()
            .filter(|(_, n)| n.confidence >= self.config.opportunity_confidence && n.connections.is_empty())
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn summary(&self) -> KnowledgeSummary {
        let reported: Vec<(&String, &KnowledgeNode)> = self.reported().collect();
        let visible: BTreeSet<&str> = reported.iter().map(|(k, _)| k.as_str()).collect();

        let mut distribution = BTreeMap::new();
        let mut directed = 0;
        let mut connected = 0;
        let mut validations = 0u64;
        let mut contradictions = 0u64;
        for (_, node) in &reported {
            *distribution.entry(node.origin.as_str().to_string()).or_insert(0) += 1;
            let links = node
                .connections
                .keys()
                .filter(|k| visible.contains(k.as_str()))
                .count();
            directed += links;
            if links > 0 {
                connected += 1;
            }
            validations += node.validation_count;
            contradictions += node.contradiction_count;
        }

        let average_confidence = mean(reported.iter().map(|(_, n)| n.confidence));
        let connectivity = if reported.is_empty() {
            0.0
        } else {
            connected as f64 / reported.len() as f64
        };
        let consistency = if validations + contradictions == 0 {
            1.0
        } else {
            validations as f64 / (validations + contradictions) as f64
        };

        KnowledgeSummary {
            total_knowledge_nodes: reported.len(),
            total_connections: directed / 2,
            average_confidence,
            concept_distribution: distribution,
            evolution_stats: self.stats.clone(),
            knowledge_health_score: (0.5 * average_confidence + 0.3 * connectivity + 0.2 * consistency)
                .clamp(0.0, 1.0),
            evolution_opportunities: self.opportunities(),
            knowledge_graph_size: self.nodes.len(),
        }
    }
}

impl Default for KnowledgeGraph {
    fn default() -> Self {
        Self::new(KnowledgeConfig::default())
    }
}

fn new_node(
    concept: &str,
    content: &str,
    origin: NodeOrigin,
    confidence: f64,
    trace_id: Option<&str>,
    decay_factor: f64,
    now: DateTime<Utc>,
) -> KnowledgeNode {
    KnowledgeNode {
        id: uuid::Uuid::new_v4().to_string(),
        concept: concept.trim().to_string(),
        content: content.to_string(),
        origin,
        confidence: confidence.clamp(0.0, 1.0),
        source_traces: trace_id.map(|t| vec![t.to_string()]).unwrap_or_default(),
        connections: BTreeMap::new(),
        validation_count: 0,
        contradiction_count: 0,
        created_at: now,
        last_accessed: now,
        decay_factor,
    }
}
