//! Human-readable rendering for CLI output

use tonesoul_core::TraceStatus;
use tonesoul_evolution::{CognitiveSummary, KnowledgeSummary, LearningInsights};
use tonesoul_pipeline::VowSummary;
use tonesoul_runtime::ProcessResult;

pub fn process_result(result: &ProcessResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("trace     {}\n", result.trace_id));
    out.push_str(&format!("sentence  {:?}\n", result.original_sentence));

    if !result.success {
        out.push_str(&format!(
            "FAILED    {}\n",
            result.message.as_deref().unwrap_or("unknown error")
        ));
        return out;
    }

    let intent = result.coarse_intent.map(|i| i.as_str()).unwrap_or("none");
    let tone = result.tone_function.map(|t| t.as_str()).unwrap_or("none");
    out.push_str(&format!("intent    {} / {}\n", intent, tone));
    if let Some(route) = &result.routing_decision {
        let marker = if route.fallback { " (fallback)" } else { "" };
        out.push_str(&format!("route     {} [{}]{}\n", route.next_module, route.priority, marker));
    }
    if let Some(response) = &result.responder_output {
        out.push_str(&format!("response  {}\n", response));
    }
    if let Some(vow) = &result.vow {
        let summary = vow.summary_at(chrono::Utc::now());
        out.push_str(&format!("vow       {}\n", vow_line(&summary)));
        let scope: Vec<String> = vow.scope.iter().map(|tag| format!("{:?}", tag)).collect();
        out.push_str(&format!(
            "          scope {} (confidence {:.2})\n",
            scope.join(", "),
            vow.confidence
        ));
    }

    out.push_str(&format!("ledger    {} steps, {} ms\n", result.ledger.len(), result.total_latency_ms));
    for step in &result.ledger {
        let mark = match step.status {
            TraceStatus::Success => "ok",
            TraceStatus::Fail => "FAIL",
        };
        out.push_str(&format!(
            "  {:<4} {:<26} trust {:?}  {}\n",
            mark, step.tool, step.trust_level, step.evidence
        ));
    }

    if let Some(insights) = &result.evolution_insights {
        let meta = &insights.metacognitive_analysis;
        out.push_str(&format!(
            "mind      {} (confidence {:.2}, complexity {:.2})",
            meta.cognitive_state, meta.decision_confidence, meta.decision_complexity
        ));
        if meta.reflection_performed {
            out.push_str(" reflected");
        }
        out.push('\n');
        out.push_str(&format!(
            "learning  {} opportunities, {} learned\n",
            insights.adaptive_learning.learning_opportunities_detected,
            insights.adaptive_learning.learning_results.len()
        ));
        out.push_str(&format!(
            "knowledge {} integrated, graph size {}\n",
            insights.knowledge_evolution.knowledge_integrated,
            insights.knowledge_evolution.knowledge_graph_size
        ));
    }
    out
}

pub fn vow_line(vow: &VowSummary) -> String {
    let deadline = vow
        .deadline
        .map(|d| d.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "no deadline".to_string());
    let expired = if vow.is_expired { ", expired" } else { "" };
    format!(
        "{} [{} / {}{}] {:?} due {}",
        vow.id, vow.status, vow.priority, expired, vow.commitment, deadline
    )
}

pub fn evolution(learning: &LearningInsights, cognitive: &CognitiveSummary, knowledge: &KnowledgeSummary) -> String {
    let mut out = String::new();
    out.push_str("Adaptive learning\n");
    out.push_str(&format!(
        "  interactions {}  evolution records {}\n",
        learning.system_state.total_interactions, learning.total_evolution_records
    ));
    for usage in &learning.most_active_patterns {
        out.push_str(&format!(
            "  {:<28} used {:>3}  success {:.2}\n",
            usage.pattern_type.as_str(),
            usage.usage_count,
            usage.success_rate
        ));
    }
    out.push_str(&format!("  surfaced adaptations {}\n", learning.adaptation_history.len()));

    out.push_str("Metacognition\n");
    out.push_str(&format!(
        "  state {}  trend {:?}  self-awareness {:.2}\n",
        cognitive.current_state, cognitive.recent_confidence_trend, cognitive.system_self_awareness_score
    ));
    out.push_str(&format!(
        "  threshold {:.2}  cooldown {}s  reflections {}  insights {}\n",
        cognitive.confidence_threshold,
        cognitive.reflection_cooldown_secs,
        cognitive.reflection_frequency,
        cognitive.total_insights_generated
    ));

    out.push_str("Knowledge\n");
    out.push_str(&format!(
        "  nodes {}  connections {}  avg confidence {:.2}  health {:.2}\n",
        knowledge.total_knowledge_nodes,
        knowledge.total_connections,
        knowledge.average_confidence,
        knowledge.knowledge_health_score
    ));
    if !knowledge.evolution_opportunities.is_empty() {
        out.push_str(&format!("  unconnected: {}\n", knowledge.evolution_opportunities.join(", ")));
    }
    out
}
