//! Tests for tonesoul-evolution: learning, metacognition, knowledge graph

use chrono::{Duration, Utc};
use serde_json::json;
use tonesoul_core::{Ledger, TraceStatus, TraceStep, TrustLevel};
use tonesoul_evolution::knowledge::NodeOrigin;
use tonesoul_evolution::learning::LearningDetail;
use tonesoul_evolution::metacognition::{ProblemKind, ReflectionTrigger};
use tonesoul_evolution::*;

fn ledger(steps: Vec<TraceStep>) -> Ledger {
    let mut ledger = Ledger::new(None);
    for step in steps {
        ledger.append(step).unwrap();
    }
    ledger
}

fn all_a_success() -> Ledger {
    ledger(vec![
        TraceStep::success("core.tone_bridge.v1", "ok", TrustLevel::A),
        TraceStep::success("core.tone_classifier.v1", "ok", TrustLevel::A),
        TraceStep::success("core.tone_router.v1", "ok", TrustLevel::A),
        TraceStep::success("core.qa.v1", "ok", TrustLevel::A),
    ])
}

fn fail_b() -> TraceStep {
    TraceStep::new("core.qa.v1", TraceStatus::Fail, "responder failed", TrustLevel::B)
}

fn fail_c() -> TraceStep {
    TraceStep::new("core.qa.v1", TraceStatus::Fail, "responder failed", TrustLevel::C)
}

fn ctx(value: serde_json::Value) -> Context {
    value.as_object().cloned().unwrap()
}

fn feedback_context() -> Context {
    ctx(json!({
        "user_satisfaction_low": true,
        "response_time_high": true,
        "feedback_signals": { "response_time": 2500, "user_satisfaction": 0.4 }
    }))
}

// ===========================================================================
// Ring buffer
// ===========================================================================

#[test]
fn ring_buffer_bounded_and_serializes_in_order() {
    let mut ring = RingBuffer::new(2);
    ring.push("a");
    ring.push("b");
    ring.push("c");
    assert_eq!(ring.len(), 2);
    assert_eq!(serde_json::to_value(&ring).unwrap(), json!(["b", "c"]));
}

// ===========================================================================
// Adaptive learning
// ===========================================================================

#[test]
fn learning_seeds_three_patterns() {
    let engine = AdaptiveLearningEngine::default();
    let types: Vec<LearningType> = engine.patterns().iter().map(|p| p.pattern_type).collect();
    assert_eq!(
        types,
        vec![
            LearningType::FeedbackAdaptation,
            LearningType::PatternRecognition,
            LearningType::EmotionalCalibration,
        ]
    );
    assert_eq!(engine.state().active_learning_patterns.len(), 3);
    assert!(engine.patterns().iter().all(|p| p.usage_count == 0));
}

#[test]
fn learning_without_trigger_keys_detects_nothing() {
    let mut engine = AdaptiveLearningEngine::default();
    let result = engine.process_interaction(&all_a_success(), &Context::new());
    assert_eq!(result.learning_opportunities_detected, 0);
    assert!(result.learning_results.is_empty());
    assert_eq!(result.system_performance.total_interactions, 1);
    assert_eq!(result.system_performance.recent_success_rate, Some(1.0));
    assert_eq!(engine.interactions().len(), 1);
}

#[test]
fn feedback_adaptation_learns_and_records_evolution() {
    let mut engine = AdaptiveLearningEngine::default();
    let result = engine.process_interaction(&all_a_success(), &feedback_context());

    assert_eq!(result.learning_opportunities_detected, 1);
    assert_eq!(result.learning_results.len(), 1);
    let outcome = &result.learning_results[0];
    assert!(outcome.success);
    assert_eq!(
        outcome.detail,
        LearningDetail::FeedbackAdaptation {
            improvements_identified: vec![
                "optimize_response_time".into(),
                "improve_response_quality".into()
            ],
        }
    );

    let pattern = &engine.patterns()[0];
    assert_eq!(pattern.usage_count, 1);
    assert!((pattern.success_rate - 0.01).abs() < 1e-12);
    assert_eq!(engine.records().len(), 1);
    let record = engine.records().last().unwrap();
    assert_eq!(record.evolution_type, LearningType::FeedbackAdaptation);
    assert_eq!(record.status, EvolutionStatus::Integrated);
    assert_eq!(record.rollback_data, Some(record.before_state.clone()));
    assert_eq!(engine.state().evolution_history.len(), 1);
}

#[test]
fn used_pattern_confidence_follows_its_success_rate() {
    let mut engine = AdaptiveLearningEngine::default();
    engine.process_interaction(&all_a_success(), &feedback_context());
    // Base is now the 0.01 success rate, which keeps the pattern below threshold.
    let result = engine.process_interaction(&all_a_success(), &feedback_context());
    assert_eq!(result.learning_opportunities_detected, 1);
    assert!(result.learning_results.is_empty());
    assert_eq!(engine.patterns()[0].usage_count, 1);
}

#[test]
fn feedback_without_signals_counts_usage_but_not_success() {
    let mut engine = AdaptiveLearningEngine::default();
    let context = ctx(json!({ "user_satisfaction_low": true, "response_time_high": true }));
    let result = engine.process_interaction(&all_a_success(), &context);
    assert_eq!(result.learning_results.len(), 1);
    assert!(!result.learning_results[0].success);
    assert_eq!(engine.patterns()[0].usage_count, 1);
    assert_eq!(engine.patterns()[0].success_rate, 0.0);
    assert!(engine.records().is_empty());
}

#[test]
fn degradation_is_surfaced_once_per_cooldown() {
    let mut engine = AdaptiveLearningEngine::default();
    let now = Utc::now();
    let good = all_a_success();
    let bad = ledger(vec![fail_c()]);

    for _ in 0..30 {
        let r = engine.process_interaction_at(&good, &Context::new(), now);
        assert!(r.adaptation_suggestions.is_empty());
    }
    for i in 0..20 {
        let r = engine.process_interaction_at(&bad, &Context::new(), now);
        if i < 19 {
            assert!(r.adaptation_suggestions.is_empty());
        } else {
            assert_eq!(r.adaptation_suggestions.len(), 1);
            assert_eq!(r.adaptation_suggestions[0].kind, "performance_degradation");
            assert_eq!(r.adaptation_suggestions[0].severity, "medium");
        }
    }

    let r = engine.process_interaction_at(&bad, &Context::new(), now + Duration::minutes(5));
    assert!(r.adaptation_suggestions.is_empty());

    let insights = engine.insights();
    assert_eq!(insights.adaptation_history.len(), 1);
    assert_eq!(insights.performance_trends.success_rate_trend, Some(Trend::Declining));
}

#[test]
fn slow_responses_are_flagged() {
    let mut engine = AdaptiveLearningEngine::default();
    let slow = ledger(vec![TraceStep::success("core.qa.v1", "ok", TrustLevel::B).with_latency(2500)]);
    let mut last = None;
    for _ in 0..20 {
        last = Some(engine.process_interaction(&slow, &Context::new()));
    }
    let last = last.unwrap();
    assert_eq!(last.adaptation_suggestions.len(), 1);
    assert_eq!(last.adaptation_suggestions[0].kind, "response_time_high");
    assert_eq!(last.adaptation_suggestions[0].recommended_action, "optimize_processing_pipeline");
    assert_eq!(last.system_performance.avg_response_time, Some(2500.0));
}

#[test]
fn success_trend_needs_ten_samples() {
    let mut engine = AdaptiveLearningEngine::default();
    let bad = ledger(vec![fail_c()]);
    for _ in 0..9 {
        engine.process_interaction(&bad, &Context::new());
    }
    assert_eq!(engine.insights().performance_trends.success_rate_trend, None);

    engine.process_interaction(&bad, &Context::new());
    for _ in 0..10 {
        engine.process_interaction(&all_a_success(), &Context::new());
    }
    let insights = engine.insights();
    assert_eq!(insights.performance_trends.success_rate_trend, Some(Trend::Improving));
    assert_eq!(insights.most_active_patterns.len(), 3);
    assert!((engine.state().overall_performance_score - 0.5).abs() < 1e-12);
}

// ===========================================================================
// Metacognition
// ===========================================================================

#[test]
fn all_trust_a_success_is_full_confidence() {
    let mut monitor = MetacognitiveMonitor::default();
    let result = monitor.monitor(&all_a_success(), &Context::new());
    assert_eq!(result.decision_confidence, 1.0);
    assert_eq!(result.cognitive_state, CognitiveState::Optimal);
    assert!(!result.reflection_performed);
}

#[test]
fn failing_trust_b_step_is_uncertain() {
    let mut monitor = MetacognitiveMonitor::default();
    let result = monitor.monitor(&ledger(vec![fail_b()]), &Context::new());
    assert!((result.decision_confidence - 0.28).abs() < 1e-9);
    assert_eq!(result.cognitive_state, CognitiveState::Uncertain);
    assert_eq!(monitor.current_state(), CognitiveState::Uncertain);
}

#[test]
fn three_low_confidence_readings_trigger_reflection_once_per_cooldown() {
    let mut monitor = MetacognitiveMonitor::default();
    let now = Utc::now();
    let low = ledger(vec![fail_b()]);

    assert!(!monitor.monitor_at(&low, &Context::new(), now).reflection_performed);
    assert!(!monitor.monitor_at(&low, &Context::new(), now).reflection_performed);

    let third = monitor.monitor_at(&low, &Context::new(), now);
    assert!(third.reflection_performed);
    let reflection = third.reflection_results.unwrap();
    assert_eq!(reflection.triggers, vec![ReflectionTrigger::LowConfidenceDecision]);
    assert_eq!(reflection.trigger_trace_id, low.id().to_string());

    let fourth = monitor.monitor_at(&low, &Context::new(), now + Duration::minutes(10));
    assert!(!fourth.reflection_performed);

    let later = monitor.monitor_at(&low, &Context::new(), now + Duration::minutes(31));
    assert!(later.reflection_performed);

    let summary = monitor.summary();
    assert_eq!(summary.reflection_frequency, 2);
}

#[test]
fn frequent_biases_produce_an_insight_and_suggestion() {
    let mut monitor = MetacognitiveMonitor::default();
    let now = Utc::now();
    let low = ledger(vec![fail_b()]);
    for _ in 0..2 {
        monitor.monitor_at(&low, &Context::new(), now);
    }
    let reflection = monitor
        .monitor_at(&low, &Context::new(), now)
        .reflection_results
        .unwrap();

    assert!(reflection
        .insights_generated
        .iter()
        .any(|i| i.insight_type == ProblemKind::FrequentBiases));
    assert!(reflection
        .improvement_suggestions
        .iter()
        .any(|s| s.suggestion == "Monitor and gradually improve frequent_biases"));
    assert!(reflection.cognitive_adjustments.is_empty());
    assert_eq!(monitor.insights().len(), reflection.insights_generated.len());
    assert_eq!(monitor.insights().last().unwrap().validation_status, "pending");
}

#[test]
fn declining_confidence_lowers_threshold() {
    let mut monitor = MetacognitiveMonitor::default();
    let now = Utc::now();
    let ledgers = [
        ledger(vec![TraceStep::success("a", "ok", TrustLevel::B), fail_b()]), // 0.58
        ledger(vec![TraceStep::success("a", "ok", TrustLevel::B), fail_b(), fail_b()]), // 0.48
        ledger(vec![fail_b()]),           // 0.28
        ledger(vec![fail_b(), fail_c()]), // 0.22
    ];
    for l in &ledgers {
        monitor.monitor_at(l, &Context::new(), now);
    }

    let result = monitor.monitor_at(&ledger(vec![fail_c()]), &Context::new(), now + Duration::hours(1));
    assert!((result.decision_confidence - 0.16).abs() < 1e-9);
    let reflection = result.reflection_results.unwrap();
    assert!(reflection
        .problem_patterns
        .iter()
        .any(|p| p.kind == ProblemKind::DecliningConfidence));

    let adjustment = reflection
        .cognitive_adjustments
        .iter()
        .find(|a| a.adjustment_type == "confidence_threshold")
        .unwrap();
    assert_eq!(adjustment.old_value, json!(0.7));
    assert!((monitor.confidence_threshold() - 0.65).abs() < 1e-9);
    assert!(monitor
        .records()
        .iter()
        .any(|r| r.evolution_type == LearningType::MetacognitiveImprovement));
}

#[test]
fn load_metrics_move_by_ema() {
    let mut monitor = MetacognitiveMonitor::default();
    monitor.monitor(&all_a_success(), &Context::new());
    let load = monitor.load_metrics();
    // 0.9 * 0.5 + 0.1 * (4 / 15)
    assert!((load.processing_complexity - (0.45 + 0.1 * 4.0 / 15.0)).abs() < 1e-9);
    assert!((load.memory_usage - 0.27).abs() < 1e-9);
}

#[test]
fn cognitive_summary_on_fresh_monitor() {
    let monitor = MetacognitiveMonitor::default();
    let summary = monitor.summary();
    assert_eq!(summary.current_state, CognitiveState::Optimal);
    assert_eq!(summary.recent_confidence_trend, Trend::InsufficientData);
    assert_eq!(summary.bias_frequency, 0.0);
    assert_eq!(summary.total_insights_generated, 0);
    assert_eq!(summary.system_self_awareness_score, 0.0);
    assert_eq!(summary.reflection_cooldown_secs, 1800);
}

#[test]
fn confidence_trend_detects_improvement() {
    let mut monitor = MetacognitiveMonitor::default();
    let low = ledger(vec![fail_c()]);
    for _ in 0..5 {
        monitor.monitor(&low, &Context::new());
    }
    assert_eq!(monitor.confidence_trend(), Trend::Stable);
    for _ in 0..5 {
        monitor.monitor(&all_a_success(), &Context::new());
    }
    assert_eq!(monitor.confidence_trend(), Trend::Improving);
}

// ===========================================================================
// Knowledge graph
// ===========================================================================

fn route_ledger() -> Ledger {
    ledger(vec![TraceStep::success(
        "core.tone_router.v1",
        "Routing to qa based on function factual_inquiry",
        TrustLevel::B,
    )])
}

#[test]
fn graph_starts_with_seed_concepts() {
    let graph = KnowledgeGraph::default();
    assert_eq!(graph.len(), 5);
    let summary = graph.summary();
    assert_eq!(summary.total_knowledge_nodes, 5);
    assert_eq!(summary.concept_distribution.get("seed"), Some(&5));
    assert_eq!(summary.evolution_opportunities.len(), 5);
    assert_eq!(summary.total_connections, 0);
}

#[test]
fn route_evidence_creates_connected_nodes() {
    let mut graph = KnowledgeGraph::default();
    let result = graph.process_evolution(&route_ledger(), &Context::new());
    assert_eq!(result.knowledge_extracted, 1);
    assert_eq!(result.knowledge_validated, 1);
    assert_eq!(result.knowledge_integrated, 1);
    assert_eq!(result.connections_updated, 1);
    assert_eq!(result.knowledge_graph_size, 7);
    assert_eq!(result.evolution_stats.nodes_created, 2);

    let tone = graph.node("factual_inquiry").unwrap();
    assert_eq!(tone.origin, NodeOrigin::Pipeline);
    assert!((tone.connections["qa"] - 0.1).abs() < 1e-9);
    assert_eq!(graph.summary().total_connections, 1);
}

#[test]
fn same_concept_twice_validates_instead_of_duplicating() {
    let mut graph = KnowledgeGraph::default();
    graph.process_evolution(&route_ledger(), &Context::new());
    let size = graph.len();
    let before = graph.node("qa").unwrap().confidence;

    let result = graph.process_evolution(&route_ledger(), &Context::new());
    assert_eq!(result.knowledge_graph_size, size);
    let node = graph.node("qa").unwrap();
    assert_eq!(node.validation_count, 1);
    assert!(node.confidence > before);
    assert_eq!(node.source_traces.len(), 2);
    assert!((node.connections["factual_inquiry"] - 0.2).abs() < 1e-9);
}

#[test]
fn graph_size_never_shrinks() {
    let mut graph = KnowledgeGraph::default();
    let mut last = graph.len();
    let ledgers = [
        route_ledger(),
        ledger(vec![TraceStep::success("kb", "Greeting is not defined as rude", TrustLevel::A)]),
        ledger(vec![]),
        route_ledger(),
    ];
    for l in &ledgers {
        let size = graph.process_evolution(l, &Context::new()).knowledge_graph_size;
        assert!(size >= last);
        last = size;
    }
}

#[test]
fn low_trust_and_failed_evidence_is_not_integrated() {
    let mut graph = KnowledgeGraph::default();
    let l = ledger(vec![
        TraceStep::success("core.tone_bridge.v1", "Analyzed sentence. Detected intent: question.", TrustLevel::C),
        TraceStep::new(
            "kb",
            TraceStatus::Fail,
            "Entropy is defined as disorder",
            TrustLevel::A,
        ),
    ]);
    let result = graph.process_evolution(&l, &Context::new());
    assert_eq!(result.knowledge_extracted, 2);
    assert_eq!(result.knowledge_validated, 0);
    assert_eq!(result.knowledge_integrated, 0);
    assert_eq!(graph.len(), 5);
}

#[test]
fn negated_evidence_contradicts_existing_node() {
    let mut graph = KnowledgeGraph::default();
    let define = ledger(vec![TraceStep::success(
        "kb",
        "Photosynthesis is defined as light-driven synthesis",
        TrustLevel::A,
    )]);
    graph.process_evolution(&define, &Context::new());
    let node = graph.node("photosynthesis").unwrap();
    assert!((node.confidence - 0.9).abs() < 1e-9);
    assert_eq!(node.origin, NodeOrigin::Definition);

    let deny = ledger(vec![TraceStep::success(
        "kb",
        "Photosynthesis is not defined as magic",
        TrustLevel::A,
    )]);
    graph.process_evolution(&deny, &Context::new());
    let node = graph.node("photosynthesis").unwrap();
    assert_eq!(node.contradiction_count, 1);
    assert!((node.confidence - 0.8).abs() < 1e-9);
    assert_eq!(graph.stats().contradictions, 1);
}

#[test]
fn negation_without_a_node_is_skipped() {
    let mut graph = KnowledgeGraph::default();
    let deny = ledger(vec![TraceStep::success("kb", "Unicorn is not defined as real", TrustLevel::A)]);
    let result = graph.process_evolution(&deny, &Context::new());
    assert_eq!(result.knowledge_validated, 1);
    assert_eq!(result.knowledge_integrated, 0);
    assert!(graph.node("unicorn").is_none());
}

#[test]
fn contradicted_node_leaves_summary_but_stays_in_graph() {
    let mut graph = KnowledgeGraph::default();
    let deny = ledger(vec![TraceStep::success("kb", "Greeting is not defined as rude", TrustLevel::A)]);
    for _ in 0..8 {
        graph.process_evolution(&deny, &Context::new());
    }
    assert!(graph.node("greeting").unwrap().confidence < 0.1);
    let summary = graph.summary();
    assert_eq!(summary.total_knowledge_nodes, 4);
    assert_eq!(summary.knowledge_graph_size, 5);
    assert!(summary.knowledge_health_score >= 0.0 && summary.knowledge_health_score <= 1.0);
}

#[test]
fn stale_nodes_decay() {
    let mut graph = KnowledgeGraph::default();
    let later = Utc::now() + Duration::hours(2);
    graph.process_evolution_at(&route_ledger(), &Context::new(), later);
    let greeting = graph.node("greeting").unwrap();
    assert!((greeting.confidence - 0.8 * 0.99).abs() < 1e-9);
    assert_eq!(graph.stats().nodes_decayed, 5);
}

#[test]
fn configured_decay_factor_applies_to_stale_nodes() {
    let mut graph = KnowledgeGraph::new(KnowledgeConfig {
        decay_factor: 0.5,
        ..Default::default()
    });
    assert_eq!(graph.node("greeting").unwrap().decay_factor, 0.5);
    let later = Utc::now() + Duration::hours(2);
    graph.process_evolution_at(&route_ledger(), &Context::new(), later);
    let greeting = graph.node("greeting").unwrap();
    assert!((greeting.confidence - 0.4).abs() < 1e-9);
}

#[test]
fn empty_ledger_is_zero_effect() {
    let mut graph = KnowledgeGraph::default();
    let result = graph.process_evolution(&Ledger::new(None), &Context::new());
    assert_eq!(result.knowledge_extracted, 0);
    assert_eq!(result.knowledge_integrated, 0);
    assert_eq!(result.knowledge_graph_size, 5);
    assert!(graph.records().is_empty());
}

#[test]
fn commitment_evidence_reinforces_commitment_seed() {
    let mut graph = KnowledgeGraph::default();
    let l = ledger(vec![TraceStep::success(
        "core.vow_manager.v1",
        "Created commitment 1234 with commitment: 'to finish tomorrow.'",
        TrustLevel::B,
    )]);
    let result = graph.process_evolution(&l, &Context::new());
    assert_eq!(result.knowledge_integrated, 1);
    assert_eq!(graph.node("commitment").unwrap().validation_count, 1);
    assert_eq!(graph.len(), 5);
}

// ===========================================================================
// Engine state
// ===========================================================================

#[tokio::test]
async fn observe_feeds_every_engine() {
    let state = EngineState::default();
    let insights = state.observe(&route_ledger(), &Context::new()).await;
    assert_eq!(insights.adaptive_learning.system_performance.total_interactions, 1);
    assert_eq!(insights.knowledge_evolution.knowledge_integrated, 1);
    assert_eq!(state.metacognition().lock().await.history().len(), 1);

    let json = serde_json::to_value(&insights).unwrap();
    assert!(json.get("metacognitive_analysis").is_some());
}

#[tokio::test]
async fn manual_reflection_runs_one_monitor_cycle() {
    let state = EngineState::default();
    let report = state.trigger_reflection(None).await.unwrap();
    assert!(!report.reflection_triggered);
    assert_eq!(report.reflection_results.decision_confidence, 1.0);

    let summary = state.cognitive_summary().await;
    assert_eq!(summary.current_state, CognitiveState::Optimal);
    assert_eq!(state.knowledge_summary().await.knowledge_graph_size, 5);
    assert_eq!(state.learning_insights().await.system_state.total_interactions, 0);
}
