//! Tests for tonesoul-runtime: processing, feedback flags, vows, config loading

use std::io::Write;
use tonesoul_core::{BindMode, Error, TraceId};
use tonesoul_pipeline::{RoutePriority, RoutingPolicy, RoutingTarget, ToneFunction, VowStatus};
use tonesoul_runtime::*;

fn runtime_with_limit(max_sentence_chars: usize) -> ToneSoulRuntime {
    let mut config = ToneSoulConfig::default();
    config.pipeline.max_sentence_chars = max_sentence_chars;
    ToneSoulRuntime::new(config)
}

// ===========================================================================
// Processing
// ===========================================================================

#[tokio::test]
async fn process_returns_complete_result() {
    let runtime = ToneSoulRuntime::default();
    let result = runtime.process("Hello there", Some(TraceId::new("req-1"))).await;

    assert!(result.success);
    assert!(result.message.is_none());
    assert_eq!(result.trace_id.as_str(), "req-1");
    assert_eq!(result.tone_function, Some(ToneFunction::CasualChat));
    assert_eq!(result.routing_decision.as_ref().unwrap().next_module, "conversation");
    assert_eq!(
        result.tools(),
        vec![
            "core.tone_bridge.v1",
            "core.tone_classifier.v1",
            "core.tone_router.v1",
            "core.conversation.v1"
        ]
    );
    assert!(result.responder_output.is_some());
    assert!(result.vow.is_none());

    let insights = result.evolution_insights.as_ref().expect("engines ran");
    assert!(insights.knowledge_evolution.knowledge_graph_size >= 5);
    assert!(insights.metacognitive_analysis.decision_confidence > 0.0);
}

#[tokio::test]
async fn process_generates_trace_id_when_absent() {
    let runtime = ToneSoulRuntime::default();
    let a = runtime.process("Hello there", None).await;
    let b = runtime.process("Hello there", None).await;
    assert!(!a.trace_id.as_str().is_empty());
    assert_ne!(a.trace_id, b.trace_id);
}

#[tokio::test]
async fn overlong_sentence_fails_with_empty_ledger() {
    let runtime = runtime_with_limit(10);
    let result = runtime.process("This sentence is too long", None).await;

    assert!(!result.success);
    assert!(result.ledger.is_empty());
    assert_eq!(result.total_latency_ms, 0);
    assert!(result.evolution_insights.is_none());
    assert!(result.message.as_deref().unwrap().contains("limit is 10"));
    assert_eq!(result.original_sentence, "This sentence is too long");
}

#[tokio::test]
async fn limit_counts_characters_not_bytes() {
    let runtime = runtime_with_limit(6);
    let result = runtime.process("謝謝你的幫助", None).await;
    assert!(result.success);
    assert_eq!(result.tone_function, Some(ToneFunction::Appreciation));
}

#[tokio::test]
async fn empty_input_is_unknown_and_creates_no_vow() {
    let runtime = ToneSoulRuntime::default();
    let result = runtime.process("", None).await;
    assert!(result.success);
    assert_eq!(result.tone_function, Some(ToneFunction::Unknown));
    assert_eq!(result.ledger.len(), 4);
    assert!(result.vow.is_none());
    assert!(runtime.list_vows().is_empty());
}

#[tokio::test]
async fn result_serializes_ledger_steps() {
    let runtime = ToneSoulRuntime::default();
    let result = runtime.process("Thank you so much!", None).await;
    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(value["success"], true);
    assert_eq!(value["tone_function"], "appreciation");
    let steps = value["ledger"].as_array().unwrap();
    assert_eq!(steps.len(), 4);
    assert_eq!(steps[0]["tool"], "core.tone_bridge.v1");
    assert_eq!(steps[2]["status"], "success");
    assert!(steps[3]["timestamp"].is_string());
    assert!(value["evolution_insights"]["adaptive_learning"].is_object());
    assert!(value["evolution_insights"]["metacognitive_analysis"].is_object());
    assert!(value["evolution_insights"]["knowledge_evolution"].is_object());
}

// ===========================================================================
// Evolution context
// ===========================================================================

#[tokio::test]
async fn default_satisfaction_triggers_no_learning() {
    let runtime = ToneSoulRuntime::default();
    let result = runtime.process("Hello there", None).await;
    let learning = &result.evolution_insights.unwrap().adaptive_learning;
    assert_eq!(learning.learning_opportunities_detected, 0);
}

#[tokio::test]
async fn low_satisfaction_triggers_feedback_pattern() {
    let runtime = ToneSoulRuntime::default();
    let result = runtime.process_with_feedback("Hello there", None, Some(0.3)).await;
    let learning = &result.evolution_insights.unwrap().adaptive_learning;
    assert_eq!(learning.learning_opportunities_detected, 1);
}

#[tokio::test]
async fn repeated_tone_triggers_pattern_recognition() {
    let runtime = ToneSoulRuntime::default();
    let first = runtime.process("Hello there", None).await;
    let second = runtime.process("Hi, good morning", None).await;
    assert_eq!(first.tone_function, second.tone_function);

    let first = first.evolution_insights.unwrap().adaptive_learning;
    let second = second.evolution_insights.unwrap().adaptive_learning;
    assert_eq!(first.learning_opportunities_detected, 0);
    assert_eq!(second.learning_opportunities_detected, 1);
}

#[tokio::test]
async fn interactions_accumulate_in_learning_state() {
    let runtime = ToneSoulRuntime::default();
    runtime.process("Hello there", None).await;
    runtime.process("Where is the station?", None).await;
    let insights = runtime.get_learning_insights().await;
    assert_eq!(insights.system_state.total_interactions, 2);
}

// ===========================================================================
// Snapshots and reflection
// ===========================================================================

#[tokio::test]
async fn status_reports_version_and_seeded_graph() {
    let runtime = ToneSoulRuntime::default();
    let status = runtime.status().await;
    assert_eq!(status.system_version, SYSTEM_VERSION);
    assert!(status.evolution_enabled);
    assert_eq!(status.knowledge_evolution.total_knowledge_nodes, 5);
}

#[tokio::test]
async fn overview_condenses_engine_summaries() {
    let runtime = ToneSoulRuntime::default();
    runtime.process("Hello there", None).await;
    let overview = runtime.evolution_overview().await;
    let knowledge = runtime.get_knowledge_summary().await;
    assert_eq!(overview.total_knowledge_nodes, knowledge.total_knowledge_nodes);
    assert!((0.0..=1.0).contains(&overview.self_awareness_score));
}

#[tokio::test]
async fn manual_reflection_runs_one_monitor_cycle() {
    let runtime = ToneSoulRuntime::default();
    let report = runtime.trigger_reflection(None).await.unwrap();
    assert_eq!(report.reflection_results.decision_confidence, 1.0);

    let summary = runtime.get_cognitive_summary().await;
    assert_eq!(summary.current_state, report.reflection_results.cognitive_state);
}

// ===========================================================================
// Modules and routing
// ===========================================================================

#[tokio::test]
async fn list_modules_reports_responders_and_routes() {
    let runtime = ToneSoulRuntime::default();
    let modules = runtime.list_modules();
    assert_eq!(modules.available_modules.len(), 11);
    assert!(modules.available_modules.contains(&"qa".to_string()));
    assert_eq!(modules.routing_table["fallback"], "default_handler");
    assert_eq!(
        modules.evolution_modules,
        vec!["adaptive_learning", "metacognitive", "knowledge_evolution"]
    );
}

#[tokio::test]
async fn rebound_route_is_used_by_later_requests() {
    let runtime = ToneSoulRuntime::default();
    let previous = runtime.rebind_route(
        ToneFunction::Complaint,
        RoutingPolicy::new(RoutingTarget::responder("empathy"), RoutePriority::High, 1000),
    );
    assert_eq!(previous.unwrap().target, RoutingTarget::responder("complaint"));

    let result = runtime.process("This is terrible.", None).await;
    assert_eq!(result.tools()[3], "core.empathy.v1");
}

// ===========================================================================
// Vows
// ===========================================================================

#[tokio::test]
async fn commitment_lifecycle_through_runtime() {
    let runtime = ToneSoulRuntime::default();
    let result = runtime.process("I promise to finish tomorrow.", None).await;
    let vow = result.vow.expect("commitment created");
    assert!(vow.is_active());
    assert_eq!(runtime.list_vows().len(), 1);

    let fulfilled = runtime.fulfill_vow(&vow.id).unwrap();
    assert_eq!(fulfilled.status, VowStatus::Fulfilled);
    assert!(!fulfilled.is_active);

    let again = runtime.withdraw_vow(&vow.id);
    assert!(matches!(again, Err(Error::InvalidTransition { .. })));
}

#[tokio::test]
async fn unknown_vow_is_not_found() {
    let runtime = ToneSoulRuntime::default();
    assert!(matches!(runtime.fulfill_vow("missing"), Err(Error::NotFound(_))));
    assert!(matches!(runtime.withdraw_vow("missing"), Err(Error::NotFound(_))));
}

// ===========================================================================
// Configuration
// ===========================================================================

#[test]
fn config_loads_partial_toml_over_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[pipeline]\nmax_sentence_chars = 42\n\n[gateway]\nport = 9100\nbind = \"lan\"\n\n[metacognition]\nconfidence_threshold = 0.6"
    )
    .unwrap();

    let config = ToneSoulConfig::load(file.path());
    assert_eq!(config.pipeline.max_sentence_chars, 42);
    assert_eq!(config.pipeline.default_user_satisfaction, 0.8);
    assert_eq!(config.gateway.port, 9100);
    assert_eq!(config.gateway.bind, BindMode::Lan);
    assert_eq!(config.metacognition.confidence_threshold, 0.6);
    assert_eq!(config.metacognition.reflection_cooldown_secs, 1800);
    assert_eq!(config.learning.learning_rate, 0.01);
}

#[test]
fn missing_config_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = ToneSoulConfig::load(&dir.path().join("absent.toml"));
    assert_eq!(config.pipeline.max_sentence_chars, 500);
    assert_eq!(config.gateway.port, 8000);
    assert_eq!(config.gateway.bind, BindMode::Loopback);
}

#[test]
fn malformed_config_file_uses_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[pipeline\nmax_sentence_chars = ").unwrap();
    let config = ToneSoulConfig::load(file.path());
    assert_eq!(config.pipeline.max_sentence_chars, 500);
    assert!(matches!(
        ToneSoulConfig::from_toml("[pipeline\n"),
        Err(Error::Config(_))
    ));
}

#[test]
fn rendered_config_parses_back() {
    let mut config = ToneSoulConfig::default();
    config.knowledge.decay_factor = 0.95;
    let text = config.to_toml();
    assert!(text.contains("[knowledge]"));

    let parsed = ToneSoulConfig::from_toml(&text).unwrap();
    assert_eq!(parsed.knowledge, config.knowledge);
    assert_eq!(parsed.pipeline, config.pipeline);
    assert_eq!(parsed.learning, config.learning);
}
