//! Tests for tonesoul-core: ids, trace steps, ledger wire form, errors

use chrono::{Duration, Utc};
use tonesoul_core::*;

// ===========================================================================
// TraceId
// ===========================================================================

#[test]
fn trace_id_new_and_display() {
    let id = TraceId::new("trace-42");
    assert_eq!(id.as_str(), "trace-42");
    assert_eq!(format!("{}", id), "trace-42");
}

#[test]
fn trace_id_generate_is_unique() {
    let a = TraceId::generate();
    let b = TraceId::generate();
    assert_ne!(a, b);
    assert_eq!(a.as_str().len(), 36);
}

#[test]
fn trace_id_serializes_as_plain_string() {
    let id: TraceId = "abc".into();
    assert_eq!(serde_json::to_string(&id).unwrap(), r#""abc""#);
    let back: TraceId = serde_json::from_str(r#""abc""#).unwrap();
    assert_eq!(back, id);
}

// ===========================================================================
// TrustLevel / TraceStatus
// ===========================================================================

#[test]
fn trust_weights() {
    assert_eq!(TrustLevel::A.weight(), 1.0);
    assert_eq!(TrustLevel::B.weight(), 0.7);
    assert_eq!(TrustLevel::C.weight(), 0.4);
}

#[test]
fn trust_and_status_wire_names() {
    assert_eq!(serde_json::to_string(&TrustLevel::A).unwrap(), r#""A""#);
    assert_eq!(serde_json::to_string(&TraceStatus::Success).unwrap(), r#""success""#);
    assert_eq!(serde_json::to_string(&TraceStatus::Fail).unwrap(), r#""fail""#);
}

#[test]
fn unknown_trust_level_is_rejected() {
    let result: std::result::Result<TrustLevel, _> = serde_json::from_str(r#""D""#);
    assert!(result.is_err());
}

// ===========================================================================
// Ledger
// ===========================================================================

#[test]
fn new_ledger_generates_id_when_absent() {
    let ledger = Ledger::new(None);
    assert!(!ledger.id().as_str().is_empty());
    assert!(ledger.is_empty());
}

#[test]
fn new_ledger_keeps_supplied_id() {
    let ledger = Ledger::new(Some(TraceId::new("external-1")));
    assert_eq!(ledger.id().as_str(), "external-1");
}

#[test]
fn append_preserves_order() {
    let mut ledger = Ledger::with_id("t");
    for tool in ["one", "two", "three"] {
        ledger
            .append(TraceStep::success(tool, "ok", TrustLevel::B))
            .unwrap();
    }
    assert_eq!(ledger.tools(), vec!["one", "two", "three"]);
    assert_eq!(ledger.last().unwrap().tool, "three");
}

#[test]
fn append_rejects_missing_tool_or_evidence() {
    let mut ledger = Ledger::with_id("t");
    let err = ledger
        .append(TraceStep::success("", "evidence", TrustLevel::A))
        .unwrap_err();
    assert!(err.is_validation());
    let err = ledger
        .append(TraceStep::success("tool", "   ", TrustLevel::A))
        .unwrap_err();
    assert!(err.is_validation());
    assert!(ledger.is_empty());
}

#[test]
fn ledger_metrics() {
    let mut ledger = Ledger::with_id("t");
    ledger
        .append(TraceStep::success("a", "ok", TrustLevel::A).with_latency(10))
        .unwrap();
    ledger
        .append(TraceStep::fail("b", "broken").with_latency(30))
        .unwrap();
    assert_eq!(ledger.total_latency_ms(), 40);
    assert!((ledger.success_ratio() - 0.5).abs() < 1e-9);
    assert!((ledger.mean_trust_weight() - 0.7).abs() < 1e-9);
    assert_eq!(ledger.failed_steps(), 1);
}

#[test]
fn empty_ledger_metrics_are_zero() {
    let ledger = Ledger::new(None);
    assert_eq!(ledger.success_ratio(), 0.0);
    assert_eq!(ledger.mean_trust_weight(), 0.0);
    assert_eq!(ledger.total_latency_ms(), 0);
}

#[test]
fn wire_roundtrip_reconstructs_steps() {
    let start = Utc::now();
    let mut ledger = Ledger::with_id("wire-1");
    ledger
        .append(
            TraceStep::success("core.bridge.v1", "Detected intent: question.", TrustLevel::C)
                .with_input_digest(digest_input("hello?"))
                .with_latency(2)
                .at(start),
        )
        .unwrap();
    ledger
        .append(
            TraceStep::success("core.router.v1", "Routing to qa", TrustLevel::B)
                .at(start + Duration::milliseconds(3)),
        )
        .unwrap();

    let wire = ledger.to_wire().unwrap();
    let back = Ledger::from_wire(&wire).unwrap();
    assert_eq!(back, ledger);
    assert_eq!(back.steps(), ledger.steps());
}

#[test]
fn wire_field_order_and_digest_skipping() {
    let mut ledger = Ledger::with_id("wire-2");
    ledger
        .append(TraceStep::success("x", "evidence", TrustLevel::A))
        .unwrap();
    let wire = ledger.to_wire().unwrap();
    assert!(!wire.contains("input_digest"));
    let tool = wire.find("\"tool\"").unwrap();
    let status = wire.find("\"status\"").unwrap();
    let evidence = wire.find("\"evidence\"").unwrap();
    let trust = wire.find("\"trust_level\"").unwrap();
    let latency = wire.find("\"latency_ms\"").unwrap();
    let ts = wire.find("\"timestamp\"").unwrap();
    assert!(tool < status && status < evidence && evidence < trust && trust < latency && latency < ts);
}

#[test]
fn from_wire_rejects_invalid_trust_level() {
    let json = r#"{"id":"w","steps":[{"tool":"x","status":"success","evidence":"e",
        "trust_level":"Z","latency_ms":0,"timestamp":"2026-01-01T00:00:00Z"}]}"#;
    assert!(Ledger::from_wire(json).is_err());
}

#[test]
fn from_wire_rejects_out_of_order_steps() {
    let json = r#"{"id":"w","steps":[
        {"tool":"a","status":"success","evidence":"e","trust_level":"A","latency_ms":0,"timestamp":"2026-01-01T00:00:05Z"},
        {"tool":"b","status":"success","evidence":"e","trust_level":"A","latency_ms":0,"timestamp":"2026-01-01T00:00:01Z"}]}"#;
    assert!(Ledger::from_wire(json).is_err());
}

#[test]
fn serde_deserialize_goes_through_validation() {
    let json = r#"{"id":"w","steps":[{"tool":"","status":"fail","evidence":"e",
        "trust_level":"C","latency_ms":0,"timestamp":"2026-01-01T00:00:00Z"}]}"#;
    let parsed: std::result::Result<Ledger, _> = serde_json::from_str(json);
    assert!(parsed.is_err());
}

// ===========================================================================
// Error
// ===========================================================================

#[test]
fn error_display() {
    assert_eq!(
        Error::missing_ledger("classifier").to_string(),
        "missing ledger reference in classifier payload"
    );
    assert_eq!(
        Error::invalid_transition("v1", "fulfilled", "withdrawn").to_string(),
        "invalid transition for v1: fulfilled -> withdrawn"
    );
}

#[test]
fn error_from_json() {
    let err: Error = serde_json::from_str::<serde_json::Value>("{bad")
        .unwrap_err()
        .into();
    assert!(matches!(err, Error::Json(_)));
    assert!(!err.is_validation());
}

#[test]
fn error_from_io() {
    let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "tonesoul.toml").into();
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(err.to_string(), "io error: tonesoul.toml");
}

// ===========================================================================
// Gateway config
// ===========================================================================

#[test]
fn gateway_config_defaults() {
    let config = GatewayConfig::default();
    assert_eq!(config.port, 8000);
    assert_eq!(config.bind, BindMode::Loopback);
    assert_eq!(config.bind.to_addr(), "127.0.0.1");
    assert_eq!(BindMode::parse("lan").to_addr(), "0.0.0.0");
}
