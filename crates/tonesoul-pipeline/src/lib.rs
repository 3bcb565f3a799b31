//! ToneSoul Pipeline - bridge, classifier, router, responders and vows
//!
//! Each stage is a function from payload to enriched payload plus exactly
//! one ledger step. To add a responder: write a constructor in
//! responders.rs and register it below.

pub mod bridge;
pub mod classifier;
pub mod keywords;
pub mod payload;
pub mod pipeline;
pub mod registry;
pub mod responders;
pub mod router;
pub mod tone;
pub mod vow;

pub use bridge::ToneBridge;
pub use classifier::{ClassifierTables, ToneClassifier};
pub use payload::Payload;
pub use pipeline::IntentPipeline;
pub use registry::{Responder, ResponderError, ResponderRegistry};
pub use router::{RoutePriority, RoutingDecision, RoutingPolicy, RoutingTarget, ToneRouter};
pub use tone::{CoarseIntent, ToneFunction};
pub use vow::{Commitment, ParseError, ScopeTag, VowManager, VowPriority, VowStatus, VowSummary};

/// Create the registry with every built-in responder.
pub fn create_default_registry() -> ResponderRegistry {
    let mut registry = ResponderRegistry::new();

    // --- Information seeking ---
    registry.register(responders::qa());
    registry.register(responders::knowledge_base());
    registry.register(responders::reflection());

    // --- Emotional expression ---
    registry.register(responders::empathy());
    registry.register(responders::gratitude());
    registry.register(responders::complaint());

    // --- Actions and chat ---
    registry.register(responders::action_executor());
    registry.register(responders::assistance());
    registry.register(responders::conversation());
    registry.register(responders::statement_processor());

    // --- Fallback ---
    registry.register(responders::default_handler());

    registry
}
