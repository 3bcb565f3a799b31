//! Bridge -> Classifier -> Router -> Responder | Vow, in one call

use crate::bridge::ToneBridge;
use crate::classifier::ToneClassifier;
use crate::payload::Payload;
use crate::registry::ResponderRegistry;
use crate::router::{RoutingTarget, ToneRouter, DEFAULT_HANDLER};
use crate::vow::VowManager;
use std::sync::Arc;
use tonesoul_core::{Error, Result, TraceId};

pub struct IntentPipeline {
    bridge: ToneBridge,
    classifier: ToneClassifier,
    router: Arc<ToneRouter>,
    responders: ResponderRegistry,
    vows: Arc<VowManager>,
}

impl IntentPipeline {
    pub fn new(
        classifier: ToneClassifier,
        router: Arc<ToneRouter>,
        responders: ResponderRegistry,
        vows: Arc<VowManager>,
    ) -> Self {
        Self {
            bridge: ToneBridge::new(),
            classifier,
            router,
            responders,
            vows,
        }
    }

    pub fn router(&self) -> &Arc<ToneRouter> {
        &self.router
    }

    pub fn responders(&self) -> &ResponderRegistry {
        &self.responders
    }

    pub fn vows(&self) -> &Arc<VowManager> {
        &self.vows
    }

    /// Run every stage. A completed run leaves exactly four ledger steps.
    pub fn run(&self, sentence: &str, trace_id: Option<TraceId>) -> Result<Payload> {
        let payload = self.bridge.analyze(sentence, trace_id)?;
        let payload = self.classifier.classify(payload)?;
        let payload = self.router.route(payload)?;

        let target = payload
            .routing
            .as_ref()
            .map(|d| d.target.clone())
            .ok_or_else(|| Error::Internal("router produced no decision".into()))?;

        match target {
            RoutingTarget::VowPath => self.vows.process_vow(payload),
            RoutingTarget::Responder(name) => self.responders.dispatch(payload, &name),
            RoutingTarget::Fallback => self.responders.dispatch(payload, DEFAULT_HANDLER),
        }
    }
}

impl Default for IntentPipeline {
    fn default() -> Self {
        Self::new(
            ToneClassifier::new(),
            Arc::new(ToneRouter::new()),
            crate::create_default_registry(),
            Arc::new(VowManager::new()),
        )
    }
}
