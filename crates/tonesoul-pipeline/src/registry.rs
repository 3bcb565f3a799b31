//! Responder registry and trait definitions
//!
//! Each responder is a stateless capability: routed sentence in, response
//! text out. Responders are added in `create_default_registry()` in lib.rs.

use crate::payload::Payload;
use crate::router::DEFAULT_HANDLER;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tonesoul_core::{Result, TraceStep, TrustLevel};
use tracing::{debug, warn};

/// Fault raised by a responder. Degraded to a canned apology by the registry.
#[derive(Debug, thiserror::Error)]
#[error("responder {responder} failed: {message}")]
pub struct ResponderError {
    pub responder: String,
    pub message: String,
}

impl ResponderError {
    pub fn new(responder: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            responder: responder.into(),
            message: message.into(),
        }
    }
}

/// The Responder trait: implement this to add a handler for a route.
pub trait Responder: Send + Sync {
    /// Unique responder id, matched against routing targets (e.g. "qa").
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Trust level recorded for a successful response.
    fn trust_level(&self) -> TrustLevel {
        TrustLevel::B
    }

    /// Ledger tool identifier.
    fn tool_id(&self) -> String {
        format!("core.{}.v1", self.name())
    }

    fn respond(&self, sentence: &str) -> std::result::Result<String, ResponderError>;

    fn evidence(&self, sentence: &str) -> String {
        let excerpt: String = sentence.chars().take(50).collect();
        format!("{} processed input: '{}'", self.name(), excerpt)
    }
}

pub struct ResponderRegistry {
    responders: HashMap<String, Arc<dyn Responder>>,
    apology: String,
}

impl Default for ResponderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponderRegistry {
    pub fn new() -> Self {
        Self {
            responders: HashMap::new(),
            apology: "Sorry, I could not handle that request right now.".to_string(),
        }
    }

    pub fn with_apology(mut self, apology: impl Into<String>) -> Self {
        self.apology = apology.into();
        self
    }

    /// Register a responder. Replaces any existing responder with the same name.
    pub fn register(&mut self, responder: impl Responder + 'static) {
        let name = responder.name().to_string();
        self.responders.insert(name, Arc::new(responder));
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.responders.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Responder>> {
        self.responders.get(name).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.responders.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Run the named responder (or the default handler when it is not
    /// registered) and append its step to the payload ledger.
    pub fn dispatch(&self, mut payload: Payload, name: &str) -> Result<Payload> {
        let start = Instant::now();
        payload.ledger("responder")?;

        let responder = match self.get(name) {
            Some(r) => Some(r),
            None => {
                warn!(responder = %name, "Responder not registered, using default handler");
                self.get(DEFAULT_HANDLER)
            }
        };

        let (response, step) = match responder {
            Some(responder) => match responder.respond(&payload.sentence) {
                Ok(text) => {
                    debug!(responder = %responder.name(), "Responder produced output");
                    let step = TraceStep::success(
                        responder.tool_id(),
                        responder.evidence(&payload.sentence),
                        responder.trust_level(),
                    );
                    (text, step)
                }
                Err(e) => {
                    warn!(error = %e, "Responder failed, returning apology");
                    (self.apology.clone(), TraceStep::fail(responder.tool_id(), e.to_string()))
                }
            },
            None => {
                warn!(responder = %name, "No default handler registered");
                let tool = format!("core.{}.v1", name);
                let evidence = format!("No responder registered for '{}'", name);
                (self.apology.clone(), TraceStep::fail(tool, evidence))
            }
        };

        let latency = start.elapsed().as_millis() as u64;
        payload.ledger_mut("responder")?.append(step.with_latency(latency))?;
        payload.response = Some(response);
        Ok(payload)
    }
}
