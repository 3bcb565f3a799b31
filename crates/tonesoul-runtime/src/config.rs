//! Runtime configuration
//!
//! Every tunable in one place. Loaded from TOML at startup, falls back to
//! defaults if no config file exists.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tonesoul_core::GatewayConfig;
use tonesoul_evolution::{KnowledgeConfig, LearningConfig, MetacognitionConfig};

/// Top-level runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneSoulConfig {
    /// Input validation and responder fallback text.
    pub pipeline: PipelineConfig,
    /// Adaptive learning engine.
    pub learning: LearningConfig,
    /// Metacognitive monitor.
    pub metacognition: MetacognitionConfig,
    /// Knowledge evolution graph.
    pub knowledge: KnowledgeConfig,
    /// HTTP surface.
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Longest accepted sentence, in characters.
    pub max_sentence_chars: usize,
    /// Text returned when a responder faults.
    pub fallback_apology: String,
    /// Satisfaction score assumed when the caller supplies none.
    pub default_user_satisfaction: f64,
    /// Scores below this mark the interaction as `user_satisfaction_low`.
    pub low_satisfaction_threshold: f64,
}

// ============================================================
// Defaults
// ============================================================

impl Default for ToneSoulConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            learning: LearningConfig::default(),
            metacognition: MetacognitionConfig::default(),
            knowledge: KnowledgeConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_sentence_chars: 500,
            fallback_apology: "Sorry, I could not handle that request right now.".to_string(),
            default_user_satisfaction: 0.8,
            low_satisfaction_threshold: 0.7,
        }
    }
}

// ============================================================
// Loading
// ============================================================

impl ToneSoulConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Parse a TOML document, surfacing syntax errors instead of falling back.
    pub fn from_toml(content: &str) -> tonesoul_core::Result<Self> {
        toml::from_str(content).map_err(|e| tonesoul_core::Error::Config(e.to_string()))
    }

    /// Render the effective config as TOML (for generating a default file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }
}
