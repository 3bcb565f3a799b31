//! ToneSoul Runtime - pipeline plus self-monitoring engines behind one facade

pub mod config;
pub mod result;
pub mod runtime;

pub use config::{PipelineConfig, ToneSoulConfig};
pub use result::ProcessResult;
pub use runtime::{EvolutionOverview, ModuleListing, SystemStatus, ToneSoulRuntime, SYSTEM_VERSION};
