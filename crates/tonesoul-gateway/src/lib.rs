//! ToneSoul Gateway - axum HTTP surface over the runtime

pub mod server;

pub use server::{build_router, start_gateway, ApiError, GatewayState, ProcessRequest};
