//! Stepcase Web Service
//!
//! Accepts recorded UI test projects, enriches every step through the
//! screenshot agent and turns the result into test cases through the
//! test-case agent.

pub mod agents;
pub mod config;
pub mod pipeline;
pub mod server;

#[cfg(test)]
mod testing;

pub use agents::{Agent, AgentReply, HttpAgent, PredictionRequest, Upload};
pub use config::{AgentEndpoints, ServiceConfig};
pub use server::{router, serve, AppState};
