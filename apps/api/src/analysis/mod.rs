// RFP analysis engine.
// Implements: spec extraction, pricing, win probability, qualification, live/fallback orchestration.
// All LLM calls go through llm_client via the AiCapability seam in live.rs.

pub mod handlers;
pub mod live;
pub mod orchestrator;
pub mod pricing;
pub mod probability;
pub mod prompts;
pub mod qualification;
pub mod spec_extractor;

use thiserror::Error;

/// The only error an analysis can return. Everything past validation recovers internally.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
