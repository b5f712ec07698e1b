use std::sync::Arc;

use crate::analysis::orchestrator::AnalysisOrchestrator;
use crate::config::Config;
use crate::reference::ReferenceData;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AnalysisOrchestrator>,
    /// Same tables the orchestrator prices against; qualification rules are read from here.
    pub reference: Arc<ReferenceData>,
    pub config: Config,
}
