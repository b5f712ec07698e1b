mod analysis;
mod config;
mod errors;
mod llm_client;
mod models;
mod reference;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::live::LlmAnalyst;
use crate::analysis::orchestrator::AnalysisOrchestrator;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::reference::ReferenceData;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting bid-assessor v{}", env!("CARGO_PKG_VERSION"));

    let reference = Arc::new(ReferenceData::load(config.reference_data_path.as_deref())?);

    let mut orchestrator = AnalysisOrchestrator::new(reference.clone());
    match &config.anthropic_api_key {
        Some(api_key) => {
            let llm = LlmClient::new(api_key.clone(), config.ai_timeout())?;
            let analyst = LlmAnalyst::new(llm, &reference);
            orchestrator = orchestrator.with_ai(Arc::new(analyst), config.ai_timeout());
            info!(
                "Live analysis enabled (model: {}, timeout: {}s)",
                llm_client::MODEL,
                config.ai_timeout_secs
            );
        }
        None => warn!("ANTHROPIC_API_KEY not set, every analysis takes the fallback path"),
    }

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        reference,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
