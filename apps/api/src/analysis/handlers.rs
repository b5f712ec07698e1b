//! Axum route handlers for the RFP analysis API.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::live::FallbackReason;
use crate::analysis::orchestrator::AnalysisPath;
use crate::analysis::qualification::{self, QualificationOutcome};
use crate::errors::AppError;
use crate::models::analysis::{AnalysisResult, ExtractedSpecs};
use crate::models::rfp::RfpInput;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub analysis_id: Uuid,
    pub path: AnalysisPath,
    pub fallback_reason: Option<FallbackReason>,
    pub result: AnalysisResult,
    pub qualification: QualificationOutcome,
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub extracted_specs: ExtractedSpecs,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/rfps/analyze
///
/// Full analysis: extract → price → score, LIVE when an AI capability is configured.
/// Qualification rules are reported alongside and never change the recommendation.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<RfpInput>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let analysis = state.orchestrator.analyze(&request).await?;

    let qualification = qualification::evaluate(
        &state.reference.qualification_rules,
        &request,
        analysis.result(),
        Utc::now().date_naive(),
    );

    Ok(Json(AnalyzeResponse {
        analysis_id: Uuid::new_v4(),
        path: analysis.path(),
        fallback_reason: analysis.fallback_reason().cloned(),
        result: analysis.into_result(),
        qualification,
    }))
}

/// POST /api/v1/rfps/extract
///
/// Rule-based extraction only. Useful for previewing what the analyzer will pick up.
pub async fn handle_extract(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, AppError> {
    if request.description.trim().is_empty() {
        return Err(AppError::Validation(
            "description cannot be empty".to_string(),
        ));
    }

    let extracted_specs = state.orchestrator.extract(&request.description);

    Ok(Json(ExtractResponse { extracted_specs }))
}
