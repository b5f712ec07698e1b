//! Analysis orchestration: validate → extract → price → score → assemble.
//!
//! The path (LIVE or FALLBACK) is decided once per call in `analyze`. LIVE may degrade to
//! FALLBACK on timeout, inference error or a response that fails validation; it never goes
//! back. Both paths return the same `AnalysisResult` shape.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analysis::live::{parse_live_response, AiCapability, FallbackReason};
use crate::analysis::pricing::PricingCalculator;
use crate::analysis::probability::ProbabilityModel;
use crate::analysis::spec_extractor::{RuleBasedExtractor, SpecExtractor};
use crate::analysis::AnalysisError;
use crate::models::analysis::{AnalysisResult, ExtractedSpecs};
use crate::models::rfp::{RfpInput, SpecHints};
use crate::reference::ReferenceData;

pub const DEFAULT_AI_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPath {
    Live,
    Fallback,
}

/// An analysis result tagged with the path that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Analysis {
    Live(AnalysisResult),
    Fallback {
        result: AnalysisResult,
        reason: FallbackReason,
    },
}

impl Analysis {
    pub fn result(&self) -> &AnalysisResult {
        match self {
            Analysis::Live(result) | Analysis::Fallback { result, .. } => result,
        }
    }

    pub fn into_result(self) -> AnalysisResult {
        match self {
            Analysis::Live(result) | Analysis::Fallback { result, .. } => result,
        }
    }

    pub fn path(&self) -> AnalysisPath {
        match self {
            Analysis::Live(_) => AnalysisPath::Live,
            Analysis::Fallback { .. } => AnalysisPath::Fallback,
        }
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            Analysis::Live(_) => None,
            Analysis::Fallback { reason, .. } => Some(reason),
        }
    }
}

pub struct AnalysisOrchestrator {
    extractor: Arc<dyn SpecExtractor>,
    pricing: PricingCalculator,
    model: ProbabilityModel,
    reference: Arc<ReferenceData>,
    ai: Option<Arc<dyn AiCapability>>,
    ai_timeout: Duration,
}

impl AnalysisOrchestrator {
    /// Local-only orchestrator with the default rule-based extractor.
    pub fn new(reference: Arc<ReferenceData>) -> Self {
        Self {
            extractor: Arc::new(RuleBasedExtractor::new()),
            pricing: PricingCalculator::new(reference.clone()),
            model: ProbabilityModel::new(reference.clone()),
            reference,
            ai: None,
            ai_timeout: DEFAULT_AI_TIMEOUT,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn SpecExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_ai(mut self, ai: Arc<dyn AiCapability>, timeout: Duration) -> Self {
        self.ai = Some(ai);
        self.ai_timeout = timeout;
        self
    }

    pub fn has_ai(&self) -> bool {
        self.ai.is_some()
    }

    pub fn extract(&self, text: &str) -> ExtractedSpecs {
        self.extractor.extract(text)
    }

    /// Runs one analysis. Only input validation can fail; everything after it recovers.
    pub async fn analyze(&self, input: &RfpInput) -> Result<Analysis, AnalysisError> {
        let budget = input.validate()?;
        let hints = input.structured_specs.as_ref();
        if let Some(hints) = hints {
            ExtractedSpecs::default()
                .apply_hints(hints)
                .map_err(AnalysisError::InvalidInput)?;
        }

        let text = input.analysis_text();

        let analysis = match &self.ai {
            None => Analysis::Fallback {
                result: self.run_local(&text, hints, budget)?,
                reason: FallbackReason::NoCapability,
            },
            Some(ai) => match self.run_live(ai.as_ref(), &text, hints, budget).await {
                Ok(result) => Analysis::Live(result),
                Err(reason) => {
                    warn!(title = %input.title, %reason, "Live analysis failed, using fallback");
                    Analysis::Fallback {
                        result: self.run_local(&text, hints, budget)?,
                        reason,
                    }
                }
            },
        };

        let result = analysis.result();
        info!(
            title = %input.title,
            path = ?analysis.path(),
            spec_match = result.spec_match_score,
            win_probability = result.win_probability,
            recommendation = ?result.recommendation,
            "RFP analysis completed"
        );

        Ok(analysis)
    }

    /// Deterministic pipeline: extract → hints → price → score.
    pub fn run_local(
        &self,
        text: &str,
        hints: Option<&SpecHints>,
        budget: f64,
    ) -> Result<AnalysisResult, AnalysisError> {
        let mut specs = self.extractor.extract(text);
        if let Some(hints) = hints {
            specs.apply_hints(hints).map_err(AnalysisError::InvalidInput)?;
        }
        debug!(?specs, "Extracted specs");

        let pricing = self.pricing.calculate(&specs, budget)?;
        let score = self.model.score(&specs, &pricing);

        Ok(AnalysisResult {
            extracted_specs: specs,
            pricing,
            spec_match_score: score.spec_match_score,
            win_probability: score.win_probability,
            recommendation: score.recommendation,
            recommendation_reason: score.recommendation_reason,
            suggestions: score.suggestions,
        })
    }

    /// LIVE pipeline. The AI supplies specs, a quoted reference cost and suggestions; margin,
    /// classification, both scores and the recommendation are recomputed from the budget.
    async fn run_live(
        &self,
        ai: &dyn AiCapability,
        text: &str,
        hints: Option<&SpecHints>,
        budget: f64,
    ) -> Result<AnalysisResult, FallbackReason> {
        let raw = tokio::time::timeout(self.ai_timeout, ai.infer(text, budget, hints))
            .await
            .map_err(|_| FallbackReason::Timeout {
                after_ms: self.ai_timeout.as_millis() as u64,
            })?
            .map_err(|e| FallbackReason::Inference(e.to_string()))?;

        let live = parse_live_response(&raw, &self.reference)?;
        let mut specs = live.extracted_specs;
        if let Some(hints) = hints {
            specs.apply_hints(hints).map_err(FallbackReason::Malformed)?;
        }

        let pricing = self
            .pricing
            .calculate_quoted(&specs, live.reference_cost, budget)
            .map_err(|e| FallbackReason::OutOfRange(e.to_string()))?;
        let score = self.model.score(&specs, &pricing);

        if score.spec_match_score != live.reported_spec_match_score
            || score.win_probability != live.reported_win_probability
            || pricing.margin_percent != live.reported_margin_percent
        {
            debug!(
                reported_spec_match = live.reported_spec_match_score,
                reported_win_probability = live.reported_win_probability,
                reported_margin = live.reported_margin_percent,
                spec_match = score.spec_match_score,
                win_probability = score.win_probability,
                margin = pricing.margin_percent,
                "Replaced AI-reported figures with locally derived values"
            );
        }

        let suggestions = if live.suggestions.is_empty() {
            score.suggestions
        } else {
            live.suggestions
        };

        Ok(AnalysisResult {
            extracted_specs: specs,
            pricing,
            spec_match_score: score.spec_match_score,
            win_probability: score.win_probability,
            recommendation: score.recommendation,
            recommendation_reason: score.recommendation_reason,
            suggestions,
        })
    }
}
