//! Live path: the external AI capability, its response shape, and re-validation.
//!
//! Nothing the capability returns is trusted as-is. The raw text is parsed and range-checked
//! here; the orchestrator then re-prices against the caller's budget and re-scores locally.
//! Only the extracted specs, the quoted reference cost and the suggestions are kept.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::prompts::{LIVE_ANALYSIS_PROMPT_TEMPLATE, LIVE_ANALYSIS_SYSTEM};
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{LlmClient, LlmError};
use crate::models::analysis::{ExtractedSpecs, PricingRecommendation};
use crate::models::rfp::{SpecAttribute, SpecHints, SpecValue};
use crate::reference::ReferenceData;

/// Optional external inference capability. Absence is a normal configuration.
#[async_trait]
pub trait AiCapability: Send + Sync {
    /// Returns the raw model response for an RFP text, its budget and optional verified values.
    async fn infer(
        &self,
        description: &str,
        budget: f64,
        specs_hint: Option<&SpecHints>,
    ) -> Result<String, LlmError>;
}

/// Why an analysis took the fallback path. Recorded for diagnostics only.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    #[error("no AI capability configured")]
    NoCapability,

    #[error("AI call timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    #[error("AI call failed: {0}")]
    Inference(String),

    #[error("AI response malformed: {0}")]
    Malformed(String),

    #[error("AI response out of range: {0}")]
    OutOfRange(String),
}

#[derive(Debug, Deserialize)]
struct RawAssessment {
    extracted_specs: BTreeMap<SpecAttribute, Option<SpecValue>>,
    pricing: RawPricing,
    spec_match_score: f64,
    win_probability: f64,
    #[serde(default)]
    suggestions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawPricing {
    estimated_cost: f64,
    reference_cost: f64,
    margin_percent: f64,
    pricing_recommendation: PricingRecommendation,
}

/// A live response that passed shape and range validation.
/// The reported scores and margin are kept for diagnostics only.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveAssessment {
    pub extracted_specs: ExtractedSpecs,
    pub reference_cost: f64,
    pub reported_margin_percent: f64,
    pub reported_spec_match_score: f64,
    pub reported_win_probability: f64,
    pub suggestions: Vec<String>,
}

/// Parses and re-validates a raw capability response.
pub fn parse_live_response(
    raw: &str,
    reference: &ReferenceData,
) -> Result<LiveAssessment, FallbackReason> {
    let text = strip_json_fences(raw);
    if text.is_empty() {
        return Err(FallbackReason::Malformed("empty response".to_string()));
    }

    let parsed: RawAssessment =
        serde_json::from_str(text).map_err(|e| FallbackReason::Malformed(e.to_string()))?;

    let extracted_specs = ExtractedSpecs::from_values(
        parsed
            .extracted_specs
            .iter()
            .map(|(attribute, value)| (*attribute, value.as_ref())),
    )
    .map_err(FallbackReason::Malformed)?;

    check_score("spec_match_score", parsed.spec_match_score)?;
    check_score("win_probability", parsed.win_probability)?;

    let p = parsed.pricing;
    check_amount("estimated_cost", p.estimated_cost)?;
    check_amount("reference_cost", p.reference_cost)?;
    if !p.margin_percent.is_finite() {
        return Err(FallbackReason::OutOfRange(format!(
            "margin_percent must be finite, got {}",
            p.margin_percent
        )));
    }
    let expected = reference.scoring.classify_margin(p.margin_percent);
    if expected != p.pricing_recommendation {
        return Err(FallbackReason::OutOfRange(format!(
            "pricing_recommendation {:?} disagrees with margin {}% (expected {:?})",
            p.pricing_recommendation, p.margin_percent, expected
        )));
    }

    let mut suggestions: Vec<String> = Vec::new();
    for s in parsed.suggestions {
        let s = s.trim().to_string();
        if !s.is_empty() && !suggestions.contains(&s) {
            suggestions.push(s);
        }
    }

    Ok(LiveAssessment {
        extracted_specs,
        reference_cost: p.reference_cost,
        reported_margin_percent: p.margin_percent,
        reported_spec_match_score: parsed.spec_match_score,
        reported_win_probability: parsed.win_probability,
        suggestions,
    })
}

fn check_score(field: &str, value: f64) -> Result<(), FallbackReason> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(FallbackReason::OutOfRange(format!(
            "{field} must lie in [0, 100], got {value}"
        )))
    }
}

fn check_amount(field: &str, value: f64) -> Result<(), FallbackReason> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FallbackReason::OutOfRange(format!(
            "{field} must be a non-negative amount, got {value}"
        )))
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start()),
        None => text,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LlmAnalyst: Claude-backed capability
// ────────────────────────────────────────────────────────────────────────────

/// Production capability: prompts Claude with the RFP, the verified values and the rate table.
pub struct LlmAnalyst {
    llm: LlmClient,
    reference_summary: String,
    currency: String,
    competitive_margin: f64,
    high_margin: f64,
}

impl LlmAnalyst {
    pub fn new(llm: LlmClient, reference: &ReferenceData) -> Self {
        Self {
            llm,
            reference_summary: summarize_reference(reference),
            currency: reference.currency.clone(),
            competitive_margin: reference.scoring.competitive_margin,
            high_margin: reference.scoring.high_margin,
        }
    }

    fn build_prompt(
        &self,
        description: &str,
        budget: f64,
        specs_hint: Option<&SpecHints>,
    ) -> Result<String, LlmError> {
        let hint_json = match specs_hint {
            Some(hints) if !hints.is_empty() => serde_json::to_string_pretty(hints)?,
            _ => "none".to_string(),
        };

        Ok(LIVE_ANALYSIS_PROMPT_TEMPLATE
            .replace("{rate_table}", &self.reference_summary)
            .replace("{specs_hint}", &hint_json)
            .replace("{budget}", &format!("{budget} {}", self.currency))
            .replace("{competitive_margin}", &self.competitive_margin.to_string())
            .replace("{high_margin}", &self.high_margin.to_string())
            .replace("{rfp_text}", description))
    }
}

#[async_trait]
impl AiCapability for LlmAnalyst {
    async fn infer(
        &self,
        description: &str,
        budget: f64,
        specs_hint: Option<&SpecHints>,
    ) -> Result<String, LlmError> {
        let prompt = self.build_prompt(description, budget, specs_hint)?;
        let system = format!("{LIVE_ANALYSIS_SYSTEM} {JSON_ONLY_SYSTEM}");
        let response = self.llm.call(&prompt, &system).await?;
        response
            .text()
            .map(str::to_string)
            .ok_or(LlmError::EmptyContent)
    }
}

/// Renders the rate table and fees as prompt text.
fn summarize_reference(reference: &ReferenceData) -> String {
    let currency = &reference.currency;
    let mut out = String::from("Rates (unit cost):\n");
    for rate in &reference.rates {
        let product = rate.product_type.as_deref().unwrap_or("any product");
        let voltage = rate.voltage_rating.as_deref().unwrap_or("any voltage");
        let _ = writeln!(out, "- {product} @ {voltage}: {} {currency}", rate.unit_cost);
    }
    let _ = writeln!(
        out,
        "- anything else: {} {currency}",
        reference.default_unit_cost
    );
    if !reference.service_fees.is_empty() {
        out.push_str("Service fees (added when the compliance standard matches):\n");
        for fee in &reference.service_fees {
            let _ = writeln!(
                out,
                "- {} {} ({}*): {} {currency}",
                fee.code, fee.name, fee.standard_prefix, fee.price
            );
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "extracted_specs": {
            "product_type": "Transformer",
            "voltage_rating": "11kV",
            "material": "Not Specified",
            "compliance_standard": "IEC 60076",
            "quantity": 2
        },
        "pricing": {
            "estimated_cost": 400000.0,
            "reference_cost": 370000.0,
            "margin_percent": 8.1,
            "pricing_recommendation": "HIGH"
        },
        "spec_match_score": 75.0,
        "win_probability": 69.0,
        "suggestions": ["Confirm delivery schedule", "Confirm delivery schedule", "  "],
        "match_reasoning": "extra fields are ignored"
    }"#;

    fn reference() -> ReferenceData {
        ReferenceData::default()
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_parses_valid_response() {
        let live = parse_live_response(VALID, &reference()).unwrap();
        assert_eq!(live.extracted_specs.product_type.as_deref(), Some("Transformer"));
        assert_eq!(live.extracted_specs.material, None);
        assert_eq!(live.extracted_specs.quantity, Some(2));
        assert_eq!(live.reference_cost, 370_000.0);
        assert_eq!(live.reported_margin_percent, 8.1);
        assert_eq!(live.reported_win_probability, 69.0);
        assert_eq!(live.suggestions, vec!["Confirm delivery schedule".to_string()]);
    }

    #[test]
    fn test_parses_fenced_response() {
        let fenced = format!("```json\n{VALID}\n```");
        assert!(parse_live_response(&fenced, &reference()).is_ok());
    }

    #[test]
    fn test_rejects_non_json() {
        let err = parse_live_response("I think this bid looks great!", &reference()).unwrap_err();
        assert!(matches!(err, FallbackReason::Malformed(_)));
    }

    #[test]
    fn test_rejects_empty_response() {
        let err = parse_live_response("```json\n```", &reference()).unwrap_err();
        assert!(matches!(err, FallbackReason::Malformed(_)));
    }

    #[test]
    fn test_rejects_unknown_attribute() {
        let raw = VALID.replace("\"material\"", "\"durability_rating\"");
        let err = parse_live_response(&raw, &reference()).unwrap_err();
        assert!(matches!(err, FallbackReason::Malformed(_)));
    }

    #[test]
    fn test_rejects_score_above_100() {
        let raw = VALID.replace("\"win_probability\": 69.0", "\"win_probability\": 140.0");
        let err = parse_live_response(&raw, &reference()).unwrap_err();
        assert!(matches!(err, FallbackReason::OutOfRange(_)));
    }

    #[test]
    fn test_rejects_negative_score() {
        let raw = VALID.replace("\"spec_match_score\": 75.0", "\"spec_match_score\": -5.0");
        assert!(matches!(
            parse_live_response(&raw, &reference()),
            Err(FallbackReason::OutOfRange(_))
        ));
    }

    #[test]
    fn test_rejects_negative_cost() {
        let raw = VALID.replace("\"reference_cost\": 370000.0", "\"reference_cost\": -1.0");
        assert!(matches!(
            parse_live_response(&raw, &reference()),
            Err(FallbackReason::OutOfRange(_))
        ));
    }

    #[test]
    fn test_rejects_inconsistent_pricing_recommendation() {
        let raw = VALID.replace("\"HIGH\"", "\"COMPETITIVE\"");
        let err = parse_live_response(&raw, &reference()).unwrap_err();
        assert!(matches!(err, FallbackReason::OutOfRange(_)));
    }

    #[test]
    fn test_rejects_bad_quantity() {
        let raw = VALID.replace("\"quantity\": 2", "\"quantity\": 2.5");
        assert!(matches!(
            parse_live_response(&raw, &reference()),
            Err(FallbackReason::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_suggestions_default_to_empty() {
        let raw = VALID.replace(
            r#""suggestions": ["Confirm delivery schedule", "Confirm delivery schedule", "  "],"#,
            "",
        );
        let live = parse_live_response(&raw, &reference()).unwrap();
        assert!(live.suggestions.is_empty());
    }

    #[test]
    fn test_reference_summary_lists_rates_and_fees() {
        let summary = summarize_reference(&reference());
        assert!(summary.contains("Transformer @ 11kV: 185000 USD"));
        assert!(summary.contains("any product @ 11kV: 120000 USD"));
        assert!(summary.contains("anything else: 100000 USD"));
        assert!(summary.contains("T001 IEC Type Test"));
    }

    #[test]
    fn test_fallback_reason_serializes_tagged() {
        let json = serde_json::to_value(FallbackReason::Timeout { after_ms: 5000 }).unwrap();
        assert_eq!(json["kind"], "timeout");
        assert_eq!(json["detail"]["after_ms"], 5000);

        let json = serde_json::to_value(FallbackReason::NoCapability).unwrap();
        assert_eq!(json["kind"], "no_capability");
    }

    #[test]
    fn test_prompt_carries_budget_and_hints() {
        let llm = LlmClient::new("sk-test".to_string(), std::time::Duration::from_secs(5)).unwrap();
        let analyst = LlmAnalyst::new(llm, &reference());
        let mut hints = SpecHints::new();
        hints.insert(SpecAttribute::Material, SpecValue::Text("EPR".to_string()));

        let prompt = analyst
            .build_prompt("11kV feeder cable", 42_500.0, Some(&hints))
            .unwrap();
        assert!(prompt.contains("--- CLIENT BUDGET ---\n42500 USD"));
        assert!(prompt.contains("\"material\": \"EPR\""));
        assert!(prompt.contains("11kV feeder cable"));
        assert!(!prompt.contains("{budget}"));

        let prompt = analyst.build_prompt("11kV feeder cable", 0.0, None).unwrap();
        assert!(prompt.contains("--- CALLER-VERIFIED VALUES (use these as given) ---\nnone"));
    }
}
