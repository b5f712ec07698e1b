//! Win probability: spec match × margin blend, threshold recommendation, rule-table suggestions.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::models::analysis::{ExtractedSpecs, PricingResult, Recommendation};
use crate::models::rfp::SpecAttribute;
use crate::reference::{ReferenceData, SuggestionTrigger};

/// Output of the probability model, folded into `AnalysisResult` by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Score {
    pub spec_match_score: f64,
    pub win_probability: f64,
    pub recommendation: Recommendation,
    pub recommendation_reason: String,
    pub suggestions: Vec<String>,
}

#[derive(Clone)]
pub struct ProbabilityModel {
    reference: Arc<ReferenceData>,
}

impl ProbabilityModel {
    pub fn new(reference: Arc<ReferenceData>) -> Self {
        Self { reference }
    }

    pub fn score(&self, specs: &ExtractedSpecs, pricing: &PricingResult) -> Score {
        let spec_match_score = spec_match_score(specs);
        let win_probability = self.win_probability(spec_match_score, pricing);
        let recommendation = self.recommend(win_probability);
        let suggestions = self.suggestions(specs, pricing, spec_match_score, win_probability);

        Score {
            spec_match_score,
            win_probability,
            recommendation,
            recommendation_reason: recommendation.reason().to_string(),
            suggestions,
        }
    }

    /// spec_weight × match + margin_weight × margin score, clamped to [0, 100], 2 decimals.
    pub fn win_probability(&self, spec_match_score: f64, pricing: &PricingResult) -> f64 {
        let s = &self.reference.scoring;
        let margin_score = s.margin_score(pricing.pricing_recommendation);
        let blended = s.spec_weight * spec_match_score + s.margin_weight * margin_score;
        round2(blended.clamp(0.0, 100.0))
    }

    /// Thresholds evaluated in order, first match wins.
    pub fn recommend(&self, win_probability: f64) -> Recommendation {
        let s = &self.reference.scoring;
        if win_probability >= s.select_threshold {
            Recommendation::Select
        } else if win_probability >= s.consider_threshold {
            Recommendation::Consider
        } else if win_probability >= s.review_threshold {
            Recommendation::Review
        } else {
            Recommendation::Reject
        }
    }

    /// Evaluates the rule table in order. Duplicate texts keep their first position.
    pub fn suggestions(
        &self,
        specs: &ExtractedSpecs,
        pricing: &PricingResult,
        spec_match_score: f64,
        win_probability: f64,
    ) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut fallthrough = Vec::new();

        for rule in &self.reference.suggestions {
            let fired = match &rule.trigger {
                SuggestionTrigger::Missing { attribute } => !specs.is_present(*attribute),
                SuggestionTrigger::Pricing { recommendation } => {
                    pricing.pricing_recommendation == *recommendation
                }
                SuggestionTrigger::SpecMatchBelow { threshold } => spec_match_score < *threshold,
                SuggestionTrigger::WinProbabilityBelow { threshold } => {
                    win_probability < *threshold
                }
                SuggestionTrigger::Fallthrough => {
                    fallthrough.push(rule.text.as_str());
                    false
                }
            };
            if fired && seen.insert(rule.text.as_str()) {
                out.push(rule.text.clone());
            }
        }

        if out.is_empty() {
            for text in fallthrough {
                if seen.insert(text) {
                    out.push(text.to_string());
                }
            }
        }

        out
    }
}

/// Present scored attributes over the scored set, × 100.
pub fn spec_match_score(specs: &ExtractedSpecs) -> f64 {
    let total = SpecAttribute::SCORED.len();
    let found = specs.present_count(&SpecAttribute::SCORED);
    found as f64 / total as f64 * 100.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::{CostBreakdown, PricingRecommendation, RateSource};
    use crate::reference::{ScoringConfig, SuggestionRule};

    fn model() -> ProbabilityModel {
        ProbabilityModel::new(Arc::new(ReferenceData::default()))
    }

    fn pricing(recommendation: PricingRecommendation) -> PricingResult {
        PricingResult {
            estimated_cost: 0.0,
            reference_cost: 0.0,
            margin_percent: 0.0,
            pricing_recommendation: recommendation,
            rate_source: RateSource::Default,
            matched_sku: None,
            breakdown: CostBreakdown::default(),
            bid_value: 0.0,
            currency: "USD".to_string(),
        }
    }

    fn specs_with(count: usize) -> ExtractedSpecs {
        let mut specs = ExtractedSpecs::default();
        let values = ["Transformer", "11kV", "Copper", "IEC 60076"];
        for (attribute, value) in SpecAttribute::SCORED.iter().zip(values).take(count) {
            specs
                .set(*attribute, &crate::models::rfp::SpecValue::Text(value.to_string()))
                .unwrap();
        }
        specs
    }

    #[test]
    fn test_spec_match_is_k_over_n() {
        assert_eq!(spec_match_score(&specs_with(0)), 0.0);
        assert_eq!(spec_match_score(&specs_with(1)), 25.0);
        assert_eq!(spec_match_score(&specs_with(2)), 50.0);
        assert_eq!(spec_match_score(&specs_with(3)), 75.0);
        assert_eq!(spec_match_score(&specs_with(4)), 100.0);
    }

    #[test]
    fn test_quantity_does_not_count_toward_match() {
        let specs = ExtractedSpecs {
            quantity: Some(10),
            ..Default::default()
        };
        assert_eq!(spec_match_score(&specs), 0.0);
    }

    #[test]
    fn test_win_probability_blend() {
        let m = model();
        assert_eq!(
            m.win_probability(75.0, &pricing(PricingRecommendation::Competitive)),
            85.0
        );
        assert_eq!(m.win_probability(50.0, &pricing(PricingRecommendation::High)), 54.0);
        assert_eq!(m.win_probability(0.0, &pricing(PricingRecommendation::Low)), 8.0);
        assert_eq!(
            m.win_probability(100.0, &pricing(PricingRecommendation::Competitive)),
            100.0
        );
    }

    #[test]
    fn test_win_probability_clamped_with_oversized_weights() {
        let reference = ReferenceData {
            scoring: ScoringConfig {
                spec_weight: 2.0,
                margin_weight: 2.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let m = ProbabilityModel::new(Arc::new(reference));
        let p = m.win_probability(100.0, &pricing(PricingRecommendation::Competitive));
        assert_eq!(p, 100.0);
    }

    #[test]
    fn test_recommendation_boundaries() {
        let m = model();
        assert_eq!(m.recommend(75.0), Recommendation::Select);
        assert_eq!(m.recommend(75.01), Recommendation::Select);
        assert_eq!(m.recommend(74.99), Recommendation::Consider);
        assert_eq!(m.recommend(50.0), Recommendation::Consider);
        assert_eq!(m.recommend(50.01), Recommendation::Consider);
        assert_eq!(m.recommend(49.99), Recommendation::Review);
        assert_eq!(m.recommend(25.0), Recommendation::Review);
        assert_eq!(m.recommend(25.01), Recommendation::Review);
        assert_eq!(m.recommend(24.99), Recommendation::Reject);
        assert_eq!(m.recommend(0.0), Recommendation::Reject);
        assert_eq!(m.recommend(100.0), Recommendation::Select);
    }

    #[test]
    fn test_score_all_absent_low_margin_rejects() {
        let score = model().score(&ExtractedSpecs::default(), &pricing(PricingRecommendation::Low));
        assert_eq!(score.spec_match_score, 0.0);
        assert_eq!(score.win_probability, 8.0);
        assert_eq!(score.recommendation, Recommendation::Reject);
        assert_eq!(score.recommendation_reason, Recommendation::Reject.reason());
    }

    #[test]
    fn test_suggestions_follow_rule_table_order() {
        let specs = ExtractedSpecs {
            voltage_rating: Some("11kV".to_string()),
            material: Some("XLPE".to_string()),
            ..Default::default()
        };
        let s = model().suggestions(&specs, &pricing(PricingRecommendation::Low), 50.0, 38.0);
        assert_eq!(
            s,
            vec![
                "Ask the client to name the product type so the bid can be matched to the catalogue",
                "Add a compliance clause naming the applicable standard (e.g. IEC 60502)",
                "Request firm quantities to unlock volume pricing",
                "Renegotiate the budget: it does not cover the reference cost",
                "Consider adjusting technical specifications to better match available product portfolio",
                "Review pricing strategy - current margin may be too aggressive for market conditions",
            ]
        );
    }

    #[test]
    fn test_fallthrough_only_when_nothing_else_fires() {
        let mut specs = specs_with(4);
        specs.quantity = Some(5);
        let s = model().suggestions(
            &specs,
            &pricing(PricingRecommendation::Competitive),
            100.0,
            100.0,
        );
        assert_eq!(s.len(), 1);
        assert!(s[0].starts_with("Proposal appears well-aligned"));

        let s = model().suggestions(
            &specs_with(3),
            &pricing(PricingRecommendation::Competitive),
            75.0,
            85.0,
        );
        assert!(!s.iter().any(|t| t.starts_with("Proposal appears")));
    }

    #[test]
    fn test_suggestions_are_deduplicated() {
        let text = "Check the tender documents".to_string();
        let reference = ReferenceData {
            suggestions: vec![
                SuggestionRule {
                    trigger: SuggestionTrigger::Missing {
                        attribute: SpecAttribute::Material,
                    },
                    text: text.clone(),
                },
                SuggestionRule {
                    trigger: SuggestionTrigger::Missing {
                        attribute: SpecAttribute::VoltageRating,
                    },
                    text: text.clone(),
                },
            ],
            ..Default::default()
        };
        let m = ProbabilityModel::new(Arc::new(reference));
        let s = m.suggestions(
            &ExtractedSpecs::default(),
            &pricing(PricingRecommendation::High),
            0.0,
            0.0,
        );
        assert_eq!(s, vec![text]);
    }

    #[test]
    fn test_score_is_deterministic() {
        let specs = specs_with(2);
        let p = pricing(PricingRecommendation::High);
        assert_eq!(model().score(&specs, &p), model().score(&specs, &p));
    }
}
