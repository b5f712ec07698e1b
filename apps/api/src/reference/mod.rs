//! Reference data: rate table, service fees, scoring constants and rule tables.
//!
//! Loaded once at startup (TOML file via `REFERENCE_DATA_PATH`, else built-in defaults),
//! validated, then shared read-only as `Arc<ReferenceData>` by every analysis.

pub mod defaults;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::analysis::qualification::QualificationRule;
use crate::models::analysis::PricingRecommendation;
use crate::models::rfp::SpecAttribute;

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("failed to read reference data {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse reference data {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("invalid reference data: {0}")]
    Invalid(String),
}

/// Reference unit cost for a product and/or voltage class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub voltage_rating: Option<String>,
    /// Catalogue SKU reported back when this entry prices an RFP.
    #[serde(default)]
    pub sku_id: Option<String>,
    pub unit_cost: f64,
}

/// Testing/certification fee applied when the compliance standard starts with the prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceFee {
    pub code: String,
    pub name: String,
    pub standard_prefix: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeTier {
    pub min_quantity: u64,
    pub factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarginScores {
    pub competitive: f64,
    pub high: f64,
    pub low: f64,
}

impl Default for MarginScores {
    fn default() -> Self {
        Self {
            competitive: 100.0,
            high: 60.0,
            low: 20.0,
        }
    }
}

/// Blend weights and thresholds for pricing and recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub spec_weight: f64,
    pub margin_weight: f64,
    pub margin_scores: MarginScores,
    /// margin_percent at or above this is COMPETITIVE.
    pub competitive_margin: f64,
    /// margin_percent at or above this (and below competitive) is HIGH.
    pub high_margin: f64,
    pub select_threshold: f64,
    pub consider_threshold: f64,
    pub review_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            spec_weight: 0.6,
            margin_weight: 0.4,
            margin_scores: MarginScores::default(),
            competitive_margin: 15.0,
            high_margin: 0.0,
            select_threshold: 75.0,
            consider_threshold: 50.0,
            review_threshold: 25.0,
        }
    }
}

impl ScoringConfig {
    /// Threshold function from margin to pricing recommendation.
    pub fn classify_margin(&self, margin_percent: f64) -> PricingRecommendation {
        if margin_percent >= self.competitive_margin {
            PricingRecommendation::Competitive
        } else if margin_percent >= self.high_margin {
            PricingRecommendation::High
        } else {
            PricingRecommendation::Low
        }
    }

    pub fn margin_score(&self, recommendation: PricingRecommendation) -> f64 {
        match recommendation {
            PricingRecommendation::Competitive => self.margin_scores.competitive,
            PricingRecommendation::High => self.margin_scores.high,
            PricingRecommendation::Low => self.margin_scores.low,
        }
    }
}

/// Condition under which a suggestion is emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuggestionTrigger {
    Missing { attribute: SpecAttribute },
    Pricing { recommendation: PricingRecommendation },
    SpecMatchBelow { threshold: f64 },
    WinProbabilityBelow { threshold: f64 },
    /// Fires only when no other rule fired.
    Fallthrough,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionRule {
    pub trigger: SuggestionTrigger,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceData {
    pub currency: String,
    /// Markup applied to the reference cost to produce the bid value.
    pub target_margin_percent: f64,
    /// Unit cost used when no rate entry matches.
    pub default_unit_cost: f64,
    pub rates: Vec<RateEntry>,
    pub service_fees: Vec<ServiceFee>,
    pub volume_tiers: Vec<VolumeTier>,
    pub scoring: ScoringConfig,
    pub suggestions: Vec<SuggestionRule>,
    pub qualification_rules: Vec<QualificationRule>,
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            target_margin_percent: 20.0,
            default_unit_cost: defaults::DEFAULT_UNIT_COST,
            rates: defaults::rates(),
            service_fees: defaults::service_fees(),
            volume_tiers: defaults::volume_tiers(),
            scoring: ScoringConfig::default(),
            suggestions: defaults::suggestion_rules(),
            qualification_rules: defaults::qualification_rules(),
        }
    }
}

impl ReferenceData {
    /// Loads from `path` when given, otherwise returns the built-in tables.
    pub fn load(path: Option<&Path>) -> Result<Self, ReferenceError> {
        match path {
            Some(p) => {
                let data = Self::load_from_file(p)?;
                info!(
                    path = %p.display(),
                    rates = data.rates.len(),
                    rules = data.suggestions.len(),
                    "Loaded reference data"
                );
                Ok(data)
            }
            None => {
                info!("No REFERENCE_DATA_PATH set, using built-in reference data");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ReferenceError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ReferenceError::Io(path.to_path_buf(), e))?;
        let data: Self =
            toml::from_str(&contents).map_err(|e| ReferenceError::Parse(path.to_path_buf(), e))?;
        data.validate()?;
        Ok(data)
    }

    pub fn validate(&self) -> Result<(), ReferenceError> {
        let invalid = |msg: String| Err(ReferenceError::Invalid(msg));

        if !is_amount(self.default_unit_cost) {
            return invalid(format!(
                "default_unit_cost must be a non-negative amount, got {}",
                self.default_unit_cost
            ));
        }
        if !self.target_margin_percent.is_finite() {
            return invalid("target_margin_percent must be finite".to_string());
        }
        if self.default_unit_cost == 0.0 {
            warn!("default_unit_cost is zero: unmatched RFPs will have no reference cost");
        }

        for (i, rate) in self.rates.iter().enumerate() {
            if rate.product_type.is_none() && rate.voltage_rating.is_none() {
                return invalid(format!(
                    "rates[{i}] must name a product_type, a voltage_rating or both"
                ));
            }
            if !is_amount(rate.unit_cost) {
                return invalid(format!("rates[{i}].unit_cost must be a non-negative amount"));
            }
        }

        for fee in &self.service_fees {
            if !is_amount(fee.price) {
                return invalid(format!("service fee {} must have a non-negative price", fee.code));
            }
            if fee.standard_prefix.trim().is_empty() {
                return invalid(format!("service fee {} has an empty standard_prefix", fee.code));
            }
        }

        for tier in &self.volume_tiers {
            if !tier.factor.is_finite() || tier.factor <= 0.0 {
                return invalid(format!(
                    "volume tier for {} units must have a positive factor",
                    tier.min_quantity
                ));
            }
        }

        let s = &self.scoring;
        if !is_amount(s.spec_weight) || !is_amount(s.margin_weight) {
            return invalid("scoring weights must be non-negative".to_string());
        }
        for score in [s.margin_scores.competitive, s.margin_scores.high, s.margin_scores.low] {
            if !(0.0..=100.0).contains(&score) {
                return invalid(format!("margin scores must lie in [0, 100], got {score}"));
            }
        }
        if !(s.competitive_margin.is_finite() && s.high_margin.is_finite())
            || s.competitive_margin < s.high_margin
        {
            return invalid("competitive_margin must be finite and >= high_margin".to_string());
        }
        if !(s.select_threshold >= s.consider_threshold
            && s.consider_threshold >= s.review_threshold)
        {
            return invalid(
                "recommendation thresholds must satisfy select >= consider >= review".to_string(),
            );
        }

        if let Some(rule) = self.suggestions.iter().find(|r| r.text.trim().is_empty()) {
            return invalid(format!("suggestion rule {:?} has empty text", rule.trigger));
        }

        Ok(())
    }
}

fn is_amount(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}
