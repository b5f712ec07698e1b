use serde::{Deserialize, Serialize};

use crate::models::rfp::{SpecAttribute, SpecHints, SpecValue};

/// Placeholder strings that mean "not found" when they come back from a caller or a model.
const ABSENT_PLACEHOLDERS: &[&str] = &["not specified", "n/a", "na", "none", "unknown", "-"];

/// Normalized technical attributes. One slot per attribute in the fixed set, `None` = absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractedSpecs {
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub voltage_rating: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub compliance_standard: Option<String>,
    #[serde(default)]
    pub quantity: Option<u64>,
}

impl ExtractedSpecs {
    pub fn is_present(&self, attribute: SpecAttribute) -> bool {
        match attribute {
            SpecAttribute::ProductType => self.product_type.is_some(),
            SpecAttribute::VoltageRating => self.voltage_rating.is_some(),
            SpecAttribute::Material => self.material.is_some(),
            SpecAttribute::ComplianceStandard => self.compliance_standard.is_some(),
            SpecAttribute::Quantity => self.quantity.is_some(),
        }
    }

    /// Stores a value after normalization. Placeholder text clears the slot.
    pub fn set(&mut self, attribute: SpecAttribute, value: &SpecValue) -> Result<(), String> {
        let slot = match attribute {
            SpecAttribute::ProductType => &mut self.product_type,
            SpecAttribute::VoltageRating => &mut self.voltage_rating,
            SpecAttribute::Material => &mut self.material,
            SpecAttribute::ComplianceStandard => &mut self.compliance_standard,
            SpecAttribute::Quantity => {
                self.quantity = parse_quantity(value)?;
                return Ok(());
            }
        };

        *slot = match value {
            SpecValue::Text(s) => normalize_text(s),
            SpecValue::Number(n) if n.is_finite() => Some(n.to_string()),
            SpecValue::Number(n) => return Err(format!("{attribute} must be finite, got {n}")),
        };
        Ok(())
    }

    /// Builds specs from loosely-typed values, e.g. an AI response.
    pub fn from_values<'a, I>(values: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (SpecAttribute, Option<&'a SpecValue>)>,
    {
        let mut specs = Self::default();
        for (attribute, value) in values {
            if let Some(value) = value {
                specs.set(attribute, value)?;
            }
        }
        Ok(specs)
    }

    /// Overlays caller-supplied values on top of extracted ones.
    pub fn apply_hints(&mut self, hints: &SpecHints) -> Result<(), String> {
        for (attribute, value) in hints {
            self.set(*attribute, value)?;
        }
        Ok(())
    }

    pub fn present_count(&self, attributes: &[SpecAttribute]) -> usize {
        attributes.iter().filter(|a| self.is_present(**a)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.present_count(&SpecAttribute::ALL) == 0
    }
}

fn normalize_text(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() || ABSENT_PLACEHOLDERS.contains(&collapsed.to_lowercase().as_str()) {
        None
    } else {
        Some(collapsed)
    }
}

fn parse_quantity(value: &SpecValue) -> Result<Option<u64>, String> {
    match value {
        SpecValue::Number(n) => {
            if !n.is_finite() || *n < 0.0 || n.fract() != 0.0 {
                return Err(format!("quantity must be a whole non-negative number, got {n}"));
            }
            let q = *n as u64;
            Ok((q > 0).then_some(q))
        }
        SpecValue::Text(s) => {
            let Some(text) = normalize_text(s) else {
                return Ok(None);
            };
            let digits: String = text.chars().filter(|c| *c != ',').collect();
            let q = digits
                .parse::<u64>()
                .map_err(|_| format!("quantity must be a whole number, got '{text}'"))?;
            Ok((q > 0).then_some(q))
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pricing
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingRecommendation {
    Competitive,
    High,
    Low,
}

/// Which reference entry priced the bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    Exact,
    Voltage,
    Product,
    Default,
    /// Reference cost came out as zero; no meaningful margin exists.
    Unavailable,
    /// Priced by the external AI capability.
    External,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub material_cost: f64,
    pub service_fees: f64,
    pub applied_fees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingResult {
    pub estimated_cost: f64,
    pub reference_cost: f64,
    pub margin_percent: f64,
    pub pricing_recommendation: PricingRecommendation,
    pub rate_source: RateSource,
    /// SKU of the rate entry that priced the RFP, if it carries one.
    #[serde(default)]
    pub matched_sku: Option<String>,
    pub breakdown: CostBreakdown,
    /// Reference cost marked up by the target margin.
    pub bid_value: f64,
    pub currency: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Final result
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Select,
    Consider,
    Review,
    Reject,
}

impl Recommendation {
    pub fn reason(self) -> &'static str {
        match self {
            Recommendation::Select => {
                "Excellent match with strong win probability and high specification alignment."
            }
            Recommendation::Consider => {
                "Good potential with reasonable win probability and acceptable specification match."
            }
            Recommendation::Review => {
                "Marginal win probability, requires careful evaluation of competition and pricing."
            }
            Recommendation::Reject => {
                "Low win probability and poor specification match suggest pursuing other opportunities."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub extracted_specs: ExtractedSpecs,
    pub pricing: PricingResult,
    pub spec_match_score: f64,
    pub win_probability: f64,
    pub recommendation: Recommendation,
    pub recommendation_reason: String,
    pub suggestions: Vec<String>,
}
