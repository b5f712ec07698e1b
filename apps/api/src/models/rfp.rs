use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisError;

/// The fixed set of technical attributes the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecAttribute {
    ProductType,
    VoltageRating,
    Material,
    ComplianceStandard,
    Quantity,
}

impl SpecAttribute {
    pub const ALL: [SpecAttribute; 5] = [
        SpecAttribute::ProductType,
        SpecAttribute::VoltageRating,
        SpecAttribute::Material,
        SpecAttribute::ComplianceStandard,
        SpecAttribute::Quantity,
    ];

    /// Attributes that count toward the spec match score. Quantity only feeds pricing.
    pub const SCORED: [SpecAttribute; 4] = [
        SpecAttribute::ProductType,
        SpecAttribute::VoltageRating,
        SpecAttribute::Material,
        SpecAttribute::ComplianceStandard,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SpecAttribute::ProductType => "product_type",
            SpecAttribute::VoltageRating => "voltage_rating",
            SpecAttribute::Material => "material",
            SpecAttribute::ComplianceStandard => "compliance_standard",
            SpecAttribute::Quantity => "quantity",
        }
    }
}

impl fmt::Display for SpecAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw attribute value as supplied by a caller or an AI response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpecValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for SpecValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecValue::Number(n) => write!(f, "{n}"),
            SpecValue::Text(s) => f.write_str(s),
        }
    }
}

/// Caller-supplied attribute values, keyed by the fixed attribute set.
pub type SpecHints = BTreeMap<SpecAttribute, SpecValue>;

/// One RFP as handed over by the API layer. Never mutated by the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RfpInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Missing is representable so it can be rejected rather than defaulted.
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub structured_specs: Option<SpecHints>,
}

impl RfpInput {
    /// Checks required fields and returns the validated budget.
    pub fn validate(&self) -> Result<f64, AnalysisError> {
        if self.title.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("title is required".to_string()));
        }
        let budget = self
            .budget
            .ok_or_else(|| AnalysisError::InvalidInput("budget is required".to_string()))?;
        validate_budget(budget)?;
        Ok(budget)
    }

    /// Text handed to extraction: title and description together.
    pub fn analysis_text(&self) -> String {
        if self.description.trim().is_empty() {
            self.title.clone()
        } else {
            format!("{}\n{}", self.title, self.description)
        }
    }
}

pub fn validate_budget(budget: f64) -> Result<(), AnalysisError> {
    if !budget.is_finite() || budget < 0.0 {
        return Err(AnalysisError::InvalidInput(format!(
            "budget must be a non-negative amount, got {budget}"
        )));
    }
    Ok(())
}
