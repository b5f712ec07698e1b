//! Pricing: reference-rate lookup, service fees, volume factor and margin classification.

use std::sync::Arc;

use tracing::debug;

use crate::analysis::AnalysisError;
use crate::models::analysis::{CostBreakdown, ExtractedSpecs, PricingResult, RateSource};
use crate::models::rfp::validate_budget;
use crate::reference::ReferenceData;

/// Bounds for margin_percent. The floor is also the "no reference available" value.
pub const MARGIN_FLOOR: f64 = -100.0;
pub const MARGIN_CEILING: f64 = 1000.0;

/// Unit cost resolved from the rate table.
#[derive(Debug, Clone, PartialEq)]
pub struct RateMatch {
    pub unit_cost: f64,
    pub source: RateSource,
    pub sku_id: Option<String>,
}

#[derive(Clone)]
pub struct PricingCalculator {
    reference: Arc<ReferenceData>,
}

impl PricingCalculator {
    pub fn new(reference: Arc<ReferenceData>) -> Self {
        Self { reference }
    }

    /// Prices an RFP against the reference tables. Fails only on an invalid budget.
    pub fn calculate(
        &self,
        specs: &ExtractedSpecs,
        budget: f64,
    ) -> Result<PricingResult, AnalysisError> {
        validate_budget(budget)?;

        let rate = self.lookup_rate(specs);
        let quantity = specs.quantity.unwrap_or(1);
        let (service_fees, applied_fees) = self.service_fees(specs);
        let breakdown = CostBreakdown {
            material_cost: rate.unit_cost * quantity as f64,
            service_fees,
            applied_fees,
        };

        Ok(self.assemble(specs, budget, rate.source, rate.sku_id, breakdown))
    }

    /// Prices against a reference cost quoted by an external source. Margin and
    /// classification are still derived here from the caller's budget.
    pub fn calculate_quoted(
        &self,
        specs: &ExtractedSpecs,
        reference_cost: f64,
        budget: f64,
    ) -> Result<PricingResult, AnalysisError> {
        validate_budget(budget)?;
        if !reference_cost.is_finite() || reference_cost < 0.0 {
            return Err(AnalysisError::InvalidInput(format!(
                "reference_cost must be a non-negative amount, got {reference_cost}"
            )));
        }

        let breakdown = CostBreakdown {
            material_cost: reference_cost,
            service_fees: 0.0,
            applied_fees: vec![],
        };

        Ok(self.assemble(specs, budget, RateSource::External, None, breakdown))
    }

    fn assemble(
        &self,
        specs: &ExtractedSpecs,
        budget: f64,
        source: RateSource,
        matched_sku: Option<String>,
        breakdown: CostBreakdown,
    ) -> PricingResult {
        let reference_cost = breakdown.material_cost + breakdown.service_fees;

        let estimated_cost = match specs.quantity {
            Some(q) => budget * self.volume_factor(q),
            None => budget,
        };

        let (margin_percent, rate_source) = if reference_cost > 0.0 {
            let margin = (budget - reference_cost) / reference_cost * 100.0;
            (margin.clamp(MARGIN_FLOOR, MARGIN_CEILING), source)
        } else {
            (MARGIN_FLOOR, RateSource::Unavailable)
        };

        let pricing_recommendation = self.reference.scoring.classify_margin(margin_percent);
        let bid_value = reference_cost * (1.0 + self.reference.target_margin_percent / 100.0);

        debug!(
            ?rate_source,
            reference_cost, margin_percent, "Computed pricing against reference rate"
        );

        PricingResult {
            estimated_cost,
            reference_cost,
            margin_percent,
            pricing_recommendation,
            rate_source,
            matched_sku,
            breakdown,
            bid_value,
            currency: self.reference.currency.clone(),
        }
    }

    /// Exact product×voltage → voltage-only → product-only → default rate.
    pub fn lookup_rate(&self, specs: &ExtractedSpecs) -> RateMatch {
        let product = specs.product_type.as_deref();
        let voltage = specs.voltage_rating.as_deref();
        let rates = &self.reference.rates;

        let exact = rates.iter().find(|r| {
            matches_key(r.product_type.as_deref(), product)
                && matches_key(r.voltage_rating.as_deref(), voltage)
        });
        if let Some(r) = exact {
            return RateMatch {
                unit_cost: r.unit_cost,
                source: RateSource::Exact,
                sku_id: r.sku_id.clone(),
            };
        }

        let by_voltage = rates
            .iter()
            .find(|r| r.product_type.is_none() && matches_key(r.voltage_rating.as_deref(), voltage));
        if let Some(r) = by_voltage {
            return RateMatch {
                unit_cost: r.unit_cost,
                source: RateSource::Voltage,
                sku_id: r.sku_id.clone(),
            };
        }

        let by_product = rates
            .iter()
            .find(|r| r.voltage_rating.is_none() && matches_key(r.product_type.as_deref(), product));
        if let Some(r) = by_product {
            return RateMatch {
                unit_cost: r.unit_cost,
                source: RateSource::Product,
                sku_id: r.sku_id.clone(),
            };
        }

        RateMatch {
            unit_cost: self.reference.default_unit_cost,
            source: RateSource::Default,
            sku_id: None,
        }
    }

    /// Sums fees whose standard prefix matches the extracted compliance standard.
    fn service_fees(&self, specs: &ExtractedSpecs) -> (f64, Vec<String>) {
        let Some(standard) = specs.compliance_standard.as_deref() else {
            return (0.0, vec![]);
        };
        let standard = standard.to_lowercase();

        let applied: Vec<_> = self
            .reference
            .service_fees
            .iter()
            .filter(|f| standard.starts_with(&f.standard_prefix.to_lowercase()))
            .collect();

        let total = applied.iter().map(|f| f.price).sum();
        (total, applied.iter().map(|f| f.name.clone()).collect())
    }

    /// Highest tier whose minimum the quantity reaches; 1.0 below every tier.
    fn volume_factor(&self, quantity: u64) -> f64 {
        self.reference
            .volume_tiers
            .iter()
            .filter(|t| quantity >= t.min_quantity)
            .max_by_key(|t| t.min_quantity)
            .map(|t| t.factor)
            .unwrap_or(1.0)
    }
}

/// Both sides present and equal, ignoring case. A missing key never matches.
fn matches_key(entry: Option<&str>, extracted: Option<&str>) -> bool {
    match (entry, extracted) {
        (Some(e), Some(x)) => e.eq_ignore_ascii_case(x),
        _ => false,
    }
}
