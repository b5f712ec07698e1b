//! Built-in reference tables, used when no reference data file is configured.

use crate::analysis::qualification::QualificationRule;
use crate::models::analysis::PricingRecommendation;
use crate::models::rfp::SpecAttribute;
use crate::reference::{RateEntry, ServiceFee, SuggestionRule, SuggestionTrigger, VolumeTier};

pub const DEFAULT_UNIT_COST: f64 = 100_000.0;

fn rate(product_type: Option<&str>, voltage_rating: Option<&str>, unit_cost: f64) -> RateEntry {
    RateEntry {
        product_type: product_type.map(str::to_string),
        voltage_rating: voltage_rating.map(str::to_string),
        sku_id: None,
        unit_cost,
    }
}

fn catalogue(sku_id: &str, product_type: &str, unit_cost: f64) -> RateEntry {
    RateEntry {
        sku_id: Some(sku_id.to_string()),
        ..rate(Some(product_type), None, unit_cost)
    }
}

pub fn rates() -> Vec<RateEntry> {
    vec![
        // product × voltage
        rate(Some("Transformer"), Some("11kV"), 185_000.0),
        rate(Some("Transformer"), Some("33kV"), 420_000.0),
        rate(Some("Switchgear"), Some("11kV"), 95_000.0),
        rate(Some("Switchgear"), Some("33kV"), 210_000.0),
        rate(Some("Ring Main Unit"), Some("11kV"), 60_000.0),
        // voltage class only
        rate(None, Some("415V"), 25_000.0),
        rate(None, Some("3.3kV"), 70_000.0),
        rate(None, Some("11kV"), 120_000.0),
        rate(None, Some("33kV"), 300_000.0),
        // product only
        rate(Some("Transformer"), None, 150_000.0),
        rate(Some("Switchgear"), None, 80_000.0),
        rate(Some("Circuit Breaker"), None, 15_000.0),
        rate(Some("Busbar"), None, 12_000.0),
        rate(Some("Capacitor Bank"), None, 40_000.0),
        rate(Some("Surge Arrester"), None, 2_500.0),
        // catalogue items
        catalogue("P001", "Widget", 50.0),
        catalogue("P002", "Premium Widget", 100.0),
        catalogue("P005", "Gadget", 200.0),
    ]
}

pub fn service_fees() -> Vec<ServiceFee> {
    let fee = |code: &str, name: &str, prefix: &str, price: f64| ServiceFee {
        code: code.to_string(),
        name: name.to_string(),
        standard_prefix: prefix.to_string(),
        price,
    };
    vec![
        fee("T001", "IEC Type Test", "IEC", 4_500.0),
        fee("T002", "IEC Routine Test", "IEC", 500.0),
        fee("T003", "ISO Conformity Audit", "ISO", 1_500.0),
        fee("T004", "IEEE Witness Test", "IEEE", 2_000.0),
    ]
}

pub fn volume_tiers() -> Vec<VolumeTier> {
    vec![
        VolumeTier {
            min_quantity: 1_000,
            factor: 0.90,
        },
        VolumeTier {
            min_quantity: 100,
            factor: 0.95,
        },
    ]
}

pub fn suggestion_rules() -> Vec<SuggestionRule> {
    let missing = |attribute: SpecAttribute, text: &str| SuggestionRule {
        trigger: SuggestionTrigger::Missing { attribute },
        text: text.to_string(),
    };
    let pricing = |recommendation: PricingRecommendation, text: &str| SuggestionRule {
        trigger: SuggestionTrigger::Pricing { recommendation },
        text: text.to_string(),
    };

    vec![
        missing(
            SpecAttribute::ProductType,
            "Ask the client to name the product type so the bid can be matched to the catalogue",
        ),
        missing(
            SpecAttribute::VoltageRating,
            "Confirm the required voltage rating with the client",
        ),
        missing(
            SpecAttribute::Material,
            "Request the conductor and insulation material requirements",
        ),
        missing(
            SpecAttribute::ComplianceStandard,
            "Add a compliance clause naming the applicable standard (e.g. IEC 60502)",
        ),
        missing(
            SpecAttribute::Quantity,
            "Request firm quantities to unlock volume pricing",
        ),
        pricing(
            PricingRecommendation::Low,
            "Renegotiate the budget: it does not cover the reference cost",
        ),
        pricing(
            PricingRecommendation::High,
            "Tighten the cost breakdown: the margin is below the competitive threshold",
        ),
        SuggestionRule {
            trigger: SuggestionTrigger::SpecMatchBelow { threshold: 70.0 },
            text: "Consider adjusting technical specifications to better match available product portfolio"
                .to_string(),
        },
        SuggestionRule {
            trigger: SuggestionTrigger::WinProbabilityBelow { threshold: 60.0 },
            text: "Review pricing strategy - current margin may be too aggressive for market conditions"
                .to_string(),
        },
        SuggestionRule {
            trigger: SuggestionTrigger::Fallthrough,
            text: "Proposal appears well-aligned with requirements - focus on competitive pricing and delivery timeline"
                .to_string(),
        },
    ]
}

pub fn qualification_rules() -> Vec<QualificationRule> {
    vec![QualificationRule {
        name: "Budget specified".to_string(),
        min_budget: Some(0.01),
        ..Default::default()
    }]
}
