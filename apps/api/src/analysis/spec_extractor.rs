//! Spec extraction: table-driven pattern rules over normalized RFP text.
//!
//! Each rule is `(attribute, case-insensitive pattern, value transform)`. Rules are evaluated
//! in table order and the first rule that yields a value for an attribute wins.

use regex::{Captures, Regex};

use crate::models::analysis::ExtractedSpecs;
use crate::models::rfp::{SpecAttribute, SpecValue};

/// Extraction seam. Never fails: unreadable text yields all-absent specs.
pub trait SpecExtractor: Send + Sync {
    fn extract(&self, description: &str) -> ExtractedSpecs;
}

/// How a pattern match becomes a stored value.
#[derive(Debug, Clone)]
pub enum ValueTransform {
    /// Store a fixed canonical name, e.g. "xlpe" → "XLPE".
    Canonical(&'static str),
    /// Capture 1 = magnitude, capture 2 = unit (`v` / `kv`).
    Voltage,
    /// Capture 1 = standards body, capture 2 = code.
    Standard,
    /// Capture 1 = count, comma separators allowed.
    Quantity,
}

impl ValueTransform {
    fn apply(&self, caps: &Captures<'_>) -> Option<SpecValue> {
        match self {
            ValueTransform::Canonical(name) => Some(SpecValue::Text(name.to_string())),
            ValueTransform::Voltage => {
                let magnitude: f64 = caps.get(1)?.as_str().parse().ok()?;
                let unit = caps.get(2)?.as_str().to_lowercase();
                format_voltage(magnitude, &unit).map(SpecValue::Text)
            }
            ValueTransform::Standard => {
                let body = caps.get(1)?.as_str().to_uppercase();
                let body = body.split_whitespace().collect::<Vec<_>>().join(" ");
                let code = caps.get(2)?.as_str();
                Some(SpecValue::Text(format!("{body} {code}")))
            }
            ValueTransform::Quantity => {
                let digits: String = caps.get(1)?.as_str().chars().filter(|c| *c != ',').collect();
                let count: u64 = digits.parse().ok()?;
                (count > 0).then(|| SpecValue::Number(count as f64))
            }
        }
    }
}

fn format_voltage(magnitude: f64, unit: &str) -> Option<String> {
    if !magnitude.is_finite() || magnitude <= 0.0 {
        return None;
    }
    match unit {
        "kv" => Some(format!("{magnitude}kV")),
        "v" if magnitude >= 1000.0 => Some(format!("{}kV", magnitude / 1000.0)),
        "v" => Some(format!("{magnitude}V")),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pub attribute: SpecAttribute,
    pattern: Regex,
    transform: ValueTransform,
}

impl ExtractionRule {
    /// Builds a rule; the pattern is compiled case-insensitively.
    pub fn new(
        attribute: SpecAttribute,
        pattern: &str,
        transform: ValueTransform,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            attribute,
            pattern: Regex::new(&format!("(?i){pattern}"))?,
            transform,
        })
    }

    /// Returns the transformed value of the first match that yields one.
    pub fn evaluate(&self, text: &str) -> Option<SpecValue> {
        self.pattern
            .captures_iter(text)
            .find_map(|caps| self.transform.apply(&caps))
    }
}

/// Default extractor: keyword and unit matchers for electrical procurement RFPs.
#[derive(Debug, Clone)]
pub struct RuleBasedExtractor {
    rules: Vec<ExtractionRule>,
}

impl RuleBasedExtractor {
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
        }
    }

    pub fn with_rules(rules: Vec<ExtractionRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ExtractionRule] {
        &self.rules
    }
}

impl Default for RuleBasedExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SpecExtractor for RuleBasedExtractor {
    fn extract(&self, description: &str) -> ExtractedSpecs {
        let text = description.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut specs = ExtractedSpecs::default();
        if text.is_empty() {
            return specs;
        }

        for rule in &self.rules {
            if specs.is_present(rule.attribute) {
                continue;
            }
            if let Some(value) = rule.evaluate(&text) {
                // Transforms only emit values `set` accepts; a rejection just leaves it absent.
                if specs.set(rule.attribute, &value).is_err() {
                    tracing::debug!(attribute = %rule.attribute, "Discarded extracted value");
                }
            }
        }

        specs
    }
}

const PRODUCT_KEYWORDS: &[(&str, &str)] = &[
    (r"\bring\s+main\s+units?\b", "Ring Main Unit"),
    (r"\btransformers?\b", "Transformer"),
    (r"\bswitchgears?\b", "Switchgear"),
    (r"\bcircuit\s+breakers?\b", "Circuit Breaker"),
    (r"\bbus\s*bars?\b", "Busbar"),
    (r"\bcapacitor\s+banks?\b", "Capacitor Bank"),
    (r"\bsurge\s+arresters?\b", "Surge Arrester"),
    (r"\bpremium\s+widgets?\b", "Premium Widget"),
    (r"\bwidgets?\b", "Widget"),
    (r"\bgadgets?\b", "Gadget"),
];

const MATERIAL_KEYWORDS: &[(&str, &str)] = &[
    (r"\bxlpe\b", "XLPE"),
    (r"\bepr\b", "EPR"),
    (r"\bpvc\b", "PVC"),
    (r"\b(?:lszh|ls0h)\b", "LSZH"),
    (r"\bcopper\b", "Copper"),
    (r"\balumin(?:i)?um\b", "Aluminium"),
    (r"\bstainless\s+steel\b", "Stainless Steel"),
    (r"\bsteel\b", "Steel"),
];

fn default_rules() -> Vec<ExtractionRule> {
    let mut specs: Vec<(SpecAttribute, String, ValueTransform)> = Vec::new();

    for (pattern, name) in PRODUCT_KEYWORDS {
        specs.push((
            SpecAttribute::ProductType,
            pattern.to_string(),
            ValueTransform::Canonical(*name),
        ));
    }

    specs.push((
        SpecAttribute::VoltageRating,
        r"\b(\d+(?:\.\d+)?)\s*(kv|v)\b".to_string(),
        ValueTransform::Voltage,
    ));

    for (pattern, name) in MATERIAL_KEYWORDS {
        specs.push((
            SpecAttribute::Material,
            pattern.to_string(),
            ValueTransform::Canonical(*name),
        ));
    }

    specs.push((
        SpecAttribute::ComplianceStandard,
        r"\b(iec|iso|ieee|bs\s?en|bs|ul|ansi)\s*[-:]?\s*(\d{2,5}(?:-\d+)*)\b".to_string(),
        ValueTransform::Standard,
    ));

    specs.push((
        SpecAttribute::Quantity,
        r"\b(?:qty|quantity)\s*(?:of\s+)?[:=]?\s*(\d[\d,]*)".to_string(),
        ValueTransform::Quantity,
    ));
    specs.push((
        SpecAttribute::Quantity,
        r"\b(\d[\d,]*)\s*(?:units?|pcs|pieces|nos|sets|lots)\b".to_string(),
        ValueTransform::Quantity,
    ));

    specs
        .into_iter()
        .map(|(attribute, pattern, transform)| {
            ExtractionRule::new(attribute, &pattern, transform)
                .expect("built-in extraction patterns are valid")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> ExtractedSpecs {
        RuleBasedExtractor::new().extract(text)
    }

    #[test]
    fn test_reference_scenario() {
        let specs =
            extract("11kV high voltage distribution system, XLPE cable, IEC 60502 compliance");
        assert_eq!(specs.voltage_rating.as_deref(), Some("11kV"));
        assert_eq!(specs.material.as_deref(), Some("XLPE"));
        assert_eq!(specs.compliance_standard.as_deref(), Some("IEC 60502"));
        assert_eq!(specs.product_type, None);
        assert_eq!(specs.quantity, None);
    }

    #[test]
    fn test_empty_text_yields_no_specs() {
        assert!(extract("").is_empty());
        assert!(extract("   \n\t ").is_empty());
    }

    #[test]
    fn test_unrelated_text_yields_no_specs() {
        assert!(extract("Catering services for the annual staff picnic").is_empty());
    }

    #[test]
    fn test_voltage_in_volts() {
        assert_eq!(extract("415 V panel").voltage_rating.as_deref(), Some("415V"));
    }

    #[test]
    fn test_voltage_normalized_to_kv() {
        assert_eq!(extract("rated 11000V").voltage_rating.as_deref(), Some("11kV"));
        assert_eq!(extract("3.3 KV motor feed").voltage_rating.as_deref(), Some("3.3kV"));
    }

    #[test]
    fn test_voltage_ignores_words_starting_with_v() {
        assert_eq!(extract("2 versions of the panel").voltage_rating, None);
    }

    #[test]
    fn test_case_insensitive_matching() {
        let specs = extract("SUPPLY OF POWER TRANSFORMERS WITH copper WINDINGS, iec60076");
        assert_eq!(specs.product_type.as_deref(), Some("Transformer"));
        assert_eq!(specs.material.as_deref(), Some("Copper"));
        assert_eq!(specs.compliance_standard.as_deref(), Some("IEC 60076"));
    }

    #[test]
    fn test_rule_order_wins_over_text_order() {
        // Copper appears first in the text but XLPE has higher rule priority.
        let specs = extract("copper conductor with XLPE insulation");
        assert_eq!(specs.material.as_deref(), Some("XLPE"));
    }

    #[test]
    fn test_stainless_steel_before_steel() {
        assert_eq!(
            extract("stainless steel enclosure").material.as_deref(),
            Some("Stainless Steel")
        );
    }

    #[test]
    fn test_bs_en_standard_body() {
        assert_eq!(
            extract("to BS EN 50288-7").compliance_standard.as_deref(),
            Some("BS EN 50288-7")
        );
    }

    #[test]
    fn test_quantity_keyword_and_units() {
        assert_eq!(extract("Quantity: 1,200").quantity, Some(1200));
        assert_eq!(extract("supply 40 units of busbar").quantity, Some(40));
    }

    #[test]
    fn test_zero_quantity_falls_through_to_next_rule() {
        assert_eq!(extract("qty 0, deliver 12 sets").quantity, Some(12));
    }

    #[test]
    fn test_bare_cable_is_not_a_product_type() {
        assert_eq!(extract("XLPE cable").product_type, None);
    }

    #[test]
    fn test_ring_main_unit_beats_generic_match() {
        let specs = extract("11kV ring main unit with integrated transformer protection");
        assert_eq!(specs.product_type.as_deref(), Some("Ring Main Unit"));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let text = "33kV switchgear, EPR, ISO 9001, 5 units";
        assert_eq!(extract(text), extract(text));
    }

    #[test]
    fn test_custom_rule_table() {
        let rule = ExtractionRule::new(
            SpecAttribute::Material,
            r"\bgfrp\b",
            ValueTransform::Canonical("GFRP"),
        )
        .unwrap();
        assert_eq!(
            rule.evaluate("GFRP cable tray"),
            Some(SpecValue::Text("GFRP".to_string()))
        );

        let extractor = RuleBasedExtractor::with_rules(vec![rule]);
        let specs = extractor.extract("gfrp tray, 11kV");
        assert_eq!(specs.material.as_deref(), Some("GFRP"));
        assert_eq!(specs.voltage_rating, None);
    }

    #[test]
    fn test_invalid_custom_pattern_is_an_error() {
        assert!(ExtractionRule::new(
            SpecAttribute::Material,
            r"(unclosed",
            ValueTransform::Canonical("X")
        )
        .is_err());
    }

    #[test]
    fn test_default_table_covers_every_attribute() {
        let extractor = RuleBasedExtractor::new();
        for attribute in SpecAttribute::ALL {
            assert!(
                extractor.rules().iter().any(|r| r.attribute == attribute),
                "no rule for {attribute}"
            );
        }
    }
}
