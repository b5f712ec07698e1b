// Prompt constants for live RFP analysis.
// Cross-cutting fragments live in llm_client::prompts.

/// System prompt for live analysis. Built on the shared JSON-only fragment.
pub const LIVE_ANALYSIS_SYSTEM: &str = "You are an expert industrial bid engineer and pricing \
    analyst. You map client RFP requirements to our internal attribute schema and price them \
    against our reference rate table.";

/// Live analysis prompt. Replace: {rfp_text}, {budget}, {specs_hint}, {rate_table},
/// {competitive_margin}, {high_margin}
pub const LIVE_ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyse the client RFP below against our internal schema and reference data.

--- INTERNAL ATTRIBUTE SCHEMA ---
1. product_type (e.g. Transformer, Switchgear, Ring Main Unit)
2. voltage_rating (e.g. 415V, 11kV)
3. material (e.g. Copper, XLPE, Steel)
4. compliance_standard (e.g. ISO 9001, IEC 60502)
5. quantity (whole number of units)

--- REFERENCE DATA ---
{rate_table}

--- CLIENT BUDGET ---
{budget}

--- CALLER-VERIFIED VALUES (use these as given) ---
{specs_hint}

--- CLIENT RFP TEXT ---
{rfp_text}

Return a JSON object with this EXACT schema:
{
  "extracted_specs": {
    "product_type": "Transformer",
    "voltage_rating": "11kV",
    "material": null,
    "compliance_standard": "IEC 60076",
    "quantity": null
  },
  "pricing": {
    "estimated_cost": 150000.0,
    "reference_cost": 125000.0,
    "margin_percent": 20.0,
    "pricing_recommendation": "COMPETITIVE"
  },
  "spec_match_score": 75.0,
  "win_probability": 82.5,
  "suggestions": ["Add a compliance clause naming the applicable standard"]
}

RULES:
1. Use null for any attribute the RFP does not state. Do NOT invent values.
2. Do NOT add attributes outside the schema.
3. margin_percent = (CLIENT BUDGET - reference_cost) / reference_cost * 100, and estimated_cost is the client budget
4. pricing_recommendation: "COMPETITIVE" if margin_percent >= {competitive_margin}, "HIGH" if margin_percent >= {high_margin}, otherwise "LOW"
5. spec_match_score and win_probability are percentages between 0 and 100"#;
