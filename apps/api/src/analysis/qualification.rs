//! Qualification rules: admin-defined gates reported next to an analysis.
//!
//! A failed rule never rewrites the recommendation; it is surfaced to the caller so the
//! bid team can decide.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::analysis::AnalysisResult;
use crate::models::rfp::RfpInput;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualificationRule {
    pub name: String,
    #[serde(default)]
    pub min_budget: Option<f64>,
    #[serde(default)]
    pub max_budget: Option<f64>,
    #[serde(default)]
    pub min_spec_match_percent: Option<f64>,
    #[serde(default)]
    pub min_days_before_deadline: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleFailure {
    pub rule: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualificationOutcome {
    pub qualified: bool,
    pub failures: Vec<RuleFailure>,
}

/// Checks every rule and collects all failures. `today` anchors the deadline check.
pub fn evaluate(
    rules: &[QualificationRule],
    input: &RfpInput,
    result: &AnalysisResult,
    today: NaiveDate,
) -> QualificationOutcome {
    let budget = input.budget.unwrap_or(0.0);
    let mut failures = Vec::new();

    for rule in rules {
        let mut fail = |reason: String| {
            failures.push(RuleFailure {
                rule: rule.name.clone(),
                reason,
            })
        };

        if let Some(min) = rule.min_budget {
            if budget < min {
                fail(format!("Budget {budget} is below the minimum of {min}"));
            }
        }
        if let Some(max) = rule.max_budget {
            if budget > max {
                fail(format!("Budget {budget} exceeds the maximum of {max}"));
            }
        }
        if let Some(min) = rule.min_spec_match_percent {
            if result.spec_match_score < min {
                fail(format!(
                    "Spec match {}% is below the required {min}%",
                    result.spec_match_score
                ));
            }
        }
        // Skipped when the RFP carries no due date.
        if let (Some(min_days), Some(due)) = (rule.min_days_before_deadline, input.due_date) {
            let days_left = (due - today).num_days();
            if days_left < min_days {
                fail(format!(
                    "Only {days_left} days before the deadline, {min_days} required"
                ));
            }
        }
    }

    QualificationOutcome {
        qualified: failures.is_empty(),
        failures,
    }
}
