//! Execution model hint
//!
//! Chosen deterministically from prompt keywords, never by the model. Domain
//! calculators (anything with named real-world quantities) are forced to the
//! form model; only generic arithmetic requests get the expression model.
//! Form keywords win over expression keywords.

use calcsmith_core::ExecutionModel;

/// Domain keyword set that forces the form model.
const FORM_KEYWORDS: &[&str] = &[
    "cnc",
    "feed rate",
    "feeds and speeds",
    "loan",
    "mortgage",
    "interest",
    "amortization",
    "bmi",
    "body mass",
    "calorie",
    "dosage",
    "tip",
    "tax",
    "paycheck",
    "currency",
    "convert",
    "converter",
    "unit",
    "pace",
    "fuel",
    "discount",
    "percentage of",
];

/// Generic-arithmetic keyword set that selects the expression model.
const EXPRESSION_KEYWORDS: &[&str] = &[
    "standard",
    "scientific",
    "basic",
    "simple",
    "arithmetic",
    "expression",
    "rpn",
    "graphing",
];

/// Derive the execution model for a prompt.
pub fn execution_model_hint(prompt: &str) -> ExecutionModel {
    let lowered = prompt.to_lowercase();
    if FORM_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return ExecutionModel::Form;
    }
    if EXPRESSION_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return ExecutionModel::Expression;
    }
    ExecutionModel::Form
}
