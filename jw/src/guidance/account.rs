//! Guidance for account queries

use serde_json::Value;

use super::{GuidanceError, GuidanceResult, display, first_truthy};

fn amount(data: &Value, keys: &[&str]) -> String {
    first_truthy(data, keys).map(display).unwrap_or_else(|| "unknown".to_string())
}

pub(super) fn get_balance(data: &Value) -> Result<GuidanceResult, GuidanceError> {
    Ok(GuidanceResult::done(format!(
        "Account balance: ${}.",
        amount(data, &["balance_usd", "balance"])
    )))
}

pub(super) fn get_usage(data: &Value) -> Result<GuidanceResult, GuidanceError> {
    Ok(GuidanceResult::done(format!(
        "Usage data fetched. Total cost in range: ${}.",
        amount(data, &["total_cost_usd", "total"])
    )))
}
