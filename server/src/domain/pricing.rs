//! Model pricing table and cost calculation
//!
//! Rates are embedded at compile time and indexed once at boot; the table is
//! shared read-only behind `Arc` with no locking. Lookup is exact match
//! first, then longest prefix, which absorbs versioned model identifiers
//! like `anthropic.claude-opus-4-5-20251101-v1:0`.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

/// Embedded pricing data (compile-time); replace the JSON and rebuild to
/// update rates, no schema involvement.
const EMBEDDED_PRICING_JSON: &str = include_str!("../../data/model_prices.json");

#[derive(Error, Debug)]
pub enum PricingError {
    #[error("Failed to parse pricing data: {0}")]
    ParseError(String),
}

/// Per-1K-token USD rates for one model
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModelRates {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

/// How a model name resolved against the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Exact key match
    Exact,
    /// Longest-prefix match over all keys
    Prefix,
    /// No match; rates are zero and the cost is untracked
    #[default]
    NotFound,
}

/// Result of a cost calculation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostResult {
    /// USD, rounded to six decimal places
    pub cost_usd: f64,
    pub rates: ModelRates,
    pub matched: MatchKind,
}

impl CostResult {
    /// False when the model resolved to no table entry
    pub fn tracked(&self) -> bool {
        self.matched != MatchKind::NotFound
    }
}

/// Parsed and indexed pricing table
#[derive(Debug)]
pub struct PricingTable {
    /// Lowercase model key → rates
    rates: HashMap<String, ModelRates>,
    /// Keys sorted longest-first for prefix resolution
    prefix_keys: Vec<String>,
}

impl PricingTable {
    /// Load the compile-time embedded table
    pub fn embedded() -> Result<Self, PricingError> {
        Self::from_json_str(EMBEDDED_PRICING_JSON)
    }

    /// Parse a pricing table from JSON
    pub fn from_json_str(json: &str) -> Result<Self, PricingError> {
        let raw: serde_json::Value =
            serde_json::from_str(json).map_err(|e| PricingError::ParseError(e.to_string()))?;

        let obj = raw
            .as_object()
            .ok_or_else(|| PricingError::ParseError("Expected JSON object".into()))?;

        let mut rates = HashMap::new();
        for (key, value) in obj {
            let Some(entry) = value.as_object() else {
                continue;
            };

            let input_per_1k = entry
                .get("input_per_1k")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            let output_per_1k = entry
                .get("output_per_1k")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);

            if input_per_1k < 0.0 || output_per_1k < 0.0 {
                tracing::warn!(model = key, "Skipping model with negative pricing");
                continue;
            }

            rates.insert(
                key.to_lowercase(),
                ModelRates {
                    input_per_1k,
                    output_per_1k,
                },
            );
        }

        let mut prefix_keys: Vec<String> = rates.keys().cloned().collect();
        prefix_keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        Ok(Self { rates, prefix_keys })
    }

    pub fn model_count(&self) -> usize {
        self.rates.len()
    }

    /// Resolve a model name to rates: exact match wins, then the longest key
    /// that prefixes the model name.
    pub fn lookup(&self, model: &str) -> (ModelRates, MatchKind) {
        let model = model.to_lowercase();

        if let Some(rates) = self.rates.get(&model) {
            return (*rates, MatchKind::Exact);
        }

        // prefix_keys is longest-first, so the first hit is the longest match
        for key in &self.prefix_keys {
            if model.starts_with(key.as_str()) {
                return (self.rates[key], MatchKind::Prefix);
            }
        }

        (ModelRates::default(), MatchKind::NotFound)
    }

    /// Cost in USD for a call, rounded to six decimal places
    pub fn cost_usd(&self, model: &str, input_tokens: i64, output_tokens: i64) -> CostResult {
        let (rates, matched) = self.lookup(model);
        let cost = input_tokens as f64 / 1000.0 * rates.input_per_1k
            + output_tokens as f64 / 1000.0 * rates.output_per_1k;

        CostResult {
            cost_usd: round_micro_usd(cost),
            rates,
            matched,
        }
    }
}

/// Round to six decimal places (micro-USD)
pub fn round_micro_usd(cost: f64) -> f64 {
    (cost * 1_000_000.0).round() / 1_000_000.0
}
