//! Current provider pricing and the append-only record of price changes.
//!
//! The two are deliberately decoupled: writing a price never records history.
//! Callers that want an audit trail build a [`NewPriceChange`] themselves,
//! usually via [`NewPriceChange::transition`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_currency() -> String { "USD".to_owned() }

fn default_unit_type() -> String { "1M tokens".to_owned() }

/// The current price for a `(provider, model, plan)` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPricing {
  pub provider:       String,
  pub model:          String,
  pub plan:           String,
  /// Cost per `unit_type` of input.
  pub input_cost:     f64,
  /// Cost per `unit_type` of output.
  pub output_cost:    f64,
  #[serde(default = "default_currency")]
  pub currency:       String,
  #[serde(default = "default_unit_type")]
  pub unit_type:      String,
  /// Free allotment included with the plan, in `unit_type` units.
  #[serde(default)]
  pub included_units: Option<i64>,
}

impl ProviderPricing {
  /// A USD price per one million tokens.
  pub fn per_million_tokens(
    provider: impl Into<String>,
    model: impl Into<String>,
    plan: impl Into<String>,
    input_cost: f64,
    output_cost: f64,
  ) -> Self {
    Self {
      provider: provider.into(),
      model: model.into(),
      plan: plan.into(),
      input_cost,
      output_cost,
      currency: default_currency(),
      unit_type: default_unit_type(),
      included_units: None,
    }
  }

  /// Whether `other` carries a different input or output price.
  pub fn price_differs(&self, other: &Self) -> bool {
    self.input_cost != other.input_cost || self.output_cost != other.output_cost
  }
}

/// A price transition to be appended to the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPriceChange {
  pub provider:        String,
  pub model:           String,
  pub plan:            String,
  #[serde(default)]
  pub old_input_cost:  Option<f64>,
  #[serde(default)]
  pub old_output_cost: Option<f64>,
  pub new_input_cost:  f64,
  pub new_output_cost: f64,
  pub change_date:     DateTime<Utc>,
  #[serde(default)]
  pub change_reason:   Option<String>,
}

impl NewPriceChange {
  /// Describe the move from `old` (if any) to `new`.
  pub fn transition(
    old: Option<&ProviderPricing>,
    new: &ProviderPricing,
    reason: Option<String>,
    change_date: DateTime<Utc>,
  ) -> Self {
    Self {
      provider: new.provider.clone(),
      model: new.model.clone(),
      plan: new.plan.clone(),
      old_input_cost: old.map(|p| p.input_cost),
      old_output_cost: old.map(|p| p.output_cost),
      new_input_cost: new.input_cost,
      new_output_cost: new.output_cost,
      change_date,
      change_reason: reason,
    }
  }
}

/// A persisted [`NewPriceChange`] with its store-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
  pub id:     i64,
  #[serde(flatten)]
  pub change: NewPriceChange,
}
