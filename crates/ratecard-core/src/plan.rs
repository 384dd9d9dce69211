//! Plan metadata: the human-facing description of a provider's plan.

use serde::{Deserialize, Serialize};

/// Describes one named plan. Unique per `(provider, plan)`; an upsert
/// replaces every descriptive field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanMetadata {
  pub provider:          String,
  pub plan:              String,
  pub official_name:     String,
  #[serde(default)]
  pub cost_per_month:    Option<f64>,
  #[serde(default)]
  pub has_free_tier:     bool,
  #[serde(default)]
  pub documentation_url: Option<String>,
}
