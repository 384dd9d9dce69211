//! Ingestion: the only producer of store writes.
//!
//! Batches come from TOML documents transcribed from provider documentation.
//! Timestamps inside those documents must be quoted RFC 3339 strings.

use std::path::Path;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use ratecard_core::{
  limit::RateLimit,
  plan::PlanMetadata,
  pricing::{NewPriceChange, PriceChange, ProviderPricing},
  store::RateStore,
};
use serde::{Deserialize, Serialize};

/// A batch of facts to ingest.
#[derive(Debug, Default, Deserialize)]
pub struct IngestDocument {
  #[serde(default)]
  pub plans:       Vec<PlanMetadata>,
  #[serde(default)]
  pub rate_limits: Vec<RateLimit>,
  #[serde(default)]
  pub pricing:     Vec<ProviderPricing>,
  #[serde(default)]
  pub history:     Vec<NewPriceChange>,
}

impl IngestDocument {
  pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
    toml::from_str(raw).context("parsing ingest document")
  }

  pub fn read(path: &Path) -> anyhow::Result<Self> {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading ingest document {}", path.display()))?;
    Self::from_toml(&raw)
  }
}

/// How many facts of each kind an import wrote.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
  pub plans:       usize,
  pub rate_limits: usize,
  pub pricing:     usize,
  pub history:     usize,
}

/// Write every fact in `doc`, stopping at the first failure.
///
/// Each write is its own upsert; facts written before a failure stay written.
/// Pricing rows are imported as-is: history comes only from the document's
/// own `history` entries.
pub async fn import<S: RateStore>(store: &S, doc: IngestDocument) -> anyhow::Result<ImportSummary> {
  let mut summary = ImportSummary::default();

  for plan in doc.plans {
    let key = format!("{}/{}", plan.provider, plan.plan);
    store
      .upsert_plan_metadata(plan)
      .await
      .with_context(|| format!("writing plan {key}"))?;
    summary.plans += 1;
  }

  for limit in doc.rate_limits {
    let key = format!("{}/{}/{}", limit.provider, limit.plan, limit.limit_type);
    store
      .upsert_rate_limit(limit)
      .await
      .with_context(|| format!("writing rate limit {key}"))?;
    summary.rate_limits += 1;
  }

  for pricing in doc.pricing {
    let key = format!("{}/{}/{}", pricing.provider, pricing.model, pricing.plan);
    store
      .upsert_provider_pricing(pricing)
      .await
      .with_context(|| format!("writing pricing {key}"))?;
    summary.pricing += 1;
  }

  for change in doc.history {
    store
      .append_pricing_history(change)
      .await
      .context("appending pricing history")?;
    summary.history += 1;
  }

  tracing::info!(
    plans = summary.plans,
    rate_limits = summary.rate_limits,
    pricing = summary.pricing,
    history = summary.history,
    "import complete"
  );
  Ok(summary)
}

/// Write a new current price and, when `reason` is given, pair it with a
/// history entry describing the transition.
///
/// The store never derives history itself, so the previous price is read
/// here before it is overwritten. No entry is recorded when the price did not
/// actually change.
pub async fn set_pricing<S: RateStore>(
  store: &S,
  pricing: ProviderPricing,
  reason: Option<String>,
  at: DateTime<Utc>,
) -> anyhow::Result<Option<PriceChange>> {
  let Some(reason) = reason else {
    store.upsert_provider_pricing(pricing).await?;
    return Ok(None);
  };

  let previous = store
    .get_provider_pricing(&pricing.provider, &pricing.model, &pricing.plan)
    .await?;
  store.upsert_provider_pricing(pricing.clone()).await?;

  if previous.as_ref().is_some_and(|old| !old.price_differs(&pricing)) {
    tracing::debug!("price unchanged; no history recorded");
    return Ok(None);
  }

  let change = NewPriceChange::transition(previous.as_ref(), &pricing, Some(reason), at);
  Ok(Some(store.append_pricing_history(change).await?))
}

#[cfg(test)]
mod tests {
  use ratecard_core::{limit::ScopeKind, store::RateLimitQuery};
  use ratecard_store_sqlite::SqliteStore;

  use super::*;

  const DOC: &str = r#"
[[plans]]
provider = "openai"
plan = "tier-1"
official_name = "Usage Tier 1"
cost_per_month = 5.0
documentation_url = "https://platform.openai.com/docs/guides/rate-limits"

[[rate_limits]]
provider = "openai"
plan = "tier-1"
limit_type = "tpm"
limit_value = 80000
last_verified = "2025-01-15T00:00:00Z"

[[rate_limits]]
provider = "openai"
plan = "tier-1"
limit_type = "tpm"
model = "gpt-4o"
applies_to = "model"
limit_value = 30000
reset_window_seconds = 60

[[pricing]]
provider = "openai"
model = "gpt-4o"
plan = "tier-1"
input_cost = 2.5
output_cost = 10.0

[[history]]
provider = "openai"
model = "gpt-4o"
plan = "tier-1"
old_input_cost = 5.0
old_output_cost = 15.0
new_input_cost = 2.5
new_output_cost = 10.0
change_date = "2024-08-06T00:00:00Z"
change_reason = "gpt-4o-2024-08-06 pricing"
"#;

  #[tokio::test]
  async fn imports_every_section() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let doc = IngestDocument::from_toml(DOC).unwrap();

    let summary = import(&store, doc).await.unwrap();
    assert_eq!(summary, ImportSummary { plans: 1, rate_limits: 2, pricing: 1, history: 1 });

    let limits = store
      .query_rate_limit(&RateLimitQuery::new("openai", "tier-1", "tpm").model("gpt-4o"))
      .await
      .unwrap();
    assert_eq!(limits.len(), 2);
    assert_eq!(limits[0].applies_to, ScopeKind::Model);
    assert_eq!(limits[0].reset_window_seconds, Some(60));

    let pricing = store.get_provider_pricing("openai", "gpt-4o", "tier-1").await.unwrap();
    assert_eq!(pricing.map(|p| p.currency), Some("USD".to_owned()));
    let history = store.get_pricing_history("openai", "gpt-4o", "tier-1").await.unwrap();
    assert_eq!(history.len(), 1);
  }

  #[tokio::test]
  async fn import_stops_at_inconsistent_scope() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let doc = IngestDocument::from_toml(
      r#"
[[rate_limits]]
provider = "openai"
plan = "tier-1"
limit_type = "rpm"
model = "gpt-4o"
applies_to = "account"
limit_value = 500
"#,
    )
    .unwrap();

    let err = import(&store, doc).await.unwrap_err();
    assert!(err.to_string().contains("openai/tier-1/rpm"));
  }

  #[test]
  fn empty_document_is_valid() {
    let doc = IngestDocument::from_toml("").unwrap();
    assert!(doc.plans.is_empty() && doc.rate_limits.is_empty());
  }

  #[tokio::test]
  async fn set_pricing_without_reason_records_no_history() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let price = ProviderPricing::per_million_tokens("openai", "gpt-4o", "tier-1", 5.0, 15.0);

    let change = set_pricing(&store, price, None, Utc::now()).await.unwrap();
    assert!(change.is_none());
    assert!(store.get_pricing_history("openai", "gpt-4o", "tier-1").await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn set_pricing_with_reason_pairs_history() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let old = ProviderPricing::per_million_tokens("openai", "gpt-4o", "tier-1", 5.0, 15.0);
    let new = ProviderPricing::per_million_tokens("openai", "gpt-4o", "tier-1", 2.5, 10.0);

    set_pricing(&store, old, None, Utc::now()).await.unwrap();
    let change = set_pricing(&store, new.clone(), Some("price cut".into()), Utc::now())
      .await
      .unwrap()
      .expect("history entry");

    assert_eq!(change.change.old_input_cost, Some(5.0));
    assert_eq!(change.change.new_input_cost, 2.5);
    let current = store.get_provider_pricing("openai", "gpt-4o", "tier-1").await.unwrap();
    assert_eq!(current, Some(new.clone()));

    // Re-asserting the same price is not a transition.
    let again = set_pricing(&store, new, Some("re-verified".into()), Utc::now()).await.unwrap();
    assert!(again.is_none());
    let history = store.get_pricing_history("openai", "gpt-4o", "tier-1").await.unwrap();
    assert_eq!(history.len(), 1);
  }
}
