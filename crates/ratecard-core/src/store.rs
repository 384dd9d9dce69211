//! The `RateStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `ratecard-store-sqlite`). Ingestion jobs and report generators depend on
//! this abstraction, not on any concrete backend.

use std::future::Future;

use crate::{
  limit::RateLimit,
  plan::PlanMetadata,
  pricing::{NewPriceChange, PriceChange, ProviderPricing},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`RateStore::query_rate_limit`].
#[derive(Debug, Clone, Default)]
pub struct RateLimitQuery {
  pub provider:   String,
  pub plan:       String,
  pub limit_type: String,
  /// Keep only limits that apply to this model (or to every model).
  pub model:      Option<String>,
  /// Keep only limits that apply to this endpoint (or to every endpoint).
  pub endpoint:   Option<String>,
}

impl RateLimitQuery {
  pub fn new(
    provider: impl Into<String>,
    plan: impl Into<String>,
    limit_type: impl Into<String>,
  ) -> Self {
    Self {
      provider: provider.into(),
      plan: plan.into(),
      limit_type: limit_type.into(),
      model: None,
      endpoint: None,
    }
  }

  pub fn model(mut self, model: impl Into<String>) -> Self {
    self.model = Some(model.into());
    self
  }

  pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
    self.endpoint = Some(endpoint.into());
    self
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a rate-limit and pricing store backend.
///
/// Rate limits, plan metadata and pricing are upserted: one row per identity,
/// the last write wins. Price changes are append-only and are never derived
/// from pricing writes.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait RateStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert a rate limit, or replace the mutable fields of the existing one
  /// with the same identity.
  fn upsert_rate_limit(
    &self,
    fact: RateLimit,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Insert or replace the description of a plan.
  fn upsert_plan_metadata(
    &self,
    fact: PlanMetadata,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Insert or replace the current price of a model on a plan. Never writes
  /// price history.
  fn upsert_provider_pricing(
    &self,
    fact: ProviderPricing,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Append a price change and return the persisted entry.
  fn append_pricing_history(
    &self,
    entry: NewPriceChange,
  ) -> impl Future<Output = Result<PriceChange, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// All limits matching `query`, most specific first. The first element is
  /// the effective limit. An empty list means nothing is configured.
  fn query_rate_limit<'a>(
    &'a self,
    query: &'a RateLimitQuery,
  ) -> impl Future<Output = Result<Vec<RateLimit>, Self::Error>> + Send + 'a;

  /// Every limit configured for a provider's plan, grouped by limit type.
  fn get_all_rate_limits_for_provider<'a>(
    &'a self,
    provider: &'a str,
    plan: &'a str,
  ) -> impl Future<Output = Result<Vec<RateLimit>, Self::Error>> + Send + 'a;

  /// Exact-match price lookup. Returns `None` if not found.
  fn get_provider_pricing<'a>(
    &'a self,
    provider: &'a str,
    model: &'a str,
    plan: &'a str,
  ) -> impl Future<Output = Result<Option<ProviderPricing>, Self::Error>> + Send + 'a;

  /// Current prices for every model and plan of a provider.
  fn list_provider_pricing<'a>(
    &'a self,
    provider: &'a str,
  ) -> impl Future<Output = Result<Vec<ProviderPricing>, Self::Error>> + Send + 'a;

  /// Returns `None` if the plan is not described.
  fn get_plan_metadata<'a>(
    &'a self,
    provider: &'a str,
    plan: &'a str,
  ) -> impl Future<Output = Result<Option<PlanMetadata>, Self::Error>> + Send + 'a;

  fn list_plans<'a>(
    &'a self,
    provider: &'a str,
  ) -> impl Future<Output = Result<Vec<PlanMetadata>, Self::Error>> + Send + 'a;

  /// Recorded price changes, newest first.
  fn get_pricing_history<'a>(
    &'a self,
    provider: &'a str,
    model: &'a str,
    plan: &'a str,
  ) -> impl Future<Output = Result<Vec<PriceChange>, Self::Error>> + Send + 'a;
}
