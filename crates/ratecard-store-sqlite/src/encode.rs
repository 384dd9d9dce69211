//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed nanosecond
//! precision, so lexical order in SQL matches chronological order. That
//! holds only for four-digit years; anything outside 0000..=9999 is refused
//! before it reaches the database. Absent scopes are stored as `''`.

use chrono::{DateTime, Datelike as _, SecondsFormat, Utc};
use ratecard_core::{
  limit::{RateLimit, ScopeKind},
  plan::PlanMetadata,
  pricing::{NewPriceChange, PriceChange, ProviderPricing},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> Result<String> {
  if !(0..=9999).contains(&dt.year()) {
    return Err(Error::Encode(format!("timestamp {dt} is outside years 0000-9999")));
  }
  Ok(dt.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

// ─── Scope ───────────────────────────────────────────────────────────────────

pub fn encode_scope(scope: Option<String>) -> String { scope.unwrap_or_default() }

pub fn decode_scope(s: String) -> Option<String> { (!s.is_empty()).then_some(s) }

pub fn decode_scope_kind(s: &str) -> Result<ScopeKind> {
  ScopeKind::parse(s).map_err(|e| Error::Decode(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawRateLimit::from_row`].
pub const RATE_LIMIT_COLUMNS: &str = "provider, plan, limit_type, model_id, endpoint, \
   limit_value, burst_allowance, reset_window_seconds, applies_to, source_url, last_verified";

/// Raw values read directly from a `rate_limits` row.
pub struct RawRateLimit {
  pub provider:             String,
  pub plan:                 String,
  pub limit_type:           String,
  pub model_id:             String,
  pub endpoint:             String,
  pub limit_value:          i64,
  pub burst_allowance:      Option<i64>,
  pub reset_window_seconds: Option<i64>,
  pub applies_to:           String,
  pub source_url:           Option<String>,
  pub last_verified:        String,
}

impl RawRateLimit {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      provider:             row.get(0)?,
      plan:                 row.get(1)?,
      limit_type:           row.get(2)?,
      model_id:             row.get(3)?,
      endpoint:             row.get(4)?,
      limit_value:          row.get(5)?,
      burst_allowance:      row.get(6)?,
      reset_window_seconds: row.get(7)?,
      applies_to:           row.get(8)?,
      source_url:           row.get(9)?,
      last_verified:        row.get(10)?,
    })
  }

  pub fn into_rate_limit(self) -> Result<RateLimit> {
    Ok(RateLimit {
      provider:             self.provider,
      plan:                 self.plan,
      limit_type:           self.limit_type,
      model:                decode_scope(self.model_id),
      endpoint:             decode_scope(self.endpoint),
      limit_value:          self.limit_value,
      burst_allowance:      self.burst_allowance,
      reset_window_seconds: self.reset_window_seconds,
      applies_to:           decode_scope_kind(&self.applies_to)?,
      source_url:           self.source_url,
      last_verified:        decode_dt(&self.last_verified)?,
    })
  }
}

pub const PLAN_COLUMNS: &str =
  "provider, plan, official_name, cost_per_month, has_free_tier, documentation_url";

pub fn plan_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PlanMetadata> {
  Ok(PlanMetadata {
    provider:          row.get(0)?,
    plan:              row.get(1)?,
    official_name:     row.get(2)?,
    cost_per_month:    row.get(3)?,
    has_free_tier:     row.get(4)?,
    documentation_url: row.get(5)?,
  })
}

pub const PRICING_COLUMNS: &str = "provider, model_id, plan, input_cost, output_cost, \
   currency, unit_type, included_units";

pub fn pricing_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProviderPricing> {
  Ok(ProviderPricing {
    provider:       row.get(0)?,
    model:          row.get(1)?,
    plan:           row.get(2)?,
    input_cost:     row.get(3)?,
    output_cost:    row.get(4)?,
    currency:       row.get(5)?,
    unit_type:      row.get(6)?,
    included_units: row.get(7)?,
  })
}

pub const PRICE_CHANGE_COLUMNS: &str = "id, provider, model_id, plan, old_input_cost, \
   old_output_cost, new_input_cost, new_output_cost, change_date, change_reason";

/// Raw values read directly from a `pricing_history` row.
pub struct RawPriceChange {
  pub id:              i64,
  pub provider:        String,
  pub model_id:        String,
  pub plan:            String,
  pub old_input_cost:  Option<f64>,
  pub old_output_cost: Option<f64>,
  pub new_input_cost:  f64,
  pub new_output_cost: f64,
  pub change_date:     String,
  pub change_reason:   Option<String>,
}

impl RawPriceChange {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      provider:        row.get(1)?,
      model_id:        row.get(2)?,
      plan:            row.get(3)?,
      old_input_cost:  row.get(4)?,
      old_output_cost: row.get(5)?,
      new_input_cost:  row.get(6)?,
      new_output_cost: row.get(7)?,
      change_date:     row.get(8)?,
      change_reason:   row.get(9)?,
    })
  }

  pub fn into_price_change(self) -> Result<PriceChange> {
    Ok(PriceChange {
      id:     self.id,
      change: NewPriceChange {
        provider:        self.provider,
        model:           self.model_id,
        plan:            self.plan,
        old_input_cost:  self.old_input_cost,
        old_output_cost: self.old_output_cost,
        new_input_cost:  self.new_input_cost,
        new_output_cost: self.new_output_cost,
        change_date:     decode_dt(&self.change_date)?,
        change_reason:   self.change_reason,
      },
    })
  }
}
