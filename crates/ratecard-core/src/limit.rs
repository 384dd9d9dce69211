//! Rate limits: one configured ceiling for a provider, plan and limit type,
//! optionally narrowed to a single model or endpoint.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result};

// ─── Limit types ─────────────────────────────────────────────────────────────

/// Common limit-type labels. The store accepts any label; these are the ones
/// providers publish most often.
pub mod limit_type {
  /// Requests per minute.
  pub const RPM: &str = "rpm";
  /// Requests per day.
  pub const RPD: &str = "rpd";
  /// Tokens per minute.
  pub const TPM: &str = "tpm";
  /// Tokens per day.
  pub const TPD: &str = "tpd";
  /// Input tokens per minute.
  pub const ITPM: &str = "itpm";
  /// Output tokens per minute.
  pub const OTPM: &str = "otpm";
  /// Images per minute.
  pub const IPM: &str = "ipm";
}

// ─── Scope ───────────────────────────────────────────────────────────────────

/// The breadth at which a rate limit applies.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScopeKind {
  /// Applies to every model and endpoint on the account.
  #[default]
  Account,
  /// Applies to one model.
  Model,
  /// Applies to one endpoint (optionally of one model).
  Endpoint,
}

impl ScopeKind {
  /// Specificity rank; a higher rank overrides a lower one.
  pub fn rank(self) -> u8 {
    match self {
      Self::Account => 0,
      Self::Model => 1,
      Self::Endpoint => 2,
    }
  }

  /// Parse a stored label, mapping failures onto [`Error::UnknownScope`].
  pub fn parse(s: &str) -> Result<Self> {
    Self::from_str(s).map_err(|_| Error::UnknownScope(s.to_owned()))
  }
}

// ─── RateLimit ───────────────────────────────────────────────────────────────

/// One configured ceiling.
///
/// Identity is `(provider, plan, limit_type, model, endpoint)`; everything
/// else is replaced on upsert. `None` for `model` or `endpoint` means the
/// limit applies to all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimit {
  pub provider:             String,
  pub plan:                 String,
  pub limit_type:           String,
  #[serde(default)]
  pub model:                Option<String>,
  #[serde(default)]
  pub endpoint:             Option<String>,
  pub limit_value:          i64,
  /// Additional short-term slack above `limit_value`.
  #[serde(default)]
  pub burst_allowance:      Option<i64>,
  /// Length of the window over which `limit_value` is counted.
  #[serde(default)]
  pub reset_window_seconds: Option<i64>,
  #[serde(default)]
  pub applies_to:           ScopeKind,
  #[serde(default)]
  pub source_url:           Option<String>,
  /// When the limit was last confirmed against its source. Defaults to the
  /// moment of deserialisation.
  #[serde(default = "Utc::now")]
  pub last_verified:        DateTime<Utc>,
}

impl RateLimit {
  /// An account-wide limit verified now. Narrow it with
  /// [`for_model`](Self::for_model) or [`for_endpoint`](Self::for_endpoint).
  pub fn account(
    provider: impl Into<String>,
    plan: impl Into<String>,
    limit_type: impl Into<String>,
    limit_value: i64,
  ) -> Self {
    Self {
      provider: provider.into(),
      plan: plan.into(),
      limit_type: limit_type.into(),
      model: None,
      endpoint: None,
      limit_value,
      burst_allowance: None,
      reset_window_seconds: None,
      applies_to: ScopeKind::Account,
      source_url: None,
      last_verified: Utc::now(),
    }
  }

  /// Scope this limit to a single model.
  pub fn for_model(mut self, model: impl Into<String>) -> Self {
    self.model = Some(model.into());
    if self.applies_to == ScopeKind::Account {
      self.applies_to = ScopeKind::Model;
    }
    self
  }

  /// Scope this limit to a single endpoint.
  pub fn for_endpoint(mut self, endpoint: impl Into<String>) -> Self {
    self.endpoint = Some(endpoint.into());
    self.applies_to = ScopeKind::Endpoint;
    self
  }

  pub fn with_source(mut self, url: impl Into<String>) -> Self {
    self.source_url = Some(url.into());
    self
  }

  /// Check that `applies_to` agrees with the scope fields.
  ///
  /// Account limits carry neither a model nor an endpoint, model limits carry
  /// a model only, and endpoint limits carry an endpoint and optionally a
  /// model. Empty strings count as absent.
  pub fn check_scope(&self) -> Result<()> {
    let has_model = self.model.as_deref().is_some_and(|m| !m.is_empty());
    let has_endpoint = self.endpoint.as_deref().is_some_and(|e| !e.is_empty());

    let agrees = match self.applies_to {
      ScopeKind::Account => !has_model && !has_endpoint,
      ScopeKind::Model => has_model && !has_endpoint,
      ScopeKind::Endpoint => has_endpoint,
    };

    if agrees {
      Ok(())
    } else {
      Err(Error::ScopeMismatch {
        applies_to: self.applies_to,
        model:      self.model.clone(),
        endpoint:   self.endpoint.clone(),
      })
    }
  }

  /// Whether this limit is eligible for a lookup with the given filters.
  ///
  /// An unscoped field admits any filter; an absent filter admits any scope.
  pub fn matches_scope(&self, model: Option<&str>, endpoint: Option<&str>) -> bool {
    fn admits(scope: Option<&str>, filter: Option<&str>) -> bool {
      match (scope.filter(|s| !s.is_empty()), filter) {
        (None, _) | (_, None) => true,
        (Some(s), Some(f)) => s == f,
      }
    }
    admits(self.model.as_deref(), model) && admits(self.endpoint.as_deref(), endpoint)
  }
}
