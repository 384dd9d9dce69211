//! Plain-text rendering of store reads for the terminal.

use std::fmt::Write as _;

use ratecard_core::{
  limit::{RateLimit, ScopeKind},
  plan::PlanMetadata,
  pricing::{PriceChange, ProviderPricing},
};

fn scope_label(limit: &RateLimit) -> String {
  match (limit.applies_to, limit.model.as_deref(), limit.endpoint.as_deref()) {
    (ScopeKind::Account, ..) => "account".to_owned(),
    (ScopeKind::Model, Some(model), _) => format!("model {model}"),
    (ScopeKind::Endpoint, Some(model), Some(endpoint)) => format!("endpoint {model} {endpoint}"),
    (ScopeKind::Endpoint, None, Some(endpoint)) => format!("endpoint {endpoint}"),
    (kind, ..) => kind.to_string(),
  }
}

fn limit_line(limit: &RateLimit) -> String {
  let mut line = format!("{} {} ({})", limit.limit_type, limit.limit_value, scope_label(limit));
  if let Some(burst) = limit.burst_allowance {
    write!(line, " burst +{burst}").ok();
  }
  if let Some(window) = limit.reset_window_seconds {
    write!(line, " per {window}s").ok();
  }
  line
}

/// The effective limit first, then the broader limits it overrides.
pub fn lookup(limits: &[RateLimit]) -> String {
  let Some((effective, overridden)) = limits.split_first() else {
    return "no matching limit\n".to_owned();
  };

  let mut out = format!("effective: {}\n", limit_line(effective));
  if let Some(url) = &effective.source_url {
    writeln!(out, "  source: {url}").ok();
  }
  writeln!(out, "  verified: {}", effective.last_verified.format("%Y-%m-%d")).ok();
  for limit in overridden {
    writeln!(out, "overrides: {}", limit_line(limit)).ok();
  }
  out
}

pub fn limits(limits: &[RateLimit]) -> String {
  if limits.is_empty() {
    return "no limits configured\n".to_owned();
  }
  limits.iter().map(|l| limit_line(l) + "\n").collect()
}

pub fn plans(plans: &[PlanMetadata]) -> String {
  if plans.is_empty() {
    return "no plans described\n".to_owned();
  }
  let mut out = String::new();
  for plan in plans {
    write!(out, "{}: {}", plan.plan, plan.official_name).ok();
    if let Some(cost) = plan.cost_per_month {
      write!(out, " ({cost:.2}/month)").ok();
    }
    if plan.has_free_tier {
      out.push_str(" [free tier]");
    }
    out.push('\n');
  }
  out
}

pub fn pricing(prices: &[ProviderPricing]) -> String {
  if prices.is_empty() {
    return "no pricing\n".to_owned();
  }
  let mut out = String::new();
  for p in prices {
    write!(
      out,
      "{} {}: input {} {} / output {} {} per {}",
      p.model, p.plan, p.input_cost, p.currency, p.output_cost, p.currency, p.unit_type
    )
    .ok();
    if let Some(included) = p.included_units {
      write!(out, " ({included} included)").ok();
    }
    out.push('\n');
  }
  out
}

pub fn history(changes: &[PriceChange]) -> String {
  if changes.is_empty() {
    return "no recorded price changes\n".to_owned();
  }
  let mut out = String::new();
  for PriceChange { change, .. } in changes {
    let old = match (change.old_input_cost, change.old_output_cost) {
      (Some(i), Some(o)) => format!("{i}/{o}"),
      _ => "-".to_owned(),
    };
    write!(
      out,
      "{} {} -> {}/{}",
      change.change_date.format("%Y-%m-%d"),
      old,
      change.new_input_cost,
      change.new_output_cost
    )
    .ok();
    if let Some(reason) = &change.change_reason {
      write!(out, " ({reason})").ok();
    }
    out.push('\n');
  }
  out
}
