//! `ratecard` — record and look up provider rate limits and pricing.
//!
//! # Usage
//!
//! ```text
//! ratecard set-limit openai tier-1 tpm 30000 --model gpt-4o
//! ratecard lookup openai tier-1 tpm --model gpt-4o
//! ratecard set-pricing openai gpt-4o tier-1 2.5 10 --reason "price cut"
//! ratecard import docs/openai.toml
//! ```

mod config;
mod ingest;
mod render;

use std::path::PathBuf;

use anyhow::Context as _;
use chrono::Utc;
use clap::{Parser, Subcommand};
use ratecard_core::{
  limit::{RateLimit, ScopeKind},
  plan::PlanMetadata,
  pricing::ProviderPricing,
  store::{RateLimitQuery, RateStore},
};
use ratecard_store_sqlite::SqliteStore;
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{
  config::{Settings, expand_tilde},
  ingest::IngestDocument,
};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(author, version, about = "Rate-limit and pricing store for API providers")]
struct Cli {
  /// Path to a TOML config file (default: ./ratecard.toml if present).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Path of the store file; overrides `store_path` from the config.
  #[arg(long, env = "RATECARD_STORE", value_name = "FILE")]
  store: Option<PathBuf>,

  /// Print results as JSON.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create or upgrade the store file.
  Init,

  /// Record a rate limit, replacing any limit with the same scope.
  SetLimit {
    provider:   String,
    plan:       String,
    limit_type: String,
    value:      i64,
    #[arg(long)]
    model:      Option<String>,
    #[arg(long)]
    endpoint:   Option<String>,
    /// Scope kind; inferred from --model/--endpoint when omitted.
    #[arg(long, value_parser = ScopeKind::parse)]
    scope:      Option<ScopeKind>,
    #[arg(long)]
    burst:      Option<i64>,
    /// Window length in seconds.
    #[arg(long)]
    window:     Option<i64>,
    #[arg(long)]
    source:     Option<String>,
  },

  /// Show the effective limit and the limits it overrides.
  Lookup {
    provider:   String,
    plan:       String,
    limit_type: String,
    #[arg(long)]
    model:      Option<String>,
    #[arg(long)]
    endpoint:   Option<String>,
  },

  /// List every limit configured for a plan.
  Limits { provider: String, plan: String },

  /// Describe a plan.
  SetPlan {
    provider: String,
    plan:     String,
    name:     String,
    #[arg(long)]
    cost_per_month: Option<f64>,
    #[arg(long)]
    free_tier: bool,
    #[arg(long)]
    docs:     Option<String>,
  },

  /// List the plans described for a provider.
  Plans { provider: String },

  /// Record the current price of a model on a plan.
  SetPricing {
    provider: String,
    model:    String,
    plan:     String,
    input:    f64,
    output:   f64,
    #[arg(long, default_value = "USD")]
    currency: String,
    #[arg(long, default_value = "1M tokens")]
    unit:     String,
    #[arg(long)]
    included: Option<i64>,
    /// Also append a history entry describing the change.
    #[arg(long)]
    reason:   Option<String>,
  },

  /// Show current pricing; all models of the provider unless both --model
  /// and --plan are given.
  Pricing {
    provider: String,
    #[arg(long)]
    model:    Option<String>,
    #[arg(long)]
    plan:     Option<String>,
  },

  /// Show recorded price changes, newest first.
  History { provider: String, model: String, plan: String },

  /// Ingest a TOML document of plans, rate limits, pricing and history.
  Import { file: PathBuf },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(cli.config.as_deref())?;

  // CLI flag overrides config file, which overrides the default.
  let store_path = expand_tilde(cli.store.as_deref().unwrap_or(settings.store_path.as_path()));

  let mut store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {}", store_path.display()))?;
  tracing::debug!(path = %store_path.display(), "store ready");

  let result = run(&store, cli.command, cli.json).await;
  store.close().await;
  result
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> anyhow::Result<()> {
  if json {
    println!("{}", serde_json::to_string_pretty(value)?);
  } else {
    print!("{}", text(value));
  }
  Ok(())
}

async fn run(store: &SqliteStore, command: Command, json: bool) -> anyhow::Result<()> {
  match command {
    Command::Init => {
      let version = store.schema_version().await?;
      tracing::info!(version, "store initialised");
    }

    Command::SetLimit {
      provider,
      plan,
      limit_type,
      value,
      model,
      endpoint,
      scope,
      burst,
      window,
      source,
    } => {
      let mut limit = RateLimit::account(provider, plan, limit_type, value);
      if let Some(model) = model {
        limit = limit.for_model(model);
      }
      if let Some(endpoint) = endpoint {
        limit = limit.for_endpoint(endpoint);
      }
      if let Some(scope) = scope {
        limit.applies_to = scope;
      }
      limit.burst_allowance = burst;
      limit.reset_window_seconds = window;
      limit.source_url = source;

      store.upsert_rate_limit(limit.clone()).await?;
      tracing::info!(
        provider = %limit.provider,
        plan = %limit.plan,
        limit_type = %limit.limit_type,
        scope = %limit.applies_to,
        "rate limit recorded"
      );
    }

    Command::Lookup { provider, plan, limit_type, model, endpoint } => {
      let query = RateLimitQuery { provider, plan, limit_type, model, endpoint };
      let found = store.query_rate_limit(&query).await?;
      emit(json, &found, |l| render::lookup(l))?;
    }

    Command::Limits { provider, plan } => {
      let found = store.get_all_rate_limits_for_provider(&provider, &plan).await?;
      emit(json, &found, |l| render::limits(l))?;
    }

    Command::SetPlan { provider, plan, name, cost_per_month, free_tier, docs } => {
      store
        .upsert_plan_metadata(PlanMetadata {
          provider,
          plan,
          official_name: name,
          cost_per_month,
          has_free_tier: free_tier,
          documentation_url: docs,
        })
        .await?;
      tracing::info!("plan recorded");
    }

    Command::Plans { provider } => {
      let plans = store.list_plans(&provider).await?;
      emit(json, &plans, |p| render::plans(p))?;
    }

    Command::SetPricing {
      provider,
      model,
      plan,
      input,
      output,
      currency,
      unit,
      included,
      reason,
    } => {
      let pricing = ProviderPricing {
        provider,
        model,
        plan,
        input_cost: input,
        output_cost: output,
        currency,
        unit_type: unit,
        included_units: included,
      };
      match ingest::set_pricing(store, pricing, reason, Utc::now()).await? {
        Some(change) => tracing::info!(history_id = change.id, "pricing recorded with history"),
        None => tracing::info!("pricing recorded"),
      }
    }

    Command::Pricing { provider, model, plan } => {
      let prices: Vec<ProviderPricing> = match (model, plan) {
        (Some(model), Some(plan)) => store
          .get_provider_pricing(&provider, &model, &plan)
          .await?
          .into_iter()
          .collect(),
        (model, plan) => {
          let mut all = store.list_provider_pricing(&provider).await?;
          all.retain(|p| {
            model.as_deref().is_none_or(|m| p.model == m)
              && plan.as_deref().is_none_or(|pl| p.plan == pl)
          });
          all
        }
      };
      emit(json, &prices, |p| render::pricing(p))?;
    }

    Command::History { provider, model, plan } => {
      let changes = store.get_pricing_history(&provider, &model, &plan).await?;
      emit(json, &changes, |c| render::history(c))?;
    }

    Command::Import { file } => {
      let doc = IngestDocument::read(&file)?;
      let summary = ingest::import(store, doc).await?;
      emit(json, &summary, |s| {
        format!(
          "imported {} plans, {} rate limits, {} prices, {} price changes\n",
          s.plans, s.rate_limits, s.pricing, s.history
        )
      })?;
    }
  }

  Ok(())
}
