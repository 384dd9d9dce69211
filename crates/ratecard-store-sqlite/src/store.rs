//! [`SqliteStore`] — the SQLite implementation of [`RateStore`].

use std::{
  path::{Path, PathBuf},
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use rusqlite::{OpenFlags, OptionalExtension as _};
use tokio_rusqlite::Connection;

use ratecard_core::{
  limit::RateLimit,
  plan::PlanMetadata,
  pricing::{NewPriceChange, PriceChange, ProviderPricing},
  resolve,
  store::{RateLimitQuery, RateStore},
};

use crate::{
  encode::{
    PLAN_COLUMNS, PRICE_CHANGE_COLUMNS, PRICING_COLUMNS, RATE_LIMIT_COLUMNS, RawPriceChange,
    RawRateLimit, encode_dt, encode_scope, plan_from_row, pricing_from_row,
  },
  schema::MIGRATIONS,
  Error, Result,
};

/// How long a writer waits for another connection's write to finish before
/// giving up with `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Read-only connections opened alongside the writer of a file-backed store.
const READER_CONNECTIONS: usize = 4;

// ─── Connections ─────────────────────────────────────────────────────────────

/// One writer plus a round-robin pool of read-only connections on the same
/// file. An in-memory store has no readers and reads through the writer.
#[derive(Clone)]
struct Connections {
  writer:  Connection,
  readers: Arc<[Connection]>,
  next:    Arc<AtomicUsize>,
}

impl Connections {
  fn reader(&self) -> &Connection {
    if self.readers.is_empty() {
      return &self.writer;
    }
    let i = self.next.fetch_add(1, Ordering::Relaxed) % self.readers.len();
    &self.readers[i]
  }

  async fn close(self) {
    for reader in self.readers.iter() {
      reader.clone().close().await.ok();
    }
    self.writer.close().await.ok();
  }
}

async fn open_reader(path: PathBuf) -> Result<Connection> {
  let conn = Connection::open_with_flags(
    path,
    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI,
  )
  .await
  .map_err(Error::Open)?;
  conn
    .call(|conn| Ok(conn.busy_timeout(BUSY_TIMEOUT)?))
    .await
    .map_err(Error::Open)?;
  Ok(conn)
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A rate-limit and pricing store backed by a single SQLite file.
///
/// Writes go through one connection; reads are spread over a pool of
/// read-only connections, so in WAL mode they proceed against the last
/// committed snapshot while a write is in flight. Cloning is cheap and clones
/// share every connection; closing any clone closes them for all of them.
#[derive(Clone)]
pub struct SqliteStore {
  conns: Option<Connections>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let writer = Connection::open(&path).await.map_err(Error::Open)?;
    let mut store = Self::init(writer).await?;

    // Readers open only once the file exists in WAL mode with its schema.
    let mut readers = Vec::with_capacity(READER_CONNECTIONS);
    for _ in 0..READER_CONNECTIONS {
      match open_reader(path.clone()).await {
        Ok(reader) => readers.push(reader),
        Err(e) => {
          for reader in readers {
            reader.close().await.ok();
          }
          store.close().await;
          return Err(e);
        }
      }
    }
    tracing::debug!(readers = readers.len(), "opened reader connections");

    if let Some(conns) = store.conns.as_mut() {
      conns.readers = readers.into();
    }
    Ok(store)
  }

  /// Open an in-memory store — useful for testing. Reads and writes share one
  /// connection.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory().await.map_err(Error::Open)?;
    Self::init(conn).await
  }

  async fn init(conn: Connection) -> Result<Self> {
    // Switching to WAL is the first write to the file, so an unwritable path
    // surfaces here rather than at open.
    let journal_mode = conn
      .call(|conn| {
        let mode: String =
          conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(mode)
      })
      .await
      .map_err(Error::Open)?;
    tracing::debug!(%journal_mode, "opened rate store");

    let mut store = Self {
      conns: Some(Connections {
        writer:  conn,
        readers: Arc::from(Vec::new()),
        next:    Arc::new(AtomicUsize::new(0)),
      }),
    };
    if let Err(e) = store.init_schema().await {
      store.close().await;
      return Err(e);
    }
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let applied = self
      .writer()?
      .call(|conn| {
        let mut version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        let mut applied = Vec::new();
        for &(target, ddl) in MIGRATIONS {
          if target <= version {
            continue;
          }
          let tx = conn.transaction()?;
          tx.execute_batch(ddl)?;
          tx.pragma_update(None, "user_version", target)?;
          tx.commit()?;
          version = target;
          applied.push(target);
        }
        Ok(applied)
      })
      .await
      .map_err(Error::Schema)?;

    for version in applied {
      tracing::debug!(version, "applied schema migration");
    }
    Ok(())
  }

  /// Release every connection. Safe to call repeatedly; never fails.
  ///
  /// Every later operation on this store, or on any clone of it, returns
  /// [`Error::NotInitialized`].
  pub async fn close(&mut self) {
    if let Some(conns) = self.conns.take() {
      conns.close().await;
    }
  }

  /// The schema version recorded in the file.
  pub async fn schema_version(&self) -> Result<i64> {
    self
      .reader()?
      .call(|conn| Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?))
      .await
      .map_err(Error::read)
  }

  /// The live writer connection, for diagnostics and tests. `None` once
  /// closed.
  pub fn handle(&self) -> Option<&Connection> { self.conns.as_ref().map(|c| &c.writer) }

  /// Number of read-only connections; zero for an in-memory store.
  pub fn reader_count(&self) -> usize { self.conns.as_ref().map_or(0, |c| c.readers.len()) }

  fn writer(&self) -> Result<&Connection> {
    self.conns.as_ref().map(|c| &c.writer).ok_or(Error::NotInitialized)
  }

  fn reader(&self) -> Result<&Connection> {
    self.conns.as_ref().map(Connections::reader).ok_or(Error::NotInitialized)
  }
}

// ─── RateStore impl ──────────────────────────────────────────────────────────

impl RateStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn upsert_rate_limit(&self, fact: RateLimit) -> Result<()> {
    fact.check_scope()?;
    let conn = self.writer()?;

    let RateLimit {
      provider,
      plan,
      limit_type,
      model,
      endpoint,
      limit_value,
      burst_allowance,
      reset_window_seconds,
      applies_to,
      source_url,
      last_verified,
    } = fact;
    let model = encode_scope(model);
    let endpoint = encode_scope(endpoint);
    let applies_to = applies_to.to_string();
    let last_verified = encode_dt(last_verified)?;

    conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO rate_limits (
             provider, plan, limit_type, model_id, endpoint,
             limit_value, burst_allowance, reset_window_seconds,
             applies_to, source_url, last_verified
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
           ON CONFLICT (provider, plan, limit_type, model_id, endpoint) DO UPDATE SET
             limit_value          = excluded.limit_value,
             burst_allowance      = excluded.burst_allowance,
             reset_window_seconds = excluded.reset_window_seconds,
             applies_to           = excluded.applies_to,
             source_url           = excluded.source_url,
             last_verified        = excluded.last_verified",
          rusqlite::params![
            provider,
            plan,
            limit_type,
            model,
            endpoint,
            limit_value,
            burst_allowance,
            reset_window_seconds,
            applies_to,
            source_url,
            last_verified,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::write)
  }

  async fn upsert_plan_metadata(&self, fact: PlanMetadata) -> Result<()> {
    self
      .writer()?
      .call(move |conn| {
        conn.execute(
          "INSERT INTO plan_metadata (
             provider, plan, official_name, cost_per_month, has_free_tier, documentation_url
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (provider, plan) DO UPDATE SET
             official_name     = excluded.official_name,
             cost_per_month    = excluded.cost_per_month,
             has_free_tier     = excluded.has_free_tier,
             documentation_url = excluded.documentation_url",
          rusqlite::params![
            fact.provider,
            fact.plan,
            fact.official_name,
            fact.cost_per_month,
            fact.has_free_tier,
            fact.documentation_url,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::write)
  }

  async fn upsert_provider_pricing(&self, fact: ProviderPricing) -> Result<()> {
    self
      .writer()?
      .call(move |conn| {
        conn.execute(
          "INSERT INTO provider_pricing (
             provider, model_id, plan, input_cost, output_cost,
             currency, unit_type, included_units
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT (provider, model_id, plan) DO UPDATE SET
             input_cost     = excluded.input_cost,
             output_cost    = excluded.output_cost,
             currency       = excluded.currency,
             unit_type      = excluded.unit_type,
             included_units = excluded.included_units",
          rusqlite::params![
            fact.provider,
            fact.model,
            fact.plan,
            fact.input_cost,
            fact.output_cost,
            fact.currency,
            fact.unit_type,
            fact.included_units,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(Error::write)
  }

  async fn append_pricing_history(&self, entry: NewPriceChange) -> Result<PriceChange> {
    let conn = self.writer()?;
    let change_date = encode_dt(entry.change_date)?;
    let row = entry.clone();

    let id = conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO pricing_history (
             provider, model_id, plan, old_input_cost, old_output_cost,
             new_input_cost, new_output_cost, change_date, change_reason
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            row.provider,
            row.model,
            row.plan,
            row.old_input_cost,
            row.old_output_cost,
            row.new_input_cost,
            row.new_output_cost,
            change_date,
            row.change_reason,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await
      .map_err(Error::write)?;

    Ok(PriceChange { id, change: entry })
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn query_rate_limit(&self, query: &RateLimitQuery) -> Result<Vec<RateLimit>> {
    let conn = self.reader()?;
    let RateLimitQuery { provider, plan, limit_type, model, endpoint } = query.clone();

    let raws: Vec<RawRateLimit> = conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RATE_LIMIT_COLUMNS}
           FROM rate_limits
           WHERE provider = ?1 AND plan = ?2 AND limit_type = ?3
             AND (?4 IS NULL OR model_id = '' OR model_id = ?4)
             AND (?5 IS NULL OR endpoint = '' OR endpoint = ?5)"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![provider, plan, limit_type, model, endpoint],
            RawRateLimit::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::read)?;

    let mut limits = raws
      .into_iter()
      .map(RawRateLimit::into_rate_limit)
      .collect::<Result<Vec<_>>>()?;
    resolve::sort_by_specificity(&mut limits);
    Ok(limits)
  }

  async fn get_all_rate_limits_for_provider(
    &self,
    provider: &str,
    plan: &str,
  ) -> Result<Vec<RateLimit>> {
    let conn = self.reader()?;
    let provider = provider.to_owned();
    let plan = plan.to_owned();

    let raws: Vec<RawRateLimit> = conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RATE_LIMIT_COLUMNS} FROM rate_limits WHERE provider = ?1 AND plan = ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![provider, plan], RawRateLimit::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::read)?;

    let mut limits = raws
      .into_iter()
      .map(RawRateLimit::into_rate_limit)
      .collect::<Result<Vec<_>>>()?;
    resolve::sort_for_display(&mut limits);
    Ok(limits)
  }

  async fn get_provider_pricing(
    &self,
    provider: &str,
    model: &str,
    plan: &str,
  ) -> Result<Option<ProviderPricing>> {
    let conn = self.reader()?;
    let (provider, model, plan) = (provider.to_owned(), model.to_owned(), plan.to_owned());

    conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {PRICING_COLUMNS} FROM provider_pricing
               WHERE provider = ?1 AND model_id = ?2 AND plan = ?3"
            ),
            rusqlite::params![provider, model, plan],
            pricing_from_row,
          )
          .optional()?)
      })
      .await
      .map_err(Error::read)
  }

  async fn list_provider_pricing(&self, provider: &str) -> Result<Vec<ProviderPricing>> {
    let conn = self.reader()?;
    let provider = provider.to_owned();

    conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PRICING_COLUMNS} FROM provider_pricing
           WHERE provider = ?1
           ORDER BY model_id, plan"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![provider], pricing_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::read)
  }

  async fn get_plan_metadata(&self, provider: &str, plan: &str) -> Result<Option<PlanMetadata>> {
    let conn = self.reader()?;
    let (provider, plan) = (provider.to_owned(), plan.to_owned());

    conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PLAN_COLUMNS} FROM plan_metadata WHERE provider = ?1 AND plan = ?2"),
            rusqlite::params![provider, plan],
            plan_from_row,
          )
          .optional()?)
      })
      .await
      .map_err(Error::read)
  }

  async fn list_plans(&self, provider: &str) -> Result<Vec<PlanMetadata>> {
    let conn = self.reader()?;
    let provider = provider.to_owned();

    conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PLAN_COLUMNS} FROM plan_metadata WHERE provider = ?1 ORDER BY plan"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![provider], plan_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::read)
  }

  async fn get_pricing_history(
    &self,
    provider: &str,
    model: &str,
    plan: &str,
  ) -> Result<Vec<PriceChange>> {
    let conn = self.reader()?;
    let (provider, model, plan) = (provider.to_owned(), model.to_owned(), plan.to_owned());

    let raws: Vec<RawPriceChange> = conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PRICE_CHANGE_COLUMNS} FROM pricing_history
           WHERE provider = ?1 AND model_id = ?2 AND plan = ?3
           ORDER BY change_date DESC, id DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![provider, model, plan], RawPriceChange::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(Error::read)?;

    raws.into_iter().map(RawPriceChange::into_price_change).collect()
  }
}
