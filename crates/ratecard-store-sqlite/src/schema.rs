//! SQL schema for the ratecard SQLite store.
//!
//! Migrations are gated on `PRAGMA user_version`; each entry is applied once,
//! in order, inside a transaction. Every statement is also idempotent, so
//! re-running against an initialised file is harmless.

/// `(version, ddl)` pairs, ascending.
pub const MIGRATIONS: &[(i64, &str)] = &[(1, SCHEMA_V1)];

/// Scope columns hold `''` rather than NULL for "applies to all": SQLite
/// treats NULLs as distinct inside UNIQUE constraints, which would let
/// wildcard rows duplicate.
const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS rate_limits (
    id                   INTEGER PRIMARY KEY,
    provider             TEXT    NOT NULL,
    plan                 TEXT    NOT NULL,
    limit_type           TEXT    NOT NULL,
    model_id             TEXT    NOT NULL DEFAULT '',
    endpoint             TEXT    NOT NULL DEFAULT '',
    limit_value          INTEGER NOT NULL,
    burst_allowance      INTEGER,
    reset_window_seconds INTEGER,
    applies_to           TEXT    NOT NULL,   -- 'account' | 'model' | 'endpoint'
    source_url           TEXT,
    last_verified        TEXT    NOT NULL,   -- RFC 3339 UTC, nanoseconds
    UNIQUE (provider, plan, limit_type, model_id, endpoint),
    CHECK (
         (applies_to = 'account'  AND model_id =  '' AND endpoint =  '')
      OR (applies_to = 'model'    AND model_id != '' AND endpoint =  '')
      OR (applies_to = 'endpoint' AND endpoint != '')
    )
);

CREATE TABLE IF NOT EXISTS plan_metadata (
    id                INTEGER PRIMARY KEY,
    provider          TEXT    NOT NULL,
    plan              TEXT    NOT NULL,
    official_name     TEXT    NOT NULL,
    cost_per_month    REAL,
    has_free_tier     INTEGER NOT NULL DEFAULT 0,
    documentation_url TEXT,
    UNIQUE (provider, plan)
);

-- Current price only; changes are logged separately in pricing_history.
CREATE TABLE IF NOT EXISTS provider_pricing (
    id             INTEGER PRIMARY KEY,
    provider       TEXT    NOT NULL,
    model_id       TEXT    NOT NULL,
    plan           TEXT    NOT NULL,
    input_cost     REAL    NOT NULL,
    output_cost    REAL    NOT NULL,
    currency       TEXT    NOT NULL DEFAULT 'USD',
    unit_type      TEXT    NOT NULL,
    included_units INTEGER,
    UNIQUE (provider, model_id, plan)
);

-- Append-only. No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS pricing_history (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    provider        TEXT NOT NULL,
    model_id        TEXT NOT NULL,
    plan            TEXT NOT NULL,
    old_input_cost  REAL,
    old_output_cost REAL,
    new_input_cost  REAL NOT NULL,
    new_output_cost REAL NOT NULL,
    change_date     TEXT NOT NULL,
    change_reason   TEXT
);

CREATE INDEX IF NOT EXISTS rate_limits_lookup_idx
    ON rate_limits(provider, plan, limit_type);
CREATE INDEX IF NOT EXISTS rate_limits_model_idx
    ON rate_limits(model_id) WHERE model_id != '';
CREATE INDEX IF NOT EXISTS plan_metadata_provider_idx
    ON plan_metadata(provider);
CREATE INDEX IF NOT EXISTS provider_pricing_model_idx
    ON provider_pricing(provider, model_id);
CREATE INDEX IF NOT EXISTS pricing_history_date_idx
    ON pricing_history(change_date DESC);
";

