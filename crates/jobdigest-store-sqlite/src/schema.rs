//! SQL schema for the jobdigest SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision for later migrations.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per identity key ever seen. Rows are only removed by an explicit
-- reset; sent_at is written at most once.
CREATE TABLE IF NOT EXISTS ledger (
    identity_key  TEXT PRIMARY KEY,
    first_seen_at TEXT NOT NULL,   -- RFC 3339 UTC
    sent_at       TEXT             -- RFC 3339 UTC, NULL until delivered
);

CREATE TABLE IF NOT EXISTS profiles (
    profile_id       TEXT PRIMARY KEY,
    keywords         TEXT NOT NULL DEFAULT '[]',   -- JSON array
    locations        TEXT NOT NULL DEFAULT '[]',   -- JSON array
    levels           TEXT NOT NULL DEFAULT '[]',   -- JSON array
    employment_types TEXT NOT NULL DEFAULT '[]',   -- JSON array
    salary_floor     INTEGER,
    updated_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS ledger_sent_idx ON ledger(sent_at);

PRAGMA user_version = 1;
";
