//! SQL schema for the wurmlog SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Dimensions. Rows are created on first use and never updated or deleted.
CREATE TABLE IF NOT EXISTS actors (
    actor_id    INTEGER PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS dates (
    date_id     INTEGER PRIMARY KEY,
    year        INTEGER NOT NULL,
    month       INTEGER NOT NULL,
    day         INTEGER NOT NULL,
    UNIQUE (year, month, day)
);

CREATE TABLE IF NOT EXISTS message_templates (
    template_id INTEGER PRIMARY KEY,
    text        TEXT NOT NULL UNIQUE
);

-- Base entries are strictly append-only.
CREATE TABLE IF NOT EXISTS log_entries (
    entry_id    INTEGER PRIMARY KEY,
    actor_id    INTEGER NOT NULL REFERENCES actors(actor_id),
    date_id     INTEGER NOT NULL REFERENCES dates(date_id),
    template_id INTEGER NOT NULL REFERENCES message_templates(template_id),
    hour        INTEGER NOT NULL,
    minute      INTEGER NOT NULL,
    second      INTEGER NOT NULL,
    kind        TEXT NOT NULL    -- discriminator of the variant table
);

-- Variant tables share the base entry id as their primary key.
CREATE TABLE IF NOT EXISTS action_entries (
    entry_id    INTEGER PRIMARY KEY REFERENCES log_entries(entry_id),
    action_text TEXT NOT NULL,
    UNIQUE (entry_id, action_text)
);

CREATE INDEX IF NOT EXISTS log_entries_kind_idx ON log_entries(kind);

PRAGMA user_version = 1;
";
