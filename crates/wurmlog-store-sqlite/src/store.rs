//! [`SqliteStore`] — the SQLite implementation of [`LogStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use wurmlog_core::{
  dimension::{DimensionKey, DimensionKind},
  entry::{EntryId, NewEntry, VariantSpec, variant_specs},
  store::{AppendOutcome, InsertOutcome, LogStore, ScanOrder, ScannedRow, TableCounts},
};

use crate::{
  Result,
  encode::{RawJoinedEntry, scan_sql, variant_insert_sql},
  error::Error,
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A wurmlog store backed by a single SQLite file.
///
/// Clones share one background connection thread.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "opening store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a private in-memory store with the schema applied.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Close the connection. Other clones of this handle stop working.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Whether an insert failed on a `UNIQUE` constraint.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.code == rusqlite::ErrorCode::ConstraintViolation
        && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

/// `(kind, table, id column)` for each dimension.
const DIMENSION_TABLES: [(DimensionKind, &str, &str); 3] = [
  (DimensionKind::Actor, "actors", "actor_id"),
  (DimensionKind::Date, "dates", "date_id"),
  (DimensionKind::Template, "message_templates", "template_id"),
];

// ─── LogStore impl ───────────────────────────────────────────────────────────

impl LogStore for SqliteStore {
  type Error = Error;

  // ── Dimensions ────────────────────────────────────────────────────────────

  async fn find_dimension(&self, key: &DimensionKey) -> Result<Option<i64>> {
    let key = key.clone();

    let id = self
      .conn
      .call(move |conn| {
        let id: Option<i64> = match &key {
          DimensionKey::Actor(name) => conn
            .query_row(
              "SELECT actor_id FROM actors WHERE name = ?1",
              rusqlite::params![name],
              |r| r.get(0),
            )
            .optional()?,
          DimensionKey::Date(date) => conn
            .query_row(
              "SELECT date_id FROM dates WHERE year = ?1 AND month = ?2 AND day = ?3",
              rusqlite::params![date.year, date.month, date.day],
              |r| r.get(0),
            )
            .optional()?,
          DimensionKey::Template(text) => conn
            .query_row(
              "SELECT template_id FROM message_templates WHERE text = ?1",
              rusqlite::params![text],
              |r| r.get(0),
            )
            .optional()?,
        };
        Ok(id)
      })
      .await?;

    Ok(id)
  }

  async fn insert_dimension(&self, key: &DimensionKey) -> Result<InsertOutcome> {
    let key = key.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        let inserted = match &key {
          DimensionKey::Actor(name) => conn.execute(
            "INSERT INTO actors (name) VALUES (?1)",
            rusqlite::params![name],
          ),
          DimensionKey::Date(date) => conn.execute(
            "INSERT INTO dates (year, month, day) VALUES (?1, ?2, ?3)",
            rusqlite::params![date.year, date.month, date.day],
          ),
          DimensionKey::Template(text) => conn.execute(
            "INSERT INTO message_templates (text) VALUES (?1)",
            rusqlite::params![text],
          ),
        };
        match inserted {
          Ok(_) => Ok(InsertOutcome::Inserted(conn.last_insert_rowid())),
          Err(e) if is_unique_violation(&e) => Ok(InsertOutcome::Duplicate),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(outcome)
  }

  // ── Entries — append-only writes ──────────────────────────────────────────

  async fn insert_entry(&self, entry: NewEntry) -> Result<AppendOutcome> {
    let spec = entry.variant.spec();
    let values = entry.variant.column_values();
    let refs = DIMENSION_TABLES.map(|(kind, table, column)| {
      (kind, table, column, entry.reference(kind))
    });
    let time = entry.time;

    let outcome = self
      .conn
      .call(move |conn| {
        // Dropping the transaction without commit rolls it back.
        let tx = conn.transaction()?;

        for (kind, table, column, id) in refs {
          let exists = tx
            .query_row(
              &format!("SELECT 1 FROM {table} WHERE {column} = ?1"),
              rusqlite::params![id],
              |_| Ok(()),
            )
            .optional()?
            .is_some();
          if !exists {
            tracing::debug!(%kind, id, "entry references a missing row");
            return Ok(AppendOutcome::Dangling(kind));
          }
        }

        tx.execute(
          "INSERT INTO log_entries (
             actor_id, date_id, template_id, hour, minute, second, kind
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            refs[0].3,
            refs[1].3,
            refs[2].3,
            time.hour,
            time.minute,
            time.second,
            spec.kind,
          ],
        )?;
        let entry_id = tx.last_insert_rowid();

        let mut params: Vec<&dyn rusqlite::ToSql> = Vec::with_capacity(values.len() + 1);
        params.push(&entry_id);
        params.extend(values.iter().map(|v| v as &dyn rusqlite::ToSql));
        tx.execute(&variant_insert_sql(spec), params.as_slice())?;

        tx.commit()?;
        Ok(AppendOutcome::Committed(EntryId(entry_id)))
      })
      .await?;

    Ok(outcome)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn scan_kind(
    &self,
    spec: &'static VariantSpec,
    order: ScanOrder,
  ) -> Result<Vec<ScannedRow>> {
    let sql = scan_sql(spec, order);
    let field_count = spec.fields.len();

    let raws: Vec<RawJoinedEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![spec.kind], |row| {
            RawJoinedEntry::from_row(row, field_count)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(|raw| raw.into_scanned(spec)).collect())
  }

  async fn counts(&self) -> Result<TableCounts> {
    let variant_tables: Vec<&'static str> = variant_specs().map(|s| s.table).collect();

    let counts = self
      .conn
      .call(move |conn| {
        let count = |table: &str| -> rusqlite::Result<u64> {
          let n: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
          Ok(n as u64)
        };
        let mut variant_rows = 0;
        for table in variant_tables {
          variant_rows += count(table)?;
        }
        Ok(TableCounts {
          actors: count("actors")?,
          dates: count("dates")?,
          templates: count("message_templates")?,
          entries: count("log_entries")?,
          variant_rows,
        })
      })
      .await?;

    Ok(counts)
  }
}
