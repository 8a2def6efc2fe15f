//! The `LogStore` trait — the persistence seam.
//!
//! Backends (e.g. `wurmlog-store-sqlite`) provide the storage primitives:
//! point lookup by natural key, insert with a uniqueness signal, an atomic
//! base-plus-variant insert, and a discriminator-filtered joined scan. The
//! deduplication, validation and formatting rules live in
//! [`EventLog`](crate::EventLog) on top of these.

use std::{fmt, future::Future};

use crate::{
  dimension::{CalendarDate, DimensionKey, DimensionKind},
  entry::{EntryId, NewEntry, TimeOfDay, VariantSpec},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of [`LogStore::insert_dimension`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
  /// A new row was created with this id.
  Inserted(i64),
  /// The natural key already exists; another writer got there first.
  Duplicate,
}

/// Result of [`LogStore::insert_entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
  Committed(EntryId),
  /// The referenced row of this dimension does not exist. Nothing was
  /// written.
  Dangling(DimensionKind),
}

/// Row order for [`LogStore::scan_kind`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanOrder {
  /// The store's own read order (insertion order for SQLite).
  #[default]
  Natural,
  /// By date, then time of day, then entry id.
  Chronological,
}

/// A base entry joined to its dimensions and variant row.
///
/// Each `Option` is `None` when the referenced row is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedEntry {
  pub entry_id:       EntryId,
  pub actor_id:       i64,
  pub date_id:        i64,
  pub template_id:    i64,
  pub time:           TimeOfDay,
  pub actor_name:     Option<String>,
  pub date:           Option<CalendarDate>,
  pub template_text:  Option<String>,
  /// Variant column values, in [`VariantSpec::fields`] order.
  pub variant_fields: Option<Vec<String>>,
}

/// A stored value that no longer decodes into its domain type, e.g. an hour
/// of `-1` or a date row for February 30th.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corruption {
  /// Where the offending value lives, e.g. `log_entries.hour`.
  pub column: &'static str,
  pub detail: String,
}

impl fmt::Display for Corruption {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.column, self.detail)
  }
}

/// One row of a [`LogStore::scan_kind`] result. Decoding is per row, so a
/// corrupt row never hides the rows around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannedRow {
  Joined(JoinedEntry),
  Corrupt {
    entry_id:   EntryId,
    corruption: Corruption,
  },
}

impl ScannedRow {
  pub fn entry_id(&self) -> EntryId {
    match self {
      Self::Joined(row) => row.entry_id,
      Self::Corrupt { entry_id, .. } => *entry_id,
    }
  }
}

impl From<JoinedEntry> for ScannedRow {
  fn from(row: JoinedEntry) -> Self { Self::Joined(row) }
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
  pub actors:       u64,
  pub dates:        u64,
  pub templates:    u64,
  pub entries:      u64,
  /// Summed over every registered variant table.
  pub variant_rows: u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a wurmlog storage backend.
///
/// Entries are append-only: nothing is ever updated or deleted. All methods
/// return `Send` futures so the store can be shared across a multi-threaded
/// runtime.
pub trait LogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Find the id of the dimension row with this natural key.
  fn find_dimension<'a>(
    &'a self,
    key: &'a DimensionKey,
  ) -> impl Future<Output = Result<Option<i64>, Self::Error>> + Send + 'a;

  /// Insert a dimension row. A uniqueness violation is reported as
  /// [`InsertOutcome::Duplicate`], never as a second row.
  fn insert_dimension<'a>(
    &'a self,
    key: &'a DimensionKey,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + 'a;

  /// Insert the base row and its variant row as one unit of work. Either
  /// both become visible or neither does.
  fn insert_entry(
    &self,
    entry: NewEntry,
  ) -> impl Future<Output = Result<AppendOutcome, Self::Error>> + Send + '_;

  /// Read every base row whose discriminator is `spec.kind`, joined to its
  /// dimensions and to `spec.table`. The whole result is read in one
  /// statement; a row that fails to decode comes back as
  /// [`ScannedRow::Corrupt`] rather than failing the scan.
  fn scan_kind(
    &self,
    spec: &'static VariantSpec,
    order: ScanOrder,
  ) -> impl Future<Output = Result<Vec<ScannedRow>, Self::Error>> + Send + '_;

  fn counts(&self) -> impl Future<Output = Result<TableCounts, Self::Error>> + Send + '_;
}
