//! Error type for `wurmlog-store-sqlite`.
//!
//! Rows that fail to decode are not errors here; they come back from
//! `scan_kind` as `ScannedRow::Corrupt`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
