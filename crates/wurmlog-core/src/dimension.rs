//! Dimensions — the deduplicated reference tables an entry points at.
//!
//! Each dimension row is identified by a natural key (actor name, calendar
//! date, template text). Rows are created lazily on first use and never
//! updated or deleted afterwards.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, template::Template};

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Store-assigned identifier of an actor row.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ActorId(pub i64);

/// Store-assigned identifier of a calendar date row.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DateId(pub i64);

/// Store-assigned identifier of a message template row.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TemplateId(pub i64);

/// The three dimension tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionKind {
  Actor,
  Date,
  Template,
}

impl DimensionKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Actor => "actor",
      Self::Date => "date",
      Self::Template => "template",
    }
  }
}

impl fmt::Display for DimensionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// An identifier from any of the three dimension tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "dimension", content = "id", rename_all = "lowercase")]
pub enum DimensionId {
  Actor(ActorId),
  Date(DateId),
  Template(TemplateId),
}

impl DimensionId {
  /// Wrap a raw row id handed back by a backend for a key of `kind`.
  pub fn new(kind: DimensionKind, raw: i64) -> Self {
    match kind {
      DimensionKind::Actor => Self::Actor(ActorId(raw)),
      DimensionKind::Date => Self::Date(DateId(raw)),
      DimensionKind::Template => Self::Template(TemplateId(raw)),
    }
  }

  pub fn kind(&self) -> DimensionKind {
    match self {
      Self::Actor(_) => DimensionKind::Actor,
      Self::Date(_) => DimensionKind::Date,
      Self::Template(_) => DimensionKind::Template,
    }
  }

  pub fn raw(&self) -> i64 {
    match *self {
      Self::Actor(ActorId(id)) | Self::Date(DateId(id)) | Self::Template(TemplateId(id)) => id,
    }
  }
}

// ─── Calendar date ───────────────────────────────────────────────────────────

/// A day in the proleptic Gregorian calendar, decoupled from time of day so
/// many entries can share one row.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CalendarDate {
  pub year:  i32,
  pub month: u32,
  pub day:   u32,
}

impl CalendarDate {
  /// Build a date, rejecting anything that is not a real calendar day or
  /// cannot be written with a four-digit year.
  pub fn new(year: i32, month: u32, day: u32) -> Result<Self> {
    let date = Self { year, month, day };
    date.validate()?;
    Ok(date)
  }

  pub fn from_naive(date: NaiveDate) -> Result<Self> {
    Self::new(date.year(), date.month(), date.day())
  }

  pub fn validate(&self) -> Result<()> {
    if !(0..=9999).contains(&self.year) {
      return Err(Error::validation(format!(
        "year {} is outside 0-9999",
        self.year
      )));
    }
    if !(1..=12).contains(&self.month) {
      return Err(Error::validation(format!(
        "month {} is outside 1-12",
        self.month
      )));
    }
    if !(1..=31).contains(&self.day) {
      return Err(Error::validation(format!(
        "day {} is outside 1-31",
        self.day
      )));
    }
    if NaiveDate::from_ymd_opt(self.year, self.month, self.day).is_none() {
      return Err(Error::validation(format!("{self} is not a calendar day")));
    }
    Ok(())
  }
}

impl fmt::Display for CalendarDate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
  }
}

impl FromStr for CalendarDate {
  type Err = Error;

  /// Parse `YYYY-MM-DD`.
  fn from_str(s: &str) -> Result<Self> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
      .map_err(|e| Error::validation(format!("bad date {s:?}: {e}")))?;
    Self::from_naive(date)
  }
}

// ─── Natural keys ────────────────────────────────────────────────────────────

/// The caller-meaningful value that identifies exactly one dimension row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "dimension", content = "key", rename_all = "lowercase")]
pub enum DimensionKey {
  Actor(String),
  Date(CalendarDate),
  Template(String),
}

impl DimensionKey {
  pub fn actor(name: impl Into<String>) -> Self { Self::Actor(name.into()) }

  pub fn template(text: impl Into<String>) -> Self { Self::Template(text.into()) }

  pub fn kind(&self) -> DimensionKind {
    match self {
      Self::Actor(_) => DimensionKind::Actor,
      Self::Date(_) => DimensionKind::Date,
      Self::Template(_) => DimensionKind::Template,
    }
  }

  /// Reject malformed keys before anything touches the store. Template text
  /// is parsed so that broken placeholder syntax never gets persisted.
  pub fn validate(&self) -> Result<()> {
    match self {
      Self::Actor(name) if name.trim().is_empty() => {
        Err(Error::validation("actor name must not be empty"))
      }
      Self::Actor(_) => Ok(()),
      Self::Date(date) => date.validate(),
      Self::Template(text) => Template::parse(text).map(drop),
    }
  }
}

impl fmt::Display for DimensionKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Actor(name) => write!(f, "{name:?}"),
      Self::Date(date) => write!(f, "{date}"),
      Self::Template(text) => write!(f, "{text:?}"),
    }
  }
}

impl fmt::Display for ActorId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl fmt::Display for DateId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl fmt::Display for TemplateId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}
