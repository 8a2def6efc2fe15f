//! Log entries — the append-only event records.
//!
//! A base entry references one row from each dimension and carries the time
//! of day. Its concrete kind lives in a separate variant table whose primary
//! key is the base entry's id. Kinds form a closed set: adding one means a
//! new [`EntryVariant`] case, a new table, and a [`VariantSpec`] in the
//! registry below.

use std::{fmt, str::FromStr};

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  dimension::{ActorId, CalendarDate, DateId, DimensionKind, TemplateId},
};

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Store-assigned identifier shared by a base entry and its variant row.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntryId(pub i64);

impl fmt::Display for EntryId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Time of day ─────────────────────────────────────────────────────────────

/// Hour, minute and second, stored verbatim alongside the date reference.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TimeOfDay {
  pub hour:   u8,
  pub minute: u8,
  pub second: u8,
}

impl TimeOfDay {
  pub fn new(hour: u8, minute: u8, second: u8) -> Result<Self> {
    let time = Self { hour, minute, second };
    time.validate()?;
    Ok(time)
  }

  pub fn from_naive(time: NaiveTime) -> Self {
    // chrono keeps every component in range; a leap second reports 59.
    Self {
      hour:   time.hour() as u8,
      minute: time.minute() as u8,
      second: time.second() as u8,
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.hour > 23 {
      return Err(Error::validation(format!("hour {} is outside 0-23", self.hour)));
    }
    if self.minute > 59 {
      return Err(Error::validation(format!(
        "minute {} is outside 0-59",
        self.minute
      )));
    }
    if self.second > 59 {
      return Err(Error::validation(format!(
        "second {} is outside 0-59",
        self.second
      )));
    }
    Ok(())
  }
}

impl fmt::Display for TimeOfDay {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
  }
}

impl FromStr for TimeOfDay {
  type Err = Error;

  /// Parse `HH:MM:SS`.
  fn from_str(s: &str) -> Result<Self> {
    let bad = || Error::validation(format!("bad time {s:?}, expected HH:MM:SS"));
    let mut parts = s.split(':');
    let (Some(h), Some(m), Some(sec), None) =
      (parts.next(), parts.next(), parts.next(), parts.next())
    else {
      return Err(bad());
    };
    let component = |p: &str| p.parse::<u8>().map_err(|_| bad());
    Self::new(component(h)?, component(m)?, component(sec)?)
  }
}

/// A wall-clock instant split into the date key and the time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStamp {
  pub date: CalendarDate,
  pub time: TimeOfDay,
}

impl EntryStamp {
  pub fn from_datetime(at: NaiveDateTime) -> Result<Self> {
    Ok(Self {
      date: CalendarDate::from_naive(at.date())?,
      time: TimeOfDay::from_naive(at.time()),
    })
  }
}

// ─── Kind registry ───────────────────────────────────────────────────────────

/// One column of a variant table and the placeholder it feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
  pub placeholder: &'static str,
  pub column:      &'static str,
  /// A template that never mentions a required field is a mismatch; the
  /// field's value would otherwise vanish from the output.
  pub required:    bool,
}

/// How one entry kind is stored and rendered.
#[derive(Debug, PartialEq, Eq)]
pub struct VariantSpec {
  /// Discriminator stored on the base row.
  pub kind:   &'static str,
  /// Table keyed by the base entry id.
  pub table:  &'static str,
  pub fields: &'static [FieldSpec],
}

impl VariantSpec {
  pub fn field(&self, placeholder: &str) -> Option<&FieldSpec> {
    self.fields.iter().find(|f| f.placeholder == placeholder)
  }
}

pub const ACTION_KIND: &str = "action";

pub static ACTION: VariantSpec = VariantSpec {
  kind:   ACTION_KIND,
  table:  "action_entries",
  fields: &[FieldSpec {
    placeholder: "action",
    column:      "action_text",
    required:    true,
  }],
};

static REGISTRY: &[&VariantSpec] = &[&ACTION];

/// Look up the spec for a discriminator.
pub fn variant_spec(kind: &str) -> Option<&'static VariantSpec> {
  REGISTRY.iter().copied().find(|spec| spec.kind == kind)
}

/// Every registered kind.
pub fn variant_specs() -> impl Iterator<Item = &'static VariantSpec> {
  REGISTRY.iter().copied()
}

// ─── Variants ────────────────────────────────────────────────────────────────

/// The concrete kind of an entry together with its extra fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryVariant {
  Action { action_text: String },
}

impl EntryVariant {
  pub fn action(text: impl Into<String>) -> Self {
    Self::Action { action_text: text.into() }
  }

  pub fn spec(&self) -> &'static VariantSpec {
    match self {
      Self::Action { .. } => &ACTION,
    }
  }

  /// The discriminator stored on the base row.
  pub fn discriminator(&self) -> &'static str { self.spec().kind }

  /// Column values in the order of [`VariantSpec::fields`].
  pub fn column_values(&self) -> Vec<String> {
    match self {
      Self::Action { action_text } => vec![action_text.clone()],
    }
  }

  pub fn validate(&self) -> Result<()> {
    match self {
      Self::Action { action_text } if action_text.trim().is_empty() => {
        Err(Error::validation("action text must not be empty"))
      }
      Self::Action { .. } => Ok(()),
    }
  }
}

// ─── NewEntry ────────────────────────────────────────────────────────────────

/// Input to [`crate::EventLog::append_entry`]. The id is assigned by the
/// store.
#[derive(Debug, Clone)]
pub struct NewEntry {
  pub actor:    ActorId,
  pub date:     DateId,
  pub template: TemplateId,
  pub time:     TimeOfDay,
  pub variant:  EntryVariant,
}

impl NewEntry {
  pub fn new(
    actor: ActorId,
    date: DateId,
    template: TemplateId,
    time: TimeOfDay,
    variant: EntryVariant,
  ) -> Self {
    Self { actor, date, template, time, variant }
  }

  pub fn validate(&self) -> Result<()> {
    self.time.validate()?;
    self.variant.validate()
  }

  /// The raw id this entry holds for a dimension.
  pub fn reference(&self, kind: DimensionKind) -> i64 {
    match kind {
      DimensionKind::Actor => self.actor.0,
      DimensionKind::Date => self.date.0,
      DimensionKind::Template => self.template.0,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn time_boundaries() {
    assert!(TimeOfDay::new(0, 0, 0).is_ok());
    assert!(TimeOfDay::new(23, 59, 59).is_ok());
    assert!(matches!(TimeOfDay::new(24, 0, 0), Err(Error::Validation(_))));
    assert!(matches!(TimeOfDay::new(0, 60, 0), Err(Error::Validation(_))));
    assert!(matches!(TimeOfDay::new(0, 0, 60), Err(Error::Validation(_))));
  }

  #[test]
  fn time_display_zero_pads() {
    assert_eq!(TimeOfDay::new(9, 5, 3).unwrap().to_string(), "09:05:03");
    assert_eq!(TimeOfDay::new(0, 0, 0).unwrap().to_string(), "00:00:00");
    assert_eq!(TimeOfDay::new(23, 59, 59).unwrap().to_string(), "23:59:59");
  }

  #[test]
  fn time_parses() {
    assert_eq!(
      "10:35:20".parse::<TimeOfDay>().unwrap(),
      TimeOfDay { hour: 10, minute: 35, second: 20 }
    );
    assert!("24:00:00".parse::<TimeOfDay>().is_err());
    assert!("10:35".parse::<TimeOfDay>().is_err());
    assert!("10:35:20:00".parse::<TimeOfDay>().is_err());
    assert!("ten:35:20".parse::<TimeOfDay>().is_err());
  }

  #[test]
  fn stamp_splits_datetime() {
    let at = NaiveDateTime::parse_from_str("2024-03-05 09:05:03", "%Y-%m-%d %H:%M:%S")
      .unwrap();
    let stamp = EntryStamp::from_datetime(at).unwrap();
    assert_eq!(stamp.date.to_string(), "2024-03-05");
    assert_eq!(stamp.time.to_string(), "09:05:03");
  }

  #[test]
  fn registry_resolves_action() {
    let spec = variant_spec("action").unwrap();
    assert_eq!(spec, &ACTION);
    assert_eq!(spec.table, "action_entries");
    assert!(spec.field("action").is_some_and(|f| f.required));
    assert!(variant_spec("chat").is_none());
    assert_eq!(variant_specs().count(), 1);
  }

  #[test]
  fn action_variant() {
    let v = EntryVariant::action("to dig");
    assert_eq!(v.discriminator(), "action");
    assert_eq!(v.column_values(), ["to dig"]);
    assert!(v.validate().is_ok());
    assert!(EntryVariant::action("  ").validate().is_err());
  }

  #[test]
  fn new_entry_validates_time_and_variant() {
    let entry = |time, text: &str| {
      NewEntry::new(ActorId(1), DateId(1), TemplateId(1), time, EntryVariant::action(text))
    };
    let ok = TimeOfDay { hour: 10, minute: 35, second: 20 };
    assert!(entry(ok, "to dig").validate().is_ok());
    assert!(entry(TimeOfDay { hour: 24, ..ok }, "to dig").validate().is_err());
    assert!(entry(ok, "").validate().is_err());
    assert_eq!(entry(ok, "x").reference(DimensionKind::Template), 1);
  }
}
