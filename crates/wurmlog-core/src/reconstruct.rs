//! Reconstruction — turning joined entries back into display lines.
//!
//! A [`Reconstruction`] owns one snapshot of joined rows for a single kind.
//! The rows are read from the store up front; only the formatting is lazy.
//! A bad row yields a [`RowError`] without stopping the rest of the
//! sequence.

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::Serialize;

use crate::{
  Error, Result,
  dimension::DimensionKind,
  entry::{EntryId, VariantSpec},
  error::MissingRef,
  store::{Corruption, JoinedEntry, ScannedRow},
  template::Template,
};

/// One reconstructed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedLine {
  pub entry_id:          EntryId,
  pub actor_name:        String,
  /// `YYYY-MM-DD`, zero-padded.
  pub date_string:       String,
  /// `HH:MM:SS`, zero-padded.
  pub time_string:       String,
  pub formatted_message: String,
}

impl fmt::Display for FormattedLine {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} - {} {} - {}",
      self.actor_name, self.date_string, self.time_string, self.formatted_message
    )
  }
}

/// A row that could not be reconstructed.
#[derive(Debug, thiserror::Error)]
#[error("entry {entry_id}: {error}")]
pub struct RowError {
  pub entry_id: EntryId,
  #[source]
  pub error:    Error,
}

/// The rows of one kind as read by a single scan, ready to be formatted.
///
/// This is a materialised snapshot: entries appended after the scan are not
/// seen. Cloning is cheap, and [`iter`](Self::iter) restarts from the first
/// row each time it is called.
#[derive(Debug, Clone)]
pub struct Reconstruction {
  spec: &'static VariantSpec,
  rows: Arc<[ScannedRow]>,
}

impl Reconstruction {
  pub fn new<R: Into<ScannedRow>>(
    spec: &'static VariantSpec,
    rows: impl IntoIterator<Item = R>,
  ) -> Self {
    Self { spec, rows: rows.into_iter().map(Into::into).collect() }
  }

  pub fn kind(&self) -> &'static str { self.spec.kind }

  /// Number of base rows read, including any that will fail to format.
  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  pub fn iter(&self) -> Lines<'_> {
    Lines { spec: self.spec, rows: self.rows.iter() }
  }
}

impl<'a> IntoIterator for &'a Reconstruction {
  type Item = Result<FormattedLine, RowError>;
  type IntoIter = Lines<'a>;

  fn into_iter(self) -> Lines<'a> { self.iter() }
}

/// Lazy iterator over a [`Reconstruction`].
pub struct Lines<'a> {
  spec: &'static VariantSpec,
  rows: std::slice::Iter<'a, ScannedRow>,
}

impl Iterator for Lines<'_> {
  type Item = Result<FormattedLine, RowError>;

  fn next(&mut self) -> Option<Self::Item> {
    let row = self.rows.next()?;
    let entry_id = row.entry_id();
    let formatted = match row {
      ScannedRow::Joined(joined) => format_row(self.spec, joined),
      ScannedRow::Corrupt { corruption, .. } => Err(Error::CorruptRow(corruption.clone())),
    };
    Some(formatted.map_err(|error| {
      tracing::debug!(entry_id = entry_id.0, %error, "skipping entry");
      RowError { entry_id, error }
    }))
  }

  fn size_hint(&self) -> (usize, Option<usize>) { self.rows.size_hint() }
}

/// Join one row to its dimensions and variant fields and substitute the
/// template.
pub fn format_row(spec: &'static VariantSpec, row: &JoinedEntry) -> Result<FormattedLine> {
  let dangling = |target: MissingRef, id: i64| Error::DanglingReference { target, id };

  let actor_name = row
    .actor_name
    .as_ref()
    .ok_or_else(|| dangling(MissingRef::Dimension(DimensionKind::Actor), row.actor_id))?;
  let date = row
    .date
    .ok_or_else(|| dangling(MissingRef::Dimension(DimensionKind::Date), row.date_id))?;
  let text = row
    .template_text
    .as_ref()
    .ok_or_else(|| dangling(MissingRef::Dimension(DimensionKind::Template), row.template_id))?;
  let values = row
    .variant_fields
    .as_ref()
    .ok_or_else(|| dangling(MissingRef::Variant(spec.kind), row.entry_id.0))?;

  // Validated on insert, so a parse failure here is a corrupt row.
  let template = Template::parse(text).map_err(|error| match error {
    Error::Validation(detail) => {
      Error::CorruptRow(Corruption { column: "message_templates.text", detail })
    }
    other => other,
  })?;
  check_fields(spec, &template)?;

  let fields: BTreeMap<&str, &str> = spec
    .fields
    .iter()
    .map(|f| f.placeholder)
    .zip(values.iter().map(String::as_str))
    .collect();
  let formatted_message = template
    .render(&fields)
    .map_err(|missing| mismatch(spec, &template, vec![missing], Vec::new()))?;

  Ok(FormattedLine {
    entry_id: row.entry_id,
    actor_name: actor_name.clone(),
    date_string: date.to_string(),
    time_string: row.time.to_string(),
    formatted_message,
  })
}

/// The variant must provide every placeholder the template names, and the
/// template must use every field the variant marks as required.
pub fn check_fields(spec: &'static VariantSpec, template: &Template) -> Result<()> {
  let placeholders = template.placeholders();
  let unknown: Vec<String> = placeholders
    .iter()
    .filter(|name| spec.field(name).is_none())
    .map(|name| name.to_string())
    .collect();
  let unused: Vec<String> = spec
    .fields
    .iter()
    .filter(|f| f.required && !placeholders.contains(f.placeholder))
    .map(|f| f.placeholder.to_owned())
    .collect();

  if unknown.is_empty() && unused.is_empty() {
    Ok(())
  } else {
    Err(mismatch(spec, template, unknown, unused))
  }
}

fn mismatch(
  spec: &'static VariantSpec,
  template: &Template,
  unknown: Vec<String>,
  unused: Vec<String>,
) -> Error {
  Error::TemplateMismatch {
    kind: spec.kind,
    template: template.text().to_owned(),
    unknown,
    unused,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    dimension::CalendarDate,
    entry::{ACTION, TimeOfDay},
  };

  fn row(id: i64, template: &str, action: &str) -> JoinedEntry {
    JoinedEntry {
      entry_id:       EntryId(id),
      actor_id:       1,
      date_id:        1,
      template_id:    1,
      time:           TimeOfDay { hour: 10, minute: 35, second: 20 },
      actor_name:     Some("john_doe".into()),
      date:           Some(CalendarDate { year: 2024, month: 3, day: 5 }),
      template_text:  Some(template.into()),
      variant_fields: Some(vec![action.into()]),
    }
  }

  #[test]
  fn formats_the_reference_line() {
    let line = format_row(&ACTION, &row(1, "You start {action}.", "to dig")).unwrap();
    assert_eq!(line.actor_name, "john_doe");
    assert_eq!(line.date_string, "2024-03-05");
    assert_eq!(line.time_string, "10:35:20");
    assert_eq!(line.formatted_message, "You start to dig.");
    assert_eq!(
      line.to_string(),
      "john_doe - 2024-03-05 10:35:20 - You start to dig."
    );
  }

  #[test]
  fn zero_pads_single_digits() {
    let mut r = row(1, "{action}", "x");
    r.date = Some(CalendarDate { year: 2024, month: 3, day: 5 });
    r.time = TimeOfDay { hour: 9, minute: 5, second: 3 };
    let line = format_row(&ACTION, &r).unwrap();
    assert_eq!(format!("{} {}", line.date_string, line.time_string), "2024-03-05 09:05:03");
  }

  #[test]
  fn unknown_placeholder_is_a_mismatch() {
    let err = format_row(&ACTION, &row(1, "You start {verb}.", "to dig")).unwrap_err();
    assert!(matches!(
      err,
      Error::TemplateMismatch { ref unknown, ref unused, .. }
        if unknown == &["verb"] && unused == &["action"]
    ));
  }

  #[test]
  fn template_without_required_field_is_a_mismatch() {
    let err = format_row(&ACTION, &row(1, "You start digging.", "to dig")).unwrap_err();
    assert!(matches!(
      err,
      Error::TemplateMismatch { ref unknown, ref unused, .. }
        if unknown.is_empty() && unused == &["action"]
    ));
  }

  #[test]
  fn missing_rows_are_dangling() {
    let mut r = row(4, "{action}", "x");
    r.actor_name = None;
    r.actor_id = 99;
    assert!(matches!(
      format_row(&ACTION, &r),
      Err(Error::DanglingReference {
        target: MissingRef::Dimension(DimensionKind::Actor),
        id: 99
      })
    ));

    let mut r = row(4, "{action}", "x");
    r.variant_fields = None;
    assert!(matches!(
      format_row(&ACTION, &r),
      Err(Error::DanglingReference { target: MissingRef::Variant("action"), id: 4 })
    ));
  }

  #[test]
  fn bad_rows_are_skipped_not_fatal() {
    let recon = Reconstruction::new(
      &ACTION,
      vec![
        row(1, "You start {action}.", "to dig"),
        row(2, "You start {verb}.", "to mine"),
        row(3, "You stop {action}.", "to dig"),
      ],
    );

    let (ok, bad): (Vec<_>, Vec<_>) = recon.iter().partition(Result::is_ok);
    assert_eq!(ok.len(), 2);
    assert_eq!(bad.len(), 1);
    assert!(matches!(&bad[0], Err(RowError { entry_id: EntryId(2), .. })));
  }

  #[test]
  fn corrupt_rows_are_skipped_not_fatal() {
    let corruption = Corruption { column: "log_entries.hour", detail: "-1".into() };
    let recon = Reconstruction::new(
      &ACTION,
      [
        ScannedRow::Joined(row(1, "You start {action}.", "to dig")),
        ScannedRow::Corrupt { entry_id: EntryId(2), corruption: corruption.clone() },
      ],
    );

    let items: Vec<_> = recon.iter().collect();
    assert!(matches!(&items[0], Ok(line) if line.formatted_message == "You start to dig."));
    let Err(skipped) = &items[1] else { panic!("corrupt row formatted") };
    assert_eq!(skipped.entry_id, EntryId(2));
    assert!(matches!(&skipped.error, Error::CorruptRow(c) if *c == corruption));
    assert!(!skipped.error.is_retryable());
  }

  #[test]
  fn malformed_stored_template_is_corrupt() {
    let err = format_row(&ACTION, &row(1, "You start {action", "to dig")).unwrap_err();
    assert!(matches!(
      err,
      Error::CorruptRow(Corruption { column: "message_templates.text", .. })
    ));
  }

  #[test]
  fn iteration_restarts() {
    let recon = Reconstruction::new(&ACTION, vec![row(1, "{action}", "a"), row(2, "{action}", "b")]);
    let first: Vec<_> = recon.iter().filter_map(Result::ok).collect();
    let second: Vec<_> = (&recon).into_iter().filter_map(Result::ok).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), recon.len());
  }
}
