//! Conversions between domain types and the integer/text columns stored in
//! SQLite, plus the SQL built from a [`VariantSpec`].

use wurmlog_core::{
  dimension::CalendarDate,
  entry::{EntryId, TimeOfDay, VariantSpec},
  store::{Corruption, JoinedEntry, ScanOrder, ScannedRow},
};

// ─── Integers ────────────────────────────────────────────────────────────────

fn narrow<T: TryFrom<i64>>(column: &'static str, value: i64) -> Result<T, Corruption> {
  T::try_from(value).map_err(|_| Corruption {
    column,
    detail: format!("value {value} is out of range"),
  })
}

// ─── Variant SQL ─────────────────────────────────────────────────────────────

/// `INSERT` for a variant table: `?1` is the entry id, the field columns
/// follow in spec order.
pub fn variant_insert_sql(spec: &VariantSpec) -> String {
  let columns: Vec<&str> = spec.fields.iter().map(|f| f.column).collect();
  let params: Vec<String> =
    (0..spec.fields.len()).map(|i| format!("?{}", i + 2)).collect();
  format!(
    "INSERT INTO {} (entry_id, {}) VALUES (?1, {})",
    spec.table,
    columns.join(", "),
    params.join(", "),
  )
}

/// Index of the first variant field column in a [`scan_sql`] row.
pub const SCAN_FIELD_OFFSET: usize = 13;

/// The joined scan for one kind. Every join is a `LEFT JOIN` so a missing
/// row shows up as `NULL` instead of silently dropping the entry.
pub fn scan_sql(spec: &VariantSpec, order: ScanOrder) -> String {
  let fields: String = spec
    .fields
    .iter()
    .map(|f| format!(", v.{}", f.column))
    .collect();
  let order_by = match order {
    ScanOrder::Natural => "e.entry_id",
    ScanOrder::Chronological => {
      "d.year, d.month, d.day, e.hour, e.minute, e.second, e.entry_id"
    }
  };
  format!(
    "SELECT
       e.entry_id, e.actor_id, e.date_id, e.template_id,
       e.hour, e.minute, e.second,
       a.name, d.year, d.month, d.day, t.text,
       v.entry_id{fields}
     FROM log_entries e
     LEFT JOIN actors            a ON a.actor_id    = e.actor_id
     LEFT JOIN dates             d ON d.date_id     = e.date_id
     LEFT JOIN message_templates t ON t.template_id = e.template_id
     LEFT JOIN {table}           v ON v.entry_id    = e.entry_id
     WHERE e.kind = ?1
     ORDER BY {order_by}",
    table = spec.table,
  )
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from one [`scan_sql`] row.
pub struct RawJoinedEntry {
  // log_entries columns
  pub entry_id:      i64,
  pub actor_id:      i64,
  pub date_id:       i64,
  pub template_id:   i64,
  pub hour:          i64,
  pub minute:        i64,
  pub second:        i64,
  // dimension joins
  pub actor_name:    Option<String>,
  pub year:          Option<i64>,
  pub month:         Option<i64>,
  pub day:           Option<i64>,
  pub template_text: Option<String>,
  // variant join
  pub variant_id:    Option<i64>,
  pub fields:        Vec<Option<String>>,
}

impl RawJoinedEntry {
  pub fn from_row(row: &rusqlite::Row<'_>, field_count: usize) -> rusqlite::Result<Self> {
    let fields = (0..field_count)
      .map(|i| row.get(SCAN_FIELD_OFFSET + i))
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(Self {
      entry_id: row.get(0)?,
      actor_id: row.get(1)?,
      date_id: row.get(2)?,
      template_id: row.get(3)?,
      hour: row.get(4)?,
      minute: row.get(5)?,
      second: row.get(6)?,
      actor_name: row.get(7)?,
      year: row.get(8)?,
      month: row.get(9)?,
      day: row.get(10)?,
      template_text: row.get(11)?,
      variant_id: row.get(12)?,
      fields,
    })
  }

  /// Decode into a [`ScannedRow`]. A value that does not fit its domain type
  /// marks this row corrupt and leaves every other row alone.
  pub fn into_scanned(self, spec: &VariantSpec) -> ScannedRow {
    let entry_id = EntryId(self.entry_id);
    match self.decode(spec) {
      Ok(joined) => ScannedRow::Joined(joined),
      Err(corruption) => {
        tracing::debug!(entry_id = entry_id.0, %corruption, "undecodable row");
        ScannedRow::Corrupt { entry_id, corruption }
      }
    }
  }

  fn decode(self, spec: &VariantSpec) -> Result<JoinedEntry, Corruption> {
    let time = TimeOfDay::new(
      narrow("log_entries.hour", self.hour)?,
      narrow("log_entries.minute", self.minute)?,
      narrow("log_entries.second", self.second)?,
    )
    .map_err(|e| corrupt("log_entries", e))?;

    let date = match (self.year, self.month, self.day) {
      (Some(year), Some(month), Some(day)) => Some(
        CalendarDate::new(
          narrow("dates.year", year)?,
          narrow("dates.month", month)?,
          narrow("dates.day", day)?,
        )
        .map_err(|e| corrupt("dates", e))?,
      ),
      _ => None,
    };

    let variant_fields = match self.variant_id {
      Some(_) => Some(
        self
          .fields
          .into_iter()
          .zip(spec.fields)
          .map(|(value, field)| {
            value.ok_or_else(|| Corruption {
              column: field.column,
              detail: "value is NULL".into(),
            })
          })
          .collect::<Result<Vec<_>, _>>()?,
      ),
      None => None,
    };

    Ok(JoinedEntry {
      entry_id: EntryId(self.entry_id),
      actor_id: self.actor_id,
      date_id: self.date_id,
      template_id: self.template_id,
      time,
      actor_name: self.actor_name,
      date,
      template_text: self.template_text,
      variant_fields,
    })
  }
}

fn corrupt(column: &'static str, error: wurmlog_core::Error) -> Corruption {
  Corruption { column, detail: error.to_string() }
}

#[cfg(test)]
mod tests {
  use wurmlog_core::entry::ACTION;

  use super::*;

  #[test]
  fn variant_insert_targets_spec_table() {
    assert_eq!(
      variant_insert_sql(&ACTION),
      "INSERT INTO action_entries (entry_id, action_text) VALUES (?1, ?2)"
    );
  }

  #[test]
  fn scan_selects_every_field_column() {
    let sql = scan_sql(&ACTION, ScanOrder::Natural);
    assert!(sql.contains("v.entry_id, v.action_text"));
    assert!(sql.contains("LEFT JOIN action_entries"));
    assert!(sql.ends_with("ORDER BY e.entry_id"));
    assert!(scan_sql(&ACTION, ScanOrder::Chronological).contains("ORDER BY d.year"));
  }

  #[test]
  fn narrow_rejects_overflow() {
    let err = narrow::<u8>("log_entries.hour", 300).unwrap_err();
    assert_eq!(err.column, "log_entries.hour");
    assert_eq!(err.detail, "value 300 is out of range");
    assert_eq!(narrow::<u8>("log_entries.hour", 23).unwrap(), 23);
  }

  fn raw(hour: i64, day: i64, action: Option<&str>) -> RawJoinedEntry {
    RawJoinedEntry {
      entry_id:      7,
      actor_id:      1,
      date_id:       1,
      template_id:   1,
      hour,
      minute:        0,
      second:        0,
      actor_name:    Some("john_doe".into()),
      year:          Some(2024),
      month:         Some(2),
      day:           Some(day),
      template_text: Some("{action}".into()),
      variant_id:    Some(7),
      fields:        vec![action.map(str::to_owned)],
    }
  }

  fn corrupt_column(row: ScannedRow) -> &'static str {
    match row {
      ScannedRow::Corrupt { entry_id, corruption } => {
        assert_eq!(entry_id, EntryId(7));
        corruption.column
      }
      ScannedRow::Joined(joined) => panic!("decoded {joined:?}"),
    }
  }

  #[test]
  fn bad_values_mark_only_their_row_corrupt() {
    assert!(matches!(raw(10, 29, Some("x")).into_scanned(&ACTION), ScannedRow::Joined(_)));
    assert_eq!(corrupt_column(raw(-1, 29, Some("x")).into_scanned(&ACTION)), "log_entries.hour");
    assert_eq!(corrupt_column(raw(24, 29, Some("x")).into_scanned(&ACTION)), "log_entries");
    assert_eq!(corrupt_column(raw(10, 30, Some("x")).into_scanned(&ACTION)), "dates");
    assert_eq!(corrupt_column(raw(10, 29, None).into_scanned(&ACTION)), "action_text");
  }
}
