//! Subcommand implementations.

use anyhow::Context as _;
use chrono::Local;
use wurmlog_core::{
  EventLog,
  dimension::CalendarDate,
  entry::{ACTION_KIND, EntryStamp, EntryVariant, NewEntry, TimeOfDay},
  store::{LogStore, ScanOrder},
};

/// Actors and template seeded by `demo`.
const DEMO_ACTORS: [&str; 2] = ["john_doe", "jane_smith"];
const DEMO_TEMPLATE: &str = "You start {action}.";
const DEMO_ACTION: &str = "to dig";

pub async fn append<S: LogStore>(
  log: &EventLog<S>,
  actor: &str,
  template: &str,
  action: &str,
  date: Option<CalendarDate>,
  time: Option<TimeOfDay>,
) -> anyhow::Result<()> {
  let now = EntryStamp::from_datetime(Local::now().naive_local())?;

  let actor_id = log.resolve_actor(actor).await?;
  let date_id = log.resolve_date(date.unwrap_or(now.date)).await?;
  let template_id = log.resolve_template(template).await?;

  let entry_id = log
    .append_entry(NewEntry::new(
      actor_id,
      date_id,
      template_id,
      time.unwrap_or(now.time),
      EntryVariant::action(action),
    ))
    .await
    .context("failed to append entry")?;

  println!("{entry_id}");
  Ok(())
}

/// Print one line per reconstructed entry on stdout and one diagnostic per
/// skipped entry on stderr. Skipped entries do not fail the command.
pub async fn show<S: LogStore>(
  log: &EventLog<S>,
  kind: &str,
  chronological: bool,
  json: bool,
) -> anyhow::Result<()> {
  let order = if chronological { ScanOrder::Chronological } else { ScanOrder::Natural };
  let reconstruction = log.reconstruct(kind, order).await?;

  let mut skipped = 0usize;
  for item in &reconstruction {
    match item {
      Ok(line) if json => println!("{}", serde_json::to_string(&line)?),
      Ok(line) => println!("{line}"),
      Err(e) => {
        skipped += 1;
        eprintln!("skipped {e}");
      }
    }
  }

  if skipped > 0 {
    tracing::warn!(kind, skipped, total = reconstruction.len(), "some entries were skipped");
  }
  Ok(())
}

pub async fn demo<S: LogStore>(log: &EventLog<S>) -> anyhow::Result<()> {
  let now = EntryStamp::from_datetime(Local::now().naive_local())?;

  for name in DEMO_ACTORS {
    log.resolve_actor(name).await?;
  }
  let actor_id = log.resolve_actor(DEMO_ACTORS[0]).await?;
  let date_id = log.resolve_date(now.date).await?;
  let template_id = log.resolve_template(DEMO_TEMPLATE).await?;

  log
    .append_entry(NewEntry::new(
      actor_id,
      date_id,
      template_id,
      now.time,
      EntryVariant::action(DEMO_ACTION),
    ))
    .await?;

  show(log, ACTION_KIND, false, false).await
}

pub async fn stats<S: LogStore>(log: &EventLog<S>) -> anyhow::Result<()> {
  let counts = log.counts().await?;
  println!("actors       {}", counts.actors);
  println!("dates        {}", counts.dates);
  println!("templates    {}", counts.templates);
  println!("entries      {}", counts.entries);
  println!("variant rows {}", counts.variant_rows);
  Ok(())
}
