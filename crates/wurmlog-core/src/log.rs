//! [`EventLog`] — the explicit store handle every operation goes through.

use crate::{
  Error, Result,
  dimension::{
    ActorId, CalendarDate, DateId, DimensionId, DimensionKey, DimensionKind, TemplateId,
  },
  entry::{EntryId, NewEntry, variant_spec},
  error::MissingRef,
  reconstruct::Reconstruction,
  store::{AppendOutcome, InsertOutcome, LogStore, ScanOrder, TableCounts},
};

/// How many lookup/insert rounds [`EventLog::resolve_or_create`] makes
/// before giving up on a contended key.
pub const DEFAULT_RESOLVE_ATTEMPTS: u32 = 3;

/// Deduplicating writer and reconstructing reader over a [`LogStore`].
#[derive(Debug, Clone)]
pub struct EventLog<S> {
  store:            S,
  resolve_attempts: u32,
}

impl<S: LogStore> EventLog<S> {
  pub fn new(store: S) -> Self {
    Self { store, resolve_attempts: DEFAULT_RESOLVE_ATTEMPTS }
  }

  /// Override the number of lookup/insert rounds. At least one is always
  /// made.
  pub fn with_resolve_attempts(mut self, attempts: u32) -> Self {
    self.resolve_attempts = attempts.max(1);
    self
  }

  pub fn store(&self) -> &S { &self.store }

  /// Give the store back, e.g. to close it.
  pub fn into_inner(self) -> S { self.store }

  // ── Dimensions ────────────────────────────────────────────────────────

  /// Return the id of the row for `key`, creating it if absent.
  ///
  /// A [`InsertOutcome::Duplicate`] from the backend means another writer
  /// inserted the key between our lookup and insert; the lookup is retried.
  /// Only when every attempt loses the race is [`Error::DuplicateKey`]
  /// returned.
  pub async fn resolve_or_create(&self, key: &DimensionKey) -> Result<DimensionId> {
    key.validate()?;
    let kind = key.kind();

    for attempt in 1..=self.resolve_attempts {
      if let Some(raw) = self.store.find_dimension(key).await.map_err(Error::storage)? {
        tracing::debug!(%kind, %key, id = raw, "reusing dimension row");
        return Ok(DimensionId::new(kind, raw));
      }

      match self.store.insert_dimension(key).await.map_err(Error::storage)? {
        InsertOutcome::Inserted(raw) => {
          tracing::debug!(%kind, %key, id = raw, "created dimension row");
          return Ok(DimensionId::new(kind, raw));
        }
        InsertOutcome::Duplicate => {
          tracing::debug!(%kind, %key, attempt, "lost insert race, retrying lookup");
        }
      }
    }

    Err(Error::DuplicateKey {
      kind,
      key: key.to_string(),
      attempts: self.resolve_attempts,
    })
  }

  pub async fn resolve_actor(&self, name: &str) -> Result<ActorId> {
    let id = self.resolve_or_create(&DimensionKey::actor(name)).await?;
    Ok(ActorId(id.raw()))
  }

  pub async fn resolve_date(&self, date: CalendarDate) -> Result<DateId> {
    let id = self.resolve_or_create(&DimensionKey::Date(date)).await?;
    Ok(DateId(id.raw()))
  }

  pub async fn resolve_template(&self, text: &str) -> Result<TemplateId> {
    let id = self.resolve_or_create(&DimensionKey::template(text)).await?;
    Ok(TemplateId(id.raw()))
  }

  // ── Entries ───────────────────────────────────────────────────────────

  /// Validate and commit a base entry together with its variant row.
  pub async fn append_entry(&self, entry: NewEntry) -> Result<EntryId> {
    entry.validate()?;
    let kind = entry.variant.discriminator();
    let (actor, date, template) = (entry.actor, entry.date, entry.template);

    match self.store.insert_entry(entry).await.map_err(Error::storage)? {
      AppendOutcome::Committed(id) => {
        tracing::info!(entry_id = id.0, kind, "appended entry");
        Ok(id)
      }
      AppendOutcome::Dangling(dimension) => Err(Error::DanglingReference {
        target: MissingRef::Dimension(dimension),
        id:     match dimension {
          DimensionKind::Actor => actor.0,
          DimensionKind::Date => date.0,
          DimensionKind::Template => template.0,
        },
      }),
    }
  }

  // ── Reconstruction ────────────────────────────────────────────────────

  /// Every entry of `kind` in the store's natural order.
  pub async fn reconstruct_all(&self, kind: &str) -> Result<Reconstruction> {
    self.reconstruct(kind, ScanOrder::Natural).await
  }

  pub async fn reconstruct(&self, kind: &str, order: ScanOrder) -> Result<Reconstruction> {
    let spec = variant_spec(kind).ok_or_else(|| Error::UnknownKind(kind.to_owned()))?;
    let rows = self.store.scan_kind(spec, order).await.map_err(Error::storage)?;
    tracing::debug!(kind, rows = rows.len(), "scanned entries");
    Ok(Reconstruction::new(spec, rows))
  }

  pub async fn counts(&self) -> Result<TableCounts> {
    self.store.counts().await.map_err(Error::storage)
  }
}
