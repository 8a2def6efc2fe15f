//! Error types for `wurmlog-core`.

use std::fmt;

use thiserror::Error;

use crate::{dimension::DimensionKind, store::Corruption};

/// The row a dangling reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingRef {
  Dimension(DimensionKind),
  /// The concrete-variant row of the named kind.
  Variant(&'static str),
}

impl fmt::Display for MissingRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Dimension(kind) => write!(f, "{kind}"),
      Self::Variant(kind) => write!(f, "{kind} variant row"),
    }
  }
}

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed caller input. Never retried.
  #[error("validation error: {0}")]
  Validation(String),

  /// A concurrent writer kept winning the insert race for this key.
  #[error("{kind} key {key} still conflicts after {attempts} attempts")]
  DuplicateKey {
    kind:     DimensionKind,
    key:      String,
    attempts: u32,
  },

  #[error("dangling reference to {target} {id}")]
  DanglingReference { target: MissingRef, id: i64 },

  #[error(
    "template {template:?} does not fit the {kind} fields \
     (unknown placeholders: {unknown:?}, unused fields: {unused:?})"
  )]
  TemplateMismatch {
    kind:     &'static str,
    template: String,
    unknown:  Vec<String>,
    unused:   Vec<String>,
  },

  /// A stored row decodes to an invalid value. Not fixed by retrying.
  #[error("corrupt stored value in {0}")]
  CorruptRow(Corruption),

  #[error("unknown entry kind: {0:?}")]
  UnknownKind(String),

  #[error("storage unavailable: {0}")]
  StorageUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }

  pub(crate) fn storage<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::StorageUnavailable(Box::new(err))
  }

  /// Whether a caller may reasonably try the same operation again.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::DuplicateKey { .. } | Self::StorageUnavailable(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
