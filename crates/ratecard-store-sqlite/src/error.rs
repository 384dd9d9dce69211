//! Error type for `ratecard-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The backing file could not be opened or is not writable.
  #[error("failed to open store: {0}")]
  Open(#[source] tokio_rusqlite::Error),

  /// A DDL statement failed while creating or upgrading the schema.
  #[error("failed to initialise schema: {0}")]
  Schema(#[source] tokio_rusqlite::Error),

  /// The store handle has been closed.
  #[error("store is not initialised")]
  NotInitialized,

  #[error("write failed: {0}")]
  Write(#[source] tokio_rusqlite::Error),

  #[error("read failed: {0}")]
  Read(#[source] tokio_rusqlite::Error),

  /// A value cannot be stored in a form that reads back unchanged.
  #[error("could not encode value: {0}")]
  Encode(String),

  /// A stored column held a value that does not decode into a domain type.
  #[error("could not decode stored value: {0}")]
  Decode(String),

  #[error("core error: {0}")]
  Core(#[from] ratecard_core::Error),
}

impl Error {
  /// Classify a failed read. A closed connection means the handle was
  /// released, not that the query failed.
  pub(crate) fn read(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::ConnectionClosed => Self::NotInitialized,
      e => Self::Read(e),
    }
  }

  pub(crate) fn write(e: tokio_rusqlite::Error) -> Self {
    match e {
      tokio_rusqlite::Error::ConnectionClosed => Self::NotInitialized,
      e => Self::Write(e),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
