//! Error types for `ratecard-core`.

use thiserror::Error;

use crate::limit::ScopeKind;

#[derive(Debug, Error)]
pub enum Error {
  /// A rate limit's declared scope kind disagrees with its scope fields.
  #[error(
    "rate limit declares scope {applies_to} but has model {model:?} and \
     endpoint {endpoint:?}"
  )]
  ScopeMismatch {
    applies_to: ScopeKind,
    model:      Option<String>,
    endpoint:   Option<String>,
  },

  #[error("unknown scope kind: {0:?}")]
  UnknownScope(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
