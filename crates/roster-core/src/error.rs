//! Error types for `roster-core`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("session record not found")]
  SessionMissing,

  #[error("failed to read session file {path}: {source}")]
  SessionIo {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("session record has no usable user id")]
  SessionMalformed,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
