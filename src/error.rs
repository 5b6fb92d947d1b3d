//! Error types for the Stratus client SDK.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  #[error("Record type {0:?} is not valid. It must be non-empty and must not start with an underscore")]
  InvalidRecordType(String),

  #[error("All queries must be for the same record type: expected {expected:?}, found {found:?}")]
  RecordTypeMismatch { expected: String, found: String },

  #[error("Invalid argument: {0}")]
  InvalidArgumentType(String),

  #[error("Malformed wire value: {0}")]
  MalformedWireValue(String),

  #[error("Invalid database id: {0:?}")]
  InvalidDatabaseId(String),

  #[error("Server error: {0}")]
  Server(String),

  #[error("Transport error: {0}")]
  Transport(String),

  #[error("Serialization error: {0}")]
  Serialization(String),

  #[error("Channel closed")]
  ChannelClosed,
}

impl From<serde_json::Error> for Error {
  fn from(e: serde_json::Error) -> Self {
    Self::Serialization(e.to_string())
  }
}

impl From<reqwest::Error> for Error {
  fn from(e: reqwest::Error) -> Self {
    Self::Transport(e.to_string())
  }
}

pub type Result<T> = std::result::Result<T, Error>;
