// crates/engine/src/domain/error.rs
use thiserror::Error;

use super::types::TrustResult;

#[derive(Debug, Error)]
pub enum EngineError {
  /// Empty chain, missing hostname for an SSL policy, unusable parameters.
  #[error("malformed input: {0}")]
  MalformedInput(String),

  #[error("malformed certificate: {0}")]
  MalformedCertificate(String),

  #[error("no path from leaf to any anchor: {0}")]
  ChainUnresolvable(String),

  #[error("store search failed in {store}: {reason}")]
  StoreSearch { store: String, reason: String },

  #[error("platform verification failed: {0}")]
  PlatformVerification(String),

  /// A certificate with the same issuer, serial and type is already stored.
  #[error("duplicate item in {store}: {item}")]
  DuplicateItem { store: String, item: String },

  #[error("item is not stored in a keychain")]
  NotPersisted,

  #[error("stale item handle (slot {index} is at generation {current}, handle has {held})")]
  StaleItem { index: u32, current: u32, held: u32 },

  #[error("configuration: {0}")]
  Config(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),

  #[error(transparent)]
  OpenSsl(#[from] openssl::error::ErrorStack),

  // Useful when we catch_unwind to avoid crossing FFI boundaries with panics.
  #[error("internal panic: {0}")]
  Panic(String),
}

impl EngineError {
  /// Status value for callers that want a single `TrustResult` even when
  /// evaluation could not run.
  pub fn trust_result(&self) -> TrustResult {
    match self {
      EngineError::MalformedInput(_)
      | EngineError::MalformedCertificate(_) => TrustResult::Invalid,
      EngineError::ChainUnresolvable(_) => TrustResult::RecoverableTrustFailure,
      _ => TrustResult::OtherError,
    }
  }
}

pub type EngineResult<T> = Result<T, EngineError>;
