// crates/engine/src/domain/trust_engine.rs

use std::fmt;
use std::time::SystemTime;

use super::anchors::AnchorSet;
use super::certificate::Certificate;
use super::error::EngineResult;
use super::policy::PolicyHost;
use super::types::PolicyKind;
use super::verify::VerifyOutcome;

/// Everything a verifier needs for one run over an assembled chain.
#[derive(Debug, Clone, Copy)]
pub struct VerifyRequest<'a> {
    /// Assembled chain, leaf first.
    pub chain: &'a [Certificate],
    pub anchors: &'a AnchorSet,
    pub kind: PolicyKind,
    pub host: Option<&'a PolicyHost>,
    pub at: SystemTime,
    pub max_depth: usize,
}

/// Trait implemented by platform verification backends (OpenSSL today).
///
/// Trust failures go in the returned [`VerifyOutcome`]; `Err` is reserved
/// for the backend itself breaking.
pub trait ChainVerifier: Send + Sync + fmt::Debug {
    fn verify(&self, request: &VerifyRequest<'_>) -> EngineResult<VerifyOutcome>;
}
