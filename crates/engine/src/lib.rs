// crates/engine/src/lib.rs

//! Public facade for the Keyhold engine.
//! Exposes a stable API and re-exports types for consumers (FFI, services).

pub mod adapters;
pub mod crypto;
pub mod domain;
pub mod platform;
pub mod store;

use domain::error::EngineResult;

/// High-level helpers for the common "DER chain in, result out" path.
/// Both evaluate against the shared platform.

pub fn evaluate_basic_x509(chain_der: &[Vec<u8>]) -> EngineResult<TrustResult> {
    Trust::for_basic_x509(parse_chain(chain_der)?).evaluate()
}

pub fn evaluate_ssl_server(chain_der: &[Vec<u8>], hostname: &str) -> EngineResult<TrustResult> {
    Trust::for_ssl_server(parse_chain(chain_der)?, hostname).evaluate()
}

/// Decode a leaf-first list of DER certificates.
pub fn parse_chain(chain_der: &[Vec<u8>]) -> EngineResult<Vec<Certificate>> {
    if chain_der.is_empty() {
        return Err(EngineError::MalformedInput("certificate chain is empty".into()));
    }
    chain_der.iter().map(|der| Certificate::from_der(der)).collect()
}

// Re-exports for convenience
pub use adapters::x509::OpenSslVerifier;
pub use crypto::key::Key;
pub use domain::anchors::{AnchorSelection, AnchorSet};
pub use domain::certificate::Certificate;
pub use domain::chain::{AssembledChain, ChainAssembler, ChainStatus};
pub use domain::error::EngineError;
pub use domain::policy::{Policy, PolicyHost};
pub use domain::trust::{Evaluation, Trust, TrustState};
pub use domain::trust_engine::{ChainVerifier, VerifyRequest};
pub use domain::trust_settings::TrustSettings;
pub use domain::types::{LimitsConfig, PlatformConfig, PolicyKind, TrustResult, TrustSetting, TrustSettingEntry};
pub use domain::verify::{FailureKind, Severity, TrustReport, VerifyFailure, VerifyOutcome};
pub use platform::Platform;
pub use store::{DirectoryKeychain, Keychain, MemoryKeychain, SearchList};
