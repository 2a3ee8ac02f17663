// crates/engine/src/domain/verify.rs
use serde::Serialize;

use super::certificate::Certificate;
use super::chain::{ChainStatus, StoreFailure};
use super::types::{PolicyKind, TrustResult, TrustSetting};

/// How bad a single verification failure is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    /// Changing the evaluation parameters (date, anchors, hostname) could fix it.
    Recoverable,
    /// Nothing the caller can change fixes it.
    Fatal,
    /// The input itself could not be interpreted.
    Invalid,
}

/// Closed set of failures reported by a [`crate::domain::trust_engine::ChainVerifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Expired,
    NotYetValid,
    HostnameMismatch,
    IssuerNotFound,
    UntrustedRoot,
    SelfSignedLeaf,
    InvalidPurpose,
    RevocationUnavailable,
    ChainUnresolvable,
    SignatureFailure,
    Revoked,
    InvalidCa,
    PathLengthExceeded,
    NameConstraintViolation,
    UnhandledCriticalExtension,
    Malformed,
    /// A verifier code with no mapping.
    Unknown,
}

impl FailureKind {
    pub fn severity(self) -> Severity {
        use FailureKind::*;
        match self {
            Expired | NotYetValid | HostnameMismatch | IssuerNotFound | UntrustedRoot
            | SelfSignedLeaf | InvalidPurpose | RevocationUnavailable | ChainUnresolvable => {
                Severity::Recoverable
            }
            SignatureFailure | Revoked | InvalidCa | PathLengthExceeded
            | NameConstraintViolation | UnhandledCriticalExtension | Unknown => Severity::Fatal,
            Malformed => Severity::Invalid,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyFailure {
    pub kind: FailureKind,
    /// Chain index of the offending certificate (0 = leaf).
    pub depth: usize,
    pub message: String,
}

/// Raw outcome of one platform verification run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerifyOutcome {
    pub failures: Vec<VerifyFailure>,
}

impl VerifyOutcome {
    pub fn passed() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: FailureKind, depth: usize, message: impl Into<String>) {
        self.failures.push(VerifyFailure {
            kind,
            depth,
            message: message.into(),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn has(&self, kind: FailureKind) -> bool {
        self.failures.iter().any(|f| f.kind == kind)
    }

    fn worst(&self) -> Option<Severity> {
        self.failures.iter().map(|f| f.kind.severity()).max()
    }
}

/// Reduce an explicit decision and the raw verifier outcome to one result.
///
/// An explicit decision always wins. Otherwise undecodable input beats a
/// hostname mismatch, which beats any other fatal failure.
pub fn classify(decision: Option<TrustSetting>, outcome: &VerifyOutcome) -> TrustResult {
    if let Some(setting) = decision {
        return setting.result();
    }
    if outcome.has(FailureKind::HostnameMismatch) && outcome.worst() != Some(Severity::Invalid) {
        return TrustResult::RecoverableTrustFailure;
    }
    match outcome.worst() {
        None => TrustResult::Unspecified,
        Some(Severity::Recoverable) => TrustResult::RecoverableTrustFailure,
        Some(Severity::Fatal) => TrustResult::FatalTrustFailure,
        Some(Severity::Invalid) => TrustResult::Invalid,
    }
}

/// Certificate summary included in a [`TrustReport`].
#[derive(Debug, Serialize, Clone)]
pub struct CertInfo {
    pub subject: String,
    pub issuer: String,
    pub serial_number: String,
    pub fingerprint_sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_after: Option<i64>,
}

impl From<&Certificate> for CertInfo {
    fn from(cert: &Certificate) -> Self {
        Self {
            subject: cert.subject_summary(),
            issuer: cert.issuer_string(),
            serial_number: cert.serial_number_hex(),
            fingerprint_sha256: cert.fingerprint_hex(),
            not_before: cert.not_before_unix().ok(),
            not_after: cert.not_after_unix().ok(),
        }
    }
}

#[derive(Debug, Serialize, Clone, Copy)]
pub struct DecisionInfo {
    /// Chain index of the certificate carrying the decision.
    pub depth: usize,
    pub setting: TrustSetting,
}

/// Serializable summary of one evaluation.
#[derive(Debug, Serialize, Clone)]
pub struct TrustReport {
    pub policy: PolicyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub result: TrustResult,
    /// Verification instant, seconds since the Unix epoch.
    pub verify_time: i64,
    pub chain_status: ChainStatus,
    pub chain: Vec<CertInfo>,
    pub failures: Vec<VerifyFailure>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub store_failures: Vec<StoreFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<DecisionInfo>,
}

impl TrustReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(kinds: &[FailureKind]) -> VerifyOutcome {
        let mut out = VerifyOutcome::passed();
        for (depth, kind) in kinds.iter().enumerate() {
            out.push(*kind, depth, format!("{kind:?}"));
        }
        out
    }

    #[test]
    fn clean_outcome_without_decision_is_unspecified() {
        assert_eq!(classify(None, &VerifyOutcome::passed()), TrustResult::Unspecified);
    }

    #[test]
    fn explicit_decision_overrides_failures() {
        let bad = outcome(&[FailureKind::SignatureFailure, FailureKind::Expired]);
        assert_eq!(classify(Some(TrustSetting::AlwaysTrust), &bad), TrustResult::Proceed);
        assert_eq!(classify(Some(TrustSetting::NeverTrust), &bad), TrustResult::Deny);
        assert_eq!(classify(Some(TrustSetting::Confirm), &bad), TrustResult::Confirm);
        assert_eq!(
            classify(Some(TrustSetting::NeverTrust), &VerifyOutcome::passed()),
            TrustResult::Deny
        );
    }

    #[test]
    fn fatal_beats_recoverable() {
        let out = outcome(&[FailureKind::Expired, FailureKind::Revoked]);
        assert_eq!(classify(None, &out), TrustResult::FatalTrustFailure);
    }

    #[test]
    fn hostname_mismatch_is_recoverable_even_with_fatal_chain() {
        let out = outcome(&[FailureKind::SignatureFailure, FailureKind::HostnameMismatch]);
        assert_eq!(classify(None, &out), TrustResult::RecoverableTrustFailure);
    }

    #[test]
    fn malformed_input_is_invalid() {
        let out = outcome(&[FailureKind::HostnameMismatch, FailureKind::Malformed]);
        assert_eq!(classify(None, &out), TrustResult::Invalid);
    }

    #[test]
    fn unknown_codes_are_fatal() {
        assert_eq!(FailureKind::Unknown.severity(), Severity::Fatal);
        assert_eq!(
            classify(None, &outcome(&[FailureKind::Unknown])),
            TrustResult::FatalTrustFailure
        );
    }
}
