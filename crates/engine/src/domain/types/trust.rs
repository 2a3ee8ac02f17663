use serde::{Deserialize, Serialize};

use super::core::PolicyKind;

/// Classified outcome of a trust evaluation. Exactly one value per evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TrustResult {
    /// Malformed input (empty chain, unusable policy parameters).
    Invalid,
    /// An explicit user decision closest to the leaf says "always trust".
    Proceed,
    /// An explicit decision exists but needs interactive confirmation.
    Confirm,
    /// An explicit user decision closest to the leaf says "never trust".
    Deny,
    /// No explicit decision anywhere on the chain; apply a default action.
    Unspecified,
    /// Trust denied with these parameters; changing them may help.
    RecoverableTrustFailure,
    /// Trust denied; no parameter change can fix it.
    FatalTrustFailure,
    /// The verification primitive failed for an internal reason.
    OtherError,
}

impl TrustResult {
    /// True for the two results a caller may act on without asking the user.
    pub fn is_trusted(self) -> bool {
        matches!(self, TrustResult::Proceed | TrustResult::Unspecified)
    }
}

/// An explicit user trust decision attached to a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustSetting {
    AlwaysTrust,
    NeverTrust,
    Confirm,
}

impl TrustSetting {
    pub fn result(self) -> TrustResult {
        match self {
            TrustSetting::AlwaysTrust => TrustResult::Proceed,
            TrustSetting::NeverTrust => TrustResult::Deny,
            TrustSetting::Confirm => TrustResult::Confirm,
        }
    }
}

/// One row of the user trust-settings table, keyed by the SHA-256
/// fingerprint of the certificate (lowercase hex, no separators).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustSettingEntry {
    pub fingerprint_sha256: String,
    pub setting: TrustSetting,
    /// Restrict the decision to these policies; `None` applies to all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies: Option<Vec<PolicyKind>>,
}
