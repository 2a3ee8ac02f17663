// crates/engine/src/domain/trust_settings.rs

//! Explicit user trust decisions keyed by certificate fingerprint.

use std::collections::BTreeMap;

use super::certificate::Certificate;
use super::error::{EngineError, EngineResult};
use super::types::{PolicyKind, TrustSetting, TrustSettingEntry};

#[derive(Debug, Clone, Default)]
pub struct TrustSettings {
    entries: BTreeMap<String, TrustSettingEntry>,
}

impl TrustSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = TrustSettingEntry>) -> EngineResult<Self> {
        let mut settings = Self::new();
        for mut entry in entries {
            entry.fingerprint_sha256 = normalize_fingerprint(&entry.fingerprint_sha256)?;
            settings.entries.insert(entry.fingerprint_sha256.clone(), entry);
        }
        Ok(settings)
    }

    /// Parse a JSON array of entries.
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let entries: Vec<TrustSettingEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    /// Record a decision for `cert`; `policies = None` applies it to every policy.
    pub fn set(&mut self, cert: &Certificate, setting: TrustSetting, policies: Option<Vec<PolicyKind>>) {
        let fingerprint = cert.fingerprint_hex();
        self.entries.insert(
            fingerprint.clone(),
            TrustSettingEntry {
                fingerprint_sha256: fingerprint,
                setting,
                policies,
            },
        );
    }

    pub fn remove(&mut self, cert: &Certificate) -> Option<TrustSetting> {
        self.entries.remove(&cert.fingerprint_hex()).map(|e| e.setting)
    }

    pub fn decision_for(&self, cert: &Certificate, kind: PolicyKind) -> Option<TrustSetting> {
        let entry = self.entries.get(&cert.fingerprint_hex())?;
        match &entry.policies {
            Some(scope) if !scope.contains(&kind) => None,
            _ => Some(entry.setting),
        }
    }

    /// The decision closest to the leaf, with its chain index.
    pub fn closest_decision(&self, chain: &[Certificate], kind: PolicyKind) -> Option<(usize, TrustSetting)> {
        chain
            .iter()
            .enumerate()
            .find_map(|(i, c)| self.decision_for(c, kind).map(|s| (i, s)))
    }

    pub fn entries(&self) -> impl Iterator<Item = &TrustSettingEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_fingerprint(raw: &str) -> EngineResult<String> {
    let hex: String = raw.chars().filter(|c| *c != ':').collect::<String>().to_ascii_lowercase();
    if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EngineError::Config(format!(
            "trust setting fingerprint must be 64 hex characters, got {raw:?}"
        )));
    }
    Ok(hex)
}
