use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::trust::TrustSettingEntry;
use crate::domain::error::{EngineError, EngineResult};

/// Centralized defaults for the engine.
/// All opinionated defaults should be defined here for consistency.
pub struct EngineDefaults;

impl EngineDefaults {
    // Evaluation defaults
    pub const TRUST_SYSTEM_ANCHORS: bool = true; // System anchors count until the caller replaces the set
    pub const MAX_CHAIN_DEPTH: usize = 32; // Guards chain assembly against pathological inputs

    // Platform defaults
    pub const ANCHOR_BUNDLES: Option<Vec<PathBuf>> = None; // Discover the OS bundle
    pub const KEYCHAIN_DIRECTORIES: Vec<PathBuf> = Vec::new(); // No on-disk keychains
    pub const TRUST_SETTINGS: Vec<TrustSettingEntry> = Vec::new(); // No user decisions

    /// Well-known CA bundle file paths, in order of preference.
    pub const SYSTEM_BUNDLE_PATHS: &'static [&'static str] = &[
        "/etc/ssl/certs/ca-certificates.crt", // Debian/Ubuntu
        "/etc/pki/tls/certs/ca-bundle.crt",   // RHEL/CentOS/Fedora
        "/etc/ssl/ca-bundle.pem",             // openSUSE
        "/etc/ssl/cert.pem",                  // macOS, Alpine
    ];
}

/// Per-platform limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Max number of certificates on an assembled chain, leaf included.
    pub max_chain_depth: usize,
}

impl LimitsConfig {
    /// Opinionated production defaults.
    pub fn defaults() -> Self {
        Self {
            max_chain_depth: EngineDefaults::MAX_CHAIN_DEPTH,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Configuration for building a [`crate::Platform`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// PEM bundles holding the system anchors. `None` discovers the OS bundle.
    pub anchor_bundles: Option<Vec<PathBuf>>,
    /// Directories of certificate files forming the default search list.
    pub keychain_directories: Vec<PathBuf>,
    /// Explicit user trust decisions.
    pub trust_settings: Vec<TrustSettingEntry>,
    pub limits: LimitsConfig,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self::secure_default()
    }
}

impl PlatformConfig {
    /// Secure opinionated defaults: OS anchors, no keychains, no user decisions.
    pub fn secure_default() -> Self {
        Self {
            anchor_bundles: EngineDefaults::ANCHOR_BUNDLES,
            keychain_directories: EngineDefaults::KEYCHAIN_DIRECTORIES,
            trust_settings: EngineDefaults::TRUST_SETTINGS,
            limits: LimitsConfig::defaults(),
        }
    }

    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let cfg: PlatformConfig = serde_json::from_str(json)?;
        if cfg.limits.max_chain_depth == 0 {
            return Err(EngineError::Config("max_chain_depth must be at least 1".into()));
        }
        Ok(cfg)
    }
}
