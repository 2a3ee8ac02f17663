// crates/engine/src/platform.rs

//! Process-level trust context: system anchors, the default keychain search
//! list, user trust settings and the verification backend.

use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::warn;

use crate::adapters::x509::{discover_system_anchors, load_bundles, OpenSslVerifier};
use crate::domain::anchors::AnchorSet;
use crate::domain::error::EngineResult;
use crate::domain::trust_engine::ChainVerifier;
use crate::domain::trust_settings::TrustSettings;
use crate::domain::types::{LimitsConfig, PlatformConfig};
use crate::store::{DirectoryKeychain, Keychain};

static SHARED: Lazy<Arc<Platform>> = Lazy::new(|| {
    let platform = Platform::from_config(&PlatformConfig::secure_default()).unwrap_or_else(|e| {
        warn!(error = %e, "falling back to an isolated platform");
        Platform::isolated()
    });
    Arc::new(platform)
});

#[derive(Debug, Clone)]
pub struct Platform {
    system_anchors: AnchorSet,
    default_search_list: Vec<Arc<dyn Keychain>>,
    trust_settings: TrustSettings,
    verifier: Arc<dyn ChainVerifier>,
    limits: LimitsConfig,
}

impl Platform {
    /// The process-wide platform, built on first use from the secure defaults.
    pub fn shared() -> Arc<Platform> {
        Arc::clone(&SHARED)
    }

    /// No system anchors, no keychains, no trust settings.
    pub fn isolated() -> Self {
        Self {
            system_anchors: AnchorSet::new(),
            default_search_list: Vec::new(),
            trust_settings: TrustSettings::new(),
            verifier: Arc::new(OpenSslVerifier::new()),
            limits: LimitsConfig::defaults(),
        }
    }

    pub fn from_config(cfg: &PlatformConfig) -> EngineResult<Self> {
        let system_anchors = match &cfg.anchor_bundles {
            Some(paths) => load_bundles(paths)?,
            None => discover_system_anchors(),
        };
        let default_search_list = cfg
            .keychain_directories
            .iter()
            .map(|dir| Arc::new(DirectoryKeychain::new(dir)) as Arc<dyn Keychain>)
            .collect();
        Ok(Self {
            system_anchors,
            default_search_list,
            trust_settings: TrustSettings::from_entries(cfg.trust_settings.iter().cloned())?,
            verifier: Arc::new(OpenSslVerifier::new()),
            limits: cfg.limits,
        })
    }

    pub fn with_system_anchors(mut self, anchors: AnchorSet) -> Self {
        self.system_anchors = anchors;
        self
    }

    pub fn with_default_search_list(mut self, keychains: Vec<Arc<dyn Keychain>>) -> Self {
        self.default_search_list = keychains;
        self
    }

    pub fn with_trust_settings(mut self, settings: TrustSettings) -> Self {
        self.trust_settings = settings;
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn ChainVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    pub fn system_anchors(&self) -> &AnchorSet {
        &self.system_anchors
    }

    pub fn default_search_list(&self) -> &[Arc<dyn Keychain>] {
        &self.default_search_list
    }

    pub fn trust_settings(&self) -> &TrustSettings {
        &self.trust_settings
    }

    pub fn verifier(&self) -> &dyn ChainVerifier {
        self.verifier.as_ref()
    }

    pub fn limits(&self) -> LimitsConfig {
        self.limits
    }
}
