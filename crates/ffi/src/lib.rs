use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use keyhold_engine::domain::types as dt;
use keyhold_engine::{
    Certificate, DirectoryKeychain, EngineError, Keychain, Platform, PlatformConfig, SearchList, Trust,
};

uniffi::setup_scaffolding!();

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum FfiError {
    /// Input could not be interpreted (maps to `Invalid`).
    #[error("{message}")]
    Malformed { message: String },
    #[error("{message}")]
    Generic { message: String },
}

impl From<EngineError> for FfiError {
    fn from(e: EngineError) -> Self {
        match e.trust_result() {
            dt::TrustResult::Invalid => FfiError::Malformed { message: e.to_string() },
            _ => FfiError::Generic { message: e.to_string() },
        }
    }
}

impl From<anyhow::Error> for FfiError {
    fn from(e: anyhow::Error) -> Self {
        FfiError::Generic { message: format!("{e:#}") }
    }
}

// ===== FFI types mirroring the public Rust API (FFI-friendly) =====

#[derive(uniffi::Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiTrustResult {
    Invalid,
    Proceed,
    Confirm,
    Deny,
    Unspecified,
    RecoverableTrustFailure,
    FatalTrustFailure,
    OtherError,
}

impl From<dt::TrustResult> for FfiTrustResult {
    fn from(v: dt::TrustResult) -> Self {
        match v {
            dt::TrustResult::Invalid => FfiTrustResult::Invalid,
            dt::TrustResult::Proceed => FfiTrustResult::Proceed,
            dt::TrustResult::Confirm => FfiTrustResult::Confirm,
            dt::TrustResult::Deny => FfiTrustResult::Deny,
            dt::TrustResult::Unspecified => FfiTrustResult::Unspecified,
            dt::TrustResult::RecoverableTrustFailure => FfiTrustResult::RecoverableTrustFailure,
            dt::TrustResult::FatalTrustFailure => FfiTrustResult::FatalTrustFailure,
            dt::TrustResult::OtherError => FfiTrustResult::OtherError,
        }
    }
}

#[derive(uniffi::Record, Debug, Clone)]
pub struct FfiCertificateInfo {
    pub subject_summary: String,
    pub common_name: Option<String>,
    pub issuer: String,
    pub serial_number: String,
    pub fingerprint_sha256: String,
    pub not_before: Option<i64>,
    pub not_after: Option<i64>,
    pub dns_names: Vec<String>,
    pub email_addresses: Vec<String>,
}

impl From<&Certificate> for FfiCertificateInfo {
    fn from(c: &Certificate) -> Self {
        Self {
            subject_summary: c.subject_summary(),
            common_name: c.common_name(),
            issuer: c.issuer_string(),
            serial_number: c.serial_number_hex(),
            fingerprint_sha256: c.fingerprint_hex(),
            not_before: c.not_before_unix().ok(),
            not_after: c.not_after_unix().ok(),
            dns_names: c.dns_names(),
            email_addresses: c.email_addresses(),
        }
    }
}

// ===== Platform configuration =====

static CONFIGURED: Mutex<Option<Arc<Platform>>> = Mutex::new(None);

fn current_platform() -> Arc<Platform> {
    match CONFIGURED.lock() {
        Ok(guard) => guard.clone().unwrap_or_else(Platform::shared),
        Err(_) => Platform::shared(),
    }
}

/// Load a JSON `PlatformConfig` from disk and use it for every trust object
/// created afterwards.
#[uniffi::export]
pub fn configure_platform(config_path: String) -> Result<(), FfiError> {
    let json = std::fs::read_to_string(&config_path)
        .with_context(|| format!("reading platform config {config_path}"))?;
    let cfg = PlatformConfig::from_json_str(&json).context("parsing platform config")?;
    let platform = Platform::from_config(&cfg).context("building platform")?;
    let mut slot = CONFIGURED
        .lock()
        .map_err(|_| FfiError::Generic { message: "platform mutex poisoned".into() })?;
    *slot = Some(Arc::new(platform));
    Ok(())
}

/// Go back to the process-wide default platform.
#[uniffi::export]
pub fn reset_platform() {
    if let Ok(mut slot) = CONFIGURED.lock() {
        *slot = None;
    }
}

#[uniffi::export]
pub fn certificate_info(der: Vec<u8>) -> Result<FfiCertificateInfo, FfiError> {
    let cert = Certificate::from_der(&der)?;
    Ok(FfiCertificateInfo::from(&cert))
}

// ===== Trust evaluation =====

#[derive(uniffi::Object, Debug)]
pub struct FfiTrust {
    inner: Mutex<Trust>,
}

fn parse(chain: Vec<Vec<u8>>) -> Result<Vec<Certificate>, FfiError> {
    Ok(keyhold_engine::parse_chain(&chain)?)
}

impl FfiTrust {
    fn wrap(trust: Trust) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(trust.with_platform(current_platform())),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Trust>, FfiError> {
        self.inner
            .lock()
            .map_err(|_| FfiError::Generic { message: "trust mutex poisoned".into() })
    }
}

#[uniffi::export]
impl FfiTrust {
    #[uniffi::constructor]
    pub fn basic_x509(chain: Vec<Vec<u8>>) -> Result<Arc<Self>, FfiError> {
        Ok(Self::wrap(Trust::for_basic_x509(parse(chain)?)))
    }

    #[uniffi::constructor]
    pub fn ssl_server(chain: Vec<Vec<u8>>, hostname: String) -> Result<Arc<Self>, FfiError> {
        Ok(Self::wrap(Trust::for_ssl_server(parse(chain)?, hostname)))
    }

    #[uniffi::constructor]
    pub fn ssl_client(chain: Vec<Vec<u8>>, hostname: String) -> Result<Arc<Self>, FfiError> {
        Ok(Self::wrap(Trust::for_ssl_client(parse(chain)?, hostname)))
    }

    /// `None` reverts to the system anchors.
    pub fn set_anchors(&self, anchors: Option<Vec<Vec<u8>>>) -> Result<(), FfiError> {
        let anchors = match anchors {
            Some(list) => Some(
                list.iter()
                    .map(|der| Certificate::from_der(der))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };
        self.lock()?.set_anchors(anchors);
        Ok(())
    }

    pub fn add_custom_anchors(&self, anchors: Vec<Vec<u8>>) -> Result<(), FfiError> {
        let certs = anchors
            .iter()
            .map(|der| Certificate::from_der(der))
            .collect::<Result<Vec<_>, _>>()?;
        self.lock()?.add_custom_anchors(certs);
        Ok(())
    }

    /// `None` means the platform default search list; an empty list disables search.
    pub fn set_keychain_dirs(&self, dirs: Option<Vec<String>>) -> Result<(), FfiError> {
        let list = match dirs {
            None => SearchList::Default,
            Some(dirs) => SearchList::Explicit(
                dirs.into_iter()
                    .map(|d| Arc::new(DirectoryKeychain::new(PathBuf::from(d))) as Arc<dyn Keychain>)
                    .collect(),
            ),
        };
        self.lock()?.set_keychains(list);
        Ok(())
    }

    /// Seconds since the Unix epoch; `None` means "now".
    pub fn set_verify_date(&self, unix_secs: Option<i64>) -> Result<(), FfiError> {
        let date = unix_secs.map(|s| {
            if s >= 0 {
                UNIX_EPOCH + Duration::from_secs(s.unsigned_abs())
            } else {
                UNIX_EPOCH - Duration::from_secs(s.unsigned_abs())
            }
        });
        self.lock()?.set_verify_date(date);
        Ok(())
    }

    pub fn verify_date(&self) -> Result<i64, FfiError> {
        let at: SystemTime = self.lock()?.verify_date();
        Ok(match at.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(e) => -(e.duration().as_secs() as i64),
        })
    }

    pub fn evaluate(&self) -> Result<FfiTrustResult, FfiError> {
        Ok(self.lock()?.evaluate()?.into())
    }

    /// Leaf-first DER chain; empty unless the last evaluation succeeded.
    pub fn certificate_chain(&self) -> Result<Vec<Vec<u8>>, FfiError> {
        Ok(self
            .lock()?
            .certificate_chain()
            .iter()
            .map(|c| c.der().to_vec())
            .collect())
    }

    /// DER-encoded SubjectPublicKeyInfo of the leaf, after evaluation.
    pub fn public_key(&self) -> Result<Option<Vec<u8>>, FfiError> {
        let trust = self.lock()?;
        match trust.public_key() {
            Some(key) => Ok(Some(key.public_key_der()?)),
            None => Ok(None),
        }
    }

    pub fn report_json(&self) -> Result<Option<String>, FfiError> {
        let trust = self.lock()?;
        match trust.report() {
            Some(report) => Ok(Some(report.to_json().map_err(EngineError::from)?)),
            None => Ok(None),
        }
    }
}
