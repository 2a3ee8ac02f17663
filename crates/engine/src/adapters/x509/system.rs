//! System anchor discovery and PEM bundle loading.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::domain::anchors::AnchorSet;
use crate::domain::certificate::Certificate;
use crate::domain::error::{EngineError, EngineResult};
use crate::domain::types::EngineDefaults;

/// Environment variable that overrides bundle discovery.
pub const SSL_CERT_FILE_ENV: &str = "SSL_CERT_FILE";

pub fn load_bundle(path: &Path) -> EngineResult<Vec<Certificate>> {
  let pem = std::fs::read(path)?;
  let certs = Certificate::stack_from_pem(&pem)?;
  if certs.is_empty() {
    return Err(EngineError::Config(format!("{} holds no certificates", path.display())));
  }
  Ok(certs)
}

/// Load every bundle in `paths` into one anchor set. Any failure is an error.
pub fn load_bundles(paths: &[PathBuf]) -> EngineResult<AnchorSet> {
  let mut anchors = AnchorSet::new();
  for path in paths {
    let certs = load_bundle(path)?;
    debug!(path = %path.display(), count = certs.len(), "loaded anchor bundle");
    anchors.extend(certs);
  }
  Ok(anchors)
}

/// Candidate bundle locations, most specific first.
pub fn bundle_candidates() -> Vec<PathBuf> {
  let mut out = Vec::new();
  if let Some(env) = std::env::var_os(SSL_CERT_FILE_ENV) {
    out.push(PathBuf::from(env));
  }
  out.extend(EngineDefaults::SYSTEM_BUNDLE_PATHS.iter().map(PathBuf::from));
  out
}

/// Load the first usable OS bundle. Returns an empty set when none is found.
pub fn discover_system_anchors() -> AnchorSet {
  #[cfg(not(feature = "system_anchors"))]
  {
    return AnchorSet::new();
  }
  #[cfg(feature = "system_anchors")]
  {
    for path in bundle_candidates() {
      if !path.is_file() {
        continue;
      }
      match load_bundle(&path) {
        Ok(certs) => {
          let anchors: AnchorSet = certs.into_iter().collect();
          info!(path = %path.display(), count = anchors.len(), "system anchors loaded");
          return anchors;
        }
        Err(e) => warn!(path = %path.display(), error = %e, "unusable anchor bundle"),
      }
    }
    warn!("no system anchor bundle found");
    AnchorSet::new()
  }
}
