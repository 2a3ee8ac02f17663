//! Read-only keychain over a directory of certificate files.

use std::path::{Path, PathBuf};

use crate::domain::certificate::Certificate;
use crate::domain::error::{EngineError, EngineResult};

use super::keychain::Keychain;

/// Certificates stored as `.pem`/`.crt`/`.cer` (PEM) or `.der` files.
/// The directory is re-read on every query.
#[derive(Debug, Clone)]
pub struct DirectoryKeychain {
    name: String,
    path: PathBuf,
}

impl DirectoryKeychain {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: path.display().to_string(),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_file(path: &Path) -> EngineResult<Vec<Certificate>> {
        let bytes = std::fs::read(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("der") => Ok(vec![Certificate::from_der(&bytes)?]),
            _ => Certificate::stack_from_pem(&bytes),
        }
    }
}

fn is_certificate_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("pem" | "crt" | "cer" | "der")
    )
}

impl Keychain for DirectoryKeychain {
    fn name(&self) -> &str {
        &self.name
    }

    fn certificates(&self) -> EngineResult<Vec<Certificate>> {
        let entries = std::fs::read_dir(&self.path).map_err(|e| EngineError::StoreSearch {
            store: self.name.clone(),
            reason: e.to_string(),
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_certificate_file(p))
            .collect();
        paths.sort();

        let mut out = Vec::new();
        for path in paths {
            match Self::load_file(&path) {
                Ok(certs) => out.extend(certs),
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "Skipping unreadable certificate file");
                }
            }
        }
        Ok(out)
    }
}
