//! The read-only store interface consumed by chain assembly.

use std::fmt;
use std::sync::Arc;

use crate::domain::certificate::Certificate;
use crate::domain::error::EngineResult;

/// A credential store that can be searched for certificates.
pub trait Keychain: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Enumerate every certificate in the store.
    fn certificates(&self) -> EngineResult<Vec<Certificate>>;

    /// Find a certificate by its DER-encoded subject name. Stores without a
    /// subject index fall back to enumeration.
    fn find_certificate(&self, subject: &[u8]) -> EngineResult<Option<Certificate>> {
        Ok(self
            .certificates()?
            .into_iter()
            .find(|c| c.subject() == subject))
    }
}

/// Which stores to search for missing intermediates.
#[derive(Debug, Clone, Default)]
pub enum SearchList {
    /// The platform default search list.
    #[default]
    Default,
    /// Exactly these stores, in order. An empty list disables searching.
    Explicit(Vec<Arc<dyn Keychain>>),
}

impl SearchList {
    pub fn disabled() -> Self {
        SearchList::Explicit(Vec::new())
    }

    pub fn resolve<'a>(&'a self, platform_default: &'a [Arc<dyn Keychain>]) -> &'a [Arc<dyn Keychain>] {
        match self {
            SearchList::Default => platform_default,
            SearchList::Explicit(list) => list,
        }
    }
}
