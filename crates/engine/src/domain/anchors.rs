// crates/engine/src/domain/anchors.rs

//! Anchor sets and the per-evaluation anchor selection.

use std::collections::HashSet;

use super::certificate::{Certificate, CertificateIdentity};
use super::types::EngineDefaults;

/// Ordered set of trusted root certificates, unique by identity.
#[derive(Debug, Clone, Default)]
pub struct AnchorSet {
    certificates: Vec<Certificate>,
    identities: HashSet<CertificateIdentity>,
}

impl AnchorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless an anchor with the same identity is present.
    pub fn insert(&mut self, certificate: Certificate) -> bool {
        if !self.identities.insert(certificate.identity()) {
            return false;
        }
        self.certificates.push(certificate);
        true
    }

    pub fn contains(&self, certificate: &Certificate) -> bool {
        self.identities.contains(&certificate.identity())
    }

    pub fn find_by_subject(&self, subject: &[u8]) -> Option<&Certificate> {
        self.certificates.iter().find(|c| c.subject() == subject)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Certificate> {
        self.certificates.iter()
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn union(&self, other: &AnchorSet) -> AnchorSet {
        let mut out = self.clone();
        out.extend(other.iter().cloned());
        out
    }

    pub fn to_vec(&self) -> Vec<Certificate> {
        self.certificates.clone()
    }
}

impl Extend<Certificate> for AnchorSet {
    fn extend<T: IntoIterator<Item = Certificate>>(&mut self, iter: T) {
        for c in iter {
            self.insert(c);
        }
    }
}

impl FromIterator<Certificate> for AnchorSet {
    fn from_iter<T: IntoIterator<Item = Certificate>>(iter: T) -> Self {
        let mut set = AnchorSet::new();
        set.extend(iter);
        set
    }
}

impl<'a> IntoIterator for &'a AnchorSet {
    type Item = &'a Certificate;
    type IntoIter = std::slice::Iter<'a, Certificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Which anchors one evaluation trusts: the system set, custom anchors, or both.
#[derive(Debug, Clone)]
pub struct AnchorSelection {
    trust_system: bool,
    custom: AnchorSet,
}

impl Default for AnchorSelection {
    fn default() -> Self {
        Self {
            trust_system: EngineDefaults::TRUST_SYSTEM_ANCHORS,
            custom: AnchorSet::new(),
        }
    }
}

impl AnchorSelection {
    /// The complete set of anchors currently trusted.
    pub fn effective(&self, system: &AnchorSet) -> AnchorSet {
        if self.trust_system {
            system.union(&self.custom)
        } else {
            self.custom.clone()
        }
    }

    /// Replace the effective set. `Some` stops trusting the system anchors,
    /// `None` reverts to the system anchors alone.
    pub fn replace(&mut self, anchors: Option<Vec<Certificate>>) {
        match anchors {
            Some(list) => {
                self.trust_system = false;
                self.custom = list.into_iter().collect();
            }
            None => {
                self.trust_system = true;
                self.custom = AnchorSet::new();
            }
        }
    }

    /// Union into the effective set without disabling any trusted anchor.
    pub fn add_custom(&mut self, anchors: impl IntoIterator<Item = Certificate>) {
        self.custom.extend(anchors);
    }

    pub fn trusts_system(&self) -> bool {
        self.trust_system
    }
}
